use super::{AnimatedItem, AnimationDescription, Effect, EffectContext};
use crate::parameter::{EasingCurve, LoopSize, Parameter, ParameterSet};
use crate::scene::{Point, Scene};

const DURATION: &str = "duration";
const STYLE: &str = "style";
const TEXT: &str = "text";
const CURVE: &str = "curve";

const ZOOM_OUT: usize = 1;

/// Beat-synced text zooming in or out of the centre of the scene.
#[derive(Debug, Default)]
pub struct TextAnimation;

impl TextAnimation {
    pub const CLASS_NAME: &'static str = "text";

    pub fn new() -> Self {
        Self
    }

    pub fn description_static() -> AnimationDescription {
        AnimationDescription {
            name: "Text",
            tooltip: "Beat-synced text",
            class_name: Self::CLASS_NAME,
        }
    }
}

impl Effect for TextAnimation {
    fn description(&self) -> AnimationDescription {
        Self::description_static()
    }

    fn declare_parameters(&self, parameters: &mut ParameterSet) {
        parameters.add(Parameter::beat(DURATION, "Duration", LoopSize::ONE));
        parameters.add(Parameter::items(STYLE, "Style", &["Zoom in", "Zoom out"], 0));
        parameters.add(Parameter::text(TEXT, "Text", "Beatviz"));
        parameters.add(Parameter::easing(CURVE, "Curve", EasingCurve::OutQuad));
    }

    fn spawn(&mut self, ctx: &mut EffectContext<'_>, uppqn: u64) {
        let text = ctx.parameters.text(TEXT);
        if text.is_empty() {
            return;
        }
        let duration = ctx.parameters.beat(DURATION).ticks(ctx.resolution);
        let centre = Point::new(
            f64::from(ctx.scene.width()) / 2.0,
            f64::from(ctx.scene.height()) / 2.0,
        );
        let style = ctx.parameters.current_item(STYLE) as i32;
        let color = ctx.base_color();
        let handle = ctx.scene.create_text(text, color, centre, style);
        ctx.ledger.add(AnimatedItem::new(uppqn, duration, handle));
    }

    fn advance(&self, scene: &mut Scene, parameters: &ParameterSet, item: &AnimatedItem, progress: f64) {
        let eased = parameters.easing(CURVE).value_for_progress(progress);
        let scale = match scene.tag(item.handle()) {
            Some(style) if style as usize == ZOOM_OUT => 1.0 - eased,
            Some(_) => eased,
            None => return,
        };
        scene.set_scale(item.handle(), scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Animation;
    use crate::timeline::Tick;

    #[test]
    fn zooms_in_over_the_item_lifetime() {
        let mut scene = Scene::new(100, 100);
        let mut animation = Animation::with_seed(Box::new(TextAnimation::new()), 24, 0);
        animation.set_parameter_from_property(CURVE, "Linear").unwrap();
        animation.set_enabled(true);

        animation.animate(&mut scene, &Tick::at(0, 24, 16));
        let handle = animation.ledger().iter().next().unwrap().handle();
        assert_eq!(scene.get(handle).unwrap().scale, 0.0);
        assert_eq!(scene.pos(handle), Some(Point::new(50.0, 50.0)));

        animation.animate(&mut scene, &Tick::at(12, 24, 16));
        assert_eq!(scene.get(handle).unwrap().scale, 0.5);
    }

    #[test]
    fn empty_text_spawns_nothing_and_ignores_notes() {
        let mut scene = Scene::new(100, 100);
        let mut animation = Animation::with_seed(Box::new(TextAnimation::new()), 24, 0);
        animation.set_parameter_from_property(TEXT, "").unwrap();
        animation.set_enabled(true);
        animation.request_item();
        animation.animate(&mut scene, &Tick::at(0, 24, 16));
        assert!(scene.is_empty());
        assert!(!animation.is_instrumented());
    }
}

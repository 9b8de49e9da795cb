//! Animation parameters and their MIDI / property-list conversions.

mod beat;
mod easing;

pub use beat::LoopSize;
pub use easing::EasingCurve;

use serde::{Deserialize, Serialize};

use crate::{BeatVizError, Result};

/// Value held by a [`Parameter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    /// Real number in `[0, 1]`.
    Real(f64),
    /// One labelled choice out of a fixed list.
    Items { items: Vec<String>, current: usize },
    Beat(LoopSize),
    Easing(EasingCurve),
    Text(String),
}

/// A single named, user-editable animation setting.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    label: String,
    value: ParameterValue,
    preferred: bool,
}

impl Parameter {
    fn new(name: &str, label: &str, value: ParameterValue) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            value,
            preferred: false,
        }
    }

    pub fn real(name: &str, label: &str, value: f64) -> Self {
        Self::new(name, label, ParameterValue::Real(value.clamp(0.0, 1.0)))
    }

    pub fn items(name: &str, label: &str, items: &[&str], current: usize) -> Self {
        let items: Vec<String> = items.iter().map(|item| item.to_string()).collect();
        let current = current.min(items.len().saturating_sub(1));
        Self::new(name, label, ParameterValue::Items { items, current })
    }

    pub fn beat(name: &str, label: &str, size: LoopSize) -> Self {
        Self::new(name, label, ParameterValue::Beat(size))
    }

    pub fn easing(name: &str, label: &str, curve: EasingCurve) -> Self {
        Self::new(name, label, ParameterValue::Easing(curve))
    }

    pub fn text(name: &str, label: &str, text: &str) -> Self {
        Self::new(name, label, ParameterValue::Text(text.to_string()))
    }

    /// Object name, unique within an animation.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self) -> &ParameterValue {
        &self.value
    }

    /// Whether the control surface should favour this parameter for a knob.
    pub fn is_preferred(&self) -> bool {
        self.preferred
    }

    /// Returns `true` when the flag actually changed.
    pub fn set_preferred(&mut self, preferred: bool) -> bool {
        let changed = self.preferred != preferred;
        self.preferred = preferred;
        changed
    }

    pub fn is_midi_controllable(&self) -> bool {
        !matches!(self.value, ParameterValue::Text(_))
    }

    /// Applies a 7-bit controller value. Text parameters ignore it.
    pub fn set_value_from_midi(&mut self, value: u8) {
        let value = value.min(127);
        match &mut self.value {
            ParameterValue::Real(real) => *real = f64::from(value) / 127.0,
            ParameterValue::Items { items, current } => {
                *current = midi_to_index(value, items.len());
            }
            ParameterValue::Beat(size) => {
                *size = LoopSize::ALL[midi_to_index(value, LoopSize::ALL.len())];
            }
            ParameterValue::Easing(curve) => {
                *curve = EasingCurve::ALL[midi_to_index(value, EasingCurve::ALL.len())];
            }
            ParameterValue::Text(_) => {}
        }
    }

    pub fn set_real(&mut self, value: f64) -> Result<()> {
        match &mut self.value {
            ParameterValue::Real(real) => {
                *real = value.clamp(0.0, 1.0);
                Ok(())
            }
            _ => Err(BeatVizError::invalid_value(&self.name, value.to_string())),
        }
    }

    /// Selects the item whose label equals `label`.
    pub fn set_current_item(&mut self, label: &str) -> Result<()> {
        if let ParameterValue::Items { items, current } = &mut self.value {
            if let Some(index) = items.iter().position(|item| item == label) {
                *current = index;
                return Ok(());
            }
        }
        Err(BeatVizError::invalid_value(&self.name, label))
    }

    /// Serializes the value for a flat property list.
    pub fn to_property(&self) -> String {
        match &self.value {
            ParameterValue::Real(real) => real.to_string(),
            ParameterValue::Items { items, current } => {
                items.get(*current).cloned().unwrap_or_default()
            }
            ParameterValue::Beat(size) => size.to_string(),
            ParameterValue::Easing(curve) => curve.to_string(),
            ParameterValue::Text(text) => text.clone(),
        }
    }

    /// Restores the value written by [`Parameter::to_property`].
    pub fn set_from_property(&mut self, property: &str) -> Result<()> {
        if matches!(self.value, ParameterValue::Items { .. }) {
            return self.set_current_item(property);
        }
        match &mut self.value {
            ParameterValue::Real(real) => {
                let parsed: f64 = property
                    .trim()
                    .parse()
                    .map_err(|_| BeatVizError::invalid_value(&self.name, property))?;
                *real = parsed.clamp(0.0, 1.0);
            }
            ParameterValue::Items { .. } => {}
            ParameterValue::Beat(size) => *size = property.parse()?,
            ParameterValue::Easing(curve) => *curve = property.parse()?,
            ParameterValue::Text(text) => *text = property.to_string(),
        }
        Ok(())
    }
}

fn midi_to_index(value: u8, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (usize::from(value) * len / 128).min(len - 1)
}

/// Ordered parameters of one animation, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    parameters: Vec<Parameter>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a parameter, replacing an earlier one with the same name.
    pub fn add(&mut self, parameter: Parameter) {
        match self.parameters.iter_mut().find(|p| p.name == parameter.name) {
            Some(existing) => *existing = parameter,
            None => self.parameters.push(parameter),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.parameters.iter_mut().find(|p| p.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    // Typed accessors fall back to neutral values for undeclared names.

    pub fn real(&self, name: &str) -> f64 {
        match self.get(name).map(Parameter::value) {
            Some(ParameterValue::Real(value)) => *value,
            _ => 0.0,
        }
    }

    pub fn current_item(&self, name: &str) -> usize {
        match self.get(name).map(Parameter::value) {
            Some(ParameterValue::Items { current, .. }) => *current,
            _ => 0,
        }
    }

    pub fn beat(&self, name: &str) -> LoopSize {
        match self.get(name).map(Parameter::value) {
            Some(ParameterValue::Beat(size)) => *size,
            _ => LoopSize::default(),
        }
    }

    pub fn easing(&self, name: &str) -> EasingCurve {
        match self.get(name).map(Parameter::value) {
            Some(ParameterValue::Easing(curve)) => *curve,
            _ => EasingCurve::default(),
        }
    }

    pub fn text(&self, name: &str) -> &str {
        match self.get(name).map(Parameter::value) {
            Some(ParameterValue::Text(text)) => text,
            _ => "",
        }
    }

    /// Flat `name -> value` list in declaration order.
    pub fn to_properties(&self) -> Vec<(String, String)> {
        self.parameters
            .iter()
            .map(|p| (p.name.clone(), p.to_property()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direction() -> Parameter {
        Parameter::items("direction", "Direction", &["Right", "Left", "Up", "Down", "Rand."], 3)
    }

    #[test]
    fn midi_maps_onto_real_range() {
        let mut density = Parameter::real("density", "Density", 0.0);
        density.set_value_from_midi(127);
        assert_eq!(density.value(), &ParameterValue::Real(1.0));
        density.set_value_from_midi(0);
        assert_eq!(density.value(), &ParameterValue::Real(0.0));
    }

    #[test]
    fn midi_maps_onto_item_indices() {
        let mut param = direction();
        param.set_value_from_midi(0);
        assert_eq!(param.to_property(), "Right");
        param.set_value_from_midi(127);
        assert_eq!(param.to_property(), "Rand.");
        param.set_value_from_midi(64);
        assert_eq!(param.to_property(), "Up");
    }

    #[test]
    fn text_ignores_midi() {
        let mut text = Parameter::text("text", "Text", "hello");
        assert!(!text.is_midi_controllable());
        text.set_value_from_midi(90);
        assert_eq!(text.to_property(), "hello");
    }

    #[test]
    fn property_round_trip_restores_choices() {
        let mut set = ParameterSet::new();
        set.add(direction());
        set.add(Parameter::beat("duration", "Duration", LoopSize::TWO));
        set.add(Parameter::easing("curve", "Curve", EasingCurve::OutQuad));
        set.add(Parameter::real("length", "Length", 0.4));
        let properties = set.to_properties();

        let mut restored = ParameterSet::new();
        restored.add(Parameter::items("direction", "Direction", &["Right", "Left", "Up", "Down", "Rand."], 0));
        restored.add(Parameter::beat("duration", "Duration", LoopSize::ONE));
        restored.add(Parameter::easing("curve", "Curve", EasingCurve::Linear));
        restored.add(Parameter::real("length", "Length", 0.0));
        for (name, value) in &properties {
            restored.get_mut(name).unwrap().set_from_property(value).unwrap();
        }

        assert_eq!(restored.current_item("direction"), 3);
        assert_eq!(restored.beat("duration"), LoopSize::TWO);
        assert_eq!(restored.easing("curve"), EasingCurve::OutQuad);
        assert_eq!(restored.real("length"), 0.4);
    }

    #[test]
    fn rejects_unknown_item_labels() {
        let mut param = direction();
        assert!(param.set_from_property("Sideways").is_err());
        assert!(Parameter::real("x", "X", 0.0).set_from_property("abc").is_err());
    }

    #[test]
    fn preferred_flag_reports_changes() {
        let mut param = direction();
        assert!(param.set_preferred(true));
        assert!(!param.set_preferred(true));
        assert!(param.is_preferred());
    }
}

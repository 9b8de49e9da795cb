use super::{Animation, AnimationDescription, Effect, FallingObjects, TextAnimation};
use crate::{BeatVizError, Result};

/// Instantiates animations by class name.
#[derive(Debug, Clone)]
pub struct AnimationFactory {
    resolution: u32,
    seed: Option<u64>,
    created: u64,
}

impl AnimationFactory {
    pub fn new(resolution: u32) -> Self {
        Self {
            resolution,
            seed: None,
            created: 0,
        }
    }

    /// Every animation created afterwards draws from a deterministic RNG
    /// derived from `seed` and its creation order.
    pub fn with_seed(resolution: u32, seed: Option<u64>) -> Self {
        Self {
            seed,
            ..Self::new(resolution)
        }
    }

    pub fn available_animations(&self) -> Vec<AnimationDescription> {
        vec![
            FallingObjects::description_static(),
            TextAnimation::description_static(),
        ]
    }

    pub fn create(&mut self, class_name: &str) -> Result<Animation> {
        let effect: Box<dyn Effect> = match class_name {
            FallingObjects::CLASS_NAME => Box::new(FallingObjects::new()),
            TextAnimation::CLASS_NAME => Box::new(TextAnimation::new()),
            other => return Err(BeatVizError::UnknownAnimation(other.to_string())),
        };
        let animation = match self.seed {
            Some(seed) => Animation::with_seed(effect, self.resolution, seed.wrapping_add(self.created)),
            None => Animation::new(effect, self.resolution),
        };
        self.created += 1;
        Ok(animation)
    }
}

//! Tweens: one target, a pair of endpoints, a duration and an easing

use crate::easing::Easing;
use crate::error::{AnimationError, Result};
use crate::props::TransformProps;
use lumen_core::{PropertySet, TargetId};

/// A single interpolation on one target.
///
/// A property named by only one endpoint takes its other endpoint from the
/// value it holds when the owning timeline is primed.
#[derive(Clone, Debug, PartialEq)]
pub struct Tween {
    pub target: TargetId,
    pub from: TransformProps,
    pub to: TransformProps,
    /// Seconds
    pub duration: f32,
    pub ease: Easing,
    /// Seconds added to the resolved position
    pub delay: f32,
}

impl Tween {
    /// Animate from the current state to `to`
    pub fn to(target: TargetId, to: TransformProps, duration: f32) -> Self {
        Self::from_to(target, TransformProps::default(), to, duration)
    }

    /// Animate from `from` back to the current state
    pub fn from_props(target: TargetId, from: TransformProps, duration: f32) -> Self {
        Self::from_to(target, from, TransformProps::default(), duration)
    }

    pub fn from_to(
        target: TargetId,
        from: TransformProps,
        to: TransformProps,
        duration: f32,
    ) -> Self {
        Self {
            target,
            from,
            to,
            duration,
            ease: Easing::default(),
            delay: 0.0,
        }
    }

    pub fn ease(mut self, ease: Easing) -> Self {
        self.ease = ease;
        self
    }

    pub fn delay(mut self, seconds: f32) -> Self {
        self.delay = seconds;
        self
    }

    /// Same tween applied to another target
    pub fn retarget(&self, target: TargetId) -> Self {
        Self {
            target,
            ..self.clone()
        }
    }

    /// Every property either endpoint names
    pub fn properties(&self) -> PropertySet {
        self.from.properties().union(self.to.properties())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(AnimationError::InvalidDuration(self.duration));
        }
        if !self.delay.is_finite() || self.delay < 0.0 {
            return Err(AnimationError::InvalidDelay(self.delay));
        }
        if self.properties().is_empty() {
            return Err(AnimationError::EmptyTween(self.target));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{Property, TargetStore, TransformState};

    fn target() -> TargetId {
        TargetStore::new().insert("box", TransformState::IDENTITY)
    }

    #[test]
    fn test_validate() {
        let id = target();
        assert!(Tween::to(id, TransformProps::opacity(1.0), 1.0).validate().is_ok());
        assert!(matches!(
            Tween::to(id, TransformProps::default(), 1.0).validate(),
            Err(AnimationError::EmptyTween(_))
        ));
        assert!(matches!(
            Tween::to(id, TransformProps::opacity(1.0), -1.0).validate(),
            Err(AnimationError::InvalidDuration(_))
        ));
        assert!(matches!(
            Tween::to(id, TransformProps::opacity(1.0), 1.0).delay(f32::NAN).validate(),
            Err(AnimationError::InvalidDelay(_))
        ));
    }

    #[test]
    fn test_properties_union() {
        let id = target();
        let tween = Tween::from_to(
            id,
            TransformProps::opacity(0.0),
            TransformProps::translate(0.0, 10.0),
            0.5,
        );
        let props = tween.properties();
        assert!(props.contains(Property::Opacity));
        assert!(props.contains(Property::TranslateY));
        assert_eq!(props.len(), 3);
    }
}

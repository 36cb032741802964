//! Transform property sets
//!
//! [`TransformProps`] is a sparse set of property values, used for tween
//! endpoints and for explicit state writes. Unset properties are left to the
//! target's current value.

use lumen_core::{Property, PropertySet};

/// Sparse property values
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TransformProps {
    values: [Option<f32>; Property::COUNT],
}

impl TransformProps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create properties with only opacity set
    pub fn opacity(value: f32) -> Self {
        Self::new().with_opacity(value)
    }

    /// Create properties with uniform scale
    pub fn scale(value: f32) -> Self {
        Self::new().with_scale(value)
    }

    /// Create properties with translation
    pub fn translate(x: f32, y: f32) -> Self {
        Self::new().with_translate(x, y)
    }

    /// Builder: set any property
    pub fn with(mut self, property: Property, value: f32) -> Self {
        self.values[property.index()] = Some(value);
        self
    }

    /// Builder: set opacity
    pub fn with_opacity(self, value: f32) -> Self {
        self.with(Property::Opacity, value)
    }

    /// Builder: set uniform scale
    pub fn with_scale(self, value: f32) -> Self {
        self.with_scale_xy(value, value)
    }

    /// Builder: set scale x and y separately
    pub fn with_scale_xy(self, x: f32, y: f32) -> Self {
        self.with(Property::ScaleX, x).with(Property::ScaleY, y)
    }

    /// Builder: set translation
    pub fn with_translate(self, x: f32, y: f32) -> Self {
        self.with_x(x).with_y(y)
    }

    pub fn with_x(self, px: f32) -> Self {
        self.with(Property::TranslateX, px)
    }

    pub fn with_y(self, px: f32) -> Self {
        self.with(Property::TranslateY, px)
    }

    pub fn with_z(self, px: f32) -> Self {
        self.with(Property::TranslateZ, px)
    }

    /// Builder: set Z rotation in degrees
    pub fn with_rotate(self, degrees: f32) -> Self {
        self.with(Property::RotateZ, degrees)
    }

    /// Builder: set X rotation (3D tilt)
    pub fn with_rotate_x(self, degrees: f32) -> Self {
        self.with(Property::RotateX, degrees)
    }

    /// Builder: set Y rotation (3D turn)
    pub fn with_rotate_y(self, degrees: f32) -> Self {
        self.with(Property::RotateY, degrees)
    }

    /// Builder: set clip-path inset [top%, right%, bottom%, left%]
    pub fn with_clip_inset(self, inset: [f32; 4]) -> Self {
        self.with(Property::ClipTop, inset[0])
            .with(Property::ClipRight, inset[1])
            .with(Property::ClipBottom, inset[2])
            .with(Property::ClipLeft, inset[3])
    }

    pub fn with_blur(self, px: f32) -> Self {
        self.with(Property::Blur, px)
    }

    pub fn get(&self, property: Property) -> Option<f32> {
        self.values[property.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }

    /// Properties that have a value
    pub fn properties(&self) -> PropertySet {
        self.iter().map(|(p, _)| p).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Property, f32)> + '_ {
        Property::ALL
            .into_iter()
            .filter_map(|p| self.get(p).map(|v| (p, v)))
    }
}

//! Animatable transform state
//!
//! Every visual attribute a driver can write is a [`Property`]. A target's
//! full state is a fixed array indexed by property, so reads and writes never
//! allocate.

use std::fmt;

/// An animatable property of a target
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Property {
    /// Translation X in pixels
    TranslateX,
    /// Translation Y in pixels
    TranslateY,
    /// Translation Z in pixels (positive = toward viewer)
    TranslateZ,
    /// Rotation around X in degrees (3D tilt)
    RotateX,
    /// Rotation around Y in degrees (3D turn)
    RotateY,
    /// Rotation around Z in degrees
    RotateZ,
    ScaleX,
    ScaleY,
    /// Opacity (0.0 to 1.0)
    Opacity,
    /// Clip inset from the top edge, percent
    ClipTop,
    ClipRight,
    ClipBottom,
    ClipLeft,
    /// Blur radius in pixels
    Blur,
}

impl Property {
    pub const COUNT: usize = 14;

    pub const ALL: [Property; Property::COUNT] = [
        Property::TranslateX,
        Property::TranslateY,
        Property::TranslateZ,
        Property::RotateX,
        Property::RotateY,
        Property::RotateZ,
        Property::ScaleX,
        Property::ScaleY,
        Property::Opacity,
        Property::ClipTop,
        Property::ClipRight,
        Property::ClipBottom,
        Property::ClipLeft,
        Property::Blur,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Value of this property on an untouched target
    pub const fn identity(self) -> f32 {
        match self {
            Property::ScaleX | Property::ScaleY | Property::Opacity => 1.0,
            _ => 0.0,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Property::TranslateX => "x",
            Property::TranslateY => "y",
            Property::TranslateZ => "z",
            Property::RotateX => "rotateX",
            Property::RotateY => "rotateY",
            Property::RotateZ => "rotate",
            Property::ScaleX => "scaleX",
            Property::ScaleY => "scaleY",
            Property::Opacity => "opacity",
            Property::ClipTop => "clipTop",
            Property::ClipRight => "clipRight",
            Property::ClipBottom => "clipBottom",
            Property::ClipLeft => "clipLeft",
            Property::Blur => "blur",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of properties, one bit per [`Property`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PropertySet {
    bits: u16,
}

impl PropertySet {
    pub const EMPTY: PropertySet = PropertySet { bits: 0 };

    pub const fn from_bits(bits: u16) -> Self {
        Self { bits }
    }

    pub const fn bits(&self) -> u16 {
        self.bits
    }

    pub fn insert(&mut self, property: Property) {
        self.bits |= 1 << property.index();
    }

    pub fn remove(&mut self, property: Property) {
        self.bits &= !(1 << property.index());
    }

    pub const fn contains(&self, property: Property) -> bool {
        self.bits & (1 << property.index()) != 0
    }

    pub const fn union(self, other: PropertySet) -> PropertySet {
        PropertySet {
            bits: self.bits | other.bits,
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub const fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = Property> {
        Property::ALL.into_iter().filter(move |p| self.contains(*p))
    }
}

impl FromIterator<Property> for PropertySet {
    fn from_iter<I: IntoIterator<Item = Property>>(iter: I) -> Self {
        let mut set = PropertySet::EMPTY;
        for property in iter {
            set.insert(property);
        }
        set
    }
}

/// Full visual state of one target
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformState {
    values: [f32; Property::COUNT],
}

impl TransformState {
    pub const IDENTITY: TransformState = TransformState {
        values: [
            0.0, 0.0, 0.0, // translate
            0.0, 0.0, 0.0, // rotate
            1.0, 1.0, // scale
            1.0, // opacity
            0.0, 0.0, 0.0, 0.0, // clip inset
            0.0, // blur
        ],
    };

    pub fn get(&self, property: Property) -> f32 {
        self.values[property.index()]
    }

    pub fn set(&mut self, property: Property, value: f32) {
        self.values[property.index()] = value;
    }

    /// Builder: set one property
    pub fn with(mut self, property: Property, value: f32) -> Self {
        self.set(property, value);
        self
    }

    pub fn opacity(&self) -> f32 {
        self.get(Property::Opacity)
    }

    pub fn translate(&self) -> (f32, f32) {
        (self.get(Property::TranslateX), self.get(Property::TranslateY))
    }

    pub fn scale(&self) -> (f32, f32) {
        (self.get(Property::ScaleX), self.get(Property::ScaleY))
    }

    pub fn rotation(&self) -> (f32, f32, f32) {
        (
            self.get(Property::RotateX),
            self.get(Property::RotateY),
            self.get(Property::RotateZ),
        )
    }

    /// Clip inset [top%, right%, bottom%, left%]
    pub fn clip_inset(&self) -> [f32; 4] {
        [
            self.get(Property::ClipTop),
            self.get(Property::ClipRight),
            self.get(Property::ClipBottom),
            self.get(Property::ClipLeft),
        ]
    }
}

impl Default for TransformState {
    fn default() -> Self {
        Self::IDENTITY
    }
}

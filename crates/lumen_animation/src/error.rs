//! Animation error types

use lumen_core::TargetId;
use thiserror::Error;

/// Errors raised while configuring animations.
///
/// Everything here is reported at registration time. Runtime transience such
/// as a target removed mid-animation never surfaces as an error.
#[derive(Error, Debug)]
pub enum AnimationError {
    /// A relative position was used with no previous entry to anchor to
    #[error("Relative position {offset} has no previous entry to anchor to")]
    RelativeWithoutAnchor { offset: f32 },

    /// A position resolved to a start time before zero
    #[error("Entry resolves to negative start time {start}")]
    NegativeStart { start: f32 },

    /// Duration is negative or not finite
    #[error("Invalid duration: {0}")]
    InvalidDuration(f32),

    /// Delay is negative or not finite
    #[error("Invalid delay: {0}")]
    InvalidDelay(f32),

    /// A tween that animates no properties
    #[error("Tween on {0:?} animates no properties")]
    EmptyTween(TargetId),

    /// Stagger expansion over an empty target set
    #[error("Stagger requires at least one target")]
    EmptyStagger,

    /// Scroll trigger element has no layout bounds
    #[error("Scroll trigger {0:?} not found in layout")]
    TriggerNotFound(TargetId),

    /// Target is not registered with the scheduler
    #[error("Unknown target: {0:?}")]
    UnknownTarget(TargetId),

    /// Scrubbed binding without an end point
    #[error("Scrubbed scroll binding requires an end point")]
    ScrubWithoutEnd,

    /// Pinned binding without an end point
    #[error("Pinned scroll binding requires an end point")]
    PinWithoutEnd,

    /// Tracked element on a binding that plays instead of scrubbing
    #[error("Tracked scroll binding must scrub")]
    TrackWithoutScrub,

    /// Smoothing lag is negative or not finite
    #[error("Invalid scrub lag: {0}")]
    InvalidLag(f32),

    /// Timeline position string could not be parsed
    #[error("Invalid timeline position: `{0}`")]
    InvalidPosition(String),

    /// Scroll edge string could not be parsed
    #[error("Invalid scroll edge: `{0}`")]
    InvalidScrollEdge(String),

    /// Easing name could not be parsed
    #[error("Unknown easing: `{0}`")]
    UnknownEasing(String),

    /// Particle field configuration is out of range
    #[error("Invalid particle field: {0}")]
    InvalidParticleField(String),

    /// Timeline is not registered in this context
    #[error("Timeline is not owned by this context")]
    UnknownTimeline,

    /// Pointer stream is not registered in this context
    #[error("Pointer stream is not owned by this context")]
    UnknownPointerStream,

    /// Context call made from inside a scheduler callback
    #[error("Scheduler is busy running a callback")]
    SchedulerBusy,

    /// Context was disposed or its scheduler dropped
    #[error("Context has been disposed")]
    ContextDisposed,

    /// Motion config failed to parse
    #[error("Failed to parse motion config: {0}")]
    Config(#[from] toml::de::Error),

    /// Motion config failed to serialize
    #[error("Failed to serialize motion config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Motion config failed to load
    #[error("Failed to read motion config: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for animation operations
pub type Result<T> = std::result::Result<T, AnimationError>;

//! Lumen Animation System
//!
//! Scroll- and pointer-driven motion orchestration.
//!
//! # Features
//!
//! - **Timelines**: Sequenced tweens with relative positions, repeats, stagger and callbacks
//! - **Scroll Bindings**: Play-once and toggled reveals, scrubbed and smoothed progress, pinning
//! - **Pointer Tracking**: Smoothed follow, magnetic and tilt subscriptions
//! - **Frame Stepping**: Per-context clocks driving callbacks and particle fields
//! - **Contexts**: Scoped registration with one-step dispose and revert

pub mod config;
pub mod context;
pub mod easing;
pub mod error;
pub mod particles;
pub mod pointer;
pub mod presets;
pub mod props;
pub mod scheduler;
pub mod scroll;
pub mod stagger;
pub mod stepper;
pub mod text;
pub mod timeline;
pub mod tween;

pub use config::MotionConfig;
pub use context::{Context, ContextOptions, PageLifecycle};
pub use easing::Easing;
pub use error::{AnimationError, Result};
pub use particles::{Intensity, ParticleField, ParticleFieldConfig};
pub use pointer::{
    HoverRegionId, PointerMapping, PointerSample, PointerSource, PointerStreamId,
    PointerSubscription, PointerSubscriptionId, PointerTracker,
};
pub use presets::MotionPreset;
pub use props::TransformProps;
pub use scheduler::{DisposeReport, MotionScheduler, SchedulerHandle, SchedulerStats};
pub use scroll::{ScrollBindingId, ScrollEdge, ScrollEnd, ScrollMode, ScrollTrigger};
pub use stagger::{expand_stagger, Stagger, StaggerOrder};
pub use stepper::FrameCallbackId;
pub use timeline::{Position, Timeline, TimelineBuilder, TimelineId, TimelineState};
pub use tween::Tween;

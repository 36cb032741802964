//! Lumen Core
//!
//! Leaf types shared by the animation orchestration layer:
//!
//! - **Targets**: registered elements, their transform state, and per-property
//!   driver ownership with a per-scope revert journal
//! - **Geometry & Layout**: document-space bounds behind the [`LayoutProvider`] trait
//! - **Events**: pointer, scroll and resize input
//! - **Clocks**: explicit per-scope frame clocks

pub mod clock;
pub mod events;
pub mod geometry;
pub mod layout;
pub mod target;
pub mod transform;

pub use clock::{FrameClock, FrameTime};
pub use events::{event_types, Event, EventData, EventType};
pub use geometry::{Point, Rect, Size};
pub use layout::{LayoutProvider, StaticLayout};
pub use target::{Driver, DriverId, ScopeId, TargetId, TargetStore};
pub use transform::{Property, PropertySet, TransformState};

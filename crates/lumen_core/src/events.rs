//! Input events
//!
//! Hosts translate platform input into [`Event`] values and hand them to the
//! scheduler. Pointer coordinates are viewport (client) coordinates; scroll
//! events carry the absolute document scroll offset.

/// Event type identifier
pub type EventType = u32;

/// Event types the orchestration core reacts to
pub mod event_types {
    use super::EventType;

    pub const POINTER_MOVE: EventType = 3;
    /// Pointer entered the document
    pub const POINTER_ENTER: EventType = 4;
    /// Pointer left the document
    pub const POINTER_LEAVE: EventType = 5;
    pub const SCROLL: EventType = 30;
    pub const RESIZE: EventType = 40;
}

/// An input event with associated data
#[derive(Clone, Debug)]
pub struct Event {
    pub event_type: EventType,
    pub data: EventData,
    pub timestamp: u64,
}

/// Event-specific data
#[derive(Clone, Debug)]
pub enum EventData {
    Pointer { x: f32, y: f32 },
    Scroll { x: f32, y: f32 },
    Resize { width: f32, height: f32 },
    None,
}

impl Event {
    pub fn pointer_move(x: f32, y: f32) -> Self {
        Self::new(event_types::POINTER_MOVE, EventData::Pointer { x, y })
    }

    pub fn pointer_enter(x: f32, y: f32) -> Self {
        Self::new(event_types::POINTER_ENTER, EventData::Pointer { x, y })
    }

    pub fn pointer_leave() -> Self {
        Self::new(event_types::POINTER_LEAVE, EventData::None)
    }

    /// Document scrolled to an absolute offset
    pub fn scroll_to(x: f32, y: f32) -> Self {
        Self::new(event_types::SCROLL, EventData::Scroll { x, y })
    }

    pub fn resize(width: f32, height: f32) -> Self {
        Self::new(event_types::RESIZE, EventData::Resize { width, height })
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    fn new(event_type: EventType, data: EventData) -> Self {
        Self {
            event_type,
            data,
            timestamp: 0,
        }
    }
}

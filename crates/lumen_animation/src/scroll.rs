//! Scroll bindings
//!
//! A [`ScrollTrigger`] maps the document scroll offset onto a timeline. Its
//! start and end points come from edge pairs such as `"top 80%"` (the
//! element's top meets 80% of the viewport height), resolved against live
//! layout on every evaluation.
//!
//! Modes:
//! - **Once**: plays the timeline the first time the scroll offset reaches
//!   the start point, then never again
//! - **Toggle**: plays forward on crossing the start point downward and
//!   plays backward on crossing it upward
//! - **Scrub**: progress between start and end is the timeline's progress;
//!   the same scroll offset always renders the same state
//! - **SmoothScrub**: like scrub, but the applied progress eases toward the
//!   scroll progress with an exponential lag

use crate::error::{AnimationError, Result};
use crate::timeline::{Timeline, TimelineId};
use lumen_core::{Driver, LayoutProvider, Property, ScopeId, TargetId, TargetStore};
use slotmap::new_key_type;
use std::str::FromStr;

new_key_type! {
    pub struct ScrollBindingId;
}

/// Smoothed progress closer than this snaps to the target
const SETTLE_EPSILON: f32 = 1e-4;

/// A point along one axis of an element or the viewport
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Anchor {
    /// `top` / `left`
    Start,
    Center,
    /// `bottom` / `right`
    End,
    /// Percentage of the extent, stored as a fraction (`"80%"` is 0.8)
    Fraction(f32),
    /// Pixels from the start edge
    Pixels(f32),
}

impl Anchor {
    /// Offset from the start edge for an extent of `extent` pixels
    pub fn resolve(&self, extent: f32) -> f32 {
        match self {
            Anchor::Start => 0.0,
            Anchor::Center => extent / 2.0,
            Anchor::End => extent,
            Anchor::Fraction(f) => extent * f,
            Anchor::Pixels(px) => *px,
        }
    }
}

impl FromStr for Anchor {
    type Err = AnimationError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || AnimationError::InvalidScrollEdge(s.to_string());
        let s = s.trim();
        let anchor = match s {
            "top" | "left" => Anchor::Start,
            "center" => Anchor::Center,
            "bottom" | "right" => Anchor::End,
            _ => {
                if let Some(pct) = s.strip_suffix('%') {
                    let value: f32 = pct.parse().map_err(|_| invalid())?;
                    Anchor::Fraction(value / 100.0)
                } else {
                    let px = s.strip_suffix("px").unwrap_or(s);
                    Anchor::Pixels(px.parse().map_err(|_| invalid())?)
                }
            }
        };
        Ok(anchor)
    }
}

/// An element anchor paired with a viewport anchor
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollEdge {
    pub element: Anchor,
    pub viewport: Anchor,
}

impl ScrollEdge {
    pub const fn new(element: Anchor, viewport: Anchor) -> Self {
        Self { element, viewport }
    }

    /// Scroll offset at which the two anchors meet
    fn scroll_offset(&self, element_top: f32, element_height: f32, viewport_height: f32) -> f32 {
        element_top + self.element.resolve(element_height) - self.viewport.resolve(viewport_height)
    }
}

impl FromStr for ScrollEdge {
    type Err = AnimationError;

    /// `"top 80%"`, `"bottom top"`, `"center center"`; a single word uses the
    /// same anchor for both
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let element_part = parts
            .next()
            .ok_or_else(|| AnimationError::InvalidScrollEdge(s.to_string()))?;
        let element: Anchor = element_part.parse()?;
        let viewport: Anchor = match parts.next() {
            Some(part) => part.parse()?,
            None => element,
        };
        if parts.next().is_some() {
            return Err(AnimationError::InvalidScrollEdge(s.to_string()));
        }
        Ok(Self { element, viewport })
    }
}

/// Where a binding's active range ends
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScrollEnd {
    /// An edge pair on the trigger element
    Edge(ScrollEdge),
    /// A fixed number of pixels past the start (`"+=500"`)
    Distance(f32),
    /// As many pixels past the start as `content` overflows the viewport
    /// horizontally
    ContentOverflow { content: TargetId },
}

impl FromStr for ScrollEnd {
    type Err = AnimationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().strip_prefix("+=") {
            Some(distance) => distance
                .trim()
                .strip_suffix("px")
                .unwrap_or_else(|| distance.trim())
                .parse()
                .map(ScrollEnd::Distance)
                .map_err(|_| AnimationError::InvalidScrollEdge(s.to_string())),
            None => s.parse().map(ScrollEnd::Edge),
        }
    }
}

/// How scroll progress drives the timeline
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum ScrollMode {
    #[default]
    Once,
    /// Play on enter, reverse on leaving back above the start
    Toggle,
    Scrub,
    /// Seconds for the applied progress to close most of the gap
    SmoothScrub { lag: f32 },
}

/// Configuration for a scroll binding
#[derive(Clone, Debug, PartialEq)]
pub struct ScrollTrigger {
    pub trigger: TargetId,
    pub start: ScrollEdge,
    pub end: Option<ScrollEnd>,
    pub mode: ScrollMode,
    /// Element held in place while scrolling through the range
    pub pin: Option<TargetId>,
    /// Element translated left by progress times its horizontal overflow
    pub track: Option<TargetId>,
    /// Render the timeline's initial state at registration
    pub immediate_render: bool,
}

impl ScrollTrigger {
    /// Play when `trigger` reaches `start`, reverse when scrolled back above it
    pub fn toggle(trigger: TargetId, start: ScrollEdge) -> Self {
        Self::once(trigger, start).with_mode(ScrollMode::Toggle)
    }

    /// Play once when `trigger` reaches `start`
    pub fn once(trigger: TargetId, start: ScrollEdge) -> Self {
        Self {
            trigger,
            start,
            end: None,
            mode: ScrollMode::Once,
            pin: None,
            track: None,
            immediate_render: true,
        }
    }

    /// Map the range between `start` and `end` onto timeline progress
    pub fn scrub(trigger: TargetId, start: ScrollEdge, end: ScrollEnd) -> Self {
        Self {
            end: Some(end),
            mode: ScrollMode::Scrub,
            ..Self::once(trigger, start)
        }
    }

    /// Pinned horizontal strip: scrolling vertically through the section
    /// slides `track` left until its overflow is used up
    pub fn horizontal_strip(section: TargetId, track: TargetId) -> Self {
        Self::scrub(
            section,
            ScrollEdge::new(Anchor::Start, Anchor::Start),
            ScrollEnd::ContentOverflow { content: track },
        )
        .pinned(section)
        .with_track(track)
    }

    pub fn with_end(mut self, end: ScrollEnd) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_mode(mut self, mode: ScrollMode) -> Self {
        self.mode = mode;
        self
    }

    /// Smooth the scrub with `lag` seconds of catch-up
    pub fn smooth(self, lag: f32) -> Self {
        self.with_mode(ScrollMode::SmoothScrub { lag })
    }

    pub fn pinned(mut self, element: TargetId) -> Self {
        self.pin = Some(element);
        self
    }

    pub fn with_track(mut self, track: TargetId) -> Self {
        self.track = Some(track);
        self
    }

    pub fn immediate_render(mut self, enabled: bool) -> Self {
        self.immediate_render = enabled;
        self
    }

    /// Check the configuration against the current layout
    pub fn validate(&self, layout: &dyn LayoutProvider) -> Result<()> {
        if layout.bounds(self.trigger).is_none() {
            return Err(AnimationError::TriggerNotFound(self.trigger));
        }
        if let Some(ScrollEnd::ContentOverflow { content }) = self.end {
            if layout.content_size(content).is_none() {
                return Err(AnimationError::TriggerNotFound(content));
            }
        }
        match self.mode {
            ScrollMode::Once | ScrollMode::Toggle => {
                // Playback runs on the clock, so nothing can follow scroll
                if self.track.is_some() {
                    return Err(AnimationError::TrackWithoutScrub);
                }
            }
            ScrollMode::Scrub if self.end.is_none() => return Err(AnimationError::ScrubWithoutEnd),
            ScrollMode::Scrub => {}
            ScrollMode::SmoothScrub { lag } => {
                if !lag.is_finite() || lag < 0.0 {
                    return Err(AnimationError::InvalidLag(lag));
                }
                if self.end.is_none() {
                    return Err(AnimationError::ScrubWithoutEnd);
                }
            }
        }
        if self.pin.is_some() && self.end.is_none() {
            return Err(AnimationError::PinWithoutEnd);
        }
        if self.track.is_some() && self.end.is_none() {
            return Err(AnimationError::ScrubWithoutEnd);
        }
        Ok(())
    }

    /// Resolve the active range from current layout.
    ///
    /// Returns `None` when the trigger has no bounds right now.
    pub fn range(&self, layout: &dyn LayoutProvider) -> Option<ScrollRange> {
        let bounds = layout.bounds(self.trigger)?;
        let viewport = layout.viewport();
        let start = self
            .start
            .scroll_offset(bounds.y(), bounds.height(), viewport.height);
        let end = match self.end {
            None => start,
            Some(ScrollEnd::Edge(edge)) => {
                edge.scroll_offset(bounds.y(), bounds.height(), viewport.height)
            }
            Some(ScrollEnd::Distance(distance)) => start + distance,
            Some(ScrollEnd::ContentOverflow { content }) => {
                start + content_overflow(layout, content)?
            }
        };
        Some(ScrollRange { start, end })
    }
}

/// Horizontal overflow of `content` past the viewport width
fn content_overflow(layout: &dyn LayoutProvider, content: TargetId) -> Option<f32> {
    let size = layout.content_size(content)?;
    Some((size.width - layout.viewport().width).max(0.0))
}

/// Resolved scroll offsets of a binding's active range
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollRange {
    pub start: f32,
    pub end: f32,
}

impl ScrollRange {
    pub fn length(&self) -> f32 {
        (self.end - self.start).max(0.0)
    }

    /// Progress in `[0, 1]`, monotonic in `scroll`.
    ///
    /// An empty range jumps from 0 to 1 at its start.
    pub fn progress(&self, scroll: f32) -> f32 {
        let length = self.length();
        if length <= f32::EPSILON {
            return if scroll >= self.start { 1.0 } else { 0.0 };
        }
        ((scroll - self.start) / length).clamp(0.0, 1.0)
    }
}

/// Result of evaluating one binding
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollOutcome {
    /// A once binding fired during this evaluation
    pub triggered: bool,
    /// Smoothed progress has not caught up yet
    pub settling: bool,
}

/// A registered scroll binding
pub struct ScrollBinding {
    scope: ScopeId,
    trigger: ScrollTrigger,
    timeline: TimelineId,
    /// Writes the pin offset and the track offset
    driver: Driver,
    triggered: bool,
    smoothed: Option<f32>,
    last_range: Option<ScrollRange>,
}

impl ScrollBinding {
    /// Create a binding, claiming the pinned and tracked properties
    pub fn new(
        scope: ScopeId,
        trigger: ScrollTrigger,
        timeline: TimelineId,
        driver: Driver,
        store: &mut TargetStore,
    ) -> Result<Self> {
        for element in [trigger.pin, trigger.track].into_iter().flatten() {
            if !store.contains(element) {
                return Err(AnimationError::UnknownTarget(element));
            }
        }
        if let Some(pin) = trigger.pin {
            store.claim(driver, pin, Property::TranslateY);
        }
        if let Some(track) = trigger.track {
            store.claim(driver, track, Property::TranslateX);
        }
        Ok(Self {
            scope,
            trigger,
            timeline,
            driver,
            triggered: false,
            smoothed: None,
            last_range: None,
        })
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn timeline(&self) -> TimelineId {
        self.timeline
    }

    pub fn trigger(&self) -> &ScrollTrigger {
        &self.trigger
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    /// Range used by the most recent evaluation
    pub fn last_range(&self) -> Option<ScrollRange> {
        self.last_range
    }

    /// Pixels of scroll the pinned element stays in place for
    pub fn pin_spacing(&self) -> Option<f32> {
        self.trigger.pin?;
        self.last_range.map(|r| r.length())
    }

    /// Progress currently applied to the timeline
    pub fn applied_progress(&self) -> Option<f32> {
        self.smoothed
    }

    /// Render the timeline's initial state if the trigger asks for it
    pub fn render_initial(&mut self, timeline: &mut Timeline, store: &mut TargetStore) {
        let played = matches!(self.trigger.mode, ScrollMode::Once | ScrollMode::Toggle);
        if self.trigger.immediate_render && played {
            timeline.seek(store, 0.0);
        }
    }

    /// Recompute geometry, then drive the timeline, pin and track.
    ///
    /// A trigger without bounds is skipped for this evaluation.
    pub fn evaluate(
        &mut self,
        scroll: f32,
        dt: f32,
        layout: &dyn LayoutProvider,
        timeline: &mut Timeline,
        store: &mut TargetStore,
    ) -> ScrollOutcome {
        let mut outcome = ScrollOutcome::default();
        let Some(range) = self.trigger.range(layout) else {
            tracing::trace!(
                trigger = ?self.trigger.trigger,
                "scroll trigger has no bounds, skipping"
            );
            return outcome;
        };
        self.last_range = Some(range);
        let progress = range.progress(scroll);

        let applied = match self.trigger.mode {
            ScrollMode::Once => {
                if !self.triggered && scroll >= range.start {
                    self.triggered = true;
                    outcome.triggered = true;
                    tracing::debug!(
                        trigger = ?self.trigger.trigger,
                        scroll,
                        "once binding triggered"
                    );
                    timeline.play(store);
                }
                progress
            }
            ScrollMode::Toggle => {
                if !self.triggered && scroll >= range.start {
                    self.triggered = true;
                    outcome.triggered = !timeline.is_reversing();
                    tracing::debug!(
                        trigger = ?self.trigger.trigger,
                        scroll,
                        "toggle binding entered"
                    );
                    timeline.play(store);
                } else if self.triggered && scroll < range.start {
                    self.triggered = false;
                    tracing::debug!(
                        trigger = ?self.trigger.trigger,
                        scroll,
                        "toggle binding left back"
                    );
                    timeline.reverse(store);
                }
                progress
            }
            ScrollMode::Scrub => {
                timeline.set_progress(store, progress);
                progress
            }
            ScrollMode::SmoothScrub { lag } => {
                let current = self.smoothed.unwrap_or(progress);
                let mut next = if lag <= f32::EPSILON {
                    progress
                } else {
                    current + (progress - current) * (1.0 - (-dt / lag).exp())
                };
                if (next - progress).abs() < SETTLE_EPSILON {
                    next = progress;
                }
                outcome.settling = next != progress;
                timeline.set_progress(store, next);
                next
            }
        };
        self.smoothed = Some(applied);

        if let Some(pin) = self.trigger.pin {
            let offset = (scroll - range.start).clamp(0.0, range.length());
            store.write(self.driver, pin, Property::TranslateY, offset);
        }
        if let Some(track) = self.trigger.track {
            if let Some(overflow) = content_overflow(layout, track) {
                store.write(self.driver, track, Property::TranslateX, -overflow * applied);
            }
        }
        outcome
    }

    /// Release the pin and track properties
    pub fn release(&self, store: &mut TargetStore) {
        if let Some(pin) = self.trigger.pin {
            store.release(self.driver, pin, Property::TranslateY);
        }
        if let Some(track) = self.trigger.track {
            store.release(self.driver, track, Property::TranslateX);
        }
    }
}

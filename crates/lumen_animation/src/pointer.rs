//! Pointer tracking and smoothing subscriptions
//!
//! A pointer stream reports positions relative to a source (the window or
//! one element). Subscriptions on a stream map each sample to property
//! targets and approach them with their own duration and easing, so several
//! subscriptions on one stream trail the pointer at different speeds and
//! still converge on the same point once it stops.
//!
//! Input handling only records state. Retargeting and writes happen in
//! [`PointerTracker::frame`], always from the most recent sample.

use crate::easing::Easing;
use crate::error::{AnimationError, Result};
use lumen_core::{
    Driver, LayoutProvider, Point, Property, PropertySet, Rect, ScopeId, TargetId, TargetStore,
};
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

new_key_type! {
    pub struct PointerStreamId;
    pub struct PointerSubscriptionId;
    pub struct HoverRegionId;
}

/// What pointer coordinates are measured against
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerSource {
    Window,
    Element(TargetId),
}

/// A pointer position within a source
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerSample {
    /// Pixels from the source's left edge
    pub x: f32,
    /// Pixels from the source's top edge
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PointerSample {
    /// Offset from the source's center in pixels
    pub fn from_center(&self) -> (f32, f32) {
        (self.x - self.width / 2.0, self.y - self.height / 2.0)
    }

    /// Offset from the center as a fraction of the size, in `[-0.5, 0.5]`
    pub fn normalized(&self) -> (f32, f32) {
        let nx = if self.width > 0.0 { self.x / self.width - 0.5 } else { 0.0 };
        let ny = if self.height > 0.0 { self.y / self.height - 0.5 } else { 0.0 };
        (nx, ny)
    }
}

/// How a sample becomes property targets
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerMapping {
    /// Translate to the pointer position plus an offset
    Follow { offset: Point },
    /// Translate toward the pointer by a fraction of its offset from center
    Magnetic { strength: f32 },
    /// Rotate by `degrees` per unit of normalized offset
    Tilt { degrees: f32 },
}

impl PointerMapping {
    /// Element-relative mappings only act while the pointer is inside the
    /// source, and return to rest when it leaves
    pub fn is_element_relative(&self) -> bool {
        !matches!(self, PointerMapping::Follow { .. })
    }

    pub fn properties(&self) -> [Property; 2] {
        match self {
            PointerMapping::Follow { .. } | PointerMapping::Magnetic { .. } => {
                [Property::TranslateX, Property::TranslateY]
            }
            PointerMapping::Tilt { .. } => [Property::RotateY, Property::RotateX],
        }
    }

    pub fn map(&self, sample: &PointerSample) -> [(Property, f32); 2] {
        match self {
            PointerMapping::Follow { offset } => [
                (Property::TranslateX, sample.x + offset.x),
                (Property::TranslateY, sample.y + offset.y),
            ],
            PointerMapping::Magnetic { strength } => {
                let (dx, dy) = sample.from_center();
                [
                    (Property::TranslateX, dx * strength),
                    (Property::TranslateY, dy * strength),
                ]
            }
            PointerMapping::Tilt { degrees } => {
                let (nx, ny) = sample.normalized();
                [(Property::RotateY, nx * degrees), (Property::RotateX, -ny * degrees)]
            }
        }
    }
}

/// Smoothing used to return to rest
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LeaveBehavior {
    pub duration: f32,
    pub ease: Easing,
}

/// Scale change while any hover region is under the pointer
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HoverResponse {
    pub scale: f32,
    pub duration: f32,
    pub ease: Easing,
}

/// A smoothed mapping from a pointer stream onto one target
#[derive(Clone, Debug, PartialEq)]
pub struct PointerSubscription {
    pub target: TargetId,
    pub mapping: PointerMapping,
    pub duration: f32,
    pub ease: Easing,
    pub leave: Option<LeaveBehavior>,
    pub hover: Option<HoverResponse>,
    /// Set opacity to 0 while the pointer is outside the document
    pub hide_on_document_leave: bool,
}

impl PointerSubscription {
    pub fn new(target: TargetId, mapping: PointerMapping, duration: f32) -> Self {
        Self {
            target,
            mapping,
            duration,
            ease: Easing::EaseOutCubic,
            leave: None,
            hover: None,
            hide_on_document_leave: false,
        }
    }

    /// Follow the pointer with the target's origin at the pointer
    pub fn follow(target: TargetId, duration: f32) -> Self {
        Self::new(target, PointerMapping::Follow { offset: Point::ZERO }, duration)
    }

    pub fn magnetic(target: TargetId, strength: f32, duration: f32) -> Self {
        Self::new(target, PointerMapping::Magnetic { strength }, duration)
    }

    pub fn tilt(target: TargetId, degrees: f32, duration: f32) -> Self {
        Self::new(target, PointerMapping::Tilt { degrees }, duration)
    }

    pub fn ease(mut self, ease: Easing) -> Self {
        self.ease = ease;
        self
    }

    /// Shift a follow mapping, e.g. to center the target on the pointer
    pub fn with_offset(mut self, x: f32, y: f32) -> Self {
        if let PointerMapping::Follow { offset } = &mut self.mapping {
            *offset = Point::new(x, y);
        }
        self
    }

    pub fn on_leave(mut self, duration: f32, ease: Easing) -> Self {
        self.leave = Some(LeaveBehavior { duration, ease });
        self
    }

    pub fn on_hover(mut self, scale: f32, duration: f32, ease: Easing) -> Self {
        self.hover = Some(HoverResponse { scale, duration, ease });
        self
    }

    pub fn hide_on_document_leave(mut self) -> Self {
        self.hide_on_document_leave = true;
        self
    }

    /// Every property this subscription writes
    pub fn properties(&self) -> PropertySet {
        let mut set: PropertySet = self.mapping.properties().into_iter().collect();
        if self.hover.is_some() {
            set.insert(Property::ScaleX);
            set.insert(Property::ScaleY);
        }
        if self.hide_on_document_leave {
            set.insert(Property::Opacity);
        }
        set
    }

    fn validate(&self) -> Result<()> {
        let durations = [
            Some(self.duration),
            self.leave.map(|l| l.duration),
            self.hover.map(|h| h.duration),
        ];
        for duration in durations.into_iter().flatten() {
            if !duration.is_finite() || duration < 0.0 {
                return Err(AnimationError::InvalidDuration(duration));
            }
        }
        Ok(())
    }
}

/// Retargetable tween on one property
#[derive(Clone, Copy, Debug)]
struct Channel {
    property: Property,
    from: f32,
    to: f32,
    current: f32,
    elapsed: f32,
    duration: f32,
    ease: Easing,
    active: bool,
}

impl Channel {
    fn new(property: Property, current: f32) -> Self {
        Self {
            property,
            from: current,
            to: current,
            current,
            elapsed: 0.0,
            duration: 0.0,
            ease: Easing::Linear,
            active: false,
        }
    }

    /// Restart toward `to` from wherever the channel is now
    fn retarget(&mut self, to: f32, duration: f32, ease: Easing) {
        self.from = self.current;
        self.to = to;
        self.elapsed = 0.0;
        self.duration = duration;
        self.ease = ease;
        self.active = true;
    }

    fn step(&mut self, dt: f32) -> Option<f32> {
        if !self.active {
            return None;
        }
        self.elapsed += dt;
        let progress = if self.duration <= f32::EPSILON {
            1.0
        } else {
            (self.elapsed / self.duration).min(1.0)
        };
        if progress >= 1.0 {
            self.current = self.to;
            self.active = false;
        } else {
            self.current = self.from + (self.to - self.from) * self.ease.apply(progress);
        }
        Some(self.current)
    }
}

type SampleCallback = Box<dyn FnMut(&PointerSample)>;

struct PointerStream {
    scope: ScopeId,
    source: PointerSource,
    on_sample: SampleCallback,
    latest: Option<PointerSample>,
    pending: bool,
    inside: bool,
    left: bool,
}

struct ActiveSubscription {
    scope: ScopeId,
    stream: PointerStreamId,
    driver: Driver,
    config: PointerSubscription,
    channels: SmallVec<[Channel; 4]>,
    /// Opacity before a document leave hid the target
    shown_opacity: Option<f32>,
}

impl ActiveSubscription {
    fn channel(&mut self, property: Property) -> Option<&mut Channel> {
        self.channels.iter_mut().find(|c| c.property == property)
    }
}

struct HoverRegion {
    scope: ScopeId,
    target: TargetId,
}

/// Per-stream flags captured at the start of a frame
#[derive(Clone, Copy)]
struct StreamSnapshot {
    sample: Option<PointerSample>,
    inside: bool,
    left: bool,
}

/// Counts of what a scope removal tore down
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PointerRemoval {
    pub streams: usize,
    pub subscriptions: usize,
    pub hover_regions: usize,
}

/// Owner of every pointer stream, subscription and hover region
pub struct PointerTracker {
    streams: SlotMap<PointerStreamId, PointerStream>,
    subscriptions: SlotMap<PointerSubscriptionId, ActiveSubscription>,
    hover_regions: SlotMap<HoverRegionId, HoverRegion>,
    position: Option<Point>,
    document_inside: bool,
    visibility_dirty: bool,
    hovering: bool,
    hover_dirty: bool,
}

impl Default for PointerTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PointerTracker {
    pub fn new() -> Self {
        Self {
            streams: SlotMap::with_key(),
            subscriptions: SlotMap::with_key(),
            hover_regions: SlotMap::with_key(),
            position: None,
            document_inside: true,
            visibility_dirty: false,
            hovering: false,
            hover_dirty: false,
        }
    }

    /// Last pointer position in viewport coordinates
    pub fn position(&self) -> Option<Point> {
        self.position
    }

    pub fn is_document_inside(&self) -> bool {
        self.document_inside
    }

    pub fn is_hovering(&self) -> bool {
        self.hovering
    }

    /// Whether the pointer is currently inside a stream's source
    pub fn is_inside(&self, stream: PointerStreamId) -> bool {
        self.streams.get(stream).is_some_and(|s| s.inside)
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn hover_region_count(&self) -> usize {
        self.hover_regions.len()
    }

    pub fn stream_scope(&self, stream: PointerStreamId) -> Option<ScopeId> {
        self.streams.get(stream).map(|s| s.scope)
    }

    pub fn subscription_scope(&self, id: PointerSubscriptionId) -> Option<ScopeId> {
        self.subscriptions.get(id).map(|s| s.scope)
    }

    pub fn hover_scope(&self, id: HoverRegionId) -> Option<ScopeId> {
        self.hover_regions.get(id).map(|h| h.scope)
    }

    pub fn add_stream(
        &mut self,
        scope: ScopeId,
        source: PointerSource,
        on_sample: impl FnMut(&PointerSample) + 'static,
    ) -> PointerStreamId {
        self.streams.insert(PointerStream {
            scope,
            source,
            on_sample: Box::new(on_sample),
            latest: None,
            pending: false,
            inside: false,
            left: false,
        })
    }

    /// Remove a stream and every subscription on it
    pub fn remove_stream(&mut self, id: PointerStreamId, store: &mut TargetStore) -> Option<usize> {
        self.streams.remove(id)?;
        let orphaned: Vec<PointerSubscriptionId> = self
            .subscriptions
            .iter()
            .filter(|(_, s)| s.stream == id)
            .map(|(sid, _)| sid)
            .collect();
        for sid in &orphaned {
            self.unsubscribe(*sid, store);
        }
        Some(orphaned.len())
    }

    /// Subscribe a target to a stream, claiming the properties it writes
    pub fn subscribe(
        &mut self,
        scope: ScopeId,
        stream: PointerStreamId,
        config: PointerSubscription,
        driver: Driver,
        store: &mut TargetStore,
    ) -> Result<PointerSubscriptionId> {
        if self.stream_scope(stream) != Some(scope) {
            return Err(AnimationError::UnknownPointerStream);
        }
        let Some(state) = store.state(config.target).copied() else {
            return Err(AnimationError::UnknownTarget(config.target));
        };
        config.validate()?;

        let mut channels = SmallVec::new();
        for property in config.mapping.properties() {
            channels.push(Channel::new(property, state.get(property)));
        }
        if config.hover.is_some() {
            channels.push(Channel::new(Property::ScaleX, state.get(Property::ScaleX)));
            channels.push(Channel::new(Property::ScaleY, state.get(Property::ScaleY)));
        }
        for property in config.properties().iter() {
            store.claim(driver, config.target, property);
        }

        Ok(self.subscriptions.insert(ActiveSubscription {
            scope,
            stream,
            driver,
            config,
            channels,
            shown_opacity: None,
        }))
    }

    pub fn unsubscribe(&mut self, id: PointerSubscriptionId, store: &mut TargetStore) -> bool {
        let Some(sub) = self.subscriptions.remove(id) else {
            return false;
        };
        for property in sub.config.properties().iter() {
            store.release(sub.driver, sub.config.target, property);
        }
        true
    }

    /// Register an element whose hover changes hover responses
    pub fn add_hover(&mut self, scope: ScopeId, target: TargetId) -> HoverRegionId {
        self.hover_regions.insert(HoverRegion { scope, target })
    }

    pub fn remove_hover(&mut self, id: HoverRegionId) -> bool {
        self.hover_regions.remove(id).is_some()
    }

    /// Remove everything a scope registered
    pub fn remove_scope(&mut self, scope: ScopeId, store: &mut TargetStore) -> PointerRemoval {
        let mut removal = PointerRemoval::default();

        let subs: Vec<PointerSubscriptionId> = self
            .subscriptions
            .iter()
            .filter(|(_, s)| s.scope == scope)
            .map(|(id, _)| id)
            .collect();
        for id in subs {
            if self.unsubscribe(id, store) {
                removal.subscriptions += 1;
            }
        }

        let streams: Vec<PointerStreamId> = self
            .streams
            .iter()
            .filter(|(_, s)| s.scope == scope)
            .map(|(id, _)| id)
            .collect();
        for id in streams {
            if let Some(orphans) = self.remove_stream(id, store) {
                removal.streams += 1;
                removal.subscriptions += orphans;
            }
        }

        let before = self.hover_regions.len();
        self.hover_regions.retain(|_, h| h.scope != scope);
        removal.hover_regions = before - self.hover_regions.len();
        removal
    }

    /// Record a pointer move in viewport coordinates and notify streams
    pub fn on_move(&mut self, point: Point, layout: &dyn LayoutProvider, scroll: Point) {
        self.position = Some(point);
        if !self.document_inside {
            self.document_inside = true;
            self.visibility_dirty = true;
        }

        let viewport = layout.viewport();
        for stream in self.streams.values_mut() {
            let rect = match stream.source {
                PointerSource::Window => Rect::new(0.0, 0.0, viewport.width, viewport.height),
                PointerSource::Element(id) => match layout.bounds(id) {
                    Some(bounds) => bounds.to_viewport(scroll),
                    None => {
                        if stream.inside {
                            stream.inside = false;
                            stream.left = true;
                        }
                        continue;
                    }
                },
            };

            let inside = rect.contains(point);
            if inside {
                let local = rect.local(point);
                let sample = PointerSample {
                    x: local.x,
                    y: local.y,
                    width: rect.width(),
                    height: rect.height(),
                };
                stream.latest = Some(sample);
                stream.pending = true;
                (stream.on_sample)(&sample);
            } else if stream.inside {
                stream.left = true;
            }
            stream.inside = inside;
        }

        let hovering = self.hover_regions.values().any(|region| {
            layout
                .bounds(region.target)
                .is_some_and(|b| b.to_viewport(scroll).contains(point))
        });
        self.set_hovering(hovering);
    }

    /// Pointer left the document
    pub fn on_document_leave(&mut self) {
        if self.document_inside {
            self.document_inside = false;
            self.visibility_dirty = true;
        }
        for stream in self.streams.values_mut() {
            if stream.inside {
                stream.inside = false;
                stream.left = true;
            }
        }
        self.set_hovering(false);
    }

    /// Pointer re-entered the document
    pub fn on_document_enter(&mut self) {
        if !self.document_inside {
            self.document_inside = true;
            self.visibility_dirty = true;
        }
    }

    fn set_hovering(&mut self, hovering: bool) {
        if hovering != self.hovering {
            self.hovering = hovering;
            self.hover_dirty = true;
        }
    }

    /// Retarget from pending input, then step and write every subscription.
    ///
    /// `delta_for` gives each scope's frame delta, or `None` for a scope
    /// that no longer exists.
    pub fn frame(&mut self, store: &mut TargetStore, delta_for: impl Fn(ScopeId) -> Option<f32>) {
        // Visibility applies before any sample
        if self.visibility_dirty {
            for sub in self.subscriptions.values_mut() {
                if !sub.config.hide_on_document_leave {
                    continue;
                }
                let target = sub.config.target;
                let opacity = if self.document_inside {
                    sub.shown_opacity.take().unwrap_or(1.0)
                } else {
                    if sub.shown_opacity.is_none() {
                        sub.shown_opacity = store.value(target, Property::Opacity);
                    }
                    0.0
                };
                store.write(sub.driver, target, Property::Opacity, opacity);
            }
            self.visibility_dirty = false;
        }

        if self.hover_dirty {
            let hovering = self.hovering;
            for sub in self.subscriptions.values_mut() {
                let Some(hover) = sub.config.hover else {
                    continue;
                };
                let scale = if hovering { hover.scale } else { 1.0 };
                for property in [Property::ScaleX, Property::ScaleY] {
                    if let Some(channel) = sub.channel(property) {
                        channel.retarget(scale, hover.duration, hover.ease);
                    }
                }
            }
            self.hover_dirty = false;
        }

        let snapshots: Vec<(PointerStreamId, StreamSnapshot)> = self
            .streams
            .iter_mut()
            .map(|(id, stream)| {
                let snapshot = StreamSnapshot {
                    sample: if stream.pending { stream.latest } else { None },
                    inside: stream.inside,
                    left: stream.left,
                };
                stream.pending = false;
                stream.left = false;
                (id, snapshot)
            })
            .collect();

        for sub in self.subscriptions.values_mut() {
            let Some(dt) = delta_for(sub.scope) else {
                continue;
            };
            let Some((_, snapshot)) = snapshots.iter().find(|(id, _)| *id == sub.stream) else {
                continue;
            };
            let mapping = sub.config.mapping;
            let element_relative = mapping.is_element_relative();

            let releases = element_relative || sub.config.leave.is_some();
            if snapshot.left && !snapshot.inside && releases {
                let (duration, ease) = sub
                    .config
                    .leave
                    .map(|l| (l.duration, l.ease))
                    .unwrap_or((sub.config.duration, sub.config.ease));
                for property in mapping.properties() {
                    if let Some(channel) = sub.channel(property) {
                        channel.retarget(property.identity(), duration, ease);
                    }
                }
            }

            if let Some(sample) = snapshot.sample {
                if !element_relative || snapshot.inside {
                    let (duration, ease) = (sub.config.duration, sub.config.ease);
                    for (property, value) in mapping.map(&sample) {
                        if let Some(channel) = sub.channel(property) {
                            channel.retarget(value, duration, ease);
                        }
                    }
                }
            }

            let (driver, target) = (sub.driver, sub.config.target);
            for channel in sub.channels.iter_mut() {
                if let Some(value) = channel.step(dt) {
                    store.write(driver, target, channel.property, value);
                }
            }
        }
    }
}

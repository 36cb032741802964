//! Motion scheduler
//!
//! Owns the target store, every registered timeline, scroll binding,
//! pointer subscription and frame callback, and advances them once per
//! frame. Work is always registered through a [`Context`], which tags it
//! with the context's scope so it can be torn down together.
//!
//! One call to [`MotionScheduler::frame`] runs, in order: scope clocks,
//! scroll evaluation, timeline interpolation, pointer writes, frame
//! callbacks. Callbacks run while the scheduler is borrowed. Context calls
//! made from a callback fail with [`AnimationError::SchedulerBusy`], and a
//! context dropped from a callback is queued and disposed as soon as the
//! current phase ends.
//!
//! [`AnimationError::SchedulerBusy`]: crate::error::AnimationError::SchedulerBusy

use crate::config::MotionConfig;
use crate::context::{Context, ContextOptions};
use crate::error::Result;
use crate::pointer::PointerTracker;
use crate::scroll::{ScrollBinding, ScrollBindingId};
use crate::stepper::FrameStepper;
use crate::timeline::{Timeline, TimelineId, TimelineState};
use lumen_core::{
    event_types, Driver, Event, EventData, FrameClock, FrameTime, LayoutProvider, Point, Property,
    ScopeId, TargetId, TargetStore, TransformState,
};
use slotmap::SlotMap;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Scopes whose context was disposed while the scheduler was borrowed,
/// with their revert flag
pub(crate) type PendingDisposals = Rc<RefCell<Vec<(ScopeId, bool)>>>;

/// Per-context bookkeeping
pub(crate) struct ScopeState {
    pub(crate) label: String,
    pub(crate) clock: FrameClock,
    pub(crate) last: FrameTime,
    /// Driver for direct property sets
    pub(crate) setter: Driver,
}

pub(crate) struct ScopedTimeline {
    pub(crate) scope: ScopeId,
    pub(crate) timeline: Timeline,
    /// Removed from the scheduler once it completes
    pub(crate) transient: bool,
}

/// What disposing a context tore down
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DisposeReport {
    pub timelines: usize,
    pub bindings: usize,
    pub pointer_streams: usize,
    pub pointer_subscriptions: usize,
    pub hover_regions: usize,
    pub frame_callbacks: usize,
    /// Properties restored to their pre-context values
    pub reverted: usize,
}

/// Registry sizes, for hosts and diagnostics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub targets: usize,
    pub contexts: usize,
    pub timelines: usize,
    pub bindings: usize,
    pub pointer_streams: usize,
    pub pointer_subscriptions: usize,
    pub hover_regions: usize,
    pub frame_callbacks: usize,
}

pub(crate) struct SchedulerInner {
    pub(crate) store: TargetStore,
    pub(crate) layout: Box<dyn LayoutProvider>,
    pub(crate) config: MotionConfig,
    pub(crate) scopes: SlotMap<ScopeId, ScopeState>,
    pub(crate) timelines: SlotMap<TimelineId, ScopedTimeline>,
    pub(crate) bindings: SlotMap<ScrollBindingId, ScrollBinding>,
    pub(crate) pointer: PointerTracker,
    pub(crate) stepper: FrameStepper,
    pending: PendingDisposals,
    scroll: Point,
    scroll_dirty: bool,
    /// A smoothed scrub has not caught up yet
    settling: bool,
}

impl SchedulerInner {
    /// Dispose every queued scope. Disposal can drop callbacks that own
    /// contexts, which queue more scopes, so this runs until the queue is
    /// empty.
    pub(crate) fn drain_pending(&mut self) {
        loop {
            let queued = std::mem::take(&mut *self.pending.borrow_mut());
            if queued.is_empty() {
                return;
            }
            for (scope, revert) in queued {
                if self.scopes.contains_key(scope) {
                    self.dispose_scope(scope, revert);
                }
            }
        }
    }

    pub(crate) fn mark_scroll_dirty(&mut self) {
        self.scroll_dirty = true;
    }

    pub(crate) fn scope_owns_timeline(&self, scope: ScopeId, id: TimelineId) -> bool {
        self.timelines.get(id).is_some_and(|t| t.scope == scope)
    }

    /// Register a timeline under `scope`, attaching a fresh driver
    pub(crate) fn insert_timeline(
        &mut self,
        scope: ScopeId,
        mut timeline: Timeline,
        transient: bool,
    ) -> TimelineId {
        let driver = self.store.allocate_driver(scope);
        timeline.attach(driver);
        self.timelines.insert(ScopedTimeline {
            scope,
            timeline,
            transient,
        })
    }

    /// Kill and forget a timeline, leaving its targets where they are
    pub(crate) fn remove_timeline(&mut self, id: TimelineId) -> bool {
        match self.timelines.remove(id) {
            Some(mut entry) => {
                entry.timeline.kill(&mut self.store);
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove_binding(&mut self, id: ScrollBindingId) -> bool {
        let Some(binding) = self.bindings.remove(id) else {
            return false;
        };
        binding.release(&mut self.store);
        self.remove_timeline(binding.timeline());
        true
    }

    fn dispatch(&mut self, event: &Event) {
        match (event.event_type, &event.data) {
            (event_types::SCROLL, EventData::Scroll { x, y }) => {
                self.scroll = Point::new(*x, *y);
                self.scroll_dirty = true;
            }
            (event_types::RESIZE, _) => {
                self.scroll_dirty = true;
            }
            (event_types::POINTER_MOVE, EventData::Pointer { x, y }) => {
                self.pointer
                    .on_move(Point::new(*x, *y), self.layout.as_ref(), self.scroll);
            }
            (event_types::POINTER_ENTER, data) => {
                self.pointer.on_document_enter();
                if let EventData::Pointer { x, y } = data {
                    self.pointer
                        .on_move(Point::new(*x, *y), self.layout.as_ref(), self.scroll);
                }
            }
            (event_types::POINTER_LEAVE, _) => self.pointer.on_document_leave(),
            (event_type, _) => {
                tracing::trace!(event_type, "ignoring event");
            }
        }
    }

    fn frame(&mut self, dt: f32) {
        for scope in self.scopes.values_mut() {
            scope.last = scope.clock.advance(dt);
        }

        // Timelines started by a once binding render their first frame at t = 0
        let mut triggered: SmallVec<[TimelineId; 4]> = SmallVec::new();
        if self.scroll_dirty || self.settling {
            self.scroll_dirty = false;
            self.settling = false;
            let scroll = self.scroll.y;
            for binding in self.bindings.values_mut() {
                let Some(delta) = self.scopes.get(binding.scope()).map(|s| s.last.delta) else {
                    continue;
                };
                let Some(entry) = self.timelines.get_mut(binding.timeline()) else {
                    continue;
                };
                let outcome = binding.evaluate(
                    scroll,
                    delta,
                    self.layout.as_ref(),
                    &mut entry.timeline,
                    &mut self.store,
                );
                if outcome.triggered {
                    triggered.push(binding.timeline());
                }
                self.settling |= outcome.settling;
            }
        }

        self.drain_pending();

        let mut finished: SmallVec<[TimelineId; 4]> = SmallVec::new();
        for (id, entry) in self.timelines.iter_mut() {
            if triggered.contains(&id) {
                continue;
            }
            if let Some(scope) = self.scopes.get(entry.scope) {
                entry.timeline.advance(&mut self.store, scope.last.delta);
            }
            if entry.transient && entry.timeline.state() == TimelineState::Completed {
                finished.push(id);
            }
        }
        // Finished tweens leave their targets at the end values
        for id in finished {
            self.remove_timeline(id);
        }
        self.drain_pending();

        let scopes = &self.scopes;
        self.pointer
            .frame(&mut self.store, |scope| scopes.get(scope).map(|s| s.last.delta));
        self.drain_pending();

        let scopes = &self.scopes;
        self.stepper.step(|scope| scopes.get(scope).map(|s| s.last));
        self.drain_pending();
    }

    pub(crate) fn create_scope(&mut self, label: &str) -> ScopeId {
        let max_delta = self.config.frame.max_delta;
        let store = &mut self.store;
        let scope = self.scopes.insert_with_key(|key| ScopeState {
            label: label.to_string(),
            clock: FrameClock::new(max_delta),
            last: FrameTime::default(),
            setter: store.allocate_driver(key),
        });
        tracing::debug!(label, ?scope, "context created");
        scope
    }

    /// Tear down everything `scope` registered, then optionally revert the
    /// properties it wrote
    pub(crate) fn dispose_scope(&mut self, scope: ScopeId, revert: bool) -> DisposeReport {
        let mut report = DisposeReport::default();

        let timelines: Vec<TimelineId> = self
            .timelines
            .iter()
            .filter(|(_, t)| t.scope == scope)
            .map(|(id, _)| id)
            .collect();

        let bindings: Vec<ScrollBindingId> = self
            .bindings
            .iter()
            .filter(|(_, b)| b.scope() == scope)
            .map(|(id, _)| id)
            .collect();

        for id in timelines {
            if self.remove_timeline(id) {
                report.timelines += 1;
            }
        }
        for id in bindings {
            if let Some(binding) = self.bindings.remove(id) {
                binding.release(&mut self.store);
                report.bindings += 1;
            }
        }

        let pointer = self.pointer.remove_scope(scope, &mut self.store);
        report.pointer_streams = pointer.streams;
        report.pointer_subscriptions = pointer.subscriptions;
        report.hover_regions = pointer.hover_regions;
        report.frame_callbacks = self.stepper.unregister_scope(scope);

        if revert {
            report.reverted = self.store.revert_scope(scope);
        } else {
            self.store.forget_scope(scope);
        }
        self.store.release_scope(scope);

        let label = self.scopes.remove(scope).map(|s| s.label).unwrap_or_default();
        tracing::debug!(
            label = %label,
            timelines = report.timelines,
            bindings = report.bindings,
            subscriptions = report.pointer_subscriptions,
            callbacks = report.frame_callbacks,
            reverted = report.reverted,
            "context disposed"
        );
        report
    }

    fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            targets: self.store.len(),
            contexts: self.scopes.len(),
            timelines: self.timelines.len(),
            bindings: self.bindings.len(),
            pointer_streams: self.pointer.stream_count(),
            pointer_subscriptions: self.pointer.subscription_count(),
            hover_regions: self.pointer.hover_region_count(),
            frame_callbacks: self.stepper.len(),
        }
    }
}

/// Weak reference to a scheduler, held by contexts
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Weak<RefCell<SchedulerInner>>,
    pending: Weak<RefCell<Vec<(ScopeId, bool)>>>,
}

impl SchedulerHandle {
    pub(crate) fn upgrade(&self) -> Option<Rc<RefCell<SchedulerInner>>> {
        self.inner.upgrade()
    }

    /// Queue `scope` for disposal once the scheduler is free
    pub(crate) fn defer_dispose(&self, scope: ScopeId, revert: bool) -> bool {
        match self.pending.upgrade() {
            Some(pending) => {
                pending.borrow_mut().push((scope, revert));
                true
            }
            None => false,
        }
    }

    /// Whether the scheduler is still alive
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

/// The orchestration root a host drives with input events and frame deltas
pub struct MotionScheduler {
    inner: Rc<RefCell<SchedulerInner>>,
    pending: PendingDisposals,
}

impl MotionScheduler {
    pub fn new(layout: impl LayoutProvider + 'static) -> Self {
        Self::with_config(layout, MotionConfig::default())
    }

    pub fn with_config(layout: impl LayoutProvider + 'static, config: MotionConfig) -> Self {
        let pending = PendingDisposals::default();
        Self {
            inner: Rc::new(RefCell::new(SchedulerInner {
                store: TargetStore::new(),
                layout: Box::new(layout),
                config,
                scopes: SlotMap::with_key(),
                timelines: SlotMap::with_key(),
                bindings: SlotMap::with_key(),
                pointer: PointerTracker::new(),
                stepper: FrameStepper::new(),
                pending: pending.clone(),
                scroll: Point::ZERO,
                scroll_dirty: false,
                settling: false,
            })),
            pending,
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            inner: Rc::downgrade(&self.inner),
            pending: Rc::downgrade(&self.pending),
        }
    }

    pub fn config(&self) -> MotionConfig {
        self.inner.borrow().config.clone()
    }

    /// Register an animatable element
    pub fn add_target(&self, label: impl Into<String>, state: TransformState) -> TargetId {
        self.inner.borrow_mut().store.insert(label, state)
    }

    /// Unmount an element. Drivers still pointing at it drop their writes.
    pub fn remove_target(&self, id: TargetId) -> Option<TransformState> {
        self.inner.borrow_mut().store.remove(id)
    }

    pub fn target(&self, id: TargetId) -> Option<TransformState> {
        self.inner.borrow().store.state(id).copied()
    }

    pub fn value(&self, id: TargetId, property: Property) -> Option<f32> {
        self.inner.borrow().store.value(id, property)
    }

    /// Total property writes accepted so far
    pub fn mutation_count(&self) -> u64 {
        self.inner.borrow().store.mutation_count()
    }

    pub fn scroll_offset(&self) -> Point {
        self.inner.borrow().scroll
    }

    /// Feed one input event. Scroll and resize only mark bindings for
    /// evaluation on the next frame.
    pub fn dispatch(&self, event: &Event) {
        let mut inner = self.inner.borrow_mut();
        inner.dispatch(event);
        inner.drain_pending();
    }

    /// Advance every context by `dt` seconds
    pub fn frame(&self, dt: f32) {
        self.inner.borrow_mut().frame(dt);
    }

    pub fn create_context(&self, label: impl Into<String>) -> Context {
        self.context_with_options(label, ContextOptions::default())
    }

    pub fn context_with_options(
        &self,
        label: impl Into<String>,
        options: ContextOptions,
    ) -> Context {
        let label = label.into();
        let scope = self.inner.borrow_mut().create_scope(&label);
        Context::new(self.handle(), scope, label, options)
    }

    /// Create a context and run `setup` in it. If setup fails, everything it
    /// registered is disposed and the error returned.
    pub fn with_context(
        &self,
        label: impl Into<String>,
        setup: impl FnOnce(&mut Context) -> Result<()>,
    ) -> Result<Context> {
        let mut context = self.create_context(label);
        match setup(&mut context) {
            Ok(()) => Ok(context),
            Err(err) => {
                tracing::debug!(label = context.label(), error = %err, "context setup failed");
                context.dispose();
                Err(err)
            }
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        self.inner.borrow().stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::TransformProps;
    use crate::tween::Tween;
    use lumen_core::{Size, StaticLayout};

    fn scheduler() -> MotionScheduler {
        MotionScheduler::new(StaticLayout::new(Size::new(1280.0, 800.0)))
    }

    #[test]
    fn test_frame_advances_timelines() {
        let scheduler = scheduler();
        let card = scheduler.add_target("card", TransformState::IDENTITY);
        let ctx = scheduler.create_context("home");
        ctx.tween(Tween::to(card, TransformProps::opacity(0.0), 0.5)).unwrap();

        for _ in 0..5 {
            scheduler.frame(0.05);
        }
        assert!((scheduler.value(card, Property::Opacity).unwrap() - 0.5).abs() < 1e-4);
        for _ in 0..10 {
            scheduler.frame(0.05);
        }
        assert_eq!(scheduler.value(card, Property::Opacity), Some(0.0));
    }

    #[test]
    fn test_frame_delta_is_clamped() {
        let scheduler = scheduler();
        let card = scheduler.add_target("card", TransformState::IDENTITY);
        let ctx = scheduler.create_context("home");
        ctx.tween(Tween::to(card, TransformProps::translate(100.0, 0.0), 1.0)).unwrap();

        // A stalled tab reports a huge delta; the clock advances by at most 0.1
        scheduler.frame(5.0);
        assert!((scheduler.value(card, Property::TranslateX).unwrap() - 10.0).abs() < 1e-3);
        assert!((ctx.elapsed().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_finished_tweens_are_released() {
        let scheduler = scheduler();
        let button = scheduler.add_target("button", TransformState::IDENTITY);
        let ctx = scheduler.create_context("home");

        for i in 0..200 {
            let scale = if i % 2 == 0 { 1.1 } else { 1.0 };
            ctx.tween(Tween::to(button, TransformProps::scale(scale), 0.3)).unwrap();
            for _ in 0..20 {
                scheduler.frame(0.02);
            }
        }
        assert_eq!(scheduler.stats().timelines, 0);
        assert_eq!(scheduler.value(button, Property::ScaleX), Some(1.0));

        // Played timelines stay registered so they can be replayed
        let id = ctx
            .play(Timeline::single(Tween::to(button, TransformProps::opacity(0.5), 0.1)).unwrap())
            .unwrap();
        scheduler.frame(0.05);
        scheduler.frame(0.1);
        assert_eq!(ctx.timeline_state(id).unwrap(), Some(TimelineState::Completed));
        assert_eq!(scheduler.stats().timelines, 1);
    }

    #[test]
    fn test_dispatch_records_scroll() {
        let scheduler = scheduler();
        scheduler.dispatch(&Event::scroll_to(0.0, 640.0));
        assert_eq!(scheduler.scroll_offset(), Point::new(0.0, 640.0));
    }

    #[test]
    fn test_stats_track_contexts() {
        let scheduler = scheduler();
        let card = scheduler.add_target("card", TransformState::IDENTITY);
        let mut ctx = scheduler.create_context("home");
        ctx.tween(Tween::to(card, TransformProps::opacity(0.5), 1.0)).unwrap();
        ctx.on_frame(|_| {}).unwrap();

        let stats = scheduler.stats();
        assert_eq!(stats.contexts, 1);
        assert_eq!(stats.timelines, 1);
        assert_eq!(stats.frame_callbacks, 1);

        let report = ctx.dispose();
        assert_eq!(report.timelines, 1);
        assert_eq!(report.frame_callbacks, 1);
        assert_eq!(scheduler.stats(), SchedulerStats { targets: 1, ..Default::default() });
    }

    #[test]
    fn test_handle_outlives_scheduler() {
        let scheduler = scheduler();
        let handle = scheduler.handle();
        assert!(handle.is_alive());
        drop(scheduler);
        assert!(!handle.is_alive());
    }
}

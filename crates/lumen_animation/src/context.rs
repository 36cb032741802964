//! Orchestration contexts
//!
//! A [`Context`] is the unit of lifetime for animation work. Everything
//! registered through it (timelines, scroll bindings, pointer streams and
//! subscriptions, hover regions, frame callbacks) belongs to its scope, and
//! disposing the context tears all of it down in one step. Dropping a
//! context disposes it.

use crate::error::{AnimationError, Result};
use crate::particles::{ParticleField, ParticleFieldConfig};
use crate::pointer::{
    HoverRegionId, PointerSample, PointerSource, PointerStreamId, PointerSubscription,
    PointerSubscriptionId,
};
use crate::props::TransformProps;
use crate::scheduler::{DisposeReport, MotionScheduler, SchedulerHandle, SchedulerInner};
use crate::scroll::{ScrollBinding, ScrollBindingId, ScrollMode, ScrollTrigger};
use crate::stepper::FrameCallbackId;
use crate::timeline::{Timeline, TimelineId, TimelineState};
use crate::tween::Tween;
use lumen_core::{FrameTime, ScopeId, TargetId};
use std::cell::RefCell;
use std::rc::Rc;

/// Context behaviour on dispose
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContextOptions {
    /// Restore every property the context wrote to its prior value
    pub revert_on_dispose: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            revert_on_dispose: true,
        }
    }
}

/// Scoped handle for registering animation work
pub struct Context {
    handle: SchedulerHandle,
    scope: ScopeId,
    label: String,
    options: ContextOptions,
    disposed: bool,
}

impl Context {
    pub(crate) fn new(
        handle: SchedulerHandle,
        scope: ScopeId,
        label: String,
        options: ContextOptions,
    ) -> Self {
        Self {
            handle,
            scope,
            label,
            options,
            disposed: false,
        }
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn options(&self) -> ContextOptions {
        self.options
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed || !self.handle.is_alive()
    }

    fn with_inner<R>(&self, f: impl FnOnce(&mut SchedulerInner) -> Result<R>) -> Result<R> {
        if self.disposed {
            return Err(AnimationError::ContextDisposed);
        }
        let inner = self.handle.upgrade().ok_or(AnimationError::ContextDisposed)?;
        let Ok(mut inner) = inner.try_borrow_mut() else {
            return Err(AnimationError::SchedulerBusy);
        };
        let result = f(&mut inner);
        inner.drain_pending();
        result
    }

    fn owned_timeline(&self, inner: &SchedulerInner, id: TimelineId) -> Result<()> {
        if inner.scope_owns_timeline(self.scope, id) {
            Ok(())
        } else {
            Err(AnimationError::UnknownTimeline)
        }
    }

    /// Seconds this context's clock has advanced
    pub fn elapsed(&self) -> Result<f32> {
        self.with_inner(|inner| {
            Ok(inner
                .scopes
                .get(self.scope)
                .map(|s| s.last.elapsed)
                .unwrap_or_default())
        })
    }

    /// Register a timeline without starting it
    pub fn timeline(&self, timeline: Timeline) -> Result<TimelineId> {
        self.with_inner(|inner| Ok(inner.insert_timeline(self.scope, timeline, false)))
    }

    /// Register a timeline and start it on this context's clock. It stays
    /// registered after completing so it can be replayed or sought.
    pub fn play(&self, timeline: Timeline) -> Result<TimelineId> {
        self.start(timeline, false)
    }

    /// Play a single tween. The tween is dropped from the scheduler when it
    /// completes; the returned id is only useful for killing it mid-flight.
    pub fn tween(&self, tween: Tween) -> Result<TimelineId> {
        self.start(Timeline::single(tween)?, true)
    }

    fn start(&self, timeline: Timeline, transient: bool) -> Result<TimelineId> {
        self.with_inner(|inner| {
            let id = inner.insert_timeline(self.scope, timeline, transient);
            let SchedulerInner { timelines, store, .. } = inner;
            if let Some(entry) = timelines.get_mut(id) {
                entry.timeline.play(store);
            }
            Ok(id)
        })
    }

    pub fn play_timeline(&self, id: TimelineId) -> Result<()> {
        self.with_inner(|inner| {
            self.owned_timeline(inner, id)?;
            let SchedulerInner { timelines, store, .. } = inner;
            if let Some(entry) = timelines.get_mut(id) {
                entry.timeline.play(store);
            }
            Ok(())
        })
    }

    pub fn pause(&self, id: TimelineId) -> Result<()> {
        self.with_inner(|inner| {
            self.owned_timeline(inner, id)?;
            if let Some(entry) = inner.timelines.get_mut(id) {
                entry.timeline.pause();
            }
            Ok(())
        })
    }

    /// Jump to a local time, keeping the playback state
    pub fn seek(&self, id: TimelineId, time: f32) -> Result<()> {
        self.with_inner(|inner| {
            self.owned_timeline(inner, id)?;
            let SchedulerInner { timelines, store, .. } = inner;
            if let Some(entry) = timelines.get_mut(id) {
                entry.timeline.seek(store, time);
            }
            Ok(())
        })
    }

    /// Stop a timeline for good. Its targets keep their current values.
    pub fn kill(&self, id: TimelineId) -> Result<()> {
        self.with_inner(|inner| {
            self.owned_timeline(inner, id)?;
            inner.remove_timeline(id);
            Ok(())
        })
    }

    /// Playback state, or `None` once the timeline is killed or a finished
    /// tween has been released
    pub fn timeline_state(&self, id: TimelineId) -> Result<Option<TimelineState>> {
        self.with_inner(|inner| {
            Ok(inner
                .timelines
                .get(id)
                .filter(|t| t.scope == self.scope)
                .map(|t| t.timeline.state()))
        })
    }

    /// Set properties directly, taking ownership of them
    pub fn set(&self, target: TargetId, props: TransformProps) -> Result<()> {
        self.with_inner(|inner| {
            if !inner.store.contains(target) {
                return Err(AnimationError::UnknownTarget(target));
            }
            let setter = inner
                .scopes
                .get(self.scope)
                .map(|s| s.setter)
                .ok_or(AnimationError::ContextDisposed)?;
            for (property, value) in props.iter() {
                inner.store.claim(setter, target, property);
                inner.store.write(setter, target, property, value);
            }
            Ok(())
        })
    }

    /// Drive `timeline` from scroll position
    pub fn bind_scroll(
        &self,
        trigger: ScrollTrigger,
        timeline: Timeline,
    ) -> Result<ScrollBindingId> {
        self.with_inner(|inner| {
            trigger.validate(inner.layout.as_ref())?;
            let timeline_id = inner.insert_timeline(self.scope, timeline, false);
            let driver = inner.store.allocate_driver(self.scope);
            let created =
                ScrollBinding::new(self.scope, trigger, timeline_id, driver, &mut inner.store);
            let mut binding = match created {
                Ok(binding) => binding,
                Err(err) => {
                    inner.remove_timeline(timeline_id);
                    return Err(err);
                }
            };
            let SchedulerInner { timelines, store, .. } = &mut *inner;
            if let Some(entry) = timelines.get_mut(timeline_id) {
                binding.render_initial(&mut entry.timeline, store);
            }
            let id = inner.bindings.insert(binding);
            inner.mark_scroll_dirty();
            Ok(id)
        })
    }

    /// Pin `section` and slide `track` horizontally while scrolling through it.
    /// `mode` must scrub; played modes cannot follow scroll.
    pub fn bind_horizontal_scroll(
        &self,
        section: TargetId,
        track: TargetId,
        mode: ScrollMode,
    ) -> Result<ScrollBindingId> {
        let trigger = ScrollTrigger::horizontal_strip(section, track).with_mode(mode);
        self.bind_scroll(trigger, Timeline::empty())
    }

    /// Remove a binding and its timeline. Returns `false` if this context
    /// does not own it.
    pub fn unbind_scroll(&self, id: ScrollBindingId) -> Result<bool> {
        self.with_inner(|inner| {
            if inner.bindings.get(id).map(|b| b.scope()) != Some(self.scope) {
                return Ok(false);
            }
            Ok(inner.remove_binding(id))
        })
    }

    /// Scroll distance a pinned binding holds its element for
    pub fn pin_spacing(&self, id: ScrollBindingId) -> Result<Option<f32>> {
        self.with_inner(|inner| {
            Ok(inner
                .bindings
                .get(id)
                .filter(|b| b.scope() == self.scope)
                .and_then(|b| b.pin_spacing()))
        })
    }

    /// Start receiving pointer samples relative to `source`
    pub fn track_pointer(
        &self,
        source: PointerSource,
        on_sample: impl FnMut(&PointerSample) + 'static,
    ) -> Result<PointerStreamId> {
        self.with_inner(|inner| {
            if let PointerSource::Element(id) = source {
                if !inner.store.contains(id) {
                    return Err(AnimationError::UnknownTarget(id));
                }
            }
            Ok(inner.pointer.add_stream(self.scope, source, on_sample))
        })
    }

    /// Stop a stream along with its subscriptions
    pub fn untrack_pointer(&self, id: PointerStreamId) -> Result<bool> {
        self.with_inner(|inner| {
            if inner.pointer.stream_scope(id) != Some(self.scope) {
                return Ok(false);
            }
            let SchedulerInner { pointer, store, .. } = inner;
            Ok(pointer.remove_stream(id, store).is_some())
        })
    }

    pub fn subscribe_pointer(
        &self,
        stream: PointerStreamId,
        subscription: PointerSubscription,
    ) -> Result<PointerSubscriptionId> {
        self.with_inner(|inner| {
            let driver = inner.store.allocate_driver(self.scope);
            let SchedulerInner { pointer, store, .. } = inner;
            pointer.subscribe(self.scope, stream, subscription, driver, store)
        })
    }

    pub fn unsubscribe_pointer(&self, id: PointerSubscriptionId) -> Result<bool> {
        self.with_inner(|inner| {
            if inner.pointer.subscription_scope(id) != Some(self.scope) {
                return Ok(false);
            }
            let SchedulerInner { pointer, store, .. } = inner;
            Ok(pointer.unsubscribe(id, store))
        })
    }

    /// Mark `target` as an interactive element for hover responses
    pub fn register_hover(&self, target: TargetId) -> Result<HoverRegionId> {
        self.with_inner(|inner| {
            if !inner.store.contains(target) {
                return Err(AnimationError::UnknownTarget(target));
            }
            Ok(inner.pointer.add_hover(self.scope, target))
        })
    }

    pub fn unregister_hover(&self, id: HoverRegionId) -> Result<bool> {
        self.with_inner(|inner| {
            if inner.pointer.hover_scope(id) != Some(self.scope) {
                return Ok(false);
            }
            Ok(inner.pointer.remove_hover(id))
        })
    }

    /// Run `callback` once per frame with this context's time
    pub fn on_frame(&self, callback: impl FnMut(&FrameTime) + 'static) -> Result<FrameCallbackId> {
        self.with_inner(|inner| Ok(inner.stepper.register(self.scope, callback)))
    }

    pub fn remove_frame_callback(&self, id: FrameCallbackId) -> Result<bool> {
        self.with_inner(|inner| {
            if inner.stepper.scope_of(id) != Some(self.scope) {
                return Ok(false);
            }
            Ok(inner.stepper.unregister(id))
        })
    }

    /// Create a particle field stepped every frame on this context's clock
    pub fn particle_field(
        &self,
        config: ParticleFieldConfig,
    ) -> Result<Rc<RefCell<ParticleField>>> {
        let field = Rc::new(RefCell::new(ParticleField::new(config)?));
        let stepped = field.clone();
        self.on_frame(move |time| stepped.borrow_mut().step(time.elapsed))?;
        Ok(field)
    }

    /// Tear down everything this context registered. Later calls return an
    /// empty report.
    ///
    /// Disposing from inside a scheduler callback queues the teardown until
    /// the running phase ends and returns an empty report.
    pub fn dispose(&mut self) -> DisposeReport {
        if self.disposed {
            return DisposeReport::default();
        }
        self.disposed = true;
        let Some(inner) = self.handle.upgrade() else {
            return DisposeReport::default();
        };
        let revert = self.options.revert_on_dispose;
        let Ok(mut inner) = inner.try_borrow_mut() else {
            tracing::debug!(label = %self.label, "scheduler busy, deferring context disposal");
            self.handle.defer_dispose(self.scope, revert);
            return DisposeReport::default();
        };
        let report = inner.dispose_scope(self.scope, revert);
        inner.drain_pending();
        report
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Routing boundary: at most one page context is alive at a time
#[derive(Default)]
pub struct PageLifecycle {
    current: Option<Context>,
}

impl PageLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispose the previous page, then build the next one
    pub fn enter(
        &mut self,
        scheduler: &MotionScheduler,
        label: impl Into<String>,
        setup: impl FnOnce(&mut Context) -> Result<()>,
    ) -> Result<&Context> {
        self.leave();
        let context = scheduler.with_context(label, setup)?;
        let current = self.current.insert(context);
        Ok(&*current)
    }

    /// Dispose the current page, if any
    pub fn leave(&mut self) -> Option<DisposeReport> {
        self.current.take().map(|mut context| context.dispose())
    }

    pub fn current(&self) -> Option<&Context> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{Event, Property, Rect, Size, StaticLayout, TransformState};

    fn scheduler_with(layout: StaticLayout) -> MotionScheduler {
        MotionScheduler::new(layout)
    }

    #[test]
    fn test_set_claims_and_reverts() {
        let scheduler = scheduler_with(StaticLayout::new(Size::new(800.0, 600.0)));
        let title = scheduler.add_target("title", TransformState::IDENTITY);
        let mut ctx = scheduler.create_context("about");
        ctx.set(title, TransformProps::opacity(0.0).with_y(100.0)).unwrap();
        assert_eq!(scheduler.value(title, Property::TranslateY), Some(100.0));

        let report = ctx.dispose();
        assert_eq!(report.reverted, 2);
        assert_eq!(scheduler.target(title), Some(TransformState::IDENTITY));
    }

    #[test]
    fn test_dispose_without_revert_keeps_values() {
        let scheduler = scheduler_with(StaticLayout::new(Size::new(800.0, 600.0)));
        let title = scheduler.add_target("title", TransformState::IDENTITY);
        let mut ctx = scheduler.context_with_options(
            "about",
            ContextOptions {
                revert_on_dispose: false,
            },
        );
        ctx.set(title, TransformProps::opacity(0.2)).unwrap();
        ctx.dispose();
        assert_eq!(scheduler.value(title, Property::Opacity), Some(0.2));
    }

    #[test]
    fn test_disposed_context_rejects_work() {
        let scheduler = scheduler_with(StaticLayout::new(Size::new(800.0, 600.0)));
        let title = scheduler.add_target("title", TransformState::IDENTITY);
        let mut ctx = scheduler.create_context("about");
        ctx.dispose();

        assert!(ctx.is_disposed());
        assert!(matches!(
            ctx.set(title, TransformProps::opacity(0.0)),
            Err(AnimationError::ContextDisposed)
        ));
        assert_eq!(ctx.dispose(), DisposeReport::default());
    }

    #[test]
    fn test_context_cannot_touch_foreign_timeline() {
        let scheduler = scheduler_with(StaticLayout::new(Size::new(800.0, 600.0)));
        let card = scheduler.add_target("card", TransformState::IDENTITY);
        let a = scheduler.create_context("a");
        let b = scheduler.create_context("b");
        let id = a.tween(Tween::to(card, TransformProps::opacity(0.0), 1.0)).unwrap();

        assert!(matches!(b.kill(id), Err(AnimationError::UnknownTimeline)));
        assert_eq!(b.timeline_state(id).unwrap(), None);
        assert_eq!(a.timeline_state(id).unwrap(), Some(TimelineState::Playing));
    }

    #[test]
    fn test_kill_removes_timeline() {
        let scheduler = scheduler_with(StaticLayout::new(Size::new(800.0, 600.0)));
        let card = scheduler.add_target("card", TransformState::IDENTITY);
        let ctx = scheduler.create_context("home");
        let id = ctx.tween(Tween::to(card, TransformProps::scale(1.2), 1.0)).unwrap();
        ctx.kill(id).unwrap();
        assert_eq!(ctx.timeline_state(id).unwrap(), None);
        assert!(matches!(ctx.kill(id), Err(AnimationError::UnknownTimeline)));
    }

    #[test]
    fn test_bind_scroll_requires_laid_out_trigger() {
        let scheduler = scheduler_with(StaticLayout::new(Size::new(800.0, 600.0)));
        let section = scheduler.add_target("section", TransformState::IDENTITY);
        let ctx = scheduler.create_context("home");
        let trigger = ScrollTrigger::once(section, "top 80%".parse().unwrap());
        let fade = Tween::from_props(section, TransformProps::opacity(0.0), 1.0);
        let timeline = Timeline::single(fade).unwrap();

        assert!(matches!(
            ctx.bind_scroll(trigger, timeline),
            Err(AnimationError::TriggerNotFound(_))
        ));
        assert_eq!(scheduler.stats().timelines, 0);
    }

    #[test]
    fn test_bind_scroll_renders_initial_state() {
        let layout = Rc::new(RefCell::new(StaticLayout::new(Size::new(800.0, 600.0))));
        let scheduler = MotionScheduler::new(layout.clone());
        let section = scheduler.add_target("section", TransformState::IDENTITY);
        layout.borrow_mut().set_bounds(section, Rect::new(0.0, 1500.0, 800.0, 400.0));

        let ctx = scheduler.create_context("home");
        let from = TransformProps::opacity(0.0).with_y(60.0);
        let timeline = Timeline::single(Tween::from_props(section, from, 1.0)).unwrap();
        ctx.bind_scroll(ScrollTrigger::once(section, "top 80%".parse().unwrap()), timeline)
            .unwrap();

        assert_eq!(scheduler.value(section, Property::Opacity), Some(0.0));
        assert_eq!(scheduler.value(section, Property::TranslateY), Some(60.0));
    }

    #[test]
    fn test_page_lifecycle_disposes_previous_page() {
        let scheduler = scheduler_with(StaticLayout::new(Size::new(800.0, 600.0)));
        let card = scheduler.add_target("card", TransformState::IDENTITY);
        let mut pages = PageLifecycle::new();

        pages
            .enter(&scheduler, "home", |ctx| ctx.set(card, TransformProps::opacity(0.0)))
            .unwrap();
        assert_eq!(scheduler.stats().contexts, 1);

        pages
            .enter(&scheduler, "about", |ctx| ctx.on_frame(|_| {}).map(|_| ()))
            .unwrap();
        assert_eq!(scheduler.stats().contexts, 1);
        assert_eq!(pages.current().map(|c| c.label()), Some("about"));
        assert_eq!(scheduler.value(card, Property::Opacity), Some(1.0));

        let report = pages.leave().unwrap();
        assert_eq!(report.frame_callbacks, 1);
        assert!(pages.current().is_none());
        assert_eq!(scheduler.stats().contexts, 0);
    }

    #[test]
    fn test_context_calls_from_callbacks_report_busy() {
        let scheduler = scheduler_with(StaticLayout::new(Size::new(800.0, 600.0)));
        let dot = scheduler.add_target("dot", TransformState::IDENTITY);
        let overlay = scheduler.create_context("overlay");
        let ctx = scheduler.create_context("cursor");
        let outcomes = Rc::new(RefCell::new(Vec::new()));
        let seen = outcomes.clone();
        ctx.track_pointer(PointerSource::Window, move |_| {
            let result = overlay.set(dot, TransformProps::opacity(0.5));
            seen.borrow_mut().push(matches!(result, Err(AnimationError::SchedulerBusy)));
        })
        .unwrap();

        scheduler.dispatch(&Event::pointer_move(10.0, 10.0));
        assert_eq!(*outcomes.borrow(), vec![true]);
        assert_eq!(scheduler.value(dot, Property::Opacity), Some(1.0));

        // Dropping the stream drops the captured context, which is disposed too
        drop(ctx);
        assert_eq!(scheduler.stats().contexts, 0);
    }

    #[test]
    fn test_drop_disposes() {
        let scheduler = scheduler_with(StaticLayout::new(Size::new(800.0, 600.0)));
        {
            let ctx = scheduler.create_context("modal");
            ctx.on_frame(|_| {}).unwrap();
            assert_eq!(scheduler.stats().frame_callbacks, 1);
        }
        assert_eq!(scheduler.stats().frame_callbacks, 0);
        assert_eq!(scheduler.stats().contexts, 0);
    }
}

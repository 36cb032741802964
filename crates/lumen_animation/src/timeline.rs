//! Timeline orchestration for multiple tweens
//!
//! A [`TimelineBuilder`] collects tweens in declaration order, each with a
//! [`Position`]. `build()` resolves every position to an absolute start time
//! by walking the declared entries in order: anchors only ever look backward,
//! so resolution cannot cycle.
//!
//! Rendering at local time `t` works per (target, property) track: the last
//! entry whose start is at or before `t` writes its interpolated value. If no
//! entry on the track has started yet, the earliest one holds its `from`
//! value, which is what makes from-states visible before a reveal plays.

use crate::error::{AnimationError, Result};
use crate::easing::Easing;
use crate::props::TransformProps;
use crate::stagger::Stagger;
use crate::tween::Tween;
use lumen_core::{Driver, Property, TargetId, TargetStore};
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::str::FromStr;

new_key_type! {
    /// A timeline registered with the scheduler
    pub struct TimelineId;
    pub struct TimelineEntryId;
}

const EPSILON: f32 = 1e-6;

/// Where an entry starts relative to the rest of the timeline
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Position {
    /// At the current end of the timeline
    #[default]
    Sequence,
    /// Seconds from the timeline's start
    Absolute(f32),
    /// Offset from the end of the previous entry (`"-0.4"`, `"-=0.4"`, `"+=0.2"`, `">"`)
    AfterPrevious(f32),
    /// Offset from the start of the previous entry (`"<"`, `"<0.1"`)
    WithPrevious(f32),
}

impl From<f32> for Position {
    fn from(seconds: f32) -> Self {
        Position::Absolute(seconds)
    }
}

impl FromStr for Position {
    type Err = AnimationError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || AnimationError::InvalidPosition(s.to_string());
        let offset = |text: &str| -> Result<f32> {
            let text = text.trim();
            if text.is_empty() {
                return Ok(0.0);
            }
            let value: f32 = text.parse().map_err(|_| invalid())?;
            if value.is_finite() {
                Ok(value)
            } else {
                Err(invalid())
            }
        };

        let s_trim = s.trim();
        if s_trim.is_empty() {
            return Ok(Position::Sequence);
        }
        if let Some(rest) = s_trim.strip_prefix('<') {
            return Ok(Position::WithPrevious(offset(rest)?));
        }
        if let Some(rest) = s_trim.strip_prefix('>') {
            return Ok(Position::AfterPrevious(offset(rest)?));
        }
        if let Some(rest) = s_trim.strip_prefix("+=") {
            return Ok(Position::AfterPrevious(offset(rest)?));
        }
        if let Some(rest) = s_trim.strip_prefix("-=") {
            return Ok(Position::AfterPrevious(-offset(rest)?));
        }
        if s_trim.starts_with('+') || s_trim.starts_with('-') {
            return Ok(Position::AfterPrevious(offset(s_trim)?));
        }
        let absolute = offset(s_trim)?;
        Ok(Position::Absolute(absolute))
    }
}

/// Called once each time a timeline finishes playing forward
pub type CompleteCallback = Box<dyn FnMut()>;
/// Called with the progress of every rendered frame
pub type UpdateCallback = Box<dyn FnMut(f32)>;

/// A declared group of tweens sharing one position (a single tween or a stagger)
struct PendingGroup {
    position: Position,
    tweens: SmallVec<[Tween; 1]>,
}

/// Builder for [`Timeline`]
#[derive(Default)]
pub struct TimelineBuilder {
    groups: Vec<PendingGroup>,
    repeat: i32,
    yoyo: bool,
    label: Option<String>,
    deferred: Option<AnimationError>,
    on_complete: Option<CompleteCallback>,
    on_update: Option<UpdateCallback>,
}

impl TimelineBuilder {
    /// Append at the current end of the timeline
    pub fn add(self, tween: Tween) -> Self {
        self.add_at(tween, Position::Sequence)
    }

    pub fn add_at(mut self, tween: Tween, position: impl Into<Position>) -> Self {
        let mut tweens = SmallVec::new();
        tweens.push(tween);
        self.groups.push(PendingGroup {
            position: position.into(),
            tweens,
        });
        self
    }

    /// Add tweens that share one position and count as one entry for
    /// relative positioning
    pub fn add_group(mut self, tweens: Vec<Tween>, position: impl Into<Position>) -> Self {
        if tweens.is_empty() {
            self.defer(AnimationError::EmptyStagger);
            return self;
        }
        self.groups.push(PendingGroup {
            position: position.into(),
            tweens: tweens.into(),
        });
        self
    }

    /// Expand `template` over `targets` and add the copies as one group.
    ///
    /// Expansion errors are reported by [`TimelineBuilder::build`].
    pub fn stagger(
        mut self,
        template: &Tween,
        targets: &[TargetId],
        stagger: Stagger,
        position: impl Into<Position>,
    ) -> Self {
        match stagger.expand(template, targets) {
            Ok(tweens) => self.add_group(tweens, position),
            Err(err) => {
                self.defer(err);
                self
            }
        }
    }

    /// Extra iterations after the first; `-1` repeats forever
    pub fn repeat(mut self, count: i32) -> Self {
        self.repeat = count;
        self
    }

    /// Alternate direction on every repeat
    pub fn yoyo(mut self, yoyo: bool) -> Self {
        self.yoyo = yoyo;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Run `callback` when playback reaches the end. Callbacks run while
    /// the scheduler is borrowed and must not call back into it.
    pub fn on_complete(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Run `callback` with the progress of every rendered frame, including
    /// seeks and scrubs
    pub fn on_update(mut self, callback: impl FnMut(f32) + 'static) -> Self {
        self.on_update = Some(Box::new(callback));
        self
    }

    fn defer(&mut self, err: AnimationError) {
        if self.deferred.is_none() {
            self.deferred = Some(err);
        }
    }

    /// Resolve positions and produce the timeline
    pub fn build(self) -> Result<Timeline> {
        if let Some(err) = self.deferred {
            return Err(err);
        }

        let mut entries: SlotMap<TimelineEntryId, TimelineEntry> = SlotMap::with_key();
        let mut declared = Vec::new();
        let mut end = 0.0_f32;
        let mut previous: Option<(f32, f32)> = None;

        for group in self.groups {
            let anchor = match group.position {
                Position::Sequence => end,
                Position::Absolute(t) => t,
                Position::AfterPrevious(offset) => {
                    let (_, prev_end) =
                        previous.ok_or(AnimationError::RelativeWithoutAnchor { offset })?;
                    prev_end + offset
                }
                Position::WithPrevious(offset) => {
                    let (prev_start, _) =
                        previous.ok_or(AnimationError::RelativeWithoutAnchor { offset })?;
                    prev_start + offset
                }
            };
            if !anchor.is_finite() {
                return Err(AnimationError::InvalidPosition(anchor.to_string()));
            }
            if anchor < -EPSILON {
                return Err(AnimationError::NegativeStart { start: anchor });
            }
            let anchor = anchor.max(0.0);

            let mut group_start = f32::MAX;
            let mut group_end = anchor;
            for tween in group.tweens {
                tween.validate()?;
                let start = anchor + tween.delay;
                group_start = group_start.min(start);
                group_end = group_end.max(start + tween.duration);
                let id = entries.insert(TimelineEntry {
                    target: tween.target,
                    from: tween.from,
                    to: tween.to,
                    start,
                    duration: tween.duration,
                    ease: tween.ease,
                });
                declared.push(id);
            }

            previous = Some((group_start, group_end));
            end = end.max(group_end);
        }

        // Start order, declaration order breaking ties (stable sort)
        let mut order = declared;
        order.sort_by(|a, b| entries[*a].start.total_cmp(&entries[*b].start));

        Ok(Timeline {
            entries,
            order,
            tracks: Vec::new(),
            duration: end,
            time: 0.0,
            iteration: 0,
            reversed: false,
            backward: false,
            repeat: self.repeat,
            yoyo: self.yoyo,
            state: TimelineState::Idle,
            primed: false,
            claimed: false,
            driver: None,
            label: self.label,
            on_complete: self.on_complete,
            on_update: self.on_update,
        })
    }
}

/// A resolved entry in a timeline
#[derive(Clone, Debug)]
pub struct TimelineEntry {
    target: TargetId,
    from: TransformProps,
    to: TransformProps,
    start: f32,
    duration: f32,
    ease: Easing,
}

impl TimelineEntry {
    pub fn target(&self) -> TargetId {
        self.target
    }

    /// Absolute start in seconds
    pub fn start(&self) -> f32 {
        self.start
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn end(&self) -> f32 {
        self.start + self.duration
    }
}

#[derive(Clone, Copy, Debug)]
struct Segment {
    start: f32,
    duration: f32,
    from: f32,
    to: f32,
    ease: Easing,
}

impl Segment {
    fn sample(&self, t: f32) -> f32 {
        // Finished segments hold their end value exactly
        if self.duration <= EPSILON || t >= self.start + self.duration - EPSILON {
            return self.to;
        }
        let progress = ((t - self.start) / self.duration).clamp(0.0, 1.0);
        self.from + (self.to - self.from) * self.ease.apply(progress)
    }
}

/// Every segment that writes one (target, property) pair, in start order
#[derive(Clone, Debug)]
struct Track {
    target: TargetId,
    property: Property,
    segments: SmallVec<[Segment; 2]>,
}

impl Track {
    fn sample(&self, t: f32) -> Option<f32> {
        let first = self.segments.first()?;
        match self.segments.iter().rev().find(|s| s.start <= t + EPSILON) {
            Some(active) => Some(active.sample(t)),
            None => Some(first.from),
        }
    }
}

/// Playback state of a timeline
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimelineState {
    Idle,
    Playing,
    Paused,
    Completed,
    /// Stopped for good; targets keep their last written values
    Killed,
}

/// A timeline that orchestrates multiple tweens
pub struct Timeline {
    entries: SlotMap<TimelineEntryId, TimelineEntry>,
    order: Vec<TimelineEntryId>,
    tracks: Vec<Track>,
    duration: f32,
    /// Time within the current iteration
    time: f32,
    iteration: u64,
    reversed: bool,
    /// Playing toward time zero
    backward: bool,
    repeat: i32,
    yoyo: bool,
    state: TimelineState,
    primed: bool,
    claimed: bool,
    driver: Option<Driver>,
    label: Option<String>,
    on_complete: Option<CompleteCallback>,
    on_update: Option<UpdateCallback>,
}

impl Timeline {
    pub fn builder() -> TimelineBuilder {
        TimelineBuilder::default()
    }

    /// A timeline with no entries
    pub fn empty() -> Self {
        Self {
            entries: SlotMap::with_key(),
            order: Vec::new(),
            tracks: Vec::new(),
            duration: 0.0,
            time: 0.0,
            iteration: 0,
            reversed: false,
            backward: false,
            repeat: 0,
            yoyo: false,
            state: TimelineState::Idle,
            primed: true,
            claimed: false,
            driver: None,
            label: None,
            on_complete: None,
            on_update: None,
        }
    }

    /// A timeline holding one tween at time zero
    pub fn single(tween: Tween) -> Result<Self> {
        Self::builder().add(tween).build()
    }

    /// Single-iteration duration in seconds
    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Duration including repeats; infinite when repeating forever
    pub fn total_duration(&self) -> f32 {
        if self.repeat < 0 {
            f32::INFINITY
        } else {
            self.duration * (self.repeat as f32 + 1.0)
        }
    }

    pub fn state(&self) -> TimelineState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TimelineState::Playing
    }

    /// Playing backward toward the start
    pub fn is_reversing(&self) -> bool {
        self.is_playing() && self.backward
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Time within the current iteration
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Local render time, accounting for yoyo direction
    pub fn local_time(&self) -> f32 {
        if self.reversed {
            self.duration - self.time
        } else {
            self.time
        }
    }

    pub fn progress(&self) -> f32 {
        if self.duration <= EPSILON {
            1.0
        } else {
            self.local_time() / self.duration
        }
    }

    pub fn driver(&self) -> Option<Driver> {
        self.driver
    }

    /// Bind the driver this timeline writes with
    pub fn attach(&mut self, driver: Driver) {
        self.driver = Some(driver);
    }

    pub fn entry(&self, id: TimelineEntryId) -> Option<&TimelineEntry> {
        self.entries.get(id)
    }

    /// Entries in start order
    pub fn entries(&self) -> impl Iterator<Item = (TimelineEntryId, &TimelineEntry)> + '_ {
        self.order.iter().map(|id| (*id, &self.entries[*id]))
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Every target this timeline animates
    pub fn targets(&self) -> Vec<TargetId> {
        let mut targets: Vec<TargetId> = Vec::new();
        for (_, entry) in self.entries() {
            if !targets.contains(&entry.target) {
                targets.push(entry.target);
            }
        }
        targets
    }

    /// Capture implicit endpoints from the store.
    ///
    /// Entries are visited in start order; a property's implicit endpoint is
    /// the value an earlier entry of this timeline leaves it at, or the
    /// target's current value.
    pub fn prime(&mut self, store: &TargetStore) {
        let mut running: FxHashMap<(TargetId, Property), f32> = FxHashMap::default();
        let mut track_index: FxHashMap<(TargetId, Property), usize> = FxHashMap::default();
        self.tracks.clear();

        for id in &self.order {
            let entry = &self.entries[*id];
            let props = entry.from.properties().union(entry.to.properties());
            for property in props.iter() {
                let key = (entry.target, property);
                let current = running
                    .get(&key)
                    .copied()
                    .or_else(|| store.value(entry.target, property));
                let (Some(from), Some(to)) = (
                    entry.from.get(property).or(current),
                    entry.to.get(property).or(current),
                ) else {
                    tracing::trace!(
                        id = ?entry.target,
                        %property,
                        "skipping track for missing target"
                    );
                    continue;
                };
                running.insert(key, to);

                let index = *track_index.entry(key).or_insert_with(|| {
                    self.tracks.push(Track {
                        target: entry.target,
                        property,
                        segments: SmallVec::new(),
                    });
                    self.tracks.len() - 1
                });
                self.tracks[index].segments.push(Segment {
                    start: entry.start,
                    duration: entry.duration,
                    from,
                    to,
                    ease: entry.ease,
                });
            }
        }
        self.primed = true;
    }

    /// Value a property takes at local time `t`, once primed
    pub fn value_at(&self, target: TargetId, property: Property, t: f32) -> Option<f32> {
        self.tracks
            .iter()
            .find(|track| track.target == target && track.property == property)
            .and_then(|track| track.sample(t.clamp(0.0, self.duration)))
    }

    fn ensure_primed(&mut self, store: &mut TargetStore) {
        if !self.primed {
            self.prime(store);
        }
        if !self.claimed {
            self.claim(store);
        }
    }

    fn claim(&mut self, store: &mut TargetStore) {
        let Some(driver) = self.driver else {
            return;
        };
        for track in &self.tracks {
            store.claim(driver, track.target, track.property);
        }
        self.claimed = true;
    }

    fn release(&mut self, store: &mut TargetStore) {
        let Some(driver) = self.driver else {
            return;
        };
        for track in &self.tracks {
            store.release(driver, track.target, track.property);
        }
        self.claimed = false;
    }

    /// Write every track's value at the current local time
    pub fn render(&self, store: &mut TargetStore) {
        let Some(driver) = self.driver else {
            return;
        };
        let t = self.local_time();
        for track in &self.tracks {
            if let Some(value) = track.sample(t) {
                store.write(driver, track.target, track.property, value);
            }
        }
    }

    /// Start or resume playback. A completed timeline restarts from zero.
    ///
    /// Playing claims every property the timeline animates.
    pub fn play(&mut self, store: &mut TargetStore) {
        match self.state {
            TimelineState::Killed => return,
            TimelineState::Completed => {
                self.time = 0.0;
                self.iteration = 0;
                self.reversed = false;
            }
            _ => {}
        }
        if !self.primed {
            self.prime(store);
        }
        self.claim(store);
        self.backward = false;
        self.state = TimelineState::Playing;
        self.render(store);
    }

    /// Play backward from the current time. Reaching zero leaves the
    /// timeline idle at its start pose, ready to play forward again.
    ///
    /// Only the current iteration is rewound.
    pub fn reverse(&mut self, store: &mut TargetStore) {
        match self.state {
            TimelineState::Killed => return,
            TimelineState::Idle if self.time <= EPSILON => return,
            _ => {}
        }
        self.ensure_primed(store);
        self.backward = true;
        self.state = TimelineState::Playing;
    }

    /// Restart from zero regardless of state
    pub fn restart(&mut self, store: &mut TargetStore) {
        if self.state == TimelineState::Killed {
            return;
        }
        self.time = 0.0;
        self.iteration = 0;
        self.reversed = false;
        self.state = TimelineState::Idle;
        self.play(store);
    }

    pub fn pause(&mut self) {
        if self.state == TimelineState::Playing {
            self.state = TimelineState::Paused;
        }
    }

    /// Jump to a local time and render it without changing playback state
    pub fn seek(&mut self, store: &mut TargetStore, time: f32) {
        if self.state == TimelineState::Killed {
            return;
        }
        self.ensure_primed(store);
        self.time = if time.is_finite() {
            time.clamp(0.0, self.duration)
        } else {
            0.0
        };
        self.reversed = false;
        self.render(store);
        self.notify_update();
    }

    /// Seek to a fraction of the single-iteration duration
    pub fn set_progress(&mut self, store: &mut TargetStore, progress: f32) {
        self.seek(store, progress.clamp(0.0, 1.0) * self.duration);
    }

    /// Stop for good. Targets keep their last written values and ownership
    /// is released.
    pub fn kill(&mut self, store: &mut TargetStore) {
        if self.state == TimelineState::Killed {
            return;
        }
        self.release(store);
        self.state = TimelineState::Killed;
    }

    /// Advance playback by `dt` seconds and render
    pub fn advance(&mut self, store: &mut TargetStore, dt: f32) {
        if self.state != TimelineState::Playing {
            return;
        }
        if self.backward {
            self.rewind(store, dt);
            return;
        }

        if self.duration <= EPSILON {
            self.time = self.duration;
            self.render(store);
            self.notify_update();
            self.finish();
            return;
        }

        let mut completed = false;
        let t = self.time + dt.max(0.0);
        if t >= self.duration {
            let wraps = (t / self.duration).floor() as u64;
            let allowed = if self.repeat < 0 {
                u64::MAX
            } else {
                (self.repeat as u64).saturating_sub(self.iteration)
            };

            if wraps > allowed {
                self.iteration += allowed;
                if self.yoyo && allowed % 2 == 1 {
                    self.reversed = !self.reversed;
                }
                self.time = self.duration;
                completed = true;
            } else {
                self.iteration += wraps;
                if self.yoyo && wraps % 2 == 1 {
                    self.reversed = !self.reversed;
                }
                self.time = t - wraps as f32 * self.duration;
            }
        } else {
            self.time = t;
        }

        self.render(store);
        self.notify_update();
        if completed {
            self.finish();
        }
    }

    fn rewind(&mut self, store: &mut TargetStore, dt: f32) {
        let t = self.time - dt.max(0.0);
        if t > EPSILON {
            self.time = t;
        } else {
            self.time = 0.0;
            self.iteration = 0;
            self.reversed = false;
            self.backward = false;
            self.state = TimelineState::Idle;
        }
        self.render(store);
        self.notify_update();
    }

    fn finish(&mut self) {
        self.state = TimelineState::Completed;
        if let Some(callback) = self.on_complete.as_mut() {
            callback();
        }
    }

    fn notify_update(&mut self) {
        let progress = self.progress();
        if let Some(callback) = self.on_update.as_mut() {
            callback(progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{ScopeId, TransformState};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn setup() -> (TargetStore, TargetId, Driver) {
        let mut scopes: SlotMap<ScopeId, ()> = SlotMap::with_key();
        let scope = scopes.insert(());
        let mut store = TargetStore::new();
        let id = store.insert("hero", TransformState::IDENTITY);
        let driver = store.allocate_driver(scope);
        (store, id, driver)
    }

    #[test]
    fn test_parse_positions() {
        assert_eq!("".parse::<Position>().unwrap(), Position::Sequence);
        assert_eq!("0.3".parse::<Position>().unwrap(), Position::Absolute(0.3));
        assert_eq!("-0.4".parse::<Position>().unwrap(), Position::AfterPrevious(-0.4));
        assert_eq!("-=0.8".parse::<Position>().unwrap(), Position::AfterPrevious(-0.8));
        assert_eq!("+=0.2".parse::<Position>().unwrap(), Position::AfterPrevious(0.2));
        assert_eq!("<".parse::<Position>().unwrap(), Position::WithPrevious(0.0));
        assert_eq!("<0.1".parse::<Position>().unwrap(), Position::WithPrevious(0.1));
        assert_eq!(">".parse::<Position>().unwrap(), Position::AfterPrevious(0.0));
        assert!("soon".parse::<Position>().is_err());
        assert!("-=abc".parse::<Position>().is_err());
    }

    #[test]
    fn test_sequence_resolution() {
        let (_, id, _) = setup();
        let tl = Timeline::builder()
            .add(Tween::to(id, TransformProps::opacity(1.0), 1.0))
            .add(Tween::to(id, TransformProps::scale(1.2), 0.5))
            .add_at(
                Tween::to(id, TransformProps::translate(0.0, 10.0), 0.5),
                Position::WithPrevious(0.1),
            )
            .build()
            .unwrap();

        let starts: Vec<f32> = tl.entries().map(|(_, e)| e.start()).collect();
        assert_eq!(starts.len(), 3);
        assert!((starts[1] - 1.0).abs() < 1e-6);
        assert!((starts[2] - 1.1).abs() < 1e-6);
        assert!((tl.duration() - 1.6).abs() < 1e-6);
    }

    #[test]
    fn test_relative_without_anchor_is_error() {
        let (_, id, _) = setup();
        let result = Timeline::builder()
            .add_at(Tween::to(id, TransformProps::opacity(1.0), 1.0), Position::AfterPrevious(-0.5))
            .build();
        assert!(matches!(result, Err(AnimationError::RelativeWithoutAnchor { .. })));
    }

    #[test]
    fn test_negative_start_is_error() {
        let (_, id, _) = setup();
        let result = Timeline::builder()
            .add(Tween::to(id, TransformProps::opacity(1.0), 0.5))
            .add_at(Tween::to(id, TransformProps::scale(1.0), 0.5), Position::AfterPrevious(-1.0))
            .build();
        assert!(matches!(result, Err(AnimationError::NegativeStart { .. })));
    }

    #[test]
    fn test_overlapping_entries_two_properties() {
        let (mut store, id, driver) = setup();
        let mut tl = Timeline::builder()
            .add(Tween::from_to(
                id,
                TransformProps::opacity(0.0),
                TransformProps::opacity(1.0),
                1.0,
            ))
            .add_at(
                Tween::from_to(id, TransformProps::scale(0.8), TransformProps::scale(1.0), 0.5),
                Position::AfterPrevious(-0.5),
            )
            .build()
            .unwrap();
        tl.attach(driver);
        tl.play(&mut store);

        tl.advance(&mut store, 0.25);
        assert!((store.value(id, Property::Opacity).unwrap() - 0.25).abs() < 1e-4);
        assert!((store.value(id, Property::ScaleX).unwrap() - 0.8).abs() < 1e-4);

        // Entry B is halfway through its local progress
        tl.advance(&mut store, 0.5);
        assert!((store.value(id, Property::Opacity).unwrap() - 0.75).abs() < 1e-4);
        assert!((store.value(id, Property::ScaleX).unwrap() - 0.9).abs() < 1e-4);

        tl.advance(&mut store, 0.25);
        assert!((store.value(id, Property::Opacity).unwrap() - 1.0).abs() < 1e-4);
        assert!((store.value(id, Property::ScaleX).unwrap() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_completion_lands_exactly_on_end_values() {
        let (mut store, id, driver) = setup();
        let mut tl = Timeline::builder()
            .add(Tween::to(id, TransformProps::opacity(0.0), 0.3))
            .add_at(
                Tween::to(id, TransformProps::translate(0.0, -800.0), 0.8),
                Position::AfterPrevious(-0.1),
            )
            .build()
            .unwrap();
        tl.attach(driver);
        tl.play(&mut store);
        for _ in 0..90 {
            tl.advance(&mut store, 1.0 / 60.0);
        }

        assert_eq!(tl.state(), TimelineState::Completed);
        assert_eq!(store.value(id, Property::Opacity), Some(0.0));
        assert_eq!(store.value(id, Property::TranslateY), Some(-800.0));
    }

    #[test]
    fn test_later_entry_on_same_property_wins() {
        let (mut store, id, driver) = setup();
        let mut tl = Timeline::builder()
            .add(Tween::to(id, TransformProps::translate(0.0, 100.0), 1.0))
            .add(Tween::to(id, TransformProps::translate(0.0, 0.0), 1.0))
            .build()
            .unwrap();
        tl.attach(driver);
        tl.prime(&store);

        // Second entry starts from the first one's end value
        assert_eq!(tl.value_at(id, Property::TranslateY, 1.0), Some(100.0));
        assert_eq!(tl.value_at(id, Property::TranslateY, 1.5), Some(50.0));
        assert_eq!(tl.value_at(id, Property::TranslateY, 2.0), Some(0.0));

        tl.seek(&mut store, 1.5);
        assert_eq!(store.value(id, Property::TranslateY), Some(50.0));
    }

    #[test]
    fn test_unstarted_entry_holds_from_state() {
        let (mut store, id, driver) = setup();
        let mut tl = Timeline::builder()
            .add_at(
                Tween::from_props(id, TransformProps::opacity(0.0).with_y(60.0), 1.0),
                Position::Absolute(0.5),
            )
            .build()
            .unwrap();
        tl.attach(driver);
        tl.seek(&mut store, 0.0);

        assert_eq!(store.value(id, Property::Opacity), Some(0.0));
        assert_eq!(store.value(id, Property::TranslateY), Some(60.0));
    }

    #[test]
    fn test_kill_freezes_and_releases() {
        let (mut store, id, driver) = setup();
        let mut tl = Timeline::single(Tween::to(id, TransformProps::opacity(0.0), 1.0)).unwrap();
        tl.attach(driver);
        tl.play(&mut store);
        tl.advance(&mut store, 0.4);
        tl.kill(&mut store);
        tl.advance(&mut store, 0.4);
        tl.play(&mut store);

        assert_eq!(tl.state(), TimelineState::Killed);
        assert!((store.value(id, Property::Opacity).unwrap() - 0.6).abs() < 1e-4);
        assert_eq!(store.owner(id, Property::Opacity), None);
    }

    #[test]
    fn test_completes_at_final_values() {
        let (mut store, id, driver) = setup();
        let mut tl =
            Timeline::single(Tween::to(id, TransformProps::translate(40.0, 0.0), 0.5)).unwrap();
        tl.attach(driver);
        tl.play(&mut store);
        tl.advance(&mut store, 10.0);

        assert_eq!(tl.state(), TimelineState::Completed);
        assert_eq!(store.value(id, Property::TranslateX), Some(40.0));
    }

    #[test]
    fn test_repeat_with_yoyo() {
        let (mut store, id, driver) = setup();
        let mut tl = Timeline::builder()
            .add(Tween::from_to(
                id,
                TransformProps::opacity(0.0),
                TransformProps::opacity(1.0),
                1.0,
            ))
            .repeat(1)
            .yoyo(true)
            .build()
            .unwrap();
        tl.attach(driver);
        tl.play(&mut store);

        tl.advance(&mut store, 1.25);
        assert_eq!(tl.iteration(), 1);
        assert!((store.value(id, Property::Opacity).unwrap() - 0.75).abs() < 1e-4);

        tl.advance(&mut store, 1.0);
        assert_eq!(tl.state(), TimelineState::Completed);
        assert!(store.value(id, Property::Opacity).unwrap().abs() < 1e-4);
    }

    #[test]
    fn test_infinite_repeat_keeps_playing() {
        let (mut store, id, driver) = setup();
        let mut tl = Timeline::builder()
            .add(Tween::from_to(id, TransformProps::scale(1.0), TransformProps::scale(1.5), 2.0))
            .repeat(-1)
            .build()
            .unwrap();
        tl.attach(driver);
        tl.play(&mut store);
        tl.advance(&mut store, 101.0);

        assert!(tl.is_playing());
        assert_eq!(tl.iteration(), 50);
        assert!((tl.time() - 1.0).abs() < 1e-3);
        assert!(tl.total_duration().is_infinite());
    }

    #[test]
    fn test_zero_duration_completes_immediately() {
        let (mut store, id, driver) = setup();
        let mut tl = Timeline::single(Tween::to(id, TransformProps::opacity(0.3), 0.0)).unwrap();
        tl.attach(driver);
        tl.play(&mut store);
        tl.advance(&mut store, 0.016);

        assert_eq!(tl.state(), TimelineState::Completed);
        assert_eq!(store.value(id, Property::Opacity), Some(0.3));
    }

    #[test]
    fn test_complete_callback_fires_once_per_run() {
        let (mut store, id, driver) = setup();
        let completions = Rc::new(Cell::new(0));
        let seen = completions.clone();
        let mut tl = Timeline::builder()
            .add(Tween::to(id, TransformProps::opacity(0.0), 0.5))
            .on_complete(move || seen.set(seen.get() + 1))
            .build()
            .unwrap();
        tl.attach(driver);
        tl.play(&mut store);

        tl.advance(&mut store, 0.3);
        assert_eq!(completions.get(), 0);
        tl.advance(&mut store, 0.3);
        tl.advance(&mut store, 0.3);
        assert_eq!(completions.get(), 1);

        tl.play(&mut store);
        tl.advance(&mut store, 1.0);
        assert_eq!(completions.get(), 2);
    }

    #[test]
    fn test_update_callback_reports_progress() {
        let (mut store, id, driver) = setup();
        let progress = Rc::new(RefCell::new(Vec::new()));
        let seen = progress.clone();
        let mut tl = Timeline::builder()
            .add(Tween::to(id, TransformProps::translate(100.0, 0.0), 1.0))
            .on_update(move |p| seen.borrow_mut().push(p))
            .build()
            .unwrap();
        tl.attach(driver);
        tl.play(&mut store);
        tl.advance(&mut store, 0.25);
        tl.seek(&mut store, 0.5);
        tl.advance(&mut store, 0.75);

        let progress = progress.borrow();
        assert_eq!(progress.len(), 3);
        assert!((progress[0] - 0.25).abs() < 1e-6);
        assert!((progress[1] - 0.5).abs() < 1e-6);
        assert_eq!(progress[2], 1.0);
    }

    #[test]
    fn test_reverse_rewinds_to_start_pose() {
        let (mut store, id, driver) = setup();
        let completions = Rc::new(Cell::new(0));
        let seen = completions.clone();
        let mut tl = Timeline::builder()
            .add(Tween::from_props(id, TransformProps::opacity(0.0).with_y(60.0), 1.0))
            .on_complete(move || seen.set(seen.get() + 1))
            .build()
            .unwrap();
        tl.attach(driver);
        tl.play(&mut store);
        tl.advance(&mut store, 0.6);

        tl.reverse(&mut store);
        assert!(tl.is_reversing());
        tl.advance(&mut store, 0.2);
        assert!((store.value(id, Property::Opacity).unwrap() - 0.4).abs() < 1e-4);

        tl.advance(&mut store, 1.0);
        assert_eq!(tl.state(), TimelineState::Idle);
        assert_eq!(store.value(id, Property::Opacity), Some(0.0));
        assert_eq!(store.value(id, Property::TranslateY), Some(60.0));
        assert_eq!(completions.get(), 0);

        // Reversing at the start does nothing; playing again runs forward
        tl.reverse(&mut store);
        assert!(!tl.is_playing());
        tl.play(&mut store);
        tl.advance(&mut store, 0.5);
        assert!((store.value(id, Property::Opacity).unwrap() - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_play_during_reverse_turns_forward() {
        let (mut store, id, driver) = setup();
        let mut tl = Timeline::single(Tween::to(id, TransformProps::opacity(0.0), 1.0)).unwrap();
        tl.attach(driver);
        tl.play(&mut store);
        tl.advance(&mut store, 2.0);
        assert_eq!(tl.state(), TimelineState::Completed);

        tl.reverse(&mut store);
        tl.advance(&mut store, 0.5);
        tl.play(&mut store);
        assert!(!tl.is_reversing());
        tl.advance(&mut store, 0.25);
        assert!((store.value(id, Property::Opacity).unwrap() - 0.25).abs() < 1e-4);
    }

    #[test]
    fn test_stagger_group_is_one_sequence_slot() {
        let (mut store, id, _) = setup();
        let others: Vec<TargetId> = (0..3)
            .map(|i| store.insert(format!("word-{i}"), TransformState::IDENTITY))
            .collect();
        let template = Tween::from_props(others[0], TransformProps::opacity(0.0), 0.5);
        let tl = Timeline::builder()
            .stagger(&template, &others, Stagger::each(0.1), Position::Sequence)
            .add_at(Tween::to(id, TransformProps::opacity(0.5), 0.2), Position::AfterPrevious(0.0))
            .build()
            .unwrap();

        let last = tl.entries().last().map(|(_, e)| e.start()).unwrap();
        assert!((last - 0.7).abs() < 1e-5);
    }

    #[test]
    fn test_failed_stagger_surfaces_on_build() {
        let (_, id, _) = setup();
        let template = Tween::to(id, TransformProps::opacity(1.0), 0.5);
        let result = Timeline::builder()
            .stagger(&template, &[], Stagger::each(0.1), Position::Sequence)
            .build();
        assert!(matches!(result, Err(AnimationError::EmptyStagger)));
    }
}

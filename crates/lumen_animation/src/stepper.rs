//! Frame stepper
//!
//! Holds per-frame callbacks, each tagged with the scope that registered it
//! so a scope's callbacks can be dropped together. Callbacks receive their
//! own scope's [`FrameTime`].

use lumen_core::{FrameTime, ScopeId};
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    pub struct FrameCallbackId;
}

pub type FrameCallback = Box<dyn FnMut(&FrameTime)>;

struct FrameEntry {
    scope: ScopeId,
    callback: FrameCallback,
}

/// Registry of per-frame callbacks
#[derive(Default)]
pub struct FrameStepper {
    callbacks: SlotMap<FrameCallbackId, FrameEntry>,
}

impl FrameStepper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        scope: ScopeId,
        callback: impl FnMut(&FrameTime) + 'static,
    ) -> FrameCallbackId {
        self.callbacks.insert(FrameEntry {
            scope,
            callback: Box::new(callback),
        })
    }

    pub fn unregister(&mut self, id: FrameCallbackId) -> bool {
        self.callbacks.remove(id).is_some()
    }

    /// Drop every callback a scope registered, returning how many
    pub fn unregister_scope(&mut self, scope: ScopeId) -> usize {
        let before = self.callbacks.len();
        self.callbacks.retain(|_, entry| entry.scope != scope);
        before - self.callbacks.len()
    }

    pub fn scope_of(&self, id: FrameCallbackId) -> Option<ScopeId> {
        self.callbacks.get(id).map(|entry| entry.scope)
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Invoke every callback once with its scope's frame time.
    ///
    /// Callbacks whose scope has no time (`None`) are skipped.
    pub fn step(&mut self, time_for: impl Fn(ScopeId) -> Option<FrameTime>) {
        for entry in self.callbacks.values_mut() {
            if let Some(time) = time_for(entry.scope) {
                (entry.callback)(&time);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_callbacks_receive_scope_time() {
        let mut scopes: SlotMap<ScopeId, ()> = SlotMap::with_key();
        let (a, b) = (scopes.insert(()), scopes.insert(()));
        let seen = Rc::new(RefCell::new(Vec::new()));

        let mut stepper = FrameStepper::new();
        let sink = seen.clone();
        stepper.register(a, move |t| sink.borrow_mut().push(("a", t.elapsed)));
        let sink = seen.clone();
        let id_b = stepper.register(b, move |t| sink.borrow_mut().push(("b", t.elapsed)));

        let time = |scope: ScopeId| {
            Some(FrameTime {
                elapsed: if scope == a { 1.0 } else { 2.0 },
                delta: 0.016,
                frame: 1,
            })
        };
        stepper.step(time);
        assert_eq!(seen.borrow().len(), 2);
        assert!(seen.borrow().contains(&("b", 2.0)));

        assert!(stepper.unregister(id_b));
        assert!(!stepper.unregister(id_b));
        stepper.step(time);
        assert_eq!(seen.borrow().len(), 3);
    }

    #[test]
    fn test_unregister_scope() {
        let mut scopes: SlotMap<ScopeId, ()> = SlotMap::with_key();
        let (a, b) = (scopes.insert(()), scopes.insert(()));
        let mut stepper = FrameStepper::new();
        stepper.register(a, |_| {});
        stepper.register(a, |_| {});
        stepper.register(b, |_| {});

        assert_eq!(stepper.unregister_scope(a), 2);
        assert_eq!(stepper.len(), 1);

        let calls = Rc::new(RefCell::new(0));
        let counter = calls.clone();
        stepper.register(b, move |_| *counter.borrow_mut() += 1);
        stepper.step(|scope| (scope != b).then(FrameTime::default));
        assert_eq!(*calls.borrow(), 0);
    }
}

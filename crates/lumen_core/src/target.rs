//! Animation targets and property ownership
//!
//! The [`TargetStore`] is the only place visual state lives. Drivers
//! (timelines, scroll pins, pointer subscriptions, direct setters) write
//! through it, and each property accepts writes from exactly one owning
//! driver at a time. Claiming a property overwrites the previous owner, and
//! writes from a driver that lost ownership are dropped.
//!
//! Every accepted write is journaled per scope with the value the property
//! held before the scope first touched it, which is what makes
//! [`TargetStore::revert_scope`] possible.

use crate::transform::{Property, TransformState};
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// A registered animatable element
    pub struct TargetId;
    /// An orchestration scope (one per context)
    pub struct ScopeId;
}

/// Unique driver identity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DriverId(u64);

impl DriverId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Handle a driver uses to write into the store
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Driver {
    pub id: DriverId,
    pub scope: ScopeId,
}

struct TargetSlot {
    label: String,
    state: TransformState,
    owners: [Option<Driver>; Property::COUNT],
}

/// Storage for every target's state and property ownership
#[derive(Default)]
pub struct TargetStore {
    targets: SlotMap<TargetId, TargetSlot>,
    journals: FxHashMap<ScopeId, FxHashMap<(TargetId, Property), f32>>,
    next_driver: u64,
    mutations: u64,
}

impl TargetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a target with its initial state
    pub fn insert(&mut self, label: impl Into<String>, state: TransformState) -> TargetId {
        self.targets.insert(TargetSlot {
            label: label.into(),
            state,
            owners: [None; Property::COUNT],
        })
    }

    /// Remove a target. Subsequent writes to it are silently dropped.
    pub fn remove(&mut self, id: TargetId) -> Option<TransformState> {
        self.targets.remove(id).map(|slot| slot.state)
    }

    pub fn contains(&self, id: TargetId) -> bool {
        self.targets.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn state(&self, id: TargetId) -> Option<&TransformState> {
        self.targets.get(id).map(|slot| &slot.state)
    }

    pub fn value(&self, id: TargetId, property: Property) -> Option<f32> {
        self.state(id).map(|state| state.get(property))
    }

    pub fn label(&self, id: TargetId) -> Option<&str> {
        self.targets.get(id).map(|slot| slot.label.as_str())
    }

    /// Allocate a fresh driver identity within a scope
    pub fn allocate_driver(&mut self, scope: ScopeId) -> Driver {
        self.next_driver += 1;
        Driver {
            id: DriverId(self.next_driver),
            scope,
        }
    }

    /// Take ownership of a property, displacing any previous owner.
    ///
    /// Returns `false` if the target does not exist.
    pub fn claim(&mut self, driver: Driver, id: TargetId, property: Property) -> bool {
        match self.targets.get_mut(id) {
            Some(slot) => {
                slot.owners[property.index()] = Some(driver);
                true
            }
            None => false,
        }
    }

    pub fn owner(&self, id: TargetId, property: Property) -> Option<Driver> {
        self.targets
            .get(id)
            .and_then(|slot| slot.owners[property.index()])
    }

    /// Give up ownership if `driver` still holds it
    pub fn release(&mut self, driver: Driver, id: TargetId, property: Property) {
        if let Some(slot) = self.targets.get_mut(id) {
            let owner = &mut slot.owners[property.index()];
            if *owner == Some(driver) {
                *owner = None;
            }
        }
    }

    /// Release every property owned by any driver of `scope`
    pub fn release_scope(&mut self, scope: ScopeId) {
        for slot in self.targets.values_mut() {
            for owner in slot.owners.iter_mut() {
                if owner.is_some_and(|d| d.scope == scope) {
                    *owner = None;
                }
            }
        }
    }

    /// Write a property value on behalf of a driver.
    ///
    /// Writes to removed targets and writes from non-owners are dropped and
    /// return `false`.
    pub fn write(&mut self, driver: Driver, id: TargetId, property: Property, value: f32) -> bool {
        let Some(slot) = self.targets.get_mut(id) else {
            tracing::trace!(?id, %property, "dropping write to removed target");
            return false;
        };
        if slot.owners[property.index()] != Some(driver) {
            tracing::trace!(
                ?id,
                %property,
                driver = driver.id.raw(),
                "dropping write from non-owner"
            );
            return false;
        }

        let previous = slot.state.get(property);
        self.journals
            .entry(driver.scope)
            .or_default()
            .entry((id, property))
            .or_insert(previous);

        slot.state.set(property, value);
        self.mutations += 1;
        true
    }

    /// Restore every property `scope` has written to the value it held before
    /// the scope first touched it.
    ///
    /// Properties now owned by a driver of another scope are left alone, as
    /// are targets that no longer exist. Returns the number of restored
    /// properties.
    pub fn revert_scope(&mut self, scope: ScopeId) -> usize {
        let Some(journal) = self.journals.remove(&scope) else {
            return 0;
        };

        let mut restored = 0;
        for ((id, property), original) in journal {
            let Some(slot) = self.targets.get_mut(id) else {
                continue;
            };
            let owner = &mut slot.owners[property.index()];
            if owner.is_some_and(|d| d.scope != scope) {
                continue;
            }
            *owner = None;
            slot.state.set(property, original);
            restored += 1;
        }
        restored
    }

    /// Drop `scope`'s journal without restoring anything
    pub fn forget_scope(&mut self, scope: ScopeId) {
        self.journals.remove(&scope);
    }

    /// Total number of accepted writes
    pub fn mutation_count(&self) -> u64 {
        self.mutations
    }
}

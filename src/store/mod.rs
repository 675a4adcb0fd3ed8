// In-memory document store: the single source of truth shared by the HTTP
// handlers, the persistence loop, the file reconciler and the scheduler.
// One RwLock guards the document, the dirty flag and the mutation sequence.

use crate::error::{Error, Result};
use crate::models::{
    Container, DataDocument, Group, Schedule, TargetType, validate_container, validate_group,
    validate_schedule,
};
use chrono::{DateTime, Utc};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Read access to independent copies of the document.
pub trait SnapshotSource: Send + Sync {
    fn snapshot(&self) -> DataDocument;
}

pub trait ContainerStore: SnapshotSource {
    fn add_container(&self, container: Container) -> Result<DataDocument>;
    fn remove_container(&self, name: &str) -> Result<DataDocument>;
    /// Stamps an existing container as activated; never inserts.
    fn set_activated_at(&self, name: &str, at: DateTime<Utc>) -> Result<DataDocument>;
}

pub trait GroupStore: SnapshotSource {
    fn add_group(&self, group: Group) -> Result<DataDocument>;
    fn remove_group(&self, name: &str) -> Result<DataDocument>;
}

pub trait ScheduleStore: SnapshotSource {
    fn add_schedule(&self, schedule: Schedule) -> Result<DataDocument>;
    fn remove_schedule(&self, id: &str) -> Result<DataDocument>;
}

/// Version and dirty-state operations used by the flush loop and the reconciler.
pub trait PersistableStore: SnapshotSource {
    fn is_dirty(&self) -> bool;
    fn mark_dirty(&self);
    fn clear_dirty(&self);
    fn last_update(&self) -> i64;
    fn set_last_update(&self, version: i64);
    /// Swaps in a copy of `doc`, clears dirty and adopts its version.
    fn replace(&self, doc: &DataDocument);
    /// Like `replace`, but refuses (returns false) while local changes are unflushed.
    fn replace_unless_dirty(&self, doc: &DataDocument) -> bool;
    /// Snapshot plus the mutation sequence it reflects.
    fn snapshot_for_flush(&self) -> (DataDocument, u64);
    /// Records a successful write of the snapshot taken at `seq`. Dirty is
    /// cleared only if nothing was mutated since that snapshot.
    fn mark_flushed(&self, seq: u64, version: i64);
}

#[derive(Debug, Default)]
struct State {
    doc: DataDocument,
    dirty: bool,
    seq: u64,
}

impl State {
    fn touch(&mut self) {
        self.dirty = true;
        self.seq += 1;
    }
}

#[derive(Debug, Default)]
pub struct DocumentStore {
    state: RwLock<State>,
}

impl DocumentStore {
    /// Store seeded with `doc` (clean, version taken from the document).
    pub fn new(doc: DataDocument) -> Self {
        Self {
            state: RwLock::new(State {
                doc,
                dirty: false,
                seq: 0,
            }),
        }
    }

    // Mutations never panic while holding the guard, so a poisoned lock still
    // holds a consistent document.
    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn upsert<T>(items: &mut Vec<T>, item: T, same_key: impl Fn(&T) -> bool) -> bool {
    match items.iter_mut().find(|existing| same_key(existing)) {
        Some(existing) => {
            *existing = item;
            false
        }
        None => {
            items.push(item);
            true
        }
    }
}

fn drop_schedules_for(doc: &mut DataDocument, target_type: TargetType, name: &str) -> usize {
    let before = doc.schedules.len();
    doc.schedules.retain(|s| !s.targets(target_type, name));
    before - doc.schedules.len()
}

impl SnapshotSource for DocumentStore {
    fn snapshot(&self) -> DataDocument {
        self.read().doc.clone()
    }
}

impl ContainerStore for DocumentStore {
    fn add_container(&self, container: Container) -> Result<DataDocument> {
        validate_container(&container)?;
        let mut state = self.write();
        let name = container.name.clone();
        if upsert(&mut state.doc.containers, container, |c| c.name == name) {
            state.doc.order.push(name);
        }
        state.touch();
        Ok(state.doc.clone())
    }

    fn remove_container(&self, name: &str) -> Result<DataDocument> {
        let mut state = self.write();
        let Some(idx) = state.doc.containers.iter().position(|c| c.name == name) else {
            return Err(Error::not_found("container", name));
        };
        state.doc.containers.remove(idx);
        state.doc.order.retain(|n| n != name);
        let cascaded = drop_schedules_for(&mut state.doc, TargetType::Container, name);
        if cascaded > 0 {
            tracing::debug!(container = %name, schedules = cascaded, "cascaded schedule delete");
        }
        state.touch();
        Ok(state.doc.clone())
    }

    fn set_activated_at(&self, name: &str, at: DateTime<Utc>) -> Result<DataDocument> {
        let mut state = self.write();
        let Some(container) = state.doc.containers.iter_mut().find(|c| c.name == name) else {
            return Err(Error::not_found("container", name));
        };
        container.activated_at = Some(at);
        state.touch();
        Ok(state.doc.clone())
    }
}

impl GroupStore for DocumentStore {
    fn add_group(&self, group: Group) -> Result<DataDocument> {
        validate_group(&group)?;
        let mut state = self.write();
        let name = group.name.clone();
        if upsert(&mut state.doc.groups, group, |g| g.name == name) {
            state.doc.group_order.push(name);
        }
        state.touch();
        Ok(state.doc.clone())
    }

    fn remove_group(&self, name: &str) -> Result<DataDocument> {
        let mut state = self.write();
        let Some(idx) = state.doc.groups.iter().position(|g| g.name == name) else {
            return Err(Error::not_found("group", name));
        };
        state.doc.groups.remove(idx);
        state.doc.group_order.retain(|n| n != name);
        let cascaded = drop_schedules_for(&mut state.doc, TargetType::Group, name);
        if cascaded > 0 {
            tracing::debug!(group = %name, schedules = cascaded, "cascaded schedule delete");
        }
        state.touch();
        Ok(state.doc.clone())
    }
}

impl ScheduleStore for DocumentStore {
    fn add_schedule(&self, schedule: Schedule) -> Result<DataDocument> {
        validate_schedule(&schedule)?;
        let mut state = self.write();
        let id = schedule.id.clone();
        upsert(&mut state.doc.schedules, schedule, |s| s.id == id);
        state.touch();
        Ok(state.doc.clone())
    }

    fn remove_schedule(&self, id: &str) -> Result<DataDocument> {
        let mut state = self.write();
        let before = state.doc.schedules.len();
        state.doc.schedules.retain(|s| s.id != id);
        if state.doc.schedules.len() == before {
            return Err(Error::not_found("schedule", id));
        }
        state.touch();
        Ok(state.doc.clone())
    }
}

impl PersistableStore for DocumentStore {
    fn is_dirty(&self) -> bool {
        self.read().dirty
    }

    fn mark_dirty(&self) {
        self.write().touch();
    }

    fn clear_dirty(&self) {
        self.write().dirty = false;
    }

    fn last_update(&self) -> i64 {
        self.read().doc.metadata.last_update
    }

    fn set_last_update(&self, version: i64) {
        self.write().doc.metadata.last_update = version;
    }

    fn replace(&self, doc: &DataDocument) {
        let mut state = self.write();
        state.doc = doc.clone();
        state.dirty = false;
        state.seq += 1;
    }

    fn replace_unless_dirty(&self, doc: &DataDocument) -> bool {
        let mut state = self.write();
        if state.dirty {
            return false;
        }
        state.doc = doc.clone();
        state.seq += 1;
        true
    }

    fn snapshot_for_flush(&self) -> (DataDocument, u64) {
        let state = self.read();
        (state.doc.clone(), state.seq)
    }

    fn mark_flushed(&self, seq: u64, version: i64) {
        let mut state = self.write();
        state.doc.metadata.last_update = version;
        if state.seq == seq {
            state.dirty = false;
        }
    }
}

//! Handle-based object table.
//!
//! Slots are reused after an object is swept, so every stored reference is an
//! [`ObjectRef`] pairing the slot with the object's unique id. A reference whose
//! id no longer matches the slot's occupant is stale and resolves to nothing.

use crate::fixed::Coord;
use crate::object::{attr, Activity, SpaceObject};
use serde::{Deserialize, Serialize};

/// Maximum number of simultaneously allocated objects.
pub const MAX_OBJECTS: usize = 250;

/// Axis deltas above this make the squared distance a candidate for overflow.
pub const MAXIMUM_RELEVANT_DISTANCE: u32 = 46340;

/// Squared distance reported for pairs too far apart to measure.
pub const DISTANCE_SENTINEL: u32 = u32::MAX;

/// Stable reference to an object: slot index plus identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectRef {
    pub slot: u32,
    pub id: u32,
}

impl ObjectRef {
    /// Placeholder handle for objects not yet inserted.
    pub const NONE: ObjectRef = ObjectRef {
        slot: u32::MAX,
        id: 0,
    };
}

/// Squared euclidean distance with overflow guards.
///
/// When either axis delta exceeds [`MAXIMUM_RELEVANT_DISTANCE`] the result is
/// [`DISTANCE_SENTINEL`]: larger than every measurable distance, so ordering
/// is preserved without wrapping.
pub fn distance_squared(a: Coord, b: Coord) -> u32 {
    let dh = (a.h as i64 - b.h as i64).unsigned_abs();
    let dv = (a.v as i64 - b.v as i64).unsigned_abs();
    if dh > MAXIMUM_RELEVANT_DISTANCE as u64 || dv > MAXIMUM_RELEVANT_DISTANCE as u64 {
        return DISTANCE_SENTINEL;
    }
    (dh * dh + dv * dv).min(DISTANCE_SENTINEL as u64) as u32
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectTable {
    slots: Vec<Option<SpaceObject>>,
    next_id: u32,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a reference. Objects waiting to be swept still resolve, so a
    /// dying object's own destroy and expire actions can refer to it.
    pub fn get(&self, r: ObjectRef) -> Option<&SpaceObject> {
        self.slots
            .get(r.slot as usize)
            .and_then(Option::as_ref)
            .filter(|o| o.handle.id == r.id)
    }

    pub fn get_mut(&mut self, r: ObjectRef) -> Option<&mut SpaceObject> {
        self.slots
            .get_mut(r.slot as usize)
            .and_then(Option::as_mut)
            .filter(|o| o.handle.id == r.id)
    }

    /// Object in a slot regardless of identity.
    pub fn slot(&self, slot: usize) -> Option<&SpaceObject> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// True if `r` names a live object that is not waiting for removal.
    pub fn is_active(&self, r: ObjectRef) -> bool {
        self.get(r).is_some_and(SpaceObject::is_active)
    }

    /// Drop a reference that has gone stale.
    pub fn resolve(&self, r: Option<ObjectRef>) -> Option<ObjectRef> {
        r.filter(|r| self.get(*r).is_some())
    }

    /// Handles of every in-use object in slot order.
    pub fn active_refs(&self) -> Vec<ObjectRef> {
        self.iter_active().map(|o| o.handle).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpaceObject> {
        self.slots.iter().flatten()
    }

    pub fn iter_active(&self) -> impl Iterator<Item = &SpaceObject> {
        self.iter().filter(|o| o.is_active())
    }

    pub fn iter_active_mut(&mut self) -> impl Iterator<Item = &mut SpaceObject> {
        self.slots.iter_mut().flatten().filter(|o| o.is_active())
    }

    pub fn active_count(&self) -> usize {
        self.iter_active().count()
    }

    /// Store `obj` in the first free slot and give it a fresh identity.
    /// Returns `None` when the table is full.
    pub fn insert(&mut self, mut obj: SpaceObject) -> Option<ObjectRef> {
        let slot = match self.slots.iter().position(Option::is_none) {
            Some(slot) => slot,
            None if self.slots.len() < MAX_OBJECTS => {
                self.slots.push(None);
                self.slots.len() - 1
            }
            None => return None,
        };
        self.next_id = self.next_id.wrapping_add(1).max(1);
        let handle = ObjectRef {
            slot: slot as u32,
            id: self.next_id,
        };
        obj.handle = handle;
        obj.active = Activity::InUse;
        self.slots[slot] = Some(obj);
        Some(handle)
    }

    /// Flag an object for removal at the end of the tick. Returns false if it
    /// was already gone or already flagged.
    pub fn mark_for_removal(&mut self, r: ObjectRef) -> bool {
        match self.get_mut(r) {
            Some(obj) if obj.is_active() => {
                obj.active = Activity::ToBeFreed;
                true
            }
            _ => false,
        }
    }

    /// Free every flagged slot. Returns the number of objects removed.
    pub fn sweep(&mut self) -> usize {
        let mut removed = 0;
        for slot in &mut self.slots {
            if slot.as_ref().is_some_and(|o| !o.is_active()) {
                *slot = None;
                removed += 1;
            }
        }
        removed
    }

    /// Nearest in-use object hostile to `r` that can be engaged or evaded,
    /// with its squared distance. Ties go to the lowest slot.
    pub fn closest_hostile(&self, r: ObjectRef) -> Option<(ObjectRef, u32)> {
        let me = self.get(r)?;
        let mut best: Option<(ObjectRef, u32)> = None;
        for other in self.iter_active() {
            if other.handle == me.handle
                || other.owner == me.owner
                || !other.has(attr::POTENTIAL_TARGET)
            {
                continue;
            }
            let d = distance_squared(me.location, other.location);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((other.handle, d));
            }
        }
        best
    }
}

//! Action eligibility and reference resolution.
//!
//! An action's filter is checked against its *focus*, the object the effect
//! lands on. Static checks (scenario validation) use a base type's default
//! attributes; runtime checks use the live attributes, which may carry flags
//! such as autopilot or a static destination.

use super::{Action, ObjectSelector, OwnerRelation, Tags};
use crate::object::SpaceObject;
use crate::registry::ObjectRef;
use crate::scenario::{AdmiralId, BaseObject};
use crate::state::WorldState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Filter {
    /// Every bit here must be set on the candidate.
    #[serde(default)]
    pub attributes: u32,
    /// Every tag here must be carried by the candidate's type.
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub owner: OwnerRelation,
}

impl Filter {
    pub fn is_empty(&self) -> bool {
        self.attributes == 0 && self.tags.is_empty() && self.owner == OwnerRelation::Any
    }

    fn attributes_allow(&self, attributes: u32) -> bool {
        attributes & self.attributes == self.attributes
    }

    fn tags_allow(&self, tags: &Tags) -> bool {
        self.tags.is_subset(tags)
    }

    /// Owner relation between a candidate and the subject.
    pub fn owner_allows(&self, candidate: Option<AdmiralId>, subject: Option<AdmiralId>) -> bool {
        match self.owner {
            OwnerRelation::Any => true,
            OwnerRelation::Same => candidate == subject,
            OwnerRelation::Different => candidate != subject,
        }
    }

    /// Attribute and tag check against a type's default attributes. Ownership
    /// is not known before instantiation and is not checked.
    pub fn applies_to_base(&self, base: &BaseObject) -> bool {
        self.attributes_allow(base.attributes) && self.tags_allow(&base.tags)
    }

    /// Full check against a live object, including the owner relation to
    /// the subject's owner.
    pub fn applies_to(
        &self,
        candidate: &SpaceObject,
        base: &BaseObject,
        subject_owner: Option<AdmiralId>,
    ) -> bool {
        self.attributes_allow(candidate.attributes)
            && self.tags_allow(&base.tags)
            && self.owner_allows(candidate.owner, subject_owner)
    }
}

/// Look up an override selector against the current world.
pub fn resolve_selector(state: &WorldState, selector: ObjectSelector) -> Option<ObjectRef> {
    let r = match selector {
        ObjectSelector::Initial(i) => state.initials.get(i).copied().flatten(),
        ObjectSelector::Flagship(a) => state.admirals.get(a).and_then(|a| a.flagship),
        ObjectSelector::Control(a) => state.admirals.get(a).and_then(|a| a.control),
        ObjectSelector::Target(a) => state.admirals.get(a).and_then(|a| a.target),
    };
    state.objects.resolve(r)
}

/// Subject, direct object and focus of one action after overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub subject: Option<ObjectRef>,
    pub direct: Option<ObjectRef>,
    pub focus: Option<ObjectRef>,
}

/// Apply overrides and pick the focus.
///
/// Stale handles are dropped first. An override subject becomes the focus;
/// otherwise the focus is the subject for reflexive actions and the direct
/// object for the rest. Kinds that default to the subject use it when that
/// choice comes up empty.
pub fn resolve_focus(
    state: &WorldState,
    action: &Action,
    subject: Option<ObjectRef>,
    direct: Option<ObjectRef>,
) -> Resolved {
    let override_subject = action
        .override_
        .subject
        .and_then(|s| resolve_selector(state, s));
    let override_direct = action
        .override_
        .direct
        .and_then(|s| resolve_selector(state, s));

    let subject = override_subject.or_else(|| state.objects.resolve(subject));
    let direct = override_direct.or_else(|| state.objects.resolve(direct));

    let focus = if override_subject.is_some() {
        override_subject
    } else if action.reflexive.unwrap_or(false) {
        subject
    } else {
        direct
    };
    let focus = match focus {
        None if action.kind.focus_defaults_to_subject() => subject,
        f => f,
    };
    Resolved {
        subject,
        direct,
        focus,
    }
}

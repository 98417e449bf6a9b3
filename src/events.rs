//! Typed mutation events and the per-scope event log.

use crate::node::SchemaNode;
use crate::versions::VersionKey;

/// Wire tag of a mutation event.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    AddField = 1,
    DelField = 2,
    RetypeField = 3,
    ReorderField = 4,
    AlignField = 5,
}

impl EventKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(EventKind::AddField),
            2 => Some(EventKind::DelField),
            3 => Some(EventKind::RetypeField),
            4 => Some(EventKind::ReorderField),
            5 => Some(EventKind::AlignField),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// A field appeared, at `index` among its siblings in the dump that introduced it.
    FieldAdded {
        subtree: Box<SchemaNode>,
        index: usize,
    },
    FieldRemoved {
        name: String,
    },
    AlignmentChanged {
        name: String,
        aligned: bool,
    },
    /// Not produced by the differ yet.
    Retyped {
        name: String,
        type_name: String,
    },
    /// Not produced by the differ yet.
    Reordered {
        name: String,
        index: usize,
    },
}

impl Mutation {
    pub fn kind(&self) -> EventKind {
        match self {
            Mutation::FieldAdded { .. } => EventKind::AddField,
            Mutation::FieldRemoved { .. } => EventKind::DelField,
            Mutation::AlignmentChanged { .. } => EventKind::AlignField,
            Mutation::Retyped { .. } => EventKind::RetypeField,
            Mutation::Reordered { .. } => EventKind::ReorderField,
        }
    }

    /// Name of the field this event is about.
    pub fn field_name(&self) -> &str {
        match self {
            Mutation::FieldAdded { subtree, .. } => &subtree.name,
            Mutation::FieldRemoved { name }
            | Mutation::AlignmentChanged { name, .. }
            | Mutation::Retyped { name, .. }
            | Mutation::Reordered { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MutationEvent {
    pub version: VersionKey,
    pub mutation: Mutation,
}

impl MutationEvent {
    pub fn new(version: VersionKey, mutation: Mutation) -> Self {
        Self { version, mutation }
    }

    pub fn kind(&self) -> EventKind {
        self.mutation.kind()
    }
}

/// Whether a field is readable at a given version, and whether the reader
/// must realign after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldState {
    pub present: bool,
    pub aligned: bool,
}

/// Append-only history of one sibling scope, in non-decreasing version order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    events: Vec<MutationEvent>,
}

impl EventLog {
    pub fn push(&mut self, event: MutationEvent) {
        debug_assert!(
            self.last_version().is_none_or(|last| last <= event.version),
            "event log must not go back in time"
        );
        self.events.push(event);
    }

    pub fn record(&mut self, version: VersionKey, mutation: Mutation) {
        self.push(MutationEvent::new(version, mutation));
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MutationEvent> {
        self.events.iter()
    }

    pub fn last_version(&self) -> Option<VersionKey> {
        self.events.last().map(|e| e.version)
    }

    /// Events about the field `name`, oldest first.
    pub fn for_field<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MutationEvent> + 'a {
        self.events
            .iter()
            .filter(move |e| e.mutation.field_name() == name)
    }

    fn latest_at<'a>(
        &'a self,
        name: &'a str,
        version: VersionKey,
        kinds: &'a [EventKind],
    ) -> Option<&'a MutationEvent> {
        self.for_field(name)
            .take_while(|e| e.version <= version)
            .filter(|e| kinds.contains(&e.kind()))
            .last()
    }

    /// `Some(true)` if the latest add/remove of `name` at or before `version`
    /// is an add, `Some(false)` if it is a removal, `None` if there is none.
    pub fn presence_at(&self, name: &str, version: VersionKey) -> Option<bool> {
        self.latest_at(name, version, &[EventKind::AddField, EventKind::DelField])
            .map(|e| e.kind() == EventKind::AddField)
    }

    /// Payload of the latest alignment change at or before `version`;
    /// unaligned when there is none.
    pub fn alignment_at(&self, name: &str, version: VersionKey) -> bool {
        match self.latest_at(name, version, &[EventKind::AlignField]) {
            Some(MutationEvent {
                mutation: Mutation::AlignmentChanged { aligned, .. },
                ..
            }) => *aligned,
            _ => false,
        }
    }

    pub fn state_at(&self, name: &str, version: VersionKey) -> FieldState {
        FieldState {
            present: self.presence_at(name, version).unwrap_or(false),
            aligned: self.alignment_at(name, version),
        }
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a MutationEvent;
    type IntoIter = std::slice::Iter<'a, MutationEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

//! Folds a newly decoded type tree into the running union tree.
//!
//! Fields are matched by exact name within one sibling scope. The union node
//! is mutated in place and its log gains events stamped with the newer
//! version. Nothing is ever dropped from the union: a field missing from the
//! newer tree is marked removed and kept where it was.

use crate::events::{EventLog, Mutation};
use crate::node::{ChildScope, SchemaNode};
use crate::versions::VersionKey;

/// Merges `newer` into `union` and returns the number of events emitted,
/// counting the whole subtree.
///
/// `union` takes over the layout attributes of `newer`. Its children end up in
/// `newer`'s order, with fields absent from `newer` reinserted at the position
/// they held in the previous union scope. When several fields disappear in the
/// same version, they are reinserted lowest previous position first, which
/// keeps their relative order but is not guaranteed to reproduce the exact
/// historical offsets.
pub fn merge(union: &mut SchemaNode, newer: SchemaNode, version: VersionKey) -> usize {
    union.absorb_attributes(&newer);
    merge_children(union, newer.children, version)
}

fn merge_children(union: &mut SchemaNode, incoming: ChildScope, version: VersionKey) -> usize {
    let mut emitted = 0;

    // Previous scope as slots so each field remembers its old position.
    let mut previous: Vec<Option<SchemaNode>> = std::mem::take(&mut union.children)
        .into_iter()
        .map(Some)
        .collect();
    let mut merged = ChildScope::with_capacity(previous.len().max(incoming.len()));

    for (position, newer) in incoming.into_iter().enumerate() {
        let existing = previous
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|n| n.name == newer.name))
            .and_then(Option::take);

        let node = match existing {
            Some(mut older) => {
                if older.removed {
                    older.removed = false;
                    emitted += record_added(&mut union.events, &newer, position, version);
                }
                emitted += record_alignment(&mut union.events, &older, &newer, version);
                emitted += merge(&mut older, newer, version);
                older
            }
            None => {
                emitted += record_added(&mut union.events, &newer, position, version);
                if newer.is_aligned() {
                    union.events.record(
                        version,
                        Mutation::AlignmentChanged {
                            name: newer.name.clone(),
                            aligned: true,
                        },
                    );
                    emitted += 1;
                }
                let mut fresh = newer.shell();
                emitted += merge(&mut fresh, newer, version);
                fresh
            }
        };

        // Names in `incoming` are unique, so this cannot collide.
        let _ = merged.push(node);
    }

    for (old_position, slot) in previous.into_iter().enumerate() {
        let Some(mut stale) = slot else { continue };

        if !stale.removed {
            union.events.record(
                version,
                Mutation::FieldRemoved {
                    name: stale.name.clone(),
                },
            );
            stale.removed = true;
            emitted += 1;
        }
        let _ = merged.insert_at(old_position, stale);
    }

    union.children = merged;
    emitted
}

fn record_added(log: &mut EventLog, newer: &SchemaNode, index: usize, version: VersionKey) -> usize {
    log.record(
        version,
        Mutation::FieldAdded {
            subtree: Box::new(newer.snapshot()),
            index,
        },
    );
    1
}

fn record_alignment(
    log: &mut EventLog,
    older: &SchemaNode,
    newer: &SchemaNode,
    version: VersionKey,
) -> usize {
    if older.is_aligned() == newer.is_aligned() {
        return 0;
    }
    log.record(
        version,
        Mutation::AlignmentChanged {
            name: newer.name.clone(),
            aligned: newer.is_aligned(),
        },
    );
    1
}

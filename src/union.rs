use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::differ;
use crate::errors::{Error, Result};
use crate::events::FieldState;
use crate::node::SchemaNode;
use crate::versions::VersionKey;

/// Outcome of folding one version into the union.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub classes_created: usize,
    pub classes_updated: usize,
    pub events_emitted: usize,
}

/// Superset schema of every class seen so far, keyed by class name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnionTree {
    classes: BTreeMap<String, SchemaNode>,
    last_version: Option<VersionKey>,
}

impl UnionTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one version's decoded trees into the union.
    ///
    /// Versions must arrive in strictly ascending order. Classes absent from
    /// `trees` are left untouched. If a class appears twice in one dump, the
    /// later tree is used.
    pub fn ingest(&mut self, version: VersionKey, trees: Vec<SchemaNode>) -> Result<IngestStats> {
        if let Some(previous) = self.last_version {
            if version <= previous {
                return Err(Error::OutOfOrder {
                    previous,
                    next: version,
                });
            }
        }
        self.last_version = Some(version);

        let mut latest: BTreeMap<String, SchemaNode> = BTreeMap::new();
        for tree in trees {
            if let Some(earlier) = latest.insert(tree.type_name.clone(), tree) {
                warn!(
                    class = %earlier.type_name,
                    version = %version,
                    "class declared twice in one dump, keeping the later tree"
                );
            }
        }

        let mut stats = IngestStats::default();
        for (class, tree) in latest {
            if self.classes.contains_key(&class) {
                stats.classes_updated += 1;
            } else {
                debug!(class = %class, version = %version, "new class");
                stats.classes_created += 1;
            }
            let root = self.classes.entry(class).or_insert_with(|| tree.shell());
            stats.events_emitted += differ::merge(root, tree, version);
        }

        Ok(stats)
    }

    pub fn class(&self, name: &str) -> Option<&SchemaNode> {
        self.classes.get(name)
    }

    /// Classes in name order.
    pub fn classes(&self) -> impl Iterator<Item = (&str, &SchemaNode)> {
        self.classes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn last_version(&self) -> Option<VersionKey> {
        self.last_version
    }

    /// Presence and alignment of the field at `path` below class `class` at
    /// `version`. A nested field counts as present only when every field on
    /// the path is. Returns `None` for unknown classes or paths.
    pub fn field_state(&self, class: &str, path: &[&str], version: VersionKey) -> Option<FieldState> {
        let (last, parents) = path.split_last()?;
        let mut scope = self.classes.get(class)?;
        let mut present = true;

        for name in parents {
            present &= scope.events.presence_at(name, version).unwrap_or(false);
            scope = scope.child(name)?;
        }
        scope.child(last)?;

        let state = scope.events.state_at(last, version);
        Some(FieldState {
            present: present && state.present,
            aligned: state.aligned,
        })
    }

    pub(crate) fn insert_class(&mut self, name: String, root: SchemaNode) {
        self.last_version = self.last_version.max(latest_event(&root));
        self.classes.insert(name, root);
    }
}

fn latest_event(node: &SchemaNode) -> Option<VersionKey> {
    node.children
        .iter()
        .filter_map(latest_event)
        .chain(node.events.last_version())
        .max()
}

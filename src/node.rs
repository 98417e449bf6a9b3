use crate::events::EventLog;

/// Meta flag bit: the reader must round up to a 4-byte boundary after the field.
pub const ALIGN_FLAG: u32 = 0x4000;

/// Type flag bit marking an array node.
pub const ARRAY_FLAG: u8 = 0x01;

/// One field of a type tree, or a class root.
///
/// In the union tree, `events` records the history of this node's children:
/// additions, removals and alignment changes of the fields directly below it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaNode {
    pub type_name: String,
    pub name: String,
    pub byte_size: i32,
    pub declared_index: i32,
    pub type_flags: u8,
    pub meta_flags: u32,
    pub children: ChildScope,
    pub events: EventLog,
    pub removed: bool,
}

impl SchemaNode {
    pub fn new(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn is_aligned(&self) -> bool {
        self.meta_flags & ALIGN_FLAG != 0
    }

    pub fn is_array(&self) -> bool {
        self.type_flags & ARRAY_FLAG != 0
    }

    pub fn child(&self, name: &str) -> Option<&SchemaNode> {
        self.children.get(name)
    }

    /// Follows `path` one field name at a time, starting below `self`.
    pub fn find(&self, path: &[&str]) -> Option<&SchemaNode> {
        path.iter().try_fold(self, |node, name| node.child(name))
    }

    /// Copy of the layout of this subtree without any history.
    pub fn snapshot(&self) -> SchemaNode {
        SchemaNode {
            children: self.children.iter().map(SchemaNode::snapshot).collect(),
            events: EventLog::default(),
            removed: false,
            ..self.shell()
        }
    }

    /// Copy of this node's own attributes, with no children and no history.
    pub fn shell(&self) -> SchemaNode {
        SchemaNode {
            type_name: self.type_name.clone(),
            name: self.name.clone(),
            byte_size: self.byte_size,
            declared_index: self.declared_index,
            type_flags: self.type_flags,
            meta_flags: self.meta_flags,
            ..Default::default()
        }
    }

    /// Takes over the layout attributes of a newer observation of this field.
    pub fn absorb_attributes(&mut self, newer: &SchemaNode) {
        self.type_name.clone_from(&newer.type_name);
        self.byte_size = newer.byte_size;
        self.declared_index = newer.declared_index;
        self.type_flags = newer.type_flags;
        self.meta_flags = newer.meta_flags;
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SchemaNode::node_count).sum::<usize>()
    }
}

/// Ordered sibling scope keyed by field name.
///
/// Names are unique within a scope and insertion order is the field order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChildScope {
    nodes: Vec<SchemaNode>,
}

impl ChildScope {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SchemaNode> {
        self.nodes.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, SchemaNode> {
        self.nodes.iter_mut()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&SchemaNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut SchemaNode> {
        self.nodes.iter_mut().find(|n| n.name == name)
    }

    /// Appends `node`, handing it back if the name is already taken.
    pub fn push(&mut self, node: SchemaNode) -> Result<(), SchemaNode> {
        if self.contains(&node.name) {
            return Err(node);
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Inserts `node` at `index`, clamped to the end of the scope. Returns the
    /// position it landed at, or hands the node back if the name is taken.
    pub fn insert_at(&mut self, index: usize, node: SchemaNode) -> Result<usize, SchemaNode> {
        if self.contains(&node.name) {
            return Err(node);
        }
        let index = index.min(self.nodes.len());
        self.nodes.insert(index, node);
        Ok(index)
    }

    pub fn remove(&mut self, name: &str) -> Option<SchemaNode> {
        let idx = self.position(name)?;
        Some(self.nodes.remove(idx))
    }
}

impl FromIterator<SchemaNode> for ChildScope {
    /// Later duplicates of a name are dropped.
    fn from_iter<I: IntoIterator<Item = SchemaNode>>(iter: I) -> Self {
        let mut scope = ChildScope::default();
        for node in iter {
            let _ = scope.push(node);
        }
        scope
    }
}

impl IntoIterator for ChildScope {
    type Item = SchemaNode;
    type IntoIter = std::vec::IntoIter<SchemaNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChildScope {
    type Item = &'a SchemaNode;
    type IntoIter = std::slice::Iter<'a, SchemaNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(names: &[&str]) -> ChildScope {
        names.iter().map(|n| SchemaNode::new("int", *n)).collect()
    }

    #[test]
    fn test_scope_rejects_duplicate_names() {
        let mut s = scope(&["a", "b"]);
        assert!(s.push(SchemaNode::new("float", "a")).is_err());
        assert!(s.insert_at(0, SchemaNode::new("float", "b")).is_err());
        assert_eq!(s.names().collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn test_insert_at_preserves_order_and_clamps() {
        let mut s = scope(&["a", "c"]);
        assert_eq!(s.insert_at(1, SchemaNode::new("int", "b")), Ok(1));
        assert_eq!(s.insert_at(10, SchemaNode::new("int", "z")), Ok(3));
        assert_eq!(s.names().collect::<Vec<_>>(), ["a", "b", "c", "z"]);
        assert_eq!(s.position("c"), Some(2));
    }

    #[test]
    fn test_remove_and_lookup() {
        let mut s = scope(&["a", "b", "c"]);
        let b = s.remove("b").unwrap();
        assert_eq!(b.name, "b");
        assert!(s.get("b").is_none());
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_alignment_and_array_flags() {
        let mut node = SchemaNode::new("vector", "m_Data");
        assert!(!node.is_aligned());
        node.meta_flags = ALIGN_FLAG | 0x1;
        node.type_flags = ARRAY_FLAG;
        assert!(node.is_aligned());
        assert!(node.is_array());
    }

    #[test]
    fn test_find_and_snapshot() {
        let mut root = SchemaNode::new("Root", "Base");
        let mut inner = SchemaNode::new("Inner", "m_Inner");
        inner.children = scope(&["x", "y"]);
        inner.removed = true;
        root.children.push(inner).unwrap();

        assert_eq!(root.find(&["m_Inner", "y"]).map(|n| n.name.as_str()), Some("y"));
        assert!(root.find(&["m_Inner", "q"]).is_none());
        assert_eq!(root.node_count(), 4);

        let snap = root.snapshot();
        assert!(!snap.child("m_Inner").unwrap().removed);
        assert_eq!(snap.child("m_Inner").unwrap().children.len(), 2);
    }
}

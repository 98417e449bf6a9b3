//! Decoder for one type tree payload: a flat, depth-tagged node record list
//! followed by its local string blob.

use crate::errors::DecodeError;
use crate::node::SchemaNode;
use crate::reader::TypeTreeReader;
use crate::string_table::{StringRef, StringTables};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read, Seek};

type Result<T> = std::result::Result<T, DecodeError>;

/// Size of one node record on the wire.
pub const RECORD_SIZE: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRecord {
    pub version: i16,
    pub level: u8,
    pub type_flags: u8,
    pub type_name: StringRef,
    pub name: StringRef,
    pub byte_size: i32,
    pub declared_index: i32,
    pub meta_flags: u32,
}

impl NodeRecord {
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(NodeRecord {
            version: reader.read_i16::<LittleEndian>()?,
            level: reader.read_u8()?,
            type_flags: reader.read_u8()?,
            type_name: StringRef::from_raw(reader.read_i32::<LittleEndian>()?),
            name: StringRef::from_raw(reader.read_i32::<LittleEndian>()?),
            byte_size: reader.read_i32::<LittleEndian>()?,
            declared_index: reader.read_i32::<LittleEndian>()?,
            meta_flags: reader.read_u32::<LittleEndian>()?,
        })
    }

    fn to_node(self, strings: &StringTables<'_>) -> Result<SchemaNode> {
        let mut node = SchemaNode::new(
            strings.resolve(self.type_name)?,
            strings.resolve(self.name)?,
        );
        node.byte_size = self.byte_size;
        node.declared_index = self.declared_index;
        node.type_flags = self.type_flags;
        node.meta_flags = self.meta_flags;
        Ok(node)
    }
}

/// Reads one type tree payload at the reader's position and rebuilds its tree.
pub fn decode_type_tree<R: Read + Seek>(reader: &mut R, global: &[u8]) -> Result<SchemaNode> {
    let node_count = reader.read_u32::<LittleEndian>()?;
    let string_table_size = reader.read_u32::<LittleEndian>()?;

    let record_bytes = (node_count as usize)
        .checked_mul(RECORD_SIZE)
        .ok_or(DecodeError::InvalidRecordCount(node_count))?;
    let records = reader.read_block(record_bytes)?;
    let local = reader.read_block(string_table_size as usize)?;

    let mut cursor = Cursor::new(records.as_slice());
    let records = (0..node_count)
        .map(|_| NodeRecord::read(&mut cursor))
        .collect::<Result<Vec<_>>>()?;

    build_tree(&records, &StringTables::new(&local, global))
}

/// Convenience wrapper for a payload held entirely in memory.
pub fn decode_type_tree_bytes(payload: &[u8], global: &[u8]) -> Result<SchemaNode> {
    decode_type_tree(&mut Cursor::new(payload), global)
}

/// Rebuilds the tree from depth-tagged records in one pass.
///
/// `stack[d]` is the open node at depth `d`. A record at level `l` first closes
/// every open node at depth `>= l`, attaching each to its parent, then opens
/// itself at depth `l`.
pub fn build_tree(records: &[NodeRecord], strings: &StringTables<'_>) -> Result<SchemaNode> {
    let mut stack: Vec<SchemaNode> = Vec::new();

    for (idx, record) in records.iter().enumerate() {
        let level = record.level as usize;

        if idx == 0 {
            if level != 0 {
                return Err(DecodeError::MissingRoot);
            }
        } else if level == 0 {
            return Err(DecodeError::MultipleRoots { record: idx });
        } else if level > stack.len() {
            return Err(DecodeError::InvalidLevel {
                record: idx,
                level: record.level,
                depth: stack.len(),
            });
        }

        while stack.len() > level {
            close_top(&mut stack)?;
        }
        stack.push(record.to_node(strings)?);
    }

    while stack.len() > 1 {
        close_top(&mut stack)?;
    }
    stack.pop().ok_or(DecodeError::MissingRoot)
}

fn close_top(stack: &mut Vec<SchemaNode>) -> Result<()> {
    let (Some(child), Some(parent)) = (stack.pop(), stack.last_mut()) else {
        return Ok(());
    };

    parent.children.push(child).map_err(|child| DecodeError::DuplicateField {
        parent: parent.name.clone(),
        name: child.name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::string_table::StringSource;

    // Encodes records against a local blob that is built on the fly.
    struct Payload {
        records: Vec<u8>,
        strings: Vec<u8>,
        count: u32,
    }

    impl Payload {
        fn new() -> Self {
            Self {
                records: Vec::new(),
                strings: Vec::new(),
                count: 0,
            }
        }

        fn intern(&mut self, s: &str) -> i32 {
            let offset = self.strings.len() as i32;
            self.strings.extend_from_slice(s.as_bytes());
            self.strings.push(0);
            offset
        }

        fn raw(&mut self, level: u8, type_id: i32, name_id: i32, meta_flags: u32) -> &mut Self {
            self.records.extend_from_slice(&1i16.to_le_bytes());
            self.records.push(level);
            self.records.push(0);
            self.records.extend_from_slice(&type_id.to_le_bytes());
            self.records.extend_from_slice(&name_id.to_le_bytes());
            self.records.extend_from_slice(&4i32.to_le_bytes());
            self.records.extend_from_slice(&(self.count as i32).to_le_bytes());
            self.records.extend_from_slice(&meta_flags.to_le_bytes());
            self.count += 1;
            self
        }

        fn node(&mut self, level: u8, type_name: &str, name: &str) -> &mut Self {
            let t = self.intern(type_name);
            let n = self.intern(name);
            self.raw(level, t, n, 0)
        }

        fn bytes(&self) -> Vec<u8> {
            let mut out = Vec::new();
            out.extend_from_slice(&self.count.to_le_bytes());
            out.extend_from_slice(&(self.strings.len() as u32).to_le_bytes());
            out.extend_from_slice(&self.records);
            out.extend_from_slice(&self.strings);
            out
        }
    }

    fn names(node: &SchemaNode) -> Vec<&str> {
        node.children.names().collect()
    }

    #[test]
    fn test_decode_nested_levels() {
        let mut p = Payload::new();
        p.node(0, "GameObject", "Base")
            .node(1, "vector", "m_Component")
            .node(2, "Array", "Array")
            .node(3, "int", "size")
            .node(3, "ComponentPair", "data")
            .node(1, "unsigned int", "m_Layer")
            .node(1, "string", "m_Name");

        let root = decode_type_tree_bytes(&p.bytes(), b"").unwrap();
        assert_eq!(root.type_name, "GameObject");
        assert_eq!(names(&root), ["m_Component", "m_Layer", "m_Name"]);

        let array = root.find(&["m_Component", "Array"]).unwrap();
        assert_eq!(names(array), ["size", "data"]);
        assert_eq!(root.child("m_Layer").unwrap().declared_index, 5);
    }

    #[test]
    fn test_decode_global_strings_and_flags() {
        let global = b"int\0float\0";
        let mut p = Payload::new();
        let base = p.intern("Base");
        let root_type = p.intern("Root");
        let field = p.intern("m_Value");
        p.raw(0, root_type, base, 0)
            .raw(1, 0x8000_0004u32 as i32, field, 0x4000);

        let root = decode_type_tree_bytes(&p.bytes(), global).unwrap();
        let value = root.child("m_Value").unwrap();
        assert_eq!(value.type_name, "float");
        assert!(value.is_aligned());
    }

    #[test]
    fn test_decode_rejects_bad_offsets() {
        let mut p = Payload::new();
        let base = p.intern("Base");
        p.raw(0, 0x8000_0100u32 as i32, base, 0);

        let err = decode_type_tree_bytes(&p.bytes(), b"int\0").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidStringOffset {
                table: StringSource::Global,
                offset: 0x100,
                ..
            }
        ));
    }

    #[test]
    fn test_decode_rejects_truncated_input() {
        let mut p = Payload::new();
        p.node(0, "Root", "Base").node(1, "int", "a");
        let bytes = p.bytes();

        for cut in [3, 8, 20, bytes.len() - 1] {
            let err = decode_type_tree_bytes(&bytes[..cut], b"").unwrap_err();
            assert!(matches!(err, DecodeError::Truncated(_)), "cut at {cut}: {err:?}");
        }
    }

    #[test]
    fn test_decode_rejects_level_jump() {
        let mut p = Payload::new();
        p.node(0, "Root", "Base").node(2, "int", "a");
        assert!(matches!(
            decode_type_tree_bytes(&p.bytes(), b""),
            Err(DecodeError::InvalidLevel { record: 1, level: 2, depth: 1 })
        ));
    }

    #[test]
    fn test_decode_rejects_duplicate_siblings() {
        let mut p = Payload::new();
        p.node(0, "Root", "Base").node(1, "int", "a").node(1, "float", "a");
        assert!(matches!(
            decode_type_tree_bytes(&p.bytes(), b""),
            Err(DecodeError::DuplicateField { .. })
        ));
    }

    #[test]
    fn test_decode_root_rules() {
        assert!(matches!(
            decode_type_tree_bytes(&Payload::new().bytes(), b""),
            Err(DecodeError::MissingRoot)
        ));

        let mut p = Payload::new();
        p.node(0, "Root", "Base").node(0, "Root", "Base");
        assert!(matches!(
            decode_type_tree_bytes(&p.bytes(), b""),
            Err(DecodeError::MultipleRoots { record: 1 })
        ));
    }
}

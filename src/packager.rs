//! Binary artifact holding the union trees of a whole corpus.
//!
//! Layout, little-endian throughout:
//!
//! ```text
//! u32 class_count
//! per class: str8 class_name, node
//! node:  str8 type_name, str8 field_name, u32 meta_flags, u8 type_flags,
//!        u32 event_count, event*, u32 child_count, node*
//! event: u8 kind, u32 version, payload
//!        AddField     node, u16 index
//!        DelField     str8 name
//!        RetypeField  str8 name, str8 type_name
//!        ReorderField str8 name, u16 index
//!        AlignField   str8 name, u8 aligned
//! ```
//!
//! `str8` is a UTF-8 string with a one-byte length prefix.

use crate::errors::{DecodeError, SerializationError};
use crate::events::{EventKind, EventLog, Mutation, MutationEvent};
use crate::node::SchemaNode;
use crate::reader::TypeTreeReader;
use crate::union::UnionTree;
use crate::versions::VersionKey;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Seek, Write};

/// Serializes every class of `tree` in class name order.
pub fn pack<W: Write>(tree: &UnionTree, writer: &mut W) -> Result<(), SerializationError> {
    writer.write_u32::<LittleEndian>(tree.len() as u32)?;
    for (class, root) in tree.classes() {
        let mut packer = Packer {
            writer: &mut *writer,
            class,
        };
        packer.write_str8(class, class)?;
        packer.write_node(root)?;
    }
    Ok(())
}

pub fn pack_to_vec(tree: &UnionTree) -> Result<Vec<u8>, SerializationError> {
    let mut buffer = Vec::new();
    pack(tree, &mut buffer)?;
    Ok(buffer)
}

struct Packer<'a, W> {
    writer: &'a mut W,
    class: &'a str,
}

impl<W: Write> Packer<'_, W> {
    /// `field` names the field the identifier belongs to, for error reporting.
    fn write_str8(&mut self, value: &str, field: &str) -> Result<(), SerializationError> {
        let len = u8::try_from(value.len()).map_err(|_| SerializationError::IdentifierTooLong {
            class: self.class.to_string(),
            field: field.to_string(),
            identifier: value.to_string(),
            len: value.len(),
        })?;
        self.writer.write_u8(len)?;
        self.writer.write_all(value.as_bytes())?;
        Ok(())
    }

    fn write_index(&mut self, index: usize, field: &str) -> Result<(), SerializationError> {
        let index = u16::try_from(index).map_err(|_| SerializationError::IndexOutOfRange {
            class: self.class.to_string(),
            field: field.to_string(),
            index,
        })?;
        self.writer.write_u16::<LittleEndian>(index)?;
        Ok(())
    }

    fn write_node(&mut self, node: &SchemaNode) -> Result<(), SerializationError> {
        self.write_str8(&node.type_name, &node.name)?;
        self.write_str8(&node.name, &node.name)?;
        self.writer.write_u32::<LittleEndian>(node.meta_flags)?;
        self.writer.write_u8(node.type_flags)?;

        self.writer.write_u32::<LittleEndian>(node.events.len() as u32)?;
        for event in &node.events {
            self.write_event(event)?;
        }

        self.writer.write_u32::<LittleEndian>(node.children.len() as u32)?;
        for child in &node.children {
            self.write_node(child)?;
        }
        Ok(())
    }

    fn write_event(&mut self, event: &MutationEvent) -> Result<(), SerializationError> {
        self.writer.write_u8(event.kind().as_u8())?;
        self.writer.write_u32::<LittleEndian>(event.version.as_u32())?;

        match &event.mutation {
            Mutation::FieldAdded { subtree, index } => {
                self.write_node(subtree)?;
                self.write_index(*index, &subtree.name)?;
            }
            Mutation::FieldRemoved { name } => {
                self.write_str8(name, name)?;
            }
            Mutation::AlignmentChanged { name, aligned } => {
                self.write_str8(name, name)?;
                self.writer.write_u8(u8::from(*aligned))?;
            }
            Mutation::Retyped { name, type_name } => {
                self.write_str8(name, name)?;
                self.write_str8(type_name, name)?;
            }
            Mutation::Reordered { name, index } => {
                self.write_str8(name, name)?;
                self.write_index(*index, name)?;
            }
        }
        Ok(())
    }
}

/// Reads an artifact back into a union tree.
///
/// Byte sizes and declared indices are not stored and come back as 0. The
/// removed mark of each field is restored from its parent's log.
pub fn unpack<R: Read + Seek>(reader: &mut R) -> Result<UnionTree, DecodeError> {
    let class_count = reader.read_u32::<LittleEndian>()?;
    let mut tree = UnionTree::new();
    for _ in 0..class_count {
        let name = reader.read_short_string()?;
        let root = read_node(reader)?;
        tree.insert_class(name, root);
    }
    Ok(tree)
}

pub fn unpack_bytes(bytes: &[u8]) -> Result<UnionTree, DecodeError> {
    unpack(&mut Cursor::new(bytes))
}

fn read_node<R: Read + Seek>(reader: &mut R) -> Result<SchemaNode, DecodeError> {
    let mut node = SchemaNode::new(reader.read_short_string()?, reader.read_short_string()?);
    node.meta_flags = reader.read_u32::<LittleEndian>()?;
    node.type_flags = reader.read_u8()?;

    let event_count = reader.read_u32::<LittleEndian>()?;
    let mut events = EventLog::default();
    for _ in 0..event_count {
        let event = read_event(reader)?;
        if events.last_version().is_some_and(|last| last > event.version) {
            return Err(DecodeError::EventOutOfOrder {
                field: event.mutation.field_name().to_string(),
            });
        }
        events.push(event);
    }
    node.events = events;

    let child_count = reader.read_u32::<LittleEndian>()?;
    for _ in 0..child_count {
        let mut child = read_node(reader)?;
        child.removed = node.events.presence_at(&child.name, VersionKey::MAX) == Some(false);
        node.children
            .push(child)
            .map_err(|child| DecodeError::DuplicateField {
                parent: node.name.clone(),
                name: child.name,
            })?;
    }

    Ok(node)
}

fn read_event<R: Read + Seek>(reader: &mut R) -> Result<MutationEvent, DecodeError> {
    let raw_kind = reader.read_u8()?;
    let kind = EventKind::from_u8(raw_kind).ok_or(DecodeError::UnknownEventKind(raw_kind))?;
    let version = VersionKey::from_raw(reader.read_u32::<LittleEndian>()?);

    let mutation = match kind {
        EventKind::AddField => Mutation::FieldAdded {
            subtree: Box::new(read_node(reader)?),
            index: reader.read_u16::<LittleEndian>()? as usize,
        },
        EventKind::DelField => Mutation::FieldRemoved {
            name: reader.read_short_string()?,
        },
        EventKind::AlignField => Mutation::AlignmentChanged {
            name: reader.read_short_string()?,
            aligned: reader.read_bool()?,
        },
        EventKind::RetypeField => Mutation::Retyped {
            name: reader.read_short_string()?,
            type_name: reader.read_short_string()?,
        },
        EventKind::ReorderField => Mutation::Reordered {
            name: reader.read_short_string()?,
            index: reader.read_u16::<LittleEndian>()? as usize,
        },
    };

    Ok(MutationEvent::new(version, mutation))
}

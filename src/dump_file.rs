use crate::decoder::decode_type_tree;
use crate::errors::DecodeError;
use crate::node::SchemaNode;
use crate::reader::TypeTreeReader;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read, Seek};

type Result<T> = std::result::Result<T, DecodeError>;

const TYPE_HASH_SIZE: i64 = 0x10;
const SCRIPT_TYPE_HASH_SIZE: i64 = 0x20;

/// One version's dump: the outer header and the decoded type trees in
/// declaration order.
#[derive(Debug, Default)]
pub struct DumpFile {
    pub engine_version: String,
    pub platform: u32,
    pub has_type_trees: bool,
    pub trees: Vec<SchemaNode>,
}

impl DumpFile {
    pub fn read<R: Read + Seek>(reader: &mut R, global: &[u8]) -> Result<Self> {
        let engine_version = reader.read_cstring()?;
        let platform = reader.read_u32::<LittleEndian>()?;
        let has_type_trees = reader.read_bool()?;
        let type_count = reader.read_u32::<LittleEndian>()?;

        let mut trees = Vec::new();
        for _ in 0..type_count {
            let class_id = reader.read_i32::<LittleEndian>()?;
            // Script types carry a second hash
            if class_id < 0 {
                reader.skip_bytes(SCRIPT_TYPE_HASH_SIZE)?;
            } else {
                reader.skip_bytes(TYPE_HASH_SIZE)?;
            }
            trees.push(decode_type_tree(reader, global)?);
        }

        Ok(DumpFile {
            engine_version,
            platform,
            has_type_trees,
            trees,
        })
    }

    pub fn from_bytes(bytes: &[u8], global: &[u8]) -> Result<Self> {
        Self::read(&mut Cursor::new(bytes), global)
    }
}

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use typetree_history::{ALIGN_FLAG, BuildConfig};

/// Common type names live in the shared blob, like real dumps.
pub const GLOBAL_STRINGS: &[u8] = b"int\0float\0bool\0string\0";

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub type_name: String,
    pub meta_flags: u32,
    pub children: Vec<Field>,
}

pub fn field(name: &str, type_name: &str) -> Field {
    Field {
        name: name.to_string(),
        type_name: type_name.to_string(),
        meta_flags: 0,
        children: Vec::new(),
    }
}

impl Field {
    pub fn aligned(mut self) -> Self {
        self.meta_flags |= ALIGN_FLAG;
        self
    }

    pub fn with(mut self, children: Vec<Field>) -> Self {
        self.children = children;
        self
    }
}

pub type Class = (&'static str, Vec<Field>);

fn global_offset(s: &str) -> Option<u32> {
    let mut offset = 0;
    for entry in GLOBAL_STRINGS.split(|&b| b == 0) {
        if entry == s.as_bytes() && !entry.is_empty() {
            return Some(offset);
        }
        offset += entry.len() as u32 + 1;
    }
    None
}

struct TreeEncoder {
    records: Vec<u8>,
    strings: Vec<u8>,
    count: u32,
}

impl TreeEncoder {
    fn string_id(&mut self, s: &str) -> i32 {
        if let Some(offset) = global_offset(s) {
            return (offset | 0x8000_0000) as i32;
        }
        let offset = self.strings.len() as i32;
        self.strings.extend_from_slice(s.as_bytes());
        self.strings.push(0);
        offset
    }

    fn record(&mut self, level: u8, type_name: &str, name: &str, meta_flags: u32) {
        let type_id = self.string_id(type_name);
        let name_id = self.string_id(name);
        self.records.extend_from_slice(&1i16.to_le_bytes());
        self.records.push(level);
        self.records.push(0);
        self.records.extend_from_slice(&type_id.to_le_bytes());
        self.records.extend_from_slice(&name_id.to_le_bytes());
        self.records.extend_from_slice(&4i32.to_le_bytes());
        self.records.extend_from_slice(&(self.count as i32).to_le_bytes());
        self.records.extend_from_slice(&meta_flags.to_le_bytes());
        self.count += 1;
    }

    fn fields(&mut self, level: u8, fields: &[Field]) {
        for f in fields {
            self.record(level, &f.type_name, &f.name, f.meta_flags);
            self.fields(level + 1, &f.children);
        }
    }
}

/// Encodes one type tree payload.
pub fn encode_tree(class: &str, fields: &[Field]) -> Vec<u8> {
    let mut enc = TreeEncoder {
        records: Vec::new(),
        strings: Vec::new(),
        count: 0,
    };
    enc.record(0, class, "Base", 0);
    enc.fields(1, fields);

    let mut out = Vec::new();
    out.extend_from_slice(&enc.count.to_le_bytes());
    out.extend_from_slice(&(enc.strings.len() as u32).to_le_bytes());
    out.extend_from_slice(&enc.records);
    out.extend_from_slice(&enc.strings);
    out
}

/// Encodes a whole dump file with its outer header.
pub fn encode_dump(label: &str, classes: &[Class]) -> Vec<u8> {
    let mut out = label.as_bytes().to_vec();
    out.push(0);
    out.extend_from_slice(&5u32.to_le_bytes());
    out.push(1);
    out.extend_from_slice(&(classes.len() as u32).to_le_bytes());
    for (idx, (class, fields)) in classes.iter().enumerate() {
        out.extend_from_slice(&(idx as i32 + 1).to_le_bytes());
        out.extend_from_slice(&[0u8; 16]);
        out.extend_from_slice(&encode_tree(class, fields));
    }
    out
}

/// Writes one dump per version plus the global string blob into `dir`.
pub fn write_corpus(dir: &Path, versions: &[(&str, Vec<Class>)]) -> BuildConfig {
    let dumps = dir.join("dumps");
    fs::create_dir_all(&dumps).unwrap();
    for (label, classes) in versions {
        fs::write(dumps.join(format!("{label}.dat")), encode_dump(label, classes)).unwrap();
    }
    let strings: PathBuf = dir.join("strings.dat");
    fs::write(&strings, GLOBAL_STRINGS).unwrap();
    BuildConfig::new(dumps, strings)
}

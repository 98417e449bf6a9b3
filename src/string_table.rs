use std::fmt;
use std::fs;
use std::path::Path;

use crate::errors::DecodeError;

const GLOBAL_FLAG: u32 = 0x8000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringSource {
    Local,
    Global,
}

impl fmt::Display for StringSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringSource::Local => f.write_str("local"),
            StringSource::Global => f.write_str("global"),
        }
    }
}

/// A string id from a node record, classified once when the record is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringRef {
    Local(u32),
    Global(u32),
}

impl StringRef {
    /// High bit set selects the global blob at the cleared offset.
    pub fn from_raw(raw: i32) -> Self {
        let raw = raw as u32;
        if raw & GLOBAL_FLAG != 0 {
            StringRef::Global(raw & !GLOBAL_FLAG)
        } else {
            StringRef::Local(raw)
        }
    }
}

/// Shared string blob referenced by every dump in a corpus.
#[derive(Debug, Clone, Default)]
pub struct GlobalStrings {
    data: Vec<u8>,
}

impl GlobalStrings {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self::new(fs::read(path)?))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// The two string blobs visible to one type tree payload.
#[derive(Debug, Clone, Copy)]
pub struct StringTables<'a> {
    local: &'a [u8],
    global: &'a [u8],
}

impl<'a> StringTables<'a> {
    pub fn new(local: &'a [u8], global: &'a [u8]) -> Self {
        Self { local, global }
    }

    pub fn resolve(&self, string: StringRef) -> Result<String, DecodeError> {
        let (table, blob, offset) = match string {
            StringRef::Local(offset) => (StringSource::Local, self.local, offset),
            StringRef::Global(offset) => (StringSource::Global, self.global, offset),
        };

        let start = offset as usize;
        if start >= blob.len() {
            return Err(DecodeError::InvalidStringOffset {
                table,
                offset,
                size: blob.len(),
            });
        }

        let tail = &blob[start..];
        let end = tail
            .iter()
            .position(|&b| b == 0)
            .ok_or(DecodeError::UnterminatedString { table, offset })?;

        Ok(std::str::from_utf8(&tail[..end])?.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_ref_tagging() {
        assert_eq!(StringRef::from_raw(12), StringRef::Local(12));
        assert_eq!(StringRef::from_raw(0x8000_0010u32 as i32), StringRef::Global(0x10));
        assert_eq!(StringRef::from_raw(i32::MIN), StringRef::Global(0));
    }

    #[test]
    fn test_resolve_local_and_global() {
        let local = b"m_Name\0m_Size\0";
        let global = b"int\0float\0";
        let tables = StringTables::new(local, global);

        assert_eq!(tables.resolve(StringRef::Local(0)).unwrap(), "m_Name");
        assert_eq!(tables.resolve(StringRef::Local(7)).unwrap(), "m_Size");
        assert_eq!(tables.resolve(StringRef::Global(4)).unwrap(), "float");
    }

    #[test]
    fn test_resolve_out_of_range() {
        let tables = StringTables::new(b"abc\0", b"");
        let err = tables.resolve(StringRef::Local(4)).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidStringOffset {
                table: StringSource::Local,
                offset: 4,
                size: 4
            }
        ));
        assert!(matches!(
            tables.resolve(StringRef::Global(0)),
            Err(DecodeError::InvalidStringOffset { table: StringSource::Global, .. })
        ));
    }

    #[test]
    fn test_resolve_unterminated() {
        let tables = StringTables::new(b"abc", b"");
        assert!(matches!(
            tables.resolve(StringRef::Local(1)),
            Err(DecodeError::UnterminatedString { offset: 1, .. })
        ));
    }
}

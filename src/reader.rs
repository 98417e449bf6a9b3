use crate::errors::DecodeError;
use byteorder::ReadBytesExt;
use std::io::{self, Read, Seek, SeekFrom};

type Result<T> = std::result::Result<T, DecodeError>;

pub trait TypeTreeReader {
    fn read_cstring(&mut self) -> Result<String>;
    fn read_short_string(&mut self) -> Result<String>;
    fn read_bool(&mut self) -> Result<bool>;
    fn read_block(&mut self, len: usize) -> Result<Vec<u8>>;
    fn skip_bytes(&mut self, n: i64) -> Result<()>;
    fn remaining(&mut self) -> Result<u64>;
}

impl<R: Read + Seek> TypeTreeReader for R {
    fn read_cstring(&mut self) -> Result<String> {
        let mut buffer = Vec::new();
        loop {
            match self.read_u8()? {
                0 => break,
                b => buffer.push(b),
            }
        }
        Ok(std::str::from_utf8(&buffer)?.to_string())
    }

    /// Identifier with a one-byte length prefix, as written by the packager.
    fn read_short_string(&mut self) -> Result<String> {
        let len = self.read_u8()? as usize;
        let buffer = self.read_block(len)?;
        Ok(std::str::from_utf8(&buffer)?.to_string())
    }

    fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    fn read_block(&mut self, len: usize) -> Result<Vec<u8>> {
        // Check before allocating so a corrupt length cannot request gigabytes
        let remaining = self.remaining()?;
        if len as u64 > remaining {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("needed {len} bytes, {remaining} available"),
            )
            .into());
        }

        let mut buffer = vec![0u8; len];
        self.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn skip_bytes(&mut self, n: i64) -> Result<()> {
        if n > 0 && n as u64 > self.remaining()? {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("cannot skip {n} bytes"),
            )
            .into());
        }
        self.seek(SeekFrom::Current(n))?;
        Ok(())
    }

    fn remaining(&mut self) -> Result<u64> {
        let pos = self.stream_position()?;
        let end = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(pos))?;
        Ok(end.saturating_sub(pos))
    }
}

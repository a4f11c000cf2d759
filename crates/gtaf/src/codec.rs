//! Binary codec for the versioned on-disk store format.
//!
//! This module provides buffered primitive read/write for everything the
//! persistence layer needs: fixed-width integers, length-prefixed strings,
//! 16-byte identifiers, and the tagged [`AtomValue`] encoding.
//!
//! All multi-byte integers are pinned **little-endian**. The format is
//! therefore portable across architectures; a file written under a different
//! byte order will fail the magic/version checks rather than decode garbage.
//!
//! ## Value encoding
//!
//! ```text
//! Tag  Variant    Payload
//! ---  -------    -------
//! 0    Null       (nothing)
//! 1    Bool       u8 {0, 1}
//! 2    Int        u64 bit-reinterpretation of the signed value
//! 3    Float      8 raw IEEE-754 bytes
//! 4    Text       u32 length + UTF-8 bytes
//! 5    FloatVec   u32 length n + n x 4 bytes
//! 6    Blob       u32 length + bytes
//! 7    Edge       EntityId (16 bytes) + string
//! ```

use crate::error::{Result, StoreError};
use crate::types::{AtomId, AtomValue, EdgeValue, EntityId, Lsn, Timestamp};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Magic bytes at the start of every store file: "GTAF".
pub const STORE_MAGIC: [u8; 4] = *b"GTAF";

/// Current store file format version.
pub const STORE_VERSION: u32 = 2;

/// Read buffer window for store files (16 MiB).
///
/// Bulk loads are dominated by small sequential reads; a large window keeps
/// the syscall count low. Reads that straddle a refill boundary are handled
/// by `read_exact` on the buffered reader.
pub const READ_BUFFER_SIZE: usize = 16 * 1024 * 1024;

/// Buffered binary writer for store files.
pub struct BinaryWriter<W: Write> {
    out: W,
}

impl BinaryWriter<BufWriter<File>> {
    /// Creates (truncating) a store file and wraps it in a buffered writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> BinaryWriter<W> {
    /// Wraps an arbitrary writer.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Writes a single byte.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.out.write_all(&[value])?;
        Ok(())
    }

    /// Writes a u32, little-endian.
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.out.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    /// Writes a u64, little-endian.
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.out.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    /// Writes a raw byte block.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.out.write_all(data)?;
        Ok(())
    }

    /// Writes a length-prefixed UTF-8 string (u32 length).
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_u32(value.len() as u32)?;
        self.write_bytes(value.as_bytes())
    }

    /// Writes a 16-byte atom id.
    pub fn write_atom_id(&mut self, id: &AtomId) -> Result<()> {
        self.write_bytes(id.as_bytes())
    }

    /// Writes a 16-byte entity id.
    pub fn write_entity_id(&mut self, id: &EntityId) -> Result<()> {
        self.write_bytes(id.as_bytes())
    }

    /// Writes a log sequence number.
    pub fn write_lsn(&mut self, lsn: Lsn) -> Result<()> {
        self.write_u64(lsn)
    }

    /// Writes a timestamp (microseconds since the epoch).
    pub fn write_timestamp(&mut self, ts: Timestamp) -> Result<()> {
        self.write_u64(ts)
    }

    /// Writes a tagged atom value.
    pub fn write_value(&mut self, value: &AtomValue) -> Result<()> {
        self.write_u8(value.discriminant())?;
        match value {
            AtomValue::Null => {}
            AtomValue::Bool(b) => self.write_u8(u8::from(*b))?,
            AtomValue::Int(i) => self.write_u64(*i as u64)?,
            AtomValue::Float(f) => self.write_bytes(&f.to_le_bytes())?,
            AtomValue::Text(s) => self.write_string(s)?,
            AtomValue::FloatVec(v) => {
                self.write_u32(v.len() as u32)?;
                for f in v {
                    self.write_bytes(&f.to_le_bytes())?;
                }
            }
            AtomValue::Blob(b) => {
                self.write_u32(b.len() as u32)?;
                self.write_bytes(b)?;
            }
            AtomValue::Edge(edge) => {
                self.write_entity_id(&edge.target)?;
                self.write_string(&edge.relation)?;
            }
        }
        Ok(())
    }

    /// Flushes buffered output to the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Buffered binary reader for store files.
pub struct BinaryReader<R: Read> {
    input: R,
}

impl BinaryReader<BufReader<File>> {
    /// Opens a store file behind a large buffered window.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::with_capacity(READ_BUFFER_SIZE, file)))
    }
}

impl<R: Read> BinaryReader<R> {
    /// Wraps an arbitrary reader.
    pub fn new(input: R) -> Self {
        Self { input }
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.input.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Reads a u32, little-endian.
    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.input.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Reads a u64, little-endian.
    pub fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.input.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    /// Fills `buf` exactly; the read may span buffer refills.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        self.input.read_exact(buf)?;
        Ok(())
    }

    /// Reads a length-prefixed UTF-8 string (u32 length).
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        let mut bytes = vec![0u8; len];
        self.input.read_exact(&mut bytes)?;
        String::from_utf8(bytes).map_err(|e| {
            StoreError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid UTF-8 in string: {e}"),
            ))
        })
    }

    /// Reads a 16-byte atom id.
    pub fn read_atom_id(&mut self) -> Result<AtomId> {
        let mut bytes = [0u8; 16];
        self.input.read_exact(&mut bytes)?;
        Ok(AtomId(bytes))
    }

    /// Reads a 16-byte entity id.
    pub fn read_entity_id(&mut self) -> Result<EntityId> {
        let mut bytes = [0u8; 16];
        self.input.read_exact(&mut bytes)?;
        Ok(EntityId(bytes))
    }

    /// Reads a log sequence number.
    pub fn read_lsn(&mut self) -> Result<Lsn> {
        self.read_u64()
    }

    /// Reads a timestamp (microseconds since the epoch).
    pub fn read_timestamp(&mut self) -> Result<Timestamp> {
        self.read_u64()
    }

    /// Reads a tagged atom value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownValueTag` for an unrecognized
    /// discriminator.
    pub fn read_value(&mut self) -> Result<AtomValue> {
        let tag = self.read_u8()?;
        match tag {
            0 => Ok(AtomValue::Null),
            1 => Ok(AtomValue::Bool(self.read_u8()? != 0)),
            2 => Ok(AtomValue::Int(self.read_u64()? as i64)),
            3 => {
                let mut buf = [0u8; 8];
                self.input.read_exact(&mut buf)?;
                Ok(AtomValue::Float(f64::from_le_bytes(buf)))
            }
            4 => Ok(AtomValue::Text(self.read_string()?)),
            5 => {
                let len = self.read_u32()? as usize;
                let mut vec = Vec::with_capacity(len);
                let mut buf = [0u8; 4];
                for _ in 0..len {
                    self.input.read_exact(&mut buf)?;
                    vec.push(f32::from_le_bytes(buf));
                }
                Ok(AtomValue::FloatVec(vec))
            }
            6 => {
                let len = self.read_u32()? as usize;
                let mut bytes = vec![0u8; len];
                self.input.read_exact(&mut bytes)?;
                Ok(AtomValue::Blob(bytes))
            }
            7 => {
                let target = self.read_entity_id()?;
                let relation = self.read_string()?;
                Ok(AtomValue::Edge(EdgeValue { target, relation }))
            }
            other => Err(StoreError::UnknownValueTag(other)),
        }
    }
}

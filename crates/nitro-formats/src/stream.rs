//! Positioned byte stream with per-call byte order
//!
//! [`ByteStream`] wraps any `Read + Seek` or `Write + Seek` value and exposes
//! the fixed-width integer and fixed-length string operations the NARC and
//! NitroFS codecs are written against. The stream carries a default byte order
//! (little-endian, as on the DS) that each call site may override.
//!
//! Strings are one byte per character with no encoding validation, so any
//! byte sequence read from an archive round-trips through [`String`].

use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

use binrw::{BinRead, BinWrite, Endian};

use crate::error::{NitroError, Result};

/// Random-access reader/writer with a configurable default byte order
#[derive(Debug)]
pub struct ByteStream<T> {
    inner: T,
    endian: Endian,
}

impl<T> ByteStream<T> {
    /// Wrap `inner` with little-endian defaults
    pub fn new(inner: T) -> Self {
        Self::with_endian(inner, Endian::Little)
    }

    /// Wrap `inner` with the given default byte order
    pub fn with_endian(inner: T, endian: Endian) -> Self {
        Self { inner, endian }
    }

    /// Default byte order used by the unsuffixed read/write methods
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Change the default byte order
    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    /// Borrow the wrapped value
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Unwrap the stream
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Seek> ByteStream<T> {
    /// Current absolute position
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// Move to an absolute offset
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Move forward by `count` bytes from the current position
    pub fn skip(&mut self, count: u64) -> Result<()> {
        let count = i64::try_from(count).map_err(|_| NitroError::SizeOverflow {
            what: "seek distance",
        })?;
        self.inner.seek(SeekFrom::Current(count))?;
        Ok(())
    }
}

impl<T: Read + Seek> ByteStream<T> {
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        let offset = self.position()?;
        let needed = buf.len();
        self.inner.read_exact(buf).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                NitroError::UnexpectedEof { offset, needed }
            } else {
                NitroError::Io(e)
            }
        })
    }

    /// Read one unsigned byte
    pub fn read_u8(&mut self) -> Result<u8> {
        let [b] = self.read_array::<1>()?;
        Ok(b)
    }

    /// Read a 16-bit value in the default byte order
    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_u16_with(self.endian)
    }

    /// Read a 16-bit value in an explicit byte order
    pub fn read_u16_with(&mut self, endian: Endian) -> Result<u16> {
        let buf = self.read_array::<2>()?;
        Ok(match endian {
            Endian::Little => u16::from_le_bytes(buf),
            Endian::Big => u16::from_be_bytes(buf),
        })
    }

    /// Read a 32-bit value in the default byte order
    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_u32_with(self.endian)
    }

    /// Read a 32-bit value in an explicit byte order
    pub fn read_u32_with(&mut self, endian: Endian) -> Result<u32> {
        let buf = self.read_array::<4>()?;
        Ok(match endian {
            Endian::Little => u32::from_le_bytes(buf),
            Endian::Big => u32::from_be_bytes(buf),
        })
    }

    /// Read `len` raw bytes
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    /// Read `len` bytes as characters, one byte each
    pub fn read_fixed_string(&mut self, len: usize) -> Result<String> {
        Ok(self.read_bytes(len)?.into_iter().map(char::from).collect())
    }

    /// Read a binrw record in the default byte order
    pub fn read_record<R>(&mut self) -> Result<R>
    where
        R: for<'a> BinRead<Args<'a> = ()>,
    {
        let offset = self.position()?;
        R::read_options(&mut self.inner, self.endian, ()).map_err(|e| {
            if e.is_eof() {
                NitroError::UnexpectedEof {
                    offset,
                    needed: std::mem::size_of::<R>(),
                }
            } else {
                NitroError::BinRw(e)
            }
        })
    }
}

impl<T: Write + Seek> ByteStream<T> {
    /// Write one unsigned byte
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_bytes(&[value])
    }

    /// Write a 16-bit value in the default byte order
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_u16_with(value, self.endian)
    }

    /// Write a 16-bit value in an explicit byte order
    pub fn write_u16_with(&mut self, value: u16, endian: Endian) -> Result<()> {
        match endian {
            Endian::Little => self.write_bytes(&value.to_le_bytes()),
            Endian::Big => self.write_bytes(&value.to_be_bytes()),
        }
    }

    /// Write a 32-bit value in the default byte order
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_u32_with(value, self.endian)
    }

    /// Write a 32-bit value in an explicit byte order
    pub fn write_u32_with(&mut self, value: u32, endian: Endian) -> Result<()> {
        match endian {
            Endian::Little => self.write_bytes(&value.to_le_bytes()),
            Endian::Big => self.write_bytes(&value.to_be_bytes()),
        }
    }

    /// Write raw bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        Ok(())
    }

    /// Write each character of `value` as a single byte
    pub fn write_fixed_string(&mut self, value: &str) -> Result<()> {
        let bytes = encode_name(value)?;
        self.write_bytes(&bytes)
    }

    /// Write a binrw record in the default byte order
    pub fn write_record<R>(&mut self, record: &R) -> Result<()>
    where
        R: for<'a> BinWrite<Args<'a> = ()>,
    {
        record.write_options(&mut self.inner, self.endian, ())?;
        Ok(())
    }
}

/// Convert a name to its on-disk single-byte form
pub(crate) fn encode_name(name: &str) -> Result<Vec<u8>> {
    name.chars()
        .map(|c| u8::try_from(u32::from(c)))
        .collect::<std::result::Result<Vec<u8>, _>>()
        .map_err(|_| NitroError::UnencodableName {
            name: name.to_string(),
        })
}

//! Packet cursor and writer
//!
//! Integer layout:
//! ```text
//! -127 < v < 128        1 byte   v as i8
//! -0x8000 <= v < 0x8000 3 bytes  0x80, v as i16 little-endian
//! otherwise             5 bytes  0x81, v as i32 little-endian
//! ```
//!
//! Strings are sequences of integers, one cube codepoint each, terminated by 0.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::charset::{char_to_cube, cube_to_char};
use crate::error::CodecError;

const MARKER_INT16: u8 = 0x80;
const MARKER_INT32: u8 = 0x81;

/// Read cursor over a received packet
///
/// Failed reads leave the cursor where it was, so callers can test for
/// optional trailing fields.
#[derive(Debug, Clone, Default)]
pub struct Packet {
    buf: Bytes,
}

impl Packet {
    /// Create a packet over `buf`
    pub fn new(buf: Bytes) -> Self {
        Self { buf }
    }

    /// Create a packet by copying a slice
    pub fn from_slice(data: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(data))
    }

    /// Number of unread bytes
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Whether unread bytes are left
    pub fn has_remaining(&self) -> bool {
        self.buf.has_remaining()
    }

    /// Unread bytes
    pub fn as_bytes(&self) -> &Bytes {
        &self.buf
    }

    /// Split off the next `n` bytes as an independent packet (no copy)
    pub fn sub_packet(&mut self, n: usize) -> Result<Packet, CodecError> {
        if n > self.buf.remaining() {
            return Err(CodecError::SubPacketTooLong {
                requested: n,
                remaining: self.buf.remaining(),
            });
        }
        Ok(Packet::new(self.buf.split_to(n)))
    }

    /// Take everything that is left as a new packet
    pub fn sub_packet_from_remaining(&mut self) -> Packet {
        Packet::new(self.buf.split_to(self.buf.remaining()))
    }

    /// Read a single raw byte
    pub fn read_byte(&mut self) -> Result<u8, CodecError> {
        if !self.buf.has_remaining() {
            return Err(CodecError::BufferTooShort);
        }
        Ok(self.buf.get_u8())
    }

    /// Read a variable-length integer
    pub fn read_int(&mut self) -> Result<i32, CodecError> {
        let marker = *self.buf.first().ok_or(CodecError::BufferTooShort)?;

        let needed = match marker {
            MARKER_INT16 => 3,
            MARKER_INT32 => 5,
            _ => 1,
        };
        if self.buf.remaining() < needed {
            return Err(CodecError::BufferTooShort);
        }

        self.buf.advance(1);
        let value = match marker {
            MARKER_INT16 => self.buf.get_i16_le() as i32,
            MARKER_INT32 => self.buf.get_i32_le(),
            b => b as i8 as i32,
        };
        Ok(value)
    }

    /// Read a NUL-terminated cube string
    ///
    /// The raw text is returned; use [`sanitize`](super::sanitize) for display.
    pub fn read_string(&mut self) -> Result<String, CodecError> {
        let mut ahead = self.clone();
        let mut s = String::new();

        loop {
            let value = ahead.read_int()?;
            if value == 0 {
                break;
            }
            s.push(cube_to_char(value as u8));
        }

        *self = ahead;
        Ok(s)
    }
}

impl From<Bytes> for Packet {
    fn from(buf: Bytes) -> Self {
        Packet::new(buf)
    }
}

/// Builder for outgoing packets
#[derive(Debug, Default)]
pub struct PacketWriter {
    buf: BytesMut,
}

impl PacketWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(32),
        }
    }

    /// Number of bytes written so far
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if nothing was written yet
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_byte(&mut self, b: u8) -> &mut Self {
        self.buf.put_u8(b);
        self
    }

    pub fn write_int(&mut self, value: i32) -> &mut Self {
        if -0x7F < value && value < 0x80 {
            self.buf.put_i8(value as i8);
        } else if (-0x8000..0x8000).contains(&value) {
            self.buf.put_u8(MARKER_INT16);
            self.buf.put_i16_le(value as i16);
        } else {
            self.buf.put_u8(MARKER_INT32);
            self.buf.put_i32_le(value);
        }
        self
    }

    /// Write a string as cube codepoints plus terminator
    ///
    /// Characters outside the cube charset are dropped.
    pub fn write_string(&mut self, s: &str) -> &mut Self {
        for cube in s.chars().filter_map(char_to_cube) {
            self.write_int(cube as i32);
        }
        self.write_int(0)
    }

    /// Get the encoded bytes and reset the writer
    pub fn finish(&mut self) -> Bytes {
        self.buf.split().freeze()
    }
}

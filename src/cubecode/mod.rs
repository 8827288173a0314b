//! Cube packet encoding
//!
//! The game's network code packs integers into 1, 3 or 5 bytes and sends
//! strings as runs of such integers in its own 8-bit charset. This module
//! implements both directions on top of `bytes`.
//!
//! Reads that run out of data fail with
//! [`CodecError::BufferTooShort`](crate::error::CodecError::BufferTooShort)
//! and consume nothing. The extinfo layer relies on that to try optional
//! trailing fields.

pub mod charset;
pub mod packet;

pub use packet::{Packet, PacketWriter};

/// Color escape marker: form feed followed by one code character
const COLOR_ESCAPE: char = '\x0C';

/// Strip color codes (`\f3`, `\fs`, ...) and surrounding whitespace
pub fn sanitize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == COLOR_ESCAPE && chars.peek().is_some() {
            chars.next();
            continue;
        }
        out.push(c);
    }

    out.trim().to_string()
}

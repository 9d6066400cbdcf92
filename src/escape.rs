// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Control-character prefixing for packet payloads
//!
//! Any byte whose low seven bits are a control character, DEL or the escape
//! character itself is sent as two bytes: [`ESCAPE`] followed by the byte
//! with bit 6 flipped. The escape character is sent literally after the
//! marker.

use crate::error::PacketError;
use crate::protocol::{DEL, ESCAPE, SPACE};

/// Whether `byte` has to be prefixed before it can go on the wire
pub fn should_escape(byte: u8) -> bool {
    let low = byte & 0x7F;
    low < SPACE || low == DEL || low == ESCAPE
}

/// The byte sent after the escape marker
pub fn escape(byte: u8) -> u8 {
    if byte & 0x7F == ESCAPE {
        byte
    } else {
        byte ^ 0x40
    }
}

/// Recover the original byte from the one following an escape marker
pub fn unescape(byte: u8) -> u8 {
    // Flipping bit 6 is its own inverse
    escape(byte)
}

/// Escape `chunk` onto the end of `out`, returning the sum of every byte emitted.
///
/// Reserving [`escaped_len`] bytes in `out` beforehand avoids regrowing it.
pub fn escape_into(chunk: &[u8], out: &mut Vec<u8>) -> u32 {
    let mut sum = 0u32;
    for &byte in chunk {
        if should_escape(byte) {
            out.push(ESCAPE);
            sum += ESCAPE as u32;
            let escaped = escape(byte);
            out.push(escaped);
            sum += escaped as u32;
        } else {
            out.push(byte);
            sum += byte as u32;
        }
    }
    sum
}

/// Number of bytes `chunk` occupies once escaped
pub fn escaped_len(chunk: &[u8]) -> usize {
    chunk.len() + chunk.iter().filter(|&&b| should_escape(b)).count()
}

/// Undo [`escape_into`] for a whole payload
pub fn unescape_payload(payload: &[u8]) -> Result<Vec<u8>, PacketError> {
    let mut out = Vec::with_capacity(payload.len());
    let mut bytes = payload.iter();
    while let Some(&byte) = bytes.next() {
        if byte == ESCAPE {
            let &next = bytes.next().ok_or(PacketError::DanglingEscape)?;
            out.push(unescape(next));
        } else {
            out.push(byte);
        }
    }
    Ok(out)
}

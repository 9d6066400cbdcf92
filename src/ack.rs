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

//! ACK/NACK packets returned by the receiver
//!
//! ```text
//! +-------+-----+-----+---------+-----+-----+
//! | START | LEN | SEQ | Y or N  | CHK | EOL |
//! +-------+-----+-----+---------+-----+-----+
//! ```

use std::fmt;
use crate::protocol::*;

/// Outcome of checking one reply against the packet in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckResult {
    Acknowledged,
    NegativeAcknowledged,
    ChecksumInvalid { expected: u8, received: u8 },
    SequenceInvalid { expected: u8, received: u8 },
    UnexpectedType(u8),
}

impl AckResult {
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, AckResult::Acknowledged)
    }
}

impl fmt::Display for AckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AckResult::Acknowledged => write!(f, "ACK"),
            AckResult::NegativeAcknowledged => write!(f, "NACK"),
            AckResult::ChecksumInvalid { expected, received } => {
                write!(f, "checksum mismatch (expected 0x{:02X}, got 0x{:02X})", expected, received)
            }
            AckResult::SequenceInvalid { expected, received } => {
                write!(f, "sequence mismatch (expected {}, got {})", expected, received)
            }
            AckResult::UnexpectedType(t) => write!(f, "unexpected packet type 0x{:02X}", t),
        }
    }
}

/// Validate a reply frame against the sequence number just sent.
///
/// The checksum is checked before anything else; a frame left partly zeroed
/// by a short read never passes it.
pub fn decode_ack(frame: &[u8; ACK_PACKET_LEN], expected_sequence: u8) -> AckResult {
    let [_start, length, sequence, packet_type, check, _eol] = *frame;

    let expected = checksum(sum_bytes(&[length, sequence, packet_type]));
    if check != expected {
        return AckResult::ChecksumInvalid { expected, received: check };
    }

    let received = untochar(sequence);
    if received != expected_sequence {
        return AckResult::SequenceInvalid { expected: expected_sequence, received };
    }

    match packet_type {
        ACK_TYPE => AckResult::Acknowledged,
        NACK_TYPE => AckResult::NegativeAcknowledged,
        other => AckResult::UnexpectedType(other),
    }
}

/// Build the reply a receiver sends for `sequence`.
pub fn ack_frame(sequence: u8, packet_type: u8) -> [u8; ACK_PACKET_LEN] {
    let length = tochar(3);
    let seq = tochar(sequence);
    let check = checksum(sum_bytes(&[length, seq, packet_type]));
    [START, length, seq, packet_type, check, END]
}

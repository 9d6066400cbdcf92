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

//! Kermit data packet framing
//!
//! Small packet:
//!
//! ```text
//! +-------+-----+-----+------+-----------------+-----+----+
//! | START | LEN | SEQ | 'D'  | escaped payload | CHK | CR |
//! +-------+-----+-----+------+-----------------+-----+----+
//! ```
//!
//! `LEN` counts `SEQ`, the type, the payload and `CHK`. Large packets set
//! `LEN` to zero and carry the real length as two base-95 digits followed by
//! a header checksum:
//!
//! ```text
//! +-------+-----+-----+------+------+------+------+-----------------+-----+----+
//! | START | ' ' | SEQ | 'D'  | LENH | LENL | HCHK | escaped payload | CHK | CR |
//! +-------+-----+-----+------+------+------+------+-----------------+-----+----+
//! ```

use crate::error::PacketError;
use crate::escape::{escape_into, escaped_len, unescape_payload};
use crate::protocol::*;

const SMALL_HEADER_LEN: usize = 4;
const LARGE_HEADER_LEN: usize = 7;
/// Checksum and terminator
const TRAILER_LEN: usize = 2;

/// Which framing the sender uses for data packets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PacketMode {
    /// Single-byte length field, chunks of at most 100 bytes
    #[default]
    Small,
    /// Two-digit length for chunks of 95 bytes or more
    Large,
}

impl PacketMode {
    /// Largest chunk a packet of this mode may carry
    pub fn max_chunk(self) -> usize {
        match self {
            PacketMode::Small => MAX_SMALL_CHUNK,
            PacketMode::Large => MAX_LARGE_CHUNK,
        }
    }
}

fn check_sequence(sequence: u8) -> Result<(), PacketError> {
    if sequence > MAX_SEQUENCE {
        return Err(PacketError::SequenceOutOfRange(sequence));
    }
    Ok(())
}

fn check_chunk(chunk: &[u8], max: usize) -> Result<(), PacketError> {
    if chunk.len() > max {
        return Err(PacketError::ChunkTooLarge { len: chunk.len(), max });
    }
    Ok(())
}

/// Allocate exactly the room the frame for `chunk` needs
fn frame_buffer(header_len: usize, chunk: &[u8]) -> Result<Vec<u8>, PacketError> {
    let size = header_len + escaped_len(chunk) + TRAILER_LEN;
    let mut frame = Vec::new();
    frame
        .try_reserve_exact(size)
        .map_err(|source| PacketError::Allocation { size, source })?;
    Ok(frame)
}

/// Build a small data packet carrying `chunk` with sequence number `sequence`.
pub fn encode_data_packet(chunk: &[u8], sequence: u8) -> Result<Vec<u8>, PacketError> {
    check_sequence(sequence)?;
    check_chunk(chunk, MAX_SMALL_CHUNK)?;

    let seq = tochar(sequence);
    let mut frame = frame_buffer(SMALL_HEADER_LEN, chunk)?;
    frame.extend_from_slice(&[START, 0, seq, DATA_TYPE]);
    let payload_sum = escape_into(chunk, &mut frame);

    // Sequence, type and checksum
    let escaped = frame.len() - SMALL_HEADER_LEN;
    let length = tochar((escaped + 3) as u8);
    frame[1] = length;

    let sum = length as u32 + seq as u32 + DATA_TYPE as u32 + payload_sum;
    frame.push(checksum(sum));
    frame.push(END);
    Ok(frame)
}

/// Build a large data packet carrying `chunk` with sequence number `sequence`.
pub fn encode_large_data_packet(chunk: &[u8], sequence: u8) -> Result<Vec<u8>, PacketError> {
    check_sequence(sequence)?;
    check_chunk(chunk, MAX_LARGE_CHUNK)?;

    let mut frame = frame_buffer(LARGE_HEADER_LEN, chunk)?;
    frame.extend_from_slice(&[START, tochar(0), tochar(sequence), DATA_TYPE, 0, 0, 0]);
    let payload_sum = escape_into(chunk, &mut frame);

    // Extended length covers the payload and the packet checksum
    let extended = frame.len() - LARGE_HEADER_LEN + 1;
    frame[4] = tochar((extended / LENGTH_RADIX) as u8);
    frame[5] = tochar((extended % LENGTH_RADIX) as u8);

    let header_sum = sum_bytes(&frame[1..6]);
    frame[6] = checksum(header_sum);

    let sum = payload_sum + header_sum + frame[6] as u32;
    frame.push(checksum(sum));
    frame.push(END);
    Ok(frame)
}

/// Build the data packet `mode` calls for.
///
/// Large mode still sends short chunks in small packets.
pub fn encode_for_mode(
    mode: PacketMode,
    chunk: &[u8],
    sequence: u8,
) -> Result<Vec<u8>, PacketError> {
    match mode {
        PacketMode::Large if chunk.len() >= LARGE_PACKET_THRESHOLD => {
            encode_large_data_packet(chunk, sequence)
        }
        _ => encode_data_packet(chunk, sequence),
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// A validated data packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPacket {
    pub sequence: u8,
    /// Payload as it appeared on the wire
    pub payload: Vec<u8>,
    pub mode: PacketMode,
}

impl DataPacket {
    /// Parse and validate one complete frame, small or large.
    pub fn parse(frame: &[u8]) -> Result<Self, PacketError> {
        if frame.len() < SMALL_HEADER_LEN + TRAILER_LEN {
            return Err(PacketError::Malformed("frame too short"));
        }
        if frame[0] != START {
            return Err(PacketError::Malformed("missing start marker"));
        }
        if frame[frame.len() - 1] != END {
            return Err(PacketError::Malformed("missing terminator"));
        }
        if frame[3] != DATA_TYPE {
            return Err(PacketError::Malformed("not a data packet"));
        }

        let length = untochar(frame[1]) as usize;
        let (header_len, mode) = if length == 0 {
            if frame.len() < LARGE_HEADER_LEN + TRAILER_LEN {
                return Err(PacketError::Malformed("frame too short"));
            }
            let expected = checksum(sum_bytes(&frame[1..6]));
            if frame[6] != expected {
                return Err(PacketError::ChecksumMismatch { expected, received: frame[6] });
            }
            let extended = untochar(frame[4]) as usize * LENGTH_RADIX + untochar(frame[5]) as usize;
            if frame.len() != LARGE_HEADER_LEN + extended + 1 {
                return Err(PacketError::Malformed("length field does not match frame"));
            }
            (LARGE_HEADER_LEN, PacketMode::Large)
        } else {
            // Start, length and terminator are not counted
            if frame.len() != length + 3 {
                return Err(PacketError::Malformed("length field does not match frame"));
            }
            (SMALL_HEADER_LEN, PacketMode::Small)
        };

        let check_at = frame.len() - 2;
        let expected = checksum(sum_bytes(&frame[1..check_at]));
        if frame[check_at] != expected {
            return Err(PacketError::ChecksumMismatch { expected, received: frame[check_at] });
        }

        let sequence = untochar(frame[2]);
        check_sequence(sequence)?;

        Ok(DataPacket {
            sequence,
            payload: frame[header_len..check_at].to_vec(),
            mode,
        })
    }

    /// The original chunk carried by this packet
    pub fn data(&self) -> Result<Vec<u8>, PacketError> {
        unescape_payload(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_packet_layout() {
        let frame = encode_data_packet(b"Hi", 0).unwrap();
        let sum = sum_bytes(&[tochar(5), tochar(0), DATA_TYPE, b'H', b'i']);
        assert_eq!(
            frame,
            vec![START, tochar(5), tochar(0), DATA_TYPE, b'H', b'i', checksum(sum), END]
        );
    }

    #[test]
    fn test_empty_chunk() {
        let frame = encode_data_packet(&[], 3).unwrap();
        assert_eq!(frame.len(), 6);
        assert_eq!(untochar(frame[1]), 3);

        let packet = DataPacket::parse(&frame).unwrap();
        assert_eq!(packet.sequence, 3);
        assert!(packet.payload.is_empty());
    }

    #[test]
    fn test_length_counts_escaped_bytes() {
        let chunk = [0x00, b'#', b'A', 0xFF, 0x7F];
        let frame = encode_data_packet(&chunk, 9).unwrap();
        // Four of five bytes need a prefix
        assert_eq!(untochar(frame[1]) as usize, 9 + 3);
        assert_eq!(frame.len(), untochar(frame[1]) as usize + 3);
        assert_eq!(
            &frame[4..13],
            &[b'#', 0x40, b'#', b'#', b'A', b'#', 0xBF, b'#', 0x3F]
        );
    }

    #[test]
    fn test_frame_size_matches_escaped_len() {
        let chunk: Vec<u8> = (0..=u8::MAX).cycle().take(100).collect();
        let frame = encode_data_packet(&chunk, 2).unwrap();
        assert_eq!(frame.len(), SMALL_HEADER_LEN + escaped_len(&chunk) + TRAILER_LEN);

        let chunk: Vec<u8> = (0..=u8::MAX).cycle().take(400).collect();
        let frame = encode_large_data_packet(&chunk, 2).unwrap();
        assert_eq!(frame.len(), LARGE_HEADER_LEN + escaped_len(&chunk) + TRAILER_LEN);
    }

    #[test]
    fn test_full_chunk_length_wraps() {
        let frame = encode_data_packet(&[0x41; 100], 1).unwrap();
        assert_eq!(frame[1], 0x87);
        assert_eq!(untochar(frame[1]), 103);

        // Worst case, every byte escaped
        let frame = encode_data_packet(&[0x01; 100], 1).unwrap();
        assert_eq!(untochar(frame[1]), 203);
        assert_eq!(DataPacket::parse(&frame).unwrap().data().unwrap(), vec![0x01; 100]);
    }

    #[test]
    fn test_checksum_recomputes() {
        let chunks: [&[u8]; 4] = [b"", b"hello world", &[0x23, 0xA3, 0x0D, 0x8D], &[0xAA; 100]];
        for (seq, chunk) in chunks.iter().enumerate() {
            let frame = encode_data_packet(chunk, seq as u8).unwrap();
            let check_at = frame.len() - 2;
            assert_eq!(frame[check_at], checksum(sum_bytes(&frame[1..check_at])));
        }
    }

    #[test]
    fn test_parse_round_trip() {
        let chunk: Vec<u8> = (0..100).map(|i| (i * 37) as u8).collect();
        let frame = encode_data_packet(&chunk, 127).unwrap();
        let packet = DataPacket::parse(&frame).unwrap();
        assert_eq!(packet.sequence, 127);
        assert_eq!(packet.mode, PacketMode::Small);
        assert_eq!(packet.data().unwrap(), chunk);
    }

    #[test]
    fn test_parse_rejects_corruption() {
        let mut frame = encode_data_packet(b"payload", 4).unwrap();
        frame[5] ^= 0x01;
        assert!(matches!(DataPacket::parse(&frame), Err(PacketError::ChecksumMismatch { .. })));

        let frame = encode_data_packet(b"payload", 4).unwrap();
        assert!(matches!(
            DataPacket::parse(&frame[..frame.len() - 1]),
            Err(PacketError::Malformed(_))
        ));

        let mut frame = encode_data_packet(b"payload", 4).unwrap();
        frame[0] = 0x02;
        assert!(matches!(DataPacket::parse(&frame), Err(PacketError::Malformed(_))));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            encode_data_packet(b"x", 128),
            Err(PacketError::SequenceOutOfRange(128))
        ));
        assert!(matches!(
            encode_data_packet(&[0u8; 101], 0),
            Err(PacketError::ChunkTooLarge { len: 101, max: 100 })
        ));
        assert!(matches!(
            encode_large_data_packet(&[0u8; 501], 0),
            Err(PacketError::ChunkTooLarge { len: 501, max: 500 })
        ));
    }

    #[test]
    fn test_large_packet_header() {
        let chunk = vec![b'Z'; 300];
        let frame = encode_large_data_packet(&chunk, 5).unwrap();

        assert_eq!(frame[0], START);
        assert_eq!(frame[1], tochar(0));
        assert_eq!(frame[2], tochar(5));
        assert_eq!(frame[3], DATA_TYPE);
        // 300 payload + 1 checksum = 3 * 95 + 16
        assert_eq!(untochar(frame[4]), 3);
        assert_eq!(untochar(frame[5]), 16);
        assert_eq!(frame[6], checksum(sum_bytes(&frame[1..6])));
        assert_eq!(frame.len(), 7 + 300 + 2);
        assert_eq!(*frame.last().unwrap(), END);

        let check_at = frame.len() - 2;
        assert_eq!(frame[check_at], checksum(sum_bytes(&frame[1..check_at])));
    }

    #[test]
    fn test_large_packet_round_trip() {
        let chunk: Vec<u8> = (0..500).map(|i| i as u8).collect();
        let frame = encode_large_data_packet(&chunk, 77).unwrap();
        let packet = DataPacket::parse(&frame).unwrap();
        assert_eq!(packet.mode, PacketMode::Large);
        assert_eq!(packet.sequence, 77);
        assert_eq!(packet.data().unwrap(), chunk);
    }

    #[test]
    fn test_mode_selection() {
        let short = vec![b'a'; LARGE_PACKET_THRESHOLD - 1];
        let long = vec![b'a'; LARGE_PACKET_THRESHOLD];

        assert_eq!(
            encode_for_mode(PacketMode::Large, &short, 0).unwrap(),
            encode_data_packet(&short, 0).unwrap()
        );
        assert_eq!(
            encode_for_mode(PacketMode::Large, &long, 0).unwrap(),
            encode_large_data_packet(&long, 0).unwrap()
        );
        assert_eq!(
            encode_for_mode(PacketMode::Small, &long, 0).unwrap(),
            encode_data_packet(&long, 0).unwrap()
        );
    }

    #[test]
    fn test_mode_limits() {
        assert_eq!(PacketMode::default(), PacketMode::Small);
        assert_eq!(PacketMode::Small.max_chunk(), 100);
        assert_eq!(PacketMode::Large.max_chunk(), 500);
    }
}

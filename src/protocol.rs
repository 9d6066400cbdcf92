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

//! Kermit protocol constants, printable-value codec and checksum

/// Start of header - first byte of every packet
pub const START: u8 = 0x01;

/// End of text - sent once after the last data packet is acknowledged
pub const ETX: u8 = 0x03;

/// Carriage return - terminates every data packet
pub const END: u8 = 0x0D;

/// Offset applied to header fields to make them printable
pub const SPACE: u8 = 0x20;

/// Control prefix placed before every escaped payload byte
pub const ESCAPE: u8 = 0x23;

/// Delete - always escaped
pub const DEL: u8 = 0x7F;

/// Data packet type
pub const DATA_TYPE: u8 = b'D';

/// Acknowledgment packet type
pub const ACK_TYPE: u8 = b'Y';

/// Negative acknowledgment packet type
pub const NACK_TYPE: u8 = b'N';

/// Size of an ACK/NACK packet on the wire
pub const ACK_PACKET_LEN: usize = 6;

/// Sequence numbers wrap modulo this value
pub const SEQUENCE_MODULUS: u8 = 128;

/// Largest encodable sequence number
pub const MAX_SEQUENCE: u8 = SEQUENCE_MODULUS - 1;

/// Largest chunk carried by a small data packet
pub const MAX_SMALL_CHUNK: usize = 100;

/// Largest chunk carried by a large data packet
pub const MAX_LARGE_CHUNK: usize = 500;

/// Chunks at least this long use large framing when large packets are enabled
pub const LARGE_PACKET_THRESHOLD: usize = 95;

/// Radix of the two-digit length of large packets
pub const LENGTH_RADIX: usize = 95;

/// Attempts per packet before the transfer is abandoned
pub const RETRY_MAX: u8 = 4;

/// Encode a small value as a printable character.
pub const fn tochar(value: u8) -> u8 {
    value.wrapping_add(SPACE)
}

/// Decode a printable character back into its value.
pub const fn untochar(ch: u8) -> u8 {
    ch.wrapping_sub(SPACE)
}

/// Fold an additive sum into six bits and encode it as a printable character.
///
/// One round of end-around carry: bits 6 and 7 of the sum are added back
/// before the sum is truncated to six bits.
pub const fn checksum(sum: u32) -> u8 {
    tochar(((sum + ((sum >> 6) & 0x03)) & 0x3F) as u8)
}

/// Sum bytes the way packet checksums expect them to be summed.
pub fn sum_bytes(bytes: &[u8]) -> u32 {
    bytes.iter().map(|&b| b as u32).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tochar_untochar() {
        assert_eq!(tochar(0), b' ');
        assert_eq!(tochar(3), b'#');
        assert_eq!(tochar(95), 0x7F);
        assert_eq!(untochar(b' '), 0);
        assert_eq!(untochar(b'~'), 94);

        // Values past the printable range wrap instead of saturating
        assert_eq!(tochar(103), 0x87);
        assert_eq!(untochar(0x87), 103);
        assert_eq!(tochar(0xF0), 0x10);
        assert_eq!(untochar(0x10), 0xF0);
        assert_eq!(untochar(0x00), 0xE0);

        for v in 0..=u8::MAX {
            assert_eq!(untochar(tochar(v)), v);
        }
    }

    #[test]
    fn test_checksum_folds_carry() {
        assert_eq!(checksum(0), b' ');
        assert_eq!(checksum(0x3F), tochar(0x3F));
        // 0x40: carry bit 6 folds back in as 1
        assert_eq!(checksum(0x40), tochar(0x01));
        // 0xC5: (0xC5 + 3) & 0x3F = 0x08
        assert_eq!(checksum(0xC5), tochar(0x08));
        // Only bits 6 and 7 are folded
        assert_eq!(checksum(0x100), tochar(0x00));
        assert_eq!(checksum(0x1C0), tochar(0x03));
    }

    #[test]
    fn test_checksum_is_printable() {
        for sum in 0..4096 {
            let ch = checksum(sum);
            assert!((SPACE..SPACE + 64).contains(&ch));
        }
    }

    #[test]
    fn test_sum_bytes() {
        assert_eq!(sum_bytes(&[]), 0);
        assert_eq!(sum_bytes(&[0xFF, 0xFF, 0x02]), 0x200);
    }
}

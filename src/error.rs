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

use std::collections::TryReserveError;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Packet Errors
// ============================================================================

/// Failures while building or parsing a single packet
#[derive(Debug, Error)]
pub enum PacketError {
    #[error("chunk of {len} bytes exceeds the {max} byte packet limit")]
    ChunkTooLarge { len: usize, max: usize },

    #[error("sequence number {0} is outside 0..=127")]
    SequenceOutOfRange(u8),

    #[error("failed to allocate {size} bytes for escaped payload: {source}")]
    Allocation {
        size: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("malformed packet: {0}")]
    Malformed(&'static str),

    #[error("checksum mismatch: expected 0x{expected:02X}, got 0x{received:02X}")]
    ChecksumMismatch { expected: u8, received: u8 },

    #[error("escape marker at end of payload")]
    DanglingEscape,
}

// ============================================================================
// Transfer Errors
// ============================================================================

/// Summary of a finished transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReport {
    /// Payload bytes acknowledged by the receiver
    pub bytes_sent: u64,
    /// Data packets acknowledged by the receiver
    pub packets: u64,
    /// Retransmissions across the whole transfer
    pub retransmits: u64,
}

#[derive(Debug, Error)]
pub enum SenderError {
    #[error("failed to open {}: {source}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read file size: {0}")]
    FileSize(#[source] std::io::Error),

    #[error("file read failed after {bytes_sent} bytes: {source}")]
    FileRead {
        bytes_sent: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("file ended after {bytes_sent} of {expected} bytes")]
    FileTruncated { bytes_sent: u64, expected: u64 },

    #[error(
        "serial write failed in sequence {sequence} - \
         success send = {bytes_sent} bytes: {source}"
    )]
    Write {
        sequence: u8,
        bytes_sent: u64,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "serial read failed in sequence {sequence} - \
         success send = {bytes_sent} bytes: {source}"
    )]
    Read {
        sequence: u8,
        bytes_sent: u64,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "failed after {retries} retries in sequence {sequence} - \
         success send = {bytes_sent} bytes"
    )]
    RetriesExhausted {
        retries: u8,
        sequence: u8,
        bytes_sent: u64,
    },

    #[error(
        "could not build packet for sequence {sequence} - \
         success send = {bytes_sent} bytes: {source}"
    )]
    Packet {
        sequence: u8,
        bytes_sent: u64,
        #[source]
        source: PacketError,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("transfer complete")]
    TransferComplete(TransferReport),
}

impl SenderError {
    /// Bytes acknowledged before the failure, when the transfer had started
    pub fn bytes_sent(&self) -> Option<u64> {
        match self {
            SenderError::FileRead { bytes_sent, .. }
            | SenderError::FileTruncated { bytes_sent, .. }
            | SenderError::Write { bytes_sent, .. }
            | SenderError::Read { bytes_sent, .. }
            | SenderError::RetriesExhausted { bytes_sent, .. }
            | SenderError::Packet { bytes_sent, .. } => Some(*bytes_sent),
            SenderError::TransferComplete(report) => Some(report.bytes_sent),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_message_reports_progress() {
        let err = SenderError::RetriesExhausted { retries: 4, sequence: 7, bytes_sent: 700 };
        assert_eq!(
            err.to_string(),
            "failed after 4 retries in sequence 7 - success send = 700 bytes"
        );
        assert_eq!(err.bytes_sent(), Some(700));
    }

    #[test]
    fn test_bytes_sent_absent_before_transfer() {
        let err = SenderError::InvalidConfig("chunk size 0".into());
        assert_eq!(err.bytes_sent(), None);
    }
}

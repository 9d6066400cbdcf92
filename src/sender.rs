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

use std::marker::PhantomData;
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use crate::ack::{decode_ack, AckResult};
use crate::config::TransferConfig;
use crate::error::{SenderError, TransferReport};
use crate::file::FileSource;
use crate::packet::encode_for_mode;
use crate::protocol::*;
use crate::serial::SerialPort;

// ============================================================================
// Session
// ============================================================================

/// Progress of one transfer, owned by the state machine while it runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferSession {
    /// Sequence number of the packet in flight
    pub sequence: u8,
    /// File bytes not yet acknowledged
    pub remaining: u64,
    pub total: u64,
    /// Failed attempts on the packet in flight
    pub retries: u8,
    pub bytes_sent: u64,
    pub packets: u64,
    pub retransmits: u64,
}

impl TransferSession {
    pub fn new(total: u64) -> Self {
        TransferSession {
            remaining: total,
            total,
            ..Default::default()
        }
    }

    /// Account for an acknowledged packet carrying `len` file bytes.
    ///
    /// Returns true when progress crossed into a new whole percent.
    pub fn advance(&mut self, len: u64) -> bool {
        let before = self.whole_percent();
        self.remaining = self.remaining.saturating_sub(len);
        self.bytes_sent += len;
        self.packets += 1;
        self.sequence = (self.sequence + 1) % SEQUENCE_MODULUS;
        self.retries = 0;
        self.whole_percent() != before
    }

    pub fn whole_percent(&self) -> u64 {
        if self.total == 0 {
            100
        } else {
            self.bytes_sent * 100 / self.total
        }
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.bytes_sent as f64 * 100.0 / self.total as f64
        }
    }

    pub fn report(&self) -> TransferReport {
        TransferReport {
            bytes_sent: self.bytes_sent,
            packets: self.packets,
            retransmits: self.retransmits,
        }
    }
}

// ============================================================================
// States
// ============================================================================

pub struct Idle;
pub struct Chunking;
pub struct AwaitAck;
pub struct Advance;
pub struct Retry;
pub struct Finish;

// ============================================================================
// FSM Structure
// ============================================================================

pub struct SenderFsm<State> {
    state: PhantomData<State>,
    serial: Box<dyn SerialPort>,
    file: Box<dyn FileSource>,
    config: TransferConfig,
    session: TransferSession,
    buffer: Vec<u8>,
    chunk_len: usize,
    frame: Vec<u8>,
    reply: [u8; ACK_PACKET_LEN],
}

// ============================================================================
// Trait
// ============================================================================

pub trait SenderState: Send {
    fn step(self: Box<Self>) -> Result<Box<dyn SenderState>, SenderError>;
}

// ============================================================================
// Helper to transition states
// ============================================================================

fn state_name<S>() -> &'static str {
    let type_name = std::any::type_name::<S>();
    type_name.rsplit("::").next().unwrap_or(type_name)
}

impl<S> SenderFsm<S> {
    fn transition<T>(self) -> Box<SenderFsm<T>> {
        trace!(
            from = state_name::<S>(),
            to = state_name::<T>(),
            sequence = self.session.sequence,
            "transition"
        );
        Box::new(SenderFsm {
            state: PhantomData,
            serial: self.serial,
            file: self.file,
            config: self.config,
            session: self.session,
            buffer: self.buffer,
            chunk_len: self.chunk_len,
            frame: self.frame,
            reply: self.reply,
        })
    }

    fn write_error(&self, source: std::io::Error) -> SenderError {
        SenderError::Write {
            sequence: self.session.sequence,
            bytes_sent: self.session.bytes_sent,
            source,
        }
    }
}

// ============================================================================
// State Implementations
// ============================================================================

impl SenderState for SenderFsm<Idle> {
    fn step(self: Box<Self>) -> Result<Box<dyn SenderState>, SenderError> {
        let mut fsm = *self;
        fsm.config.validate()?;

        let size = fsm.file.size().map_err(SenderError::FileSize)?;
        fsm.session = TransferSession::new(size);
        fsm.buffer = vec![0; fsm.config.max_chunk];

        info!(
            bytes = size,
            mode = ?fsm.config.packet_mode,
            max_chunk = fsm.config.max_chunk,
            "Starting transfer"
        );
        let next = fsm.transition::<Chunking>();
        Ok(next as Box<dyn SenderState>)
    }
}

impl SenderState for SenderFsm<Chunking> {
    fn step(self: Box<Self>) -> Result<Box<dyn SenderState>, SenderError> {
        let mut fsm = *self;

        if fsm.session.remaining == 0 {
            let next = fsm.transition::<Finish>();
            return Ok(next as Box<dyn SenderState>);
        }

        let want = fsm.session.remaining.min(fsm.config.max_chunk as u64) as usize;
        let mut filled = 0;
        while filled < want {
            match fsm.file.read(&mut fsm.buffer[filled..want]) {
                Ok(0) => {
                    return Err(SenderError::FileTruncated {
                        bytes_sent: fsm.session.bytes_sent,
                        expected: fsm.session.total,
                    });
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(SenderError::FileRead {
                        bytes_sent: fsm.session.bytes_sent,
                        source,
                    });
                }
            }
        }

        let sequence = fsm.session.sequence;
        fsm.chunk_len = want;
        fsm.frame = encode_for_mode(fsm.config.packet_mode, &fsm.buffer[..want], sequence)
            .map_err(|source| SenderError::Packet {
                sequence,
                bytes_sent: fsm.session.bytes_sent,
                source,
            })?;
        fsm.session.retries = 0;

        debug!(sequence, chunk = want, frame = fsm.frame.len(), "Prepared packet");
        let next = fsm.transition::<AwaitAck>();
        Ok(next as Box<dyn SenderState>)
    }
}

impl SenderState for SenderFsm<AwaitAck> {
    fn step(self: Box<Self>) -> Result<Box<dyn SenderState>, SenderError> {
        let mut fsm = *self;
        let sequence = fsm.session.sequence;

        if let Err(e) = fsm.serial.write_all(&fsm.frame) {
            return Err(fsm.write_error(e));
        }
        debug!(sequence, bytes = fsm.frame.len(), "Sent: data packet");

        if fsm.config.ack_delay > Duration::ZERO {
            std::thread::sleep(fsm.config.ack_delay);
        }

        // Bytes a short read leaves behind stay zero and fail the checksum
        fsm.reply = [0; ACK_PACKET_LEN];
        let received = match fsm.serial.read_timeout(&mut fsm.reply, fsm.config.ack_timeout) {
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => 0,
            Err(source) => {
                return Err(SenderError::Read {
                    sequence,
                    bytes_sent: fsm.session.bytes_sent,
                    source,
                });
            }
        };

        let result = decode_ack(&fsm.reply, sequence);
        if result.is_acknowledged() {
            debug!(sequence, "Received: ACK");
            let next = fsm.transition::<Advance>();
            return Ok(next as Box<dyn SenderState>);
        }

        match result {
            AckResult::ChecksumInvalid { .. } => {
                debug!(sequence, received, reply = ?fsm.reply, "Bad reply: {}", result);
            }
            AckResult::UnexpectedType(_) => {
                warn!(sequence, reply = ?fsm.reply, "Protocol anomaly: {}", result);
            }
            _ => warn!(sequence, "Bad reply: {}", result),
        }
        let next = fsm.transition::<Retry>();
        Ok(next as Box<dyn SenderState>)
    }
}

impl SenderState for SenderFsm<Advance> {
    fn step(self: Box<Self>) -> Result<Box<dyn SenderState>, SenderError> {
        let mut fsm = *self;
        if fsm.session.advance(fsm.chunk_len as u64) {
            info!(
                sent = fsm.session.bytes_sent,
                total = fsm.session.total,
                "Downloading file: {:.3}% completed",
                fsm.session.percent()
            );
        }
        let next = fsm.transition::<Chunking>();
        Ok(next as Box<dyn SenderState>)
    }
}

impl SenderState for SenderFsm<Retry> {
    fn step(self: Box<Self>) -> Result<Box<dyn SenderState>, SenderError> {
        let mut fsm = *self;
        fsm.session.retries += 1;

        if fsm.session.retries >= fsm.config.retry_max {
            return Err(SenderError::RetriesExhausted {
                retries: fsm.session.retries,
                sequence: fsm.session.sequence,
                bytes_sent: fsm.session.bytes_sent,
            });
        }

        fsm.session.retransmits += 1;
        debug!(
            sequence = fsm.session.sequence,
            attempt = fsm.session.retries + 1,
            "Retransmitting packet"
        );
        let next = fsm.transition::<AwaitAck>();
        Ok(next as Box<dyn SenderState>)
    }
}

impl SenderState for SenderFsm<Finish> {
    fn step(self: Box<Self>) -> Result<Box<dyn SenderState>, SenderError> {
        let mut fsm = *self;

        if let Err(e) = fsm.serial.write_all(&[ETX]) {
            return Err(fsm.write_error(e));
        }
        debug!("Sent: ETX");

        if let Err(e) = fsm.file.close() {
            warn!("File close failed: {}", e);
        }

        let report = fsm.session.report();
        info!(
            bytes = report.bytes_sent,
            packets = report.packets,
            retransmits = report.retransmits,
            "Transfer complete"
        );
        Err(SenderError::TransferComplete(report))
    }
}

// ============================================================================
// Constructor & Runner
// ============================================================================

impl SenderFsm<Idle> {
    pub fn new(
        serial: Box<dyn SerialPort>,
        file: Box<dyn FileSource>,
        config: TransferConfig,
    ) -> Box<dyn SenderState> {
        Box::new(SenderFsm {
            state: PhantomData::<Idle>,
            serial,
            file,
            config,
            session: TransferSession::default(),
            buffer: Vec::new(),
            chunk_len: 0,
            frame: Vec::new(),
            reply: [0; ACK_PACKET_LEN],
        })
    }
}

/// Send the whole of `file` over `serial`, returning once the receiver has
/// acknowledged every packet and the end-of-transfer byte has gone out.
pub fn send(
    serial: Box<dyn SerialPort>,
    file: Box<dyn FileSource>,
    config: TransferConfig,
) -> Result<TransferReport, SenderError> {
    let mut state = SenderFsm::new(serial, file, config);

    loop {
        match state.step() {
            Ok(next_state) => state = next_state,
            Err(SenderError::TransferComplete(report)) => return Ok(report),
            Err(e) => return Err(e),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

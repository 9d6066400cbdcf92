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

use std::time::Duration;
use crate::error::SenderError;
use crate::packet::PacketMode;
use crate::protocol::RETRY_MAX;

/// Settings for one transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// Framing used for data packets
    pub packet_mode: PacketMode,
    /// Largest chunk read from the file per packet
    pub max_chunk: usize,
    /// Attempts per packet before giving up
    pub retry_max: u8,
    /// Pause between sending a packet and reading its reply, for slow targets
    pub ack_delay: Duration,
    /// How long the serial port may take to deliver a whole reply
    pub ack_timeout: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            packet_mode: PacketMode::Small,
            max_chunk: PacketMode::Small.max_chunk(),
            retry_max: RETRY_MAX,
            ack_delay: Duration::ZERO,
            ack_timeout: Duration::from_secs(5),
        }
    }
}

impl TransferConfig {
    /// Defaults for `mode`, with the chunk size at the mode's limit
    pub fn for_mode(mode: PacketMode) -> Self {
        Self {
            packet_mode: mode,
            max_chunk: mode.max_chunk(),
            ..Self::default()
        }
    }

    pub fn with_max_chunk(mut self, max_chunk: usize) -> Self {
        self.max_chunk = max_chunk;
        self
    }

    pub fn with_ack_delay(mut self, delay: Duration) -> Self {
        self.ack_delay = delay;
        self
    }

    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), SenderError> {
        let limit = self.packet_mode.max_chunk();
        if self.max_chunk == 0 || self.max_chunk > limit {
            return Err(SenderError::InvalidConfig(format!(
                "chunk size {} must be between 1 and {} for {:?} packets",
                self.max_chunk, limit, self.packet_mode
            )));
        }
        if self.retry_max == 0 {
            return Err(SenderError::InvalidConfig("retry limit must be at least 1".into()));
        }
        if self.ack_timeout.is_zero() {
            return Err(SenderError::InvalidConfig("ack timeout must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransferConfig::default();
        assert_eq!(config.packet_mode, PacketMode::Small);
        assert_eq!(config.max_chunk, 100);
        assert_eq!(config.retry_max, 4);
        assert_eq!(config.ack_delay, Duration::ZERO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_large_mode() {
        let config = TransferConfig::for_mode(PacketMode::Large);
        assert_eq!(config.max_chunk, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_chunk_limits() {
        assert!(TransferConfig::default().with_max_chunk(0).validate().is_err());
        assert!(TransferConfig::default().with_max_chunk(101).validate().is_err());
        assert!(TransferConfig::default().with_max_chunk(1).validate().is_ok());

        let large = TransferConfig::for_mode(PacketMode::Large);
        assert!(large.clone().with_max_chunk(300).validate().is_ok());
        assert!(large.with_max_chunk(501).validate().is_err());
    }

    #[test]
    fn test_zero_retries_rejected() {
        let config = TransferConfig { retry_max: 0, ..TransferConfig::default() };
        assert!(matches!(config.validate(), Err(SenderError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_ack_timeout_rejected() {
        let config = TransferConfig::default().with_ack_timeout(Duration::ZERO);
        assert!(matches!(config.validate(), Err(SenderError::InvalidConfig(_))));

        let config = TransferConfig::default().with_ack_timeout(Duration::from_millis(1));
        assert!(config.validate().is_ok());
    }
}

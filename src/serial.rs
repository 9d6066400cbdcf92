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

use std::io::{Read, Write};
use std::time::{Duration, Instant};
use serialport::{ClearBuffer, DataBits, Parity, SerialPort as SerialPortTrait, StopBits};
use tracing::debug;

// ============================================================================
// SerialPort Trait
// ============================================================================

/// Byte channel the sender talks to the receiver over
pub trait SerialPort: Send {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()>;

    /// Fill `buf`, returning early with fewer bytes once `timeout` elapses.
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> std::io::Result<usize>;
}

// ============================================================================
// Real Serial Port Implementation
// ============================================================================

/// Real serial port implementation that wraps the serialport crate
pub struct RealSerialPort {
    port: Box<dyn SerialPortTrait>,
}

impl RealSerialPort {
    pub fn open(
        port_name: &str,
        baud_rate: u32,
        data_bits: DataBits,
        parity: Parity,
        stop_bits: StopBits,
    ) -> Result<Self, serialport::Error> {
        let port = serialport::new(port_name, baud_rate)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .timeout(Duration::from_millis(500))
            .open()?;

        // Drop whatever the target printed before the transfer started
        port.clear(ClearBuffer::All)?;
        debug!(port = port_name, baud_rate, "serial port opened");

        Ok(RealSerialPort { port })
    }
}

impl SerialPort for RealSerialPort {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.port.write_all(buf)?;
        self.port.flush()?;
        Ok(())
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> std::io::Result<usize> {
        let deadline = Instant::now() + timeout;
        let mut filled = 0;

        // Always read at least once so bytes already buffered are picked up
        let mut first = true;
        while filled < buf.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() && !first {
                break;
            }
            first = false;
            self.port.set_timeout(remaining)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

            match self.port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => break,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(filled)
    }
}

// ============================================================================
// Mock Serial Port for Testing
// ============================================================================

#[cfg(test)]
pub struct MockSerialPort {
    // Data to return on reads (None = timeout)
    read_buffer: Vec<Option<u8>>,
    read_pos: usize,
    // Returned once the responses run out, instead of a timeout
    read_error: Option<std::io::ErrorKind>,
    // Writes fail once this many bytes have been logged
    write_limit: Option<usize>,
    // Track what was written
    write_log: Vec<u8>,
    // Expected writes for verification
    expected_writes: Vec<u8>,
}

#[cfg(test)]
impl MockSerialPort {
    pub fn new(responses: Vec<Option<u8>>, expected_writes: Vec<u8>) -> Self {
        MockSerialPort {
            read_buffer: responses,
            read_pos: 0,
            read_error: None,
            write_limit: None,
            write_log: Vec::new(),
            expected_writes,
        }
    }

    pub fn with_read_error(mut self, kind: std::io::ErrorKind) -> Self {
        self.read_error = Some(kind);
        self
    }

    pub fn with_write_limit(mut self, limit: usize) -> Self {
        self.write_limit = Some(limit);
        self
    }
}

#[cfg(test)]
impl SerialPort for MockSerialPort {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        if let Some(limit) = self.write_limit {
            if self.write_log.len() + buf.len() > limit {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "Mock write limit"
                ));
            }
        }
        self.write_log.extend_from_slice(buf);
        Ok(())
    }

    fn read_timeout(&mut self, buf: &mut [u8], _timeout: Duration) -> std::io::Result<usize> {
        // Out of responses = timeout
        if self.read_pos >= self.read_buffer.len() {
            let kind = self.read_error.unwrap_or(std::io::ErrorKind::TimedOut);
            return Err(std::io::Error::new(kind, "Mock read failure"));
        }

        // If current response is None = timeout
        if self.read_buffer[self.read_pos].is_none() {
            self.read_pos += 1;
            return Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Mock timeout"
            ));
        }

        let mut bytes_read = 0;
        while bytes_read < buf.len() && self.read_pos < self.read_buffer.len() {
            match self.read_buffer[self.read_pos] {
                Some(byte) => {
                    buf[bytes_read] = byte;
                    bytes_read += 1;
                    self.read_pos += 1;
                }
                None => {
                    // Timeout cuts this read short
                    self.read_pos += 1;
                    break;
                }
            }
        }

        Ok(bytes_read)
    }
}

#[cfg(test)]
impl Drop for MockSerialPort {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }

        assert_eq!(
            self.read_pos,
            self.read_buffer.len(),
            "MockSerialPort dropped with {} unconsumed responses (read {} of {} bytes)",
            self.read_buffer.len() - self.read_pos,
            self.read_pos,
            self.read_buffer.len()
        );

        assert_eq!(
            &self.write_log,
            &self.expected_writes,
            "MockSerialPort write log mismatch!\n\
             Expected {} bytes:\n{:02X?}\nGot {} bytes:\n{:02X?}",
            self.expected_writes.len(),
            self.expected_writes,
            self.write_log.len(),
            self.write_log
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_partial_read() {
        let mut port = MockSerialPort::new(vec![Some(1), Some(2), None, Some(3)], vec![]);
        let mut buf = [0u8; 4];

        assert_eq!(port.read_timeout(&mut buf, Duration::ZERO).unwrap(), 2);
        assert_eq!(&buf[..2], &[1, 2]);
        assert_eq!(port.read_timeout(&mut buf, Duration::ZERO).unwrap(), 1);
        assert_eq!(buf[0], 3);
    }

    #[test]
    fn test_mock_timeout_then_error() {
        let mut port = MockSerialPort::new(vec![None], vec![b'x'])
            .with_read_error(std::io::ErrorKind::BrokenPipe);
        let mut buf = [0u8; 1];

        port.write_all(b"x").unwrap();
        let err = port.read_timeout(&mut buf, Duration::ZERO).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::TimedOut);
        let err = port.read_timeout(&mut buf, Duration::ZERO).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_mock_write_limit() {
        let mut port = MockSerialPort::new(vec![], vec![1, 2]).with_write_limit(3);
        port.write_all(&[1, 2]).unwrap();
        assert!(port.write_all(&[3, 4]).is_err());
    }
}

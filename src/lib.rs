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

//! Kermit data-packet sender for the U-Boot `loadb` command
//!
//! Only the part of Kermit U-Boot needs is implemented: data packets go out
//! one at a time, each waits for an ACK, NACKed or garbled replies cause the
//! same packet to be sent again a bounded number of times, and a single ETX
//! byte ends the transfer.

pub mod ack;
pub mod config;
pub mod error;
pub mod escape;
pub mod file;
pub mod packet;
pub mod protocol;
pub mod sender;
pub mod serial;

pub use config::TransferConfig;
pub use error::{PacketError, SenderError, TransferReport};
pub use file::{FileSource, LocalFile};
pub use packet::PacketMode;
pub use sender::send;
pub use serial::{RealSerialPort, SerialPort};

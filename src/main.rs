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

use clap::Parser;
use serialport::{DataBits, Parity, StopBits};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use ukermit::{LocalFile, PacketMode, RealSerialPort, SenderError, TransferConfig};

#[derive(Parser)]
#[command(name = "ukermit")]
#[command(
    about = "Download a file to U-Boot's loadb command using Kermit over a serial port",
    long_about = None
)]
struct Cli {
    /// Serial port to use (e.g., /dev/ttyS0 or COM1)
    #[arg(short, long)]
    port: String,

    /// File to download
    #[arg(short, long)]
    file: PathBuf,

    /// Delay in milliseconds before reading each acknowledgment
    #[arg(short, long, default_value = "0", value_name = "MS")]
    delay: u64,

    /// Baud rate
    #[arg(short, long, default_value = "115200")]
    baud: u32,

    /// Data bits (5, 6, 7, or 8)
    #[arg(long, default_value = "8", value_name = "BITS")]
    data_bits: u8,

    /// Parity (none, odd, or even)
    #[arg(long, default_value = "none")]
    parity: String,

    /// Stop bits (1 or 2)
    #[arg(long, default_value = "1", value_name = "BITS")]
    stop_bits: u8,

    /// Time in milliseconds to wait for a complete acknowledgment
    #[arg(long, default_value = "5000", value_name = "MS")]
    timeout: u64,

    /// Use large packets for chunks of 95 bytes or more
    #[arg(long)]
    large_packets: bool,

    /// Bytes of the file carried per packet (defaults to the packet limit)
    #[arg(long, value_name = "BYTES")]
    chunk_size: Option<usize>,

    /// Enable debug output
    #[arg(long)]
    debug: bool,
}

fn parse_data_bits(bits: u8) -> Result<DataBits, String> {
    match bits {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        _ => Err(format!("Invalid data bits: {}. Must be 5, 6, 7, or 8", bits)),
    }
}

fn parse_parity(parity: &str) -> Result<Parity, String> {
    match parity.to_lowercase().as_str() {
        "none" => Ok(Parity::None),
        "odd" => Ok(Parity::Odd),
        "even" => Ok(Parity::Even),
        _ => Err(format!("Invalid parity: {}. Must be 'none', 'odd', or 'even'", parity)),
    }
}

fn parse_stop_bits(bits: u8) -> Result<StopBits, String> {
    match bits {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        _ => Err(format!("Invalid stop bits: {}. Must be 1 or 2", bits)),
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn transfer_config(cli: &Cli) -> TransferConfig {
    let mode = if cli.large_packets { PacketMode::Large } else { PacketMode::Small };
    let mut config = TransferConfig::for_mode(mode)
        .with_ack_delay(Duration::from_millis(cli.delay))
        .with_ack_timeout(Duration::from_millis(cli.timeout));
    if let Some(chunk_size) = cli.chunk_size {
        config = config.with_max_chunk(chunk_size);
    }
    config
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let data_bits = match parse_data_bits(cli.data_bits) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let parity = match parse_parity(&cli.parity) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let stop_bits = match parse_stop_bits(cli.stop_bits) {
        Ok(sb) => sb,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let config = transfer_config(&cli);
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let file = match LocalFile::open(&cli.file) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    println!("Opening serial port: {}", cli.port);
    println!("Settings: {} baud, {:?}, {:?}, {:?}", cli.baud, data_bits, parity, stop_bits);

    let opened = RealSerialPort::open(&cli.port, cli.baud, data_bits, parity, stop_bits);
    let serial_port = match opened {
        Ok(port) => port,
        Err(e) => {
            eprintln!("Failed to open serial port: {}", e);
            std::process::exit(1);
        }
    };

    println!("\nSending file: {}", cli.file.display());
    match ukermit::send(Box::new(serial_port), Box::new(file), config) {
        Ok(report) => {
            println!(
                "\nFile Download completed: {} bytes in {} packets ({} retransmits)",
                report.bytes_sent, report.packets, report.retransmits
            );
        }
        Err(e) => {
            eprintln!("Data transmit failed: {}", e);
            if let SenderError::RetriesExhausted { .. }
            | SenderError::Write { .. }
            | SenderError::Read { .. } = e
            {
                eprintln!("The target is left mid-transfer; restart loadb before retrying");
            }
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serial_settings() {
        assert_eq!(parse_data_bits(8).unwrap(), DataBits::Eight);
        assert!(parse_data_bits(9).is_err());
        assert_eq!(parse_parity("EVEN").unwrap(), Parity::Even);
        assert!(parse_parity("mark").is_err());
        assert_eq!(parse_stop_bits(2).unwrap(), StopBits::Two);
        assert!(parse_stop_bits(3).is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["ukermit", "-p", "/dev/ttyS0", "-f", "u-boot.bin"]).unwrap();
        assert_eq!(cli.baud, 115200);
        assert_eq!(cli.delay, 0);

        let config = transfer_config(&cli);
        assert_eq!(config, TransferConfig::default().with_ack_timeout(Duration::from_millis(5000)));
    }

    #[test]
    fn test_cli_large_packets() {
        let cli = Cli::try_parse_from([
            "ukermit",
            "-p",
            "COM1",
            "-f",
            "image.bin",
            "-d",
            "20",
            "--large-packets",
            "--chunk-size",
            "300",
        ])
        .unwrap();

        let config = transfer_config(&cli);
        assert_eq!(config.packet_mode, PacketMode::Large);
        assert_eq!(config.max_chunk, 300);
        assert_eq!(config.ack_delay, Duration::from_millis(20));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_zero_timeout_rejected() {
        let args = ["ukermit", "-p", "COM1", "-f", "image.bin", "--timeout", "0"];
        let cli = Cli::try_parse_from(args).unwrap();
        let err = transfer_config(&cli).validate().unwrap_err();
        assert!(matches!(err, SenderError::InvalidConfig(_)));
    }

    #[test]
    fn test_cli_requires_port_and_file() {
        assert!(Cli::try_parse_from(["ukermit", "-f", "u-boot.bin"]).is_err());
        assert!(Cli::try_parse_from(["ukermit", "-p", "/dev/ttyS0"]).is_err());
    }
}

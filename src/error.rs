//! Custom error types for the driver.
//!
//! This module defines the primary error type, `FpgaError`, for the entire
//! crate. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the different kinds of errors that can occur,
//! from protocol encoding issues to serial I/O failures.
//!
//! Two kinds of failures are deliberately *not* errors:
//!
//! - A disconnected transport. Accessors degrade to sentinel returns
//!   (`Ok(false)` for writes, `Ok(-1)` for reads) so that composite
//!   operations can proceed best-effort even mid-failure.
//! - An incompatible device at connection time. The controller logs a
//!   warning, disconnects, and remains constructible with zero channels.
//!
//! Everything else — invalid addresses or values, read-only violations,
//! malformed responses, timeouts — surfaces as an `FpgaError`. No retry
//! logic lives in this crate; retry policy belongs to the caller.

use thiserror::Error;

/// Convenience alias for results using the driver error type.
pub type FpgaResult<T> = std::result::Result<T, FpgaError>;

/// Errors produced by the register protocol, the signal layer and the
/// serial transport.
#[derive(Error, Debug)]
pub enum FpgaError {
    /// A register address outside the unsigned 32-bit range was passed to
    /// the codec. Rejected before any byte is produced.
    #[error("Register address {0} does not fit in 32 bits")]
    InvalidAddress(i64),

    /// A register value outside the unsigned 32-bit range was passed to
    /// the codec. Rejected before any byte is produced.
    #[error("Register value {0} does not fit in 32 bits")]
    InvalidValue(i64),

    /// A read response had the wrong number of bytes.
    #[error("Malformed response: expected 4 bytes, got {0}")]
    MalformedResponse(usize),

    /// A signal was requested for a channel index beyond the capacity of
    /// its signal class.
    #[error("Channel {channel} exceeds the {capacity} available {name} channels")]
    ChannelOutOfRange {
        name: &'static str,
        channel: u32,
        capacity: u32,
    },

    /// A write carried a value outside the signal's `[0, max]` range.
    #[error("Value {value} not allowed for {name} channel {channel} (max {max})")]
    ValueNotAllowed {
        name: &'static str,
        channel: u32,
        value: i64,
        max: i64,
    },

    /// A write was attempted on a read-only signal.
    #[error("{name} channel {channel} is read-only")]
    ReadOnly { name: &'static str, channel: u32 },

    /// The transport read timed out before a full response arrived.
    #[error("Serial read timed out")]
    Timeout,

    #[error("Unexpected EOF from serial port")]
    UnexpectedEof,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device reported an unknown board id or firmware version.
    #[error("Incompatible device: {0}")]
    IncompatibleDevice(String),

    #[cfg(feature = "instrument_serial")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("Serial support not enabled. Rebuild with --features instrument_serial")]
    SerialFeatureDisabled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_error_display() {
        let err = FpgaError::ChannelOutOfRange {
            name: "TTL",
            channel: 7,
            capacity: 4,
        };
        assert_eq!(
            err.to_string(),
            "Channel 7 exceeds the 4 available TTL channels"
        );
    }

    #[test]
    fn test_read_only_display() {
        let err = FpgaError::ReadOnly {
            name: "analog input",
            channel: 0,
        };
        assert_eq!(err.to_string(), "analog input channel 0 is read-only");
    }
}

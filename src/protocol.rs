//! Binary register protocol codec.
//!
//! The device exposes a flat space of 32-bit registers behind a byte-stream
//! interface. Every exchange is a fixed-size request frame, optionally
//! followed by a fixed-size response:
//!
//! - Read request, 5 bytes: `[0x00, addr0, addr1, addr2, addr3]`
//! - Write request, 9 bytes: `[0x80, addr0..addr3, val0..val3]`
//! - Read response, 4 bytes: unsigned 32-bit integer
//!
//! All multi-byte fields are little-endian. The high bit of the first byte
//! selects write (`1`) or read (`0`); there is no acknowledgement for
//! writes.
//!
//! The checked entry points ([`encode_read_request`],
//! [`encode_write_request`], [`decode_response`]) validate field ranges and
//! never produce a partial frame: an out-of-range address or value is
//! rejected before a single byte is written. The infallible [`read_frame`]
//! and [`write_frame`] helpers serve the link layer, where values have
//! already been validated by the signal layer.

use crate::error::{FpgaError, FpgaResult};

/// First byte of a read request.
pub const READ_FLAG: u8 = 0x00;
/// First byte of a write request (high bit set).
pub const WRITE_FLAG: u8 = 1 << 7;

/// Length in bytes of a read request frame.
pub const READ_REQUEST_LEN: usize = 5;
/// Length in bytes of a write request frame.
pub const WRITE_REQUEST_LEN: usize = 9;
/// Length in bytes of a read response.
pub const RESPONSE_LEN: usize = 4;

/// Control register holding the firmware protocol version. Lies outside the
/// channel-indexed address ranges.
pub const ADDR_VERSION: u32 = 200;
/// Control register holding the board identifier.
pub const ADDR_ID: u32 = 201;

/// The single firmware protocol version this driver accepts.
pub const PROTOCOL_VERSION: u32 = 3;

/// Builds a read request frame for `address`.
pub fn read_frame(address: u32) -> [u8; READ_REQUEST_LEN] {
    let mut frame = [0u8; READ_REQUEST_LEN];
    frame[0] = READ_FLAG;
    frame[1..].copy_from_slice(&address.to_le_bytes());
    frame
}

/// Builds a write request frame setting `address` to `value`.
pub fn write_frame(address: u32, value: u32) -> [u8; WRITE_REQUEST_LEN] {
    let mut frame = [0u8; WRITE_REQUEST_LEN];
    frame[0] = WRITE_FLAG;
    frame[1..5].copy_from_slice(&address.to_le_bytes());
    frame[5..].copy_from_slice(&value.to_le_bytes());
    frame
}

fn checked_address(address: i64) -> FpgaResult<u32> {
    u32::try_from(address).map_err(|_| FpgaError::InvalidAddress(address))
}

fn checked_value(value: i64) -> FpgaResult<u32> {
    u32::try_from(value).map_err(|_| FpgaError::InvalidValue(value))
}

/// Encodes a read request for the given address.
///
/// # Errors
///
/// Returns [`FpgaError::InvalidAddress`] if `address` is negative or does
/// not fit in 32 bits. No bytes are produced on failure.
pub fn encode_read_request(address: i64) -> FpgaResult<[u8; READ_REQUEST_LEN]> {
    Ok(read_frame(checked_address(address)?))
}

/// Encodes a write request setting `address` to `value`.
///
/// # Errors
///
/// Returns [`FpgaError::InvalidAddress`] or [`FpgaError::InvalidValue`] if
/// either field is negative or does not fit in 32 bits. No bytes are
/// produced on failure.
pub fn encode_write_request(address: i64, value: i64) -> FpgaResult<[u8; WRITE_REQUEST_LEN]> {
    let address = checked_address(address)?;
    let value = checked_value(value)?;
    Ok(write_frame(address, value))
}

/// Decodes a 4-byte read response into its unsigned 32-bit value.
///
/// # Errors
///
/// Returns [`FpgaError::MalformedResponse`] for any input whose length is
/// not exactly 4 bytes.
pub fn decode_response(data: &[u8]) -> FpgaResult<u32> {
    let bytes: [u8; RESPONSE_LEN] = data
        .try_into()
        .map_err(|_| FpgaError::MalformedResponse(data.len()))?;
    Ok(u32::from_le_bytes(bytes))
}

//! Byte-stream transport and the shared register link.
//!
//! The [`Transport`] trait is the seam between the register protocol and
//! the outside world: a serial port in production, an in-memory emulator in
//! tests (see [`crate::mock`]). It is deliberately small — connection
//! check, raw write, bounded read, close — so the protocol layer owns all
//! framing.
//!
//! [`RegisterLink`] pairs a transport with the codec and performs one
//! blocking round trip per call. It implements the sentinel contract: when
//! the transport is disconnected, writes return `false` and reads return
//! `-1` instead of failing, so higher layers can degrade gracefully.
//! Hard transport faults (timeout, malformed response, I/O errors) still
//! surface as errors.
//!
//! The link is shared between the controller and every signal it creates
//! through [`SharedLink`], an `Arc<Mutex<_>>`. The mutex serializes
//! register operations; the device cannot service concurrent requests.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::FpgaResult;
use crate::protocol;

#[cfg(feature = "instrument_serial")]
use crate::config::SerialConfig;
#[cfg(feature = "instrument_serial")]
use crate::error::FpgaError;
#[cfg(feature = "instrument_serial")]
use log::trace;
#[cfg(feature = "instrument_serial")]
use serialport::SerialPort;
#[cfg(feature = "instrument_serial")]
use std::io::{Read, Write};

/// A synchronous byte-stream connection to the device.
pub trait Transport: Send {
    /// True while the underlying device connection is usable.
    fn is_connected(&self) -> bool;

    /// Writes a complete request frame.
    fn write(&mut self, frame: &[u8]) -> FpgaResult<()>;

    /// Reads exactly `n` response bytes, bounded by the transport's
    /// configured timeout.
    fn read_exact(&mut self, n: usize) -> FpgaResult<Vec<u8>>;

    /// Releases the device connection. Idempotent.
    fn close(&mut self);
}

/// Serial-port transport for a connected device.
#[cfg(feature = "instrument_serial")]
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    device: Option<String>,
}

#[cfg(feature = "instrument_serial")]
impl SerialTransport {
    /// Opens the named serial device with the given parameters.
    pub fn open(device: &str, serial: &SerialConfig) -> FpgaResult<Self> {
        let port = serialport::new(device, serial.baud_rate)
            .timeout(std::time::Duration::from_millis(serial.timeout_ms))
            .open()?;
        Ok(Self {
            port: Some(port),
            device: Some(device.to_string()),
        })
    }

    /// A transport that was never connected. Used when discovery finds no
    /// usable device; every operation degrades to its sentinel.
    pub fn disconnected() -> Self {
        Self {
            port: None,
            device: None,
        }
    }

    /// Name of the underlying serial device, if connected.
    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }
}

#[cfg(feature = "instrument_serial")]
impl Transport for SerialTransport {
    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    fn write(&mut self, frame: &[u8]) -> FpgaResult<()> {
        let Some(port) = self.port.as_mut() else {
            return Ok(());
        };
        trace!("tx {:02x?}", frame);
        port.write_all(frame)?;
        Ok(())
    }

    fn read_exact(&mut self, n: usize) -> FpgaResult<Vec<u8>> {
        let Some(port) = self.port.as_mut() else {
            return Ok(Vec::new());
        };
        let mut buffer = vec![0u8; n];
        match port.read_exact(&mut buffer) {
            Ok(()) => {
                trace!("rx {:02x?}", buffer);
                Ok(buffer)
            }
            Err(err) if err.kind() == std::io::ErrorKind::TimedOut => Err(FpgaError::Timeout),
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(FpgaError::UnexpectedEof)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn close(&mut self) {
        // Dropping the port handle releases the OS device.
        self.port = None;
    }
}

/// One framed register exchange at a time over an owned transport.
pub struct RegisterLink {
    transport: Box<dyn Transport>,
}

impl RegisterLink {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self { transport }
    }

    /// True while the underlying transport is connected.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Writes `value` to the register at `address`.
    ///
    /// Returns `Ok(true)` once the frame was sent and `Ok(false)` when the
    /// transport is disconnected. Writes are fire-and-forget; the device
    /// sends no acknowledgement.
    pub fn write(&mut self, address: u32, value: u32) -> FpgaResult<bool> {
        if !self.transport.is_connected() {
            return Ok(false);
        }
        self.transport.write(&protocol::write_frame(address, value))?;
        Ok(true)
    }

    /// Reads the register at `address`.
    ///
    /// Returns `Ok(-1)` when the transport is disconnected. A connected
    /// read blocks for at most the transport's timeout and fails with
    /// [`crate::FpgaError::Timeout`] afterwards.
    pub fn read(&mut self, address: u32) -> FpgaResult<i64> {
        if !self.transport.is_connected() {
            return Ok(-1);
        }
        self.transport.write(&protocol::read_frame(address))?;
        let response = self.transport.read_exact(protocol::RESPONSE_LEN)?;
        Ok(i64::from(protocol::decode_response(&response)?))
    }

    /// Closes the underlying transport. Idempotent.
    pub fn close(&mut self) {
        self.transport.close();
    }
}

/// Handle shared between the controller and the signals it creates.
pub type SharedLink = Arc<Mutex<RegisterLink>>;

/// Wraps a transport into a shareable register link.
pub fn shared(transport: Box<dyn Transport>) -> SharedLink {
    Arc::new(Mutex::new(RegisterLink::new(transport)))
}

/// Locks the shared link, recovering the guard if a previous holder
/// panicked. Register state on the device is never left half-written by a
/// panic: each link call sends either a complete frame or nothing.
pub(crate) fn lock(link: &SharedLink) -> MutexGuard<'_, RegisterLink> {
    match link.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

//! USB serial port discovery.
//!
//! The device enumerates as an FTDI FT2232 USB-serial bridge. Discovery
//! lists every serial port with the matching vendor/product identifier and
//! resolves them down to at most one device:
//!
//! - one candidate: chosen directly;
//! - several candidates: a caller-supplied device name disambiguates;
//!   without one the situation is reported as a warning, not a crash,
//!   since FTDI drivers routinely expose one physical board as two ports;
//! - no candidate: a warning.
//!
//! Only the enumeration itself touches the serial stack; the resolution
//! logic is pure and usable without the `instrument_serial` feature.

use log::warn;

#[cfg(feature = "instrument_serial")]
use crate::error::FpgaResult;
#[cfg(feature = "instrument_serial")]
use serialport::SerialPortType;

/// USB vendor id of the FTDI bridge on supported boards.
pub const USB_VENDOR_ID: u16 = 0x0403;
/// USB product id of the FTDI bridge on supported boards.
pub const USB_PRODUCT_ID: u16 = 0x6010;

/// Lists the serial ports whose USB identity matches a supported board.
#[cfg(feature = "instrument_serial")]
pub fn list_candidate_ports() -> FpgaResult<Vec<String>> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .filter(|port| match &port.port_type {
            SerialPortType::UsbPort(usb) => {
                usb.vid == USB_VENDOR_ID && usb.pid == USB_PRODUCT_ID
            }
            _ => false,
        })
        .map(|port| port.port_name)
        .collect())
}

/// Picks the device to connect to from the discovered candidates.
///
/// Returns `None` — after logging a warning — when nothing was found, or
/// when several candidates exist and `known_device` does not select one of
/// them.
pub fn resolve_device(candidates: &[String], known_device: Option<&str>) -> Option<String> {
    match candidates {
        [] => {
            warn!("No device found.");
            None
        }
        [single] => Some(single.clone()),
        many => {
            if let Some(known) = known_device {
                if let Some(device) = many.iter().find(|device| device.as_str() == known) {
                    return Some(device.clone());
                }
            }
            warn!(
                "Cannot choose between detected devices {:?} (known_device={:?}). \
                 Pass one of the listed devices as known_device. If the expected \
                 device is not listed, check the physical connection.",
                many, known_device
            );
            None
        }
    }
}

//! Bounds-checked register accessors.
//!
//! A [`Signal`] is one logical input or output of the device: a channel of
//! a signal class, mapped to a single register. The signal knows its
//! address, its value bound and whether it is read-only, and performs one
//! blocking round trip per access through the shared link.
//!
//! One generic type covers every signal class; the per-class behavior
//! (address range, bound, capacity, writability) lives entirely in the
//! [`SignalKind`] descriptor. Values cross the API as `i64` so that
//! out-of-range inputs are representable and rejected, and so that reads
//! can return the `-1` disconnected sentinel; on the wire everything is an
//! unsigned 32-bit register.

use crate::error::{FpgaError, FpgaResult};
use crate::regmap::{CameraGeneration, SignalKind};
use crate::transport::{self, SharedLink};

/// The laser trigger modes.
///
/// In passive synchronization the device receives an exposure signal from
/// a camera in order to trigger the lasers. In active synchronization the
/// exposure signal is generated internally and the camera is triggered by
/// a device-generated fire signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaserTriggerMode {
    /// Off all the time, regardless of the exposure signal.
    Off = 0,
    /// On all the time, regardless of the exposure signal.
    On = 1,
    /// Pulse on rising edges of the exposure signal.
    Rising = 2,
    /// Pulse on falling edges of the exposure signal.
    Falling = 3,
    /// Follow the exposure signal. The pulse duration is ignored in this
    /// mode; it is tolerated, not rejected.
    Follow = 4,
}

impl From<LaserTriggerMode> for i64 {
    fn from(mode: LaserTriggerMode) -> Self {
        mode as i64
    }
}

/// Converts a 16-character binary string into its register value.
///
/// The sequence selects on which of 16 successive trigger cycles a laser
/// fires; `0` skips the frame. Returns `-1` for any input that is not
/// exactly 16 characters of `0`s and `1`s.
pub fn format_sequence(sequence: &str) -> i64 {
    if sequence.len() != 16 || !sequence.bytes().all(|b| b == b'0' || b == b'1') {
        return -1;
    }
    i64::from_str_radix(sequence, 2).unwrap_or(-1)
}

/// A single bounds-checked register accessor.
pub struct Signal {
    kind: SignalKind,
    channel: u32,
    address: u32,
    max: i64,
    read_only: bool,
    link: SharedLink,
}

impl std::fmt::Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("kind", &self.kind)
            .field("channel", &self.channel)
            .field("address", &self.address)
            .field("max", &self.max)
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}

impl Signal {
    /// Creates the accessor for channel `channel` of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`FpgaError::ChannelOutOfRange`] when the channel index is
    /// not below the class capacity.
    pub fn new(
        kind: SignalKind,
        channel: u32,
        generation: CameraGeneration,
        link: SharedLink,
    ) -> FpgaResult<Self> {
        if channel >= kind.capacity() {
            return Err(FpgaError::ChannelOutOfRange {
                name: kind.name(),
                channel,
                capacity: kind.capacity(),
            });
        }
        Ok(Self {
            kind,
            channel,
            address: kind.base_address() + channel,
            max: kind.max_value(generation),
            read_only: kind.is_read_only(),
            link,
        })
    }

    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }

    /// Register address this signal reads and writes.
    pub fn address(&self) -> u32 {
        self.address
    }

    /// Highest allowed value; the minimum is always 0.
    pub fn max(&self) -> i64 {
        self.max
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// True when `value` would be accepted by [`Signal::write`].
    pub fn is_allowed(&self, value: i64) -> bool {
        !self.read_only && (0..=self.max).contains(&value)
    }

    /// Writes a new state to the device.
    ///
    /// Returns `Ok(true)` once the request frame was sent and `Ok(false)`
    /// when the transport is disconnected.
    ///
    /// # Errors
    ///
    /// [`FpgaError::ReadOnly`] for input signals,
    /// [`FpgaError::ValueNotAllowed`] for values outside `[0, max]`. Both
    /// are raised before any I/O happens.
    pub fn write(&self, value: i64) -> FpgaResult<bool> {
        if self.read_only {
            return Err(FpgaError::ReadOnly {
                name: self.kind.name(),
                channel: self.channel,
            });
        }
        if !(0..=self.max).contains(&value) {
            return Err(FpgaError::ValueNotAllowed {
                name: self.kind.name(),
                channel: self.channel,
                value,
                max: self.max,
            });
        }
        // Bounds were checked against max <= u32::MAX above.
        transport::lock(&self.link).write(self.address, value as u32)
    }

    /// Reads the current state from the device.
    ///
    /// Returns `Ok(-1)` when the transport is disconnected.
    pub fn read(&self) -> FpgaResult<i64> {
        transport::lock(&self.link).read(self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockFpga;
    use crate::transport;

    fn test_link() -> (MockFpga, SharedLink) {
        let mock = MockFpga::new();
        let link = transport::shared(Box::new(mock.clone()));
        (mock, link)
    }

    #[test]
    fn channel_beyond_capacity_is_rejected() {
        let (_mock, link) = test_link();
        let err = Signal::new(
            SignalKind::Ttl,
            4,
            CameraGeneration::FireExposure,
            link.clone(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FpgaError::ChannelOutOfRange {
                channel: 4,
                capacity: 4,
                ..
            }
        ));
        assert!(Signal::new(SignalKind::Ttl, 3, CameraGeneration::FireExposure, link).is_ok());
    }

    #[test]
    fn values_inside_the_bound_are_allowed() {
        let (_mock, link) = test_link();
        let signal =
            Signal::new(SignalKind::Pwm, 0, CameraGeneration::FireExposure, link).unwrap();
        for value in [0, 5, 255] {
            assert!(signal.is_allowed(value));
            assert!(signal.write(value).unwrap());
        }
        for value in [-1, 256, 1000] {
            assert!(!signal.is_allowed(value));
            assert!(matches!(
                signal.write(value),
                Err(FpgaError::ValueNotAllowed { .. })
            ));
        }
    }

    #[test]
    fn read_only_signal_rejects_all_writes() {
        let (_mock, link) = test_link();
        let signal = Signal::new(
            SignalKind::AnalogInput,
            0,
            CameraGeneration::FireExposure,
            link,
        )
        .unwrap();
        assert!(signal.is_read_only());
        for value in [0, 5, 10, 11, 20] {
            assert!(!signal.is_allowed(value));
            assert!(matches!(signal.write(value), Err(FpgaError::ReadOnly { .. })));
        }
    }

    #[test]
    fn write_then_read_round_trips_through_the_device() {
        let (mock, link) = test_link();
        let signal =
            Signal::new(SignalKind::Servo, 2, CameraGeneration::FireExposure, link).unwrap();
        assert!(signal.write(40_000).unwrap());
        assert_eq!(signal.read().unwrap(), 40_000);
        assert_eq!(mock.register(signal.address()), Some(40_000));
    }

    #[test]
    fn channel_offsets_land_in_the_right_registers() {
        let (mock, link) = test_link();
        for channel in 0..4 {
            let signal = Signal::new(
                SignalKind::Ttl,
                channel,
                CameraGeneration::FireExposure,
                link.clone(),
            )
            .unwrap();
            signal.write(1).unwrap();
            assert_eq!(
                mock.register(SignalKind::Ttl.base_address() + channel),
                Some(1)
            );
        }
    }

    #[test]
    fn disconnected_signal_returns_sentinels() {
        let (mock, link) = test_link();
        let signal =
            Signal::new(SignalKind::Ttl, 0, CameraGeneration::FireExposure, link).unwrap();
        mock.disconnect();
        assert!(!signal.write(1).unwrap());
        assert_eq!(signal.read().unwrap(), -1);
    }

    #[test]
    fn mode_accepts_enum_and_raw_integers() {
        let (_mock, link) = test_link();
        let mode = Signal::new(
            SignalKind::LaserMode,
            0,
            CameraGeneration::FireExposure,
            link,
        )
        .unwrap();
        assert!(mode.write(LaserTriggerMode::Follow.into()).unwrap());
        assert!(mode.write(3).unwrap());
        assert!(matches!(
            mode.write(5),
            Err(FpgaError::ValueNotAllowed { .. })
        ));
    }

    #[test]
    fn format_sequence_parses_binary_patterns() {
        assert_eq!(format_sequence("0000000000000000"), 0);
        assert_eq!(format_sequence("1111111111111111"), 65_535);
        assert_eq!(format_sequence("1010101010101010"), 43_690);
        assert_eq!(format_sequence("1100110011001100"), 52_428);
    }

    #[test]
    fn format_sequence_rejects_malformed_input() {
        for sequence in [
            "010110011010010",
            "01010101100010100",
            "1010101010121010",
            "1010a01010101010",
            "_1t_w0rk5__ma73!",
            "",
        ] {
            assert_eq!(format_sequence(sequence), -1);
        }
    }
}

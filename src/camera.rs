//! Camera trigger composite and synchronization mode.
//!
//! In active synchronization the device generates the camera-facing fire
//! signal itself: a periodic pulse train shaped by four timing registers,
//! plus an internal exposure signal that feeds the laser trigger modules.
//! In passive synchronization the device only reacts to an externally
//! supplied exposure signal and the camera module is inert.
//!
//! The meaning of the four registers depends on the camera generation
//! (see [`CameraGeneration`]): under the current fire/exposure firmware
//! they hold pulse, read-out, exposure and laser delay in microseconds;
//! under the legacy active-trigger firmware the read-out slot holds the
//! trigger period and timings are stored in tenths (delay: hundredths) of
//! a millisecond.
//!
//! Millisecond conversions truncate toward zero when crossing into
//! register units; round-tripping a value through the millisecond API is
//! lossy below the register resolution.

use crate::error::FpgaResult;
use crate::regmap::{CameraGeneration, SignalKind};
use crate::signal::Signal;
use crate::transport::SharedLink;

/// The two synchronization states of the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// The device reacts to an externally supplied exposure signal.
    Passive = 0,
    /// The device generates the camera trigger and exposure signals.
    Active = 1,
}

/// The single-register synchronization mode switch.
///
/// Both transitions are idempotent single-register writes and are always
/// permitted; no other operation resets the mode implicitly.
pub struct SyncMode {
    signal: Signal,
}

impl SyncMode {
    pub fn new(generation: CameraGeneration, link: SharedLink) -> FpgaResult<Self> {
        Ok(Self {
            signal: Signal::new(SignalKind::SyncFlag, 0, generation, link)?,
        })
    }

    /// Switches the device to active synchronization.
    pub fn set_active(&self) -> FpgaResult<bool> {
        self.signal.write(SyncState::Active as i64)
    }

    /// Switches the device to passive synchronization.
    pub fn set_passive(&self) -> FpgaResult<bool> {
        self.signal.write(SyncState::Passive as i64)
    }

    /// Reads the mode register; `false` while passive or disconnected.
    pub fn is_active(&self) -> FpgaResult<bool> {
        Ok(self.signal.read()? == SyncState::Active as i64)
    }
}

/// Camera timing parameters in register units.
///
/// Field meaning and bounds follow the session's [`CameraGeneration`].
/// Reads as all `-1` while disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraState {
    /// Fire pulse length.
    pub pulse: i64,
    /// Delay between fire pulse and exposure rising edges.
    pub delay: i64,
    /// Exposure signal pulse length.
    pub exposure: i64,
    /// Delay between end of exposure and the next fire pulse; trigger
    /// period under the legacy generation.
    pub readout: i64,
}

/// Camera timing parameters in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraStateMs {
    pub pulse: f64,
    pub delay: f64,
    pub exposure: f64,
    pub readout: f64,
}

/// The four camera timing registers plus the start flag.
///
/// The module itself performs no synchronization-mode checks; the
/// controller guards every camera accessor so that an inert module never
/// touches the wire.
pub struct CameraTrigger {
    generation: CameraGeneration,
    pulse: Signal,
    readout: Signal,
    exposure: Signal,
    delay: Signal,
    start: Signal,
}

impl CameraTrigger {
    pub fn new(generation: CameraGeneration, link: SharedLink) -> FpgaResult<Self> {
        Ok(Self {
            generation,
            pulse: Signal::new(SignalKind::CameraPulse, 0, generation, link.clone())?,
            readout: Signal::new(SignalKind::CameraReadout, 0, generation, link.clone())?,
            exposure: Signal::new(SignalKind::CameraExposure, 0, generation, link.clone())?,
            delay: Signal::new(SignalKind::LaserDelay, 0, generation, link.clone())?,
            start: Signal::new(SignalKind::StartFlag, 0, generation, link)?,
        })
    }

    pub fn generation(&self) -> CameraGeneration {
        self.generation
    }

    pub fn set_pulse(&self, value: i64) -> FpgaResult<bool> {
        self.pulse.write(value)
    }

    pub fn pulse(&self) -> FpgaResult<i64> {
        self.pulse.read()
    }

    pub fn set_readout(&self, value: i64) -> FpgaResult<bool> {
        self.readout.write(value)
    }

    pub fn readout(&self) -> FpgaResult<i64> {
        self.readout.read()
    }

    pub fn set_exposure(&self, value: i64) -> FpgaResult<bool> {
        self.exposure.write(value)
    }

    pub fn exposure(&self) -> FpgaResult<i64> {
        self.exposure.read()
    }

    pub fn set_delay(&self, value: i64) -> FpgaResult<bool> {
        self.delay.write(value)
    }

    pub fn delay(&self) -> FpgaResult<i64> {
        self.delay.read()
    }

    /// Writes the four timing registers in order pulse, delay, exposure,
    /// read-out. The registers are independent on the device; there is no
    /// transactional update.
    pub fn set_state(&self, state: CameraState) -> FpgaResult<bool> {
        let pulse = self.set_pulse(state.pulse)?;
        let delay = self.set_delay(state.delay)?;
        let exposure = self.set_exposure(state.exposure)?;
        let readout = self.set_readout(state.readout)?;
        Ok(pulse && delay && exposure && readout)
    }

    /// Reads the four timing registers.
    pub fn state(&self) -> FpgaResult<CameraState> {
        Ok(CameraState {
            pulse: self.pulse()?,
            delay: self.delay()?,
            exposure: self.exposure()?,
            readout: self.readout()?,
        })
    }

    /// Writes the timing registers from millisecond values, truncating
    /// toward zero at the generation's register resolution.
    pub fn set_state_ms(&self, state: CameraStateMs) -> FpgaResult<bool> {
        self.set_state(CameraState {
            pulse: to_register_units(state.pulse, self.generation.timing_scale()),
            delay: to_register_units(state.delay, self.generation.delay_scale()),
            exposure: to_register_units(state.exposure, self.generation.timing_scale()),
            readout: to_register_units(state.readout, self.generation.timing_scale()),
        })
    }

    /// Reads the timing registers and converts them to milliseconds. The
    /// `-1` disconnected sentinel is passed through unscaled.
    pub fn state_ms(&self) -> FpgaResult<CameraStateMs> {
        let state = self.state()?;
        Ok(CameraStateMs {
            pulse: to_milliseconds(state.pulse, self.generation.timing_scale()),
            delay: to_milliseconds(state.delay, self.generation.delay_scale()),
            exposure: to_milliseconds(state.exposure, self.generation.timing_scale()),
            readout: to_milliseconds(state.readout, self.generation.timing_scale()),
        })
    }

    /// Starts camera triggering: writes 1 to the start register.
    pub fn start(&self) -> FpgaResult<bool> {
        self.start.write(1)
    }

    /// Stops camera triggering: writes 0 to the start register.
    pub fn stop(&self) -> FpgaResult<bool> {
        self.start.write(0)
    }

    /// Reads the start register back verbatim; there is no confirmation
    /// handshake.
    pub fn is_running(&self) -> FpgaResult<i64> {
        self.start.read()
    }
}

/// Millisecond-to-register conversion; truncates toward zero, which is
/// lossy below the register resolution.
fn to_register_units(milliseconds: f64, scale: f64) -> i64 {
    (milliseconds * scale) as i64
}

fn to_milliseconds(register: i64, scale: f64) -> f64 {
    if register < 0 {
        return register as f64;
    }
    register as f64 / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockFpga;
    use crate::transport;

    fn camera(generation: CameraGeneration) -> (MockFpga, CameraTrigger) {
        let mock = MockFpga::new();
        let link = transport::shared(Box::new(mock.clone()));
        let camera = CameraTrigger::new(generation, link).unwrap();
        (mock, camera)
    }

    #[test]
    fn sync_mode_transitions_are_single_register_writes() {
        let mock = MockFpga::new();
        let link = transport::shared(Box::new(mock.clone()));
        let sync = SyncMode::new(CameraGeneration::FireExposure, link).unwrap();
        let sync_addr = SignalKind::SyncFlag.base_address();

        assert!(sync.set_active().unwrap());
        assert!(sync.is_active().unwrap());
        // Idempotent: setting the same state again is permitted.
        assert!(sync.set_active().unwrap());
        assert!(sync.set_passive().unwrap());
        assert!(!sync.is_active().unwrap());
        assert_eq!(
            mock.writes(),
            vec![(sync_addr, 1), (sync_addr, 1), (sync_addr, 0)]
        );
    }

    #[test]
    fn millisecond_round_trip_truncates_toward_zero() {
        let (_mock, camera) = camera(CameraGeneration::FireExposure);
        assert!(camera
            .set_state_ms(CameraStateMs {
                pulse: 1.0,
                delay: 0.5,
                exposure: 19.5,
                readout: 1.0,
            })
            .unwrap());

        let state = camera.state().unwrap();
        assert_eq!(state.pulse, 1_000);
        assert_eq!(state.delay, 500);
        assert_eq!(state.exposure, 19_500);
        assert_eq!(state.readout, 1_000);

        let ms = camera.state_ms().unwrap();
        assert!((ms.pulse - 1.0).abs() < 1e-9);
        assert!((ms.delay - 0.5).abs() < 1e-9);
        assert!((ms.exposure - 19.5).abs() < 1e-9);
        assert!((ms.readout - 1.0).abs() < 1e-9);
    }

    #[test]
    fn sub_resolution_milliseconds_are_lost() {
        let (_mock, camera) = camera(CameraGeneration::FireExposure);
        // 0.0001 ms is below the microsecond register resolution.
        camera
            .set_state_ms(CameraStateMs {
                pulse: 1.0001,
                delay: 0.0,
                exposure: 0.0,
                readout: 0.0,
            })
            .unwrap();
        assert_eq!(camera.pulse().unwrap(), 1_000);
    }

    #[test]
    fn legacy_generation_scales_by_ten_and_hundred() {
        let (mock, camera) = camera(CameraGeneration::Legacy);
        assert!(camera
            .set_state_ms(CameraStateMs {
                pulse: 1.0,
                delay: 0.5,
                exposure: 40.0,
                readout: 50.0,
            })
            .unwrap());
        assert_eq!(mock.register(SignalKind::CameraPulse.base_address()), Some(10));
        assert_eq!(mock.register(SignalKind::LaserDelay.base_address()), Some(50));
        assert_eq!(
            mock.register(SignalKind::CameraExposure.base_address()),
            Some(400)
        );
        assert_eq!(
            mock.register(SignalKind::CameraReadout.base_address()),
            Some(500)
        );

        let ms = camera.state_ms().unwrap();
        assert!((ms.pulse - 1.0).abs() < 1e-9);
        assert!((ms.delay - 0.5).abs() < 1e-9);
    }

    #[test]
    fn legacy_bounds_cap_at_sixteen_bits() {
        let (_mock, camera) = camera(CameraGeneration::Legacy);
        assert!(matches!(
            camera.set_pulse(65_536),
            Err(crate::FpgaError::ValueNotAllowed { .. })
        ));
        assert!(camera.set_pulse(65_535).unwrap());
    }

    #[test]
    fn start_stop_round_trip() {
        let (mock, camera) = camera(CameraGeneration::FireExposure);
        let start_addr = SignalKind::StartFlag.base_address();

        assert!(camera.start().unwrap());
        assert_eq!(camera.is_running().unwrap(), 1);
        assert!(camera.stop().unwrap());
        assert_eq!(camera.is_running().unwrap(), 0);
        assert_eq!(mock.writes(), vec![(start_addr, 1), (start_addr, 0)]);
    }

    #[test]
    fn disconnected_state_reads_as_sentinels() {
        let (mock, camera) = camera(CameraGeneration::FireExposure);
        mock.disconnect();
        let state = camera.state().unwrap();
        assert_eq!(
            state,
            CameraState {
                pulse: -1,
                delay: -1,
                exposure: -1,
                readout: -1
            }
        );
        // The sentinel is not scaled into a fractional millisecond value.
        let ms = camera.state_ms().unwrap();
        assert!((ms.pulse + 1.0).abs() < 1e-9);
    }
}

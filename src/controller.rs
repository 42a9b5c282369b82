//! High-level device controller.
//!
//! [`FpgaController`] owns the transport for one device session and the
//! signals built on top of it. Construction decides how many channels of
//! each signal class to drive and whether the camera trigger module is
//! used; the board's firmware version and identity are read once and
//! checked against the supported set before any channel is instantiated.
//!
//! An incompatible or absent device is not a construction error: the
//! controller logs a warning, disconnects, and remains usable in a
//! degraded state — `is_connected` reports `false`, every channel count is
//! zero and all accessors return their sentinels. This keeps best-effort
//! acquisition scripts running when a rack is partially powered.
//!
//! The transport handle is a scoped resource: released exactly once, on
//! explicit [`FpgaController::disconnect`] or on drop, and disconnecting
//! twice is safe.

use log::{info, warn};

use crate::camera::{CameraState, CameraStateMs, CameraTrigger, SyncMode};
use crate::config::ControllerConfig;
use crate::error::FpgaResult;
use crate::laser::{LaserState, LaserTrigger};
use crate::protocol::{ADDR_ID, ADDR_VERSION, PROTOCOL_VERSION};
use crate::regmap::{BoardId, SignalKind};
use crate::signal::Signal;
use crate::transport::{self, SharedLink, Transport};

#[cfg(feature = "instrument_serial")]
use crate::config::SerialConfig;
#[cfg(feature = "instrument_serial")]
use crate::discovery;
#[cfg(feature = "instrument_serial")]
use crate::transport::SerialTransport;

/// Controller for one device session.
pub struct FpgaController {
    link: SharedLink,
    device: Option<String>,
    version: i64,
    board: Option<BoardId>,
    lasers: Vec<LaserTrigger>,
    ttls: Vec<Signal>,
    servos: Vec<Signal>,
    pwms: Vec<Signal>,
    analogs: Vec<Signal>,
    camera: Option<CameraTrigger>,
    sync: Option<SyncMode>,
}

impl FpgaController {
    /// Discovers a compatible serial device and connects to it.
    ///
    /// Port discovery filters by the FTDI vendor/product identifier and
    /// disambiguates multiple candidates with
    /// [`ControllerConfig::known_device`]. Zero candidates, or several
    /// candidates with no usable `known_device`, produce a warning and a
    /// disconnected controller, not an error.
    #[cfg(feature = "instrument_serial")]
    pub fn open(config: &ControllerConfig, serial: &SerialConfig) -> FpgaResult<Self> {
        let candidates = discovery::list_candidate_ports()?;
        let resolved = discovery::resolve_device(&candidates, config.known_device.as_deref());
        let transport: Box<dyn Transport> = match &resolved {
            Some(device) => Box::new(SerialTransport::open(device, serial)?),
            None => Box::new(SerialTransport::disconnected()),
        };
        let mut controller = Self::with_transport(config, transport)?;
        controller.device = resolved;
        Ok(controller)
    }

    #[cfg(not(feature = "instrument_serial"))]
    pub fn open(
        _config: &ControllerConfig,
        _serial: &crate::config::SerialConfig,
    ) -> FpgaResult<Self> {
        Err(crate::error::FpgaError::SerialFeatureDisabled)
    }

    /// Connects over an already-open transport.
    ///
    /// Reads the firmware version and board id once. When either is not in
    /// the supported set the controller warns, disconnects and comes up
    /// with zero channels.
    ///
    /// # Errors
    ///
    /// Fails when the configuration requests more channels than the board
    /// capacities allow, or on transport I/O errors during the identity
    /// exchange and channel setup.
    pub fn with_transport(
        config: &ControllerConfig,
        transport: Box<dyn Transport>,
    ) -> FpgaResult<Self> {
        let link = transport::shared(transport);
        let mut controller = Self {
            link,
            device: None,
            version: -1,
            board: None,
            lasers: Vec::new(),
            ttls: Vec::new(),
            servos: Vec::new(),
            pwms: Vec::new(),
            analogs: Vec::new(),
            camera: None,
            sync: None,
        };

        if !controller.is_connected() {
            warn!("No device connected; controller comes up with zero channels");
            return Ok(controller);
        }

        {
            let mut link = transport::lock(&controller.link);
            controller.version = link.read(ADDR_VERSION)?;
            controller.board = u32::try_from(link.read(ADDR_ID)?)
                .ok()
                .and_then(BoardId::from_id);
        }

        if let Err(err) = controller.check_identity() {
            warn!("{err}. The port has been disconnected");
            controller.disconnect();
            return Ok(controller);
        }

        controller.provision(config)?;
        info!(
            "Connected to {} board, firmware version {}",
            controller.board_name(),
            controller.version
        );
        Ok(controller)
    }

    /// Compares the identity registers read at connection against the
    /// supported firmware version and the known board set.
    fn check_identity(&self) -> FpgaResult<()> {
        if self.version == i64::from(PROTOCOL_VERSION) && self.board.is_some() {
            return Ok(());
        }
        let mut reasons = Vec::new();
        if self.version != i64::from(PROTOCOL_VERSION) {
            reasons.push(format!(
                "expected firmware version {PROTOCOL_VERSION}, got {}",
                self.version
            ));
        }
        if self.board.is_none() {
            reasons.push(format!(
                "unknown board id (known boards: Au {}, Au+ {}, Cu {}, Mojo {})",
                BoardId::ID_AU,
                BoardId::ID_AU_PLUS,
                BoardId::ID_CU,
                BoardId::ID_MOJO
            ));
        }
        Err(crate::error::FpgaError::IncompatibleDevice(
            reasons.join("; "),
        ))
    }

    fn provision(&mut self, config: &ControllerConfig) -> FpgaResult<()> {
        let generation = config.camera_generation;

        for channel in 0..config.n_laser {
            self.lasers
                .push(LaserTrigger::new(channel, generation, self.link.clone())?);
        }
        for channel in 0..config.n_ttl {
            self.ttls
                .push(Signal::new(SignalKind::Ttl, channel, generation, self.link.clone())?);
        }
        for channel in 0..config.n_servo {
            self.servos.push(Signal::new(
                SignalKind::Servo,
                channel,
                generation,
                self.link.clone(),
            )?);
        }
        for channel in 0..config.n_pwm {
            self.pwms.push(Signal::new(
                SignalKind::Pwm,
                channel,
                generation,
                self.link.clone(),
            )?);
        }

        let analog_capable = self
            .board
            .is_some_and(BoardId::supports_analog_inputs);
        if analog_capable {
            for channel in 0..config.n_ai {
                self.analogs.push(Signal::new(
                    SignalKind::AnalogInput,
                    channel,
                    generation,
                    self.link.clone(),
                )?);
            }
        } else if config.n_ai > 0 {
            warn!(
                "{} board has no analog inputs; none were instantiated",
                self.board_name()
            );
        }

        if config.use_camera {
            let sync = SyncMode::new(generation, self.link.clone())?;
            sync.set_active()?;
            self.camera = Some(CameraTrigger::new(generation, self.link.clone())?);
            self.sync = Some(sync);
        } else {
            SyncMode::new(generation, self.link.clone())?.set_passive()?;
        }
        Ok(())
    }

    /// True while the transport is connected.
    pub fn is_connected(&self) -> bool {
        transport::lock(&self.link).is_connected()
    }

    /// Releases the transport. Safe to call more than once.
    pub fn disconnect(&mut self) {
        transport::lock(&self.link).close();
    }

    /// Serial device name, when the session was opened on a named port.
    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    /// Firmware version reported at connection, `-1` if never read.
    pub fn firmware_version(&self) -> i64 {
        self.version
    }

    /// Board identity, when the connected board was recognized.
    pub fn board(&self) -> Option<BoardId> {
        self.board
    }

    /// Human-readable board name, `"Unknown"` when unrecognized.
    pub fn board_name(&self) -> &'static str {
        self.board.map_or("Unknown", BoardId::name)
    }

    pub fn laser_count(&self) -> usize {
        self.lasers.len()
    }

    pub fn ttl_count(&self) -> usize {
        self.ttls.len()
    }

    pub fn servo_count(&self) -> usize {
        self.servos.len()
    }

    pub fn pwm_count(&self) -> usize {
        self.pwms.len()
    }

    pub fn analog_count(&self) -> usize {
        self.analogs.len()
    }

    /// Sets a TTL output; `Ok(false)` for unknown channels or while
    /// disconnected.
    pub fn set_ttl_state(&self, channel: usize, value: i64) -> FpgaResult<bool> {
        match self.ttls.get(channel) {
            Some(signal) => signal.write(value),
            None => Ok(false),
        }
    }

    /// Reads a TTL output; `Ok(-1)` for unknown channels or while
    /// disconnected.
    pub fn ttl_state(&self, channel: usize) -> FpgaResult<i64> {
        match self.ttls.get(channel) {
            Some(signal) => signal.read(),
            None => Ok(-1),
        }
    }

    /// Sets a servo position in `[0, 65535]`.
    pub fn set_servo_state(&self, channel: usize, value: i64) -> FpgaResult<bool> {
        match self.servos.get(channel) {
            Some(signal) => signal.write(value),
            None => Ok(false),
        }
    }

    pub fn servo_state(&self, channel: usize) -> FpgaResult<i64> {
        match self.servos.get(channel) {
            Some(signal) => signal.read(),
            None => Ok(-1),
        }
    }

    /// Sets a PWM duty cycle in `[0, 255]`.
    pub fn set_pwm_state(&self, channel: usize, value: i64) -> FpgaResult<bool> {
        match self.pwms.get(channel) {
            Some(signal) => signal.write(value),
            None => Ok(false),
        }
    }

    pub fn pwm_state(&self, channel: usize) -> FpgaResult<i64> {
        match self.pwms.get(channel) {
            Some(signal) => signal.read(),
            None => Ok(-1),
        }
    }

    /// Latest measurement of an analog input channel.
    pub fn analog_state(&self, channel: usize) -> FpgaResult<i64> {
        match self.analogs.get(channel) {
            Some(signal) => signal.read(),
            None => Ok(-1),
        }
    }

    /// Sets the trigger mode of a laser channel, from a raw integer or a
    /// [`crate::LaserTriggerMode`] value.
    pub fn set_laser_mode(&self, channel: usize, mode: impl Into<i64>) -> FpgaResult<bool> {
        match self.lasers.get(channel) {
            Some(laser) => laser.set_mode(mode),
            None => Ok(false),
        }
    }

    pub fn laser_mode(&self, channel: usize) -> FpgaResult<i64> {
        match self.lasers.get(channel) {
            Some(laser) => laser.mode(),
            None => Ok(-1),
        }
    }

    /// Sets the trigger pulse duration of a laser channel, in
    /// microseconds.
    pub fn set_laser_duration(&self, channel: usize, duration_us: i64) -> FpgaResult<bool> {
        match self.lasers.get(channel) {
            Some(laser) => laser.set_duration(duration_us),
            None => Ok(false),
        }
    }

    pub fn laser_duration(&self, channel: usize) -> FpgaResult<i64> {
        match self.lasers.get(channel) {
            Some(laser) => laser.duration(),
            None => Ok(-1),
        }
    }

    /// Sets the 16-bit frame-skip sequence of a laser channel.
    pub fn set_laser_sequence(&self, channel: usize, sequence: i64) -> FpgaResult<bool> {
        match self.lasers.get(channel) {
            Some(laser) => laser.set_sequence(sequence),
            None => Ok(false),
        }
    }

    pub fn laser_sequence(&self, channel: usize) -> FpgaResult<i64> {
        match self.lasers.get(channel) {
            Some(laser) => laser.sequence(),
            None => Ok(-1),
        }
    }

    /// Applies mode, duration and sequence to a laser channel, stopping
    /// at the first write that is not sent.
    pub fn set_laser_state(
        &self,
        channel: usize,
        mode: impl Into<i64>,
        duration_us: i64,
        sequence: i64,
    ) -> FpgaResult<bool> {
        match self.lasers.get(channel) {
            Some(laser) => laser.set_state(mode, duration_us, sequence),
            None => Ok(false),
        }
    }

    /// Reads `[mode, duration, sequence]` of a laser channel;
    /// `[-1, -1, -1]` for unknown channels or while disconnected.
    pub fn laser_state(&self, channel: usize) -> FpgaResult<LaserState> {
        match self.lasers.get(channel) {
            Some(laser) => laser.state(),
            None => Ok([-1, -1, -1]),
        }
    }

    /// True while the device is in active synchronization. Reads the sync
    /// register; `false` when no camera module was provisioned.
    pub fn is_active_sync(&self) -> FpgaResult<bool> {
        match &self.sync {
            Some(sync) => sync.is_active(),
            None => Ok(false),
        }
    }

    /// Switches to active synchronization. No-op without a camera module.
    pub fn set_active_sync(&self) -> FpgaResult<bool> {
        match &self.sync {
            Some(sync) => sync.set_active(),
            None => Ok(false),
        }
    }

    /// Switches to passive synchronization. No-op without a camera module.
    pub fn set_passive_sync(&self) -> FpgaResult<bool> {
        match &self.sync {
            Some(sync) => sync.set_passive(),
            None => Ok(false),
        }
    }

    /// The camera module, only while synchronization is active.
    ///
    /// Every camera accessor funnels through this guard: a controller
    /// built with `use_camera = false`, or one currently in passive
    /// synchronization, never lets camera traffic reach the device.
    fn active_camera(&self) -> FpgaResult<Option<&CameraTrigger>> {
        if self.is_active_sync()? {
            Ok(self.camera.as_ref())
        } else {
            Ok(None)
        }
    }

    /// Sets the camera fire pulse length, in register units.
    pub fn set_camera_pulse(&self, value: i64) -> FpgaResult<bool> {
        match self.active_camera()? {
            Some(camera) => camera.set_pulse(value),
            None => Ok(false),
        }
    }

    pub fn camera_pulse(&self) -> FpgaResult<i64> {
        match self.active_camera()? {
            Some(camera) => camera.pulse(),
            None => Ok(-1),
        }
    }

    /// Sets the camera read-out time (trigger period under the legacy
    /// generation), in register units.
    pub fn set_camera_readout(&self, value: i64) -> FpgaResult<bool> {
        match self.active_camera()? {
            Some(camera) => camera.set_readout(value),
            None => Ok(false),
        }
    }

    pub fn camera_readout(&self) -> FpgaResult<i64> {
        match self.active_camera()? {
            Some(camera) => camera.readout(),
            None => Ok(-1),
        }
    }

    /// Sets the exposure signal pulse length, in register units.
    pub fn set_camera_exposure(&self, value: i64) -> FpgaResult<bool> {
        match self.active_camera()? {
            Some(camera) => camera.set_exposure(value),
            None => Ok(false),
        }
    }

    pub fn camera_exposure(&self) -> FpgaResult<i64> {
        match self.active_camera()? {
            Some(camera) => camera.exposure(),
            None => Ok(-1),
        }
    }

    /// Sets the delay between camera fire and laser trigger, in register
    /// units.
    pub fn set_laser_delay(&self, value: i64) -> FpgaResult<bool> {
        match self.active_camera()? {
            Some(camera) => camera.set_delay(value),
            None => Ok(false),
        }
    }

    pub fn laser_delay(&self) -> FpgaResult<i64> {
        match self.active_camera()? {
            Some(camera) => camera.delay(),
            None => Ok(-1),
        }
    }

    /// Writes the four camera timing registers, in register units.
    pub fn set_camera_state(&self, state: CameraState) -> FpgaResult<bool> {
        match self.active_camera()? {
            Some(camera) => camera.set_state(state),
            None => Ok(false),
        }
    }

    /// Reads the four camera timing registers; all `-1` when the module
    /// is inert.
    pub fn camera_state(&self) -> FpgaResult<CameraState> {
        match self.active_camera()? {
            Some(camera) => camera.state(),
            None => Ok(CameraState {
                pulse: -1,
                delay: -1,
                exposure: -1,
                readout: -1,
            }),
        }
    }

    /// Writes the camera timings from millisecond values; the conversion
    /// truncates toward zero at the register resolution.
    pub fn set_camera_state_ms(&self, state: CameraStateMs) -> FpgaResult<bool> {
        match self.active_camera()? {
            Some(camera) => camera.set_state_ms(state),
            None => Ok(false),
        }
    }

    /// Reads the camera timings in milliseconds; all `-1` when the module
    /// is inert.
    pub fn camera_state_ms(&self) -> FpgaResult<CameraStateMs> {
        match self.active_camera()? {
            Some(camera) => camera.state_ms(),
            None => Ok(CameraStateMs {
                pulse: -1.0,
                delay: -1.0,
                exposure: -1.0,
                readout: -1.0,
            }),
        }
    }

    /// Starts camera triggering and synchronization. Only has an effect
    /// in active synchronization.
    pub fn start_camera(&self) -> FpgaResult<bool> {
        match self.active_camera()? {
            Some(camera) => camera.start(),
            None => Ok(false),
        }
    }

    /// Stops camera triggering and synchronization.
    pub fn stop_camera(&self) -> FpgaResult<bool> {
        match self.active_camera()? {
            Some(camera) => camera.stop(),
            None => Ok(false),
        }
    }

    /// True while the camera trigger module is running.
    pub fn is_camera_running(&self) -> FpgaResult<bool> {
        match self.active_camera()? {
            Some(camera) => Ok(camera.is_running()? == 1),
            None => Ok(false),
        }
    }
}

impl Drop for FpgaController {
    fn drop(&mut self) {
        self.disconnect();
    }
}

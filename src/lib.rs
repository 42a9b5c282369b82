//! # FPGA Trigger Driver
//!
//! Host-side driver for an FPGA peripheral that synthesizes laser, camera,
//! TTL, PWM and servo trigger signals for microscopy acquisition. The
//! device exposes a flat space of 32-bit registers over a USB serial
//! bridge; this crate provides the wire codec for that register protocol,
//! bounds-checked accessors for every signal class, and the camera trigger
//! synchronization logic on top.
//!
//! ## Crate Structure
//!
//! - **`protocol`**: the binary register protocol — fixed-size read/write
//!   request frames and little-endian response decoding.
//! - **`regmap`**: the static register layout, board identities and camera
//!   timing generations.
//! - **`transport`**: the byte-stream [`transport::Transport`] seam, the
//!   serial implementation and the shared register link.
//! - **`mock`**: an in-memory device emulator implementing the full wire
//!   protocol, for tests and development without hardware.
//! - **`signal`**: the generic bounds-checked register accessor and laser
//!   trigger modes.
//! - **`laser`**, **`camera`**: composite signals spanning several
//!   registers, and the synchronization mode state machine.
//! - **`controller`**: the top-level [`FpgaController`] owning the session.
//! - **`discovery`**: USB serial port discovery and disambiguation.
//! - **`config`**: typed, validated configuration value objects.
//!
//! ## Example
//!
//! ```no_run
//! use fpga_trigger::{ControllerConfig, FpgaController, LaserTriggerMode, SerialConfig};
//!
//! # fn main() -> fpga_trigger::FpgaResult<()> {
//! let config = ControllerConfig {
//!     n_laser: 3,
//!     use_camera: false,
//!     ..ControllerConfig::default()
//! };
//! let controller = FpgaController::open(&config, &SerialConfig::default())?;
//! if controller.is_connected() {
//!     controller.set_laser_state(0, LaserTriggerMode::Rising, 2_000, 0b1010_1010_1010_1010)?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Accessors degrade to sentinel returns (`false` / `-1`) instead of
//! failing while the device is disconnected, so best-effort scripts keep
//! running; see [`error::FpgaError`] for the failures that do surface as
//! errors.

pub mod camera;
pub mod config;
pub mod controller;
pub mod discovery;
pub mod error;
pub mod laser;
pub mod mock;
pub mod protocol;
pub mod regmap;
pub mod signal;
pub mod transport;

pub use camera::{CameraState, CameraStateMs, CameraTrigger, SyncMode, SyncState};
pub use config::{ControllerConfig, SerialConfig};
pub use controller::FpgaController;
pub use error::{FpgaError, FpgaResult};
pub use laser::{LaserState, LaserTrigger};
pub use mock::MockFpga;
pub use regmap::{BoardId, CameraGeneration, SignalKind};
pub use signal::{format_sequence, LaserTriggerMode, Signal};

//! Static register map, board identities and camera generations.
//!
//! The register space is partitioned into contiguous ranges, one per signal
//! class, in a fixed declaration order that mirrors the firmware
//! configuration: laser modes, laser durations, laser sequences, TTLs,
//! servos, PWMs, the synchronization flag, the camera start flag, the four
//! camera timing registers and finally the analog inputs. The base address
//! of a class is the sum of the capacities of every class declared before
//! it; channel `i` of a class lives at `base + i`.
//!
//! Capacities are compile-time constants matching the firmware build. The
//! two control registers (version and board id) live outside the
//! channel-indexed space, see [`crate::protocol`].

use serde::{Deserialize, Serialize};

/// Number of laser trigger channels.
pub const NUM_LASERS: u32 = 8;
/// Number of TTL output channels.
pub const NUM_TTL: u32 = 4;
/// Number of servo output channels.
pub const NUM_SERVOS: u32 = 7;
/// Number of PWM output channels.
pub const NUM_PWM: u32 = 5;
/// Number of analog input channels.
pub const NUM_AI: u32 = 8;

/// Highest laser trigger mode value, see [`crate::signal::LaserTriggerMode`].
pub const MAX_MODE: i64 = 4;
/// Highest laser pulse duration in microseconds.
pub const MAX_DURATION: i64 = 1_048_575;
/// Highest 16-bit frame-skip sequence value.
pub const MAX_SEQUENCE: i64 = 65_535;
/// TTL outputs are digital LOW/HIGH.
pub const MAX_TTL: i64 = 1;
/// Highest servo position value.
pub const MAX_SERVO: i64 = 65_535;
/// Highest PWM duty-cycle value.
pub const MAX_PWM: i64 = 255;
/// Analog inputs map the 0-1 V range onto 16 bits.
pub const MAX_AI: i64 = 65_535;

/// The signal classes of the register map, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    LaserMode,
    LaserDuration,
    LaserSequence,
    Ttl,
    Servo,
    Pwm,
    SyncFlag,
    StartFlag,
    CameraPulse,
    CameraReadout,
    CameraExposure,
    LaserDelay,
    AnalogInput,
}

impl SignalKind {
    /// All signal classes in register-map declaration order.
    pub const DECLARATION_ORDER: [SignalKind; 13] = [
        SignalKind::LaserMode,
        SignalKind::LaserDuration,
        SignalKind::LaserSequence,
        SignalKind::Ttl,
        SignalKind::Servo,
        SignalKind::Pwm,
        SignalKind::SyncFlag,
        SignalKind::StartFlag,
        SignalKind::CameraPulse,
        SignalKind::CameraReadout,
        SignalKind::CameraExposure,
        SignalKind::LaserDelay,
        SignalKind::AnalogInput,
    ];

    /// Number of channels the firmware provides for this class.
    pub const fn capacity(self) -> u32 {
        match self {
            SignalKind::LaserMode | SignalKind::LaserDuration | SignalKind::LaserSequence => {
                NUM_LASERS
            }
            SignalKind::Ttl => NUM_TTL,
            SignalKind::Servo => NUM_SERVOS,
            SignalKind::Pwm => NUM_PWM,
            SignalKind::SyncFlag
            | SignalKind::StartFlag
            | SignalKind::CameraPulse
            | SignalKind::CameraReadout
            | SignalKind::CameraExposure
            | SignalKind::LaserDelay => 1,
            SignalKind::AnalogInput => NUM_AI,
        }
    }

    /// First register address of this class.
    ///
    /// Computed by summing the capacities of all classes declared before
    /// this one; the declaration order is fixed by the firmware.
    pub const fn base_address(self) -> u32 {
        let mut address = 0;
        let mut i = 0;
        while i < Self::DECLARATION_ORDER.len() {
            let kind = Self::DECLARATION_ORDER[i];
            if kind as u32 == self as u32 {
                return address;
            }
            address += kind.capacity();
            i += 1;
        }
        address
    }

    /// Highest allowed value for this class under the given camera
    /// generation. Bounds of the four camera timing registers depend on
    /// the generation; all other classes are generation-independent.
    pub const fn max_value(self, generation: CameraGeneration) -> i64 {
        match self {
            SignalKind::LaserMode => MAX_MODE,
            SignalKind::LaserDuration => MAX_DURATION,
            SignalKind::LaserSequence => MAX_SEQUENCE,
            SignalKind::Ttl => MAX_TTL,
            SignalKind::Servo => MAX_SERVO,
            SignalKind::Pwm => MAX_PWM,
            SignalKind::SyncFlag | SignalKind::StartFlag => 1,
            SignalKind::CameraPulse | SignalKind::CameraExposure => match generation {
                CameraGeneration::FireExposure => 1_048_575,
                CameraGeneration::Legacy => 65_535,
            },
            SignalKind::CameraReadout | SignalKind::LaserDelay => 65_535,
            SignalKind::AnalogInput => MAX_AI,
        }
    }

    /// True for input signals that reject writes.
    pub const fn is_read_only(self) -> bool {
        matches!(self, SignalKind::AnalogInput)
    }

    /// Human-readable class name used in errors and logs.
    pub const fn name(self) -> &'static str {
        match self {
            SignalKind::LaserMode => "laser mode",
            SignalKind::LaserDuration => "laser duration",
            SignalKind::LaserSequence => "laser sequence",
            SignalKind::Ttl => "TTL",
            SignalKind::Servo => "servo",
            SignalKind::Pwm => "PWM",
            SignalKind::SyncFlag => "sync mode",
            SignalKind::StartFlag => "camera start",
            SignalKind::CameraPulse => "camera pulse",
            SignalKind::CameraReadout => "camera read-out",
            SignalKind::CameraExposure => "camera exposure",
            SignalKind::LaserDelay => "laser delay",
            SignalKind::AnalogInput => "analog input",
        }
    }
}

/// The two camera timing generations.
///
/// Both generations use the same four registers, but disagree on their
/// meaning, bounds and millisecond scaling. A session uses exactly one
/// generation, selected at controller construction; the two are never
/// intermixed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraGeneration {
    /// Current firmware: the four registers hold fire pulse, read-out,
    /// exposure and laser delay, all in microseconds. The millisecond API
    /// scales by 1000.
    #[default]
    FireExposure,
    /// Older active-trigger firmware: the read-out register holds the
    /// trigger period instead, and timings are stored in tenths of a
    /// millisecond (hundredths for the delay). The millisecond API scales
    /// by 10, or 100 for the delay.
    Legacy,
}

impl CameraGeneration {
    /// Millisecond-to-register scale factor for the pulse, read-out and
    /// exposure registers.
    pub const fn timing_scale(self) -> f64 {
        match self {
            CameraGeneration::FireExposure => 1_000.0,
            CameraGeneration::Legacy => 10.0,
        }
    }

    /// Millisecond-to-register scale factor for the delay register.
    pub const fn delay_scale(self) -> f64 {
        match self {
            CameraGeneration::FireExposure => 1_000.0,
            CameraGeneration::Legacy => 100.0,
        }
    }

    /// Name of the read-out register slot under this generation.
    pub const fn readout_name(self) -> &'static str {
        match self {
            CameraGeneration::FireExposure => "read-out",
            CameraGeneration::Legacy => "period",
        }
    }
}

/// The known board identities, as reported by the board id register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardId {
    Au,
    AuPlus,
    Cu,
    Mojo,
}

impl BoardId {
    /// Board id register values for the four known boards.
    pub const ID_AU: u32 = 79;
    pub const ID_AU_PLUS: u32 = 80;
    pub const ID_CU: u32 = 29;
    pub const ID_MOJO: u32 = 12;

    /// Looks up a board from the raw id register value. Returns `None`
    /// for unknown boards, which are not supported by this driver.
    pub const fn from_id(id: u32) -> Option<BoardId> {
        match id {
            Self::ID_AU => Some(BoardId::Au),
            Self::ID_AU_PLUS => Some(BoardId::AuPlus),
            Self::ID_CU => Some(BoardId::Cu),
            Self::ID_MOJO => Some(BoardId::Mojo),
            _ => None,
        }
    }

    /// Human-readable board name.
    pub const fn name(self) -> &'static str {
        match self {
            BoardId::Au => "Au",
            BoardId::AuPlus => "Au+",
            BoardId::Cu => "Cu",
            BoardId::Mojo => "Mojo",
        }
    }

    /// True if the board wires up the analog input channels. The Cu has
    /// no analog front end.
    pub const fn supports_analog_inputs(self) -> bool {
        !matches!(self, BoardId::Cu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_addresses_follow_declaration_order() {
        assert_eq!(SignalKind::LaserMode.base_address(), 0);
        assert_eq!(SignalKind::LaserDuration.base_address(), 8);
        assert_eq!(SignalKind::LaserSequence.base_address(), 16);
        assert_eq!(SignalKind::Ttl.base_address(), 24);
        assert_eq!(SignalKind::Servo.base_address(), 28);
        assert_eq!(SignalKind::Pwm.base_address(), 35);
        assert_eq!(SignalKind::SyncFlag.base_address(), 40);
        assert_eq!(SignalKind::StartFlag.base_address(), 41);
        assert_eq!(SignalKind::CameraPulse.base_address(), 42);
        assert_eq!(SignalKind::CameraReadout.base_address(), 43);
        assert_eq!(SignalKind::CameraExposure.base_address(), 44);
        assert_eq!(SignalKind::LaserDelay.base_address(), 45);
        assert_eq!(SignalKind::AnalogInput.base_address(), 46);
    }

    #[test]
    fn channel_space_stays_clear_of_control_registers() {
        let last = SignalKind::AnalogInput.base_address() + SignalKind::AnalogInput.capacity();
        assert!(last < crate::protocol::ADDR_VERSION);
    }

    #[test]
    fn camera_bounds_depend_on_generation() {
        assert_eq!(
            SignalKind::CameraPulse.max_value(CameraGeneration::FireExposure),
            1_048_575
        );
        assert_eq!(
            SignalKind::CameraPulse.max_value(CameraGeneration::Legacy),
            65_535
        );
        assert_eq!(
            SignalKind::CameraExposure.max_value(CameraGeneration::Legacy),
            65_535
        );
        // Non-camera bounds are generation-independent.
        assert_eq!(
            SignalKind::Pwm.max_value(CameraGeneration::Legacy),
            SignalKind::Pwm.max_value(CameraGeneration::FireExposure)
        );
    }

    #[test]
    fn board_ids_round_trip() {
        for (id, board) in [
            (79, BoardId::Au),
            (80, BoardId::AuPlus),
            (29, BoardId::Cu),
            (12, BoardId::Mojo),
        ] {
            assert_eq!(BoardId::from_id(id), Some(board));
        }
        assert_eq!(BoardId::from_id(0), None);
        assert_eq!(BoardId::from_id(42), None);
    }

    #[test]
    fn cu_has_no_analog_inputs() {
        assert!(!BoardId::Cu.supports_analog_inputs());
        assert!(BoardId::Au.supports_analog_inputs());
        assert!(BoardId::AuPlus.supports_analog_inputs());
        assert!(BoardId::Mojo.supports_analog_inputs());
    }
}

//! Laser trigger composite.
//!
//! Each laser channel is driven by three registers: the trigger mode, the
//! pulse duration in microseconds, and a 16-bit frame-skip sequence. The
//! registers are independent on the device — there is no transactional
//! update — so a grouped write applies them in order and stops at the
//! first failure, leaving earlier registers applied. That partial
//! application is observable and intentional.

use log::warn;

use crate::error::FpgaResult;
use crate::regmap::{CameraGeneration, SignalKind};
use crate::signal::Signal;
use crate::transport::SharedLink;

/// Mode, duration and sequence registers of one laser channel.
pub struct LaserTrigger {
    channel: u32,
    mode: Signal,
    duration: Signal,
    sequence: Signal,
}

/// Snapshot of the three laser trigger parameters, in the order
/// `[mode, duration, sequence]`. Reads as `[-1, -1, -1]` while
/// disconnected.
pub type LaserState = [i64; 3];

impl LaserTrigger {
    pub fn new(channel: u32, generation: CameraGeneration, link: SharedLink) -> FpgaResult<Self> {
        Ok(Self {
            channel,
            mode: Signal::new(SignalKind::LaserMode, channel, generation, link.clone())?,
            duration: Signal::new(SignalKind::LaserDuration, channel, generation, link.clone())?,
            sequence: Signal::new(SignalKind::LaserSequence, channel, generation, link)?,
        })
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }

    /// Sets the trigger mode, from a raw integer or a
    /// [`crate::LaserTriggerMode`] value; both validate against the same
    /// bound.
    pub fn set_mode(&self, mode: impl Into<i64>) -> FpgaResult<bool> {
        self.mode.write(mode.into())
    }

    pub fn mode(&self) -> FpgaResult<i64> {
        self.mode.read()
    }

    /// Sets the trigger pulse duration in microseconds. The duration only
    /// shapes rising- and falling-edge triggers; the follow mode ignores
    /// it.
    pub fn set_duration(&self, duration_us: i64) -> FpgaResult<bool> {
        self.duration.write(duration_us)
    }

    pub fn duration(&self) -> FpgaResult<i64> {
        self.duration.read()
    }

    /// Sets the 16-bit frame-skip sequence, see
    /// [`crate::signal::format_sequence`].
    pub fn set_sequence(&self, sequence: i64) -> FpgaResult<bool> {
        self.sequence.write(sequence)
    }

    pub fn sequence(&self) -> FpgaResult<i64> {
        self.sequence.read()
    }

    /// Applies mode, duration and sequence in that order, short-circuiting
    /// on the first write that is not sent. Registers already written stay
    /// applied.
    pub fn set_state(
        &self,
        mode: impl Into<i64>,
        duration_us: i64,
        sequence: i64,
    ) -> FpgaResult<bool> {
        if !self.set_mode(mode)? {
            warn!("laser {}: could not set mode", self.channel);
            return Ok(false);
        }
        if !self.set_duration(duration_us)? {
            warn!("laser {}: could not set duration", self.channel);
            return Ok(false);
        }
        if !self.set_sequence(sequence)? {
            warn!("laser {}: could not set sequence", self.channel);
            return Ok(false);
        }
        Ok(true)
    }

    /// Reads all three parameters unconditionally, even mid-failure, and
    /// returns them as `[mode, duration, sequence]`.
    pub fn state(&self) -> FpgaResult<LaserState> {
        Ok([self.mode()?, self.duration()?, self.sequence()?])
    }
}

//! In-memory device emulator.
//!
//! [`MockFpga`] implements [`Transport`] as a register bank behind the real
//! wire protocol: incoming frames are parsed byte-for-byte, writes land in
//! the bank, reads queue a little-endian response. Tests and development
//! setups drive the full driver stack — controller, signals, codec —
//! without physical hardware.
//!
//! The handle is cheaply cloneable; all clones share one register bank, so
//! a test can keep a handle for inspection after moving another into the
//! controller.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{FpgaError, FpgaResult};
use crate::protocol::{
    ADDR_ID, ADDR_VERSION, PROTOCOL_VERSION, READ_REQUEST_LEN, WRITE_FLAG, WRITE_REQUEST_LEN,
};
use crate::regmap::BoardId;
use crate::transport::Transport;

struct MockState {
    registers: HashMap<u32, u32>,
    /// Request bytes not yet assembled into a full frame.
    inbound: Vec<u8>,
    /// Response bytes waiting to be read back.
    outbound: VecDeque<u8>,
    /// Every write frame applied, in arrival order.
    writes: Vec<(u32, u32)>,
    connected: bool,
    /// When set, the next read request produces no response, so the
    /// caller's read times out.
    swallow_next_response: bool,
}

/// Emulated device exposing the register protocol over [`Transport`].
#[derive(Clone)]
pub struct MockFpga {
    state: Arc<Mutex<MockState>>,
}

impl MockFpga {
    /// An emulated Au board running the accepted firmware version.
    pub fn new() -> Self {
        Self::with_identity(PROTOCOL_VERSION, BoardId::ID_AU)
    }

    /// An emulated board reporting the given firmware version and board
    /// id, for compatibility-handling tests.
    pub fn with_identity(version: u32, id: u32) -> Self {
        let mut registers = HashMap::new();
        registers.insert(ADDR_VERSION, version);
        registers.insert(ADDR_ID, id);
        Self {
            state: Arc::new(Mutex::new(MockState {
                registers,
                inbound: Vec::new(),
                outbound: VecDeque::new(),
                writes: Vec::new(),
                connected: true,
                swallow_next_response: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Current value of a register, if it was ever written or seeded.
    pub fn register(&self, address: u32) -> Option<u32> {
        self.lock().registers.get(&address).copied()
    }

    /// Seeds a register without going through the wire protocol.
    pub fn set_register(&self, address: u32, value: u32) {
        self.lock().registers.insert(address, value);
    }

    /// All write frames applied so far, in arrival order.
    pub fn writes(&self) -> Vec<(u32, u32)> {
        self.lock().writes.clone()
    }

    /// Simulates the device going away mid-session.
    pub fn disconnect(&self) {
        self.lock().connected = false;
    }

    /// True once the driver released the transport.
    pub fn is_closed(&self) -> bool {
        !self.lock().connected
    }

    /// Makes the next read request go unanswered.
    pub fn swallow_next_response(&self) {
        self.lock().swallow_next_response = true;
    }

    /// Parses complete frames out of the inbound buffer and applies them.
    fn pump(state: &mut MockState) {
        loop {
            let Some(&flag) = state.inbound.first() else {
                return;
            };
            let frame_len = if flag & WRITE_FLAG != 0 {
                WRITE_REQUEST_LEN
            } else {
                READ_REQUEST_LEN
            };
            if state.inbound.len() < frame_len {
                return;
            }
            let frame: Vec<u8> = state.inbound.drain(..frame_len).collect();
            let address = u32::from_le_bytes([frame[1], frame[2], frame[3], frame[4]]);
            if flag & WRITE_FLAG != 0 {
                let value = u32::from_le_bytes([frame[5], frame[6], frame[7], frame[8]]);
                state.registers.insert(address, value);
                state.writes.push((address, value));
            } else if state.swallow_next_response {
                state.swallow_next_response = false;
            } else {
                let value = state.registers.get(&address).copied().unwrap_or(0);
                state.outbound.extend(value.to_le_bytes());
            }
        }
    }
}

impl Default for MockFpga {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockFpga {
    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    fn write(&mut self, frame: &[u8]) -> FpgaResult<()> {
        let mut state = self.lock();
        if !state.connected {
            return Ok(());
        }
        state.inbound.extend_from_slice(frame);
        Self::pump(&mut state);
        Ok(())
    }

    fn read_exact(&mut self, n: usize) -> FpgaResult<Vec<u8>> {
        let mut state = self.lock();
        if state.outbound.len() < n {
            // A real serial port would block until its timeout here.
            return Err(FpgaError::Timeout);
        }
        Ok(state.outbound.drain(..n).collect())
    }

    fn close(&mut self) {
        self.lock().connected = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol;
    use crate::transport::RegisterLink;

    #[test]
    fn serves_reads_from_the_register_bank() {
        let mock = MockFpga::new();
        mock.set_register(17, 1234);

        let mut link = RegisterLink::new(Box::new(mock));
        assert_eq!(link.read(17).unwrap(), 1234);
        // Unwritten registers read as zero.
        assert_eq!(link.read(18).unwrap(), 0);
    }

    #[test]
    fn records_writes_in_order() {
        let mock = MockFpga::new();
        let mut link = RegisterLink::new(Box::new(mock.clone()));

        assert!(link.write(3, 7).unwrap());
        assert!(link.write(4, 9).unwrap());
        assert_eq!(mock.writes(), vec![(3, 7), (4, 9)]);
        assert_eq!(mock.register(3), Some(7));
    }

    #[test]
    fn reports_seeded_identity() {
        let mock = MockFpga::with_identity(2, 42);
        let mut link = RegisterLink::new(Box::new(mock));
        assert_eq!(link.read(protocol::ADDR_VERSION).unwrap(), 2);
        assert_eq!(link.read(protocol::ADDR_ID).unwrap(), 42);
    }

    #[test]
    fn swallowed_response_times_out() {
        let mock = MockFpga::new();
        mock.swallow_next_response();
        let mut link = RegisterLink::new(Box::new(mock));
        assert!(matches!(link.read(0), Err(FpgaError::Timeout)));
        // Only the one response is dropped.
        assert_eq!(link.read(0).unwrap(), 0);
    }

    #[test]
    fn disconnected_mock_degrades_to_sentinels() {
        let mock = MockFpga::new();
        mock.disconnect();
        let mut link = RegisterLink::new(Box::new(mock));
        assert!(!link.write(3, 7).unwrap());
        assert_eq!(link.read(3).unwrap(), -1);
    }
}

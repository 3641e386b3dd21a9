//! In-memory stand-ins for the bus, lines and timers.
//!
//! Every mock writes into a shared [`BusLog`] so tests can assert on the
//! exact order of level changes, bus writes and delays.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, OutputPin};
use embedded_hal::spi::{self, ErrorKind, Operation, SpiDevice};

use crate::config::BusConfig;
use crate::input::EdgeSource;
use crate::lcd::Command;
use crate::led::PwmLine;
use crate::platform::Platform;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Level(&'static str, bool),
    Write(Vec<u8>),
    DelayMs(u32),
}

/// A bus transfer as the panel sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transfer {
    Command(u8),
    Data(Vec<u8>),
}

#[derive(Default)]
struct LogState {
    events: Vec<Event>,
    fail_writes: bool,
}

/// Shared record of everything the mocks saw.
#[derive(Clone, Default)]
pub struct BusLog(Arc<Mutex<LogState>>);

impl BusLog {
    fn state(&self) -> MutexGuard<'_, LogState> {
        self.0.lock().unwrap()
    }

    fn push(&self, event: Event) {
        self.state().events.push(event);
    }

    fn events(&self) -> Vec<Event> {
        self.state().events.clone()
    }

    /// Makes every later bus write fail.
    pub fn fail_writes(&self) {
        self.state().fail_writes = true;
    }

    /// Writes tagged by the DC level in effect when they happened.
    fn writes(&self) -> Vec<(bool, Vec<u8>)> {
        let mut dc = false;
        let mut writes = Vec::new();
        for event in self.events() {
            match event {
                Event::Level("dc", high) => dc = high,
                Event::Write(bytes) => writes.push((dc, bytes)),
                _ => {}
            }
        }
        writes
    }

    /// Transfers with adjacent data writes merged.
    pub fn transfers(&self) -> Vec<Transfer> {
        let mut transfers = Vec::new();
        for (data, bytes) in self.writes() {
            if !data {
                transfers.extend(bytes.into_iter().map(Transfer::Command));
                continue;
            }
            match transfers.last_mut() {
                Some(Transfer::Data(previous)) => previous.extend(bytes),
                _ => transfers.push(Transfer::Data(bytes)),
            }
        }
        transfers
    }

    /// Individual data writes, unmerged.
    pub fn bursts(&self) -> Vec<Vec<u8>> {
        self.writes()
            .into_iter()
            .filter_map(|(data, bytes)| data.then_some(bytes))
            .collect()
    }

    pub fn data_bytes(&self) -> Vec<u8> {
        self.bursts().concat()
    }

    pub fn commands(&self) -> Vec<u8> {
        self.transfers()
            .into_iter()
            .filter_map(|t| match t {
                Transfer::Command(c) => Some(c),
                Transfer::Data(_) => None,
            })
            .collect()
    }

    /// Payload following the last memory write command.
    pub fn data_after_memory_write(&self) -> Vec<u8> {
        let transfers = self.transfers();
        let start = transfers
            .iter()
            .rposition(|t| *t == Transfer::Command(Command::MemoryWrite as u8))
            .map_or(transfers.len(), |i| i + 1);
        transfers[start..]
            .iter()
            .filter_map(|t| match t {
                Transfer::Data(bytes) => Some(bytes.as_slice()),
                Transfer::Command(_) => None,
            })
            .collect::<Vec<_>>()
            .concat()
    }

    pub fn delays_ms(&self) -> Vec<u32> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::DelayMs(ms) => Some(ms),
                _ => None,
            })
            .collect()
    }

    /// Levels driven on the named pin, in order.
    pub fn levels(&self, pin: &str) -> Vec<bool> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Level(name, high) if name == pin => Some(high),
                _ => None,
            })
            .collect()
    }
}

pub struct MockSpi {
    log: BusLog,
}

impl MockSpi {
    pub fn new(log: &BusLog) -> Self {
        Self { log: log.clone() }
    }
}

impl spi::ErrorType for MockSpi {
    type Error = ErrorKind;
}

impl SpiDevice for MockSpi {
    fn transaction(
        &mut self,
        operations: &mut [Operation<'_, u8>],
    ) -> std::result::Result<(), ErrorKind> {
        if self.log.state().fail_writes {
            return Err(ErrorKind::Other);
        }
        for operation in operations.iter() {
            if let Operation::Write(bytes) = operation {
                self.log.push(Event::Write(bytes.to_vec()));
            }
        }
        Ok(())
    }
}

pub struct MockPin {
    name: &'static str,
    log: BusLog,
}

impl MockPin {
    pub fn new(log: &BusLog, name: &'static str) -> Self {
        Self {
            name,
            log: log.clone(),
        }
    }

    pub fn dc(log: &BusLog) -> Self {
        Self::new(log, "dc")
    }

    pub fn reset(log: &BusLog) -> Self {
        Self::new(log, "reset")
    }
}

impl digital::ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> std::result::Result<(), Infallible> {
        self.log.push(Event::Level(self.name, false));
        Ok(())
    }

    fn set_high(&mut self) -> std::result::Result<(), Infallible> {
        self.log.push(Event::Level(self.name, true));
        Ok(())
    }
}

/// Records delays instead of sleeping.
pub struct MockDelay {
    log: BusLog,
}

impl MockDelay {
    pub fn new(log: &BusLog) -> Self {
        Self { log: log.clone() }
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.log.push(Event::DelayMs(ns / 1_000_000));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.log.push(Event::DelayMs(ms));
    }
}

#[derive(Debug, Default)]
struct PwmState {
    level: Option<bool>,
    frequency: Option<u32>,
    duty: Option<f32>,
    duties: Vec<f32>,
    running: bool,
    starts: usize,
    fail: bool,
}

/// PWM line whose clones share state, so tests keep a handle after moving
/// one into the driver.
#[derive(Debug, Clone, Default)]
pub struct MockPwm(Arc<Mutex<PwmState>>);

impl MockPwm {
    pub fn failing() -> Self {
        let pwm = Self::default();
        pwm.state().fail = true;
        pwm
    }

    fn state(&self) -> MutexGuard<'_, PwmState> {
        self.0.lock().unwrap()
    }

    pub fn level(&self) -> Option<bool> {
        self.state().level
    }

    pub fn frequency(&self) -> Option<u32> {
        self.state().frequency
    }

    pub fn duty(&self) -> Option<f32> {
        self.state().duty
    }

    /// Every duty cycle applied, in order.
    pub fn duties(&self) -> Vec<f32> {
        self.state().duties.clone()
    }

    pub fn running(&self) -> bool {
        self.state().running
    }

    pub fn starts(&self) -> usize {
        self.state().starts
    }
}

impl PwmLine for MockPwm {
    fn set_level(&mut self, high: bool) -> Result<()> {
        let mut state = self.state();
        state.running = false;
        state.level = Some(high);
        Ok(())
    }

    fn start_pwm(&mut self, frequency_hz: u32, duty_percent: f32) -> Result<()> {
        let mut state = self.state();
        if state.fail {
            return Err(Error::Pwm("mock carrier refused to start".to_string()));
        }
        state.running = true;
        state.starts += 1;
        state.frequency = Some(frequency_hz);
        state.duty = Some(duty_percent);
        state.duties.push(duty_percent);
        Ok(())
    }

    fn set_duty(&mut self, duty_percent: f32) -> Result<()> {
        let mut state = self.state();
        if !state.running {
            return Err(Error::Pwm("carrier not running".to_string()));
        }
        state.duty = Some(duty_percent);
        state.duties.push(duty_percent);
        Ok(())
    }

    fn stop_pwm(&mut self) {
        self.state().running = false;
    }
}

/// Receiving end of a mock button line.
pub struct MockEdges {
    edges: Receiver<bool>,
    level: Arc<AtomicBool>,
}

/// Test handle that moves a mock button line.
#[derive(Clone)]
pub struct MockLine {
    edges: Sender<bool>,
    level: Arc<AtomicBool>,
}

impl MockLine {
    pub fn set(&self, high: bool) {
        self.level.store(high, Ordering::SeqCst);
        let _ = self.edges.send(high);
    }
}

pub fn mock_button(high: bool) -> (MockEdges, MockLine) {
    let (tx, rx) = mpsc::channel();
    let level = Arc::new(AtomicBool::new(high));
    (
        MockEdges {
            edges: rx,
            level: level.clone(),
        },
        MockLine { edges: tx, level },
    )
}

impl EdgeSource for MockEdges {
    fn wait_edge(&mut self, timeout: Duration) -> Result<Option<bool>> {
        match self.edges.recv_timeout(timeout) {
            Ok(high) => Ok(Some(high)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                thread::sleep(timeout);
                Ok(None)
            }
        }
    }

    fn is_high(&mut self) -> Result<bool> {
        Ok(self.level.load(Ordering::SeqCst))
    }
}

/// Platform built entirely from mocks.
pub struct MockPlatform {
    pub log: BusLog,
    pub identity: Option<String>,
    pub sound_cards: Option<String>,
    pub fail_bus: bool,
    pub fail_lines: Vec<u32>,
    pub pwm: HashMap<u32, MockPwm>,
    pub edges: Option<MockEdges>,
    pub line: MockLine,
}

impl Default for MockPlatform {
    fn default() -> Self {
        let (edges, line) = mock_button(false);
        Self {
            log: BusLog::default(),
            identity: Some("Raspberry Pi 4 Model B Rev 1.4".to_string()),
            sound_cards: Some(" 0 [wm8960soundcard]: simple-card - wm8960-soundcard\n".to_string()),
            fail_bus: false,
            fail_lines: Vec::new(),
            pwm: HashMap::new(),
            edges: Some(edges),
            line,
        }
    }
}

impl MockPlatform {
    /// Handle to the PWM line the platform will hand out for `line`.
    pub fn pwm(&mut self, line: u32) -> MockPwm {
        self.pwm.entry(line).or_default().clone()
    }

    /// Handle that drives the button line.
    pub fn button(&self) -> MockLine {
        self.line.clone()
    }

    fn claim(&self, line: u32, label: &'static str) -> Result<()> {
        if self.fail_lines.contains(&line) {
            return Err(Error::PinClaimFailed {
                line,
                label,
                reason: "Device or resource busy".to_string(),
            });
        }
        Ok(())
    }
}

impl Platform for MockPlatform {
    type Spi = MockSpi;
    type Pin = MockPin;
    type Pwm = MockPwm;
    type Button = MockEdges;
    type Delay = MockDelay;

    fn open_bus(&mut self, bus: &BusConfig) -> Result<MockSpi> {
        if self.fail_bus {
            return Err(Error::TransportUnavailable(format!(
                "{}: No such file or directory",
                bus.device
            )));
        }
        Ok(MockSpi::new(&self.log))
    }

    fn output_pin(&mut self, line: u32, _high: bool, label: &'static str) -> Result<MockPin> {
        self.claim(line, label)?;
        Ok(MockPin::new(&self.log, label.trim_start_matches("whisplay-")))
    }

    fn pwm_line(&mut self, line: u32, label: &'static str) -> Result<MockPwm> {
        self.claim(line, label)?;
        Ok(self.pwm(line))
    }

    fn button_line(&mut self, line: u32, label: &'static str) -> Result<MockEdges> {
        self.claim(line, label)?;
        self.edges.take().ok_or_else(|| Error::PinClaimFailed {
            line,
            label,
            reason: "already claimed".to_string(),
        })
    }

    fn delay(&mut self) -> MockDelay {
        MockDelay::new(&self.log)
    }

    fn identity(&mut self) -> Option<String> {
        self.identity.clone()
    }

    fn sound_cards(&mut self) -> Option<String> {
        self.sound_cards.clone()
    }
}

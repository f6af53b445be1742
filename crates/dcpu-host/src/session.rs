use std::collections::HashSet;
use std::path::Path;

use dcpu_core::{Register, Word};
use dcpu_devices::{Device, DeviceBus, DeviceKind};
use dcpu_emu::{Cpu, Fault};

use crate::error::LoadError;

/// Why a [`Session::run`] call stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `BRK` executed; the step return value signalled it.
    Breakpoint,
    /// PC was about to fetch from an address in the watch set.
    WatchedAddress(Word),
    /// A step could not complete (bad decode, internal executor error).
    Fault(Fault),
    /// `max_steps` was reached without the program stopping itself.
    StepLimitReached,
}

/// The result of running a [`Session`] to a stopping point.
#[derive(Debug)]
pub struct RunOutcome {
    pub steps_executed: u64,
    pub reason: StopReason,
}

/// Thin driver around [`Cpu`]: loads a binary or assembles source into RAM,
/// steps it, and halts on `BRK`, a fault, or a host-set watched address —
/// the minimal surface a terminal front end needs. Equivalent to the
/// teacher's runner/test-runner pairing, without any windowing or audio.
pub struct Session {
    pub cpu: Cpu,
    watched_addresses: HashSet<Word>,
    trace: bool,
}

impl Session {
    pub fn new(devices: DeviceBus) -> Self {
        Self {
            cpu: Cpu::new(devices),
            watched_addresses: HashSet::new(),
            trace: false,
        }
    }

    /// A session with the canonical 20-device bus attached, the shape a
    /// CLI driver wants by default.
    pub fn standard() -> Self {
        Self::new(DeviceBus::standard())
    }

    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    pub fn watch_address(&mut self, addr: Word) {
        self.watched_addresses.insert(addr);
    }

    /// Populate RAM from a flat little-endian `.bin` file, starting at
    /// address 0.
    pub fn load_binary(&mut self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        self.cpu.load_binary(path)?;
        Ok(())
    }

    /// Assemble a `.asm` file (and anything it `.include`s) and load the
    /// resulting word stream into RAM starting at address 0.
    pub fn load_asm(&mut self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let words = dcpu_asm::assemble_file(path.as_ref())?;
        self.cpu.mem.load(&words);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.cpu.reset();
    }

    pub fn get_device_by_type(&mut self, kind: DeviceKind) -> Option<&mut Box<dyn Device>> {
        self.cpu.get_device_by_kind(kind)
    }

    pub fn get_all_by_type(&mut self, kind: DeviceKind) -> Vec<&mut Box<dyn Device>> {
        self.cpu.get_all_devices_by_kind(kind)
    }

    pub fn register(&self, reg: Register) -> Word {
        self.cpu.regs.get(reg)
    }

    pub fn memory_word(&self, addr: Word) -> Word {
        self.cpu.mem.read(addr)
    }

    /// Advance one instruction, printing a trace line first if tracing is
    /// enabled. Returns the PC the instruction was fetched from, whether it
    /// was `BRK`, and a fault if the step could not complete — the same
    /// triple `Cpu::step` returns, so callers that want raw access can
    /// still see everything a `run` loop would.
    pub fn step(&mut self) -> (Word, bool, Option<Fault>) {
        if self.trace {
            let pc = self.cpu.regs.get(Register::PC);
            let slice = self.cpu.mem.as_slice();
            if let Some(decoded) = dcpu_decoder::decode_one(slice, pc as usize, false) {
                println!(
                    "{pc:04x}: {}",
                    dcpu_decoder::render_instruction(&decoded.instruction)
                );
            }
        }
        self.cpu.step()
    }

    /// Step until `BRK`, a fault, a watched address is about to be
    /// fetched from, or `max_steps` steps have run (`None` for no limit).
    pub fn run(&mut self, max_steps: Option<u64>) -> RunOutcome {
        let mut steps_executed = 0u64;
        loop {
            let pc = self.cpu.regs.get(Register::PC);
            if steps_executed > 0 && self.watched_addresses.contains(&pc) {
                return RunOutcome {
                    steps_executed,
                    reason: StopReason::WatchedAddress(pc),
                };
            }

            let (_, break_hit, fault) = self.step();
            steps_executed += 1;

            if let Some(fault) = fault {
                return RunOutcome {
                    steps_executed,
                    reason: StopReason::Fault(fault),
                };
            }
            if break_hit {
                return RunOutcome {
                    steps_executed,
                    reason: StopReason::Breakpoint,
                };
            }
            if let Some(limit) = max_steps {
                if steps_executed >= limit {
                    return RunOutcome {
                        steps_executed,
                        reason: StopReason::StepLimitReached,
                    };
                }
            }
        }
    }
}

use dcpu_core::{Register, Word};

use crate::device::{Device, DeviceCpuView, DeviceKind};

/// Generic clock. `interval` is the configured period in 60ths of a
/// second; `tick` advances an internal counter by an externally-supplied
/// elapsed-tick count (the core has no wall-clock access per the
/// cycle-accurate-timing non-goal) and raises at most one coalesced
/// interrupt per call, regardless of how many periods were crossed.
pub struct Clock {
    interval: Word,
    elapsed_ticks: u32,
    periods_fired: u32,
    irq_enabled: bool,
    irq_code: Word,
    pending: bool,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            interval: 0,
            elapsed_ticks: 0,
            periods_fired: 0,
            irq_enabled: false,
            irq_code: 0,
            pending: false,
        }
    }

    /// Advance the clock by `elapsed_ticks` sixtieths of a second, as
    /// measured by the host driver between CPU steps.
    pub fn tick(&mut self, elapsed_ticks: u32) {
        if self.interval == 0 {
            return;
        }
        self.elapsed_ticks = self.elapsed_ticks.wrapping_add(elapsed_ticks);
        let periods_elapsed = self.elapsed_ticks / u32::from(self.interval);
        if self.irq_enabled && periods_elapsed > self.periods_fired {
            self.pending = true;
            self.periods_fired = periods_elapsed;
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for Clock {
    fn id(&self) -> u32 {
        0x12d0_b402
    }
    fn version(&self) -> u16 {
        0x0001
    }
    fn vendor(&self) -> u32 {
        0x5448_2b2b
    }
    fn kind(&self) -> DeviceKind {
        DeviceKind::Clock
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }

    fn handle_interrupt(&mut self, cpu: &mut DeviceCpuView<'_>) {
        match cpu.get(Register::A) {
            0 => {
                self.interval = cpu.get(Register::B);
                self.elapsed_ticks = 0;
                self.periods_fired = 0;
            }
            1 => {
                let elapsed = if self.interval == 0 {
                    0
                } else {
                    (self.elapsed_ticks / u32::from(self.interval)) as Word
                };
                cpu.set(Register::C, elapsed);
            }
            2 => {
                let message = cpu.get(Register::B);
                self.irq_code = message;
                self.irq_enabled = message != 0;
            }
            code => eprintln!("[clock] unexpected sub-function {code}"),
        }
    }

    fn poll_interrupt(&mut self) -> Option<Word> {
        if self.pending {
            self.pending = false;
            Some(self.irq_code)
        } else {
            None
        }
    }

    fn reset(&mut self) {
        *self = Clock::new();
    }
}

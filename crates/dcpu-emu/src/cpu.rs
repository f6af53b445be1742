use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::Path;

use dcpu_core::{Instruction, Memory, Mnemonic, Register, Registers, Word};
use dcpu_decoder::decode_one;
use dcpu_devices::{Device, DeviceBus, DeviceKind};

use crate::fault::Fault;
use crate::operand::{resolve_a, resolve_b, write_back, WriteTarget};

/// `value << shift`, zero for shift amounts that would panic Rust's
/// built-in shift operator (`shift >= 32`).
fn safe_shl_u32(value: u32, shift: u32) -> u32 {
    if shift >= 32 { 0 } else { value << shift }
}

/// `value >> shift`, zero for shift amounts that would panic Rust's
/// built-in shift operator (`shift >= 32`). DCPU-16 shift operands are
/// full words, so a shift of 40 is a valid (if unusual) instruction.
fn safe_shr_u32(value: u32, shift: u32) -> u32 {
    if shift >= 32 { 0 } else { value >> shift }
}

/// Signed counterpart of [`safe_shr_u32`], preserving sign on saturation.
fn safe_shr_i32(value: i32, shift: u32) -> i32 {
    if shift >= 32 {
        if value < 0 { -1 } else { 0 }
    } else {
        value >> shift
    }
}

/// The DCPU-16 CPU: register file, RAM, attached device bus, and the
/// interrupt-queueing state machine. Owns everything a `step()` touches;
/// external adapters reach peripherals through `devices`.
pub struct Cpu {
    pub regs: Registers,
    pub mem: Memory,
    pub devices: DeviceBus,
    interrupt_queue: VecDeque<Word>,
    queueing: bool,
    in_handler: bool,
}

impl Cpu {
    pub fn new(devices: DeviceBus) -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            devices,
            interrupt_queue: VecDeque::new(),
            queueing: false,
            in_handler: false,
        }
    }

    /// Zero registers and RAM, clear pending interrupts, and reset every
    /// attached device's internal state. SP lands at zero; the "one past
    /// top" behavior is a property of `PUSH`, not a distinct reset value.
    pub fn reset(&mut self) {
        self.regs.clear();
        self.mem.clear();
        self.interrupt_queue.clear();
        self.queueing = false;
        self.in_handler = false;
        self.devices.reset();
    }

    /// Populate RAM from a flat little-endian `.bin` file, starting at
    /// address 0.
    pub fn load_binary(&mut self, path: impl AsRef<Path>) -> io::Result<()> {
        let bytes = fs::read(path)?;
        let mut words = Vec::with_capacity(bytes.len().div_ceil(2));
        let mut chunks = bytes.chunks_exact(2);
        for chunk in &mut chunks {
            words.push(Word::from_le_bytes([chunk[0], chunk[1]]));
        }
        if let [last] = chunks.remainder() {
            words.push(Word::from(*last));
        }
        self.mem.load(&words);
        Ok(())
    }

    /// Queue a software interrupt, as `INT a` does. Delivery still waits
    /// on the usual conditions (no handler in flight, `IA != 0`, queueing
    /// not held open by `IAQ`).
    pub fn queue_interrupt(&mut self, message: Word) {
        self.interrupt_queue.push_back(message);
    }

    pub fn get_device_by_kind(&mut self, kind: DeviceKind) -> Option<&mut Box<dyn Device>> {
        self.devices.get_by_kind(kind)
    }

    pub fn get_all_devices_by_kind(&mut self, kind: DeviceKind) -> Vec<&mut Box<dyn Device>> {
        self.devices.get_all_by_kind(kind)
    }

    /// Advance one instruction. Returns the PC the instruction was fetched
    /// from, whether it was `BRK`, and a fault if the step could not
    /// complete.
    pub fn step(&mut self) -> (Word, bool, Option<Fault>) {
        self.dispatch_pending_interrupt();

        let pc = self.regs.get(Register::PC);
        let slice = self.mem.as_slice();
        let Some(decoded) = decode_one(slice, pc as usize, false) else {
            return (pc, false, Some(Fault::DecodeError));
        };
        let instruction = decoded.instruction;
        let next_pc = pc.wrapping_add(decoded.consumed);

        let outcome = self.execute(&instruction, next_pc);
        match outcome {
            Ok(break_hit) => (pc, break_hit, None),
            Err(fault) => (pc, false, Some(fault)),
        }
    }

    /// Service at most one pending interrupt: devices are scanned in bus
    /// order (first match wins) only when a handler could actually be
    /// entered, so an interrupt nobody can receive yet stays queued at its
    /// source instead of being silently dropped.
    fn dispatch_pending_interrupt(&mut self) {
        if self.in_handler || self.queueing {
            return;
        }
        let ia = self.regs.get(Register::IA);
        if ia == 0 {
            return;
        }

        let message = match self.interrupt_queue.pop_front() {
            Some(message) => Some(message),
            None => self.devices.poll_pending_irq().map(|(_, message)| message),
        };

        let Some(message) = message else { return };

        let sp = self.regs.get(Register::SP).wrapping_sub(1);
        self.mem.write(sp, self.regs.get(Register::PC));
        let sp = sp.wrapping_sub(1);
        self.mem.write(sp, self.regs.get(Register::A));
        self.regs.set(Register::SP, sp);
        self.regs.set(Register::A, message);
        self.regs.set(Register::PC, ia);
        self.in_handler = true;
    }

    /// Execute a decoded instruction. `next_pc` is where PC lands if the
    /// instruction doesn't redirect control flow itself.
    fn execute(&mut self, inst: &Instruction, next_pc: Word) -> Result<bool, Fault> {
        use Mnemonic::*;

        if inst.mnemonic.is_conditional() {
            return self.execute_conditional(inst, next_pc);
        }

        match inst.mnemonic {
            Set | Add | Sub | Mul | Mli | Div | Dvi | Mod | Mdi | And | Bor | Xor | Shr | Asr
            | Shl | Adx | Sbx | Sti | Sdi => {
                self.execute_basic(inst, next_pc)?;
                Ok(false)
            }
            Jsr => {
                let a = inst.operand_a.ok_or(Fault::DecodeError)?;
                let target = resolve_a(&mut self.regs, &self.mem, a);
                let sp = self.regs.get(Register::SP).wrapping_sub(1);
                self.mem.write(sp, next_pc);
                self.regs.set(Register::SP, sp);
                self.regs.set(Register::PC, target);
                Ok(false)
            }
            Int => {
                let a = inst.operand_a.ok_or(Fault::DecodeError)?;
                let message = resolve_a(&mut self.regs, &self.mem, a);
                self.queue_interrupt(message);
                self.regs.set(Register::PC, next_pc);
                Ok(false)
            }
            Iag => {
                let a = inst.operand_a.ok_or(Fault::DecodeError)?;
                self.store_special_a(a, self.regs.get(Register::IA));
                self.regs.set(Register::PC, next_pc);
                Ok(false)
            }
            Ias => {
                let a = inst.operand_a.ok_or(Fault::DecodeError)?;
                let value = resolve_a(&mut self.regs, &self.mem, a);
                self.regs.set(Register::IA, value);
                self.regs.set(Register::PC, next_pc);
                Ok(false)
            }
            Rfi => {
                let sp = self.regs.get(Register::SP);
                let a = self.mem.read(sp);
                let sp = sp.wrapping_add(1);
                let pc = self.mem.read(sp);
                let sp = sp.wrapping_add(1);
                self.regs.set(Register::SP, sp);
                self.regs.set(Register::A, a);
                self.regs.set(Register::PC, pc);
                self.in_handler = false;
                Ok(false)
            }
            Iaq => {
                let a = inst.operand_a.ok_or(Fault::DecodeError)?;
                let value = resolve_a(&mut self.regs, &self.mem, a);
                self.queueing = value != 0;
                self.regs.set(Register::PC, next_pc);
                Ok(false)
            }
            Hwn => {
                let a = inst.operand_a.ok_or(Fault::DecodeError)?;
                self.store_special_a(a, self.devices.count());
                self.regs.set(Register::PC, next_pc);
                Ok(false)
            }
            Hwq => {
                let a = inst.operand_a.ok_or(Fault::DecodeError)?;
                let index = resolve_a(&mut self.regs, &self.mem, a);
                self.devices.query(index as usize, &mut self.regs);
                self.regs.set(Register::PC, next_pc);
                Ok(false)
            }
            Hwi => {
                let a = inst.operand_a.ok_or(Fault::DecodeError)?;
                let index = resolve_a(&mut self.regs, &self.mem, a);
                self.devices
                    .interrupt(index as usize, &mut self.regs, &mut self.mem);
                self.regs.set(Register::PC, next_pc);
                Ok(false)
            }
            Brk => {
                if let Some(a) = inst.operand_a {
                    let _ = resolve_a(&mut self.regs, &self.mem, a);
                }
                self.regs.set(Register::PC, next_pc);
                Ok(true)
            }
            Dat => Err(Fault::UnknownMnemonic),
            _ => Err(Fault::UnknownMnemonic),
        }
    }

    /// Special-form instructions whose operand `a` is a write target
    /// (`IAG`, `HWN`) go through the same write targets as `b`-position
    /// operands in the basic form.
    fn store_special_a(&mut self, a: dcpu_core::Operand, value: Word) {
        let (_, target) = resolve_b(&mut self.regs, &self.mem, a);
        write_back(&mut self.regs, &mut self.mem, target, value);
    }

    fn execute_basic(&mut self, inst: &Instruction, next_pc: Word) -> Result<(), Fault> {
        use Mnemonic::*;

        let a = inst.operand_a.ok_or(Fault::DecodeError)?;
        let b = inst.operand_b.ok_or(Fault::DecodeError)?;

        // Operand a resolves first (its side effects, e.g. POP, happen
        // before b's), matching the decoder's fetch ordering.
        let value_a = resolve_a(&mut self.regs, &self.mem, a);
        let (value_b, target) = resolve_b(&mut self.regs, &self.mem, b);

        let ex = self.regs.get(Register::EX);
        let (result, new_ex): (Word, Option<Word>) = match inst.mnemonic {
            Set => (value_a, None),
            Add => {
                let sum = u32::from(value_b) + u32::from(value_a);
                (sum as Word, Some(if sum > 0xffff { 1 } else { 0 }))
            }
            Sub => {
                let diff = i32::from(value_b) - i32::from(value_a);
                (
                    diff as Word,
                    Some(if diff < 0 { 0xffff } else { 0 }),
                )
            }
            Mul => {
                let product = u32::from(value_b) * u32::from(value_a);
                (product as Word, Some((product >> 16) as Word))
            }
            Mli => {
                let product = i32::from(value_b as i16) * i32::from(value_a as i16);
                (product as Word, Some(((product as u32) >> 16) as Word))
            }
            Div => {
                if value_a == 0 {
                    (0, Some(0))
                } else {
                    let quotient = (u32::from(value_b) << 16) / u32::from(value_a);
                    (
                        (u32::from(value_b) / u32::from(value_a)) as Word,
                        Some(quotient as Word),
                    )
                }
            }
            Dvi => {
                if value_a == 0 {
                    (0, Some(0))
                } else {
                    let b = i32::from(value_b as i16);
                    let a = i32::from(value_a as i16);
                    let quotient = ((b << 16) / a) as u32;
                    ((b / a) as Word, Some(quotient as Word))
                }
            }
            Mod => {
                if value_a == 0 {
                    (0, None)
                } else {
                    (value_b % value_a, None)
                }
            }
            Mdi => {
                if value_a == 0 {
                    (0, None)
                } else {
                    let b = i32::from(value_b as i16);
                    let a = i32::from(value_a as i16);
                    ((b % a) as Word, None)
                }
            }
            And => (value_b & value_a, None),
            Bor => (value_b | value_a, None),
            Xor => (value_b ^ value_a, None),
            Shr => {
                // `value_a` is a full word, not bounded to 0..31, so every
                // shift goes through `safe_shr_u32` to avoid a shift-amount
                // panic. EX is the low 16 bits of `(b<<16)>>a` - truncated
                // for free by the `as Word` cast.
                let shift = u32::from(value_a);
                let b32 = u32::from(value_b);
                let result = safe_shr_u32(b32, shift) as Word;
                let ex = safe_shr_u32(b32 << 16, shift) as Word;
                (result, Some(ex))
            }
            Asr => {
                let shift = u32::from(value_a);
                let signed = i32::from(value_b as i16);
                let result = safe_shr_i32(signed, shift) as Word;
                let ex = safe_shr_u32(u32::from(value_b) << 16, shift) as Word;
                (result, Some(ex))
            }
            Shl => {
                let shift = u32::from(value_a);
                let wide = safe_shl_u32(u32::from(value_b), shift);
                (wide as Word, Some((wide >> 16) as Word))
            }
            Adx => {
                let sum = u32::from(value_b) + u32::from(value_a) + u32::from(ex);
                (sum as Word, Some(if sum > 0xffff { 1 } else { 0 }))
            }
            Sbx => {
                let diff = i64::from(value_b) - i64::from(value_a) + i64::from(ex as i16);
                let new_ex = if diff < 0 {
                    0xffff
                } else if diff > 0xffff {
                    1
                } else {
                    0
                };
                (diff as Word, Some(new_ex))
            }
            Sti => {
                let i = self.regs.get(Register::I).wrapping_add(1);
                let j = self.regs.get(Register::J).wrapping_add(1);
                self.regs.set(Register::I, i);
                self.regs.set(Register::J, j);
                (value_a, None)
            }
            Sdi => {
                let i = self.regs.get(Register::I).wrapping_sub(1);
                let j = self.regs.get(Register::J).wrapping_sub(1);
                self.regs.set(Register::I, i);
                self.regs.set(Register::J, j);
                (value_a, None)
            }
            _ => return Err(Fault::UnknownMnemonic),
        };

        write_back(&mut self.regs, &mut self.mem, target, result);
        if let Some(ex) = new_ex {
            self.regs.set(Register::EX, ex);
        }
        // A basic-form instruction whose destination is PC itself (`SET
        // PC, x`, `ADD PC, x`, ...) already redirected control flow via
        // `write_back`; advancing to `next_pc` here would clobber that
        // write and silently ignore the branch.
        if !matches!(target, WriteTarget::Register(Register::PC)) {
            self.regs.set(Register::PC, next_pc);
        }
        Ok(())
    }

    /// `IFx b, a`: evaluate the condition; if false, skip the next
    /// complete instruction (recursively through a chain of further
    /// `IFx`), then resume. The failing compare still resolves both
    /// operands (their side effects, e.g. a `POP`, still happen).
    fn execute_conditional(&mut self, inst: &Instruction, next_pc: Word) -> Result<bool, Fault> {
        use Mnemonic::*;

        let a = inst.operand_a.ok_or(Fault::DecodeError)?;
        let b = inst.operand_b.ok_or(Fault::DecodeError)?;
        let value_a = resolve_a(&mut self.regs, &self.mem, a);
        let (value_b, _) = resolve_b(&mut self.regs, &self.mem, b);

        let condition = match inst.mnemonic {
            Ifb => (value_b & value_a) != 0,
            Ifc => (value_b & value_a) == 0,
            Ife => value_b == value_a,
            Ifn => value_b != value_a,
            Ifg => value_b > value_a,
            Ifa => (value_b as i16) > (value_a as i16),
            Ifl => value_b < value_a,
            Ifu => (value_b as i16) < (value_a as i16),
            _ => return Err(Fault::UnknownMnemonic),
        };

        let mut pc = next_pc;
        if !condition {
            pc = self.skip_chain(pc)?;
        }
        self.regs.set(Register::PC, pc);
        Ok(false)
    }

    /// Skip one complete instruction at `pc`, continuing through however
    /// many further `IFx` instructions chain off it, per the DCPU-16's
    /// documented skip-chain rule.
    fn skip_chain(&self, pc: Word) -> Result<Word, Fault> {
        let mut pc = pc;
        loop {
            let slice = self.mem.as_slice();
            let Some(decoded) = decode_one(slice, pc as usize, false) else {
                return Err(Fault::DecodeError);
            };
            pc = pc.wrapping_add(decoded.consumed);
            if !decoded.instruction.mnemonic.is_conditional() {
                break;
            }
        }
        Ok(pc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcpu_decoder::encode_instruction;

    fn cpu() -> Cpu {
        Cpu::new(DeviceBus::empty())
    }

    fn assemble_word(mnemonic: Mnemonic, b: Option<dcpu_core::Operand>, a: dcpu_core::Operand) -> Vec<Word> {
        encode_instruction(&Instruction {
            raw_word: 0,
            mnemonic,
            operand_a: Some(a),
            operand_b: b,
        })
    }

    #[test]
    fn add_sets_overflow_on_carry() {
        let mut cpu = cpu();
        // ADD A, 1 with A already at 0xffff: op code 0x02, b=A(0x00), a=0x21 (literal 1)
        let words = assemble_word(
            Mnemonic::Add,
            Some(dcpu_core::Operand::new(0x00, None)),
            dcpu_core::Operand::new(0x22, None),
        );
        cpu.mem.load(&words);
        cpu.regs.set(Register::A, 0xffff);
        let (_, brk, fault) = cpu.step();
        assert!(fault.is_none());
        assert!(!brk);
        assert_eq!(cpu.regs.get(Register::A), 0);
        assert_eq!(cpu.regs.get(Register::EX), 1);
    }

    #[test]
    fn sub_sets_borrow() {
        let mut cpu = cpu();
        let words = assemble_word(
            Mnemonic::Sub,
            Some(dcpu_core::Operand::new(0x00, None)),
            dcpu_core::Operand::new(0x22, None), // literal 1
        );
        cpu.mem.load(&words);
        cpu.regs.set(Register::A, 0);
        cpu.step();
        assert_eq!(cpu.regs.get(Register::A), 0xffff);
        assert_eq!(cpu.regs.get(Register::EX), 0xffff);
    }

    #[test]
    fn div_by_zero_yields_zero_no_trap() {
        let mut cpu = cpu();
        let words = assemble_word(
            Mnemonic::Div,
            Some(dcpu_core::Operand::new(0x00, None)),
            dcpu_core::Operand::new(0x21, None), // literal 0
        );
        cpu.mem.load(&words);
        cpu.regs.set(Register::A, 7);
        let (_, _, fault) = cpu.step();
        assert!(fault.is_none());
        assert_eq!(cpu.regs.get(Register::A), 0);
        assert_eq!(cpu.regs.get(Register::EX), 0);
    }

    #[test]
    fn chained_ife_skips_two_instructions() {
        let mut cpu = cpu();
        let mut words = assemble_word(
            Mnemonic::Ife,
            Some(dcpu_core::Operand::new(0x00, None)),
            dcpu_core::Operand::new(0x22, None), // A == 1? (literal 1)
        );
        // Second IFE (also fails), then SET B,1, SET C,1
        words.extend(assemble_word(
            Mnemonic::Ife,
            Some(dcpu_core::Operand::new(0x00, None)),
            dcpu_core::Operand::new(0x22, None),
        ));
        words.extend(assemble_word(
            Mnemonic::Set,
            Some(dcpu_core::Operand::new(0x01, None)),
            dcpu_core::Operand::new(0x22, None),
        ));
        words.extend(assemble_word(
            Mnemonic::Set,
            Some(dcpu_core::Operand::new(0x02, None)),
            dcpu_core::Operand::new(0x22, None),
        ));
        cpu.mem.load(&words);
        cpu.regs.set(Register::A, 5); // A != 1, both IFEs fail -> chain skips both plus their targets
        cpu.step();
        assert_eq!(cpu.regs.get(Register::B), 0);
        assert_eq!(cpu.regs.get(Register::C), 0);
    }

    #[test]
    fn jsr_then_return_preserves_stack() {
        let mut cpu = cpu();
        // JSR 0x0003 ; BRK ; :0x0003 SET PC, POP
        let mut words = assemble_word(Mnemonic::Jsr, None, dcpu_core::Operand::new(0x1f, Some(3)));
        words.extend(assemble_word(
            Mnemonic::Brk,
            None,
            dcpu_core::Operand::new(0x00, None),
        ));
        words.extend(assemble_word(
            Mnemonic::Set,
            Some(dcpu_core::Operand::new(0x1c, None)), // PC
            dcpu_core::Operand::new(0x18, None),       // POP
        ));
        cpu.mem.load(&words);

        let initial_sp = cpu.regs.get(Register::SP);
        cpu.step(); // JSR
        cpu.step(); // SET PC, POP (returns to BRK at word 2)
        let (pc, brk, fault) = cpu.step();
        assert!(fault.is_none());
        assert!(brk);
        assert_eq!(pc, 2);
        assert_eq!(cpu.regs.get(Register::SP), initial_sp);
    }

    #[test]
    fn set_pc_to_a_literal_actually_redirects_control_flow() {
        let mut cpu = cpu();
        // SET PC, 0x0005 ; SET A, 1 (never reached) ; ... ; :0x0005 SET B, 9
        let mut words = assemble_word(
            Mnemonic::Set,
            Some(dcpu_core::Operand::new(0x1c, None)), // PC
            dcpu_core::Operand::new(0x1f, Some(5)),
        );
        words.extend(assemble_word(
            Mnemonic::Set,
            Some(dcpu_core::Operand::new(0x00, None)),
            dcpu_core::Operand::new(0x22, None), // literal 1
        ));
        words.resize(5, 0);
        words.extend(assemble_word(
            Mnemonic::Set,
            Some(dcpu_core::Operand::new(0x01, None)),
            dcpu_core::Operand::new(0x22 + 8, None), // literal 9
        ));
        cpu.mem.load(&words);

        cpu.step();
        assert_eq!(cpu.regs.get(Register::A), 0, "SET PC, x must not fall through to the next instruction");
        cpu.step();
        assert_eq!(cpu.regs.get(Register::B), 9);
    }

    #[test]
    fn hwn_reports_attached_device_count() {
        let mut cpu = Cpu::new(DeviceBus::standard());
        let words = assemble_word(Mnemonic::Hwn, None, dcpu_core::Operand::new(0x00, None));
        cpu.mem.load(&words);
        cpu.step();
        assert_eq!(cpu.regs.get(Register::A), 20);
    }

    #[test]
    fn unrecognized_word_traps_with_decode_error() {
        let mut cpu = cpu();
        cpu.mem.load(&[0x0000]); // special opcode 0, reserved
        let (_, _, fault) = cpu.step();
        assert_eq!(fault, Some(Fault::DecodeError));
    }
}

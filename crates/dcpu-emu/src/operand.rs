//! DCPU-16 operand resolution: turning a decoded [`Operand`] into a value
//! (and, for `b`-position operands, a place to write the result back to).

use dcpu_core::{Memory, Operand, Register, Registers, Word};

/// Where a `b`-position operand's result is written back to. Code 0x1f
/// (literal next-word) has no write target; the DCPU-16 spec requires
/// stores through it to be silently discarded rather than crash.
#[derive(Debug, Clone, Copy)]
pub enum WriteTarget {
    Register(Register),
    Memory(Word),
    Discard,
}

pub fn write_back(regs: &mut Registers, mem: &mut Memory, target: WriteTarget, value: Word) {
    match target {
        WriteTarget::Register(reg) => regs.set(reg, value),
        WriteTarget::Memory(addr) => mem.write(addr, value),
        WriteTarget::Discard => {}
    }
}

/// Resolve an `a`-position operand to its value, applying the side effect
/// of a `POP` (code 0x18 decrements SP after reading at the old top).
pub fn resolve_a(regs: &mut Registers, mem: &Memory, operand: Operand) -> Word {
    let code = operand.code;
    let nw = operand.next_word.unwrap_or(0);

    if code <= 0x07 {
        return regs.get(Register::from_general_index(code));
    }
    if (0x08..=0x0f).contains(&code) {
        let reg = Register::from_general_index(code - 0x08);
        return mem.read(regs.get(reg));
    }
    if (0x10..=0x17).contains(&code) {
        let reg = Register::from_general_index(code - 0x10);
        return mem.read(regs.get(reg).wrapping_add(nw));
    }

    match code {
        0x18 => {
            let sp = regs.get(Register::SP);
            let value = mem.read(sp);
            regs.set(Register::SP, sp.wrapping_add(1));
            value
        }
        0x19 => mem.read(regs.get(Register::SP)),
        0x1a => mem.read(regs.get(Register::SP).wrapping_add(nw)),
        0x1b => regs.get(Register::SP),
        0x1c => regs.get(Register::PC),
        0x1d => regs.get(Register::EX),
        0x1e => mem.read(nw),
        0x1f => nw,
        0x20..=0x3f => (i32::from(code) - 0x21) as Word,
        _ => 0,
    }
}

/// Resolve a `b`-position operand to its current value and its write
/// target. Code 0x18 (`PUSH` in this position) does *not* pop: it
/// decrements SP first and targets the fresh slot, per the spec's explicit
/// carve-out that `b`'s push/pop code means push, never pop.
pub fn resolve_b(regs: &mut Registers, mem: &Memory, operand: Operand) -> (Word, WriteTarget) {
    let code = operand.code;
    let nw = operand.next_word.unwrap_or(0);

    if code <= 0x07 {
        let reg = Register::from_general_index(code);
        return (regs.get(reg), WriteTarget::Register(reg));
    }
    if (0x08..=0x0f).contains(&code) {
        let reg = Register::from_general_index(code - 0x08);
        let addr = regs.get(reg);
        return (mem.read(addr), WriteTarget::Memory(addr));
    }
    if (0x10..=0x17).contains(&code) {
        let reg = Register::from_general_index(code - 0x10);
        let addr = regs.get(reg).wrapping_add(nw);
        return (mem.read(addr), WriteTarget::Memory(addr));
    }

    match code {
        0x18 => {
            let sp = regs.get(Register::SP).wrapping_sub(1);
            regs.set(Register::SP, sp);
            (0, WriteTarget::Memory(sp))
        }
        0x19 => {
            let addr = regs.get(Register::SP);
            (mem.read(addr), WriteTarget::Memory(addr))
        }
        0x1a => {
            let addr = regs.get(Register::SP).wrapping_add(nw);
            (mem.read(addr), WriteTarget::Memory(addr))
        }
        0x1b => (regs.get(Register::SP), WriteTarget::Register(Register::SP)),
        0x1c => (regs.get(Register::PC), WriteTarget::Register(Register::PC)),
        0x1d => (regs.get(Register::EX), WriteTarget::Register(Register::EX)),
        0x1e => {
            let addr = nw;
            (mem.read(addr), WriteTarget::Memory(addr))
        }
        0x1f => (nw, WriteTarget::Discard),
        _ => (0, WriteTarget::Discard),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcpu_core::Operand as Op;

    #[test]
    fn pop_via_operand_a_advances_sp() {
        let mut regs = Registers::new();
        let mut mem = Memory::new();
        regs.set(Register::SP, 0xfffe);
        mem.write(0xfffe, 0x1234);
        let value = resolve_a(&mut regs, &mem, Op::new(0x18, None));
        assert_eq!(value, 0x1234);
        assert_eq!(regs.get(Register::SP), 0xffff);
    }

    #[test]
    fn push_via_operand_b_decrements_sp_and_targets_fresh_slot() {
        let mut regs = Registers::new();
        let mem = Memory::new();
        regs.set(Register::SP, 0);
        let (value, target) = resolve_b(&mut regs, &mem, Op::new(0x18, None));
        assert_eq!(value, 0);
        assert_eq!(regs.get(Register::SP), 0xffff);
        match target {
            WriteTarget::Memory(addr) => assert_eq!(addr, 0xffff),
            _ => panic!("expected memory write target"),
        }
    }

    #[test]
    fn literal_write_target_discards() {
        let mut regs = Registers::new();
        let mut mem = Memory::new();
        write_back(&mut regs, &mut mem, WriteTarget::Discard, 0xffff);
        assert_eq!(mem.read(0), 0);
    }
}

use dcpu_core::{Instruction, Mnemonic, Operand, Register};

/// Render a decoded instruction as `"MNEMONIC B, A"` (`"MNEMONIC A"` for
/// special forms, or the raw data word for `DAT`), matching standard
/// DCPU-16 assembly syntax for memory indirections and register-plus-offset
/// operands.
pub fn render_instruction(inst: &Instruction) -> String {
    if inst.mnemonic == Mnemonic::Dat {
        return render_dat(inst.raw_word);
    }

    let mnemonic = inst.mnemonic.mnemonic_text();
    match (inst.operand_b, inst.operand_a) {
        (Some(b), Some(a)) => format!(
            "{mnemonic} {}, {}",
            render_operand(b, false),
            render_operand(a, true)
        ),
        (None, Some(a)) => format!("{mnemonic} {}", render_operand(a, true)),
        _ => mnemonic.to_string(),
    }
}

/// Render one operand. `is_a` distinguishes the 0x18 code, which means
/// `PUSH` as a destination (`b`) and `POP` as a source (`a`).
fn render_operand(operand: Operand, is_a: bool) -> String {
    let code = operand.code;
    let nw = operand.next_word;

    if let Some(reg) = general_register(code) {
        return register_name(reg).to_string();
    }
    if (0x08..=0x0f).contains(&code) {
        let reg = general_register(code - 0x08).unwrap();
        return format!("[{}]", register_name(reg));
    }
    if (0x10..=0x17).contains(&code) {
        let reg = general_register(code - 0x10).unwrap();
        return format!("[{} + 0x{:04x}]", register_name(reg), nw.unwrap_or(0));
    }
    match code {
        0x18 => (if is_a { "POP" } else { "PUSH" }).to_string(),
        0x19 => "PEEK".to_string(),
        0x1a => format!("[SP + 0x{:04x}]", nw.unwrap_or(0)),
        0x1b => "SP".to_string(),
        0x1c => "PC".to_string(),
        0x1d => "EX".to_string(),
        0x1e => format!("[0x{:04x}]", nw.unwrap_or(0)),
        0x1f => format!("0x{:04x}", nw.unwrap_or(0)),
        0x20..=0x3f => format!("{}", code as i16 - 0x21),
        _ => format!("<bad operand 0x{code:02x}>"),
    }
}

fn general_register(code: u8) -> Option<Register> {
    if code <= 0x07 {
        Some(Register::from_general_index(code))
    } else {
        None
    }
}

fn register_name(reg: Register) -> &'static str {
    match reg {
        Register::A => "A",
        Register::B => "B",
        Register::C => "C",
        Register::X => "X",
        Register::Y => "Y",
        Register::Z => "Z",
        Register::I => "I",
        Register::J => "J",
        Register::SP => "SP",
        Register::PC => "PC",
        Register::EX => "EX",
        Register::IA => "IA",
    }
}

/// An opaque data word is rendered as its printable character when it
/// falls in the printable ASCII range, otherwise as hex, matching the
/// original devkit's disassembler.
fn render_dat(word: dcpu_core::Word) -> String {
    if (32..=126).contains(&word) {
        format!("DAT '{}'", word as u8 as char)
    } else {
        format!("DAT 0x{word:04x}")
    }
}

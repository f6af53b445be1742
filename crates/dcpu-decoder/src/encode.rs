use dcpu_core::{Instruction, Mnemonic, Word};

/// Encode a decoded instruction back into its word stream, matching the
/// invariant `encode(decode(w)) == w` for any valid instruction word (plus
/// whatever next-words it carried).
///
/// Word order is opcode, then operand A's next-word (if any), then operand
/// B's next-word (if any) - the same order the decoder reads them in.
pub fn encode_instruction(inst: &Instruction) -> Vec<Word> {
    if inst.mnemonic == Mnemonic::Dat {
        return vec![inst.raw_word];
    }

    let mut code = 0u16;
    if let Some(opcode) = inst.mnemonic.basic_opcode() {
        let operand_b = inst.operand_b.expect("basic instruction missing operand b");
        code |= u16::from(opcode);
        code |= u16::from(operand_b.code) << 5;
        code |= u16::from(inst.operand_a.unwrap().code) << 10;
    } else if let Some(opcode) = inst.mnemonic.special_opcode() {
        code |= u16::from(opcode) << 5;
        code |= u16::from(inst.operand_a.unwrap().code) << 10;
    }

    let mut words = vec![code];
    if let Some(word) = inst.operand_a.and_then(|o| o.next_word) {
        words.push(word);
    }
    if let Some(word) = inst.operand_b.and_then(|o| o.next_word) {
        words.push(word);
    }
    words
}

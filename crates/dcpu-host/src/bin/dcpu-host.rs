//! CLI front end for the DCPU-16 kit: load a `.bin` image or `.asm`
//! source file, run it, and print the final register state.
//!
//! Usage: dcpu-host [--trace] [--watch 0xADDR] [--max-steps N] <program>
//!
//! `.asm` files are assembled first (following any `.include`s relative
//! to the file); anything else is loaded as a flat little-endian word
//! stream, matching the kit's binary format.

use dcpu_core::Register;
use dcpu_host::{Session, StopReason};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut trace = false;
    let mut max_steps = None;
    let mut watches = Vec::new();
    let mut program_path = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--trace" | "-t" => trace = true,
            "--watch" | "-w" => {
                i += 1;
                let Some(raw) = args.get(i) else {
                    eprintln!("--watch requires an address argument");
                    std::process::exit(1);
                };
                match parse_address(raw) {
                    Some(addr) => watches.push(addr),
                    None => {
                        eprintln!("not a valid address: `{raw}`");
                        std::process::exit(1);
                    }
                }
            }
            "--max-steps" | "-n" => {
                i += 1;
                let Some(raw) = args.get(i) else {
                    eprintln!("--max-steps requires a count argument");
                    std::process::exit(1);
                };
                match raw.parse::<u64>() {
                    Ok(n) => max_steps = Some(n),
                    Err(_) => {
                        eprintln!("not a valid step count: `{raw}`");
                        std::process::exit(1);
                    }
                }
            }
            other if program_path.is_none() => program_path = Some(other.to_string()),
            other => {
                eprintln!("unexpected argument: `{other}`");
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(program_path) = program_path else {
        eprintln!("Usage: dcpu-host [--trace] [--watch 0xADDR] [--max-steps N] <program.bin|program.asm>");
        std::process::exit(1);
    };

    let mut session = Session::standard();
    session.set_trace(trace);
    for addr in watches {
        session.watch_address(addr);
    }

    let is_asm = program_path.ends_with(".asm");
    let load_result = if is_asm {
        session.load_asm(&program_path)
    } else {
        session.load_binary(&program_path)
    };

    if let Err(err) = load_result {
        eprintln!("failed to load `{program_path}`: {err}");
        std::process::exit(1);
    }

    println!("loaded {program_path}");
    let outcome = session.run(max_steps);
    println!("stopped after {} step(s): {:?}", outcome.steps_executed, outcome.reason);
    print_registers(&session);

    if matches!(outcome.reason, StopReason::Fault(_)) {
        std::process::exit(1);
    }
}

fn print_registers(session: &Session) {
    println!(
        "A={:04x} B={:04x} C={:04x} X={:04x} Y={:04x} Z={:04x} I={:04x} J={:04x}",
        session.register(Register::A),
        session.register(Register::B),
        session.register(Register::C),
        session.register(Register::X),
        session.register(Register::Y),
        session.register(Register::Z),
        session.register(Register::I),
        session.register(Register::J),
    );
    println!(
        "SP={:04x} PC={:04x} EX={:04x} IA={:04x}",
        session.register(Register::SP),
        session.register(Register::PC),
        session.register(Register::EX),
        session.register(Register::IA),
    );
}

fn parse_address(text: &str) -> Option<u16> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}

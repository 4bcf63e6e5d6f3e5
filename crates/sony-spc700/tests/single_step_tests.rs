//! Single-step vectors: initial state, final state and the exact bus
//! activity of every cycle, one instruction per case.
//!
//! Test data lives in `tests/data/spc700_single_step.json`.

use emu_core::{Bus, Cpu, SimpleBus};
use serde::Deserialize;
use sony_spc700::{InstructionTable, Spc700, Status, Verifier, VerifyTarget};
use std::fs;
use std::path::Path;

/// JSON test case format.
#[derive(Deserialize)]
struct TestCase {
    name: String,
    initial: CpuState,
    #[serde(rename = "final")]
    final_state: CpuState,
    /// `(address, data, kind)` per cycle; idle cycles carry no address.
    cycles: Vec<(Option<u16>, Option<u8>, String)>,
}

/// JSON CPU state format.
#[derive(Deserialize)]
struct CpuState {
    pc: u16,
    sp: u8,
    a: u8,
    x: u8,
    y: u8,
    psw: u8,
    ram: Vec<(u16, u8)>,
}

fn load_cases() -> Vec<TestCase> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/spc700_single_step.json");
    let data = fs::read_to_string(&path).unwrap_or_else(|e| {
        panic!("Failed to read {}: {e}", path.display());
    });
    serde_json::from_str(&data).unwrap_or_else(|e| {
        panic!("Failed to parse {}: {e}", path.display());
    })
}

/// Set up the CPU and bus from the initial test state.
fn setup(state: &CpuState) -> (Spc700, SimpleBus) {
    let mut bus = SimpleBus::new();
    for &(addr, value) in &state.ram {
        bus.write(addr, value);
    }
    let mut cpu = Spc700::new(InstructionTable::standard().expect("standard table"));
    cpu.regs.sp = state.sp;
    cpu.regs.a = state.a;
    cpu.regs.x = state.x;
    cpu.regs.y = state.y;
    cpu.regs.psw = Status(state.psw);
    cpu.set_pc(state.pc);
    (cpu, bus)
}

/// Compare the CPU/bus state against expected, returning a list of mismatches.
fn compare(cpu: &Spc700, bus: &SimpleBus, expected: &CpuState) -> Vec<String> {
    let mut errors = Vec::new();
    let regs = cpu.regs;

    if regs.pc != expected.pc {
        errors.push(format!(
            "PC: got ${:04X}, want ${:04X}",
            regs.pc, expected.pc
        ));
    }
    for (name, got, want) in [
        ("SP", regs.sp, expected.sp),
        ("A", regs.a, expected.a),
        ("X", regs.x, expected.x),
        ("Y", regs.y, expected.y),
    ] {
        if got != want {
            errors.push(format!("{name}: got ${got:02X}, want ${want:02X}"));
        }
    }
    if regs.psw.0 != expected.psw {
        errors.push(format!(
            "PSW: got {}, want {}",
            regs.psw,
            Status(expected.psw)
        ));
    }
    for &(addr, want) in &expected.ram {
        let got = bus.peek(addr);
        if got != want {
            errors.push(format!(
                "RAM[${addr:04X}]: got ${got:02X}, want ${want:02X}"
            ));
        }
    }

    errors
}

/// Run one case, checking bus activity cycle by cycle.
fn run_case(test: &TestCase) -> Vec<String> {
    let (mut cpu, mut bus) = setup(&test.initial);
    let mut errors = Vec::new();

    for (i, (address, data, kind)) in test.cycles.iter().enumerate() {
        cpu.tick(&mut bus);
        let Some(record) = cpu.last_cycle().copied() else {
            errors.push(format!("cycle {}: no record", i + 1));
            break;
        };
        let pins = record.pins;
        let got = match kind.as_str() {
            "read" if pins.is_read() => Some((pins.address, record.data_in)),
            "write" if pins.is_write() => Some((pins.address, pins.data_out)),
            "idle" if !pins.enable => None,
            _ => {
                errors.push(format!("cycle {}: want {kind}, got {pins:?}", i + 1));
                continue;
            }
        };
        let want = address.zip(*data);
        if got != want {
            errors.push(format!("cycle {}: got {got:X?}, want {want:X?}", i + 1));
        }
    }
    if !cpu.is_instruction_complete() {
        errors.push(format!(
            "still in cycle {} after the last listed cycle",
            cpu.cycle()
        ));
    }

    errors.extend(compare(&cpu, &bus, &test.final_state));
    errors
}

#[test]
fn single_step_vectors() {
    let tests = load_cases();
    assert!(!tests.is_empty());

    let mut failures = Vec::new();
    for test in &tests {
        let errors = run_case(test);
        if !errors.is_empty() {
            failures.push(format!("  FAIL [{}]: {}", test.name, errors.join(", ")));
        }
    }

    assert!(
        failures.is_empty(),
        "{} of {} failed:\n{}",
        failures.len(),
        tests.len(),
        failures.join("\n")
    );
}

#[test]
fn single_step_vectors_meet_contracts() {
    for test in &load_cases() {
        let (mut cpu, mut bus) = setup(&test.initial);
        let mut verifier = Verifier::new(VerifyTarget::All);

        // The verdict arrives with the next opcode fetch.
        let verdicts = verifier
            .run(&mut cpu, &mut bus, 1, test.cycles.len() as u64 + 1)
            .unwrap_or_else(|v| panic!("[{}] {v}", test.name));

        let cycles = usize::from(verdicts[0].cycles);
        assert_eq!(cycles, test.cycles.len(), "[{}]", test.name);
    }
}

#[test]
fn single_step_vectors_list_declared_cycles() {
    let table = InstructionTable::standard().expect("standard table");
    for test in &load_cases() {
        let pc = test.initial.pc;
        let opcode = test
            .initial
            .ram
            .iter()
            .find_map(|&(addr, value)| (addr == pc).then_some(value))
            .unwrap_or_else(|| panic!("[{}] no opcode at ${pc:04X}", test.name));
        let declared = table.get(opcode).map(|i| usize::from(i.cycles));
        assert_eq!(declared, Some(test.cycles.len()), "[{}]", test.name);
    }
}

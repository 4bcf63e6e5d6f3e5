//! Instruction scenarios run through the full core.
//!
//! Programs are loaded at $0200 and driven with `step()`; bus activity is
//! collected from the per-cycle records.

use emu_core::{Bus, Cpu, SimpleBus};
use sony_spc700::flags::{C, H, N, V, Z};
use sony_spc700::{
    CycleRecord, Evidence, Instruction, InstructionTable, Spc700, Status, Step, Verifier,
    VerifyTarget, Violation,
};

fn setup(program: &[u8]) -> (Spc700, SimpleBus) {
    let mut bus = SimpleBus::new();
    bus.load(0x0200, program);
    let mut cpu = Spc700::new(InstructionTable::standard().expect("standard table"));
    cpu.regs.sp = 0xEF;
    cpu.set_pc(0x0200);
    (cpu, bus)
}

/// Run one instruction, returning every cycle it executed.
fn run_instruction(cpu: &mut Spc700, bus: &mut impl Bus) -> Vec<CycleRecord> {
    let mut records = Vec::new();
    loop {
        cpu.tick(bus);
        records.extend(cpu.last_cycle().copied());
        if cpu.is_instruction_complete() || records.len() > 64 {
            return records;
        }
    }
}

fn reads(records: &[CycleRecord]) -> Vec<u16> {
    records
        .iter()
        .filter(|r| r.pins.is_read())
        .map(|r| r.pins.address)
        .collect()
}

fn writes(records: &[CycleRecord]) -> Vec<(u16, u8)> {
    records
        .iter()
        .filter(|r| r.pins.is_write())
        .map(|r| (r.pins.address, r.pins.data_out))
        .collect()
}

#[test]
fn test_jmp_abs() {
    let (mut cpu, mut bus) = setup(&[0x5F, 0x34, 0x12]); // JMP !$1234
    cpu.regs.a = 0x11;
    cpu.regs.x = 0x22;
    cpu.regs.y = 0x33;
    cpu.regs.psw = Status(N | C);
    let before = cpu.regs;

    let records = run_instruction(&mut cpu, &mut bus);

    assert_eq!(records.len(), 3);
    assert_eq!(reads(&records), [0x0200, 0x0201, 0x0202]);
    assert_eq!(cpu.pc(), 0x1234);
    assert_eq!(cpu.pins().address, 0x1234);
    assert!(writes(&records).is_empty());
    assert_eq!(cpu.regs.psw, before.psw);
    assert_eq!(cpu.regs.a, 0x11);
    assert_eq!(cpu.regs.x, 0x22);
    assert_eq!(cpu.regs.y, 0x33);
    assert_eq!(cpu.regs.sp, before.sp);
}

#[test]
fn test_mul_small_product() {
    let (mut cpu, mut bus) = setup(&[0xCF]); // MUL YA
    cpu.regs.y = 5;
    cpu.regs.a = 6;

    let records = run_instruction(&mut cpu, &mut bus);

    assert_eq!(records.len(), 10);
    assert_eq!(reads(&records), [0x0200]);
    assert_eq!(cpu.regs.a, 0x1E);
    assert_eq!(cpu.regs.y, 0x00);
    assert!(cpu.regs.psw.is_set(Z));
    assert!(!cpu.regs.psw.is_set(N));
    assert_eq!(cpu.pc(), 0x0201);
}

#[test]
fn test_mul_large_product() {
    let (mut cpu, mut bus) = setup(&[0xCF]);
    cpu.regs.y = 0xFF;
    cpu.regs.a = 0xFF;

    cpu.step(&mut bus);

    assert_eq!(cpu.regs.ya(), 0xFE01);
    assert!(cpu.regs.psw.is_set(N));
    assert!(!cpu.regs.psw.is_set(Z));
}

#[test]
fn test_div() {
    let (mut cpu, mut bus) = setup(&[0x9E]); // DIV YA,X
    cpu.regs.set_ya(0x1234);
    cpu.regs.x = 0x10;

    assert_eq!(cpu.step(&mut bus), 12);

    assert_eq!(cpu.regs.a, 0x23);
    assert_eq!(cpu.regs.y, 0x04);
    assert!(cpu.regs.psw.is_set(V));
    assert!(cpu.regs.psw.is_set(H));
    assert!(!cpu.regs.psw.is_set(Z));
}

#[test]
fn test_div_exact() {
    let (mut cpu, mut bus) = setup(&[0x9E]);
    cpu.regs.set_ya(1000);
    cpu.regs.x = 10;

    cpu.step(&mut bus);

    assert_eq!(cpu.regs.a, 100);
    assert_eq!(cpu.regs.y, 0);
    assert!(!cpu.regs.psw.is_set(V));
}

#[test]
fn test_mov_a_abs_zero() {
    let (mut cpu, mut bus) = setup(&[0xE5, 0x00, 0x30]); // MOV A,!$3000
    cpu.regs.a = 0x55;

    let records = run_instruction(&mut cpu, &mut bus);

    assert_eq!(records.len(), 4);
    assert_eq!(reads(&records), [0x0200, 0x0201, 0x0202, 0x3000]);
    assert!(writes(&records).is_empty());
    assert_eq!(cpu.regs.a, 0x00);
    assert!(cpu.regs.psw.is_set(Z));
    assert_eq!(cpu.pc(), 0x0203);
}

#[test]
fn test_mov_abs_a() {
    let (mut cpu, mut bus) = setup(&[0xC5, 0x00, 0x40]); // MOV !$4000,A
    cpu.regs.a = 0x77;
    cpu.regs.psw = Status(Z);

    let records = run_instruction(&mut cpu, &mut bus);

    assert_eq!(records.len(), 5);
    assert_eq!(reads(&records), [0x0200, 0x0201, 0x0202]);
    assert_eq!(writes(&records), [(0x4000, 0x77)]);
    assert_eq!(bus.peek(0x4000), 0x77);
    assert_eq!(cpu.regs.psw, Status(Z));
}

#[test]
fn test_adc_abs_carry_out() {
    let (mut cpu, mut bus) = setup(&[0x85, 0x00, 0x30]); // ADC A,!$3000
    bus.poke(0x3000, 0x01);
    cpu.regs.a = 0xFF;

    cpu.step(&mut bus);

    assert_eq!(cpu.regs.a, 0x00);
    assert!(cpu.regs.psw.is_set(C));
    assert!(cpu.regs.psw.is_set(Z));
    assert!(cpu.regs.psw.is_set(H));
}

#[test]
fn test_cmp_x_borrow() {
    let (mut cpu, mut bus) = setup(&[0x1E, 0x00, 0x30]); // CMP X,!$3000
    bus.poke(0x3000, 0x20);
    cpu.regs.x = 0x10;
    cpu.regs.psw = Status(C);

    cpu.step(&mut bus);

    assert_eq!(cpu.regs.x, 0x10);
    assert!(!cpu.regs.psw.is_set(C));
    assert!(cpu.regs.psw.is_set(N));
}

#[test]
fn test_inc_abs_wraps() {
    let (mut cpu, mut bus) = setup(&[0xAC, 0x00, 0x40]); // INC !$4000
    bus.poke(0x4000, 0xFF);

    let records = run_instruction(&mut cpu, &mut bus);

    assert_eq!(records.len(), 5);
    assert_eq!(reads(&records), [0x0200, 0x0201, 0x0202, 0x4000]);
    assert_eq!(writes(&records), [(0x4000, 0x00)]);
    assert!(cpu.regs.psw.is_set(Z));
}

#[test]
fn test_ror_abs_uses_carry() {
    let (mut cpu, mut bus) = setup(&[0x6C, 0x00, 0x40]); // ROR !$4000
    bus.poke(0x4000, 0x01);
    cpu.regs.psw = Status(C);

    cpu.step(&mut bus);

    assert_eq!(bus.peek(0x4000), 0x80);
    assert!(cpu.regs.psw.is_set(C));
    assert!(cpu.regs.psw.is_set(N));
}

#[test]
fn test_call_and_ret() {
    let (mut cpu, mut bus) = setup(&[0x3F, 0x00, 0x03]); // CALL !$0300
    bus.load(0x0300, &[0x6F]); // RET

    let call = run_instruction(&mut cpu, &mut bus);
    assert_eq!(call.len(), 8);
    assert_eq!(writes(&call), [(0x01EF, 0x02), (0x01EE, 0x03)]);
    assert_eq!(cpu.pc(), 0x0300);
    assert_eq!(cpu.regs.sp, 0xED);

    let ret = run_instruction(&mut cpu, &mut bus);
    assert_eq!(ret.len(), 5);
    assert_eq!(reads(&ret), [0x0300, 0x01EE, 0x01EF]);
    assert_eq!(cpu.pc(), 0x0203);
    assert_eq!(cpu.regs.sp, 0xEF);
}

#[test]
fn test_xcn_and_decimal_adjust() {
    let (mut cpu, mut bus) = setup(&[0x9F, 0xDF]); // XCN A; DAA A
    cpu.regs.a = 0x1A;

    assert_eq!(cpu.step(&mut bus), 5);
    assert_eq!(cpu.regs.a, 0xA1);

    // 0xA1 > 0x99: +0x60, low nibble fine.
    assert_eq!(cpu.step(&mut bus), 3);
    assert_eq!(cpu.regs.a, 0x01);
    assert!(cpu.regs.psw.is_set(C));
}

#[test]
fn test_unregistered_opcodes_resync() {
    let mut bus = SimpleBus::with_fill(0xFF);
    let mut cpu = Spc700::new(InstructionTable::standard().expect("standard table"));
    cpu.set_pc(0x8000);

    for i in 1..=4u16 {
        cpu.tick(&mut bus);
        assert!(cpu.is_instruction_complete());
        assert_eq!(cpu.pc(), 0x8000 + i);
    }
}

#[test]
fn test_verifier_checks_every_instruction() {
    let mut bus = SimpleBus::new();
    let main = [
        0xE5, 0x00, 0x30, // MOV A,!$3000
        0x85, 0x01, 0x30, // ADC A,!$3001
        0xC5, 0x02, 0x30, // MOV !$3002,A
        0x0C, 0x02, 0x30, // ASL !$3002
        0x3F, 0x00, 0x03, // CALL !$0300
        0x5F, 0x00, 0x02, // JMP !$0200
    ];
    let routine = [
        0x9F, // XCN A
        0xDF, // DAA A
        0xBE, // DAS A
        0xCF, // MUL YA
        0x9E, // DIV YA,X
        0x05, 0x00, 0x30, // OR A,!$3000
        0x25, 0x01, 0x30, // AND A,!$3001
        0x45, 0x02, 0x30, // EOR A,!$3002
        0xA5, 0x03, 0x30, // SBC A,!$3003
        0x65, 0x00, 0x30, // CMP A,!$3000
        0x1E, 0x01, 0x30, // CMP X,!$3001
        0x5E, 0x02, 0x30, // CMP Y,!$3002
        0xE9, 0x01, 0x30, // MOV X,!$3001
        0xEC, 0x02, 0x30, // MOV Y,!$3002
        0xC9, 0x04, 0x30, // MOV !$3004,X
        0xCC, 0x05, 0x30, // MOV !$3005,Y
        0x2C, 0x04, 0x30, // ROL !$3004
        0x4C, 0x05, 0x30, // LSR !$3005
        0x6C, 0x04, 0x30, // ROR !$3004
        0x8C, 0x05, 0x30, // DEC !$3005
        0xAC, 0x06, 0x30, // INC !$3006
        0x00, // NOP
        0x6F, // RET
    ];
    bus.load(0x0200, &main);
    bus.load(0x0300, &routine);
    bus.load(0x3000, &[0x19, 0x28, 0x00, 0x07]);

    let mut cpu = Spc700::new(InstructionTable::standard().expect("standard table"));
    cpu.regs.sp = 0xEF;
    cpu.regs.x = 0x03;
    cpu.set_pc(0x0200);
    let mut verifier = Verifier::new(VerifyTarget::All);

    let verdicts = verifier
        .run(&mut cpu, &mut bus, 58, 2_000)
        .unwrap_or_else(|v| panic!("{v}"));

    let mut seen: Vec<u8> = verdicts.iter().map(|v| v.opcode).collect();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), cpu.table().len());
    assert_eq!(verifier.verified(), 58);
}

#[test]
fn test_verifier_single_opcode() {
    let (mut cpu, mut bus) = setup(&[
        0xE5, 0x00, 0x30, // MOV A,!$3000
        0x85, 0x00, 0x30, // ADC A,!$3000
        0x5F, 0x00, 0x02, // JMP !$0200
    ]);
    bus.poke(0x3000, 0x11);
    let mut verifier = Verifier::new(VerifyTarget::Opcode(0x85));

    let verdicts = verifier
        .run(&mut cpu, &mut bus, 3, 200)
        .unwrap_or_else(|v| panic!("{v}"));

    assert!(verdicts.iter().all(|v| v.mnemonic == "ADC A,!abs"));
    assert_eq!(verdicts[0].pre.a, 0x11);
    assert_eq!(verdicts[0].post.a, 0x22);
    assert_eq!(verdicts[0].cycles, 4);
}

#[test]
fn test_verifier_gives_up_after_cycle_limit() {
    let (mut cpu, mut bus) = setup(&[0x5F, 0x00, 0x02]); // JMP !$0200
    let mut verifier = Verifier::new(VerifyTarget::Opcode(0xCF));

    let err = verifier.run(&mut cpu, &mut bus, 1, 30).expect_err("MUL never runs");

    assert!(err.message.contains("30 cycles"));
}

/// Reads PC+1 on every cycle for ten cycles.
fn exec_burst(step: &mut Step<'_>) {
    step.fetch_next();
    if step.cycle() == 10 {
        step.finish();
    }
}

fn check_burst(ev: &Evidence<'_>) -> Result<(), Violation> {
    ev.expect_accesses(8, 0)
}

#[test]
fn test_trace_overflow_is_counted() {
    let mut table = InstructionTable::empty();
    table
        .register(Instruction {
            opcode: 0x01,
            mnemonic: "BURST",
            cycles: 10,
            exec: exec_burst,
            check: check_burst,
        })
        .expect("free slot");
    let mut bus = SimpleBus::new();
    bus.load(0x0200, &[0x01]);
    let mut cpu = Spc700::new(table);
    cpu.set_pc(0x0200);
    let mut verifier = Verifier::new(VerifyTarget::Opcode(0x01));

    let mut verdict = None;
    for _ in 0..11 {
        if let Some(v) = verifier.tick(&mut cpu, &mut bus).expect("contract holds") {
            verdict = Some(v);
        }
    }

    assert_eq!(verdict.map(|v| v.cycles), Some(10));
    assert_eq!(verifier.snapshot().reads().len(), 8);
    assert_eq!(verifier.snapshot().reads().dropped(), 2);
}

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tomasulo_rust::core::instruction::{FunctionalUnitClass, Instruction, OpKind, Operand};
use tomasulo_rust::{Engine, EngineConfig};

fn straight_line_program(n: usize) -> Vec<Instruction> {
    (0..n)
        .map(|i| {
            Instruction::new(
                i,
                OpKind::Add,
                Some(format!("R{}", i % 8)),
                Operand::Reg(format!("R{}", (i + 1) % 8)),
                Operand::Reg(format!("R{}", (i + 2) % 8)),
                0,
                None,
            )
        })
        .collect()
}

/// `BEQ <next-block> R0 R0` / two independent ADDs, repeated — the
/// always-taken predictor (§9) means every branch mispredicts, giving
/// the squash path (§4.1 Commit) something to do on every iteration.
fn loop_with_branch_program(iterations: usize) -> Vec<Instruction> {
    let mut program = Vec::new();
    for i in 0..iterations {
        let base = i * 3;
        program.push(Instruction::new(
            base,
            OpKind::Beq,
            None,
            Operand::Reg("R0".into()),
            Operand::Reg("R0".into()),
            0,
            Some(base + 3),
        ));
        program.push(Instruction::new(
            base + 1,
            OpKind::Add,
            Some("R1".to_string()),
            Operand::Reg("R1".to_string()),
            Operand::Reg("R2".to_string()),
            0,
            None,
        ));
        program.push(Instruction::new(
            base + 2,
            OpKind::Add,
            Some("R3".to_string()),
            Operand::Reg("R3".to_string()),
            Operand::Reg("R4".to_string()),
            0,
            None,
        ));
    }
    program
}

fn config_with_rs(count: usize) -> EngineConfig {
    EngineConfig::new()
        .with_rs_count(FunctionalUnitClass::AddSub, count)
        .with_rs_count(FunctionalUnitClass::MulDiv, count)
        .with_rs_count(FunctionalUnitClass::LoadStore, count)
        .with_rs_count(FunctionalUnitClass::Branch, count)
        .with_rob_size(64)
}

fn bench_run_to_end_straight_line(c: &mut Criterion) {
    c.bench_function("engine_run_to_end_straight_line_1000", |b| {
        b.iter(|| {
            let mut engine = Engine::new(config_with_rs(4));
            engine.load_program(straight_line_program(black_box(1000)));
            let outcome = engine.run_to_end(Some(100_000));
            black_box(outcome);
        });
    });
}

fn bench_speculative_loop(c: &mut Criterion) {
    c.bench_function("engine_speculative_branches_300", |b| {
        b.iter(|| {
            let mut engine = Engine::new(config_with_rs(2));
            engine.load_program(loop_with_branch_program(black_box(100)));
            engine.run_to_end(Some(50_000));
            black_box(engine.metrics());
        });
    });
}

fn bench_step_then_step_back(c: &mut Criterion) {
    c.bench_function("engine_step_then_step_back_100", |b| {
        b.iter(|| {
            let mut engine = Engine::new(config_with_rs(4));
            engine.load_program(straight_line_program(black_box(100)));
            for _ in 0..20 {
                engine.step();
            }
            for _ in 0..20 {
                engine.step_back();
            }
            black_box(engine.clock());
        });
    });
}

criterion_group!(
    benches,
    bench_run_to_end_straight_line,
    bench_speculative_loop,
    bench_step_then_step_back
);
criterion_main!(benches);

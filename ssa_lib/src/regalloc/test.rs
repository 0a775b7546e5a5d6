use super::*;
use crate::{optimize, Config, ConfigBuilder, Stage};
use pretty_assertions::assert_eq;
use ssa_ir::parse_func;

fn scheduled(src: &str) -> Func {
    let config: Config = ConfigBuilder::new()
        .check_after_each_pass(true)
        .build()
        .unwrap();
    let mut func = parse_func(src, config.registry()).unwrap();
    optimize(&config, &mut func, Stage::Scheduled).unwrap();
    func
}

fn value(func: &Func, name: &str) -> ValueId {
    func.values().find(|&v| func.value_name(v) == name).unwrap()
}

fn reg_of(func: &Func, alloc: &Allocation, name: &str) -> Option<AnyReg> {
    alloc.reg(value(func, name))
}

#[test]
fn reuses_registers_of_dead_values() {
    let func = scheduled(
        "\
func add
b1:
    v1 = InitMem <Mem>
    v2 = Arg <Int32> [0]
    v3 = Arg <Int32> [4]
    v4 = Add <Int32> v2 v3
    Ret v4
",
    );
    let alloc = allocate(&func).unwrap();
    assert_eq!(Some(AnyReg::R(Reg::T0)), reg_of(&func, &alloc, "v2"));
    assert_eq!(Some(AnyReg::R(Reg::T1)), reg_of(&func, &alloc, "v3"));
    assert_eq!(Some(AnyReg::R(Reg::T0)), reg_of(&func, &alloc, "v4"));
    assert!(alloc.saved_regs().is_empty());
}

#[test]
fn keeps_values_live_across_calls_in_saved_registers() {
    let func = scheduled(
        "\
func caller
b1:
    v1 = InitMem <Mem>
    v2 = Arg <UInt32> [0]
    v3 = StaticCall <(UInt32,Mem)> {ext} v1
    Call v3 -> b2
b2: <- b1
    v4 = Select0 <UInt32> v3
    v5 = Add <UInt32> v4 v2
    Ret v5
",
    );
    let alloc = allocate(&func).unwrap();
    assert_eq!(Some(AnyReg::R(Reg::S0)), reg_of(&func, &alloc, "v2"));
    assert_eq!(Some(AnyReg::R(Reg::T0)), reg_of(&func, &alloc, "v4"));
    // Memory and the result tuple of the call live nowhere.
    assert_eq!(None, reg_of(&func, &alloc, "v1"));
    assert_eq!(None, reg_of(&func, &alloc, "v3"));
    assert_eq!(vec![AnyReg::R(Reg::S0)], alloc.saved_regs());
}

#[test]
fn recomputes_constants_instead_of_keeping_them_across_calls() {
    let func = scheduled(
        "\
func keep
b1:
    v1 = InitMem <Mem>
    v2 = Const <UInt32> [100000]
    v3 = StaticCall <(UInt32,Mem)> {ext} v1
    Call v3 -> b2
b2: <- b1
    v4 = Select0 <UInt32> v3
    v5 = Add <UInt32> v4 v2
    Ret v5
",
    );
    let alloc = allocate(&func).unwrap();
    let (add, constant) = (value(&func, "v5"), value(&func, "v2"));
    let i = func
        .value(add)
        .args()
        .iter()
        .position(|&arg| arg == constant)
        .unwrap();
    assert_eq!(None, alloc.reg(constant));
    assert_eq!(Some(AnyReg::R(Reg::T1)), alloc.remat(add, i));
    assert_eq!(Some(AnyReg::R(Reg::T0)), reg_of(&func, &alloc, "v5"));
    assert!(alloc.saved_regs().is_empty());
}

#[test]
fn keeps_constants_used_before_any_call_in_registers() {
    let func = scheduled(
        "\
func nocall
b1:
    v1 = InitMem <Mem>
    v2 = Arg <UInt32> [0]
    v3 = Const <UInt32> [100000]
    v4 = Add <UInt32> v2 v3
    Ret v4
",
    );
    let alloc = allocate(&func).unwrap();
    assert_eq!(Some(AnyReg::R(Reg::T1)), reg_of(&func, &alloc, "v3"));
}

#[test]
fn gives_floats_fpu_registers() {
    let func = scheduled(
        "\
func half
b1:
    v2 = Arg <Float64> [0]
    v3 = Arg <Float64> [8]
    v4 = AddF <Float64> v2 v3
    Ret v4
",
    );
    let alloc = allocate(&func).unwrap();
    assert_eq!(Some(AnyReg::F(FReg(0))), reg_of(&func, &alloc, "v2"));
    assert_eq!(Some(AnyReg::F(FReg(2))), reg_of(&func, &alloc, "v3"));
}

#[test]
fn fails_without_enough_registers() {
    let mut src = "func many\nb1:\n".to_owned();
    for i in 0..30 {
        src += &format!("    v{} = Arg <Int32> [{}]\n", i + 1, i * 4);
    }
    src += "    v31 = Add <Int32> v1 v2\n";
    for i in 3..=30 {
        src += &format!("    v{} = Add <Int32> v{} v{}\n", i + 29, i + 28, i);
    }
    src += "    Ret v59\n";

    let func = scheduled(&src);
    assert!(matches!(
        allocate(&func),
        Err(Ice::OutOfRegisters { .. })
    ));
}

#[test]
fn computes_live_sets_around_loops() {
    let func = scheduled(
        "\
func count
b1:
    v1 = InitMem <Mem>
    v2 = Arg <Int32> [0]
    v3 = Const <Int32> [0]
    Plain -> b2
b2: <- b1 b3
    v4 = Phi <Int32> v3 v6
    v5 = Less <Bool> v4 v2
    If v5 -> b3 b4
b3: <- b2
    v7 = Const <Int32> [1]
    v6 = Add <Int32> v4 v7
    Plain -> b2
b4: <- b2
    Ret v4
",
    );
    let live = LiveSets::build(&func, |v| needs_reg(&func, v));
    let names = |set: &std::collections::HashSet<ValueId>| {
        let mut names: Vec<_> = set.iter().map(|&v| func.value_name(v)).collect();
        names.sort();
        names
    };
    let block = |name: &str| {
        func.blocks()
            .iter()
            .copied()
            .find(|&b| func.block_name(b) == name)
            .unwrap()
    };
    assert_eq!(vec!["v2", "v3"], names(&live.live_out[&block("b1")]));
    assert_eq!(vec!["v2"], names(&live.live_in[&block("b2")]));
    assert_eq!(vec!["v2", "v4"], names(&live.live_in[&block("b3")]));
    assert_eq!(vec!["v2", "v6"], names(&live.live_out[&block("b3")]));
    assert_eq!(vec!["v4"], names(&live.live_in[&block("b4")]));
}

use super::*;
use crate::ConfigBuilder;
use pretty_assertions::assert_eq;
use ssa_ir::{parse_func, BlockKind};

fn config() -> Config {
    ConfigBuilder::new()
        .check_after_each_pass(true)
        .build()
        .unwrap()
}

fn run(src: &str, config: &Config, until: Stage) -> Result<Func, Ice> {
    let mut func = parse_func(src, config.registry()).unwrap();
    run_passes(&mut func, config, until)?;
    Ok(func)
}

fn block_names(func: &Func) -> Vec<String> {
    func.blocks().iter().map(|&b| func.block_name(b)).collect()
}

const FOLD: &str = "\
func fold
b1:
    v1 = InitMem <Mem>
    v2 = Const <Int32> [2]
    v3 = Const <Int32> [3]
    v4 = Add <Int32> v2 v3
    Ret v4
";

#[test]
fn folds_constants() {
    let func = run(FOLD, &config(), Stage::Opt).unwrap();
    let expected = "\
func fold
b1:
    v4 = Const <Int32> [5]
    Ret v4
";
    assert_eq!(expected, func.to_string());
}

#[test]
fn gives_up_after_max_sweeps() {
    let config = ConfigBuilder::new().max_sweeps(Some(1)).build().unwrap();
    assert_eq!(
        Ice::NoFixpoint {
            pass: "opt",
            sweeps: 1
        },
        run(FOLD, &config, Stage::Opt).unwrap_err()
    );
}

const SAME_SUM: &str = "\
func cse
b1:
    v1 = InitMem <Mem>
    v2 = Arg <Int32> [0]
    v3 = Arg <Int32> [4]
    v4 = Add <Int32> v2 v3
    v5 = Add <Int32> v3 v2
    v6 = Mul <Int32> v4 v5
    Ret v6
";

#[test]
fn merges_common_subexpressions() {
    let func = run(SAME_SUM, &config(), Stage::Opt).unwrap();
    let expected = "\
func cse
b1:
    v2 = Arg <Int32> [0]
    v3 = Arg <Int32> [4]
    v4 = Add <Int32> v2 v3
    v6 = Mul <Int32> v4 v4
    Ret v6
";
    assert_eq!(expected, func.to_string());
}

#[test]
fn skipped_passes_dont_run() {
    let config = ConfigBuilder::new().skip("generic cse").build().unwrap();
    let func = run(SAME_SUM, &config, Stage::Opt).unwrap();
    assert!(func.to_string().contains("v5 = Add <Int32> v3 v2\n"));
}

#[test]
fn removes_dead_branches() {
    let src = "\
func dead
b1:
    v1 = InitMem <Mem>
    v2 = ConstBool <Bool> [1]
    v3 = Arg <Int32> [0]
    If v2 -> b2 b3
b2: <- b1
    Ret v3
b3: <- b1
    v4 = Const <Int32> [7]
    Ret v4
";
    let func = run(src, &config(), Stage::Opt).unwrap();
    let expected = "\
func dead
b1:
    v3 = Arg <Int32> [0]
    Plain -> b2
b2: <- b1
    Ret v3
";
    assert_eq!(expected, func.to_string());
}

#[test]
fn removes_trivial_phis() {
    let src = "\
func same
b1:
    v1 = InitMem <Mem>
    v2 = Arg <Int32> [0]
    v3 = Arg <Bool> [4]
    If v3 -> b2 b3
b2: <- b1
    Plain -> b4
b3: <- b1
    Plain -> b4
b4: <- b2 b3
    v4 = Phi <Int32> v2 v2
    Ret v4
";
    let func = run(src, &config(), Stage::Opt).unwrap();
    let text = func.to_string();
    assert!(!text.contains("Phi"));
    assert!(text.contains("    Ret v2\n"));
}

const ADD: &str = "\
func add
b1:
    v1 = InitMem <Mem>
    v2 = Arg <Int32> [0]
    v3 = Arg <Int32> [4]
    v4 = Add <Int32> v2 v3
    Ret v4
";

#[test]
fn lowers_to_mips() {
    let func = run(ADD, &config(), Stage::Lowered).unwrap();
    let expected = "\
func add
b1:
    v2 = Arg <Int32> [0]
    v3 = Arg <Int32> [4]
    v4 = ADD <Int32> v2 v3
    Ret v4
";
    assert_eq!(expected, func.to_string());
}

#[test]
fn lowers_branches() {
    let src = "\
func max
b1:
    v1 = InitMem <Mem>
    v2 = Arg <Int32> [0]
    v3 = Arg <Int32> [4]
    v4 = Less <Bool> v2 v3
    If v4 -> b2 b3
b2: <- b1
    Ret v3
b3: <- b1
    Ret v2
";
    let text = run(src, &config(), Stage::Lowered).unwrap().to_string();
    assert!(text.contains("v4 = SGT <Bool> v3 v2\n"));
    assert!(text.contains("    NE v4 -> b2 b3\n"));
}

#[test]
fn rejects_architecture_input() {
    let src = "\
func mips
b1:
    v1 = MOVWconst <Int32> [1]
    Ret v1
";
    assert!(matches!(
        run(src, &config(), Stage::Opt),
        Err(Ice::Unsupported(_))
    ));
}

#[test]
fn reports_what_wasnt_lowered() {
    let src = "\
func wide
b1:
    v2 = Arg <Int64> [0]
    v3 = Add <Int64> v2 v2
    Ret v3
";
    assert_eq!(
        Ice::Unlowered {
            op: "Add",
            value: "v3".to_owned(),
            block: "b1".to_owned(),
        },
        run(src, &config(), Stage::Lowered).unwrap_err()
    );
}

const NIL_CHECKED_LOAD: &str = "\
func nilcheck
b1:
    v1 = InitMem <Mem>
    v2 = Arg <Ptr> [0]
    v3 = OffPtr <Ptr> [4] v2
    v4 = NilCheck <Void> v2 v1
    v5 = Load <Int32> v3 v1
    Ret v5
";

#[test]
fn elides_nil_checks_covered_by_a_load() {
    let text = run(NIL_CHECKED_LOAD, &config(), Stage::Lowered)
        .unwrap()
        .to_string();
    assert!(!text.contains("LoweredNilCheck"));
    assert!(text.contains("v5 = MOVWload <Int32> [4] v2 v1\n"));
}

#[test]
fn keeps_nil_checks_of_other_pointers() {
    let src = "\
func nilcheck
b1:
    v1 = InitMem <Mem>
    v2 = Arg <Ptr> [0]
    v3 = Arg <Ptr> [4]
    v4 = NilCheck <Void> v2 v1
    v5 = Load <Int32> v3 v1
    Ret v5
";
    let text = run(src, &config(), Stage::Lowered).unwrap().to_string();
    assert!(text.contains("v4 = LoweredNilCheck <Void> v2 v1\n"));
}

#[test]
fn keeps_nil_checks_when_elimination_is_skipped() {
    let config = ConfigBuilder::new().skip("nilcheckelim").build().unwrap();
    let text = run(NIL_CHECKED_LOAD, &config, Stage::Lowered)
        .unwrap()
        .to_string();
    assert!(text.contains("LoweredNilCheck"));
}

#[test]
fn schedules_the_control_last() {
    let src = "\
func sched
b1:
    v1 = InitMem <Mem>
    v2 = Arg <Int32> [0]
    v3 = Arg <Int32> [4]
    v4 = Less <Bool> v2 v3
    v5 = Add <Int32> v2 v3
    If v4 -> b2 b3
b2: <- b1
    Ret v5
b3: <- b1
    Ret v2
";
    let func = run(src, &config(), Stage::Scheduled).unwrap();
    let entry = func.entry().unwrap();
    let order: Vec<_> = func
        .block(entry)
        .values()
        .iter()
        .map(|&v| func.value_name(v))
        .collect();
    assert_eq!(vec!["v2", "v3", "v5", "v4"], order);
}

#[test]
fn schedules_loads_before_stores_overwriting_their_memory() {
    let src = "\
func reload
b1:
    v1 = InitMem <Mem>
    v2 = Arg <Ptr> [0]
    v3 = Arg <Int32> [4]
    v4 = Store <Mem> v2 v3 v1
    v5 = Load <Int32> v2 v1
    Ret v5
";
    let func = run(src, &config(), Stage::Scheduled).unwrap();
    let entry = func.entry().unwrap();
    let order: Vec<_> = func
        .block(entry)
        .values()
        .iter()
        .map(|&v| func.value_name(v))
        .collect();
    assert_eq!(vec!["v1", "v2", "v3", "v5", "v4"], order);
}

#[test]
fn recomputes_flags_in_the_block_reading_them() {
    let src = "\
func flags
b1:
    v1 = InitMem <Mem>
    v2 = Arg <Float64> [0]
    v3 = Arg <Float64> [8]
    v4 = EqF <Bool> v2 v3
    v5 = LessF <Bool> v2 v3
    If v5 -> b2 b3
b2: <- b1
    If v4 -> b3 b4
b3: <- b1 b2
    Ret v2
b4: <- b2
    Ret v3
";
    let func = run(src, &config(), Stage::Scheduled).unwrap();
    let compares = |block: usize| -> Vec<String> {
        let b = func.blocks()[block];
        func.block(b)
            .values()
            .iter()
            .filter(|&&v| func.ty(v).is_flags())
            .map(|&v| func.op(v).name().to_owned())
            .collect()
    };
    assert_eq!(vec!["CMPLTD"], compares(0));
    assert_eq!(vec!["CMPEQD"], compares(1));
    let b2 = func.blocks()[1];
    let control = func.block(b2).control().unwrap();
    assert_eq!(Some(&control), func.block(b2).values().last());
}

#[test]
fn splits_critical_edges() {
    let src = "\
func crit
b1:
    v1 = InitMem <Mem>
    v2 = Arg <Int32> [0]
    v3 = Arg <Bool> [4]
    If v3 -> b2 b3
b2: <- b1
    v5 = Add <Int32> v2 v2
    Plain -> b3
b3: <- b1 b2
    v4 = Phi <Int32> v2 v5
    Ret v4
";
    let func = run(src, &config(), Stage::Scheduled).unwrap();
    let entry = func.entry().unwrap();
    let middle = func.block(entry).succ(1);
    assert_eq!("b4", func.block_name(middle));
    assert_eq!(BlockKind::Plain, func.block(middle).kind());
    assert_eq!("b3", func.block_name(func.block(middle).succ(0)));
    assert_eq!(vec!["b1", "b2", "b3", "b4"], block_names(&func));
}

#[test]
fn finds_passes_by_name() {
    assert_eq!(Some(Stage::Lowered), find("lower").map(|pass| pass.stage));
    assert!(find("lower").is_some_and(|pass| pass.required));
    assert!(find("generic cse").is_some_and(|pass| !pass.required));
    assert!(find("inline").is_none());
}

use super::*;
use crate::Arch;
use pretty_assertions::assert_eq;

const LOOP: &str = "\
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
";

#[test]
fn prints_what_it_parses() {
    let registry = Registry::new(Arch::Generic);
    let func = parse_func(LOOP, &registry).unwrap();
    assert_eq!(LOOP, func.to_string());
}

#[test]
fn keeps_the_numbers_of_the_source() {
    let registry = Registry::new(Arch::Generic);
    let mut func = parse_func(LOOP, &registry).unwrap();
    let b3 = func.blocks()[2];
    let add = func.block(b3).values()[1];
    assert_eq!("v6", func.value_name(add));
    assert_eq!("b3", func.block_name(b3));

    let new = func.new_value(b3, Op::Const, Type::INT32, &[], Aux::Int(2));
    assert_eq!("v8", func.value_name(new));
    let block = func.new_block(BlockKind::Exit);
    assert_eq!("b5", func.block_name(block));
}

#[test]
fn numbers_new_values_after_the_highest_number() {
    let src = "\
func gaps
b1:
    v9 = InitMem <Mem>
    v3 = Const <Int32> [1]
    v5 = Const <Int32> [2]
    Ret v3
";
    let registry = Registry::new(Arch::Generic);
    let mut func = parse_func(src, &registry).unwrap();
    let b1 = func.blocks()[0];
    let new = func.new_value(b1, Op::Const, Type::INT32, &[], Aux::Int(3));
    assert_eq!("v10", func.value_name(new));
}

#[test]
fn parses_payloads() {
    let src = "\
func payloads
b1:
    v1 = InitMem <Mem>
    v2 = SP <Ptr>
    v3 = ConstFloat <Float64> [1.5]
    v4 = MOVWaddr [8] {auto:x:4} v2
    v5 = MOVWaddr {counter} v2
    v6 = MOVWload <Int32> [-4] v2 v1
    v7 = StaticCall <(UInt32,Mem)> [8] {puts} v1
    Ret
";
    let registry = Registry::new(Arch::Mips);
    let func = parse_func(src, &registry).unwrap();
    let values: Vec<_> = func.values().map(|v| func.value(v).aux().clone()).collect();
    assert_eq!(Aux::Float(1.5), values[2]);
    assert_eq!(
        Aux::Sym {
            sym: Some(Symbol::auto("x", 4)),
            off: 8
        },
        values[3]
    );
    assert_eq!(Aux::sym(Symbol::external("counter")), values[4]);
    assert_eq!(Aux::Sym { sym: None, off: -4 }, values[5]);
    assert_eq!(Type::tuple(Type::UINT32, Type::Mem), *func.ty(func.values().nth(6).unwrap()));
    // Types can be left out when the operation has a fixed one.
    assert!(func.to_string().contains("v4 = MOVWaddr <Ptr> [8] {auto:x:4} v2\n"));
}

#[test]
fn parses_several_functions() {
    let src = "\
func a
b1:
    Exit
// the second one
func b
b1:
    v1 = Const <Int32> [3] // three
    Ret v1
";
    let registry = Registry::new(Arch::Generic);
    let funcs = parse_unit(src, &registry).unwrap();
    assert_eq!(2, funcs.len());
    assert_eq!("a", funcs[0].name());
    assert_eq!("b", funcs[1].name());
}

fn parse_err(src: &str) -> ParseError {
    parse_func(src, &Registry::new(Arch::Generic)).unwrap_err()
}

#[test]
fn reports_unknown_operations() {
    let src = "func f\nb1:\n    v1 = ADD <Int32>\n    Ret\n";
    let err = parse_err(src);
    assert_eq!("unknown operation `ADD`", err.message);
    assert_eq!("ADD", &src[err.span]);
}

#[test]
fn reports_wrong_arity() {
    let err = parse_err("func f\nb1:\n    v1 = Const <Int32> [1]\n    v2 = Add <Int32> v1\n    Ret\n");
    assert_eq!("`Add` takes Fixed(2) arguments, got 1", err.message);
}

#[test]
fn reports_unknown_values() {
    let src = "func f\nb1:\n    v1 = Neg <Int32> v9\n    Ret\n";
    let err = parse_err(src);
    assert_eq!("unknown value v9", err.message);
    assert_eq!("v9", &src[err.span]);
}

#[test]
fn reports_missing_terminators() {
    let err = parse_err("func f\nb1:\n    v1 = Const <Int32> [1]\n");
    assert_eq!("block has no terminator", err.message);
}

#[test]
fn reports_wrong_successor_counts() {
    let err = parse_err("func f\nb1:\n    v1 = ConstBool [1]\n    If v1 -> b1\n");
    assert_eq!("`If` needs 2 successors, got 1", err.message);
}

#[test]
fn reports_mismatched_predecessors() {
    let err = parse_err("func f\nb1:\n    Plain -> b2\nb2: <- b3\n    Exit\n");
    assert_eq!("unknown block b3", err.message);

    let err = parse_err(
        "func f\nb1:\n    v1 = ConstBool [1]\n    If v1 -> b2 b3\nb2:\n    Plain -> b3\nb3: <- b2 b1\n    Exit\n",
    );
    assert_eq!("predecessors don't match the edges of the function", err.message);
}

#[test]
fn reports_missing_payloads() {
    let err = parse_err("func f\nb1:\n    v1 = Const <Int32>\n    Ret\n");
    assert_eq!("`Const` needs a payload", err.message);
    let err = parse_err("func f\nb1:\n    v1 = Const <Int32> {x}\n    Ret\n");
    assert_eq!("`Const` doesn't take this payload", err.message);
}

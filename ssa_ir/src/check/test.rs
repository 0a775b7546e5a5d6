use super::*;
use crate::{parse_func, Arch, Aux, BlockKind, Type};
use pretty_assertions::assert_eq;

fn generic(src: &str) -> (Func, Registry) {
    let registry = Registry::new(Arch::Generic);
    (parse_func(src, &registry).unwrap(), registry)
}

#[test]
fn accepts_well_formed_functions() {
    let (func, registry) = generic(
        "\
func f
b1:
    v1 = Arg <Int32> [0]
    v2 = ConstBool [1]
    If v2 -> b2 b3
b2:
    v3 = Neg <Int32> v1
    Plain -> b4
b3:
    Plain -> b4
b4:
    v4 = Phi <Int32> v3 v1
    Ret v4
",
    );
    assert_eq!(Ok(()), check_func(&func, &registry));
}

#[test]
fn rejects_uses_that_are_not_dominated() {
    let (func, registry) = generic(
        "\
func f
b1:
    v1 = ConstBool [1]
    If v1 -> b2 b3
b2:
    v2 = Const <Int32> [1]
    Plain -> b4
b3:
    Plain -> b4
b4:
    v3 = Neg <Int32> v2
    Ret v3
",
    );
    assert_eq!(
        Err(CheckError::Dominance {
            user: "v3".to_owned(),
            arg: "v2".to_owned()
        }),
        check_func(&func, &registry)
    );
}

#[test]
fn rejects_uses_before_definitions() {
    let (func, registry) = generic(
        "\
func f
b1:
    v2 = Neg <Int32> v1
    v1 = Const <Int32> [1]
    Ret v2
",
    );
    assert_eq!(
        Err(CheckError::Dominance {
            user: "v2".to_owned(),
            arg: "v1".to_owned()
        }),
        check_func(&func, &registry)
    );
}

#[test]
fn rejects_wrong_successor_counts() {
    let (mut func, registry) = generic("func f\nb1:\n    Plain -> b2\nb2:\n    Exit\n");
    let b1 = func.blocks()[0];
    func.set_kind(b1, BlockKind::Exit);
    assert_eq!(
        Err(CheckError::SuccessorCount {
            block: "b1".to_owned(),
            kind: "Exit".to_owned(),
            expected: 0,
            found: 1
        }),
        check_func(&func, &registry)
    );
}

#[test]
fn rejects_bad_controls() {
    let (mut func, registry) = generic("func f\nb1:\n    v1 = InitMem <Mem>\n    Ret\n");
    let b1 = func.blocks()[0];
    let mem = func.block(b1).values()[0];

    func.set_kind(b1, BlockKind::Exit);
    func.set_control(b1, Some(mem));
    assert_eq!(
        Err(CheckError::UnexpectedControl {
            block: "b1".to_owned(),
            kind: "Exit".to_owned()
        }),
        check_func(&func, &registry)
    );

    func.set_kind(b1, BlockKind::Ret);
    assert_eq!(
        Err(CheckError::ControlType {
            block: "b1".to_owned(),
            kind: "Ret".to_owned(),
            value: "v1".to_owned(),
            ty: "Mem".to_owned()
        }),
        check_func(&func, &registry)
    );
}

#[test]
fn rejects_phis_with_the_wrong_argument_count() {
    let (mut func, registry) = generic(
        "\
func f
b1:
    v1 = ConstBool [1]
    If v1 -> b2 b3
b2:
    Plain -> b3
b3:
    v2 = Phi <Bool> v1 v1
    Ret v2
",
    );
    let phi = func.values().last().unwrap();
    func.set_args(phi, vec![func.value(phi).arg(0)]);
    assert_eq!(
        Err(CheckError::PhiArguments {
            value: "v2".to_owned(),
            block: "b3".to_owned(),
            expected: 2,
            found: 1
        }),
        check_func(&func, &registry)
    );
}

#[test]
fn rejects_foreign_operations() {
    let (mut func, registry) = generic("func f\nb1:\n    v1 = Const <Int32> [1]\n    Ret v1\n");
    let v1 = func.values().next().unwrap();
    func.replace_with(v1, Op::MOVWconst, Type::INT32, &[], Aux::Int(1));
    assert_eq!(
        Err(CheckError::ForeignOp {
            value: "v1".to_owned(),
            op: "MOVWconst".to_owned()
        }),
        check_func(&func, &registry)
    );
    assert_eq!(Ok(()), check_func(&func, &Registry::new(Arch::Mips)));
}

#[test]
fn rejects_mismatched_payloads() {
    let (mut func, registry) = generic("func f\nb1:\n    v1 = Const <Int32> [1]\n    Ret v1\n");
    let v1 = func.values().next().unwrap();
    func.replace_with(v1, Op::Const, Type::INT32, &[], Aux::Float(1.0));
    assert_eq!(
        Err(CheckError::AuxKind {
            value: "v1".to_owned(),
            op: "Const".to_owned(),
            aux: "Float(1.0)".to_owned()
        }),
        check_func(&func, &registry)
    );
}

#[test]
fn rejects_dangling_arguments() {
    let (mut func, registry) = generic(
        "func f\nb1:\n    v1 = Const <Int32> [1]\n    v2 = Neg <Int32> v1\n    Ret v2\n",
    );
    let v1 = func.values().next().unwrap();
    func.remove_value(v1);
    assert_eq!(
        Err(CheckError::DanglingArgument {
            user: "v2".to_owned()
        }),
        check_func(&func, &registry)
    );
}

#[test]
fn ignores_unreachable_blocks_for_dominance() {
    let (func, registry) = generic(
        "\
func f
b1:
    v1 = Const <Int32> [1]
    Ret v1
b2:
    v2 = Neg <Int32> v1
    Ret v2
",
    );
    assert_eq!(Ok(()), check_func(&func, &registry));
}

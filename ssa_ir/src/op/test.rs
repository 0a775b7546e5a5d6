use super::*;

#[test]
fn table_matches_the_enum() {
    for (i, op) in Op::ALL.iter().enumerate() {
        assert_eq!(i, op.index());
        assert_eq!(format!("{op:?}"), op.name());
    }
    for kind in BlockKind::ALL {
        assert_eq!(format!("{kind:?}"), kind.name());
    }
}

#[test]
fn generic_ops_come_first() {
    let first_mips = Op::ALL
        .iter()
        .position(|op| op.arch() == Arch::Mips)
        .unwrap();
    assert!(Op::ALL[..first_mips].iter().all(|op| op.is_generic()));
    assert!(Op::ALL[first_mips..].iter().all(|op| !op.is_generic()));
}

#[test]
fn looks_up_ops_by_name() {
    let generic = Registry::new(Arch::Generic);
    assert_eq!(Some(Op::Add), generic.lookup("Add"));
    assert_eq!(None, generic.lookup("ADD"));
    assert_eq!(Some(BlockKind::If), generic.lookup_kind("If"));
    assert_eq!(None, generic.lookup_kind("NE"));

    let mips = Registry::new(Arch::Mips);
    assert_eq!(Some(Op::Add), mips.lookup("Add"));
    assert_eq!(Some(Op::ADD), mips.lookup("ADD"));
    assert_eq!(Some(BlockKind::NE), mips.lookup_kind("NE"));
    assert_eq!(None, mips.lookup("Bogus"));
}

#[test]
fn describes_operations() {
    let mips = Registry::new(Arch::Mips);
    let add = mips.info(Op::ADD);
    assert_eq!(Arity::Fixed(2), add.arity);
    assert!(add.commutative);
    assert_eq!(Asm::Rrr("addu"), add.asm);

    let mult = mips.info(Op::MULT);
    assert_eq!(&[RegMask::HI, RegMask::LO], mult.reg.outputs);
    assert_eq!(Some(Type::tuple(Type::INT32, Type::INT32)), mult.ty.to_type());

    let call = mips.info(Op::CALLstatic);
    assert!(call.call);
    assert!(call.reg.clobbers.contains(crate::Reg::V0.into()));
    assert!(!call.reg.clobbers.contains(crate::Reg::S0.into()));

    assert_eq!(Arity::Variadic, mips.info(Op::Phi).arity);
    assert!(mips.info(Op::MOVWload).faults_on_nil_arg0);
    assert!(mips.info(Op::InitMem).no_code);
}

#[test]
#[should_panic(expected = "internal compiler error")]
fn panics_on_foreign_ops() {
    Registry::new(Arch::Generic).info(Op::ADD);
}

#[test]
fn block_kinds_have_inverses() {
    for kind in BlockKind::ALL {
        if let Some(inverse) = kind.info().inverse {
            assert_eq!(Some(*kind), inverse.info().inverse);
            assert_eq!(2, kind.succs());
        }
    }
}

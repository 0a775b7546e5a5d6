use super::*;

#[test]
fn displays_register_names_correctly() {
    assert_eq!("$zero", format!("{:#}", Reg::ZERO));
    assert_eq!("$at", format!("{:#}", Reg::AT));
    assert_eq!("$v0", format!("{:#}", Reg::V0));
    assert_eq!("$a3", format!("{:#}", Reg::A3));
    assert_eq!("$t0", format!("{:#}", Reg::T0));
    assert_eq!("$t9", format!("{:#}", Reg::T9));
    assert_eq!("$s7", format!("{:#}", Reg::S7));
    assert_eq!("$sp", format!("{:#}", Reg::SP));
    assert_eq!("$ra", format!("{:#}", Reg::RA));

    assert_eq!("$0", format!("{}", Reg::ZERO));
    assert_eq!("$8", format!("{}", Reg::T0));
    assert_eq!("$31", format!("{}", Reg::RA));

    assert_eq!("$f4", format!("{}", FReg(4)));
    assert_eq!("$f4", format!("{:#}", AnyReg::F(FReg(4))));
    assert_eq!("$hi", format!("{}", AnyReg::Hi));
}

#[test]
fn masks_contain_the_right_registers() {
    assert!(RegMask::GP.contains(Reg::V0.into()));
    assert!(RegMask::GP.contains(Reg::T9.into()));
    assert!(!RegMask::GP.contains(Reg::AT.into()));
    assert!(!RegMask::GP.contains(Reg::SP.into()));
    assert!(!RegMask::GP.contains(Reg::K0.into()));

    assert!(RegMask::FP.contains(FReg(0).into()));
    assert!(RegMask::FP.contains(FReg(28).into()));
    assert!(!RegMask::FP.contains(FReg::F30.into()));

    assert_eq!(8, RegMask::GP_SAVED.iter().count());
    assert!(RegMask::GP_SAVED.iter().all(|r| r.is_saved()));
    assert!(RegMask::FP_SAVED.iter().all(|r| r.is_saved()));
    assert!(RegMask::CALLER_SAVED
        .iter()
        .filter(|r| *r != AnyReg::R(Reg::RA))
        .all(|r| !r.is_saved()));
}

#[test]
fn mask_iterates_in_register_order() {
    let mask = RegMask::single(Reg::T1.into())
        | RegMask::single(Reg::V0.into())
        | RegMask::single(FReg(2).into())
        | RegMask::LO;
    let regs: Vec<_> = mask.iter().collect();
    assert_eq!(
        vec![
            AnyReg::R(Reg::V0),
            AnyReg::R(Reg::T1),
            AnyReg::F(FReg(2)),
            AnyReg::Lo
        ],
        regs
    );
}

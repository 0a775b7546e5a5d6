use super::*;
use crate::Prog;
use ssa_ir::Reg;

fn program() -> Program {
    Program {
        name: "f".to_owned(),
        frame_size: 0,
        instrs: vec![
            Prog {
                mnemonic: "la",
                operands: vec![
                    Operand::Reg(Reg::T0.into()),
                    Operand::Sym {
                        name: "counter".to_owned(),
                        off: 4,
                    },
                ],
            },
            Prog {
                mnemonic: "lw",
                operands: vec![
                    Operand::Reg(Reg::V0.into()),
                    Operand::Mem {
                        base: Reg::T0.into(),
                        off: -8,
                    },
                ],
            },
            Prog {
                mnemonic: "jr",
                operands: vec![Operand::Reg(Reg::RA.into())],
            },
        ],
        blocks: vec![("f.b1".to_owned(), 0), ("f.b2".to_owned(), 2)],
        relocations: Vec::new(),
    }
}

#[test]
pub fn outputs_nothing_without_programs() {
    let mut output = String::new();
    MipsOutputter::new(&mut output).write_programs(&[]).unwrap();
    assert_eq!("", output);
}

#[test]
pub fn outputs_programs() {
    let mut output = String::new();
    MipsOutputter::new(&mut output)
        .write_programs(&[program()])
        .unwrap();
    assert_eq!(
        "	.text

	.globl	f
f:
f.b1:
	la	$8, counter+4
	lw	$2, -8($8)
f.b2:
	jr	$31
",
        output
    );
}

#[test]
pub fn outputs_register_names() {
    let mut output = String::new();
    MipsOutputter::new(&mut output)
        .with_config(MipsOutputConfig {
            use_register_names: true,
        })
        .write_program(&program())
        .unwrap();
    assert_eq!(
        "	.globl	f
f:
f.b1:
	la	$t0, counter+4
	lw	$v0, -8($t0)
f.b2:
	jr	$ra
",
        output
    );
}

#[test]
pub fn outputs_trailing_labels() {
    let mut program = program();
    program.instrs.truncate(2);
    let mut output = String::new();
    MipsOutputter::new(&mut output)
        .write_program(&program)
        .unwrap();
    assert!(output.ends_with("\tlw\t$2, -8($8)\nf.b2:\n"));
}

#[test]
pub fn outputs_immediates() {
    let mut output = String::new();
    let mut outputter = MipsOutputter::new(&mut output);
    outputter.write_operand(&Operand::Imm(-3)).unwrap();
    outputter.write_operand(&Operand::FImm(1.0)).unwrap();
    outputter
        .write_operand(&Operand::Sym {
            name: "x".to_owned(),
            off: -2,
        })
        .unwrap();
    assert_eq!("-31.0x-2", output);
}

#[cfg(test)]
mod test;

use crate::{Operand, Program};
use ssa_ir::AnyReg;
use std::fmt::Result;

#[derive(Debug, Clone, Default)]
pub struct MipsOutputConfig {
    /// If `true`, registers will be named (`$sp`, `$a0`) instead of numbered (`$29`, `$4`).
    pub use_register_names: bool,
}

/// Can be used to format [`Program`]s as MIPS assembly to a writer.
///
/// A mutable reference to the writer---an implementor of [`std::fmt::Write`]---must be passed to
/// [`new`](Self::new). Then programs can be formatted using [`write_programs`](Self::write_programs).
pub struct MipsOutputter<'w, W: std::fmt::Write> {
    writer: &'w mut W,
    config: MipsOutputConfig,
}

impl<'w, W: std::fmt::Write> MipsOutputter<'w, W> {
    pub fn new(writer: &'w mut W) -> Self {
        Self {
            writer,
            config: Default::default(),
        }
    }

    pub fn with_config(self, config: MipsOutputConfig) -> Self {
        Self { config, ..self }
    }

    pub fn write_programs(&mut self, programs: &[Program]) -> Result {
        if programs.is_empty() {
            return Ok(());
        }
        self.write_str("\t.text\n")?;
        for program in programs {
            self.writeln()?;
            self.write_program(program)?;
        }
        Ok(())
    }

    pub fn write_program(&mut self, value: &Program) -> Result {
        writeln!(self.writer, "\t.globl\t{}", value.name)?;
        self.write_label(&value.name)?;

        let mut blocks = value.blocks.iter().peekable();
        for (i, prog) in value.instrs.iter().enumerate() {
            while let Some((label, _)) = blocks.next_if(|(_, start)| *start == i) {
                self.write_label(label)?;
            }
            self.write_char('\t')?;
            self.write_str(prog.mnemonic)?;
            for (j, operand) in prog.operands.iter().enumerate() {
                if j == 0 {
                    self.write_char('\t')?;
                } else {
                    self.write_sep()?;
                }
                self.write_operand(operand)?;
            }
            self.writeln()?;
        }
        // Blocks starting at the very end, e.g. empty blocks falling off the last instruction.
        for (label, _) in blocks {
            self.write_label(label)?;
        }
        Ok(())
    }

    pub fn write_operand(&mut self, value: &Operand) -> Result {
        match value {
            Operand::Reg(reg) => self.write_reg(*reg),
            Operand::Imm(imm) => write!(self.writer, "{imm}"),
            Operand::FImm(imm) => write!(self.writer, "{imm:?}"),
            Operand::Mem { base, off } => {
                write!(self.writer, "{off}(")?;
                self.write_reg(*base)?;
                self.write_char(')')
            }
            Operand::Sym { name, off: 0 } => self.write_str(name),
            Operand::Sym { name, off } => write!(self.writer, "{name}{off:+}"),
            Operand::Target { label, .. } => self.write_str(label),
            Operand::Func(name) => self.write_str(name),
        }
    }

    fn write_label(&mut self, label: &str) -> Result {
        writeln!(self.writer, "{label}:")
    }

    fn write_reg(&mut self, value: AnyReg) -> Result {
        if self.config.use_register_names {
            write!(self.writer, "{:#}", value)
        } else {
            write!(self.writer, "{}", value)
        }
    }

    /// Writes the separator between operands.
    fn write_sep(&mut self) -> Result {
        self.write_str(", ")
    }

    /// Writes a single newline character.
    #[inline]
    fn writeln(&mut self) -> Result {
        self.write_char('\n')
    }

    /// Call to `self.writer.write_str`.
    #[inline]
    fn write_str(&mut self, s: &str) -> Result {
        self.writer.write_str(s)
    }

    /// Call to `self.writer.write_char`.
    #[inline]
    fn write_char(&mut self, c: char) -> Result {
        self.writer.write_char(c)
    }
}

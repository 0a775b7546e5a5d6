//! The optimization and code generation pipeline: generic SSA in, MIPS32 assembly out.
//!
//! A [`Config`] holds the compiled rule files and the pass settings. [`compile_func`] runs the
//! passes on one function, assigns registers and generates its [`Program`];
//! [`compile_unit`] does the same for many functions in parallel.

pub mod codegen;
mod compile;
mod config;
mod error;
pub mod outputter;
pub mod passes;
pub mod regalloc;

pub use codegen::{Operand, Prog, Program, Relocation};
pub use compile::{compile_func, compile_unit, optimize, optimize_unit};
pub use config::{Config, ConfigBuilder, ConfigErr};
pub use error::{CompileError, Ice};
pub use passes::Stage;

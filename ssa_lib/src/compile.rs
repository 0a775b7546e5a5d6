use crate::{codegen, passes, regalloc, CompileError, Config, Ice, Program, Stage};
use rayon::prelude::*;
use ssa_ir::Func;

/// Runs the passes on `func` up to and including `until`.
pub fn optimize(config: &Config, func: &mut Func, until: Stage) -> Result<(), Ice> {
    passes::run_passes(func, config, until)
}

/// Optimizes every function of a unit in parallel. The result is in input order, on failure the
/// error is that of the first failing function.
pub fn optimize_unit(
    config: &Config,
    funcs: Vec<Func>,
    until: Stage,
) -> Result<Vec<Func>, CompileError> {
    funcs
        .into_par_iter()
        .map(|mut func| match optimize(config, &mut func, until) {
            Ok(()) => Ok(func),
            Err(ice) => Err(CompileError {
                func: func.name().to_owned(),
                ice,
            }),
        })
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}

/// Compiles a single function of generic operations to machine code.
pub fn compile_func(config: &Config, mut func: Func) -> Result<Program, Ice> {
    optimize(config, &mut func, Stage::Scheduled)?;
    let alloc = regalloc::allocate(&func)?;
    let program = codegen::generate(&func, &alloc)?;
    log::debug!(
        "{}: {} instructions, {} byte frame",
        program.name,
        program.instrs.len(),
        program.frame_size
    );
    Ok(program)
}

/// Compiles every function of a unit in parallel. Functions share nothing but the immutable
/// `config`, so the output doesn't depend on the number of threads: the programs are in input
/// order, and on failure the error is that of the first failing function.
pub fn compile_unit(config: &Config, funcs: Vec<Func>) -> Result<Vec<Program>, CompileError> {
    funcs
        .into_par_iter()
        .map(|func| {
            let name = func.name().to_owned();
            compile_func(config, func).map_err(|ice| CompileError { func: name, ice })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}

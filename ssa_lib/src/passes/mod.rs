//! The passes run on every function, in order.
//!
//! Each pass leaves a function that passes [`check_func`]. With
//! [`Config::check_after_each_pass`] that is verified after every pass, turning a broken
//! invariant into an [`Ice::Check`] naming the pass that broke it.

#[cfg(test)]
mod test;

mod check;
mod critical;
mod cse;
mod deadcode;
mod flagalloc;
mod layout;
mod nilcheck;
mod rewrite;
mod schedule;

use crate::{Config, Ice};
use ssa_ir::{check_func, Func};

/// How far to take a function through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Generic operations, simplified.
    Opt,
    /// Architecture operations only.
    Lowered,
    /// Lowered, with blocks laid out and values in their final order.
    Scheduled,
}

pub struct Pass {
    pub name: &'static str,
    /// Required passes can't be skipped.
    pub required: bool,
    /// The last stage this pass belongs to.
    pub stage: Stage,
    run: fn(&mut Func, &Config) -> Result<(), Ice>,
}

impl std::fmt::Debug for Pass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pass")
            .field("name", &self.name)
            .field("required", &self.required)
            .field("stage", &self.stage)
            .finish()
    }
}

const fn pass(
    name: &'static str,
    required: bool,
    stage: Stage,
    run: fn(&mut Func, &Config) -> Result<(), Ice>,
) -> Pass {
    Pass {
        name,
        required,
        stage,
        run,
    }
}

pub static PASSES: &[Pass] = &[
    pass("check input", true, Stage::Opt, check::check_input),
    pass("early phielim", true, Stage::Opt, rewrite::phielim),
    pass("early copyelim", true, Stage::Opt, rewrite::copyelim),
    pass("early deadcode", false, Stage::Opt, deadcode::deadcode),
    pass("opt", true, Stage::Opt, rewrite::opt),
    pass("generic cse", false, Stage::Opt, cse::cse),
    pass("opt deadcode", true, Stage::Opt, deadcode::deadcode),
    pass("lower", true, Stage::Lowered, rewrite::lower),
    pass("lowered deadcode", true, Stage::Lowered, deadcode::deadcode),
    pass("check lower", true, Stage::Lowered, check::check_lowered),
    pass("nilcheckelim", false, Stage::Lowered, nilcheck::nilcheckelim),
    pass("critical", true, Stage::Scheduled, critical::critical),
    pass("layout", true, Stage::Scheduled, layout::layout),
    pass("schedule", true, Stage::Scheduled, schedule::schedule),
    pass("flagalloc", true, Stage::Scheduled, flagalloc::flagalloc),
];

pub fn find(name: &str) -> Option<&'static Pass> {
    PASSES.iter().find(|pass| pass.name == name)
}

/// Runs the passes up to and including `until` on `func`.
pub fn run_passes(func: &mut Func, config: &Config, until: Stage) -> Result<(), Ice> {
    for pass in PASSES.iter().take_while(|pass| pass.stage <= until) {
        if config.skips(pass.name) {
            log::debug!("{}: skipping `{}`", func.name(), pass.name);
            continue;
        }
        log::debug!(
            "{}: running `{}` on {} values",
            func.name(),
            pass.name,
            func.n_values()
        );
        (pass.run)(func, config)?;

        if config.check_after_each_pass() {
            check_func(func, config.registry()).map_err(|source| Ice::Check {
                pass: pass.name,
                source,
            })?;
        }
        if config.dumps(pass.name) {
            log::debug!("after `{}`:\n{func}", pass.name);
        }
    }
    Ok(())
}

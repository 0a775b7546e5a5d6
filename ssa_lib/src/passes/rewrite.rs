use crate::{Config, Ice};
use ssa_ir::{BlockId, Func, Op, ValueId};
use ssa_rules::RuleSet;

pub(super) fn opt(func: &mut Func, config: &Config) -> Result<(), Ice> {
    apply_rewrites(func, config, "opt", config.generic_rules())
}

pub(super) fn lower(func: &mut Func, config: &Config) -> Result<(), Ice> {
    apply_rewrites(func, config, "lower", config.lower_rules())
}

/// Replaces phis whose arguments are all the same value by a copy of that value.
pub(super) fn phielim(func: &mut Func, _config: &Config) -> Result<(), Ice> {
    let mut changed = true;
    while changed {
        changed = false;
        for value in func.values().collect::<Vec<_>>() {
            changed |= eliminate_trivial_phi(func, value);
        }
    }
    Ok(())
}

/// Makes every use of a copy use the copied value instead.
pub(super) fn copyelim(func: &mut Func, _config: &Config) -> Result<(), Ice> {
    for block in func.blocks().to_vec() {
        for value in func.block(block).values().to_vec() {
            bypass_copies(func, value);
        }
        forward_control_copy(func, block);
    }
    Ok(())
}

/// Applies `rules` to every block and value until none of them fires anymore.
fn apply_rewrites(
    func: &mut Func,
    config: &Config,
    pass: &'static str,
    rules: &RuleSet,
) -> Result<(), Ice> {
    let mut sweeps = 0;
    loop {
        if config.max_sweeps().is_some_and(|max| sweeps >= max) {
            return Err(Ice::NoFixpoint { pass, sweeps });
        }
        sweeps += 1;

        let mut changed = false;
        for block in func.blocks().to_vec() {
            changed |= forward_control_copy(func, block);
            changed |= rules.rewrite_block(func, block)?;

            for value in func.block(block).values().to_vec() {
                changed |= eliminate_trivial_phi(func, value);
                changed |= bypass_copies(func, value);
                changed |= rules.rewrite_value(func, value)?;
            }
        }
        if !changed {
            break;
        }
    }

    log::debug!(
        "{}: `{pass}` reached a fixpoint after {sweeps} sweeps",
        func.name()
    );
    if config.rule_log() {
        for (loc, fired) in rules.firing_counts() {
            log::debug!("{loc}: fired {fired} times");
        }
    }
    Ok(())
}

/// Follows a chain of copies to the first value that isn't one.
pub(super) fn copy_source(func: &Func, mut value: ValueId) -> ValueId {
    // Copies can only form a cycle in unreachable code, give up after as many steps as there are
    // values.
    for _ in 0..func.n_values() {
        if func.op(value) != Op::Copy {
            break;
        }
        value = func.value(value).arg(0);
    }
    value
}

pub(super) fn bypass_copies(func: &mut Func, value: ValueId) -> bool {
    let mut changed = false;
    for i in 0..func.value(value).args().len() {
        let arg = func.value(value).arg(i);
        if func.op(arg) != Op::Copy {
            continue;
        }
        let source = copy_source(func, arg);
        if source != arg && source != value {
            func.set_arg(value, i, source);
            changed = true;
        }
    }
    changed
}

fn forward_control_copy(func: &mut Func, block: BlockId) -> bool {
    let Some(control) = func.block(block).control() else {
        return false;
    };
    if func.op(control) != Op::Copy {
        return false;
    }
    let source = copy_source(func, control);
    func.set_control(block, Some(source));
    source != control
}

fn eliminate_trivial_phi(func: &mut Func, value: ValueId) -> bool {
    if func.op(value) != Op::Phi {
        return false;
    }
    let mut others = func
        .value(value)
        .args()
        .iter()
        .copied()
        .filter(|&arg| arg != value);
    let Some(first) = others.next() else {
        return false;
    };
    if others.any(|arg| arg != first) {
        return false;
    }
    func.replace_with_copy(value, first);
    true
}

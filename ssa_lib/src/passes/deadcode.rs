use crate::{Config, Ice};
use ssa_ir::Func;
use std::collections::HashSet;

/// Removes blocks unreachable from the entry block and values that nothing with a side effect
/// depends on.
pub(super) fn deadcode(func: &mut Func, _config: &Config) -> Result<(), Ice> {
    let reachable: HashSet<_> = func.reachable_blocks().into_iter().collect();
    let unreachable: Vec<_> = func
        .blocks()
        .iter()
        .copied()
        .filter(|block| !reachable.contains(block))
        .collect();
    for &block in &unreachable {
        func.remove_block(block);
    }

    let mut live = HashSet::new();
    let mut worklist = Vec::new();
    for &block in func.blocks() {
        let b = func.block(block);
        worklist.extend(b.control());
        worklist.extend(
            b.values()
                .iter()
                .copied()
                .filter(|&v| func.op(v).info().side_effects),
        );
    }
    while let Some(value) = worklist.pop() {
        if live.insert(value) {
            worklist.extend_from_slice(func.value(value).args());
        }
    }

    let dead: Vec<_> = func.values().filter(|v| !live.contains(v)).collect();
    for &value in &dead {
        func.remove_value(value);
    }
    if !unreachable.is_empty() || !dead.is_empty() {
        log::debug!(
            "{}: removed {} blocks and {} values",
            func.name(),
            unreachable.len(),
            dead.len()
        );
    }
    Ok(())
}

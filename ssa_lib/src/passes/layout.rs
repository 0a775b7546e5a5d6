use crate::{Config, Ice};
use ssa_ir::Func;
use std::collections::HashSet;

/// Orders the blocks so that a block is followed by its first successor whenever that one
/// isn't placed yet, which lets the code generator fall through instead of jumping.
pub(super) fn layout(func: &mut Func, _config: &Config) -> Result<(), Ice> {
    let Some(entry) = func.entry() else {
        return Ok(());
    };
    let mut placed = HashSet::new();
    let mut order = Vec::with_capacity(func.blocks().len());
    let mut next = Some(entry);

    while let Some(block) = next {
        placed.insert(block);
        order.push(block);
        next = func
            .block(block)
            .succs()
            .iter()
            .map(|edge| edge.block)
            .find(|succ| !placed.contains(succ))
            .or_else(|| {
                func.blocks()
                    .iter()
                    .copied()
                    .find(|b| !placed.contains(b))
            });
    }
    func.reorder_blocks(order);
    Ok(())
}

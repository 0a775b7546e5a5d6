use crate::{Config, Ice};
use ssa_ir::{Func, Op};

/// Splits every edge from a block with several successors into a block with phis, so the moves
/// feeding the phis have a block of their own.
pub(super) fn critical(func: &mut Func, _config: &Config) -> Result<(), Ice> {
    for block in func.blocks().to_vec() {
        if func.block(block).succs().len() < 2 {
            continue;
        }
        for i in 0..func.block(block).succs().len() {
            let succ = func.block(block).succ(i);
            let has_phis = func
                .block(succ)
                .values()
                .iter()
                .any(|&v| func.op(v) == Op::Phi);
            if has_phis {
                let middle = func.split_edge(block, i);
                log::trace!(
                    "{}: split {} -> {} with {}",
                    func.name(),
                    func.block_name(block),
                    func.block_name(succ),
                    func.block_name(middle)
                );
            }
        }
    }
    Ok(())
}

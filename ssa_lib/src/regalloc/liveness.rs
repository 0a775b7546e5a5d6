use ssa_ir::{BlockId, Func, Op, ValueId};
use std::collections::{HashMap, HashSet};

/// The values live at the start and at the end of every block.
///
/// A phi argument is live at the end of the predecessor it comes from, a phi itself is defined
/// at the start of its block.
#[derive(Debug, Clone, Default)]
pub struct LiveSets {
    pub live_in: HashMap<BlockId, HashSet<ValueId>>,
    pub live_out: HashMap<BlockId, HashSet<ValueId>>,
}

impl LiveSets {
    /// Only values for which `tracked` returns `true` are considered.
    pub fn build(func: &Func, tracked: impl Fn(ValueId) -> bool) -> Self {
        let mut uses: HashMap<BlockId, HashSet<ValueId>> = HashMap::new();
        let mut defs: HashMap<BlockId, HashSet<ValueId>> = HashMap::new();
        let mut phi_uses: HashMap<BlockId, HashSet<ValueId>> = HashMap::new();

        for &block in func.blocks() {
            let b = func.block(block);
            let block_defs = defs.entry(block).or_default();
            let block_uses = uses.entry(block).or_default();
            for &value in b.values() {
                if func.op(value) == Op::Phi {
                    for (edge, &arg) in b.preds().iter().zip(func.value(value).args()) {
                        if tracked(arg) {
                            phi_uses.entry(edge.block).or_default().insert(arg);
                        }
                    }
                } else {
                    for &arg in func.value(value).args() {
                        if tracked(arg) && !block_defs.contains(&arg) {
                            block_uses.insert(arg);
                        }
                    }
                }
                block_defs.insert(value);
            }
            if let Some(control) = b.control() {
                if tracked(control) && !block_defs.contains(&control) {
                    block_uses.insert(control);
                }
            }
        }

        let mut sets = Self::default();
        let mut changed = true;
        while changed {
            changed = false;
            for &block in func.blocks().iter().rev() {
                let mut out = phi_uses.get(&block).cloned().unwrap_or_default();
                for edge in func.block(block).succs() {
                    if let Some(succ_in) = sets.live_in.get(&edge.block) {
                        out.extend(succ_in.iter().copied());
                    }
                }

                let mut live_in = uses[&block].clone();
                live_in.extend(out.iter().copied().filter(|v| !defs[&block].contains(v)));

                if sets.live_in.get(&block) != Some(&live_in) {
                    sets.live_in.insert(block, live_in);
                    changed = true;
                }
                if sets.live_out.get(&block) != Some(&out) {
                    sets.live_out.insert(block, out);
                    changed = true;
                }
            }
        }
        sets
    }
}

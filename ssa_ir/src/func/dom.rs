use super::{BlockId, Func};
use std::collections::{BTreeMap, BTreeSet};

/// The dominator tree of the blocks reachable from the entry block.
#[derive(Debug, Clone)]
pub struct DominatorTree {
    entry_block: Option<BlockId>,
    /// Maps each reachable block to its immediate dominator (idom).
    immediate_dominators: BTreeMap<BlockId, Option<BlockId>>,
    /// Maps each reachable block to the blocks it is the idom of, in preorder of the CFG.
    rev_immediate_dominators: BTreeMap<BlockId, Vec<BlockId>>,
}

impl DominatorTree {
    pub(super) fn build_from(func: &Func) -> Self {
        // Slow quadratic algorithm from Wikipedia
        let reachable = func.reachable_blocks();
        let Some(&entry) = reachable.first() else {
            return Self {
                entry_block: None,
                immediate_dominators: BTreeMap::new(),
                rev_immediate_dominators: BTreeMap::new(),
            };
        };
        let all: BTreeSet<BlockId> = reachable.iter().copied().collect();

        let mut dominators = BTreeMap::new();
        dominators.insert(entry, BTreeSet::from([entry]));
        for &block in &reachable[1..] {
            dominators.insert(block, all.clone());
        }
        let mut changing = true;
        while changing {
            changing = false;
            for &block in &reachable[1..] {
                let mut pred_doms = func
                    .block(block)
                    .preds()
                    .iter()
                    .filter(|pred| all.contains(&pred.block))
                    .map(|pred| &dominators[&pred.block]);
                let Some(first_pred_doms) = pred_doms.next() else {
                    continue;
                };
                let mut new_dominators = first_pred_doms.clone();
                for doms in pred_doms {
                    new_dominators.retain(|b| doms.contains(b));
                }
                new_dominators.insert(block);
                if dominators[&block] != new_dominators {
                    changing = true;
                    dominators.insert(block, new_dominators);
                }
            }
        }

        // The immediate dominator is the strict dominator with the most dominators itself.
        let mut immediate_dominators = BTreeMap::new();
        let mut rev_immediate_dominators: BTreeMap<BlockId, Vec<BlockId>> =
            reachable.iter().map(|&b| (b, Vec::new())).collect();
        for &block in &reachable {
            let idom = dominators[&block]
                .iter()
                .filter(|&&d| d != block)
                .max_by_key(|&&d| dominators[&d].len())
                .copied();
            immediate_dominators.insert(block, idom);
            if let Some(idom) = idom {
                rev_immediate_dominators
                    .get_mut(&idom)
                    .expect("idom should be reachable")
                    .push(block);
            }
        }

        Self {
            entry_block: Some(entry),
            immediate_dominators,
            rev_immediate_dominators,
        }
    }

    /// Returns the immediate dominator (idom) of the block.
    ///
    /// From Wikipedia:
    /// > The _immediate dominator_ or **idom** of a node n is the unique node that strictly
    /// > dominates n but does not strictly dominate any other node that strictly dominates n. Every
    /// > node, except the entry node, has an immediate dominator.
    pub fn immediate_dominator(&self, block: BlockId) -> Option<BlockId> {
        self.immediate_dominators.get(&block).copied().flatten()
    }

    /// Returns an iterator over the block's dominators, starting from the block itself.
    pub fn dominators(&self, block: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        let current = self.is_reachable(block).then_some(block);
        Dominators {
            tree: self,
            current,
        }
    }

    /// Returns `true` if the block is reachable from the entry block.
    pub fn is_reachable(&self, block: BlockId) -> bool {
        self.immediate_dominators.contains_key(&block)
    }

    pub fn dominates(&self, dominator: BlockId, dominated: BlockId) -> bool {
        self.dominators(dominated).any(|block| block == dominator)
    }

    pub fn strictly_dominates(&self, dominator: BlockId, dominated: BlockId) -> bool {
        dominator != dominated && self.dominates(dominator, dominated)
    }

    /// Returns the blocks immediately dominated by `block`.
    pub fn children(&self, block: BlockId) -> &[BlockId] {
        self.rev_immediate_dominators
            .get(&block)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn dfs_preorder(&self) -> DominatorTreeDfsPreorder {
        DominatorTreeDfsPreorder {
            tree: self,
            stack: self.entry_block.into_iter().collect(),
        }
    }
}

#[derive(Debug)]
struct Dominators<'a> {
    tree: &'a DominatorTree,
    current: Option<BlockId>,
}

impl Iterator for Dominators<'_> {
    type Item = BlockId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current.take()?;
        self.current = self.tree.immediate_dominator(current);
        Some(current)
    }
}

#[derive(Debug)]
pub struct DominatorTreeDfsPreorder<'a> {
    tree: &'a DominatorTree,
    stack: Vec<BlockId>,
}

impl Iterator for DominatorTreeDfsPreorder<'_> {
    type Item = BlockId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        self.stack.extend(self.tree.children(current).iter().rev());
        Some(current)
    }
}

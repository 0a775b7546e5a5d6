//! The SSA graph of a single function.
//!
//! Values and blocks live in arenas owned by the [`Func`]. Everything else refers to them by id,
//! ids stay valid (and are never reused) until the value or block is removed.


mod dom;

pub use dom::{DominatorTree, DominatorTreeDfsPreorder};

use crate::{Aux, BlockKind, Op, Type};
use arrayvec::ArrayVec;
use generational_arena::{Arena, Index as ArenaIndex};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValueId(ArenaIndex);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(ArenaIndex);

/// One end of a control flow edge. `block.succs[i] == Edge { block: s, index: j }` implies
/// `s.preds[j] == Edge { block, index: i }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub block: BlockId,
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct Value {
    num: u32,
    op: Op,
    ty: Type,
    args: Vec<ValueId>,
    aux: Aux,
    block: BlockId,
}

impl Value {
    /// The number used to name this value (`v12`).
    pub fn num(&self) -> u32 {
        self.num
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn args(&self) -> &[ValueId] {
        &self.args
    }

    pub fn arg(&self, i: usize) -> ValueId {
        self.args[i]
    }

    pub fn aux(&self) -> &Aux {
        &self.aux
    }

    pub fn block(&self) -> BlockId {
        self.block
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    num: u32,
    kind: BlockKind,
    values: Vec<ValueId>,
    control: Option<ValueId>,
    succs: ArrayVec<Edge, 2>,
    preds: Vec<Edge>,
}

impl Block {
    /// The number used to name this block (`b3`).
    pub fn num(&self) -> u32 {
        self.num
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn values(&self) -> &[ValueId] {
        &self.values
    }

    pub fn control(&self) -> Option<ValueId> {
        self.control
    }

    pub fn succs(&self) -> &[Edge] {
        &self.succs
    }

    pub fn preds(&self) -> &[Edge] {
        &self.preds
    }

    pub fn succ(&self, i: usize) -> BlockId {
        self.succs[i].block
    }

    pub fn pred(&self, i: usize) -> BlockId {
        self.preds[i].block
    }
}

#[derive(Debug, Clone)]
pub struct Func {
    name: String,
    values: Arena<Value>,
    blocks: Arena<Block>,
    /// All blocks, in a deterministic order. The first one is the entry block.
    order: Vec<BlockId>,
    next_value_num: u32,
    next_block_num: u32,
}

impl Func {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Arena::new(),
            blocks: Arena::new(),
            order: Vec::new(),
            next_value_num: 1,
            next_block_num: 1,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry(&self) -> Option<BlockId> {
        self.order.first().copied()
    }

    /// The blocks of this function, entry block first.
    pub fn blocks(&self) -> &[BlockId] {
        &self.order
    }

    pub fn block(&self, block: BlockId) -> &Block {
        &self.blocks[block.0]
    }

    pub fn value(&self, value: ValueId) -> &Value {
        &self.values[value.0]
    }

    pub fn contains_value(&self, value: ValueId) -> bool {
        self.values.contains(value.0)
    }

    pub fn contains_block(&self, block: BlockId) -> bool {
        self.blocks.contains(block.0)
    }

    pub fn n_values(&self) -> usize {
        self.values.len()
    }

    /// Iterates over all values, block by block.
    pub fn values(&self) -> impl Iterator<Item = ValueId> + '_ {
        self.order
            .iter()
            .flat_map(|&b| self.block(b).values.iter().copied())
    }

    pub fn op(&self, value: ValueId) -> Op {
        self.value(value).op
    }

    pub fn ty(&self, value: ValueId) -> &Type {
        &self.value(value).ty
    }

    /// Appends a new block. The first block created becomes the entry block.
    pub fn new_block(&mut self, kind: BlockKind) -> BlockId {
        let num = self.next_block_num;
        self.next_block_num += 1;
        self.insert_block(num, kind)
    }

    pub(crate) fn insert_block(&mut self, num: u32, kind: BlockKind) -> BlockId {
        self.next_block_num = self.next_block_num.max(num + 1);
        let id = BlockId(self.blocks.insert(Block {
            num,
            kind,
            values: Vec::new(),
            control: None,
            succs: ArrayVec::new(),
            preds: Vec::new(),
        }));
        self.order.push(id);
        id
    }

    /// Appends a new value to `block`.
    ///
    /// Panics if the number of arguments doesn't match the arity of `op`.
    pub fn new_value(
        &mut self,
        block: BlockId,
        op: Op,
        ty: Type,
        args: &[ValueId],
        aux: Aux,
    ) -> ValueId {
        assert_arity(op, args.len());
        let id = self.alloc_value(block, op, ty, args.to_vec(), aux);
        self.blocks[block.0].values.push(id);
        id
    }

    /// Creates a new value in the block of `anchor`, right before it.
    ///
    /// Panics if the number of arguments doesn't match the arity of `op`.
    pub fn insert_value_before(
        &mut self,
        anchor: ValueId,
        op: Op,
        ty: Type,
        args: &[ValueId],
        aux: Aux,
    ) -> ValueId {
        assert_arity(op, args.len());
        let block = self.value(anchor).block;
        let id = self.alloc_value(block, op, ty, args.to_vec(), aux);
        let values = &mut self.blocks[block.0].values;
        let pos = values
            .iter()
            .position(|&v| v == anchor)
            .expect("value should be in its block");
        values.insert(pos, id);
        id
    }

    fn alloc_value(
        &mut self,
        block: BlockId,
        op: Op,
        ty: Type,
        args: Vec<ValueId>,
        aux: Aux,
    ) -> ValueId {
        let num = self.next_value_num;
        self.next_value_num += 1;
        ValueId(self.values.insert(Value {
            num,
            op,
            ty,
            args,
            aux,
            block,
        }))
    }

    /// Appends a value numbered `num` to `block`, without arguments yet. New values are numbered
    /// after the highest number inserted this way.
    pub(crate) fn insert_value(
        &mut self,
        block: BlockId,
        num: u32,
        op: Op,
        ty: Type,
        aux: Aux,
    ) -> ValueId {
        self.next_value_num = self.next_value_num.max(num + 1);
        let id = ValueId(self.values.insert(Value {
            num,
            op,
            ty,
            args: Vec::new(),
            aux,
            block,
        }));
        self.blocks[block.0].values.push(id);
        id
    }

    /// Overwrites `value` in place. Everything referring to `value` now refers to the new
    /// operation.
    ///
    /// Panics if the number of arguments doesn't match the arity of `op`.
    pub fn replace_with(&mut self, value: ValueId, op: Op, ty: Type, args: &[ValueId], aux: Aux) {
        assert_arity(op, args.len());
        let v = &mut self.values[value.0];
        v.op = op;
        v.ty = ty;
        v.args.clear();
        v.args.extend_from_slice(args);
        v.aux = aux;
    }

    /// Turns `value` into a copy of `source`, taking over its type.
    pub fn replace_with_copy(&mut self, value: ValueId, source: ValueId) {
        let ty = self.value(source).ty.clone();
        self.replace_with(value, Op::Copy, ty, &[source], Aux::None);
    }

    pub fn set_arg(&mut self, value: ValueId, i: usize, arg: ValueId) {
        self.values[value.0].args[i] = arg;
    }

    pub(crate) fn set_args(&mut self, value: ValueId, args: Vec<ValueId>) {
        self.values[value.0].args = args;
    }

    pub fn set_type(&mut self, value: ValueId, ty: Type) {
        self.values[value.0].ty = ty;
    }

    /// Removes a value from its block and from the function. Any uses of it are left dangling.
    pub fn remove_value(&mut self, value: ValueId) {
        let Some(v) = self.values.remove(value.0) else {
            return;
        };
        let values = &mut self.blocks[v.block.0].values;
        if let Some(pos) = values.iter().position(|&w| w == value) {
            values.remove(pos);
        }
    }

    /// Replaces the order of the values of `block`. The new order must be a permutation of the
    /// current one.
    pub fn reorder_values(&mut self, block: BlockId, order: Vec<ValueId>) {
        let values = &mut self.blocks[block.0].values;
        debug_assert_eq!(
            values.iter().collect::<BTreeSet<_>>(),
            order.iter().collect::<BTreeSet<_>>(),
            "reordering must keep the same values"
        );
        *values = order;
    }

    /// Replaces the order of the blocks. The new order must be a permutation of the current one
    /// and keep the entry block first.
    pub fn reorder_blocks(&mut self, order: Vec<BlockId>) {
        debug_assert_eq!(self.order.len(), order.len());
        debug_assert_eq!(self.order.first(), order.first());
        self.order = order;
    }

    pub fn set_kind(&mut self, block: BlockId, kind: BlockKind) {
        self.blocks[block.0].kind = kind;
    }

    pub fn set_control(&mut self, block: BlockId, control: Option<ValueId>) {
        self.blocks[block.0].control = control;
    }

    /// Adds an edge from `from` to `to`, making `to` the last successor of `from` and `from` the
    /// last predecessor of `to`.
    pub fn add_edge(&mut self, from: BlockId, to: BlockId) {
        let succ_index = self.block(from).succs.len();
        let pred_index = self.block(to).preds.len();
        self.blocks[from.0].succs.push(Edge {
            block: to,
            index: pred_index,
        });
        self.blocks[to.0].preds.push(Edge {
            block: from,
            index: succ_index,
        });
    }

    /// Removes the `i`th successor edge of `block`. The successor loses the matching
    /// predecessor, and every phi in the successor loses the matching argument.
    pub fn remove_edge(&mut self, block: BlockId, i: usize) {
        let Edge {
            block: succ,
            index: j,
        } = self.blocks[block.0].succs.remove(i);
        self.relink_succs(block, i);

        self.blocks[succ.0].preds.remove(j);
        self.relink_preds(succ, j);

        let phis: Vec<_> = self
            .block(succ)
            .values
            .iter()
            .copied()
            .filter(|&v| self.value(v).op == Op::Phi)
            .collect();
        for phi in phis {
            self.values[phi.0].args.remove(j);
        }
        log::trace!(
            "removed edge b{} -> b{}",
            self.block(block).num,
            self.block(succ).num
        );
    }

    /// Swaps the two successors of `block`.
    pub fn swap_successors(&mut self, block: BlockId) {
        self.blocks[block.0].succs.swap(0, 1);
        self.relink_succs(block, 0);
    }

    /// Inserts a new plain block on the `i`th successor edge of `block`. Phi arguments of the
    /// old successor keep their position.
    pub fn split_edge(&mut self, block: BlockId, i: usize) -> BlockId {
        let Edge {
            block: succ,
            index: j,
        } = self.block(block).succs[i];
        let middle = self.new_block(BlockKind::Plain);
        self.blocks[block.0].succs[i] = Edge {
            block: middle,
            index: 0,
        };
        self.blocks[middle.0].preds.push(Edge { block, index: i });
        self.blocks[middle.0].succs.push(Edge {
            block: succ,
            index: j,
        });
        self.blocks[succ.0].preds[j] = Edge {
            block: middle,
            index: 0,
        };
        middle
    }

    /// Removes a block with all its values and edges.
    pub fn remove_block(&mut self, block: BlockId) {
        while !self.block(block).succs.is_empty() {
            let last = self.block(block).succs.len() - 1;
            self.remove_edge(block, last);
        }
        while let Some(&Edge { block: pred, index }) = self.block(block).preds.last() {
            self.remove_edge(pred, index);
        }
        let removed = self.blocks.remove(block.0).expect("block should exist");
        for value in removed.values {
            self.values.remove(value.0);
        }
        self.order.retain(|&b| b != block);
    }

    /// Fixes the reverse edges of the successors of `block` from index `from` on.
    fn relink_succs(&mut self, block: BlockId, from: usize) {
        let succs: Vec<_> = self.block(block).succs[from..].to_vec();
        for (k, edge) in succs.into_iter().enumerate() {
            self.blocks[edge.block.0].preds[edge.index].index = from + k;
        }
    }

    /// Fixes the reverse edges of the predecessors of `block` from index `from` on.
    fn relink_preds(&mut self, block: BlockId, from: usize) {
        let preds: Vec<_> = self.block(block).preds[from..].to_vec();
        for (k, edge) in preds.into_iter().enumerate() {
            self.blocks[edge.block.0].succs[edge.index].index = from + k;
        }
    }

    /// Returns the blocks reachable from the entry block, in depth-first preorder.
    pub fn reachable_blocks(&self) -> Vec<BlockId> {
        let Some(entry) = self.entry() else {
            return Vec::new();
        };
        let mut seen = BTreeSet::from([entry]);
        let mut order = Vec::new();
        let mut stack = vec![entry];
        while let Some(block) = stack.pop() {
            order.push(block);
            for edge in self.block(block).succs.iter().rev() {
                if seen.insert(edge.block) {
                    stack.push(edge.block);
                }
            }
        }
        order
    }

    pub fn dominator_tree(&self) -> DominatorTree {
        DominatorTree::build_from(self)
    }

    /// Counts how often each value is used as an argument or a control value.
    pub fn use_counts(&self) -> HashMap<ValueId, usize> {
        let mut uses = HashMap::new();
        for &block in &self.order {
            let b = self.block(block);
            for &v in &b.values {
                for &arg in &self.value(v).args {
                    *uses.entry(arg).or_insert(0) += 1;
                }
            }
            if let Some(control) = b.control {
                *uses.entry(control).or_insert(0) += 1;
            }
        }
        uses
    }

    /// Index of `value` in its block.
    pub fn position(&self, value: ValueId) -> usize {
        let block = self.value(value).block;
        self.block(block)
            .values
            .iter()
            .position(|&v| v == value)
            .expect("value should be in its block")
    }

    /// The name of a value as printed (`v12`).
    pub fn value_name(&self, value: ValueId) -> String {
        match self.values.get(value.0) {
            Some(v) => format!("v{}", v.num),
            None => "<removed value>".to_owned(),
        }
    }

    /// The name of a block as printed (`b3`).
    pub fn block_name(&self, block: BlockId) -> String {
        match self.blocks.get(block.0) {
            Some(b) => format!("b{}", b.num),
            None => "<removed block>".to_owned(),
        }
    }
}

fn assert_arity(op: Op, n: usize) {
    if !op.info().arity.accepts(n) {
        panic!(
            "internal compiler error: `{op}` takes {:?} arguments, got {n}",
            op.info().arity
        );
    }
}

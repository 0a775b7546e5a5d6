use super::rewrite::{copy_source, copyelim};
use crate::{Config, Ice};
use ssa_ir::{Aux, Func, Op, Type, ValueId};
use std::collections::HashMap;

#[derive(PartialEq, Eq, Hash)]
struct Key {
    op: Op,
    ty: Type,
    aux: Aux,
    args: Vec<ValueId>,
}

fn key(func: &Func, value: ValueId) -> Option<Key> {
    let v = func.value(value);
    let info = v.op().info();
    if info.side_effects || info.call || v.ty().has_memory() || matches!(v.op(), Op::Phi | Op::Copy)
    {
        return None;
    }
    let mut args: Vec<_> = v.args().iter().map(|&arg| copy_source(func, arg)).collect();
    if info.commutative {
        args.sort();
    }
    Some(Key {
        op: v.op(),
        ty: v.ty().clone(),
        aux: v.aux().clone(),
        args,
    })
}

/// Replaces values computing the same thing as a dominating value by a copy of it.
pub(super) fn cse(func: &mut Func, config: &Config) -> Result<(), Ice> {
    let tree = func.dominator_tree();
    let mut seen: HashMap<Key, Vec<ValueId>> = HashMap::new();
    let mut replaced = 0;

    for block in tree.dfs_preorder() {
        for value in func.block(block).values().to_vec() {
            let Some(key) = key(func, value) else {
                continue;
            };
            let candidates = seen.entry(key).or_default();
            let found = candidates.iter().copied().find(|&other| {
                let other_block = func.value(other).block();
                other_block == block || tree.strictly_dominates(other_block, block)
            });
            match found {
                Some(other) => {
                    func.replace_with_copy(value, other);
                    replaced += 1;
                }
                None => candidates.push(value),
            }
        }
    }

    if replaced > 0 {
        log::debug!("{}: replaced {replaced} common subexpressions", func.name());
        copyelim(func, config)?;
    }
    Ok(())
}

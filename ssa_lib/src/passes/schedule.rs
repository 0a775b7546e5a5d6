use crate::{Config, Ice};
use ssa_ir::{BlockId, Func, Op, ValueId};
use std::collections::{HashMap, HashSet};

/// Reads a result its argument left in a place nothing else may touch in between (HI and LO,
/// the result register of a call, the FPU condition flag).
fn is_glued(func: &Func, value: ValueId) -> bool {
    matches!(
        func.op(value),
        Op::Select0 | Op::Select1 | Op::FPFlagTrue | Op::FPFlagFalse
    )
}

/// Puts the values of every block in the order they will be emitted: phis first, then the other
/// values in dependency order with the control value as late as possible. A store or call comes
/// after the loads of the memory it overwrites. Values that read a
/// result from a fixed location are moved right behind the value producing it.
pub(super) fn schedule(func: &mut Func, _config: &Config) -> Result<(), Ice> {
    for block in func.blocks().to_vec() {
        let order = schedule_block(func, block);
        func.reorder_values(block, order);
    }
    Ok(())
}

fn schedule_block(func: &Func, block: BlockId) -> Vec<ValueId> {
    let b = func.block(block);
    let in_block: HashSet<_> = b.values().iter().copied().collect();
    // A control reading memory must stay in front of later stores.
    let control = b.control().filter(|&control| {
        in_block.contains(&control)
            && !func
                .value(control)
                .args()
                .iter()
                .any(|&arg| func.ty(arg).has_memory())
    });

    // Glued values waiting for a producer in this block.
    let waits = |value: ValueId| {
        is_glued(func, value) && in_block.contains(&func.value(value).arg(0))
    };

    let mut done = HashSet::new();
    let mut order = Vec::with_capacity(b.values().len());
    for &value in b.values() {
        if func.op(value) == Op::Phi {
            done.insert(value);
            order.push(value);
        }
    }
    for &value in b.values() {
        if is_glued(func, value) && !waits(value) {
            done.insert(value);
            order.push(value);
        }
    }

    // The values of this block reading each memory state.
    let mut readers: HashMap<ValueId, Vec<ValueId>> = HashMap::new();
    for &value in b.values() {
        if func.op(value) == Op::Phi {
            continue;
        }
        for &arg in func.value(value).args() {
            if func.ty(arg).is_memory() {
                readers.entry(arg).or_default().push(value);
            }
        }
    }

    // A value producing a new memory state waits for every other reader of the state it
    // replaces.
    let ready = |done: &HashSet<ValueId>, value: ValueId| {
        let v = func.value(value);
        let args_done = v
            .args()
            .iter()
            .all(|arg| !in_block.contains(arg) || done.contains(arg));
        let readers_done = !v.ty().has_memory()
            || v.op() == Op::Phi
            || v
                .args()
                .iter()
                .filter_map(|arg| readers.get(arg))
                .flatten()
                .all(|&reader| reader == value || done.contains(&reader));
        args_done && readers_done
    };

    while order.len() < b.values().len() {
        let pending = || b.values().iter().copied().filter(|v| !done.contains(v));
        let next = pending()
            .find(|&v| Some(v) != control && !waits(v) && ready(&done, v))
            .or_else(|| pending().find(|&v| ready(&done, v)))
            .or_else(|| pending().next());
        let Some(next) = next else {
            break;
        };
        done.insert(next);
        order.push(next);

        for &user in b.values() {
            if !done.contains(&user)
                && waits(user)
                && func.value(user).arg(0) == next
                && ready(&done, user)
            {
                done.insert(user);
                order.push(user);
            }
        }
    }
    order
}

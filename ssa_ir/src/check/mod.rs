//! Structural checks of a [`Func`].
//!
//! Every pass must leave the function in a state that passes [`check_func`]. A failure means a
//! bug in the compiler (or in a rule file), never in the program being compiled.

#[cfg(test)]
mod test;

use crate::{func::Edge, Arity, BlockId, ControlKind, Func, Op, Registry, ValueId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckError {
    /// The function has no blocks at all.
    #[error("function has no entry block")]
    MissingEntryBlock,
    #[error("entry block {block} has predecessors")]
    EntryHasPredecessors { block: String },
    /// A block kind of another architecture.
    #[error("{block}: block kind `{kind}` is not available here")]
    ForeignKind { block: String, kind: String },
    /// The number of successors doesn't match the block kind.
    #[error("{block}: `{kind}` needs {expected} successors, has {found}")]
    SuccessorCount {
        block: String,
        kind: String,
        expected: usize,
        found: usize,
    },
    #[error("{block}: `{kind}` needs a control value")]
    MissingControl { block: String, kind: String },
    #[error("{block}: `{kind}` can't have a control value")]
    UnexpectedControl { block: String, kind: String },
    /// The control value has a type the block kind can't test.
    #[error("{block}: `{kind}` can't be controlled by {value} of type {ty}")]
    ControlType {
        block: String,
        kind: String,
        value: String,
        ty: String,
    },
    /// The reverse index of an edge doesn't point back to it.
    #[error("edge {from} -> {to} is not mirrored")]
    BrokenEdge { from: String, to: String },
    /// A value listed in a block that claims another block as its owner.
    #[error("{value} is listed in {block} but belongs to another block")]
    WrongBlock { value: String, block: String },
    #[error("{value}: `{op}` is not available here")]
    ForeignOp { value: String, op: String },
    #[error("{value}: `{op}` takes {expected} arguments, got {found}")]
    Arity {
        value: String,
        op: String,
        expected: usize,
        found: usize,
    },
    #[error("{value}: `{op}` can't carry the payload {aux}")]
    AuxKind {
        value: String,
        op: String,
        aux: String,
    },
    /// A phi needs exactly one argument per predecessor.
    #[error("{value}: phi has {found} arguments but {block} has {expected} predecessors")]
    PhiArguments {
        value: String,
        block: String,
        expected: usize,
        found: usize,
    },
    /// A phi anywhere but at the start of its block.
    #[error("{value}: phi after a non-phi value")]
    PhiPosition { value: String },
    /// A use of a removed value.
    #[error("{user}: uses a removed value")]
    DanglingArgument { user: String },
    /// A use of a value that doesn't dominate the use (SSA violation).
    #[error("{user}: argument {arg} does not dominate its use")]
    Dominance { user: String, arg: String },
}

/// Checks that `func` is well formed for `registry`. Returns the first problem found.
///
/// Blocks that are unreachable from the entry block are checked structurally, but dominance is
/// only checked for reachable blocks.
pub fn check_func(func: &Func, registry: &Registry) -> Result<(), CheckError> {
    let Some(entry) = func.entry() else {
        return Err(CheckError::MissingEntryBlock);
    };
    if !func.block(entry).preds().is_empty() {
        return Err(CheckError::EntryHasPredecessors {
            block: func.block_name(entry),
        });
    }
    for &block in func.blocks() {
        check_block(func, registry, block)?;
        for &value in func.block(block).values() {
            check_value(func, registry, block, value)?;
        }
    }
    check_dominance(func)
}

fn check_block(func: &Func, registry: &Registry, block: BlockId) -> Result<(), CheckError> {
    let b = func.block(block);
    let kind = b.kind();
    let name = || func.block_name(block);
    if !registry.contains_kind(kind) {
        return Err(CheckError::ForeignKind {
            block: name(),
            kind: kind.to_string(),
        });
    }
    if b.succs().len() != kind.succs() {
        return Err(CheckError::SuccessorCount {
            block: name(),
            kind: kind.to_string(),
            expected: kind.succs(),
            found: b.succs().len(),
        });
    }

    for (i, edge) in b.succs().iter().enumerate() {
        check_mirrored(func, block, *edge, Edge { block, index: i }, true)?;
    }
    for (i, edge) in b.preds().iter().enumerate() {
        check_mirrored(func, block, *edge, Edge { block, index: i }, false)?;
    }

    let control_kind = kind.info().control;
    match (control_kind, b.control()) {
        (ControlKind::None, None) | (ControlKind::Optional, None) => Ok(()),
        (ControlKind::None, Some(_)) => Err(CheckError::UnexpectedControl {
            block: name(),
            kind: kind.to_string(),
        }),
        (_, None) => Err(CheckError::MissingControl {
            block: name(),
            kind: kind.to_string(),
        }),
        (_, Some(control)) if !func.contains_value(control) => {
            Err(CheckError::DanglingArgument { user: name() })
        }
        (control_kind, Some(control)) => {
            let ty = func.ty(control);
            let ok = match control_kind {
                ControlKind::Value | ControlKind::Optional => ty.is_register_sized(),
                ControlKind::Flags => ty.is_flags(),
                ControlKind::Call => ty.has_memory(),
                ControlKind::None => unreachable!(),
            };
            if ok {
                Ok(())
            } else {
                Err(CheckError::ControlType {
                    block: name(),
                    kind: kind.to_string(),
                    value: func.value_name(control),
                    ty: ty.to_string(),
                })
            }
        }
    }
}

/// Checks that `edge`, stored at `back` (in the successors when `succ` is set), points to an edge
/// that points back.
fn check_mirrored(
    func: &Func,
    block: BlockId,
    edge: Edge,
    back: Edge,
    succ: bool,
) -> Result<(), CheckError> {
    let broken = || {
        let (from, to) = if succ {
            (block, edge.block)
        } else {
            (edge.block, block)
        };
        CheckError::BrokenEdge {
            from: func.block_name(from),
            to: func.block_name(to),
        }
    };
    if !func.contains_block(edge.block) {
        return Err(broken());
    }
    let other = func.block(edge.block);
    let mirror = if succ {
        other.preds().get(edge.index)
    } else {
        other.succs().get(edge.index)
    };
    if mirror == Some(&back) {
        Ok(())
    } else {
        Err(broken())
    }
}

fn check_value(
    func: &Func,
    registry: &Registry,
    block: BlockId,
    value: ValueId,
) -> Result<(), CheckError> {
    let v = func.value(value);
    let name = || func.value_name(value);
    if v.block() != block {
        return Err(CheckError::WrongBlock {
            value: name(),
            block: func.block_name(block),
        });
    }
    if !registry.contains(v.op()) {
        return Err(CheckError::ForeignOp {
            value: name(),
            op: v.op().to_string(),
        });
    }
    let info = v.op().info();
    match info.arity {
        Arity::Fixed(n) if n as usize != v.args().len() => {
            return Err(CheckError::Arity {
                value: name(),
                op: v.op().to_string(),
                expected: n as usize,
                found: v.args().len(),
            })
        }
        _ => {}
    }
    if !v.aux().kind_matches(info.aux) {
        return Err(CheckError::AuxKind {
            value: name(),
            op: v.op().to_string(),
            aux: format!("{:?}", v.aux()),
        });
    }
    if v.args().iter().any(|&arg| !func.contains_value(arg)) {
        return Err(CheckError::DanglingArgument { user: name() });
    }
    if v.op() == Op::Phi {
        let preds = func.block(block).preds().len();
        if v.args().len() != preds {
            return Err(CheckError::PhiArguments {
                value: name(),
                block: func.block_name(block),
                expected: preds,
                found: v.args().len(),
            });
        }
        let pos = func.position(value);
        if func.block(block).values()[..pos]
            .iter()
            .any(|&other| func.op(other) != Op::Phi)
        {
            return Err(CheckError::PhiPosition { value: name() });
        }
    }
    Ok(())
}

fn check_dominance(func: &Func) -> Result<(), CheckError> {
    let dom = func.dominator_tree();
    // Whether the definition of `arg` is available at position `pos` of `block`.
    let available = |arg: ValueId, block: BlockId, pos: usize| {
        let def_block = func.value(arg).block();
        if def_block == block {
            func.position(arg) < pos
        } else {
            dom.strictly_dominates(def_block, block)
        }
    };

    for &block in func.blocks() {
        if !dom.is_reachable(block) {
            continue;
        }
        let b = func.block(block);
        for (pos, &value) in b.values().iter().enumerate() {
            let v = func.value(value);
            for (i, &arg) in v.args().iter().enumerate() {
                let ok = if v.op() == Op::Phi {
                    // The argument is used at the end of the matching predecessor.
                    let pred = b.pred(i);
                    let def_block = func.value(arg).block();
                    !dom.is_reachable(pred) || dom.dominates(def_block, pred)
                } else {
                    available(arg, block, pos)
                };
                if !ok {
                    return Err(CheckError::Dominance {
                        user: func.value_name(value),
                        arg: func.value_name(arg),
                    });
                }
            }
        }
        if let Some(control) = b.control() {
            if !available(control, block, b.values().len()) {
                return Err(CheckError::Dominance {
                    user: func.block_name(block),
                    arg: func.value_name(control),
                });
            }
        }
    }
    Ok(())
}

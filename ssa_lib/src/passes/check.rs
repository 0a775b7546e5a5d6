use crate::{Config, Ice};
use ssa_ir::{check_func, Arch, Func};

/// Rejects input using anything but generic operations, then checks the function is well formed.
pub(super) fn check_input(func: &mut Func, config: &Config) -> Result<(), Ice> {
    for &block in func.blocks() {
        let kind = func.block(block).kind();
        if kind.arch() != Arch::Generic {
            return Err(Ice::Unsupported(format!(
                "{}: input uses the target block kind `{kind}`",
                func.block_name(block)
            )));
        }
    }
    if let Some(value) = func.values().find(|&v| !func.op(v).is_generic()) {
        return Err(Ice::Unsupported(format!(
            "{}: input uses the target operation `{}`",
            func.value_name(value),
            func.op(value)
        )));
    }
    check_func(func, config.registry()).map_err(|source| Ice::Check {
        pass: "check input",
        source,
    })
}

/// Checks that lowering left no generic operation or block kind the code generator can't handle.
pub(super) fn check_lowered(func: &mut Func, _config: &Config) -> Result<(), Ice> {
    for &block in func.blocks() {
        let b = func.block(block);
        for &value in b.values() {
            let info = func.op(value).info();
            if func.op(value).is_generic() && !info.lowered_ok {
                return Err(Ice::Unlowered {
                    op: info.name,
                    value: func.value_name(value),
                    block: func.block_name(block),
                });
            }
        }
        let info = b.kind().info();
        if b.kind().arch() == Arch::Generic && !info.lowered_ok {
            return Err(Ice::UnloweredBlock {
                kind: info.name,
                block: func.block_name(block),
            });
        }
    }
    Ok(())
}

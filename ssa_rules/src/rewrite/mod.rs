//! Applying compiled rules to a function.


use crate::{
    compile::{
        compile_block_rule, compile_value_rule, expand_commutative, Build, CompiledBlockRule,
        CompiledValueRule, NodeBuild, NodePat, Pat, Restr, TyBuild, VarPat,
    },
    expr::{Slots, Val},
    read_rules,
    syntax::{parse_rule, Sexpr},
    EvalError, Loc, RuleError,
};
use ssa_ir::{Aux, AuxKind, BlockId, BlockKind, Func, Op, Registry, Type, ValueId};
use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicUsize, Ordering},
};

/// A rule together with where it came from and how often it fired.
#[derive(Debug)]
pub struct Rule<R> {
    loc: Loc,
    text: String,
    compiled: R,
    fired: AtomicUsize,
}

impl<R> Rule<R> {
    pub fn loc(&self) -> &Loc {
        &self.loc
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn fired(&self) -> usize {
        self.fired.load(Ordering::Relaxed)
    }

    fn fire(&self, func: &Func, what: &dyn std::fmt::Display) {
        self.fired.fetch_add(1, Ordering::Relaxed);
        log::trace!("{}: rewrote {} in {}", self.loc, what, func.name());
    }
}

pub type ValueRule = Rule<CompiledValueRule>;
pub type BlockRule = Rule<CompiledBlockRule>;

/// The compiled rules of one rule file, dispatched on the operation of the rewritten value or the
/// kind of the rewritten block.
#[derive(Debug)]
pub struct RuleSet {
    name: String,
    value_rules: Vec<Vec<ValueRule>>,
    block_rules: Vec<Vec<BlockRule>>,
}

/// Fails if a rule from another line already matches everything `new` could match.
fn check_reachable<R>(
    rules: &[Rule<R>],
    always: impl Fn(&R) -> bool,
    new: &Loc,
) -> Result<(), RuleError> {
    match rules.iter().find(|rule| always(&rule.compiled)) {
        Some(rule) if rule.loc != *new => Err(RuleError::syntax(
            new,
            format!("rule can never fire, {} always matches first", rule.loc),
        )),
        _ => Ok(()),
    }
}

impl RuleSet {
    /// Compiles the rules in `src`. `file` names the source in error messages and firing logs.
    ///
    /// Every operation and block kind the rules mention must be in `registry`.
    pub fn compile(file: &str, src: &str, registry: &Registry) -> Result<Self, RuleError> {
        let mut set = Self {
            name: file.to_owned(),
            value_rules: (0..Op::ALL.len()).map(|_| Vec::new()).collect(),
            block_rules: (0..BlockKind::ALL.len()).map(|_| Vec::new()).collect(),
        };

        for rule_text in read_rules(file, src)? {
            let loc = &rule_text.loc;
            let syntax =
                parse_rule(&rule_text.text).map_err(|message| RuleError::syntax(loc, message))?;

            if let Some(kind) = registry.lookup_kind(&syntax.lhs.head) {
                let lhss = match syntax.lhs.args.first() {
                    Some(Sexpr::Node(control)) => expand_commutative(control, registry, &syntax)
                        .into_iter()
                        .map(|control| {
                            let mut lhs = syntax.lhs.clone();
                            lhs.args[0] = Sexpr::Node(control);
                            lhs
                        })
                        .collect(),
                    _ => vec![syntax.lhs.clone()],
                };
                for lhs in lhss {
                    let compiled = compile_block_rule(
                        loc,
                        registry,
                        kind,
                        &lhs,
                        syntax.guard.as_deref(),
                        &syntax.rhs,
                    )?;
                    let rules = &mut set.block_rules[kind.index()];
                    check_reachable(rules, CompiledBlockRule::always_matches, loc)?;
                    rules.push(Rule {
                        loc: loc.clone(),
                        text: rule_text.text.clone(),
                        compiled,
                        fired: AtomicUsize::new(0),
                    });
                }
                continue;
            }

            if registry.lookup(&syntax.lhs.head).is_none() {
                return Err(RuleError::syntax(
                    loc,
                    format!("unknown operation or block kind `{}`", syntax.lhs.head),
                ));
            }
            for lhs in expand_commutative(&syntax.lhs, registry, &syntax) {
                let compiled = compile_value_rule(
                    loc,
                    registry,
                    &lhs,
                    syntax.guard.as_deref(),
                    &syntax.rhs,
                )?;
                let rules = &mut set.value_rules[compiled.pattern.op.index()];
                check_reachable(rules, CompiledValueRule::always_matches, loc)?;
                rules.push(Rule {
                    loc: loc.clone(),
                    text: rule_text.text.clone(),
                    compiled,
                    fired: AtomicUsize::new(0),
                });
            }
        }

        log::debug!(
            "compiled {} value rules and {} block rules from {}",
            set.value_rules.iter().map(Vec::len).sum::<usize>(),
            set.block_rules.iter().map(Vec::len).sum::<usize>(),
            set.name
        );
        Ok(set)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The rules tried on values of `op`, in order.
    pub fn value_rules(&self, op: Op) -> &[ValueRule] {
        &self.value_rules[op.index()]
    }

    /// The rules tried on blocks of `kind`, in order.
    pub fn block_rules(&self, kind: BlockKind) -> &[BlockRule] {
        &self.block_rules[kind.index()]
    }

    /// How often the rules of every source line fired, for the lines that did.
    pub fn firing_counts(&self) -> Vec<(Loc, usize)> {
        let mut counts = BTreeMap::new();
        let value_rules = self.value_rules.iter().flatten().map(|r| (&r.loc, r.fired()));
        let block_rules = self.block_rules.iter().flatten().map(|r| (&r.loc, r.fired()));
        for (loc, fired) in value_rules.chain(block_rules) {
            if fired > 0 {
                counts.entry(loc.line).or_insert((loc, 0)).1 += fired;
            }
        }
        counts
            .into_values()
            .map(|(loc, fired)| (loc.clone(), fired))
            .collect()
    }

    /// Tries the rules for the operation of `value` in order, applying the first that matches.
    ///
    /// Returns whether a rule fired.
    pub fn rewrite_value(&self, func: &mut Func, value: ValueId) -> Result<bool, RuleError> {
        let mut slots = Vec::new();
        for rule in self.value_rules(func.op(value)) {
            let compiled = &rule.compiled;
            slots.clear();
            slots.resize(compiled.slots, None);
            let eval_err = |source| RuleError::Eval {
                loc: rule.loc.clone(),
                source,
            };

            if !match_node(func, &compiled.pattern, value, &mut slots).map_err(eval_err)? {
                continue;
            }
            if let Some(guard) = &compiled.guard {
                if !guard.eval(func, &slots).and_then(|val| val.as_bool()).map_err(eval_err)? {
                    continue;
                }
            }

            let name = func.value_name(value);
            apply_value_rule(func, compiled, value, &slots).map_err(eval_err)?;
            rule.fire(func, &name);
            return Ok(true);
        }
        Ok(false)
    }

    /// Tries the rules for the kind of `block` in order, applying the first that matches.
    ///
    /// Returns whether a rule fired.
    pub fn rewrite_block(&self, func: &mut Func, block: BlockId) -> Result<bool, RuleError> {
        let mut slots = Vec::new();
        for rule in self.block_rules(func.block(block).kind()) {
            let compiled = &rule.compiled;
            slots.clear();
            slots.resize(compiled.slots, None);
            let eval_err = |source| RuleError::Eval {
                loc: rule.loc.clone(),
                source,
            };

            let matched = match (&compiled.control, func.block(block).control()) {
                (None, None) => true,
                (Some(pat), Some(control)) => {
                    match_pat(func, pat, control, &mut slots).map_err(eval_err)?
                }
                _ => false,
            };
            if !matched {
                continue;
            }
            if let Some(guard) = &compiled.guard {
                if !guard.eval(func, &slots).and_then(|val| val.as_bool()).map_err(eval_err)? {
                    continue;
                }
            }

            apply_block_rule(func, compiled, block, &slots).map_err(eval_err)?;
            rule.fire(func, &func.block_name(block));
            return Ok(true);
        }
        Ok(false)
    }
}

fn bind_var(var: VarPat, value: ValueId, slots: &mut Slots) -> bool {
    match var {
        VarPat::Bind(slot) => {
            slots[slot] = Some(Val::Value(value));
            true
        }
        VarPat::Same(slot) => slots[slot] == Some(Val::Value(value)),
    }
}

fn match_pat(func: &Func, pat: &Pat, value: ValueId, slots: &mut Slots) -> Result<bool, EvalError> {
    match pat {
        Pat::Any => Ok(true),
        Pat::Var(var) => Ok(bind_var(*var, value, slots)),
        Pat::Node(node) => match_node(func, node, value, slots),
    }
}

fn match_node(
    func: &Func,
    pat: &NodePat,
    value: ValueId,
    slots: &mut Slots,
) -> Result<bool, EvalError> {
    let v = func.value(value);
    if v.op() != pat.op || v.args().len() != pat.args.len() {
        return Ok(false);
    }
    if let Some(var) = pat.bind {
        if !bind_var(var, value, slots) {
            return Ok(false);
        }
    }

    if let Some(restr) = &pat.ty {
        let ok = match restr {
            Restr::Bind(slot) => {
                slots[*slot] = Some(Val::Type(v.ty().clone()));
                true
            }
            Restr::Eq(expr) => expr.eval(func, slots)?.as_type(func)? == *v.ty(),
            Restr::SymName(_) => false,
        };
        if !ok {
            return Ok(false);
        }
    }

    if let Some(restr) = &pat.int {
        let got = if pat.op.info().aux == AuxKind::Float {
            v.aux().float().map(Val::Float)
        } else {
            v.aux().int().map(Val::Int)
        };
        let Some(got) = got else {
            return Ok(false);
        };
        let ok = match restr {
            Restr::Bind(slot) => {
                slots[*slot] = Some(got);
                true
            }
            Restr::Eq(expr) => match (expr.eval(func, slots)?, got) {
                (Val::Float(want), got) => want == got.as_float()?,
                (want, Val::Float(got)) => want.as_float()? == got,
                (want, got) => want.as_int()? == got.as_int()?,
            },
            Restr::SymName(_) => false,
        };
        if !ok {
            return Ok(false);
        }
    }

    if let Some(restr) = &pat.sym {
        let got = v.aux().symbol();
        let ok = match restr {
            Restr::Bind(slot) => {
                slots[*slot] = Some(Val::Sym(got.cloned()));
                true
            }
            Restr::Eq(expr) => expr.eval(func, slots)?.as_sym()?.as_ref() == got,
            Restr::SymName(name) => got.is_some_and(|sym| sym.name() == name),
        };
        if !ok {
            return Ok(false);
        }
    }

    for (arg_pat, &arg) in pat.args.iter().zip(v.args()) {
        if !match_pat(func, arg_pat, arg, slots)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Where the builder puts new values.
#[derive(Clone, Copy)]
enum Place {
    Before(ValueId),
    End(BlockId),
}

fn apply_value_rule(
    func: &mut Func,
    rule: &CompiledValueRule,
    root: ValueId,
    slots: &Slots,
) -> Result<(), EvalError> {
    match &rule.result {
        Build::Value(slot) => {
            let source = slot_value(slots, *slot)?;
            if source != root {
                func.replace_with_copy(root, source);
            }
        }
        Build::Node(node) => {
            let args = build_args(func, node, Place::Before(root), slots)?;
            let ty = node_type(func, node, Some(root), slots)?;
            let aux = build_aux(func, node, slots)?;
            func.replace_with(root, node.op, ty, &args, aux);
        }
    }
    Ok(())
}

fn apply_block_rule(
    func: &mut Func,
    rule: &CompiledBlockRule,
    block: BlockId,
    slots: &Slots,
) -> Result<(), EvalError> {
    let control = rule
        .new_control
        .as_ref()
        .map(|build| build_value(func, build, Place::End(block), slots))
        .transpose()?;
    for &i in &rule.drop {
        func.remove_edge(block, i);
    }
    if rule.swap {
        func.swap_successors(block);
    }
    func.set_kind(block, rule.new_kind);
    func.set_control(block, control);
    Ok(())
}

fn slot_value(slots: &Slots, slot: usize) -> Result<ValueId, EvalError> {
    match &slots[slot] {
        Some(val) => val.as_value(),
        None => Err(EvalError::Type {
            expected: "a bound variable",
            found: "nothing".to_owned(),
        }),
    }
}

fn build_value(
    func: &mut Func,
    build: &Build,
    place: Place,
    slots: &Slots,
) -> Result<ValueId, EvalError> {
    let node = match build {
        Build::Value(slot) => return slot_value(slots, *slot),
        Build::Node(node) => node,
    };
    let args = build_args(func, node, place, slots)?;
    let ty = node_type(func, node, None, slots)?;
    let aux = build_aux(func, node, slots)?;
    Ok(match place {
        Place::Before(anchor) => func.insert_value_before(anchor, node.op, ty, &args, aux),
        Place::End(block) => func.new_value(block, node.op, ty, &args, aux),
    })
}

fn build_args(
    func: &mut Func,
    node: &NodeBuild,
    place: Place,
    slots: &Slots,
) -> Result<Vec<ValueId>, EvalError> {
    node.args
        .iter()
        .map(|arg| build_value(func, arg, place, slots))
        .collect()
}

fn node_type(
    func: &Func,
    node: &NodeBuild,
    root: Option<ValueId>,
    slots: &Slots,
) -> Result<Type, EvalError> {
    match (&node.ty, root) {
        (TyBuild::Fixed(ty), _) => Ok(ty.clone()),
        (TyBuild::Expr(expr), _) => expr.eval(func, slots)?.as_type(func),
        (TyBuild::Root, Some(root)) => Ok(func.ty(root).clone()),
        (TyBuild::Root, None) => Err(EvalError::Type {
            expected: "a type",
            found: "nothing".to_owned(),
        }),
    }
}

fn build_aux(func: &Func, node: &NodeBuild, slots: &Slots) -> Result<Aux, EvalError> {
    let int = node
        .int
        .as_ref()
        .map(|expr| expr.eval(func, slots))
        .transpose()?;
    let sym = node
        .sym
        .as_ref()
        .map(|expr| expr.eval(func, slots))
        .transpose()?;
    let aux = match node.op.info().aux {
        AuxKind::None => Aux::None,
        AuxKind::Int => Aux::Int(int.map(|v| v.as_int()).transpose()?.unwrap_or_default()),
        AuxKind::Float => Aux::Float(int.map(|v| v.as_float()).transpose()?.unwrap_or_default()),
        AuxKind::Sym | AuxKind::SymOff => Aux::Sym {
            sym: sym.map(|v| v.as_sym()).transpose()?.flatten(),
            off: int.map(|v| v.as_int()).transpose()?.unwrap_or_default(),
        },
    };
    Ok(aux)
}

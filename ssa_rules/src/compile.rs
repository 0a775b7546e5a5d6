//! Compiling the syntax of rules into matchers and builders.
//!
//! Variables are numbered in the order the matcher binds them: a node's own name first, then its
//! type, integer and symbol restrictions, then its arguments from left to right.

use crate::{
    expr::{parse_expr, Expr},
    syntax::{Node, RuleSyntax, Sexpr},
    Loc, RuleError,
};
use ssa_ir::{is_type_name, Arity, AuxKind, BlockKind, ControlKind, Op, Registry, Type};
use std::collections::HashMap;

/// Matches one argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Pat {
    /// `_`
    Any,
    Var(VarPat),
    Node(Box<NodePat>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarPat {
    /// The first occurrence of a variable binds it.
    Bind(usize),
    /// Later occurrences must be the very same value.
    Same(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodePat {
    pub op: Op,
    pub bind: Option<VarPat>,
    pub ty: Option<Restr>,
    pub int: Option<Restr>,
    pub sym: Option<Restr>,
    pub args: Vec<Pat>,
}

/// A restriction of the type or the payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Restr {
    Bind(usize),
    /// The restricted part must equal the value of the expression.
    Eq(Expr),
    /// The symbol must have this name.
    SymName(String),
}

/// Builds a value of the replacement.
#[derive(Debug, Clone, PartialEq)]
pub enum Build {
    /// A matched value.
    Value(usize),
    Node(Box<NodeBuild>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeBuild {
    pub op: Op,
    pub ty: TyBuild,
    pub int: Option<Expr>,
    pub sym: Option<Expr>,
    pub args: Vec<Build>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TyBuild {
    /// Keep the type of the rewritten value.
    Root,
    Fixed(Type),
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotKind {
    Value,
    Type,
    Int,
    Float,
    Sym,
}

/// A compiled value rule.
#[derive(Debug)]
pub struct CompiledValueRule {
    pub slots: usize,
    pub pattern: NodePat,
    pub guard: Option<Expr>,
    pub result: Build,
}

/// A compiled block rule.
#[derive(Debug)]
pub struct CompiledBlockRule {
    pub slots: usize,
    pub kind: BlockKind,
    /// `None` matches a block without control value.
    pub control: Option<Pat>,
    pub guard: Option<Expr>,
    pub new_kind: BlockKind,
    pub new_control: Option<Build>,
    /// Indices of the successors to remove, in descending order.
    pub drop: Vec<usize>,
    /// Whether the two remaining successors change places.
    pub swap: bool,
}

struct Scope<'a> {
    loc: &'a Loc,
    registry: &'a Registry,
    vars: Vec<(String, SlotKind)>,
}

impl<'a> Scope<'a> {
    fn new(loc: &'a Loc, registry: &'a Registry) -> Self {
        Self {
            loc,
            registry,
            vars: Vec::new(),
        }
    }

    fn err(&self, message: impl Into<String>) -> RuleError {
        RuleError::syntax(self.loc, message)
    }

    fn lookup(&self, name: &str) -> Option<(usize, SlotKind)> {
        self.vars
            .iter()
            .position(|(var, _)| var == name)
            .map(|slot| (slot, self.vars[slot].1))
    }

    fn bind(&mut self, name: &str, kind: SlotKind) -> usize {
        self.vars.push((name.to_owned(), kind));
        self.vars.len() - 1
    }

    fn expr(&self, src: &str) -> Result<Expr, RuleError> {
        let resolve = |name: &str| self.lookup(name).map(|(slot, _)| slot);
        parse_expr(src, &resolve).map_err(|message| self.err(format!("in `{src}`: {message}")))
    }

    fn op(&self, name: &str) -> Result<Op, RuleError> {
        self.registry
            .lookup(name)
            .ok_or_else(|| self.err(format!("unknown operation `{name}`")))
    }

    fn check_arity(&self, op: Op, n: usize) -> Result<(), RuleError> {
        match op.info().arity {
            Arity::Fixed(arity) if arity as usize != n => Err(self.err(format!(
                "`{op}` takes {arity} arguments, got {n}"
            ))),
            _ => Ok(()),
        }
    }

    fn var_pat(&mut self, name: &str) -> Result<VarPat, RuleError> {
        match self.lookup(name) {
            Some((slot, SlotKind::Value)) => Ok(VarPat::Same(slot)),
            Some(_) => Err(self.err(format!("`{name}` is not a value"))),
            None => Ok(VarPat::Bind(self.bind(name, SlotKind::Value))),
        }
    }

    fn pat(&mut self, sexpr: &Sexpr) -> Result<Pat, RuleError> {
        match sexpr {
            Sexpr::Var(name) if name == "_" => Ok(Pat::Any),
            Sexpr::Var(name) if name == "nil" => Err(self.err("`nil` can only be a control value")),
            Sexpr::Var(name) => Ok(Pat::Var(self.var_pat(name)?)),
            Sexpr::Node(node) => Ok(Pat::Node(Box::new(self.node_pat(node)?))),
        }
    }

    fn node_pat(&mut self, node: &Node) -> Result<NodePat, RuleError> {
        let op = self.op(&node.head)?;
        self.check_arity(op, node.args.len())?;
        let bind = node
            .bind
            .as_deref()
            .map(|name| self.var_pat(name))
            .transpose()?;

        let ty = node
            .ty
            .as_deref()
            .map(|ty| self.restr(ty, SlotKind::Type))
            .transpose()?;

        let aux = op.info().aux;
        let int = match (&node.int, aux) {
            (None, _) => None,
            (Some(_), AuxKind::None) => {
                return Err(self.err(format!("`{op}` has no integer payload")));
            }
            (Some(int), AuxKind::Float) => Some(self.restr(int, SlotKind::Float)?),
            (Some(int), _) => Some(self.restr(int, SlotKind::Int)?),
        };
        let sym = match (&node.sym, aux) {
            (None, _) => None,
            (Some(sym), AuxKind::Sym | AuxKind::SymOff) => match string_literal(sym) {
                Some(name) => Some(Restr::SymName(name.to_owned())),
                None => Some(self.restr(sym, SlotKind::Sym)?),
            },
            (Some(_), _) => return Err(self.err(format!("`{op}` has no symbol payload"))),
        };

        let args = node
            .args
            .iter()
            .map(|arg| self.pat(arg))
            .collect::<Result<_, _>>()?;
        Ok(NodePat {
            op,
            bind,
            ty,
            int,
            sym,
            args,
        })
    }

    fn restr(&mut self, src: &str, kind: SlotKind) -> Result<Restr, RuleError> {
        if kind == SlotKind::Type && is_type_name(src) {
            let ty = src.parse().map_err(|err| self.err(format!("{err}")))?;
            return Ok(Restr::Eq(Expr::Type(ty)));
        }
        if is_plain_word(src) && self.lookup(src).is_none() {
            return Ok(Restr::Bind(self.bind(src, kind)));
        }
        Ok(Restr::Eq(self.expr(src)?))
    }

    fn build(&self, sexpr: &Sexpr, root: bool) -> Result<Build, RuleError> {
        let node = match sexpr {
            Sexpr::Var(name) => {
                return match self.lookup(name) {
                    Some((slot, SlotKind::Value)) => Ok(Build::Value(slot)),
                    Some(_) => Err(self.err(format!("`{name}` is not a value"))),
                    None => Err(self.err(format!("unknown variable `{name}`"))),
                };
            }
            Sexpr::Node(node) => node,
        };
        if node.bind.is_some() {
            return Err(self.err("can't name a node of the replacement"));
        }
        let op = self.op(&node.head)?;
        self.check_arity(op, node.args.len())?;

        let ty = match &node.ty {
            Some(ty) if is_type_name(ty) => {
                TyBuild::Fixed(ty.parse().map_err(|err| self.err(format!("{err}")))?)
            }
            Some(ty) => TyBuild::Expr(self.expr(ty)?),
            None if root => TyBuild::Root,
            None => match op.info().ty.to_type() {
                Some(ty) => TyBuild::Fixed(ty),
                None => return Err(self.err(format!("new `{op}` value needs a type"))),
            },
        };

        let aux = op.info().aux;
        let int = node.int.as_deref().map(|int| self.expr(int)).transpose()?;
        let sym = node
            .sym
            .as_deref()
            .map(|sym| match string_literal(sym) {
                Some(name) => Ok(Expr::Str(name.to_owned())),
                None => self.expr(sym),
            })
            .transpose()?;
        match aux {
            AuxKind::None if int.is_some() || sym.is_some() => {
                return Err(self.err(format!("`{op}` has no payload")));
            }
            AuxKind::Int | AuxKind::Float if int.is_none() => {
                return Err(self.err(format!("`{op}` needs `[...]`")));
            }
            AuxKind::Int | AuxKind::Float if sym.is_some() => {
                return Err(self.err(format!("`{op}` has no symbol payload")));
            }
            AuxKind::Sym if sym.is_none() => {
                return Err(self.err(format!("`{op}` needs `{{...}}`")));
            }
            _ => {}
        }

        let args = node
            .args
            .iter()
            .map(|arg| self.build(arg, false))
            .collect::<Result<_, _>>()?;
        Ok(Build::Node(Box::new(NodeBuild {
            op,
            ty,
            int,
            sym,
            args,
        })))
    }

    fn guard(&self, guard: Option<&str>) -> Result<Option<Expr>, RuleError> {
        guard.map(|guard| self.expr(guard)).transpose()
    }
}

fn is_plain_word(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|c| c.is_alphanumeric() || c == '_')
        && !s.starts_with(|c: char| c.is_ascii_digit())
        && s != "true"
        && s != "false"
}

fn string_literal(s: &str) -> Option<&str> {
    s.strip_prefix('"')?.strip_suffix('"')
}

pub(crate) fn compile_value_rule(
    loc: &Loc,
    registry: &Registry,
    lhs: &Node,
    guard: Option<&str>,
    rhs: &Sexpr,
) -> Result<CompiledValueRule, RuleError> {
    let mut scope = Scope::new(loc, registry);
    let pattern = scope.node_pat(lhs)?;
    let guard = scope.guard(guard)?;
    let result = scope.build(rhs, true)?;
    Ok(CompiledValueRule {
        slots: scope.vars.len(),
        pattern,
        guard,
        result,
    })
}

pub(crate) fn compile_block_rule(
    loc: &Loc,
    registry: &Registry,
    kind: BlockKind,
    lhs: &Node,
    guard: Option<&str>,
    rhs: &Sexpr,
) -> Result<CompiledBlockRule, RuleError> {
    let mut scope = Scope::new(loc, registry);
    if lhs.bind.is_some() || lhs.ty.is_some() || lhs.int.is_some() || lhs.sym.is_some() {
        return Err(scope.err("a block can't be restricted"));
    }
    let Some((control, succs)) = lhs.args.split_first() else {
        return Err(scope.err(format!("`{kind}` needs a control value or `nil`")));
    };
    if succs.len() != kind.succs() {
        return Err(scope.err(format!(
            "`{kind}` has {} successors, got {}",
            kind.succs(),
            succs.len()
        )));
    }
    let control = match control {
        Sexpr::Var(name) if name == "nil" => None,
        _ if kind.info().control == ControlKind::None => {
            return Err(scope.err(format!("`{kind}` has no control value")));
        }
        control => Some(scope.pat(control)?),
    };
    let succ_names = succs
        .iter()
        .map(|succ| match succ {
            Sexpr::Var(name) => Ok(name.as_str()),
            Sexpr::Node(_) => Err(scope.err("a successor must be a name")),
        })
        .collect::<Result<Vec<_>, _>>()?;
    for (i, name) in succ_names.iter().enumerate() {
        if succ_names[..i].contains(name) {
            return Err(scope.err(format!("successor `{name}` named twice")));
        }
    }

    let guard = scope.guard(guard)?;

    let Sexpr::Node(rhs) = rhs else {
        return Err(scope.err("the replacement of a block must be a block"));
    };
    let new_kind = registry
        .lookup_kind(&rhs.head)
        .ok_or_else(|| scope.err(format!("unknown block kind `{}`", rhs.head)))?;
    let Some((new_control, new_succs)) = rhs.args.split_first() else {
        return Err(scope.err(format!("`{new_kind}` needs a control value or `nil`")));
    };
    let new_control = match (new_control, new_kind.info().control) {
        (Sexpr::Var(name), ControlKind::None | ControlKind::Optional) if name == "nil" => None,
        (Sexpr::Var(name), _) if name == "nil" => {
            return Err(scope.err(format!("`{new_kind}` needs a control value")));
        }
        (_, ControlKind::None) => {
            return Err(scope.err(format!("`{new_kind}` has no control value")));
        }
        (control, _) => Some(scope.build(control, false)?),
    };

    if new_succs.len() != new_kind.succs() {
        return Err(scope.err(format!(
            "`{new_kind}` has {} successors, got {}",
            new_kind.succs(),
            new_succs.len()
        )));
    }
    let mut keep = Vec::new();
    for succ in new_succs {
        let index = match succ {
            Sexpr::Var(name) => succ_names.iter().position(|n| n == name),
            Sexpr::Node(_) => None,
        }
        .ok_or_else(|| scope.err("a successor of the replacement must be a matched successor"))?;
        if keep.contains(&index) {
            return Err(scope.err("a successor can only be kept once"));
        }
        keep.push(index);
    }
    let drop = (0..succs.len()).rev().filter(|i| !keep.contains(i)).collect();
    let swap = keep.len() == 2 && keep[0] > keep[1];

    Ok(CompiledBlockRule {
        slots: scope.vars.len(),
        kind,
        control,
        guard,
        new_kind,
        new_control,
        drop,
        swap,
    })
}

/// Expands the commutative nodes of a pattern into both argument orders, the written order
/// first.
///
/// The two orders of a pair of variables that are used nowhere else match the same values, so
/// such a pair is not swapped.
pub(crate) fn expand_commutative(
    node: &Node,
    registry: &Registry,
    syntax: &RuleSyntax,
) -> Vec<Node> {
    let mut uses = HashMap::new();
    count_uses(&syntax.lhs, &mut uses);
    let guard_words: Vec<&str> = syntax
        .guard
        .as_deref()
        .map(|guard| {
            guard
                .split(|c: char| !(c.is_alphanumeric() || c == '_'))
                .collect()
        })
        .unwrap_or_default();
    let free = |arg: &Sexpr| match arg {
        Sexpr::Var(name) => {
            name == "_" || (uses.get(name.as_str()) == Some(&1) && !guard_words.contains(&name.as_str()))
        }
        Sexpr::Node(_) => false,
    };

    let mut expanded = Vec::new();
    expand(node, registry, &free, &mut expanded);
    let mut unique: Vec<Node> = Vec::new();
    for node in expanded {
        if !unique.contains(&node) {
            unique.push(node);
        }
    }
    unique
}

fn count_uses<'a>(node: &'a Node, uses: &mut HashMap<&'a str, usize>) {
    if let Some(name) = &node.bind {
        *uses.entry(name.as_str()).or_insert(0) += 1;
    }
    for arg in &node.args {
        match arg {
            Sexpr::Var(name) => *uses.entry(name.as_str()).or_insert(0) += 1,
            Sexpr::Node(node) => count_uses(node, uses),
        }
    }
}

fn expand(node: &Node, registry: &Registry, free: &dyn Fn(&Sexpr) -> bool, out: &mut Vec<Node>) {
    // All combinations of the expansions of the arguments.
    let mut combinations: Vec<Vec<Sexpr>> = vec![Vec::new()];
    for arg in &node.args {
        let variants = match arg {
            Sexpr::Var(_) => vec![arg.clone()],
            Sexpr::Node(inner) => {
                let mut inner_out = Vec::new();
                expand(inner, registry, free, &mut inner_out);
                inner_out.into_iter().map(Sexpr::Node).collect()
            }
        };
        combinations = combinations
            .into_iter()
            .flat_map(|prefix| {
                variants.iter().map(move |variant| {
                    let mut args = prefix.clone();
                    args.push(variant.clone());
                    args
                })
            })
            .collect();
    }

    let commutative = registry
        .lookup(&node.head)
        .is_some_and(|op| op.info().commutative)
        && node.args.len() == 2
        && !(free(&node.args[0]) && free(&node.args[1]));

    for args in combinations {
        let swapped = commutative.then(|| vec![args[1].clone(), args[0].clone()]);
        out.push(Node {
            args,
            ..node.clone()
        });
        if let Some(args) = swapped {
            out.push(Node {
                args,
                ..node.clone()
            });
        }
    }
}

impl CompiledValueRule {
    /// Whether this rule matches every value of its operation.
    pub fn always_matches(&self) -> bool {
        let p = &self.pattern;
        self.guard.is_none()
            && matches!(p.op.info().arity, Arity::Fixed(_))
            && !matches!(p.bind, Some(VarPat::Same(_)))
            && [&p.ty, &p.int, &p.sym]
                .iter()
                .all(|r| matches!(r, None | Some(Restr::Bind(_))))
            && p
                .args
                .iter()
                .all(|arg| matches!(arg, Pat::Any | Pat::Var(VarPat::Bind(_))))
    }
}

impl CompiledBlockRule {
    /// Whether this rule matches every block of its kind.
    pub fn always_matches(&self) -> bool {
        self.guard.is_none() && matches!(self.control, Some(Pat::Any | Pat::Var(VarPat::Bind(_))))
    }
}

//! The textual form of a [`Func`].
//!
//! ```text
//! func add
//! b1:
//!     v1 = InitMem <Mem>
//!     v2 = Arg <Int32> [0]
//!     v3 = Const <Int32> [1]
//!     v4 = Add <Int32> v2 v3
//!     Ret v4
//! ```
//!
//! A block header may list the predecessors of the block (`b3: <- b1 b2`), the list is checked
//! against the edges. Predecessors are ordered by the position of the terminators referring to
//! the block. `//` starts a comment.

#[cfg(test)]
mod test;

use crate::{Aux, AuxKind, BlockId, BlockKind, Func, Op, Registry, Symbol, Type, ValueId};
use std::{collections::HashMap, fmt, ops::Range};

pub type Span = Range<usize>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    /// Byte range in the source text.
    pub span: Span,
}

impl ParseError {
    fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "func {}", self.name())?;
        for &block in self.blocks() {
            let b = self.block(block);
            write!(f, "{}:", self.block_name(block))?;
            if !b.preds().is_empty() {
                f.write_str(" <-")?;
                for edge in b.preds() {
                    write!(f, " {}", self.block_name(edge.block))?;
                }
            }
            writeln!(f)?;
            for &value in b.values() {
                writeln!(f, "    {}", self.display_value(value))?;
            }
            write!(f, "    {}", b.kind())?;
            if let Some(control) = b.control() {
                write!(f, " {}", self.value_name(control))?;
            }
            if !b.succs().is_empty() {
                f.write_str(" ->")?;
                for edge in b.succs() {
                    write!(f, " {}", self.block_name(edge.block))?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Func {
    /// Displays a single value the way it appears in the textual form.
    pub fn display_value(&self, value: ValueId) -> DisplayValue<'_> {
        DisplayValue { func: self, value }
    }
}

pub struct DisplayValue<'a> {
    func: &'a Func,
    value: ValueId,
}

impl fmt::Display for DisplayValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.func.value(self.value);
        write!(
            f,
            "{} = {} <{}>",
            self.func.value_name(self.value),
            v.op(),
            v.ty()
        )?;
        match v.aux() {
            Aux::None => {}
            Aux::Int(i) => write!(f, " [{i}]")?,
            Aux::Float(x) => write!(f, " [{x:?}]")?,
            Aux::Sym { sym, off } => {
                if *off != 0 {
                    write!(f, " [{off}]")?;
                }
                if let Some(sym) = sym {
                    write!(f, " {{{sym}}}")?;
                }
            }
        }
        for &arg in v.args() {
            write!(f, " {}", self.func.value_name(arg))?;
        }
        Ok(())
    }
}

/// Parses a single function.
pub fn parse_func(src: &str, registry: &Registry) -> Result<Func, ParseError> {
    let mut funcs = parse_unit(src, registry)?;
    match funcs.len() {
        1 => Ok(funcs.remove(0)),
        0 => Err(ParseError::new("expected a function", 0..src.len())),
        _ => Err(ParseError::new("expected a single function", 0..src.len())),
    }
}

/// Parses any number of functions.
pub fn parse_unit(src: &str, registry: &Registry) -> Result<Vec<Func>, ParseError> {
    let mut funcs = Vec::new();
    let mut current: Option<FuncSyntax> = None;

    let mut offset = 0;
    for line in src.split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        let code = line.split("//").next().unwrap_or_default();
        let tokens = tokenize(code, start);
        let Some(first) = tokens.first() else {
            continue;
        };

        if first.text == "func" {
            let name = tokens
                .get(1)
                .ok_or_else(|| ParseError::new("expected a function name", first.span.clone()))?;
            if let Some(extra) = tokens.get(2) {
                return Err(ParseError::new("unexpected token", extra.span.clone()));
            }
            if let Some(func) = current.take() {
                funcs.push(func.build()?);
            }
            current = Some(FuncSyntax::new(name.text, name.span.clone()));
            continue;
        }
        let Some(func) = current.as_mut() else {
            return Err(ParseError::new("expected `func`", first.span.clone()));
        };

        if first.text.starts_with('b') && first.text.ends_with(':') {
            func.blocks.push(parse_block_header(&tokens)?);
        } else if first.text.starts_with('v') && tokens.get(1).map(|t| t.text) == Some("=") {
            let block = func
                .blocks
                .last_mut()
                .ok_or_else(|| ParseError::new("value outside of a block", first.span.clone()))?;
            if block.term.is_some() {
                return Err(ParseError::new(
                    "value after the end of the block",
                    first.span.clone(),
                ));
            }
            block.values.push(parse_value(&tokens, registry)?);
        } else {
            let block = func.blocks.last_mut().ok_or_else(|| {
                ParseError::new("terminator outside of a block", first.span.clone())
            })?;
            if block.term.is_some() {
                return Err(ParseError::new("block has two terminators", first.span.clone()));
            }
            block.term = Some(parse_terminator(&tokens, registry)?);
        }
    }
    if let Some(func) = current {
        funcs.push(func.build()?);
    }
    Ok(funcs)
}

#[derive(Debug)]
struct Token<'a> {
    text: &'a str,
    span: Span,
}

fn tokenize(line: &str, offset: usize) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (i, c) in line.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                tokens.push(Token {
                    text: &line[s..i],
                    span: offset + s..offset + i,
                });
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.push(Token {
            text: &line[s..],
            span: offset + s..offset + line.len(),
        });
    }
    tokens
}

type Ref = (u32, Span);

struct FuncSyntax {
    name: String,
    span: Span,
    blocks: Vec<BlockSyntax>,
}

struct BlockSyntax {
    num: u32,
    span: Span,
    preds: Option<Vec<Ref>>,
    values: Vec<ValueSyntax>,
    term: Option<TermSyntax>,
}

struct ValueSyntax {
    num: u32,
    span: Span,
    op: Op,
    ty: Type,
    aux: Aux,
    args: Vec<Ref>,
}

struct TermSyntax {
    kind: BlockKind,
    control: Option<Ref>,
    succs: Vec<Ref>,
}

fn parse_ref(token: &Token, prefix: char) -> Result<Ref, ParseError> {
    token
        .text
        .strip_prefix(prefix)
        .and_then(|num| num.parse().ok())
        .map(|num| (num, token.span.clone()))
        .ok_or_else(|| {
            let what = if prefix == 'v' { "value" } else { "block" };
            ParseError::new(
                format!("expected a {what}, found `{}`", token.text),
                token.span.clone(),
            )
        })
}

fn parse_block_header(tokens: &[Token]) -> Result<BlockSyntax, ParseError> {
    let header = &tokens[0];
    let name = &header.text[..header.text.len() - 1];
    let (num, _) = parse_ref(
        &Token {
            text: name,
            span: header.span.clone(),
        },
        'b',
    )?;
    let preds = match tokens.get(1) {
        None => None,
        Some(arrow) if arrow.text == "<-" => Some(
            tokens[2..]
                .iter()
                .map(|t| parse_ref(t, 'b'))
                .collect::<Result<_, _>>()?,
        ),
        Some(other) => return Err(ParseError::new("expected `<-`", other.span.clone())),
    };
    Ok(BlockSyntax {
        num,
        span: header.span.clone(),
        preds,
        values: Vec::new(),
        term: None,
    })
}

fn parse_value(tokens: &[Token], registry: &Registry) -> Result<ValueSyntax, ParseError> {
    let (num, _) = parse_ref(&tokens[0], 'v')?;
    let op_token = tokens
        .get(2)
        .ok_or_else(|| ParseError::new("expected an operation", tokens[1].span.clone()))?;
    let op = registry.lookup(op_token.text).ok_or_else(|| {
        ParseError::new(
            format!("unknown operation `{}`", op_token.text),
            op_token.span.clone(),
        )
    })?;

    let mut ty = None;
    let mut int = None;
    let mut sym = None;
    let mut args = Vec::new();
    for token in &tokens[3..] {
        let inner = |open: char, close: char| {
            token
                .text
                .strip_prefix(open)
                .and_then(|t| t.strip_suffix(close))
                .ok_or_else(|| ParseError::new(format!("missing `{close}`"), token.span.clone()))
        };
        let misplaced = || ParseError::new("unexpected token after the arguments", token.span.clone());
        match token.text.chars().next() {
            Some('<') if args.is_empty() => {
                let parsed = inner('<', '>')?.parse::<Type>().map_err(|err| {
                    ParseError::new(err.to_string(), token.span.clone())
                })?;
                ty = Some(parsed);
            }
            Some('[') if args.is_empty() => int = Some((inner('[', ']')?, token.span.clone())),
            Some('{') if args.is_empty() => sym = Some((inner('{', '}')?, token.span.clone())),
            Some('<' | '[' | '{') => return Err(misplaced()),
            _ => args.push(parse_ref(token, 'v')?),
        }
    }

    let span = tokens[0].span.start..tokens[tokens.len() - 1].span.end;
    let info = op.info();
    let ty = match ty.or_else(|| info.ty.to_type()) {
        Some(ty) => ty,
        None => {
            return Err(ParseError::new(
                format!("`{op}` needs an explicit type"),
                span,
            ))
        }
    };
    if !info.arity.accepts(args.len()) {
        return Err(ParseError::new(
            format!("`{op}` takes {:?} arguments, got {}", info.arity, args.len()),
            span,
        ));
    }
    let aux = build_aux(op, info.aux, int, sym, &span)?;
    Ok(ValueSyntax {
        num,
        span,
        op,
        ty,
        aux,
        args,
    })
}

fn build_aux(
    op: Op,
    kind: AuxKind,
    int: Option<(&str, Span)>,
    sym: Option<(&str, Span)>,
    span: &Span,
) -> Result<Aux, ParseError> {
    let unexpected = |(_, span): (&str, Span)| {
        ParseError::new(format!("`{op}` doesn't take this payload"), span)
    };
    let parse_int = |(text, span): (&str, Span)| {
        text.parse::<i64>()
            .map_err(|_| ParseError::new(format!("expected an integer, found `{text}`"), span))
    };
    let missing = || ParseError::new(format!("`{op}` needs a payload"), span.clone());

    match kind {
        AuxKind::None => match (int, sym) {
            (None, None) => Ok(Aux::None),
            (Some(t), _) | (None, Some(t)) => Err(unexpected(t)),
        },
        AuxKind::Int => {
            if let Some(t) = sym {
                return Err(unexpected(t));
            }
            Ok(Aux::Int(parse_int(int.ok_or_else(missing)?)?))
        }
        AuxKind::Float => {
            if let Some(t) = sym {
                return Err(unexpected(t));
            }
            let (text, span) = int.ok_or_else(missing)?;
            text.parse::<f64>().map(Aux::Float).map_err(|_| {
                ParseError::new(format!("expected a float, found `{text}`"), span)
            })
        }
        AuxKind::Sym | AuxKind::SymOff => {
            let off = int.map(parse_int).transpose()?.unwrap_or(0);
            let sym = sym.map(|(text, span)| parse_symbol(text, span)).transpose()?;
            if kind == AuxKind::Sym && sym.is_none() {
                return Err(missing());
            }
            Ok(Aux::Sym { sym, off })
        }
    }
}

fn parse_symbol(text: &str, span: Span) -> Result<Symbol, ParseError> {
    let Some(auto) = text.strip_prefix("auto:") else {
        return Ok(Symbol::external(text));
    };
    auto.rsplit_once(':')
        .and_then(|(name, size)| Some(Symbol::auto(name, size.parse().ok()?)))
        .ok_or_else(|| ParseError::new("expected `auto:name:size`", span))
}

fn parse_terminator(tokens: &[Token], registry: &Registry) -> Result<TermSyntax, ParseError> {
    let kind_token = &tokens[0];
    let kind = registry.lookup_kind(kind_token.text).ok_or_else(|| {
        ParseError::new(
            format!("unknown block kind `{}`", kind_token.text),
            kind_token.span.clone(),
        )
    })?;

    let mut rest = &tokens[1..];
    let mut control = None;
    if let Some(token) = rest.first().filter(|t| t.text != "->") {
        control = Some(parse_ref(token, 'v')?);
        rest = &rest[1..];
    }
    let mut succs = Vec::new();
    if let Some(arrow) = rest.first() {
        if arrow.text != "->" {
            return Err(ParseError::new("expected `->`", arrow.span.clone()));
        }
        for token in &rest[1..] {
            succs.push(parse_ref(token, 'b')?);
        }
    }
    let span = kind_token.span.start..tokens[tokens.len() - 1].span.end;
    if succs.len() != kind.succs() {
        return Err(ParseError::new(
            format!("`{kind}` needs {} successors, got {}", kind.succs(), succs.len()),
            span,
        ));
    }
    Ok(TermSyntax {
        kind,
        control,
        succs,
    })
}

impl FuncSyntax {
    fn new(name: &str, span: Span) -> Self {
        Self {
            name: name.to_owned(),
            span,
            blocks: Vec::new(),
        }
    }

    fn build(self) -> Result<Func, ParseError> {
        let mut func = Func::new(self.name);
        if self.blocks.is_empty() {
            return Err(ParseError::new("function has no blocks", self.span));
        }

        let mut blocks: HashMap<u32, BlockId> = HashMap::new();
        for block in &self.blocks {
            let Some(term) = &block.term else {
                return Err(ParseError::new("block has no terminator", block.span.clone()));
            };
            if blocks.contains_key(&block.num) {
                return Err(ParseError::new("block defined twice", block.span.clone()));
            }
            blocks.insert(block.num, func.insert_block(block.num, term.kind));
        }

        let mut values: HashMap<u32, ValueId> = HashMap::new();
        for block in &self.blocks {
            let id = blocks[&block.num];
            for value in &block.values {
                if values.contains_key(&value.num) {
                    return Err(ParseError::new("value defined twice", value.span.clone()));
                }
                let v = func.insert_value(
                    id,
                    value.num,
                    value.op,
                    value.ty.clone(),
                    value.aux.clone(),
                );
                values.insert(value.num, v);
            }
        }

        let resolve_value = |(num, span): &Ref| {
            values
                .get(num)
                .copied()
                .ok_or_else(|| ParseError::new(format!("unknown value v{num}"), span.clone()))
        };
        let resolve_block = |(num, span): &Ref| {
            blocks
                .get(num)
                .copied()
                .ok_or_else(|| ParseError::new(format!("unknown block b{num}"), span.clone()))
        };

        for block in &self.blocks {
            for value in &block.values {
                let args = value
                    .args
                    .iter()
                    .map(resolve_value)
                    .collect::<Result<Vec<_>, _>>()?;
                func.set_args(values[&value.num], args);
            }
        }

        for block in &self.blocks {
            let id = blocks[&block.num];
            let Some(term) = &block.term else {
                continue;
            };
            for succ in &term.succs {
                func.add_edge(id, resolve_block(succ)?);
            }
            let control = term.control.as_ref().map(resolve_value).transpose()?;
            func.set_control(id, control);
        }

        for block in &self.blocks {
            let Some(preds) = &block.preds else {
                continue;
            };
            let expected = preds
                .iter()
                .map(resolve_block)
                .collect::<Result<Vec<_>, _>>()?;
            let found: Vec<_> = func
                .block(blocks[&block.num])
                .preds()
                .iter()
                .map(|edge| edge.block)
                .collect();
            if expected != found {
                let span = preds
                    .first()
                    .zip(preds.last())
                    .map(|(first, last)| first.1.start..last.1.end)
                    .unwrap_or_else(|| block.span.clone());
                return Err(ParseError::new(
                    "predecessors don't match the edges of the function",
                    span,
                ));
            }
        }

        log::trace!(
            "parsed `{}` with {} blocks and {} values",
            func.name(),
            func.blocks().len(),
            func.n_values()
        );
        Ok(func)
    }
}

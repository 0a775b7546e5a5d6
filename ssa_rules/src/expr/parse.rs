use super::{BinOp, Builtin, Expr, UnOp};
use ssa_ir::Type;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Punct(&'static str),
}

const PUNCTS: &[&str] = &[
    "||", "&&", "==", "!=", "<=", ">=", "<<", ">>", "<", ">", "+", "-", "*", "/", "%", "&", "|",
    "^", "!", "(", ")", ",",
];

fn lex(src: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut rest = src;
    while let Some(c) = rest.chars().next() {
        if c.is_whitespace() {
            rest = &rest[c.len_utf8()..];
        } else if c.is_ascii_digit() {
            let len = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '.'))
                .unwrap_or(rest.len());
            let text = &rest[..len];
            let token = if let Some(hex) = text.strip_prefix("0x") {
                i64::from_str_radix(hex, 16).map(Token::Int).ok()
            } else if text.contains('.') || text.contains('e') {
                text.parse().map(Token::Float).ok()
            } else {
                text.parse().map(Token::Int).ok()
            };
            tokens.push(token.ok_or_else(|| format!("invalid number `{text}`"))?);
            rest = &rest[len..];
        } else if c.is_alphabetic() || c == '_' {
            let len = rest
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .unwrap_or(rest.len());
            tokens.push(Token::Ident(rest[..len].to_owned()));
            rest = &rest[len..];
        } else if c == '"' {
            let end = rest[1..]
                .find('"')
                .ok_or_else(|| "unterminated string".to_owned())?;
            tokens.push(Token::Str(rest[1..end + 1].to_owned()));
            rest = &rest[end + 2..];
        } else {
            let punct = PUNCTS
                .iter()
                .copied()
                .find(|p| rest.starts_with(p))
                .ok_or_else(|| format!("unexpected character `{c}`"))?;
            tokens.push(Token::Punct(punct));
            rest = &rest[punct.len()..];
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    resolve: &'a dyn Fn(&str) -> Option<usize>,
}

/// Parses an expression. `resolve` maps the names of the variables in scope to their slots.
///
/// A name that isn't a variable may name a type.
pub fn parse_expr(src: &str, resolve: &dyn Fn(&str) -> Option<usize>) -> Result<Expr, String> {
    let mut parser = Parser {
        tokens: lex(src)?,
        pos: 0,
        resolve,
    };
    let expr = parser.binary(1)?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(format!("unexpected {token:?} in `{src}`")),
    }
}

fn binary_op(punct: &str) -> Option<(u8, BinOp)> {
    let op = match punct {
        "||" => (1, BinOp::OrOr),
        "&&" => (2, BinOp::AndAnd),
        "==" => (3, BinOp::Eq),
        "!=" => (3, BinOp::Ne),
        "<" => (3, BinOp::Lt),
        "<=" => (3, BinOp::Le),
        ">" => (3, BinOp::Gt),
        ">=" => (3, BinOp::Ge),
        "+" => (4, BinOp::Add),
        "-" => (4, BinOp::Sub),
        "|" => (4, BinOp::Or),
        "^" => (4, BinOp::Xor),
        "*" => (5, BinOp::Mul),
        "/" => (5, BinOp::Div),
        "%" => (5, BinOp::Rem),
        "<<" => (5, BinOp::Shl),
        ">>" => (5, BinOp::Shr),
        "&" => (5, BinOp::And),
        _ => return None,
    };
    Some(op)
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, punct: &str) -> bool {
        if matches!(self.peek(), Some(Token::Punct(p)) if *p == punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: &str) -> Result<(), String> {
        if self.eat(punct) {
            Ok(())
        } else {
            Err(format!("expected `{punct}`"))
        }
    }

    fn binary(&mut self, min_prec: u8) -> Result<Expr, String> {
        let mut lhs = self.unary()?;
        loop {
            let Some(Token::Punct(punct)) = self.peek() else {
                break;
            };
            let Some((prec, op)) = binary_op(punct).filter(|(prec, _)| *prec >= min_prec) else {
                break;
            };
            self.pos += 1;
            let rhs = self.binary(prec + 1)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, String> {
        let op = match self.peek() {
            Some(Token::Punct("-")) => UnOp::Neg,
            Some(Token::Punct("!")) => UnOp::Not,
            Some(Token::Punct("^")) => UnOp::Com,
            _ => return self.primary(),
        };
        self.pos += 1;
        let operand = self.unary()?;
        Ok(match (op, operand) {
            (UnOp::Neg, Expr::Int(i)) => Expr::Int(i.wrapping_neg()),
            (UnOp::Neg, Expr::Float(x)) => Expr::Float(-x),
            (op, operand) => Expr::Unary(op, Box::new(operand)),
        })
    }

    fn primary(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Int(i)) => Ok(Expr::Int(i)),
            Some(Token::Float(x)) => Ok(Expr::Float(x)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::Punct("(")) => {
                let expr = self.binary(1)?;
                self.expect(")")?;
                Ok(expr)
            }
            Some(Token::Ident(name)) => self.ident(name),
            Some(token) => Err(format!("unexpected {token:?}")),
            None => Err("unexpected end of expression".to_owned()),
        }
    }

    fn ident(&mut self, name: String) -> Result<Expr, String> {
        match name.as_str() {
            "true" => return Ok(Expr::Bool(true)),
            "false" => return Ok(Expr::Bool(false)),
            _ => {}
        }
        if self.eat("(") {
            let builtin =
                Builtin::from_name(&name).ok_or_else(|| format!("unknown function `{name}`"))?;
            let mut args = Vec::new();
            if !self.eat(")") {
                loop {
                    args.push(self.binary(1)?);
                    if self.eat(")") {
                        break;
                    }
                    self.expect(",")?;
                }
            }
            if args.len() != builtin.arity() {
                return Err(format!(
                    "`{}` takes {} arguments, got {}",
                    builtin.name(),
                    builtin.arity(),
                    args.len()
                ));
            }
            return Ok(Expr::Call(builtin, args));
        }
        if let Some(slot) = (self.resolve)(&name) {
            return Ok(Expr::Slot(slot));
        }
        match name.parse::<Type>() {
            Ok(ty) => Ok(Expr::Type(ty)),
            Err(_) => Err(format!("unknown variable `{name}`")),
        }
    }
}

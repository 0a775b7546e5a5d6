//! The expression language of guards and payload restrictions.
//!
//! Expressions are small: literals, variables, the usual binary and unary operators (with the
//! precedence Go gives them) and calls of a fixed set of builtins.

#[cfg(test)]
mod test;

mod parse;

pub use parse::parse_expr;

use crate::EvalError;
use ssa_ir::{Func, Symbol, Type, ValueId};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Type(Type),
    /// A variable of the rule.
    Slot(usize),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(Builtin, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
    Com,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    OrOr,
    AndAnd,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Or,
    Xor,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    And,
}

macro_rules! builtins {
    ($($builtin:ident = $name:literal / $arity:literal,)*) => {
        /// A function callable from expressions.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum Builtin {
            $($builtin,)*
        }

        impl Builtin {
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Builtin::$builtin),)*
                    _ => None,
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(Builtin::$builtin => $name,)*
                }
            }

            pub fn arity(self) -> usize {
                match self {
                    $(Builtin::$builtin => $arity,)*
                }
            }
        }
    };
}

builtins! {
    Is8BitInt = "is8BitInt" / 1,
    Is16BitInt = "is16BitInt" / 1,
    Is32BitInt = "is32BitInt" / 1,
    Is64BitInt = "is64BitInt" / 1,
    IsInt = "isInt" / 1,
    IsSigned = "isSigned" / 1,
    IsPtr = "isPtr" / 1,
    IsBool = "isBool" / 1,
    IsFloat = "isFloat" / 1,
    Is32BitFloat = "is32BitFloat" / 1,
    Is64BitFloat = "is64BitFloat" / 1,
    Size = "size" / 1,
    Norm = "norm" / 2,
    Zext = "zext" / 2,
    Is16Bit = "is16Bit" / 1,
    IsU16Bit = "isU16Bit" / 1,
    IsPowerOfTwo = "isPowerOfTwo" / 1,
    Log2 = "log2" / 1,
    Int8 = "int8" / 1,
    Int16 = "int16" / 1,
    Int32 = "int32" / 1,
    Uint8 = "uint8" / 1,
    Uint16 = "uint16" / 1,
    Uint32 = "uint32" / 1,
    B2i = "b2i" / 1,
    TypeOf = "typeOf" / 1,
    CanMergeSym = "canMergeSym" / 2,
    MergeSym = "mergeSym" / 2,
}

/// The value of an expression, or of a rule variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Val {
    Int(i64),
    Float(f64),
    Bool(bool),
    Type(Type),
    /// The symbol part of a payload, which may be empty.
    Sym(Option<Symbol>),
    Str(String),
    /// A matched SSA value.
    Value(ValueId),
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Int(i) => write!(f, "integer {i}"),
            Val::Float(x) => write!(f, "float {x:?}"),
            Val::Bool(b) => write!(f, "bool {b}"),
            Val::Type(ty) => write!(f, "type {ty}"),
            Val::Sym(Some(sym)) => write!(f, "symbol {sym}"),
            Val::Sym(None) => f.write_str("no symbol"),
            Val::Str(s) => write!(f, "string {s:?}"),
            Val::Value(_) => f.write_str("a value"),
        }
    }
}

fn type_error(expected: &'static str, found: &Val) -> EvalError {
    EvalError::Type {
        expected,
        found: found.to_string(),
    }
}

impl Val {
    pub fn as_int(&self) -> Result<i64, EvalError> {
        match self {
            Val::Int(i) => Ok(*i),
            other => Err(type_error("an integer", other)),
        }
    }

    /// Integers convert to floats.
    pub fn as_float(&self) -> Result<f64, EvalError> {
        match self {
            Val::Float(x) => Ok(*x),
            Val::Int(i) => Ok(*i as f64),
            other => Err(type_error("a float", other)),
        }
    }

    pub fn as_bool(&self) -> Result<bool, EvalError> {
        match self {
            Val::Bool(b) => Ok(*b),
            other => Err(type_error("a bool", other)),
        }
    }

    /// A value stands for its type.
    pub fn as_type(&self, func: &Func) -> Result<Type, EvalError> {
        match self {
            Val::Type(ty) => Ok(ty.clone()),
            Val::Value(v) => Ok(func.ty(*v).clone()),
            other => Err(type_error("a type", other)),
        }
    }

    pub fn as_sym(&self) -> Result<Option<Symbol>, EvalError> {
        match self {
            Val::Sym(sym) => Ok(sym.clone()),
            Val::Str(name) => Ok(Some(Symbol::external(name))),
            other => Err(type_error("a symbol", other)),
        }
    }

    pub fn as_value(&self) -> Result<ValueId, EvalError> {
        match self {
            Val::Value(v) => Ok(*v),
            other => Err(type_error("a value", other)),
        }
    }
}

/// The rule variables bound while matching.
pub type Slots = [Option<Val>];

impl Expr {
    pub fn eval(&self, func: &Func, slots: &Slots) -> Result<Val, EvalError> {
        let val = match self {
            Expr::Int(i) => Val::Int(*i),
            Expr::Float(x) => Val::Float(*x),
            Expr::Bool(b) => Val::Bool(*b),
            Expr::Str(s) => Val::Str(s.clone()),
            Expr::Type(ty) => Val::Type(ty.clone()),
            Expr::Slot(slot) => match &slots[*slot] {
                Some(val) => val.clone(),
                None => {
                    return Err(EvalError::Type {
                        expected: "a bound variable",
                        found: "nothing".to_owned(),
                    })
                }
            },
            Expr::Unary(op, e) => {
                let val = e.eval(func, slots)?;
                match (op, val) {
                    (UnOp::Neg, Val::Int(i)) => Val::Int(i.wrapping_neg()),
                    (UnOp::Neg, Val::Float(x)) => Val::Float(-x),
                    (UnOp::Not, val) => Val::Bool(!val.as_bool()?),
                    (UnOp::Com, val) => Val::Int(!val.as_int()?),
                    (UnOp::Neg, other) => return Err(type_error("a number", &other)),
                }
            }
            Expr::Binary(BinOp::AndAnd, l, r) => {
                Val::Bool(l.eval(func, slots)?.as_bool()? && r.eval(func, slots)?.as_bool()?)
            }
            Expr::Binary(BinOp::OrOr, l, r) => {
                Val::Bool(l.eval(func, slots)?.as_bool()? || r.eval(func, slots)?.as_bool()?)
            }
            Expr::Binary(op, l, r) => binary(*op, l.eval(func, slots)?, r.eval(func, slots)?)?,
            Expr::Call(builtin, args) => {
                let args = args
                    .iter()
                    .map(|arg| arg.eval(func, slots))
                    .collect::<Result<Vec<_>, _>>()?;
                call(*builtin, &args, func)?
            }
        };
        Ok(val)
    }
}

fn binary(op: BinOp, l: Val, r: Val) -> Result<Val, EvalError> {
    if let (Val::Int(a), Val::Int(b)) = (&l, &r) {
        let (a, b) = (*a, *b);
        let val = match op {
            BinOp::Add => Val::Int(a.wrapping_add(b)),
            BinOp::Sub => Val::Int(a.wrapping_sub(b)),
            BinOp::Mul => Val::Int(a.wrapping_mul(b)),
            BinOp::Div if b == 0 => return Err(EvalError::DivisionByZero),
            BinOp::Div => Val::Int(a.wrapping_div(b)),
            BinOp::Rem if b == 0 => return Err(EvalError::DivisionByZero),
            BinOp::Rem => Val::Int(a.wrapping_rem(b)),
            BinOp::And => Val::Int(a & b),
            BinOp::Or => Val::Int(a | b),
            BinOp::Xor => Val::Int(a ^ b),
            BinOp::Shl | BinOp::Shr if b < 0 => return Err(EvalError::Shift(b)),
            BinOp::Shl if b >= 64 => Val::Int(0),
            BinOp::Shl => Val::Int(a << b),
            BinOp::Shr => Val::Int(a >> b.min(63)),
            _ => compare(op, a.cmp(&b)),
        };
        return Ok(val);
    }

    match op {
        BinOp::Eq => return Ok(Val::Bool(equal(&l, &r)?)),
        BinOp::Ne => return Ok(Val::Bool(!equal(&l, &r)?)),
        _ => {}
    }

    if let (Val::Bool(a), Val::Bool(b)) = (&l, &r) {
        match op {
            BinOp::And => return Ok(Val::Bool(*a & *b)),
            BinOp::Or => return Ok(Val::Bool(*a | *b)),
            BinOp::Xor => return Ok(Val::Bool(*a ^ *b)),
            _ => return Err(type_error("a number", &l)),
        }
    }

    let (a, b) = (l.as_float()?, r.as_float()?);
    let val = match op {
        BinOp::Add => Val::Float(a + b),
        BinOp::Sub => Val::Float(a - b),
        BinOp::Mul => Val::Float(a * b),
        BinOp::Div => Val::Float(a / b),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => match a.partial_cmp(&b) {
            Some(ordering) => compare(op, ordering),
            // NaN compares false
            None => Val::Bool(false),
        },
        _ => return Err(type_error("an integer", &Val::Float(a))),
    };
    Ok(val)
}

fn compare(op: BinOp, ordering: std::cmp::Ordering) -> Val {
    Val::Bool(match op {
        BinOp::Eq => ordering.is_eq(),
        BinOp::Ne => ordering.is_ne(),
        BinOp::Lt => ordering.is_lt(),
        BinOp::Le => ordering.is_le(),
        BinOp::Gt => ordering.is_gt(),
        BinOp::Ge => ordering.is_ge(),
        _ => unreachable!("not a comparison: {op:?}"),
    })
}

fn equal(l: &Val, r: &Val) -> Result<bool, EvalError> {
    let equal = match (l, r) {
        (Val::Int(a), Val::Int(b)) => a == b,
        (Val::Float(_) | Val::Int(_), Val::Float(_) | Val::Int(_)) => l.as_float()? == r.as_float()?,
        (Val::Bool(a), Val::Bool(b)) => a == b,
        (Val::Type(a), Val::Type(b)) => a == b,
        (Val::Sym(a), Val::Sym(b)) => a == b,
        (Val::Sym(sym), Val::Str(name)) | (Val::Str(name), Val::Sym(sym)) => {
            sym.as_ref().is_some_and(|sym| sym.name() == name)
        }
        (Val::Str(a), Val::Str(b)) => a == b,
        (Val::Value(a), Val::Value(b)) => a == b,
        _ => return Err(type_error("operands of the same kind", r)),
    };
    Ok(equal)
}

/// Wraps `x` to the width of `ty`, sign extending when `ty` is signed.
fn wrap(ty: &Type, x: i64) -> Result<i64, EvalError> {
    let (bits, signed) = match ty {
        Type::Int { bits, signed } => (*bits as u32, *signed),
        Type::Ptr => (32, false),
        Type::Bool => return Ok((x != 0) as i64),
        other => return Err(type_error("an integer type", &Val::Type(other.clone()))),
    };
    if bits >= 64 {
        return Ok(x);
    }
    let shift = 64 - bits;
    Ok(if signed {
        (x << shift) >> shift
    } else {
        (((x as u64) << shift) >> shift) as i64
    })
}

fn call(builtin: Builtin, args: &[Val], func: &Func) -> Result<Val, EvalError> {
    let ty = |i: usize| args[i].as_type(func);
    let int = |i: usize| args[i].as_int();
    let is_int_of = |size: u32| -> Result<Val, EvalError> {
        let ty = ty(0)?;
        Ok(Val::Bool(ty.is_int() && ty.size() == size))
    };

    let val = match builtin {
        Builtin::Is8BitInt => is_int_of(1)?,
        Builtin::Is16BitInt => is_int_of(2)?,
        Builtin::Is32BitInt => is_int_of(4)?,
        Builtin::Is64BitInt => is_int_of(8)?,
        Builtin::IsInt => Val::Bool(ty(0)?.is_int()),
        Builtin::IsSigned => Val::Bool(ty(0)?.is_signed()),
        Builtin::IsPtr => Val::Bool(ty(0)?.is_ptr()),
        Builtin::IsBool => Val::Bool(ty(0)?.is_bool()),
        Builtin::IsFloat => Val::Bool(ty(0)?.is_float()),
        Builtin::Is32BitFloat => Val::Bool(ty(0)? == Type::FLOAT32),
        Builtin::Is64BitFloat => Val::Bool(ty(0)? == Type::FLOAT64),
        Builtin::Size => Val::Int(ty(0)?.size() as i64),
        Builtin::Norm => {
            let ty = ty(0)?;
            match ty {
                Type::Float { bits: 32 } => Val::Float(args[1].as_float()? as f32 as f64),
                Type::Float { .. } => Val::Float(args[1].as_float()?),
                ty => Val::Int(wrap(&ty, int(1)?)?),
            }
        }
        Builtin::Zext => {
            let bits = ty(0)?.size() * 8;
            let x = int(1)?;
            if bits == 0 || bits >= 64 {
                Val::Int(x)
            } else {
                Val::Int(x & ((1i64 << bits) - 1))
            }
        }
        Builtin::Is16Bit => Val::Bool(i16::try_from(int(0)?).is_ok()),
        Builtin::IsU16Bit => Val::Bool(u16::try_from(int(0)?).is_ok()),
        Builtin::IsPowerOfTwo => {
            let x = int(0)?;
            Val::Bool(x > 0 && x & (x - 1) == 0)
        }
        Builtin::Log2 => {
            let x = int(0)?;
            if x <= 0 {
                return Err(EvalError::Log2(x));
            }
            Val::Int(63 - x.leading_zeros() as i64)
        }
        Builtin::Int8 => Val::Int(int(0)? as i8 as i64),
        Builtin::Int16 => Val::Int(int(0)? as i16 as i64),
        Builtin::Int32 => Val::Int(int(0)? as i32 as i64),
        Builtin::Uint8 => Val::Int(int(0)? as u8 as i64),
        Builtin::Uint16 => Val::Int(int(0)? as u16 as i64),
        Builtin::Uint32 => Val::Int(int(0)? as u32 as i64),
        Builtin::B2i => Val::Int(args[0].as_bool()? as i64),
        Builtin::TypeOf => Val::Type(ty(0)?),
        Builtin::CanMergeSym => {
            Val::Bool(args[0].as_sym()?.is_none() || args[1].as_sym()?.is_none())
        }
        Builtin::MergeSym => match (args[0].as_sym()?, args[1].as_sym()?) {
            (Some(_), Some(_)) => return Err(EvalError::MergeSym),
            (a, b) => Val::Sym(a.or(b)),
        },
    };
    Ok(val)
}

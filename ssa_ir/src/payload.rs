use std::{fmt, hash::Hash, sync::Arc};

/// What kind of auxiliary payload an operation carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxKind {
    None,
    /// A 64-bit integer (constants, offsets, shift amounts).
    Int,
    /// A floating point constant.
    Float,
    /// A symbol that must be present.
    Sym,
    /// An integer offset with an optional symbol (memory operations after lowering).
    SymOff,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymKind {
    /// Resolved by the linker, references to it become relocations.
    Extern,
    /// A function-local stack slot of the given size in bytes.
    Auto { size: u32 },
}

/// A named symbol referenced by an auxiliary payload.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    name: Arc<str>,
    kind: SymKind,
}

impl Symbol {
    pub fn external(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            kind: SymKind::Extern,
        }
    }

    pub fn auto(name: &str, size: u32) -> Self {
        Self {
            name: Arc::from(name),
            kind: SymKind::Auto { size },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &SymKind {
        &self.kind
    }

    pub fn is_auto(&self) -> bool {
        matches!(self.kind, SymKind::Auto { .. })
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SymKind::Extern => f.write_str(&self.name),
            SymKind::Auto { size } => write!(f, "auto:{}:{size}", self.name),
        }
    }
}

/// The auxiliary payload of a value.
///
/// Floats compare and hash by their bit pattern so that values can be used as keys (e.g. when
/// eliminating common subexpressions).
#[derive(Debug, Clone, Default)]
pub enum Aux {
    #[default]
    None,
    Int(i64),
    Float(f64),
    Sym { sym: Option<Symbol>, off: i64 },
}

impl Aux {
    pub fn sym(sym: Symbol) -> Self {
        Self::Sym {
            sym: Some(sym),
            off: 0,
        }
    }

    pub fn kind_matches(&self, kind: AuxKind) -> bool {
        match (kind, self) {
            (AuxKind::None, Aux::None) => true,
            (AuxKind::Int, Aux::Int(_)) => true,
            (AuxKind::Float, Aux::Float(_)) => true,
            (AuxKind::Sym, Aux::Sym { sym: Some(_), .. }) => true,
            (AuxKind::SymOff, Aux::Sym { .. }) => true,
            _ => false,
        }
    }

    /// The integer part of the payload: the constant or the offset.
    pub fn int(&self) -> Option<i64> {
        match self {
            Aux::Int(i) => Some(*i),
            Aux::Sym { off, .. } => Some(*off),
            _ => None,
        }
    }

    pub fn float(&self) -> Option<f64> {
        match self {
            Aux::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn symbol(&self) -> Option<&Symbol> {
        match self {
            Aux::Sym { sym, .. } => sym.as_ref(),
            _ => None,
        }
    }
}

impl PartialEq for Aux {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Aux::None, Aux::None) => true,
            (Aux::Int(a), Aux::Int(b)) => a == b,
            (Aux::Float(a), Aux::Float(b)) => a.to_bits() == b.to_bits(),
            (Aux::Sym { sym: s1, off: o1 }, Aux::Sym { sym: s2, off: o2 }) => s1 == s2 && o1 == o2,
            _ => false,
        }
    }
}

impl Eq for Aux {}

impl Hash for Aux {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Aux::None => {}
            Aux::Int(i) => i.hash(state),
            Aux::Float(f) => f.to_bits().hash(state),
            Aux::Sym { sym, off } => {
                sym.hash(state);
                off.hash(state);
            }
        }
    }
}

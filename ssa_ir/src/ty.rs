use std::{fmt, str::FromStr};

/// The semantic type of an SSA value.
///
/// Integer and float types carry their width in bits. `Mem` is the memory token threaded through
/// side-effecting operations, `Flags` is the result of a flag-producing compare and `Tuple` is the
/// result of an operation with two results (e.g. a call that yields a word and a new memory).
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Int { bits: u8, signed: bool },
    Float { bits: u8 },
    Bool,
    Ptr,
    Mem,
    Flags,
    Void,
    Tuple(Box<(Type, Type)>),
}

impl Type {
    pub const INT8: Self = Self::Int { bits: 8, signed: true };
    pub const INT16: Self = Self::Int { bits: 16, signed: true };
    pub const INT32: Self = Self::Int { bits: 32, signed: true };
    pub const INT64: Self = Self::Int { bits: 64, signed: true };
    pub const UINT8: Self = Self::Int { bits: 8, signed: false };
    pub const UINT16: Self = Self::Int { bits: 16, signed: false };
    pub const UINT32: Self = Self::Int { bits: 32, signed: false };
    pub const UINT64: Self = Self::Int { bits: 64, signed: false };
    pub const FLOAT32: Self = Self::Float { bits: 32 };
    pub const FLOAT64: Self = Self::Float { bits: 64 };

    pub fn tuple(first: Type, second: Type) -> Self {
        Self::Tuple(Box::new((first, second)))
    }

    /// Size in bytes of a value of this type. Memory, flags, void and tuples have no size.
    pub fn size(&self) -> u32 {
        match self {
            Type::Int { bits, .. } | Type::Float { bits } => *bits as u32 / 8,
            Type::Bool => 1,
            Type::Ptr => 4,
            Type::Mem | Type::Flags | Type::Void | Type::Tuple(_) => 0,
        }
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Type::Int { .. })
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Type::Int { signed: true, .. })
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Type::Float { .. })
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Type::Bool)
    }

    pub fn is_ptr(&self) -> bool {
        matches!(self, Type::Ptr)
    }

    pub fn is_memory(&self) -> bool {
        matches!(self, Type::Mem)
    }

    pub fn is_flags(&self) -> bool {
        matches!(self, Type::Flags)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self, Type::Tuple(_))
    }

    /// Returns `true` if a value of this type lives in a register.
    pub fn is_register_sized(&self) -> bool {
        self.size() > 0
    }

    /// Returns the `i`th element of a tuple type.
    pub fn field(&self, i: usize) -> Option<&Type> {
        match (self, i) {
            (Type::Tuple(pair), 0) => Some(&pair.0),
            (Type::Tuple(pair), 1) => Some(&pair.1),
            _ => None,
        }
    }

    /// Returns `true` if this type is memory or a tuple containing memory.
    pub fn has_memory(&self) -> bool {
        match self {
            Type::Mem => true,
            Type::Tuple(pair) => pair.0.has_memory() || pair.1.has_memory(),
            _ => false,
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int { bits, signed: true } => write!(f, "Int{bits}"),
            Type::Int { bits, signed: false } => write!(f, "UInt{bits}"),
            Type::Float { bits } => write!(f, "Float{bits}"),
            Type::Bool => f.write_str("Bool"),
            Type::Ptr => f.write_str("Ptr"),
            Type::Mem => f.write_str("Mem"),
            Type::Flags => f.write_str("Flags"),
            Type::Void => f.write_str("Void"),
            Type::Tuple(pair) => write!(f, "({},{})", pair.0, pair.1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown type `{0}`")]
pub struct UnknownType(pub String);

impl FromStr for Type {
    type Err = UnknownType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(inner) = s.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
            let mut depth = 0;
            for (i, c) in inner.char_indices() {
                match c {
                    '(' => depth += 1,
                    ')' => depth -= 1,
                    ',' if depth == 0 => {
                        let first = inner[..i].parse()?;
                        let second = inner[i + 1..].parse()?;
                        return Ok(Type::tuple(first, second));
                    }
                    _ => {}
                }
            }
            return Err(UnknownType(s.to_owned()));
        }
        let ty = match s {
            "Int8" => Type::INT8,
            "Int16" => Type::INT16,
            "Int32" => Type::INT32,
            "Int64" => Type::INT64,
            "UInt8" => Type::UINT8,
            "UInt16" => Type::UINT16,
            "UInt32" => Type::UINT32,
            "UInt64" => Type::UINT64,
            "Float32" => Type::FLOAT32,
            "Float64" => Type::FLOAT64,
            "Bool" => Type::Bool,
            "Ptr" => Type::Ptr,
            "Mem" => Type::Mem,
            "Flags" => Type::Flags,
            "Void" => Type::Void,
            _ => return Err(UnknownType(s.to_owned())),
        };
        Ok(ty)
    }
}

/// Returns `true` if `name` names a type (as opposed to e.g. a rule variable).
pub fn is_type_name(name: &str) -> bool {
    name.starts_with('(') || name.parse::<Type>().is_ok()
}

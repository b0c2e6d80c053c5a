//! Runtime values for encoding/decoding.

use crate::flags::FlagSet;
use crate::packet::Packet;
use crate::scalar::LongDouble;
use std::fmt;

/// A single field value.
///
/// Integers of every width and signedness are held as `i128`, which covers both
/// `u64` and `i64`. Floats compare by bit pattern, so a NaN equals itself and
/// `0.0 != -0.0`.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i128),
    Float(f32),
    Double(f64),
    LongDouble(LongDouble),
    Flags(FlagSet),
    List(Vec<Value>),
    Packet(Box<Packet>),
}

impl Value {
    pub fn as_int(&self) -> Option<i128> {
        match self {
            Value::Int(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.as_int().and_then(|x| u64::try_from(x).ok())
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_int().and_then(|x| i64::try_from(x).ok())
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(x) => Some(*x),
            Value::Float(x) => Some(*x as f64),
            Value::LongDouble(x) => Some(x.to_f64()),
            _ => None,
        }
    }

    pub fn as_long_double(&self) -> Option<LongDouble> {
        match self {
            Value::LongDouble(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_flags(&self) -> Option<&FlagSet> {
        match self {
            Value::Flags(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_packet(&self) -> Option<&Packet> {
        match self {
            Value::Packet(p) => Some(p),
            _ => None,
        }
    }

    /// Short name of the variant, used in type mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::LongDouble(_) => "long double",
            Value::Flags(_) => "flag set",
            Value::List(_) => "list",
            Value::Packet(_) => "packet",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::LongDouble(a), Value::LongDouble(b)) => a == b,
            (Value::Flags(a), Value::Flags(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Packet(a), Value::Packet(b)) => a == b,
            _ => false,
        }
    }
}

macro_rules! int_from {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(v as i128)
            }
        })*
    };
}

int_from!(u8, u16, u32, u64, i8, i16, i32, i64, i128, usize);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<LongDouble> for Value {
    fn from(v: LongDouble) -> Self {
        Value::LongDouble(v)
    }
}

impl From<FlagSet> for Value {
    fn from(v: FlagSet) -> Self {
        Value::Flags(v)
    }
}

impl From<Packet> for Value {
    fn from(v: Packet) -> Self {
        Value::Packet(Box::new(v))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(x) => write!(f, "{}", x),
            Value::Float(x) => write!(f, "{}", x),
            Value::Double(x) => write!(f, "{}", x),
            Value::LongDouble(x) => write!(f, "{}L", x),
            Value::Flags(x) => write!(f, "{}", x),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Packet(p) => write!(f, "{}", p),
        }
    }
}

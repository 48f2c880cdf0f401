//! The primitive operations available to builtin methods.
//!
//! Every `BuiltinMethod` names its operation with an opcode string. This
//! module parses those strings into `Opcode`, provides constructors for the
//! standard builtin methods, and gives the concrete semantics of each opcode,
//! which the concrete domains share.
//!
//! Builtin methods take their parameters in the order `a`, `b`.

use crate::model::{BuiltinMethod, Value};
use crate::Error;
use num_bigint::BigInt;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A primitive operation.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Opcode {
    Load,
    INeg,
    IAdd,
    ISub,
    IMul,
    IGe,
    ILt,
    ILe,
    IGt,
    IEq,
    RNeg,
    RAdd,
    RSub,
    RMul,
    RGe,
    RLt,
    RLe,
    RGt,
    REq,
    BNot,
    BAnd,
    Append,
    IsBoolean,
    IsInteger,
    IsReal,
}

const OPCODES: [Opcode; 25] = [
    Opcode::Load,
    Opcode::INeg,
    Opcode::IAdd,
    Opcode::ISub,
    Opcode::IMul,
    Opcode::IGe,
    Opcode::ILt,
    Opcode::ILe,
    Opcode::IGt,
    Opcode::IEq,
    Opcode::RNeg,
    Opcode::RAdd,
    Opcode::RSub,
    Opcode::RMul,
    Opcode::RGe,
    Opcode::RLt,
    Opcode::RLe,
    Opcode::RGt,
    Opcode::REq,
    Opcode::BNot,
    Opcode::BAnd,
    Opcode::Append,
    Opcode::IsBoolean,
    Opcode::IsInteger,
    Opcode::IsReal,
];

impl Opcode {
    /// Every opcode.
    pub fn all() -> &'static [Opcode] {
        &OPCODES
    }

    /// The opcode string of this `Opcode`.
    pub fn name(&self) -> &'static str {
        match *self {
            Opcode::Load => "load",
            Opcode::INeg => "i_neg",
            Opcode::IAdd => "i_add",
            Opcode::ISub => "i_sub",
            Opcode::IMul => "i_mul",
            Opcode::IGe => "i_ge",
            Opcode::ILt => "i_lt",
            Opcode::ILe => "i_le",
            Opcode::IGt => "i_gt",
            Opcode::IEq => "i_eq",
            Opcode::RNeg => "r_neg",
            Opcode::RAdd => "r_add",
            Opcode::RSub => "r_sub",
            Opcode::RMul => "r_mul",
            Opcode::RGe => "r_ge",
            Opcode::RLt => "r_lt",
            Opcode::RLe => "r_le",
            Opcode::RGt => "r_gt",
            Opcode::REq => "r_eq",
            Opcode::BNot => "b_not",
            Opcode::BAnd => "b_and",
            Opcode::Append => "append",
            Opcode::IsBoolean => "boolean",
            Opcode::IsInteger => "integer",
            Opcode::IsReal => "real",
        }
    }

    /// The number of operands this opcode takes.
    pub fn arity(&self) -> usize {
        match *self {
            Opcode::Load
            | Opcode::INeg
            | Opcode::RNeg
            | Opcode::BNot
            | Opcode::IsBoolean
            | Opcode::IsInteger
            | Opcode::IsReal => 1,
            _ => 2,
        }
    }

    /// A `BuiltinMethod` applying this opcode.
    pub fn builtin(&self) -> BuiltinMethod {
        let argmap = if self.arity() == 1 {
            vec!["a"]
        } else {
            vec!["a", "b"]
        };
        BuiltinMethod::new(argmap, self.name())
    }

    /// Apply this opcode to concrete operands.
    pub fn apply(&self, operands: &[Value]) -> Result<Value, Error> {
        if operands.len() != self.arity() {
            return Err(Error::invalid_operands(self.name(), operands));
        }

        match *self {
            Opcode::Load => Ok(operands[0].clone()),
            Opcode::INeg | Opcode::RNeg => match operands[0] {
                Value::Integer(ref i) => Ok(Value::Integer(-i)),
                Value::Real(r) => Ok(Value::real(-r.value())),
                _ => Err(Error::invalid_operands(self.name(), operands)),
            },
            Opcode::IAdd | Opcode::RAdd => {
                self.arithmetic(operands, |a, b| a + b, |a, b| a + b)
            }
            Opcode::ISub | Opcode::RSub => {
                self.arithmetic(operands, |a, b| a - b, |a, b| a - b)
            }
            Opcode::IMul | Opcode::RMul => {
                self.arithmetic(operands, |a, b| a * b, |a, b| a * b)
            }
            Opcode::IGe | Opcode::RGe => self.compare(operands, |o| o != Ordering::Less),
            Opcode::ILt | Opcode::RLt => self.compare(operands, |o| o == Ordering::Less),
            Opcode::ILe | Opcode::RLe => self.compare(operands, |o| o != Ordering::Greater),
            Opcode::IGt | Opcode::RGt => self.compare(operands, |o| o == Ordering::Greater),
            Opcode::IEq | Opcode::REq => {
                if operands[0].to_f64().is_some() && operands[1].to_f64().is_some() {
                    self.compare(operands, |o| o == Ordering::Equal)
                } else {
                    Ok(Value::Boolean(operands[0] == operands[1]))
                }
            }
            Opcode::BNot => match operands[0] {
                Value::Boolean(b) => Ok(Value::Boolean(!b)),
                _ => Err(Error::invalid_operands(self.name(), operands)),
            },
            Opcode::BAnd => match (&operands[0], &operands[1]) {
                (Value::Boolean(a), Value::Boolean(b)) => Ok(Value::Boolean(*a && *b)),
                _ => Err(Error::invalid_operands(self.name(), operands)),
            },
            Opcode::Append => match operands[0] {
                Value::Tuple(ref values) => {
                    let mut values = values.clone();
                    values.push(operands[1].clone());
                    Ok(Value::Tuple(values))
                }
                _ => Err(Error::invalid_operands(self.name(), operands)),
            },
            Opcode::IsBoolean => Ok(Value::Boolean(matches!(operands[0], Value::Boolean(_)))),
            Opcode::IsInteger => Ok(Value::Boolean(matches!(operands[0], Value::Integer(_)))),
            Opcode::IsReal => Ok(Value::Boolean(matches!(operands[0], Value::Real(_)))),
        }
    }

    /// Integer operands stay integers. If either operand is real, both are
    /// promoted to real.
    fn arithmetic<I, R>(&self, operands: &[Value], integer: I, real: R) -> Result<Value, Error>
    where
        I: Fn(&BigInt, &BigInt) -> BigInt,
        R: Fn(f64, f64) -> f64,
    {
        match (&operands[0], &operands[1]) {
            (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(integer(a, b))),
            (a, b) => match (a.to_f64(), b.to_f64()) {
                (Some(a), Some(b)) => Ok(Value::real(real(a, b))),
                _ => Err(Error::invalid_operands(self.name(), operands)),
            },
        }
    }

    fn compare<P>(&self, operands: &[Value], predicate: P) -> Result<Value, Error>
    where
        P: Fn(Ordering) -> bool,
    {
        let ordering = match (&operands[0], &operands[1]) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (a, b) => match (a.to_f64(), b.to_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => return Err(Error::invalid_operands(self.name(), operands)),
            },
        };
        // Comparisons with NaN are false.
        Ok(Value::Boolean(ordering.map(predicate).unwrap_or(false)))
    }
}

impl FromStr for Opcode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Opcode, Error> {
        OPCODES
            .iter()
            .find(|opcode| opcode.name() == s)
            .copied()
            .ok_or_else(|| Error::UnknownOpcode(s.to_string()))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Apply the opcode named `opcode` to concrete operands.
pub fn apply(opcode: &str, operands: &[Value]) -> Result<Value, Error> {
    opcode.parse::<Opcode>()?.apply(operands)
}

macro_rules! builtin {
    ($p: expr, $n: ident) => {
        pub fn $n() -> BuiltinMethod {
            $p.builtin()
        }
    };
}

builtin!(Opcode::Load, load);
builtin!(Opcode::INeg, i_neg);
builtin!(Opcode::IAdd, i_add);
builtin!(Opcode::ISub, i_sub);
builtin!(Opcode::IMul, i_mul);
builtin!(Opcode::IGe, i_ge);
builtin!(Opcode::ILt, i_lt);
builtin!(Opcode::ILe, i_le);
builtin!(Opcode::IGt, i_gt);
builtin!(Opcode::IEq, i_eq);
builtin!(Opcode::RNeg, r_neg);
builtin!(Opcode::RAdd, r_add);
builtin!(Opcode::RSub, r_sub);
builtin!(Opcode::RMul, r_mul);
builtin!(Opcode::RGe, r_ge);
builtin!(Opcode::RLt, r_lt);
builtin!(Opcode::RLe, r_le);
builtin!(Opcode::RGt, r_gt);
builtin!(Opcode::REq, r_eq);
builtin!(Opcode::BNot, b_not);
builtin!(Opcode::BAnd, b_and);
builtin!(Opcode::Append, append);
builtin!(Opcode::IsBoolean, boolean);
builtin!(Opcode::IsInteger, integer);
builtin!(Opcode::IsReal, real);

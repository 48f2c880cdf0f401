use crate::builtin::Opcode;
use crate::domain::{Domain, Elements};
use crate::model::Value;
use crate::Error;

bitflags! {
    /// The set of types a value may have.
    #[derive(Default)]
    pub struct Types: u8 {
        const INTEGER = 0b0001;
        const REAL    = 0b0010;
        const BOOLEAN = 0b0100;
        const TUPLE   = 0b1000;
    }
}

impl Types {
    /// The type of a concrete value.
    pub fn of(value: &Value) -> Types {
        match *value {
            Value::Boolean(_) => Types::BOOLEAN,
            Value::Integer(_) => Types::INTEGER,
            Value::Real(_) => Types::REAL,
            Value::Tuple(_) => Types::TUPLE,
        }
    }
}

/// A type analysis.
///
/// Builtins check that each operand can only be of the type they operate on.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TypeSet;

impl TypeSet {
    /// `result` if every operand is known, and may only be of the types in
    /// `required`. Otherwise the extremum.
    fn all_is(required: Types, result: Types, operands: &[Types]) -> Types {
        if operands
            .iter()
            .all(|operand| !operand.is_empty() && required.contains(*operand))
        {
            result
        } else {
            Types::empty()
        }
    }

    /// `BOOLEAN` if the operand may be of type `tested`.
    fn may_be(tested: Types, operand: Types) -> Types {
        if operand.contains(tested) {
            Types::BOOLEAN
        } else {
            Types::empty()
        }
    }
}

impl Domain for TypeSet {
    type Value = Types;

    fn constant(&self, value: &Value) -> Result<Types, Error> {
        Ok(Types::of(value))
    }

    fn merge(&self, lhs: &Types, rhs: &Types) -> Result<Types, Error> {
        Ok(*lhs | *rhs)
    }

    fn extremum(&self) -> Types {
        Types::empty()
    }

    fn allow(&self, guard: &Types) -> bool {
        let truth = *guard == Types::BOOLEAN;
        debug!("allow {:?} -> {}", guard, truth);
        truth
    }

    fn apply(&self, opcode: &str, operands: &[Types]) -> Result<Types, Error> {
        let opcode: Opcode = opcode.parse()?;
        if operands.len() != opcode.arity() {
            return Err(Error::invalid_operands(opcode.name(), operands));
        }

        let result = match opcode {
            Opcode::Load => operands[0],
            Opcode::INeg | Opcode::IAdd | Opcode::ISub | Opcode::IMul => {
                TypeSet::all_is(Types::INTEGER, Types::INTEGER, operands)
            }
            Opcode::IGe | Opcode::ILt | Opcode::ILe | Opcode::IGt | Opcode::IEq => {
                TypeSet::all_is(Types::INTEGER, Types::BOOLEAN, operands)
            }
            Opcode::RNeg | Opcode::RAdd | Opcode::RSub | Opcode::RMul => {
                TypeSet::all_is(Types::REAL, Types::REAL, operands)
            }
            Opcode::RGe | Opcode::RLt | Opcode::RLe | Opcode::RGt | Opcode::REq => {
                TypeSet::all_is(Types::REAL, Types::BOOLEAN, operands)
            }
            Opcode::BNot | Opcode::BAnd => {
                TypeSet::all_is(Types::BOOLEAN, Types::BOOLEAN, operands)
            }
            Opcode::Append => {
                if operands[0] == Types::TUPLE && !operands[1].is_empty() {
                    Types::TUPLE
                } else {
                    Types::empty()
                }
            }
            Opcode::IsBoolean => TypeSet::may_be(Types::BOOLEAN, operands[0]),
            Opcode::IsInteger => TypeSet::may_be(Types::INTEGER, operands[0]),
            Opcode::IsReal => TypeSet::may_be(Types::REAL, operands[0]),
        };

        trace!("{}{:?} -> {:?}", opcode, operands, result);
        Ok(result)
    }

    /// A tuple type says nothing about the length or the element types of the
    /// tuple, so its elements may be of any type.
    fn elements(&self, collection: &Types) -> Result<Elements<Types>, Error> {
        if collection.contains(Types::TUPLE) {
            Ok(Elements::Summary(Types::all()))
        } else {
            Err(Error::Unsupported(format!("reduce over {:?}", collection)))
        }
    }
}

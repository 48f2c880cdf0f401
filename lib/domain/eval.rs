use crate::builtin::Opcode;
use crate::domain::{Domain, Elements};
use crate::model::Value;
use crate::Error;

/// Concrete, deterministic evaluation.
///
/// `None` means no result has been produced. Every other domain must agree
/// with, or over-approximate, the results of `Eval`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Eval;

impl Domain for Eval {
    type Value = Option<Value>;

    fn constant(&self, value: &Value) -> Result<Option<Value>, Error> {
        Ok(Some(value.clone()))
    }

    /// Two different results means two admissible methods disagree, which a
    /// deterministic evaluation cannot represent.
    fn merge(&self, lhs: &Option<Value>, rhs: &Option<Value>) -> Result<Option<Value>, Error> {
        match (lhs, rhs) {
            (None, _) => Ok(rhs.clone()),
            (_, None) => Ok(lhs.clone()),
            (Some(l), Some(r)) => {
                if l == r {
                    Ok(lhs.clone())
                } else {
                    Err(Error::Nondeterministic(l.to_string(), r.to_string()))
                }
            }
        }
    }

    fn extremum(&self) -> Option<Value> {
        None
    }

    fn allow(&self, guard: &Option<Value>) -> bool {
        let truth = *guard == Some(Value::Boolean(true));
        debug!("allow {:?} -> {}", guard, truth);
        truth
    }

    fn apply(&self, opcode: &str, operands: &[Option<Value>]) -> Result<Option<Value>, Error> {
        let opcode: Opcode = opcode.parse()?;
        let operands = match operands.iter().cloned().collect::<Option<Vec<Value>>>() {
            Some(operands) => operands,
            None => return Ok(None),
        };
        let result = opcode.apply(&operands)?;
        trace!("{}{:?} -> {}", opcode, operands, result);
        Ok(Some(result))
    }

    fn elements(&self, collection: &Option<Value>) -> Result<Elements<Option<Value>>, Error> {
        match *collection {
            Some(Value::Tuple(ref values)) => Ok(Elements::Exact(
                values.iter().cloned().map(Some).collect(),
            )),
            Some(ref value) => Err(Error::Unsupported(format!("reduce over {}", value))),
            None => Ok(Elements::Exact(Vec::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::assert_lattice_laws;

    #[test]
    fn lattice_laws() {
        assert_lattice_laws(
            &Eval,
            &[
                None,
                Some(Value::integer(1)),
                Some(Value::integer(2)),
                Some(Value::Boolean(true)),
            ],
        );
    }

    #[test]
    fn merge_conflict() {
        assert!(matches!(
            Eval.merge(&Some(Value::integer(1)), &Some(Value::integer(2))),
            Err(Error::Nondeterministic(_, _))
        ));
    }

    #[test]
    fn apply() {
        assert_eq!(
            Eval.apply("i_add", &[Some(Value::integer(2)), Some(Value::integer(1))])
                .unwrap(),
            Some(Value::integer(3))
        );
        assert_eq!(
            Eval.apply("i_add", &[None, Some(Value::integer(1))]).unwrap(),
            None
        );
    }

    #[test]
    fn allow() {
        assert!(Eval.allow(&Some(Value::Boolean(true))));
        assert!(!Eval.allow(&Some(Value::Boolean(false))));
        assert!(!Eval.allow(&Some(Value::integer(1))));
        assert!(!Eval.allow(&None));
    }

    #[test]
    fn elements() {
        let tuple = Some(Value::tuple(vec![Value::integer(1), Value::integer(2)]));
        assert_eq!(
            Eval.elements(&tuple).unwrap(),
            Elements::Exact(vec![Some(Value::integer(1)), Some(Value::integer(2))])
        );
        assert!(Eval.elements(&Some(Value::integer(1))).is_err());
    }
}

use crate::builtin::Opcode;
use crate::domain::{Domain, Elements};
use crate::model::Value;
use crate::Error;
use std::collections::BTreeSet;

/// Analyse many concrete values at once.
///
/// Every abstract value is the finite set of concrete values a node may take.
/// Builtins are applied to every combination of their operands.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FiniteSet;

impl FiniteSet {
    fn product(operands: &[BTreeSet<Value>]) -> Vec<Vec<Value>> {
        let mut combinations: Vec<Vec<Value>> = vec![Vec::new()];
        for operand in operands {
            combinations = combinations
                .iter()
                .flat_map(|prefix| {
                    operand.iter().map(move |value| {
                        let mut combination = prefix.clone();
                        combination.push(value.clone());
                        combination
                    })
                })
                .collect();
        }
        combinations
    }
}

impl Domain for FiniteSet {
    type Value = BTreeSet<Value>;

    fn constant(&self, value: &Value) -> Result<BTreeSet<Value>, Error> {
        let mut set = BTreeSet::new();
        set.insert(value.clone());
        Ok(set)
    }

    fn merge(
        &self,
        lhs: &BTreeSet<Value>,
        rhs: &BTreeSet<Value>,
    ) -> Result<BTreeSet<Value>, Error> {
        Ok(lhs.union(rhs).cloned().collect())
    }

    fn extremum(&self) -> BTreeSet<Value> {
        BTreeSet::new()
    }

    fn allow(&self, guard: &BTreeSet<Value>) -> bool {
        let truth = guard.len() == 1 && guard.contains(&Value::Boolean(true));
        debug!("allow {:?} -> {}", guard, truth);
        truth
    }

    fn apply(&self, opcode: &str, operands: &[BTreeSet<Value>]) -> Result<BTreeSet<Value>, Error> {
        let opcode: Opcode = opcode.parse()?;
        let result = FiniteSet::product(operands)
            .iter()
            .map(|combination| opcode.apply(combination))
            .collect::<Result<BTreeSet<Value>, Error>>()?;
        trace!("{}{:?} -> {:?}", opcode, operands, result);
        Ok(result)
    }

    /// Element `i` is the set of every `i`th element of the tuples in
    /// `collection`. The tuples must all have the same length.
    fn elements(&self, collection: &BTreeSet<Value>) -> Result<Elements<BTreeSet<Value>>, Error> {
        let mut elements: Option<Vec<BTreeSet<Value>>> = None;
        for value in collection {
            let tuple = value
                .as_tuple()
                .ok_or_else(|| Error::Unsupported(format!("reduce over {}", value)))?;
            let sets = elements.get_or_insert_with(|| vec![BTreeSet::new(); tuple.len()]);
            if sets.len() != tuple.len() {
                return Err(Error::Unsupported(format!(
                    "reduce over tuples of differing lengths {:?}",
                    collection
                )));
            }
            for (set, element) in sets.iter_mut().zip(tuple) {
                set.insert(element.clone());
            }
        }
        Ok(Elements::Exact(elements.unwrap_or_default()))
    }
}

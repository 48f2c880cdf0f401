//! Abstractions/traits for an abstract domain.
//!
//! A `Domain` decides how a graph is interpreted. The evaluator only ever
//! manipulates `Domain::Value`s through the operations of this trait.

use crate::model::Value;
use crate::Error;
use std::fmt::Debug;
use std::hash::Hash;

mod eval;
mod finite_set;
mod type_set;

pub use self::eval::Eval;
pub use self::finite_set::FiniteSet;
pub use self::type_set::{TypeSet, Types};

/// The elements of a collection, as seen by a domain.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Elements<V> {
    /// Every element, in order.
    Exact(Vec<V>),
    /// A collection of unknown length, every element of which is described by
    /// this value.
    Summary(V),
}

/// An abstract domain, with a join semi-lattice of values.
pub trait Domain {
    /// An abstract value.
    type Value: Clone + Debug + Eq + Hash + Ord;

    /// Lift a concrete argument, bound to the variable `name`, into this
    /// domain.
    fn transform(&self, _name: &str, value: &Value) -> Result<Self::Value, Error> {
        self.constant(value)
    }

    /// Lift a literal constant into this domain.
    fn constant(&self, value: &Value) -> Result<Self::Value, Error>;

    /// Join two abstract values. `merge(extremum, x)` must be `x`, and `merge`
    /// must be commutative and associative.
    fn merge(&self, lhs: &Self::Value, rhs: &Self::Value) -> Result<Self::Value, Error>;

    /// The identity of `merge`. No information, or unreachable.
    fn extremum(&self) -> Self::Value;

    /// Returns true if a guard which produced `guard` admits its statement.
    fn allow(&self, guard: &Self::Value) -> bool;

    /// The result of the builtin `opcode` applied to `operands`, given in
    /// `argmap` order.
    fn apply(&self, opcode: &str, operands: &[Self::Value]) -> Result<Self::Value, Error>;

    /// Split a collection into its elements, for `Reduce` nodes.
    fn elements(&self, collection: &Self::Value) -> Result<Elements<Self::Value>, Error> {
        Err(Error::Unsupported(format!(
            "this domain cannot decompose the collection {:?}",
            collection
        )))
    }
}

/// Assert the lattice laws of `merge` over every combination of `samples`.
#[cfg(test)]
pub(crate) fn assert_lattice_laws<D: Domain>(domain: &D, samples: &[D::Value]) {
    let extremum = domain.extremum();
    for a in samples {
        assert_eq!(&domain.merge(&extremum, a).unwrap(), a);
        assert_eq!(&domain.merge(a, &extremum).unwrap(), a);
        assert_eq!(&domain.merge(a, a).unwrap(), a);
        for b in samples {
            assert_eq!(domain.merge(a, b).ok(), domain.merge(b, a).ok());
            for c in samples {
                let left = domain
                    .merge(a, b)
                    .and_then(|ab| domain.merge(&ab, c))
                    .ok();
                let right = domain
                    .merge(b, c)
                    .and_then(|bc| domain.merge(a, &bc))
                    .ok();
                assert_eq!(left, right, "merge of {:?}, {:?}, {:?}", a, b, c);
            }
        }
    }
}

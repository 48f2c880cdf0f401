//! FBML: guarded, multiple-dispatch flow graphs over pluggable abstract domains.
//!
//! A program in FBML is a set of `Function`s. Each function owns a list of
//! methods, and each method is a guard graph and a statement graph. When a
//! function is called, every method whose guard is admitted by the active
//! abstract domain contributes its statement's result, and all contributions
//! are joined.
//!
//! The same graph can be interpreted in many ways by swapping the domain:
//!
//! * `domain::Eval` runs the graph concretely and deterministically.
//! * `domain::FiniteSet` runs the graph over finite sets of concrete values.
//! * `domain::TypeSet` runs the graph as a type analysis.
//!
//! The `evaluator` module computes the result of a function under a domain,
//! iterating recursive calls to a fixed point, and the `specializer` module
//! uses the results of an evaluation to build a residual program containing
//! only the methods which are reachable for a given input.
//!
//! ```
//! use fbml::builtin;
//! use fbml::domain::Eval;
//! use fbml::evaluator::Evaluator;
//! use fbml::model::{Arguments, Function, Method, Node, Program, Value};
//!
//! let mut program = Program::new();
//! let incr = program.add(Function::new(
//!     Some("incr"),
//!     vec![("value", Value::integer(1))],
//!     vec![Method::new(
//!         Node::literal(Value::Boolean(true)),
//!         Node::builtin(
//!             builtin::i_add(),
//!             vec![("a", Node::variable("number")), ("b", Node::variable("value"))],
//!         ),
//!     )
//!     .into()],
//! ));
//!
//! let evaluator = Evaluator::new(&program, Eval);
//! let result = evaluator
//!     .evaluate(incr, &Arguments::from(vec![("number", Value::integer(2))]))
//!     .unwrap();
//! assert_eq!(result, Some(Value::integer(3)));
//! ```

#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate log;

use thiserror::Error;

pub mod builtin;
pub mod domain;
pub mod evaluator;
pub mod model;
pub mod specializer;
#[cfg(test)]
mod tests;
pub mod visitor;

#[cfg(not(feature = "thread_safe"))]
use std::rc::Rc as RC;
#[cfg(feature = "thread_safe")]
use std::sync::Arc as RC;

use model::FunctionId;
use std::collections::BTreeSet;

/// FBML Error types.
#[derive(Debug, Error)]
pub enum Error {
    #[error("In function {function} with {free:?} free, received arguments {arguments:?}")]
    BadBound {
        function: String,
        free: BTreeSet<String>,
        arguments: BTreeSet<String>,
    },
    #[error("Malformed graph at {node}: {reason}")]
    MalformedGraph { node: String, reason: String },
    #[error("Function {0} has no admissible method for the given arguments")]
    FunctionNotValid(String),
    #[error("Unknown opcode: {0}")]
    UnknownOpcode(String),
    #[error("Invalid operands for {opcode}: {operands}")]
    InvalidOperands { opcode: String, operands: String },
    #[error("Nondeterministic result, both {0} and {1} were produced")]
    Nondeterministic(String, String),
    #[error("Reduce over collections of differing lengths {0:?}")]
    MisalignedCollections(Vec<usize>),
    #[error("Fixed point for {function} did not stabilize after {iterations} iterations")]
    FixpointLimit { function: String, iterations: usize },
    #[error("Call depth exceeded the limit of {0}")]
    RecursionLimit(usize),
    #[error("Function {0} was declared but never defined")]
    UndefinedFunction(FunctionId),
    #[error("Function {0} was never declared")]
    UnknownFunction(FunctionId),
    #[error("Function {0} is already defined")]
    Redefinition(FunctionId),
    #[error("Unsupported: {0}")]
    Unsupported(String),
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Custom(String),
}

impl Error {
    pub(crate) fn malformed<N: ToString, S: Into<String>>(node: N, reason: S) -> Error {
        Error::MalformedGraph {
            node: node.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_operands<D: std::fmt::Debug>(opcode: &str, operands: D) -> Error {
        Error::InvalidOperands {
            opcode: opcode.to_string(),
            operands: format!("{:?}", operands),
        }
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Error {
        Error::Custom(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Error {
        Error::Custom(s)
    }
}

//! The FBML graph model.
//!
//! # Components
//!
//! * `Program` - An arena of `Function`s, addressed by `FunctionId`.
//! * `Function` - Bound constants and an ordered list of methods.
//! * `MethodKind` - Either a guarded `Method`, or a `BuiltinMethod`.
//! * `Method` - A guard graph and a statement graph.
//! * `BuiltinMethod` - A leaf computation provided by the active domain.
//! * `Node` - A vertex in a guard or statement graph.
//! * `Value` - A concrete value.
//!
//! All of these are created once, by whatever produces the program, and are
//! immutable afterwards. Nodes form DAGs, and the same node may be shared
//! between several graphs.
//!
//! Method guards of a function are not required to be mutually exclusive.
//! When several guards are admissible, the results of all of their statements
//! are joined.

mod function;
mod node;
mod program;
mod value;

pub use self::function::*;
pub use self::node::*;
pub use self::program::*;
pub use self::value::*;

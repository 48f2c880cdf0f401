use crate::model::{Node, Value};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The identity of a `Function` within its `Program`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct FunctionId(usize);

impl FunctionId {
    pub fn new(index: usize) -> FunctionId {
        FunctionId(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// One guarded disjunct of a `Function`.
///
/// If the `guard` is allowed by the active domain, the `statement` contributes
/// to the result of the function.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Method {
    guard: Node,
    statement: Node,
}

impl Method {
    pub fn new(guard: Node, statement: Node) -> Method {
        Method { guard, statement }
    }

    pub fn guard(&self) -> &Node {
        &self.guard
    }

    pub fn statement(&self) -> &Node {
        &self.statement
    }

    /// The variables used by this method. Before all of these variables are
    /// bound, the method cannot fire.
    pub fn variables(&self) -> BTreeSet<String> {
        let mut variables = self.guard.variables();
        variables.extend(self.statement.variables());
        variables
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} -> {}", self.guard, self.statement)
    }
}

/// A method without a sub-graph, whose behavior is given by the domain.
///
/// The `argmap` holds the parameter names in the order the domain receives
/// them.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct BuiltinMethod {
    argmap: Vec<String>,
    opcode: String,
}

impl BuiltinMethod {
    pub fn new<S: Into<String>>(argmap: Vec<S>, opcode: S) -> BuiltinMethod {
        BuiltinMethod {
            argmap: argmap.into_iter().map(|a| a.into()).collect(),
            opcode: opcode.into(),
        }
    }

    pub fn argmap(&self) -> &[String] {
        &self.argmap
    }

    pub fn opcode(&self) -> &str {
        &self.opcode
    }

    pub fn variables(&self) -> BTreeSet<String> {
        self.argmap.iter().cloned().collect()
    }

    /// Selects the arguments of this builtin from an environment, in `argmap`
    /// order.
    pub fn arguments<V: Clone>(&self, environment: &BTreeMap<String, V>) -> Result<Vec<V>, Error> {
        self.argmap
            .iter()
            .map(|name| {
                environment.get(name).cloned().ok_or_else(|| Error::BadBound {
                    function: self.opcode.clone(),
                    free: self.variables(),
                    arguments: environment.keys().cloned().collect(),
                })
            })
            .collect()
    }

    /// Orders named arguments into `argmap` order. The names must be exactly
    /// the parameters of this builtin.
    pub fn order<V: Clone>(&self, named: &BTreeMap<String, V>) -> Result<Vec<V>, Error> {
        let names: BTreeSet<String> = named.keys().cloned().collect();
        if names != self.variables() {
            return Err(Error::BadBound {
                function: self.opcode.clone(),
                free: self.variables(),
                arguments: names,
            });
        }
        self.arguments(named)
    }
}

impl fmt::Display for BuiltinMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.opcode)
    }
}

/// A method of a `Function`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum MethodKind {
    Guarded(Method),
    Builtin(BuiltinMethod),
}

impl MethodKind {
    pub fn variables(&self) -> BTreeSet<String> {
        match *self {
            MethodKind::Guarded(ref method) => method.variables(),
            MethodKind::Builtin(ref builtin) => builtin.variables(),
        }
    }
}

impl From<Method> for MethodKind {
    fn from(method: Method) -> MethodKind {
        MethodKind::Guarded(method)
    }
}

impl From<BuiltinMethod> for MethodKind {
    fn from(builtin: BuiltinMethod) -> MethodKind {
        MethodKind::Builtin(builtin)
    }
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            MethodKind::Guarded(ref method) => method.fmt(f),
            MethodKind::Builtin(ref builtin) => builtin.fmt(f),
        }
    }
}

/// A holder of bound constants and an ordered list of methods.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Function {
    name: Option<String>,
    bound_constants: BTreeMap<String, Value>,
    methods: Vec<MethodKind>,
}

impl Function {
    pub fn new(
        name: Option<&str>,
        bound_constants: Vec<(&str, Value)>,
        methods: Vec<MethodKind>,
    ) -> Function {
        Function {
            name: name.map(|name| name.to_string()),
            bound_constants: bound_constants
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
            methods,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// A printable name for this function, even when it is anonymous.
    pub fn code(&self) -> String {
        match self.name {
            Some(ref name) => name.clone(),
            None => "<anonymous>".to_string(),
        }
    }

    pub fn bound_constants(&self) -> &BTreeMap<String, Value> {
        &self.bound_constants
    }

    pub fn methods(&self) -> &[MethodKind] {
        &self.methods
    }

    /// A copy of this function with a different list of methods.
    pub fn with_methods(&self, methods: Vec<MethodKind>) -> Function {
        Function {
            name: self.name.clone(),
            bound_constants: self.bound_constants.clone(),
            methods,
        }
    }

    /// The variables that must be bound for all methods of this function to
    /// execute: the variables used by the methods, less the bound constants.
    pub fn free_variables(&self) -> BTreeSet<String> {
        self.methods
            .iter()
            .flat_map(|method| method.variables())
            .filter(|variable| !self.bound_constants.contains_key(variable))
            .collect()
    }

    /// Bind arguments to this function, producing the environment its methods
    /// are evaluated in.
    ///
    /// `transform` lifts the bound constants into the representation of the
    /// arguments. The names of `arguments` must be exactly the free variables
    /// of this function, otherwise `Error::BadBound` is returned.
    pub fn bind<V, F>(
        &self,
        arguments: BTreeMap<String, V>,
        mut transform: F,
    ) -> Result<BTreeMap<String, V>, Error>
    where
        F: FnMut(&str, &Value) -> Result<V, Error>,
    {
        let free = self.free_variables();
        if arguments.len() != free.len() || !arguments.keys().all(|name| free.contains(name)) {
            return Err(Error::BadBound {
                function: self.code(),
                free,
                arguments: arguments.into_keys().collect(),
            });
        }

        let mut environment = arguments;
        for (name, value) in &self.bound_constants {
            environment.insert(name.clone(), transform(name, value)?);
        }
        Ok(environment)
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}[", self.code())?;
        let mut is_first = true;
        for method in &self.methods {
            if !is_first {
                write!(f, ", ")?;
            }
            write!(f, "{}", method)?;
            is_first = false;
        }
        write!(f, "]")
    }
}

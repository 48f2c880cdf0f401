//! Remove the methods a call never uses.
//!
//! The `Specializer` evaluates a function, recording which methods fired for
//! every call and which calls every call node made. It then builds a residual
//! program, where every function reachable from the entry keeps only the
//! methods which fired for the calls made to it. Functions called with
//! different arguments from different call nodes get different residual
//! functions.

use crate::domain::Domain;
use crate::evaluator::{CallKey, Evaluator, Options, Trace};
use crate::model::{Arguments, Function, FunctionId, MethodKind, Method, Node, NodeTarget, Program};
use crate::visitor;
use crate::Error;
use std::collections::{BTreeMap, BTreeSet};

/// The result of specialization.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Specialized {
    program: Program,
    function: FunctionId,
}

impl Specialized {
    /// The residual program.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// The id of the specialized entry function, in `program`.
    pub fn function(&self) -> FunctionId {
        self.function
    }

    /// The specialized entry function.
    pub fn entry(&self) -> Result<&Function, Error> {
        self.program.function(self.function)
    }
}

/// Specializes the functions of a `Program` for given arguments, using the
/// domain `D` to decide which methods fire.
pub struct Specializer<'p, D: Domain> {
    evaluator: Evaluator<'p, D>,
}

impl<'p, D: Domain> Specializer<'p, D> {
    pub fn new(program: &'p Program, domain: D) -> Specializer<'p, D> {
        Specializer {
            evaluator: Evaluator::new(program, domain),
        }
    }

    pub fn with_options(program: &'p Program, domain: D, options: Options) -> Specializer<'p, D> {
        Specializer {
            evaluator: Evaluator::with_options(program, domain, options),
        }
    }

    pub fn evaluator(&self) -> &Evaluator<'p, D> {
        &self.evaluator
    }

    /// Specialize `function` for concrete arguments.
    pub fn specialize(
        &self,
        function: FunctionId,
        arguments: &Arguments,
    ) -> Result<Specialized, Error> {
        self.specialize_abstract(function, self.evaluator.transform(arguments)?)
    }

    /// Specialize `function` for arguments already in the domain.
    ///
    /// Returns `Error::FunctionNotValid` if no method of some reachable
    /// function fires.
    pub fn specialize_abstract(
        &self,
        function: FunctionId,
        arguments: BTreeMap<String, D::Value>,
    ) -> Result<Specialized, Error> {
        let (key, trace) = self.evaluator.trace(function, arguments)?;

        let mut keys = BTreeSet::new();
        keys.insert(key);

        let mut cleaner = Cleaner {
            source: self.evaluator.program(),
            trace: &trace,
            residual: Program::new(),
            residuals: BTreeMap::new(),
        };
        let function = cleaner.function(function, Some(keys))?;

        Ok(Specialized {
            program: cleaner.residual,
            function,
        })
    }
}

/// Builds the residual program from a trace.
struct Cleaner<'a, V> {
    source: &'a Program,
    trace: &'a Trace<V>,
    residual: Program,
    /// Residual functions by original function and the calls made to it. Calls
    /// of `None` copy a function, keeping every method.
    residuals: BTreeMap<(FunctionId, Option<BTreeSet<CallKey<V>>>), FunctionId>,
}

impl<'a, V> Cleaner<'a, V>
where
    V: Clone + std::fmt::Debug + Eq + std::hash::Hash + Ord,
{
    fn function(
        &mut self,
        id: FunctionId,
        keys: Option<BTreeSet<CallKey<V>>>,
    ) -> Result<FunctionId, Error> {
        let residual_key = (id, keys);
        if let Some(residual) = self.residuals.get(&residual_key) {
            return Ok(*residual);
        }
        // Declared before its methods are built, so recursive calls find it.
        let residual = self.residual.declare();
        self.residuals.insert(residual_key.clone(), residual);
        let keys = residual_key.1;

        let source = self.source;
        let function = source.function(id)?;

        let fired: Option<BTreeSet<usize>> = match keys {
            Some(ref keys) => {
                let fired: BTreeSet<usize> = keys
                    .iter()
                    .filter_map(|key| self.trace.fired(key))
                    .flat_map(|fired| fired.iter().copied())
                    .collect();
                if fired.is_empty() {
                    return Err(Error::FunctionNotValid(function.code()));
                }
                Some(fired)
            }
            None => None,
        };

        let mut methods = Vec::new();
        for (index, method) in function.methods().iter().enumerate() {
            if let Some(ref fired) = fired {
                if !fired.contains(&index) {
                    debug!("pruning method {} of {}: {}", index, function.code(), method);
                    continue;
                }
            }
            methods.push(match *method {
                MethodKind::Builtin(ref builtin) => MethodKind::Builtin(builtin.clone()),
                MethodKind::Guarded(ref method) => {
                    let guard = self.rewrite(method.guard(), keys.as_ref())?;
                    let statement = self.rewrite(method.statement(), keys.as_ref())?;
                    Method::new(guard, statement).into()
                }
            });
        }

        self.residual.define(residual, function.with_methods(methods))?;
        Ok(residual)
    }

    /// The calls made by `node`, over every call in `keys`.
    fn callees(&self, keys: &BTreeSet<CallKey<V>>, node: &Node) -> BTreeSet<CallKey<V>> {
        keys.iter()
            .filter_map(|key| self.trace.callees(key, node))
            .flat_map(|callees| callees.iter().cloned())
            .collect()
    }

    /// Rebuild `node`, with every call targeting a residual function.
    fn rewrite(&mut self, node: &Node, keys: Option<&BTreeSet<CallKey<V>>>) -> Result<Node, Error> {
        let initial: BTreeMap<String, Node> = node
            .variables()
            .into_iter()
            .map(|name| (name.clone(), Node::variable(name)))
            .collect();

        visitor::visit(node, &initial, |node, sources| {
            let target = match *node.target() {
                NodeTarget::Function(callee) => {
                    let callees = match keys {
                        Some(keys) => {
                            let callees = self.callees(keys, node);
                            if callees.is_empty() {
                                return Err(Error::malformed(node, "call was never evaluated"));
                            }
                            Some(callees)
                        }
                        None => None,
                    };
                    NodeTarget::Function(self.function(callee, callees)?)
                }
                NodeTarget::Reduce(ref reduce) => {
                    // A fold over empty collections never calls its body.
                    let callees = keys
                        .map(|keys| self.callees(keys, node))
                        .filter(|callees| !callees.is_empty());
                    NodeTarget::Reduce(reduce.with_body(self.function(reduce.body(), callees)?))
                }
                ref target => target.clone(),
            };
            let sources: Vec<(String, Node)> = node.names().cloned().zip(sources).collect();
            Ok(Node::new(target, sources))
        })
    }
}

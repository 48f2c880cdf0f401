//! Evaluate functions over an abstract domain.
//!
//! The `Evaluator` computes the result of calling a function, by visiting the
//! guard and statement graphs of its methods and joining the results of every
//! admissible method.
//!
//! Calls are memoized per `CallKey`, that is per function and abstract
//! arguments. Recursive calls read the provisional result of the call in
//! progress, starting from the domain's extremum, and the call is re-evaluated
//! until its result stops changing. This terminates whenever the domain has no
//! infinite ascending chains for the given inputs. `Options` can bound the
//! work done when it does not.

use crate::domain::{Domain, Elements};
use crate::model::{Arguments, FunctionId, MethodKind, Node, NodeTarget, Program, Reduce};
use crate::visitor;
use crate::Error;
use std::collections::{BTreeMap, BTreeSet};

mod context;
mod options;

pub use self::context::{CallKey, Statistics};
pub(crate) use self::context::Trace;
pub use self::options::{Options, OptionsBuilder};

use self::context::{Context, Entry};

/// Evaluates the functions of a `Program` over the domain `D`.
pub struct Evaluator<'p, D: Domain> {
    program: &'p Program,
    domain: D,
    options: Options,
}

impl<'p, D: Domain> Evaluator<'p, D> {
    pub fn new(program: &'p Program, domain: D) -> Evaluator<'p, D> {
        Evaluator::with_options(program, domain, Options::default())
    }

    pub fn with_options(program: &'p Program, domain: D, options: Options) -> Evaluator<'p, D> {
        Evaluator {
            program,
            domain,
            options,
        }
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn domain(&self) -> &D {
        &self.domain
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Lift concrete arguments into the domain.
    pub fn transform(&self, arguments: &Arguments) -> Result<BTreeMap<String, D::Value>, Error> {
        arguments
            .iter()
            .map(|(name, value)| Ok((name.clone(), self.domain.transform(name, value)?)))
            .collect()
    }

    /// Evaluate `function` with concrete arguments.
    pub fn evaluate(&self, function: FunctionId, arguments: &Arguments) -> Result<D::Value, Error> {
        self.evaluate_abstract(function, self.transform(arguments)?)
    }

    /// Evaluate `function` with arguments already in the domain.
    pub fn evaluate_abstract(
        &self,
        function: FunctionId,
        arguments: BTreeMap<String, D::Value>,
    ) -> Result<D::Value, Error> {
        Ok(self.run(function, arguments)?.0)
    }

    /// Evaluate `function`, and report the work it took.
    pub fn run(
        &self,
        function: FunctionId,
        arguments: BTreeMap<String, D::Value>,
    ) -> Result<(D::Value, Statistics), Error> {
        let mut context = Context::new(false);
        let key = CallKey::new(function, &arguments);
        let value = self.call(&mut context, key, arguments)?;
        debug!(
            "evaluated {} in {} calls, {} iterations, {} memo hits",
            function,
            context.statistics.calls,
            context.statistics.iterations,
            context.statistics.memo_hits
        );
        Ok((value, context.statistics))
    }

    /// Evaluate `function`, recording which methods fired and which calls
    /// were made.
    pub(crate) fn trace(
        &self,
        function: FunctionId,
        arguments: BTreeMap<String, D::Value>,
    ) -> Result<(CallKey<D::Value>, Trace<D::Value>), Error> {
        let mut context = Context::new(true);
        let key = CallKey::new(function, &arguments);
        self.call(&mut context, key.clone(), arguments)?;
        let trace = context.trace.ok_or("evaluation lost its trace")?;
        Ok((key, trace))
    }

    fn call(
        &self,
        context: &mut Context<D::Value>,
        key: CallKey<D::Value>,
        arguments: BTreeMap<String, D::Value>,
    ) -> Result<D::Value, Error> {
        let function = self.program.function(key.function())?;
        let environment =
            function.bind(arguments, |name, value| self.domain.transform(name, value))?;
        context.statistics.calls += 1;

        match context.memo.get(&key) {
            Some(Entry::Final(value)) => {
                context.statistics.memo_hits += 1;
                return Ok(value.clone());
            }
            Some(Entry::Provisional { value, depth }) => {
                context.statistics.memo_hits += 1;
                context.low = context.low.min(*depth);
                return Ok(value.clone());
            }
            None => {}
        }

        let depth = context.depth + 1;
        if let Some(max_depth) = self.options.max_depth() {
            if depth > max_depth {
                return Err(Error::RecursionLimit(max_depth));
            }
        }
        context.depth = depth;
        context.memo.insert(
            key.clone(),
            Entry::Provisional {
                value: self.domain.extremum(),
                depth,
            },
        );

        let outer_low = context.low;
        let mut value = self.domain.extremum();
        let mut iterations = 0;
        let low = loop {
            iterations += 1;
            context.statistics.iterations += 1;
            if let Some(max_iterations) = self.options.max_iterations() {
                if iterations > max_iterations {
                    return Err(Error::FixpointLimit {
                        function: function.code(),
                        iterations: max_iterations,
                    });
                }
            }

            context.low = usize::MAX;
            let result = self.methods(context, &key, &environment)?;
            let low = context.low;
            let stable = result == value;
            value = result;
            trace!("{} iteration {} -> {:?}", key, iterations, value);

            // Exact when no provisional entry of this or an enclosing call was read.
            if low > depth || stable {
                break low;
            }
            context.memo.insert(
                key.clone(),
                Entry::Provisional {
                    value: value.clone(),
                    depth,
                },
            );
        };

        context.depth = depth - 1;
        if low < depth {
            // Depends on an enclosing call which has not stabilized yet.
            trace!("{} depends on an enclosing call, forgetting it", key);
            context.memo.remove(&key);
            context.low = outer_low.min(low);
        } else {
            context.memo.insert(key, Entry::Final(value.clone()));
            context.low = outer_low;
        }

        Ok(value)
    }

    /// Join the results of every admissible method of the call `key`.
    fn methods(
        &self,
        context: &mut Context<D::Value>,
        key: &CallKey<D::Value>,
        environment: &BTreeMap<String, D::Value>,
    ) -> Result<D::Value, Error> {
        let function = self.program.function(key.function())?;
        if let Some(trace) = context.trace.as_mut() {
            trace.reset(key);
        }

        let mut result = self.domain.extremum();
        let mut fired = BTreeSet::new();
        for (index, method) in function.methods().iter().enumerate() {
            let value = match *method {
                MethodKind::Builtin(ref builtin) => {
                    let operands = builtin.arguments(environment)?;
                    self.domain.apply(builtin.opcode(), &operands)?
                }
                MethodKind::Guarded(ref method) => {
                    let guard = visitor::visit(method.guard(), environment, |node, sources| {
                        self.node(context, key, node, sources)
                    })?;
                    if !self.domain.allow(&guard) {
                        debug!("{} method {} not admitted by {:?}", key, index, guard);
                        continue;
                    }
                    visitor::visit(method.statement(), environment, |node, sources| {
                        self.node(context, key, node, sources)
                    })?
                }
            };
            fired.insert(index);
            result = self.domain.merge(&result, &value)?;
        }

        if let Some(trace) = context.trace.as_mut() {
            trace.set_fired(key.clone(), fired);
        }
        Ok(result)
    }

    /// The value of `node`, given the values of its sources.
    fn node(
        &self,
        context: &mut Context<D::Value>,
        caller: &CallKey<D::Value>,
        node: &Node,
        sources: Vec<D::Value>,
    ) -> Result<D::Value, Error> {
        match *node.target() {
            NodeTarget::Literal(ref value) => self.domain.constant(value),
            NodeTarget::Variable(_) => Err(Error::malformed(node, "variable reached evaluation")),
            NodeTarget::Builtin(ref builtin) => {
                let operands = builtin.order(&node.project(sources))?;
                self.domain.apply(builtin.opcode(), &operands)
            }
            NodeTarget::Function(function) => {
                let arguments = node.project(sources);
                let key = CallKey::new(function, &arguments);
                if let Some(trace) = context.trace.as_mut() {
                    trace.record(caller, node, key.clone());
                }
                self.call(context, key, arguments)
            }
            NodeTarget::Reduce(ref reduce) => {
                self.reduce(context, caller, node, reduce, node.project(sources))
            }
        }
    }

    /// Fold the body of `reduce` over its collections.
    fn reduce(
        &self,
        context: &mut Context<D::Value>,
        caller: &CallKey<D::Value>,
        node: &Node,
        reduce: &Reduce,
        mut sources: BTreeMap<String, D::Value>,
    ) -> Result<D::Value, Error> {
        let extremum = self.domain.extremum();

        let mut accumulator = sources.remove(reduce.accumulator()).ok_or_else(|| {
            Error::malformed(node, format!("missing accumulator {}", reduce.accumulator()))
        })?;

        let mut collections = Vec::new();
        let mut summaries = BTreeMap::new();
        for name in reduce.elements() {
            let collection = sources
                .remove(name)
                .ok_or_else(|| Error::malformed(node, format!("missing collection {}", name)))?;
            if collection == extremum {
                return Ok(extremum);
            }
            match self.domain.elements(&collection)? {
                Elements::Exact(elements) => collections.push((name.clone(), elements)),
                Elements::Summary(element) => {
                    summaries.insert(name.clone(), element);
                }
            }
        }

        // Whatever is left are the extra variables, passed to every call.
        let extra = sources;

        if !summaries.is_empty() {
            for (name, elements) in collections {
                let mut summary = extremum.clone();
                for element in &elements {
                    summary = self.domain.merge(&summary, element)?;
                }
                summaries.insert(name, summary);
            }
            let mut arguments = extra;
            arguments.extend(summaries);
            return self.summarize(context, caller, node, reduce, accumulator, arguments);
        }

        let lengths: Vec<usize> = collections.iter().map(|(_, elements)| elements.len()).collect();
        if lengths.windows(2).any(|pair| pair[0] != pair[1]) {
            return Err(Error::MisalignedCollections(lengths));
        }

        for i in 0..lengths.first().copied().unwrap_or(0) {
            let mut arguments = extra.clone();
            arguments.insert(reduce.accumulator().to_string(), accumulator);
            for (name, elements) in &collections {
                arguments.insert(name.clone(), elements[i].clone());
            }

            let key = CallKey::new(reduce.body(), &arguments);
            if let Some(trace) = context.trace.as_mut() {
                trace.record(caller, node, key.clone());
            }
            accumulator = self.call(context, key, arguments)?;
        }

        Ok(accumulator)
    }

    /// Fold over collections of unknown length. The result joins the
    /// accumulator after every number of steps, so the body is applied until
    /// the joined accumulator stops changing.
    fn summarize(
        &self,
        context: &mut Context<D::Value>,
        caller: &CallKey<D::Value>,
        node: &Node,
        reduce: &Reduce,
        initial: D::Value,
        arguments: BTreeMap<String, D::Value>,
    ) -> Result<D::Value, Error> {
        let mut accumulator = initial;
        let mut iterations = 0;
        loop {
            iterations += 1;
            if let Some(max_iterations) = self.options.max_iterations() {
                if iterations > max_iterations {
                    return Err(Error::FixpointLimit {
                        function: self.program.function(reduce.body())?.code(),
                        iterations: max_iterations,
                    });
                }
            }

            let mut arguments = arguments.clone();
            arguments.insert(reduce.accumulator().to_string(), accumulator.clone());
            let key = CallKey::new(reduce.body(), &arguments);
            if let Some(trace) = context.trace.as_mut() {
                trace.record(caller, node, key.clone());
            }
            let step = self.call(context, key, arguments)?;

            let joined = self.domain.merge(&accumulator, &step)?;
            trace!("{} summarized step {} -> {:?}", node, iterations, joined);
            if joined == accumulator {
                return Ok(accumulator);
            }
            accumulator = joined;
        }
    }
}

use crate::model::{FunctionId, Node};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A function, and the abstract arguments it is called with.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct CallKey<V> {
    function: FunctionId,
    arguments: Vec<(String, V)>,
}

impl<V: Clone> CallKey<V> {
    pub fn new(function: FunctionId, arguments: &BTreeMap<String, V>) -> CallKey<V> {
        CallKey {
            function,
            arguments: arguments
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        }
    }

    pub fn function(&self) -> FunctionId {
        self.function
    }

    /// The arguments of this call, sorted by name.
    pub fn arguments(&self) -> &[(String, V)] {
        &self.arguments
    }
}

impl<V: fmt::Debug> fmt::Display for CallKey<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}(", self.function)?;
        let mut is_first = true;
        for (name, value) in &self.arguments {
            if !is_first {
                write!(f, ", ")?;
            }
            write!(f, "{}={:?}", name, value)?;
            is_first = false;
        }
        write!(f, ")")
    }
}

/// Counters describing the work done by one evaluation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Statistics {
    /// Calls made, including calls answered by the memo table.
    pub calls: usize,
    /// Evaluations of the methods of a call.
    pub iterations: usize,
    /// Calls answered by the memo table.
    pub memo_hits: usize,
}

/// The state of a call in the memo table.
///
/// A call is provisional while its fixed point is being computed, and final
/// once its value is exact.
#[derive(Clone, Debug)]
pub(crate) enum Entry<V> {
    Provisional { value: V, depth: usize },
    Final(V),
}

/// Which methods fired for each call, and which calls each call node made.
#[derive(Clone, Debug)]
pub(crate) struct Trace<V> {
    fired: FxHashMap<CallKey<V>, BTreeSet<usize>>,
    calls: FxHashMap<CallKey<V>, FxHashMap<Node, BTreeSet<CallKey<V>>>>,
}

impl<V> Trace<V>
where
    V: Clone + Eq + std::hash::Hash + Ord,
{
    pub(crate) fn new() -> Trace<V> {
        Trace {
            fired: FxHashMap::default(),
            calls: FxHashMap::default(),
        }
    }

    /// Forget what `key` did, before its methods are evaluated again.
    pub(crate) fn reset(&mut self, key: &CallKey<V>) {
        self.calls.remove(key);
    }

    pub(crate) fn set_fired(&mut self, key: CallKey<V>, fired: BTreeSet<usize>) {
        self.fired.insert(key, fired);
    }

    /// Record that, while evaluating `caller`, `node` called `callee`.
    pub(crate) fn record(&mut self, caller: &CallKey<V>, node: &Node, callee: CallKey<V>) {
        self.calls
            .entry(caller.clone())
            .or_insert_with(FxHashMap::default)
            .entry(node.clone())
            .or_insert_with(BTreeSet::new)
            .insert(callee);
    }

    /// The indices of the methods which fired for `key`.
    pub(crate) fn fired(&self, key: &CallKey<V>) -> Option<&BTreeSet<usize>> {
        self.fired.get(key)
    }

    /// The calls `node` made while evaluating `caller`.
    pub(crate) fn callees(
        &self,
        caller: &CallKey<V>,
        node: &Node,
    ) -> Option<&BTreeSet<CallKey<V>>> {
        self.calls.get(caller).and_then(|calls| calls.get(node))
    }
}

/// The mutable state of one top-level evaluation.
pub(crate) struct Context<V> {
    pub(crate) memo: FxHashMap<CallKey<V>, Entry<V>>,
    /// The number of calls in progress.
    pub(crate) depth: usize,
    /// The shallowest provisional entry read since this was last reset.
    pub(crate) low: usize,
    pub(crate) trace: Option<Trace<V>>,
    pub(crate) statistics: Statistics,
}

impl<V> Context<V>
where
    V: Clone + Eq + std::hash::Hash + Ord,
{
    pub(crate) fn new(traced: bool) -> Context<V> {
        Context {
            memo: FxHashMap::default(),
            depth: 0,
            low: usize::MAX,
            trace: if traced { Some(Trace::new()) } else { None },
            statistics: Statistics::default(),
        }
    }
}

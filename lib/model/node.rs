//! The `Node`, the vertex of every guard and statement graph.
//!
//! Nodes are immutable and compared by structure. A `Node` with the same
//! target and the same named sources as another `Node` is equal to it and
//! hashes identically, regardless of the order the sources were given in.
//! Nodes are interned when they are created: building a node equal to one
//! which is still alive returns that node. Equal nodes therefore share one
//! allocation, and comparing or hashing a node is O(1) however large the graph
//! below it is.

use crate::model::{BuiltinMethod, FunctionId, Value};
use crate::visitor;
use crate::RC;
use rustc_hash::{FxHashMap, FxHasher};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
#[cfg(not(feature = "thread_safe"))]
use std::cell::RefCell;
#[cfg(not(feature = "thread_safe"))]
use std::rc::Weak;
#[cfg(feature = "thread_safe")]
use std::sync::{Mutex, Weak};

/// A fold over one or more aligned collections.
///
/// The sources of a reduce node are named after the parameters of `body`. The
/// source named `accumulator` gives the initial accumulator, the sources named
/// in `elements` each give a collection, and every other source is passed
/// unchanged to each invocation of `body`.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Reduce {
    body: FunctionId,
    accumulator: String,
    elements: BTreeSet<String>,
}

impl Reduce {
    pub fn new<S: Into<String>>(body: FunctionId, accumulator: S, elements: Vec<S>) -> Reduce {
        Reduce {
            body,
            accumulator: accumulator.into(),
            elements: elements.into_iter().map(|e| e.into()).collect(),
        }
    }

    /// The function invoked once per element tuple.
    pub fn body(&self) -> FunctionId {
        self.body
    }

    /// The parameter of `body` which receives the running accumulator.
    pub fn accumulator(&self) -> &str {
        &self.accumulator
    }

    /// The parameters of `body` which receive one element of each collection.
    pub fn elements(&self) -> &BTreeSet<String> {
        &self.elements
    }

    /// This `Reduce`, folding with a different body.
    pub fn with_body(&self, body: FunctionId) -> Reduce {
        Reduce {
            body,
            accumulator: self.accumulator.clone(),
            elements: self.elements.clone(),
        }
    }
}

/// What a `Node` denotes.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum NodeTarget {
    /// Call a function with the node's sources as arguments.
    Function(FunctionId),
    /// Apply a builtin to the node's sources.
    Builtin(BuiltinMethod),
    /// A free variable, looked up in the environment.
    Variable(String),
    /// A literal constant.
    Literal(Value),
    /// Fold a function over collections.
    Reduce(Reduce),
}

struct NodeData {
    target: NodeTarget,
    sources: Vec<(String, Node)>,
    digest: u64,
}

/// A node's target, and the addresses of its sources. Sources are interned
/// before their users, so this identifies a node structurally.
type InternKey = (NodeTarget, Vec<(String, usize)>);

/// Every live node, by structure.
struct Interner {
    nodes: FxHashMap<InternKey, Weak<NodeData>>,
    /// Dead entries are swept when the table grows to this size.
    sweep_at: usize,
}

impl Interner {
    const MIN_SWEEP: usize = 1024;

    fn new() -> Interner {
        Interner {
            nodes: FxHashMap::default(),
            sweep_at: Interner::MIN_SWEEP,
        }
    }

    fn intern(&mut self, key: InternKey, data: NodeData) -> RC<NodeData> {
        if let Some(node) = self.nodes.get(&key).and_then(|node| node.upgrade()) {
            return node;
        }
        if self.nodes.len() >= self.sweep_at {
            self.nodes.retain(|_, node| node.strong_count() > 0);
            self.sweep_at = (self.nodes.len() * 2).max(Interner::MIN_SWEEP);
        }
        let node = RC::new(data);
        self.nodes.insert(key, RC::downgrade(&node));
        node
    }
}

#[cfg(not(feature = "thread_safe"))]
thread_local! {
    static INTERNER: RefCell<Interner> = RefCell::new(Interner::new());
}

#[cfg(not(feature = "thread_safe"))]
fn intern(key: InternKey, data: NodeData) -> RC<NodeData> {
    INTERNER.with(|interner| interner.borrow_mut().intern(key, data))
}

#[cfg(feature = "thread_safe")]
static INTERNER: Mutex<Option<Interner>> = Mutex::new(None);

#[cfg(feature = "thread_safe")]
fn intern(key: InternKey, data: NodeData) -> RC<NodeData> {
    let mut interner = INTERNER
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    interner
        .get_or_insert_with(Interner::new)
        .intern(key, data)
}

/// A node in a flow graph.
#[derive(Clone)]
pub struct Node {
    data: RC<NodeData>,
}

impl Node {
    /// Create a new `Node`. Sources are sorted by name, and a later source
    /// replaces an earlier source of the same name.
    pub fn new<S: Into<String>>(target: NodeTarget, sources: Vec<(S, Node)>) -> Node {
        let sources: Vec<(String, Node)> = sources
            .into_iter()
            .map(|(name, node)| (name.into(), node))
            .collect::<BTreeMap<String, Node>>()
            .into_iter()
            .collect();

        let mut hasher = FxHasher::default();
        target.hash(&mut hasher);
        for (name, source) in &sources {
            name.hash(&mut hasher);
            source.digest().hash(&mut hasher);
        }

        let key = (
            target.clone(),
            sources
                .iter()
                .map(|(name, source)| (name.clone(), source.address()))
                .collect(),
        );
        let data = NodeData {
            target,
            sources,
            digest: hasher.finish(),
        };
        Node {
            data: intern(key, data),
        }
    }

    fn address(&self) -> usize {
        RC::as_ptr(&self.data) as usize
    }

    /// A reference to the free variable `name`.
    pub fn variable<S: Into<String>>(name: S) -> Node {
        Node::new::<String>(NodeTarget::Variable(name.into()), Vec::new())
    }

    /// A literal constant.
    pub fn literal(value: Value) -> Node {
        Node::new::<String>(NodeTarget::Literal(value), Vec::new())
    }

    /// A call of `function`.
    pub fn call<S: Into<String>>(function: FunctionId, sources: Vec<(S, Node)>) -> Node {
        Node::new(NodeTarget::Function(function), sources)
    }

    /// An application of a builtin.
    pub fn builtin<S: Into<String>>(builtin: BuiltinMethod, sources: Vec<(S, Node)>) -> Node {
        Node::new(NodeTarget::Builtin(builtin), sources)
    }

    /// A fold of `body` over the collections given in `elements`.
    ///
    /// * `accumulator` - The accumulator parameter of `body`, and the node
    /// giving its initial value.
    /// * `elements` - Element parameters of `body`, and the nodes giving the
    /// collections those elements are drawn from.
    /// * `extra` - Any other parameters of `body`.
    pub fn reduce<S: Into<String>>(
        body: FunctionId,
        accumulator: (S, Node),
        elements: Vec<(S, Node)>,
        extra: Vec<(S, Node)>,
    ) -> Node {
        let (accumulator, initial) = accumulator;
        let accumulator: String = accumulator.into();
        let elements: Vec<(String, Node)> = elements
            .into_iter()
            .map(|(name, node)| (name.into(), node))
            .collect();

        let reduce = Reduce::new(
            body,
            accumulator.clone(),
            elements.iter().map(|(name, _)| name.clone()).collect(),
        );

        let mut sources = vec![(accumulator, initial)];
        sources.extend(elements);
        sources.extend(extra.into_iter().map(|(name, node)| (name.into(), node)));

        Node::new(NodeTarget::Reduce(reduce), sources)
    }

    pub fn target(&self) -> &NodeTarget {
        &self.data.target
    }

    /// The named sources of this `Node`, sorted by name.
    pub fn sources(&self) -> &[(String, Node)] {
        &self.data.sources
    }

    /// Get the source with the given name.
    pub fn source(&self, name: &str) -> Option<&Node> {
        self.data
            .sources
            .iter()
            .find(|(source_name, _)| source_name == name)
            .map(|(_, node)| node)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.data.sources.iter().map(|(name, _)| name)
    }

    /// Returns true if this `Node` has no sources.
    pub fn is_leaf(&self) -> bool {
        self.data.sources.is_empty()
    }

    /// The cached structural digest of this `Node`.
    pub fn digest(&self) -> u64 {
        self.data.digest
    }

    /// Projects values, given in source order, onto the names of the sources.
    pub fn project<T>(&self, values: Vec<T>) -> BTreeMap<String, T> {
        self.names().cloned().zip(values).collect()
    }

    /// Every node reachable from this `Node`, sources before the nodes that
    /// use them. See `visitor::precedes`.
    pub fn precedes(&self) -> Vec<Node> {
        visitor::precedes(self)
    }

    /// The names of the free variables this `Node` needs to be evaluated.
    pub fn variables(&self) -> BTreeSet<String> {
        self.precedes()
            .into_iter()
            .filter_map(|node| match *node.target() {
                NodeTarget::Variable(ref name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Node) -> bool {
        RC::ptr_eq(&self.data, &other.data)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.data.digest)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let code = match *self.target() {
            NodeTarget::Variable(ref name) => return write!(f, "{}", name),
            NodeTarget::Literal(ref value) => return write!(f, "{}", value),
            NodeTarget::Builtin(ref builtin) => {
                if builtin.opcode() == "load" && self.sources().len() == 1 {
                    return write!(f, "{}", self.sources()[0].1);
                }
                builtin.opcode().to_string()
            }
            NodeTarget::Function(function) => function.to_string(),
            NodeTarget::Reduce(ref reduce) => format!("reduce {}", reduce.body()),
        };
        write!(f, "({}", code)?;
        for (name, source) in self.sources() {
            write!(f, " {}={}", name, source)?;
        }
        write!(f, ")")
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Node({})", self)
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Node", 2)?;
        state.serialize_field("target", self.target())?;
        state.serialize_field("sources", self.sources())?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Node, D::Error> {
        #[derive(Deserialize)]
        struct NodeRepr {
            target: NodeTarget,
            sources: Vec<(String, Node)>,
        }

        let repr = NodeRepr::deserialize(deserializer)?;
        Ok(Node::new(repr.target, repr.sources))
    }
}

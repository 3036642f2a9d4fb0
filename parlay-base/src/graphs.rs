//! Crucial structs, enums, functions and types to create computation graphs.
use atomic_refcell::AtomicRefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::ptr;
use std::sync::Arc;
use std::sync::Weak;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::graph_size_limit_constants;
use crate::data_types::Type;
use crate::errors::Result;
use crate::parties::{check_party_name, create_party_handle, Party, PartyId};
use crate::type_inference::{create_type_inference_worker, TypeInferenceWorker};

use crate::version::{VersionedData, DATA_VERSION};

#[doc(hidden)]
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Operation {
    Input(Type, PartyId),
    Zeros(Type),
    Add,
    Multiply,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let operation_w_type_str = format!("{:?}", *self);
        let split_for_operation = operation_w_type_str.split('(');
        let vec_operation_and_types: Vec<&str> = split_for_operation.collect();
        let operation_name = if vec_operation_and_types.is_empty() {
            "-null-".to_owned()
        } else {
            vec_operation_and_types[0].to_owned()
        };
        write!(f, "{operation_name}")
    }
}

impl Operation {
    pub fn is_input(&self) -> bool {
        matches!(self, Operation::Input(_, _))
    }

    /// Leaf operations have no node dependencies.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Operation::Input(_, _) | Operation::Zeros(_))
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(runtime_error!("Name can't be empty"));
    }
    if name.len() > graph_size_limit_constants::MAX_NAME_LENGTH {
        return Err(runtime_error!(
            "Name is longer than {} bytes",
            graph_size_limit_constants::MAX_NAME_LENGTH
        ));
    }
    Ok(())
}

#[derive(Debug)]
struct NodeBody {
    graph: WeakGraph,
    node_dependencies: Vec<WeakNode>,
    operation: Operation,
    id: u64,
}

#[derive(Serialize, Deserialize)]
struct SerializableNodeBody {
    node_dependencies: Vec<u64>,
    operation: Operation,
}

type NodeBodyPointer = Arc<AtomicRefCell<NodeBody>>;

/// A structure that stores a pointer to a computation graph node that corresponds to an operation.
///
/// [Clone] trait duplicates the pointer, not the underlying nodes.
///
/// [PartialEq] trait compares pointers, not the related nodes.
///
/// # Example
///
/// ```
/// # use parlay_base::graphs::create_context;
/// # use parlay_base::data_types::{secret_scalar_type, UINT64};
/// let c = create_context().unwrap();
/// let alice = c.create_party("Alice").unwrap();
/// let g = c.create_graph().unwrap();
/// let t = secret_scalar_type(UINT64);
/// let n1 = g.input(t, alice.clone()).unwrap();
/// let n2 = g.input(t, alice).unwrap();
/// assert!(n1 != n2);
/// let n3 = n1.clone();
/// assert!(n1 == n3);
/// ```
#[derive(Debug)]
pub struct Node {
    body: NodeBodyPointer,
}

type SerializableNode = Arc<SerializableNodeBody>;

impl Clone for Node {
    /// Returns a new [Node] value with a copy of the pointer to a node.
    fn clone(&self) -> Self {
        Node {
            body: self.body.clone(),
        }
    }
}

impl PartialEq for Node {
    /// Tests whether `self` and `other` nodes are equal via comparison of their respective pointers.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        ptr::hash(&*self.body, state);
    }
}

impl Node {
    /// Returns the parent graph that contains the node.
    pub fn get_graph(&self) -> Graph {
        self.body.borrow().graph.upgrade()
    }

    /// Returns the dependency nodes that are used to compute the value in the current node.
    pub fn get_node_dependencies(&self) -> Vec<Node> {
        self.body
            .borrow()
            .node_dependencies
            .iter()
            .map(|n| n.upgrade())
            .collect()
    }

    /// Returns the ID of the node.
    ///
    /// A node ID is a serial number of a node between `0` and `n-1` where `n` is the number of nodes in the parent graph.
    /// This number is equal to the number of nodes in the parent graph before this node was added to it.
    pub fn get_id(&self) -> u64 {
        self.body.borrow().id
    }

    /// Returns the pair of the parent graph ID and node ID.
    pub fn get_global_id(&self) -> (u64, u64) {
        (self.get_graph().get_id(), self.get_id())
    }

    /// Returns the operation associated with the node.
    pub fn get_operation(&self) -> Operation {
        self.body.borrow().operation.clone()
    }

    /// Returns the type of the value computed by the node.
    pub fn get_type(&self) -> Result<Type> {
        let context = self.get_graph().get_context();

        {
            let context_body = context.body.borrow();
            if let Some(tc) = &context_body.type_checker {
                if let Some(cached_type) = tc.cached_node_type(self) {
                    return Ok(cached_type);
                }
            }
        }

        let mut context_body = context.body.borrow_mut();
        if let Some(tc) = &mut context_body.type_checker {
            tc.process_node(self.clone())
        } else {
            Err(runtime_error!("Type checker is not available"))
        }
    }

    /// Applies [Context::set_node_name] to the parent context and `this` node. Returns the clone of `this`.
    ///
    /// Input nodes must be named before their graph is finalized: the
    /// external runtime uses node names as wire identifiers.
    ///
    /// # Example
    ///
    /// ```
    /// # use parlay_base::graphs::create_context;
    /// # use parlay_base::data_types::{secret_scalar_type, UINT64};
    /// let c = create_context().unwrap();
    /// let alice = c.create_party("Alice").unwrap();
    /// let g = c.create_graph().unwrap();
    /// let n = g.input(secret_scalar_type(UINT64), alice).unwrap();
    /// n.set_name("wealth").unwrap();
    /// assert_eq!(n.get_name().unwrap(), Some("wealth".to_owned()));
    /// ```
    pub fn set_name(&self, name: &str) -> Result<Node> {
        self.get_graph()
            .get_context()
            .set_node_name(self.clone(), name)?;
        Ok(self.clone())
    }

    /// Applies [Context::get_node_name] to the parent context and `this` node.
    pub fn get_name(&self) -> Result<Option<String>> {
        self.get_graph().get_context().get_node_name(self.clone())
    }

    /// Adds a node to the parent graph that adds the scalar associated with the node to a scalar of the same scalar type associated with another node.
    ///
    /// Applies [Graph::add] to the parent graph, `this` node and the `b` node.
    pub fn add(&self, b: Node) -> Result<Node> {
        self.get_graph().add(self.clone(), b)
    }

    /// Adds a node to the parent graph that multiplies the scalar associated with the node by a scalar of the same scalar type associated with another node.
    ///
    /// Applies [Graph::multiply] to the parent graph, `this` node and the `b` node.
    pub fn multiply(&self, b: Node) -> Result<Node> {
        self.get_graph().multiply(self.clone(), b)
    }

    /// Binds the node to a named output of its graph revealed to a given party.
    ///
    /// Applies [Graph::add_output] to the parent graph and `this` node.
    pub fn set_as_output(&self, name: &str, party: Party) -> Result<Output> {
        self.get_graph().add_output(self.clone(), name, party)
    }

    fn make_serializable(&self) -> SerializableNode {
        Arc::new(SerializableNodeBody {
            node_dependencies: self
                .get_node_dependencies()
                .iter()
                .map(|n| n.get_id())
                .collect(),
            operation: self.get_operation(),
        })
    }

    fn downgrade(&self) -> WeakNode {
        WeakNode {
            body: Arc::downgrade(&self.body),
        }
    }
}

type WeakNodeBodyPointer = Weak<AtomicRefCell<NodeBody>>;

#[derive(Debug)]
struct WeakNode {
    body: WeakNodeBodyPointer,
}

impl WeakNode {
    //upgrade function panics if the the Node pointer it downgraded from went out of scope
    fn upgrade(&self) -> Node {
        Node {
            body: self.body.upgrade().unwrap(),
        }
    }
}

impl Clone for WeakNode {
    fn clone(&self) -> Self {
        WeakNode {
            body: self.body.clone(),
        }
    }
}

/// A named result of a graph bound to the party it is revealed to.
///
/// Outputs are created with [Graph::add_output] (or [Node::set_as_output])
/// and handed over, in the order of creation, to the external runtime that
/// reveals each value to its destination party after secure execution.
#[derive(Clone)]
pub struct Output {
    node: Node,
    name: String,
    party: Party,
}

impl Output {
    /// Returns the node whose value is revealed.
    pub fn get_node(&self) -> Node {
        self.node.clone()
    }

    /// Returns the output name, a wire identifier of the external runtime.
    pub fn get_name(&self) -> String {
        self.name.clone()
    }

    /// Returns the party the output is revealed to.
    pub fn get_party(&self) -> Party {
        self.party.clone()
    }
}

#[derive(Clone, Serialize, Deserialize)]
struct SerializableOutput {
    node: u64,
    name: String,
    party: PartyId,
}

struct GraphBody {
    finalized: bool,
    nodes: Vec<Node>,
    outputs: Vec<Output>,
    /// output name -> index in `outputs`
    output_names: HashMap<String, usize>,
    id: u64,
    context: WeakContext,
}

#[derive(Clone, Serialize, Deserialize)]
struct SerializableGraphBody {
    finalized: bool,
    nodes: Vec<SerializableNode>,
    outputs: Vec<SerializableOutput>,
}

type GraphBodyPointer = Arc<AtomicRefCell<GraphBody>>;

/// A structure that stores a pointer to a computation graph.
///
/// A graph is a DAG of operation nodes with a list of named outputs. It is
/// built within a [Context], finalized once complete, and immutable
/// afterwards.
///
/// [Clone] trait duplicates the pointer, not the underlying graph.
///
/// [PartialEq] trait compares pointers, not the related graphs.
pub struct Graph {
    body: GraphBodyPointer,
}

type SerializableGraph = Arc<SerializableGraphBody>;

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("body", &self.body.as_ptr())
            .finish()
    }
}

impl Clone for Graph {
    fn clone(&self) -> Self {
        Graph {
            body: self.body.clone(),
        }
    }
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

impl Eq for Graph {}

impl Hash for Graph {
    fn hash<H: Hasher>(&self, state: &mut H) {
        ptr::hash(&*self.body, state);
    }
}

impl Graph {
    /// Promotes the graph to the main one of its context.
    pub fn set_as_main(&self) -> Result<Graph> {
        self.get_context().set_main_graph(self.clone())?;
        Ok(self.clone())
    }

    /// Applies [Context::set_graph_name] to the parent context and `this` graph. Returns the clone of `this`.
    pub fn set_name(&self, name: &str) -> Result<Graph> {
        self.get_context().set_graph_name(self.clone(), name)?;
        Ok(self.clone())
    }

    /// Applies [Context::get_graph_name] to the parent context and `this` graph.
    pub fn get_name(&self) -> Result<String> {
        self.get_context().get_graph_name(self.clone())
    }

    /// Returns a node of this graph with a given name, if it exists.
    pub fn retrieve_node(&self, name: &str) -> Result<Node> {
        self.get_context().retrieve_node(self.clone(), name)
    }

    /// Adds an input node to the graph: a typed leaf owned by a given party.
    ///
    /// The party must be registered in the parent context. The node must be
    /// named (see [Node::set_name]) before the graph is finalized.
    ///
    /// # Arguments
    ///
    /// * `input_type` - type of the input value
    /// * `party` - party contributing the value
    ///
    /// # Returns
    ///
    /// New input node
    ///
    /// # Example
    ///
    /// ```
    /// # use parlay_base::graphs::create_context;
    /// # use parlay_base::data_types::{secret_scalar_type, UINT64};
    /// let c = create_context().unwrap();
    /// let alice = c.create_party("Alice").unwrap();
    /// let g = c.create_graph().unwrap();
    /// let n = g.input(secret_scalar_type(UINT64), alice).unwrap();
    /// ```
    pub fn input(&self, input_type: Type, party: Party) -> Result<Node> {
        let party_id = self.get_context().check_party_registered(&party)?;
        self.add_node(vec![], Operation::Input(input_type, party_id))
    }

    /// Adds a node with a zero-valued constant of a given type.
    ///
    /// Unlike an input, a zero node is not contributed by any party; it is a
    /// plain constant (typically public) known to the external runtime.
    pub fn zeros(&self, t: Type) -> Result<Node> {
        self.add_node(vec![], Operation::Zeros(t))
    }

    /// Adds a node that adds scalars associated with two nodes of the same scalar type.
    ///
    /// The result is secret if either operand is secret.
    ///
    /// # Example
    ///
    /// ```
    /// # use parlay_base::graphs::create_context;
    /// # use parlay_base::data_types::{secret_scalar_type, UINT64};
    /// let c = create_context().unwrap();
    /// let alice = c.create_party("Alice").unwrap();
    /// let g = c.create_graph().unwrap();
    /// let t = secret_scalar_type(UINT64);
    /// let n1 = g.input(t, alice.clone()).unwrap();
    /// let n2 = g.input(t, alice).unwrap();
    /// let n3 = g.add(n1, n2).unwrap();
    /// ```
    pub fn add(&self, a: Node, b: Node) -> Result<Node> {
        self.add_node(vec![a, b], Operation::Add)
    }

    /// Adds a node that multiplies scalars associated with two nodes of the same scalar type.
    ///
    /// The result is secret if either operand is secret.
    pub fn multiply(&self, a: Node, b: Node) -> Result<Node> {
        self.add_node(vec![a, b], Operation::Multiply)
    }

    /// Binds a node of this graph to a named output revealed to a given party.
    ///
    /// Output names share a namespace with node names within the graph: all
    /// wire identifiers of a graph are pairwise distinct.
    ///
    /// # Arguments
    ///
    /// * `node` - node whose value is revealed
    /// * `name` - output name, unique within the graph
    /// * `party` - party the value is revealed to
    ///
    /// # Returns
    ///
    /// New output binding
    pub fn add_output(&self, node: Node, name: &str, party: Party) -> Result<Output> {
        if self.is_finalized() {
            return Err(runtime_error!("Can't add an output to a finalized graph"));
        }
        if node.get_graph() != *self {
            return Err(runtime_error!(
                "Can't bind an output to a node from another graph"
            ));
        }
        check_name(name)?;
        self.get_context().check_party_registered(&party)?;
        if self.body.borrow().output_names.contains_key(name) {
            return Err(runtime_error!("Output with name '{}' already exists", name));
        }
        if self.get_context().node_name_exists(self, name) {
            return Err(runtime_error!(
                "Output name '{}' clashes with a node name",
                name
            ));
        }
        let output = Output {
            node,
            name: name.to_owned(),
            party,
        };
        let mut cell = self.body.borrow_mut();
        let index = cell.outputs.len();
        cell.output_names.insert(name.to_owned(), index);
        cell.outputs.push(output.clone());
        Ok(output)
    }

    /// Returns the outputs of the graph in the order of creation.
    pub fn get_outputs(&self) -> Vec<Output> {
        self.body.borrow().outputs.clone()
    }

    /// Finalizes the graph.
    ///
    /// Finalization checks that the graph has at least one output and that
    /// every input node is named. After finalization the graph can't be
    /// changed.
    pub fn finalize(&self) -> Result<Graph> {
        if self.body.borrow().outputs.is_empty() {
            return Err(runtime_error!("Can't finalize a graph without outputs"));
        }
        for node in self.get_nodes() {
            if node.get_operation().is_input() && node.get_name()?.is_none() {
                return Err(runtime_error!(
                    "Can't finalize a graph with an unnamed input: node {}",
                    node.get_id()
                ));
            }
        }
        self.body.borrow_mut().finalized = true;
        Ok(self.clone())
    }

    /// Returns the nodes of the graph in the order of creation.
    pub fn get_nodes(&self) -> Vec<Node> {
        self.body.borrow().nodes.clone()
    }

    /// Returns the ID of the graph.
    ///
    /// A graph ID is a serial number of a graph between `0` and `n-1` where `n` is the number of graphs in the parent context.
    pub fn get_id(&self) -> u64 {
        self.body.borrow().id
    }

    /// Returns the number of nodes in the graph.
    pub fn get_num_nodes(&self) -> u64 {
        self.body.borrow().nodes.len() as u64
    }

    /// Returns a node of the graph with a given ID.
    pub fn get_node_by_id(&self, id: u64) -> Result<Node> {
        let cell = self.body.borrow();
        if id >= cell.nodes.len() as u64 {
            return Err(runtime_error!("Node with id {} doesn't exist", id));
        }
        Ok(cell.nodes[id as usize].clone())
    }

    /// Returns the parent context of the graph.
    pub fn get_context(&self) -> Context {
        self.body.borrow().context.upgrade()
    }

    /// Rearrange given input values according to the names and the order of the related input nodes.
    ///
    /// For example, given a graph with the first input node named 'A' and the second one named 'B' and input values `{'B': v, 'A': w}`, this function returns a vector `[w, v]`.
    ///
    /// # Arguments
    ///
    /// `values` - hashmap of values keyed by node names
    ///
    /// # Returns
    ///
    /// Vector of values arranged by node names
    pub fn prepare_input_values<T: Clone>(&self, values: HashMap<&str, T>) -> Result<Vec<T>> {
        self.get_context()
            .prepare_input_values(self.clone(), values)
    }
}

impl Graph {
    /// Adds an operation node to the graph and returns it.
    ///
    /// The new node is type-checked before it is committed; an ill-typed node
    /// is removed and an error returned.
    ///
    /// # Arguments
    ///
    /// * `node_dependencies` - vector of nodes necessary to perform the given operation
    /// * `operation` - operation performed by the node
    ///
    /// # Returns
    ///
    /// New operation node that gets added
    pub fn add_node(&self, node_dependencies: Vec<Node>, operation: Operation) -> Result<Node> {
        if self.is_finalized() {
            return Err(runtime_error!("Can't add a node to a finalized graph"));
        }
        for dependency in &node_dependencies {
            if dependency.get_graph() != *self
                || dependency.get_id() >= self.body.borrow().nodes.len() as u64
                || self.body.borrow().nodes[dependency.get_id() as usize] != *dependency
            {
                return Err(runtime_error!(
                    "Can't add a node with invalid node dependencies"
                ));
            }
        }
        if self.get_num_nodes() >= graph_size_limit_constants::MAX_NODES {
            return Err(runtime_error!(
                "Can't add a node: the graph already contains MAX_NODES nodes"
            ));
        }
        let id = self.body.borrow().nodes.len() as u64;
        let result = Node {
            body: Arc::new(AtomicRefCell::new(NodeBody {
                graph: self.downgrade(),
                node_dependencies: node_dependencies.iter().map(|n| n.downgrade()).collect(),
                operation,
                id,
            })),
        };
        {
            let mut cell = self.body.borrow_mut();
            cell.nodes.push(result.clone());
        }
        let context_has_type_checker = {
            let context = self.get_context();
            let context_cell = context.body.borrow();
            context_cell.type_checker.is_some()
        };
        if context_has_type_checker {
            let type_checking_result = result.get_type();
            if let Err(e) = type_checking_result {
                self.remove_last_node(result)?;
                return Err(e);
            }
        }
        Ok(result)
    }

    fn remove_last_node(&self, n: Node) -> Result<()> {
        if n.get_graph() != *self {
            return Err(runtime_error!(
                "The node to be removed from a different graph"
            ));
        }
        {
            let cell = self.body.borrow();
            if n != *cell
                .nodes
                .last()
                .ok_or_else(|| runtime_error!("Nodes list is empty"))?
            {
                return Err(runtime_error!(
                    "The node to be removed is not the last node"
                ));
            }
        };
        let context = self.get_context();
        context.unregister_node(n.clone())?;
        let mut context_body = context.body.borrow_mut();
        if let Some(tc) = &mut context_body.type_checker {
            tc.unregister_node(n)?;
        }
        let mut cell = self.body.borrow_mut();
        cell.nodes.pop();
        Ok(())
    }

    pub(super) fn is_finalized(&self) -> bool {
        self.body.borrow().finalized
    }

    pub(super) fn check_finalized(&self) -> Result<()> {
        if !self.is_finalized() {
            return Err(runtime_error!("Graph is not finalized"));
        }
        Ok(())
    }

    fn make_serializable(&self) -> SerializableGraph {
        Arc::new(SerializableGraphBody {
            finalized: self.is_finalized(),
            nodes: self
                .get_nodes()
                .iter()
                .map(|n| n.make_serializable())
                .collect(),
            outputs: self
                .get_outputs()
                .iter()
                .map(|o| SerializableOutput {
                    node: o.get_node().get_id(),
                    name: o.get_name(),
                    party: o.get_party().get_id(),
                })
                .collect(),
        })
    }

    fn downgrade(&self) -> WeakGraph {
        WeakGraph {
            body: Arc::downgrade(&self.body),
        }
    }
}

type WeakGraphBodyPointer = Weak<AtomicRefCell<GraphBody>>;

#[derive(Debug)]
struct WeakGraph {
    body: WeakGraphBodyPointer,
}

impl WeakGraph {
    //upgrade function panics if the the Graph pointer it downgraded from went out of scope
    fn upgrade(&self) -> Graph {
        Graph {
            body: self.body.upgrade().unwrap(),
        }
    }
}

impl Clone for WeakGraph {
    fn clone(&self) -> Self {
        WeakGraph {
            body: self.body.clone(),
        }
    }
}

struct ContextBody {
    finalized: bool,
    graphs: Vec<Graph>,
    parties: Vec<Party>,
    main_graph: Option<WeakGraph>,
    /// party name -> party_id
    parties_names_inverse: HashMap<String, PartyId>,
    /// graph_id -> name
    graphs_names: HashMap<u64, String>,
    /// name -> graph_id
    graphs_names_inverse: HashMap<String, u64>,
    /// (graph_id, node_id) -> name
    nodes_names: HashMap<(u64, u64), String>,
    /// graph_id -> (name -> node_id)
    nodes_names_inverse: HashMap<u64, HashMap<String, u64>>,
    type_checker: Option<TypeInferenceWorker>,
}

type ContextBodyPointer = Arc<AtomicRefCell<ContextBody>>;

/// A structure that stores a pointer to a computation context that contains related computation graphs and parties.
///
/// Context is a basic object to create computation graphs and register the
/// parties contributing their inputs. It should have a main graph and be
/// finalized in order to be handed over to the external secure-computation
/// runtime.
///
/// [Clone] trait duplicates the pointer, not the underlying context.
///
/// [PartialEq] trait compares pointers, not the related contexts.
///
/// # Example
///
/// ```
/// # use parlay_base::graphs::{Context, create_context};
/// # use parlay_base::data_types::{secret_scalar_type, UINT64};
/// # use parlay_base::errors::Result;
/// let context = || -> Result<Context> {
///     let context = create_context()?;
///     let alice = context.create_party("Alice")?;
///     let bob = context.create_party("Bob")?;
///     let graph = context.create_graph()?.set_name("main")?;
///     let t = secret_scalar_type(UINT64);
///     let a = graph.input(t, alice.clone())?.set_name("a")?;
///     let b = graph.input(t, bob)?.set_name("b")?;
///     a.add(b)?.set_as_output("sum", alice)?;
///     graph.finalize()?.set_as_main()?;
///     context.finalize()?;
///     Ok(context)
/// }()
/// .unwrap();
/// assert_eq!(context.get_num_graphs(), 1);
/// ```
pub struct Context {
    body: ContextBodyPointer,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("body", &self.body.as_ptr())
            .finish()
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match serde_json::to_string(&self) {
            Ok(s) => write!(f, "{s}"),
            Err(_err) => Err(fmt::Error),
        }
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Graph[num_nodes={}]", self.get_num_nodes())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.get_type() {
            Ok(t) => write!(f, "Node[type={t}]"),
            Err(_) => write!(f, "Node[id={}]", self.get_id()),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct SerializableContextBody {
    finalized: bool,
    /// party names in registration order; a party's ID is its index
    parties: Vec<String>,
    graphs: Vec<SerializableGraph>,
    main_graph: Option<u64>,
    /// graph_id -> name
    graphs_names: Vec<(u64, String)>,
    /// (graph_id, node_id) -> name
    nodes_names: Vec<((u64, u64), String)>,
}

impl SerializableContextBody {
    fn recover_original_graph(
        serializable_graph: &SerializableGraph,
        context: &Context,
    ) -> Result<Graph> {
        let result_graph = context.create_graph()?;
        for node in &serializable_graph.nodes {
            let mut node_dependencies = vec![];
            for id in &node.node_dependencies {
                node_dependencies.push(result_graph.get_node_by_id(*id)?);
            }
            result_graph.add_node(node_dependencies, node.operation.clone())?;
        }
        for output in &serializable_graph.outputs {
            let rebuilt_node = result_graph.get_node_by_id(output.node)?;
            let party = context.get_party_by_id(output.party)?;
            result_graph.add_output(rebuilt_node, &output.name, party)?;
        }
        // finalization is deferred until node names are recovered
        Ok(result_graph)
    }

    fn recover_original_context(&self) -> Result<Context> {
        let result_context = create_context()?;
        for party_name in &self.parties {
            result_context.create_party(party_name)?;
        }
        for graph in &self.graphs {
            let _result_graph = Self::recover_original_graph(graph, &result_context)?;
        }
        for (id, name) in &self.graphs_names {
            let current_graph = result_context.get_graph_by_id(*id)?;
            result_context.set_graph_name(current_graph, name)?;
        }
        for ((graph_id, node_id), name) in &self.nodes_names {
            let current_node = result_context.get_node_by_global_id((*graph_id, *node_id))?;
            result_context.set_node_name(current_node, name)?;
        }
        for (id, graph) in self.graphs.iter().enumerate() {
            if graph.finalized {
                result_context.get_graph_by_id(id as u64)?.finalize()?;
            }
        }
        if let Some(id) = self.main_graph {
            let rebuilt_main_graph = result_context.get_graph_by_id(id)?;
            result_context.set_main_graph(rebuilt_main_graph)?;
        }
        if self.finalized {
            result_context.finalize()?;
        }
        Ok(result_context)
    }
}

type SerializableContext = Arc<SerializableContextBody>;

impl Clone for Context {
    /// Returns a new [Context] value with a copy of the pointer to a context.
    fn clone(&self) -> Self {
        Context {
            body: self.body.clone(),
        }
    }
}

impl PartialEq for Context {
    /// Tests whether `self` and `other` contexts are equal via comparison of their respective pointers.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

impl Eq for Context {}

impl Context {
    /// Creates an empty computation graph in this context.
    ///
    /// # Example
    ///
    /// ```
    /// # use parlay_base::graphs::create_context;
    /// let c = create_context().unwrap();
    /// let g = c.create_graph().unwrap();
    /// ```
    pub fn create_graph(&self) -> Result<Graph> {
        if self.body.borrow().finalized {
            return Err(runtime_error!("Can't add a graph to a finalized context"));
        }
        let id = self.body.borrow().graphs.len() as u64;
        let result = Graph {
            body: Arc::new(AtomicRefCell::new(GraphBody {
                finalized: false,
                nodes: vec![],
                outputs: vec![],
                output_names: HashMap::new(),
                id,
                context: self.downgrade(),
            })),
        };
        self.body.borrow_mut().graphs.push(result.clone());
        Ok(result)
    }

    /// Registers a new party with a given name in this context.
    ///
    /// Party names are unique within a context; registering a duplicate name
    /// is a construction error.
    ///
    /// # Arguments
    ///
    /// `name` - name of the party
    ///
    /// # Returns
    ///
    /// New party
    ///
    /// # Example
    ///
    /// ```
    /// # use parlay_base::graphs::create_context;
    /// let c = create_context().unwrap();
    /// let alice = c.create_party("Alice").unwrap();
    /// assert_eq!(alice.get_id(), 0);
    /// assert!(c.create_party("Alice").is_err());
    /// ```
    pub fn create_party(&self, name: &str) -> Result<Party> {
        if self.is_finalized() {
            return Err(runtime_error!("Can't add a party to a finalized context"));
        }
        check_party_name(name)?;
        let mut cell = self.body.borrow_mut();
        if cell.parties_names_inverse.contains_key(name) {
            return Err(runtime_error!("Party with name '{}' already exists", name));
        }
        if cell.parties.len() as u64 >= graph_size_limit_constants::MAX_PARTIES {
            return Err(runtime_error!(
                "Can't register more than MAX_PARTIES parties"
            ));
        }
        let id = cell.parties.len() as PartyId;
        let party = create_party_handle(id, name.to_owned());
        cell.parties.push(party.clone());
        cell.parties_names_inverse.insert(name.to_owned(), id);
        Ok(party)
    }

    /// Returns the parties of the context in the order of registration.
    pub fn get_parties(&self) -> Vec<Party> {
        self.body.borrow().parties.clone()
    }

    /// Returns the number of parties registered in the context.
    pub fn get_num_parties(&self) -> u64 {
        self.body.borrow().parties.len() as u64
    }

    /// Returns the party with a given ID.
    pub fn get_party_by_id(&self, id: PartyId) -> Result<Party> {
        let cell = self.body.borrow();
        if id >= cell.parties.len() as u64 {
            return Err(runtime_error!("Party with id {} doesn't exist", id));
        }
        Ok(cell.parties[id as usize].clone())
    }

    /// Returns the party with a given name, if registered.
    pub fn retrieve_party(&self, name: &str) -> Result<Party> {
        let cell = self.body.borrow();
        let id = cell
            .parties_names_inverse
            .get(name)
            .ok_or_else(|| runtime_error!("Party with name '{}' doesn't exist", name))?;
        Ok(cell.parties[*id as usize].clone())
    }

    pub(super) fn check_party_registered(&self, party: &Party) -> Result<PartyId> {
        let cell = self.body.borrow();
        let id = party.get_id();
        if (id as usize) < cell.parties.len() && cell.parties[id as usize] == *party {
            Ok(id)
        } else {
            Err(runtime_error!(
                "Party '{}' is not registered in this context",
                party
            ))
        }
    }

    /// Finalizes the context if all its graphs are finalized and the main graph is set.
    ///
    /// After finalization the context can't be changed.
    pub fn finalize(&self) -> Result<Context> {
        for graph in self.get_graphs() {
            graph.check_finalized()?;
        }
        let main_graph = self.body.borrow().main_graph.clone();
        match main_graph {
            Some(_) => {
                self.body.borrow_mut().finalized = true;
                Ok(self.clone())
            }
            _ => Err(runtime_error!(
                "Can't finalize the context without the main graph"
            )),
        }
    }

    /// Promotes a graph to the main one in this context.
    ///
    /// The graph must belong to this context and be finalized.
    pub fn set_main_graph(&self, graph: Graph) -> Result<Context> {
        if self.is_finalized() {
            return Err(runtime_error!(
                "Can't set the main graph in a finalized context"
            ));
        }
        if graph.get_context() != *self {
            return Err(runtime_error!("The graph is in a different context"));
        }
        graph.check_finalized()?;
        if self.body.borrow().main_graph.is_some() {
            return Err(runtime_error!("Main graph is already set"));
        }
        self.body.borrow_mut().main_graph = Some(graph.downgrade());
        Ok(self.clone())
    }

    /// Returns the graphs of the context in the order of creation.
    pub fn get_graphs(&self) -> Vec<Graph> {
        self.body.borrow().graphs.clone()
    }

    /// Checks if the context is finalized, otherwise returns an error.
    pub fn check_finalized(&self) -> Result<()> {
        if !self.is_finalized() {
            return Err(runtime_error!("Context is not finalized"));
        }
        Ok(())
    }

    /// Returns the main graph of the context, if set.
    pub fn get_main_graph(&self) -> Result<Graph> {
        let cell = self.body.borrow();
        match &cell.main_graph {
            Some(g) => Ok(g.upgrade()),
            None => Err(runtime_error!("Main graph is not set")),
        }
    }

    /// Returns the number of graphs in the context.
    pub fn get_num_graphs(&self) -> u64 {
        self.body.borrow().graphs.len() as u64
    }

    /// Returns the graph with a given ID.
    pub fn get_graph_by_id(&self, id: u64) -> Result<Graph> {
        let cell = self.body.borrow();
        if id >= cell.graphs.len() as u64 {
            return Err(runtime_error!("Graph with id {} doesn't exist", id));
        }
        Ok(cell.graphs[id as usize].clone())
    }

    /// Returns the node with a given (graph ID, node ID) pair.
    pub fn get_node_by_global_id(&self, id: (u64, u64)) -> Result<Node> {
        self.get_graph_by_id(id.0)?.get_node_by_id(id.1)
    }

    /// Assigns a name to a graph. Graph names are unique within a context.
    pub fn set_graph_name(&self, graph: Graph, name: &str) -> Result<Context> {
        if self.is_finalized() {
            return Err(runtime_error!("Can't name a graph in a finalized context"));
        }
        if graph.get_context() != *self {
            return Err(runtime_error!("The graph is in a different context"));
        }
        check_name(name)?;
        let graph_id = graph.get_id();
        let mut cell = self.body.borrow_mut();
        if cell.graphs_names.contains_key(&graph_id) {
            return Err(runtime_error!("Graph already has a name"));
        }
        if cell.graphs_names_inverse.contains_key(name) {
            return Err(runtime_error!("Graph with name '{}' already exists", name));
        }
        cell.graphs_names.insert(graph_id, name.to_owned());
        cell.graphs_names_inverse.insert(name.to_owned(), graph_id);
        Ok(self.clone())
    }

    /// Returns the name of a graph.
    pub fn get_graph_name(&self, graph: Graph) -> Result<String> {
        if graph.get_context() != *self {
            return Err(runtime_error!("The graph is in a different context"));
        }
        let cell = self.body.borrow();
        cell.graphs_names
            .get(&graph.get_id())
            .cloned()
            .ok_or_else(|| runtime_error!("Graph doesn't have a name"))
    }

    /// Returns the graph with a given name, if it exists.
    pub fn retrieve_graph(&self, name: &str) -> Result<Graph> {
        let graph_id = {
            let cell = self.body.borrow();
            *cell
                .graphs_names_inverse
                .get(name)
                .ok_or_else(|| runtime_error!("Graph with name '{}' doesn't exist", name))?
        };
        self.get_graph_by_id(graph_id)
    }

    /// Assigns a name to a node.
    ///
    /// Node names are unique within their graph and share a namespace with
    /// the graph's output names; they serve as wire identifiers of the
    /// external runtime.
    pub fn set_node_name(&self, node: Node, name: &str) -> Result<Context> {
        if self.is_finalized() {
            return Err(runtime_error!("Can't name a node in a finalized context"));
        }
        if node.get_graph().get_context() != *self {
            return Err(runtime_error!("The node is in a different context"));
        }
        check_name(name)?;
        let graph = node.get_graph();
        let graph_id = graph.get_id();
        let node_id = node.get_id();
        if graph.body.borrow().output_names.contains_key(name) {
            return Err(runtime_error!(
                "Node name '{}' clashes with an output name",
                name
            ));
        }
        let mut cell = self.body.borrow_mut();
        if cell.nodes_names.contains_key(&(graph_id, node_id)) {
            return Err(runtime_error!("Node already has a name"));
        }
        let graph_map = cell.nodes_names_inverse.entry(graph_id).or_default();
        if graph_map.contains_key(name) {
            return Err(runtime_error!("Node with name '{}' already exists", name));
        }
        graph_map.insert(name.to_owned(), node_id);
        cell.nodes_names.insert((graph_id, node_id), name.to_owned());
        Ok(self.clone())
    }

    /// Returns the name of a node, or `None` if the node is unnamed.
    pub fn get_node_name(&self, node: Node) -> Result<Option<String>> {
        if node.get_graph().get_context() != *self {
            return Err(runtime_error!("The node is in a different context"));
        }
        let cell = self.body.borrow();
        Ok(cell
            .nodes_names
            .get(&(node.get_graph().get_id(), node.get_id()))
            .cloned())
    }

    /// Returns the node of a given graph with a given name, if it exists.
    pub fn retrieve_node(&self, graph: Graph, name: &str) -> Result<Node> {
        if graph.get_context() != *self {
            return Err(runtime_error!("The graph is in a different context"));
        }
        let node_id = {
            let cell = self.body.borrow();
            *cell
                .nodes_names_inverse
                .get(&graph.get_id())
                .ok_or_else(|| runtime_error!("The graph has no named nodes"))?
                .get(name)
                .ok_or_else(|| runtime_error!("Node with name '{}' doesn't exist", name))?
        };
        graph.get_node_by_id(node_id)
    }

    pub(super) fn node_name_exists(&self, graph: &Graph, name: &str) -> bool {
        let cell = self.body.borrow();
        cell.nodes_names_inverse
            .get(&graph.get_id())
            .map_or(false, |m| m.contains_key(name))
    }

    /// Compares this context with another one structurally, rather than by
    /// pointer as [PartialEq] does.
    pub fn deep_equal(&self, context2: Context) -> bool {
        contexts_deep_equal(self.clone(), context2)
    }
}

fn serialize_hashmap<K, V>(map: HashMap<K, V>) -> Vec<(K, V)>
where
    K: Ord,
{
    let mut result: Vec<(K, V)> = map.into_iter().collect();
    result.sort_by(|v1, v2| v1.0.cmp(&v2.0));
    result
}

impl Context {
    pub(super) fn is_finalized(&self) -> bool {
        self.body.borrow().finalized
    }

    fn make_serializable(&self) -> SerializableContext {
        let main_graph = match self.get_main_graph() {
            Ok(g) => Some(g.get_id()),
            Err(_) => None,
        };
        let cell = self.body.borrow();
        Arc::new(SerializableContextBody {
            finalized: self.is_finalized(),
            parties: cell.parties.iter().map(|p| p.get_name()).collect(),
            graphs: self
                .get_graphs()
                .iter()
                .map(|g| g.make_serializable())
                .collect(),
            main_graph,
            graphs_names: serialize_hashmap(cell.graphs_names.clone()),
            nodes_names: serialize_hashmap(cell.nodes_names.clone()),
        })
    }

    fn add_type_checker(&self) -> Result<Context> {
        {
            let mut cell = self.body.borrow_mut();
            if cell.type_checker.is_some() {
                return Err(runtime_error!(
                    "Type checker associated with the context already exists"
                ));
            }
            cell.type_checker = Some(create_type_inference_worker());
        }
        for graph in self.get_graphs() {
            for node in graph.get_nodes() {
                node.get_type()?;
            }
        }
        Ok(self.clone())
    }

    fn unregister_node(&self, node: Node) -> Result<()> {
        if node.get_graph().get_context() != *self {
            return Err(runtime_error!(
                "The node to be unregistered is in a different context"
            ));
        }
        if self.is_finalized() {
            return Err(runtime_error!(
                "Can't unregister a node from a finalized context"
            ));
        }

        let node_id = node.get_id();
        let graph_id = node.get_graph().get_id();

        let mut cell = self.body.borrow_mut();
        let name_option = cell.nodes_names.remove(&(graph_id, node_id));
        if let Some(name) = name_option {
            if let Some(graph_map_inverse) = cell.nodes_names_inverse.get_mut(&graph_id) {
                graph_map_inverse.remove(&name);
            }
        }
        Ok(())
    }

    fn to_versioned_data(&self) -> Result<VersionedData> {
        VersionedData::create_versioned_data(
            DATA_VERSION,
            serde_json::to_string(&self.make_serializable())?,
        )
    }

    fn prepare_input_values<T: Clone>(
        &self,
        graph: Graph,
        values: HashMap<&str, T>,
    ) -> Result<Vec<T>> {
        if graph.get_context() != *self {
            return Err(runtime_error!("The graph is in a different context"));
        }
        let graph_id = graph.get_id();
        let cell = self.body.borrow();
        for node_name in values.keys() {
            cell.nodes_names_inverse
                .get(&graph_id)
                .ok_or_else(|| runtime_error!("Trying to call graph without named nodes"))?
                .get(node_name as &str)
                .ok_or_else(|| runtime_error!("Input with a given name is not found"))?;
        }
        let mut result = vec![];
        for node in graph.get_nodes() {
            if node.get_operation().is_input() {
                let node_id = node.get_id();
                let node_name = cell
                    .nodes_names
                    .get(&(graph_id, node_id))
                    .ok_or_else(|| runtime_error!("Unnamed input"))?;
                let node_value = values
                    .get(node_name as &str)
                    .ok_or_else(|| runtime_error!("Unspecified input"))?
                    .clone();
                result.push(node_value);
            }
        }
        Ok(result)
    }

    pub(super) fn downgrade(&self) -> WeakContext {
        WeakContext {
            body: Arc::downgrade(&self.body),
        }
    }
}

impl Serialize for Context {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let versioned_context = self
            .to_versioned_data()
            .map_err(serde::ser::Error::custom)?;
        versioned_context.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Context {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Context, D::Error>
    where
        D: Deserializer<'de>,
    {
        let versioned_context = VersionedData::deserialize(deserializer)?;
        if !versioned_context.check_version(DATA_VERSION) {
            Err(runtime_error!(
                "Context version doesn't match the requirement"
            ))
            .map_err(serde::de::Error::custom)
        } else {
            let serializable_context =
                serde_json::from_str::<SerializableContext>(versioned_context.get_data_string())
                    .map_err(serde::de::Error::custom)?;
            serializable_context
                .recover_original_context()
                .map_err(serde::de::Error::custom)
        }
    }
}

/// In general, `create_unchecked_context()` should not return errors, but
/// we still make the result type Result<Context> for uniformity.
pub(super) fn create_unchecked_context() -> Result<Context> {
    Ok(Context {
        body: Arc::new(AtomicRefCell::new(ContextBody {
            finalized: false,
            graphs: vec![],
            parties: vec![],
            main_graph: None,
            parties_names_inverse: HashMap::new(),
            graphs_names: HashMap::new(),
            graphs_names_inverse: HashMap::new(),
            nodes_names: HashMap::new(),
            nodes_names_inverse: HashMap::new(),
            type_checker: None,
        })),
    })
}

/// Creates an empty computation context.
///
/// # Returns
///
/// New computation context
///
/// # Example
///
/// ```
/// # use parlay_base::graphs::create_context;
/// let c = create_context().unwrap();
/// ```
pub fn create_context() -> Result<Context> {
    let context = create_unchecked_context()?;
    context.add_type_checker()?;
    Ok(context)
}

fn graphs_deep_equal(graph1: Graph, graph2: Graph) -> bool {
    let graph1_body = graph1.body.borrow();
    let graph2_body = graph2.body.borrow();
    if graph1_body.finalized != graph2_body.finalized {
        return false;
    }
    if graph1_body.nodes.len() != graph2_body.nodes.len() {
        return false;
    }
    for (node1, node2) in graph1_body.nodes.iter().zip(graph2_body.nodes.iter()) {
        if node1.get_operation() != node2.get_operation() {
            return false;
        }
        let dependencies1: Vec<u64> = node1
            .get_node_dependencies()
            .iter()
            .map(|n| n.get_id())
            .collect();
        let dependencies2: Vec<u64> = node2
            .get_node_dependencies()
            .iter()
            .map(|n| n.get_id())
            .collect();
        if dependencies1 != dependencies2 {
            return false;
        }
    }
    if graph1_body.outputs.len() != graph2_body.outputs.len() {
        return false;
    }
    for (output1, output2) in graph1_body.outputs.iter().zip(graph2_body.outputs.iter()) {
        if output1.get_node().get_id() != output2.get_node().get_id()
            || output1.get_name() != output2.get_name()
            || output1.get_party().get_id() != output2.get_party().get_id()
        {
            return false;
        }
    }
    true
}

/// Compares two contexts structurally: same parties, same graphs with the
/// same nodes, edges and outputs, same names, same main graph.
pub fn contexts_deep_equal(context1: Context, context2: Context) -> bool {
    let parties1: Vec<String> = context1.get_parties().iter().map(|p| p.get_name()).collect();
    let parties2: Vec<String> = context2.get_parties().iter().map(|p| p.get_name()).collect();
    if parties1 != parties2 {
        return false;
    }
    if context1.get_num_graphs() != context2.get_num_graphs() {
        return false;
    }
    for (graph1, graph2) in context1.get_graphs().iter().zip(context2.get_graphs().iter()) {
        if !graphs_deep_equal(graph1.clone(), graph2.clone()) {
            return false;
        }
    }
    let main1 = context1.get_main_graph().map(|g| g.get_id()).ok();
    let main2 = context2.get_main_graph().map(|g| g.get_id()).ok();
    if main1 != main2 {
        return false;
    }
    let context1_body = context1.body.borrow();
    let context2_body = context2.body.borrow();
    context1_body.finalized == context2_body.finalized
        && context1_body.graphs_names == context2_body.graphs_names
        && context1_body.nodes_names == context2_body.nodes_names
}

type WeakContextBodyPointer = Weak<AtomicRefCell<ContextBody>>;

pub(super) struct WeakContext {
    body: WeakContextBodyPointer,
}

impl WeakContext {
    //upgrade function panics if the the Context pointer it downgraded from went out of scope
    fn upgrade(&self) -> Context {
        Context {
            body: self.body.upgrade().unwrap(),
        }
    }
}

impl Clone for WeakContext {
    fn clone(&self) -> Self {
        WeakContext {
            body: self.body.clone(),
        }
    }
}

pub mod util {
    //! Helper functions for testing and smaller examples.
    use super::*;

    /// Creates a finalized context with a single graph built by a given
    /// closure. The closure is responsible for naming inputs and binding
    /// outputs.
    pub fn simple_context<F>(build_graph_fn: F) -> Result<Context>
    where
        F: FnOnce(&Graph) -> Result<()>,
    {
        let c = create_context()?;
        let g = c.create_graph()?;
        build_graph_fn(&g)?;
        g.finalize()?;
        g.set_as_main()?;
        c.finalize()?;
        Ok(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::{
        public_scalar_type, secret_scalar_type, Visibility, UINT32, UINT64,
    };

    fn well_formed_context() -> Result<Context> {
        let c = create_context()?;
        let alice = c.create_party("Alice")?;
        let bob = c.create_party("Bob")?;
        let g = c.create_graph()?.set_name("main")?;
        let t = secret_scalar_type(UINT64);
        let a = g.input(t, alice.clone())?.set_name("a")?;
        let b = g.input(t, bob)?.set_name("b")?;
        let zero = g.zeros(public_scalar_type(UINT64))?;
        let sum = zero.add(a.clone())?.add(b.clone())?;
        let product = sum.multiply(b)?;
        sum.set_as_output("sum", alice.clone())?;
        g.add_output(product, "product", alice)?;
        g.finalize()?.set_as_main()?;
        c.finalize()?;
        Ok(c)
    }

    #[test]
    fn test_well_formed_cases() {
        let c = well_formed_context().unwrap();
        let g = c.retrieve_graph("main").unwrap();
        assert_eq!(g.get_num_nodes(), 6);
        assert_eq!(g.get_outputs().len(), 2);
        assert_eq!(c.get_num_parties(), 2);
        let a = g.retrieve_node("a").unwrap();
        assert_eq!(a.get_type().unwrap(), secret_scalar_type(UINT64));
        let sum = g.get_outputs()[0].get_node();
        assert_eq!(sum.get_operation(), Operation::Add);
        assert_eq!(
            sum.get_type().unwrap().get_visibility(),
            Visibility::Secret
        );
        assert_eq!(g.get_outputs()[0].get_party().get_name(), "Alice");
        assert_eq!(c.retrieve_party("Bob").unwrap().get_id(), 1);
    }

    #[test]
    fn test_malformed_graphs() {
        || -> Result<()> {
            let c = create_context()?;
            let alice = c.create_party("Alice")?;
            let t = secret_scalar_type(UINT64);

            // dependency from another graph
            let g1 = c.create_graph()?;
            let g2 = c.create_graph()?;
            let n1 = g1.input(t, alice.clone())?;
            assert!(g2.add(n1.clone(), n1.clone()).is_err());

            // mismatched scalar types
            let n2 = g1.input(secret_scalar_type(UINT32), alice.clone())?;
            assert!(g1.add(n1.clone(), n2.clone()).is_err());
            // the rejected node must not stay in the graph
            assert_eq!(g1.get_num_nodes(), 2);

            // duplicate node name
            n1.set_name("x")?;
            assert!(n2.set_name("x").is_err());
            // renaming is not allowed
            assert!(n1.set_name("y").is_err());

            // output name clashes with a node name
            assert!(g1.add_output(n1.clone(), "x", alice.clone()).is_err());
            g1.add_output(n1.clone(), "out", alice.clone())?;
            // duplicate output name
            assert!(g1.add_output(n2.clone(), "out", alice.clone()).is_err());
            // node name clashes with an output name
            assert!(n2.set_name("out").is_err());

            // unnamed input rejected at finalization
            assert!(g1.finalize().is_err());
            n2.set_name("y")?;
            g1.finalize()?;

            // no mutation after finalization
            assert!(g1.input(t, alice.clone()).is_err());
            assert!(g1.add_output(n2, "late", alice.clone()).is_err());

            // graph without outputs can't be finalized
            let n3 = g2.input(t, alice)?.set_name("z")?;
            assert!(g2.finalize().is_err());
            n3.set_as_output("z_out", c.retrieve_party("Alice")?)?;
            g2.finalize()?;
            Ok(())
        }()
        .unwrap();
    }

    #[test]
    fn test_malformed_contexts() {
        || -> Result<()> {
            let c = create_context()?;
            assert!(c.create_party("").is_err());
            c.create_party("Alice")?;
            assert!(c.create_party("Alice").is_err());

            // finalization needs a finalized main graph
            let g = c.create_graph()?;
            assert!(c.finalize().is_err());
            assert!(c.set_main_graph(g.clone()).is_err());
            let alice = c.retrieve_party("Alice")?;
            g.input(secret_scalar_type(UINT64), alice.clone())?
                .set_name("a")?
                .set_as_output("out", alice)?;
            g.finalize()?;
            c.set_main_graph(g.clone())?;
            assert!(c.set_main_graph(g).is_err());
            c.finalize()?;

            // no mutation after finalization
            assert!(c.create_graph().is_err());
            assert!(c.create_party("Bob").is_err());
            Ok(())
        }()
        .unwrap();
    }

    #[test]
    fn test_foreign_party() {
        || -> Result<()> {
            let c1 = create_context()?;
            let c2 = create_context()?;
            let alice = c1.create_party("Alice")?;
            let g = c2.create_graph()?;
            assert!(g.input(secret_scalar_type(UINT64), alice).is_err());
            Ok(())
        }()
        .unwrap();
    }

    #[test]
    fn test_serialization_round_trip() {
        let c = well_formed_context().unwrap();
        let serialized = serde_json::to_string(&c).unwrap();
        let recovered = serde_json::from_str::<Context>(&serialized).unwrap();
        assert!(c.deep_equal(recovered));
    }

    #[test]
    fn test_serialization_version_mismatch() {
        let c = well_formed_context().unwrap();
        let serialized = serde_json::to_string(&c).unwrap();
        let bad_version = serialized.replacen("\"version\":1", "\"version\":99", 1);
        assert_ne!(serialized, bad_version);
        assert!(serde_json::from_str::<Context>(&bad_version).is_err());
    }

    #[test]
    fn test_deep_equal() {
        let c1 = well_formed_context().unwrap();
        let c2 = well_formed_context().unwrap();
        assert!(c1 != c2);
        assert!(c1.deep_equal(c2));

        let c3 = util::simple_context(|g| {
            let alice = g.get_context().create_party("Alice")?;
            g.input(secret_scalar_type(UINT64), alice.clone())?
                .set_name("a")?
                .set_as_output("out", alice)?;
            Ok(())
        })
        .unwrap();
        assert!(!c1.deep_equal(c3));
    }

    #[test]
    fn test_prepare_input_values() {
        let c = util::simple_context(|g| {
            let alice = g.get_context().create_party("Alice")?;
            let bob = g.get_context().create_party("Bob")?;
            let t = secret_scalar_type(UINT64);
            let a = g.input(t, alice.clone())?.set_name("a")?;
            let b = g.input(t, bob)?.set_name("b")?;
            a.add(b)?.set_as_output("sum", alice)?;
            Ok(())
        })
        .unwrap();
        let g = c.get_main_graph().unwrap();
        let ordered = g
            .prepare_input_values(hashmap! {
                "b" => 2,
                "a" => 1,
            })
            .unwrap();
        assert_eq!(ordered, vec![1, 2]);
        assert!(g.prepare_input_values(hashmap! {"c" => 3}).is_err());
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(
            Operation::Input(secret_scalar_type(UINT64), 0).to_string(),
            "Input"
        );
        assert_eq!(Operation::Add.to_string(), "Add");
        assert_eq!(Operation::Multiply.to_string(), "Multiply");
        assert_eq!(
            Operation::Zeros(public_scalar_type(UINT64)).to_string(),
            "Zeros"
        );
    }
}

//! # Lumen Behavior
//!
//! Node-graph scripting: validated graph editing, a registry of node
//! types, and a pull-based interpreter that executes graphs against a
//! document and its scene store.
//!
//! Flow moves forward from event nodes; values are pulled backwards
//! through links when a handler asks for an input. Connection validation
//! keeps the two planes apart and type-checks every value edge, so the
//! interpreter never has to defend against miswired graphs.

pub mod error;
pub mod exec;
pub mod export;
pub mod graph;
pub mod registry;
pub mod socket;

pub use error::{BehaviorError, BehaviorResult, ConnectError};
pub use exec::{ExecContext, GraphRuntime, MAX_FLOW_DEPTH, MAX_VALUE_DEPTH};
pub use export::{apply_graph_json, to_graph_json};
pub use graph::{
    connect_flow, connect_value, create_node, disconnect_flow, disconnect_value, set_parameter,
};
pub use registry::{NodeHandler, NodeRegistry, EVENT_ON_START, EVENT_ON_TICK};
pub use socket::{effective_type, NodeSpec, SocketType, ValueSocket};

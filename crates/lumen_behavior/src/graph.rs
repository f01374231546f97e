//! # Graph Editing
//!
//! Validated mutation of a document's behavior graph. Every edit checks
//! endpoints, socket names, and effective socket types before touching the
//! document, so a graph that was edited through this module still passes
//! document validation afterwards.

use lumen_asset::{AssetError, BehaviorNode, Document, ParamValue, PathRef, RefKind};

use crate::error::{BehaviorError, BehaviorResult, ConnectError};
use crate::registry::NodeRegistry;
use crate::socket::effective_type;

/// Creates a behavior node of a registered type with a generated,
/// collision-proof name. Returns the new node's index.
pub fn create_node(
    document: &mut Document,
    registry: &NodeRegistry,
    node_type: &str,
) -> BehaviorResult<usize> {
    registry.spec(node_type)?;
    let name = document.generate_name(node_type);
    Ok(document.create_behavior_node(BehaviorNode::new(node_type, name))?)
}

/// Connects a value output socket to a value input socket.
///
/// # Errors
///
/// [`ConnectError::MissingEndpoint`] if either node does not exist,
/// [`ConnectError::UnknownSocket`] if either socket is not declared,
/// [`ConnectError::TypeMismatch`] if the effective socket types differ,
/// and [`ConnectError::AlreadyConnected`] if the input already has a
/// source.
pub fn connect_value(
    document: &mut Document,
    registry: &NodeRegistry,
    source: usize,
    source_socket: &str,
    target: usize,
    target_socket: &str,
) -> BehaviorResult<()> {
    let source_node = document
        .behavior
        .nodes
        .get(source)
        .ok_or(ConnectError::MissingEndpoint(source))?;
    let target_node = document
        .behavior
        .nodes
        .get(target)
        .ok_or(ConnectError::MissingEndpoint(target))?;

    let source_spec = registry.spec(&source_node.node_type)?;
    let target_spec = registry.spec(&target_node.node_type)?;

    let output = source_spec
        .value_output(source_socket)
        .ok_or_else(|| ConnectError::UnknownSocket {
            node_type: source_node.node_type.clone(),
            socket: source_socket.to_owned(),
        })?;
    let input = target_spec
        .value_input(target_socket)
        .ok_or_else(|| ConnectError::UnknownSocket {
            node_type: target_node.node_type.clone(),
            socket: target_socket.to_owned(),
        })?;

    let source_type = effective_type(document, source_node, output.ty)?;
    let target_type = effective_type(document, target_node, input.ty)?;
    if source_type != target_type {
        return Err(ConnectError::TypeMismatch {
            source_type,
            target_type,
        }
        .into());
    }

    if document.behavior.nodes[target]
        .parameters
        .contains_key(target_socket)
    {
        return Err(ConnectError::AlreadyConnected {
            node: target,
            socket: target_socket.to_owned(),
        }
        .into());
    }

    document.behavior.nodes[target].parameters.insert(
        target_socket.to_owned(),
        ParamValue::Link {
            node: source,
            socket: source_socket.to_owned(),
        },
    );
    Ok(())
}

/// Connects an output flow socket to a flow-executable node.
pub fn connect_flow(
    document: &mut Document,
    registry: &NodeRegistry,
    source: usize,
    socket: &str,
    target: usize,
) -> BehaviorResult<()> {
    let source_node = document
        .behavior
        .nodes
        .get(source)
        .ok_or(ConnectError::MissingEndpoint(source))?;
    let target_node = document
        .behavior
        .nodes
        .get(target)
        .ok_or(ConnectError::MissingEndpoint(target))?;

    let source_spec = registry.spec(&source_node.node_type)?;
    if !source_spec.has_flow_output(socket) {
        return Err(ConnectError::UnknownSocket {
            node_type: source_node.node_type.clone(),
            socket: socket.to_owned(),
        }
        .into());
    }
    let target_spec = registry.spec(&target_node.node_type)?;
    if !target_spec.has_flow_input {
        return Err(BehaviorError::NotExecutable(target_node.node_type.clone()));
    }

    if source_node.flow.contains_key(socket) {
        return Err(ConnectError::AlreadyConnected {
            node: source,
            socket: socket.to_owned(),
        }
        .into());
    }

    document.behavior.nodes[source]
        .flow
        .insert(socket.to_owned(), target);
    Ok(())
}

/// Assigns a non-link parameter: a constant, a variable read, or a path.
///
/// Constants and variable reads must match the input socket's effective
/// type; paths must go to a declared path input and an existing scene
/// node. An existing link on the socket is not silently overwritten.
pub fn set_parameter(
    document: &mut Document,
    registry: &NodeRegistry,
    node: usize,
    socket: &str,
    param: ParamValue,
) -> BehaviorResult<()> {
    let behavior_node = document
        .behavior
        .nodes
        .get(node)
        .ok_or(ConnectError::MissingEndpoint(node))?;
    let spec = registry.spec(&behavior_node.node_type)?;

    match &param {
        ParamValue::Link { .. } => {
            return Err(AssetError::MalformedAsset(
                "links are wired with connect_value, not set_parameter".into(),
            )
            .into());
        }
        ParamValue::Path(path) => {
            if !spec.has_path_input(socket) {
                return Err(ConnectError::UnknownSocket {
                    node_type: behavior_node.node_type.clone(),
                    socket: socket.to_owned(),
                }
                .into());
            }
            validate_path(document, *path)?;
        }
        ParamValue::Constant(value) => {
            let input = spec.value_input(socket).ok_or_else(|| {
                ConnectError::UnknownSocket {
                    node_type: behavior_node.node_type.clone(),
                    socket: socket.to_owned(),
                }
            })?;
            let target_type = effective_type(document, behavior_node, input.ty)?;
            let source_type = value.value_type();
            if source_type != target_type {
                return Err(ConnectError::TypeMismatch {
                    source_type,
                    target_type,
                }
                .into());
            }
        }
        ParamValue::Variable(variable) => {
            let input = spec.value_input(socket).ok_or_else(|| {
                ConnectError::UnknownSocket {
                    node_type: behavior_node.node_type.clone(),
                    socket: socket.to_owned(),
                }
            })?;
            let target_type = effective_type(document, behavior_node, input.ty)?;
            let source_type = document.variable(*variable)?.ty();
            if source_type != target_type {
                return Err(ConnectError::TypeMismatch {
                    source_type,
                    target_type,
                }
                .into());
            }
        }
    }

    if matches!(
        document.behavior.nodes[node].parameters.get(socket),
        Some(ParamValue::Link { .. })
    ) {
        return Err(ConnectError::AlreadyConnected {
            node,
            socket: socket.to_owned(),
        }
        .into());
    }

    document.behavior.nodes[node]
        .parameters
        .insert(socket.to_owned(), param);
    Ok(())
}

/// Removes a parameter assignment or link from an input socket.
pub fn disconnect_value(
    document: &mut Document,
    node: usize,
    socket: &str,
) -> BehaviorResult<()> {
    let behavior_node = document
        .behavior
        .nodes
        .get_mut(node)
        .ok_or(ConnectError::MissingEndpoint(node))?;
    behavior_node.parameters.remove(socket);
    Ok(())
}

/// Removes a flow edge from an output flow socket.
pub fn disconnect_flow(document: &mut Document, node: usize, socket: &str) -> BehaviorResult<()> {
    let behavior_node = document
        .behavior
        .nodes
        .get_mut(node)
        .ok_or(ConnectError::MissingEndpoint(node))?;
    behavior_node.flow.remove(socket);
    Ok(())
}

fn validate_path(document: &Document, path: PathRef) -> BehaviorResult<()> {
    if path.node >= document.nodes.len() {
        return Err(AssetError::unresolved(RefKind::Node, path.node).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_asset::{Node, PathProperty, Value, VariableType};

    fn document_with_one_node() -> Document {
        let mut doc = Document::default();
        doc.nodes.push(Node {
            name: "cube".into(),
            ..Node::default()
        });
        doc
    }

    #[test]
    fn test_create_node_generates_unique_names() {
        let mut doc = document_with_one_node();
        let registry = NodeRegistry::with_builtins();
        let a = create_node(&mut doc, &registry, "math/add").unwrap();
        let b = create_node(&mut doc, &registry, "math/add").unwrap();
        assert_ne!(doc.behavior.nodes[a].name, doc.behavior.nodes[b].name);
    }

    #[test]
    fn test_create_node_of_unknown_type_rejected() {
        let mut doc = document_with_one_node();
        let registry = NodeRegistry::with_builtins();
        assert!(matches!(
            create_node(&mut doc, &registry, "physics/launch"),
            Err(BehaviorError::UnknownNodeType(_))
        ));
    }

    #[test]
    fn test_connect_value_type_mismatch() {
        let mut doc = document_with_one_node();
        let registry = NodeRegistry::with_builtins();
        let add = create_node(&mut doc, &registry, "math/add").unwrap();
        let translate = create_node(&mut doc, &registry, "node/translate").unwrap();

        // math/add result is Float, node/translate value wants Vec3.
        let err = connect_value(&mut doc, &registry, add, "result", translate, "value")
            .unwrap_err();
        assert_eq!(
            err,
            BehaviorError::Connect(ConnectError::TypeMismatch {
                source_type: VariableType::Float,
                target_type: VariableType::Vec3,
            })
        );

        let combine = create_node(&mut doc, &registry, "math/combine_vec3").unwrap();
        connect_value(&mut doc, &registry, combine, "result", translate, "value").unwrap();
    }

    #[test]
    fn test_connect_value_already_connected() {
        let mut doc = document_with_one_node();
        let registry = NodeRegistry::with_builtins();
        let a = create_node(&mut doc, &registry, "math/combine_vec3").unwrap();
        let b = create_node(&mut doc, &registry, "math/combine_vec3").unwrap();
        let translate = create_node(&mut doc, &registry, "node/translate").unwrap();

        connect_value(&mut doc, &registry, a, "result", translate, "value").unwrap();
        let err = connect_value(&mut doc, &registry, b, "result", translate, "value").unwrap_err();
        assert!(matches!(
            err,
            BehaviorError::Connect(ConnectError::AlreadyConnected { .. })
        ));
    }

    #[test]
    fn test_variable_socket_follows_declared_type() {
        let mut doc = document_with_one_node();
        let registry = NodeRegistry::with_builtins();
        let variable = doc.create_variable("speed".into(), VariableType::Float);
        let get = create_node(&mut doc, &registry, "variable/get").unwrap();
        doc.behavior.nodes[get].configuration =
            Some(serde_json::json!({ "variable": variable }));
        let add = create_node(&mut doc, &registry, "math/add").unwrap();

        connect_value(&mut doc, &registry, get, "value", add, "a").unwrap();

        // Retyping the variable makes the same connection invalid.
        disconnect_value(&mut doc, add, "a").unwrap();
        doc.set_variable_type(variable, VariableType::Vec3).unwrap();
        assert!(matches!(
            connect_value(&mut doc, &registry, get, "value", add, "a"),
            Err(BehaviorError::Connect(ConnectError::TypeMismatch { .. }))
        ));
    }

    #[test]
    fn test_connect_flow_rejects_non_executable_target() {
        let mut doc = document_with_one_node();
        let registry = NodeRegistry::with_builtins();
        let start = create_node(&mut doc, &registry, "lifecycle/on_start").unwrap();
        let add = create_node(&mut doc, &registry, "math/add").unwrap();
        let log = create_node(&mut doc, &registry, "debug/log").unwrap();

        assert!(matches!(
            connect_flow(&mut doc, &registry, start, "out", add),
            Err(BehaviorError::NotExecutable(_))
        ));
        connect_flow(&mut doc, &registry, start, "out", log).unwrap();
        assert!(matches!(
            connect_flow(&mut doc, &registry, start, "out", log),
            Err(BehaviorError::Connect(ConnectError::AlreadyConnected { .. }))
        ));
    }

    #[test]
    fn test_set_parameter_validates_types_and_paths() {
        let mut doc = document_with_one_node();
        let registry = NodeRegistry::with_builtins();
        let translate = create_node(&mut doc, &registry, "node/translate").unwrap();

        set_parameter(
            &mut doc,
            &registry,
            translate,
            "value",
            ParamValue::Constant(Value::Vec3([1.0, 0.0, 0.0])),
        )
        .unwrap();

        assert!(matches!(
            set_parameter(
                &mut doc,
                &registry,
                translate,
                "value",
                ParamValue::Constant(Value::Float(1.0)),
            ),
            Err(BehaviorError::Connect(ConnectError::TypeMismatch { .. }))
        ));

        set_parameter(
            &mut doc,
            &registry,
            translate,
            "target",
            ParamValue::Path(PathRef {
                node: 0,
                property: PathProperty::Translation,
            }),
        )
        .unwrap();

        // Path to a node that does not exist.
        assert!(set_parameter(
            &mut doc,
            &registry,
            translate,
            "target",
            ParamValue::Path(PathRef {
                node: 9,
                property: PathProperty::Translation,
            }),
        )
        .is_err());
    }
}

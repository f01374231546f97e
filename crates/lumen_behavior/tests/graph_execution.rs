//! End-to-end behavior graph execution against a document and scene store.

use lumen_asset::{Document, Node, ParamValue, PathProperty, PathRef, Value, VariableType};
use lumen_behavior::{
    connect_flow, connect_value, create_node, set_parameter, BehaviorError, GraphRuntime,
    NodeRegistry, EVENT_ON_START, EVENT_ON_TICK,
};
use lumen_scene::{EntityId, SceneStore};

fn two_node_document() -> Document {
    let mut doc = Document::default();
    doc.nodes.push(Node {
        name: "cube".into(),
        ..Node::default()
    });
    doc.nodes.push(Node {
        name: "lamp".into(),
        translation: [5.0, 0.0, 0.0],
        ..Node::default()
    });
    doc
}

fn translation_path(node: usize) -> ParamValue {
    ParamValue::Path(PathRef {
        node,
        property: PathProperty::Translation,
    })
}

#[test]
fn test_on_start_translates_node_and_syncs_store() {
    let mut doc = two_node_document();
    let registry = NodeRegistry::with_builtins();

    let start = create_node(&mut doc, &registry, EVENT_ON_START).unwrap();
    let translate = create_node(&mut doc, &registry, "node/translate").unwrap();
    connect_flow(&mut doc, &registry, start, "out", translate).unwrap();
    set_parameter(&mut doc, &registry, translate, "target", translation_path(0)).unwrap();
    set_parameter(
        &mut doc,
        &registry,
        translate,
        "value",
        ParamValue::Constant(Value::Vec3([1.0, 2.0, 3.0])),
    )
    .unwrap();

    let mut store = SceneStore::build(&doc).unwrap();
    let mut runtime = GraphRuntime::new(&doc);
    let fired = runtime
        .fire_event(&registry, &mut doc, Some(&mut store), EVENT_ON_START)
        .unwrap();

    assert_eq!(fired, 1);
    assert_eq!(doc.nodes[0].translation, [1.0, 2.0, 3.0]);
    assert_eq!(
        store.transform(EntityId(0)).unwrap().translation,
        [1.0, 2.0, 3.0]
    );
    // The other node is untouched.
    assert_eq!(doc.nodes[1].translation, [5.0, 0.0, 0.0]);
}

#[test]
fn test_tick_accumulates_translation() {
    let mut doc = two_node_document();
    let registry = NodeRegistry::with_builtins();

    let tick = create_node(&mut doc, &registry, EVENT_ON_TICK).unwrap();
    let translate = create_node(&mut doc, &registry, "node/translate").unwrap();
    connect_flow(&mut doc, &registry, tick, "out", translate).unwrap();
    set_parameter(&mut doc, &registry, translate, "target", translation_path(0)).unwrap();
    set_parameter(
        &mut doc,
        &registry,
        translate,
        "value",
        ParamValue::Constant(Value::Vec3([0.5, 0.0, 0.0])),
    )
    .unwrap();

    let mut runtime = GraphRuntime::new(&doc);
    for _ in 0..4 {
        runtime
            .fire_event(&registry, &mut doc, None, EVENT_ON_TICK)
            .unwrap();
    }
    assert_eq!(doc.nodes[0].translation, [2.0, 0.0, 0.0]);
}

#[test]
fn test_value_links_pull_through_math_nodes() {
    let mut doc = two_node_document();
    let registry = NodeRegistry::with_builtins();

    // on_start -> translate(cube, combine_vec3(add(1, 2), 0, 0))
    let start = create_node(&mut doc, &registry, EVENT_ON_START).unwrap();
    let add = create_node(&mut doc, &registry, "math/add").unwrap();
    let combine = create_node(&mut doc, &registry, "math/combine_vec3").unwrap();
    let translate = create_node(&mut doc, &registry, "node/translate").unwrap();

    set_parameter(
        &mut doc,
        &registry,
        add,
        "a",
        ParamValue::Constant(Value::Float(1.0)),
    )
    .unwrap();
    set_parameter(
        &mut doc,
        &registry,
        add,
        "b",
        ParamValue::Constant(Value::Float(2.0)),
    )
    .unwrap();
    connect_value(&mut doc, &registry, add, "result", combine, "x").unwrap();
    set_parameter(
        &mut doc,
        &registry,
        combine,
        "y",
        ParamValue::Constant(Value::Float(0.0)),
    )
    .unwrap();
    set_parameter(
        &mut doc,
        &registry,
        combine,
        "z",
        ParamValue::Constant(Value::Float(0.0)),
    )
    .unwrap();
    connect_value(&mut doc, &registry, combine, "result", translate, "value").unwrap();
    set_parameter(&mut doc, &registry, translate, "target", translation_path(0)).unwrap();
    connect_flow(&mut doc, &registry, start, "out", translate).unwrap();

    let mut runtime = GraphRuntime::new(&doc);
    runtime
        .fire_event(&registry, &mut doc, None, EVENT_ON_START)
        .unwrap();
    assert_eq!(doc.nodes[0].translation, [3.0, 0.0, 0.0]);
}

#[test]
fn test_variables_persist_across_events() {
    let mut doc = two_node_document();
    let registry = NodeRegistry::with_builtins();
    let variable = doc.create_variable("armed".into(), VariableType::Bool);

    let start = create_node(&mut doc, &registry, EVENT_ON_START).unwrap();
    let set = create_node(&mut doc, &registry, "variable/set").unwrap();
    doc.behavior.nodes[set].configuration = Some(serde_json::json!({ "variable": variable }));
    connect_flow(&mut doc, &registry, start, "out", set).unwrap();
    set_parameter(
        &mut doc,
        &registry,
        set,
        "value",
        ParamValue::Constant(Value::Bool(true)),
    )
    .unwrap();

    // branch on the variable during tick
    let tick = create_node(&mut doc, &registry, EVENT_ON_TICK).unwrap();
    let branch = create_node(&mut doc, &registry, "flow/branch").unwrap();
    let translate = create_node(&mut doc, &registry, "node/translate").unwrap();
    connect_flow(&mut doc, &registry, tick, "out", branch).unwrap();
    set_parameter(
        &mut doc,
        &registry,
        branch,
        "condition",
        ParamValue::Variable(variable),
    )
    .unwrap();
    connect_flow(&mut doc, &registry, branch, "true", translate).unwrap();
    set_parameter(&mut doc, &registry, translate, "target", translation_path(1)).unwrap();
    set_parameter(
        &mut doc,
        &registry,
        translate,
        "value",
        ParamValue::Constant(Value::Vec3([0.0, 1.0, 0.0])),
    )
    .unwrap();

    let mut runtime = GraphRuntime::new(&doc);

    // Before on_start the variable holds its zero value: branch goes false.
    runtime
        .fire_event(&registry, &mut doc, None, EVENT_ON_TICK)
        .unwrap();
    assert_eq!(doc.nodes[1].translation, [5.0, 0.0, 0.0]);

    runtime
        .fire_event(&registry, &mut doc, None, EVENT_ON_START)
        .unwrap();
    assert_eq!(runtime.variables()[variable], Value::Bool(true));

    runtime
        .fire_event(&registry, &mut doc, None, EVENT_ON_TICK)
        .unwrap();
    assert_eq!(doc.nodes[1].translation, [5.0, 1.0, 0.0]);
}

#[test]
fn test_sequence_runs_outputs_in_order() {
    let mut doc = two_node_document();
    let registry = NodeRegistry::with_builtins();
    let start = create_node(&mut doc, &registry, EVENT_ON_START).unwrap();
    let sequence = create_node(&mut doc, &registry, "flow/sequence").unwrap();
    connect_flow(&mut doc, &registry, start, "out", sequence).unwrap();

    for (socket, delta) in [("0", [1.0, 0.0, 0.0]), ("1", [0.0, 1.0, 0.0])] {
        let translate = create_node(&mut doc, &registry, "node/translate").unwrap();
        connect_flow(&mut doc, &registry, sequence, socket, translate).unwrap();
        set_parameter(&mut doc, &registry, translate, "target", translation_path(0)).unwrap();
        set_parameter(
            &mut doc,
            &registry,
            translate,
            "value",
            ParamValue::Constant(Value::Vec3(delta)),
        )
        .unwrap();
    }

    let mut runtime = GraphRuntime::new(&doc);
    runtime
        .fire_event(&registry, &mut doc, None, EVENT_ON_START)
        .unwrap();
    assert_eq!(doc.nodes[0].translation, [1.0, 1.0, 0.0]);
}

#[test]
fn test_flow_cycle_hits_depth_bound() {
    let mut doc = two_node_document();
    let registry = NodeRegistry::with_builtins();
    let start = create_node(&mut doc, &registry, EVENT_ON_START).unwrap();
    let a = create_node(&mut doc, &registry, "debug/log").unwrap();
    let b = create_node(&mut doc, &registry, "debug/log").unwrap();
    for log in [a, b] {
        set_parameter(
            &mut doc,
            &registry,
            log,
            "message",
            ParamValue::Constant(Value::String("loop".into())),
        )
        .unwrap();
    }
    connect_flow(&mut doc, &registry, start, "out", a).unwrap();
    connect_flow(&mut doc, &registry, a, "out", b).unwrap();
    connect_flow(&mut doc, &registry, b, "out", a).unwrap();

    let mut runtime = GraphRuntime::new(&doc);
    let err = runtime
        .fire_event(&registry, &mut doc, None, EVENT_ON_START)
        .unwrap_err();
    assert!(matches!(err, BehaviorError::FlowDepthExceeded(_)));
}

#[test]
fn test_missing_input_reported() {
    let mut doc = two_node_document();
    let registry = NodeRegistry::with_builtins();
    let start = create_node(&mut doc, &registry, EVENT_ON_START).unwrap();
    let translate = create_node(&mut doc, &registry, "node/translate").unwrap();
    connect_flow(&mut doc, &registry, start, "out", translate).unwrap();
    set_parameter(&mut doc, &registry, translate, "target", translation_path(0)).unwrap();
    // "value" left unassigned.

    let mut runtime = GraphRuntime::new(&doc);
    let err = runtime
        .fire_event(&registry, &mut doc, None, EVENT_ON_START)
        .unwrap_err();
    assert!(matches!(err, BehaviorError::MissingInput { .. }));
}

//! Full pipeline: GLB bytes in, scripted scene running across contexts.

use lumen::asset::glb;
use lumen::behavior::{
    connect_flow, create_node, set_parameter, NodeRegistry, EVENT_ON_START,
};
use lumen::scene::{snapshot, Component, EntityId, MeshRef, SceneStore};
use lumen::{Engine, EngineOptions, SurfaceHandle};
use lumen_asset::{ParamValue, PathProperty, PathRef, Value};

fn build_glb(json: &serde_json::Value, bin: Option<&[u8]>) -> Vec<u8> {
    let json_bytes = serde_json::to_vec(json).expect("serialize");
    let mut out = Vec::new();
    out.extend_from_slice(&glb::GLB_MAGIC);
    out.extend_from_slice(&glb::GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(&glb::CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json_bytes);
    if let Some(bin) = bin {
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(&glb::CHUNK_BIN.to_le_bytes());
        out.extend_from_slice(bin);
    }
    let total = out.len() as u32;
    out[8..12].copy_from_slice(&total.to_le_bytes());
    out
}

fn scene_with_meshes() -> serde_json::Value {
    serde_json::json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0, 1, 2] }],
        "nodes": [
            { "name": "a", "mesh": 0 },
            { "name": "b", "mesh": 0, "translation": [2.0, 0.0, 0.0] },
            { "name": "c" },
        ],
        "meshes": [{
            "primitives": [{ "attributes": { "POSITION": 0 } }],
        }],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3" },
        ],
        "bufferViews": [{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }],
        "buffers": [{ "byteLength": 36 }],
    })
}

fn new_engine() -> Engine {
    Engine::new(
        SurfaceHandle::default(),
        EngineOptions::default(),
        NodeRegistry::with_builtins(),
    )
    .expect("spawn")
}

#[tokio::test]
async fn test_glb_to_running_scene() {
    let mut json = scene_with_meshes();
    json["extensions"] = serde_json::json!({
        "EXT_behavior_graph": {
            "behaviorNodes": [
                { "type": "lifecycle/on_start", "name": "start", "flow": { "out": 1 } },
                {
                    "type": "node/translate",
                    "name": "nudge",
                    "parameters": {
                        "target": { "path": "/nodes/2/translation" },
                        "value": { "value": { "x": 0.0, "y": 9.0, "z": 0.0 } },
                    },
                },
            ],
            "variables": [],
        },
    });
    let bytes = build_glb(&json, Some(&[0u8; 36]));

    let engine = new_engine();
    engine.wait_for_ready().await.expect("ready");

    let info = engine.load(bytes).await.expect("load");
    assert_eq!(info.node_count, 3);
    assert_eq!(info.entity_count, 3);

    engine
        .with_scene(|doc, store| {
            assert_eq!(doc.nodes[2].translation, [0.0, 9.0, 0.0]);
            assert_eq!(
                store.transform(EntityId(2)).expect("entity").translation,
                [0.0, 9.0, 0.0]
            );
            // Both mesh entities share geometry.
            let drawable: Vec<EntityId> = store.entities_with(MeshRef::mask()).collect();
            assert_eq!(drawable.len(), 2);
        })
        .expect("scene access");

    engine.destroy();
}

#[tokio::test]
async fn test_editing_graph_through_facade() {
    let bytes = build_glb(&scene_with_meshes(), Some(&[0u8; 36]));
    let engine = new_engine();
    engine.wait_for_ready().await.expect("ready");
    engine.load(bytes).await.expect("load");

    // Wire a fresh on_start -> translate chain at runtime, then fire it.
    let registry = NodeRegistry::with_builtins();
    engine
        .with_scene(|doc, _| {
            let start = create_node(doc, &registry, EVENT_ON_START).expect("create");
            let translate = create_node(doc, &registry, "node/translate").expect("create");
            connect_flow(doc, &registry, start, "out", translate).expect("flow");
            set_parameter(
                doc,
                &registry,
                translate,
                "target",
                ParamValue::Path(PathRef {
                    node: 0,
                    property: PathProperty::Translation,
                }),
            )
            .expect("target");
            set_parameter(
                doc,
                &registry,
                translate,
                "value",
                ParamValue::Constant(Value::Vec3([1.0, 1.0, 1.0])),
            )
            .expect("value");
        })
        .expect("edit");

    let fired = engine.fire_event(EVENT_ON_START).expect("fire");
    assert_eq!(fired, 1);
    engine
        .with_scene(|doc, _| assert_eq!(doc.nodes[0].translation, [1.0, 1.0, 1.0]))
        .expect("verify");

    engine.destroy();
}

#[tokio::test]
async fn test_shared_mesh_decodes_once() {
    // Three nodes referencing mesh 0: three entities, one geometry decode.
    let mut json = scene_with_meshes();
    json["nodes"][2]["mesh"] = serde_json::json!(0);
    let bytes = build_glb(&json, Some(&[0u8; 36]));

    let engine = new_engine();
    engine.wait_for_ready().await.expect("ready");
    let info = engine.load(bytes).await.expect("load");

    assert_eq!(info.entity_count, 3);
    assert_eq!(info.decode_count, 1);
    engine
        .with_scene(|_, store| {
            let drawable: Vec<EntityId> = store.entities_with(MeshRef::mask()).collect();
            assert_eq!(drawable.len(), 3);
        })
        .expect("scene access");

    engine.destroy();
}

#[test]
fn test_snapshot_is_the_transfer_format() {
    // The same bytes the loader hands to the render context decode into
    // an equivalent store, without touching the document again.
    let doc = lumen::parse(&build_glb(&scene_with_meshes(), Some(&[0u8; 36]))).expect("parse");
    let store = SceneStore::build(&doc).expect("build");
    let restored = snapshot::decode(&snapshot::encode(&store)).expect("decode");
    assert_eq!(restored.len(), store.len());
    for index in 0..store.len() {
        let entity = EntityId(index as u32);
        assert_eq!(restored.mask(entity).ok(), store.mask(entity).ok());
        assert_eq!(restored.transform(entity).ok(), store.transform(entity).ok());
    }
}

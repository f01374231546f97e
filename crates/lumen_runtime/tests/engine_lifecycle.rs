//! Engine facade lifecycle: readiness, load, scene access, destroy.

use lumen_asset::glb;
use lumen_behavior::NodeRegistry;
use lumen_runtime::{
    ContextKind, Engine, EngineError, EngineOptions, Message, SurfaceHandle,
    TransformControlsMode,
};
use lumen_scene::EntityId;

fn build_glb(json: &serde_json::Value) -> Vec<u8> {
    let json_bytes = serde_json::to_vec(json).expect("serialize");
    let mut out = Vec::new();
    out.extend_from_slice(&glb::GLB_MAGIC);
    out.extend_from_slice(&glb::GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(&glb::CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json_bytes);
    let total = out.len() as u32;
    out[8..12].copy_from_slice(&total.to_le_bytes());
    out
}

fn scripted_scene() -> Vec<u8> {
    build_glb(&serde_json::json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0, 1] }],
        "nodes": [
            { "name": "cube", "translation": [0.0, 0.0, 0.0] },
            { "name": "lamp", "translation": [4.0, 0.0, 0.0] },
        ],
        "extensions": {
            "EXT_behavior_graph": {
                "behaviorNodes": [
                    { "type": "lifecycle/on_start", "name": "start", "flow": { "out": 1 } },
                    {
                        "type": "node/translate",
                        "name": "move",
                        "parameters": {
                            "target": { "path": "/nodes/0/translation" },
                            "value": { "value": { "x": 1.0, "y": 2.0, "z": 3.0 } },
                        },
                    },
                ],
                "variables": [],
            },
        },
    }))
}

fn new_engine() -> Engine {
    Engine::new(
        SurfaceHandle::default(),
        EngineOptions::default(),
        NodeRegistry::with_builtins(),
    )
    .expect("spawn engine")
}

#[tokio::test]
async fn test_ready_then_load_fires_on_start() {
    let engine = new_engine();
    engine.wait_for_ready().await.expect("ready");

    let info = engine.load(scripted_scene()).await.expect("load");
    assert_eq!(info.node_count, 2);
    assert_eq!(info.entity_count, 2);

    // on_start already ran: the cube moved.
    let translation = engine
        .with_scene(|doc, store| {
            assert_eq!(
                store.transform(EntityId(0)).expect("entity").translation,
                doc.nodes[0].translation
            );
            doc.nodes[0].translation
        })
        .expect("scene access");
    assert_eq!(translation, [1.0, 2.0, 3.0]);

    let reader = engine.transform_reader();
    assert_eq!(reader.len(), 2);
    assert!(reader.read(0).is_some());

    engine.destroy();
}

#[tokio::test]
async fn test_commands_before_ready_rejected() {
    let engine = new_engine();
    // No wait_for_ready: the handshake has not been observed, so commands
    // fail instead of queueing.
    assert_eq!(
        engine.load(scripted_scene()).await.unwrap_err(),
        EngineError::ContextNotReady
    );
    assert_eq!(
        engine
            .send(ContextKind::Render, Message::CreateOrbitControls)
            .await
            .unwrap_err(),
        EngineError::ContextNotReady
    );

    engine.wait_for_ready().await.expect("ready");
    engine.load(scripted_scene()).await.expect("load after ready");
    engine.destroy();
}

#[tokio::test]
async fn test_concurrent_ready_waiters_all_resolve() {
    let engine = new_engine();
    let (first, second) = tokio::join!(engine.wait_for_ready(), engine.wait_for_ready());
    first.expect("first waiter");
    second.expect("second waiter");
    // And again after the handshake completed.
    engine.wait_for_ready().await.expect("late waiter");
    engine.destroy();
}

#[tokio::test]
async fn test_load_rejects_malformed_asset() {
    let engine = new_engine();
    engine.wait_for_ready().await.expect("ready");

    let err = engine.load(b"not a scene".to_vec()).await.unwrap_err();
    assert!(matches!(err, EngineError::Asset(_)));
    // No scene was installed.
    assert_eq!(
        engine.with_scene(|_, _| ()).unwrap_err(),
        EngineError::ContextNotReady
    );

    engine.destroy();
}

#[tokio::test]
async fn test_scene_access_before_load_not_ready() {
    let engine = new_engine();
    engine.wait_for_ready().await.expect("ready");
    assert_eq!(
        engine.fire_event("lifecycle/on_start").unwrap_err(),
        EngineError::ContextNotReady
    );
    engine.destroy();
}

#[tokio::test]
async fn test_player_lifecycle_allocates_transform_cells() {
    let engine = new_engine();
    engine.wait_for_ready().await.expect("ready");

    let reply = engine
        .send(ContextKind::Render, Message::AddPlayer { id: 7 })
        .await
        .expect("add player");
    assert_eq!(reply, Message::Ack);
    engine
        .send(
            ContextKind::Render,
            Message::SetPlayerBuffers {
                id: 7,
                translation: [1.2345, 0.0, -3.0],
                rotation: [0.0, 0.0, 0.0, 1.0],
            },
        )
        .await
        .expect("seed buffers");

    let (translation, rotation) = engine.transform_reader().read(7).expect("player cell");
    assert!((translation[0] - 1.2345).abs() < 1e-3);
    assert!((translation[2] + 3.0).abs() < 1e-3);
    assert!((rotation[3] - 1.0).abs() < 1e-3);

    // The facade can hand a writer handle for the same cell.
    let handle = engine.transform_handle(7).expect("handle");
    handle.set_position(2.0, 0.0, 0.0);
    assert!((engine.transform_reader().read(7).unwrap().0[0] - 2.0).abs() < 1e-3);

    engine
        .send(ContextKind::Render, Message::RemovePlayer { id: 7 })
        .await
        .expect("remove player");
    assert!(engine.transform_reader().read(7).is_none());
    assert!(engine.transform_handle(7).is_none());

    engine.destroy();
}

#[tokio::test]
async fn test_control_subjects_acknowledged() {
    let engine = new_engine();
    engine.wait_for_ready().await.expect("ready");

    let render_messages = [
        Message::SetSkybox {
            path: "sky/dusk.hdr".into(),
        },
        Message::SetAnimationsPath {
            path: "anim/base".into(),
        },
        Message::SetDefaultAvatar {
            path: "avatars/default.vrm".into(),
        },
        Message::CreateOrbitControls,
        Message::DestroyOrbitControls,
        Message::CreateTransformControls,
        Message::SetTransformControlsMode {
            mode: TransformControlsMode::Rotate,
        },
        Message::AttachTransformControls { node: 0 },
        Message::DetachTransformControls,
        Message::ClickIntersection { x: 0.5, y: 0.5 },
    ];
    for message in render_messages {
        let subject = message.subject();
        let reply = engine
            .send(ContextKind::Render, message)
            .await
            .expect(subject);
        assert_eq!(reply, Message::Ack, "{subject}");
    }

    let reply = engine
        .send(
            ContextKind::Simulation,
            Message::SetPlayerGrounded {
                id: 1,
                grounded: true,
            },
        )
        .await
        .expect("grounded");
    assert_eq!(reply, Message::Ack);

    engine.destroy();
}

#[tokio::test]
async fn test_destroy_is_idempotent_and_final() {
    let engine = new_engine();
    engine.wait_for_ready().await.expect("ready");
    engine.destroy();
    engine.destroy();

    assert_eq!(
        engine.with_scene(|_, _| ()).unwrap_err(),
        EngineError::EngineDestroyed
    );
    assert_eq!(
        engine.load(scripted_scene()).await.unwrap_err(),
        EngineError::EngineDestroyed
    );
}

#[tokio::test]
async fn test_context_loss_blocks_operations() {
    let engine = new_engine();
    engine.wait_for_ready().await.expect("ready");
    engine.load(scripted_scene()).await.expect("load");

    engine.report_context_loss(lumen_runtime::ContextKind::Render);
    assert_eq!(
        engine.with_scene(|_, _| ()).unwrap_err(),
        EngineError::ContextLost
    );
    engine.destroy();
}

#[tokio::test]
async fn test_reload_replaces_scene() {
    let engine = new_engine();
    engine.wait_for_ready().await.expect("ready");
    engine.load(scripted_scene()).await.expect("first load");

    let single = build_glb(&serde_json::json!({
        "asset": { "version": "2.0" },
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": "only" }],
    }));
    let info = engine.load(single).await.expect("second load");
    assert_eq!(info.entity_count, 1);
    assert_eq!(engine.transform_reader().len(), 1);

    engine.destroy();
}

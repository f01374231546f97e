//! # Context Threads
//!
//! The three worker contexts of the engine: loader, render, and
//! simulation. Each is a plain thread with a bounded crossbeam inbox,
//! announces itself with a `ready` message, and loops until `shutdown`
//! or a closed channel.
//!
//! Replies travel back through the router as [`RouterEvent`]s; only the
//! loader uses the rich [`RouterEvent::Loaded`] variant, because a parsed
//! document is an in-process payload, not a wire message.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{select, Receiver, Sender};
use parking_lot::Mutex;

use lumen_asset::{Document, ResourceCache};
use lumen_behavior::{GraphRuntime, NodeRegistry, EVENT_ON_TICK};
use lumen_scene::{snapshot, Component, MeshRef, SceneStore};

use crate::error::EngineError;
use crate::message::{ContextKind, Envelope, Message, TransformControlsMode};
use crate::options::{ControlsMode, SurfaceHandle};
use crate::shared_transform::SharedTransformChannel;

/// Events flowing back to the router thread.
pub(crate) enum RouterEvent {
    /// A protocol envelope from a context.
    Inbound(Envelope),
    /// A completed load with its in-process payload.
    Loaded {
        /// Correlation id of the originating `load_asset` request.
        id: u32,
        /// The parsed scene or the failure.
        result: Result<LoadedScene, EngineError>,
    },
}

/// A facade-side slot waiting for a correlated completion.
pub(crate) enum Pending {
    /// Awaiting a protocol reply.
    Reply(tokio::sync::oneshot::Sender<Message>),
    /// Awaiting a load completion with its in-process payload.
    Load(tokio::sync::oneshot::Sender<Result<LoadedScene, EngineError>>),
}

/// The loader's output: everything the facade needs to install a scene.
pub(crate) struct LoadedScene {
    pub document: Document,
    pub store: SceneStore,
    pub snapshot: Vec<u8>,
    pub decode_count: u32,
}

/// The live scene owned by the facade and ticked by the simulation.
pub(crate) struct SceneSession {
    pub document: Document,
    pub store: SceneStore,
    pub runtime: GraphRuntime,
}

pub(crate) type SharedSession = Arc<Mutex<Option<SceneSession>>>;

/// Startup state for the render context, from the construction surface.
pub(crate) struct RenderInit {
    pub surface: SurfaceHandle,
    pub skybox_path: Option<String>,
    pub controls: Option<ControlsMode>,
}

fn announce_ready(router: &Sender<RouterEvent>, context: ContextKind) {
    let _ = router.send(RouterEvent::Inbound(Envelope::notify(Message::Ready {
        context,
    })));
    tracing::debug!(%context, "context ready");
}

/// Acknowledges a correlated state-setting request; fire-and-forget
/// envelopes need no reply. Returns false when the router is gone.
fn acknowledge(router: &Sender<RouterEvent>, id: Option<u32>) -> bool {
    match id {
        Some(id) => router
            .send(RouterEvent::Inbound(Envelope::request(id, Message::Ack)))
            .is_ok(),
        None => true,
    }
}

// ============================================================================
// Loader
// ============================================================================

/// Parses assets and builds scene stores off the caller's thread.
///
/// The loader owns the decode caches: geometry payloads are resolved
/// through a per-document [`ResourceCache`], so a mesh shared by N nodes
/// is decoded once no matter how many entities reference it.
pub(crate) fn run_loader(inbox: Receiver<Envelope>, router: Sender<RouterEvent>) {
    announce_ready(&router, ContextKind::Loader);

    while let Ok(envelope) = inbox.recv() {
        match envelope.message {
            Message::Shutdown => break,
            Message::LoadAsset { bytes } => {
                let Some(id) = envelope.id else {
                    tracing::warn!("load_asset without correlation id, dropping");
                    continue;
                };
                let result = load_scene(&bytes);
                if router.send(RouterEvent::Loaded { id, result }).is_err() {
                    break;
                }
            }
            other => {
                tracing::warn!(subject = other.subject(), "loader ignoring message");
            }
        }
    }
    tracing::debug!("loader context stopped");
}

fn load_scene(bytes: &[u8]) -> Result<LoadedScene, EngineError> {
    let document = lumen_asset::parse(bytes)?;
    let store = SceneStore::build(&document)?;

    // A fresh cache per document: memoized within one load, discarded
    // wholesale with the document on the next.
    let cache = ResourceCache::default();
    for node in &document.nodes {
        let Some(mesh_index) = node.mesh else { continue };
        let mesh = document.mesh(mesh_index)?;
        for primitive in &mesh.primitives {
            for &accessor in primitive.attributes.values() {
                cache.accessor_bytes(&document, accessor)?;
            }
            if let Some(indices) = primitive.indices {
                cache.accessor_bytes(&document, indices)?;
            }
        }
    }
    let decode_count = cache.decode_count() as u32;

    let snapshot = snapshot::encode(&store);
    Ok(LoadedScene {
        document,
        store,
        snapshot,
        decode_count,
    })
}

// ============================================================================
// Render
// ============================================================================

struct TransformControls {
    mode: TransformControlsMode,
    attached: Option<u32>,
}

/// Everything the render context exclusively owns. Released wholesale
/// when the context shuts down.
struct RenderState {
    surface: SurfaceHandle,
    scene: Option<SceneStore>,
    geometry: HashMap<u32, u64>,
    uploads: u64,
    skybox: Option<String>,
    animations_path: Option<String>,
    default_avatar: Option<String>,
    orbit_controls: bool,
    transform_controls: Option<TransformControls>,
    players: HashSet<u32>,
}

/// Installs scene snapshots, tracks geometry uploads, and owns the
/// presentation-side state: skybox, controls, and player transform cells.
///
/// Geometry is keyed by mesh index and uploaded once per scene no matter
/// how many entities share it. The upload counter exists so tests can
/// observe the dedup.
pub(crate) fn run_render(
    inbox: Receiver<Envelope>,
    router: Sender<RouterEvent>,
    transforms: Arc<SharedTransformChannel>,
    init: RenderInit,
) {
    let mut state = RenderState {
        surface: init.surface,
        scene: None,
        geometry: HashMap::new(),
        uploads: 0,
        skybox: init.skybox_path,
        animations_path: None,
        default_avatar: None,
        orbit_controls: matches!(init.controls, Some(ControlsMode::Orbit)),
        transform_controls: None,
        players: HashSet::new(),
    };
    tracing::debug!(surface = state.surface.0, "render context starting");
    announce_ready(&router, ContextKind::Render);

    while let Ok(envelope) = inbox.recv() {
        match envelope.message {
            Message::Shutdown => break,
            Message::InstallScene { snapshot: bytes } => {
                let Some(id) = envelope.id else {
                    tracing::warn!("install_scene without correlation id, dropping");
                    continue;
                };
                let reply = install_scene(&mut state, &bytes);
                if router
                    .send(RouterEvent::Inbound(Envelope::request(id, reply)))
                    .is_err()
                {
                    break;
                }
            }
            Message::AddPlayer { id } => {
                state.players.insert(id);
                let _ = transforms.register_entity(id);
                tracing::debug!(player = id, "player registered");
                if !acknowledge(&router, envelope.id) {
                    break;
                }
            }
            Message::RemovePlayer { id } => {
                state.players.remove(&id);
                transforms.deregister_entity(id);
                tracing::debug!(player = id, "player deregistered");
                if !acknowledge(&router, envelope.id) {
                    break;
                }
            }
            Message::SetPlayerBuffers {
                id,
                translation,
                rotation,
            } => {
                match transforms.handle(id) {
                    Some(handle) => {
                        handle.set_position(translation[0], translation[1], translation[2]);
                        handle.set_rotation(rotation[0], rotation[1], rotation[2], rotation[3]);
                    }
                    None => {
                        tracing::warn!(player = id, "set_player_buffers for unregistered player");
                    }
                }
                if !acknowledge(&router, envelope.id) {
                    break;
                }
            }
            Message::SetSkybox { path } => {
                state.skybox = Some(path);
                if !acknowledge(&router, envelope.id) {
                    break;
                }
            }
            Message::SetAnimationsPath { path } => {
                state.animations_path = Some(path);
                if !acknowledge(&router, envelope.id) {
                    break;
                }
            }
            Message::SetDefaultAvatar { path } => {
                state.default_avatar = Some(path);
                if !acknowledge(&router, envelope.id) {
                    break;
                }
            }
            Message::ClickIntersection { x, y } => {
                // Picking proper needs the host's camera; the click lands on
                // the gizmo when one is attached.
                let target = state
                    .transform_controls
                    .as_ref()
                    .and_then(|controls| controls.attached);
                tracing::debug!(x, y, ?target, "click intersection");
                if !acknowledge(&router, envelope.id) {
                    break;
                }
            }
            Message::CreateOrbitControls => {
                state.orbit_controls = true;
                if !acknowledge(&router, envelope.id) {
                    break;
                }
            }
            Message::DestroyOrbitControls => {
                state.orbit_controls = false;
                if !acknowledge(&router, envelope.id) {
                    break;
                }
            }
            Message::CreateTransformControls => {
                state.transform_controls = Some(TransformControls {
                    mode: TransformControlsMode::Translate,
                    attached: None,
                });
                if !acknowledge(&router, envelope.id) {
                    break;
                }
            }
            Message::SetTransformControlsMode { mode } => {
                match state.transform_controls.as_mut() {
                    Some(controls) => controls.mode = mode,
                    None => tracing::warn!("set_transform_controls_mode without controls"),
                }
                if !acknowledge(&router, envelope.id) {
                    break;
                }
            }
            Message::AttachTransformControls { node } => {
                match state.transform_controls.as_mut() {
                    Some(controls) => controls.attached = Some(node),
                    None => tracing::warn!(node, "attach_transform_controls without controls"),
                }
                if !acknowledge(&router, envelope.id) {
                    break;
                }
            }
            Message::DetachTransformControls => {
                if let Some(controls) = state.transform_controls.as_mut() {
                    controls.attached = None;
                }
                if !acknowledge(&router, envelope.id) {
                    break;
                }
            }
            other => {
                tracing::warn!(subject = other.subject(), "render ignoring message");
            }
        }
    }

    // Release everything the render context owns, player cells included.
    for id in state.players.drain() {
        transforms.deregister_entity(id);
    }
    tracing::debug!(
        surface = state.surface.0,
        entities = state.scene.as_ref().map_or(0, SceneStore::len),
        uploads = state.uploads,
        skybox = state.skybox.as_deref().unwrap_or(""),
        animations = state.animations_path.as_deref().unwrap_or(""),
        avatar = state.default_avatar.as_deref().unwrap_or(""),
        orbit = state.orbit_controls,
        gizmo = ?state.transform_controls.as_ref().map(|controls| controls.mode),
        "render context stopped, resources released"
    );
    drop(state);
}

fn install_scene(state: &mut RenderState, bytes: &[u8]) -> Message {
    match snapshot::decode(bytes) {
        Ok(store) => {
            state.geometry.clear();
            for entity in store.entities_with(MeshRef::mask()) {
                if let Some(mesh_ref) = store.mesh_ref(entity) {
                    state.geometry.entry(mesh_ref.mesh).or_insert_with(|| {
                        state.uploads += 1;
                        state.uploads
                    });
                }
            }
            let entity_count = store.len() as u32;
            tracing::debug!(
                entities = entity_count,
                meshes = state.geometry.len(),
                total_uploads = state.uploads,
                "scene installed"
            );
            state.scene = Some(store);
            if let Some(controls) = state.transform_controls.as_mut() {
                controls.attached = None;
            }
            Message::SceneInstalled { entity_count }
        }
        Err(err) => Message::LoadFailed {
            reason: err.to_string(),
        },
    }
}

// ============================================================================
// Simulation
// ============================================================================

/// Ticks the live session at a fixed rate and publishes transforms into
/// the shared channel. Also keeps the per-player grounded flags reported
/// by the physics collaborator.
pub(crate) fn run_simulation(
    inbox: Receiver<Envelope>,
    router: Sender<RouterEvent>,
    session: SharedSession,
    registry: Arc<NodeRegistry>,
    transforms: Arc<SharedTransformChannel>,
    interval: Duration,
) {
    announce_ready(&router, ContextKind::Simulation);
    let ticker = crossbeam_channel::tick(interval);
    let mut grounded: HashMap<u32, bool> = HashMap::new();

    loop {
        select! {
            recv(inbox) -> envelope => {
                let Ok(envelope) = envelope else { break };
                match envelope.message {
                    Message::Shutdown => break,
                    Message::InstallScene { .. } => {
                        let Some(id) = envelope.id else {
                            tracing::warn!("install_scene without correlation id, dropping");
                            continue;
                        };
                        // The session itself is shared with the facade; the
                        // install message tells the ticker to publish the
                        // initial transforms and confirm.
                        let entity_count = publish_transforms(&session, &transforms);
                        let reply = Envelope::request(
                            id,
                            Message::SceneInstalled {
                                entity_count: entity_count as u32,
                            },
                        );
                        if router.send(RouterEvent::Inbound(reply)).is_err() {
                            break;
                        }
                    }
                    Message::SetPlayerGrounded { id, grounded: is_grounded } => {
                        grounded.insert(id, is_grounded);
                        tracing::debug!(player = id, grounded = is_grounded, "grounded state");
                        if !acknowledge(&router, envelope.id) {
                            break;
                        }
                    }
                    other => {
                        tracing::warn!(subject = other.subject(), "simulation ignoring message");
                    }
                }
            }
            recv(ticker) -> _ => {
                tick(&session, &registry, &transforms);
            }
        }
    }
    tracing::debug!("simulation context stopped");
}

fn tick(
    session: &SharedSession,
    registry: &NodeRegistry,
    transforms: &SharedTransformChannel,
) {
    let mut guard = session.lock();
    let Some(session) = guard.as_mut() else {
        return;
    };
    if let Err(err) = session.runtime.fire_event(
        registry,
        &mut session.document,
        Some(&mut session.store),
        EVENT_ON_TICK,
    ) {
        tracing::error!(%err, "tick event failed");
    }
    for (index, transform) in session.store.transforms().iter().enumerate() {
        transforms.publish(index as u32, transform.translation, transform.rotation);
    }
}

fn publish_transforms(session: &SharedSession, transforms: &SharedTransformChannel) -> usize {
    let guard = session.lock();
    let Some(session) = guard.as_ref() else {
        return 0;
    };
    for (index, transform) in session.store.transforms().iter().enumerate() {
        transforms.publish(index as u32, transform.translation, transform.rotation);
    }
    session.store.len()
}

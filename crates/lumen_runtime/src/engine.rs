//! # Engine Facade
//!
//! The host-facing entry point. `Engine::new` spawns the loader, render,
//! and simulation contexts plus a router thread; the facade then talks to
//! them exclusively through correlated envelopes.
//!
//! ## Ownership
//!
//! The facade owns the live scene (document, store, graph runtime) behind
//! one mutex. The simulation context shares that mutex for its fixed-rate
//! tick; the render context only ever sees snapshot bytes. Scene reads
//! and behavior edits therefore never race the interpreter.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};

use lumen_asset::Document;
use lumen_behavior::{GraphRuntime, NodeRegistry, EVENT_ON_START};
use lumen_scene::SceneStore;

use crate::context::{
    run_loader, run_render, run_simulation, LoadedScene, Pending, RenderInit, RouterEvent,
    SceneSession, SharedSession,
};
use crate::error::{EngineError, EngineResult};
use crate::message::{ContextKind, Envelope, Message};
use crate::options::{EngineOptions, SurfaceHandle};
use crate::shared_transform::{SharedTransformChannel, TransformHandle, TransformReader};

/// What a successful load reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneInfo {
    /// Number of scene nodes in the parsed document.
    pub node_count: u32,
    /// Number of entities the render context installed.
    pub entity_count: u32,
    /// Geometry payload decodes the loader performed; meshes shared by
    /// several nodes decode once.
    pub decode_count: u32,
}

/// The engine facade.
pub struct Engine {
    registry: Arc<NodeRegistry>,
    session: SharedSession,
    transforms: Arc<SharedTransformChannel>,
    pending: Arc<Mutex<HashMap<u32, Pending>>>,
    next_id: AtomicU32,
    loader_tx: Sender<Envelope>,
    render_tx: Sender<Envelope>,
    simulation_tx: Sender<Envelope>,
    ready_rx: watch::Receiver<bool>,
    ready_timeout: Duration,
    lost: Arc<AtomicBool>,
    destroyed: AtomicBool,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl Engine {
    /// Spawns the context threads and the router.
    ///
    /// The engine accepts commands only after every context has finished
    /// its readiness handshake; until [`wait_for_ready`](Self::wait_for_ready)
    /// resolves, `load`, `send`, and `fire_event` fail with
    /// [`EngineError::ContextNotReady`].
    pub fn new(
        surface: SurfaceHandle,
        options: EngineOptions,
        registry: NodeRegistry,
    ) -> EngineResult<Self> {
        let registry = Arc::new(registry);
        let session: SharedSession = Arc::new(Mutex::new(None));
        let transforms = Arc::new(SharedTransformChannel::new());
        let pending: Arc<Mutex<HashMap<u32, Pending>>> = Arc::new(Mutex::new(HashMap::new()));
        let lost = Arc::new(AtomicBool::new(false));

        let (router_tx, router_rx) = crossbeam_channel::bounded(options.channel_capacity);
        let (loader_tx, loader_rx) = crossbeam_channel::bounded(options.channel_capacity);
        let (render_tx, render_rx) = crossbeam_channel::bounded(options.channel_capacity);
        let (simulation_tx, simulation_rx) =
            crossbeam_channel::bounded(options.channel_capacity);
        let (ready_tx, ready_rx) = watch::channel(false);

        let render_init = RenderInit {
            surface,
            skybox_path: options.skybox_path.clone(),
            controls: options.controls,
        };

        let mut threads = Vec::with_capacity(4);
        threads.push(spawn_named("lumen-router", {
            let pending = Arc::clone(&pending);
            let lost = Arc::clone(&lost);
            move || run_router(router_rx, &pending, &ready_tx, &lost)
        })?);
        threads.push(spawn_named("lumen-loader", {
            let router = router_tx.clone();
            move || run_loader(loader_rx, router)
        })?);
        threads.push(spawn_named("lumen-render", {
            let router = router_tx.clone();
            let transforms = Arc::clone(&transforms);
            move || run_render(render_rx, router, transforms, render_init)
        })?);
        threads.push(spawn_named("lumen-simulation", {
            let router = router_tx;
            let session = Arc::clone(&session);
            let registry = Arc::clone(&registry);
            let transforms = Arc::clone(&transforms);
            let interval = options.tick_interval();
            move || run_simulation(simulation_rx, router, session, registry, transforms, interval)
        })?);

        Ok(Self {
            registry,
            session,
            transforms,
            pending,
            next_id: AtomicU32::new(1),
            loader_tx,
            render_tx,
            simulation_tx,
            ready_rx,
            ready_timeout: options.ready_timeout,
            lost,
            destroyed: AtomicBool::new(false),
            threads: Mutex::new(threads),
        })
    }

    /// Resolves once all three contexts have reported ready, or fails
    /// with [`EngineError::ContextNotReady`] after the configured timeout.
    ///
    /// Any number of callers may wait concurrently; all of them resolve
    /// on the same handshake, and calls after readiness return
    /// immediately.
    pub async fn wait_for_ready(&self) -> EngineResult<()> {
        let mut ready_rx = self.ready_rx.clone();
        tokio::time::timeout(self.ready_timeout, ready_rx.wait_for(|ready| *ready))
            .await
            .map_err(|_| EngineError::ContextNotReady)?
            .map_err(|_| EngineError::ContextNotReady)?;
        Ok(())
    }

    /// Parses an asset, installs the scene everywhere, and fires the
    /// `lifecycle/on_start` event.
    ///
    /// Loading replaces any previously installed scene wholesale.
    pub async fn load(&self, bytes: Vec<u8>) -> EngineResult<SceneInfo> {
        self.check_ready()?;

        let id = self.next_id();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, Pending::Load(tx));
        if self
            .loader_tx
            .send(Envelope::request(id, Message::LoadAsset { bytes }))
            .is_err()
        {
            self.pending.lock().remove(&id);
            return Err(EngineError::EngineDestroyed);
        }
        let loaded = rx.await.map_err(|_| EngineError::EngineDestroyed)??;

        let LoadedScene {
            document,
            store,
            snapshot,
            decode_count,
        } = loaded;
        let node_count = document.nodes.len() as u32;
        let runtime = GraphRuntime::new(&document);

        self.transforms.clear();
        for index in 0..store.len() {
            let _ = self.transforms.register_entity(index as u32);
        }
        *self.session.lock() = Some(SceneSession {
            document,
            store,
            runtime,
        });

        let entity_count = self
            .install_into(
                &self.render_tx,
                Message::InstallScene {
                    snapshot: snapshot.clone(),
                },
            )
            .await?;
        self.install_into(&self.simulation_tx, Message::InstallScene { snapshot })
            .await?;

        self.fire_event(EVENT_ON_START)?;

        tracing::info!(node_count, entity_count, decode_count, "scene loaded");
        Ok(SceneInfo {
            node_count,
            entity_count,
            decode_count,
        })
    }

    /// Runs a closure against the live document and scene store.
    ///
    /// This is the only mutable access to the scene; the simulation tick
    /// takes the same lock, so edits never interleave with the interpreter.
    pub fn with_scene<R>(
        &self,
        f: impl FnOnce(&mut Document, &mut SceneStore) -> R,
    ) -> EngineResult<R> {
        self.check_alive()?;
        let mut guard = self.session.lock();
        let session = guard.as_mut().ok_or(EngineError::ContextNotReady)?;
        Ok(f(&mut session.document, &mut session.store))
    }

    /// Fires a behavior event against the live scene. Returns the number
    /// of event nodes that ran.
    pub fn fire_event(&self, event_type: &str) -> EngineResult<usize> {
        self.check_ready()?;
        let mut guard = self.session.lock();
        let session = guard.as_mut().ok_or(EngineError::ContextNotReady)?;
        Ok(session.runtime.fire_event(
            &self.registry,
            &mut session.document,
            Some(&mut session.store),
            event_type,
        )?)
    }

    /// Sends a correlated request to a context and awaits its reply.
    pub async fn send(&self, target: ContextKind, message: Message) -> EngineResult<Message> {
        self.check_ready()?;
        let channel = match target {
            ContextKind::Loader => &self.loader_tx,
            ContextKind::Render => &self.render_tx,
            ContextKind::Simulation => &self.simulation_tx,
        };
        self.request(channel, message).await
    }

    /// A lock-free reader over the currently registered transforms.
    #[must_use]
    pub fn transform_reader(&self) -> TransformReader {
        self.transforms.reader()
    }

    /// A write handle on one registered entity's shared transform.
    #[must_use]
    pub fn transform_handle(&self, id: u32) -> Option<TransformHandle> {
        self.transforms.handle(id)
    }

    /// The node registry this engine executes with.
    #[must_use]
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Marks the engine lost after the host's surface went away. All
    /// subsequent operations fail with [`EngineError::ContextLost`] until
    /// the host rebuilds the engine.
    pub fn report_context_loss(&self, context: ContextKind) {
        tracing::warn!(%context, "context lost");
        self.lost.store(true, Ordering::Release);
    }

    /// Shuts down all contexts and rejects pending requests. Idempotent;
    /// every call after the first is a no-op.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        for channel in [&self.loader_tx, &self.render_tx, &self.simulation_tx] {
            let _ = channel.send(Envelope::notify(Message::Shutdown));
        }
        for handle in self.threads.lock().drain(..) {
            let _ = handle.join();
        }
        for (_, pending) in self.pending.lock().drain() {
            if let Pending::Load(tx) = pending {
                let _ = tx.send(Err(EngineError::EngineDestroyed));
            }
        }
        *self.session.lock() = None;
        self.transforms.clear();
        tracing::info!("engine destroyed");
    }

    fn check_alive(&self) -> EngineResult<()> {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(EngineError::EngineDestroyed);
        }
        if self.lost.load(Ordering::Acquire) {
            return Err(EngineError::ContextLost);
        }
        Ok(())
    }

    /// Commands require the readiness handshake to have completed; issuing
    /// one earlier is a caller error, never queued.
    fn check_ready(&self) -> EngineResult<()> {
        self.check_alive()?;
        if !*self.ready_rx.borrow() {
            return Err(EngineError::ContextNotReady);
        }
        Ok(())
    }

    fn next_id(&self) -> u32 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn request(&self, channel: &Sender<Envelope>, message: Message) -> EngineResult<Message> {
        let id = self.next_id();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, Pending::Reply(tx));
        if channel.send(Envelope::request(id, message)).is_err() {
            self.pending.lock().remove(&id);
            return Err(EngineError::EngineDestroyed);
        }
        rx.await.map_err(|_| EngineError::EngineDestroyed)
    }

    async fn install_into(
        &self,
        channel: &Sender<Envelope>,
        message: Message,
    ) -> EngineResult<u32> {
        match self.request(channel, message).await? {
            Message::SceneInstalled { entity_count } => Ok(entity_count),
            Message::LoadFailed { reason } => Err(EngineError::LoadFailed(reason)),
            other => Err(EngineError::UnexpectedReply(other.subject().to_owned())),
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn spawn_named(
    name: &str,
    body: impl FnOnce() + Send + 'static,
) -> EngineResult<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(name.to_owned())
        .spawn(body)
        .map_err(|err| EngineError::Spawn(err.to_string()))
}

/// Completes pending requests and tracks readiness and context loss.
fn run_router(
    events: Receiver<RouterEvent>,
    pending: &Mutex<HashMap<u32, Pending>>,
    ready_tx: &watch::Sender<bool>,
    lost: &AtomicBool,
) {
    let mut reported: HashSet<ContextKind> = HashSet::new();

    while let Ok(event) = events.recv() {
        match event {
            RouterEvent::Loaded { id, result } => match pending.lock().remove(&id) {
                Some(Pending::Load(tx)) => {
                    let _ = tx.send(result);
                }
                Some(Pending::Reply(_)) | None => {
                    tracing::warn!(id, "load result with unknown correlation id, ignoring");
                }
            },
            RouterEvent::Inbound(envelope) => match envelope.message {
                Message::Ready { context } => {
                    reported.insert(context);
                    if reported.len() == 3 {
                        let _ = ready_tx.send(true);
                    }
                }
                Message::ContextLost { context } => {
                    tracing::warn!(%context, "context reported itself lost");
                    lost.store(true, Ordering::Release);
                }
                message => match envelope.id {
                    Some(id) => match pending.lock().remove(&id) {
                        Some(Pending::Reply(tx)) => {
                            let _ = tx.send(message);
                        }
                        Some(Pending::Load(tx)) => {
                            let _ = tx.send(Err(EngineError::UnexpectedReply(
                                message.subject().to_owned(),
                            )));
                        }
                        None => {
                            tracing::warn!(
                                id,
                                subject = message.subject(),
                                "reply with unknown correlation id, ignoring"
                            );
                        }
                    },
                    None => {
                        tracing::warn!(
                            subject = message.subject(),
                            "uncorrelated message, ignoring"
                        );
                    }
                },
            },
        }
    }
    tracing::debug!("router stopped");
}

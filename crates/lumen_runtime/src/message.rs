//! # Control Protocol
//!
//! Typed messages between the engine facade and its contexts. Every
//! message is an [`Envelope`]: an optional correlation id plus a tagged
//! [`Message`]. Requests carry an id; the reply echoes it, and the router
//! completes the matching pending slot. Fire-and-forget messages (ready,
//! shutdown, context_lost) travel without an id.
//!
//! State-setting requests (skybox, controls, players) are acknowledged
//! with [`Message::Ack`] so callers can await completion.
//!
//! The serde shape is `{"subject": "...", "data": {...}}`, snake_case, so
//! envelopes can be logged or shipped over a debug socket verbatim.

use serde::{Deserialize, Serialize};

/// Which context a message names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    /// Asset parsing and scene building.
    Loader,
    /// Snapshot installation, geometry uploads, controls, players.
    Render,
    /// Fixed-rate ticking and shared transform publication.
    Simulation,
}

impl std::fmt::Display for ContextKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Loader => "loader",
            Self::Render => "render",
            Self::Simulation => "simulation",
        };
        f.write_str(name)
    }
}

/// Manipulation mode of the render context's transform gizmo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformControlsMode {
    /// Drag to move the attached node.
    Translate,
    /// Drag to rotate the attached node.
    Rotate,
    /// Drag to scale the attached node.
    Scale,
}

/// The message catalog of the control protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "subject", content = "data", rename_all = "snake_case")]
pub enum Message {
    /// A context finished starting up and is accepting messages.
    Ready {
        /// The reporting context.
        context: ContextKind,
    },

    /// Generic acknowledgement of a state-setting request.
    Ack,

    /// Ask the loader to parse an asset and build a scene.
    LoadAsset {
        /// Raw GLB or glTF JSON bytes.
        bytes: Vec<u8>,
    },

    /// Loader reply: the scene is built and snapshotted.
    AssetLoaded {
        /// Encoded scene snapshot.
        snapshot: Vec<u8>,
        /// Number of scene nodes in the document.
        node_count: u32,
    },

    /// A load or install failed.
    LoadFailed {
        /// Human-readable failure reason.
        reason: String,
    },

    /// Install a scene snapshot into a context.
    InstallScene {
        /// Encoded scene snapshot.
        snapshot: Vec<u8>,
    },

    /// Reply to [`Message::InstallScene`].
    SceneInstalled {
        /// Number of entities in the installed store.
        entity_count: u32,
    },

    /// Register a player with the render context, allocating its shared
    /// transform cell.
    AddPlayer {
        /// Host-chosen player id.
        id: u32,
    },

    /// Deregister a player, releasing its shared transform cell.
    RemovePlayer {
        /// Id passed to the matching `add_player`.
        id: u32,
    },

    /// Tell the simulation whether a player is standing on ground.
    SetPlayerGrounded {
        /// The player.
        id: u32,
        /// Grounded state from the physics collaborator.
        grounded: bool,
    },

    /// Seed a registered player's transform buffers.
    SetPlayerBuffers {
        /// The player.
        id: u32,
        /// Initial translation.
        translation: [f32; 3],
        /// Initial rotation quaternion.
        rotation: [f32; 4],
    },

    /// Point the render context at the animation library.
    SetAnimationsPath {
        /// Host path or URL.
        path: String,
    },

    /// Avatar used for players that bring none of their own.
    SetDefaultAvatar {
        /// Host path or URL.
        path: String,
    },

    /// Replace the skybox.
    SetSkybox {
        /// Host path or URL.
        path: String,
    },

    /// A pointer click at normalized surface coordinates; the render
    /// context resolves it against the installed scene.
    ClickIntersection {
        /// Horizontal coordinate in `[0, 1]`.
        x: f32,
        /// Vertical coordinate in `[0, 1]`.
        y: f32,
    },

    /// Create orbit camera controls.
    CreateOrbitControls,

    /// Tear down orbit camera controls.
    DestroyOrbitControls,

    /// Create the transform gizmo (detached, translate mode).
    CreateTransformControls,

    /// Switch the transform gizmo's manipulation mode.
    SetTransformControlsMode {
        /// The new mode.
        mode: TransformControlsMode,
    },

    /// Attach the transform gizmo to a scene node.
    AttachTransformControls {
        /// Node index in the installed scene.
        node: u32,
    },

    /// Detach the transform gizmo.
    DetachTransformControls,

    /// A context lost its backing resources and cannot continue.
    ContextLost {
        /// The reporting context.
        context: ContextKind,
    },

    /// Stop the receiving context's loop.
    Shutdown,
}

impl Message {
    /// The wire subject of this message.
    #[must_use]
    pub const fn subject(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "ready",
            Self::Ack => "ack",
            Self::LoadAsset { .. } => "load_asset",
            Self::AssetLoaded { .. } => "asset_loaded",
            Self::LoadFailed { .. } => "load_failed",
            Self::InstallScene { .. } => "install_scene",
            Self::SceneInstalled { .. } => "scene_installed",
            Self::AddPlayer { .. } => "add_player",
            Self::RemovePlayer { .. } => "remove_player",
            Self::SetPlayerGrounded { .. } => "set_player_grounded",
            Self::SetPlayerBuffers { .. } => "set_player_buffers",
            Self::SetAnimationsPath { .. } => "set_animations_path",
            Self::SetDefaultAvatar { .. } => "set_default_avatar",
            Self::SetSkybox { .. } => "set_skybox",
            Self::ClickIntersection { .. } => "click_intersection",
            Self::CreateOrbitControls => "create_orbit_controls",
            Self::DestroyOrbitControls => "destroy_orbit_controls",
            Self::CreateTransformControls => "create_transform_controls",
            Self::SetTransformControlsMode { .. } => "set_transform_controls_mode",
            Self::AttachTransformControls { .. } => "attach_transform_controls",
            Self::DetachTransformControls => "detach_transform_controls",
            Self::ContextLost { .. } => "context_lost",
            Self::Shutdown => "shutdown",
        }
    }
}

/// A message plus its optional correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Correlation id; requests set it, replies echo it.
    pub id: Option<u32>,
    /// The payload.
    pub message: Message,
}

impl Envelope {
    /// An envelope with a correlation id.
    #[must_use]
    pub const fn request(id: u32, message: Message) -> Self {
        Self {
            id: Some(id),
            message,
        }
    }

    /// A fire-and-forget envelope.
    #[must_use]
    pub const fn notify(message: Message) -> Self {
        Self { id: None, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_matches_serde_tag() {
        let messages = [
            Message::Ready {
                context: ContextKind::Render,
            },
            Message::Ack,
            Message::LoadAsset { bytes: vec![1, 2] },
            Message::AssetLoaded {
                snapshot: vec![],
                node_count: 3,
            },
            Message::LoadFailed {
                reason: "bad magic".into(),
            },
            Message::InstallScene { snapshot: vec![0] },
            Message::SceneInstalled { entity_count: 7 },
            Message::AddPlayer { id: 4 },
            Message::RemovePlayer { id: 4 },
            Message::SetPlayerGrounded {
                id: 4,
                grounded: true,
            },
            Message::SetPlayerBuffers {
                id: 4,
                translation: [0.0; 3],
                rotation: [0.0, 0.0, 0.0, 1.0],
            },
            Message::SetAnimationsPath {
                path: "anim".into(),
            },
            Message::SetDefaultAvatar {
                path: "avatar.vrm".into(),
            },
            Message::SetSkybox { path: "sky".into() },
            Message::ClickIntersection { x: 0.5, y: 0.5 },
            Message::CreateOrbitControls,
            Message::DestroyOrbitControls,
            Message::CreateTransformControls,
            Message::SetTransformControlsMode {
                mode: TransformControlsMode::Scale,
            },
            Message::AttachTransformControls { node: 2 },
            Message::DetachTransformControls,
            Message::ContextLost {
                context: ContextKind::Simulation,
            },
            Message::Shutdown,
        ];
        for message in messages {
            let json = serde_json::to_value(&message).unwrap();
            assert_eq!(json["subject"], message.subject(), "{message:?}");
        }
    }

    #[test]
    fn test_envelope_round_trip() {
        let envelope = Envelope::request(
            42,
            Message::SetTransformControlsMode {
                mode: TransformControlsMode::Rotate,
            },
        );
        let json = serde_json::to_string(&envelope).unwrap();
        let back: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, envelope);
    }
}

//! # Engine Options
//!
//! The construction surface the embedding host fills in: a drawable
//! surface handle plus the options struct.

use std::time::Duration;

/// Opaque handle to the host's drawable surface.
///
/// The engine never interprets the value; the render context hands it to
/// the host's presentation layer untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u64);

/// Which camera controls the render context creates at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlsMode {
    /// Orbit-around-a-target controls, for viewers and editors.
    Orbit,
    /// First/third-person player controls.
    Player,
}

/// Tunables for the engine's contexts and channels.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Simulation tick rate in hertz.
    pub tick_hz: u32,
    /// Bounded capacity of each context inbox.
    pub channel_capacity: usize,
    /// How long [`Engine::wait_for_ready`](crate::Engine::wait_for_ready)
    /// waits for all contexts to report in.
    pub ready_timeout: Duration,
    /// Skybox installed at startup, if any.
    pub skybox_path: Option<String>,
    /// Camera controls created at startup; `None` leaves the camera to
    /// later `create_*_controls` messages.
    pub controls: Option<ControlsMode>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            tick_hz: 60,
            channel_capacity: 64,
            ready_timeout: Duration::from_secs(5),
            skybox_path: None,
            controls: None,
        }
    }
}

impl EngineOptions {
    /// The interval between simulation ticks.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_hz.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_have_no_startup_state() {
        let options = EngineOptions::default();
        assert!(options.skybox_path.is_none());
        assert!(options.controls.is_none());
        assert_eq!(options.tick_interval(), Duration::from_secs_f64(1.0 / 60.0));
    }

    #[test]
    fn test_zero_tick_rate_clamped() {
        let options = EngineOptions {
            tick_hz: 0,
            ..EngineOptions::default()
        };
        assert_eq!(options.tick_interval(), Duration::from_secs(1));
    }
}

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::resources::{LoadMode, ResourceId, DEFAULT_RELOAD_INTERVAL};

/// Render scale factors selectable at run time, largest first.
pub const RENDER_SCALES: [f32; 5] = [1.0, 0.9, 0.8, 0.75, 0.5];

/// Window size used when the primary monitor cannot be queried.
pub const FALLBACK_WINDOW_SIZE: (u32, u32) = (800, 600);

/// Full-screen fragment effects the demo can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Effect {
    #[default]
    FbmWarp,
    PlasmaBeat,
}

impl Effect {
    pub const COUNT: usize = 2;
    pub const ALL: [Effect; Self::COUNT] = [Effect::FbmWarp, Effect::PlasmaBeat];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Fragment shader that drives this effect.
    pub const fn resource(self) -> ResourceId {
        match self {
            Effect::FbmWarp => ResourceId::ShaderFragmentFbmWarp,
            Effect::PlasmaBeat => ResourceId::ShaderFragmentPlasmaBeat,
        }
    }

    /// Whether a change to `id` invalidates this effect's pipeline.
    pub fn affected_by(self, id: ResourceId) -> bool {
        id == ResourceId::ShaderVertexFullscreen || id == self.resource()
    }

    /// Identifier used in configuration files and on the command line.
    pub const fn as_str(self) -> &'static str {
        match self {
            Effect::FbmWarp => "fbm_warp",
            Effect::PlasmaBeat => "plasma_beat",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Effect::FbmWarp => "FBM Warp",
            Effect::PlasmaBeat => "Plasma Beat",
        }
    }

    /// The effect after this one, wrapping around.
    pub fn next(self) -> Effect {
        Self::ALL[(self.index() + 1) % Self::COUNT]
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown effect `{0}` (expected fbm_warp or plasma_beat)")]
pub struct UnknownEffect(pub String);

impl FromStr for Effect {
    type Err = UnknownEffect;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        Effect::ALL
            .into_iter()
            .find(|effect| effect.as_str() == normalized)
            .ok_or_else(|| UnknownEffect(value.to_string()))
    }
}

/// Index of `scale` in [`RENDER_SCALES`], if it is one of the supported factors.
pub fn render_scale_index(scale: f32) -> Option<usize> {
    RENDER_SCALES
        .iter()
        .position(|candidate| (candidate - scale).abs() < 1e-4)
}

/// Everything the renderer needs to open its window.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Directory holding `src/` and `res/`.
    pub base_path: PathBuf,
    pub mode: LoadMode,
    pub live_reload: bool,
    pub reload_interval: Duration,
    pub vsync: bool,
    /// Index into [`RENDER_SCALES`].
    pub render_scale_index: usize,
    pub effect: Effect,
    /// Explicit inner size; `None` picks half of the primary monitor.
    pub window_size: Option<(u32, u32)>,
}

impl RendererConfig {
    pub fn render_scale(&self) -> f32 {
        RENDER_SCALES[self.render_scale_index.min(RENDER_SCALES.len() - 1)]
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        let mode = LoadMode::default();
        Self {
            base_path: PathBuf::from("assets"),
            mode,
            live_reload: mode == LoadMode::Source,
            reload_interval: DEFAULT_RELOAD_INTERVAL,
            vsync: true,
            render_scale_index: 0,
            effect: Effect::default(),
            window_size: None,
        }
    }
}

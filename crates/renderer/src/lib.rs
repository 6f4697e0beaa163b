//! Renderer crate for shadercross, a live-reloading shader demo.
//!
//! The crate loads a fixed catalog of shaders through a resource registry,
//! keeps them fresh with a rate-limited live-reload poller, and draws the
//! selected full-screen effect into a scaled offscreen target that is
//! composited onto a `winit` window through `wgpu`. The overall flow is:
//!
//! ```text
//!   shadercross CLI
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ WindowState ──▶ winit event loop ──▶ GpuState::frame()
//!                                                             │
//!              LiveReload::check ◀── Resources ◀──────────────┤
//!              EffectPipelines::rebuild_affected ◀────────────┤
//!              effect pass ─▶ RenderTarget ─▶ compositor ─▶ present
//! ```
//!
//! The registry and poller in [`resources`] are independent of wgpu: they talk
//! to the GPU through the [`resources::ShaderDevice`] trait, to the filesystem
//! through [`resources::ResourceStore`], and to the shader compiler through
//! [`compile::CrossCompiler`], so they can be driven headless.

pub mod compile;
mod gpu;
pub mod resources;
pub mod runtime;
pub mod types;
mod window;

use anyhow::Result;

pub use compile::{compile_catalog, default_compiler, BoxedCrossCompiler, CrossCompiler};
pub use types::{render_scale_index, Effect, RendererConfig, UnknownEffect, RENDER_SCALES};

/// Entry point that owns the configuration and runs the demo window.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Opens the window and blocks until it is closed.
    ///
    /// Fails if the GPU cannot be initialised or the initial resource load
    /// fails; live-reload failures after startup are only logged.
    pub fn run(self) -> Result<()> {
        tracing::info!(
            base_path = %self.config.base_path.display(),
            mode = %self.config.mode,
            live_reload = self.config.live_reload,
            effect = %self.config.effect,
            "starting renderer"
        );
        window::run_window(self.config)
    }
}

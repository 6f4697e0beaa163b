use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Fullscreen, Window, WindowBuilder};

use tracing::{error, info, warn};

use crate::gpu::GpuState;
use crate::runtime::{FrameReport, FrameStats};
use crate::types::{RendererConfig, FALLBACK_WINDOW_SIZE};

const WINDOW_TITLE: &str = "shadercross";
const STATS_INTERVAL: Duration = Duration::from_secs(1);

/// Keyboard shortcuts understood by the demo window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    ToggleVsync,
    ToggleFullscreen,
    CycleEffect,
    /// Move towards the smaller render scales.
    ScaleDown,
    ScaleUp,
    Reload,
    Quit,
}

impl Control {
    pub(crate) fn from_key(key: &Key) -> Option<Self> {
        match key {
            Key::Named(NamedKey::Escape) => Some(Control::Quit),
            Key::Named(NamedKey::Tab) => Some(Control::CycleEffect),
            Key::Character(text) => match text.to_ascii_lowercase().as_str() {
                "v" => Some(Control::ToggleVsync),
                "f" => Some(Control::ToggleFullscreen),
                "r" => Some(Control::Reload),
                "[" => Some(Control::ScaleDown),
                "]" => Some(Control::ScaleUp),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Window plus the GPU state rendering into it.
pub(crate) struct WindowState {
    window: Arc<Window>,
    gpu: GpuState,
    stats: FrameStats,
    last_report: Option<FrameReport>,
    minimised: bool,
}

impl WindowState {
    pub(crate) fn new(window: Arc<Window>, config: &RendererConfig) -> Result<Self> {
        let size = window.inner_size();
        let gpu = GpuState::new(window.as_ref(), size, config)?;
        info!(adapter = %gpu.adapter_summary(), "renderer ready");

        let mut state = Self {
            window,
            gpu,
            stats: FrameStats::new(Instant::now(), STATS_INTERVAL),
            last_report: None,
            minimised: size.width == 0 || size.height == 0,
        };
        state.refresh_title();
        Ok(state)
    }

    pub(crate) fn window(&self) -> &Window {
        self.window.as_ref()
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.minimised = new_size.width == 0 || new_size.height == 0;
        if !self.minimised {
            self.gpu.resize(new_size);
        }
    }

    /// Applies a shortcut; returns `false` when the window should close.
    fn apply(&mut self, control: Control) -> bool {
        match control {
            Control::ToggleVsync => self.gpu.set_vsync(!self.gpu.vsync()),
            Control::ToggleFullscreen => {
                let fullscreen = match self.window.fullscreen() {
                    Some(_) => None,
                    None => Some(Fullscreen::Borderless(None)),
                };
                self.window.set_fullscreen(fullscreen);
            }
            Control::CycleEffect => self.gpu.cycle_effect(),
            Control::ScaleDown => self.gpu.step_render_scale(1),
            Control::ScaleUp => self.gpu.step_render_scale(-1),
            Control::Reload => self.gpu.request_reload(),
            Control::Quit => return false,
        }
        self.refresh_title();
        true
    }

    fn refresh_title(&self) {
        self.window.set_title(&format_title(
            self.gpu.effect().label(),
            self.gpu.render_scale(),
            self.gpu.vsync(),
            self.last_report,
        ));
    }

    /// Draws a frame; returns `false` when the loop must exit.
    fn redraw(&mut self) -> bool {
        if self.minimised {
            return true;
        }
        let now = Instant::now();
        match self.gpu.frame(now) {
            Ok(()) => {
                if let Some(report) = self.stats.record(now) {
                    tracing::debug!(frame_ms = report.frame_ms, fps = report.fps, "frame stats");
                    self.last_report = Some(report);
                    self.refresh_title();
                }
                true
            }
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.gpu.reconfigure_surface();
                true
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("surface out of memory; exiting");
                false
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("surface timeout; retrying next frame");
                true
            }
            Err(other) => {
                warn!(error = ?other, "surface error; retrying next frame");
                true
            }
        }
    }

    fn shutdown(&mut self) {
        self.gpu.shutdown();
    }
}

pub(crate) fn format_title(
    effect: &str,
    scale: f32,
    vsync: bool,
    report: Option<FrameReport>,
) -> String {
    let vsync = if vsync { "on" } else { "off" };
    match report {
        Some(report) => format!(
            "{WINDOW_TITLE} | {effect} | scale {scale:.2} | vsync {vsync} | {:.2} ms/frame ({:.1} FPS)",
            report.frame_ms, report.fps
        ),
        None => format!("{WINDOW_TITLE} | {effect} | scale {scale:.2} | vsync {vsync}"),
    }
}

/// Half of the first monitor the platform reports, or a fixed fallback.
fn default_window_size(target: &EventLoopWindowTarget<()>) -> PhysicalSize<u32> {
    target
        .primary_monitor()
        .or_else(|| target.available_monitors().next())
        .map(|monitor| monitor.size())
        .filter(|size| size.width > 0 && size.height > 0)
        .map(|size| PhysicalSize::new(size.width / 2, size.height / 2))
        .unwrap_or_else(|| PhysicalSize::new(FALLBACK_WINDOW_SIZE.0, FALLBACK_WINDOW_SIZE.1))
}

/// Opens the demo window and runs the frame loop until it is closed.
pub(crate) fn run_window(config: RendererConfig) -> Result<()> {
    let event_loop =
        EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let window_size = match config.window_size {
        Some((width, height)) => PhysicalSize::new(width.max(1), height.max(1)),
        None => default_window_size(&event_loop),
    };
    let window = WindowBuilder::new()
        .with_title(WINDOW_TITLE)
        .with_inner_size(window_size)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let mut state = WindowState::new(window, &config)
        .map_err(|err| err.context("failed to initialise renderer"))?;
    state.window().request_redraw();

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
                    WindowEvent::KeyboardInput { event, .. } => {
                        if event.state != ElementState::Pressed || event.repeat {
                            return;
                        }
                        if let Some(control) = Control::from_key(&event.logical_key) {
                            if !state.apply(control) {
                                elwt.exit();
                            }
                        }
                    }
                    WindowEvent::Resized(new_size) => state.resize(new_size),
                    WindowEvent::RedrawRequested => {
                        if !state.redraw() {
                            elwt.exit();
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                state.window().request_redraw();
                elwt.set_control_flow(ControlFlow::Poll);
            }
            Event::LoopExiting => state.shutdown(),
            _ => {}
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))
}

use std::time::Instant;

use anyhow::{Context, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, info, warn};
use winit::dpi::PhysicalSize;

use crate::resources::{LiveReload, ResourceId, Resources};
use crate::runtime::FrameClock;
use crate::types::{Effect, RendererConfig, RENDER_SCALES};

use super::context::GpuContext;
use super::device::WgpuShaderDevice;
use super::pipeline::EffectPipelines;
use super::target::{scaled_size, Compositor, RenderTarget};
use super::uniforms::EffectUniforms;

/// Everything needed to draw one frame of the demo.
pub(crate) struct GpuState {
    context: GpuContext,
    shader_device: WgpuShaderDevice,
    resources: Resources<WgpuShaderDevice>,
    live_reload: Option<LiveReload>,
    pipelines: EffectPipelines,
    target: RenderTarget,
    compositor: Compositor,
    clock: FrameClock,
    effect: Effect,
    scale_index: usize,
    shut_down: bool,
}

impl GpuState {
    pub(crate) fn new<T>(
        window: &T,
        size: PhysicalSize<u32>,
        config: &RendererConfig,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(window, size, config.vsync)?;
        let shader_device = WgpuShaderDevice::new(context.device.clone());

        let mut resources = Resources::new(config.base_path.clone(), config.mode);
        resources.load_all(&shader_device).with_context(|| {
            format!(
                "failed to load {} resources from {}",
                config.mode,
                config.base_path.display()
            )
        })?;

        let live_reload = config
            .live_reload
            .then(|| LiveReload::new(Instant::now()).with_interval(config.reload_interval));
        if let Some(poller) = &live_reload {
            info!(interval = ?poller.interval(), "live reload enabled");
        }

        let pipelines = EffectPipelines::new(&context.device, &resources)?;
        let scale_index = config.render_scale_index.min(RENDER_SCALES.len() - 1);
        let target = RenderTarget::new(
            &context.device,
            scaled_size(context.size, RENDER_SCALES[scale_index]),
        );
        let compositor = Compositor::new(&context.device, context.surface_format(), &target);

        Ok(Self {
            context,
            shader_device,
            resources,
            live_reload,
            pipelines,
            target,
            compositor,
            clock: FrameClock::new(Instant::now()),
            effect: config.effect,
            scale_index,
            shut_down: false,
        })
    }

    pub(crate) fn adapter_summary(&self) -> String {
        format!("{} ({:?})", self.context.adapter_name, self.context.backend)
    }

    pub(crate) fn effect(&self) -> Effect {
        self.effect
    }

    pub(crate) fn set_effect(&mut self, effect: Effect) {
        if effect != self.effect {
            info!(effect = effect.label(), "switched effect");
            self.effect = effect;
        }
    }

    pub(crate) fn cycle_effect(&mut self) {
        self.set_effect(self.effect.next());
    }

    pub(crate) fn render_scale(&self) -> f32 {
        RENDER_SCALES[self.scale_index]
    }

    /// Moves `step` entries through [`RENDER_SCALES`], clamping at either end.
    pub(crate) fn step_render_scale(&mut self, step: isize) {
        let last = RENDER_SCALES.len() - 1;
        let index = self.scale_index.saturating_add_signed(step).min(last);
        if index != self.scale_index {
            self.scale_index = index;
            self.recreate_target();
            info!(scale = self.render_scale(), "render scale changed");
        }
    }

    pub(crate) fn vsync(&self) -> bool {
        self.context.vsync()
    }

    pub(crate) fn set_vsync(&mut self, enabled: bool) {
        self.context.set_vsync(enabled);
        info!(vsync = self.context.vsync(), "vsync toggled");
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 || new_size == self.context.size {
            return;
        }
        self.context.resize(new_size);
        self.recreate_target();
    }

    pub(crate) fn reconfigure_surface(&mut self) {
        self.context.reconfigure();
    }

    /// Makes the next frame re-stat resources regardless of the interval.
    pub(crate) fn request_reload(&mut self) {
        match self.live_reload.as_mut() {
            Some(poller) => {
                poller.force_next();
                debug!("forced live reload check requested");
            }
            None => info!("live reload is disabled; ignoring reload request"),
        }
    }

    fn recreate_target(&mut self) {
        let size = scaled_size(self.context.size, self.render_scale());
        self.target = RenderTarget::new(&self.context.device, size);
        self.compositor.retarget(&self.context.device, &self.target);
        debug!(width = size.width, height = size.height, "recreated render target");
    }

    /// Picks up changed resources, then draws and presents one frame.
    pub(crate) fn frame(&mut self, now: Instant) -> Result<(), wgpu::SurfaceError> {
        if let Some(poller) = self.live_reload.as_mut() {
            let changed = poller.check(&mut self.resources, &self.shader_device, now);
            self.apply_changes(&changed);
        }

        let time = self.clock.tick(now);
        let frame = self.context.surface.get_current_texture()?;
        let output = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        self.draw_effect(&mut encoder, time as f32);
        self.compositor.draw(&mut encoder, &output);

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn apply_changes(&mut self, changed: &[ResourceId]) {
        if changed.is_empty() {
            return;
        }
        self.pipelines
            .rebuild_affected(&self.context.device, &self.resources, changed);
    }

    fn draw_effect(&self, encoder: &mut wgpu::CommandEncoder, time: f32) {
        let effect = self.pipelines.get(self.effect);
        if let Some(uniforms) = &effect.uniforms {
            let size = self.target.size;
            uniforms.write(
                &self.context.queue,
                &EffectUniforms::new(time, size.width, size.height),
            );
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("effect pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.target.view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&effect.pipeline);
        if let Some(uniforms) = &effect.uniforms {
            pass.set_bind_group(0, &uniforms.bind_group, &[]);
        }
        pass.draw(0..3, 0..1);
    }

    /// Waits for in-flight work, then releases every loaded resource.
    pub(crate) fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        if let Err(err) = self.context.device.poll(wgpu::PollType::Wait) {
            warn!(error = %err, "failed to wait for the device before releasing resources");
        }
        self.resources.destroy_all(&self.shader_device);
        self.shut_down = true;
        debug!("gpu resources released");
    }
}

impl Drop for GpuState {
    fn drop(&mut self) {
        self.shutdown();
    }
}

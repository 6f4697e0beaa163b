//! wgpu side of the demo.
//!
//! - `context` owns the instance, surface and device, and reconfigures the
//!   swapchain on resize or vsync changes.
//! - `device` adapts `wgpu::Device` to the resource registry's
//!   [`ShaderDevice`](crate::resources::ShaderDevice) seam.
//! - `pipeline` builds one render pipeline per effect and rebuilds it when a
//!   shader it captured is live reloaded.
//! - `target` holds the scaled offscreen render target and the compositor
//!   that stretches it over the swapchain.
//! - `state` glues everything together into the per-frame `GpuState` API used
//!   by `window`.

mod context;
mod device;
mod pipeline;
mod state;
mod target;
mod uniforms;

pub(crate) use state::GpuState;

//! Resource registry and live reload.
//!
//! - `catalog` is the static list of resources the renderer depends on.
//! - `registry` loads the catalog into GPU objects through a [`ShaderDevice`],
//!   reading bytes through a [`ResourceStore`] and cross-compiling sources
//!   when running from `src/`.
//! - `live_reload` re-stats loaded files at a bounded rate and swaps changed
//!   resources in place, reporting which identifiers changed so the caller can
//!   rebuild pipelines that captured the old handles.

mod catalog;
mod device;
mod error;
mod live_reload;
mod registry;
mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{
    BindingCounts, ResourceId, ResourceInfo, ResourceKind, ShaderInfo, ShaderStage, CATALOG,
};
pub use device::{select_shader_format, ShaderDevice, ShaderFormat, ShaderFormats, ShaderRequest};
pub use error::ResourceError;
pub use live_reload::{LiveReload, DEFAULT_RELOAD_INTERVAL};
pub use registry::{
    resource_path, LoadMode, LoadedResource, Resource, Resources, PRECOMPILED_DIR, SOURCE_DIR,
    SOURCE_EXTENSION,
};
pub use store::{BoxedResourceStore, DiskStore, ResourceStore};

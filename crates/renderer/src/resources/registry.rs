use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, error, info};

use crate::compile::{default_compiler, BoxedCrossCompiler, CompileRequest};

use super::catalog::{ResourceId, ResourceInfo, ResourceKind, ShaderInfo};
use super::device::{select_shader_format, ShaderDevice, ShaderFormat, ShaderRequest};
use super::error::ResourceError;
use super::store::{BoxedResourceStore, DiskStore, ResourceStore};

/// Directory under the base path holding human-authored shader sources.
pub const SOURCE_DIR: &str = "src";
/// Directory under the base path holding precompiled shader binaries.
pub const PRECOMPILED_DIR: &str = "res";
/// Extension of shader sources fed to the cross compiler.
pub const SOURCE_EXTENSION: &str = "glsl";

/// Where shader bytes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Read `src/<name>.glsl` and cross-compile it into the selected format.
    Source,
    /// Read `res/<name>.<ext>` and hand the bytes to the device untouched.
    Precompiled,
}

impl Default for LoadMode {
    /// Development builds compile from source so edits can be hot reloaded.
    fn default() -> Self {
        if cfg!(debug_assertions) {
            LoadMode::Source
        } else {
            LoadMode::Precompiled
        }
    }
}

impl std::fmt::Display for LoadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadMode::Source => f.write_str("source"),
            LoadMode::Precompiled => f.write_str("precompiled"),
        }
    }
}

/// Resolves the backing file of a resource for the given mode and format.
pub fn resource_path(
    base_path: &Path,
    mode: LoadMode,
    id: ResourceId,
    format: ShaderFormat,
) -> PathBuf {
    let info = id.info();
    match mode {
        LoadMode::Source => base_path
            .join(SOURCE_DIR)
            .join(format!("{}.{SOURCE_EXTENSION}", info.file_name)),
        LoadMode::Precompiled => base_path
            .join(PRECOMPILED_DIR)
            .join(format!("{}.{}", info.file_name, format.extension())),
    }
}

/// Kind-specific GPU object owned by a [`Resource`].
#[derive(Debug)]
pub enum LoadedResource<S> {
    Shader(S),
}

/// A fully loaded, GPU-resident resource.
#[derive(Debug)]
pub struct Resource<S> {
    file_path: PathBuf,
    last_modified: SystemTime,
    loaded: LoadedResource<S>,
}

impl<S> Resource<S> {
    /// File the resource was last successfully loaded from.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Modification time observed when the resource was loaded.
    pub fn last_modified(&self) -> SystemTime {
        self.last_modified
    }

    pub fn as_shader(&self) -> Option<&S> {
        match &self.loaded {
            LoadedResource::Shader(shader) => Some(shader),
        }
    }

    fn release<D>(self, device: &D)
    where
        D: ShaderDevice<Shader = S>,
    {
        match self.loaded {
            LoadedResource::Shader(shader) => device.release_shader(shader),
        }
    }
}

/// Registry of every cataloged resource plus the context used to load them.
///
/// Slots are indexed by [`ResourceId`]. A slot is either empty (before
/// [`load_all`](Self::load_all) or after [`destroy_all`](Self::destroy_all))
/// or holds a complete resource; loads build a fresh value and only then
/// swap it in.
pub struct Resources<D: ShaderDevice> {
    items: [Option<Resource<D::Shader>>; ResourceId::COUNT],
    format: Option<ShaderFormat>,
    mode: LoadMode,
    base_path: PathBuf,
    store: BoxedResourceStore,
    compiler: Option<BoxedCrossCompiler>,
}

impl<D: ShaderDevice> Resources<D> {
    /// Creates an empty registry reading from disk, with the default compiler
    /// when loading from source.
    pub fn new(base_path: impl Into<PathBuf>, mode: LoadMode) -> Self {
        let compiler = match mode {
            LoadMode::Source => default_compiler(),
            LoadMode::Precompiled => None,
        };
        Self {
            items: std::array::from_fn(|_| None),
            format: None,
            mode,
            base_path: base_path.into(),
            store: Box::new(DiskStore),
            compiler,
        }
    }

    pub fn with_store(mut self, store: BoxedResourceStore) -> Self {
        self.store = store;
        self
    }

    pub fn with_compiler(mut self, compiler: Option<BoxedCrossCompiler>) -> Self {
        self.compiler = compiler;
        self
    }

    /// Shader format chosen by the last [`load_all`](Self::load_all).
    pub fn format(&self) -> Option<ShaderFormat> {
        self.format
    }

    /// File that backs `id` under the current mode and selected format.
    ///
    /// Before the first load no format is chosen yet; SPIR-V naming is assumed.
    pub fn path_for(&self, id: ResourceId) -> PathBuf {
        resource_path(
            &self.base_path,
            self.mode,
            id,
            self.format.unwrap_or(ShaderFormat::SpirV),
        )
    }

    pub(crate) fn store(&self) -> &dyn ResourceStore {
        self.store.as_ref()
    }

    /// Loads every cataloged resource.
    ///
    /// Stops at the first failure; resources loaded before it stay loaded and
    /// the caller is expected to abort start-up.
    pub fn load_all(&mut self, device: &D) -> Result<(), ResourceError> {
        let format = match select_shader_format(device.supported_shader_formats()) {
            Some(format) => format,
            None => {
                error!("GPU device does not support any of the provided shader formats");
                return Err(ResourceError::NoSupportedFormat);
            }
        };
        self.format = Some(format);
        debug!(%format, mode = %self.mode, base = %self.base_path.display(), "selected shader format");

        for id in ResourceId::ALL {
            let resource = self.load_one(id, device, format).map_err(|err| {
                error!(resource = %id, error = %err, "failed to load resource");
                err
            })?;
            info!(resource = %id, path = %resource.file_path.display(), "loaded resource");
            if let Some(previous) = self.items[id.index()].replace(resource) {
                previous.release(device);
            }
        }

        Ok(())
    }

    /// Returns a loaded resource.
    ///
    /// # Panics
    ///
    /// Panics when `id` has not been loaded yet; callers must only ask for
    /// resources after [`load_all`](Self::load_all) succeeded.
    pub fn get(&self, id: ResourceId) -> &Resource<D::Shader> {
        self.try_get(id)
            .unwrap_or_else(|| panic!("resource {id} requested before it was loaded"))
    }

    pub fn try_get(&self, id: ResourceId) -> Option<&Resource<D::Shader>> {
        self.items[id.index()].as_ref()
    }

    /// Shader handle of a loaded shader resource.
    pub fn shader(&self, id: ResourceId) -> &D::Shader {
        self.get(id)
            .as_shader()
            .unwrap_or_else(|| panic!("resource {id} is not a shader"))
    }

    /// Reloads a single resource into a new value and swaps it in on success.
    ///
    /// On failure the previously loaded resource stays in place untouched.
    pub fn reload(&mut self, id: ResourceId, device: &D) -> Result<(), ResourceError> {
        let format = self.format.ok_or(ResourceError::NotLoaded(id))?;
        let resource = self.load_one(id, device, format)?;
        if let Some(previous) = self.items[id.index()].replace(resource) {
            previous.release(device);
        }
        Ok(())
    }

    /// Releases every GPU object. Must run before the device is dropped.
    pub fn destroy_all(&mut self, device: &D) {
        for slot in &mut self.items {
            if let Some(resource) = slot.take() {
                resource.release(device);
            }
        }
        debug!("released all resources");
    }

    fn load_one(
        &mut self,
        id: ResourceId,
        device: &D,
        format: ShaderFormat,
    ) -> Result<Resource<D::Shader>, ResourceError> {
        let info: &ResourceInfo = id.info();
        let file_path = resource_path(&self.base_path, self.mode, id, format);

        // Stat before reading: an edit landing mid-load then shows up as a
        // newer timestamp on the next poll instead of being lost.
        let last_modified =
            self.store
                .modified(&file_path)
                .map_err(|source| ResourceError::Stat {
                    path: file_path.clone(),
                    source,
                })?;

        let loaded = match &info.kind {
            ResourceKind::Shader(shader) => {
                let code = self.shader_code(&file_path, info.file_name, shader, format)?;
                let handle = device
                    .create_shader(ShaderRequest {
                        label: id.as_str(),
                        code: &code,
                        format,
                        info: shader,
                    })
                    .map_err(|message| ResourceError::CreateShader {
                        resource: id,
                        message,
                    })?;
                LoadedResource::Shader(handle)
            }
        };

        Ok(Resource {
            file_path,
            last_modified,
            loaded,
        })
    }

    fn shader_code(
        &mut self,
        path: &Path,
        file_name: &str,
        shader: &ShaderInfo,
        format: ShaderFormat,
    ) -> Result<Vec<u8>, ResourceError> {
        let bytes = self.store.read(path).map_err(|source| ResourceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if bytes.is_empty() {
            return Err(ResourceError::Empty {
                path: path.to_path_buf(),
            });
        }

        match self.mode {
            LoadMode::Precompiled => Ok(bytes),
            LoadMode::Source => {
                let compiler =
                    self.compiler
                        .as_mut()
                        .ok_or_else(|| ResourceError::CompilerUnavailable {
                            path: path.to_path_buf(),
                        })?;
                let source = String::from_utf8(bytes).map_err(|_| ResourceError::InvalidSource {
                    path: path.to_path_buf(),
                })?;
                compiler
                    .compile(CompileRequest {
                        source: &source,
                        file_name,
                        stage: shader.stage,
                        format,
                    })
                    .map_err(|message| ResourceError::Compile {
                        path: path.to_path_buf(),
                        message,
                    })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::device::ShaderFormats;
    use crate::resources::testing::{FakeCompiler, FakeDevice, MemoryStore};

    fn registry(store: &MemoryStore, mode: LoadMode) -> Resources<FakeDevice> {
        Resources::new("assets", mode)
            .with_store(Box::new(store.clone()))
            .with_compiler(Some(Box::new(FakeCompiler::default())))
    }

    #[test]
    fn load_all_fails_without_a_supported_format() {
        let store = MemoryStore::with_catalog_sources(Path::new("assets"));
        let device = FakeDevice::new(ShaderFormats::EMPTY);
        let mut resources = registry(&store, LoadMode::Source);

        let err = resources.load_all(&device).unwrap_err();
        assert!(matches!(err, ResourceError::NoSupportedFormat));
        assert!(resources.format().is_none());
        assert!(ResourceId::ALL.iter().all(|id| resources.try_get(*id).is_none()));
    }

    #[test]
    fn load_all_selects_format_and_loads_every_entry() {
        let store = MemoryStore::with_catalog_sources(Path::new("assets"));
        let device = FakeDevice::spirv_only();
        let mut resources = registry(&store, LoadMode::Source);

        resources.load_all(&device).unwrap();
        assert_eq!(resources.format(), Some(ShaderFormat::SpirV));
        for id in ResourceId::ALL {
            let resource = resources.get(id);
            assert_eq!(
                resource.file_path(),
                resource_path(Path::new("assets"), LoadMode::Source, id, ShaderFormat::SpirV)
            );
            assert_eq!(resource.last_modified(), store.modified(resource.file_path()).unwrap());
        }
        assert_eq!(device.live_count(), ResourceId::COUNT);
        let created = device.created();
        assert!(created.iter().all(|shader| shader.format == ShaderFormat::SpirV));
        assert_eq!(created[0].stage, crate::resources::ShaderStage::Vertex);
        assert_eq!(created[1].stage, crate::resources::ShaderStage::Fragment);
        assert_eq!(
            *resources.shader(ResourceId::ShaderFragmentFbmWarp),
            created[1].handle
        );
        assert!(created[1].code.starts_with(b"spv:fragment:"));
    }

    #[test]
    fn precompiled_mode_reads_binaries_for_the_selected_format() {
        let base = Path::new("assets");
        let store = MemoryStore::default();
        for id in ResourceId::ALL {
            store.insert(
                resource_path(base, LoadMode::Precompiled, id, ShaderFormat::Msl),
                b"metal".to_vec(),
            );
        }
        let device = FakeDevice::new(
            ShaderFormats::EMPTY
                .with(ShaderFormat::Msl)
                .with(ShaderFormat::SpirV),
        );
        let mut resources = Resources::<FakeDevice>::new(base, LoadMode::Precompiled)
            .with_store(Box::new(store.clone()));
        assert_eq!(
            resources.path_for(ResourceId::ShaderVertexFullscreen),
            base.join("res").join("fullscreen.spv")
        );

        resources.load_all(&device).unwrap();
        assert_eq!(
            resources.path_for(ResourceId::ShaderVertexFullscreen),
            base.join("res").join("fullscreen.msl")
        );
        assert_eq!(resources.format(), Some(ShaderFormat::Msl));
        let path = resources
            .get(ResourceId::ShaderFragmentFbmWarp)
            .file_path()
            .to_path_buf();
        assert_eq!(path, base.join("res").join("fbm_warp.msl"));
        assert!(device.created().iter().all(|shader| shader.code == b"metal"));
    }

    #[test]
    fn load_all_aborts_on_first_missing_file() {
        let base = Path::new("assets");
        let store = MemoryStore::with_catalog_sources(base);
        store.remove(&resource_path(
            base,
            LoadMode::Source,
            ResourceId::ShaderFragmentFbmWarp,
            ShaderFormat::SpirV,
        ));
        let device = FakeDevice::spirv_only();
        let mut resources = registry(&store, LoadMode::Source);

        let err = resources.load_all(&device).unwrap_err();
        assert!(matches!(err, ResourceError::Stat { .. }));
        assert!(resources.try_get(ResourceId::ShaderVertexFullscreen).is_some());
        assert!(resources.try_get(ResourceId::ShaderFragmentFbmWarp).is_none());
        assert!(resources.try_get(ResourceId::ShaderFragmentPlasmaBeat).is_none());
    }

    #[test]
    fn load_all_reports_compile_and_device_failures() {
        let base = Path::new("assets");
        let store = MemoryStore::with_catalog_sources(base);
        store.write(
            resource_path(base, LoadMode::Source, ResourceId::ShaderVertexFullscreen, ShaderFormat::SpirV),
            FakeCompiler::BROKEN,
        );
        let device = FakeDevice::spirv_only();
        let mut resources = registry(&store, LoadMode::Source);
        assert!(matches!(
            resources.load_all(&device).unwrap_err(),
            ResourceError::Compile { .. }
        ));

        let store = MemoryStore::with_catalog_sources(base);
        let device = FakeDevice::spirv_only();
        device.reject_next("invalid bytecode");
        let mut resources = registry(&store, LoadMode::Source);
        assert!(matches!(
            resources.load_all(&device).unwrap_err(),
            ResourceError::CreateShader {
                resource: ResourceId::ShaderVertexFullscreen,
                ..
            }
        ));
    }

    #[test]
    fn source_mode_without_compiler_is_rejected() {
        let store = MemoryStore::with_catalog_sources(Path::new("assets"));
        let device = FakeDevice::spirv_only();
        let mut resources = registry(&store, LoadMode::Source).with_compiler(None);
        assert!(matches!(
            resources.load_all(&device).unwrap_err(),
            ResourceError::CompilerUnavailable { .. }
        ));
    }

    #[test]
    fn empty_files_are_rejected() {
        let base = Path::new("assets");
        let store = MemoryStore::with_catalog_sources(base);
        store.write(
            resource_path(base, LoadMode::Source, ResourceId::ShaderVertexFullscreen, ShaderFormat::SpirV),
            "",
        );
        let device = FakeDevice::spirv_only();
        let mut resources = registry(&store, LoadMode::Source);
        assert!(matches!(
            resources.load_all(&device).unwrap_err(),
            ResourceError::Empty { .. }
        ));
    }

    #[test]
    fn failed_reload_keeps_previous_handle() {
        let base = Path::new("assets");
        let store = MemoryStore::with_catalog_sources(base);
        let device = FakeDevice::spirv_only();
        let mut resources = registry(&store, LoadMode::Source);
        resources.load_all(&device).unwrap();

        let id = ResourceId::ShaderFragmentFbmWarp;
        let before = *resources.shader(id);
        let stamp_before = resources.get(id).last_modified();
        store.write(
            resource_path(base, LoadMode::Source, id, ShaderFormat::SpirV),
            FakeCompiler::BROKEN,
        );

        assert!(resources.reload(id, &device).is_err());
        assert_eq!(*resources.shader(id), before);
        assert_eq!(resources.get(id).last_modified(), stamp_before);
        assert!(device.is_live(before));
    }

    #[test]
    fn successful_reload_swaps_and_releases_old_handle() {
        let base = Path::new("assets");
        let store = MemoryStore::with_catalog_sources(base);
        let device = FakeDevice::spirv_only();
        let mut resources = registry(&store, LoadMode::Source);
        resources.load_all(&device).unwrap();

        let id = ResourceId::ShaderFragmentPlasmaBeat;
        let before = *resources.shader(id);
        let path = resource_path(base, LoadMode::Source, id, ShaderFormat::SpirV);
        store.write(path.clone(), "void main() { /* edited */ }");

        resources.reload(id, &device).unwrap();
        let after = *resources.shader(id);
        assert_ne!(after, before);
        assert!(!device.is_live(before));
        assert!(device.is_live(after));
        assert_eq!(resources.get(id).last_modified(), store.modified(&path).unwrap());
    }

    #[test]
    fn reload_before_load_is_an_error() {
        let store = MemoryStore::with_catalog_sources(Path::new("assets"));
        let device = FakeDevice::spirv_only();
        let mut resources = registry(&store, LoadMode::Source);
        assert!(matches!(
            resources.reload(ResourceId::ShaderVertexFullscreen, &device),
            Err(ResourceError::NotLoaded(ResourceId::ShaderVertexFullscreen))
        ));
    }

    #[test]
    fn destroy_all_releases_every_handle() {
        let store = MemoryStore::with_catalog_sources(Path::new("assets"));
        let device = FakeDevice::spirv_only();
        let mut resources = registry(&store, LoadMode::Source);
        resources.load_all(&device).unwrap();
        assert_eq!(device.live_count(), ResourceId::COUNT);

        resources.destroy_all(&device);
        assert_eq!(device.live_count(), 0);
        assert!(resources.try_get(ResourceId::ShaderVertexFullscreen).is_none());
    }

    #[test]
    #[should_panic(expected = "requested before it was loaded")]
    fn get_before_load_panics() {
        let store = MemoryStore::with_catalog_sources(Path::new("assets"));
        let resources = registry(&store, LoadMode::Source);
        let _ = resources.get(ResourceId::ShaderFragmentFbmWarp);
    }
}

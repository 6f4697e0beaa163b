use std::cell::{Cell, RefCell};
use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, Instant, SystemTime};

use renderer::compile::{CompileRequest, CrossCompiler};
use renderer::resources::{
    resource_path, LiveReload, LoadMode, ResourceError, ResourceId, Resources, ShaderDevice,
    ShaderFormat, ShaderFormats, ShaderRequest,
};

/// Prefixes the source with its stage so created shaders can be told apart.
struct TaggingCompiler;

impl CrossCompiler for TaggingCompiler {
    fn compile(&mut self, request: CompileRequest<'_>) -> Result<Vec<u8>, String> {
        if request.source.contains("syntax error") {
            return Err(format!("{}: syntax error", request.file_name));
        }
        Ok(format!("{}|{}", request.stage, request.source).into_bytes())
    }
}

#[derive(Default)]
struct CountingDevice {
    next: Cell<u32>,
    released: RefCell<Vec<u32>>,
    code: RefCell<Vec<(u32, Vec<u8>)>>,
}

impl ShaderDevice for CountingDevice {
    type Shader = u32;

    fn supported_shader_formats(&self) -> ShaderFormats {
        ShaderFormats::EMPTY.with(ShaderFormat::SpirV)
    }

    fn create_shader(&self, request: ShaderRequest<'_>) -> Result<u32, String> {
        let handle = self.next.get() + 1;
        self.next.set(handle);
        self.code.borrow_mut().push((handle, request.code.to_vec()));
        Ok(handle)
    }

    fn release_shader(&self, shader: u32) {
        self.released.borrow_mut().push(shader);
    }
}

impl CountingDevice {
    fn code_of(&self, handle: u32) -> Vec<u8> {
        self.code
            .borrow()
            .iter()
            .find(|(candidate, _)| *candidate == handle)
            .map(|(_, code)| code.clone())
            .unwrap_or_default()
    }
}

fn source_path(base: &Path, id: ResourceId) -> std::path::PathBuf {
    resource_path(base, LoadMode::Source, id, ShaderFormat::SpirV)
}

fn write_catalog(base: &Path) {
    fs::create_dir_all(base.join("src")).unwrap();
    for id in ResourceId::ALL {
        fs::write(source_path(base, id), format!("// {id} v1\n")).unwrap();
    }
}

fn set_mtime(path: &Path, stamp: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(stamp)
        .unwrap();
}

fn load(base: &Path, device: &CountingDevice) -> Resources<CountingDevice> {
    let mut resources = Resources::new(base, LoadMode::Source)
        .with_compiler(Some(Box::new(TaggingCompiler)));
    resources.load_all(device).expect("initial load");
    resources
}

#[test]
fn edited_file_is_reloaded_after_the_interval() {
    let dir = tempfile::tempdir().unwrap();
    write_catalog(dir.path());
    let device = CountingDevice::default();
    let mut resources = load(dir.path(), &device);
    let start = Instant::now();
    let mut poller = LiveReload::new(start);

    let id = ResourceId::ShaderFragmentPlasmaBeat;
    let before = *resources.shader(id);
    let path = source_path(dir.path(), id);
    let original = resources.get(id).last_modified();
    fs::write(&path, "// plasma v2\n").unwrap();
    set_mtime(&path, original + Duration::from_secs(5));

    assert!(poller
        .check(&mut resources, &device, start + Duration::from_millis(100))
        .is_empty());
    assert_eq!(
        poller.check(&mut resources, &device, start + Duration::from_millis(600)),
        vec![id]
    );

    let after = *resources.shader(id);
    assert_ne!(after, before);
    assert_eq!(device.code_of(after), b"fragment|// plasma v2\n");
    assert_eq!(device.released.borrow().as_slice(), &[before]);
    assert_eq!(
        resources.get(id).last_modified(),
        original + Duration::from_secs(5)
    );
}

#[test]
fn broken_edit_keeps_serving_previous_shader() {
    let dir = tempfile::tempdir().unwrap();
    write_catalog(dir.path());
    let device = CountingDevice::default();
    let mut resources = load(dir.path(), &device);
    let start = Instant::now();
    let mut poller = LiveReload::new(start);

    let id = ResourceId::ShaderFragmentFbmWarp;
    let before = *resources.shader(id);
    let path = source_path(dir.path(), id);
    let original = resources.get(id).last_modified();
    fs::write(&path, "syntax error here").unwrap();
    set_mtime(&path, original + Duration::from_secs(1));

    assert!(poller
        .check(&mut resources, &device, start + Duration::from_secs(1))
        .is_empty());
    assert_eq!(*resources.shader(id), before);
    assert_eq!(resources.get(id).last_modified(), original);
    assert!(device.released.borrow().is_empty());

    fs::write(&path, "// fbm fixed\n").unwrap();
    set_mtime(&path, original + Duration::from_secs(2));
    assert_eq!(
        poller.check(&mut resources, &device, start + Duration::from_secs(2)),
        vec![id]
    );
    assert_ne!(*resources.shader(id), before);
}

#[test]
fn deleted_file_keeps_its_handle() {
    let dir = tempfile::tempdir().unwrap();
    write_catalog(dir.path());
    let device = CountingDevice::default();
    let mut resources = load(dir.path(), &device);
    let start = Instant::now();
    let mut poller = LiveReload::new(start);

    let id = ResourceId::ShaderVertexFullscreen;
    let before = *resources.shader(id);
    fs::remove_file(source_path(dir.path(), id)).unwrap();

    assert!(poller
        .check(&mut resources, &device, start + Duration::from_secs(1))
        .is_empty());
    assert_eq!(*resources.shader(id), before);
}

#[test]
fn missing_source_aborts_the_initial_load() {
    let dir = tempfile::tempdir().unwrap();
    write_catalog(dir.path());
    fs::remove_file(source_path(dir.path(), ResourceId::ShaderFragmentFbmWarp)).unwrap();

    let device = CountingDevice::default();
    let mut resources = Resources::new(dir.path(), LoadMode::Source)
        .with_compiler(Some(Box::new(TaggingCompiler)));
    let err = resources.load_all(&device).unwrap_err();
    assert!(matches!(err, ResourceError::Stat { .. }), "{err}");
    assert!(resources.try_get(ResourceId::ShaderVertexFullscreen).is_some());
    assert!(resources.try_get(ResourceId::ShaderFragmentFbmWarp).is_none());
}

#[test]
fn precompiled_mode_reads_binaries_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("res")).unwrap();
    for id in ResourceId::ALL {
        let path = resource_path(dir.path(), LoadMode::Precompiled, id, ShaderFormat::SpirV);
        fs::write(path, [0x03, 0x02, 0x23, 0x07, id.index() as u8]).unwrap();
    }

    let device = CountingDevice::default();
    let mut resources = Resources::new(dir.path(), LoadMode::Precompiled).with_compiler(None);
    resources.load_all(&device).expect("precompiled load");
    assert_eq!(resources.format(), Some(ShaderFormat::SpirV));

    let handle = *resources.shader(ResourceId::ShaderFragmentPlasmaBeat);
    assert_eq!(device.code_of(handle), vec![0x03, 0x02, 0x23, 0x07, 2]);

    resources.destroy_all(&device);
    assert_eq!(device.released.borrow().len(), ResourceId::COUNT);
}

//! In-memory stand-ins for the filesystem, GPU device, and cross compiler.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, SystemTime};

use crate::compile::{CompileRequest, CrossCompiler};

use super::catalog::{ResourceId, ShaderStage};
use super::device::{ShaderDevice, ShaderFormat, ShaderFormats, ShaderRequest};
use super::registry::{resource_path, LoadMode};
use super::store::ResourceStore;

#[derive(Clone, Default)]
pub(crate) struct MemoryStore {
    files: Rc<RefCell<HashMap<PathBuf, (Vec<u8>, SystemTime)>>>,
    ticks: Rc<Cell<u64>>,
}

impl MemoryStore {
    pub fn with_catalog_sources(base: &Path) -> Self {
        let store = Self::default();
        for id in ResourceId::ALL {
            store.insert(
                resource_path(base, LoadMode::Source, id, ShaderFormat::SpirV),
                format!("// {id}\nvoid main() {{}}\n").into_bytes(),
            );
        }
        store
    }

    fn next_stamp(&self) -> SystemTime {
        let tick = self.ticks.get() + 1;
        self.ticks.set(tick);
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000 + tick)
    }

    pub fn insert(&self, path: PathBuf, bytes: Vec<u8>) {
        let stamp = self.next_stamp();
        self.files.borrow_mut().insert(path, (bytes, stamp));
    }

    /// Replaces the contents and bumps the modification time.
    pub fn write(&self, path: PathBuf, contents: impl AsRef<[u8]>) {
        self.insert(path, contents.as_ref().to_vec());
    }

    /// Changes the modification time without touching the contents.
    pub fn touch(&self, path: &Path, stamp: SystemTime) {
        if let Some(entry) = self.files.borrow_mut().get_mut(path) {
            entry.1 = stamp;
        }
    }

    pub fn remove(&self, path: &Path) {
        self.files.borrow_mut().remove(path);
    }
}

impl ResourceStore for MemoryStore {
    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        self.files
            .borrow()
            .get(path)
            .map(|(_, stamp)| *stamp)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files
            .borrow()
            .get(path)
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }
}

/// Compiler that accepts any source without an `#error` directive.
#[derive(Default)]
pub(crate) struct FakeCompiler;

impl FakeCompiler {
    pub const BROKEN: &'static str = "#error broken edit\n";
}

impl CrossCompiler for FakeCompiler {
    fn compile(&mut self, request: CompileRequest<'_>) -> Result<Vec<u8>, String> {
        if request.source.contains("#error") {
            return Err(format!("{}:1: error: broken edit", request.file_name));
        }
        let mut code = format!("{}:{}:", request.format.extension(), request.stage).into_bytes();
        code.extend_from_slice(request.source.as_bytes());
        Ok(code)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CreatedShader {
    pub handle: u64,
    pub label: String,
    pub format: ShaderFormat,
    pub stage: ShaderStage,
    pub code: Vec<u8>,
}

pub(crate) struct FakeDevice {
    formats: ShaderFormats,
    next: Cell<u64>,
    live: RefCell<BTreeSet<u64>>,
    created: RefCell<Vec<CreatedShader>>,
    reject: RefCell<Option<String>>,
}

impl FakeDevice {
    pub fn new(formats: ShaderFormats) -> Self {
        Self {
            formats,
            next: Cell::new(1),
            live: RefCell::new(BTreeSet::new()),
            created: RefCell::new(Vec::new()),
            reject: RefCell::new(None),
        }
    }

    pub fn spirv_only() -> Self {
        Self::new(ShaderFormats::EMPTY.with(ShaderFormat::SpirV))
    }

    /// Makes the next `create_shader` call fail with `message`.
    pub fn reject_next(&self, message: &str) {
        *self.reject.borrow_mut() = Some(message.to_string());
    }

    pub fn live_count(&self) -> usize {
        self.live.borrow().len()
    }

    pub fn is_live(&self, handle: u64) -> bool {
        self.live.borrow().contains(&handle)
    }

    pub fn created(&self) -> Vec<CreatedShader> {
        self.created.borrow().clone()
    }
}

impl ShaderDevice for FakeDevice {
    type Shader = u64;

    fn supported_shader_formats(&self) -> ShaderFormats {
        self.formats
    }

    fn create_shader(&self, request: ShaderRequest<'_>) -> Result<u64, String> {
        if let Some(message) = self.reject.borrow_mut().take() {
            return Err(message);
        }
        let handle = self.next.get();
        self.next.set(handle + 1);
        self.live.borrow_mut().insert(handle);
        self.created.borrow_mut().push(CreatedShader {
            handle,
            label: request.label.to_string(),
            format: request.format,
            stage: request.info.stage,
            code: request.code.to_vec(),
        });
        Ok(handle)
    }

    fn release_shader(&self, shader: u64) {
        assert!(
            self.live.borrow_mut().remove(&shader),
            "shader {shader} released twice"
        );
    }
}

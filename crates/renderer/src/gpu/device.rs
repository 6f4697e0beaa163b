use std::borrow::Cow;

use crate::resources::{ShaderDevice, ShaderFormat, ShaderFormats, ShaderRequest};

const SPIRV_MAGIC: u32 = 0x0723_0203;

/// [`ShaderDevice`] backed by a `wgpu::Device`.
///
/// wgpu consumes SPIR-V on every backend (naga translates it to the native
/// language), so that is the only format advertised here.
#[derive(Clone)]
pub(crate) struct WgpuShaderDevice {
    device: wgpu::Device,
}

impl WgpuShaderDevice {
    pub(crate) fn new(device: wgpu::Device) -> Self {
        Self { device }
    }
}

impl ShaderDevice for WgpuShaderDevice {
    type Shader = wgpu::ShaderModule;

    fn supported_shader_formats(&self) -> ShaderFormats {
        ShaderFormats::EMPTY.with(ShaderFormat::SpirV)
    }

    fn create_shader(&self, request: ShaderRequest<'_>) -> Result<wgpu::ShaderModule, String> {
        if request.format != ShaderFormat::SpirV {
            return Err(format!("{} shaders are not supported by wgpu", request.format));
        }
        let words = spirv_words(request.code)?;

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(request.label),
                source: wgpu::ShaderSource::SpirV(Cow::Owned(words)),
            });
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(err.to_string()),
            None => Ok(module),
        }
    }
}

/// Reinterprets little-endian bytes as SPIR-V words after checking the header.
fn spirv_words(code: &[u8]) -> Result<Vec<u32>, String> {
    if code.len() % 4 != 0 {
        return Err(format!(
            "SPIR-V length {} is not a multiple of four bytes",
            code.len()
        ));
    }
    let words: Vec<u32> = code
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    match words.first() {
        Some(&SPIRV_MAGIC) => Ok(words),
        Some(other) => Err(format!("bad SPIR-V magic number {other:#010x}")),
        None => Err("SPIR-V module is empty".to_string()),
    }
}

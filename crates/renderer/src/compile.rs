use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use wgpu::naga::ShaderStage as NagaStage;

use crate::resources::{resource_path, LoadMode, ResourceId, ShaderFormat, ShaderStage};

/// A single shader cross-compilation job.
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    /// Human-authored shader source.
    pub source: &'a str,
    /// Name used in compiler diagnostics.
    pub file_name: &'a str,
    pub stage: ShaderStage,
    /// Binary format the device expects.
    pub format: ShaderFormat,
}

/// Translates shader source into a device binary format.
pub trait CrossCompiler {
    /// Returns the compiled bytes, or the compiler's diagnostics on failure.
    fn compile(&mut self, request: CompileRequest<'_>) -> Result<Vec<u8>, String>;
}

/// Convenient alias for owning compilers behind trait objects.
pub type BoxedCrossCompiler = Box<dyn CrossCompiler>;

/// Compiles GLSL sources into SPIR-V through shaderc.
#[cfg(feature = "shaderc")]
pub struct ShadercCompiler {
    compiler: shaderc::Compiler,
}

#[cfg(feature = "shaderc")]
impl ShadercCompiler {
    pub fn new() -> anyhow::Result<Self> {
        let compiler = shaderc::Compiler::new()
            .map_err(|err| anyhow::anyhow!("failed to initialise shaderc: {err}"))?;
        Ok(Self { compiler })
    }
}

#[cfg(feature = "shaderc")]
impl CrossCompiler for ShadercCompiler {
    fn compile(&mut self, request: CompileRequest<'_>) -> Result<Vec<u8>, String> {
        if request.format != ShaderFormat::SpirV {
            return Err(format!(
                "shaderc only targets SPIR-V; cannot build {} for {}",
                request.file_name, request.format
            ));
        }

        let kind = match request.stage {
            ShaderStage::Vertex => shaderc::ShaderKind::Vertex,
            ShaderStage::Fragment => shaderc::ShaderKind::Fragment,
        };
        let mut options = shaderc::CompileOptions::new()
            .map_err(|err| format!("failed to create shaderc options: {err}"))?;
        options.set_source_language(shaderc::SourceLanguage::GLSL);
        options.set_target_env(
            shaderc::TargetEnv::Vulkan,
            shaderc::EnvVersion::Vulkan1_0 as u32,
        );
        if cfg!(debug_assertions) {
            options.set_generate_debug_info();
        } else {
            options.set_optimization_level(shaderc::OptimizationLevel::Performance);
        }

        let artifact = self
            .compiler
            .compile_into_spirv(
                request.source,
                kind,
                request.file_name,
                "main",
                Some(&options),
            )
            .map_err(|err| err.to_string())?;

        if artifact.get_num_warnings() > 0 {
            tracing::warn!(
                file = request.file_name,
                warnings = %artifact.get_warning_messages(),
                "shader compiled with warnings"
            );
        }

        Ok(artifact.as_binary_u8().to_vec())
    }
}

/// Compiler used for source-mode loads, if this build has one.
#[cfg(feature = "shaderc")]
pub fn default_compiler() -> Option<BoxedCrossCompiler> {
    match ShadercCompiler::new() {
        Ok(compiler) => Some(Box::new(compiler)),
        Err(err) => {
            tracing::warn!(error = %err, "shader cross compiler unavailable");
            None
        }
    }
}

/// Compiler used for source-mode loads, if this build has one.
#[cfg(not(feature = "shaderc"))]
pub fn default_compiler() -> Option<BoxedCrossCompiler> {
    tracing::warn!("built without the `shaderc` feature; shader sources cannot be compiled");
    None
}

/// Cross-compiles every catalog shader under `<base>/src` into `out_dir`.
///
/// Output files are named `<name>.<ext>` so a precompiled-mode load rooted at
/// `base` finds them when `out_dir` is `<base>/res`.
pub fn compile_catalog(
    base_path: &Path,
    out_dir: &Path,
    format: ShaderFormat,
    compiler: &mut dyn CrossCompiler,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output directory {}", out_dir.display()))?;

    let mut written = Vec::with_capacity(ResourceId::COUNT);
    for id in ResourceId::ALL {
        let info = id.info();
        let Some(shader) = info.shader() else {
            continue;
        };
        let source_path = resource_path(base_path, LoadMode::Source, id, format);
        let source = fs::read_to_string(&source_path)
            .with_context(|| format!("failed to read shader source {}", source_path.display()))?;
        let file_name = source_path.display().to_string();
        let code = compiler
            .compile(CompileRequest {
                source: &source,
                file_name: &file_name,
                stage: shader.stage,
                format,
            })
            .map_err(|message| anyhow!("failed to compile {id}: {message}"))?;

        let target = out_dir.join(format!("{}.{}", info.file_name, format.extension()));
        fs::write(&target, &code)
            .with_context(|| format!("failed to write {}", target.display()))?;
        tracing::info!(resource = %id, path = %target.display(), bytes = code.len(), "compiled shader");
        written.push(target);
    }
    Ok(written)
}

/// Built-in shaders that blit the offscreen render target onto the swapchain.
///
/// These never change at run time, so they skip the resource registry and go
/// straight through naga's GLSL frontend.
pub(crate) fn compile_composite_shaders(
    device: &wgpu::Device,
) -> (wgpu::ShaderModule, wgpu::ShaderModule) {
    let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("composite vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(COMPOSITE_VERTEX_GLSL),
            stage: NagaStage::Vertex,
            defines: &[],
        },
    });
    let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("composite fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(COMPOSITE_FRAGMENT_GLSL),
            stage: NagaStage::Fragment,
            defines: &[],
        },
    });
    (vertex, fragment)
}

/// Full-screen triangle whose UVs map the render target top-left to the
/// swapchain top-left.
const COMPOSITE_VERTEX_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    vec2 pos = positions[gl_VertexIndex];
    v_uv = vec2(pos.x * 0.5 + 0.5, 0.5 - pos.y * 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

const COMPOSITE_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

layout(set = 0, binding = 0) uniform texture2D source_texture;
layout(set = 0, binding = 1) uniform sampler source_sampler;

void main() {
    out_color = texture(sampler2D(source_texture, source_sampler), v_uv);
}
";

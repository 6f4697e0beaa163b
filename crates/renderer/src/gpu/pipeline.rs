use anyhow::{anyhow, bail, Result};

use crate::resources::{BindingCounts, ResourceId, Resources};
use crate::types::Effect;

use super::device::WgpuShaderDevice;
use super::target::TARGET_FORMAT;
use super::uniforms::UniformBlock;

/// Bind group layout for a fragment shader's declared resources.
///
/// Effects only read uniform buffers, one per binding starting at 0 in set 0.
pub(crate) fn bind_group_layout_entries(
    counts: &BindingCounts,
) -> Result<Vec<wgpu::BindGroupLayoutEntry>> {
    if counts.samplers > 0 || counts.storage_textures > 0 || counts.storage_buffers > 0 {
        bail!(
            "effect shaders may only bind uniform buffers (samplers: {}, storage textures: {}, storage buffers: {})",
            counts.samplers,
            counts.storage_textures,
            counts.storage_buffers
        );
    }
    if counts.uniform_buffers > 1 {
        bail!(
            "effect shaders bind at most one uniform buffer, got {}",
            counts.uniform_buffers
        );
    }
    Ok((0..counts.uniform_buffers)
        .map(|binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        })
        .collect())
}

pub(crate) struct EffectPipeline {
    pub pipeline: wgpu::RenderPipeline,
    /// Present when the fragment shader declares a uniform block.
    pub uniforms: Option<UniformBlock>,
}

impl EffectPipeline {
    fn new(
        device: &wgpu::Device,
        resources: &Resources<WgpuShaderDevice>,
        effect: Effect,
    ) -> Result<Self> {
        let fragment_id = effect.resource();
        let counts = fragment_id
            .info()
            .shader()
            .map(|info| info.bindings)
            .ok_or_else(|| anyhow!("{fragment_id} is not a shader"))?;
        let entries = bind_group_layout_entries(&counts)?;

        let vertex_module = resources.shader(ResourceId::ShaderVertexFullscreen);
        let fragment_module = resources.shader(fragment_id);

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("effect uniform layout"),
            entries: &entries,
        });
        let uniforms =
            (!entries.is_empty()).then(|| UniformBlock::new(device, &uniform_layout));
        let bind_group_layouts: Vec<&wgpu::BindGroupLayout> = if uniforms.is_some() {
            vec![&uniform_layout]
        } else {
            Vec::new()
        };

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("effect pipeline layout"),
            bind_group_layouts: &bind_group_layouts,
            push_constant_ranges: &[],
        });

        let label = format!("{} pipeline", effect.as_str());
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: vertex_module,
                entry_point: Some("main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: TARGET_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        Ok(Self { pipeline, uniforms })
    }
}

/// One render pipeline per [`Effect`], rebuilt when its shaders reload.
pub(crate) struct EffectPipelines {
    pipelines: [Option<EffectPipeline>; Effect::COUNT],
}

impl EffectPipelines {
    /// Builds every effect; any failure here is fatal to startup.
    pub fn new(device: &wgpu::Device, resources: &Resources<WgpuShaderDevice>) -> Result<Self> {
        let mut pipelines = Self {
            pipelines: std::array::from_fn(|_| None),
        };
        for effect in Effect::ALL {
            let pipeline = build_checked(device, resources, effect)
                .map_err(|err| anyhow!("failed to build {} pipeline: {err}", effect.label()))?;
            pipelines.pipelines[effect.index()] = Some(pipeline);
        }
        Ok(pipelines)
    }

    pub fn get(&self, effect: Effect) -> &EffectPipeline {
        self.pipelines[effect.index()]
            .as_ref()
            .expect("effect pipelines are built at construction")
    }

    /// Rebuilds every effect that depends on one of `changed`.
    pub fn rebuild_affected(
        &mut self,
        device: &wgpu::Device,
        resources: &Resources<WgpuShaderDevice>,
        changed: &[ResourceId],
    ) {
        for effect in Effect::ALL {
            if changed.iter().any(|id| effect.affected_by(*id)) {
                self.rebuild(device, resources, effect);
            }
        }
    }

    /// Swaps in a fresh pipeline for `effect`, keeping the old one on failure.
    pub fn rebuild(
        &mut self,
        device: &wgpu::Device,
        resources: &Resources<WgpuShaderDevice>,
        effect: Effect,
    ) -> bool {
        match build_checked(device, resources, effect) {
            Ok(pipeline) => {
                self.pipelines[effect.index()] = Some(pipeline);
                tracing::info!(effect = %effect, "rebuilt effect pipeline");
                true
            }
            Err(err) => {
                tracing::error!(
                    effect = %effect,
                    error = %err,
                    "failed to rebuild effect pipeline; keeping previous version"
                );
                false
            }
        }
    }
}

/// Builds a pipeline inside a validation error scope so that an incompatible
/// shader pair surfaces as an error instead of an uncaptured device error.
fn build_checked(
    device: &wgpu::Device,
    resources: &Resources<WgpuShaderDevice>,
    effect: Effect,
) -> Result<EffectPipeline> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let built = EffectPipeline::new(device, resources, effect);
    let scope = pollster::block_on(device.pop_error_scope());
    match (built, scope) {
        (Err(err), _) => Err(err),
        (Ok(_), Some(validation)) => Err(anyhow!("{validation}")),
        (Ok(pipeline), None) => Ok(pipeline),
    }
}

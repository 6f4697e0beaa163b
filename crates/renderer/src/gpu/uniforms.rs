use bytemuck::{Pod, Zeroable};

/// Per-frame parameters shared by every effect shader.
///
/// Mirrors the std140 block
/// `uniform Params { float time; vec2 resolution; }`, where `resolution`
/// starts at offset 8.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub(crate) struct EffectUniforms {
    pub time: f32,
    _pad: f32,
    pub resolution: [f32; 2],
}

impl EffectUniforms {
    pub fn new(time: f32, width: u32, height: u32) -> Self {
        Self {
            time,
            _pad: 0.0,
            resolution: [width as f32, height as f32],
        }
    }
}

/// Uniform buffer plus the bind group that exposes it at set 0, binding 0.
pub(crate) struct UniformBlock {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl UniformBlock {
    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("effect uniforms"),
            size: std::mem::size_of::<EffectUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("effect uniform bind group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, bind_group }
    }

    pub fn write(&self, queue: &wgpu::Queue, uniforms: &EffectUniforms) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(uniforms));
    }
}

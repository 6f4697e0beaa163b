use std::fmt;

/// Stable identifier of every resource the renderer loads.
///
/// The discriminant doubles as the slot index inside
/// [`Resources`](super::Resources), so the order here must match [`CATALOG`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceId {
    ShaderVertexFullscreen,
    ShaderFragmentFbmWarp,
    ShaderFragmentPlasmaBeat,
}

impl ResourceId {
    pub const COUNT: usize = 3;

    /// Every identifier in catalog order.
    pub const ALL: [ResourceId; Self::COUNT] = [
        ResourceId::ShaderVertexFullscreen,
        ResourceId::ShaderFragmentFbmWarp,
        ResourceId::ShaderFragmentPlasmaBeat,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Static descriptor for this resource.
    pub fn info(self) -> &'static ResourceInfo {
        &CATALOG[self.index()]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceId::ShaderVertexFullscreen => "shader_vertex_fullscreen",
            ResourceId::ShaderFragmentFbmWarp => "shader_fragment_fbm_warp",
            ResourceId::ShaderFragmentPlasmaBeat => "shader_fragment_plasma_beat",
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stage a shader program is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Number of resource slots a shader expects to be bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BindingCounts {
    pub samplers: u32,
    pub storage_textures: u32,
    pub storage_buffers: u32,
    pub uniform_buffers: u32,
}

impl BindingCounts {
    pub const NONE: Self = Self {
        samplers: 0,
        storage_textures: 0,
        storage_buffers: 0,
        uniform_buffers: 0,
    };

    pub const fn uniform_buffers(count: u32) -> Self {
        Self {
            uniform_buffers: count,
            ..Self::NONE
        }
    }

    pub fn total(&self) -> u32 {
        self.samplers + self.storage_textures + self.storage_buffers + self.uniform_buffers
    }
}

/// Load parameters for a shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderInfo {
    pub stage: ShaderStage,
    pub bindings: BindingCounts,
}

/// Kind-specific part of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Shader(ShaderInfo),
}

/// Immutable description of a loadable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceInfo {
    /// File stem shared by the source and precompiled variants.
    pub file_name: &'static str,
    pub kind: ResourceKind,
}

impl ResourceInfo {
    pub fn shader(&self) -> Option<&ShaderInfo> {
        match &self.kind {
            ResourceKind::Shader(info) => Some(info),
        }
    }
}

pub static CATALOG: [ResourceInfo; ResourceId::COUNT] = [
    ResourceInfo {
        file_name: "fullscreen",
        kind: ResourceKind::Shader(ShaderInfo {
            stage: ShaderStage::Vertex,
            bindings: BindingCounts::NONE,
        }),
    },
    ResourceInfo {
        file_name: "fbm_warp",
        kind: ResourceKind::Shader(ShaderInfo {
            stage: ShaderStage::Fragment,
            bindings: BindingCounts::uniform_buffers(1),
        }),
    },
    ResourceInfo {
        file_name: "plasma_beat",
        kind: ResourceKind::Shader(ShaderInfo {
            stage: ShaderStage::Fragment,
            bindings: BindingCounts::uniform_buffers(1),
        }),
    },
];

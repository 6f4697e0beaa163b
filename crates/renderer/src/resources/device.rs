use std::fmt;

use super::catalog::ShaderInfo;

/// Binary shader representation a GPU device can consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderFormat {
    /// DirectX intermediate language (D3D12).
    Dxil,
    /// Metal shading language source (Metal).
    Msl,
    /// Portable SPIR-V bytecode.
    SpirV,
}

impl ShaderFormat {
    /// Formats in the order they are preferred when a device supports several.
    pub const PREFERENCE: [ShaderFormat; 3] =
        [ShaderFormat::Dxil, ShaderFormat::Msl, ShaderFormat::SpirV];

    /// File extension of precompiled shaders in this format.
    pub fn extension(self) -> &'static str {
        match self {
            ShaderFormat::Dxil => "dxil",
            ShaderFormat::Msl => "msl",
            ShaderFormat::SpirV => "spv",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            ShaderFormat::Dxil => 1 << 0,
            ShaderFormat::Msl => 1 << 1,
            ShaderFormat::SpirV => 1 << 2,
        }
    }
}

impl fmt::Display for ShaderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderFormat::Dxil => f.write_str("DXIL"),
            ShaderFormat::Msl => f.write_str("MSL"),
            ShaderFormat::SpirV => f.write_str("SPIR-V"),
        }
    }
}

/// Set of shader formats advertised by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShaderFormats(u8);

impl ShaderFormats {
    pub const EMPTY: Self = Self(0);

    pub const fn with(self, format: ShaderFormat) -> Self {
        Self(self.0 | format.bit())
    }

    pub const fn contains(self, format: ShaderFormat) -> bool {
        self.0 & format.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = ShaderFormat> {
        ShaderFormat::PREFERENCE
            .into_iter()
            .filter(move |format| self.contains(*format))
    }
}

impl FromIterator<ShaderFormat> for ShaderFormats {
    fn from_iter<I: IntoIterator<Item = ShaderFormat>>(iter: I) -> Self {
        iter.into_iter()
            .fold(ShaderFormats::EMPTY, |set, format| set.with(format))
    }
}

/// Picks the preferred format out of those a device supports.
///
/// Native bytecode wins over Metal source, which wins over SPIR-V.
pub fn select_shader_format(formats: ShaderFormats) -> Option<ShaderFormat> {
    formats.iter().next()
}

/// Everything a device needs to turn shader bytes into a GPU object.
#[derive(Debug, Clone, Copy)]
pub struct ShaderRequest<'a> {
    pub label: &'a str,
    pub code: &'a [u8],
    pub format: ShaderFormat,
    pub info: &'a ShaderInfo,
}

/// GPU capabilities the resource registry relies on.
pub trait ShaderDevice {
    /// Opaque GPU-resident shader object.
    type Shader;

    fn supported_shader_formats(&self) -> ShaderFormats;

    /// Submits shader bytes to the device. The error string is the device's
    /// diagnostic and is surfaced to the log verbatim.
    fn create_shader(&self, request: ShaderRequest<'_>) -> Result<Self::Shader, String>;

    fn release_shader(&self, shader: Self::Shader) {
        drop(shader);
    }
}

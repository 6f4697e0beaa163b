use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use renderer::resources::LoadMode;
use renderer::{render_scale_index, Effect, RendererConfig, RENDER_SCALES};
use serde::de::{self, Deserializer};
use serde::Deserialize;

use crate::cli::RunArgs;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "shadercross.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse configuration file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// How shaders are located on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModeSetting {
    Source,
    Precompiled,
}

impl From<ModeSetting> for LoadMode {
    fn from(value: ModeSetting) -> Self {
        match value {
            ModeSetting::Source => LoadMode::Source,
            ModeSetting::Precompiled => LoadMode::Precompiled,
        }
    }
}

/// Contents of `shadercross.toml`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub base_path: Option<PathBuf>,
    pub mode: Option<ModeSetting>,
    pub live_reload: Option<bool>,
    #[serde(deserialize_with = "deserialize_duration_opt")]
    pub reload_interval: Option<Duration>,
    pub vsync: Option<bool>,
    pub render_scale: Option<f32>,
    pub effect: Option<String>,
    pub window_size: Option<[u32; 2]>,
}

impl FileConfig {
    /// Reads `path`, or returns the empty config when it does not exist and
    /// was not requested explicitly.
    pub fn load_or_default(path: &Path, explicit: bool) -> Result<Self, ConfigError> {
        if !explicit && !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &contents)
    }

    pub fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Layers CLI overrides over the file over built-in defaults.
pub fn resolve(file: &FileConfig, args: &RunArgs) -> Result<RendererConfig, ConfigError> {
    let mut config = RendererConfig::default();

    if let Some(base_path) = args.base_path.as_ref().or(file.base_path.as_ref()) {
        config.base_path = base_path.clone();
    }
    if let Some(mode) = args.mode.or(file.mode) {
        config.mode = mode.into();
    }
    config.live_reload = args
        .live_reload_override()
        .or(file.live_reload)
        .unwrap_or(config.mode == LoadMode::Source);

    if let Some(interval) = args.reload_interval.or(file.reload_interval) {
        if interval.is_zero() {
            return Err(ConfigError::Invalid(
                "reload_interval must be greater than zero".to_string(),
            ));
        }
        config.reload_interval = interval;
    }

    if args.no_vsync {
        config.vsync = false;
    } else if let Some(vsync) = file.vsync {
        config.vsync = vsync;
    }

    if let Some(scale) = args.render_scale.or(file.render_scale) {
        config.render_scale_index = render_scale_index(scale).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "render scale {scale} is not one of {RENDER_SCALES:?}"
            ))
        })?;
    }

    if let Some(effect) = args.effect {
        config.effect = effect;
    } else if let Some(name) = &file.effect {
        config.effect = name
            .parse::<Effect>()
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
    }

    let window_size = args
        .size
        .or_else(|| file.window_size.map(|[width, height]| (width, height)));
    if let Some((width, height)) = window_size {
        if width == 0 || height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size {width}x{height} must be non-zero"
            )));
        }
        config.window_size = Some((width, height));
    }

    Ok(config)
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Duration::try_from_secs_f64(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration {v}: {err}")))
        }
    }

    deserializer.deserialize_any(Visitor)
}

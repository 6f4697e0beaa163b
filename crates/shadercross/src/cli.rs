use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use renderer::Effect;

use crate::config::{ModeSetting, DEFAULT_CONFIG_FILE};

#[derive(Parser, Debug)]
#[command(
    name = "shadercross",
    author,
    version,
    about = "Real-time shader demo with live-reloaded, cross-compiled shaders"
)]
pub struct Cli {
    /// Configuration file (TOML). Missing files are ignored unless given explicitly.
    #[arg(long, global = true, value_name = "FILE", env = "SHADERCROSS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub run: RunArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Overrides for values that can also come from the configuration file.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Directory containing `src/` shader sources and `res/` binaries.
    #[arg(long, global = true, value_name = "DIR")]
    pub base_path: Option<PathBuf>,

    /// Load shader sources (`source`) or offline-compiled binaries (`precompiled`).
    #[arg(long, global = true, value_enum, value_name = "MODE")]
    pub mode: Option<ModeSetting>,

    /// Force live reload on.
    #[arg(long, global = true, conflicts_with = "no_live_reload")]
    pub live_reload: bool,

    /// Force live reload off.
    #[arg(long, global = true)]
    pub no_live_reload: bool,

    /// Minimum time between filesystem sweeps (e.g. `500ms`, `2s`).
    #[arg(long, global = true, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub reload_interval: Option<Duration>,

    /// Start with vsync disabled.
    #[arg(long, global = true)]
    pub no_vsync: bool,

    /// Initial render scale: 1.0, 0.9, 0.8, 0.75 or 0.5.
    #[arg(long, global = true, value_name = "SCALE")]
    pub render_scale: Option<f32>,

    /// Initial effect: `fbm_warp` or `plasma_beat`.
    #[arg(long, global = true, value_name = "EFFECT")]
    pub effect: Option<Effect>,

    /// Window size in physical pixels (e.g. `1280x720`).
    #[arg(long, global = true, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,
}

impl RunArgs {
    pub fn live_reload_override(&self) -> Option<bool> {
        if self.live_reload {
            Some(true)
        } else if self.no_live_reload {
            Some(false)
        } else {
            None
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the demo window (default).
    Run,
    /// Cross-compile every shader source into the precompiled directory.
    Compile(CompileArgs),
    /// Print the resolved configuration and resource paths.
    Config,
}

#[derive(Args, Debug, Default)]
pub struct CompileArgs {
    /// Output directory; defaults to `<base>/res`.
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

/// Config path to use and whether the user asked for it explicitly.
pub fn config_path(explicit: &Option<PathBuf>) -> (PathBuf, bool) {
    match explicit {
        Some(path) => (path.clone(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    }
}

fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{value}`"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|err| format!("invalid width `{width}`: {err}"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|err| format!("invalid height `{height}`: {err}"))?;
    if width == 0 || height == 0 {
        return Err("window size must be non-zero".to_string());
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_parse_in_either_case() {
        assert_eq!(parse_size("1280x720"), Ok((1280, 720)));
        assert_eq!(parse_size("640X480"), Ok((640, 480)));
        assert!(parse_size("1280").is_err());
        assert!(parse_size("0x10").is_err());
    }

    #[test]
    fn flags_before_and_after_subcommand() {
        let cli = Cli::try_parse_from([
            "shadercross",
            "--effect",
            "plasma_beat",
            "config",
            "--render-scale",
            "0.5",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Command::Config)));
        assert_eq!(cli.run.effect, Some(Effect::PlasmaBeat));
        assert_eq!(cli.run.render_scale, Some(0.5));
    }

    #[test]
    fn live_reload_flags_conflict() {
        assert!(
            Cli::try_parse_from(["shadercross", "--live-reload", "--no-live-reload"]).is_err()
        );
        let cli = Cli::try_parse_from(["shadercross", "--no-live-reload"]).unwrap();
        assert_eq!(cli.run.live_reload_override(), Some(false));
        assert!(cli.command.is_none());
    }

    #[test]
    fn compile_accepts_output_dir_and_interval() {
        let cli = Cli::try_parse_from([
            "shadercross",
            "--reload-interval",
            "2s",
            "compile",
            "--out",
            "build/res",
        ])
        .unwrap();
        assert_eq!(cli.run.reload_interval, Some(Duration::from_secs(2)));
        match cli.command {
            Some(Command::Compile(args)) => assert_eq!(args.out, Some(PathBuf::from("build/res"))),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn config_path_defaults_to_working_directory() {
        assert_eq!(
            config_path(&None),
            (PathBuf::from(DEFAULT_CONFIG_FILE), false)
        );
        assert_eq!(
            config_path(&Some(PathBuf::from("x.toml"))),
            (PathBuf::from("x.toml"), true)
        );
    }
}

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use renderer::resources::{resource_path, LoadMode, ResourceId, ShaderFormat, PRECOMPILED_DIR};
use renderer::{compile_catalog, default_compiler, Renderer, RendererConfig};
use tracing_subscriber::EnvFilter;

use crate::cli::{config_path, CompileArgs, RunArgs};
use crate::config::{resolve, FileConfig};

pub fn initialise_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(
    explicit: &Option<PathBuf>,
    args: &RunArgs,
) -> Result<(RendererConfig, PathBuf, bool)> {
    let (path, explicit) = config_path(explicit);
    let found = path.exists();
    let file = FileConfig::load_or_default(&path, explicit)?;
    let config = resolve(&file, args)?;
    if found {
        tracing::debug!(path = %path.display(), "loaded configuration file");
    }
    Ok((config, path, found))
}

pub fn run(config_file: &Option<PathBuf>, args: &RunArgs) -> Result<()> {
    let (config, _, _) = load_config(config_file, args)?;
    Renderer::new(config).run()
}

pub fn compile(config_file: &Option<PathBuf>, args: &RunArgs, compile: CompileArgs) -> Result<()> {
    let (config, _, _) = load_config(config_file, args)?;
    let out_dir = compile
        .out
        .unwrap_or_else(|| config.base_path.join(PRECOMPILED_DIR));

    let mut compiler = default_compiler()
        .ok_or_else(|| anyhow!("no shader cross compiler available in this build"))?;
    let written = compile_catalog(
        &config.base_path,
        &out_dir,
        ShaderFormat::SpirV,
        compiler.as_mut(),
    )
    .with_context(|| format!("failed to compile shaders from {}", config.base_path.display()))?;

    for path in &written {
        println!("{}", path.display());
    }
    Ok(())
}

pub fn print_config(config_file: &Option<PathBuf>, args: &RunArgs) -> Result<()> {
    let (config, path, found) = load_config(config_file, args)?;

    let source = if found { "" } else { " (not found, using defaults)" };
    println!("config_file = \"{}\"{source}", path.display());
    println!("base_path = \"{}\"", config.base_path.display());
    println!("mode = \"{}\"", config.mode);
    println!("live_reload = {}", config.live_reload);
    println!(
        "reload_interval = \"{}\"",
        humantime::format_duration(config.reload_interval)
    );
    println!("vsync = {}", config.vsync);
    println!("render_scale = {}", config.render_scale());
    println!("effect = \"{}\"", config.effect);
    match config.window_size {
        Some((width, height)) => println!("window_size = [{width}, {height}]"),
        None => println!("window_size = \"auto\""),
    }

    println!();
    println!("[resources]");
    for id in ResourceId::ALL {
        let path = resource_path(&config.base_path, config.mode, id, ShaderFormat::SpirV);
        println!("{id} = \"{}\"", path.display());
    }
    if config.mode == LoadMode::Source && default_compiler().is_none() {
        tracing::warn!("source mode selected but this build cannot compile shaders");
    }
    Ok(())
}

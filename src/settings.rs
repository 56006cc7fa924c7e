use anyhow::Result;
use clap::Parser;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(validate_config(&settings).is_ok());
        assert_eq!(settings.wavelength, crate::config::DEFAULT_WAVELENGTH);
    }

    #[test]
    fn rejects_non_positive_values() {
        let mut settings = Settings::default();
        settings.max_iterations = 0;
        assert!(validate_config(&settings).is_err());

        let mut settings = Settings::default();
        settings.wavelength = -1.0;
        assert!(validate_config(&settings).is_err());

        let mut settings = Settings::default();
        settings.intensity_threshold = 0.0;
        assert!(validate_config(&settings).is_err());
    }

    #[test]
    fn command_line_overrides() {
        let args = CliArgs::parse_from([
            "polarcraft",
            "--scene",
            "bench.toml",
            "-w",
            "633",
            "--bounces",
            "4",
            "--parallel",
        ]);
        let mut settings = Settings::default();
        apply_overrides(&mut settings, &args);
        assert_eq!(settings.scene.as_deref(), Some("bench.toml"));
        assert_eq!(settings.wavelength, 633.0);
        assert_eq!(settings.max_bounces, 4);
        assert!(settings.parallel);
        assert_eq!(settings.max_iterations, Settings::default().max_iterations);
    }

    #[test]
    fn layered_sources() {
        let built = Config::builder()
            .add_source(Config::try_from(&Settings::default()).unwrap())
            .add_source(config::File::from_str(
                "max_bounces = 7\nwavelength = 480.0",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let settings: Settings = built.try_deserialize().unwrap();
        assert_eq!(settings.max_bounces, 7);
        assert_eq!(settings.wavelength, 480.0);
        assert_eq!(settings.min_hit_distance, Settings::default().min_hit_distance);
    }
}

/// Runtime configuration for a trace.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Settings {
    /// Default vacuum wavelength in nm for sources that do not set one.
    pub wavelength: f64,
    /// Rays dimmer than this are dropped and booked as truncated.
    pub intensity_threshold: f64,
    /// Branches at or below this intensity count as absorbed.
    pub absorption_threshold: f64,
    pub max_bounces: usize,
    pub max_iterations: usize,
    /// Intersections closer than this are ignored, so a ray leaving a surface
    /// does not hit it again.
    pub min_hit_distance: f64,
    pub conservation_tolerance: f64,
    #[serde(default)]
    pub scene: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub parallel: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            wavelength: crate::config::DEFAULT_WAVELENGTH,
            intensity_threshold: 1e-6,
            absorption_threshold: crate::config::ABSORPTION_THRESHOLD,
            max_bounces: 32,
            max_iterations: 10_000,
            min_hit_distance: 1e-6,
            conservation_tolerance: crate::config::CONSERVATION_TOLERANCE,
            scene: None,
            output: None,
            parallel: false,
        }
    }
}

/// Loads settings from `config/default.toml` only.
pub fn load_default_config() -> Result<Settings> {
    let root = retrieve_project_root()?;
    let settings = Config::builder()
        .add_source(Config::try_from(&Settings::default())?)
        .add_source(File::from(root.join("config/default.toml")).required(false))
        .build()?;
    let config: Settings = settings.try_deserialize()?;
    validate_config(&config)?;
    Ok(config)
}

/// Loads settings from the layered sources and the command line.
pub fn load_config() -> Result<Settings> {
    load_config_with(&CliArgs::parse())
}

/// Layers `config/default.toml`, an optional `config/local.toml`,
/// `POLARCRAFT_*` environment variables and finally `args`.
pub fn load_config_with(args: &CliArgs) -> Result<Settings> {
    let root = retrieve_project_root()?;
    let default_config_file = root.join("config/default.toml");
    let local_config = root.join("config/local.toml");

    if local_config.exists() {
        log::info!("Using local configuration: {:?}", local_config);
    } else {
        log::debug!("Using default configuration: {:?}", default_config_file);
    }

    let settings = Config::builder()
        .add_source(Config::try_from(&Settings::default())?)
        .add_source(File::from(default_config_file).required(false))
        .add_source(File::from(local_config).required(false))
        .add_source(Environment::with_prefix("POLARCRAFT").try_parsing(true))
        .build()
        .map_err(|err| anyhow::anyhow!("Error loading configuration: {}", err))?;

    let mut config: Settings = settings
        .try_deserialize()
        .map_err(|err| anyhow::anyhow!("Error deserializing configuration: {}", err))?;

    apply_overrides(&mut config, args);
    validate_config(&config)?;

    log::debug!("{:#?}", config);

    Ok(config)
}

fn apply_overrides(config: &mut Settings, args: &CliArgs) {
    if let Some(scene) = &args.scene {
        config.scene = Some(scene.clone());
    }
    if let Some(output) = &args.output {
        config.output = Some(output.clone());
    }
    if let Some(wavelength) = args.w {
        config.wavelength = wavelength;
    }
    if let Some(threshold) = args.threshold {
        config.intensity_threshold = threshold;
    }
    if let Some(bounces) = args.bounces {
        config.max_bounces = bounces;
    }
    if let Some(iterations) = args.iterations {
        config.max_iterations = iterations;
    }
    if let Some(distance) = args.min_distance {
        config.min_hit_distance = distance;
    }
    if args.parallel {
        config.parallel = true;
    }
}

/// Retrieve the project root directory.
/// This function tries to find the project root directory in different ways:
/// 1. If the CARGO_MANIFEST_DIR environment variable is set, use it.
/// 2. If the POLARCRAFT_ROOT_DIR environment variable is set, use it.
/// 3. If the "config" subdirectory is found in the executable directory or any of its parents, use it.
/// 4. Otherwise the current directory, where the optional config files are simply absent.
fn retrieve_project_root() -> Result<PathBuf> {
    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        return Ok(PathBuf::from(manifest_dir));
    }
    if let Ok(path) = env::var("POLARCRAFT_ROOT_DIR") {
        return Ok(PathBuf::from(path));
    }
    let exe_path = env::current_exe()?;
    let mut current_dir = exe_path.parent().map(|p| p.to_path_buf());
    while let Some(dir) = current_dir {
        if dir.join("config").is_dir() {
            return Ok(dir);
        }
        current_dir = dir.parent().map(|p| p.to_path_buf());
    }
    Ok(env::current_dir()?)
}

/// Rejects settings that would make a trace meaningless.
pub fn validate_config(config: &Settings) -> Result<()> {
    if config.wavelength <= 0.0 {
        return Err(anyhow::anyhow!("Wavelength must be greater than 0"));
    }
    if config.intensity_threshold <= 0.0 {
        return Err(anyhow::anyhow!("Intensity threshold must be greater than 0"));
    }
    if config.absorption_threshold < 0.0 {
        return Err(anyhow::anyhow!("Absorption threshold must be non-negative"));
    }
    if config.max_bounces == 0 {
        return Err(anyhow::anyhow!("Max bounces must be at least 1"));
    }
    if config.max_iterations == 0 {
        return Err(anyhow::anyhow!("Max iterations must be at least 1"));
    }
    if config.min_hit_distance <= 0.0 {
        return Err(anyhow::anyhow!("Minimum hit distance must be greater than 0"));
    }
    if config.conservation_tolerance < 0.0 {
        return Err(anyhow::anyhow!("Conservation tolerance must be non-negative"));
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[command(version, about = "polarcraft - polarized light ray tracer")]
pub struct CliArgs {
    /// Scene file (TOML) with the elements and sources to trace.
    #[arg(short, long)]
    scene: Option<String>,

    /// Write the trace result as JSON to this file instead of stdout.
    #[arg(short, long)]
    output: Option<String>,

    /// Default wavelength in nm.
    #[arg(short, long)]
    w: Option<f64>,

    /// Minimum intensity for a ray to keep propagating.
    #[arg(long)]
    threshold: Option<f64>,

    /// The maximum number of interactions before a ray is truncated.
    #[arg(long)]
    bounces: Option<usize>,

    /// The maximum number of worklist iterations per trace.
    #[arg(long)]
    iterations: Option<usize>,

    /// Minimum distance to the next intersection.
    #[arg(long)]
    min_distance: Option<f64>,

    /// Trace each source on its own worklist in parallel.
    #[arg(long)]
    parallel: bool,
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Settings:
  - Wavelength: {:.6} nm
  - Intensity Threshold: {:e}
  - Absorption Threshold: {:e}
  - Max Bounces: {}
  - Max Iterations: {}
  - Min Hit Distance: {:e}
  - Scene: {}
  ",
            self.wavelength,
            self.intensity_threshold,
            self.absorption_threshold,
            self.max_bounces,
            self.max_iterations,
            self.min_hit_distance,
            self.scene.as_deref().unwrap_or("<none>"),
        )
    }
}

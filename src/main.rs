use anyhow::Context;
use polarcraft::output;
use polarcraft::scene::Scene;
use polarcraft::settings;
use polarcraft::tracer::Tracer;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = settings::load_config()?;
    log::info!("{}", settings);

    let path = settings
        .scene
        .clone()
        .context("no scene given; pass one with --scene or set it in config/default.toml")?;
    let scene = Scene::from_file(&path)?;
    let destination = settings.output.clone();

    let tracer = Tracer::new(scene, settings);
    let result = tracer.trace_scene()?;

    match destination {
        Some(path) => output::write_result(&result, path)?,
        None => println!("{}", output::to_json(&result)?),
    }
    log::info!("{}", result.powers);
    Ok(())
}

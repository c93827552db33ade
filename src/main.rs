use clap::Parser;
use log::info;
use std::fs;

use ts2psql::cli::Args;
use ts2psql::config::{ConfigFile, Settings};
use ts2psql::{generate_script, input};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = ConfigFile::load(&args.config)?;
    let settings = Settings::resolve(&args, config)?;

    let default_level = if settings.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();
    info!("Using config file: {}", args.config.display());

    let paths = input::collect_input_paths(&settings.inputs)?;
    let declared = input::load_all(&paths)?;
    let script = generate_script(&declared)?;

    match &settings.out_file {
        Some(out_file) => {
            if let Some(dir) = out_file.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)?;
            }
            info!("Writing output to {}", out_file.display());
            fs::write(out_file, script)?;
        }
        None => print!("{}", script),
    }
    Ok(())
}

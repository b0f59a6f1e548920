use anyhow::Result;

use crate::cli::output::OutputOptions;
use crate::core::config::AppConfig;

pub fn init(bucket: Option<String>, _opts: &OutputOptions) -> Result<()> {
    let path = AppConfig::config_path();
    if path.exists() {
        eprintln!("Config file already exists at {}", path.display());
        eprintln!("Remove it first if you want to regenerate.");
        return Ok(());
    }

    let mut config = AppConfig::default();
    config.storage.bucket = bucket;

    match config.save() {
        Ok(path) => {
            println!("Generated config at {}", path.display());
            if config.storage.bucket.is_none() {
                println!("  No bucket set. Add one under [storage] or pass --bucket at run time.");
            }
        }
        Err(e) => {
            eprintln!("Failed to generate config: {}", e);
            std::process::exit(1);
        }
    }
    Ok(())
}

pub fn check(_opts: &OutputOptions) -> Result<()> {
    let path = AppConfig::config_path();
    if !path.exists() {
        eprintln!("No config file found at {}", path.display());
        eprintln!("Run `awscost config init` to create one.");
        return Ok(());
    }

    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let issues = config.validate();
    if issues.is_empty() {
        println!("Config at {} is valid.", path.display());
    } else {
        eprintln!("Config at {} has issues:", path.display());
        for issue in &issues {
            eprintln!("  - {}", issue);
        }
        std::process::exit(1);
    }
    Ok(())
}

//! `init` and `config`: write and inspect the settings file.

use anyhow::Context;

use crate::config::Settings;

/// Write `.mirrorwatch/settings.toml` with commented defaults.
pub fn run_init(force: bool) -> anyhow::Result<()> {
    let path = Settings::init_config_file(force).context("cannot write settings")?;

    println!("Created {}", path.display());
    println!("Environment variables such as MW_WATCH__BACKEND override it at runtime.");
    Ok(())
}

/// Print the effective settings after defaults, file and environment are merged.
pub fn run_config(settings: &Settings) -> anyhow::Result<()> {
    let rendered = toml::to_string_pretty(settings).context("cannot render settings")?;

    println!("# effective settings (defaults < settings file < MW_* environment)");
    println!("{rendered}");
    Ok(())
}

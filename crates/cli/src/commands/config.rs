//! Config commands

use anyhow::{Context, Result, bail};
use editbridge::config::Config;

/// Show the effective configuration
pub async fn cmd_config_show() -> Result<()> {
  let user_config = Config::user_config_path();
  let config = Config::load();

  if user_config.exists() {
    println!("Using user config: {:?}", user_config);
  } else {
    println!("Using default configuration (no config file found)");
  }
  println!();

  let toml_str = toml::to_string_pretty(&config)?;
  println!("{}", toml_str);

  println!("# Effective values");
  println!("# socket:  {}", config.socket_path().display());
  println!("# shims:   {}", config.runtime_dir().display());
  println!("# editor:  {}", config.editor_command().join(" "));

  Ok(())
}

/// Write the default user configuration file
pub async fn cmd_config_init(force: bool) -> Result<()> {
  let config_path = Config::user_config_path();

  if config_path.exists() && !force {
    bail!(
      "Config file already exists: {:?}\nUse --force to overwrite it",
      config_path
    );
  }

  if let Some(parent) = config_path.parent() {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("Failed to create {:?}", parent))?;
  }

  tokio::fs::write(&config_path, Config::generate_template())
    .await
    .with_context(|| format!("Failed to write {:?}", config_path))?;

  println!("Created user config: {:?}", config_path);
  println!("Edit the file to customize settings.");

  Ok(())
}

//! Env command - prints the variables that route git's editor to the host

use anyhow::{Context, Result};
use editbridge::{RuntimeConfig, config::Config};

/// Print the editor environment as shell exports (or JSON)
pub async fn cmd_env(disabled: bool, json: bool) -> Result<()> {
  let runtime_config = RuntimeConfig::from_config(Config::load());
  let vars = runtime_config
    .editor_environment(disabled)
    .await
    .context("Failed to install editor shims")?;

  if json {
    let map: serde_json::Map<String, serde_json::Value> = vars
      .into_iter()
      .map(|(name, value)| (name.to_string(), serde_json::Value::String(value)))
      .collect();
    println!("{}", serde_json::to_string_pretty(&map)?);
    return Ok(());
  }

  for line in export_lines(&vars) {
    println!("{}", line);
  }

  Ok(())
}

fn export_lines(vars: &[(&'static str, String)]) -> Vec<String> {
  vars
    .iter()
    .map(|(name, value)| format!("export {}={}", name, shell_quote(value)))
    .collect()
}

/// Single-quote a value for POSIX shells
fn shell_quote(value: &str) -> String {
  format!("'{}'", value.replace('\'', r"'\''"))
}

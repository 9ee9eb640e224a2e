//! `echoel config` - inspect the layered configuration

use crate::config::{ConfigLoader, EchoelConfig};
use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration after merging every layer
    Show,
    /// List the config layers in merge order
    Path,
}

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommand::Show => print!("{}", render_effective(&ConfigLoader::load()?)?),
        ConfigCommand::Path => {
            for line in describe_layers(&ConfigLoader::layers()) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

fn render_effective(config: &EchoelConfig) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

/// One line per layer; later layers override earlier ones
fn describe_layers(layers: &[(&str, PathBuf)]) -> Vec<String> {
    layers
        .iter()
        .map(|(name, path)| {
            let status = if path.exists() { "found" } else { "not present" };
            format!("{:<8} {} ({})", name, path.display(), status)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_effective_includes_every_section() {
        let rendered = render_effective(&EchoelConfig::default()).unwrap();
        assert!(rendered.contains("[audio]"));
        assert!(rendered.contains("frame_rate_hz = 60.0"));
        assert!(rendered.contains("[host.device]"));
    }

    #[test]
    fn test_describe_layers_reports_presence() {
        let temp_dir = TempDir::new().unwrap();
        let present = temp_dir.path().join("config.toml");
        std::fs::write(&present, "").unwrap();
        let absent = temp_dir.path().join("missing.toml");

        let lines = describe_layers(&[("user", absent), ("project", present)]);

        assert!(lines[0].starts_with("user "));
        assert!(lines[0].ends_with("(not present)"));
        assert!(lines[1].starts_with("project "));
        assert!(lines[1].ends_with("(found)"));
    }
}

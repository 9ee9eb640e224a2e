//! Plugin listing

use anyhow::Result;
use clap::Args;
use echoel_core::Channel;
use echoel_plugin_api::{Capability, PluginManifest};

use crate::demo;

/// Plugin listing arguments
#[derive(Args)]
pub struct PluginsArgs {
    /// Only show plugins declaring this capability (e.g. audioEffect)
    #[arg(long)]
    pub capability: Option<String>,
}

/// Run plugins command
pub fn run(args: PluginsArgs) -> Result<()> {
    let manifests: Vec<_> = demo::plugins().iter().map(|p| p.manifest()).collect();
    let lines = describe(&manifests, args.capability.as_deref())?;

    if lines.is_empty() {
        println!("No plugins match");
        return Ok(());
    }
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

/// One block of text per manifest passing the capability filter
fn describe(manifests: &[PluginManifest], capability: Option<&str>) -> Result<Vec<String>> {
    let filter = capability.map(str::parse::<Capability>).transpose()?;

    Ok(manifests
        .iter()
        .filter(|m| filter.is_none_or(|cap| m.has_capability(cap)))
        .map(|m| {
            let capabilities: Vec<_> = m.capabilities.iter().copied().map(Capability::as_str).collect();
            let channels: Vec<_> = Channel::for_capabilities(&m.capabilities)
                .into_iter()
                .map(Channel::as_str)
                .collect();
            let description = if m.description.is_empty() {
                "No description"
            } else {
                &m.description
            };
            format!(
                "{} v{}    {}\n  id:           {}\n  capabilities: {}\n  channels:     {}",
                m.name,
                m.version,
                description,
                m.id,
                capabilities.join(", "),
                channels.join(", ")
            )
        })
        .collect())
}

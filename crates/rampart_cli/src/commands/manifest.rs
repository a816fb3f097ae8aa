//! Manifest command - Show which template renders each resource.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use rampart_config::{ManifestEntry, PolicyPipeline};

use super::{load_document, SettingsArgs};

#[derive(Args)]
pub struct ManifestArgs {
    /// Project document (YAML or JSON)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Print the manifest as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub settings: SettingsArgs,
}

pub fn execute(args: ManifestArgs) -> Result<()> {
    let settings = args.settings.load()?;
    let mut document = load_document(&args.input)?;

    // Only documents that would pass normalization are handed to the renderer.
    let pipeline = PolicyPipeline::new(settings);
    pipeline
        .check(&mut document)
        .with_context(|| format!("Validation of {} failed", args.input.display()))?;

    let entries = document.manifest(pipeline.settings());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        print!("{}", render_table(&entries));
    }

    Ok(())
}

fn render_table(entries: &[ManifestEntry]) -> String {
    let kind_width = entries.iter().map(|e| e.kind.as_str().len()).max().unwrap_or(0);
    let name_width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0);

    entries
        .iter()
        .map(|e| {
            format!(
                "{:<kw$}  {:<nw$}  {}\n",
                e.kind.as_str(),
                e.name,
                e.template,
                kw = kind_width,
                nw = name_width
            )
        })
        .collect()
}

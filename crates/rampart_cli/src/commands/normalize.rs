//! Normalize command - Validate a document and apply policy.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tracing::info;

use rampart_config::{Document, PolicyPipeline};

use super::{load_document, SettingsArgs};

#[derive(Args)]
pub struct NormalizeArgs {
    /// Project document to normalize (YAML or JSON)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Write the finalized document here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,

    #[command(flatten)]
    pub settings: SettingsArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

pub fn execute(args: NormalizeArgs) -> Result<()> {
    info!("Normalizing project document: {}", args.input.display());

    let settings = args.settings.load()?;
    let mut document = load_document(&args.input)?;

    let pipeline = PolicyPipeline::new(settings);
    pipeline
        .run(&mut document)
        .with_context(|| format!("Failed to normalize {}", args.input.display()))?;

    let rendered = render(&document, args.format)?;
    match &args.output {
        Some(path) => {
            fs::write(path, rendered).with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote finalized document to {}", path.display());
        }
        None => print!("{}", rendered),
    }

    Ok(())
}

fn render(document: &Document, format: OutputFormat) -> Result<String> {
    let rendered = match format {
        OutputFormat::Yaml => document.to_yaml_string()?,
        OutputFormat::Json => {
            let mut json = document.to_json_string()?;
            json.push('\n');
            json
        }
    };
    Ok(rendered)
}

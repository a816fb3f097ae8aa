//! Validate command - Check documents without applying policy.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::{debug, info};
use walkdir::WalkDir;

use rampart_config::PolicyPipeline;

use super::{load_document, require_exists, SettingsArgs};

const DOCUMENT_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

#[derive(Args)]
pub struct ValidateArgs {
    /// Project document, or a directory searched recursively for documents
    #[arg(short, long)]
    pub input: PathBuf,

    #[command(flatten)]
    pub settings: SettingsArgs,
}

pub fn execute(args: ValidateArgs) -> Result<()> {
    require_exists(&args.input)?;
    let settings = args.settings.load()?;
    let pipeline = PolicyPipeline::new(settings);

    let documents = collect_documents(&args.input)?;
    info!("Validating {} project documents", documents.len());

    let mut first_failure: Option<(PathBuf, anyhow::Error)> = None;
    let mut failed = 0;

    for path in &documents {
        let outcome = load_document(path).and_then(|mut document| {
            pipeline
                .check(&mut document)
                .with_context(|| format!("Validation of {} failed", path.display()))
        });

        match outcome {
            Ok(count) => println!("   ✅ {} ({} resources)", path.display(), count),
            Err(e) => {
                println!("   ❌ {}: {:#}", path.display(), e);
                failed += 1;
                if first_failure.is_none() {
                    first_failure = Some((path.clone(), e));
                }
            }
        }
    }

    if let Some((path, e)) = first_failure {
        return Err(e.context(format!(
            "{} of {} documents failed validation, first: {}",
            failed,
            documents.len(),
            path.display()
        )));
    }

    println!("\n✅ All {} documents passed validation", documents.len());
    Ok(())
}

/// Documents to validate: the input itself, or every YAML/JSON file beneath it, sorted by path.
fn collect_documents(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", input.display()))?;
        let is_document = entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| DOCUMENT_EXTENSIONS.contains(&e));
        if is_document {
            debug!("Found project document {}", entry.path().display());
            documents.push(entry.into_path());
        }
    }
    Ok(documents)
}

//! Resolve command implementation.

use crate::output;
use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tapir_core::ImageSpecifier;
use tapir_image::{ImageBuilder, ImageConfig, ImageError, RepositoryManager, ResolvedImage};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Arguments for the resolve command.
#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Image specification (JSON)
    #[arg(short, long, value_name = "FILE")]
    pub image: PathBuf,

    /// Additional repository location (repeatable)
    #[arg(short, long = "repository", value_name = "LOCATION")]
    pub repositories: Vec<String>,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Give up resolving after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Maximum depth of the dependency look-ahead
    #[arg(long, value_name = "DEPTH")]
    pub lookahead_depth: Option<usize>,

    /// Load pre-releases before resolving instead of on demand
    #[arg(long)]
    pub eager_prereleases: bool,
}

impl ResolveArgs {
    /// Apply command-line overrides on top of the loaded config.
    pub fn apply_to(&self, config: &mut ImageConfig) {
        if let Some(secs) = self.timeout {
            config.resolve_timeout_secs = (secs > 0).then_some(secs);
        }
        if let Some(depth) = self.lookahead_depth {
            config.max_lookahead_depth = depth;
        }
        if self.eager_prereleases {
            config.eager_prereleases = true;
        }
    }

    /// Load the image and append repositories given on the command line.
    pub fn load_image(&self) -> Result<ImageSpecifier> {
        let mut image = ImageSpecifier::from_file(&self.image)
            .with_context(|| format!("failed to read image {}", self.image.display()))?;
        for location in &self.repositories {
            image = image.with_repository(location.clone());
        }
        Ok(image)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct FailureReport<'a> {
    name: &'a str,
    error: String,
}

/// Run the resolve command.
pub async fn run(args: ResolveArgs) -> Result<ExitCode> {
    let mut config = ImageConfig::load(args.config.as_deref()).context("invalid configuration")?;
    args.apply_to(&mut config);
    config.validate().context("invalid configuration")?;
    debug!(?config, "effective configuration");

    let image = args.load_image()?;
    info!(
        image = %image.name,
        packages = image.packages.len(),
        repositories = image.repositories.len(),
        "resolving image"
    );

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let manager = Arc::new(RepositoryManager::new(&config));
    open_explicit(&manager, &args.repositories)?;
    let builder = ImageBuilder::new(manager, config);
    let outcome = builder.resolve(&image, cancel).await;

    match outcome {
        Ok(resolved) => {
            print_resolved(&resolved, args.json)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(error @ (ImageError::Unresolvable { .. } | ImageError::Cancelled)) => {
            if args.json {
                let report = FailureReport {
                    name: &image.name,
                    error: error.to_string(),
                };
                println!("{}", sonic_rs::to_string_pretty(&report)?);
            } else {
                output::error(&format!("Could not resolve {}: {error}", image.name));
            }
            Ok(ExitCode::from(2))
        }
        Err(error) => Err(error.into()),
    }
}

/// Repositories named on the command line must exist; ones listed in the
/// image file are skipped with a warning when unavailable.
fn open_explicit(manager: &RepositoryManager, locations: &[String]) -> Result<(), ImageError> {
    for location in locations {
        manager.open(location)?;
    }
    Ok(())
}

fn print_resolved(resolved: &ResolvedImage, json: bool) -> Result<()> {
    if json {
        println!("{}", sonic_rs::to_string_pretty(resolved)?);
        return Ok(());
    }

    output::success(&format!(
        "Resolved {} ({} packages, {} iterations)",
        resolved.name,
        resolved.packages.len(),
        resolved.iterations
    ));
    println!("{}", output::package_table(&resolved.packages));
    output::info(&format!("Identifier: {}", resolved.identifier));
    Ok(())
}

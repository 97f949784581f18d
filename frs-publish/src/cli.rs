//! CLI glue for `frs-publish`: argument parsing and the `check` / `upload`
//! commands. Everything with domain meaning lives in `frs-publish-core`.
//!
//! - `check` loads a release descriptor, validates it and prints the plan.
//! - `upload` additionally stages every file over OpenSSH.
//!
//! Call [`run`] with a parsed [`Cli`] from `main` or from tests.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use frs_publish_core::model::FileRelease;
use frs_publish_core::transport::{ArtifactTransport, StagingTarget};
use frs_publish_core::SiteConfig;

use crate::load_config::load_config;
use crate::upload::OpenSshCopy;

/// CLI for frs-publish: publish file releases to a form-driven release service.
#[derive(Parser)]
#[clap(
    name = "frs-publish",
    version,
    about = "Check and stage file releases described in a YAML descriptor"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a release descriptor and print what would be published
    Check {
        /// Path to the YAML release descriptor
        #[clap(long)]
        config: PathBuf,
    },
    /// Stage every file of the release on the remote-copy host
    Upload {
        /// Path to the YAML release descriptor
        #[clap(long)]
        config: PathBuf,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let result = match cli.command {
        Commands::Check { config } => check(config),
        Commands::Upload { config } => upload(config).await,
    };

    let exit_span = tracing::info_span!("exit");
    exit_span.in_scope(|| match &result {
        Ok(()) => tracing::info!("exit"),
        Err(e) => tracing::error!(error = %e, "exit"),
    });
    result
}

fn check(config: PathBuf) -> Result<()> {
    let loaded = load_config(config)?;
    tracing::info!(command = "check", "Release descriptor is valid");
    print_plan(&loaded.release, &loaded.site)
}

async fn upload(config: PathBuf) -> Result<()> {
    let loaded = load_config(config)?;
    print_plan(&loaded.release, &loaded.site)?;
    stage(&loaded.release, &loaded.site).await
}

fn print_plan(release: &FileRelease, site: &SiteConfig) -> Result<()> {
    let coords = release.coordinates()?;
    let target = StagingTarget::for_release(site, &coords);

    println!(
        "Release {} of package {} in project {}",
        coords.release_name, coords.package_name, coords.project_short_name
    );
    println!("Staging: {}@{}:{}", target.credentials.user, target.host, target.directory);
    for spec in release.file_specifications() {
        println!(
            "  {} type={} ({:?}) processor={} ({:?})",
            spec.short_name()?,
            spec.file_type().code(),
            spec.file_type(),
            spec.processor_type().code(),
            spec.processor_type(),
        );
    }
    if let Some(file) = release.change_log_file() {
        println!("  change log: {}", file.display());
    }
    if let Some(file) = release.release_notes_file() {
        println!("  release notes: {}", file.display());
    }
    Ok(())
}

async fn stage(release: &FileRelease, site: &SiteConfig) -> Result<()> {
    let coords = release.coordinates()?;
    let target = StagingTarget::for_release(site, &coords);
    let transport = ArtifactTransport::new(OpenSshCopy::default());

    tracing::info!(command = "upload", host = %target.host, "Staging release files");
    match transport.upload_all(&target, &release.files()).await {
        Ok(()) => {
            println!("Staged {} file(s)", release.files().len());
            Ok(())
        }
        Err(e) => {
            if let frs_publish_core::TransportError::Aggregate(failures) = &e {
                for cause in failures.causes() {
                    eprintln!("  {cause}");
                }
            }
            Err(e.into())
        }
    }
}

//! `load_config`: reads a YAML release descriptor and builds the domain model
//! from it.
//!
//! This is the only place untrusted YAML is parsed. Relative paths are
//! resolved against the descriptor's directory. The administrator password is
//! never read from the file; it comes from `FRS_PASSWORD` (a `.env` file is
//! honoured by `main`).
//!
//! ```yaml
//! project:
//!   short_name: sfutils
//!   name: SourceForge Utilities
//! administrator:
//!   user: alice
//! package:
//!   name: core
//!   hidden: false
//! release:
//!   name: "0.9.1"
//!   release_date: 2024-05-01
//!   change_log_file: CHANGES.txt
//! files:
//!   - path: target/sfutils-0.9.1.tar.gz
//!     file_type: source gzip
//!     processor_type: platform independent
//! site:
//!   staging_host: frs.example.org
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{error, info};

use frs_publish_core::config::SiteConfig;
use frs_publish_core::model::{Administrator, FileRelease, FileSpecification, Package, Project};

pub const PASSWORD_ENV: &str = "FRS_PASSWORD";

#[derive(Debug, Deserialize)]
pub struct ReleaseDescriptor {
    pub project: ProjectSection,
    pub administrator: AdministratorSection,
    pub package: PackageSection,
    pub release: ReleaseSection,
    #[serde(default)]
    pub files: Vec<FileSection>,
    #[serde(default)]
    pub site: Option<SiteConfig>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectSection {
    pub short_name: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdministratorSection {
    pub user: String,
}

#[derive(Debug, Deserialize)]
pub struct PackageSection {
    pub name: String,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReleaseSection {
    pub name: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    #[serde(default = "enabled")]
    pub notify: bool,
    #[serde(default = "enabled")]
    pub preserve_formatted_text: bool,
    #[serde(default)]
    pub change_log: Option<String>,
    #[serde(default)]
    pub change_log_file: Option<PathBuf>,
    #[serde(default)]
    pub release_notes: Option<String>,
    #[serde(default)]
    pub release_notes_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct FileSection {
    pub path: PathBuf,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub processor_type: Option<String>,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
}

fn enabled() -> bool {
    true
}

/// A descriptor turned into a ready-to-publish release.
#[derive(Debug)]
pub struct LoadedRelease {
    pub release: FileRelease,
    pub site: SiteConfig,
}

/// Loads the descriptor at `path` and builds the release it describes.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<LoadedRelease> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading release descriptor");

    let content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to read release descriptor");
        anyhow!("Failed to read release descriptor {:?}: {}", path_ref, e)
    })?;
    let descriptor: ReleaseDescriptor = serde_yaml::from_str(&content).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to parse release descriptor");
        anyhow!("Failed to parse release descriptor YAML: {e}")
    })?;

    let password = std::env::var(PASSWORD_ENV)
        .map_err(|_| anyhow!("{PASSWORD_ENV} must be set to the administrator password"))?;
    let base_dir = path_ref.parent().unwrap_or_else(|| Path::new("."));

    let loaded = build_release(descriptor, &password, base_dir)?;
    info!(
        release = loaded.release.name.as_deref().unwrap_or_default(),
        files = loaded.release.file_specifications().len(),
        "Release descriptor loaded"
    );
    loaded.site.trace_loaded();
    Ok(loaded)
}

/// Maps a parsed descriptor onto the domain model.
pub fn build_release(
    descriptor: ReleaseDescriptor,
    password: &str,
    base_dir: &Path,
) -> Result<LoadedRelease> {
    let ReleaseDescriptor {
        project,
        administrator,
        package,
        release: section,
        files,
        site,
    } = descriptor;

    let admin = Administrator::new(administrator.user, password)?;
    let project_name = project.name.unwrap_or_else(|| project.short_name.clone());
    let project = Project::new(project_name, project.short_name, admin);
    let mut remote_package = Package::new(package.name, project);
    remote_package.hidden = package.hidden;

    let mut release = FileRelease::new(section.name, remote_package);
    release.hidden = section.hidden;
    release.notify_others = section.notify;
    release.preserve_formatted_text = section.preserve_formatted_text;
    release.change_log = section.change_log;
    release.release_notes = section.release_notes;
    if let Some(date) = section.release_date {
        release.release_date = midnight_utc(date);
    }
    release
        .set_change_log_file(section.change_log_file.map(|p| resolve(base_dir, p)))
        .context("invalid change log file")?;
    release
        .set_release_notes_file(section.release_notes_file.map(|p| resolve(base_dir, p)))
        .context("invalid release notes file")?;

    for file in files {
        let path = resolve(base_dir, file.path);
        let mut spec = FileSpecification::new(&path)
            .with_context(|| format!("invalid release file {}", path.display()))?;
        if let Some(name) = file.file_type.as_deref() {
            spec.set_file_type_name(name)?;
        }
        if let Some(name) = file.processor_type.as_deref() {
            spec.set_processor_type_name(name)?;
        }
        spec.set_release_date(file.release_date.map_or(release.release_date, midnight_utc));
        release.add_file_specification(spec)?;
    }

    Ok(LoadedRelease {
        release,
        site: site.unwrap_or_default(),
    })
}

fn resolve(base_dir: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

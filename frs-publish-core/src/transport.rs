//! Artifact transport: stages release files on the remote-copy host before the
//! web forms reference them.
//!
//! One session is opened per call and one tokio task is spawned per file.
//! A failing transfer never cancels its siblings; every failure is collected
//! and reported together once all tasks have joined.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::SiteConfig;
use crate::contract::{Credentials, RemoteCopy, RemoteCopySession};
use crate::error::{FileTransferError, TransportError, UploadFailures};
use crate::model::ReleaseCoordinates;

/// Where and as whom files are staged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingTarget {
    pub host: String,
    pub directory: String,
    pub credentials: Credentials,
}

impl StagingTarget {
    /// The staging directory of a release, logged in as `<user>,<project>`.
    pub fn for_release(site: &SiteConfig, coords: &ReleaseCoordinates) -> Self {
        Self {
            host: site.staging_host.clone(),
            directory: site.staging_dir(
                &coords.project_short_name,
                &coords.package_name,
                &coords.release_name,
            ),
            credentials: Credentials {
                user: format!("{},{}", coords.user, coords.project_short_name.to_lowercase()),
                password: coords.password.clone(),
            },
        }
    }

    pub fn remote_path(&self, local: &Path) -> String {
        let name = local
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{}/{}", self.directory.trim_end_matches('/'), name)
    }
}

pub struct ArtifactTransport<C> {
    channel: C,
}

impl<C> ArtifactTransport<C>
where
    C: RemoteCopy,
{
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    /// Transfers every file concurrently and waits for all of them.
    ///
    /// Returns [`TransportError::Aggregate`] carrying one cause per failed
    /// file when any transfer fails. The session is closed on every path.
    pub async fn upload_all(
        &self,
        target: &StagingTarget,
        files: &[PathBuf],
    ) -> Result<(), TransportError> {
        if files.is_empty() {
            info!("[UPLOAD] No files to stage");
            return Ok(());
        }

        info!(
            host = %target.host,
            dir = %target.directory,
            files = files.len(),
            "[UPLOAD] Opening remote-copy session"
        );
        let session: Arc<dyn RemoteCopySession> = Arc::from(
            self.channel
                .connect(&target.host, &target.credentials)
                .await
                .map_err(|source| {
                    error!(error = ?source, host = %target.host, "[UPLOAD][ERROR] Connect failed");
                    TransportError::Connect {
                        host: target.host.clone(),
                        source,
                    }
                })?,
        );

        let result = transfer_all(Arc::clone(&session), target, files).await;

        if let Err(e) = session.close().await {
            warn!(error = ?e, host = %target.host, "[UPLOAD] Failed to close remote-copy session");
        }
        result
    }
}

async fn transfer_all(
    session: Arc<dyn RemoteCopySession>,
    target: &StagingTarget,
    files: &[PathBuf],
) -> Result<(), TransportError> {
    session
        .make_directories(&target.directory)
        .await
        .map_err(|source| TransportError::MakeDirectories {
            path: target.directory.clone(),
            source,
        })?;

    let errors: Arc<Mutex<Vec<FileTransferError>>> = Arc::default();

    let tasks = files.iter().map(|file| {
        let session = Arc::clone(&session);
        let errors = Arc::clone(&errors);
        let local = file.clone();
        let remote = target.remote_path(file);
        tokio::spawn(async move {
            match session.put(&local, &remote).await {
                Ok(()) => {
                    info!(file = %local.display(), remote = %remote, "[UPLOAD] Transfer succeeded");
                }
                Err(e) => {
                    error!(file = %local.display(), error = ?e, "[UPLOAD][ERROR] Transfer failed");
                    errors.lock().await.push(FileTransferError {
                        file: local,
                        reason: e.to_string(),
                        source: Some(e),
                    });
                }
            }
        })
    });
    let outcomes = join_all(tasks.collect::<Vec<_>>()).await;

    let mut causes = std::mem::take(&mut *errors.lock().await);
    for (file, outcome) in files.iter().zip(outcomes) {
        if let Err(join_error) = outcome {
            error!(file = %file.display(), error = ?join_error, "[UPLOAD][ERROR] Transfer task aborted");
            causes.push(FileTransferError {
                file: file.clone(),
                reason: format!("transfer task aborted: {join_error}"),
                source: None,
            });
        }
    }

    if causes.is_empty() {
        info!(files = files.len(), "[UPLOAD] All files staged");
        Ok(())
    } else {
        Err(UploadFailures {
            attempted: files.len(),
            causes,
        }
        .into())
    }
}

//! [`WebPublisher`]: the [`Publisher`] that stages files over a remote-copy
//! channel and then reconciles the release through the service's web forms.
//!
//! Order of a run:
//! 1. check the release is fully linked (names, administrator, at least one file)
//! 2. log in, so bad credentials stop the run before anything is staged
//! 3. stage every file with [`ArtifactTransport::upload_all`]
//! 4. run the remaining [`Synchroniser`] steps
//!
//! The navigator is closed on every exit path.

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::config::SiteConfig;
use crate::contract::{PageNavigator, Publisher, RemoteCopy};
use crate::error::PublishError;
use crate::model::FileRelease;
use crate::synchronise::{SyncState, Synchroniser};
use crate::transport::{ArtifactTransport, StagingTarget};

/// Result of one publish run with the engine's trail, for callers that want
/// more than the bare `Result`.
#[derive(Debug)]
pub struct PublishOutcome {
    pub result: Result<(), PublishError>,
    pub state: SyncState,
    pub history: Vec<SyncState>,
    pub submissions: usize,
}

pub struct WebPublisher<N, C> {
    navigator: N,
    transport: ArtifactTransport<C>,
    site: SiteConfig,
}

impl<N, C> WebPublisher<N, C>
where
    N: PageNavigator,
    C: RemoteCopy,
{
    pub fn new(navigator: N, channel: C, site: SiteConfig) -> Self {
        Self {
            navigator,
            transport: ArtifactTransport::new(channel),
            site,
        }
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub async fn publish_with_outcome(&self, release: &mut FileRelease) -> PublishOutcome {
        info!(
            release = release.name.as_deref().unwrap_or_default(),
            files = release.file_specifications().len(),
            "[PUBLISH] Starting publish run"
        );
        let mut engine = Synchroniser::new(&self.navigator, &self.site);
        let result = self.drive(&mut engine, release).await;

        if let Err(e) = self.navigator.close().await {
            warn!(error = ?e, "[PUBLISH] Failed to close navigator session");
        }
        match &result {
            Ok(()) => info!(submissions = engine.submissions(), "[PUBLISH] Release published"),
            Err(e) => error!(error = %e, state = ?engine.state(), "[PUBLISH][ERROR] Publish failed"),
        }

        PublishOutcome {
            result,
            state: engine.state(),
            history: engine.history().to_vec(),
            submissions: engine.submissions(),
        }
    }

    async fn drive(
        &self,
        engine: &mut Synchroniser<'_, N>,
        release: &mut FileRelease,
    ) -> Result<(), PublishError> {
        let prepared = release.coordinates().and_then(|coords| {
            let files = release.files();
            if files.is_empty() {
                return Err(PublishError::Configuration(
                    "release has no file specifications".into(),
                ));
            }
            Ok((coords, files))
        });
        let (coords, files) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                engine.record_failure(&e);
                return Err(e);
            }
        };

        engine.authenticate(&coords).await?;

        let target = StagingTarget::for_release(&self.site, &coords);
        if let Err(e) = self.transport.upload_all(&target, &files).await {
            let e = PublishError::from(e);
            engine.record_failure(&e);
            return Err(e);
        }

        engine.synchronise_release(release).await
    }
}

#[async_trait]
impl<N, C> Publisher for WebPublisher<N, C>
where
    N: PageNavigator,
    C: RemoteCopy,
{
    async fn publish(&self, release: &mut FileRelease) -> Result<(), PublishError> {
        self.publish_with_outcome(release).await.result
    }
}

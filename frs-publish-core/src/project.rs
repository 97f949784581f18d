//! Lookup of a project's remote id from its public summary page.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::config::SiteConfig;
use crate::contract::{Page, PageNavigator};
use crate::error::PublishError;
use crate::synchronise::SyncStep;

const VIEW_MEMBERS_LINK: &str = "[View Members]";
const INVALID_PROJECT_MARKER: &str = "Invalid Project";

/// Caller-scoped cache of `short name -> project id`.
///
/// Owned by whoever drives a run, so separate runs never share state.
#[derive(Debug, Default, Clone)]
pub struct ProjectDirectory {
    ids: HashMap<String, String>,
}

impl ProjectDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached(&self, short_name: &str) -> Option<&str> {
        self.ids.get(short_name).map(String::as_str)
    }

    pub fn remember(&mut self, short_name: impl Into<String>, id: impl Into<String>) {
        self.ids.insert(short_name.into(), id.into());
    }

    /// Returns the project id, fetching the summary page on a cache miss.
    pub async fn project_id<N>(
        &mut self,
        navigator: &N,
        site: &SiteConfig,
        short_name: &str,
    ) -> Result<String, PublishError>
    where
        N: PageNavigator + ?Sized,
    {
        if let Some(id) = self.cached(short_name) {
            debug!(project = short_name, id, "Project id cache hit");
            return Ok(id.to_string());
        }
        let url = site.project_url(short_name);
        let page = navigator
            .fetch(&url)
            .await
            .map_err(|source| PublishError::Navigator {
                step: SyncStep::LookupProject,
                source,
            })?;
        let id = project_id_from_summary(&page, short_name)?;
        info!(project = short_name, id = %id, "Resolved project id");
        self.remember(short_name, id.clone());
        Ok(id)
    }
}

/// Extracts `group_id` from the "[View Members]" link of a summary page.
pub fn project_id_from_summary(page: &Page, short_name: &str) -> Result<String, PublishError> {
    let Some(link) = page
        .find_links(|l| l.text.trim() == VIEW_MEMBERS_LINK)
        .into_iter()
        .next()
    else {
        if page.contains_text(INVALID_PROJECT_MARKER) {
            return Err(PublishError::NoSuchProject(short_name.to_string()));
        }
        return Err(PublishError::structural(
            SyncStep::LookupProject,
            format!("a {VIEW_MEMBERS_LINK} link on {}", page.url),
        ));
    };
    group_id_param(&link.url).ok_or_else(|| {
        PublishError::structural(
            SyncStep::LookupProject,
            format!("a group_id parameter in {}", link.url),
        )
    })
}

static GROUP_ID_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]group_id=([^&#]+)").expect("group_id pattern compiles"));

fn group_id_param(url: &str) -> Option<String> {
    GROUP_ID_PARAM.captures(url).map(|c| c[1].to_string())
}

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::error::NavigatorError;

/// Addresses of the release service. `Default` targets the public service;
/// tests and mirrors override individual fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Page carrying the login form.
    pub login_url: String,
    /// `action` of the login form on that page.
    pub login_action: String,
    /// Prefix of project summary pages; the short name and `/` are appended.
    pub project_url_prefix: String,
    /// Base the admin pages (`editpackages.php`, `editreleases.php`, ...) hang off.
    pub admin_base_url: String,
    /// Host of the remote-copy channel.
    pub staging_host: String,
    /// Root of the staging tree on that host.
    pub staging_root: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            login_url: "https://sourceforge.net/account/login.php".to_string(),
            login_action: "https://sourceforge.net/account/login.php".to_string(),
            project_url_prefix: "https://sourceforge.net/projects/".to_string(),
            admin_base_url: "https://sourceforge.net/project/admin/".to_string(),
            staging_host: "frs.sourceforge.net".to_string(),
            staging_root: "/home/frs/project".to_string(),
        }
    }
}

impl SiteConfig {
    pub fn trace_loaded(&self) {
        info!(
            login_url = %self.login_url,
            staging_host = %self.staging_host,
            "Loaded SiteConfig"
        );
        debug!(?self, "SiteConfig loaded (full debug)");
    }

    pub fn project_url(&self, short_name: &str) -> String {
        format!("{}{}/", self.project_url_prefix, short_name)
    }

    /// Resolves an admin page path such as `editpackages.php?group_id=1`.
    pub fn admin_url(&self, relative: &str) -> Result<String, NavigatorError> {
        Ok(Url::parse(&self.admin_base_url)?.join(relative)?.to_string())
    }

    /// Staging directory for one release:
    /// `<root>/<p>/<pr>/<project>/<package>/<release>`.
    pub fn staging_dir(&self, project_short_name: &str, package: &str, release: &str) -> String {
        let project = project_short_name.to_lowercase();
        let first: String = project.chars().take(1).collect();
        let first_two: String = project.chars().take(2).collect();
        format!(
            "{}/{}/{}/{}/{}/{}",
            self.staging_root.trim_end_matches('/'),
            first,
            first_two,
            project,
            package.to_lowercase(),
            release
        )
    }
}

//! Synchronisation engine: drives the release service's admin pages until the
//! remote package and release match a local [`FileRelease`].
//!
//! The engine is a small state machine:
//!
//! ```text
//! LoggedOut → Authenticated → PackageResolved → ReleaseResolved → AttributesSaved
//!           → FilesAttached → FileMetadataSet → Notified → Done
//! ```
//!
//! with `Failed(reason)` reachable from every state. Each step depends on the
//! page produced by the previous submission, so everything runs sequentially
//! on one [`PageNavigator`] session. Nothing is retried: the first missing
//! form, link or table ends the run with a [`PublishError::Structural`] naming
//! the step and the element.
//!
//! Files are referenced by base name only; they must already have been staged
//! by [`crate::transport`].
//!
//! # Navigation
//! - Entry points: [`Synchroniser::authenticate`] then
//!   [`Synchroniser::synchronise_release`]
//! - Individual steps are public so they can be driven one at a time against
//!   fake pages.

use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, error, info, warn};

use crate::config::SiteConfig;
use crate::contract::{Form, Link, Page, PageNavigator, Table};
use crate::error::PublishError;
use crate::model::{FileRelease, ReleaseCoordinates};
use crate::project::ProjectDirectory;

const INVALID_CREDENTIALS_MARKER: &str = "Invalid Password or User Name";
const LOGIN_NAME: &str = "form_loginname";
const LOGIN_PASSWORD: &str = "form_pw";

const EDIT_PACKAGES_ACTION: &str = "/project/admin/editpackages.php";
const EDIT_RELEASES_ACTION: &str = "/project/admin/editreleases.php";
const NEW_RELEASE_ACTION: &str = "/project/admin/newrelease.php";

const PACKAGE_ACTION: &str = "func";
const UPDATE_PACKAGE: &str = "update_package";
const ADD_PACKAGE: &str = "add_package";
const PACKAGE_NAME: &str = "package_name";
const PACKAGE_ID: &str = "package_id";
const GROUP_ID: &str = "group_id";
const STATUS: &str = "status_id";
const VISIBLE: &str = "1";
const HIDDEN: &str = "3";
const ON: &str = "1";

const RELEASES_TITLE: &str = "FRS: Releases";
const NO_RELEASES_MARKER: &str = "You Have No Releases Of This Package Defined";
const RELEASE_TABLE_PREFIX: &str = "Release Name";
const EDIT_RELEASE_LINK: &str = "[Edit This Release]";
const RELEASE_NAME: &str = "release_name";

const RELEASE_DATE: &str = "release_date";
const RELEASE_DATE_FORMAT: &str = "%Y-%m-%d";
const UPLOAD_CHANGE_LOG: &str = "uploaded_changes";
const UPLOAD_RELEASE_NOTES: &str = "uploaded_notes";
const CHANGE_LOG: &str = "release_changes";
const RELEASE_NOTES: &str = "release_notes";
const PRESERVE_FORMATTED_TEXT: &str = "preformatted";

const EDIT_RELEASE_STEP: u8 = 1;
const ADD_FILES_STEP: u8 = 2;
const NOTIFY_OTHERS_STEP: u8 = 4;
const FILE_LIST: &str = "file_list[]";

const FILE_TABLE_PREFIX: &str = "Filename";
const CONFIRM_DELETE: &str = "im_sure";
const PROCESSOR_ID: &str = "processor_id";
const TYPE_ID: &str = "type_id";
// Each attached file spans this many rows of the "Filename" table; the
// confirmation form closes a file's block.
const FILE_TABLE_ROW_STRIDE: usize = 3;

/// The step a failure happened in, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStep {
    Authenticate,
    LookupProject,
    ResolvePackage,
    ReconcileVisibility,
    ResolveRelease,
    SaveAttributes,
    AttachFiles,
    SetFileMetadata,
    Notify,
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Authenticate => "authenticate",
            Self::LookupProject => "look up project",
            Self::ResolvePackage => "resolve package",
            Self::ReconcileVisibility => "reconcile package visibility",
            Self::ResolveRelease => "resolve release",
            Self::SaveAttributes => "save release attributes",
            Self::AttachFiles => "attach files",
            Self::SetFileMetadata => "set file metadata",
            Self::Notify => "notify",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    InvalidCredentials,
    NoSuchProject,
    AmbiguousOrMissingForm,
    MissingElement(SyncStep),
    Navigation(SyncStep),
    Transport,
    Configuration,
}

impl From<&PublishError> for FailureReason {
    fn from(e: &PublishError) -> Self {
        match e {
            PublishError::InvalidCredentials { .. } => Self::InvalidCredentials,
            PublishError::NoSuchProject(_) => Self::NoSuchProject,
            PublishError::Structural {
                step: SyncStep::ResolvePackage,
                ..
            } => Self::AmbiguousOrMissingForm,
            PublishError::Structural { step, .. } => Self::MissingElement(*step),
            PublishError::Navigator { step, .. } => Self::Navigation(*step),
            PublishError::Transport(_) => Self::Transport,
            PublishError::Configuration(_) | PublishError::Validation(_) => Self::Configuration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    LoggedOut,
    Authenticated,
    PackageResolved,
    ReleaseResolved,
    AttributesSaved,
    FilesAttached,
    FileMetadataSet,
    Notified,
    Done,
    Failed(FailureReason),
}

/// The package form the engine settled on, with the ids read from it.
#[derive(Debug, Clone)]
pub struct ResolvedPackage {
    pub form: Form,
    pub package_id: String,
    pub group_id: String,
    /// Packages page after resolution (and any visibility change).
    pub page: Page,
    pub created: bool,
    pub visibility_changed: bool,
}

pub struct Synchroniser<'a, N: ?Sized> {
    navigator: &'a N,
    site: &'a SiteConfig,
    directory: ProjectDirectory,
    state: SyncState,
    history: Vec<SyncState>,
    submissions: usize,
}

impl<'a, N> Synchroniser<'a, N>
where
    N: PageNavigator + ?Sized,
{
    pub fn new(navigator: &'a N, site: &'a SiteConfig) -> Self {
        Self::with_directory(navigator, site, ProjectDirectory::new())
    }

    /// Starts with ids already resolved by the caller in an earlier run.
    pub fn with_directory(navigator: &'a N, site: &'a SiteConfig, directory: ProjectDirectory) -> Self {
        Self {
            navigator,
            site,
            directory,
            state: SyncState::LoggedOut,
            history: vec![SyncState::LoggedOut],
            submissions: 0,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Every state entered so far, starting with `LoggedOut`.
    pub fn history(&self) -> &[SyncState] {
        &self.history
    }

    /// Number of forms submitted so far.
    pub fn submissions(&self) -> usize {
        self.submissions
    }

    pub fn directory(&self) -> &ProjectDirectory {
        &self.directory
    }

    pub fn into_directory(self) -> ProjectDirectory {
        self.directory
    }

    /// Marks the run failed because of an error raised outside the engine
    /// (for example by the artifact transport).
    pub fn record_failure(&mut self, err: &PublishError) {
        self.enter(SyncState::Failed(FailureReason::from(err)));
    }

    fn enter(&mut self, state: SyncState) {
        match state {
            SyncState::Failed(reason) => {
                error!(from = ?self.state, ?reason, "[SYNC][ERROR] Synchronisation failed")
            }
            _ => info!(from = ?self.state, to = ?state, "[SYNC] State transition"),
        }
        self.state = state;
        self.history.push(state);
    }

    fn settle<T>(
        &mut self,
        result: Result<T, PublishError>,
        next: SyncState,
    ) -> Result<T, PublishError> {
        match result {
            Ok(value) => {
                self.enter(next);
                Ok(value)
            }
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    async fn fetch(&self, step: SyncStep, url: &str) -> Result<Page, PublishError> {
        debug!(%step, url, "[SYNC] Fetching page");
        let page = self
            .navigator
            .fetch(url)
            .await
            .map_err(|source| PublishError::Navigator { step, source })?;
        debug!(%step, title = %page.title, "[SYNC] Retrieved page");
        Ok(page)
    }

    async fn follow(&self, step: SyncStep, link: &Link) -> Result<Page, PublishError> {
        debug!(%step, text = %link.text, url = %link.url, "[SYNC] Following link");
        self.navigator
            .follow(link)
            .await
            .map_err(|source| PublishError::Navigator { step, source })
    }

    async fn submit(&mut self, step: SyncStep, form: &Form) -> Result<Page, PublishError> {
        if step != SyncStep::Authenticate {
            match serde_json::to_string_pretty(form) {
                Ok(json) => debug!(%step, form = %json, "[SYNC] Submitting form"),
                Err(e) => warn!(%step, error = ?e, "[SYNC] Failed to serialize form for logging"),
            }
        }
        self.submissions += 1;
        self.navigator
            .submit(form)
            .await
            .map_err(|source| PublishError::Navigator { step, source })
    }

    /// Logs in. A response carrying the invalid-credentials marker ends the
    /// run in `Failed(InvalidCredentials)`.
    pub async fn authenticate(&mut self, coords: &ReleaseCoordinates) -> Result<Page, PublishError> {
        let result = self.login(coords).await;
        self.settle(result, SyncState::Authenticated)
    }

    async fn login(&mut self, coords: &ReleaseCoordinates) -> Result<Page, PublishError> {
        let step = SyncStep::Authenticate;
        let login_page = self.fetch(step, &self.site.login_url).await?;
        let mut form = login_page
            .find_forms(|f| f.action == self.site.login_action)
            .into_iter()
            .next()
            .ok_or_else(|| {
                PublishError::structural(step, format!("a login form posting to {}", self.site.login_action))
            })?;
        form.set_field(LOGIN_NAME, coords.user.as_str());
        form.set_field(LOGIN_PASSWORD, coords.password.as_str());

        let response = self.submit(step, &form).await?;
        if response.contains_text(INVALID_CREDENTIALS_MARKER) {
            warn!(user = %coords.user, "[SYNC] Login rejected");
            return Err(PublishError::InvalidCredentials {
                user: coords.user.clone(),
            });
        }
        info!(user = %coords.user, title = %response.title, "[SYNC] Logged in");
        Ok(response)
    }

    /// Runs every step after authentication, ending in `Done`.
    pub async fn synchronise_release(&mut self, release: &mut FileRelease) -> Result<(), PublishError> {
        if self.state != SyncState::Authenticated {
            let err = PublishError::Configuration(format!(
                "synchronisation must start from an authenticated session, not {:?}",
                self.state
            ));
            self.record_failure(&err);
            return Err(err);
        }

        let resolved = self.resolve_package(release).await?;
        let page = self
            .resolve_release(release, &resolved.package_id, &resolved.group_id)
            .await?;
        let page = self.save_attributes(&page, release).await?;
        let page = self.attach_files(&page, release).await?;
        let page = self.set_file_metadata(&page, release).await?;
        self.notify(&page, release).await?;

        self.enter(SyncState::Done);
        info!(
            release = release.name.as_deref().unwrap_or_default(),
            submissions = self.submissions,
            "[SYNC] Release synchronised"
        );
        Ok(())
    }

    /// Finds the package's update form, creating the package first if it does
    /// not exist, then reconciles its visibility and records the remote ids on
    /// the package and project.
    ///
    /// At most one package is created per call.
    pub async fn resolve_package(
        &mut self,
        release: &mut FileRelease,
    ) -> Result<ResolvedPackage, PublishError> {
        let result = self.locate_package(release).await;
        self.settle(result, SyncState::PackageResolved)
    }

    async fn locate_package(
        &mut self,
        release: &mut FileRelease,
    ) -> Result<ResolvedPackage, PublishError> {
        let step = SyncStep::ResolvePackage;
        let coords = release.coordinates()?;
        let package_name = coords.package_name.as_str();

        let project_id = self
            .directory
            .project_id(self.navigator, self.site, &coords.project_short_name)
            .await?;
        let url = self
            .site
            .admin_url(&format!("editpackages.php?group_id={project_id}"))
            .map_err(|source| PublishError::Navigator { step, source })?;
        let mut page = self.fetch(step, &url).await?;

        let mut created = false;
        let form = loop {
            let forms = page.find_forms(|f| f.action == EDIT_PACKAGES_ACTION);
            if forms.is_empty() {
                return Err(PublishError::structural(
                    step,
                    format!("a form posting to {EDIT_PACKAGES_ACTION} on {}", page.url),
                ));
            }
            if let Some(form) = forms.iter().find(|f| is_update_form_for(f, package_name)) {
                break form.clone();
            }
            if created {
                return Err(PublishError::structural(
                    step,
                    format!("an update form for package {package_name} after creating it"),
                ));
            }
            let add_form = if forms.len() == 1 {
                forms.into_iter().next()
            } else {
                forms.into_iter().find(is_add_form)
            }
            .ok_or_else(|| PublishError::structural(step, "a single add-package form"))?;

            info!(package = package_name, "[SYNC] Package not found; creating it");
            page = self.create_package(add_form, package_name).await?;
            created = true;
        };

        let hidden = release.package.as_ref().is_some_and(|p| p.hidden);
        let visibility_page = self.reconcile_visibility(&form, package_name, hidden).await?;
        let visibility_changed = visibility_page.is_some();
        if let Some(refreshed) = visibility_page {
            page = refreshed;
        }

        let package_id = required_field(&form, PACKAGE_ID, step)?;
        let group_id = required_field(&form, GROUP_ID, step)?;
        if let Some(package) = release.package.as_mut() {
            package.id = Some(package_id.clone());
        }
        if let Some(project) = release.project_mut() {
            project.id = Some(group_id.clone());
        }
        self.directory
            .remember(coords.project_short_name.as_str(), group_id.as_str());
        info!(
            package = package_name,
            package_id = %package_id,
            group_id = %group_id,
            created,
            "[SYNC] Package resolved"
        );

        Ok(ResolvedPackage {
            form,
            package_id,
            group_id,
            page,
            created,
            visibility_changed,
        })
    }

    async fn create_package(&mut self, mut form: Form, package_name: &str) -> Result<Page, PublishError> {
        if form.action != EDIT_PACKAGES_ACTION || !is_add_form(&form) {
            return Err(PublishError::structural(
                SyncStep::ResolvePackage,
                format!("an add-package form, found one posting to {}", form.action),
            ));
        }
        form.set_field(PACKAGE_NAME, package_name);
        self.submit(SyncStep::ResolvePackage, &form).await
    }

    /// Flips the form's status field when it disagrees with `hidden` and
    /// submits it. Returns `None`, without submitting, when they already agree.
    pub async fn reconcile_visibility(
        &mut self,
        form: &Form,
        name: &str,
        hidden: bool,
    ) -> Result<Option<Page>, PublishError> {
        let step = SyncStep::ReconcileVisibility;
        let status = required_field(form, STATUS, step)?;
        let wanted = match (status.as_str(), hidden) {
            (VISIBLE, true) => HIDDEN,
            (HIDDEN, false) => VISIBLE,
            _ => {
                debug!(name, status = %status, hidden, "[SYNC] Visibility already consistent");
                return Ok(None);
            }
        };
        let mut form = form.clone();
        form.set_field(STATUS, wanted);
        info!(name, hidden, "[SYNC] Changing visibility");
        self.submit(step, &form).await.map(Some)
    }

    /// Follows the release's edit link from the releases listing, or creates
    /// the release when it is not listed. Either way returns the edit page.
    pub async fn resolve_release(
        &mut self,
        release: &FileRelease,
        package_id: &str,
        group_id: &str,
    ) -> Result<Page, PublishError> {
        let result = self.open_release(release, package_id, group_id).await;
        self.settle(result, SyncState::ReleaseResolved)
    }

    async fn open_release(
        &mut self,
        release: &FileRelease,
        package_id: &str,
        group_id: &str,
    ) -> Result<Page, PublishError> {
        let step = SyncStep::ResolveRelease;
        let release_name = release
            .name
            .as_deref()
            .ok_or_else(|| PublishError::Configuration("release name is not set".into()))?;
        let query = format!("package_id={package_id}&group_id={group_id}");

        let url = self
            .site
            .admin_url(&format!("editreleases.php?{query}"))
            .map_err(|source| PublishError::Navigator { step, source })?;
        let listing = self.fetch(step, &url).await?;
        if is_releases_page(&listing) {
            if let Some(link) = edit_release_link(&listing, release_name)? {
                info!(release = release_name, "[SYNC] Release exists; opening it");
                return self.follow(step, &link).await;
            }
        }

        info!(release = release_name, "[SYNC] Release not found; creating it");
        let url = self
            .site
            .admin_url(&format!("newrelease.php?{query}"))
            .map_err(|source| PublishError::Navigator { step, source })?;
        let create_page = self.fetch(step, &url).await?;
        let mut form = create_page
            .find_forms(|f| f.action == NEW_RELEASE_ACTION)
            .into_iter()
            .next()
            .ok_or_else(|| {
                PublishError::structural(step, format!("a form posting to {NEW_RELEASE_ACTION}"))
            })?;
        form.set_field(RELEASE_NAME, release_name);
        form.set_field(PACKAGE_ID, package_id);
        form.set_field(GROUP_ID, group_id);
        self.submit(step, &form).await
    }

    /// Step 1 of the edit page: date, visibility, formatting flag, and either
    /// the change log / release notes files or their inline text.
    pub async fn save_attributes(
        &mut self,
        page: &Page,
        release: &FileRelease,
    ) -> Result<Page, PublishError> {
        let result = self.fill_attributes(page, release).await;
        self.settle(result, SyncState::AttributesSaved)
    }

    async fn fill_attributes(&mut self, page: &Page, release: &FileRelease) -> Result<Page, PublishError> {
        let step = SyncStep::SaveAttributes;
        let mut form = require_step_form(page, EDIT_RELEASE_STEP, step)?;

        form.set_field(RELEASE_DATE, format_release_date(release));
        form.set_field(STATUS, if release.hidden { HIDDEN } else { VISIBLE });
        if release.preserve_formatted_text {
            form.set_field(PRESERVE_FORMATTED_TEXT, ON);
        } else {
            form.remove_field(PRESERVE_FORMATTED_TEXT);
        }

        match (release.change_log_file(), release.change_log.as_deref()) {
            (Some(file), _) => form.attach_file(UPLOAD_CHANGE_LOG, file),
            (None, Some(text)) => form.set_field(CHANGE_LOG, text),
            (None, None) => {}
        }
        match (release.release_notes_file(), release.release_notes.as_deref()) {
            (Some(file), _) => form.attach_file(UPLOAD_RELEASE_NOTES, file),
            (None, Some(text)) => form.set_field(RELEASE_NOTES, text),
            (None, None) => {}
        }

        self.submit(step, &form).await
    }

    /// Step 2: refresh the file list, then tick every staged file of the release.
    pub async fn attach_files(
        &mut self,
        page: &Page,
        release: &FileRelease,
    ) -> Result<Page, PublishError> {
        let result = self.select_files(page, release).await;
        self.settle(result, SyncState::FilesAttached)
    }

    async fn select_files(&mut self, page: &Page, release: &FileRelease) -> Result<Page, PublishError> {
        let step = SyncStep::AttachFiles;
        let names: BTreeSet<String> = release.short_file_names().into_iter().collect();
        if names.is_empty() {
            return Err(PublishError::Configuration(
                "release has no file specifications".into(),
            ));
        }

        let form = require_step_form(page, ADD_FILES_STEP, step)?;
        let refreshed = self.submit(step, &form).await?;

        let mut form = require_step_form(&refreshed, ADD_FILES_STEP, step)?;
        info!(files = ?names, "[SYNC] Selecting staged files");
        form.set_values(FILE_LIST, names.into_iter().collect());
        self.submit(step, &form).await
    }

    /// Step 3: for each attached file, set processor and file type codes.
    ///
    /// Forms and the "Filename" table are paired positionally: rows advance by
    /// a fixed stride at each confirmation form. Both are re-read after every
    /// submission. A row naming a file this release does not know, or a row
    /// missing where the stride says one should be, is a structural error.
    pub async fn set_file_metadata(
        &mut self,
        page: &Page,
        release: &FileRelease,
    ) -> Result<Page, PublishError> {
        let result = self.edit_files(page, release).await;
        self.settle(result, SyncState::FileMetadataSet)
    }

    async fn edit_files(&mut self, page: &Page, release: &FileRelease) -> Result<Page, PublishError> {
        let step = SyncStep::SetFileMetadata;
        let mut current = page.clone();
        let mut forms = edit_release_forms(&current);
        if forms.len() < 2 {
            return Err(PublishError::structural(
                step,
                format!("at least two forms posting to {EDIT_RELEASES_ACTION}"),
            ));
        }
        if forms.len() == 2 {
            debug!("[SYNC] No attached files to describe");
            return Ok(current);
        }
        let mut table = require_file_table(&current, step)?;

        let mut form_index = 2;
        let mut row = 1;
        while form_index < forms.len() {
            let form = forms[form_index].clone();
            if form.has_field(CONFIRM_DELETE) {
                row += FILE_TABLE_ROW_STRIDE;
            } else if form.has_field(PROCESSOR_ID) && form.has_field(TYPE_ID) {
                let title = table
                    .cell_text(row, 0)
                    .map(str::trim)
                    .ok_or_else(|| {
                        PublishError::structural(
                            step,
                            format!("a file name in row {row} of the {FILE_TABLE_PREFIX} table"),
                        )
                    })?
                    .to_string();
                let spec = release.file_specification(&title).ok_or_else(|| {
                    PublishError::structural(
                        step,
                        format!("a local file specification for attached file {title}"),
                    )
                })?;
                let mut form = form;
                form.set_field(PROCESSOR_ID, spec.processor_type().code().to_string());
                form.set_field(TYPE_ID, spec.file_type().code().to_string());
                info!(
                    file = %title,
                    processor = ?spec.processor_type(),
                    file_type = ?spec.file_type(),
                    "[SYNC] Setting file metadata"
                );
                current = self.submit(step, &form).await?;
                forms = edit_release_forms(&current);
                if forms.is_empty() {
                    return Err(PublishError::structural(
                        step,
                        format!("forms posting to {EDIT_RELEASES_ACTION} after editing {title}"),
                    ));
                }
                table = require_file_table(&current, step)?;
            }
            form_index += 1;
        }
        Ok(current)
    }

    /// Step 4: submit the notification form unchanged, if requested.
    pub async fn notify(&mut self, page: &Page, release: &FileRelease) -> Result<Page, PublishError> {
        let result = self.send_notification(page, release).await;
        self.settle(result, SyncState::Notified)
    }

    async fn send_notification(&mut self, page: &Page, release: &FileRelease) -> Result<Page, PublishError> {
        if !release.notify_others {
            debug!("[SYNC] Notification not requested");
            return Ok(page.clone());
        }
        let step = SyncStep::Notify;
        let form = require_step_form(page, NOTIFY_OTHERS_STEP, step)?;
        self.submit(step, &form).await
    }
}

fn required_field(form: &Form, name: &str, step: SyncStep) -> Result<String, PublishError> {
    form.field_value(name)
        .map(str::to_string)
        .ok_or_else(|| PublishError::structural(step, format!("a {name} field on the form posting to {}", form.action)))
}

fn is_add_form(form: &Form) -> bool {
    form.field_value(PACKAGE_ACTION) == Some(ADD_PACKAGE)
}

fn is_update_form_for(form: &Form, package_name: &str) -> bool {
    form.field_value(PACKAGE_ACTION) == Some(UPDATE_PACKAGE)
        && form.field_value(PACKAGE_NAME) == Some(package_name)
}

fn is_releases_page(page: &Page) -> bool {
    page.title.contains(RELEASES_TITLE) && !page.contains_text(NO_RELEASES_MARKER)
}

/// The "[Edit This Release]" link of the row whose name equals `release_name`.
fn edit_release_link(page: &Page, release_name: &str) -> Result<Option<Link>, PublishError> {
    let table = page
        .find_table(|t| t.starts_with(RELEASE_TABLE_PREFIX))
        .ok_or_else(|| {
            PublishError::structural(
                SyncStep::ResolveRelease,
                format!("a table starting with {RELEASE_TABLE_PREFIX:?}"),
            )
        })?;
    let link = (1..table.row_count())
        .filter_map(|row| table.cell(row, 0))
        .find(|cell| match cell.text.find(EDIT_RELEASE_LINK) {
            Some(idx) if idx > 0 => cell.text[..idx].trim() == release_name,
            _ => false,
        })
        .and_then(|cell| {
            cell.links
                .iter()
                .find(|l| l.text.trim() == EDIT_RELEASE_LINK)
                .cloned()
        });
    Ok(link)
}

fn edit_release_forms(page: &Page) -> Vec<Form> {
    page.find_forms(|f| f.action == EDIT_RELEASES_ACTION)
}

fn step_form(page: &Page, step: u8) -> Option<Form> {
    let marker = format!("step{step}");
    page.find_forms(|f| f.action == EDIT_RELEASES_ACTION && f.has_field(&marker))
        .into_iter()
        .next()
}

fn require_step_form(page: &Page, n: u8, step: SyncStep) -> Result<Form, PublishError> {
    step_form(page, n).ok_or_else(|| {
        PublishError::structural(step, format!("the step {n} form posting to {EDIT_RELEASES_ACTION}"))
    })
}

fn require_file_table(page: &Page, step: SyncStep) -> Result<Table, PublishError> {
    page.find_table(|t| t.starts_with(FILE_TABLE_PREFIX))
        .cloned()
        .ok_or_else(|| {
            PublishError::structural(step, format!("a table starting with {FILE_TABLE_PREFIX:?}"))
        })
}

/// The release date as the edit form expects it (`yyyy-MM-dd`).
pub fn format_release_date(release: &FileRelease) -> String {
    release.release_date.format(RELEASE_DATE_FORMAT).to_string()
}

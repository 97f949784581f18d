#![allow(dead_code)]

//! An in-memory release service that renders the admin pages the engine
//! drives, plus a recording remote-copy channel.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use url::Url;

use frs_publish_core::config::SiteConfig;
use frs_publish_core::contract::{
    Cell, Credentials, FieldValue, Form, Link, Page, PageNavigator, RemoteCopy,
    RemoteCopySession, Table,
};
use frs_publish_core::error::{NavigatorError, RemoteCopyError};
use frs_publish_core::model::{Administrator, FileRelease, FileSpecification, Package, Project};

pub const USER: &str = "alice";
pub const PASSWORD: &str = "s3cret";
pub const PROJECT: &str = "proj-1";
pub const PACKAGE: &str = "pkg-1";
pub const RELEASE: &str = "rel-1";
pub const GROUP_ID: &str = "42";

const LOGIN_ACTION: &str = "/account/login.php";
const PACKAGES_ACTION: &str = "/project/admin/editpackages.php";
const RELEASES_ACTION: &str = "/project/admin/editreleases.php";
const NEW_RELEASE_ACTION: &str = "/project/admin/newrelease.php";
const UNSET_CODE: &str = "0";
pub const MIRROR_FIELD: &str = "mirror_policy";

pub fn site() -> SiteConfig {
    SiteConfig {
        login_url: "https://frs.test/account/login.php".into(),
        login_action: LOGIN_ACTION.into(),
        project_url_prefix: "https://frs.test/projects/".into(),
        admin_base_url: "https://frs.test/project/admin/".into(),
        staging_host: "staging.frs.test".into(),
        staging_root: "/home/frs/project".into(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePackage {
    pub id: String,
    pub name: String,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteRelease {
    pub id: String,
    pub package_id: String,
    pub name: String,
    pub date: String,
    pub status: String,
    pub preformatted: bool,
    pub change_log: Option<FieldValue>,
    pub release_notes: Option<FieldValue>,
    /// file name -> (processor code, file type code)
    pub files: BTreeMap<String, (String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counters {
    pub logins: usize,
    pub failed_logins: usize,
    pub package_creations: usize,
    pub release_creations: usize,
    pub status_updates: usize,
    pub attribute_saves: usize,
    pub file_attachments: usize,
    pub metadata_updates: usize,
    pub notifications: usize,
    pub closes: usize,
}

#[derive(Debug, Default)]
struct SiteState {
    logged_in: bool,
    packages: Vec<RemotePackage>,
    releases: Vec<RemoteRelease>,
    counters: Counters,
    submitted: Vec<Form>,
    next_id: u32,
}

impl SiteState {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        (100 + self.next_id).to_string()
    }
}

pub struct FakeSite {
    state: Mutex<SiteState>,
    notify_form: bool,
    mirror_form: bool,
}

impl Default for FakeSite {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSite {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SiteState::default()),
            notify_form: true,
            mirror_form: false,
        }
    }

    pub fn with_package(self, name: &str, status: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let id = state.next_id();
            state.packages.push(RemotePackage {
                id,
                name: name.into(),
                status: status.into(),
            });
        }
        self
    }

    /// Adds a release to an already registered package.
    pub fn with_release(self, package: &str, name: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let package_id = state
                .packages
                .iter()
                .find(|p| p.name == package)
                .map(|p| p.id.clone())
                .expect("package must be registered first");
            let id = state.next_id();
            state.releases.push(RemoteRelease {
                id,
                package_id,
                name: name.into(),
                date: "2001-01-01".into(),
                status: "1".into(),
                ..RemoteRelease::default()
            });
        }
        self
    }

    pub fn without_notify_form(mut self) -> Self {
        self.notify_form = false;
        self
    }

    /// Renders an extra step 3 form, ahead of the per-file forms, that is
    /// neither a metadata nor a confirmation form.
    pub fn with_mirror_form(mut self) -> Self {
        self.mirror_form = true;
        self
    }

    pub fn counters(&self) -> Counters {
        self.state.lock().unwrap().counters.clone()
    }

    pub fn packages(&self) -> Vec<RemotePackage> {
        self.state.lock().unwrap().packages.clone()
    }

    pub fn releases(&self) -> Vec<RemoteRelease> {
        self.state.lock().unwrap().releases.clone()
    }

    pub fn submitted(&self) -> Vec<Form> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn package(&self, name: &str) -> Option<RemotePackage> {
        self.packages().into_iter().find(|p| p.name == name)
    }

    pub fn release(&self, name: &str) -> Option<RemoteRelease> {
        self.releases().into_iter().find(|r| r.name == name)
    }

    fn render(&self, state: &SiteState, url: &str) -> Result<Page, NavigatorError> {
        let parsed = Url::parse(url)?;
        let query: BTreeMap<String, String> = parsed.query_pairs().into_owned().collect();
        let path = parsed.path();

        if path == LOGIN_ACTION {
            return Ok(login_page(url));
        }
        if let Some(short) = path.strip_prefix("/projects/") {
            return Ok(summary_page(url, short.trim_end_matches('/')));
        }
        if !state.logged_in {
            return Err(NavigatorError::Request {
                url: url.into(),
                message: "not logged in".into(),
            });
        }
        match path {
            PACKAGES_ACTION => Ok(packages_page(url, state)),
            RELEASES_ACTION => match query.get("release_id") {
                Some(id) => self.edit_page(state, id),
                None => Ok(releases_page(url, state, query.get("package_id"))),
            },
            NEW_RELEASE_ACTION => Ok(new_release_page(url)),
            _ => Err(NavigatorError::Request {
                url: url.into(),
                message: "404 Not Found".into(),
            }),
        }
    }

    fn edit_page(&self, state: &SiteState, release_id: &str) -> Result<Page, NavigatorError> {
        let release = state
            .releases
            .iter()
            .find(|r| r.id == release_id)
            .ok_or_else(|| NavigatorError::Other(format!("no release {release_id}")))?;
        let url = format!(
            "https://frs.test{RELEASES_ACTION}?package_id={}&release_id={}&group_id={GROUP_ID}",
            release.package_id, release.id
        );
        let base = |step: &str| {
            Form::new(RELEASES_ACTION)
                .with_field(step, "1")
                .with_field("release_id", &release.id)
                .with_field("package_id", &release.package_id)
                .with_field("group_id", GROUP_ID)
        };

        let mut step1 = base("step1")
            .with_field("release_name", &release.name)
            .with_field("release_date", &release.date)
            .with_field("status_id", &release.status)
            .with_field("release_changes", "")
            .with_field("release_notes", "");
        if release.preformatted {
            step1.set_field("preformatted", "1");
        }
        let mut forms = vec![step1, base("step2")];
        if self.mirror_form {
            forms.push(base("step3").with_field(MIRROR_FIELD, "all"));
        }
        let mut rows = vec![vec![
            Cell::text("Filename"),
            Cell::text("Processor"),
            Cell::text("File Type"),
        ]];
        for (file, (processor, file_type)) in &release.files {
            forms.push(
                base("step3")
                    .with_field("file_id", file)
                    .with_field("processor_id", processor)
                    .with_field("type_id", file_type),
            );
            forms.push(
                base("step3")
                    .with_field("file_id", file)
                    .with_field("im_sure", "0"),
            );
            rows.push(vec![Cell::text(file.as_str())]);
            rows.push(vec![Cell::text(processor.as_str()), Cell::text(file_type.as_str())]);
            rows.push(vec![Cell::text("Delete this file")]);
        }
        if self.notify_form {
            forms.push(base("step4"));
        }
        for form in &mut forms {
            form.page_url = url.clone();
        }

        Ok(Page {
            url,
            title: format!("FRS: Edit Release {}", release.name),
            text: String::new(),
            forms,
            links: Vec::new(),
            tables: vec![Table { rows }],
        })
    }

    fn accept(&self, state: &mut SiteState, form: &Form) -> Result<Page, NavigatorError> {
        match form.action.as_str() {
            LOGIN_ACTION => {
                let ok = form.field_value("form_loginname") == Some(USER)
                    && form.field_value("form_pw") == Some(PASSWORD);
                if ok {
                    state.logged_in = true;
                    state.counters.logins += 1;
                    Ok(Page {
                        url: "https://frs.test/my/".into(),
                        title: "My Page".into(),
                        text: "Welcome".into(),
                        ..Page::default()
                    })
                } else {
                    state.counters.failed_logins += 1;
                    Ok(Page {
                        url: "https://frs.test/account/login.php".into(),
                        title: "Log In".into(),
                        text: "Error: Invalid Password or User Name".into(),
                        ..Page::default()
                    })
                }
            }
            PACKAGES_ACTION => {
                match form.field_value("func") {
                    Some("add_package") => {
                        let id = state.next_id();
                        state.packages.push(RemotePackage {
                            id,
                            name: form.field_value("package_name").unwrap_or_default().into(),
                            status: "1".into(),
                        });
                        state.counters.package_creations += 1;
                    }
                    Some("update_package") => {
                        let id = form.field_value("package_id").unwrap_or_default();
                        let status = form.field_value("status_id").unwrap_or_default();
                        if let Some(package) = state.packages.iter_mut().find(|p| p.id == id) {
                            if package.status != status {
                                package.status = status.into();
                                state.counters.status_updates += 1;
                            }
                        }
                    }
                    other => {
                        return Err(NavigatorError::Other(format!("unexpected func {other:?}")))
                    }
                }
                let url = format!("https://frs.test{PACKAGES_ACTION}?group_id={GROUP_ID}");
                Ok(packages_page(&url, state))
            }
            NEW_RELEASE_ACTION => {
                let id = state.next_id();
                state.releases.push(RemoteRelease {
                    id: id.clone(),
                    package_id: form.field_value("package_id").unwrap_or_default().into(),
                    name: form.field_value("release_name").unwrap_or_default().into(),
                    status: "1".into(),
                    ..RemoteRelease::default()
                });
                state.counters.release_creations += 1;
                self.edit_page(state, &id)
            }
            RELEASES_ACTION => {
                let id = form.field_value("release_id").unwrap_or_default().to_string();
                let release = state
                    .releases
                    .iter_mut()
                    .find(|r| r.id == id)
                    .ok_or_else(|| NavigatorError::Other(format!("no release {id}")))?;
                if form.has_field("step1") {
                    release.date = form.field_value("release_date").unwrap_or_default().into();
                    release.status = form.field_value("status_id").unwrap_or_default().into();
                    release.preformatted = form.field_value("preformatted") == Some("1");
                    release.change_log = text_or_file(form, "uploaded_changes", "release_changes");
                    release.release_notes = text_or_file(form, "uploaded_notes", "release_notes");
                    state.counters.attribute_saves += 1;
                } else if form.has_field("step2") {
                    if let Some(FieldValue::Multi(names)) = form.field("file_list[]") {
                        for name in names {
                            release
                                .files
                                .entry(name.clone())
                                .or_insert_with(|| (UNSET_CODE.into(), UNSET_CODE.into()));
                        }
                        state.counters.file_attachments += 1;
                    }
                } else if form.has_field("step3") && form.has_field("processor_id") {
                    let file = form.field_value("file_id").unwrap_or_default();
                    if let Some(meta) = release.files.get_mut(file) {
                        *meta = (
                            form.field_value("processor_id").unwrap_or_default().into(),
                            form.field_value("type_id").unwrap_or_default().into(),
                        );
                    }
                    state.counters.metadata_updates += 1;
                } else if form.has_field("step4") {
                    state.counters.notifications += 1;
                }
                self.edit_page(state, &id)
            }
            other => Err(NavigatorError::Request {
                url: other.into(),
                message: "405 Method Not Allowed".into(),
            }),
        }
    }
}

fn text_or_file(form: &Form, upload: &str, text: &str) -> Option<FieldValue> {
    match (form.field(upload), form.field_value(text)) {
        (Some(file), _) => Some(file.clone()),
        (None, Some(t)) if !t.is_empty() => Some(FieldValue::Text(t.into())),
        _ => None,
    }
}

fn login_page(url: &str) -> Page {
    Page {
        url: url.into(),
        title: "Log In".into(),
        forms: vec![Form::new(LOGIN_ACTION)
            .with_field("form_loginname", "")
            .with_field("form_pw", "")],
        ..Page::default()
    }
}

fn summary_page(url: &str, short_name: &str) -> Page {
    if short_name != PROJECT {
        return Page {
            url: url.into(),
            title: "Error".into(),
            text: "Invalid Project".into(),
            ..Page::default()
        };
    }
    Page {
        url: url.into(),
        title: format!("SourceForge.net: Project Info - {short_name}"),
        links: vec![Link::new(
            "[View Members]",
            format!("https://frs.test/project/memberlist.php?group_id={GROUP_ID}"),
        )],
        ..Page::default()
    }
}

fn packages_page(url: &str, state: &SiteState) -> Page {
    let mut forms: Vec<Form> = state
        .packages
        .iter()
        .map(|p| {
            Form::new(PACKAGES_ACTION)
                .with_field("func", "update_package")
                .with_field("group_id", GROUP_ID)
                .with_field("package_id", &p.id)
                .with_field("package_name", &p.name)
                .with_field("status_id", &p.status)
        })
        .collect();
    forms.push(
        Form::new(PACKAGES_ACTION)
            .with_field("func", "add_package")
            .with_field("group_id", GROUP_ID)
            .with_field("package_name", ""),
    );
    Page {
        url: url.into(),
        title: "FRS: Packages".into(),
        forms,
        ..Page::default()
    }
}

fn releases_page(url: &str, state: &SiteState, package_id: Option<&String>) -> Page {
    let releases: Vec<&RemoteRelease> = state
        .releases
        .iter()
        .filter(|r| Some(&r.package_id) == package_id)
        .collect();
    if releases.is_empty() {
        return Page {
            url: url.into(),
            title: "FRS: Releases".into(),
            text: "You Have No Releases Of This Package Defined".into(),
            ..Page::default()
        };
    }
    let mut rows = vec![vec![Cell::text("Release Name"), Cell::text("Date")]];
    for r in releases {
        let link = Link::new(
            "[Edit This Release]",
            format!(
                "https://frs.test{RELEASES_ACTION}?package_id={}&release_id={}&group_id={GROUP_ID}",
                r.package_id, r.id
            ),
        );
        rows.push(vec![
            Cell {
                text: format!("{} [Edit This Release]", r.name),
                links: vec![link],
            },
            Cell::text(r.date.as_str()),
        ]);
    }
    Page {
        url: url.into(),
        title: "FRS: Releases".into(),
        tables: vec![Table { rows }],
        ..Page::default()
    }
}

fn new_release_page(url: &str) -> Page {
    Page {
        url: url.into(),
        title: "FRS: New Release".into(),
        forms: vec![Form::new(NEW_RELEASE_ACTION)
            .with_field("release_name", "")
            .with_field("package_id", "")
            .with_field("group_id", "")],
        ..Page::default()
    }
}

#[async_trait]
impl PageNavigator for FakeSite {
    async fn fetch(&self, url: &str) -> Result<Page, NavigatorError> {
        let state = self.state.lock().unwrap();
        self.render(&state, url)
    }

    async fn submit(&self, form: &Form) -> Result<Page, NavigatorError> {
        let mut state = self.state.lock().unwrap();
        state.submitted.push(form.clone());
        self.accept(&mut state, form)
    }

    async fn follow(&self, link: &Link) -> Result<Page, NavigatorError> {
        let state = self.state.lock().unwrap();
        self.render(&state, &link.url)
    }

    async fn close(&self) -> Result<(), NavigatorError> {
        let mut state = self.state.lock().unwrap();
        state.counters.closes += 1;
        state.logged_in = false;
        Ok(())
    }
}

/// Remote-copy channel that records every transfer instead of performing it.
#[derive(Clone, Default)]
pub struct RecordingCopy {
    pub log: Arc<Mutex<CopyLog>>,
}

#[derive(Debug, Default)]
pub struct CopyLog {
    pub connects: Vec<(String, String)>,
    pub directories: Vec<String>,
    pub puts: Vec<(PathBuf, String)>,
    pub closes: usize,
}

impl RecordingCopy {
    pub fn puts(&self) -> Vec<(PathBuf, String)> {
        self.log.lock().unwrap().puts.clone()
    }

    pub fn connects(&self) -> Vec<(String, String)> {
        self.log.lock().unwrap().connects.clone()
    }

    pub fn directories(&self) -> Vec<String> {
        self.log.lock().unwrap().directories.clone()
    }
}

struct RecordingSession {
    log: Arc<Mutex<CopyLog>>,
}

#[async_trait]
impl RemoteCopy for RecordingCopy {
    async fn connect(
        &self,
        host: &str,
        credentials: &Credentials,
    ) -> Result<Box<dyn RemoteCopySession>, RemoteCopyError> {
        self.log
            .lock()
            .unwrap()
            .connects
            .push((host.into(), credentials.user.clone()));
        Ok(Box::new(RecordingSession {
            log: Arc::clone(&self.log),
        }))
    }
}

#[async_trait]
impl RemoteCopySession for RecordingSession {
    async fn make_directories(&self, remote_dir: &str) -> Result<(), RemoteCopyError> {
        self.log.lock().unwrap().directories.push(remote_dir.into());
        Ok(())
    }

    async fn put(&self, local: &Path, remote: &str) -> Result<(), RemoteCopyError> {
        self.log
            .lock()
            .unwrap()
            .puts
            .push((local.to_path_buf(), remote.into()));
        Ok(())
    }

    async fn close(&self) -> Result<(), RemoteCopyError> {
        self.log.lock().unwrap().closes += 1;
        Ok(())
    }
}

/// Writes `len` bytes to `dir/name` and returns the path.
pub fn write_file(dir: &Path, name: &str, len: usize) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, vec![b'x'; len]).expect("write test file");
    path
}

pub fn administrator(password: &str) -> Administrator {
    Administrator::new(USER, password).expect("valid administrator")
}

/// "rel-1" of "pkg-1" in "proj-1", with two text files and a 500-byte change log.
pub fn sample_release(dir: &Path, password: &str) -> FileRelease {
    let project = Project::new("Project One", PROJECT, administrator(password));
    let package = Package::new(PACKAGE, project);
    let mut release = FileRelease::new(RELEASE, package);

    let readme = write_file(dir, "readme.txt", 64);
    let notes = write_file(dir, "notes.txt", 64);
    release
        .set_file_specifications([
            FileSpecification::new(readme).expect("readme spec"),
            FileSpecification::new(notes).expect("notes spec"),
        ])
        .expect("add specs");
    release
        .set_change_log_file(Some(write_file(dir, "changes.log", 500)))
        .expect("change log within bounds");
    release
}

//! Domain model: who publishes ([`Administrator`]), into which [`Project`] and
//! [`Package`], as which [`FileRelease`], with which files ([`FileSpecification`]).
//!
//! Everything here is built by the caller before a publish attempt. The engine
//! only writes back remote-assigned ids (`Project::id`, `Package::id`).
//! Files are validated as soon as they are attached.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::classify::{classify, FileType, ProcessorType};
use crate::contract::Publisher;
use crate::error::{ModelError, PublishError};
use crate::validate::{base_name, validate_file_naming, validate_release_artifact};

/// Account used for both the web login and the remote-copy channel.
///
/// Both fields must be set before use; reading an unset field is an error.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Administrator {
    name: Option<String>,
    password: Option<String>,
}

impl Administrator {
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Result<Self, ModelError> {
        let mut admin = Self::default();
        admin.set_name(name)?;
        admin.set_password(password)?;
        Ok(admin)
    }

    pub fn name(&self) -> Result<&str, ModelError> {
        self.name.as_deref().ok_or(ModelError::Unset("administrator name"))
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), ModelError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ModelError::Empty("administrator name"));
        }
        self.name = Some(name);
        Ok(())
    }

    pub fn password(&self) -> Result<&str, ModelError> {
        self.password
            .as_deref()
            .ok_or(ModelError::Unset("administrator password"))
    }

    pub fn set_password(&mut self, password: impl Into<String>) -> Result<(), ModelError> {
        let password = password.into();
        if password.is_empty() {
            return Err(ModelError::Empty("administrator password"));
        }
        self.password = Some(password);
        Ok(())
    }
}

impl fmt::Debug for Administrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Administrator")
            .field("name", &self.name)
            .field("password_set", &self.password.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Project {
    /// Remote-assigned id (`group_id`), recorded once discovered.
    pub id: Option<String>,
    pub name: Option<String>,
    /// Unix name of the project; keys URLs and the staging directory.
    pub short_name: Option<String>,
    pub administrator: Option<Administrator>,
}

impl Project {
    pub fn new(
        name: impl Into<String>,
        short_name: impl Into<String>,
        administrator: Administrator,
    ) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            short_name: Some(short_name.into()),
            administrator: Some(administrator),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Package {
    /// Remote-assigned id (`package_id`), recorded once discovered.
    pub id: Option<String>,
    pub name: Option<String>,
    pub hidden: bool,
    pub project: Option<Project>,
}

impl Package {
    pub fn new(name: impl Into<String>, project: Project) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            hidden: false,
            project: Some(project),
        }
    }
}

/// One file belonging to a release, with the metadata the service records for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpecification {
    file: Option<PathBuf>,
    file_type: FileType,
    processor_type: ProcessorType,
    release_date: DateTime<Utc>,
}

impl Default for FileSpecification {
    fn default() -> Self {
        Self {
            file: None,
            file_type: FileType::Other,
            processor_type: ProcessorType::Any,
            release_date: Utc::now(),
        }
    }
}

impl FileSpecification {
    /// Validates `file` and classifies it by suffix.
    pub fn new(file: impl Into<PathBuf>) -> Result<Self, ModelError> {
        let mut spec = Self::default();
        spec.set_file(file)?;
        Ok(spec)
    }

    pub fn file(&self) -> Result<&Path, ModelError> {
        self.file.as_deref().ok_or(ModelError::Unset("file"))
    }

    /// Attaches `file`, replacing the file type with the one implied by its suffix.
    pub fn set_file(&mut self, file: impl Into<PathBuf>) -> Result<(), ModelError> {
        let file = file.into();
        validate_file_naming(&file)?;
        self.file_type = base_name(&file).map(classify).unwrap_or_default();
        self.file = Some(file);
        Ok(())
    }

    /// Base name of the attached file, the key the release service lists it under.
    pub fn short_name(&self) -> Result<&str, ModelError> {
        base_name(self.file()?).ok_or(ModelError::Unset("file"))
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn set_file_type(&mut self, file_type: FileType) {
        self.file_type = file_type;
    }

    pub fn set_file_type_name(&mut self, name: &str) -> Result<(), ModelError> {
        self.file_type = FileType::parse_name(name)?;
        Ok(())
    }

    pub fn processor_type(&self) -> ProcessorType {
        self.processor_type
    }

    pub fn set_processor_type(&mut self, processor_type: ProcessorType) {
        self.processor_type = processor_type;
    }

    pub fn set_processor_type_name(&mut self, name: &str) -> Result<(), ModelError> {
        self.processor_type = ProcessorType::parse_name(name)?;
        Ok(())
    }

    pub fn release_date(&self) -> DateTime<Utc> {
        self.release_date
    }

    pub fn set_release_date(&mut self, date: DateTime<Utc>) {
        self.release_date = date;
    }
}

/// Names and credentials a release must carry before it can be reconciled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseCoordinates {
    pub release_name: String,
    pub package_name: String,
    pub project_short_name: String,
    pub user: String,
    pub password: String,
}

/// A release of a package: its attributes and the files attached to it.
pub struct FileRelease {
    pub name: Option<String>,
    pub id: Option<String>,
    pub package: Option<Package>,
    pub release_date: DateTime<Utc>,
    pub hidden: bool,
    pub notify_others: bool,
    pub preserve_formatted_text: bool,
    pub release_notes: Option<String>,
    pub change_log: Option<String>,
    release_notes_file: Option<PathBuf>,
    change_log_file: Option<PathBuf>,
    specs: Vec<FileSpecification>,
    publisher: Option<Arc<dyn Publisher>>,
}

impl Default for FileRelease {
    fn default() -> Self {
        Self {
            name: None,
            id: None,
            package: None,
            release_date: Utc::now(),
            hidden: false,
            notify_others: true,
            preserve_formatted_text: true,
            release_notes: None,
            change_log: None,
            release_notes_file: None,
            change_log_file: None,
            specs: Vec::new(),
            publisher: None,
        }
    }
}

impl fmt::Debug for FileRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileRelease")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("package", &self.package)
            .field("release_date", &self.release_date)
            .field("hidden", &self.hidden)
            .field("notify_others", &self.notify_others)
            .field("preserve_formatted_text", &self.preserve_formatted_text)
            .field("release_notes_file", &self.release_notes_file)
            .field("change_log_file", &self.change_log_file)
            .field("specs", &self.specs)
            .field("publisher_installed", &self.publisher.is_some())
            .finish_non_exhaustive()
    }
}

impl FileRelease {
    pub fn new(name: impl Into<String>, package: Package) -> Self {
        Self {
            name: Some(name.into()),
            package: Some(package),
            ..Self::default()
        }
    }

    pub fn release_notes_file(&self) -> Option<&Path> {
        self.release_notes_file.as_deref()
    }

    /// Sets (or clears) the release notes file. The file must satisfy both the
    /// naming and the size rules.
    pub fn set_release_notes_file(&mut self, file: Option<PathBuf>) -> Result<(), ModelError> {
        if let Some(path) = &file {
            validate_release_artifact(path)?;
        }
        self.release_notes_file = file;
        Ok(())
    }

    pub fn change_log_file(&self) -> Option<&Path> {
        self.change_log_file.as_deref()
    }

    /// Sets (or clears) the change log file. The file must satisfy both the
    /// naming and the size rules.
    pub fn set_change_log_file(&mut self, file: Option<PathBuf>) -> Result<(), ModelError> {
        if let Some(path) = &file {
            validate_release_artifact(path)?;
        }
        self.change_log_file = file;
        Ok(())
    }

    /// Adds `spec`, replacing any spec already registered under the same base name.
    pub fn add_file_specification(&mut self, spec: FileSpecification) -> Result<(), ModelError> {
        let file = spec.file()?;
        validate_file_naming(file)?;
        let name = spec.short_name()?.to_string();
        match self
            .specs
            .iter_mut()
            .find(|existing| existing.short_name().ok() == Some(name.as_str()))
        {
            Some(slot) => *slot = spec,
            None => self.specs.push(spec),
        }
        Ok(())
    }

    pub fn set_file_specifications(
        &mut self,
        specs: impl IntoIterator<Item = FileSpecification>,
    ) -> Result<(), ModelError> {
        for spec in specs {
            self.add_file_specification(spec)?;
        }
        Ok(())
    }

    pub fn file_specifications(&self) -> &[FileSpecification] {
        &self.specs
    }

    pub fn file_specification(&self, base_name: &str) -> Option<&FileSpecification> {
        self.specs
            .iter()
            .find(|spec| spec.short_name().ok() == Some(base_name))
    }

    pub fn files(&self) -> Vec<PathBuf> {
        self.specs
            .iter()
            .filter_map(|spec| spec.file().ok().map(Path::to_path_buf))
            .collect()
    }

    pub fn short_file_names(&self) -> Vec<String> {
        self.specs
            .iter()
            .filter_map(|spec| spec.short_name().ok().map(str::to_string))
            .collect()
    }

    pub fn project(&self) -> Option<&Project> {
        self.package.as_ref().and_then(|p| p.project.as_ref())
    }

    pub fn project_mut(&mut self) -> Option<&mut Project> {
        self.package.as_mut().and_then(|p| p.project.as_mut())
    }

    /// Checks the release is linked all the way down to an administrator with
    /// credentials, and returns the names the engine navigates by.
    pub fn coordinates(&self) -> Result<ReleaseCoordinates, PublishError> {
        let missing = |what: &str| PublishError::Configuration(format!("{what} is not set"));
        let named = |value: &Option<String>, what: &str| match value.as_deref().map(str::trim) {
            None => Err(missing(what)),
            Some("") => Err(PublishError::Configuration(format!("{what} is empty"))),
            Some(name) => Ok(name.to_string()),
        };

        let release_name = named(&self.name, "release name")?;
        let package = self.package.as_ref().ok_or_else(|| missing("package"))?;
        let package_name = named(&package.name, "package name")?;
        let project = package.project.as_ref().ok_or_else(|| missing("project"))?;
        let project_short_name = named(&project.short_name, "project short name")?;
        let admin = project
            .administrator
            .as_ref()
            .ok_or_else(|| missing("administrator"))?;

        Ok(ReleaseCoordinates {
            release_name,
            package_name,
            project_short_name,
            user: admin.name()?.to_string(),
            password: admin.password()?.to_string(),
        })
    }

    pub fn publisher(&self) -> Option<&Arc<dyn Publisher>> {
        self.publisher.as_ref()
    }

    pub fn set_publisher(&mut self, publisher: Arc<dyn Publisher>) {
        self.publisher = Some(publisher);
    }

    /// Publishes through the installed publisher.
    pub async fn publish(&mut self) -> Result<(), PublishError> {
        let publisher = self.publisher.clone().ok_or_else(|| {
            PublishError::Configuration("no publisher installed; call set_publisher first".into())
        })?;
        publisher.publish(self).await
    }
}

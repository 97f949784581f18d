//! # contract: capability interfaces the publisher is built on
//!
//! The release service offers no programmatic API, only pages meant for
//! people. This module defines the seams the engine talks through, so the
//! engine itself never touches HTTP, markup or SSH:
//!
//! - [`PageNavigator`]: fetch a page, submit a form, follow a link. Pages come
//!   back as plain [`Page`] snapshots (forms, links, tables, text) that the
//!   engine searches with predicates.
//! - [`RemoteCopy`] / [`RemoteCopySession`]: the secure copy channel used to
//!   stage release files before they are attached through the web forms.
//! - [`Publisher`]: what callers install on a [`FileRelease`].
//!
//! ## Mocking & Testing
//! - The traits carry `mockall::automock` (under `test` or the
//!   `test-export-mocks` feature), so consumers can script failures.
//! - Page snapshots are plain serde data; tests build them by hand and the
//!   engine logs submitted forms as JSON.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::error::{NavigatorError, PublishError, RemoteCopyError};
use crate::model::FileRelease;

/// Value of one form control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    /// Multi-valued controls such as a checkbox list.
    Multi(Vec<String>),
    /// A local file to send as a multipart attachment.
    File(PathBuf),
}

/// A form as it appears on a page, with its current control values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Form {
    /// The `action` attribute exactly as written in the markup.
    pub action: String,
    /// URL of the page the form was found on. Navigators resolve a relative
    /// `action` against it when submitting.
    #[serde(default)]
    pub page_url: String,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl Form {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    /// Builder-style [`Form::set_field`].
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_field(name, value);
        self
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Text value of `name`; for multi-valued controls, the first value.
    pub fn field_value(&self, name: &str) -> Option<&str> {
        match self.fields.get(name)? {
            FieldValue::Text(v) => Some(v),
            FieldValue::Multi(vs) => vs.first().map(String::as_str),
            FieldValue::File(_) => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields
            .insert(name.into(), FieldValue::Text(value.into()));
    }

    pub fn set_values(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.fields.insert(name.into(), FieldValue::Multi(values));
    }

    pub fn attach_file(&mut self, name: impl Into<String>, file: &Path) {
        self.fields
            .insert(name.into(), FieldValue::File(file.to_path_buf()));
    }

    pub fn remove_field(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Visible text of the anchor.
    pub text: String,
    pub url: String,
}

impl Link {
    pub fn new(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub text: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Cell {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            links: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row)?.get(col)
    }

    pub fn cell_text(&self, row: usize, col: usize) -> Option<&str> {
        self.cell(row, col).map(|c| c.text.as_str())
    }

    /// True when the first cell's text starts with `prefix`.
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.cell_text(0, 0)
            .is_some_and(|t| t.trim_start().starts_with(prefix))
    }
}

/// Snapshot of one fetched page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub url: String,
    #[serde(default)]
    pub title: String,
    /// Rendered text content, used for marker lookups.
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub forms: Vec<Form>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub tables: Vec<Table>,
}

impl Page {
    /// Copies of every form matching `predicate`, in document order.
    pub fn find_forms<P>(&self, predicate: P) -> Vec<Form>
    where
        P: Fn(&Form) -> bool,
    {
        self.forms.iter().filter(|f| predicate(f)).cloned().collect()
    }

    pub fn find_links<P>(&self, predicate: P) -> Vec<&Link>
    where
        P: Fn(&Link) -> bool,
    {
        self.links.iter().filter(|l| predicate(l)).collect()
    }

    /// The first table matching `predicate`.
    pub fn find_table<P>(&self, predicate: P) -> Option<&Table>
    where
        P: Fn(&Table) -> bool,
    {
        self.tables.iter().find(|t| predicate(t))
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.text.contains(needle)
    }
}

/// Fetches and submits pages on the release service.
///
/// One navigator is one logged-in session; it carries cookies between calls
/// and is driven strictly sequentially.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PageNavigator: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Page, NavigatorError>;

    async fn submit(&self, form: &Form) -> Result<Page, NavigatorError>;

    async fn follow(&self, link: &Link) -> Result<Page, NavigatorError>;

    /// Ends the session. Called on every exit path of a publish run.
    async fn close(&self) -> Result<(), NavigatorError>;
}

/// Login for the remote-copy channel.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Opens sessions on the staging host.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RemoteCopy: Send + Sync {
    async fn connect(
        &self,
        host: &str,
        credentials: &Credentials,
    ) -> Result<Box<dyn RemoteCopySession>, RemoteCopyError>;
}

/// An open remote-copy session. Transfers may run concurrently on one session.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RemoteCopySession: Send + Sync {
    async fn make_directories(&self, remote_dir: &str) -> Result<(), RemoteCopyError>;

    async fn put(&self, local: &Path, remote: &str) -> Result<(), RemoteCopyError>;

    async fn close(&self) -> Result<(), RemoteCopyError>;
}

/// Pushes a [`FileRelease`] to the release service.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, release: &mut FileRelease) -> Result<(), PublishError>;
}

#![doc = "frs-publish-core: core logic library for frs-publish."]

//! Publishes a local file release to a form-driven release service.
//!
//! The service has no API, so publishing means staging the files over a
//! remote-copy channel and then walking the admin pages the way a person
//! would: find or create the package, find or create the release, fill in its
//! attributes, attach the staged files, set each file's type and processor,
//! and optionally notify subscribers.
//!
//! # Modules
//! - [`model`]: administrator, project, package, release and file specifications
//! - [`classify`], [`validate`]: file typing by suffix and the service's file rules
//! - [`contract`]: the navigator, remote-copy and publisher traits
//! - [`transport`]: concurrent staging with aggregated failures
//! - [`synchronise`]: the page-driving state machine
//! - [`publisher`]: [`publisher::WebPublisher`], tying transport and engine together
//!
//! HTTP, markup parsing and SSH live behind the traits in [`contract`].

pub mod classify;
pub mod config;
pub mod contract;
pub mod error;
pub mod model;
pub mod project;
pub mod publisher;
pub mod synchronise;
pub mod transport;
pub mod validate;

pub use classify::{classify, FileType, ProcessorType};
pub use config::SiteConfig;
pub use error::{PublishError, TransportError, UploadFailures};
pub use model::{Administrator, FileRelease, FileSpecification, Package, Project};
pub use publisher::WebPublisher;
pub use synchronise::{FailureReason, SyncState, SyncStep, Synchroniser};

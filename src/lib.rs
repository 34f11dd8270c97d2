//! Zero-downtime single-host releases.
//!
//! Switchyard fetches a git revision, builds it, provisions TLS and
//! nginx routing per domain, and atomically switches the running app
//! to the new revision. Teardown runs the same steps in reverse. The
//! host is never left without a working `current` deployment:
//! activation is a single atomic symlink repoint, and certificate
//! issuance is sequenced through a plaintext bootstrap config so it
//! never races traffic serving.
//!
//! # Overview
//!
//! A release is driven by a [`Releaser`] that wires together:
//!
//! - An [`AppConfig`] read from the cloned tree (domains, app type,
//!   proxy upstream, auth, redirects, jobs)
//! - A [`DomainSpec`] list normalized from heterogeneous domain
//!   declarations
//! - A pure nginx config generator ([`nginx::render`]), called once
//!   for the certificate bootstrap and once for the final config
//! - A [`RevisionStore`] owning the on-disk revision layout and the
//!   atomic `current` swap
//!
//! Everything external - git, npm, certbot, systemctl, crontab - is a
//! blocking shell-out behind [`cmd`], and any failure aborts the
//! release before anything user-facing changes.
//!
//! # Example
//!
//! ```rust,no_run
//! use switchyard::Releaser;
//!
//! fn main() -> anyhow::Result<()> {
//!     Releaser::new().run()?;
//!     Ok(())
//! }
//! ```
//!
//! Then:
//!
//! ```sh
//! # Deploy a repository (name defaults to the repo basename)
//! switchyard deploy https://github.com/acme/shop.git
//!
//! # Tear it down again
//! switchyard remove shop
//! ```
//!
//! The deployment mode (config variant and `.env` content) comes from
//! `SWITCHYARD_ENV`; `SWITCHYARD_BRANCH` overrides the cloned branch.
//!
//! Releases of the same app must not run concurrently; take an
//! external lock if callers can race.

// Allow noisy pedantic lints that don't add value for a
// deployment tool crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod cert;
pub mod cmd;
pub mod config;
pub mod cron;
pub mod domain;
pub mod error;
pub mod nginx;
pub mod release;
pub mod revision;
pub mod service;

pub use config::AppConfig;
pub use config::AppType;
pub use config::Manifest;
pub use domain::DomainSpec;
pub use domain::Redirect;
pub use error::ReleaseError;
pub use error::ReleaseResult;
pub use nginx::Site;
pub use release::Releaser;
pub use revision::RevisionId;
pub use revision::RevisionStore;

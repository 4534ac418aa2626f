//! # composerw Core Library
//!
//! This crate contains the logic of `composerw`, a small wrapper that is committed to a project
//! so contributors can use Composer without installing it first.
//!
//! On every invocation the wrapper makes sure `composer.phar` is installed (downloading the
//! official installer and checking its SHA-384 signature), executable and fresh (running
//! `self-update` once the configured update frequency has passed), then forwards the
//! command line to it and returns its exit code unchanged.
//!
//! ## Modules Overview
//! - [`config`] – Resolution of wrapper settings from the environment and `composer.json`
//! - [`frequency`] – Parsing of update frequencies such as `7 days` or `-100`
//! - [`capabilities`] – Network, process and filesystem collaborators (and their real implementations)
//! - [`installer`] – Downloading, verifying and running the Composer installer
//! - [`updater`] – Freshness checks and `self-update` with channel pinning
//! - [`permissions`] – Making `composer.phar` executable
//! - [`wrapper`] – The install/verify/update/delegate flow
//! - [`error`] – Error types


pub mod error;
pub mod frequency;
pub mod config;
pub mod capabilities;
pub mod installer;
pub mod updater;
pub mod permissions;
pub mod wrapper;

pub use error::{ConfigError, WrapperError};
pub use config::*;
pub use frequency::*;
pub use capabilities::*;
pub use installer::*;
pub use updater::*;
pub use permissions::*;
pub use wrapper::*;

//! Stork release publisher library.
//!
//! This crate publishes the build outputs of a Stork release (the web
//! bundle, platform executables, and sample index) to the CDN bucket and
//! then purges the CDN cache. It is used by the `stork-publish` binary and
//! can be driven programmatically with fake storage and CDN clients.
//!
//! # Modules
//!
//! - [`artefact`] - The artefact manifest and category templates
//! - [`aws`] - Shared AWS session for the S3 and CloudFront adapters
//! - [`cdn`] - Cache invalidation and the CloudFront client
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Configuration and environment captured at startup
//! - [`credentials`] - Object-store credentials with redacted debug output
//! - [`destination`] - Destination key resolution
//! - [`error`] - Error taxonomy
//! - [`gate`] - Precondition checks that run before any network effect
//! - [`output`] - Progress lines and dry-run rendering
//! - [`pipeline`] - Publish orchestration and the run report
//! - [`release_ref`] - Release ref validation
//! - [`retry`] - Bounded retry with exponential backoff
//! - [`storage`] - Object storage seam and the S3 implementation
//! - [`uploader`] - Per-destination uploads

pub mod artefact;
pub mod aws;
pub mod cdn;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod destination;
pub mod error;
pub mod gate;
pub mod output;
pub mod pipeline;
pub mod release_ref;
pub mod retry;
pub mod storage;
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
pub mod uploader;

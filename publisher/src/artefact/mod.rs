//! Artefact catalogue: what gets published and how each kind is laid out.
//!
//! # Sub-modules
//!
//! - [`category`] - Artefact categories and their destination templates.
//! - [`error`] - Validation errors for manifest entries.
//! - [`manifest`] - The ordered catalogue of publishable artefacts.
//! - [`sha256_digest`] - SHA-256 digest of uploaded bytes.

pub mod category;
pub mod error;
pub mod manifest;
pub mod sha256_digest;

pub use category::{ArtefactCategory, CategoryTemplates, DestinationTemplate, KeyPattern};
pub use manifest::{Artefact, Manifest};

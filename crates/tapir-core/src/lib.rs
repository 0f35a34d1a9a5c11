//! Core types for Tapir package image resolution.
//!
//! - [`version`]: semantic versions, version specifiers and pre-release levels
//! - [`package`]: package specifiers, dependencies and definitions
//! - [`image`]: image requests
//! - [`hash`]: BLAKE3 content hashes

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod hash;
pub mod image;
pub mod package;
pub mod version;

pub use error::{Error, Result};
pub use hash::{ContentHash, ContentHasher};
pub use image::ImageSpecifier;
pub use package::{
    CpuArchitecture, PackageDef, PackageDependency, PackageSpecifier, ResolvedPackage, os_matches,
};
pub use version::{
    PrereleaseLevel, SemanticVersion, VersionMatchBehavior, VersionSpecifier, compare_prerelease,
};

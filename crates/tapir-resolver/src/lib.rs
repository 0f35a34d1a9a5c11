//! Package image resolution for Tapir.
//!
//! Given requested package specifiers and a [`PackageDependencyGraph`] of
//! available versions, [`ImageResolver`] finds one consistent set of exact
//! versions or reports why none exists.
//!
//! # Example
//!
//! ```
//! use tapir_core::{PackageDef, PackageSpecifier, SemanticVersion, VersionSpecifier};
//! use tapir_resolver::{ImageResolver, PackageDependencyGraph, ResolverConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let mut graph = PackageDependencyGraph::from_package_defs([
//!     PackageDef::new("OpenTAP", SemanticVersion::new(9, 13, 1)),
//! ]);
//! let request = [PackageSpecifier::new("OpenTAP", VersionSpecifier::parse("^9.10.0").unwrap())];
//!
//! let mut resolver = ImageResolver::new(ResolverConfig::default(), CancellationToken::new());
//! let resolution = resolver.resolve_packages(&request, &[], &mut graph).unwrap();
//! assert_eq!(resolution.packages().unwrap()[0].version.to_string(), "9.13.1");
//! ```
//!
//! # Architecture
//!
//! - [`graph`]: interned dependency graph with lazy pre-release expansion
//! - [`resolver`]: the backtracking search
//! - [`types`]: results and failures
//! - [`config`]: resolver tuning

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod graph;
mod intern;
pub mod resolver;
pub mod types;

pub use config::{DEFAULT_LOOKAHEAD_DEPTH, ResolverConfig};
pub use graph::{PackageDependencyGraph, PrereleaseSource};
pub use resolver::ImageResolver;
pub use types::{ImageResolution, ResolutionFailure, ResolveError};

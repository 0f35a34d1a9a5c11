//! Repository access and image building for Tapir.
//!
//! - [`repository`]: the [`PackageRepository`] contract with in-memory and
//!   directory implementations
//! - [`manager`]: location registry, parallel fan-out and the pre-release
//!   bridge used by the resolver
//! - [`image`]: [`ImageBuilder`], from request to [`ResolvedImage`]
//! - [`config`]: layered [`ImageConfig`]
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tapir_core::ImageSpecifier;
//! use tapir_image::{ImageBuilder, ImageConfig, RepositoryManager};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ImageConfig::load(None)?;
//! let manager = Arc::new(RepositoryManager::new(&config));
//! let image = ImageSpecifier::from_file("image.json")?;
//! let resolved = ImageBuilder::new(manager, config)
//!     .resolve(&image, CancellationToken::new())
//!     .await?;
//! println!("{}", resolved.identifier);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod image;
pub mod manager;
pub mod repository;

pub use config::ImageConfig;
pub use error::{ConfigError, ImageError, RepositoryError, Result};
pub use image::{ImageBuilder, ImageIdentifier, ResolvedImage};
pub use manager::RepositoryManager;
pub use repository::{
    DirectoryRepository, GraphQuery, MemoryRepository, PackageRepository, QueryFuture,
};

//! Turning image requests into resolved images.

use crate::config::ImageConfig;
use crate::error::{ImageError, Result};
use crate::manager::RepositoryManager;
use crate::repository::GraphQuery;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tapir_core::{ContentHash, ContentHasher, ImageSpecifier, PrereleaseLevel, ResolvedPackage};
use tapir_resolver::{ImageResolution, ImageResolver, PackageDependencyGraph};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Content identity of a resolved image.
///
/// Two resolutions that select the same package builds have the same
/// identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageIdentifier(ContentHash);

impl ImageIdentifier {
    /// Compute the identifier of `packages` using hashes from `graph`.
    #[must_use]
    pub fn compute(packages: &[ResolvedPackage], graph: &PackageDependencyGraph) -> Self {
        let mut sorted: Vec<&ResolvedPackage> = packages.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));

        let mut hasher = ContentHasher::new();
        for package in sorted {
            hasher.field(package_hash(package, graph).as_bytes());
        }
        Self(hasher.finalize())
    }

    /// Underlying hash.
    #[must_use]
    pub const fn hash(&self) -> &ContentHash {
        &self.0
    }

    /// Short display form.
    #[must_use]
    pub fn short(&self) -> String {
        self.0.short()
    }
}

impl fmt::Debug for ImageIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageIdentifier({})", self.0.short())
    }
}

impl fmt::Display for ImageIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Hash of one selected package: its published hash when known, otherwise
/// a hash over name, version and platform.
fn package_hash(package: &ResolvedPackage, graph: &PackageDependencyGraph) -> ContentHash {
    let def = graph.package_def(&package.name, &package.version);
    if let Some(published) = def.as_ref().and_then(|d| d.hash.as_deref()) {
        return ContentHash::from_hex(published)
            .unwrap_or_else(|| ContentHash::of(published.as_bytes()));
    }

    let (architecture, os) = def
        .as_ref()
        .map_or((package.architecture, package.os.as_str()), |d| (d.architecture, d.os.as_str()));
    ContentHasher::new()
        .field(&package.name)
        .field(package.version.to_string())
        .field(architecture.as_str())
        .field(os)
        .finalize()
}

/// A successfully resolved image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResolvedImage {
    /// Image name from the request.
    pub name: String,
    /// Selected packages, sorted by name.
    pub packages: Vec<ResolvedPackage>,
    /// Content identity.
    pub identifier: ImageIdentifier,
    /// Resolver attempts used.
    pub iterations: usize,
}

/// Resolves image requests against repositories.
#[derive(Debug, Clone)]
pub struct ImageBuilder {
    manager: Arc<RepositoryManager>,
    config: ImageConfig,
}

impl ImageBuilder {
    /// Create a builder.
    #[must_use]
    pub const fn new(manager: Arc<RepositoryManager>, config: ImageConfig) -> Self {
        Self { manager, config }
    }

    /// The repository manager.
    #[must_use]
    pub fn manager(&self) -> &Arc<RepositoryManager> {
        &self.manager
    }

    /// Resolve `image`.
    ///
    /// Repositories are queried up front for releases (or everything when
    /// `eager_prereleases` is set). Pre-releases are fetched on demand from
    /// the resolver thread. `cancel` and the configured resolve timeout both
    /// stop the search.
    pub async fn resolve(&self, image: &ImageSpecifier, cancel: CancellationToken) -> Result<ResolvedImage> {
        self.config.validate()?;
        image
            .validate()
            .map_err(|e| ImageError::InvalidRequest(e.to_string()))?;
        if image.repositories.is_empty() && !image.packages.is_empty() {
            warn!(image = %image.name, "image names no repositories");
        }

        let os = image.os.clone().unwrap_or_default();
        let level = if self.config.eager_prereleases {
            PrereleaseLevel::All
        } else {
            PrereleaseLevel::Release
        };
        let query = GraphQuery::all()
            .with_platform(image.architecture, os.clone())
            .with_prerelease(level);
        let mut graph = self.manager.query_all(&image.repositories, &query).await;
        graph.set_prerelease_source(self.manager.prerelease_source(
            image.repositories.clone(),
            image.architecture,
            os,
            Handle::current(),
        ));

        let token = cancel.child_token();
        let timer = self.config.resolve_timeout().map(|timeout| {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                debug!(?timeout, "resolve timeout elapsed");
                token.cancel();
            })
        });

        let resolver_config = self.config.to_resolver_config();
        let request = image.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let mut resolver = ImageResolver::new(resolver_config, token);
            let resolution = resolver.resolve(&request, &mut graph);
            (resolution, graph)
        })
        .await;
        if let Some(timer) = timer {
            timer.abort();
        }
        let (resolution, graph) = joined.map_err(|e| ImageError::Join(e.to_string()))?;

        match resolution.map_err(|_| ImageError::Cancelled)? {
            ImageResolution::Resolved {
                packages,
                iterations,
            } => {
                let packages = packages
                    .iter()
                    .map(|spec| {
                        ResolvedPackage::from_specifier(spec).ok_or_else(|| {
                            tapir_core::Error::InvalidImage(format!("{spec} is not pinned to one version"))
                        })
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                let identifier = ImageIdentifier::compute(&packages, &graph);
                info!(
                    image = %image.name,
                    packages = packages.len(),
                    iterations,
                    identifier = %identifier.short(),
                    "image resolved"
                );
                Ok(ResolvedImage {
                    name: image.name.clone(),
                    packages,
                    identifier,
                    iterations,
                })
            }
            ImageResolution::Failed {
                failure,
                iterations,
            } => {
                info!(image = %image.name, iterations, "image unresolvable");
                Err(ImageError::Unresolvable {
                    message: failure.to_string(),
                    failure,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapir_core::{CpuArchitecture, PackageDef, SemanticVersion};

    fn resolved(name: &str, version: SemanticVersion) -> ResolvedPackage {
        ResolvedPackage {
            name: name.to_string(),
            version,
            architecture: CpuArchitecture::Unspecified,
            os: String::new(),
        }
    }

    #[test]
    fn identifier_ignores_input_order() {
        let graph = PackageDependencyGraph::new();
        let a = resolved("A", SemanticVersion::new(1, 0, 0));
        let b = resolved("B", SemanticVersion::new(2, 0, 0));
        assert_eq!(
            ImageIdentifier::compute(&[a.clone(), b.clone()], &graph),
            ImageIdentifier::compute(&[b, a], &graph)
        );
    }

    #[test]
    fn published_hash_takes_precedence() {
        let version = SemanticVersion::new(1, 0, 0);
        let package = resolved("A", version.clone());
        let plain = PackageDependencyGraph::from_package_defs([PackageDef::new("A", version.clone())]);
        let hashed = PackageDependencyGraph::from_package_defs([
            PackageDef::new("A", version).with_hash("deadbeef"),
        ]);
        assert_ne!(
            ImageIdentifier::compute(std::slice::from_ref(&package), &plain),
            ImageIdentifier::compute(std::slice::from_ref(&package), &hashed)
        );
    }

    #[test]
    fn build_metadata_changes_identifier() {
        let graph = PackageDependencyGraph::new();
        let plain = resolved("A", SemanticVersion::new(1, 0, 0));
        let tagged = resolved("A", SemanticVersion::parse("1.0.0+abc").unwrap());
        assert_ne!(
            ImageIdentifier::compute(&[plain], &graph),
            ImageIdentifier::compute(&[tagged], &graph)
        );
    }

    #[test]
    fn resolved_image_serializes_pascal_case() {
        let graph = PackageDependencyGraph::new();
        let packages = vec![resolved("OpenTAP", SemanticVersion::new(9, 13, 1))];
        let image = ResolvedImage {
            name: "bench".into(),
            identifier: ImageIdentifier::compute(&packages, &graph),
            packages,
            iterations: 1,
        };
        let json = sonic_rs::to_string(&image).unwrap();
        for key in ["\"Name\"", "\"Packages\"", "\"Identifier\"", "\"Iterations\"", "\"Version\""] {
            assert!(json.contains(key), "{key} missing from {json}");
        }
        let reloaded: ResolvedImage = sonic_rs::from_str(&json).unwrap();
        assert_eq!(reloaded, image);
    }
}

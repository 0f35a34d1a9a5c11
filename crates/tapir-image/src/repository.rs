//! Package repositories.
//!
//! A repository answers a [`GraphQuery`] with a [`PackageDependencyGraph`]
//! holding the package versions that match it. The graph records the
//! pre-release level it was queried at so later lookups know whether more
//! data has to be fetched.

use crate::error::RepositoryError;
use parking_lot::RwLock;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;
use tapir_core::{
    CpuArchitecture, PackageDef, PrereleaseLevel, SemanticVersion, VersionSpecifier,
};
use tapir_resolver::PackageDependencyGraph;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Boxed future returned by [`PackageRepository::query`].
pub type QueryFuture<'a> =
    Pin<Box<dyn Future<Output = Result<PackageDependencyGraph, RepositoryError>> + Send + 'a>>;

/// What to fetch from a repository.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GraphQuery {
    /// Restrict to these names; `None` means every package.
    pub names: Option<Vec<String>>,
    /// Target OS, empty for any.
    pub os: String,
    /// Target architecture.
    pub architecture: CpuArchitecture,
    /// Pre-releases to include.
    pub prerelease: PrereleaseLevel,
}

impl GraphQuery {
    /// Every package, releases only, any platform.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Only the named packages.
    #[must_use]
    pub fn for_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: Some(names.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Restrict to a platform.
    #[must_use]
    pub fn with_platform(mut self, architecture: CpuArchitecture, os: impl Into<String>) -> Self {
        self.architecture = architecture;
        self.os = os.into();
        self
    }

    /// Set the pre-release level.
    #[must_use]
    pub fn with_prerelease(mut self, level: PrereleaseLevel) -> Self {
        self.prerelease = level;
        self
    }

    /// Whether a definition belongs in the answer.
    #[must_use]
    pub fn admits(&self, def: &PackageDef) -> bool {
        self.names
            .as_ref()
            .is_none_or(|names| names.iter().any(|n| *n == def.name))
            && def.is_compatible_with(self.architecture, &self.os)
            && self.prerelease.admits(&def.version)
    }

    /// Build the answer graph from candidate definitions.
    ///
    /// Every queried name is marked as cached at the query's level, also
    /// when nothing matched.
    pub fn collect(&self, defs: impl IntoIterator<Item = PackageDef>) -> PackageDependencyGraph {
        let mut graph = PackageDependencyGraph::new();
        graph.load_from_package_defs_at(defs.into_iter().filter(|def| self.admits(def)), &self.prerelease);
        if let Some(names) = &self.names {
            for name in names {
                graph.mark_cached(name, &self.prerelease);
            }
        }
        graph
    }
}

/// A source of package definitions.
pub trait PackageRepository: Send + Sync {
    /// Location this repository was opened from.
    fn location(&self) -> &str;

    /// Fetch the package versions matching `query`.
    fn query<'a>(&'a self, query: &'a GraphQuery) -> QueryFuture<'a>;
}

/// Repository holding package definitions in memory.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    location: String,
    defs: RwLock<Vec<PackageDef>>,
    failure: RwLock<Option<String>>,
    latency: RwLock<Option<Duration>>,
}

impl MemoryRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            ..Self::default()
        }
    }

    /// Add a package definition.
    pub fn add(&self, def: PackageDef) {
        self.defs.write().push(def);
    }

    /// Add a platform-neutral version from strings.
    pub fn add_version(
        &self,
        name: &str,
        version: &str,
        dependencies: &[(&str, &str)],
    ) -> tapir_core::Result<()> {
        let mut def = PackageDef::new(name, SemanticVersion::parse(version)?);
        for (dep, spec) in dependencies {
            def = def.with_dependency(*dep, VersionSpecifier::parse(spec)?);
        }
        self.add(def);
        Ok(())
    }

    /// Number of stored definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.defs.read().len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.read().is_empty()
    }

    /// Make every following query fail with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.write() = Some(message.into());
    }

    /// Delay every following query.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write() = Some(latency);
    }
}

impl PackageRepository for MemoryRepository {
    fn location(&self) -> &str {
        &self.location
    }

    fn query<'a>(&'a self, query: &'a GraphQuery) -> QueryFuture<'a> {
        Box::pin(async move {
            let latency = *self.latency.read();
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            let failure = self.failure.read().clone();
            if let Some(message) = failure {
                return Err(RepositoryError::Query {
                    location: self.location.clone(),
                    message,
                });
            }
            let defs = self.defs.read().clone();
            Ok(query.collect(defs))
        })
    }
}

/// Repository backed by a directory of JSON package definitions.
///
/// Every `*.json` file below the root holds one definition or an array of
/// them. Files that fail to parse are skipped with a warning.
#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    location: String,
    root: PathBuf,
}

impl DirectoryRepository {
    /// Open a directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let root = root.into();
        let location = root.display().to_string();
        if !root.is_dir() {
            return Err(RepositoryError::Unavailable {
                location,
                message: "not a directory".into(),
            });
        }
        Ok(Self { location, root })
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl PackageRepository for DirectoryRepository {
    fn location(&self) -> &str {
        &self.location
    }

    fn query<'a>(&'a self, query: &'a GraphQuery) -> QueryFuture<'a> {
        Box::pin(async move {
            let root = self.root.clone();
            let defs = tokio::task::spawn_blocking(move || scan_directory(&root))
                .await
                .map_err(|e| RepositoryError::Query {
                    location: self.location.clone(),
                    message: e.to_string(),
                })?;
            debug!(location = %self.location, definitions = defs.len(), "scanned directory");
            Ok(query.collect(defs))
        })
    }
}

fn scan_directory(root: &Path) -> Vec<PackageDef> {
    let mut defs = Vec::new();
    let files = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"));

    for entry in files {
        let path = entry.path();
        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|json| parse_definitions(&json).map_err(|e| e.to_string()));
        match parsed {
            Ok(found) => defs.extend(found),
            Err(error) => warn!(path = %path.display(), %error, "skipping malformed package file"),
        }
    }
    defs
}

fn parse_definitions(json: &str) -> Result<Vec<PackageDef>, sonic_rs::Error> {
    if json.trim_start().starts_with('[') {
        sonic_rs::from_str(json)
    } else {
        sonic_rs::from_str(json).map(|def| vec![def])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> SemanticVersion {
        SemanticVersion::parse(s).unwrap()
    }

    #[test]
    fn query_filters_names_platform_and_prereleases() {
        let defs = vec![
            PackageDef::new("OpenTAP", v("9.13.1")),
            PackageDef::new("OpenTAP", v("9.14.0-beta.1")),
            PackageDef::new("Driver", v("1.0.0")).with_platform(CpuArchitecture::Arm64, "Linux"),
        ];
        let query = GraphQuery::for_names(["OpenTAP", "Driver"]).with_platform(CpuArchitecture::X64, "Windows");
        let graph = query.collect(defs.clone());
        assert_eq!(graph.versions_of("OpenTAP"), vec![v("9.13.1")]);
        assert!(graph.versions_of("Driver").is_empty());
        assert_eq!(graph.prerelease_level_of("Driver"), PrereleaseLevel::Release);

        let beta = GraphQuery::all().with_prerelease(PrereleaseLevel::Floor("beta".into()));
        let graph = beta.collect(defs);
        assert_eq!(graph.versions_of("OpenTAP").len(), 2);
        assert_eq!(
            graph.prerelease_level_of("OpenTAP"),
            PrereleaseLevel::Floor("beta".into())
        );
    }

    #[test]
    fn parses_single_and_array_files() {
        let single = parse_definitions(r#"{"Name": "A", "Version": "1.0.0"}"#).unwrap();
        assert_eq!(single.len(), 1);
        let many = parse_definitions(
            r#"[{"Name": "A", "Version": "1.0.0"}, {"Name": "A", "Version": "1.1.0"}]"#,
        )
        .unwrap();
        assert_eq!(many.len(), 2);
    }

    #[tokio::test]
    async fn memory_repository_answers_and_fails() {
        let repo = MemoryRepository::new("memory://main");
        repo.add_version("A", "1.0.0", &[("B", "^1.0.0")]).unwrap();
        repo.add_version("B", "1.2.0", &[]).unwrap();
        assert_eq!(repo.len(), 2);

        let graph = repo.query(&GraphQuery::all()).await.unwrap();
        assert_eq!(graph.package_count(), 2);

        repo.fail_with("offline");
        let err = repo.query(&GraphQuery::all()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Query { .. }));
    }

    #[test]
    fn missing_directory_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = DirectoryRepository::open(dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, RepositoryError::Unavailable { .. }));
    }
}

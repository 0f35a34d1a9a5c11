//! Repository registry and parallel querying.

use crate::config::ImageConfig;
use crate::error::RepositoryError;
use crate::repository::{DirectoryRepository, GraphQuery, PackageRepository};
use ahash::AHashMap;
use futures::future::join_all;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tapir_core::{CpuArchitecture, PrereleaseLevel};
use tapir_resolver::{PackageDependencyGraph, PrereleaseSource};
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Opens repositories by location and queries many of them at once.
pub struct RepositoryManager {
    registered: RwLock<AHashMap<String, Arc<dyn PackageRepository>>>,
    max_concurrent: usize,
    query_timeout: Duration,
}

impl std::fmt::Debug for RepositoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryManager")
            .field("registered", &self.registered.read().len())
            .field("max_concurrent", &self.max_concurrent)
            .field("query_timeout", &self.query_timeout)
            .finish()
    }
}

impl Default for RepositoryManager {
    fn default() -> Self {
        Self::new(&ImageConfig::default())
    }
}

impl RepositoryManager {
    /// Create a manager using the query limits from `config`.
    #[must_use]
    pub fn new(config: &ImageConfig) -> Self {
        Self {
            registered: RwLock::new(AHashMap::new()),
            max_concurrent: config.max_concurrent_queries.max(1),
            query_timeout: config.query_timeout(),
        }
    }

    /// Canonical form of a location, used to deduplicate.
    ///
    /// Surrounding whitespace and trailing slashes are removed and a URL
    /// scheme is lower-cased.
    #[must_use]
    pub fn normalize_location(location: &str) -> String {
        let trimmed = location.trim();
        let trimmed = match trimmed.trim_end_matches('/') {
            "" if !trimmed.is_empty() => "/",
            rest => rest,
        };
        match trimmed.split_once("://") {
            Some((scheme, rest)) => format!("{}://{rest}", scheme.to_ascii_lowercase()),
            None => trimmed.to_string(),
        }
    }

    /// Make `repository` answer for `location`.
    pub fn register(&self, location: &str, repository: Arc<dyn PackageRepository>) {
        let key = Self::normalize_location(location);
        debug!(location = %key, "registered repository");
        self.registered.write().insert(key, repository);
    }

    /// Repository for a location: a registered one, else a local directory.
    pub fn open(&self, location: &str) -> Result<Arc<dyn PackageRepository>, RepositoryError> {
        let key = Self::normalize_location(location);
        if let Some(repository) = self.registered.read().get(&key) {
            return Ok(Arc::clone(repository));
        }
        let path = key.strip_prefix("file://").unwrap_or(&key);
        if Path::new(path).is_dir() {
            return Ok(Arc::new(DirectoryRepository::open(path)?));
        }
        Err(RepositoryError::Unavailable {
            location: key,
            message: "no registered repository and no such directory".into(),
        })
    }

    /// Query every distinct location and merge the answers.
    ///
    /// Repositories that fail or time out are logged and left out.
    pub async fn query_all(&self, locations: &[String], query: &GraphQuery) -> PackageDependencyGraph {
        let mut unique: Vec<String> = Vec::with_capacity(locations.len());
        for location in locations {
            let key = Self::normalize_location(location);
            if !unique.contains(&key) {
                unique.push(key);
            }
        }

        let semaphore = Semaphore::new(self.max_concurrent);
        let queries = unique
            .iter()
            .map(|location| self.query_one(location, query, &semaphore));
        let results = join_all(queries).await;

        let mut graph = PackageDependencyGraph::new();
        let mut failed = 0usize;
        for (location, result) in unique.iter().zip(results) {
            match result {
                Ok(answer) => {
                    let added = graph.absorb(&answer);
                    debug!(location = %location, added, "merged repository answer");
                }
                Err(error) => {
                    failed += 1;
                    warn!(location = %location, %error, "repository query failed");
                }
            }
        }
        info!(
            repositories = unique.len(),
            failed,
            packages = graph.package_count(),
            "repositories queried"
        );
        graph
    }

    async fn query_one(
        &self,
        location: &str,
        query: &GraphQuery,
        semaphore: &Semaphore,
    ) -> Result<PackageDependencyGraph, RepositoryError> {
        let _permit = semaphore.acquire().await.map_err(|e| RepositoryError::Query {
            location: location.to_string(),
            message: e.to_string(),
        })?;
        let repository = self.open(location)?;
        tokio::time::timeout(self.query_timeout, repository.query(query))
            .await
            .map_err(|_| RepositoryError::Timeout {
                location: location.to_string(),
                secs: self.query_timeout.as_secs(),
            })?
    }

    /// Pre-release source that queries `locations` from the resolver thread.
    ///
    /// The source blocks on `handle`, so it must be called from outside the
    /// runtime's worker threads (for example inside `spawn_blocking`).
    #[must_use]
    pub fn prerelease_source(
        self: &Arc<Self>,
        locations: Vec<String>,
        architecture: CpuArchitecture,
        os: String,
        handle: Handle,
    ) -> Arc<dyn PrereleaseSource> {
        Arc::new(RepositoryBridge {
            manager: Arc::clone(self),
            locations,
            architecture,
            os,
            handle,
        })
    }
}

struct RepositoryBridge {
    manager: Arc<RepositoryManager>,
    locations: Vec<String>,
    architecture: CpuArchitecture,
    os: String,
    handle: Handle,
}

impl PrereleaseSource for RepositoryBridge {
    fn fetch_prereleases(
        &self,
        name: &str,
        level: &PrereleaseLevel,
    ) -> Option<PackageDependencyGraph> {
        let query = GraphQuery::for_names([name])
            .with_platform(self.architecture, self.os.clone())
            .with_prerelease(level.clone());
        let graph = self
            .handle
            .block_on(self.manager.query_all(&self.locations, &query));
        (graph.package_count() > 0).then_some(graph)
    }
}

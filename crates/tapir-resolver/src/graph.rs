//! Interned package dependency graph.
//!
//! The graph stores every known `(name, version)` node once, with its
//! dependency edges as `(name id, specifier id)` pairs. Names, versions and
//! specifiers are interned so repeated strings across thousands of package
//! versions are stored once.
//!
//! Pre-release versions are loaded lazily. Each name carries the
//! [`PrereleaseLevel`] already cached for it. When a lookup needs more, the
//! graph asks its [`PrereleaseSource`] and absorbs the answer.

use crate::intern::{Id, Interner};
use ahash::AHashMap;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;
use tapir_core::{
    CpuArchitecture, PackageDef, PackageDependency, PackageSpecifier, PrereleaseLevel,
    SemanticVersion, VersionSpecifier, os_matches,
};
use tracing::{debug, trace};

type NameId = Id<String>;
type VersionId = Id<SemanticVersion>;
type SpecId = Id<VersionSpecifier>;

/// Supplies pre-release package data on demand.
pub trait PrereleaseSource: Send + Sync {
    /// Package versions of `name` visible at `level`, or `None` when there is
    /// nothing to add.
    fn fetch_prereleases(
        &self,
        name: &str,
        level: &PrereleaseLevel,
    ) -> Option<PackageDependencyGraph>;
}

impl<F> PrereleaseSource for F
where
    F: Fn(&str, &PrereleaseLevel) -> Option<PackageDependencyGraph> + Send + Sync,
{
    fn fetch_prereleases(
        &self,
        name: &str,
        level: &PrereleaseLevel,
    ) -> Option<PackageDependencyGraph> {
        self(name, level)
    }
}

#[derive(Clone)]
struct Node {
    dependencies: SmallVec<[(NameId, SpecId); 4]>,
    architecture: CpuArchitecture,
    os: String,
    hash: Option<String>,
}

/// All known package versions and their dependency edges.
#[derive(Clone, Default)]
pub struct PackageDependencyGraph {
    names: Interner<String>,
    versions: Interner<SemanticVersion>,
    specifiers: Interner<VersionSpecifier>,
    nodes: AHashMap<(NameId, VersionId), Node>,
    versions_of: AHashMap<NameId, Vec<VersionId>>,
    prerelease_levels: AHashMap<NameId, PrereleaseLevel>,
    prerelease_source: Option<Arc<dyn PrereleaseSource>>,
}

impl fmt::Debug for PackageDependencyGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageDependencyGraph")
            .field("names", &self.names.len())
            .field("packages", &self.nodes.len())
            .field("specifiers", &self.specifiers.len())
            .field("prerelease_source", &self.prerelease_source.is_some())
            .finish_non_exhaustive()
    }
}

impl PackageDependencyGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from package definitions.
    #[must_use]
    pub fn from_package_defs(defs: impl IntoIterator<Item = PackageDef>) -> Self {
        let mut graph = Self::new();
        graph.load_from_package_defs(defs);
        graph
    }

    /// Attach the source used for lazy pre-release expansion.
    pub fn set_prerelease_source(&mut self, source: Arc<dyn PrereleaseSource>) {
        self.prerelease_source = Some(source);
    }

    /// Load package definitions. A `(name, version)` already present keeps
    /// its first definition. Returns the number of new nodes.
    pub fn load_from_package_defs(&mut self, defs: impl IntoIterator<Item = PackageDef>) -> usize {
        let mut added = 0;
        for def in defs {
            let name = self.names.intern(&def.name);
            let version = self.versions.intern(&def.version);
            if self.nodes.contains_key(&(name, version)) {
                continue;
            }
            let dependencies = def
                .dependencies
                .iter()
                .map(|dep| (self.names.intern(&dep.name), self.specifiers.intern(&dep.version)))
                .collect();
            self.nodes.insert(
                (name, version),
                Node {
                    dependencies,
                    architecture: def.architecture,
                    os: def.os,
                    hash: def.hash,
                },
            );
            self.versions_of.entry(name).or_default().push(version);
            added += 1;
        }
        added
    }

    /// Load package definitions and record that their names are cached at
    /// `level`.
    pub fn load_from_package_defs_at(
        &mut self,
        defs: impl IntoIterator<Item = PackageDef>,
        level: &PrereleaseLevel,
    ) -> usize {
        let defs: Vec<PackageDef> = defs.into_iter().collect();
        for def in &defs {
            self.mark_cached(&def.name, level);
        }
        self.load_from_package_defs(defs)
    }

    /// Record that `name` is cached at least at `level`.
    pub fn mark_cached(&mut self, name: &str, level: &PrereleaseLevel) {
        let id = self.names.intern(&name.to_string());
        let merged = self
            .prerelease_levels
            .remove(&id)
            .unwrap_or_default()
            .broadest(level.clone());
        self.prerelease_levels.insert(id, merged);
    }

    /// Merge another graph into this one.
    ///
    /// Existing nodes win over incoming ones and cached pre-release levels
    /// merge to the most inclusive of the two.
    pub fn absorb(&mut self, other: &Self) -> usize {
        let added = self.load_from_package_defs(other.to_package_defs());
        let mut levels: Vec<(&str, &PrereleaseLevel)> = other
            .prerelease_levels
            .iter()
            .map(|(id, level)| (other.names[*id].as_str(), level))
            .collect();
        levels.sort_by(|a, b| a.0.cmp(b.0));
        for (name, level) in levels {
            self.mark_cached(name, level);
        }
        added
    }

    /// Export every node as a package definition, sorted by name then
    /// version.
    #[must_use]
    pub fn to_package_defs(&self) -> Vec<PackageDef> {
        let mut defs = Vec::with_capacity(self.nodes.len());
        for name in self.names() {
            let Some(name_id) = self.names.get(name) else {
                continue;
            };
            for version in self.sorted_versions(name_id).into_iter().rev() {
                if let Some(def) = self.def_for(name_id, version) {
                    defs.push(def);
                }
            }
        }
        defs
    }

    /// Number of `(name, version)` nodes.
    #[must_use]
    pub fn package_count(&self) -> usize {
        self.nodes.len()
    }

    /// Names with at least one version, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .versions_of
            .keys()
            .map(|id| self.names[*id].as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Known versions of `name`, newest first.
    #[must_use]
    pub fn versions_of(&self, name: &str) -> Vec<SemanticVersion> {
        self.names
            .get(name)
            .map(|id| {
                self.sorted_versions(id)
                    .into_iter()
                    .map(|v| self.versions[v].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether the node is known.
    #[must_use]
    pub fn contains(&self, name: &str, version: &SemanticVersion) -> bool {
        self.node_key(name, version).is_some()
    }

    /// Published hash of a node.
    #[must_use]
    pub fn package_hash(&self, name: &str, version: &SemanticVersion) -> Option<&str> {
        let key = self.node_key(name, version)?;
        self.nodes.get(&key)?.hash.as_deref()
    }

    /// Full definition of a node.
    #[must_use]
    pub fn package_def(&self, name: &str, version: &SemanticVersion) -> Option<PackageDef> {
        let (name_id, version_id) = self.node_key(name, version)?;
        self.def_for(name_id, version_id)
    }

    /// Pre-release level cached for `name`.
    #[must_use]
    pub fn prerelease_level_of(&self, name: &str) -> PrereleaseLevel {
        self.names
            .get(name)
            .and_then(|id| self.prerelease_levels.get(&id))
            .cloned()
            .unwrap_or_default()
    }

    /// Make sure pre-releases of `name` down to `level` are loaded.
    ///
    /// The level is recorded even when the source has nothing to add, so the
    /// source is asked at most once per name and level.
    pub fn ensure_prerelease_level(&mut self, name: &str, level: &PrereleaseLevel) {
        if self.prerelease_level_of(name).covers(level) {
            return;
        }
        if let Some(source) = self.prerelease_source.clone() {
            debug!(package = name, level = %level, "expanding pre-releases");
            if let Some(fetched) = source.fetch_prereleases(name, level) {
                let added = self.absorb(&fetched);
                trace!(package = name, added, "absorbed pre-releases");
            }
        }
        self.mark_cached(name, level);
    }

    /// Versions matching the specifier and its platform, newest first.
    pub fn packages_satisfying(&mut self, spec: &PackageSpecifier) -> Vec<SemanticVersion> {
        self.ensure_prerelease_level(&spec.name, &spec.version.prerelease_level());
        let Some(name_id) = self.names.get(spec.name.as_str()) else {
            return Vec::new();
        };
        self.sorted_versions(name_id)
            .into_iter()
            .filter(|v| {
                self.nodes.get(&(name_id, *v)).is_some_and(|node| {
                    node.architecture.is_compatible_with(spec.architecture)
                        && os_matches(&node.os, &spec.os)
                })
            })
            .map(|v| self.versions[v].clone())
            .filter(|v| spec.version.is_satisfied_by(v))
            .collect()
    }

    /// Dependencies of a node, or `None` when the node is unknown.
    ///
    /// An unknown pre-release triggers pre-release expansion first.
    pub fn dependencies(
        &mut self,
        name: &str,
        version: &SemanticVersion,
    ) -> Option<Vec<PackageDependency>> {
        if version.is_prerelease() && !self.contains(name, version) {
            self.ensure_prerelease_level(name, &PrereleaseLevel::for_version(version));
        }
        let key = self.node_key(name, version)?;
        let node = self.nodes.get(&key)?;
        Some(self.edges(node))
    }

    /// Whether `version` of `name` could be part of a consistent selection
    /// together with `others` and `fixed`.
    ///
    /// Every reachable dependency edge must be compatible with all
    /// same-named constraints, the subject included. Pinned and
    /// unconstrained dependencies are followed. Nodes still being visited
    /// and walks deeper than `max_depth` count as satisfiable, so cycles
    /// resolve optimistically.
    pub fn could_satisfy(
        &mut self,
        name: &str,
        version: &VersionSpecifier,
        others: &[PackageSpecifier],
        fixed: &[PackageSpecifier],
        max_depth: usize,
    ) -> bool {
        let mut context: Vec<(String, VersionSpecifier)> = others
            .iter()
            .chain(fixed)
            .map(|p| (p.name.clone(), p.version.clone()))
            .collect();
        context.push((name.to_string(), version.clone()));

        let mut walk = Walk {
            context: &context,
            memo: AHashMap::new(),
            max_depth,
        };
        match version.try_as_exact() {
            Some(exact) => walk.visit(self, name, &exact, 0),
            None => walk.any_consistent(self, &PackageDependency::new(name, version.clone()), 0),
        }
    }

    fn node_key(&self, name: &str, version: &SemanticVersion) -> Option<(NameId, VersionId)> {
        let key = (self.names.get(name)?, self.versions.get(version)?);
        self.nodes.contains_key(&key).then_some(key)
    }

    fn sorted_versions(&self, name: NameId) -> Vec<VersionId> {
        let mut ids = self.versions_of.get(&name).cloned().unwrap_or_default();
        ids.sort_by(|a, b| self.versions[*b].cmp(&self.versions[*a]));
        ids
    }

    fn edges(&self, node: &Node) -> Vec<PackageDependency> {
        node.dependencies
            .iter()
            .map(|(n, s)| PackageDependency::new(self.names[*n].clone(), self.specifiers[*s].clone()))
            .collect()
    }

    fn def_for(&self, name: NameId, version: VersionId) -> Option<PackageDef> {
        let node = self.nodes.get(&(name, version))?;
        Some(PackageDef {
            name: self.names[name].clone(),
            version: self.versions[version].clone(),
            architecture: node.architecture,
            os: node.os.clone(),
            dependencies: self.edges(node),
            hash: node.hash.clone(),
        })
    }
}

/// State of one `could_satisfy` walk.
struct Walk<'a> {
    context: &'a [(String, VersionSpecifier)],
    memo: AHashMap<(NameId, VersionId), bool>,
    max_depth: usize,
}

impl Walk<'_> {
    fn visit(
        &mut self,
        graph: &mut PackageDependencyGraph,
        name: &str,
        version: &SemanticVersion,
        depth: usize,
    ) -> bool {
        if depth > self.max_depth {
            return true;
        }
        let Some(dependencies) = graph.dependencies(name, version) else {
            return true;
        };
        let Some(key) = graph.node_key(name, version) else {
            return true;
        };
        if let Some(&known) = self.memo.get(&key) {
            return known;
        }
        self.memo.insert(key, true);

        let ok = dependencies
            .iter()
            .all(|dep| self.edge_consistent(graph, dep, depth));
        if !ok {
            trace!(package = name, version = %version, "cannot be satisfied");
        }
        self.memo.insert(key, ok);
        ok
    }

    fn edge_consistent(
        &mut self,
        graph: &mut PackageDependencyGraph,
        dep: &PackageDependency,
        depth: usize,
    ) -> bool {
        let mut constrained = false;
        for (name, spec) in self.context {
            if *name == dep.name {
                if !spec.is_compatible_with(&dep.version) {
                    return false;
                }
                constrained = true;
            }
        }
        let pinned = dep.version.is_exact()
            && dep.version.major.is_some()
            && dep.version.minor.is_some()
            && dep.version.patch.is_some();
        if pinned || !constrained {
            return self.any_consistent(graph, dep, depth + 1);
        }
        true
    }

    fn any_consistent(
        &mut self,
        graph: &mut PackageDependencyGraph,
        dep: &PackageDependency,
        depth: usize,
    ) -> bool {
        let candidates =
            graph.packages_satisfying(&PackageSpecifier::new(dep.name.clone(), dep.version.clone()));
        candidates
            .iter()
            .any(|candidate| self.visit(graph, &dep.name, candidate, depth))
    }
}

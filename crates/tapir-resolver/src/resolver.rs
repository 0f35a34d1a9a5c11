//! Backtracking image resolver.
//!
//! Each attempt works on a list of package specifiers:
//!
//! 1. duplicate names collapse to the narrower specifier;
//! 2. dependencies of pinned packages are folded into the list;
//! 3. candidate versions are looked up in the graph;
//! 4. candidates that cannot be satisfied are pruned, and a lone survivor
//!    pins its package before starting over;
//! 5. an empty candidate list fails, all singleton lists succeed;
//! 6. candidates are ranked by closeness to their specifier;
//! 7. otherwise each ambiguous package is pinned to each candidate in turn
//!    and the attempt recurses.

use crate::config::ResolverConfig;
use crate::graph::PackageDependencyGraph;
use crate::types::{ImageResolution, ResolutionFailure, ResolveError};
use tapir_core::{ImageSpecifier, PackageDependency, PackageSpecifier, SemanticVersion, VersionSpecifier};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

enum Attempt {
    Solved(Vec<PackageSpecifier>),
    Failed(ResolutionFailure),
}

/// Finds one consistent set of exact package versions.
///
/// The search is synchronous and single-threaded. It checks the
/// cancellation token at every recursive attempt.
pub struct ImageResolver {
    config: ResolverConfig,
    cancel: CancellationToken,
    iterations: usize,
}

impl std::fmt::Debug for ImageResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageResolver")
            .field("config", &self.config)
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

impl ImageResolver {
    /// Create a resolver.
    #[must_use]
    pub const fn new(config: ResolverConfig, cancel: CancellationToken) -> Self {
        Self {
            config,
            cancel,
            iterations: 0,
        }
    }

    /// Recursive attempts made by the last run.
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// Resolve an image request against a graph.
    pub fn resolve(
        &mut self,
        image: &ImageSpecifier,
        graph: &mut PackageDependencyGraph,
    ) -> Result<ImageResolution, ResolveError> {
        self.resolve_packages(&image.packages, &image.fixed_packages, graph)
    }

    /// Resolve `packages` while keeping every `fixed` package as it is.
    pub fn resolve_packages(
        &mut self,
        packages: &[PackageSpecifier],
        fixed: &[PackageSpecifier],
        graph: &mut PackageDependencyGraph,
    ) -> Result<ImageResolution, ResolveError> {
        self.iterations = 0;
        info!(
            packages = packages.len(),
            fixed = fixed.len(),
            known = graph.package_count(),
            "resolving image"
        );

        match self.attempt(packages.to_vec(), fixed, graph, 0)? {
            Attempt::Solved(packages) => {
                info!(
                    packages = packages.len(),
                    iterations = self.iterations,
                    "resolution complete"
                );
                Ok(ImageResolution::Resolved {
                    packages,
                    iterations: self.iterations,
                })
            }
            Attempt::Failed(failure) => {
                info!(iterations = self.iterations, %failure, "resolution failed");
                Ok(ImageResolution::Failed {
                    failure,
                    iterations: self.iterations,
                })
            }
        }
    }

    fn attempt(
        &mut self,
        mut packages: Vec<PackageSpecifier>,
        fixed: &[PackageSpecifier],
        graph: &mut PackageDependencyGraph,
        depth: usize,
    ) -> Result<Attempt, ResolveError> {
        self.iterations += 1;
        trace!(iteration = self.iterations, depth, packages = packages.len(), "attempt");

        let (packages, candidates) = loop {
            if self.cancel.is_cancelled() {
                debug!(iteration = self.iterations, "cancelled");
                return Err(ResolveError::Cancelled);
            }

            packages = match normalize(packages) {
                Ok(packages) => packages,
                Err(failure) => return Ok(Attempt::Failed(failure)),
            };
            if let Err(failure) = expand_pinned(&mut packages, fixed, graph) {
                return Ok(Attempt::Failed(failure));
            }

            let unpruned: Vec<Vec<SemanticVersion>> = packages
                .iter()
                .map(|package| candidates_for(package, fixed, graph))
                .collect();
            let mut candidates = unpruned.clone();
            for (package, list) in packages.iter().zip(&mut candidates) {
                list.retain(|version| {
                    graph.could_satisfy(
                        &package.name,
                        &VersionSpecifier::exact(version),
                        &packages,
                        fixed,
                        self.config.max_lookahead_depth,
                    )
                });
            }

            let mut pinned_any = false;
            for (package, list) in packages.iter_mut().zip(&candidates) {
                if let [only] = list.as_slice() {
                    let pinned = VersionSpecifier::exact(only);
                    if package.version != pinned {
                        debug!(package = %package.name, version = %only, "only one candidate left");
                        package.version = pinned;
                        pinned_any = true;
                    }
                }
            }
            if pinned_any {
                continue;
            }

            let empty: Vec<usize> = (0..packages.len())
                .filter(|&i| candidates[i].is_empty())
                .collect();
            if !empty.is_empty() {
                let failure = no_candidates(&packages, &unpruned, &empty, graph);
                debug!(%failure, "no candidates");
                return Ok(Attempt::Failed(failure));
            }
            break (packages, candidates);
        };

        if candidates.iter().all(|list| list.len() == 1) {
            let mut solved: Vec<PackageSpecifier> = packages
                .iter()
                .zip(&candidates)
                .map(|(package, list)| package.with_version(VersionSpecifier::exact(&list[0])))
                .collect();
            solved.sort_by(|a, b| a.name.cmp(&b.name));
            return Ok(Attempt::Solved(solved));
        }

        let mut candidates = candidates;
        for (package, list) in packages.iter().zip(&mut candidates) {
            list.sort_by(|a, b| package.version.sort_order(a, b));
        }

        let ambiguous: Vec<usize> = (0..packages.len())
            .filter(|&i| candidates[i].len() > 1)
            .collect();
        for &index in &ambiguous {
            for candidate in &candidates[index] {
                debug!(
                    package = %packages[index].name,
                    version = %candidate,
                    depth,
                    "trying candidate"
                );
                let mut next = packages.clone();
                next[index].version = VersionSpecifier::exact(candidate);
                match self.attempt(next, fixed, graph, depth + 1)? {
                    Attempt::Solved(solved) => return Ok(Attempt::Solved(solved)),
                    Attempt::Failed(failure) => {
                        trace!(package = %packages[index].name, version = %candidate, %failure, "backtracking");
                    }
                }
            }
        }

        Ok(Attempt::Failed(ResolutionFailure::Exhausted {
            ambiguous: ambiguous.iter().map(|&i| packages[i].clone()).collect(),
        }))
    }
}

/// Collapse same-named specifiers to the narrower one.
fn normalize(packages: Vec<PackageSpecifier>) -> Result<Vec<PackageSpecifier>, ResolutionFailure> {
    let mut out: Vec<PackageSpecifier> = Vec::with_capacity(packages.len());
    for package in packages {
        match out.iter().position(|existing| existing.name == package.name) {
            None => out.push(package),
            Some(index) => {
                let existing = &out[index];
                if package.version.is_superset_of(&existing.version) {
                    continue;
                }
                if existing.version.is_superset_of(&package.version) {
                    out[index] = package;
                } else {
                    return Err(ResolutionFailure::Conflict {
                        first: existing.clone(),
                        second: package,
                    });
                }
            }
        }
    }
    Ok(out)
}

/// Fold dependencies of pinned packages into the list until it stops
/// changing.
fn expand_pinned(
    packages: &mut Vec<PackageSpecifier>,
    fixed: &[PackageSpecifier],
    graph: &mut PackageDependencyGraph,
) -> Result<(), ResolutionFailure> {
    loop {
        let mut modified = false;
        let mut index = 0;
        while index < packages.len() {
            let depender = packages[index].clone();
            index += 1;
            let Some(version) = depender.exact_version() else {
                continue;
            };
            let Some(dependencies) = graph.dependencies(&depender.name, &version) else {
                continue;
            };

            for dependency in dependencies {
                let conflict = |existing: &PackageSpecifier| ResolutionFailure::DependencyConflict {
                    package: depender.clone(),
                    dependency: dependency.clone(),
                    existing: existing.clone(),
                };

                if let Some(pinned) = fixed
                    .iter()
                    .find(|f| f.name == dependency.name && !f.version.is_compatible_with(&dependency.version))
                {
                    return Err(conflict(pinned));
                }

                match packages.iter().position(|p| p.name == dependency.name) {
                    None => {
                        trace!(package = %depender.name, dependency = %dependency, "adding dependency");
                        packages.push(PackageSpecifier {
                            name: dependency.name.clone(),
                            version: dependency.version.clone(),
                            architecture: depender.architecture,
                            os: depender.os.clone(),
                        });
                    }
                    Some(existing) => {
                        let current = &packages[existing];
                        if dependency.version.is_superset_of(&current.version) {
                            continue;
                        }
                        if current.version.is_superset_of(&dependency.version)
                            && current.exact_version().is_none()
                        {
                            trace!(package = %current.name, to = %dependency.version, "narrowing");
                            packages[existing] = current.with_version(dependency.version.clone());
                            modified = true;
                        } else {
                            return Err(conflict(current));
                        }
                    }
                }
            }
        }
        if !modified {
            return Ok(());
        }
    }
}

fn candidates_for(
    package: &PackageSpecifier,
    fixed: &[PackageSpecifier],
    graph: &mut PackageDependencyGraph,
) -> Vec<SemanticVersion> {
    let mut versions = graph.packages_satisfying(package);
    versions.retain(|version| {
        fixed
            .iter()
            .filter(|f| f.name == package.name)
            .all(|f| f.version.is_satisfied_by(version))
    });
    versions
}

fn no_candidates(
    packages: &[PackageSpecifier],
    unpruned: &[Vec<SemanticVersion>],
    empty: &[usize],
    graph: &mut PackageDependencyGraph,
) -> ResolutionFailure {
    let mut missing: Vec<(PackageSpecifier, PackageDependency)> = Vec::new();
    for &index in empty {
        let package = &packages[index];
        for version in &unpruned[index] {
            let Some(dependencies) = graph.dependencies(&package.name, version) else {
                continue;
            };
            for dependency in dependencies {
                let lookup = PackageSpecifier::new(dependency.name.clone(), dependency.version.clone());
                if graph.packages_satisfying(&lookup).is_empty() {
                    let depender = package.with_version(VersionSpecifier::exact(version));
                    if !missing.contains(&(depender.clone(), dependency.clone())) {
                        missing.push((depender, dependency));
                    }
                }
            }
        }
    }
    ResolutionFailure::NoCandidates {
        packages: empty.iter().map(|&i| packages[i].clone()).collect(),
        missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapir_core::PackageDef;

    fn v(s: &str) -> SemanticVersion {
        SemanticVersion::parse(s).unwrap()
    }

    fn spec(name: &str, version: &str) -> PackageSpecifier {
        PackageSpecifier::new(name, VersionSpecifier::parse(version).unwrap())
    }

    #[test]
    fn normalize_keeps_narrower() {
        let out = normalize(vec![spec("A", "^1.0.0"), spec("A", "^1.2.0"), spec("A", "any")]).unwrap();
        assert_eq!(out, vec![spec("A", "^1.2.0")]);
    }

    #[test]
    fn normalize_reports_conflict() {
        let failure = normalize(vec![spec("A", "1.0.0"), spec("A", "2.0.0")]).unwrap_err();
        assert!(matches!(failure, ResolutionFailure::Conflict { .. }));
    }

    #[test]
    fn expansion_narrows_and_appends() {
        let mut graph = PackageDependencyGraph::from_package_defs([
            PackageDef::new("App", v("1.0.0"))
                .with_dependency("Lib", VersionSpecifier::parse("^1.2.0").unwrap())
                .with_dependency("Util", VersionSpecifier::parse("any").unwrap()),
        ]);
        let mut packages = vec![
            PackageSpecifier::new("App", VersionSpecifier::exact(&v("1.0.0"))),
            spec("Lib", "^1.0.0"),
        ];
        expand_pinned(&mut packages, &[], &mut graph).unwrap();
        assert_eq!(packages[1], spec("Lib", "^1.2.0"));
        assert_eq!(packages[2].name, "Util");
    }

    #[test]
    fn expansion_rejects_pinned_mismatch() {
        let mut graph = PackageDependencyGraph::from_package_defs([
            PackageDef::new("App", v("1.0.0")).with_dependency("Lib", VersionSpecifier::parse("^2.0.0").unwrap()),
        ]);
        let mut packages = vec![
            PackageSpecifier::new("App", VersionSpecifier::exact(&v("1.0.0"))),
            PackageSpecifier::new("Lib", VersionSpecifier::exact(&v("1.5.0"))),
        ];
        let failure = expand_pinned(&mut packages, &[], &mut graph).unwrap_err();
        assert!(matches!(failure, ResolutionFailure::DependencyConflict { .. }));
    }
}

//! Resolution results and failures.

use std::fmt;
use tapir_core::{PackageDependency, PackageSpecifier};
use thiserror::Error;

/// Why no consistent package set was found.
///
/// Failures are ordinary values; only cancellation is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionFailure {
    /// Two requests for the same package where neither contains the other.
    Conflict {
        /// Request seen first.
        first: PackageSpecifier,
        /// Request that clashed with it.
        second: PackageSpecifier,
    },
    /// A pinned package depends on something the selection already rules out.
    DependencyConflict {
        /// The depending package, pinned.
        package: PackageSpecifier,
        /// Its dependency.
        dependency: PackageDependency,
        /// The constraint the dependency clashes with.
        existing: PackageSpecifier,
    },
    /// Packages with no usable version.
    NoCandidates {
        /// Packages without candidates.
        packages: Vec<PackageSpecifier>,
        /// Unavailable dependencies found among the rejected candidates,
        /// paired with the candidate that needs them.
        missing: Vec<(PackageSpecifier, PackageDependency)>,
    },
    /// Every combination of the remaining candidates failed.
    Exhausted {
        /// Packages that still had more than one candidate.
        ambiguous: Vec<PackageSpecifier>,
    },
}

impl ResolutionFailure {
    /// Specifiers responsible for the failure.
    #[must_use]
    pub fn specifiers(&self) -> Vec<&PackageSpecifier> {
        match self {
            Self::Conflict { first, second } => vec![first, second],
            Self::DependencyConflict {
                package, existing, ..
            } => vec![package, existing],
            Self::NoCandidates { packages, .. } => packages.iter().collect(),
            Self::Exhausted { ambiguous } => ambiguous.iter().collect(),
        }
    }
}

fn join_names(packages: &[PackageSpecifier]) -> String {
    packages
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict { first, second } => write!(
                f,
                "conflicting requirements for {}: {} and {}",
                first.name, first.version, second.version
            ),
            Self::DependencyConflict {
                package,
                dependency,
                existing,
            } => write!(
                f,
                "{package} requires {dependency}, which conflicts with {existing}"
            ),
            Self::NoCandidates { packages, missing } => {
                write!(f, "no matching version found for {}", join_names(packages))?;
                for (depender, dependency) in missing {
                    write!(
                        f,
                        "; {depender} depends on {dependency}, which is not available"
                    )?;
                }
                Ok(())
            }
            Self::Exhausted { ambiguous } => write!(
                f,
                "no consistent combination of versions exists for {}",
                join_names(ambiguous)
            ),
        }
    }
}

/// Outcome of a resolution run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageResolution {
    /// A consistent selection was found.
    Resolved {
        /// One exact specifier per package, sorted by name.
        packages: Vec<PackageSpecifier>,
        /// Recursive attempts used.
        iterations: usize,
    },
    /// No consistent selection exists.
    Failed {
        /// What went wrong.
        failure: ResolutionFailure,
        /// Recursive attempts used.
        iterations: usize,
    },
}

impl ImageResolution {
    /// Whether resolution succeeded.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }

    /// Recursive attempts used.
    #[must_use]
    pub const fn iterations(&self) -> usize {
        match self {
            Self::Resolved { iterations, .. } | Self::Failed { iterations, .. } => *iterations,
        }
    }

    /// Resolved packages, if any.
    #[must_use]
    pub fn packages(&self) -> Option<&[PackageSpecifier]> {
        match self {
            Self::Resolved { packages, .. } => Some(packages),
            Self::Failed { .. } => None,
        }
    }

    /// The failure, if any.
    #[must_use]
    pub const fn failure(&self) -> Option<&ResolutionFailure> {
        match self {
            Self::Resolved { .. } => None,
            Self::Failed { failure, .. } => Some(failure),
        }
    }
}

/// Errors that abort resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The cancellation token was triggered.
    #[error("resolution cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapir_core::VersionSpecifier;

    fn spec(name: &str, version: &str) -> PackageSpecifier {
        PackageSpecifier::new(name, VersionSpecifier::parse(version).unwrap())
    }

    #[test]
    fn conflict_names_both_constraints() {
        let failure = ResolutionFailure::Conflict {
            first: spec("OpenTAP", "9.17.4"),
            second: spec("OpenTAP", "9.17.2"),
        };
        assert_eq!(
            failure.to_string(),
            "conflicting requirements for OpenTAP: 9.17.4 and 9.17.2"
        );
        assert_eq!(failure.specifiers().len(), 2);
    }

    #[test]
    fn missing_dependency_is_described() {
        let failure = ResolutionFailure::NoCandidates {
            packages: vec![spec("App", "^1.0.0")],
            missing: vec![(
                spec("App", "1.0.0"),
                PackageDependency::new("Lib", VersionSpecifier::parse("^2.0.0").unwrap()),
            )],
        };
        let message = failure.to_string();
        assert!(message.contains("App (^1.0.0)"));
        assert!(message.contains("Lib (^2.0.0), which is not available"));
    }
}

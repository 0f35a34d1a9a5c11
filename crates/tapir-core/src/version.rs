//! Semantic versions and version specifiers.
//!
//! A [`SemanticVersion`] is one concrete `major.minor.patch[-prerelease][+build]`
//! version. A [`VersionSpecifier`] is a constraint over versions:
//!
//! - Exact: `9`, `9.13`, `9.13.1`, `9.13.1-beta.2`, `9.13.1+abc123`
//! - Compatible: `^9.13.1` (same major, at least `13.1`)
//! - Pre-release floors: `alpha`, `beta`, `rc`, `beta.2`
//! - Anything: `any` (including pre-releases), `anyrelease` or the empty string
//!
//! Acceptance is the product of three independent conditions (on the
//! version triple, on the pre-release and on the build metadata), which is
//! what makes [`VersionSpecifier::is_superset_of`] exact.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::BitOr;
use std::str::FromStr;
use std::sync::LazyLock;

static SPECIFIER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^
        (?P<compatible>\^)?
        (?P<major>\d+)
        (?:
            \.(?P<minor>\d+)
            (?:\.(?P<patch>\d+))?
        )?
        (?:-(?P<pre>[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?
        (?:\+(?P<build>[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?
        $
        ",
    )
    .expect("valid regex")
});

static FLOOR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<level>alpha|beta|rc)(?P<rest>(?:\.[0-9A-Za-z-]+)*)$")
        .expect("valid regex")
});

/// Pre-release identifier, borrowed from the pre-release string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Identifier<'a> {
    /// Numeric identifiers sort before alphanumeric ones.
    Numeric(u64),
    Alphanumeric(&'a str),
}

impl<'a> Identifier<'a> {
    fn new(part: &'a str) -> Self {
        if !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = part.parse() {
                return Self::Numeric(n);
            }
        }
        Self::Alphanumeric(part)
    }
}

/// Compare two pre-release strings.
///
/// The empty string stands for a release and is greater than every
/// pre-release. Otherwise identifiers are compared left to right and a
/// shorter list that is a prefix of the longer one sorts first.
#[must_use]
pub fn compare_prerelease(a: &str, b: &str) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }

    let mut left = a.split('.').map(Identifier::new);
    let mut right = b.split('.').map(Identifier::new);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => match l.cmp(&r) {
                Ordering::Equal => {}
                ord => return ord,
            },
        }
    }
}

/// A concrete semantic version.
///
/// Build metadata does not take part in precedence ([`Self::cmp_precedence`])
/// but it is part of the identity: `1.0.0+a` and `1.0.0+b` are different
/// packages. `Ord` falls back to the build string on precedence ties so it
/// stays consistent with `Eq`.
#[derive(Clone)]
pub struct SemanticVersion {
    inner: semver::Version,
}

impl SemanticVersion {
    /// Create a release version.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            inner: semver::Version::new(major, minor, patch),
        }
    }

    /// Parse `major.minor.patch[-prerelease][+build]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use tapir_core::SemanticVersion;
    ///
    /// let v = SemanticVersion::parse("9.13.1-beta.2+abc").unwrap();
    /// assert_eq!((v.major(), v.minor(), v.patch()), (9, 13, 1));
    /// assert_eq!(v.pre_release(), "beta.2");
    /// assert!(SemanticVersion::parse("9.13.1-").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        semver::Version::parse(input.trim())
            .map(|inner| Self { inner })
            .map_err(|_| Error::version(input))
    }

    /// Build a version from its parts.
    pub fn from_parts(
        major: u64,
        minor: u64,
        patch: u64,
        pre_release: &str,
        build_metadata: &str,
    ) -> Result<Self> {
        let invalid = || Error::InvalidVersion {
            input: format!("{major}.{minor}.{patch}-{pre_release}+{build_metadata}"),
        };
        let pre = if pre_release.is_empty() {
            semver::Prerelease::EMPTY
        } else {
            semver::Prerelease::new(pre_release).map_err(|_| invalid())?
        };
        let build = if build_metadata.is_empty() {
            semver::BuildMetadata::EMPTY
        } else {
            semver::BuildMetadata::new(build_metadata).map_err(|_| invalid())?
        };
        Ok(Self {
            inner: semver::Version {
                major,
                minor,
                patch,
                pre,
                build,
            },
        })
    }

    /// Major component.
    #[must_use]
    pub const fn major(&self) -> u64 {
        self.inner.major
    }

    /// Minor component.
    #[must_use]
    pub const fn minor(&self) -> u64 {
        self.inner.minor
    }

    /// Patch component.
    #[must_use]
    pub const fn patch(&self) -> u64 {
        self.inner.patch
    }

    /// Pre-release string, empty for releases.
    #[must_use]
    pub fn pre_release(&self) -> &str {
        self.inner.pre.as_str()
    }

    /// Build metadata, empty when absent.
    #[must_use]
    pub fn build_metadata(&self) -> &str {
        self.inner.build.as_str()
    }

    /// Whether this is a pre-release.
    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        !self.inner.pre.is_empty()
    }

    /// Compare ignoring build metadata.
    #[must_use]
    pub fn cmp_precedence(&self, other: &Self) -> Ordering {
        (self.major(), self.minor(), self.patch())
            .cmp(&(other.major(), other.minor(), other.patch()))
            .then_with(|| compare_prerelease(self.pre_release(), other.pre_release()))
    }
}

impl PartialEq for SemanticVersion {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl Eq for SemanticVersion {}

impl Hash for SemanticVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_precedence(other)
            .then_with(|| self.build_metadata().cmp(other.build_metadata()))
    }
}

impl fmt::Debug for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SemanticVersion({})", self.inner)
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl FromStr for SemanticVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for SemanticVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SemanticVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// How a [`VersionSpecifier`] matches versions.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionMatchBehavior(u8);

impl VersionMatchBehavior {
    /// Every specified component must match exactly.
    pub const EXACT: Self = Self(1);
    /// Same major, at least the given minor/patch.
    pub const COMPATIBLE: Self = Self(1 << 1);
    /// Pre-releases at or above the given floor are accepted.
    pub const ANY_PRERELEASE: Self = Self(1 << 2);

    /// Whether all flags of `other` are set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of two flag sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl Default for VersionMatchBehavior {
    fn default() -> Self {
        Self::EXACT
    }
}

impl BitOr for VersionMatchBehavior {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Debug for VersionMatchBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::EXACT, "EXACT"),
            (Self::COMPATIBLE, "COMPATIBLE"),
            (Self::ANY_PRERELEASE, "ANY_PRERELEASE"),
        ];
        let set: Vec<_> = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "VersionMatchBehavior({})", set.join(" | "))
    }
}

/// How much pre-release data a query needs, or a cache holds.
///
/// Levels are totally ordered by inclusiveness:
/// `Release` < `Floor("rc")` < `Floor("beta")` < `Floor("alpha")` < `All`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum PrereleaseLevel {
    /// Releases only.
    #[default]
    Release,
    /// Releases and pre-releases at or above the floor.
    Floor(String),
    /// Everything.
    All,
}

impl PrereleaseLevel {
    /// Level needed to see one specific version.
    #[must_use]
    pub fn for_version(version: &SemanticVersion) -> Self {
        if version.is_prerelease() {
            Self::Floor(version.pre_release().to_string())
        } else {
            Self::Release
        }
    }

    /// Whether everything `other` admits is admitted by `self`.
    #[must_use]
    pub fn covers(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::All, _) | (_, Self::Release) => true,
            (Self::Release, _) | (Self::Floor(_), Self::All) => false,
            (Self::Floor(mine), Self::Floor(theirs)) => {
                compare_prerelease(theirs, mine) != Ordering::Less
            }
        }
    }

    /// Whether a version is visible at this level.
    #[must_use]
    pub fn admits(&self, version: &SemanticVersion) -> bool {
        if !version.is_prerelease() {
            return true;
        }
        match self {
            Self::Release => false,
            Self::All => true,
            Self::Floor(floor) => {
                compare_prerelease(version.pre_release(), floor) != Ordering::Less
            }
        }
    }

    /// The more inclusive of two levels.
    #[must_use]
    pub fn broadest(self, other: Self) -> Self {
        if self.covers(&other) { self } else { other }
    }
}

impl fmt::Display for PrereleaseLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Release => write!(f, "release"),
            Self::Floor(floor) => write!(f, "{floor}"),
            Self::All => write!(f, "all"),
        }
    }
}

/// Set of pre-release strings a specifier accepts ("" is a release).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrereleaseSet<'a> {
    Only(&'a str),
    Floor(Option<&'a str>),
}

impl PrereleaseSet<'_> {
    fn contains(self, pre: &str) -> bool {
        match self {
            Self::Only(only) => only == pre,
            Self::Floor(None) => true,
            Self::Floor(Some(floor)) => {
                pre.is_empty() || compare_prerelease(pre, floor) != Ordering::Less
            }
        }
    }

    fn is_superset_of(self, other: Self) -> bool {
        match (self, other) {
            (Self::Only(a), Self::Only(b)) => a == b,
            (Self::Only(_), Self::Floor(_)) => false,
            (Self::Floor(_), Self::Only(b)) => self.contains(b),
            (Self::Floor(None), Self::Floor(_)) => true,
            (Self::Floor(Some(_)), Self::Floor(None)) => false,
            (Self::Floor(Some(mine)), Self::Floor(Some(theirs))) => {
                compare_prerelease(theirs, mine) != Ordering::Less
            }
        }
    }
}

/// A constraint over [`SemanticVersion`]s.
///
/// An unspecified component matches any value at that position (and below).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionSpecifier {
    /// Major component.
    pub major: Option<u64>,
    /// Minor component.
    pub minor: Option<u64>,
    /// Patch component.
    pub patch: Option<u64>,
    /// Pre-release (exact value, or floor when compatible).
    pub pre_release: Option<String>,
    /// Build metadata, only meaningful for exact specifiers.
    pub build_metadata: Option<String>,
    /// Match behavior flags.
    pub match_behavior: VersionMatchBehavior,
}

impl VersionSpecifier {
    /// Any version, including pre-releases.
    pub const ANY: Self = Self {
        major: None,
        minor: None,
        patch: None,
        pre_release: None,
        build_metadata: None,
        match_behavior: VersionMatchBehavior::COMPATIBLE
            .union(VersionMatchBehavior::ANY_PRERELEASE),
    };

    /// Any release version.
    pub const ANY_RELEASE: Self = Self {
        major: None,
        minor: None,
        patch: None,
        pre_release: None,
        build_metadata: None,
        match_behavior: VersionMatchBehavior::COMPATIBLE,
    };

    /// Specifier matching exactly one version, build metadata included.
    #[must_use]
    pub fn exact(version: &SemanticVersion) -> Self {
        Self {
            major: Some(version.major()),
            minor: Some(version.minor()),
            patch: Some(version.patch()),
            pre_release: version
                .is_prerelease()
                .then(|| version.pre_release().to_string()),
            build_metadata: Some(version.build_metadata().to_string()),
            match_behavior: VersionMatchBehavior::EXACT,
        }
    }

    /// Compatible (`^`) specifier with the version as lower bound.
    #[must_use]
    pub fn compatible(version: &SemanticVersion) -> Self {
        Self {
            major: Some(version.major()),
            minor: Some(version.minor()),
            patch: Some(version.patch()),
            pre_release: version
                .is_prerelease()
                .then(|| version.pre_release().to_string()),
            build_metadata: None,
            match_behavior: VersionMatchBehavior::COMPATIBLE,
        }
    }

    /// Pre-release floor such as `beta` or `rc.2`.
    #[must_use]
    pub fn prerelease_floor(floor: impl Into<String>) -> Self {
        Self {
            pre_release: Some(floor.into()),
            ..Self::ANY
        }
    }

    /// Parse a specifier string.
    ///
    /// # Examples
    ///
    /// ```
    /// use tapir_core::{SemanticVersion, VersionSpecifier};
    ///
    /// let spec = VersionSpecifier::parse("^9.13.1").unwrap();
    /// assert!(spec.is_satisfied_by(&SemanticVersion::new(9, 17, 0)));
    /// assert!(!spec.is_satisfied_by(&SemanticVersion::new(10, 0, 0)));
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        match input.to_ascii_lowercase().as_str() {
            "" | "anyrelease" => return Ok(Self::ANY_RELEASE),
            "any" => return Ok(Self::ANY),
            _ => {}
        }

        if let Some(caps) = FLOOR_REGEX.captures(input) {
            let level = caps["level"].to_ascii_lowercase();
            return Ok(Self::prerelease_floor(format!("{level}{}", &caps["rest"])));
        }

        let caps = SPECIFIER_REGEX
            .captures(input)
            .ok_or_else(|| Error::specifier(input))?;
        let number = |name: &str| -> Result<Option<u64>> {
            caps.name(name)
                .map(|m| m.as_str().parse::<u64>())
                .transpose()
                .map_err(|_| Error::specifier(input))
        };

        Ok(Self {
            major: number("major")?,
            minor: number("minor")?,
            patch: number("patch")?,
            pre_release: caps.name("pre").map(|m| m.as_str().to_string()),
            build_metadata: caps.name("build").map(|m| m.as_str().to_string()),
            match_behavior: if caps.name("compatible").is_some() {
                VersionMatchBehavior::COMPATIBLE
            } else {
                VersionMatchBehavior::EXACT
            },
        })
    }

    /// Whether the exact flag is set.
    #[must_use]
    pub const fn is_exact(&self) -> bool {
        self.match_behavior.contains(VersionMatchBehavior::EXACT)
    }

    /// Whether the compatible flag is set.
    #[must_use]
    pub const fn is_compatible(&self) -> bool {
        self.match_behavior.contains(VersionMatchBehavior::COMPATIBLE)
            && !self.is_exact()
    }

    /// Whether `version` is accepted.
    #[must_use]
    pub fn is_satisfied_by(&self, version: &SemanticVersion) -> bool {
        self.triple_accepts(version)
            && self.prerelease_set().contains(version.pre_release())
            && self
                .build_constraint()
                .is_none_or(|build| build == version.build_metadata())
    }

    /// Whether every version accepted by `other` is accepted by `self`.
    #[must_use]
    pub fn is_superset_of(&self, other: &Self) -> bool {
        let build = match (self.build_constraint(), other.build_constraint()) {
            (None, _) => true,
            (Some(mine), Some(theirs)) => mine == theirs,
            (Some(_), None) => false,
        };
        build
            && self.triple_is_superset_of(other)
            && self.prerelease_set().is_superset_of(other.prerelease_set())
    }

    /// Whether one of the two specifiers contains the other.
    ///
    /// Two specifiers for the same package that are not compatible are a
    /// hard conflict.
    #[must_use]
    pub fn is_compatible_with(&self, other: &Self) -> bool {
        self.is_superset_of(other) || other.is_superset_of(self)
    }

    /// The single version this specifier pins, if it pins exactly one.
    ///
    /// Requires an exact specifier with major, minor, patch and build
    /// metadata all given. Build metadata may be pinned to the empty string.
    #[must_use]
    pub fn try_as_exact(&self) -> Option<SemanticVersion> {
        if !self.is_exact() || self.match_behavior.contains(VersionMatchBehavior::ANY_PRERELEASE)
        {
            return None;
        }
        let build = self.build_metadata.as_deref()?;
        SemanticVersion::from_parts(
            self.major?,
            self.minor?,
            self.patch?,
            self.pre_release.as_deref().unwrap_or(""),
            build,
        )
        .ok()
    }

    /// Pre-release data a query for this specifier needs.
    #[must_use]
    pub fn prerelease_level(&self) -> PrereleaseLevel {
        match self.prerelease_set() {
            PrereleaseSet::Only("") => PrereleaseLevel::Release,
            PrereleaseSet::Only(pre) | PrereleaseSet::Floor(Some(pre)) => {
                PrereleaseLevel::Floor(pre.to_string())
            }
            PrereleaseSet::Floor(None) => PrereleaseLevel::All,
        }
    }

    /// Closeness ordering on the version triple alone.
    ///
    /// Compatible ranges with a lower bound prefer the lowest version above
    /// it; everything else prefers the newest.
    #[must_use]
    pub fn sort_partial(&self, a: &SemanticVersion, b: &SemanticVersion) -> Ordering {
        let key = |v: &SemanticVersion| (v.major(), v.minor(), v.patch());
        if self.prefers_lowest() {
            key(a).cmp(&key(b))
        } else {
            key(b).cmp(&key(a))
        }
    }

    /// Total preference ordering used to rank candidates.
    ///
    /// Ties on the triple go to the release, then to the newest
    /// pre-release, then to the untagged build, then to the greatest build
    /// string.
    #[must_use]
    pub fn sort_order(&self, a: &SemanticVersion, b: &SemanticVersion) -> Ordering {
        self.sort_partial(a, b)
            .then_with(|| compare_prerelease(b.pre_release(), a.pre_release()))
            .then_with(|| {
                b.build_metadata()
                    .is_empty()
                    .cmp(&a.build_metadata().is_empty())
            })
            .then_with(|| b.build_metadata().cmp(a.build_metadata()))
    }

    fn prefers_lowest(&self) -> bool {
        self.is_compatible() && self.major.is_some()
    }

    fn triple_accepts(&self, version: &SemanticVersion) -> bool {
        let Some(major) = self.major else {
            return true;
        };
        if version.major() != major {
            return false;
        }
        if self.is_exact() {
            self.minor.is_none_or(|minor| minor == version.minor())
                && self.patch.is_none_or(|patch| patch == version.patch())
        } else {
            (version.minor(), version.patch()) >= self.lower_bound()
        }
    }

    fn triple_is_superset_of(&self, other: &Self) -> bool {
        let Some(major) = self.major else {
            return true;
        };
        if other.major != Some(major) {
            return false;
        }
        if self.is_exact() {
            if other.is_exact() {
                self.minor.is_none_or(|minor| other.minor == Some(minor))
                    && self.patch.is_none_or(|patch| other.patch == Some(patch))
            } else {
                self.minor.is_none() && self.patch.is_none()
            }
        } else {
            other.lower_bound() >= self.lower_bound()
        }
    }

    fn lower_bound(&self) -> (u64, u64) {
        (self.minor.unwrap_or(0), self.patch.unwrap_or(0))
    }

    fn prerelease_set(&self) -> PrereleaseSet<'_> {
        let pre = self.pre_release.as_deref().filter(|p| !p.is_empty());
        if self.match_behavior.contains(VersionMatchBehavior::ANY_PRERELEASE) {
            PrereleaseSet::Floor(pre)
        } else if self.is_exact() {
            PrereleaseSet::Only(pre.unwrap_or(""))
        } else if let Some(pre) = pre {
            PrereleaseSet::Floor(Some(pre))
        } else {
            PrereleaseSet::Only("")
        }
    }

    fn build_constraint(&self) -> Option<&str> {
        if self.is_exact() {
            self.build_metadata.as_deref()
        } else {
            None
        }
    }
}

impl Default for VersionSpecifier {
    fn default() -> Self {
        Self::ANY_RELEASE
    }
}

impl fmt::Display for VersionSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::ANY {
            return write!(f, "any");
        }
        if *self == Self::ANY_RELEASE {
            return write!(f, "anyrelease");
        }

        let Some(major) = self.major else {
            return write!(f, "{}", self.pre_release.as_deref().unwrap_or("any"));
        };
        if self.is_compatible() {
            write!(f, "^")?;
        }
        write!(f, "{major}")?;
        if let Some(minor) = self.minor {
            write!(f, ".{minor}")?;
            if let Some(patch) = self.patch {
                write!(f, ".{patch}")?;
            }
        }
        if let Some(pre) = self.pre_release.as_deref().filter(|p| !p.is_empty()) {
            write!(f, "-{pre}")?;
        }
        if let Some(build) = self.build_metadata.as_deref().filter(|b| !b.is_empty()) {
            write!(f, "+{build}")?;
        }
        Ok(())
    }
}

impl FromStr for VersionSpecifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for VersionSpecifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionSpecifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn v(s: &str) -> SemanticVersion {
        SemanticVersion::parse(s).unwrap()
    }

    fn spec(s: &str) -> VersionSpecifier {
        VersionSpecifier::parse(s).unwrap()
    }

    #[test_case("1.0.0-alpha", "1.0.0-alpha.1")]
    #[test_case("1.0.0-alpha.1", "1.0.0-alpha.beta")]
    #[test_case("1.0.0-alpha.beta", "1.0.0-beta")]
    #[test_case("1.0.0-beta.2", "1.0.0-beta.11")]
    #[test_case("1.0.0-rc.1", "1.0.0")]
    #[test_case("1.9.0", "1.10.0")]
    #[test_case("9.13.1", "10.0.0")]
    fn ordering(lower: &str, higher: &str) {
        assert!(v(lower) < v(higher), "{lower} < {higher}");
        assert_eq!(v(lower).cmp_precedence(&v(higher)), Ordering::Less);
    }

    #[test]
    fn build_metadata_is_identity_not_precedence() {
        let a = v("1.0.0+a");
        let b = v("1.0.0+b");
        assert_ne!(a, b);
        assert_eq!(a.cmp_precedence(&b), Ordering::Equal);
        assert_eq!(a.cmp(&b), Ordering::Less);
    }

    #[test_case("1.0.0-" ; "trailing dash")]
    #[test_case("1.0" ; "missing patch")]
    #[test_case("v1.0.0" ; "prefix")]
    #[test_case("1.0.0+" ; "trailing plus")]
    fn invalid_versions(input: &str) {
        assert!(SemanticVersion::parse(input).is_err());
    }

    #[test_case("9", "9.0.0", true)]
    #[test_case("9", "9.17.4", true)]
    #[test_case("9", "10.0.0", false)]
    #[test_case("9.13", "9.13.7", true)]
    #[test_case("9.13", "9.14.0", false)]
    #[test_case("9.13", "9.13.7-beta.1", false)]
    #[test_case("9.13.1", "9.13.1", true)]
    #[test_case("9.13.1", "9.13.1+abc", true)]
    #[test_case("9.13.1+abc", "9.13.1+def", false)]
    #[test_case("9.13.1-beta.2", "9.13.1-beta.2", true)]
    #[test_case("9.13.1-beta.2", "9.13.1", false)]
    #[test_case("^9.10.0", "9.10.0", true)]
    #[test_case("^9.10.0", "9.17.2", true)]
    #[test_case("^9.10.0", "9.9.9", false)]
    #[test_case("^9.10.0", "10.0.0", false)]
    #[test_case("^9.10.0", "9.12.0-beta.1", false)]
    #[test_case("^9.10.0-beta", "9.12.0-beta.1", true)]
    #[test_case("^9.10.0-beta", "9.12.0-alpha.1", false)]
    #[test_case("^9.10", "9.10.3", true)]
    #[test_case("any", "1.0.0-alpha", true)]
    #[test_case("anyrelease", "1.0.0-alpha", false)]
    #[test_case("", "3.2.1", true)]
    #[test_case("beta", "1.0.0-beta", true)]
    #[test_case("beta", "1.0.0-rc.1", true)]
    #[test_case("beta", "1.0.0", true)]
    #[test_case("beta", "1.0.0-alpha.3", false)]
    #[test_case("beta.2", "1.0.0-beta.1", false)]
    #[test_case("rc", "1.0.0-beta.9", false)]
    fn satisfied_by(specifier: &str, version: &str, expected: bool) {
        assert_eq!(
            spec(specifier).is_satisfied_by(&v(version)),
            expected,
            "{specifier} vs {version}"
        );
    }

    #[test_case("any", "^9.10.0", true)]
    #[test_case("^9.10.0", "any", false)]
    #[test_case("^9.10.0", "^9.12.0", true)]
    #[test_case("^9.12.0", "^9.10.0", false)]
    #[test_case("^9.10.0", "9.17", true)]
    #[test_case("9.17", "^9.10.0", false)]
    #[test_case("9.17", "9.17.2", true)]
    #[test_case("9.17.2", "9.17.4", false)]
    #[test_case("9", "9.17", true)]
    #[test_case("beta", "9.17", true)]
    #[test_case("beta", "rc", true)]
    #[test_case("rc", "beta", false)]
    #[test_case("beta", "9.17.0-alpha", false)]
    #[test_case("9.13.1", "9.13.1+abc", true)]
    #[test_case("9.13.1+abc", "9.13.1", false)]
    fn superset(a: &str, b: &str, expected: bool) {
        assert_eq!(spec(a).is_superset_of(&spec(b)), expected, "{a} ⊇ {b}");
    }

    #[test]
    fn superset_agrees_with_satisfaction() {
        let specs = ["any", "^9.10.0", "^9.12", "9.17", "9.17.2", "beta", "9"];
        let versions = ["9.10.0", "9.12.0", "9.17.0", "9.17.2", "9.18.0-beta.1", "10.0.0"];
        for a in specs {
            for b in specs {
                if spec(a).is_superset_of(&spec(b)) {
                    for version in versions {
                        if spec(b).is_satisfied_by(&v(version)) {
                            assert!(spec(a).is_satisfied_by(&v(version)), "{a} ⊇ {b} at {version}");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn exact_conflict_is_incompatible() {
        assert!(!spec("9.17.4").is_compatible_with(&spec("9.17.2")));
        assert!(spec("^9.10.0").is_compatible_with(&spec("^9.12.0")));
    }

    #[test]
    fn exact_pins_build() {
        let version = v("9.13.1");
        let pinned = VersionSpecifier::exact(&version);
        assert_eq!(pinned.try_as_exact(), Some(version.clone()));
        assert!(pinned.is_satisfied_by(&version));
        assert!(!pinned.is_satisfied_by(&v("9.13.1+abc")));
        assert_eq!(pinned.to_string(), "9.13.1");

        assert_eq!(spec("9.13.1").try_as_exact(), None);
        assert_eq!(spec("9.13.1+abc").try_as_exact(), Some(v("9.13.1+abc")));
        assert_eq!(spec("^9.13.1").try_as_exact(), None);
    }

    #[test]
    fn parses_shorthand_forms() {
        assert_eq!(spec("any"), VersionSpecifier::ANY);
        assert_eq!(spec(""), VersionSpecifier::ANY_RELEASE);
        assert_eq!(spec("Beta").pre_release.as_deref(), Some("beta"));
        assert_eq!(spec("beta.2").pre_release.as_deref(), Some("beta.2"));
        let caret = spec("^9.13.1");
        assert!(caret.is_compatible());
        assert_eq!((caret.major, caret.minor, caret.patch), (Some(9), Some(13), Some(1)));
        assert!(VersionSpecifier::parse("9.x").is_err());
        assert!(VersionSpecifier::parse(">=9.0").is_err());
    }

    #[test_case("any")]
    #[test_case("anyrelease")]
    #[test_case("beta.2")]
    #[test_case("^9.13.1")]
    #[test_case("9.13")]
    #[test_case("9.13.1-rc.1+abc")]
    fn display_parses_back(input: &str) {
        assert_eq!(spec(&spec(input).to_string()), spec(input));
    }

    #[test]
    fn compatible_sorts_closest_first() {
        let specifier = spec("^9.10.0");
        let mut versions = vec![v("9.13.0"), v("9.10.0"), v("9.12.0"), v("9.12.0-beta.1")];
        versions.sort_by(|a, b| specifier.sort_order(a, b));
        assert_eq!(versions[0], v("9.10.0"));
        assert_eq!(versions[1], v("9.12.0"));
        assert_eq!(versions[2], v("9.12.0-beta.1"));
    }

    #[test]
    fn open_ended_sorts_newest_first() {
        let specifier = spec("9.17");
        let mut versions = vec![v("9.17.1"), v("9.17.4"), v("9.17.2")];
        versions.sort_by(|a, b| specifier.sort_order(a, b));
        assert_eq!(versions, vec![v("9.17.4"), v("9.17.2"), v("9.17.1")]);
    }

    #[test]
    fn untagged_build_ranks_before_tagged() {
        let specifier = spec("9.13.1");
        let mut versions = vec![v("9.13.1+abc"), v("9.13.1"), v("9.13.1+def")];
        versions.sort_by(|a, b| specifier.sort_order(a, b));
        assert_eq!(versions, vec![v("9.13.1"), v("9.13.1+def"), v("9.13.1+abc")]);
    }

    #[test]
    fn prerelease_levels() {
        assert_eq!(spec("^9.1.0").prerelease_level(), PrereleaseLevel::Release);
        assert_eq!(spec("any").prerelease_level(), PrereleaseLevel::All);
        assert_eq!(
            spec("beta").prerelease_level(),
            PrereleaseLevel::Floor("beta".into())
        );

        let alpha = PrereleaseLevel::Floor("alpha".into());
        let beta = PrereleaseLevel::Floor("beta".into());
        assert!(alpha.covers(&beta));
        assert!(!beta.covers(&alpha));
        assert!(beta.covers(&PrereleaseLevel::Release));
        assert!(PrereleaseLevel::All.covers(&alpha));
        assert_eq!(beta.clone().broadest(alpha.clone()), alpha);
        assert!(beta.admits(&v("1.0.0-rc.1")));
        assert!(!beta.admits(&v("1.0.0-alpha")));
    }
}

//! Package specifiers, dependencies and definitions.

use crate::error::{Error, Result};
use crate::version::{SemanticVersion, VersionSpecifier};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target CPU architecture of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum CpuArchitecture {
    /// Not stated.
    #[default]
    Unspecified,
    /// Runs anywhere.
    AnyCPU,
    /// 32-bit x86.
    #[serde(rename = "x86")]
    X86,
    /// 64-bit x86.
    #[serde(rename = "x64")]
    X64,
    /// 32-bit ARM.
    #[serde(rename = "arm")]
    Arm,
    /// 64-bit ARM.
    #[serde(rename = "arm64")]
    Arm64,
}

impl CpuArchitecture {
    /// Canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unspecified => "Unspecified",
            Self::AnyCPU => "AnyCPU",
            Self::X86 => "x86",
            Self::X64 => "x64",
            Self::Arm => "arm",
            Self::Arm64 => "arm64",
        }
    }

    /// Whether this architecture runs anywhere.
    #[must_use]
    pub const fn is_neutral(self) -> bool {
        matches!(self, Self::Unspecified | Self::AnyCPU)
    }

    /// Whether a package built for `self` can run on `target`.
    #[must_use]
    pub fn is_compatible_with(self, target: Self) -> bool {
        self.is_neutral() || target.is_neutral() || self == target
    }
}

impl fmt::Display for CpuArchitecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CpuArchitecture {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "unspecified" => Ok(Self::Unspecified),
            "anycpu" => Ok(Self::AnyCPU),
            "x86" => Ok(Self::X86),
            "x64" => Ok(Self::X64),
            "arm" => Ok(Self::Arm),
            "arm64" => Ok(Self::Arm64),
            _ => Err(Error::InvalidArchitecture {
                input: s.to_string(),
            }),
        }
    }
}

/// Whether a package OS list matches the target OS.
///
/// Both sides are comma separated lists compared case-insensitively. An
/// empty side matches anything.
#[must_use]
pub fn os_matches(package_os: &str, target_os: &str) -> bool {
    let entries = |s: &str| {
        s.split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_ascii_lowercase)
            .collect::<Vec<_>>()
    };
    let package = entries(package_os);
    let target = entries(target_os);
    if package.is_empty() || target.is_empty() {
        return true;
    }
    target.iter().any(|t| package.contains(t))
}

/// A requested package: name plus version constraint and target platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageSpecifier {
    /// Package name.
    pub name: String,
    /// Version constraint.
    #[serde(default)]
    pub version: VersionSpecifier,
    /// Target architecture.
    #[serde(default)]
    pub architecture: CpuArchitecture,
    /// Target OS (name or comma separated list, empty means any).
    #[serde(rename = "OS", default)]
    pub os: String,
}

impl PackageSpecifier {
    /// Create a platform-neutral specifier.
    #[must_use]
    pub fn new(name: impl Into<String>, version: VersionSpecifier) -> Self {
        Self {
            name: name.into(),
            version,
            architecture: CpuArchitecture::Unspecified,
            os: String::new(),
        }
    }

    /// Set the target platform.
    #[must_use]
    pub fn with_platform(mut self, architecture: CpuArchitecture, os: impl Into<String>) -> Self {
        self.architecture = architecture;
        self.os = os.into();
        self
    }

    /// Same name and platform, different version constraint.
    #[must_use]
    pub fn with_version(&self, version: VersionSpecifier) -> Self {
        Self {
            name: self.name.clone(),
            version,
            architecture: self.architecture,
            os: self.os.clone(),
        }
    }

    /// The pinned version, when the constraint names exactly one.
    #[must_use]
    pub fn exact_version(&self) -> Option<SemanticVersion> {
        self.version.try_as_exact()
    }
}

impl fmt::Display for PackageSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.version)
    }
}

/// A dependency edge from one package version to another package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageDependency {
    /// Dependency name.
    pub name: String,
    /// Accepted versions.
    #[serde(default)]
    pub version: VersionSpecifier,
}

impl PackageDependency {
    /// Create a dependency.
    #[must_use]
    pub fn new(name: impl Into<String>, version: VersionSpecifier) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

impl fmt::Display for PackageDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.version)
    }
}

/// One package selected by a resolution: a concrete version on a platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResolvedPackage {
    /// Package name.
    pub name: String,
    /// Selected version, build metadata included.
    pub version: SemanticVersion,
    /// Target architecture.
    #[serde(default)]
    pub architecture: CpuArchitecture,
    /// Target OS.
    #[serde(rename = "OS", default)]
    pub os: String,
}

impl ResolvedPackage {
    /// Concrete package for a specifier that pins exactly one version.
    #[must_use]
    pub fn from_specifier(spec: &PackageSpecifier) -> Option<Self> {
        Some(Self {
            name: spec.name.clone(),
            version: spec.exact_version()?,
            architecture: spec.architecture,
            os: spec.os.clone(),
        })
    }

    /// Specifier that pins this package.
    #[must_use]
    pub fn to_specifier(&self) -> PackageSpecifier {
        PackageSpecifier {
            name: self.name.clone(),
            version: VersionSpecifier::exact(&self.version),
            architecture: self.architecture,
            os: self.os.clone(),
        }
    }
}

impl fmt::Display for ResolvedPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// Full definition of one package version as published by a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageDef {
    /// Package name.
    pub name: String,
    /// Concrete version.
    pub version: SemanticVersion,
    /// Built-for architecture.
    #[serde(default)]
    pub architecture: CpuArchitecture,
    /// Supported OS list.
    #[serde(rename = "OS", default)]
    pub os: String,
    /// Direct dependencies.
    #[serde(default)]
    pub dependencies: Vec<PackageDependency>,
    /// Content hash published with the package.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl PackageDef {
    /// Create a platform-neutral definition without dependencies.
    #[must_use]
    pub fn new(name: impl Into<String>, version: SemanticVersion) -> Self {
        Self {
            name: name.into(),
            version,
            architecture: CpuArchitecture::Unspecified,
            os: String::new(),
            dependencies: Vec::new(),
            hash: None,
        }
    }

    /// Add a dependency.
    #[must_use]
    pub fn with_dependency(mut self, name: impl Into<String>, version: VersionSpecifier) -> Self {
        self.dependencies.push(PackageDependency::new(name, version));
        self
    }

    /// Set the platform.
    #[must_use]
    pub fn with_platform(mut self, architecture: CpuArchitecture, os: impl Into<String>) -> Self {
        self.architecture = architecture;
        self.os = os.into();
        self
    }

    /// Set the content hash.
    #[must_use]
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    /// Whether this package can be installed on the given platform.
    #[must_use]
    pub fn is_compatible_with(&self, architecture: CpuArchitecture, os: &str) -> bool {
        self.architecture.is_compatible_with(architecture) && os_matches(&self.os, os)
    }

    /// Parse one definition from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(sonic_rs::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Windows", "windows", true)]
    #[test_case("Windows,Linux", "Linux", true)]
    #[test_case("Linux", "Windows", false)]
    #[test_case("", "Linux", true)]
    #[test_case("Linux", "", true)]
    #[test_case(" Linux , MacOS", "macos", true)]
    fn os_list_matching(package: &str, target: &str, expected: bool) {
        assert_eq!(os_matches(package, target), expected);
    }

    #[test]
    fn resolved_package_keeps_build_through_json() {
        let version = SemanticVersion::parse("9.13.1+abc").unwrap();
        let pinned = PackageSpecifier::new("OpenTAP", VersionSpecifier::exact(&version))
            .with_platform(CpuArchitecture::X64, "Linux");
        let resolved = ResolvedPackage::from_specifier(&pinned).unwrap();

        let json = sonic_rs::to_string(&resolved).unwrap();
        assert!(json.contains(r#""Version":"9.13.1+abc""#));
        let reloaded: ResolvedPackage = sonic_rs::from_str(&json).unwrap();
        assert_eq!(reloaded, resolved);
        assert_eq!(reloaded.to_specifier(), pinned);
        assert_eq!(reloaded.to_specifier().exact_version(), Some(version));
    }

    #[test]
    fn untagged_resolved_package_stays_pinned() {
        let version = SemanticVersion::new(9, 13, 1);
        let resolved = ResolvedPackage::from_specifier(&PackageSpecifier::new(
            "OpenTAP",
            VersionSpecifier::exact(&version),
        ))
        .unwrap();
        let reloaded: ResolvedPackage =
            sonic_rs::from_str(&sonic_rs::to_string(&resolved).unwrap()).unwrap();
        let spec = reloaded.to_specifier();
        assert_eq!(spec.exact_version(), Some(version));
        assert!(!spec.version.is_satisfied_by(&SemanticVersion::parse("9.13.1+abc").unwrap()));
    }

    #[test]
    fn ranges_are_not_resolved_packages() {
        let range = PackageSpecifier::new("OpenTAP", VersionSpecifier::parse("^9.13.1").unwrap());
        assert_eq!(ResolvedPackage::from_specifier(&range), None);
    }

    #[test]
    fn architecture_compatibility() {
        assert!(CpuArchitecture::AnyCPU.is_compatible_with(CpuArchitecture::X64));
        assert!(CpuArchitecture::X64.is_compatible_with(CpuArchitecture::Unspecified));
        assert!(!CpuArchitecture::X86.is_compatible_with(CpuArchitecture::Arm64));
        assert_eq!("ARM64".parse::<CpuArchitecture>().unwrap(), CpuArchitecture::Arm64);
        assert!("sparc".parse::<CpuArchitecture>().is_err());
    }

    #[test]
    fn package_def_from_json() {
        let def = PackageDef::from_json(
            r#"{
                "Name": "Demonstration",
                "Version": "9.1.0",
                "OS": "Windows,Linux",
                "Architecture": "x64",
                "Dependencies": [{"Name": "OpenTAP", "Version": "^9.12.0"}]
            }"#,
        )
        .unwrap();
        assert_eq!(def.version, SemanticVersion::new(9, 1, 0));
        assert_eq!(def.architecture, CpuArchitecture::X64);
        assert_eq!(def.dependencies[0].version.to_string(), "^9.12.0");
        assert!(def.is_compatible_with(CpuArchitecture::X64, "linux"));
        assert!(!def.is_compatible_with(CpuArchitecture::Arm64, "linux"));
        assert_eq!(def.hash, None);
    }

    #[test]
    fn malformed_version_fails_to_parse() {
        let err = PackageDef::from_json(r#"{"Name": "A", "Version": "1.0.0-"}"#);
        assert!(err.is_err());
    }
}

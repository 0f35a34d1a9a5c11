//! Image requests.

use crate::error::{Error, Result};
use crate::package::{CpuArchitecture, PackageSpecifier};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A request for a consistent set of packages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageSpecifier {
    /// Image name, informational.
    #[serde(default)]
    pub name: String,
    /// Requested packages.
    #[serde(default)]
    pub packages: Vec<PackageSpecifier>,
    /// Repository locations to query.
    #[serde(default)]
    pub repositories: Vec<String>,
    /// Packages that are already installed and may not change.
    #[serde(default)]
    pub fixed_packages: Vec<PackageSpecifier>,
    /// Target OS used when querying repositories.
    #[serde(rename = "OS", default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    /// Target architecture used when querying repositories.
    #[serde(default)]
    pub architecture: CpuArchitecture,
}

impl ImageSpecifier {
    /// Create a named, empty request.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a requested package.
    #[must_use]
    pub fn with_package(mut self, package: PackageSpecifier) -> Self {
        self.packages.push(package);
        self
    }

    /// Add a repository location.
    #[must_use]
    pub fn with_repository(mut self, location: impl Into<String>) -> Self {
        self.repositories.push(location.into());
        self
    }

    /// Add a fixed package.
    #[must_use]
    pub fn with_fixed(mut self, package: PackageSpecifier) -> Self {
        self.fixed_packages.push(package);
        self
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let image: Self = sonic_rs::from_str(json)?;
        image.validate()?;
        Ok(image)
    }

    /// Read and parse a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json(&json)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(sonic_rs::to_string_pretty(self)?)
    }

    /// Check structural validity: every package is named.
    pub fn validate(&self) -> Result<()> {
        let unnamed = self
            .packages
            .iter()
            .chain(&self.fixed_packages)
            .any(|p| p.name.trim().is_empty());
        if unnamed {
            return Err(Error::InvalidImage(format!(
                "image '{}' contains a package without a name",
                self.name
            )));
        }
        Ok(())
    }
}

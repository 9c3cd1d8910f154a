//! Object catalog
//!
//! Maps object type names to the endpoints that serve them. The built-in
//! Fidoo catalog is embedded in the binary; a YAML file with the same shape
//! can replace it.

use crate::error::{Error, Result};
use crate::normalize::SATELLITE_SEPARATOR;
use crate::partition::DependentJob;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Built-in catalog YAML
pub const BUILTIN_CATALOG: &str = include_str!("../catalog/fidoo.yaml");

/// A directly fetchable object type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDefinition {
    /// Object type name, also the staged table name
    pub name: String,
    /// Endpoint path relative to the API base URL
    pub endpoint: String,
    /// Key field; inferred from field names when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
}

/// Kind of a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind<'a> {
    Primary(&'a ObjectDefinition),
    Dependent(&'a DependentJob),
}

/// The set of object types a run can request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    objects: Vec<ObjectDefinition>,
    #[serde(default)]
    dependents: Vec<DependentJob>,
}

impl Catalog {
    /// Load the embedded Fidoo catalog
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_CATALOG)
    }

    /// Parse and validate a catalog from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let catalog: Catalog = serde_yaml::from_str(yaml)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read catalog {}: {e}", path.display()))
        })?;
        Self::from_yaml(&yaml)
    }

    /// Check names are unique and table-safe, and that every dependent has a primary source
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        let names = self
            .objects
            .iter()
            .map(|o| (&o.name, &o.endpoint))
            .chain(self.dependents.iter().map(|d| (&d.name, &d.endpoint)));

        for (name, endpoint) in names {
            if name.trim().is_empty() {
                return Err(Error::invalid_value("catalog", "object name is empty"));
            }
            if name.contains(SATELLITE_SEPARATOR) {
                return Err(Error::invalid_value(
                    "catalog",
                    format!("object name '{name}' contains '{SATELLITE_SEPARATOR}'"),
                ));
            }
            if endpoint.trim().is_empty() {
                return Err(Error::invalid_value(
                    "catalog",
                    format!("object '{name}' has no endpoint"),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(Error::invalid_value(
                    "catalog",
                    format!("object '{name}' is defined twice"),
                ));
            }
        }

        for job in &self.dependents {
            if self.object(&job.source).is_none() {
                return Err(Error::invalid_value(
                    "catalog",
                    format!(
                        "dependent '{}' names unknown source '{}'",
                        job.name, job.source
                    ),
                ));
            }
            if job.param.trim().is_empty() {
                return Err(Error::invalid_value(
                    "catalog",
                    format!("dependent '{}' has no request parameter", job.name),
                ));
            }
        }

        Ok(())
    }

    /// Primary object definitions in catalog order
    pub fn objects(&self) -> &[ObjectDefinition] {
        &self.objects
    }

    /// Dependent object definitions in catalog order
    pub fn dependents(&self) -> &[DependentJob] {
        &self.dependents
    }

    /// Look up a primary object
    pub fn object(&self, name: &str) -> Option<&ObjectDefinition> {
        self.objects.iter().find(|o| o.name == name)
    }

    /// Look up a dependent object
    pub fn dependent(&self, name: &str) -> Option<&DependentJob> {
        self.dependents.iter().find(|d| d.name == name)
    }

    /// Look up any object type
    pub fn kind(&self, name: &str) -> Option<ObjectKind<'_>> {
        self.object(name)
            .map(ObjectKind::Primary)
            .or_else(|| self.dependent(name).map(ObjectKind::Dependent))
    }

    /// Check if `name` is a known object type
    pub fn contains(&self, name: &str) -> bool {
        self.kind(name).is_some()
    }

    /// Dependents to run for `requested`: those whose source was requested,
    /// and those requested by name, in catalog order
    pub fn dependents_for<'a>(
        &'a self,
        requested: &'a [String],
    ) -> impl Iterator<Item = &'a DependentJob> + 'a {
        self.dependents.iter().filter(move |d| {
            requested
                .iter()
                .any(|r| *r == d.source || *r == d.name)
        })
    }

    /// All object type names, primary first
    pub fn names(&self) -> Vec<&str> {
        self.objects
            .iter()
            .map(|o| o.name.as_str())
            .chain(self.dependents.iter().map(|d| d.name.as_str()))
            .collect()
    }
}

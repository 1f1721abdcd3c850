//! The bundle's `index.json`.
//!
//! The manifest is keyed by protocol version. Each version lists the
//! scripts of every run phase in execution order:
//!
//! ```json
//! {
//!   "1.0": {
//!     "commissioning_scripts": [
//!       { "name": "00-lshw", "path": "commissioning/00-lshw",
//!         "script_result_id": 12, "script_version_id": 3 }
//!     ],
//!     "testing_scripts": []
//!   }
//! }
//! ```
//!
//! Group keys this runner does not know are ignored so newer controllers
//! can add phases without breaking older nodes.

use crate::error::ManifestError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use strum::{Display, EnumIter, IntoEnumIterator};

/// File name of the manifest inside an extracted bundle.
pub const MANIFEST_FILE: &str = "index.json";

/// Protocol versions this runner understands, oldest first.
pub const SUPPORTED_VERSIONS: &[&str] = &["1.0"];

/// A run phase. Iteration order is execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ScriptGroup {
    Commissioning,
    Testing,
}

impl ScriptGroup {
    /// Key of this group inside a manifest version object.
    pub fn manifest_key(&self) -> &'static str {
        match self {
            Self::Commissioning => "commissioning_scripts",
            Self::Testing => "testing_scripts",
        }
    }
}

/// One script listed in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScriptDescriptor {
    /// Unique within a run; also names the captured output files
    pub name: String,
    /// Location relative to the extracted bundle
    pub path: String,
    /// Correlates reports with the controller's result record
    pub script_result_id: u64,
    pub script_version_id: u64,
}

impl ScriptDescriptor {
    /// Absolute location of the script once the bundle is extracted.
    pub fn resolve(&self, scripts_dir: &Path) -> PathBuf {
        scripts_dir.join(&self.path)
    }

    /// Name of the file capturing standard error.
    pub fn stderr_name(&self) -> String {
        format!("{}.err", self.name)
    }
}

/// The parsed manifest for the selected protocol version. Immutable.
///
/// Only groups whose key appears in the manifest (with a non-null value)
/// are present, even when their script list is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptManifest {
    version: String,
    groups: BTreeMap<ScriptGroup, Vec<ScriptDescriptor>>,
}

impl ScriptManifest {
    /// Load `index.json` from an extracted bundle.
    pub fn load(scripts_dir: &Path) -> Result<Self, ManifestError> {
        let path = scripts_dir.join(MANIFEST_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| ManifestError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        let versions: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)?;
        let version = select_version(versions.keys().map(String::as_str)).ok_or_else(|| {
            ManifestError::UnsupportedVersion {
                found: versions.keys().cloned().collect(),
                supported: SUPPORTED_VERSIONS.iter().map(|v| v.to_string()).collect(),
            }
        })?;

        let entry = match versions.get(version) {
            Some(serde_json::Value::Null) | None => serde_json::Map::new(),
            Some(value) => serde_json::Map::deserialize(value)?,
        };

        let mut groups = BTreeMap::new();
        for group in ScriptGroup::iter() {
            match entry.get(group.manifest_key()) {
                Some(serde_json::Value::Null) | None => {}
                Some(value) => {
                    groups.insert(group, Vec::<ScriptDescriptor>::deserialize(value)?);
                }
            }
        }

        let manifest = Self {
            version: version.to_string(),
            groups,
        };
        manifest.validate_structure()?;
        Ok(manifest)
    }

    /// Names become file names in the output directory, so they must be
    /// usable as such and must not collide.
    fn validate_structure(&self) -> Result<(), ManifestError> {
        let mut names = HashSet::new();
        let mut output_files = HashSet::new();

        for script in self.all_scripts() {
            let name = script.name.as_str();
            if name.is_empty() || name == "." || name == ".." {
                return Err(ManifestError::InvalidName {
                    name: name.to_string(),
                    reason: "not a usable file name".to_string(),
                });
            }
            if name.contains('/') || name.contains('\0') {
                return Err(ManifestError::InvalidName {
                    name: name.to_string(),
                    reason: "must not contain '/' or NUL".to_string(),
                });
            }
            if !names.insert(name) {
                return Err(ManifestError::DuplicateName {
                    name: name.to_string(),
                });
            }
            for file in [script.name.clone(), script.stderr_name()] {
                if !output_files.insert(file.clone()) {
                    return Err(ManifestError::InvalidName {
                        name: name.to_string(),
                        reason: format!("output file {} collides with another script", file),
                    });
                }
            }
        }
        Ok(())
    }

    /// Protocol version the manifest was read with.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Scripts of one group in manifest order; empty if the group is absent.
    pub fn scripts(&self, group: ScriptGroup) -> &[ScriptDescriptor] {
        self.groups.get(&group).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the manifest lists the group at all, empty or not.
    pub fn has_group(&self, group: ScriptGroup) -> bool {
        self.groups.contains_key(&group)
    }

    /// Every script in execution order.
    pub fn all_scripts(&self) -> impl Iterator<Item = &ScriptDescriptor> {
        ScriptGroup::iter().flat_map(move |group| self.scripts(group).iter())
    }

    pub fn total_scripts(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn has_testing(&self) -> bool {
        self.has_group(ScriptGroup::Testing)
    }
}

/// Pick the highest version present that this runner supports.
fn select_version<'a>(found: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    found
        .filter(|v| SUPPORTED_VERSIONS.contains(v))
        .max_by_key(|v| version_key(v))
}

fn version_key(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map(|part| part.parse().unwrap_or(0))
        .collect()
}

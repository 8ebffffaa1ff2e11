//! The project manifest. Manifest parsing proper is an external collaborator
//! per `spec.md` §1/§6 — this module implements just enough of it
//! (`[package] name`, `modules`, `[profile.<name>]`) to drive
//! [`crate::configure`] and its tests, generalizing the teacher's
//! `config.rs::Config`/`Project`.

use std::{fs, path::Path, path::PathBuf};

use crate::error::*;

/// `[package]` table of the manifest.
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug)]
pub struct Package {
    pub name: String,
    #[serde(default)]
    pub modules: bool,
}

/// One `[profile.<name>]` table. Only the fields the build-graph engine
/// itself reads; the dependency installer (out of scope) reads the rest.
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, Default)]
pub struct Profile {
    #[serde(default)]
    pub cxxflags: Vec<String>,
}

/// The full parsed manifest (`Cabin.toml`).
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug)]
pub struct Manifest {
    pub package: Package,
    #[serde(default)]
    pub profile: std::collections::BTreeMap<String, Profile>,

    /// Path the manifest was loaded from. Not part of the TOML document
    /// itself; filled in by [`Manifest::load`].
    #[serde(skip)]
    pub path: PathBuf,
}

/// Which profile a build was configured against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum BuildProfile {
    Debug,
    Release,
}

impl BuildProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildProfile::Debug => "debug",
            BuildProfile::Release => "release",
        }
    }
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut manifest: Manifest =
            toml::from_str(&text).map_err(|e| Error::DriverError(format!("invalid manifest: {e}")))?;
        manifest.path = path.to_path_buf();
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_manifest() {
        let toml = r#"
            [package]
            name = "demo"
        "#;
        let mut manifest: Manifest = toml::from_str(toml).unwrap();
        manifest.path = PathBuf::from("Cabin.toml");

        assert_eq!(manifest.package.name, "demo");
        assert!(!manifest.package.modules);
    }

    #[test]
    fn parses_modules_flag_and_profiles() {
        let toml = r#"
            [package]
            name = "demo"
            modules = true

            [profile.release]
            cxxflags = ["-O3"]
        "#;
        let manifest: Manifest = toml::from_str(toml).unwrap();

        assert!(manifest.package.modules);
        assert_eq!(manifest.profile["release"].cxxflags, vec!["-O3".to_string()]);
    }
}

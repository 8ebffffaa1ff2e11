//! `new` subcommand: extracts an embedded project template to disk.
//! Generalizes the teacher's `include_str!`-embedded `BINARY_MAIN`/
//! `BINARY_LIB_C`/`BINARY_LIB_H` constants in `main.rs` into a proper
//! `include_dir!` tree, matching the dependency already present in the
//! teacher's `Cargo.toml`.

use std::{fs, path::Path};

use include_dir::{include_dir, Dir};

use crate::error::*;

static TEMPLATES: Dir = include_dir!("$CARGO_MANIFEST_DIR/templates");

/// Writes the named template (`"binary"` or `"library"`) into `dest`,
/// substituting `{{project_name}}` in every file's contents.
pub fn scaffold(dest: &Path, template: &str, project_name: &str) -> Result<()> {
    let template_dir = TEMPLATES
        .get_dir(template)
        .ok_or_else(|| Error::DriverError(format!("unknown project template `{template}`")))?;

    fs::create_dir_all(dest).map_err(|e| Error::io(dest, e))?;
    extract_dir(template_dir, dest, project_name)
}

fn extract_dir(dir: &Dir, dest: &Path, project_name: &str) -> Result<()> {
    for entry in dir.entries() {
        match entry {
            include_dir::DirEntry::Dir(sub) => {
                let sub_dest = dest.join(sub.path().file_name().unwrap());
                fs::create_dir_all(&sub_dest).map_err(|e| Error::io(sub_dest.clone(), e))?;
                extract_dir(sub, &sub_dest, project_name)?;
            }
            include_dir::DirEntry::File(file) => {
                let file_dest = dest.join(file.path().file_name().unwrap());
                let contents = String::from_utf8_lossy(file.contents()).replace("{{project_name}}", project_name);
                fs::write(&file_dest, contents).map_err(|e| Error::io(file_dest, e))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaffolds_binary_template_with_substituted_name() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("demo");

        scaffold(&dest, "binary", "demo").unwrap();

        let manifest = fs::read_to_string(dest.join("Cabin.toml")).unwrap();
        assert!(manifest.contains("name = \"demo\""));
        assert!(dest.join("src/main.cc").is_file());
    }

    #[test]
    fn unknown_template_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scaffold(&dir.path().join("x"), "nope", "x").is_err());
    }
}

//! Pure path derivations shared by the scanner, the graph builder and the
//! emitter. Nothing here touches the filesystem: every function is a plain
//! string/path transform so it can be unit tested without a project tree.

use std::path::{Path, PathBuf};

/// Joins path components with `/`, regardless of the host platform.
fn to_forward_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Returns the parent directory of `path` as a forward-slash string, or `"."`
/// if `path` has no parent component.
///
/// ```text
/// parent_dir_or_dot("objs/main.o") == "objs"
/// parent_dir_or_dot("main.o") == "."
/// ```
pub fn parent_dir_or_dot(path: &str) -> String {
    match Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => to_forward_slash(parent),
        _ => ".".to_string(),
    }
}

/// Maps a header path under `<root>/src/...` to the object-file target that
/// would own it, relative to `out_base_path`.
///
/// If the header sits directly under `src/`, the middle directory component
/// is omitted, e.g. `src/foo.hpp -> <rel_build_out>/foo.o`. Otherwise the
/// relative directory structure under `src/` is preserved, e.g.
/// `src/sub/foo.hpp -> <rel_build_out>/sub/foo.o`.
pub fn map_header_to_obj(
    header_path: &Path,
    root_path: &Path,
    build_out_path: &Path,
    out_base_path: &Path,
) -> String {
    let src_dir = root_path.join("src");
    let rel_build_out = pathdiff(build_out_path, out_base_path);

    let header_dir = header_path.parent().unwrap_or_else(|| Path::new(""));
    let rel_header_dir = pathdiff(header_dir, &src_dir);

    let mut obj = rel_build_out;
    if !rel_header_dir.as_os_str().is_empty() && rel_header_dir != Path::new(".") {
        obj = obj.join(&rel_header_dir);
    }

    let stem = header_path.file_stem().unwrap_or_default();
    obj = obj.join(stem);
    obj.set_extension("o");

    to_forward_slash(&obj)
}

/// Mirrors [`map_header_to_obj`] but keeps the basename the dependency
/// scanner already produced instead of recomputing it from the source path.
pub fn object_path_for_source(source: &Path, target_base: &Path) -> String {
    let stem = source.file_stem().unwrap_or_default();
    let mut obj = target_base.join(stem);
    obj.set_extension("o");
    to_forward_slash(&obj)
}

/// Best-effort relative-path computation that doesn't require the paths to
/// exist on disk (unlike `Path::canonicalize` + `strip_prefix`). Falls back
/// to `"."` when `path` doesn't start with `base`'s components.
fn pathdiff(path: &Path, base: &Path) -> PathBuf {
    let path_comps: Vec<_> = path.components().collect();
    let base_comps: Vec<_> = base.components().collect();

    let common = path_comps
        .iter()
        .zip(base_comps.iter())
        .take_while(|(a, b)| a == b)
        .count();

    if common < base_comps.len() {
        // `path` doesn't fully nest under `base`; walk up with `..` for the
        // remaining base components.
        let mut result = PathBuf::new();
        for _ in common..base_comps.len() {
            result.push("..");
        }
        for comp in &path_comps[common..] {
            result.push(comp.as_os_str());
        }
        if result.as_os_str().is_empty() {
            return PathBuf::from(".");
        }
        return result;
    }

    let mut result = PathBuf::new();
    for comp in &path_comps[common..] {
        result.push(comp.as_os_str());
    }
    if result.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        result
    }
}

/// `join_flags(["-Ifoo","-Ibar"]) == "-Ifoo -Ibar"`, `join_flags([]) == ""`.
pub fn join_flags<I, S>(flags: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    flags
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Joins non-empty parts with a single space, skipping empty segments.
///
/// `combine_flags(&["-O2", "", "-fno-rtti", "-g"]) == "-O2 -fno-rtti -g"`
pub fn combine_flags(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

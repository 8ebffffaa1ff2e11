//! Transitive object-file closure for a link target. Grounded on
//! `BuildConfig::collectBinDepObjs` in
//! `examples/original_source/src/BuildConfig.cc`.

use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    path::Path,
};

use crate::graph::CompileUnit;
use crate::path_mapper::map_header_to_obj;

const HEADER_EXTS: &[&str] = &["h", "hpp", "hxx", "hh"];

/// Extends `accum` in place with every object file reachable from
/// `header_deps` through the header→object mapping, restricted to objects
/// actually present in `build_obj_targets`.
///
/// `source_stem` is the stem of the source file the caller is building an
/// object-closure *for* (empty when collecting for a non-test link target);
/// a header whose stem matches it is skipped so the test variant of a unit
/// links against its own freshly-compiled test object rather than pulling
/// in the production object for the same translation unit.
///
/// Terminates because `accum` only grows and is bounded by
/// `build_obj_targets`; safe even if the header graph is cyclic, since a
/// header/object already present in `accum` is never revisited.
#[allow(clippy::too_many_arguments)]
pub fn collect_bin_dep_objs(
    accum: &mut BTreeSet<String>,
    source_stem: &str,
    header_deps: &BTreeSet<String>,
    build_obj_targets: &HashSet<String>,
    compile_units: &BTreeMap<String, CompileUnit>,
    root_path: &Path,
    build_out_path: &Path,
    out_base_path: &Path,
) {
    for header in header_deps {
        let header_path = Path::new(header);

        let stem = header_path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        if stem == source_stem {
            continue;
        }

        let ext = header_path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !HEADER_EXTS.contains(&ext) {
            continue;
        }

        let obj_target = map_header_to_obj(header_path, root_path, build_out_path, out_base_path);

        if !build_obj_targets.contains(&obj_target) {
            continue;
        }
        if !accum.insert(obj_target.clone()) {
            continue;
        }

        if let Some(unit) = compile_units.get(&obj_target) {
            collect_bin_dep_objs(
                accum,
                source_stem,
                &unit.header_deps,
                build_obj_targets,
                compile_units,
                root_path,
                build_out_path,
                out_base_path,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::CompileUnit;

    fn unit(object_target: &str, source: &str, deps: &[&str]) -> CompileUnit {
        CompileUnit {
            object_target: object_target.to_string(),
            source: source.to_string(),
            header_deps: deps.iter().map(|s| s.to_string()).collect(),
            is_test: false,
        }
    }

    #[test]
    fn collects_transitive_headers() {
        let root = Path::new("/proj");
        let build_out = Path::new("/proj/target/debug/cabin.d");
        let out_base = Path::new("/proj/target/debug");

        let mut units = BTreeMap::new();
        units.insert(
            "cabin.d/foo.o".to_string(),
            unit("cabin.d/foo.o", "/proj/src/foo.cc", &["/proj/src/bar.hpp"]),
        );
        units.insert(
            "cabin.d/bar.o".to_string(),
            unit("cabin.d/bar.o", "/proj/src/bar.cc", &[]),
        );

        let build_obj_targets: HashSet<String> =
            ["cabin.d/foo.o".to_string(), "cabin.d/bar.o".to_string()]
                .into_iter()
                .collect();

        let mut accum = BTreeSet::new();
        let main_deps: BTreeSet<String> = ["/proj/src/foo.hpp".to_string()].into_iter().collect();

        collect_bin_dep_objs(
            &mut accum,
            "",
            &main_deps,
            &build_obj_targets,
            &units,
            root,
            build_out,
            out_base,
        );

        assert!(accum.contains("cabin.d/foo.o"));
        assert!(accum.contains("cabin.d/bar.o"));
    }

    #[test]
    fn skips_header_owned_by_source_under_test() {
        let root = Path::new("/proj");
        let build_out = Path::new("/proj/target/debug/unittests");
        let out_base = Path::new("/proj/target/debug");

        let units: BTreeMap<String, CompileUnit> = BTreeMap::new();
        let build_obj_targets: HashSet<String> = ["unittests/util.o".to_string()].into_iter().collect();

        let mut accum = BTreeSet::new();
        let deps: BTreeSet<String> = ["/proj/src/util.h".to_string()].into_iter().collect();

        collect_bin_dep_objs(
            &mut accum,
            "util",
            &deps,
            &build_obj_targets,
            &units,
            root,
            build_out,
            out_base,
        );

        assert!(accum.is_empty());
    }

    #[test]
    fn ignores_headers_outside_build_obj_targets() {
        let root = Path::new("/proj");
        let build_out = Path::new("/proj/target/debug/cabin.d");
        let out_base = Path::new("/proj/target/debug");

        let units: BTreeMap<String, CompileUnit> = BTreeMap::new();
        let build_obj_targets: HashSet<String> = HashSet::new();

        let mut accum = BTreeSet::new();
        let deps: BTreeSet<String> = ["/proj/src/external.hpp".to_string()].into_iter().collect();

        collect_bin_dep_objs(
            &mut accum, "", &deps, &build_obj_targets, &units, root, build_out, out_base,
        );

        assert!(accum.is_empty());
    }

    #[test]
    fn cyclic_header_graph_terminates() {
        let root = Path::new("/proj");
        let build_out = Path::new("/proj/target/debug/cabin.d");
        let out_base = Path::new("/proj/target/debug");

        let mut units = BTreeMap::new();
        units.insert(
            "cabin.d/a.o".to_string(),
            unit("cabin.d/a.o", "/proj/src/a.cc", &["/proj/src/b.hpp"]),
        );
        units.insert(
            "cabin.d/b.o".to_string(),
            unit("cabin.d/b.o", "/proj/src/b.cc", &["/proj/src/a.hpp"]),
        );

        let build_obj_targets: HashSet<String> =
            ["cabin.d/a.o".to_string(), "cabin.d/b.o".to_string()].into_iter().collect();

        let mut accum = BTreeSet::new();
        let start: BTreeSet<String> = ["/proj/src/a.hpp".to_string()].into_iter().collect();

        collect_bin_dep_objs(
            &mut accum, "", &start, &build_obj_targets, &units, root, build_out, out_base,
        );

        assert_eq!(accum.len(), 2);
    }
}

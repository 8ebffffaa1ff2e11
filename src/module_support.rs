//! Adds compiler-family-specific edges to precompile the standard-library
//! module. Grounded on `BuildConfig::configureModuleSupport` in
//! `examples/original_source/src/BuildConfig.cc`.

use std::path::Path;

use crate::compiler::{CompilerOps, CompilerOpts};
use crate::error::*;
use crate::graph::{Edge, Graph, Rule};

/// Env var resolving the Open Question in `spec.md` §9: the Clang standard
/// module interface path was hardcoded in the original; this crate makes it
/// configurable while keeping the same default.
pub const LIBCXX_STD_MODULE_ENV: &str = "CABIN_LIBCXX_STD_MODULE";
const DEFAULT_LIBCXX_STD_MODULE: &str = "/usr/share/libc++/v1/std.cppm";

/// Precondition: `compiler.supports_modules()`. Adds the edges needed to
/// build the standard-library module: the actual precompilation recipe
/// (`Rule::RunCommand`, since Ninja's built-in `phony` rule ignores any
/// `command` binding and always no-ops) plus `std-module`, a zero-command
/// phony alias every compile unit depends on once modules are enabled.
pub fn configure(
    graph: &mut Graph,
    compiler_opts: &mut CompilerOpts,
    compiler: &impl CompilerOps,
    build_out_path: &Path,
) -> Result<()> {
    if !compiler.supports_modules()? {
        return Err(Error::UnsupportedCompilerError {
            cxx: compiler.cxx().to_string(),
        });
    }

    let cxx = compiler.cxx();
    let is_gcc = (cxx.contains("gcc") || cxx.contains("g++")) && !cxx.contains("clang");
    let is_clang = cxx.contains("clang");

    if is_gcc {
        configure_gcc(graph, build_out_path);
    } else if is_clang {
        configure_clang(graph, compiler_opts, build_out_path);
    }

    Ok(())
}

fn configure_gcc(graph: &mut Graph, build_out_path: &Path) {
    let gcm_cache_dir = build_out_path.join("gcm.cache");
    let gcm_cache_dir_str = forward_slash(&gcm_cache_dir);
    let std_gcm = forward_slash(&gcm_cache_dir.join("std.gcm"));

    let mut mkdir_edge = Edge::new(vec![gcm_cache_dir_str.clone()], Rule::RunCommand);
    mkdir_edge.bindings.push((
        "command".to_string(),
        format!("mkdir -p {gcm_cache_dir_str}"),
    ));
    graph.add_edge(mkdir_edge);

    let mut std_gcm_edge = Edge::new(vec![std_gcm.clone()], Rule::RunCommand);
    std_gcm_edge.order_only_inputs = vec![gcm_cache_dir_str];
    std_gcm_edge.bindings.push((
        "command".to_string(),
        format!("$CXX $CXXFLAGS -fsearch-include-path -c bits/std.cc -o {std_gcm}"),
    ));
    graph.add_edge(std_gcm_edge);

    graph.add_phony("std-module", vec![std_gcm]);
}

fn configure_clang(graph: &mut Graph, compiler_opts: &mut CompilerOpts, build_out_path: &Path) {
    let std_module_src = std::env::var(LIBCXX_STD_MODULE_ENV)
        .unwrap_or_else(|_| DEFAULT_LIBCXX_STD_MODULE.to_string());
    let std_pcm = forward_slash(&build_out_path.join("std.pcm"));

    compiler_opts.c_flags.others.insert(0, "-stdlib=libc++".to_string());
    compiler_opts.c_flags.others.insert(1, "-Wno-reserved-identifier".to_string());
    compiler_opts
        .c_flags
        .others
        .insert(2, "-Wno-reserved-module-identifier".to_string());
    compiler_opts.ld_flags.others.insert(0, "-stdlib=libc++".to_string());

    let mut pcm_edge = Edge::new(vec![std_pcm.clone()], Rule::RunCommand);
    pcm_edge.bindings.push((
        "command".to_string(),
        format!("$CXX $CXXFLAGS --precompile -o {std_pcm} {std_module_src}"),
    ));
    graph.add_edge(pcm_edge);

    compiler_opts
        .c_flags
        .others
        .push(format!("-fmodule-file=std={std_pcm}"));

    graph.add_phony("std-module", vec![std_pcm]);
}

fn forward_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ToolFamily;
    use std::process::Command;

    struct FakeCompiler {
        cxx: String,
        family: ToolFamily,
        modules_supported: bool,
    }

    impl CompilerOps for FakeCompiler {
        fn cxx(&self) -> &str {
            &self.cxx
        }
        fn family(&self) -> ToolFamily {
            self.family
        }
        fn make_mm_cmd(&self, _opts: &CompilerOpts, _source: &Path) -> Command {
            Command::new("true")
        }
        fn make_preprocess_cmd(&self, _opts: &CompilerOpts, _source: &Path) -> Command {
            Command::new("true")
        }
        fn supports_modules(&self) -> Result<bool> {
            Ok(self.modules_supported)
        }
    }

    #[test]
    fn unsupported_compiler_is_rejected() {
        let compiler = FakeCompiler {
            cxx: "g++-9".into(),
            family: ToolFamily::Gnu,
            modules_supported: false,
        };
        let mut graph = Graph::new();
        let mut opts = CompilerOpts::default();

        let err = configure(&mut graph, &mut opts, &compiler, Path::new("target/debug/cabin.d"))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedCompilerError { .. }));
    }

    #[test]
    fn clang_family_prepends_libcxx_flags_and_adds_phony() {
        let compiler = FakeCompiler {
            cxx: "clang++".into(),
            family: ToolFamily::Clang,
            modules_supported: true,
        };
        let mut graph = Graph::new();
        let mut opts = CompilerOpts::default();

        configure(&mut graph, &mut opts, &compiler, Path::new("target/debug/cabin.d")).unwrap();

        assert_eq!(opts.c_flags.others[0], "-stdlib=libc++");
        assert!(opts.ld_flags.others.contains(&"-stdlib=libc++".to_string()));

        let pcm_edge = graph
            .edges
            .iter()
            .find(|e| e.outputs[0].ends_with("std.pcm"))
            .expect("std.pcm recipe edge");
        assert_eq!(pcm_edge.rule, Rule::RunCommand, "must carry a real command, not Ninja's no-op phony");
        assert!(pcm_edge.bindings.iter().any(|(k, v)| k == "command" && v.contains("--precompile")));

        let alias_edge = graph
            .edges
            .iter()
            .find(|e| e.outputs == vec!["std-module".to_string()])
            .expect("std-module phony alias");
        assert_eq!(alias_edge.rule, Rule::Phony);
    }

    #[test]
    fn gcc_family_adds_gcm_cache_chain() {
        let compiler = FakeCompiler {
            cxx: "g++-14".into(),
            family: ToolFamily::Gnu,
            modules_supported: true,
        };
        let mut graph = Graph::new();
        let mut opts = CompilerOpts::default();

        configure(&mut graph, &mut opts, &compiler, Path::new("target/debug/cabin.d")).unwrap();

        let gcm_edge = graph
            .edges
            .iter()
            .find(|e| e.outputs[0].ends_with("gcm.cache/std.gcm"))
            .expect("std.gcm recipe edge");
        assert_eq!(gcm_edge.rule, Rule::RunCommand, "must carry a real command, not Ninja's no-op phony");
        assert!(gcm_edge.bindings.iter().any(|(k, v)| k == "command" && v.contains("-fsearch-include-path")));

        let mkdir_edge = graph
            .edges
            .iter()
            .find(|e| e.outputs[0].ends_with("gcm.cache"))
            .expect("gcm.cache mkdir edge");
        assert_eq!(mkdir_edge.rule, Rule::RunCommand);

        let alias_edge = graph
            .edges
            .iter()
            .find(|e| e.outputs == vec!["std-module".to_string()])
            .expect("std-module phony alias");
        assert_eq!(alias_edge.rule, Rule::Phony);
    }
}

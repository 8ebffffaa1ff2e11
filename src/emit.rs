//! Serializes the in-memory [`Graph`] to the four Ninja-consumable text
//! files. Grounded on `writeBuildNinja`/`writeConfigNinja`/`writeRulesNinja`/
//! `writeTargetsNinja` in `examples/original_source/src/BuildConfig.cc` — the
//! teacher never emits a build-description file of its own, since it drives
//! the compiler directly rather than generating a graph for a downstream
//! build tool.

use std::{
    fs,
    io::Write,
    path::Path,
};

use crate::compiler::Compiler;
use crate::error::*;
use crate::graph::Graph;
use crate::path_mapper::join_flags;

/// The joined flag strings written into `config.ninja`. Computed once per
/// `configure_build` pass from the project's [`crate::compiler::CompilerOpts`].
pub struct Variables {
    pub cxx_flags: String,
    pub defines: String,
    pub includes: String,
    pub ld_flags: String,
    pub libs: String,
}

pub fn write_build_files(
    out_base_path: &Path,
    graph: &Graph,
    compiler: &Compiler,
    vars: &Variables,
) -> Result<()> {
    write_build_ninja(out_base_path, graph)?;
    write_config_ninja(out_base_path, compiler, vars)?;
    write_rules_ninja(out_base_path)?;
    write_targets_ninja(out_base_path, graph)?;
    Ok(())
}

fn open(out_base_path: &Path, name: &str) -> Result<fs::File> {
    let path = out_base_path.join(name);
    fs::File::create(&path).map_err(|e| Error::io(path, e))
}

fn write_build_ninja(out_base_path: &Path, graph: &Graph) -> Result<()> {
    let mut file = open(out_base_path, "build.ninja")?;
    let path = out_base_path.join("build.ninja");
    (|| -> std::io::Result<()> {
        writeln!(file, "# Generated by cabin-build")?;
        writeln!(file, "ninja_required_version = 1.11")?;
        writeln!(file)?;
        writeln!(file, "include config.ninja")?;
        writeln!(file, "include rules.ninja")?;
        writeln!(file, "include targets.ninja")?;
        writeln!(file)?;
        if !graph.default_targets.is_empty() {
            writeln!(file, "default {}", join_flags(&graph.default_targets))?;
        }
        Ok(())
    })()
    .map_err(|e| Error::io(path, e))
}

fn write_config_ninja(out_base_path: &Path, compiler: &Compiler, vars: &Variables) -> Result<()> {
    let mut file = open(out_base_path, "config.ninja")?;
    let path = out_base_path.join("config.ninja");
    (|| -> std::io::Result<()> {
        writeln!(file, "# Build variables")?;
        writeln!(file, "CXX = {}", compiler.cxx)?;
        writeln!(file, "CXXFLAGS = {}", vars.cxx_flags)?;
        writeln!(file, "DEFINES = {}", vars.defines)?;
        writeln!(file, "INCLUDES = {}", vars.includes)?;
        writeln!(file, "LDFLAGS = {}", vars.ld_flags)?;
        writeln!(file, "LIBS = {}", vars.libs)?;
        Ok(())
    })()
    .map_err(|e| Error::io(path, e))
}

fn write_rules_ninja(out_base_path: &Path) -> Result<()> {
    let mut file = open(out_base_path, "rules.ninja")?;
    let path = out_base_path.join("rules.ninja");
    (|| -> std::io::Result<()> {
        writeln!(file, "rule cxx_compile")?;
        writeln!(
            file,
            "  command = $CXX $DEFINES $INCLUDES $CXXFLAGS $extra_flags -c $in -o $out"
        )?;
        writeln!(file, "  description = CXX $out")?;
        writeln!(file)?;

        writeln!(file, "rule cxx_link")?;
        writeln!(file, "  command = $CXX $in $LDFLAGS $LIBS -o $out")?;
        writeln!(file, "  description = LINK $out")?;
        writeln!(file)?;

        writeln!(file, "rule ar_archive")?;
        writeln!(file, "  command = ar rcs $out $in")?;
        writeln!(file, "  description = AR $out")?;
        writeln!(file)?;

        // Unlike Ninja's built-in `phony`, this rule actually runs its edge's
        // `$command` binding — used by module-precompilation recipes that
        // need a real shell command (see `module_support.rs`).
        writeln!(file, "rule run_command")?;
        writeln!(file, "  command = $command")?;
        writeln!(file, "  description = $command")?;
        writeln!(file)?;
        Ok(())
    })()
    .map_err(|e| Error::io(path, e))
}

fn write_targets_ninja(out_base_path: &Path, graph: &Graph) -> Result<()> {
    let mut file = open(out_base_path, "targets.ninja")?;
    let path = out_base_path.join("targets.ninja");
    (|| -> std::io::Result<()> {
        for edge in &graph.edges {
            write!(file, "build {}", join_flags(&edge.outputs))?;
            write!(file, ": {}", edge.rule.as_str())?;
            if !edge.inputs.is_empty() {
                write!(file, " {}", join_flags(&edge.inputs))?;
            }
            if !edge.implicit_inputs.is_empty() {
                write!(file, " | {}", join_flags(&edge.implicit_inputs))?;
            }
            if !edge.order_only_inputs.is_empty() {
                write!(file, " || {}", join_flags(&edge.order_only_inputs))?;
            }
            writeln!(file)?;
            for (key, value) in &edge.bindings {
                writeln!(file, "  {key} = {value}")?;
            }
            writeln!(file)?;
        }

        if !graph.default_targets.is_empty() {
            writeln!(file, "build all: phony {}", join_flags(&graph.default_targets))?;
            writeln!(file)?;
        }
        if !graph.test_targets.is_empty() {
            writeln!(file, "build tests: phony {}", join_flags(&graph.test_targets))?;
            writeln!(file)?;
        }
        Ok(())
    })()
    .map_err(|e| Error::io(path, e))
}

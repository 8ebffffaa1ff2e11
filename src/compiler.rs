//! Compiler abstraction: builds the `Command`s the rest of the engine needs
//! to probe a translation unit (dependency info, preprocessed output) and to
//! detect whether the detected toolchain can precompile the standard
//! library module. Mirrors the teacher's `tool.rs`, generalized from
//! "build one object, link one executable" to the dependency/module-probing
//! contract `SPEC_FULL.md` §12 asks for.

use std::{
    path::{Path, PathBuf},
    process::Command,
};

use crate::error::*;

/// Flags fed to the compiler when compiling a translation unit.
///
/// All fields are ordered sequences, joined with a single space and with
/// order preserved verbatim (see [`crate::path_mapper::join_flags`]).
#[derive(Clone, Debug, Default)]
pub struct CFlags {
    pub others: Vec<String>,
    pub macros: Vec<String>,
    pub include_dirs: Vec<String>,
}

/// Flags fed to the linker.
#[derive(Clone, Debug, Default)]
pub struct LdFlags {
    pub others: Vec<String>,
    pub lib_dirs: Vec<String>,
    pub libs: Vec<String>,
}

/// All compiler/linker flags for a project, owned by the [`crate::project::ProjectContext`]
/// and consumed verbatim by the engine. Mutable only through `installDeps`
/// and `enableCoverage`-style setters before `configure_build` runs.
#[derive(Clone, Debug, educe::Educe)]
#[educe(Default)]
pub struct CompilerOpts {
    pub c_flags: CFlags,
    pub ld_flags: LdFlags,
}

/// Find a compiler available on the `$PATH`, preferring Clang, then a
/// platform-appropriate fallback.
fn find_tool() -> Result<(PathBuf, ToolFamily)> {
    macro_rules! exists_command {
        ($command_name:literal) => {
            Command::new($command_name).arg("--version").output().is_ok()
        };
    }

    if exists_command!("clang++") {
        return which_ok("clang++", ToolFamily::Clang);
    }
    if cfg!(target_os = "windows") {
        if exists_command!("clang-cl") {
            return which_ok("clang-cl", ToolFamily::Msvc { clang_cl: true });
        }
        if exists_command!("cl") {
            return which_ok("cl", ToolFamily::Msvc { clang_cl: false });
        }
    }
    if exists_command!("g++") {
        return which_ok("g++", ToolFamily::Gnu);
    }

    Err(Error::CompilerInvocationError {
        source: PathBuf::from("<none>"),
        detail: "no C++ compiler found on PATH".to_string(),
    })
}

fn which_ok(name: &str, family: ToolFamily) -> Result<(PathBuf, ToolFamily)> {
    let path = which::which(name).map_err(|e| Error::CompilerInvocationError {
        source: PathBuf::from(name),
        detail: e.to_string(),
    })?;
    Ok((path, family))
}

/// Represents the family of compiler toolchains this crate knows how to
/// talk to. Detection is best-effort and may not accurately reflect the
/// underlying tool.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ToolFamily {
    Gnu,
    Clang,
    Msvc { clang_cl: bool },
}

impl ToolFamily {
    pub fn include_flag(&self) -> &'static str {
        match self {
            ToolFamily::Msvc { .. } => "/I",
            _ => "-I",
        }
    }

    pub fn warnings_flags(&self) -> &'static str {
        match self {
            ToolFamily::Msvc { .. } => "-W4",
            ToolFamily::Gnu | ToolFamily::Clang => "-Wall",
        }
    }

    pub fn debug_flags(&self) -> &'static str {
        match self {
            ToolFamily::Msvc { .. } => "-Z7",
            ToolFamily::Gnu | ToolFamily::Clang => "-g",
        }
    }

    pub fn release_flags(&self) -> &'static str {
        match self {
            ToolFamily::Msvc { .. } => "/O2",
            ToolFamily::Gnu | ToolFamily::Clang => "-O3",
        }
    }
}

/// Seam allowing tests to substitute a fake compiler without spawning a real
/// `cc`/`clang++`/`g++` process.
pub trait CompilerOps {
    fn cxx(&self) -> &str;
    fn family(&self) -> ToolFamily;
    fn make_mm_cmd(&self, opts: &CompilerOpts, source: &Path) -> Command;
    fn make_preprocess_cmd(&self, opts: &CompilerOpts, source: &Path) -> Command;
    fn supports_modules(&self) -> Result<bool>;
}

/// A concrete compiler invocation, discovered on `$PATH` (or pinned by the
/// manifest/CLI in the future — out of scope for this crate, see
/// `SPEC_FULL.md` §1).
#[derive(Clone, Debug)]
pub struct Compiler {
    pub cxx: String,
    path: PathBuf,
    family: ToolFamily,
}

impl Compiler {
    pub fn init() -> Result<Self> {
        let (path, family) = find_tool()?;
        let cxx = path.to_string_lossy().into_owned();
        Ok(Compiler { cxx, path, family })
    }

    fn common_flags(&self, opts: &CompilerOpts) -> Vec<String> {
        let mut args = Vec::new();
        args.extend(opts.c_flags.macros.iter().cloned());
        for dir in &opts.c_flags.include_dirs {
            args.push(format!("{}{}", self.family.include_flag(), dir));
        }
        args.extend(opts.c_flags.others.iter().cloned());
        args
    }
}

impl CompilerOps for Compiler {
    fn cxx(&self) -> &str {
        &self.cxx
    }

    fn family(&self) -> ToolFamily {
        self.family
    }

    /// "Emit dependency info" mode: `-MM` on GCC/Clang, `/showIncludes` on
    /// MSVC (the flag itself isn't parsed by this engine's `DepScanner`,
    /// which assumes the GCC/Clang `-MM` format per `SPEC_FULL.md` §4).
    fn make_mm_cmd(&self, opts: &CompilerOpts, source: &Path) -> Command {
        let mut cmd = Command::new(&self.path);
        cmd.args(self.common_flags(opts));
        match self.family {
            ToolFamily::Msvc { .. } => {
                cmd.arg("/showIncludes").arg("/c").arg(source);
            }
            ToolFamily::Gnu | ToolFamily::Clang => {
                cmd.arg("-MM").arg(source);
            }
        }
        cmd
    }

    fn make_preprocess_cmd(&self, opts: &CompilerOpts, source: &Path) -> Command {
        let mut cmd = Command::new(&self.path);
        cmd.args(self.common_flags(opts));
        match self.family {
            ToolFamily::Msvc { .. } => {
                cmd.arg("/E").arg(source);
            }
            ToolFamily::Gnu | ToolFamily::Clang => {
                cmd.arg("-E").arg(source);
            }
        }
        cmd
    }

    fn supports_modules(&self) -> Result<bool> {
        let output = Command::new(&self.path)
            .arg("--version")
            .output()
            .map_err(|e| Error::CompilerInvocationError {
                source: self.path.clone(),
                detail: e.to_string(),
            })?;
        let text = String::from_utf8_lossy(&output.stdout);
        let version = parse_major_version(&text).unwrap_or(0);

        let supports = match self.family {
            ToolFamily::Gnu => version >= 14,
            ToolFamily::Clang => version >= 17,
            ToolFamily::Msvc { .. } => false,
        };
        Ok(supports)
    }
}

fn parse_major_version(text: &str) -> Option<u32> {
    let re = regex::Regex::new(r"(\d+)\.\d+").ok()?;
    re.captures(text)?.get(1)?.as_str().parse().ok()
}

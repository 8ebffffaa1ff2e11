//! Read-only (once frozen) context threaded through the build-configuration
//! engine. Generalizes the teacher's `config.rs::ProjectConfig`.

use std::path::PathBuf;

use crate::compiler::CompilerOpts;
use crate::error::*;
use crate::manifest::Manifest;

/// Everything the engine needs about the project, aside from the graph
/// itself. `compiler_opts` starts mutable (through [`ProjectContext::install_deps`]
/// / [`ProjectContext::enable_coverage`]) and is frozen the moment
/// `configure_build` begins, per `spec.md` §9's builder-phase →
/// frozen-phase requirement.
pub struct ProjectContext {
    pub root_path: PathBuf,
    pub build_out_path: PathBuf,
    pub unittest_out_path: PathBuf,
    pub out_base_path: PathBuf,
    pub manifest: Manifest,
    pub package_name: String,
    pub uses_modules: bool,
    pub compiler_opts: CompilerOpts,
    frozen: bool,
}

impl ProjectContext {
    pub fn new(root_path: PathBuf, manifest: Manifest, out_base_path: PathBuf) -> Self {
        let package_name = manifest.package.name.clone();
        let uses_modules = manifest.package.modules;
        ProjectContext {
            root_path,
            build_out_path: out_base_path.join("cabin.d"),
            unittest_out_path: out_base_path.join("unittests"),
            out_base_path,
            manifest,
            package_name,
            uses_modules,
            compiler_opts: CompilerOpts::default(),
            frozen: false,
        }
    }

    pub fn src_dir(&self) -> PathBuf {
        self.root_path.join("src")
    }

    /// Merges in flag fragments contributed by the (external) dependency
    /// installer. Only valid before [`Self::freeze`].
    pub fn install_deps(&mut self, fragments: &[CompilerOpts]) -> Result<()> {
        self.require_unfrozen()?;
        for frag in fragments {
            self.compiler_opts.c_flags.others.extend(frag.c_flags.others.iter().cloned());
            self.compiler_opts.c_flags.macros.extend(frag.c_flags.macros.iter().cloned());
            self.compiler_opts
                .c_flags
                .include_dirs
                .extend(frag.c_flags.include_dirs.iter().cloned());
            self.compiler_opts.ld_flags.others.extend(frag.ld_flags.others.iter().cloned());
            self.compiler_opts.ld_flags.lib_dirs.extend(frag.ld_flags.lib_dirs.iter().cloned());
            self.compiler_opts.ld_flags.libs.extend(frag.ld_flags.libs.iter().cloned());
        }
        Ok(())
    }

    /// Only valid before [`Self::freeze`].
    pub fn enable_coverage(&mut self) -> Result<()> {
        self.require_unfrozen()?;
        self.compiler_opts.c_flags.others.push("--coverage".to_string());
        self.compiler_opts.ld_flags.others.push("--coverage".to_string());
        Ok(())
    }

    /// Called once at the top of `configure_build`; after this,
    /// `install_deps`/`enable_coverage` return `InternalInvariantError`
    /// instead of silently mutating flags mid-configure.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    fn require_unfrozen(&self) -> Result<()> {
        if self.frozen {
            return Err(Error::InternalInvariantError(
                "compiler options mutated after configure_build began".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Package;
    use std::collections::BTreeMap;

    fn manifest() -> Manifest {
        Manifest {
            package: Package { name: "demo".into(), modules: false },
            profile: BTreeMap::new(),
            path: PathBuf::from("Cabin.toml"),
        }
    }

    #[test]
    fn install_deps_merges_fragments_before_freeze() {
        let mut ctx = ProjectContext::new(PathBuf::from("/proj"), manifest(), PathBuf::from("/proj/target/debug"));
        let frag = CompilerOpts {
            c_flags: crate::compiler::CFlags {
                others: vec!["-fPIC".into()],
                macros: vec![],
                include_dirs: vec!["/usr/include/foo".into()],
            },
            ld_flags: Default::default(),
        };

        ctx.install_deps(&[frag]).unwrap();

        assert_eq!(ctx.compiler_opts.c_flags.others, vec!["-fPIC".to_string()]);
        assert_eq!(ctx.compiler_opts.c_flags.include_dirs, vec!["/usr/include/foo".to_string()]);
    }

    #[test]
    fn mutation_after_freeze_is_rejected() {
        let mut ctx = ProjectContext::new(PathBuf::from("/proj"), manifest(), PathBuf::from("/proj/target/debug"));
        ctx.freeze();

        assert!(ctx.enable_coverage().is_err());
    }

    #[test]
    fn out_paths_are_derived_from_out_base_path() {
        let ctx = ProjectContext::new(PathBuf::from("/proj"), manifest(), PathBuf::from("/proj/target/debug"));

        assert_eq!(ctx.build_out_path, PathBuf::from("/proj/target/debug/cabin.d"));
        assert_eq!(ctx.unittest_out_path, PathBuf::from("/proj/target/debug/unittests"));
    }
}

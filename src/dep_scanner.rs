//! Invokes the compiler in "emit dependency info" mode for one source file
//! and parses its output into a header dependency set. Grounded on
//! `BuildConfig::runMM` plus the corrected `parseMMOutput` (the all-lines,
//! module-artifact-filtering variant) in
//! `examples/original_source/src/BuildConfig.cc` — the first-line-only
//! variant that also coexists in that file is a documented bug
//! (`spec.md` §9) and is not reproduced here.

use std::{
    collections::BTreeSet,
    path::Path,
};

use crate::compiler::{CompilerOps, CompilerOpts};
use crate::error::*;

/// Runs the compiler's "emit dependency info" mode for `source` and parses
/// the result into `(object_target, header_deps)`.
///
/// `is_test` appends the test macro (`-DCABIN_TEST`) to the invocation, so
/// that conditionally-included test headers show up in the dependency set.
pub fn scan(
    compiler: &impl CompilerOps,
    opts: &CompilerOpts,
    source: &Path,
    is_test: bool,
    out_base_path: &Path,
) -> Result<(String, BTreeSet<String>)> {
    let mut command = compiler.make_mm_cmd(opts, source);
    if is_test {
        command.arg("-DCABIN_TEST");
    }
    command.current_dir(out_base_path);

    let output = command.output().map_err(|e| Error::CompilerInvocationError {
        source: source.to_path_buf(),
        detail: e.to_string(),
    })?;
    if !output.status.success() {
        return Err(Error::CompilerInvocationError {
            source: source.to_path_buf(),
            detail: format!(
                "compiler exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            ),
        });
    }

    let stdout = String::from_utf8(output.stdout).map_err(|e| Error::CompilerInvocationError {
        source: source.to_path_buf(),
        detail: format!("dependency output was not valid UTF-8: {e}"),
    })?;

    parse_mm_output(&stdout).ok_or_else(|| Error::CompilerInvocationError {
        source: source.to_path_buf(),
        detail: "could not parse dependency-rule output".to_string(),
    })
}

/// Parses `TARGET: DEP1 DEP2 \<newline>  DEP3 DEP4 ...` into
/// `(target, deps)`. The first token after the target (the source file
/// itself) is discarded, as are line-continuation tokens (`\`) and any
/// token naming a compiled-module artifact (`.c++-module`).
fn parse_mm_output(text: &str) -> Option<(String, BTreeSet<String>)> {
    let (target_part, rest) = text.split_once(':')?;
    let target = target_part.trim().to_string();

    let mut deps = BTreeSet::new();
    let mut first = true;
    for raw_token in rest.split_whitespace() {
        let token = raw_token.trim_end_matches('\n');
        if token.is_empty() || token.starts_with('\\') {
            continue;
        }
        if first {
            first = false;
            continue;
        }
        if token.contains(".c++-module") {
            continue;
        }
        deps.insert(token.to_string());
    }

    Some((target, deps))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multiline_dependency_rule() {
        let input = "main.o: src/main.cc include/foo.hpp include/bar.hpp \\\n include/baz.hh\n";
        let (target, deps) = parse_mm_output(input).unwrap();

        assert_eq!(target, "main.o");
        assert!(deps.contains("include/foo.hpp"));
        assert!(deps.contains("include/bar.hpp"));
        assert!(deps.contains("include/baz.hh"));
        assert!(!deps.contains("src/main.cc"));
    }

    #[test]
    fn drops_module_artifact_tokens() {
        let input = "main.o: src/main.cc std.c++-module include/foo.hpp\n";
        let (_, deps) = parse_mm_output(input).unwrap();

        assert!(!deps.iter().any(|d| d.contains(".c++-module")));
        assert!(deps.contains("include/foo.hpp"));
    }

    #[test]
    fn malformed_output_without_colon_fails_to_parse() {
        assert!(parse_mm_output("no colon here").is_none());
    }

    #[test]
    fn single_source_with_no_headers_has_empty_deps() {
        let input = "main.o: src/main.cc\n";
        let (target, deps) = parse_mm_output(input).unwrap();
        assert_eq!(target, "main.o");
        assert!(deps.is_empty());
    }
}

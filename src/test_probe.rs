//! Decides whether a source file participates in the test build. Grounded
//! on `BuildConfig::containsTestCode` in
//! `examples/original_source/src/BuildConfig.cc`.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::compiler::{CompilerOps, CompilerOpts};
use crate::error::*;

/// Returns whether `source` contains test code reachable under the test
/// macro (`CABIN_TEST`).
///
/// Fast path: a line-by-line scan for the literal token. If the file can't
/// even be opened, this returns `Ok(false)` rather than failing — a missing
/// or unreadable source isn't a test-probe error, per `spec.md` §7.
///
/// If the token is found textually, the source is preprocessed twice (once
/// plain, once with `-DCABIN_TEST`) and the outputs compared byte for byte,
/// since a textual match might sit inside a comment or an inactive
/// conditional branch.
pub fn contains_test_code(
    compiler: &impl CompilerOps,
    opts: &CompilerOpts,
    source: &Path,
) -> Result<bool> {
    let Ok(file) = File::open(source) else {
        return Ok(false);
    };
    let reader = BufReader::new(file);

    let mut mentions_marker = false;
    for line in reader.lines() {
        let Ok(line) = line else { break };
        if line.contains("CABIN_TEST") {
            mentions_marker = true;
            break;
        }
    }
    if !mentions_marker {
        return Ok(false);
    }

    let plain = preprocess(compiler, opts, source, false)?;
    let with_test = preprocess(compiler, opts, source, true)?;

    let differs = plain != with_test;
    if differs {
        log::trace!("found test code: {}", source.display());
    }
    Ok(differs)
}

fn preprocess(
    compiler: &impl CompilerOps,
    opts: &CompilerOpts,
    source: &Path,
    with_test_macro: bool,
) -> Result<Vec<u8>> {
    let mut command = compiler.make_preprocess_cmd(opts, source);
    if with_test_macro {
        command.arg("-DCABIN_TEST");
    }

    let output = command.output().map_err(|e| Error::CompilerInvocationError {
        source: source.to_path_buf(),
        detail: e.to_string(),
    })?;
    if !output.status.success() {
        return Err(Error::CompilerInvocationError {
            source: source.to_path_buf(),
            detail: format!("preprocessing exited with {}", output.status),
        });
    }
    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::process::Command;

    #[derive(Clone)]
    struct FakeCompiler {
        /// Toggled so the two preprocess invocations return different bytes,
        /// simulating a compiler whose `-DCABIN_TEST` changes the output.
        diverges: bool,
    }

    impl CompilerOps for FakeCompiler {
        fn cxx(&self) -> &str {
            "fake-cxx"
        }

        fn family(&self) -> crate::compiler::ToolFamily {
            crate::compiler::ToolFamily::Gnu
        }

        fn make_mm_cmd(&self, _opts: &CompilerOpts, _source: &Path) -> Command {
            Command::new("true")
        }

        fn make_preprocess_cmd(&self, _opts: &CompilerOpts, source: &Path) -> Command {
            // `cat` echoes the file back; when diverges is requested we
            // instead run `echo` so the two invocations disagree whenever
            // `-DCABIN_TEST` is appended.
            if self.diverges {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(format!("cat '{}'; echo \"$1\"", source.display()));
                cmd.arg("sh");
                cmd
            } else {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(format!("cat '{}'", source.display()));
                cmd.arg("sh");
                cmd
            }
        }

        fn supports_modules(&self) -> Result<bool> {
            Ok(false)
        }
    }

    fn write_source(dir: &std::path::Path, contents: &str) -> std::path::PathBuf {
        let path = dir.join("probe.cc");
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn returns_false_fast_path_when_marker_absent() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path(), "int main() { return 0; }\n");
        let compiler = FakeCompiler { diverges: true };
        let opts = CompilerOpts::default();

        assert!(!contains_test_code(&compiler, &opts, &source).unwrap());
    }

    #[test]
    fn returns_false_when_unreadable() {
        let compiler = FakeCompiler { diverges: true };
        let opts = CompilerOpts::default();
        let missing = Path::new("/nonexistent/does-not-exist.cc");

        assert!(!contains_test_code(&compiler, &opts, missing).unwrap());
    }

    #[test]
    fn returns_true_when_preprocessed_outputs_differ() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path(), "#ifdef CABIN_TEST\nint x;\n#endif\n");
        let compiler = FakeCompiler { diverges: true };
        let opts = CompilerOpts::default();

        assert!(contains_test_code(&compiler, &opts, &source).unwrap());
    }

    #[test]
    fn returns_false_when_marker_is_inert_comment() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path(), "// CABIN_TEST mentioned but inactive\n");
        let compiler = FakeCompiler { diverges: false };
        let opts = CompilerOpts::default();

        assert!(!contains_test_code(&compiler, &opts, &source).unwrap());
    }
}

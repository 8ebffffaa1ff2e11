//! Thin wrapper around invoking the external build driver (Ninja). Grounded
//! on `getNinjaCommand`/`makeNinjaCommand`/`ninjaNeedsWork`/`generateCompdb`
//! in `examples/original_source/src/BuildConfig.cc` — this crate never links
//! a binary itself, it hands the graph to Ninja and shells out the same way
//! the teacher's `Tool::to_build_command`/`to_link_command` shell out to `cc`.

use std::{
    fs,
    path::Path,
    process::Command,
};

use crate::error::*;

/// How much diagnostic output to ask Ninja for; mirrors the CLI's `-v`/`-vv`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

fn ninja_command(out_dir: &Path) -> Command {
    let mut cmd = Command::new("ninja");
    cmd.arg("-C").arg(out_dir);
    cmd
}

/// Runs `ninja -C <out_dir>` to completion, with `-j<parallelism>` and a
/// verbosity flag appended.
pub fn run(out_dir: &Path, parallelism: usize, verbosity: Verbosity) -> Result<()> {
    let mut cmd = ninja_command(out_dir);
    cmd.arg(format!("-j{parallelism}"));
    match verbosity {
        Verbosity::Quiet => {
            cmd.arg("--quiet");
        }
        Verbosity::Verbose => {
            cmd.arg("--verbose");
        }
        Verbosity::Normal => {}
    }

    let status = cmd.status().map_err(|e| Error::DriverError(e.to_string()))?;
    if !status.success() {
        return Err(Error::DriverError(format!("ninja exited with {status}")));
    }
    Ok(())
}

/// Dry-runs Ninja (`-n`) for `targets` and reports whether any work remains.
/// A non-zero exit conservatively reports `Ok(true)` (work remains) rather
/// than risking a stale build being reported as current; a failure to spawn
/// Ninja at all is a hard `Err`.
pub fn needs_work(out_dir: &Path, targets: &[String]) -> Result<bool> {
    let mut cmd = ninja_command(out_dir);
    cmd.arg("-n");
    cmd.args(targets);

    let output = cmd.output().map_err(|e| Error::DriverError(e.to_string()))?;
    if !output.status.success() {
        return Ok(true);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(!stdout.contains("ninja: no work to do."))
}

/// Runs `ninja -C <out_dir> -t compdb cxx_compile` and writes its stdout
/// verbatim to `<out_dir>/compile_commands.json`.
pub fn generate_compdb(out_dir: &Path) -> Result<()> {
    let mut cmd = ninja_command(out_dir);
    cmd.arg("-t").arg("compdb").arg("cxx_compile");

    let output = cmd.output().map_err(|e| Error::DriverError(e.to_string()))?;
    if !output.status.success() {
        return Err(Error::DriverError(format!(
            "ninja -t compdb exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    let dest = out_dir.join("compile_commands.json");
    fs::write(&dest, output.stdout).map_err(|e| Error::io(dest, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_work_is_true_when_ninja_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        // No `ninja` on a bare test host: `Command::output` itself fails, so
        // this exercises the error path, not the "no work to do" parse.
        let result = needs_work(dir.path(), &[]);
        assert!(result.is_err() || result.unwrap());
    }

    #[test]
    fn run_fails_loudly_when_ninja_is_unavailable_or_out_dir_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        assert!(run(&missing, 1, Verbosity::Quiet).is_err());
    }
}

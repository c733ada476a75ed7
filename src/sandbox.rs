//! The two external subprocess contracts this crate invokes as opaque
//! collaborators: `bundle-runtime build` (mounts the staging tree at `/app`
//! and runs a command inside it) and `bundle-runtime build-init` (populates
//! an empty staging tree). Both are treated as black boxes — we only own
//! argv construction and exit-code checking.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::command::CommandArgs;
use crate::error::{Error, Result};

const TOOL: &str = "bundle-runtime";

fn run(mut cmd: Command, tool: &str) -> Result<()> {
    debug!(?cmd, "running sandboxed command");
    let status = cmd.status().map_err(|e| Error::io(e, tool))?;
    if !status.success() {
        return Err(Error::SubprocessFailed { tool: tool.to_string(), code: status.code().unwrap_or(-1) });
    }
    Ok(())
}

/// Runs `argv` inside the sandbox with `staging_dir` mounted at `/app`,
/// extending the child environment with `env_vars` (each already in
/// `KEY=VALUE` form) via repeated `--env=` flags, and forcing
/// `GIO_USE_VFS=local` the way the original build wrapper does.
pub fn build(
    staging_dir: &Path,
    cwd: Option<&Path>,
    env_vars: &[String],
    argv: Vec<String>,
) -> Result<()> {
    let args = CommandArgs::new()
        .push("build")
        .push_all(env_vars.iter().map(|kv| format!("--env={kv}")))
        .push(staging_dir.display().to_string())
        .push_all(argv);

    let mut cmd = Command::new(TOOL);
    cmd.args(args);
    cmd.env("GIO_USE_VFS", "local");
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }
    run(cmd, TOOL)
}

/// Populates an empty staging tree for `app_id`/`sdk`/`runtime`/`runtime_version`.
pub fn build_init(staging_dir: &Path, app_id: &str, sdk: &str, runtime: &str, runtime_version: &str) -> Result<()> {
    let args = CommandArgs::new()
        .push("build-init")
        .push(staging_dir.display().to_string())
        .push(app_id.to_string())
        .push(sdk.to_string())
        .push(runtime.to_string())
        .push(runtime_version.to_string());

    let mut cmd = Command::new(TOOL);
    cmd.args(args);
    cmd.env("GIO_USE_VFS", "local");
    run(cmd, TOOL)
}

//! Child process creation

use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::{
    child::ManagedChild,
    config::Invocation,
    error::{Result, RunError},
};

/// Hide the console window of the child on Windows
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Spawn the child described by `invocation`.
///
/// stdin is always the null device. stdout and stderr are piped only when
/// requested, otherwise discarded at the OS level.
pub(crate) fn launch(
    invocation: &Invocation,
    pipe_stdout: bool,
    pipe_stderr: bool,
) -> Result<ManagedChild> {
    invocation.validate()?;

    debug!(
        program = %invocation.program,
        args = ?invocation.arguments,
        working_dir = ?invocation.working_dir,
        "Launching process"
    );

    let mut cmd = Command::new(&invocation.program);
    invocation.arguments.apply(&mut cmd);

    if let Some(ref dir) = invocation.working_dir {
        cmd.current_dir(dir);
    }

    for (key, value) in &invocation.env {
        cmd.env(key, value);
    }

    cmd.stdin(Stdio::null());
    cmd.stdout(if pipe_stdout {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    cmd.stderr(if pipe_stderr {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    cmd.kill_on_drop(true);

    #[cfg(windows)]
    cmd.creation_flags(CREATE_NO_WINDOW);

    let child = cmd.spawn().map_err(|source| RunError::LaunchFailed {
        program: invocation.program.clone(),
        source,
    })?;

    let child = ManagedChild::new(child, invocation.program.clone());
    info!(pid = %child.pid(), program = %invocation.program, "Process launched");

    Ok(child)
}

//! Child process management: launching, collecting and terminating.
//!
//! stdout and stderr are always piped, never shared with the caller. Output
//! is read in full once the child exits; nothing is streamed.

use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::options::TextEncoding;
use crate::template::Invocation;
use crate::types::{CapturedOutput, Stream};

/// A started child process that has not been collected yet.
#[derive(Debug)]
pub struct Launched {
    invocation: Invocation,
    child: Child,
    started: Instant,
}

/// A collected child process with its decoded output.
#[derive(Debug)]
pub struct Completed {
    pub invocation: Invocation,
    pub output: CapturedOutput,
    pub status: ExitStatus,
    /// Time from launch until collection finished. In parallel runs this
    /// includes time spent waiting on earlier scenarios.
    pub elapsed: Duration,
}

/// Starts `invocation` with captured stdout and stderr.
///
/// # Errors
/// Returns [`Error::Spawn`] if the program cannot be started (not found,
/// not executable, resource exhaustion).
pub fn launch(invocation: Invocation) -> Result<Launched> {
    let child = Command::new(invocation.program())
        .args(invocation.args())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| Error::Spawn {
            id: invocation.id,
            program: invocation.program().to_string(),
            source,
        })?;

    debug!(
        id = invocation.id,
        pid = child.id(),
        command = %invocation.command_line(),
        "launched"
    );
    Ok(Launched {
        invocation,
        child,
        started: Instant::now(),
    })
}

impl Launched {
    pub fn id(&self) -> usize {
        self.invocation.id
    }

    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    /// Blocks until the child exits, then reads and decodes its output.
    pub fn collect(self, encoding: TextEncoding) -> Result<Completed> {
        let id = self.invocation.id;
        let output = self
            .child
            .wait_with_output()
            .map_err(|source| Error::Wait { id, source })?;

        let stdout = encoding.decode_stream(id, Stream::Stdout, output.stdout)?;
        let stderr = encoding.decode_stream(id, Stream::Stderr, output.stderr)?;
        let elapsed = self.started.elapsed();

        if output.status.success() {
            debug!(id, elapsed_ms = elapsed.as_millis() as u64, "collected");
        } else {
            warn!(
                id,
                status = %output.status,
                command = %self.invocation.command_line(),
                "process exited unsuccessfully"
            );
        }

        Ok(Completed {
            invocation: self.invocation,
            output: CapturedOutput { stdout, stderr },
            status: output.status,
            elapsed,
        })
    }

    /// Kills the child if it is still running and reaps it.
    ///
    /// Failures are logged, not returned: this only runs while another error
    /// is already on its way out.
    pub fn terminate(mut self) {
        let id = self.invocation.id;
        if let Err(e) = self.child.kill() {
            // InvalidInput means the child already exited.
            if e.kind() != std::io::ErrorKind::InvalidInput {
                warn!(id, error = %e, "failed to kill process");
            }
        }
        match self.child.wait() {
            Ok(status) => debug!(id, %status, "terminated"),
            Err(e) => warn!(id, error = %e, "failed to reap process"),
        }
    }
}

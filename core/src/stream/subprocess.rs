//! stream/subprocess.rs
//! Owned handle to a retrieval subprocess.
//!
//! The child's stdin and stderr are discarded and its stdout is a pipe.
//! Teardown order is drain, then reap: the pipe is read to EOF before the
//! child is waited on, so a child still writing cannot block the wait.
//! `wait` and `close` consume the handle, and `Drop` only reaps a child
//! that nobody waited on, so a process is reaped exactly once.

use std::io;
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};

use log::{debug, error, warn};

use crate::types::StreamError;

#[derive(Debug)]
pub struct SubprocessHandle {
    program: String,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
}

impl SubprocessHandle {
    /// Spawn `program` with `args`. Spawn failures (missing program, no
    /// pipe, fork failure) are resource errors.
    pub fn spawn(program: &str, args: &[&str]) -> Result<Self, StreamError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| StreamError::resource(format!("spawn '{program}'"), e))?;
        let stdout = child.stdout.take();
        debug!("[SUBPROCESS] spawned {} pid={}", program, child.id());
        Ok(Self { program: program.to_string(), child: Some(child), stdout })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Hand out the read end of the pipe. Returns `None` after the first call.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    /// Reap the child. A non-zero exit or death by signal is a process error.
    pub fn wait(mut self) -> Result<(), StreamError> {
        let status = self.reap()?;
        check_status(&self.program, status)
    }

    /// Drain whatever part of the pipe is still held here, then reap.
    pub fn close(mut self) -> Result<(), StreamError> {
        if let Some(mut out) = self.stdout.take() {
            let skipped = io::copy(&mut out, &mut io::sink())
                .map_err(|e| StreamError::resource(format!("drain '{}'", self.program), e))?;
            debug!("[SUBPROCESS] drained {} bytes before reaping", skipped);
        }
        self.wait()
    }

    fn reap(&mut self) -> Result<ExitStatus, StreamError> {
        let Some(mut child) = self.child.take() else {
            return Err(StreamError::Pipeline("subprocess already reaped"));
        };
        let status = child
            .wait()
            .map_err(|e| StreamError::resource(format!("wait for '{}'", self.program), e))?;
        debug!("[SUBPROCESS] {} exited with {}", self.program, status);
        Ok(status)
    }
}

fn check_status(program: &str, status: ExitStatus) -> Result<(), StreamError> {
    if status.success() {
        Ok(())
    } else {
        Err(StreamError::Process { program: program.to_string(), status })
    }
}

impl Drop for SubprocessHandle {
    fn drop(&mut self) {
        if self.child.is_none() {
            return;
        }
        // Closing our end first lets a still-writing child see EPIPE and exit.
        drop(self.stdout.take());
        match self.reap() {
            Ok(status) if !status.success() => {
                warn!("[SUBPROCESS] {} exited with {} (not checked)", self.program, status)
            }
            Ok(_) => {}
            Err(e) => error!("[SUBPROCESS] reap during drop failed: {e}"),
        }
    }
}

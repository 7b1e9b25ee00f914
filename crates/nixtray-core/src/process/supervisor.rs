//! Process-group supervision for external update commands.
//!
//! Every command is launched as the leader of its own process group so a
//! timeout or shutdown can take down the command together with anything
//! it spawned. The group id of the running command is the supervisor's
//! only piece of mutable state.

use crate::{
    LogSink,
    process::{CommandResult, CommandRunner, CommandSpec},
};

use std::{
    io::{self, Read},
    os::unix::process::{CommandExt, ExitStatusExt},
    process::{Child, Command, ExitStatus, Stdio},
    sync::{Mutex, MutexGuard},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use tracing::{debug, info, instrument, warn};

/// Time between SIGTERM and SIGKILL when tearing down a process group.
pub const TERMINATION_GRACE: Duration = Duration::from_millis(500);

/// How often a running child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

type OutputReader = Option<JoinHandle<io::Result<Vec<u8>>>>;

/// Runs one external command at a time in its own process group.
pub struct ProcessSupervisor {
    log: LogSink,
    active: Mutex<Option<i32>>,
}

/// Clears the active process handle on every exit path of a run.
struct ActiveHandleGuard<'a> {
    slot: &'a Mutex<Option<i32>>,
}

impl Drop for ActiveHandleGuard<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl ProcessSupervisor {
    /// Create a supervisor that writes command blocks to `log`.
    pub fn new(log: LogSink) -> Self {
        Self {
            log,
            active: Mutex::new(None),
        }
    }

    /// Process group id of the command currently running, if any.
    pub fn active_pgid(&self) -> Option<i32> {
        *self.slot()
    }

    fn slot(&self) -> MutexGuard<'_, Option<i32>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns `None` when the command was killed for exceeding its timeout.
    fn execute(&self, spec: &CommandSpec) -> io::Result<Option<CommandResult>> {
        let (program, args) = spec.argv().split_first().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "empty argument vector")
        })?;

        let mut command = Command::new(program);
        command
            .args(args)
            .envs(spec.env_overrides())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);
        if let Some(cwd) = spec.cwd() {
            command.current_dir(cwd);
        }

        let mut child = command.spawn()?;
        let pgid = i32::try_from(child.id())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        *self.slot() = Some(pgid);
        let _guard = ActiveHandleGuard { slot: &self.active };
        debug!(pgid, "Command started");

        let deadline = spec.timeout_value().map(|t| Instant::now() + t);
        let readers = [
            spawn_reader(child.stdout.take()),
            spawn_reader(child.stderr.take()),
        ];

        let status = match wait_until(&mut child, deadline) {
            Ok(Some(status)) => status,
            Ok(None) => {
                self.abandon_timed_out(pgid, &mut child, readers);
                return Ok(None);
            }
            Err(e) => {
                self.slot().take();
                self.terminate_group(pgid);
                let _ = child.wait();
                return Err(e);
            }
        };

        // Background descendants can keep the pipes open after the leader exits.
        if !readers_finished_by(&readers, deadline) {
            self.abandon_timed_out(pgid, &mut child, readers);
            return Ok(None);
        }

        let [stdout_reader, stderr_reader] = readers;
        let stdout = join_reader(stdout_reader)?;
        let stderr = join_reader(stderr_reader)?;

        Ok(Some(CommandResult {
            exit_code: exit_code(status),
            stdout,
            stderr,
        }))
    }

    /// Kill a run that is still going at its deadline.
    ///
    /// Readers still blocked after the group is gone are left detached.
    fn abandon_timed_out(&self, pgid: i32, child: &mut Child, readers: [OutputReader; 2]) {
        self.log.block(
            "Timeout",
            &[format!("Command exceeded timeout, killing pgid={pgid}")],
        );
        self.slot().take();
        self.terminate_group(pgid);
        let _ = child.wait();
        if readers_finished_by(&readers, Some(Instant::now() + TERMINATION_GRACE)) {
            for reader in readers {
                let _ = join_reader(reader);
            }
        }
        warn!(pgid, "Command timed out");
    }

    /// SIGTERM the group, wait the grace period, then SIGKILL it.
    fn terminate_group(&self, pgid: i32) {
        if let Err(e) = signal_group(pgid, libc::SIGTERM) {
            if e.raw_os_error() == Some(libc::ESRCH) {
                debug!(pgid, "Process group already gone");
                return;
            }
            self.log.block(
                "Shutdown",
                &[format!("Failed to kill pgid={pgid}"), format!("{e:?}")],
            );
            warn!(pgid, error = %e, "Failed to terminate process group");
        }

        thread::sleep(TERMINATION_GRACE);

        // ESRCH here just means SIGTERM was enough.
        let _ = signal_group(pgid, libc::SIGKILL);
    }
}

impl CommandRunner for ProcessSupervisor {
    #[instrument(skip(self, spec), fields(command = %spec.display()))]
    fn run(&self, spec: &CommandSpec) -> CommandResult {
        let cwd = match spec.cwd() {
            Some(dir) => dir.display().to_string(),
            None => std::env::current_dir()
                .map(|d| d.display().to_string())
                .unwrap_or_default(),
        };
        let timeout = spec
            .timeout_value()
            .map(|t| t.as_secs().to_string())
            .unwrap_or_else(|| "none".to_string());

        self.log.block(
            "Command",
            &[
                format!("cwd: {cwd}"),
                format!("cmd: {}", spec.display()),
                format!("timeout: {timeout}"),
            ],
        );

        match self.execute(spec) {
            Ok(Some(result)) => {
                self.log.block(
                    "Result",
                    &[
                        format!("exit_code: {}", result.exit_code),
                        format!("stdout:\n{}", result.stdout.trim_end()),
                        format!("stderr:\n{}", result.stderr.trim_end()),
                    ],
                );
                info!(exit_code = result.exit_code, "Command finished");
                result
            }
            Ok(None) => CommandResult::timed_out(),
            Err(e) => {
                self.log.block("Exception", &[format!("{e:?}")]);
                warn!(error = %e, "Command could not run");
                CommandResult::launch_failure(e.to_string())
            }
        }
    }

    fn kill_active(&self) {
        let Some(pgid) = self.slot().take() else {
            return;
        };

        self.log.block(
            "Shutdown",
            &[format!("Killing active process group pgid={pgid}")],
        );
        info!(pgid, "Killing active process group");
        self.terminate_group(pgid);
    }
}

fn wait_until(child: &mut Child, deadline: Option<Instant>) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn readers_finished_by(readers: &[OutputReader], deadline: Option<Instant>) -> bool {
    loop {
        if readers.iter().flatten().all(|handle| handle.is_finished()) {
            return true;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return false;
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> OutputReader {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn join_reader(reader: OutputReader) -> io::Result<String> {
    let Some(handle) = reader else {
        return Ok(String::new());
    };
    let bytes = handle
        .join()
        .map_err(|_| io::Error::other("output reader thread panicked"))??;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|sig| -sig))
        .unwrap_or(-1)
}

fn signal_group(pgid: i32, signal: libc::c_int) -> io::Result<()> {
    // SAFETY: a negative pid addresses the process group led by our child.
    let rc = unsafe { libc::kill(-pgid, signal) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

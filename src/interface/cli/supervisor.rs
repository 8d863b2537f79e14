use fs2::FileExt;
use nix::unistd::{Gid, Group, Uid, User, dup2};
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::signal::unix::{SignalKind, signal};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("another watcher holds the lock on {0}")]
    AlreadyRunning(PathBuf),

    #[error("pid file {path}: {source}")]
    PidFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unknown user {0}")]
    UnknownUser(String),

    #[error("unknown group {0}")]
    UnknownGroup(String),

    #[error("failed to change identity: {0}")]
    Privileges(nix::Error),

    #[error("failed to daemonize: {0}")]
    Daemonize(String),

    #[error("log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to install signal handler: {0}")]
    Signal(std::io::Error),
}

/// Exclusively locked PID file, removed on drop.
#[derive(Debug)]
pub struct PidFile {
    file: File,
    path: PathBuf,
}

impl PidFile {
    /// Lock `path`; fails with `AlreadyRunning` if another process holds it.
    pub fn acquire(path: &Path) -> Result<Self, SupervisorError> {
        let path = std::path::absolute(path).map_err(|source| SupervisorError::PidFile {
            path: path.to_path_buf(),
            source,
        })?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| SupervisorError::PidFile {
                path: path.clone(),
                source,
            })?;
        file.try_lock_exclusive()
            .map_err(|_| SupervisorError::AlreadyRunning(path.clone()))?;

        Ok(Self { file, path })
    }

    /// Replace the file contents with `pid`.
    pub fn record(&mut self, pid: u32) -> Result<(), SupervisorError> {
        let path = self.path.clone();
        let io_err = |source| SupervisorError::PidFile {
            path: path.clone(),
            source,
        };
        self.file.set_len(0).map_err(io_err)?;
        self.file.seek(SeekFrom::Start(0)).map_err(io_err)?;
        writeln!(self.file, "{pid}").map_err(io_err)?;
        self.file.sync_all().map_err(io_err)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
        let _ = FileExt::unlock(&self.file);
    }
}

/// Target identity resolved from `--user` / `--group`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Identity {
    pub uid: Option<Uid>,
    pub gid: Option<Gid>,
}

impl Identity {
    /// Resolve names up front so typos fail before anything starts.
    ///
    /// A user without an explicit group runs with the user's primary group.
    pub fn resolve(user: Option<&str>, group: Option<&str>) -> Result<Self, SupervisorError> {
        let user = match user {
            Some(name) => Some(
                User::from_name(name)
                    .ok()
                    .flatten()
                    .ok_or_else(|| SupervisorError::UnknownUser(name.to_string()))?,
            ),
            None => None,
        };
        let gid = match group {
            Some(name) => Some(
                Group::from_name(name)
                    .ok()
                    .flatten()
                    .ok_or_else(|| SupervisorError::UnknownGroup(name.to_string()))?
                    .gid,
            ),
            None => user.as_ref().map(|u| u.gid),
        };

        Ok(Self {
            uid: user.map(|u| u.uid),
            gid,
        })
    }

    /// Switch identity, group first so the user switch cannot lock us out of it.
    pub fn apply(&self) -> Result<(), SupervisorError> {
        if let Some(gid) = self.gid {
            nix::unistd::setgid(gid).map_err(SupervisorError::Privileges)?;
        }
        if let Some(uid) = self.uid {
            nix::unistd::setuid(uid).map_err(SupervisorError::Privileges)?;
        }
        Ok(())
    }
}

/// Detach from the terminal with a double fork.
///
/// Must run before the tokio runtime exists: `fork()` only carries the
/// calling thread into the child.
#[allow(unsafe_code)]
pub fn daemonize() -> Result<(), SupervisorError> {
    use nix::unistd::{ForkResult, fork, setsid};

    // SAFETY: no runtime or helper threads have been started yet.
    match unsafe { fork() }.map_err(|e| SupervisorError::Daemonize(e.to_string()))? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {}
    }

    setsid().map_err(|e| SupervisorError::Daemonize(e.to_string()))?;

    // SAFETY: still single-threaded; the session leader forks once more so the
    // daemon can never reacquire a controlling terminal.
    match unsafe { fork() }.map_err(|e| SupervisorError::Daemonize(e.to_string()))? {
        ForkResult::Parent { .. } => std::process::exit(0),
        ForkResult::Child => {}
    }

    std::env::set_current_dir("/").map_err(|e| SupervisorError::Daemonize(e.to_string()))?;

    // The launching terminal may be gone; without a log file output is discarded.
    redirect_descriptors(Path::new("/dev/null"), &[0, 1, 2])
}

/// Point every descriptor in `fds` at `target`.
fn redirect_descriptors(target: &Path, fds: &[RawFd]) -> Result<(), SupervisorError> {
    let sink = OpenOptions::new()
        .read(true)
        .write(true)
        .open(target)
        .map_err(|e| SupervisorError::Daemonize(format!("{}: {e}", target.display())))?;

    for &fd in fds {
        dup2(sink.as_raw_fd(), fd).map_err(|e| SupervisorError::Daemonize(e.to_string()))?;
    }
    Ok(())
}

/// Install the global subscriber: `info` (or `debug`), `RUST_LOG` wins.
pub fn init_logging(debug: bool, log_file: Option<&Path>) -> Result<(), SupervisorError> {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| SupervisorError::LogFile {
                path: path.to_path_buf(),
                source,
            })?;

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    Ok(())
}

/// Resolve when SIGTERM or SIGINT arrives.
pub async fn wait_for_shutdown_signal() -> Result<(), SupervisorError> {
    let mut sigterm = signal(SignalKind::terminate()).map_err(SupervisorError::Signal)?;
    let mut sigint = signal(SignalKind::interrupt()).map_err(SupervisorError::Signal)?;

    tokio::select! {
        _ = sigterm.recv() => info!(signal = "SIGTERM", "shutdown_requested"),
        _ = sigint.recv() => info!(signal = "SIGINT", "shutdown_requested"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Identity, PidFile, SupervisorError, redirect_descriptors};
    use std::io::Write;
    use std::os::fd::AsRawFd;

    #[test]
    fn given_locked_pid_file_when_acquired_again_should_refuse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watcher.pid");

        let mut first = PidFile::acquire(&path).unwrap();
        first.record(4242).unwrap();
        let second = PidFile::acquire(&path);

        assert!(matches!(second, Err(SupervisorError::AlreadyRunning(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "4242\n");
    }

    #[test]
    fn given_released_pid_file_when_dropped_should_remove_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watcher.pid");

        let pid_file = PidFile::acquire(&path).unwrap();
        assert!(pid_file.path().is_absolute());
        drop(pid_file);

        assert!(!path.exists());
        assert!(PidFile::acquire(&path).is_ok());
    }

    #[test]
    fn given_unknown_user_when_resolved_should_fail() {
        let result = Identity::resolve(Some("no-such-user-portal-watcher"), None);
        assert!(matches!(result, Err(SupervisorError::UnknownUser(_))));
    }

    #[test]
    fn given_unknown_group_when_resolved_should_fail() {
        let result = Identity::resolve(None, Some("no-such-group-portal-watcher"));
        assert!(matches!(result, Err(SupervisorError::UnknownGroup(_))));
    }

    #[test]
    fn given_root_user_when_resolved_should_use_primary_group() {
        let identity = Identity::resolve(Some("root"), None).unwrap();
        assert_eq!(identity.uid, Some(nix::unistd::Uid::from_raw(0)));
        assert_eq!(identity.gid, Some(nix::unistd::Gid::from_raw(0)));
    }

    #[test]
    fn given_no_names_when_resolved_should_keep_identity() {
        assert_eq!(Identity::resolve(None, None).unwrap(), Identity::default());
    }

    #[test]
    fn given_open_descriptor_when_redirected_should_write_to_target() {
        let dir = tempfile::tempdir().unwrap();
        let sink_path = dir.path().join("sink");
        let terminal_path = dir.path().join("terminal");
        std::fs::write(&sink_path, "").unwrap();
        let mut terminal = std::fs::File::create(&terminal_path).unwrap();

        redirect_descriptors(&sink_path, &[terminal.as_raw_fd()]).unwrap();
        terminal.write_all(b"watcher_starting").unwrap();
        terminal.flush().unwrap();

        assert_eq!(std::fs::read_to_string(&sink_path).unwrap(), "watcher_starting");
        assert_eq!(std::fs::read_to_string(&terminal_path).unwrap(), "");
    }

    #[test]
    fn given_missing_target_when_redirected_should_fail() {
        let dir = tempfile::tempdir().unwrap();
        let result = redirect_descriptors(&dir.path().join("missing"), &[]);
        assert!(matches!(result, Err(SupervisorError::Daemonize(_))));
    }
}

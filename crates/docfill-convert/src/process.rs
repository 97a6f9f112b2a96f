//! Supervised execution of external converters
//!
//! Each run spawns one process, drains its standard error on a helper
//! thread, and polls for completion until a deadline. On unix the child leads
//! its own process group: converters such as `soffice` are wrappers that
//! fork the process doing the work, and the whole group is killed once the
//! run ends. The child is wrapped in a guard that does this on every exit
//! path, so an error or panic in the caller never leaves a converter running.

use std::ffi::OsString;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{ConversionError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long to wait for the stderr reader after the process exited
const STDERR_GRACE: Duration = Duration::from_secs(2);

/// Bytes of stderr kept for error messages
const STDERR_TAIL: usize = 4096;

/// An external program plus leading arguments
///
/// The leading arguments come before any arguments a backend adds, which
/// allows wrappers such as `flatpak run org.libreoffice.LibreOffice`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub path: PathBuf,
    pub args: Vec<String>,
}

impl Program {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Program name for logs and errors
    pub fn display_name(&self) -> String {
        self.path.display().to_string()
    }

    /// Whether the program exists, searching `PATH` for bare names
    pub fn is_available(&self) -> bool {
        resolve(&self.path).is_some()
    }
}

/// Locate an executable the way the shell would
pub fn resolve(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        return program.is_file().then(|| program.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

/// `file://` URL of a path, made absolute against the working directory
pub fn file_url(path: &Path) -> std::io::Result<String> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut url = String::from("file://");
    let raw = absolute.to_string_lossy().replace('\\', "/");
    if !raw.starts_with('/') {
        url.push('/');
    }
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' | b':' => {
                url.push(byte as char)
            }
            other => url.push_str(&format!("%{other:02X}")),
        }
    }
    Ok(url)
}

/// Result of a successful run
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stderr: String,
    pub elapsed: Duration,
}

/// Kills the child's process group and reaps the child
struct ChildGuard {
    child: Child,
    reaped: bool,
    group_killed: bool,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        Self {
            child,
            reaped: false,
            group_killed: false,
        }
    }

    fn try_wait(&mut self) -> std::io::Result<Option<ExitStatus>> {
        let status = self.child.try_wait()?;
        if status.is_some() {
            self.reaped = true;
        }
        Ok(status)
    }

    /// Kill everything the converter started, then reap it if still running
    fn kill(&mut self) {
        if !self.group_killed {
            self.group_killed = true;
            kill_group(&mut self.child);
        }
        if self.reaped {
            return;
        }
        if let Err(e) = self.child.wait() {
            warn!(pid = self.child.id(), error = %e, "failed to reap converter process");
        }
        self.reaped = true;
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn isolate_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn isolate_group(_command: &mut Command) {}

#[cfg(unix)]
fn kill_group(child: &mut Child) {
    let pgid = child.id() as libc::pid_t;
    // SAFETY: killpg takes no pointers and only signals the group that
    // `process_group(0)` created for this child.
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } != 0 {
        let e = std::io::Error::last_os_error();
        if e.raw_os_error() != Some(libc::ESRCH) {
            debug!(pgid, error = %e, "kill of converter group failed");
        }
    }
}

#[cfg(not(unix))]
fn kill_group(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!(pid = child.id(), error = %e, "kill failed");
    }
}

/// Run `program` with `args` appended, failing after `timeout`
///
/// A non-zero exit is reported as [`ConversionError::ProcessFailed`] with the
/// tail of standard error; a program that cannot be started as
/// [`ConversionError::Unavailable`].
pub fn run(program: &Program, args: &[OsString], timeout: Duration) -> Result<ProcessOutput> {
    let name = program.display_name();
    let started = Instant::now();

    let mut command = Command::new(&program.path);
    command
        .args(&program.args)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    isolate_group(&mut command);

    let child = command.spawn().map_err(|e| match e.kind() {
        ErrorKind::NotFound | ErrorKind::PermissionDenied => ConversionError::Unavailable {
            program: name.clone(),
            source: e,
        },
        _ => ConversionError::Io(e),
    })?;
    debug!(program = %name, pid = child.id(), "converter started");

    let mut guard = ChildGuard::new(child);
    let stderr = spawn_stderr_reader(&mut guard.child);

    let status = loop {
        if let Some(status) = guard.try_wait()? {
            // Helpers the converter left behind must not outlive the run
            guard.kill();
            break status;
        }
        if started.elapsed() >= timeout {
            guard.kill();
            warn!(program = %name, timeout_secs = timeout.as_secs(), "converter timed out");
            return Err(ConversionError::Timeout {
                program: name,
                timeout,
            });
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    let stderr = stderr
        .and_then(|rx| rx.recv_timeout(STDERR_GRACE).ok())
        .map(|bytes| tail(&bytes))
        .unwrap_or_default();
    let elapsed = started.elapsed();

    if !status.success() {
        warn!(
            program = %name,
            exit_code = status.code().unwrap_or(-1),
            elapsed_ms = elapsed.as_millis() as u64,
            "converter failed"
        );
        return Err(ConversionError::ProcessFailed {
            program: name,
            exit_code: status.code(),
            stderr,
        });
    }

    debug!(program = %name, elapsed_ms = elapsed.as_millis() as u64, "converter finished");
    Ok(ProcessOutput {
        status,
        stderr,
        elapsed,
    })
}

fn spawn_stderr_reader(child: &mut Child) -> Option<mpsc::Receiver<Vec<u8>>> {
    let mut pipe = child.stderr.take()?;
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(buf);
    });
    Some(rx)
}

fn tail(bytes: &[u8]) -> String {
    let start = bytes.len().saturating_sub(STDERR_TAIL);
    String::from_utf8_lossy(&bytes[start..]).trim().to_string()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> (Program, Vec<OsString>) {
        (
            Program::new("/bin/sh"),
            vec![OsString::from("-c"), OsString::from(script)],
        )
    }

    #[test]
    fn test_success() {
        let (program, args) = sh("echo working >&2; exit 0");
        let output = run(&program, &args, Duration::from_secs(10)).unwrap();
        assert!(output.status.success());
        assert_eq!(output.stderr, "working");
    }

    #[test]
    fn test_failure_carries_stderr() {
        let (program, args) = sh("echo 'Error: source file could not be loaded' >&2; exit 3");
        match run(&program, &args, Duration::from_secs(10)) {
            Err(ConversionError::ProcessFailed {
                exit_code, stderr, ..
            }) => {
                assert_eq!(exit_code, Some(3));
                assert!(stderr.contains("could not be loaded"));
            }
            other => panic!("expected ProcessFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_timeout_kills() {
        let (program, args) = sh("exec sleep 30");
        let started = Instant::now();
        let err = run(&program, &args, Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, ConversionError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_timeout_kills_background_helpers() {
        let dir = tempfile::TempDir::new().unwrap();
        let marker = dir.path().join("late.pdf");
        let (program, args) = sh(&format!(
            "( sleep 1; printf late > '{}' ) & wait",
            marker.display()
        ));

        let err = run(&program, &args, Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, ConversionError::Timeout { .. }));

        std::thread::sleep(Duration::from_millis(1500));
        assert!(!marker.exists(), "helper process outlived the run");
    }

    #[test]
    fn test_exit_kills_lingering_helpers() {
        let dir = tempfile::TempDir::new().unwrap();
        let marker = dir.path().join("late.pdf");
        let (program, args) = sh(&format!(
            "( sleep 1; printf late > '{}' ) 2>/dev/null & exit 0",
            marker.display()
        ));

        run(&program, &args, Duration::from_secs(10)).unwrap();

        std::thread::sleep(Duration::from_millis(1500));
        assert!(!marker.exists(), "helper process outlived the run");
    }

    #[test]
    fn test_missing_program() {
        let program = Program::new("/nonexistent/docfill-soffice");
        let err = run(&program, &[], Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ConversionError::Unavailable { .. }));
        assert!(!program.is_available());
    }

    #[test]
    fn test_resolve_searches_path() {
        assert!(resolve(Path::new("sh")).is_some());
        assert!(resolve(Path::new("docfill-no-such-program")).is_none());
    }

    #[test]
    fn test_file_url() {
        assert_eq!(
            file_url(Path::new("/tmp/a b/ñ.docx")).unwrap(),
            "file:///tmp/a%20b/%C3%B1.docx"
        );
        assert!(file_url(Path::new("rel.docx")).unwrap().starts_with("file:///"));
    }

    #[test]
    fn test_tail_keeps_end() {
        let long = "x".repeat(STDERR_TAIL) + "END";
        assert!(tail(long.as_bytes()).ends_with("END"));
        assert_eq!(tail(long.as_bytes()).len(), STDERR_TAIL);
    }
}

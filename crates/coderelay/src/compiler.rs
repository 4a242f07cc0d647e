//! Compiler bridge - owns the compiler subprocess and routes its output.
//!
//! Flow:
//! 1. Spawn the compiler with piped stdin/stdout/stderr
//! 2. Run an event loop decoding both output streams, routing each chunk to
//!    the submission capture that is open when it arrives
//! 3. `submit()` queues on the stdin writer, opens a capture, writes the code,
//!    waits out the window (or until the end marker), closes the capture
//! 4. On compiler exit: fail the open capture, mark the bridge defunct
//!
//! Submissions are strictly serialized: the stdin writer lock is held for the
//! whole submit cycle, and tokio's mutex is fair, so overlapping requests are
//! served in arrival order instead of sharing one output buffer.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::bridge::codec::{OutputCodec, SubmissionCodec};
use crate::bridge::protocol::{DEFAULT_WAIT_WINDOW, StreamSource, SubmissionId};
use crate::capture::{Capture, CompileResult};
use crate::health::Health;

/// How long the compiler gets to exit after SIGTERM before it is killed.
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// How long to keep reading stderr after stdout closes.
const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_millis(100);

/// How long a compiler that closed stdout gets to exit on its own.
const EXIT_REAP_TIMEOUT: Duration = Duration::from_secs(1);

/// Try to lock a capture mutex.
/// On poison: logs error, recovers to fail the capture, returns None.
fn try_lock_capture(cap: &Arc<StdMutex<Capture>>) -> Option<std::sync::MutexGuard<'_, Capture>> {
    match cap.lock() {
        Ok(guard) => Some(guard),
        Err(poisoned) => {
            tracing::error!("Capture mutex poisoned - failing submission");
            let mut guard = poisoned.into_inner();
            guard.set_failed("Internal error: mutex poisoned".to_string());
            None
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error("failed to spawn process: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("spawn failed: {0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("failed to start compiler: {0}")]
    Spawn(#[from] SpawnError),
    #[error("failed to write to compiler: {0}")]
    Write(#[source] std::io::Error),
    #[error("compiler is not running: {0}")]
    Exited(String),
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Extension point for different ways of launching the compiler.
pub trait CompilerSpawner: Send + Sync {
    fn spawn(&self, config: &BridgeConfig) -> Result<Child, SpawnError>;
}

/// Launches `config.program` directly with all three streams piped.
pub struct CommandSpawner;

impl CompilerSpawner for CommandSpawner {
    fn spawn(&self, config: &BridgeConfig) -> Result<Child, SpawnError> {
        let child = Command::new(&config.program)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        Ok(child)
    }
}

#[derive(Clone)]
pub struct BridgeConfig {
    /// Compiler executable; relative paths resolve against the working directory.
    pub program: PathBuf,
    pub args: Vec<String>,
    /// How long a submission collects output after its code is written.
    pub wait_window: Duration,
    /// Optional end-of-response marker. When it shows up in the output the
    /// submission completes early; `wait_window` becomes a timeout.
    pub end_marker: Option<String>,
    pub shutdown_grace: Duration,
    pub spawner: Arc<dyn CompilerSpawner>,
}

impl BridgeConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            wait_window: DEFAULT_WAIT_WINDOW,
            end_marker: None,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            spawner: Arc::new(CommandSpawner),
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

    pub fn with_wait_window(mut self, wait_window: Duration) -> Self {
        self.wait_window = wait_window;
        self
    }

    pub fn with_end_marker(mut self, marker: Option<String>) -> Self {
        self.end_marker = marker.filter(|m| !m.is_empty());
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn with_spawner(mut self, spawner: Arc<dyn CompilerSpawner>) -> Self {
        self.spawner = spawner;
        self
    }
}

/// Point-in-time view of the bridge for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct BridgeStatus {
    #[serde(skip)]
    pub state: Health,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    /// When the compiler was spawned (RFC 3339).
    pub started_at: String,
    /// Submissions in flight or waiting for the stdin writer.
    pub queued: usize,
    /// Submissions accepted since startup.
    pub submissions: u64,
}

impl BridgeStatus {
    pub fn is_busy(&self) -> bool {
        self.state == Health::Ready && self.queued > 0
    }
}

/// Submitting code to a compiler and reporting on it.
///
/// This abstraction lets the service and HTTP layers be tested without a
/// real compiler subprocess.
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Write `code` as one line and collect what the compiler prints back.
    async fn submit(&self, code: &str) -> Result<CompileResult, BridgeError>;

    fn status(&self) -> BridgeStatus;

    /// Terminate the compiler.
    async fn shutdown(&self) -> Result<(), BridgeError>;
}

type OpenRequest = (Arc<StdMutex<Capture>>, oneshot::Sender<()>);

/// Decrements the queue counter when a submission leaves, however it leaves.
struct QueueGuard<'a>(&'a AtomicUsize);

impl<'a> QueueGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for QueueGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Closes the capture when a submission leaves, so a cancelled submit does
/// not keep collecting output nobody will read.
struct CaptureGuard(Arc<StdMutex<Capture>>);

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        if let Some(mut cap) = try_lock_capture(&self.0)
            && cap.status().accepts_output()
        {
            tracing::debug!(submission_id = %cap.id(), "Submission abandoned, closing capture");
            cap.close();
        }
    }
}

/// Handle to a running compiler subprocess.
pub struct CompilerHandle {
    child: Arc<tokio::sync::Mutex<Child>>,
    pid: Option<u32>,
    started_at: String,
    stdin: tokio::sync::Mutex<FramedWrite<ChildStdin, SubmissionCodec>>,
    open_tx: mpsc::Sender<OpenRequest>,
    state: Arc<watch::Sender<Health>>,
    wait_window: Duration,
    end_marker: Option<String>,
    shutdown_grace: Duration,
    queued: AtomicUsize,
    submissions: AtomicU64,
}

impl CompilerHandle {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn health(&self) -> Health {
        *self.state.borrow()
    }

    /// Watch for health changes (e.g. the compiler exiting).
    pub fn subscribe_health(&self) -> watch::Receiver<Health> {
        self.state.subscribe()
    }
}

#[async_trait]
impl Compiler for CompilerHandle {
    async fn submit(&self, code: &str) -> Result<CompileResult, BridgeError> {
        let _queued = QueueGuard::enter(&self.queued);

        // Held for the whole cycle: one submission in flight at a time.
        let mut stdin = self.stdin.lock().await;

        if self.health() == Health::Defunct {
            return Err(BridgeError::Exited("compiler has exited".to_string()));
        }

        let id = SubmissionId::new();
        self.submissions.fetch_add(1, Ordering::Relaxed);
        let capture = Arc::new(StdMutex::new(Capture::new(id, self.end_marker.clone())));
        let _closer = CaptureGuard(Arc::clone(&capture));
        let completion = match try_lock_capture(&capture) {
            Some(cap) => cap.completion(),
            None => return Err(BridgeError::Protocol("capture mutex poisoned".to_string())),
        };

        // The capture must be routable before the compiler can answer.
        let (opened_tx, opened_rx) = oneshot::channel();
        self.open_tx
            .send((Arc::clone(&capture), opened_tx))
            .await
            .map_err(|_| BridgeError::Exited("output loop stopped".to_string()))?;
        opened_rx
            .await
            .map_err(|_| BridgeError::Exited("output loop stopped".to_string()))?;

        tracing::info!(
            target: "coderelay::submission",
            submission_id = %id,
            code_len = code.len(),
            "Submitting code"
        );

        if let Err(e) = stdin.send(code).await {
            tracing::error!(submission_id = %id, error = %e, "Failed to write submission");
            // A broken stdin means the compiler is gone for good.
            self.state.send_replace(Health::Defunct);
            return Err(BridgeError::Write(e));
        }

        // No acknowledgement exists: wait out the window unless the end
        // marker (or the compiler dying) settles the capture first.
        let _ = tokio::time::timeout(self.wait_window, completion.notified()).await;

        let (result, error) = {
            let Some(mut cap) = try_lock_capture(&capture) else {
                return Err(BridgeError::Protocol("capture mutex poisoned".to_string()));
            };
            let error = cap.error().map(str::to_string);
            (cap.close(), error)
        };

        if let Some(error) = error
            && result.output.is_empty()
        {
            tracing::warn!(submission_id = %id, %error, "Compiler exited during submission");
            return Err(BridgeError::Exited(error));
        }

        tracing::info!(
            target: "coderelay::submission",
            submission_id = %id,
            elapsed_ms = result.elapsed.as_millis() as u64,
            output_len = result.output.len(),
            completed_by_marker = result.completed_by_marker,
            "Submission finished"
        );
        Ok(result)
    }

    fn status(&self) -> BridgeStatus {
        BridgeStatus {
            state: self.health(),
            pid: self.pid,
            started_at: self.started_at.clone(),
            queued: self.queued.load(Ordering::SeqCst),
            submissions: self.submissions.load(Ordering::Relaxed),
        }
    }

    async fn shutdown(&self) -> Result<(), BridgeError> {
        let mut child = self.child.lock().await;

        if let Ok(Some(status)) = child.try_wait() {
            tracing::debug!(%status, "Compiler already exited");
            self.state.send_replace(Health::Defunct);
            return Ok(());
        }

        request_termination(&mut child);

        match tokio::time::timeout(self.shutdown_grace, child.wait()).await {
            Ok(Ok(status)) => tracing::info!(%status, "Compiler exited"),
            Ok(Err(e)) => {
                return Err(BridgeError::Protocol(format!(
                    "failed to wait for compiler: {}",
                    e
                )));
            }
            Err(_) => {
                tracing::warn!(
                    grace_secs = self.shutdown_grace.as_secs_f64(),
                    "Compiler did not exit in time, killing"
                );
                child
                    .kill()
                    .await
                    .map_err(|e| BridgeError::Protocol(format!("failed to kill compiler: {}", e)))?;
            }
        }

        self.state.send_replace(Health::Defunct);
        Ok(())
    }
}

#[cfg(unix)]
fn request_termination(child: &mut Child) {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return;
    };
    if let Err(e) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        tracing::warn!(pid, error = %e, "Failed to send SIGTERM to compiler");
    }
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        tracing::warn!(error = %e, "Failed to kill compiler");
    }
}

/// Spawn the compiler and start routing its output.
///
/// Failing here is fatal for the service: there is nothing to serve.
pub async fn spawn_compiler(config: BridgeConfig) -> Result<CompilerHandle, BridgeError> {
    tracing::info!(
        program = %config.program.display(),
        args = ?config.args,
        wait_ms = config.wait_window.as_millis() as u64,
        end_marker = ?config.end_marker,
        "Spawning compiler subprocess"
    );

    let mut child = config.spawner.spawn(&config)?;
    let pid = child.id();

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| SpawnError::Other("stdin not captured".to_string()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| SpawnError::Other("stdout not captured".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| SpawnError::Other("stderr not captured".to_string()))?;

    let writer = FramedWrite::new(stdin, SubmissionCodec::new());
    let stdout_reader = FramedRead::new(stdout, OutputCodec::new());
    let stderr_reader = FramedRead::new(stderr, OutputCodec::new());

    let (open_tx, open_rx) = mpsc::channel(1);
    let (state, _) = watch::channel(Health::Ready);
    let state = Arc::new(state);
    let child = Arc::new(tokio::sync::Mutex::new(child));

    tokio::spawn(run_event_loop(
        stdout_reader,
        stderr_reader,
        open_rx,
        Arc::clone(&state),
        Arc::clone(&child),
    ));

    tracing::info!(?pid, "Compiler ready");

    Ok(CompilerHandle {
        child,
        pid,
        started_at: chrono::Utc::now().to_rfc3339(),
        stdin: tokio::sync::Mutex::new(writer),
        open_tx,
        state,
        wait_window: config.wait_window,
        end_marker: config.end_marker,
        shutdown_grace: config.shutdown_grace,
        queued: AtomicUsize::new(0),
        submissions: AtomicU64::new(0),
    })
}

/// Append a chunk to the open capture, or log and drop it.
fn route_output(active: &mut Option<Arc<StdMutex<Capture>>>, source: StreamSource, text: &str) {
    let accepted = match active.as_ref() {
        Some(cap) => match try_lock_capture(cap) {
            Some(mut cap) => {
                let taken = cap.append(text);
                if taken {
                    tracing::trace!(
                        submission_id = %cap.id(),
                        ?source,
                        bytes = text.len(),
                        "Captured output"
                    );
                }
                taken
            }
            None => false,
        },
        None => false,
    };

    if !accepted {
        // Window closed (or never opened): nobody gets this output.
        *active = None;
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            tracing::warn!(
                target: "coderelay::compiler",
                submission_id = "NO_ACTIVE_SUBMISSION",
                source = ?source,
                "{}",
                trimmed
            );
        }
    }
}

enum LoopExit {
    /// Compiler closed stdout (exited or crashed).
    StdoutClosed(String),
    /// Every handle is gone; nobody can submit anymore.
    HandleDropped,
}

async fn run_event_loop(
    mut stdout: FramedRead<ChildStdout, OutputCodec>,
    mut stderr: FramedRead<ChildStderr, OutputCodec>,
    mut open_rx: mpsc::Receiver<OpenRequest>,
    state: Arc<watch::Sender<Health>>,
    child: Arc<tokio::sync::Mutex<Child>>,
) {
    let mut active: Option<Arc<StdMutex<Capture>>> = None;
    let mut stderr_open = true;

    let exit = loop {
        tokio::select! {
            biased;

            request = open_rx.recv() => {
                match request {
                    Some((capture, opened)) => {
                        if let Some(id) = try_lock_capture(&capture).map(|c| c.id()) {
                            tracing::debug!(submission_id = %id, "Capture window opened");
                        }
                        active = Some(capture);
                        if opened.send(()).is_err() {
                            tracing::warn!("Submitter went away before capture was opened");
                        }
                    }
                    None => break LoopExit::HandleDropped,
                }
            }

            chunk = stdout.next() => {
                match chunk {
                    Some(Ok(text)) => route_output(&mut active, StreamSource::Stdout, &text),
                    Some(Err(e)) => break LoopExit::StdoutClosed(format!("stdout read error: {}", e)),
                    None => break LoopExit::StdoutClosed("compiler closed stdout".to_string()),
                }
            }

            chunk = stderr.next(), if stderr_open => {
                match chunk {
                    Some(Ok(text)) => route_output(&mut active, StreamSource::Stderr, &text),
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "stderr read error, no longer capturing stderr");
                        stderr_open = false;
                    }
                    None => {
                        tracing::debug!("Compiler closed stderr");
                        stderr_open = false;
                    }
                }
            }
        }
    };

    match exit {
        LoopExit::HandleDropped => {
            tracing::debug!("Compiler handle dropped, stopping compiler");
            if let Err(e) = child.lock().await.start_kill() {
                tracing::debug!(error = %e, "Compiler already gone");
            }
        }
        LoopExit::StdoutClosed(reason) => {
            // Last words (e.g. a crash message) may still be in flight on stderr.
            if stderr_open {
                let _ = tokio::time::timeout(STDERR_DRAIN_TIMEOUT, async {
                    while let Some(Ok(text)) = stderr.next().await {
                        route_output(&mut active, StreamSource::Stderr, &text);
                    }
                })
                .await;
            }

            tracing::error!(%reason, "Compiler output closed, bridge is defunct");
            state.send_replace(Health::Defunct);

            if let Some(capture) = active.take()
                && let Some(mut cap) = try_lock_capture(&capture)
            {
                tracing::warn!(submission_id = %cap.id(), "Failing submission due to compiler exit");
                cap.set_failed(reason);
            }

            reap(&child).await;
        }
    }

    tracing::info!("Compiler event loop exiting");
}

/// Collect the exit status of a compiler that stopped talking to us.
async fn reap(child: &tokio::sync::Mutex<Child>) {
    let mut child = child.lock().await;
    match tokio::time::timeout(EXIT_REAP_TIMEOUT, child.wait()).await {
        Ok(Ok(status)) => tracing::info!(%status, "Compiler exited"),
        Ok(Err(e)) => tracing::warn!(error = %e, "Failed to wait for compiler"),
        Err(_) => {
            tracing::warn!("Compiler closed stdout but kept running, killing");
            if let Err(e) = child.kill().await {
                tracing::warn!(error = %e, "Failed to kill compiler");
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::bridge::protocol::NO_OUTPUT_SENTINEL;

    const FAST_WINDOW: Duration = Duration::from_millis(150);

    fn sh(script: &str) -> BridgeConfig {
        BridgeConfig::new("sh")
            .with_args(["-c", script])
            .with_wait_window(FAST_WINDOW)
    }

    async fn echo_compiler() -> CompilerHandle {
        spawn_compiler(BridgeConfig::new("cat").with_wait_window(FAST_WINDOW))
            .await
            .expect("cat should spawn")
    }

    async fn wait_for_defunct(handle: &CompilerHandle) {
        let mut rx = handle.subscribe_health();
        tokio::time::timeout(Duration::from_secs(5), async {
            while *rx.borrow_and_update() != Health::Defunct {
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
        .expect("bridge should become defunct");
    }

    #[tokio::test]
    async fn echo_round_trip() {
        let compiler = echo_compiler().await;

        let result = compiler.submit("hello world").await.unwrap();
        assert_eq!(result.output, "hello world\n");
        assert_eq!(result.body(), "hello world\n");
        assert!(!result.completed_by_marker);
    }

    #[tokio::test]
    async fn trailing_newline_sent_once() {
        let compiler = echo_compiler().await;

        let result = compiler.submit("print(1+1)\n").await.unwrap();
        assert_eq!(result.output, "print(1+1)\n");
    }

    #[tokio::test]
    async fn silent_compiler_yields_sentinel() {
        let compiler = spawn_compiler(sh("cat > /dev/null")).await.unwrap();

        let result = compiler.submit("anything").await.unwrap();
        assert_eq!(result.output, "");
        assert_eq!(result.body(), NO_OUTPUT_SENTINEL);
    }

    #[tokio::test]
    async fn full_window_is_waited_without_marker() {
        let compiler = echo_compiler().await;

        let result = compiler.submit("x").await.unwrap();
        assert!(result.elapsed >= FAST_WINDOW);
    }

    #[tokio::test]
    async fn stderr_is_captured() {
        let compiler = spawn_compiler(sh(r#"while read l; do echo "err: $l" >&2; done"#))
            .await
            .unwrap();

        let result = compiler.submit("oops").await.unwrap();
        assert_eq!(result.output, "err: oops\n");
    }

    #[tokio::test]
    async fn evaluating_compiler_answers_within_window() {
        let compiler = spawn_compiler(sh(r#"while read a b; do echo $((a + b)); done"#))
            .await
            .unwrap();

        let result = compiler.submit("1 1").await.unwrap();
        assert!(result.body().contains('2'), "got {:?}", result.body());
    }

    #[tokio::test]
    async fn sequential_submissions_do_not_mix() {
        let compiler = echo_compiler().await;

        let a = compiler.submit("A").await.unwrap();
        let b = compiler.submit("B").await.unwrap();
        assert_eq!(a.output, "A\n");
        assert_eq!(b.output, "B\n");
        assert_eq!(compiler.status().submissions, 2);
    }

    #[tokio::test]
    async fn overlapping_submissions_are_serialized() {
        let compiler = Arc::new(echo_compiler().await);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let compiler = Arc::clone(&compiler);
                tokio::spawn(async move { (i, compiler.submit(&format!("req-{i}")).await) })
            })
            .collect();

        for handle in handles {
            let (i, result) = handle.await.unwrap();
            assert_eq!(result.unwrap().output, format!("req-{i}\n"));
        }
        assert_eq!(compiler.status().queued, 0);
    }

    #[tokio::test]
    async fn late_output_is_not_attributed_to_next_submission() {
        // Answers arrive well after the window has closed.
        let compiler = spawn_compiler(
            sh(r#"while read l; do sleep 0.3; echo "late $l"; done"#)
                .with_wait_window(Duration::from_millis(50)),
        )
        .await
        .unwrap();

        let first = compiler.submit("one").await.unwrap();
        assert_eq!(first.body(), NO_OUTPUT_SENTINEL);

        // "late one" shows up while nothing is open and must be dropped.
        tokio::time::sleep(Duration::from_millis(400)).await;
        let second = compiler.submit("two").await.unwrap();
        assert!(!second.output.contains("late one"));
    }

    #[tokio::test]
    async fn end_marker_completes_early() {
        let config = sh(r#"while read l; do echo "$l"; echo "<<END>>"; done"#)
            .with_wait_window(Duration::from_secs(5))
            .with_end_marker(Some("<<END>>".to_string()));
        let compiler = spawn_compiler(config).await.unwrap();

        let result = compiler.submit("fast").await.unwrap();
        assert_eq!(result.output, "fast\n");
        assert!(result.completed_by_marker);
        assert!(result.elapsed < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn spawn_failure_is_reported() {
        let result = spawn_compiler(BridgeConfig::new("./definitely-not-a-compiler")).await;
        assert!(matches!(result, Err(BridgeError::Spawn(_))));
    }

    #[tokio::test]
    async fn exited_compiler_fails_submissions() {
        let compiler = spawn_compiler(sh("exit 0")).await.unwrap();
        wait_for_defunct(&compiler).await;

        let result = compiler.submit("anyone?").await;
        assert!(
            matches!(result, Err(BridgeError::Exited(_))),
            "got {:?}",
            result
        );
        assert_eq!(compiler.status().state, Health::Defunct);
    }

    #[tokio::test]
    async fn output_before_exit_is_still_returned() {
        let compiler = spawn_compiler(sh(r#"read l; echo "bye $l"; exit 1"#))
            .await
            .unwrap();

        let result = compiler.submit("now").await.unwrap();
        assert_eq!(result.output, "bye now\n");

        wait_for_defunct(&compiler).await;
        assert!(compiler.submit("again").await.is_err());
    }

    #[tokio::test]
    async fn shutdown_terminates_compiler() {
        let compiler = echo_compiler().await;
        assert_eq!(compiler.health(), Health::Ready);
        assert!(compiler.pid().is_some());

        compiler.shutdown().await.unwrap();
        assert_eq!(compiler.health(), Health::Defunct);
        assert!(compiler.submit("x").await.is_err());
    }

    #[tokio::test]
    async fn closed_stdin_fails_with_write_error() {
        let compiler = spawn_compiler(sh("exec 0<&-; sleep 3")).await.unwrap();
        // Let the shell close its end of the pipe first.
        tokio::time::sleep(Duration::from_millis(200)).await;

        let result = compiler.submit("x").await;
        assert!(
            matches!(result, Err(BridgeError::Write(_))),
            "got {:?}",
            result
        );
        assert_eq!(compiler.health(), Health::Defunct);

        let again = compiler.submit("y").await;
        assert!(
            matches!(again, Err(BridgeError::Exited(_))),
            "got {:?}",
            again
        );
    }

    #[tokio::test]
    async fn cancelled_submission_releases_the_bridge() {
        let compiler = spawn_compiler(
            sh(r#"while read l; do sleep 0.3; echo "late $l"; done"#)
                .with_wait_window(Duration::from_millis(600)),
        )
        .await
        .unwrap();

        let cancelled =
            tokio::time::timeout(Duration::from_millis(50), compiler.submit("one")).await;
        assert!(cancelled.is_err());
        assert_eq!(compiler.status().queued, 0);

        // "late one" arrives with nothing open.
        tokio::time::sleep(Duration::from_millis(400)).await;
        let next = compiler.submit("two").await.unwrap();
        assert_eq!(next.output, "late two\n");
    }

    #[test]
    fn dropping_capture_guard_closes_open_capture() {
        let capture = Arc::new(StdMutex::new(Capture::new(SubmissionId::new(), None)));
        drop(CaptureGuard(Arc::clone(&capture)));

        let mut cap = capture.lock().unwrap();
        assert_eq!(cap.status(), crate::capture::CaptureStatus::Closed);
        assert!(!cap.append("late output"));
    }

    #[test]
    fn capture_guard_leaves_completed_capture_alone() {
        let capture = Arc::new(StdMutex::new(Capture::new(
            SubmissionId::new(),
            Some("$".to_string()),
        )));
        capture.lock().unwrap().append("done$");
        drop(CaptureGuard(Arc::clone(&capture)));

        assert_eq!(
            capture.lock().unwrap().status(),
            crate::capture::CaptureStatus::Completed
        );
    }

    #[test]
    fn config_builder() {
        let config = BridgeConfig::new("./compiler")
            .with_args(["--quiet"])
            .with_wait_window(Duration::from_millis(250))
            .with_end_marker(Some(String::new()));

        assert_eq!(config.program, PathBuf::from("./compiler"));
        assert_eq!(config.args, vec!["--quiet".to_string()]);
        assert_eq!(config.wait_window, Duration::from_millis(250));
        assert!(config.end_marker.is_none());
        assert_eq!(config.shutdown_grace, DEFAULT_SHUTDOWN_GRACE);
    }
}

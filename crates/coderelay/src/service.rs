//! CompileService: transport-agnostic glue between requests and the compiler.
//!
//! This service owns:
//! - The compiler bridge (behind the `Compiler` trait)
//! - Health reporting (state, version)
//! - The landing page
//!
//! Transports (HTTP today) delegate to this service for submissions.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::capture::CompileResult;
use crate::compiler::{BridgeError, BridgeStatus, Compiler};
use crate::health::Health;
use crate::version::VersionInfo;

/// Built-in landing page served on `GET /`.
pub const DEFAULT_LANDING_PAGE: &str = include_str!("../static/index.html");

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Compiler not started")]
    NotReady,
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Snapshot of service health for transports to query.
#[derive(Debug, Clone)]
pub struct HealthSnapshot {
    pub state: Health,
    pub compiler: Option<BridgeStatus>,
    pub version: VersionInfo,
}

impl HealthSnapshot {
    pub fn is_ready(&self) -> bool {
        self.state == Health::Ready
    }

    /// BUSY state: ready but a submission is in flight.
    pub fn is_busy(&self) -> bool {
        self.compiler.as_ref().is_some_and(|c| c.is_busy())
    }
}

/// Transport-agnostic compile service.
///
/// Created with `new_no_compiler()`, then configured with `set_compiler()`
/// once the compiler subprocess is running.
pub struct CompileService {
    compiler: RwLock<Option<Arc<dyn Compiler>>>,
    version: VersionInfo,
    landing_page: String,
}

impl CompileService {
    /// Health reports STARTING until `set_compiler()` is called.
    pub fn new_no_compiler() -> Self {
        Self {
            compiler: RwLock::new(None),
            version: VersionInfo::new(),
            landing_page: DEFAULT_LANDING_PAGE.to_string(),
        }
    }

    pub fn with_version(mut self, version: VersionInfo) -> Self {
        self.version = version;
        self
    }

    pub fn with_landing_page(mut self, html: String) -> Self {
        self.landing_page = html;
        self
    }

    pub async fn set_compiler(&self, compiler: Arc<dyn Compiler>) {
        *self.compiler.write().await = Some(compiler);
    }

    pub async fn has_compiler(&self) -> bool {
        self.compiler.read().await.is_some()
    }

    async fn compiler(&self) -> Option<Arc<dyn Compiler>> {
        self.compiler.read().await.clone()
    }

    pub fn landing_page(&self) -> &str {
        &self.landing_page
    }

    pub async fn health(&self) -> HealthSnapshot {
        let compiler = self.compiler().await.map(|c| c.status());
        let state = compiler.as_ref().map(|c| c.state).unwrap_or_default();

        HealthSnapshot {
            state,
            compiler,
            version: self.version.clone(),
        }
    }

    /// Hand `code` to the compiler and wait for what it prints back.
    ///
    /// Calls queue behind each other; see [`Compiler::submit`].
    pub async fn submit(&self, code: &str) -> Result<CompileResult, SubmitError> {
        let compiler = self.compiler().await.ok_or(SubmitError::NotReady)?;
        Ok(compiler.submit(code).await?)
    }

    /// Stop the compiler subprocess.
    ///
    /// If no compiler is configured, this is a no-op.
    pub async fn shutdown(&self) {
        if let Some(compiler) = self.compiler().await
            && let Err(e) = compiler.shutdown().await
        {
            tracing::warn!(error = %e, "Error during compiler shutdown");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::bridge::protocol::SubmissionId;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    pub(crate) enum MockReply {
        Echo,
        Fixed(String),
        Fail(String),
    }

    /// Mock compiler that answers instantly without a subprocess.
    pub(crate) struct MockCompiler {
        pub(crate) state: StdMutex<Health>,
        pub(crate) reply: MockReply,
        pub(crate) submitted: StdMutex<Vec<String>>,
        /// Reported as submissions waiting on the compiler.
        pub(crate) queued: usize,
    }

    impl MockCompiler {
        pub(crate) fn new(reply: MockReply) -> Self {
            Self {
                state: StdMutex::new(Health::Ready),
                reply,
                submitted: StdMutex::new(Vec::new()),
                queued: 0,
            }
        }

        pub(crate) fn echo() -> Self {
            Self::new(MockReply::Echo)
        }
    }

    #[async_trait::async_trait]
    impl Compiler for MockCompiler {
        async fn submit(&self, code: &str) -> Result<CompileResult, BridgeError> {
            self.submitted.lock().unwrap().push(code.to_string());
            let output = match &self.reply {
                MockReply::Echo => format!("{}\n", code),
                MockReply::Fixed(reply) => reply.clone(),
                MockReply::Fail(error) => return Err(BridgeError::Exited(error.clone())),
            };
            Ok(CompileResult {
                id: SubmissionId::new(),
                output,
                elapsed: Duration::from_millis(1),
                completed_by_marker: false,
            })
        }

        fn status(&self) -> BridgeStatus {
            BridgeStatus {
                state: *self.state.lock().unwrap(),
                pid: Some(4242),
                started_at: "2026-01-01T00:00:00+00:00".to_string(),
                queued: self.queued,
                submissions: self.submitted.lock().unwrap().len() as u64,
            }
        }

        async fn shutdown(&self) -> Result<(), BridgeError> {
            *self.state.lock().unwrap() = Health::Defunct;
            Ok(())
        }
    }

    #[tokio::test]
    async fn service_starts_without_compiler() {
        let svc = CompileService::new_no_compiler();
        let health = svc.health().await;

        assert_eq!(health.state, Health::Starting);
        assert!(health.compiler.is_none());
        assert!(!svc.has_compiler().await);
    }

    #[tokio::test]
    async fn submit_fails_when_not_ready() {
        let svc = CompileService::new_no_compiler();

        let result = svc.submit("add(1, 2)").await;
        assert!(matches!(result, Err(SubmitError::NotReady)));
    }

    #[tokio::test]
    async fn submit_delegates_to_compiler() {
        let svc = CompileService::new_no_compiler();
        let compiler = Arc::new(MockCompiler::echo());
        svc.set_compiler(Arc::clone(&compiler) as Arc<dyn Compiler>).await;

        let result = svc.submit("add(1, 2)").await.unwrap();
        assert_eq!(result.body(), "add(1, 2)\n");
        assert_eq!(*compiler.submitted.lock().unwrap(), vec!["add(1, 2)"]);
    }

    #[tokio::test]
    async fn bridge_errors_pass_through() {
        let svc = CompileService::new_no_compiler();
        svc.set_compiler(Arc::new(MockCompiler::new(MockReply::Fail(
            "compiler closed stdout".to_string(),
        ))))
        .await;

        let result = svc.submit("x").await;
        assert!(matches!(
            result,
            Err(SubmitError::Bridge(BridgeError::Exited(_)))
        ));
    }

    #[tokio::test]
    async fn health_follows_compiler_state() {
        let svc = CompileService::new_no_compiler();
        svc.set_compiler(Arc::new(MockCompiler::echo())).await;

        let health = svc.health().await;
        assert!(health.is_ready());
        assert!(!health.is_busy());
        assert_eq!(health.compiler.unwrap().pid, Some(4242));

        svc.shutdown().await;
        assert_eq!(svc.health().await.state, Health::Defunct);
    }

    #[tokio::test]
    async fn queued_submissions_report_busy() {
        let svc = CompileService::new_no_compiler();
        svc.set_compiler(Arc::new(MockCompiler {
            queued: 1,
            ..MockCompiler::echo()
        }))
        .await;

        let health = svc.health().await;
        assert!(health.is_ready());
        assert!(health.is_busy());
    }

    #[tokio::test]
    async fn shutdown_without_compiler_is_noop() {
        let svc = CompileService::new_no_compiler();
        svc.shutdown().await;
        assert_eq!(svc.health().await.state, Health::Starting);
    }

    #[test]
    fn landing_page_defaults_to_embedded_html() {
        let svc = CompileService::new_no_compiler();
        assert!(svc.landing_page().contains("<html"));

        let svc = svc.with_landing_page("<p>custom</p>".to_string());
        assert_eq!(svc.landing_page(), "<p>custom</p>");
    }
}

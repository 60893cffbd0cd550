use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use survey_spec::{
    Advance, Completion, ExportOptions, GeoFix, InputError, OptionValue, Session,
    SubmissionMeta, SurveySpec, Toggle, build_submission,
};

use crate::config::DEFAULT_CONTEXT_TIMEOUT_MS;
use crate::context::{ContextProvider, UnavailableContext, capture_context};
use crate::device::{DeviceIdentity, StaticDevice};
use crate::sink::ExportSink;

/// Drives one session and hands the finished record to the sink.
///
/// The session is only reachable read-only; answers and navigation go through
/// the runner so a completed session is always submitted.
///
/// Context capture and submission run as background tasks, so `start` and
/// `advance` must be called from within a Tokio runtime. Neither task can fail
/// the session: a missing position exports as empty cells and a rejected
/// submission is only logged.
pub struct SurveyRunner {
    session: Session,
    sink: Arc<dyn ExportSink>,
    context: Arc<dyn ContextProvider>,
    device: Arc<dyn DeviceIdentity>,
    context_timeout: Duration,
    export: ExportOptions,
    sheet_name: Option<String>,
    fix: watch::Receiver<GeoFix>,
    capture: Option<JoinHandle<()>>,
    pending: Option<JoinHandle<()>>,
}

impl SurveyRunner {
    pub fn new(spec: Arc<SurveySpec>, sink: Arc<dyn ExportSink>) -> Self {
        let (_, fix) = watch::channel(GeoFix::default());
        Self {
            session: Session::new(spec),
            sink,
            context: Arc::new(UnavailableContext),
            device: Arc::new(StaticDevice::default()),
            context_timeout: Duration::from_millis(DEFAULT_CONTEXT_TIMEOUT_MS),
            export: ExportOptions::default(),
            sheet_name: None,
            fix,
            capture: None,
            pending: None,
        }
    }

    pub fn with_context(mut self, context: Arc<dyn ContextProvider>) -> Self {
        self.context = context;
        self
    }

    pub fn with_device(mut self, device: Arc<dyn DeviceIdentity>) -> Self {
        self.device = device;
        self
    }

    pub fn with_context_timeout(mut self, timeout: Duration) -> Self {
        self.context_timeout = timeout;
        self
    }

    pub fn with_export_options(mut self, options: ExportOptions) -> Self {
        self.export = options;
        self
    }

    /// Replaces the catalog's sheet name on every submission.
    pub fn with_sheet_name(mut self, sheet_name: impl Into<String>) -> Self {
        self.sheet_name = Some(sheet_name.into());
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn choose(&mut self, question_id: &str, value: OptionValue) -> Result<(), InputError> {
        self.session.choose(question_id, value)
    }

    pub fn toggle(&mut self, question_id: &str, value: OptionValue) -> Result<Toggle, InputError> {
        self.session.toggle(question_id, value)
    }

    pub fn enter_text(&mut self, question_id: &str, raw: &str) -> Result<(), InputError> {
        self.session.enter_text(question_id, raw)
    }

    pub fn set_other_text(
        &mut self,
        question_id: &str,
        value: &OptionValue,
        text: &str,
    ) -> Result<(), InputError> {
        self.session.set_other_text(question_id, value, text)
    }

    pub fn choose_matrix(
        &mut self,
        question_id: &str,
        row: &str,
        column: &str,
    ) -> Result<(), InputError> {
        self.session.choose_matrix(question_id, row, column)
    }

    /// The position captured so far; empty until the capture task reports.
    pub fn current_fix(&self) -> GeoFix {
        *self.fix.borrow()
    }

    /// Leaves the intro and starts capturing the position in the background.
    pub fn start(&mut self) -> bool {
        if !self.session.start(Utc::now()) {
            return false;
        }

        let (tx, rx) = watch::channel(GeoFix::default());
        self.fix = rx;
        let provider = Arc::clone(&self.context);
        let timeout = self.context_timeout;
        self.capture = Some(tokio::spawn(async move {
            let fix = capture_context(provider.as_ref(), timeout).await;
            if tx.send(fix).is_err() {
                tracing::debug!("runner dropped before context capture finished");
            }
        }));
        true
    }

    /// Waits for the context capture started by [`SurveyRunner::start`].
    pub async fn await_context(&mut self) -> GeoFix {
        if let Some(capture) = self.capture.take()
            && let Err(err) = capture.await
        {
            tracing::debug!(error = %err, "context capture task ended abnormally");
        }
        self.current_fix()
    }

    /// Advances the session. On completion the record is submitted in the
    /// background and `Finished` is returned regardless of the sink's outcome.
    pub fn advance(&mut self) -> Advance {
        let outcome = self.session.advance(Utc::now());
        if let Advance::Finished(completion) = &outcome {
            self.submit(completion);
        }
        outcome
    }

    pub fn retreat(&mut self) -> bool {
        self.session.retreat()
    }

    fn submit(&mut self, completion: &Completion) {
        let meta = SubmissionMeta {
            started_at: completion.started_at,
            finished_at: completion.finished_at,
            device_id: self.device.device_id(),
            geo: self.current_fix(),
        };
        let mut submission = build_submission(
            self.session.spec(),
            self.session.answers(),
            &meta,
            self.export,
        );
        if let Some(sheet_name) = &self.sheet_name {
            submission.sheet_name = sheet_name.clone();
        }

        let sink = Arc::clone(&self.sink);
        let survey = self.session.spec().id.clone();
        self.pending = Some(tokio::spawn(async move {
            match sink.submit(&submission).await {
                Ok(()) => tracing::info!(
                    survey = %survey,
                    sheet = %submission.sheet_name,
                    columns = submission.data.len(),
                    "submission delivered"
                ),
                Err(err) => tracing::warn!(survey = %survey, error = %err, "submission failed"),
            }
        }));
    }

    /// Waits for the in-flight submission, if any.
    pub async fn flush(&mut self) {
        if let Some(pending) = self.pending.take()
            && let Err(err) = pending.await
        {
            tracing::warn!(error = %err, "submission task ended abnormally");
        }
    }
}

impl Drop for SurveyRunner {
    fn drop(&mut self) {
        if let Some(capture) = self.capture.take() {
            capture.abort();
        }
    }
}

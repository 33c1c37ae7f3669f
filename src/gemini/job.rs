use crate::error::{LuminaError, Result};
use crate::models::{Artifact, ConditioningMode, NarrationResult, ProgressEvent};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

const EVENT_BUFFER: usize = 100;

type Callback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

#[derive(Clone)]
enum Sink {
    Callback(Callback),
    Channel(mpsc::Sender<ProgressEvent>),
}

/// Where progress events go. Reporting never blocks and never fails the job;
/// events that cannot be delivered are dropped.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    sink: Option<Sink>,
}

impl ProgressReporter {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        Self {
            sink: Some(Sink::Callback(Arc::new(f))),
        }
    }

    pub fn channel() -> (Self, ReceiverStream<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        (
            Self {
                sink: Some(Sink::Channel(tx)),
            },
            ReceiverStream::new(rx),
        )
    }

    pub fn emit(&self, event: ProgressEvent) {
        match &self.sink {
            None => {}
            Some(Sink::Callback(f)) => f(&event),
            Some(Sink::Channel(tx)) => {
                if let Err(e) = tx.try_send(event) {
                    log::debug!("Dropping progress event: {}", e);
                }
            }
        }
    }
}

/// Cooperative cancellation for a single job.
#[derive(Clone, Debug)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives inside `self`, so the channel cannot close here.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    pub fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(LuminaError::Cancelled("cancelled by caller".into()));
        }
        Ok(())
    }
}

/// Log prefix tying a line to its job: `[job <id>] `, or nothing when the
/// component runs outside a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobTag(Option<Uuid>);

impl JobTag {
    pub fn new(id: Uuid) -> Self {
        Self(Some(id))
    }
}

impl fmt::Display for JobTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(id) => write!(f, "[job {}] ", id),
            None => Ok(()),
        }
    }
}

pub(crate) fn checkpoint(cancel: Option<&CancelToken>) -> Result<()> {
    cancel.map_or(Ok(()), CancelToken::checkpoint)
}

#[derive(Debug, Clone)]
pub struct VideoOutput {
    pub job_id: Uuid,
    pub mode: ConditioningMode,
    pub model: String,
    pub artifact: Artifact,
    pub narration: Option<NarrationResult>,
}

/// A job running on the tokio runtime.
pub struct VideoJob {
    pub id: Uuid,
    pub events: ReceiverStream<ProgressEvent>,
    pub result: JoinHandle<Result<VideoOutput>>,
    cancel: CancelToken,
}

impl VideoJob {
    pub(crate) fn new(
        id: Uuid,
        events: ReceiverStream<ProgressEvent>,
        result: JoinHandle<Result<VideoOutput>>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            id,
            events,
            result,
            cancel,
        }
    }

    pub fn cancel(&self) {
        log::info!("[job {}] cancellation requested", self.id);
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Waits for the job, discarding any unread progress events.
    pub async fn wait(self) -> Result<VideoOutput> {
        drop(self.events);
        self.result
            .await
            .map_err(|e| LuminaError::Backend(format!("job task aborted: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{LogLevel, LogLine};
    use futures::StreamExt;
    use std::sync::Mutex;

    #[test]
    fn test_job_tag_is_picked_up_by_log_lines() {
        let id = Uuid::new_v4();
        let message = format!("{}Downloaded 12 bytes (video/mp4)", JobTag::new(id));
        let line = LogLine::new(LogLevel::Info, "lumina::gemini::retriever", message);
        assert_eq!(line.job_id, Some(id.to_string()));

        assert_eq!(JobTag::default().to_string(), "");
    }

    #[tokio::test]
    async fn test_channel_reporter_delivers_in_order() {
        let (reporter, mut events) = ProgressReporter::channel();
        reporter.emit(ProgressEvent::Downloading);
        reporter.emit(ProgressEvent::Completed);
        drop(reporter);

        assert_eq!(events.next().await, Some(ProgressEvent::Downloading));
        assert_eq!(events.next().await, Some(ProgressEvent::Completed));
        assert_eq!(events.next().await, None);
    }

    #[test]
    fn test_callback_reporter() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let reporter = ProgressReporter::from_fn(move |e| sink.lock().unwrap().push(e.status()));
        reporter.emit(ProgressEvent::Narrating);
        assert_eq!(seen.lock().unwrap().as_slice(), ["Recording narration..."]);
    }

    #[test]
    fn test_full_channel_drops_instead_of_blocking() {
        let (reporter, _events) = ProgressReporter::channel();
        for _ in 0..(EVENT_BUFFER + 10) {
            reporter.emit(ProgressEvent::Downloading);
        }
    }

    #[tokio::test]
    async fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(token.checkpoint().is_ok());

        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };
        token.cancel();
        waiter.await.unwrap();

        assert!(token.is_cancelled());
        assert_eq!(
            token.checkpoint().unwrap_err().kind(),
            crate::error::ErrorKind::Cancelled
        );
    }
}

//! Background execution of one orchestrator call at a time.
use crate::compare::PanelEntry;
use crate::context::{Prediction, TfBindContext};
use crate::scan::{ScanPoint, ScanRequest};
use candle_core::Tensor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tfbind_core::{CancelToken, Result, TfBindError};

/// Clears the in-flight flag when the worker finishes, even on panic.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct JobHandle<T> {
    handle: JoinHandle<Result<T>>,
    cancel: CancelToken,
}

impl<T> JobHandle<T> {
    /// Ask the job to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the result. A panic in the job is resumed on the caller.
    pub fn join(self) -> Result<T> {
        self.handle
            .join()
            .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
    }
}

/// Runs jobs against a shared context on a worker thread. A second submission
/// while one is running fails with [`TfBindError::SessionBusy`].
#[derive(Clone)]
pub struct Session {
    context: Arc<TfBindContext>,
    in_flight: Arc<AtomicBool>,
}

impl Session {
    pub fn new(context: Arc<TfBindContext>) -> Self {
        Self {
            context,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn context(&self) -> &Arc<TfBindContext> {
        &self.context
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn submit<T, F>(&self, job: F) -> Result<JobHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce(&TfBindContext, &CancelToken) -> Result<T> + Send + 'static,
    {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(TfBindError::SessionBusy);
        }
        let guard = InFlight(self.in_flight.clone());
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let context = self.context.clone();
        let handle = thread::spawn(move || {
            let _guard = guard;
            job(&context, &token)
        });
        Ok(JobHandle { handle, cancel })
    }

    pub fn predict(&self, protein: String, dna: String) -> Result<JobHandle<Prediction>> {
        self.submit(move |ctx, _| ctx.predict_from_sequence(&protein, &dna))
    }

    pub fn compare(
        &self,
        dna: String,
        current_prediction: f32,
        panel: Vec<String>,
    ) -> Result<JobHandle<Vec<PanelEntry>>> {
        self.submit(move |ctx, cancel| {
            ctx.compare(&dna, current_prediction, panel.as_slice(), cancel)
        })
    }

    pub fn scan(
        &self,
        request: ScanRequest,
        tf_embedding: Tensor,
    ) -> Result<JobHandle<Vec<ScanPoint>>> {
        self.submit(move |ctx, cancel| ctx.scan(&request, &tf_embedding, cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{tiny_context, TINY_EMBEDDING_DIM};
    use candle_core::Device;
    use std::sync::mpsc;
    use tfbind_test_data::TestFile;

    #[test]
    fn test_second_submission_is_rejected() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let session = Session::new(Arc::new(tiny_context(dir.path())?));
        let (release, wait) = mpsc::channel::<()>();

        let first = session.submit(move |_, _| {
            wait.recv().ok();
            Ok(1)
        })?;
        assert!(session.is_busy());
        assert!(matches!(
            session.submit(|_, _| Ok(2)),
            Err(TfBindError::SessionBusy)
        ));

        release.send(())?;
        assert_eq!(first.join()?, 1);
        assert!(!session.is_busy());
        assert_eq!(session.submit(|_, _| Ok(3))?.join()?, 3);
        Ok(())
    }

    #[test]
    fn test_cancel_running_job() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let session = Session::new(Arc::new(tiny_context(dir.path())?));
        let (started, wait_started) = mpsc::channel::<()>();
        let (release, wait) = mpsc::channel::<()>();

        let job = session.submit(move |_, cancel| {
            started.send(()).ok();
            wait.recv().ok();
            cancel.check()?;
            Ok(())
        })?;
        wait_started.recv()?;
        job.cancel();
        release.send(())?;
        assert!(matches!(job.join(), Err(TfBindError::Cancelled)));
        assert!(!session.is_busy());
        Ok(())
    }

    #[test]
    fn test_scan_job() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        TestFile::chromosome_01().write_to(dir.path(), "chrT")?;
        let session = Session::new(Arc::new(tiny_context(dir.path())?));
        let tf = Tensor::rand(0f32, 1f32, (TINY_EMBEDDING_DIM, 100), &Device::Cpu)?;
        let points = session
            .scan(ScanRequest::new("chrT", 0, 140, 70), tf)?
            .join()?;
        assert_eq!(points.len(), 3);
        Ok(())
    }
}

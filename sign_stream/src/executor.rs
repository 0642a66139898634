use sign_inference::{Frame, LandmarkProvider, Pipeline, PredictionResult};
use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};
use thiserror::Error;
use tokio::{sync::Semaphore, task::JoinError};

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Pipeline worker pool is closed")]
    Closed,
    #[error("Pipeline worker failed: {0}")]
    Join(#[from] JoinError),
}

/// Runs the synchronous frame pipeline on the blocking thread pool, with at
/// most `worker_threads` calls in flight across all sessions.
#[derive(Clone)]
pub struct PipelineExecutor {
    pipeline: Arc<Pipeline>,
    permits: Arc<Semaphore>,
}

impl PipelineExecutor {
    pub fn new(pipeline: Pipeline, worker_threads: usize) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            permits: Arc::new(Semaphore::new(worker_threads.max(1))),
        }
    }

    /// The provider travels into the worker and comes back with the result,
    /// so it is never touched by two threads at once.
    pub async fn run(
        &self,
        mut provider: Box<dyn LandmarkProvider>,
        frame: Frame,
    ) -> Result<(Box<dyn LandmarkProvider>, PredictionResult), ExecutorError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ExecutorError::Closed)?;
        let pipeline = self.pipeline.clone();

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                pipeline.process(provider.as_mut(), &frame)
            }))
            .unwrap_or_else(|_| {
                tracing::error!("Frame pipeline panicked");
                PredictionResult::ProcessingError
            });
            (provider, result)
        });

        Ok(handle.await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use image::RgbImage;
    use sign_inference::{LandmarkError, LandmarkSet, ModelHandle};
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    struct PanickingProvider;

    impl LandmarkProvider for PanickingProvider {
        fn detect(&mut self, _image: &RgbImage) -> Result<Vec<LandmarkSet>, LandmarkError> {
            panic!("tracker exploded");
        }
    }

    struct SlowProvider {
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl LandmarkProvider for SlowProvider {
        fn detect(&mut self, _image: &RgbImage) -> Result<Vec<LandmarkSet>, LandmarkError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(30));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    fn png_frame() -> Frame {
        let img = RgbImage::from_pixel(4, 4, image::Rgb([10, 20, 30]));
        let mut cursor = std::io::Cursor::new(Vec::new());
        img.write_to(&mut cursor, image::ImageFormat::Png).unwrap();
        Frame::Binary(Bytes::from(cursor.into_inner()))
    }

    fn ready_model() -> ModelHandle {
        crate::session::tests::ready_model()
    }

    #[tokio::test]
    async fn test_panic_becomes_processing_error_and_returns_provider() {
        let executor = PipelineExecutor::new(Pipeline::new(ready_model()), 1);

        let (_provider, result) = executor
            .run(Box::new(PanickingProvider), png_frame())
            .await
            .unwrap();

        assert_eq!(result, PredictionResult::ProcessingError);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_worker_pool_is_bounded() {
        let executor = PipelineExecutor::new(Pipeline::new(ready_model()), 2);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let calls = (0..6).map(|_| {
            let executor = executor.clone();
            let provider = Box::new(SlowProvider {
                in_flight: in_flight.clone(),
                peak: peak.clone(),
            });
            tokio::spawn(async move { executor.run(provider, png_frame()).await })
        });
        let calls: Vec<_> = calls.collect();

        for call in calls {
            let (_, result) = call.await.unwrap().unwrap();
            assert_eq!(result, PredictionResult::NotDetected);
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}

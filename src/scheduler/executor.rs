use super::task::{ScaleOutput, ScaleTask};
use crate::cancel::CancelToken;
use crate::error::{Result, VesselnessError};
use crate::progress::ProgressSink;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Runs a batch of scale tasks and returns one result per task, in input order.
///
/// Implementations must run every task to completion, even after another one
/// failed, and must not let a task panic escape.
pub trait ScaleExecutor {
    fn execute(
        &self,
        tasks: Vec<ScaleTask<'_>>,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Vec<Result<ScaleOutput>>;
}

impl<E: ScaleExecutor + ?Sized> ScaleExecutor for &E {
    fn execute(
        &self,
        tasks: Vec<ScaleTask<'_>>,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Vec<Result<ScaleOutput>> {
        (**self).execute(tasks, progress, cancel)
    }
}

/// Bounded rayon pool; one scale per worker at a time.
#[derive(Debug)]
pub struct RayonExecutor {
    pool: ThreadPool,
}

impl RayonExecutor {
    /// `threads == 0` sizes the pool to the available hardware threads.
    pub fn new(threads: usize) -> Result<Self> {
        let threads = if threads == 0 {
            std::thread::available_parallelism().map_or(1, |n| n.get())
        } else {
            threads
        };
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("vesselness-{i}"))
            .build()
            .map_err(|e| VesselnessError::computation(format!("cannot start worker pool: {e}")))?;
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl ScaleExecutor for RayonExecutor {
    fn execute(
        &self,
        tasks: Vec<ScaleTask<'_>>,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Vec<Result<ScaleOutput>> {
        self.pool.install(|| {
            tasks
                .into_par_iter()
                .map(|task| run_guarded(task, progress, cancel))
                .collect()
        })
    }
}

/// Same contract, on the calling thread. Handy for debugging and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct SequentialExecutor;

impl ScaleExecutor for SequentialExecutor {
    fn execute(
        &self,
        tasks: Vec<ScaleTask<'_>>,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Vec<Result<ScaleOutput>> {
        tasks
            .into_iter()
            .map(|task| run_guarded(task, progress, cancel))
            .collect()
    }
}

/// Run one task, converting a panic into `ComputationFailure`.
pub(crate) fn run_guarded(
    task: ScaleTask<'_>,
    progress: &dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<ScaleOutput> {
    let index = task.scale_index;
    catch_unwind(AssertUnwindSafe(|| task.run(progress, cancel)))
        .unwrap_or_else(|payload| {
            Err(VesselnessError::computation(format!(
                "task panicked: {}",
                panic_message(payload.as_ref())
            )))
        })
        .map_err(|e| e.at_scale(index))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

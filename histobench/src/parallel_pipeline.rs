// THEORY:
// The parallel reducer. Each channel is split by the partitioner and every
// partition becomes one counting task on a shared tokio worker pool. Tasks read
// only their own sub-slice of an `Arc`-shared plane and return a private partial
// histogram, so the counting phase needs no locks. After a join barrier over
// every task of every channel, partials are summed element-wise on the calling
// thread.
//
// The pool is built once per engine and reused for every request. A failing or
// panicking task fails only the request it belongs to; the pool keeps running.

use crate::core_modules::channels::{ChannelBuffers, PixelBuffer};
use crate::core_modules::histogram::{Channel, Histogram, HistogramBundle, MAX_PIXELS};
use crate::core_modules::kernel::{CountingKernel, KernelError, Strategy};
use crate::core_modules::partition::partition;
use crate::error::{EngineError, EngineResult};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::ops::Range;
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;

type PartialResult = (Channel, Result<Histogram, KernelError>);

/// Fixed-size pool of counting threads.
pub(crate) struct WorkerPool {
    runtime: Runtime,
    threads: usize,
}

impl WorkerPool {
    pub fn new(threads: usize) -> EngineResult<Self> {
        let threads = NonZeroUsize::new(threads)
            .ok_or_else(|| EngineError::InvalidConfig("worker pool needs at least one thread".into()))?
            .get();
        let runtime = Builder::new_multi_thread()
            .worker_threads(threads)
            .thread_name("histobench-worker")
            .build()
            .map_err(|e| EngineError::InvalidConfig(format!("failed to start worker pool: {e}")))?;
        Ok(Self { runtime, threads })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    fn spawn_count(
        &self,
        channel: Channel,
        pixels: PixelBuffer,
        range: Range<usize>,
        kernel: CountingKernel,
    ) -> JoinHandle<PartialResult> {
        self.runtime
            .spawn(async move { (channel, kernel(&pixels.as_slice()[range])) })
    }
}

/// Computes histogram bundles on a reusable worker pool.
pub struct HistogramEngine {
    pool: WorkerPool,
}

impl HistogramEngine {
    pub fn new(threads: usize) -> EngineResult<Self> {
        Ok(Self {
            pool: WorkerPool::new(threads)?,
        })
    }

    /// Engine with one pool thread per logical CPU.
    pub fn with_hardware_concurrency() -> EngineResult<Self> {
        Self::new(num_cpus::get().max(1))
    }

    pub fn threads(&self) -> usize {
        self.pool.threads()
    }

    /// Blocks until every partition of every channel has been counted and
    /// merged. Must not be called from inside an async runtime; use
    /// [`compute_async`](Self::compute_async) there.
    pub fn compute(
        &self,
        buffers: &ChannelBuffers,
        workers: usize,
        strategy: Strategy,
    ) -> EngineResult<HistogramBundle> {
        self.compute_with(buffers, workers, strategy.kernel())
    }

    /// Like [`compute`](Self::compute) but with an arbitrary kernel honouring
    /// the counting-kernel contract.
    pub fn compute_with(
        &self,
        buffers: &ChannelBuffers,
        workers: usize,
        kernel: CountingKernel,
    ) -> EngineResult<HistogramBundle> {
        self.pool
            .runtime
            .block_on(self.compute_async_with(buffers, workers, kernel))
    }

    /// Resolves once with the merged bundle. Dropping the future early does
    /// not cancel tasks that were already dispatched.
    pub async fn compute_async(
        &self,
        buffers: &ChannelBuffers,
        workers: usize,
        strategy: Strategy,
    ) -> EngineResult<HistogramBundle> {
        self.compute_async_with(buffers, workers, strategy.kernel())
            .await
    }

    async fn compute_async_with(
        &self,
        buffers: &ChannelBuffers,
        workers: usize,
        kernel: CountingKernel,
    ) -> EngineResult<HistogramBundle> {
        let workers = NonZeroUsize::new(workers)
            .ok_or_else(|| EngineError::InvalidConfig("worker count must be at least 1".into()))?;
        if let Some((channel, buffer)) = buffers.iter().find(|(_, b)| b.len() > MAX_PIXELS) {
            return Err(EngineError::InvalidInput(format!(
                "{channel} channel holds {} samples, limit is {MAX_PIXELS}",
                buffer.len()
            )));
        }

        // Empty channels stay all-zero and never reach a kernel.
        let mut histograms: BTreeMap<Channel, Histogram> = buffers
            .channels()
            .map(|channel| (channel, Histogram::new()))
            .collect();

        let mut tasks = Vec::new();
        for (channel, buffer) in buffers.iter() {
            for part in partition(buffer.len(), workers) {
                tasks.push(self.pool.spawn_count(channel, buffer.clone(), part.range(), kernel));
            }
        }
        log::debug!(
            "dispatched {} counting tasks over {} channels ({} workers, {} pool threads)",
            tasks.len(),
            histograms.len(),
            workers,
            self.pool.threads
        );

        // Join barrier: every task has finished before anything is merged or
        // an error is returned.
        let outcomes = join_all(tasks).await;

        for outcome in outcomes {
            let (channel, partial) = outcome.map_err(|e| {
                let error = EngineError::from_join(e);
                log::warn!("{error}");
                error
            })?;
            let partial = partial.map_err(|source| EngineError::Kernel { channel, source })?;
            histograms.entry(channel).or_default().merge(&partial);
        }

        Ok(HistogramBundle::from(histograms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::kernel::count_scalar;
    use proptest::collection::vec;
    use proptest::prelude::{ProptestConfig, any, prop_assert_eq, proptest};
    use std::sync::OnceLock;

    fn engine() -> HistogramEngine {
        HistogramEngine::new(4).expect("pool starts")
    }

    fn gradient(len: usize) -> ChannelBuffers {
        let samples: Vec<u8> = (0..len).map(|i| (i * 7 % 256) as u8).collect();
        ChannelBuffers::single(samples).unwrap()
    }

    fn failing_kernel(_: &[u8]) -> Result<Histogram, KernelError> {
        Err(KernelError::TooManyPixels(usize::MAX))
    }

    fn panicking_kernel(pixels: &[u8]) -> Result<Histogram, KernelError> {
        if pixels.len() < 1000 {
            panic!("kernel blew up");
        }
        count_scalar(pixels)
    }

    #[test]
    fn example_buffer_for_every_worker_count() {
        let engine = engine();
        let buffers = ChannelBuffers::single(vec![0u8, 0, 255, 255, 255]).unwrap();

        for workers in 1..=5 {
            for strategy in Strategy::ALL {
                let bundle = engine.compute(&buffers, workers, strategy).unwrap();
                let histogram = bundle.get(Channel::Luminance).unwrap();
                assert_eq!(histogram[0], 2, "{strategy} with {workers} workers");
                assert_eq!(histogram[255], 3);
                assert_eq!(histogram.total(), 5);
            }
        }
    }

    #[test]
    fn partition_count_does_not_change_result() {
        let engine = engine();
        let buffers = gradient(10_007);
        let reference = engine.compute(&buffers, 1, Strategy::Scalar).unwrap();

        for workers in [2, 3, 4, 7, 16, 64, 20_000] {
            assert_eq!(engine.compute(&buffers, workers, Strategy::Scalar).unwrap(), reference);
        }
    }

    #[test]
    fn strategies_agree_on_every_channel() {
        let engine = engine();
        let rgba: Vec<u8> = (0..64 * 48 * 4).map(|i| (i * 31 % 253) as u8).collect();
        let buffers = ChannelBuffers::from_rgba(64, 48, &rgba).unwrap();

        let scalar = engine.compute(&buffers, 3, Strategy::Scalar).unwrap();
        let unrolled = engine.compute(&buffers, 3, Strategy::Unrolled).unwrap();

        assert_eq!(scalar, unrolled);
        assert_eq!(scalar.len(), 4);
        for (_, histogram) in scalar.iter() {
            assert_eq!(histogram.total(), 64 * 48);
        }
    }

    #[test]
    fn zero_buffer_lands_in_bin_zero() {
        let buffers = ChannelBuffers::single(vec![0u8; 4096]).unwrap();
        let bundle = engine().compute(&buffers, 4, Strategy::Unrolled).unwrap();
        let histogram = bundle.get(Channel::Luminance).unwrap();

        assert_eq!(histogram[0], 4096);
        assert_eq!(histogram.total(), 4096);
    }

    #[test]
    fn empty_channels_give_zero_histograms_without_kernels() {
        let buffers = ChannelBuffers::from_rgba(0, 0, &[]).unwrap();
        // A failing kernel proves nothing was dispatched.
        let bundle = engine().compute_with(&buffers, 4, failing_kernel).unwrap();

        assert_eq!(bundle.len(), 4);
        assert!(bundle.iter().all(|(_, histogram)| histogram.is_empty()));
    }

    #[test]
    fn zero_workers_is_rejected() {
        let err = engine().compute(&gradient(10), 0, Strategy::Scalar).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
        assert!(matches!(HistogramEngine::new(0), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn kernel_failure_fails_the_whole_request() {
        let err = engine().compute_with(&gradient(100), 4, failing_kernel).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Kernel {
                channel: Channel::Luminance,
                source: KernelError::TooManyPixels(_),
            }
        ));
    }

    #[test]
    fn pool_survives_a_panicking_task() {
        let engine = engine();
        let buffers = gradient(3000);

        // 3000 samples over 4 workers gives partitions of 750, all of which panic.
        let err = engine.compute_with(&buffers, 4, panicking_kernel).unwrap_err();
        match err {
            EngineError::WorkerPanicked(message) => assert!(message.contains("kernel blew up")),
            other => panic!("unexpected error: {other}"),
        }

        let bundle = engine.compute_with(&buffers, 2, panicking_kernel).unwrap();
        assert_eq!(bundle.get(Channel::Luminance).unwrap().total(), 3000);
    }

    #[test]
    fn async_form_resolves_once_with_the_same_bundle() {
        let engine = engine();
        let buffers = ChannelBuffers::new(
            2,
            2,
            [
                (Channel::Red, PixelBuffer::from(vec![1u8, 1, 2, 3])),
                (Channel::Blue, PixelBuffer::from(vec![9u8; 4])),
            ],
        )
        .unwrap();

        let sync = engine.compute(&buffers, 2, Strategy::Scalar).unwrap();
        let async_bundle =
            futures::executor::block_on(engine.compute_async(&buffers, 2, Strategy::Unrolled)).unwrap();

        assert_eq!(sync, async_bundle);
        assert_eq!(async_bundle.get(Channel::Red).unwrap()[1], 2);
        assert_eq!(async_bundle.get(Channel::Blue).unwrap()[9], 4);
    }

    #[test]
    fn engine_defaults_to_hardware_concurrency() {
        let engine = HistogramEngine::with_hardware_concurrency().unwrap();
        assert_eq!(engine.threads(), num_cpus::get().max(1));
    }

    fn shared_engine() -> &'static HistogramEngine {
        static ENGINE: OnceLock<HistogramEngine> = OnceLock::new();
        ENGINE.get_or_init(engine)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn single_scalar_pass_matches_any_parallel_unrolled_pass(
            samples in vec(any::<u8>(), 0..3000),
            workers in 1usize..40,
        ) {
            let engine = shared_engine();
            let len = samples.len() as u64;
            let buffers = ChannelBuffers::single(samples).unwrap();

            let reference = engine.compute(&buffers, 1, Strategy::Scalar).unwrap();
            let parallel = engine.compute(&buffers, workers, Strategy::Unrolled).unwrap();

            prop_assert_eq!(&parallel, &reference);
            prop_assert_eq!(parallel.get(Channel::Luminance).unwrap().total(), len);
        }
    }
}

use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use snafu::ResultExt;

use crate::error;
use crate::util::Result;

/// Create a rayon thread pool with the given number of threads.
/// Use `num_threads = 0` for auto number of threads.
pub fn create_rayon_thread_pool(num_threads: usize) -> Result<Arc<ThreadPool>> {
    let thread_pool = ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|index| format!("hexstats-cells-{index}"))
        .build()
        .context(error::ThreadPoolBuild)?;

    Ok(Arc::new(thread_pool))
}

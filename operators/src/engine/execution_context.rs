use std::sync::Arc;

use rayon::ThreadPool;
use serde::{Deserialize, Serialize};

use crate::processing::FetchOptions;
use crate::util::Result;
use crate::util::rayon::create_rayon_thread_pool;

/// Parallelism and fetch behaviour of the engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// worker threads for per-cell statistics, `0` uses all available cores
    pub cell_parallelism: usize,
    /// how many windows are fetched and summarized at the same time
    pub window_concurrency: usize,
    pub fetch: FetchOptions,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            cell_parallelism: 0,
            window_concurrency: 4,
            fetch: FetchOptions::default(),
        }
    }
}

/// The shared resources of all summarization jobs
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    options: EngineOptions,
    thread_pool: Arc<ThreadPool>,
}

impl ExecutionContext {
    pub fn new(options: EngineOptions) -> Result<Self> {
        Ok(Self {
            options,
            thread_pool: create_rayon_thread_pool(options.cell_parallelism)?,
        })
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn thread_pool(&self) -> &Arc<ThreadPool> {
        &self.thread_pool
    }
}

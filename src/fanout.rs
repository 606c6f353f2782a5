//! Bounded fan-out for independent file writes
//!
//! One task per output file on a dedicated pool of
//! min(task count, available parallelism) threads. Tasks share no mutable
//! state; every task runs to completion and all failures are reported
//! together.

use std::fmt::Display;
use std::thread;

use log::debug;
use rayon::prelude::*;

use crate::error::{Error, Result};

/// Pool size for `n_tasks` independent tasks
pub fn pool_size(n_tasks: usize) -> usize {
    let cores = thread::available_parallelism().map_or(1, |n| n.get());
    n_tasks.min(cores).max(1)
}

/// Run `task` for every key on a bounded pool, collecting each outcome
pub fn run_concurrently<K, F>(keys: &[K], task: F) -> Result<()>
where
    K: Display + Sync,
    F: Fn(&K) -> Result<()> + Send + Sync,
{
    let size = pool_size(keys.len());
    let pool = rayon::ThreadPoolBuilder::new().num_threads(size).build()?;
    debug!("Running {} tasks on {} threads", keys.len(), size);

    let outcomes: Vec<(String, Result<()>)> = pool.install(|| {
        keys.par_iter()
            .map(|key| (key.to_string(), task(key)))
            .collect()
    });

    let failures: Vec<(String, Error)> = outcomes
        .into_iter()
        .filter_map(|(key, outcome)| outcome.err().map(|e| (key, e)))
        .collect();

    if failures.is_empty() {
        Ok(())
    } else {
        Err(Error::WriteTasks(failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_pool_size_bounds() {
        assert_eq!(pool_size(0), 1);
        assert_eq!(pool_size(1), 1);
        assert!(pool_size(3) <= 3);
        assert!(pool_size(1000) >= 1);
    }

    #[test]
    fn test_all_tasks_run() {
        let counter = AtomicUsize::new(0);
        run_concurrently(&["a", "b", "c"], |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_failure_does_not_cancel_siblings() {
        let counter = AtomicUsize::new(0);
        let result = run_concurrently(&["ok1", "bad", "ok2", "worse"], |key| {
            counter.fetch_add(1, Ordering::SeqCst);
            if key.starts_with("ok") {
                Ok(())
            } else {
                Err(Error::MissingAccount { account: key.to_string() })
            }
        });

        assert_eq!(counter.load(Ordering::SeqCst), 4);
        match result {
            Err(Error::WriteTasks(failures)) => {
                let mut keys: Vec<_> = failures.iter().map(|(k, _)| k.as_str()).collect();
                keys.sort();
                assert_eq!(keys, vec!["bad", "worse"]);
            }
            other => panic!("expected WriteTasks, got {:?}", other),
        }
    }
}

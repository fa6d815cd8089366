//! Bounded worker pool shared by every parallel stage.
//!
//! A feeder thread pushes keyed work items into a bounded channel, workers
//! pull first come first served and send keyed results to the collector,
//! which merges them by key. Every blocking call polls with a timeout so a
//! cancelled stage winds down without draining its queue. A panicking job
//! is turned into a fatal error on its item and cancels the stage.

use crate::libs::error::{OrthoError, Result};
use crossbeam::channel::{self, RecvTimeoutError, SendTimeoutError};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const POLL: Duration = Duration::from_millis(100);

pub struct WorkerPool {
    threads: usize,
    cancel: Arc<AtomicBool>,
    rayon: rayon::ThreadPool,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Result<Self> {
        let threads = threads.max(1);
        let rayon = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| OrthoError::Worker(e.to_string()))?;
        Ok(Self {
            threads,
            cancel: Arc::new(AtomicBool::new(false)),
            rayon,
        })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Run data-parallel work (rayon iterators) on this pool's threads.
    pub fn install<R, F>(&self, f: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        self.rayon.install(f)
    }

    /// Apply `f` to every item and collect the results by item index.
    ///
    /// Recoverable errors are logged and the item is left out of the map.
    /// The first fatal error cancels the stage and is returned.
    pub fn map_keyed<T, R, F>(&self, label: &str, items: Vec<T>, f: F) -> Result<BTreeMap<usize, R>>
    where
        T: Send,
        R: Send,
        F: Fn(usize, T) -> Result<R> + Sync,
    {
        if self.is_cancelled() {
            return Err(OrthoError::Worker(format!("{}: pool was cancelled", label)));
        }

        let bar = progress_bar(label, items.len());
        let (snd_work, rcv_work) = channel::bounded::<(usize, T)>(2 * self.threads);
        let (snd_done, rcv_done) = channel::bounded::<(usize, Result<R>)>(2 * self.threads);

        let cancel = &self.cancel;
        let f = &f;
        let mut results = BTreeMap::new();
        let mut fatal: Option<OrthoError> = None;

        let scoped = crossbeam::scope(|s| {
            //----------------------------
            // Feeder
            //----------------------------
            s.spawn(move |_| {
                for mut job in items.into_iter().enumerate() {
                    loop {
                        if cancel.load(Ordering::SeqCst) {
                            return;
                        }
                        match snd_work.send_timeout(job, POLL) {
                            Ok(()) => break,
                            Err(SendTimeoutError::Timeout(back)) => job = back,
                            Err(SendTimeoutError::Disconnected(_)) => return,
                        }
                    }
                }
            });

            //----------------------------
            // Workers
            //----------------------------
            for _ in 0..self.threads {
                let (recvr, sendr) = (rcv_work.clone(), snd_done.clone());
                s.spawn(move |_| loop {
                    if cancel.load(Ordering::SeqCst) {
                        break;
                    }
                    match recvr.recv_timeout(POLL) {
                        Ok((key, item)) => {
                            let result = panic::catch_unwind(AssertUnwindSafe(|| f(key, item)))
                                .unwrap_or_else(|payload| {
                                    Err(OrthoError::Worker(format!(
                                        "{}: item {} panicked: {}",
                                        label,
                                        key,
                                        panic_message(payload.as_ref())
                                    )))
                                });
                            if matches!(&result, Err(e) if e.is_fatal()) {
                                cancel.store(true, Ordering::SeqCst);
                            }
                            if sendr.send((key, result)).is_err() {
                                break;
                            }
                        }
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                });
            }
            // only the workers hold the ends now
            drop(rcv_work);
            drop(snd_done);

            //----------------------------
            // Collector
            //----------------------------
            for (key, result) in rcv_done.iter() {
                bar.inc(1);
                match result {
                    Ok(value) => {
                        results.insert(key, value);
                    }
                    Err(e) if e.is_fatal() => {
                        if fatal.is_none() {
                            fatal = Some(e);
                        }
                    }
                    Err(e) => log::warn!("{}", e),
                }
            }
        });
        bar.finish_and_clear();

        if scoped.is_err() {
            self.cancel();
            return Err(OrthoError::Worker(format!("{}: a worker thread panicked", label)));
        }
        if let Some(e) = fatal {
            return Err(e);
        }
        if self.is_cancelled() {
            return Err(OrthoError::Worker(format!("{}: stage was cancelled", label)));
        }

        Ok(results)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown cause"
    }
}

/// Drawn only at `-v` and above, and only on a terminal.
fn progress_bar(label: &str, len: usize) -> ProgressBar {
    if !log::log_enabled!(log::Level::Info) {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) =
        ProgressStyle::with_template("{msg:>12} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
    {
        bar.set_style(style);
    }
    bar.set_message(label.to_string());
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_are_keyed_by_input_order() {
        let pool = WorkerPool::new(4).unwrap();
        let items: Vec<usize> = (0..50).collect();
        let out = pool.map_keyed("square", items, |_, x| Ok(x * x)).unwrap();
        assert_eq!(out.len(), 50);
        assert_eq!(out[&7], 49);
        assert!(out.keys().copied().eq(0..50));
    }

    #[test]
    fn recoverable_errors_skip_the_item() {
        let pool = WorkerPool::new(2).unwrap();
        let out = pool
            .map_keyed("skip", vec![1, 2, 3, 4], |k, x| {
                if x % 2 == 0 {
                    Err(OrthoError::gene_tree(format!("OG{:07}", k), "odd topology"))
                } else {
                    Ok(x)
                }
            })
            .unwrap();
        assert_eq!(out.keys().copied().collect::<Vec<_>>(), vec![0, 2]);
        assert!(!pool.is_cancelled());
    }

    #[test]
    fn fatal_error_cancels_the_stage() {
        let pool = WorkerPool::new(3).unwrap();
        let err = pool
            .map_keyed("fail", (0..100).collect(), |_, x: usize| {
                if x == 5 {
                    Err(OrthoError::IdNotFound("0_5".to_string()))
                } else {
                    Ok(x)
                }
            })
            .unwrap_err();
        assert!(matches!(err, OrthoError::IdNotFound(_)));
        assert!(pool.is_cancelled());
        assert!(pool.map_keyed("after", vec![1], |_, x: i32| Ok(x)).is_err());
    }

    #[test]
    fn panicking_job_cancels_the_stage() {
        let pool = WorkerPool::new(2).unwrap();
        let err = pool
            .map_keyed("boom", (0..1000).collect(), |_, x: usize| {
                if x == 3 {
                    panic!("bad item {}", x);
                }
                std::thread::sleep(Duration::from_millis(1));
                Ok(x)
            })
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "worker failed: boom: item 3 panicked: bad item 3");
        assert!(pool.is_cancelled());
    }
}

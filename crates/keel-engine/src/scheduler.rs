//! Scoped worker pool for capture and restore tasks.
//!
//! Tasks are pushed onto a crossbeam channel before any worker starts;
//! workers drain the channel until it is empty, and results are sent back
//! tagged with their task index so the caller sees them in task order no
//! matter which worker ran what. Workers are scoped threads, so tasks may
//! borrow from the caller's stack (container sub-arrays, live batches).
//!
//! A panic inside any task is re-raised on the calling thread with its
//! original payload once every worker has stopped.

use std::panic;
use std::thread;

use crossbeam_channel::unbounded;

/// Runs a list of independent tasks on up to `workers` threads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    /// A pool with `workers` threads (at least one).
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `f` over every task and return the results in task order.
    ///
    /// With one worker, or at most one task, everything runs inline on the
    /// caller's thread.
    pub fn run<T, R, F>(&self, tasks: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync,
    {
        let task_count = tasks.len();
        let workers = self.workers.min(task_count);
        if workers <= 1 {
            return tasks.into_iter().map(f).collect();
        }

        let (task_tx, task_rx) = unbounded::<(usize, T)>();
        let (result_tx, result_rx) = unbounded::<(usize, R)>();
        for task in tasks.into_iter().enumerate() {
            // The receiver lives on this stack frame, so the send cannot fail.
            let _ = task_tx.send(task);
        }
        drop(task_tx);

        let f = &f;
        thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    let task_rx = task_rx.clone();
                    let result_tx = result_tx.clone();
                    s.spawn(move || {
                        while let Ok((index, task)) = task_rx.recv() {
                            if result_tx.send((index, f(task))).is_err() {
                                break;
                            }
                        }
                    })
                })
                .collect();
            for handle in handles {
                if let Err(payload) = handle.join() {
                    panic::resume_unwind(payload);
                }
            }
        });
        drop(result_tx);

        let mut slots: Vec<Option<R>> = (0..task_count).map(|_| None).collect();
        for (index, result) in result_rx.try_iter() {
            slots[index] = Some(result);
        }
        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| panic!("worker pool lost the result of task {index}"))
            })
            .collect()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn results_come_back_in_task_order() {
        let pool = WorkerPool::new(4);
        let out = pool.run((0..100u64).collect(), |x| x * x);
        let expected: Vec<u64> = (0..100u64).map(|x| x * x).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn single_worker_runs_inline() {
        let caller = thread::current().id();
        let pool = WorkerPool::new(1);
        let ids = pool.run(vec![(); 8], |()| thread::current().id());
        assert!(ids.iter().all(|&id| id == caller));
    }

    #[test]
    fn every_task_runs_exactly_once() {
        let counter = AtomicUsize::new(0);
        let pool = WorkerPool::new(8);
        let out = pool.run((0..1000).collect::<Vec<usize>>(), |i| {
            counter.fetch_add(1, Ordering::Relaxed);
            i
        });
        assert_eq!(counter.load(Ordering::Relaxed), 1000);
        assert_eq!(out.len(), 1000);
    }

    #[test]
    fn tasks_may_borrow_mutably_from_caller() {
        let mut buffer = vec![0u8; 64];
        let chunks: Vec<&mut [u8]> = buffer.chunks_mut(8).collect();
        let pool = WorkerPool::new(3);
        pool.run(chunks.into_iter().enumerate().collect(), |(i, chunk)| {
            chunk.fill(i as u8);
        });
        for (i, chunk) in buffer.chunks(8).enumerate() {
            assert!(chunk.iter().all(|&b| b == i as u8));
        }
    }

    #[test]
    fn empty_task_list() {
        let pool = WorkerPool::new(4);
        let out: Vec<u32> = pool.run(Vec::<u32>::new(), |x| x);
        assert!(out.is_empty());
    }

    #[test]
    #[should_panic(expected = "task 3 failed")]
    fn worker_panic_keeps_its_message() {
        let pool = WorkerPool::new(4);
        pool.run((0..8).collect::<Vec<u32>>(), |i| {
            if i == 3 {
                panic!("task {i} failed");
            }
            i
        });
    }

    #[test]
    fn zero_workers_means_one() {
        assert_eq!(WorkerPool::new(0).workers(), 1);
    }
}

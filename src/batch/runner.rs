//! # 工作池
//!
//! 固定大小的 rayon 线程池：每次构建启动一次、汇合一次。
//!
//! ## 功能
//! - 作业数为 0 时使用全部 CPU
//! - 每个 worker 返回 `Result`，任一失败则整体失败
//! - 可选的 indicatif 进度条（按处理单元计数）
//!
//! ## 依赖关系
//! - 被 `extinction/builder.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `rayon` 进行并行计算

use crate::error::{ExlineError, Result};
use crate::utils::progress;

use indicatif::ProgressBar;
use rayon::prelude::*;

/// 固定大小的工作池
#[derive(Debug, Clone)]
pub struct WorkerPool {
    /// 并行作业数
    jobs: usize,
    /// 是否显示进度条
    progress: bool,
}

impl WorkerPool {
    /// 创建工作池，`jobs == 0` 表示使用全部 CPU
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self {
            jobs,
            progress: false,
        }
    }

    /// 设置是否显示进度条
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// 把第 i 个单元分给第 `i mod jobs` 个 worker，保留单元编号
    pub fn distribute<T>(&self, items: Vec<T>) -> Vec<Vec<(usize, T)>> {
        let mut groups: Vec<Vec<(usize, T)>> = (0..self.jobs).map(|_| Vec::new()).collect();
        for (i, item) in items.into_iter().enumerate() {
            groups[i % self.jobs].push((i, item));
        }
        groups
    }

    /// 并行运行各 worker 的任务
    ///
    /// `tasks[w]` 交给第 w 个 worker；`units` 为进度条总长度。
    /// 所有 worker 汇合后，返回编号最小的失败 worker 的错误。
    pub fn run<T, F>(&self, tasks: Vec<T>, units: u64, worker: F) -> Result<()>
    where
        T: Send,
        F: Fn(usize, T, &ProgressBar) -> Result<()> + Sync + Send,
    {
        let pb = if self.progress {
            progress::create_progress_bar(units, "Computing")
        } else {
            ProgressBar::hidden()
        };

        // 配置 rayon 线程池
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| ExlineError::Other(format!("Failed to start worker pool: {}", e)))?;

        let results: Vec<Result<()>> = pool.install(|| {
            tasks
                .into_par_iter()
                .enumerate()
                .map(|(id, task)| worker(id, task, &pb))
                .collect()
        });

        pb.finish_and_clear();

        for (id, result) in results.into_iter().enumerate() {
            if let Err(e) = result {
                return Err(ExlineError::WorkerFailed {
                    worker: id,
                    source: Box::new(e),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_zero_jobs_means_all_cpus() {
        assert_eq!(WorkerPool::new(0).jobs(), num_cpus::get());
        assert_eq!(WorkerPool::new(3).jobs(), 3);
    }

    #[test]
    fn test_distribute_is_round_robin_and_disjoint() {
        let items: Vec<char> = "abcdefghij".chars().collect();
        let groups = WorkerPool::new(4).distribute(items);
        assert_eq!(groups[0], vec![(0, 'a'), (4, 'e'), (8, 'i')]);
        assert_eq!(groups[3], vec![(3, 'd'), (7, 'h')]);
        let mut all: Vec<usize> = groups.concat().into_iter().map(|(i, _)| i).collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_distribute_disjoint_mutable_slices() {
        let mut buffer = vec![0.0; 12];
        let pool = WorkerPool::new(2);
        let groups = pool.distribute(buffer.chunks_mut(3).collect());
        pool.run(groups, 4, |_, cells, _| {
            for (c, cell) in cells {
                cell.fill(c as f64);
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(buffer, vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_run_visits_every_task() {
        let pool = WorkerPool::new(3);
        let counter = AtomicUsize::new(0);
        pool.run(pool.distribute((0..7).collect::<Vec<usize>>()), 7, |_, cells, pb| {
            counter.fetch_add(cells.len(), Ordering::Relaxed);
            pb.inc(cells.len() as u64);
            Ok(())
        })
        .unwrap();
        assert_eq!(counter.load(Ordering::Relaxed), 7);
    }

    #[test]
    fn test_first_failure_is_reported() {
        let pool = WorkerPool::new(4);
        let err = pool
            .run(pool.distribute(vec![(); 8]), 8, |id, _, _| {
                if id >= 2 {
                    Err(ExlineError::Other(format!("worker {} broke", id)))
                } else {
                    Ok(())
                }
            })
            .unwrap_err();
        match err {
            ExlineError::WorkerFailed { worker, source } => {
                assert_eq!(worker, 2);
                assert!(source.to_string().contains("worker 2"));
            }
            other => panic!("expected WorkerFailed, got {:?}", other),
        }
    }
}

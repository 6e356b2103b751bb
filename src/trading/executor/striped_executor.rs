//! 分片串行执行器
//!
//! 固定数量的单工作者队列（分片）。同一 InstanceKey 的任务恒定落在同一分片，
//! 由唯一工作者按提交顺序串行执行，这是每实例可串行化的唯一保证来源。
//! 队列有界，打满时退化为调用方就地执行（不丢弃、不无限堆积）。

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{anyhow, Result};
use futures::future::join_all;
use futures::FutureExt;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::instance_key::InstanceKey;

type StripeTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

pub struct StripedSerialExecutor {
    senders: Vec<mpsc::Sender<StripeTask>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    shutdown_tx: broadcast::Sender<()>,
    stripe_count: usize,
}

impl StripedSerialExecutor {
    /// 创建执行器，分片数与每分片队列容量在启动时固定
    pub fn new(stripe_count: usize, queue_capacity: usize) -> Self {
        let stripe_count = stripe_count.max(1);
        let queue_capacity = queue_capacity.max(1);
        let (shutdown_tx, _) = broadcast::channel(1);

        let mut senders = Vec::with_capacity(stripe_count);
        let mut handles = Vec::with_capacity(stripe_count);

        for stripe_id in 0..stripe_count {
            let (tx, rx) = mpsc::channel::<StripeTask>(queue_capacity);
            let shutdown_rx = shutdown_tx.subscribe();
            senders.push(tx);
            handles.push(tokio::spawn(Self::run_worker(stripe_id, rx, shutdown_rx)));
        }

        info!(
            "分片串行执行器已启动: stripes={}, queue_capacity={}",
            stripe_count, queue_capacity
        );

        Self {
            senders,
            handles: Mutex::new(handles),
            shutdown_tx,
            stripe_count,
        }
    }

    /// 默认分片数取可用并行度
    pub fn with_default_parallelism(queue_capacity: usize) -> Self {
        let stripes = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self::new(stripes, queue_capacity)
    }

    pub fn stripe_count(&self) -> usize {
        self.stripe_count
    }

    pub fn stripe_of(&self, key: &InstanceKey) -> usize {
        key.stripe_of(self.stripe_count)
    }

    async fn run_worker(
        stripe_id: usize,
        mut rx: mpsc::Receiver<StripeTask>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                task = rx.recv() => {
                    match task {
                        Some(task) => Self::run_task(stripe_id, task).await,
                        None => break,
                    }
                }
                _ = shutdown_rx.recv() => {
                    // 收到关闭信号后只排空已入队任务，不再等待新任务
                    let mut drained = 0usize;
                    while let Ok(task) = rx.try_recv() {
                        Self::run_task(stripe_id, task).await;
                        drained += 1;
                    }
                    if drained > 0 {
                        debug!("分片 {} 关闭前排空 {} 个任务", stripe_id, drained);
                    }
                    break;
                }
            }
        }
        debug!("分片 {} 工作者退出", stripe_id);
    }

    /// 单任务执行，panic 被捕获在任务边界，分片工作者继续存活
    async fn run_task(stripe_id: usize, task: StripeTask) {
        if AssertUnwindSafe(task).catch_unwind().await.is_err() {
            error!("分片 {} 任务panic，已隔离，工作者继续运行", stripe_id);
        }
    }

    /// 非阻塞提交
    ///
    /// 队列打满时由调用方就地执行该任务（有界背压）。此时该任务相对队内任务
    /// 的顺序不再保证，属于饱和场景下接受的权衡。
    pub async fn submit<F>(&self, key: &InstanceKey, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let stripe = self.stripe_of(key);
        match self.senders[stripe].try_send(Box::pin(fut)) {
            Ok(()) => {}
            Err(TrySendError::Full(task)) => {
                warn!("分片 {} 队列已满，任务由调用方就地执行: key={}", stripe, key);
                task.await;
            }
            Err(TrySendError::Closed(_)) => {
                warn!("执行器已关闭，任务被拒绝: key={}", key);
            }
        }
    }

    /// 阻塞提交，等待任务完成并返回结果
    pub async fn execute<F, T>(&self, key: &InstanceKey, fut: F) -> Result<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        self.submit(key, async move {
            let _ = done_tx.send(fut.await);
        })
        .await;
        done_rx
            .await
            .map_err(|_| anyhow!("任务在执行器关闭过程中被丢弃: key={}", key))
    }

    /// 关闭：广播关闭信号，限时等待各分片排空，超时则强制终止
    pub async fn shutdown(&self, drain_timeout: Duration) {
        info!("分片串行执行器开始关闭...");
        let _ = self.shutdown_tx.send(());

        let mut handles = {
            let mut guard = self.handles.lock().await;
            std::mem::take(&mut *guard)
        };

        match tokio::time::timeout(drain_timeout, join_all(handles.iter_mut())).await {
            Ok(_) => info!("分片串行执行器已关闭"),
            Err(_) => {
                warn!("执行器排空超时({}秒)，剩余任务被强制终止", drain_timeout.as_secs());
                for handle in handles {
                    handle.abort();
                }
            }
        }
    }
}

//! 触发事件的异步边界
//!
//! 事件源与路由器之间的显式有界通道加消费工作者池。发布方永不阻塞：
//! 通道打满时告警并丢弃（路由层的失败语义就是记日志后丢弃）。
//! 这条边界保证缓慢的实例存储或决策工作不会反压上游摄入管道。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::DecisionEventRouter;
use crate::trading::event::TriggerEvent;

/// 发布句柄，交给上游事件源（行情摄入、信号激活等）
#[derive(Clone)]
pub struct TriggerPublisher {
    tx: mpsc::Sender<TriggerEvent>,
}

impl TriggerPublisher {
    /// 非阻塞发布
    ///
    /// 满/关闭都不报错给调用方，只记日志后丢弃。
    pub fn publish(&self, event: TriggerEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(
                    "触发通道已满，事件被丢弃: kind={}, trading_pair_id={}",
                    event.kind().as_str(),
                    event.trading_pair_id()
                );
            }
            Err(TrySendError::Closed(event)) => {
                warn!(
                    "触发通道已关闭，事件被丢弃: kind={}",
                    event.kind().as_str()
                );
            }
        }
    }
}

/// 触发通道：持有消费工作者，负责把事件送进路由器
pub struct TriggerChannel {
    tx: Option<mpsc::Sender<TriggerEvent>>,
    workers: Vec<JoinHandle<()>>,
}

impl TriggerChannel {
    /// 启动通道与消费工作者池
    pub fn start(
        router: Arc<DecisionEventRouter>,
        capacity: usize,
        worker_count: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<TriggerEvent>(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let mut workers = Vec::new();
        for worker_id in 0..worker_count.max(1) {
            let rx = Arc::clone(&rx);
            let router = Arc::clone(&router);
            workers.push(tokio::spawn(async move {
                loop {
                    let event = {
                        let mut guard = rx.lock().await;
                        guard.recv().await
                    };
                    match event {
                        Some(event) => router.route(event).await,
                        None => break,
                    }
                }
                debug!("触发通道工作者 {} 退出", worker_id);
            }));
        }

        info!(
            "触发通道已启动: capacity={}, workers={}",
            capacity,
            worker_count.max(1)
        );

        Self {
            tx: Some(tx),
            workers,
        }
    }

    pub fn publisher(&self) -> TriggerPublisher {
        TriggerPublisher {
            tx: self
                .tx
                .as_ref()
                .expect("触发通道已关闭，无法再创建发布句柄")
                .clone(),
        }
    }

    /// 关闭：停止接收新事件，限时等待工作者消化完已入队事件
    pub async fn shutdown(mut self, drain_timeout: Duration) {
        // 丢弃发送端后 recv 返回 None，工作者自然退出
        self.tx.take();

        let join = futures::future::join_all(self.workers.iter_mut());
        match tokio::time::timeout(drain_timeout, join).await {
            Ok(_) => info!("触发通道已排空并关闭"),
            Err(_) => {
                warn!(
                    "触发通道排空超时({}秒)，剩余事件被放弃",
                    drain_timeout.as_secs()
                );
                for worker in self.workers {
                    worker.abort();
                }
            }
        }
    }
}

//! 分片串行执行器的并发性质验证

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use quant_decision::trading::executor::{InstanceKey, StripedSerialExecutor};

/// 同一 key 的任务按提交顺序串行执行，执行区间互不重叠
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_key_tasks_run_serially_in_order() {
    let executor = Arc::new(StripedSerialExecutor::new(4, 256));
    let key = InstanceKey::new(7, 11).unwrap();

    let observed = Arc::new(Mutex::new(Vec::new()));
    let in_flight = Arc::new(AtomicBool::new(false));
    let overlap = Arc::new(AtomicBool::new(false));

    for seq in 0..100u64 {
        let observed = Arc::clone(&observed);
        let in_flight = Arc::clone(&in_flight);
        let overlap = Arc::clone(&overlap);
        executor
            .submit(&key, async move {
                if in_flight.swap(true, Ordering::SeqCst) {
                    overlap.store(true, Ordering::SeqCst);
                }
                // 拉长执行区间，重叠更容易暴露
                tokio::time::sleep(Duration::from_micros(200)).await;
                observed.lock().unwrap().push(seq);
                in_flight.store(false, Ordering::SeqCst);
            })
            .await;
    }

    // 用阻塞提交收尾，等待队列排空
    executor.execute(&key, async {}).await.unwrap();

    assert!(!overlap.load(Ordering::SeqCst), "任务执行区间出现重叠");
    let observed = observed.lock().unwrap();
    assert_eq!(*observed, (0..100u64).collect::<Vec<_>>(), "执行顺序偏离提交顺序");
}

/// 不同 key 可并行：慢任务不拖住另一分片上的任务
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_different_stripes_run_in_parallel() {
    let executor = Arc::new(StripedSerialExecutor::new(8, 64));

    // 找两个落在不同分片上的 key
    let key_a = InstanceKey::new(1, 1).unwrap();
    let mut key_b = InstanceKey::new(2, 1).unwrap();
    for strategy_id in 2..64 {
        let candidate = InstanceKey::new(strategy_id, 1).unwrap();
        if executor.stripe_of(&candidate) != executor.stripe_of(&key_a) {
            key_b = candidate;
            break;
        }
    }
    assert_ne!(executor.stripe_of(&key_a), executor.stripe_of(&key_b));

    executor
        .submit(&key_a, async {
            tokio::time::sleep(Duration::from_millis(500)).await;
        })
        .await;

    let start = tokio::time::Instant::now();
    executor.execute(&key_b, async {}).await.unwrap();
    assert!(
        start.elapsed() < Duration::from_millis(300),
        "不同分片的任务被慢任务拖住了"
    );
}

/// 单个任务 panic 不影响其他实例，也不杀死所在分片的工作者
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_panicked_task_is_isolated() {
    let executor = Arc::new(StripedSerialExecutor::new(4, 64));
    let key_a = InstanceKey::new(1, 1).unwrap();
    let key_b = InstanceKey::new(2, 2).unwrap();

    executor
        .submit(&key_a, async {
            panic!("注入的任务失败");
        })
        .await;

    // 同分片的后续任务仍然执行
    let value = executor.execute(&key_a, async { 41 + 1 }).await.unwrap();
    assert_eq!(value, 42);

    // 其他 key 不受影响
    let value = executor.execute(&key_b, async { "ok" }).await.unwrap();
    assert_eq!(value, "ok");
}

/// 队列打满退化为调用方就地执行，任务不丢
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_saturated_queue_falls_back_to_caller_runs() {
    let executor = Arc::new(StripedSerialExecutor::new(1, 1));
    let key = InstanceKey::new(3, 3).unwrap();
    let completed = Arc::new(AtomicUsize::new(0));

    let total = 50usize;
    for _ in 0..total {
        let completed = Arc::clone(&completed);
        executor
            .submit(&key, async move {
                tokio::time::sleep(Duration::from_millis(1)).await;
                completed.fetch_add(1, Ordering::SeqCst);
            })
            .await;
    }

    executor.execute(&key, async {}).await.unwrap();
    assert_eq!(completed.load(Ordering::SeqCst), total, "饱和场景下出现任务丢失");
}

/// 关闭排空已入队任务
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shutdown_drains_queued_tasks() {
    let executor = Arc::new(StripedSerialExecutor::new(2, 64));
    let key = InstanceKey::new(5, 5).unwrap();
    let completed = Arc::new(AtomicUsize::new(0));

    for _ in 0..20 {
        let completed = Arc::clone(&completed);
        executor
            .submit(&key, async move {
                completed.fetch_add(1, Ordering::SeqCst);
            })
            .await;
    }

    executor.shutdown(Duration::from_secs(5)).await;
    assert_eq!(completed.load(Ordering::SeqCst), 20);
}

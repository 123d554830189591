// ==========================================
// 玻璃深加工生产执行系统 - 优化队列轮询
// ==========================================
// 职责: 后台定期刷新待优化玻璃层列表，通过 watch 通道发布快照
// 触发: 定时 tick / refresh_now() 手动刷新
// 红线: 刷新失败保留上一次列表与刷新时间，只更新 error
// ==========================================

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::api::OptimizationApi;
use crate::domain::layer::ProductLayer;

/// 队列快照
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueSnapshot {
    pub layers: Vec<ProductLayer>,
    /// 最近一次成功刷新的时间（None = 尚未成功刷新）
    pub refreshed_at: Option<NaiveDateTime>,
    /// 最近一次刷新的错误（成功后清空）
    pub error: Option<String>,
    /// 最近一次失败的时间
    pub failed_at: Option<NaiveDateTime>,
}

impl QueueSnapshot {
    /// 列表是否来自失败前的旧结果
    pub fn is_stale(&self) -> bool {
        self.error.is_some()
    }
}

// ==========================================
// OptimizationQueuePoller - 优化队列轮询器
// ==========================================
pub struct OptimizationQueuePoller {
    snapshot_rx: watch::Receiver<QueueSnapshot>,
    refresh: Arc<Notify>,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl OptimizationQueuePoller {
    /// 启动轮询任务（首个 tick 立即触发一次刷新）
    pub fn spawn(api: Arc<OptimizationApi>, interval: Duration) -> Self {
        let (snapshot_tx, snapshot_rx) = watch::channel(QueueSnapshot::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let refresh = Arc::new(Notify::new());

        let handle = tokio::spawn(run_loop(
            api,
            interval,
            snapshot_tx,
            shutdown_rx,
            refresh.clone(),
        ));
        info!(interval_secs = interval.as_secs(), "优化队列轮询已启动");

        Self {
            snapshot_rx,
            refresh,
            shutdown_tx,
            handle,
        }
    }

    /// 订阅快照变化
    pub fn subscribe(&self) -> watch::Receiver<QueueSnapshot> {
        self.snapshot_rx.clone()
    }

    /// 最新快照
    pub fn latest(&self) -> QueueSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// 立即刷新（不等待下一个 tick）
    pub fn refresh_now(&self) {
        self.refresh.notify_one();
    }

    /// 停止轮询并等待任务退出
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "优化队列轮询任务异常退出");
        }
        info!("优化队列轮询已停止");
    }
}

async fn run_loop(
    api: Arc<OptimizationApi>,
    interval: Duration,
    snapshot_tx: watch::Sender<QueueSnapshot>,
    mut shutdown_rx: watch::Receiver<bool>,
    refresh: Arc<Notify>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = refresh.notified() => {
                debug!("收到手动刷新请求");
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
                continue;
            }
        }

        let previous = snapshot_tx.borrow().clone();
        let snapshot = refresh_snapshot(api.clone(), previous).await;
        snapshot_tx.send_replace(snapshot);
    }
}

async fn refresh_snapshot(api: Arc<OptimizationApi>, previous: QueueSnapshot) -> QueueSnapshot {
    let now = Some(Utc::now().naive_utc());

    // 仓储为同步 SQLite 访问，放到阻塞线程池
    let result = tokio::task::spawn_blocking(move || api.list_queue())
        .await
        .map_err(|e| e.to_string())
        .and_then(|r| r.map_err(|e| e.to_string()));

    match result {
        Ok(layers) => {
            debug!(count = layers.len(), "优化队列已刷新");
            QueueSnapshot {
                layers,
                refreshed_at: now,
                error: None,
                failed_at: None,
            }
        }
        Err(error) => {
            warn!(error = %error, "优化队列刷新失败，保留上一次结果");
            QueueSnapshot {
                error: Some(error),
                failed_at: now,
                ..previous
            }
        }
    }
}

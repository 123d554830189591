// ==========================================
// 优化队列轮询测试
// ==========================================
// 职责: 验证首次刷新、手动刷新与停止
// ==========================================


mod helpers;

#[cfg(test)]
mod queue_poller_test {
    use glass_mes::api::{AdvanceRequest, OptimizationApi};
    use glass_mes::app::OptimizationQueuePoller;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    use crate::helpers::mock_config::MockConfig;
    use crate::test_helpers::{make_layer, seed_standard_line, setup_env};

    #[tokio::test]
    async fn test_poller_publishes_snapshots() {
        glass_mes::logging::init_test();
        let dir = tempfile::tempdir().unwrap();
        let env = setup_env();
        seed_standard_line(&env.line_repo);
        env.production_api
            .create_layer(&make_layer("layer1", "P-001", Some((2025, 3, 3))))
            .unwrap();

        let api = Arc::new(OptimizationApi::new(
            env.production_api.clone(),
            Arc::new(MockConfig::exporting_to(dir.path())),
        ));

        // 间隔足够长，后续刷新只能来自 refresh_now()
        let poller = OptimizationQueuePoller::spawn(api, Duration::from_secs(3600));
        let mut updates = poller.subscribe();

        // 首个 tick 立即刷新
        timeout(Duration::from_secs(5), updates.changed())
            .await
            .expect("initial refresh")
            .unwrap();
        {
            let snapshot = updates.borrow_and_update();
            assert!(snapshot.refreshed_at.is_some());
            assert!(snapshot.error.is_none());
            assert!(snapshot.layers.is_empty());
        }

        for _ in 0..2 {
            env.production_api
                .advance_layer(AdvanceRequest::passed("layer1"))
                .unwrap();
        }
        poller.refresh_now();

        timeout(Duration::from_secs(5), updates.changed())
            .await
            .expect("manual refresh")
            .unwrap();
        let latest = poller.latest();
        assert_eq!(latest.layers.len(), 1);
        assert_eq!(latest.layers[0].id, "layer1");

        timeout(Duration::from_secs(5), poller.shutdown())
            .await
            .expect("shutdown");
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_layers() {
        glass_mes::logging::init_test();
        let dir = tempfile::tempdir().unwrap();
        let env = setup_env();
        seed_standard_line(&env.line_repo);
        env.production_api
            .create_layer(&make_layer("layer1", "P-001", Some((2025, 3, 3))))
            .unwrap();
        for _ in 0..2 {
            env.production_api
                .advance_layer(AdvanceRequest::passed("layer1"))
                .unwrap();
        }

        let api = Arc::new(OptimizationApi::new(
            env.production_api.clone(),
            Arc::new(MockConfig::exporting_to(dir.path())),
        ));
        let poller = OptimizationQueuePoller::spawn(api, Duration::from_secs(3600));
        let mut updates = poller.subscribe();

        timeout(Duration::from_secs(5), updates.changed())
            .await
            .expect("initial refresh")
            .unwrap();
        let first = updates.borrow_and_update().clone();
        assert_eq!(first.layers.len(), 1);
        assert!(!first.is_stale());

        // 玻璃层表不可读 → 刷新失败
        env.conn
            .lock()
            .unwrap()
            .execute_batch("ALTER TABLE product_layer RENAME TO product_layer_offline")
            .unwrap();
        poller.refresh_now();

        timeout(Duration::from_secs(5), updates.changed())
            .await
            .expect("failed refresh")
            .unwrap();
        let failed = updates.borrow_and_update().clone();
        assert!(failed.is_stale());
        assert!(failed.error.is_some());
        assert!(failed.failed_at.is_some());
        assert_eq!(failed.layers.len(), 1);
        assert_eq!(failed.layers[0].id, "layer1");
        assert_eq!(failed.refreshed_at, first.refreshed_at);

        // 恢复后错误清空
        env.conn
            .lock()
            .unwrap()
            .execute_batch("ALTER TABLE product_layer_offline RENAME TO product_layer")
            .unwrap();
        poller.refresh_now();

        timeout(Duration::from_secs(5), updates.changed())
            .await
            .expect("recovered refresh")
            .unwrap();
        let recovered = poller.latest();
        assert!(recovered.error.is_none());
        assert_eq!(recovered.layers.len(), 1);
        assert!(recovered.refreshed_at >= first.refreshed_at);

        timeout(Duration::from_secs(5), poller.shutdown())
            .await
            .expect("shutdown");
    }
}

// ==========================================
// 优化导出集成测试
// ==========================================
// 职责: 验证优化队列 → TRF 文件生成 → 导出后推进
// ==========================================


mod helpers;

#[cfg(test)]
mod optimization_export_test {
    use chrono::{NaiveDate, NaiveDateTime};
    use glass_mes::api::{AdvanceRequest, ApiError, OptimizationApi, TrfExportRequest};
    use std::sync::Arc;

    use crate::helpers::mock_config::MockConfig;
    use crate::test_helpers::{make_layer, seed_standard_line, setup_env, TestEnv};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 5)
            .unwrap()
            .and_hms_milli_opt(14, 30, 15, 42)
            .unwrap()
    }

    /// layer-a/b/c 推进到优化工序，layer-d 停在裁切
    fn setup(export_dir: &std::path::Path) -> (TestEnv, OptimizationApi) {
        glass_mes::logging::init_test();
        let env = setup_env();
        seed_standard_line(&env.line_repo);

        let layers = [
            ("layer-a", "P-003", Some((2025, 3, 4)), 2),
            ("layer-b", "P-001", Some((2025, 3, 1)), 2),
            ("layer-c", "P-002", None, 2),
            ("layer-d", "P-004", Some((2025, 2, 1)), 1),
        ];
        for (id, code, date, steps) in layers {
            env.production_api.create_layer(&make_layer(id, code, date)).unwrap();
            for _ in 0..steps {
                env.production_api
                    .advance_layer(AdvanceRequest::passed(id))
                    .unwrap();
            }
        }

        let api = OptimizationApi::new(
            env.production_api.clone(),
            Arc::new(MockConfig::exporting_to(export_dir)),
        );
        (env, api)
    }

    #[test]
    fn test_queue_sorted_by_production_date() {
        let dir = tempfile::tempdir().unwrap();
        let (_env, api) = setup(dir.path());

        let queue = api.list_queue().unwrap();
        let ids: Vec<_> = queue.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["layer-b", "layer-a", "layer-c"]);
    }

    #[tokio::test]
    async fn test_generate_trf_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let (_env, api) = setup(dir.path());

        let ids = vec!["layer-a".to_string(), "layer-b".to_string()];
        let response = api.generate_trf_for_layers(&ids, now()).await.unwrap();

        assert_eq!(response.file_name, "LISEC-20250305-143015-042.TRF");
        assert_eq!(
            response.download_url,
            "https://mes.local/exports/trf/LISEC-20250305-143015-042.TRF"
        );
        assert_eq!(response.layer_count, 2);
        assert_eq!(response.order_count, 1);

        let content = std::fs::read_to_string(&response.file_path).unwrap();
        assert!(content.starts_with("<REL>2.10    \r\n"));
        assert_eq!(content.matches("<ORD>").count(), 1);
        assert_eq!(content.matches("<POS>").count(), 2);
        assert!(content.contains("TEMPER:1"));
        assert!(content.ends_with("\r\n"));

        // 组内按条码编号排序
        assert!(content.find("P-001").unwrap() < content.find("P-003").unwrap());
    }

    #[tokio::test]
    async fn test_missing_or_empty_selection_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (_env, api) = setup(dir.path());

        let err = api
            .generate_trf(TrfExportRequest { layers: None }, now())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));

        let err = api
            .generate_trf(TrfExportRequest { layers: Some(vec![]) }, now())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));

        let err = api
            .generate_trf_for_layers(&["ghost".to_string()], now())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_export_then_advance_out_of_optimizer() {
        let dir = tempfile::tempdir().unwrap();
        let (env, api) = setup(dir.path());

        let queue_ids: Vec<String> = api.list_queue().unwrap().into_iter().map(|l| l.id).collect();
        api.generate_trf_for_layers(&queue_ids, now()).await.unwrap();

        let mut ids = queue_ids.clone();
        ids.push("layer-d".to_string());
        let report = api.advance_exported(&ids);

        assert_eq!(report.succeeded_count(), 3);
        assert_eq!(report.failed_layer_ids(), vec!["layer-d".to_string()]);
        assert!(api.list_queue().unwrap().is_empty());

        for id in &queue_ids {
            let layer = env.production_api.get_layer(id).unwrap();
            assert_eq!(layer.current_step_id(), Some("s3"));
        }
    }
}

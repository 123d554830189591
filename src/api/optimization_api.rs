// ==========================================
// 玻璃深加工生产执行系统 - 优化导出 API
// ==========================================
// 职责: 优化队列查询、TRF 文件生成、导出后推进
// 输出: TRF 文件写入配置的导出目录，返回下载地址
// ==========================================

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::production_api::{AdvanceRequest, BatchAdvanceReport, ProductionApi};
use crate::config::MesConfigReader;
use crate::domain::layer::ProductLayer;
use crate::engine::optimization_queue::{is_awaiting_optimization, select_for_optimization};
use crate::engine::trf_encoder::TrfEncoder;

/// TRF 导出请求（layers 缺失与空列表均被拒绝）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrfExportRequest {
    #[serde(default)]
    pub layers: Option<Vec<ProductLayer>>,
}

/// TRF 导出响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrfExportResponse {
    pub file_name: String,
    pub file_path: String,
    pub download_url: String,
    pub layer_count: usize,
    pub order_count: usize,
}

// ==========================================
// OptimizationApi - 优化导出 API
// ==========================================
pub struct OptimizationApi {
    production: Arc<ProductionApi>,
    config: Arc<dyn MesConfigReader>,
    encoder: TrfEncoder,
}

impl OptimizationApi {
    pub fn new(production: Arc<ProductionApi>, config: Arc<dyn MesConfigReader>) -> Self {
        Self {
            production,
            config,
            encoder: TrfEncoder::new(),
        }
    }

    /// 待优化玻璃层（当前工序为优化工序，按投产日期升序）
    pub fn list_queue(&self) -> ApiResult<Vec<ProductLayer>> {
        let layers = self.production.list_layers()?;
        Ok(select_for_optimization(&layers))
    }

    /// 生成 TRF 文件
    ///
    /// # 参数
    /// - request: 选中的玻璃层（需已填充 glass / invoice / treatments）
    /// - now: 生成时刻
    ///
    /// # 返回
    /// - Ok(TrfExportResponse): 文件名、落盘路径、下载地址
    /// - Err(ApiError::ValidationError): layers 缺失或为空
    /// - Err(ApiError::ExportError): 目录创建或写入失败
    #[instrument(skip(self, request))]
    pub async fn generate_trf(
        &self,
        request: TrfExportRequest,
        now: NaiveDateTime,
    ) -> ApiResult<TrfExportResponse> {
        let document = self.encoder.encode_selection(request.layers.as_deref(), now)?;

        let export_dir = self
            .config
            .get_trf_export_dir()
            .await
            .map_err(|e| ApiError::InternalError(format!("读取导出目录配置失败: {}", e)))?;
        let base_url = self
            .config
            .get_trf_download_base_url()
            .await
            .map_err(|e| ApiError::InternalError(format!("读取下载地址配置失败: {}", e)))?;

        let export_dir = PathBuf::from(export_dir);
        tokio::fs::create_dir_all(&export_dir)
            .await
            .map_err(|e| {
                ApiError::ExportError(format!("创建目录{}失败: {}", export_dir.display(), e))
            })?;

        let file_path = export_dir.join(&document.file_name);
        tokio::fs::write(&file_path, document.content.as_bytes())
            .await
            .map_err(|e| ApiError::ExportError(format!("写入{}失败: {}", file_path.display(), e)))?;

        info!(
            file_name = %document.file_name,
            layer_count = document.layer_count,
            order_count = document.order_count,
            file_path = %file_path.display(),
            "TRF 文件已写入"
        );

        Ok(TrfExportResponse {
            download_url: format!("{}/{}", base_url.trim_end_matches('/'), document.file_name),
            file_path: file_path.to_string_lossy().to_string(),
            file_name: document.file_name,
            layer_count: document.layer_count,
            order_count: document.order_count,
        })
    }

    /// 按玻璃层ID生成 TRF（任一ID不存在 → NotFound）
    pub async fn generate_trf_for_layers(
        &self,
        layer_ids: &[String],
        now: NaiveDateTime,
    ) -> ApiResult<TrfExportResponse> {
        let layers = layer_ids
            .iter()
            .map(|id| self.production.get_layer(id))
            .collect::<ApiResult<Vec<_>>>()?;

        self.generate_trf(TrfExportRequest { layers: Some(layers) }, now).await
    }

    /// 导出后推进: 将仍停留在优化工序的玻璃层推进到下一工序
    #[instrument(skip(self, layer_ids), fields(count = layer_ids.len()))]
    pub fn advance_exported(&self, layer_ids: &[String]) -> BatchAdvanceReport {
        let mut report = BatchAdvanceReport::default();

        for layer_id in layer_ids {
            let result = self.production.get_layer(layer_id).and_then(|layer| {
                if !is_awaiting_optimization(&layer) {
                    return Err(ApiError::BusinessRuleViolation(format!(
                        "玻璃层{}不在优化工序",
                        layer.id
                    )));
                }
                let request =
                    AdvanceRequest::passed(&layer.id).expecting(layer.current_step_id());
                self.production.advance_layer(request)
            });
            report.push_result(layer_id.trim(), result);
        }

        info!(
            succeeded = report.succeeded_count(),
            failed = report.failed_count(),
            "导出后推进完成"
        );
        report
    }
}

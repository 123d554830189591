// ==========================================
// 玻璃深加工生产执行系统 - 生产流转 API
// ==========================================
// 职责: 扫码查询、工序推进、批量推进、执行记录、库位调整
// 红线: 推进位置与记录历史分离; 推进使用条件更新，竞争失败不写记录
// ==========================================

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::layer::ProductLayer;
use crate::domain::production_line::{ProductionLine, Step};
use crate::domain::reference::{normalize_id, Ref};
use crate::domain::step_execution::{StepExecution, StepExecutionDraft};
use crate::domain::treatment::TreatmentApplication;
use crate::domain::types::ExecutionPhase;
use crate::engine::next_step::{NextStepDecision, NextStepResolver};
use crate::engine::step_locator::{flatten, locate};
use crate::engine::step_recorder::StepRecorder;
use crate::repository::product_layer_repo::ProductLayerRepository;
use crate::repository::production_line_repo::ProductionLineRepository;
use crate::repository::step_execution_repo::StepExecutionRepository;

// ==========================================
// 请求 / 响应类型
// ==========================================

/// 扫码结果
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub layer: ProductLayer,
    pub current_step: Option<Step>,
    pub decision: NextStepDecision,
}

/// 推进请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvanceRequest {
    pub layer_id: String,
    /// 调用方看到的当前工序; Some("") 表示期望尚未开始; None 不校验
    #[serde(default)]
    pub expected_current_step: Option<String>,
    pub passed: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub treatments_applied: Vec<TreatmentApplication>,
}

impl AdvanceRequest {
    pub fn passed(layer_id: &str) -> Self {
        Self {
            layer_id: layer_id.to_string(),
            passed: true,
            ..Default::default()
        }
    }

    pub fn expecting(mut self, step_id: Option<&str>) -> Self {
        self.expected_current_step = Some(step_id.unwrap_or_default().to_string());
        self
    }
}

/// 推进结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdvanceOutcome {
    Advanced {
        from: Option<String>,
        to: String,
        is_new_micro_line: bool,
        revision: i32,
        /// 当前工序不在产线内、已回退到首工序时为该旧工序ID
        #[serde(default)]
        fallback_from: Option<String>,
    },
    /// 已在末工序，产线完成
    Completed { at_step: String },
    /// 不合格，停留在当前工序等待返工
    HeldForRework { at_step: String },
}

impl AdvanceOutcome {
    /// 回退到首工序的警告（其他情况为 None）
    pub fn warning(&self) -> Option<String> {
        match self {
            AdvanceOutcome::Advanced {
                fallback_from: Some(stale),
                to,
                ..
            } => Some(format!(
                "当前工序 {} 不在产线定义中，已回退到首工序 {}",
                stale, to
            )),
            _ => None,
        }
    }
}

/// 批量推进的单项结果
#[derive(Debug, Clone, Serialize)]
pub struct BatchAdvanceItem {
    pub layer_id: String,
    pub succeeded: bool,
    pub outcome: Option<AdvanceOutcome>,
    pub warning: Option<String>,
    pub error: Option<String>,
}

/// 批量推进报告（逐项结果，非全有全无）
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchAdvanceReport {
    pub items: Vec<BatchAdvanceItem>,
}

impl BatchAdvanceReport {
    pub fn push_result(&mut self, layer_id: &str, result: ApiResult<AdvanceOutcome>) {
        let item = match result {
            Ok(outcome) => BatchAdvanceItem {
                layer_id: layer_id.to_string(),
                succeeded: true,
                warning: outcome.warning(),
                outcome: Some(outcome),
                error: None,
            },
            Err(e) => {
                warn!(layer_id = %layer_id, error = %e, "批量推进单项失败");
                BatchAdvanceItem {
                    layer_id: layer_id.to_string(),
                    succeeded: false,
                    outcome: None,
                    warning: None,
                    error: Some(e.to_string()),
                }
            }
        };
        self.items.push(item);
    }

    pub fn succeeded_count(&self) -> usize {
        self.items.iter().filter(|i| i.succeeded).count()
    }

    pub fn failed_count(&self) -> usize {
        self.items.len() - self.succeeded_count()
    }

    /// 带警告的成功项（如回退到首工序）
    pub fn warnings(&self) -> Vec<(String, String)> {
        self.items
            .iter()
            .filter_map(|i| i.warning.clone().map(|w| (i.layer_id.clone(), w)))
            .collect()
    }

    /// 失败项的玻璃层ID（用于重试）
    pub fn failed_layer_ids(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|i| !i.succeeded)
            .map(|i| i.layer_id.clone())
            .collect()
    }
}

/// 仅记录执行结果（不移动玻璃层）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordOutcomeRequest {
    pub layer_id: String,
    /// 缺省为玻璃层当前工序
    #[serde(default)]
    pub step_id: Option<String>,
    pub passed: bool,
    #[serde(default)]
    pub phase: Option<ExecutionPhase>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub treatments_applied: Vec<TreatmentApplication>,
}

// ==========================================
// ProductionApi - 生产流转 API
// ==========================================
pub struct ProductionApi {
    layer_repo: Arc<ProductLayerRepository>,
    line_repo: Arc<ProductionLineRepository>,
    execution_repo: Arc<StepExecutionRepository>,
    recorder: StepRecorder<Arc<StepExecutionRepository>>,
    resolver: NextStepResolver,
}

impl ProductionApi {
    pub fn new(
        layer_repo: Arc<ProductLayerRepository>,
        line_repo: Arc<ProductionLineRepository>,
        execution_repo: Arc<StepExecutionRepository>,
    ) -> Self {
        Self {
            layer_repo,
            line_repo,
            recorder: StepRecorder::new(execution_repo.clone()),
            execution_repo,
            resolver: NextStepResolver::new(),
        }
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 扫码: 按条码编号查询玻璃层、当前工序与下一工序决策
    #[instrument(skip(self))]
    pub fn scan(&self, production_code: &str) -> ApiResult<ScanResult> {
        if production_code.trim().is_empty() {
            return Err(ApiError::InvalidInput("条码编号不能为空".to_string()));
        }

        let layer = self
            .layer_repo
            .find_by_production_code(production_code)?
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "条码{}对应的玻璃层不存在",
                    production_code.trim()
                ))
            })?;
        let layer = self.resolve_layer(layer)?;
        let decision = self.resolver.resolve(&layer);

        Ok(ScanResult {
            current_step: layer.resolved_current_step().cloned(),
            layer,
            decision,
        })
    }

    /// 查询玻璃层（产线与当前工序已填充）
    pub fn get_layer(&self, layer_id: &str) -> ApiResult<ProductLayer> {
        let layer = self
            .layer_repo
            .find_by_id(layer_id)?
            .ok_or_else(|| layer_not_found(layer_id))?;
        self.resolve_layer(layer)
    }

    /// 玻璃层执行历史（时间升序）
    pub fn list_executions(&self, layer_id: &str) -> ApiResult<Vec<StepExecution>> {
        Ok(self.execution_repo.find_by_layer(layer_id)?)
    }

    /// 全部玻璃层（产线与当前工序已填充）
    pub fn list_layers(&self) -> ApiResult<Vec<ProductLayer>> {
        let layers = self.layer_repo.list_all()?;
        self.resolve_layers(layers)
    }

    // ==========================================
    // 投产
    // ==========================================

    /// 登记新玻璃层（尚未开始）
    pub fn create_layer(&self, layer: &ProductLayer) -> ApiResult<()> {
        if layer.id.trim().is_empty() {
            return Err(ApiError::InvalidInput("玻璃层ID不能为空".to_string()));
        }
        if layer.production_code.trim().is_empty() {
            return Err(ApiError::InvalidInput("条码编号不能为空".to_string()));
        }
        if layer.production_line_id().map(str::is_empty).unwrap_or(true) {
            return Err(ApiError::InvalidInput(format!(
                "玻璃层{}未指定产线",
                layer.id.trim()
            )));
        }

        self.layer_repo.insert(layer)?;
        info!(
            layer_id = %layer.id.trim(),
            production_code = %layer.production_code.trim(),
            "玻璃层已登记"
        );
        Ok(())
    }

    // ==========================================
    // 推进
    // ==========================================

    /// 推进单个玻璃层
    ///
    /// # 流程
    /// 1. 加载并填充玻璃层
    /// 2. 校验调用方看到的当前工序
    /// 3. 解析下一工序（产线缺失/为空 → 拒绝）
    /// 4. 不合格 → 记录失败，停留当前工序
    /// 5. 末工序 → 记录完成
    /// 6. 条件更新 current_step，成功后记录旧工序完成与新工序进入
    #[instrument(skip(self, request), fields(layer_id = %request.layer_id))]
    pub fn advance_layer(&self, request: AdvanceRequest) -> ApiResult<AdvanceOutcome> {
        if request.layer_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("玻璃层ID不能为空".to_string()));
        }

        let layer = self.get_layer(&request.layer_id)?;
        let current_step_id = layer.current_step_id().map(str::to_string);

        if let Some(expected) = request.expected_current_step.as_deref() {
            let expected = Some(normalize_id(expected)).filter(|s| !s.is_empty());
            if expected != current_step_id.as_deref() {
                return Err(ApiError::StaleLayerPosition {
                    layer_id: layer.id.clone(),
                    expected: expected.map(str::to_string),
                    actual: current_step_id,
                });
            }
        }

        let decision = self.resolver.resolve(&layer);
        if decision.cannot_progress() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "玻璃层{}无法推进: 产线缺失或未定义工序 ({:?})",
                layer.id, decision.status
            )));
        }
        let line_id = layer.production_line_id().unwrap_or_default().to_string();
        let is_fallback = decision.is_fallback();
        let fallback_from = current_step_id.clone().filter(|_| is_fallback);

        if !request.passed {
            let at_step = current_step_id.ok_or_else(|| {
                ApiError::InvalidInput(format!("玻璃层{}尚未开始，不能记录不合格", layer.id))
            })?;
            self.recorder.record(
                StepExecutionDraft::new(&layer.id, &at_step, &line_id, false)
                    .with_phase(ExecutionPhase::Completed)
                    .with_notes(request.notes)
                    .with_treatments(request.treatments_applied),
            )?;
            info!(layer_id = %layer.id, step_id = %at_step, "不合格，等待返工");
            return Ok(AdvanceOutcome::HeldForRework { at_step });
        }

        let next = match decision.next {
            Some(next) => next,
            None => {
                let at_step = current_step_id.unwrap_or_default();
                self.recorder.record(
                    StepExecutionDraft::new(&layer.id, &at_step, &line_id, true)
                        .with_notes(request.notes)
                        .with_treatments(request.treatments_applied),
                )?;
                info!(layer_id = %layer.id, step_id = %at_step, "产线已完成");
                return Ok(AdvanceOutcome::Completed { at_step });
            }
        };

        let revision = self.layer_repo.advance(
            &layer.id,
            current_step_id.as_deref(),
            layer.revision,
            &next.step_id,
        )?;

        // 回退场景下旧工序不在产线内，不为其记录完成
        if let (Some(from), false) = (current_step_id.as_deref(), is_fallback) {
            self.recorder.record(
                StepExecutionDraft::new(&layer.id, from, &line_id, true)
                    .with_notes(request.notes)
                    .with_treatments(request.treatments_applied),
            )?;
        }
        self.recorder.record(
            StepExecutionDraft::new(&layer.id, &next.step_id, &line_id, false)
                .with_phase(ExecutionPhase::Entered),
        )?;

        info!(
            layer_id = %layer.id,
            from = ?current_step_id,
            to = %next.step_id,
            is_new_micro_line = next.is_new_micro_line,
            fallback = is_fallback,
            "玻璃层已推进"
        );

        Ok(AdvanceOutcome::Advanced {
            from: current_step_id,
            to: next.step_id,
            is_new_micro_line: next.is_new_micro_line,
            revision,
            fallback_from,
        })
    }

    /// 批量推进（逐项独立，失败项不影响其他项）
    #[instrument(skip(self, requests), fields(count = requests.len()))]
    pub fn advance_batch(&self, requests: Vec<AdvanceRequest>) -> BatchAdvanceReport {
        let mut report = BatchAdvanceReport::default();
        for request in requests {
            let layer_id = normalize_id(&request.layer_id).to_string();
            let result = self.advance_layer(request);
            report.push_result(&layer_id, result);
        }

        info!(
            succeeded = report.succeeded_count(),
            failed = report.failed_count(),
            "批量推进完成"
        );
        report
    }

    /// 仅记录执行结果，不移动玻璃层
    pub fn record_outcome(&self, request: RecordOutcomeRequest) -> ApiResult<StepExecution> {
        let layer = self
            .layer_repo
            .find_by_id(&request.layer_id)?
            .ok_or_else(|| layer_not_found(&request.layer_id))?;

        let step_id = request
            .step_id
            .as_deref()
            .map(normalize_id)
            .filter(|s| !s.is_empty())
            .or_else(|| layer.current_step_id())
            .map(str::to_string)
            .ok_or_else(|| {
                ApiError::InvalidInput(format!("玻璃层{}尚未开始且未指定工序", layer.id))
            })?;
        let line_id = layer.production_line_id().unwrap_or_default().to_string();

        let mut draft = StepExecutionDraft::new(&layer.id, &step_id, &line_id, request.passed)
            .with_notes(request.notes)
            .with_treatments(request.treatments_applied);
        if let Some(phase) = request.phase {
            draft = draft.with_phase(phase);
        }

        Ok(self.recorder.record(draft)?)
    }

    /// 调整暂存库位
    pub fn assign_inventory(&self, layer_id: &str, inventory_id: Option<&str>) -> ApiResult<()> {
        if layer_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("玻璃层ID不能为空".to_string()));
        }
        let inventory_id = inventory_id.map(str::trim).filter(|s| !s.is_empty());
        self.layer_repo.assign_inventory(layer_id, inventory_id)?;
        info!(layer_id = %layer_id.trim(), inventory_id = ?inventory_id, "库位已调整");
        Ok(())
    }

    // ==========================================
    // 关联填充
    // ==========================================

    pub fn resolve_layer(&self, layer: ProductLayer) -> ApiResult<ProductLayer> {
        let mut cache = HashMap::new();
        self.resolve_with_cache(layer, &mut cache)
    }

    /// 批量填充（同一产线只加载一次）
    pub fn resolve_layers(&self, layers: Vec<ProductLayer>) -> ApiResult<Vec<ProductLayer>> {
        let mut cache = HashMap::new();
        layers
            .into_iter()
            .map(|layer| self.resolve_with_cache(layer, &mut cache))
            .collect()
    }

    fn resolve_with_cache(
        &self,
        mut layer: ProductLayer,
        cache: &mut HashMap<String, Option<ProductionLine>>,
    ) -> ApiResult<ProductLayer> {
        if let Some(Ref::Id(line_id)) = layer.production_line.as_ref() {
            let line_id = normalize_id(line_id).to_string();
            let line = match cache.get(&line_id) {
                Some(line) => line.clone(),
                None => {
                    let line = self.line_repo.find_production_line(&line_id)?;
                    cache.insert(line_id, line.clone());
                    line
                }
            };
            if let Some(line) = line {
                layer.production_line = Some(Ref::Resolved(line));
            }
        }

        if let Some(Ref::Id(step_id)) = layer.current_step.as_ref() {
            let in_line = layer
                .production_line
                .as_ref()
                .and_then(|l| l.resolved())
                .and_then(|line| {
                    locate(&flatten(line), step_id).map(|located| located.step.clone())
                })
                .filter(|step| step.is_resolved());

            let step = match in_line {
                Some(step) => Some(step),
                None => self.line_repo.find_step(step_id)?.map(Ref::Resolved),
            };
            if let Some(step) = step {
                layer.current_step = Some(step);
            }
        }

        Ok(layer)
    }
}

fn layer_not_found(layer_id: &str) -> ApiError {
    ApiError::NotFound(format!("ProductLayer(id={})不存在", normalize_id(layer_id)))
}

// ==========================================
// 玻璃深加工生产执行系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换Repository/编码器错误为用户可读的错误消息
// ==========================================

use crate::engine::trf_encoder::TrfError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
/// 所有错误信息必须包含显式原因
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("乐观锁冲突: {0}")]
    OptimisticLockFailure(String),

    /// 调用方看到的当前工序与实际不符（已被其他工位推进）
    #[error("玻璃层位置已变化: layer_id={layer_id}, expected={expected:?}, actual={actual:?}")]
    StaleLayerPosition {
        layer_id: String,
        expected: Option<String>,
        actual: Option<String>,
    },

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 导出错误
    // ==========================================
    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("文件导出失败: {0}")]
    ExportError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 是否为并发冲突（可刷新后重试）
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            ApiError::OptimisticLockFailure(_) | ApiError::StaleLayerPosition { .. }
        )
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 并发控制错误
            RepositoryError::OptimisticLockFailure {
                layer_id,
                expected,
                actual,
            } => ApiError::OptimisticLockFailure(format!(
                "玻璃层{}已被其他工位修改（期望revision={}，实际revision={}）",
                layer_id, expected, actual
            )),
            RepositoryError::StalePosition {
                layer_id,
                expected,
                actual,
            } => ApiError::StaleLayerPosition {
                layer_id,
                expected,
                actual,
            },

            // 数据库错误
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }

            // 数据质量错误
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }

            // 通用错误
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 TrfError 转换
// ==========================================
impl From<TrfError> for ApiError {
    fn from(err: TrfError) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let repo_err = RepositoryError::NotFound {
            entity: "ProductLayer".to_string(),
            id: "L001".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("ProductLayer"));
                assert!(msg.contains("L001"));
            }
            _ => panic!("Expected NotFound"),
        }

        let repo_err = RepositoryError::OptimisticLockFailure {
            layer_id: "L001".to_string(),
            expected: 1,
            actual: 2,
        };
        let api_err: ApiError = repo_err.into();
        assert!(api_err.is_conflict());
        match api_err {
            ApiError::OptimisticLockFailure(msg) => {
                assert!(msg.contains("L001"));
                assert!(msg.contains("已被其他工位修改"));
            }
            _ => panic!("Expected OptimisticLockFailure"),
        }

        let repo_err = RepositoryError::StalePosition {
            layer_id: "L001".to_string(),
            expected: Some("s1".to_string()),
            actual: Some("s2".to_string()),
        };
        assert!(matches!(
            ApiError::from(repo_err),
            ApiError::StaleLayerPosition { ref actual, .. } if actual.as_deref() == Some("s2")
        ));
    }

    #[test]
    fn test_trf_error_is_validation() {
        let api_err: ApiError = TrfError::EmptyBatch.into();
        assert!(matches!(api_err, ApiError::ValidationError(_)));
        assert!(!api_err.is_conflict());
    }
}

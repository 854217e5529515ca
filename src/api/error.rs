// ==========================================
// 校园教务选课系统 - API层错误类型
// ==========================================
// 职责: 将 Repository/Engine 错误转换为对外的业务错误,
//       并给出 HTTP 状态码提示 (实际 HTTP 层在本仓库之外)
// 约定: 所有错误信息必须包含显式原因, 可直接展示给学生/教务
// ==========================================

use crate::domain::krs::RejectionReason;
use crate::engine::error::EnrollmentError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ===== 输入与引用错误 =====
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ===== 业务结果错误 =====
    /// 提交被校验规则驳回 (HTTP 422), 逐项原因在 reasons 内
    #[error("选课提交被驳回: {}项原因", reasons.len())]
    RejectedSubmission { reasons: Vec<RejectionReason> },

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ===== 并发控制错误 =====
    /// 并发冲突且重试耗尽 (HTTP 409), 提示客户端稍后重试
    #[error("系统繁忙, 请稍后重试: {0}")]
    TryAgain(String),

    #[error("乐观锁冲突: {0}")]
    OptimisticLockFailure(String),

    // ===== 数据访问错误 =====
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 错误代码 (对外响应中的 code 字段)
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::RejectedSubmission { .. } => "SUBMISSION_REJECTED",
            ApiError::BusinessRuleViolation(_) => "BUSINESS_RULE_VIOLATION",
            ApiError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            ApiError::TryAgain(_) => "TRY_AGAIN",
            ApiError::OptimisticLockFailure(_) => "OPTIMISTIC_LOCK_FAILURE",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::Other(_) => "OTHER_ERROR",
        }
    }

    /// HTTP 状态码提示 (供外部 HTTP 层映射)
    ///
    /// 约定: 校验驳回 422, 并发冲突 409, 引用错误 404/400
    pub fn http_status(&self) -> u16 {
        match self {
            ApiError::InvalidInput(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::RejectedSubmission { .. } => 422,
            ApiError::BusinessRuleViolation(_) => 422,
            ApiError::InvalidStateTransition { .. } => 409,
            ApiError::TryAgain(_) => 409,
            ApiError::OptimisticLockFailure(_) => 409,
            ApiError::DatabaseError(_) => 500,
            ApiError::InternalError(_) => 500,
            ApiError::Other(_) => 500,
        }
    }

    /// 结构化补充信息 (对外响应中的 details 字段)
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::RejectedSubmission { reasons } => {
                Some(serde_json::json!({ "reasons": reasons }))
            }
            _ => None,
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::OptimisticLockFailure {
                krs_id,
                expected,
                actual,
            } => ApiError::OptimisticLockFailure(format!(
                "选课记录{}已被其他请求修改 (期望revision={}, 实际revision={})",
                krs_id, expected, actual
            )),
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg)
            | RepositoryError::DatabaseTransactionError(msg)
            | RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::BusinessRuleViolation(msg) => ApiError::BusinessRuleViolation(msg),
            RepositoryError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }
            RepositoryError::ValidationError(msg) => ApiError::InvalidInput(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 EnrollmentError 转换
// ==========================================
impl From<EnrollmentError> for ApiError {
    fn from(err: EnrollmentError) -> Self {
        match err {
            EnrollmentError::InvalidReference { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            EnrollmentError::ConcurrentModification { attempts } => ApiError::TryAgain(format!(
                "并发冲突, 已重试{}次仍失败",
                attempts
            )),
            EnrollmentError::DeadlinePassed { deadline } => {
                ApiError::BusinessRuleViolation(format!("已超过选课截止日期: {}", deadline))
            }
            EnrollmentError::StudentNotEligible { student_id, status } => {
                ApiError::BusinessRuleViolation(format!(
                    "学籍状态不允许选课: student_id={}, status={}",
                    student_id, status
                ))
            }
            EnrollmentError::Config(msg) => ApiError::InternalError(format!("配置读取失败: {}", msg)),
            EnrollmentError::Repository(repo_err) => repo_err.into(),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::RejectionKind;

    #[test]
    fn test_http_status_mapping() {
        let rejected = ApiError::RejectedSubmission {
            reasons: vec![RejectionReason::new(
                RejectionKind::CreditExceeded,
                "KRS-1",
                "超出学分上限",
            )],
        };
        assert_eq!(rejected.http_status(), 422);
        assert_eq!(rejected.error_code(), "SUBMISSION_REJECTED");
        assert!(rejected.details().is_some());

        assert_eq!(ApiError::TryAgain("busy".to_string()).http_status(), 409);
        assert_eq!(ApiError::NotFound("x".to_string()).http_status(), 404);
        assert_eq!(ApiError::InvalidInput("x".to_string()).http_status(), 400);
    }

    #[test]
    fn test_repository_error_conversion() {
        let repo_err = RepositoryError::NotFound {
            entity: "Krs".to_string(),
            id: "KRS-1".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("Krs"));
                assert!(msg.contains("KRS-1"));
            }
            _ => panic!("Expected NotFound"),
        }

        let repo_err = RepositoryError::OptimisticLockFailure {
            krs_id: "KRS-1".to_string(),
            expected: 1,
            actual: 2,
        };
        let api_err: ApiError = repo_err.into();
        assert!(matches!(api_err, ApiError::OptimisticLockFailure(_)));
        assert_eq!(api_err.http_status(), 409);
    }

    #[test]
    fn test_enrollment_error_conversion() {
        let err: ApiError = EnrollmentError::ConcurrentModification { attempts: 3 }.into();
        match &err {
            ApiError::TryAgain(msg) => assert!(msg.contains('3')),
            _ => panic!("Expected TryAgain"),
        }
        assert_eq!(err.http_status(), 409);

        let err: ApiError = EnrollmentError::InvalidReference {
            entity: "Course".to_string(),
            id: "C-1".to_string(),
        }
        .into();
        assert_eq!(err.http_status(), 404);
    }
}

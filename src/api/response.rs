// ==========================================
// 校园教务选课系统 - 响应信封
// ==========================================
// 职责: 定义对外统一的 {success, data|error, timestamp} 信封;
//       实际的 HTTP 序列化由外部接入层完成
// ==========================================

use crate::api::error::ApiError;
use serde::{Deserialize, Serialize};

/// 错误体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// 错误代码
    pub code: String,

    /// 错误消息
    pub message: String,

    /// HTTP 状态码提示
    pub http_status: u16,

    /// 结构化补充信息 (如驳回原因列表)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// 统一响应信封
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,

    /// 响应时间 (格式: %Y-%m-%d %H:%M:%S)
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    /// 成功响应
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: now_string(),
        }
    }

    /// 错误响应
    pub fn err(error: ApiError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody {
                code: error.error_code().to_string(),
                message: error.to_string(),
                http_status: error.http_status(),
                details: error.details(),
            }),
            timestamp: now_string(),
        }
    }

    /// 从 ApiResult 组装信封
    pub fn from_result(result: Result<T, ApiError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(e),
        }
    }
}

fn now_string() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_envelope() {
        let resp = ApiResponse::ok(42);
        assert!(resp.success);
        assert_eq!(resp.data, Some(42));
        assert!(resp.error.is_none());
        assert!(!resp.timestamp.is_empty());
    }

    #[test]
    fn test_err_envelope_carries_code_and_status() {
        let resp: ApiResponse<()> = ApiResponse::err(ApiError::NotFound("Krs(id=K1)不存在".to_string()));
        assert!(!resp.success);
        assert!(resp.data.is_none());
        let body = resp.error.unwrap();
        assert_eq!(body.code, "NOT_FOUND");
        assert_eq!(body.http_status, 404);
        assert!(body.message.contains("K1"));
    }

    #[test]
    fn test_rejection_details_serialized() {
        use crate::domain::krs::RejectionReason;
        use crate::domain::types::RejectionKind;

        let resp: ApiResponse<()> = ApiResponse::err(ApiError::RejectedSubmission {
            reasons: vec![RejectionReason::new(
                RejectionKind::PrerequisiteMissing,
                "C-2",
                "缺少先修课程",
            )],
        });
        let body = resp.error.unwrap();
        assert_eq!(body.http_status, 422);
        let details = body.details.unwrap();
        assert_eq!(details["reasons"][0]["reason_kind"], "PREREQUISITE_MISSING");
        assert_eq!(details["reasons"][0]["affected_item"], "C-2");
    }
}

// ==========================================
// 校园教务选课系统 - API 层
// ==========================================
// 职责: 对外操作入口、输入校验、统一错误与响应封装
// ==========================================

pub mod enrollment_api;
pub mod error;
pub mod response;

// 重导出常用类型
pub use enrollment_api::EnrollmentApi;
pub use error::{ApiError, ApiResult};
pub use response::{ApiResponse, ErrorBody};

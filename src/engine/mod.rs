// ==========================================
// 校园教务选课系统 - 引擎层
// ==========================================
// 职责: 选课校验与提交的业务规则
// 红线: Engine 不拼 SQL; 校验规则失败必须输出结构化原因
// ==========================================

pub mod capacity;
pub mod catalog;
pub mod conflict;
pub mod enrollment;
pub mod error;
pub mod events;
pub mod prerequisite;

// 重导出核心引擎
pub use capacity::{CapacityGuard, CreditOverflow};
pub use catalog::{CatalogReader, SqliteCatalogReader};
pub use conflict::ConflictDetector;
pub use enrollment::EnrollmentEngine;
pub use error::{EnrollmentError, EnrollmentResult};
pub use events::{
    EnrollmentEvent, EnrollmentEventPublisher, EnrollmentEventType, NoOpEventPublisher,
    OptionalEventPublisher,
};
pub use prerequisite::{PrerequisiteCheck, PrerequisiteValidator};

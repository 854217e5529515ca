// ==========================================
// 校园教务选课系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含校验逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod audit_repo;
pub mod completion_repo;
pub mod course_repo;
pub mod error;
pub mod krs_repo;
pub mod schedule_repo;
pub mod student_repo;

// 重导出核心仓储
pub use audit_repo::AuditRepository;
pub use completion_repo::CompletionRepository;
pub use course_repo::CourseRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use krs_repo::{KrsCommitOutcome, KrsRepository};
pub use schedule_repo::ScheduleRepository;
pub use student_repo::StudentRepository;

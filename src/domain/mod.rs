// ==========================================
// 校园教务选课系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、状态机规则
// 红线: 不含数据访问逻辑,不含校验引擎逻辑
// ==========================================

pub mod audit;
pub mod course;
pub mod krs;
pub mod schedule;
pub mod student;
pub mod types;

// 重导出核心类型
pub use audit::{AuditEntry, AuditOperation};
pub use course::{Course, PrerequisiteWaiver};
pub use krs::{
    CompletionRecord, Krs, KrsCommitSummary, KrsItem, RejectionReason, SubmitOutcome,
};
pub use schedule::{ScheduleConflict, ScheduleSlot};
pub use student::Student;
pub use types::{
    AcademicTerm, DayOfWeek, GradeLetter, KrsState, RejectionKind, Semester, StudentStatus,
};

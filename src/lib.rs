// ==========================================
// 校园教务选课系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 选课一致性引擎 (整单生效, 全有或全无)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 选课校验与提交
pub mod engine;

// 配置层 - 学期规则
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组合根
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    AcademicTerm, DayOfWeek, GradeLetter, KrsState, RejectionKind, Semester, StudentStatus,
};

// 领域实体
pub use domain::{
    Course, Krs, KrsCommitSummary, KrsItem, PrerequisiteWaiver, RejectionReason, ScheduleConflict,
    ScheduleSlot, Student, SubmitOutcome,
};

// 引擎
pub use engine::{
    CapacityGuard, CatalogReader, ConflictDetector, EnrollmentEngine, EnrollmentError,
    PrerequisiteValidator, SqliteCatalogReader,
};

// API
pub use api::{ApiError, ApiResponse, EnrollmentApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "校园教务选课系统";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";

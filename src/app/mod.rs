// ==========================================
// 校园教务选课系统 - 应用层
// ==========================================
// 职责: 组合根, 为二进制入口与集成方组装系统
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};

// ==========================================
// 校园教务选课系统 - 配置层
// ==========================================
// 职责: 学期规则的读取与覆写解析
// 存储: config_kv 表 (key-value + scope)
// ==========================================

pub mod config_manager;
pub mod term_config;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use term_config::{TermConfigReader, TermRules};

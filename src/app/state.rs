// ==========================================
// 校园教务选课系统 - 应用状态
// ==========================================
// 职责: 组装仓储/引擎/API, 管理应用级共享状态
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::EnrollmentApi;
use crate::config::config_manager::ConfigManager;
use crate::db;
use crate::engine::catalog::{CatalogReader, SqliteCatalogReader};
use crate::engine::enrollment::EnrollmentEngine;
use crate::engine::events::OptionalEventPublisher;
use crate::repository::{
    AuditRepository, CompletionRepository, CourseRepository, KrsRepository, ScheduleRepository,
    StudentRepository,
};

/// 应用状态
///
/// 包含API实例和共享资源, 作为进程内的组合根
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 选课API
    pub enrollment_api: Arc<EnrollmentApi>,

    /// 配置管理器 (运维配置读写)
    pub config_manager: Arc<ConfigManager>,

    /// 审计仓储 (运维排查用)
    pub audit_repo: Arc<AuditRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 说明
    /// 该方法会:
    /// 1. 打开共享数据库连接并初始化表结构
    /// 2. 初始化所有Repository
    /// 3. 组装EnrollmentEngine与EnrollmentApi
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState, 数据库路径: {}", db_path);

        let conn = db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        db::init_schema(&conn).map_err(|e| format!("无法初始化表结构: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================

        let student_repo = Arc::new(StudentRepository::new(conn.clone()));
        let course_repo = Arc::new(CourseRepository::new(conn.clone()));
        let schedule_repo = Arc::new(ScheduleRepository::new(conn.clone()));
        let completion_repo = Arc::new(CompletionRepository::new(conn.clone()));
        let krs_repo = Arc::new(KrsRepository::new(conn.clone()));
        let audit_repo = Arc::new(AuditRepository::new(conn.clone()));

        // ==========================================
        // 初始化Engine层
        // ==========================================

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        let catalog: Arc<dyn CatalogReader> = Arc::new(SqliteCatalogReader::new(
            student_repo,
            course_repo.clone(),
            schedule_repo,
            completion_repo,
        ));

        let engine = Arc::new(EnrollmentEngine::new(
            config_manager.clone(),
            catalog.clone(),
            krs_repo.clone(),
            OptionalEventPublisher::none(),
        ));

        // ==========================================
        // 初始化API层
        // ==========================================

        let enrollment_api = Arc::new(EnrollmentApi::new(
            krs_repo,
            course_repo,
            audit_repo.clone(),
            catalog,
            engine,
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            enrollment_api,
            config_manager,
            audit_repo,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 开发环境: 用户数据目录/campus-krs-dev/campus_krs.db
/// - 生产环境: 用户数据目录/campus-krs/campus_krs.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径 (便于调试/测试/CI)
    if let Ok(path) = std::env::var("CAMPUS_KRS_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./campus_krs.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录, 避免污染生产数据
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("campus-krs-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("campus-krs");
        }

        std::fs::create_dir_all(&path).ok();
        path = path.join("campus_krs.db");
    }

    path.to_string_lossy().to_string()
}

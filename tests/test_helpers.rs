// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、实体构造等功能
// ==========================================

use chrono::{NaiveDateTime, NaiveTime};
use rusqlite::Connection;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

use campus_krs_engine::api::EnrollmentApi;
use campus_krs_engine::config::config_manager::ConfigManager;
use campus_krs_engine::db;
use campus_krs_engine::domain::krs::CompletionRecord;
use campus_krs_engine::domain::types::{
    AcademicTerm, DayOfWeek, GradeLetter, Semester, StudentStatus,
};
use campus_krs_engine::domain::{Course, ScheduleSlot, Student};
use campus_krs_engine::engine::catalog::{CatalogReader, SqliteCatalogReader};
use campus_krs_engine::engine::enrollment::EnrollmentEngine;
use campus_krs_engine::engine::events::OptionalEventPublisher;
use campus_krs_engine::repository::{
    AuditRepository, CompletionRepository, CourseRepository, KrsRepository, ScheduleRepository,
    StudentRepository,
};

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = db::open_sqlite_connection(&db_path)?;
    db::init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 完整的测试环境: 仓储 + 配置 + 引擎 + API 共享同一个数据库
pub struct TestEnv {
    // 临时文件需要比连接活得久
    pub _temp_file: NamedTempFile,
    pub db_path: String,
    pub conn: Arc<Mutex<Connection>>,
    pub student_repo: Arc<StudentRepository>,
    pub course_repo: Arc<CourseRepository>,
    pub schedule_repo: Arc<ScheduleRepository>,
    pub completion_repo: Arc<CompletionRepository>,
    pub krs_repo: Arc<KrsRepository>,
    pub audit_repo: Arc<AuditRepository>,
    pub config: Arc<ConfigManager>,
    pub api: Arc<EnrollmentApi>,
}

/// 创建测试环境
pub fn setup_test_env() -> TestEnv {
    let (temp_file, db_path) = create_test_db().unwrap();

    let conn = Arc::new(Mutex::new(
        db::open_sqlite_connection(&db_path).unwrap(),
    ));

    let student_repo = Arc::new(StudentRepository::new(conn.clone()));
    let course_repo = Arc::new(CourseRepository::new(conn.clone()));
    let schedule_repo = Arc::new(ScheduleRepository::new(conn.clone()));
    let completion_repo = Arc::new(CompletionRepository::new(conn.clone()));
    let krs_repo = Arc::new(KrsRepository::new(conn.clone()));
    let audit_repo = Arc::new(AuditRepository::new(conn.clone()));

    let config = Arc::new(ConfigManager::from_connection(conn.clone()).unwrap());

    let catalog: Arc<dyn CatalogReader> = Arc::new(SqliteCatalogReader::new(
        student_repo.clone(),
        course_repo.clone(),
        schedule_repo.clone(),
        completion_repo.clone(),
    ));

    let engine = Arc::new(EnrollmentEngine::new(
        config.clone(),
        catalog.clone(),
        krs_repo.clone(),
        OptionalEventPublisher::none(),
    ));

    let api = Arc::new(EnrollmentApi::new(
        krs_repo.clone(),
        course_repo.clone(),
        audit_repo.clone(),
        catalog,
        engine,
    ));

    TestEnv {
        _temp_file: temp_file,
        db_path,
        conn,
        student_repo,
        course_repo,
        schedule_repo,
        completion_repo,
        krs_repo,
        audit_repo,
        config,
        api,
    }
}

// ==========================================
// 实体构造器
// ==========================================

/// 测试固定使用的学期: 2025 单学期
pub fn test_term() -> AcademicTerm {
    AcademicTerm::new(2025, Semester::Odd)
}

pub fn test_ts() -> NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(2025, 8, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

pub fn make_student(student_id: &str) -> Student {
    Student {
        student_id: student_id.to_string(),
        full_name: format!("学生{}", student_id),
        program_code: "IF".to_string(),
        enrollment_year: 2023,
        status: StudentStatus::Active,
        created_at: test_ts(),
        updated_at: test_ts(),
    }
}

pub fn make_course(course_id: &str, course_code: &str, sks: i32) -> Course {
    Course {
        course_id: course_id.to_string(),
        course_code: course_code.to_string(),
        course_name: format!("课程{}", course_code),
        sks,
        semester_level: 1,
        prerequisite_ids: Vec::new(),
        created_at: test_ts(),
        updated_at: test_ts(),
    }
}

pub fn make_slot(
    slot_id: &str,
    course_id: &str,
    day: DayOfWeek,
    start: &str,
    end: &str,
    capacity: i32,
) -> ScheduleSlot {
    ScheduleSlot {
        slot_id: slot_id.to_string(),
        course_id: course_id.to_string(),
        instructor_id: None,
        day_of_week: day,
        start_time: NaiveTime::parse_from_str(start, "%H:%M").unwrap(),
        end_time: NaiveTime::parse_from_str(end, "%H:%M").unwrap(),
        room: None,
        capacity,
        seats_taken: 0,
        term_code: test_term().code(),
    }
}

pub fn make_completion(student_id: &str, course_id: &str, grade: Option<GradeLetter>) -> CompletionRecord {
    CompletionRecord {
        student_id: student_id.to_string(),
        course_id: course_id.to_string(),
        grade,
        term_code: "2024-ODD".to_string(),
    }
}

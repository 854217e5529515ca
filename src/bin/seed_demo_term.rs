// 演示学期种子工具: 重建数据库并灌入一套可交互的选课数据,
// 最后跑一次示例提交验证链路是否通畅。
//
// 用法: seed_demo_term [db_path]

use chrono::{Duration, Local, NaiveTime};
use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use campus_krs_engine::app::{get_default_db_path, AppState};
use campus_krs_engine::config::config_manager::{config_keys, ConfigManager};
use campus_krs_engine::db::{init_schema, open_sqlite_connection};
use campus_krs_engine::domain::krs::CompletionRecord;
use campus_krs_engine::domain::types::{
    AcademicTerm, DayOfWeek, GradeLetter, Semester, StudentStatus,
};
use campus_krs_engine::domain::{Course, PrerequisiteWaiver, ScheduleSlot, Student};
use campus_krs_engine::repository::{
    CompletionRepository, CourseRepository, ScheduleRepository, StudentRepository,
};

const DEMO_TERM: AcademicTerm = AcademicTerm {
    academic_year: 2025,
    semester: Semester::Odd,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    campus_krs_engine::logging::init();

    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);

    backup_and_reset_db(&db_path)?;

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;
    let conn = Arc::new(Mutex::new(conn));

    seed_config(conn.clone())?;
    seed_catalog(conn.clone())?;

    run_sample_submission(&db_path).await?;

    eprintln!("演示学期 {} 已就绪: {}", DEMO_TERM.code(), db_path);
    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}

/// 学期规则: 全局上限 24 SKS, 信息学专业 (IF) 覆写为 21 SKS,
/// 截止日期设在 30 天后, 保证演示期间可以随时提交
fn seed_config(conn: Arc<Mutex<rusqlite::Connection>>) -> Result<(), Box<dyn Error>> {
    let config = ConfigManager::from_connection(conn)?;

    config.set_global_config_value(config_keys::TERM_MAX_SKS, "24")?;
    config.set_global_config_value(&config_keys::max_sks_key_for_program("IF"), "21")?;
    config.set_global_config_value(config_keys::TERM_MIN_PASSING_GRADE, "C")?;
    config.set_global_config_value(config_keys::TERM_SUBMIT_RETRY_ATTEMPTS, "3")?;

    let deadline = (Local::now().date_naive() + Duration::days(30))
        .format("%Y-%m-%d")
        .to_string();
    config.set_global_config_value(
        &config_keys::deadline_key_for_term(&DEMO_TERM.code()),
        &deadline,
    )?;

    Ok(())
}

fn seed_catalog(conn: Arc<Mutex<rusqlite::Connection>>) -> Result<(), Box<dyn Error>> {
    let student_repo = StudentRepository::new(conn.clone());
    let course_repo = CourseRepository::new(conn.clone());
    let schedule_repo = ScheduleRepository::new(conn.clone());
    let completion_repo = CompletionRepository::new(conn);

    let now = Local::now().naive_local();

    // ---------- 学生 ----------
    for (student_id, full_name, status) in [
        ("2023010001", "Budi Santoso", StudentStatus::Active),
        ("2023010002", "Siti Rahma", StudentStatus::Active),
        ("2022010007", "Agus Wijaya", StudentStatus::Inactive),
    ] {
        student_repo.upsert(&Student {
            student_id: student_id.to_string(),
            full_name: full_name.to_string(),
            program_code: "IF".to_string(),
            enrollment_year: 2023,
            status,
            created_at: now,
            updated_at: now,
        })?;
    }

    // ---------- 课程 ----------
    for (course_id, course_code, course_name, sks, level) in [
        ("C-IF1101", "IF1101", "Dasar Pemrograman", 4, 1),
        ("C-IF1102", "IF1102", "Matematika Diskrit", 3, 1),
        ("C-IF2110", "IF2110", "Algoritma dan Struktur Data", 4, 3),
        ("C-IF2120", "IF2120", "Basis Data", 3, 3),
        ("C-IF2130", "IF2130", "Organisasi Komputer", 3, 3),
        ("C-UM1001", "UM1001", "Bahasa Indonesia", 2, 1),
    ] {
        course_repo.upsert(&Course {
            course_id: course_id.to_string(),
            course_code: course_code.to_string(),
            course_name: course_name.to_string(),
            sks,
            semester_level: level,
            prerequisite_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        })?;
    }

    // 先修关系 (只存直接先修)
    course_repo.add_prerequisite("C-IF2110", "C-IF1101")?;
    course_repo.add_prerequisite("C-IF2120", "C-IF1101")?;
    course_repo.add_prerequisite("C-IF2130", "C-IF1102")?;

    // ---------- 开课时段 ----------
    // S-2110-B 与 S-2120-A 故意排在同一时间窗, 用于演示冲突驳回
    let term_code = DEMO_TERM.code();
    for (slot_id, course_id, day, start, end, room, capacity) in [
        ("S-2110-A", "C-IF2110", DayOfWeek::Monday, "07:00", "09:30", "R-7601", 40),
        ("S-2110-B", "C-IF2110", DayOfWeek::Wednesday, "13:00", "15:30", "R-7602", 40),
        ("S-2120-A", "C-IF2120", DayOfWeek::Wednesday, "14:00", "16:30", "R-7603", 35),
        ("S-2120-B", "C-IF2120", DayOfWeek::Friday, "07:00", "09:30", "R-7603", 35),
        ("S-2130-A", "C-IF2130", DayOfWeek::Tuesday, "10:00", "12:30", "R-7604", 45),
        ("S-1001-A", "C-UM1001", DayOfWeek::Thursday, "08:00", "09:40", "R-1101", 2),
    ] {
        schedule_repo.upsert(&ScheduleSlot {
            slot_id: slot_id.to_string(),
            course_id: course_id.to_string(),
            instructor_id: None,
            day_of_week: day,
            start_time: NaiveTime::parse_from_str(start, "%H:%M")?,
            end_time: NaiveTime::parse_from_str(end, "%H:%M")?,
            room: Some(room.to_string()),
            capacity,
            seats_taken: 0,
            term_code: term_code.clone(),
        })?;
    }

    // ---------- 历史成绩 ----------
    // Budi 修完了全部一年级课程; Siti 的 IF1102 不及格, 选 IF2130 时会被驳回
    for (student_id, course_id, grade) in [
        ("2023010001", "C-IF1101", Some(GradeLetter::A)),
        ("2023010001", "C-IF1102", Some(GradeLetter::B)),
        ("2023010002", "C-IF1101", Some(GradeLetter::C)),
        ("2023010002", "C-IF1102", Some(GradeLetter::E)),
    ] {
        completion_repo.upsert(&CompletionRecord {
            student_id: student_id.to_string(),
            course_id: course_id.to_string(),
            grade,
            term_code: "2024-ODD".to_string(),
        })?;
    }

    // ---------- 先修豁免 ----------
    // 给 Siti 一张 IF2130 的豁免, 演示豁免放行路径
    course_repo.grant_waiver(&PrerequisiteWaiver {
        student_id: "2023010002".to_string(),
        course_id: "C-IF2130".to_string(),
        prereq_course_id: "C-IF1102".to_string(),
        granted_by: "admin.fakultas".to_string(),
        granted_at: now,
        note: Some("转学分认定".to_string()),
    })?;

    Ok(())
}

/// 用 Budi 的账号跑一单完整提交, 验证种子数据自洽
async fn run_sample_submission(db_path: &str) -> Result<(), Box<dyn Error>> {
    let state = AppState::new(db_path.to_string())?;
    let api = &state.enrollment_api;

    let krs_id = api.create_draft("2023010001", DEMO_TERM, "seed_demo_term").await?;
    api.add_item(&krs_id, "S-2110-A", "seed_demo_term").await?;
    api.add_item(&krs_id, "S-2120-B", "seed_demo_term").await?;
    api.add_item(&krs_id, "S-1001-A", "seed_demo_term").await?;

    let summary = api.submit(&krs_id, "seed_demo_term").await?;
    eprintln!(
        "示例提交已生效: krs_id={}, 生效时段={}, 总学分={}",
        summary.krs_id,
        summary.committed_slots.len(),
        summary.total_sks
    );

    Ok(())
}

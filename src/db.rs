// ==========================================
// 校园教务选课系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免“部分模块外键开启/部分不开启”
// - 统一 busy_timeout，减少并发提交时的偶发 busy 错误
// - 提供幂等建表入口 (init_schema)
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
///
/// 说明：
/// - 版本号用于**提示/告警**（不做自动迁移），避免静默在旧库上运行导致隐性错误。
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 初始化数据库 schema（幂等，全部使用 IF NOT EXISTS）
///
/// 表清单:
/// - 配置: config_scope / config_kv
/// - 主数据: student / course / course_prerequisite / prerequisite_waiver
/// - 开课与选课: schedule_slot / krs / krs_item / completion_record
/// - 审计: enrollment_audit
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS student (
            student_id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            program_code TEXT NOT NULL,
            enrollment_year INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'ACTIVE',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS course (
            course_id TEXT PRIMARY KEY,
            course_code TEXT NOT NULL UNIQUE,
            course_name TEXT NOT NULL,
            sks INTEGER NOT NULL,
            semester_level INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS course_prerequisite (
            course_id TEXT NOT NULL REFERENCES course(course_id) ON DELETE CASCADE,
            prereq_course_id TEXT NOT NULL REFERENCES course(course_id),
            PRIMARY KEY (course_id, prereq_course_id)
        );

        CREATE TABLE IF NOT EXISTS prerequisite_waiver (
            student_id TEXT NOT NULL REFERENCES student(student_id),
            course_id TEXT NOT NULL REFERENCES course(course_id),
            prereq_course_id TEXT NOT NULL REFERENCES course(course_id),
            granted_by TEXT NOT NULL,
            granted_at TEXT NOT NULL DEFAULT (datetime('now')),
            note TEXT,
            PRIMARY KEY (student_id, course_id, prereq_course_id)
        );

        CREATE TABLE IF NOT EXISTS schedule_slot (
            slot_id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL REFERENCES course(course_id),
            instructor_id TEXT,
            day_of_week TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            room TEXT,
            capacity INTEGER NOT NULL,
            seats_taken INTEGER NOT NULL DEFAULT 0,
            term_code TEXT NOT NULL,
            CHECK (seats_taken >= 0),
            CHECK (start_time < end_time)
        );

        CREATE TABLE IF NOT EXISTS krs (
            krs_id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL REFERENCES student(student_id),
            academic_year INTEGER NOT NULL,
            semester TEXT NOT NULL,
            state TEXT NOT NULL DEFAULT 'DRAFT',
            rejection_reasons_json TEXT,
            revision INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(student_id, academic_year, semester)
        );

        CREATE TABLE IF NOT EXISTS krs_item (
            krs_id TEXT NOT NULL REFERENCES krs(krs_id) ON DELETE CASCADE,
            slot_id TEXT NOT NULL REFERENCES schedule_slot(slot_id),
            added_at TEXT NOT NULL DEFAULT (datetime('now')),
            committed_at TEXT,
            pending_drop INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (krs_id, slot_id)
        );

        CREATE TABLE IF NOT EXISTS completion_record (
            student_id TEXT NOT NULL REFERENCES student(student_id),
            course_id TEXT NOT NULL REFERENCES course(course_id),
            grade TEXT,
            term_code TEXT NOT NULL,
            PRIMARY KEY (student_id, course_id, term_code)
        );

        CREATE TABLE IF NOT EXISTS enrollment_audit (
            audit_id TEXT PRIMARY KEY,
            krs_id TEXT,
            operation TEXT NOT NULL,
            actor TEXT NOT NULL,
            payload_json TEXT,
            detail TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_krs_student ON krs(student_id);
        CREATE INDEX IF NOT EXISTS idx_schedule_slot_course ON schedule_slot(course_id);
        CREATE INDEX IF NOT EXISTS idx_schedule_slot_term ON schedule_slot(term_code);
        CREATE INDEX IF NOT EXISTS idx_completion_student ON completion_record(student_id);
        CREATE INDEX IF NOT EXISTS idx_audit_krs ON enrollment_audit(krs_id);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        // 重复执行不报错
        init_schema(&conn).unwrap();
        assert_eq!(
            read_schema_version(&conn).unwrap(),
            Some(CURRENT_SCHEMA_VERSION)
        );
    }

    #[test]
    fn test_read_schema_version_missing_table() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }
}

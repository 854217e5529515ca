// ==========================================
// 校园教务选课系统 - 修读记录仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
// ==========================================

use crate::domain::krs::CompletionRecord;
use crate::domain::types::GradeLetter;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

pub struct CompletionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CompletionRepository {
    /// 创建新的修读记录仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入或更新修读记录
    ///
    /// 同一 (学生, 课程, 学期) 重复写入时覆盖成绩,
    /// 用于“修读中 (grade=NULL) -> 出分”的更新路径
    pub fn upsert(&self, record: &CompletionRecord) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO completion_record (student_id, course_id, grade, term_code)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(student_id, course_id, term_code) DO UPDATE SET
                   grade = excluded.grade"#,
            params![
                &record.student_id,
                &record.course_id,
                record.grade.map(|g| g.to_db_str()),
                &record.term_code,
            ],
        )?;

        Ok(())
    }

    /// 查询学生的全部修读记录
    pub fn find_by_student(&self, student_id: &str) -> RepositoryResult<Vec<CompletionRecord>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT student_id, course_id, grade, term_code
               FROM completion_record
               WHERE student_id = ?
               ORDER BY term_code, course_id"#,
        )?;

        let records = stmt
            .query_map(params![student_id], |row| self.map_row(row))?
            .collect::<Result<Vec<CompletionRecord>, _>>()?;

        Ok(records)
    }

    /// 映射数据库行到CompletionRecord对象
    fn map_row(&self, row: &rusqlite::Row) -> rusqlite::Result<CompletionRecord> {
        let grade_str: Option<String> = row.get(2)?;
        Ok(CompletionRecord {
            student_id: row.get(0)?,
            course_id: row.get(1)?,
            grade: grade_str.and_then(|s| GradeLetter::from_str(&s)),
            term_code: row.get(3)?,
        })
    }
}

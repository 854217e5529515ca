// ==========================================
// 校园教务选课系统 - 学生仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
// ==========================================

use crate::domain::student::Student;
use crate::domain::types::StudentStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

pub struct StudentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StudentRepository {
    /// 创建新的学生仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入或更新学生
    pub fn upsert(&self, student: &Student) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO student (
                student_id, full_name, program_code, enrollment_year, status,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(student_id) DO UPDATE SET
                full_name = excluded.full_name,
                program_code = excluded.program_code,
                enrollment_year = excluded.enrollment_year,
                status = excluded.status,
                updated_at = excluded.updated_at"#,
            params![
                &student.student_id,
                &student.full_name,
                &student.program_code,
                &student.enrollment_year,
                student.status.to_db_str(),
                &student.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                &student.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;

        Ok(student.student_id.clone())
    }

    /// 按学号查询学生
    pub fn find_by_id(&self, student_id: &str) -> RepositoryResult<Option<Student>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT student_id, full_name, program_code, enrollment_year, status,
                      created_at, updated_at
               FROM student
               WHERE student_id = ?"#,
            params![student_id],
            |row| self.map_row(row),
        ) {
            Ok(student) => Ok(Some(student)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 更新学籍状态
    pub fn update_status(&self, student_id: &str, status: StudentStatus) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let rows_affected = conn.execute(
            r#"UPDATE student
               SET status = ?, updated_at = datetime('now')
               WHERE student_id = ?"#,
            params![status.to_db_str(), student_id],
        )?;

        if rows_affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Student".to_string(),
                id: student_id.to_string(),
            });
        }

        Ok(())
    }

    /// 映射数据库行到Student对象
    fn map_row(&self, row: &rusqlite::Row) -> rusqlite::Result<Student> {
        let status_str: String = row.get(4)?;
        Ok(Student {
            student_id: row.get(0)?,
            full_name: row.get(1)?,
            program_code: row.get(2)?,
            enrollment_year: row.get(3)?,
            status: StudentStatus::from_str(&status_str),
            created_at: parse_datetime_col(row, 5)?,
            updated_at: parse_datetime_col(row, 6)?,
        })
    }
}

/// 解析 datetime 列（格式: %Y-%m-%d %H:%M:%S）
pub(crate) fn parse_datetime_col(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let s: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

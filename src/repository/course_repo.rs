// ==========================================
// 校园教务选课系统 - 课程与先修仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
// 例外: 先修边插入时做成环检测,保证先修图始终无环
// ==========================================

use crate::domain::course::{Course, PrerequisiteWaiver};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::student_repo::parse_datetime_col;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

pub struct CourseRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CourseRepository {
    /// 创建新的课程仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 课程写入
    // ==========================================

    /// 插入或更新课程（不含先修边）
    pub fn upsert(&self, course: &Course) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO course (
                course_id, course_code, course_name, sks, semester_level,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(course_id) DO UPDATE SET
                course_code = excluded.course_code,
                course_name = excluded.course_name,
                sks = excluded.sks,
                semester_level = excluded.semester_level,
                updated_at = excluded.updated_at"#,
            params![
                &course.course_id,
                &course.course_code,
                &course.course_name,
                &course.sks,
                &course.semester_level,
                &course.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                &course.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;

        Ok(course.course_id.clone())
    }

    /// 添加先修边 (course_id 依赖 prereq_course_id)
    ///
    /// # 约束
    /// - 先修图必须无环: 插入前沿 prereq 方向做可达性检查,
    ///   若 prereq_course_id 能经由已有边到达 course_id 则拒绝
    ///
    /// # 错误
    /// - `BusinessRuleViolation`: 形成环
    /// - `NotFound`: 课程不存在
    pub fn add_prerequisite(&self, course_id: &str, prereq_course_id: &str) -> RepositoryResult<()> {
        if course_id == prereq_course_id {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "课程不能作为自身的先修课程: {}",
                course_id
            )));
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        for id in [course_id, prereq_course_id] {
            let exists: Option<i32> = tx
                .query_row(
                    "SELECT 1 FROM course WHERE course_id = ?",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_none() {
                return Err(RepositoryError::NotFound {
                    entity: "Course".to_string(),
                    id: id.to_string(),
                });
            }
        }

        // 成环检测: 从 prereq_course_id 出发沿先修边搜索, 命中 course_id 即成环
        let mut visited: HashSet<String> = HashSet::new();
        let mut stack: Vec<String> = vec![prereq_course_id.to_string()];
        while let Some(current) = stack.pop() {
            if current == course_id {
                return Err(RepositoryError::BusinessRuleViolation(format!(
                    "先修关系成环: {} -> {}",
                    course_id, prereq_course_id
                )));
            }
            if !visited.insert(current.clone()) {
                continue;
            }
            let mut stmt = tx.prepare(
                "SELECT prereq_course_id FROM course_prerequisite WHERE course_id = ?",
            )?;
            let next_ids = stmt
                .query_map(params![&current], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<String>, _>>()?;
            stack.extend(next_ids);
        }

        tx.execute(
            r#"INSERT OR IGNORE INTO course_prerequisite (course_id, prereq_course_id)
               VALUES (?, ?)"#,
            params![course_id, prereq_course_id],
        )?;

        tx.commit()?;
        Ok(())
    }

    // ==========================================
    // 课程查询
    // ==========================================

    /// 按ID查询课程（含直接先修课程ID列表）
    pub fn find_by_id(&self, course_id: &str) -> RepositoryResult<Option<Course>> {
        let conn = self.get_conn()?;

        let course = match conn.query_row(
            r#"SELECT course_id, course_code, course_name, sks, semester_level,
                      created_at, updated_at
               FROM course
               WHERE course_id = ?"#,
            params![course_id],
            |row| self.map_row(row),
        ) {
            Ok(course) => course,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut stmt = conn.prepare(
            r#"SELECT prereq_course_id FROM course_prerequisite
               WHERE course_id = ?
               ORDER BY prereq_course_id"#,
        )?;
        let prereq_ids = stmt
            .query_map(params![course_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(Some(Course {
            prerequisite_ids: prereq_ids,
            ..course
        }))
    }

    /// 按课程代码查询课程ID
    pub fn find_id_by_code(&self, course_code: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            "SELECT course_id FROM course WHERE course_code = ?",
            params![course_code],
            |row| row.get(0),
        ) {
            Ok(id) => Ok(Some(id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // ==========================================
    // 先修豁免
    // ==========================================

    /// 授予先修豁免（重复授予覆盖旧记录）
    pub fn grant_waiver(&self, waiver: &PrerequisiteWaiver) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO prerequisite_waiver (
                student_id, course_id, prereq_course_id, granted_by, granted_at, note
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(student_id, course_id, prereq_course_id) DO UPDATE SET
                granted_by = excluded.granted_by,
                granted_at = excluded.granted_at,
                note = excluded.note"#,
            params![
                &waiver.student_id,
                &waiver.course_id,
                &waiver.prereq_course_id,
                &waiver.granted_by,
                &waiver.granted_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                &waiver.note,
            ],
        )?;

        Ok(())
    }

    /// 查询学生持有的全部先修豁免
    pub fn find_waivers_by_student(&self, student_id: &str) -> RepositoryResult<Vec<PrerequisiteWaiver>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT student_id, course_id, prereq_course_id, granted_by, granted_at, note
               FROM prerequisite_waiver
               WHERE student_id = ?
               ORDER BY course_id, prereq_course_id"#,
        )?;

        let waivers = stmt
            .query_map(params![student_id], |row| {
                Ok(PrerequisiteWaiver {
                    student_id: row.get(0)?,
                    course_id: row.get(1)?,
                    prereq_course_id: row.get(2)?,
                    granted_by: row.get(3)?,
                    granted_at: parse_datetime_col(row, 4)?,
                    note: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<PrerequisiteWaiver>, _>>()?;

        Ok(waivers)
    }

    /// 映射数据库行到Course对象（先修边由调用方另行装载）
    fn map_row(&self, row: &rusqlite::Row) -> rusqlite::Result<Course> {
        Ok(Course {
            course_id: row.get(0)?,
            course_code: row.get(1)?,
            course_name: row.get(2)?,
            sks: row.get(3)?,
            semester_level: row.get(4)?,
            prerequisite_ids: Vec::new(),
            created_at: parse_datetime_col(row, 5)?,
            updated_at: parse_datetime_col(row, 6)?,
        })
    }
}

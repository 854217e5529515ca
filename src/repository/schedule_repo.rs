// ==========================================
// 校园教务选课系统 - 开课时段仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
// 红线: seats_taken 的增减只发生在 KrsRepository.commit_krs 的提交事务内
// ==========================================

use crate::domain::schedule::ScheduleSlot;
use crate::domain::types::DayOfWeek;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveTime;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

pub struct ScheduleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ScheduleRepository {
    /// 创建新的开课时段仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入或更新开课时段
    pub fn upsert(&self, slot: &ScheduleSlot) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO schedule_slot (
                slot_id, course_id, instructor_id, day_of_week,
                start_time, end_time, room, capacity, seats_taken, term_code
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(slot_id) DO UPDATE SET
                course_id = excluded.course_id,
                instructor_id = excluded.instructor_id,
                day_of_week = excluded.day_of_week,
                start_time = excluded.start_time,
                end_time = excluded.end_time,
                room = excluded.room,
                capacity = excluded.capacity,
                seats_taken = excluded.seats_taken,
                term_code = excluded.term_code"#,
            params![
                &slot.slot_id,
                &slot.course_id,
                &slot.instructor_id,
                slot.day_of_week.to_db_str(),
                &slot.start_time.format("%H:%M").to_string(),
                &slot.end_time.format("%H:%M").to_string(),
                &slot.room,
                &slot.capacity,
                &slot.seats_taken,
                &slot.term_code,
            ],
        )?;

        Ok(slot.slot_id.clone())
    }

    /// 按ID查询开课时段
    pub fn find_by_id(&self, slot_id: &str) -> RepositoryResult<Option<ScheduleSlot>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT slot_id, course_id, instructor_id, day_of_week,
                      start_time, end_time, room, capacity, seats_taken, term_code
               FROM schedule_slot
               WHERE slot_id = ?"#,
            params![slot_id],
            |row| self.map_row(row),
        ) {
            Ok(slot) => Ok(Some(slot)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询课程在指定学期的全部开课时段
    pub fn find_by_course(&self, course_id: &str, term_code: &str) -> RepositoryResult<Vec<ScheduleSlot>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT slot_id, course_id, instructor_id, day_of_week,
                      start_time, end_time, room, capacity, seats_taken, term_code
               FROM schedule_slot
               WHERE course_id = ? AND term_code = ?
               ORDER BY slot_id"#,
        )?;

        let slots = stmt
            .query_map(params![course_id, term_code], |row| self.map_row(row))?
            .collect::<Result<Vec<ScheduleSlot>, _>>()?;

        Ok(slots)
    }

    /// 查询学期的全部开课时段
    pub fn find_by_term(&self, term_code: &str) -> RepositoryResult<Vec<ScheduleSlot>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT slot_id, course_id, instructor_id, day_of_week,
                      start_time, end_time, room, capacity, seats_taken, term_code
               FROM schedule_slot
               WHERE term_code = ?
               ORDER BY slot_id"#,
        )?;

        let slots = stmt
            .query_map(params![term_code], |row| self.map_row(row))?
            .collect::<Result<Vec<ScheduleSlot>, _>>()?;

        Ok(slots)
    }

    /// 读取时段当前已占名额（测试与对账用）
    pub fn read_seats_taken(&self, slot_id: &str) -> RepositoryResult<i32> {
        let conn = self.get_conn()?;

        match conn.query_row(
            "SELECT seats_taken FROM schedule_slot WHERE slot_id = ?",
            params![slot_id],
            |row| row.get(0),
        ) {
            Ok(v) => Ok(v),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(RepositoryError::NotFound {
                entity: "ScheduleSlot".to_string(),
                id: slot_id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// 映射数据库行到ScheduleSlot对象
    fn map_row(&self, row: &rusqlite::Row) -> rusqlite::Result<ScheduleSlot> {
        let day_str: String = row.get(3)?;
        let day_of_week = DayOfWeek::from_str(&day_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("无效的星期值: {}", day_str).into(),
            )
        })?;

        Ok(ScheduleSlot {
            slot_id: row.get(0)?,
            course_id: row.get(1)?,
            instructor_id: row.get(2)?,
            day_of_week,
            start_time: parse_time_col(row, 4)?,
            end_time: parse_time_col(row, 5)?,
            room: row.get(6)?,
            capacity: row.get(7)?,
            seats_taken: row.get(8)?,
            term_code: row.get(9)?,
        })
    }
}

/// 解析 time 列（格式: %H:%M）
fn parse_time_col(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveTime> {
    let s: String = row.get(idx)?;
    NaiveTime::parse_from_str(&s, "%H:%M").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

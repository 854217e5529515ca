// ==========================================
// 校园教务选课系统 - 选课审计仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
// ==========================================

use crate::domain::audit::AuditEntry;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::student_repo::parse_datetime_col;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

pub struct AuditRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AuditRepository {
    /// 创建新的审计仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入审计条目
    pub fn insert(&self, entry: &AuditEntry) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO enrollment_audit (
                audit_id, krs_id, operation, actor, payload_json, detail, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &entry.audit_id,
                &entry.krs_id,
                &entry.operation,
                &entry.actor,
                entry.payload_json.as_ref().map(|v| v.to_string()),
                &entry.detail,
                &entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;

        Ok(entry.audit_id.clone())
    }

    /// 查询选课记录的审计轨迹（按时间正序）
    pub fn find_by_krs(&self, krs_id: &str) -> RepositoryResult<Vec<AuditEntry>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT audit_id, krs_id, operation, actor, payload_json, detail, created_at
               FROM enrollment_audit
               WHERE krs_id = ?
               ORDER BY created_at, audit_id"#,
        )?;

        let entries = stmt
            .query_map(params![krs_id], |row| self.map_row(row))?
            .collect::<Result<Vec<AuditEntry>, _>>()?;

        Ok(entries)
    }

    /// 查询最近的审计条目（运维排查用）
    pub fn find_recent(&self, limit: u32) -> RepositoryResult<Vec<AuditEntry>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT audit_id, krs_id, operation, actor, payload_json, detail, created_at
               FROM enrollment_audit
               ORDER BY created_at DESC, audit_id DESC
               LIMIT ?"#,
        )?;

        let entries = stmt
            .query_map(params![limit], |row| self.map_row(row))?
            .collect::<Result<Vec<AuditEntry>, _>>()?;

        Ok(entries)
    }

    /// 映射数据库行到AuditEntry对象
    fn map_row(&self, row: &rusqlite::Row) -> rusqlite::Result<AuditEntry> {
        Ok(AuditEntry {
            audit_id: row.get(0)?,
            krs_id: row.get(1)?,
            operation: row.get(2)?,
            actor: row.get(3)?,
            payload_json: row
                .get::<_, Option<String>>(4)?
                .and_then(|s| serde_json::from_str(&s).ok()),
            detail: row.get(5)?,
            created_at: parse_datetime_col(row, 6)?,
        })
    }
}

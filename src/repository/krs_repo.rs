// ==========================================
// 校园教务选课系统 - 选课记录仓储 (KRS)
// ==========================================
// 红线: Repository 不做校验逻辑,只做数据映射与原子写入
// 红线: 名额的增减只发生在 commit_krs 的提交事务内,
//       全程使用 "seats_taken < capacity" 条件更新做原子判定
// ==========================================

use crate::domain::krs::{Krs, KrsItem, RejectionReason};
use crate::domain::types::{AcademicTerm, KrsState, Semester};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::student_repo::parse_datetime_col;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::sync::{Arc, Mutex};

/// 提交事务的落库结果
///
/// 名额不足是预期内的业务结果, 与基础设施错误分开表达,
/// 返回 SeatUnavailable 时事务已整体回滚
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KrsCommitOutcome {
    Committed { revision: i32 },
    SeatUnavailable { slot_id: String },
}

pub struct KrsRepository {
    conn: Arc<Mutex<Connection>>,
}

impl KrsRepository {
    /// 创建新的选课记录仓储
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
    // 草稿创建与查询
    // ==========================================

    /// 创建选课草稿
    ///
    /// # 错误
    /// - `UniqueConstraintViolation`: 该学生在该学期已有选课记录
    /// - `ForeignKeyViolation`: 学生不存在
    pub fn create_draft(&self, krs: &Krs) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"INSERT INTO krs (
                krs_id, student_id, academic_year, semester, state,
                rejection_reasons_json, revision, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, NULL, ?, ?, ?)"#,
            params![
                &krs.krs_id,
                &krs.student_id,
                &krs.term.academic_year,
                krs.term.semester.to_db_str(),
                krs.state.to_db_str(),
                &krs.revision,
                &krs.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                &krs.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;

        Ok(krs.krs_id.clone())
    }

    /// 按ID查询选课记录（含条目）
    pub fn find_by_id(&self, krs_id: &str) -> RepositoryResult<Option<Krs>> {
        let conn = self.get_conn()?;

        let krs = match conn.query_row(
            r#"SELECT krs_id, student_id, academic_year, semester, state,
                      rejection_reasons_json, revision, created_at, updated_at
               FROM krs
               WHERE krs_id = ?"#,
            params![krs_id],
            |row| self.map_row(row),
        ) {
            Ok(krs) => krs,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let items = self.load_items(&conn, krs_id)?;
        Ok(Some(Krs { items, ..krs }))
    }

    /// 按 (学生, 学期) 查询选课记录（含条目）
    pub fn find_by_student_term(
        &self,
        student_id: &str,
        term: &AcademicTerm,
    ) -> RepositoryResult<Option<Krs>> {
        let conn = self.get_conn()?;

        let krs = match conn.query_row(
            r#"SELECT krs_id, student_id, academic_year, semester, state,
                      rejection_reasons_json, revision, created_at, updated_at
               FROM krs
               WHERE student_id = ? AND academic_year = ? AND semester = ?"#,
            params![student_id, &term.academic_year, term.semester.to_db_str()],
            |row| self.map_row(row),
        ) {
            Ok(krs) => krs,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let items = self.load_items(&conn, &krs.krs_id)?;
        Ok(Some(Krs { items, ..krs }))
    }

    // ==========================================
    // 条目编辑 (仅限非 SUBMITTED 状态)
    // ==========================================

    /// 向选课记录添加条目
    ///
    /// # 约束
    /// - SUBMITTED 状态下禁止编辑
    /// - COMMITTED/REJECTED 状态下的编辑将状态拉回 DRAFT (修订周期),
    ///   并清空历史驳回原因
    /// - 重新添加待退选条目时仅清除 pending_drop 标记, 名额不重复占用
    ///
    /// # 错误
    /// - `UniqueConstraintViolation`: 条目已存在
    /// - `ForeignKeyViolation`: 时段不存在
    pub fn add_item(&self, krs_id: &str, slot_id: &str) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let state = Self::read_state(&tx, krs_id)?;
        if !state.is_editable() {
            return Err(RepositoryError::InvalidStateTransition {
                from: state.to_db_str().to_string(),
                to: KrsState::Draft.to_db_str().to_string(),
            });
        }

        let existing: Option<bool> = tx
            .query_row(
                "SELECT pending_drop FROM krs_item WHERE krs_id = ? AND slot_id = ?",
                params![krs_id, slot_id],
                |row| row.get::<_, i32>(0).map(|v| v != 0),
            )
            .optional()?;

        match existing {
            Some(true) => {
                // 撤销退选: 条目名额仍被占用,只需清除标记
                tx.execute(
                    "UPDATE krs_item SET pending_drop = 0 WHERE krs_id = ? AND slot_id = ?",
                    params![krs_id, slot_id],
                )?;
            }
            Some(false) => {
                return Err(RepositoryError::UniqueConstraintViolation(format!(
                    "选课条目已存在: krs_id={}, slot_id={}",
                    krs_id, slot_id
                )));
            }
            None => {
                tx.execute(
                    r#"INSERT INTO krs_item (krs_id, slot_id, added_at, committed_at, pending_drop)
                       VALUES (?, ?, datetime('now'), NULL, 0)"#,
                    params![krs_id, slot_id],
                )?;
            }
        }

        Self::touch_back_to_draft(&tx, krs_id)?;
        tx.commit()?;
        Ok(())
    }

    /// 从选课记录移除条目
    ///
    /// # 约束
    /// - 未生效条目直接删除
    /// - 已生效条目标记 pending_drop, 名额在下一次提交事务中释放
    pub fn remove_item(&self, krs_id: &str, slot_id: &str) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let state = Self::read_state(&tx, krs_id)?;
        if !state.is_editable() {
            return Err(RepositoryError::InvalidStateTransition {
                from: state.to_db_str().to_string(),
                to: KrsState::Draft.to_db_str().to_string(),
            });
        }

        let committed: Option<bool> = tx
            .query_row(
                "SELECT committed_at IS NOT NULL FROM krs_item WHERE krs_id = ? AND slot_id = ?",
                params![krs_id, slot_id],
                |row| row.get(0),
            )
            .optional()?;

        match committed {
            Some(true) => {
                tx.execute(
                    "UPDATE krs_item SET pending_drop = 1 WHERE krs_id = ? AND slot_id = ?",
                    params![krs_id, slot_id],
                )?;
            }
            Some(false) => {
                tx.execute(
                    "DELETE FROM krs_item WHERE krs_id = ? AND slot_id = ?",
                    params![krs_id, slot_id],
                )?;
            }
            None => {
                return Err(RepositoryError::NotFound {
                    entity: "KrsItem".to_string(),
                    id: format!("{}:{}", krs_id, slot_id),
                });
            }
        }

        Self::touch_back_to_draft(&tx, krs_id)?;
        tx.commit()?;
        Ok(())
    }

    // ==========================================
    // 状态迁移 (带乐观锁检查)
    // ==========================================

    /// 标记为 SUBMITTED（提交校验的入口）
    ///
    /// # 并发控制
    /// 使用乐观锁 (revision字段) 防止并发提交冲突
    ///
    /// # 返回
    /// - `Ok(new_revision)`: 迁移成功后的修订号
    ///
    /// # 错误
    /// - `OptimisticLockFailure`: revision不匹配 (其他请求已更新)
    /// - `InvalidStateTransition`: 已处于 SUBMITTED
    /// - `NotFound`: krs_id不存在
    pub fn mark_submitted(&self, krs_id: &str, expected_revision: i32) -> RepositoryResult<i32> {
        let conn = self.get_conn()?;

        let rows_affected = conn.execute(
            r#"UPDATE krs
               SET state = 'SUBMITTED', revision = revision + 1, updated_at = datetime('now')
               WHERE krs_id = ? AND revision = ?
                 AND state IN ('DRAFT', 'COMMITTED', 'REJECTED')"#,
            params![krs_id, expected_revision],
        )?;

        if rows_affected == 0 {
            return Err(Self::dispatch_update_miss(
                &conn,
                krs_id,
                expected_revision,
                KrsState::Submitted,
            )?);
        }

        Ok(expected_revision + 1)
    }

    /// 标记为 REJECTED 并落库驳回原因
    pub fn mark_rejected(
        &self,
        krs_id: &str,
        expected_revision: i32,
        reasons: &[RejectionReason],
    ) -> RepositoryResult<i32> {
        let conn = self.get_conn()?;

        let reasons_json = serde_json::to_string(reasons)
            .map_err(|e| RepositoryError::InternalError(format!("驳回原因序列化失败: {}", e)))?;

        let rows_affected = conn.execute(
            r#"UPDATE krs
               SET state = 'REJECTED', rejection_reasons_json = ?,
                   revision = revision + 1, updated_at = datetime('now')
               WHERE krs_id = ? AND revision = ? AND state = 'SUBMITTED'"#,
            params![&reasons_json, krs_id, expected_revision],
        )?;

        if rows_affected == 0 {
            return Err(Self::dispatch_update_miss(
                &conn,
                krs_id,
                expected_revision,
                KrsState::Rejected,
            )?);
        }

        Ok(expected_revision + 1)
    }

    /// 校验中止时退回 DRAFT（例如条目引用失效）
    pub fn revert_to_draft(&self, krs_id: &str, expected_revision: i32) -> RepositoryResult<i32> {
        let conn = self.get_conn()?;

        let rows_affected = conn.execute(
            r#"UPDATE krs
               SET state = 'DRAFT', revision = revision + 1, updated_at = datetime('now')
               WHERE krs_id = ? AND revision = ? AND state = 'SUBMITTED'"#,
            params![krs_id, expected_revision],
        )?;

        if rows_affected == 0 {
            return Err(Self::dispatch_update_miss(
                &conn,
                krs_id,
                expected_revision,
                KrsState::Draft,
            )?);
        }

        Ok(expected_revision + 1)
    }

    // ==========================================
    // 提交事务 (名额原子占用)
    // ==========================================

    /// 提交选课记录: 占用/释放名额并落 COMMITTED, 整体原子
    ///
    /// # 并发控制
    /// - BEGIN IMMEDIATE 在事务开始即取写锁, 避免升级死锁
    /// - 名额占用使用条件更新 "seats_taken < capacity", 检查与自增一步完成
    /// - reserve/release 均按 slot_id 升序执行, 钉死加锁顺序
    ///
    /// # 返回
    /// - `Ok(Committed)`: 全部占用成功, 记录已生效
    /// - `Ok(SeatUnavailable)`: 某时段名额不足, 事务已整体回滚, 无任何名额变动
    ///
    /// # 错误
    /// - `OptimisticLockFailure` / `InvalidStateTransition` / `NotFound`: 前置检查失败
    pub fn commit_krs(
        &self,
        krs_id: &str,
        expected_revision: i32,
        reserve_slot_ids: &[String],
        release_slot_ids: &[String],
    ) -> RepositoryResult<KrsCommitOutcome> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // === 步骤 1: 前置检查 (状态与修订号) ===
        let row: Option<(String, i32)> = tx
            .query_row(
                "SELECT state, revision FROM krs WHERE krs_id = ?",
                params![krs_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (state_str, actual_revision) = match row {
            Some(v) => v,
            None => {
                return Err(RepositoryError::NotFound {
                    entity: "Krs".to_string(),
                    id: krs_id.to_string(),
                });
            }
        };

        if actual_revision != expected_revision {
            return Err(RepositoryError::OptimisticLockFailure {
                krs_id: krs_id.to_string(),
                expected: expected_revision,
                actual: actual_revision,
            });
        }

        if !KrsState::from_str(&state_str).can_transition_to(KrsState::Committed) {
            return Err(RepositoryError::InvalidStateTransition {
                from: state_str,
                to: KrsState::Committed.to_db_str().to_string(),
            });
        }

        // === 步骤 2: 按 slot_id 升序占用新名额 ===
        let mut reserve_sorted: Vec<&String> = reserve_slot_ids.iter().collect();
        reserve_sorted.sort();
        for slot_id in reserve_sorted {
            let rows_affected = tx.execute(
                r#"UPDATE schedule_slot
                   SET seats_taken = seats_taken + 1
                   WHERE slot_id = ? AND seats_taken < capacity"#,
                params![slot_id],
            )?;

            if rows_affected == 0 {
                let exists: Option<i32> = tx
                    .query_row(
                        "SELECT 1 FROM schedule_slot WHERE slot_id = ?",
                        params![slot_id],
                        |row| row.get(0),
                    )
                    .optional()?;

                if exists.is_none() {
                    return Err(RepositoryError::NotFound {
                        entity: "ScheduleSlot".to_string(),
                        id: slot_id.to_string(),
                    });
                }

                // 名额已满: 丢弃事务, 此前占用的名额全部回滚
                return Ok(KrsCommitOutcome::SeatUnavailable {
                    slot_id: slot_id.to_string(),
                });
            }
        }

        // === 步骤 3: 按 slot_id 升序释放退选名额 ===
        let mut release_sorted: Vec<&String> = release_slot_ids.iter().collect();
        release_sorted.sort();
        for slot_id in release_sorted {
            let rows_affected = tx.execute(
                r#"UPDATE schedule_slot
                   SET seats_taken = seats_taken - 1
                   WHERE slot_id = ? AND seats_taken > 0"#,
                params![slot_id],
            )?;

            if rows_affected == 0 {
                return Err(RepositoryError::InternalError(format!(
                    "释放名额失败, 名额计数异常: slot_id={}",
                    slot_id
                )));
            }
        }

        // === 步骤 4: 更新条目状态 ===
        tx.execute(
            r#"UPDATE krs_item
               SET committed_at = datetime('now')
               WHERE krs_id = ? AND committed_at IS NULL AND pending_drop = 0"#,
            params![krs_id],
        )?;

        tx.execute(
            "DELETE FROM krs_item WHERE krs_id = ? AND pending_drop = 1",
            params![krs_id],
        )?;

        // === 步骤 5: 落 COMMITTED ===
        let rows_affected = tx.execute(
            r#"UPDATE krs
               SET state = 'COMMITTED', rejection_reasons_json = NULL,
                   revision = revision + 1, updated_at = datetime('now')
               WHERE krs_id = ? AND revision = ?"#,
            params![krs_id, expected_revision],
        )?;

        if rows_affected == 0 {
            return Err(RepositoryError::InternalError(format!(
                "提交落库失败, 修订号在事务内发生变化: krs_id={}",
                krs_id
            )));
        }

        tx.commit()?;

        Ok(KrsCommitOutcome::Committed {
            revision: expected_revision + 1,
        })
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    /// 读取当前状态（不存在时返回 NotFound）
    fn read_state(conn: &Connection, krs_id: &str) -> RepositoryResult<KrsState> {
        let state_str: Option<String> = conn
            .query_row(
                "SELECT state FROM krs WHERE krs_id = ?",
                params![krs_id],
                |row| row.get(0),
            )
            .optional()?;

        match state_str {
            Some(s) => Ok(KrsState::from_str(&s)),
            None => Err(RepositoryError::NotFound {
                entity: "Krs".to_string(),
                id: krs_id.to_string(),
            }),
        }
    }

    /// 编辑后统一收口: 状态拉回 DRAFT, 清空驳回原因, 修订号+1
    fn touch_back_to_draft(conn: &Connection, krs_id: &str) -> RepositoryResult<()> {
        conn.execute(
            r#"UPDATE krs
               SET state = 'DRAFT', rejection_reasons_json = NULL,
                   revision = revision + 1, updated_at = datetime('now')
               WHERE krs_id = ?"#,
            params![krs_id],
        )?;
        Ok(())
    }

    /// 条件更新未命中时区分三种原因: 不存在 / 乐观锁冲突 / 状态不符
    ///
    /// 约束: 先判修订号再判状态; 并发提交方把状态推进到 SUBMITTED 时
    /// 修订号必然已变, 必须报可重试的乐观锁冲突而非状态错误
    fn dispatch_update_miss(
        conn: &Connection,
        krs_id: &str,
        expected_revision: i32,
        target: KrsState,
    ) -> RepositoryResult<RepositoryError> {
        let row: Option<(String, i32)> = conn
            .query_row(
                "SELECT state, revision FROM krs WHERE krs_id = ?",
                params![krs_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            None => Ok(RepositoryError::NotFound {
                entity: "Krs".to_string(),
                id: krs_id.to_string(),
            }),
            Some((_, actual_revision)) if actual_revision != expected_revision => {
                Ok(RepositoryError::OptimisticLockFailure {
                    krs_id: krs_id.to_string(),
                    expected: expected_revision,
                    actual: actual_revision,
                })
            }
            Some((state_str, _)) => Ok(RepositoryError::InvalidStateTransition {
                from: state_str,
                to: target.to_db_str().to_string(),
            }),
        }
    }

    /// 装载选课条目
    fn load_items(&self, conn: &Connection, krs_id: &str) -> RepositoryResult<Vec<KrsItem>> {
        let mut stmt = conn.prepare(
            r#"SELECT krs_id, slot_id, added_at, committed_at, pending_drop
               FROM krs_item
               WHERE krs_id = ?
               ORDER BY slot_id"#,
        )?;

        let items = stmt
            .query_map(params![krs_id], |row| {
                Ok(KrsItem {
                    krs_id: row.get(0)?,
                    slot_id: row.get(1)?,
                    added_at: parse_datetime_col(row, 2)?,
                    committed_at: row.get::<_, Option<String>>(3)?.and_then(|s| {
                        chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S").ok()
                    }),
                    pending_drop: row.get::<_, i32>(4)? != 0,
                })
            })?
            .collect::<Result<Vec<KrsItem>, _>>()?;

        Ok(items)
    }

    /// 映射数据库行到Krs对象（条目由调用方另行装载）
    fn map_row(&self, row: &rusqlite::Row) -> rusqlite::Result<Krs> {
        let semester_str: String = row.get(3)?;
        let semester = Semester::from_str(&semester_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("无效的学期值: {}", semester_str).into(),
            )
        })?;

        let state_str: String = row.get(4)?;
        let reasons: Vec<RejectionReason> = row
            .get::<_, Option<String>>(5)?
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();

        Ok(Krs {
            krs_id: row.get(0)?,
            student_id: row.get(1)?,
            term: AcademicTerm {
                academic_year: row.get(2)?,
                semester,
            },
            state: KrsState::from_str(&state_str),
            items: Vec::new(),
            rejection_reasons: reasons,
            revision: row.get(6)?,
            created_at: parse_datetime_col(row, 7)?,
            updated_at: parse_datetime_col(row, 8)?,
        })
    }
}

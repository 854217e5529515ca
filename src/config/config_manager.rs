// ==========================================
// 校园教务选课系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写解析
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::term_config::{TermConfigReader, TermRules};
use crate::db::open_sqlite_connection;
use crate::domain::types::{AcademicTerm, GradeLetter};
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 参数
    /// - key: 配置键
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    ///
    /// # 参数
    /// - key: 配置键
    /// - value: 配置值 (统一按字符串存储)
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            r#"INSERT INTO config_kv (scope_id, key, value, updated_at)
               VALUES ('global', ?1, ?2, datetime('now'))
               ON CONFLICT(scope_id, key) DO UPDATE SET
                   value = excluded.value,
                   updated_at = excluded.updated_at"#,
            params![key, value],
        )?;

        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    ///
    /// # 参数
    /// - key: 配置键
    /// - default: 默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }
}

// ==========================================
// TermConfigReader Trait 实现
// ==========================================
#[async_trait]
impl TermConfigReader for ConfigManager {
    async fn get_max_sks(&self, program_code: Option<&str>) -> Result<i32, Box<dyn Error>> {
        // 专业级覆写优先
        if let Some(program) = program_code {
            let key = config_keys::max_sks_key_for_program(program);
            if let Some(value) = self.get_config_value(&key)? {
                if let Ok(parsed) = value.parse::<i32>() {
                    return Ok(parsed);
                }
                tracing::warn!(
                    config_key = %key,
                    raw_value = %value,
                    "专业级学分上限配置格式错误，回退到全局配置"
                );
            }
        }

        let value = self.get_config_or_default(config_keys::TERM_MAX_SKS, "24")?;
        Ok(value.parse::<i32>().unwrap_or(24))
    }

    async fn get_min_passing_grade(&self) -> Result<GradeLetter, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::TERM_MIN_PASSING_GRADE, "C")?;
        Ok(GradeLetter::from_str(&value).unwrap_or(GradeLetter::C))
    }

    async fn get_enrollment_deadline(&self, term: &AcademicTerm) -> Result<NaiveDate, Box<dyn Error>> {
        // 学期级覆写优先
        let term_key = config_keys::deadline_key_for_term(&term.code());
        let value = match self.get_config_value(&term_key)? {
            Some(v) => v,
            None => self.get_config_or_default(config_keys::TERM_ENROLLMENT_DEADLINE, "9999-12-31")?,
        };

        match NaiveDate::parse_from_str(&value, "%Y-%m-%d") {
            Ok(date) => Ok(date),
            Err(_) => {
                tracing::warn!(
                    raw_value = %value,
                    "选课截止日期配置格式错误，视为不限制"
                );
                Ok(NaiveDate::from_ymd_opt(9999, 12, 31)
                    .unwrap_or(NaiveDate::MAX))
            }
        }
    }

    async fn get_submit_retry_attempts(&self) -> Result<u32, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::TERM_SUBMIT_RETRY_ATTEMPTS, "3")?;
        // 至少尝试一次
        Ok(value.parse::<u32>().unwrap_or(3).max(1))
    }

    async fn get_term_rules(
        &self,
        term: &AcademicTerm,
        program_code: Option<&str>,
    ) -> Result<TermRules, Box<dyn Error>> {
        // 逐项读取后再组装: 避免在结构体字面量中跨 await 持有
        // 非 Send 的中间值, 保证返回的 future 可跨线程调度
        let max_sks = self.get_max_sks(program_code).await?;
        let min_passing_grade = self.get_min_passing_grade().await?;
        let enrollment_deadline = self.get_enrollment_deadline(term).await?;
        let submit_retry_attempts = self.get_submit_retry_attempts().await?;

        Ok(TermRules {
            max_sks,
            min_passing_grade,
            enrollment_deadline,
            submit_retry_attempts,
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 学分上限
    pub const TERM_MAX_SKS: &str = "term.max_sks";

    // 先修判定的最低及格等级
    pub const TERM_MIN_PASSING_GRADE: &str = "term.min_passing_grade";

    // 选课截止日期
    pub const TERM_ENROLLMENT_DEADLINE: &str = "term.enrollment_deadline";

    // 提交重试次数
    pub const TERM_SUBMIT_RETRY_ATTEMPTS: &str = "term.submit_retry_attempts";

    /// 专业级学分上限覆写键 (term.max_sks.{专业代码})
    pub fn max_sks_key_for_program(program_code: &str) -> String {
        format!("{}.{}", TERM_MAX_SKS, program_code)
    }

    /// 学期级截止日期覆写键 (term.enrollment_deadline.{学期编码})
    pub fn deadline_key_for_term(term_code: &str) -> String {
        format!("{}.{}", TERM_ENROLLMENT_DEADLINE, term_code)
    }
}

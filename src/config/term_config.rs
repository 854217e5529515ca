// ==========================================
// 校园教务选课系统 - 学期规则读取 Trait
// ==========================================
// 职责: 定义选课引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含校验逻辑
// ==========================================

use crate::domain::types::{AcademicTerm, GradeLetter};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::error::Error;

/// 一次提交所需的全部学期规则快照
///
/// 在提交开始时一次性读取, 同一次校验过程内口径不变
#[derive(Debug, Clone)]
pub struct TermRules {
    pub max_sks: i32,                  // 学分上限
    pub min_passing_grade: GradeLetter, // 先修判定的最低及格等级
    pub enrollment_deadline: NaiveDate, // 选课截止日期 (含当日)
    pub submit_retry_attempts: u32,    // 并发冲突内部重试次数
}

// ==========================================
// TermConfigReader Trait
// ==========================================
// 用途: 选课引擎所需的学期规则读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait TermConfigReader: Send + Sync {
    /// 获取学分上限
    ///
    /// # 参数
    /// - program_code: 专业代码, 存在专业级覆写 (term.max_sks.{专业代码}) 时优先生效
    ///
    /// # 默认值
    /// - 24
    async fn get_max_sks(&self, program_code: Option<&str>) -> Result<i32, Box<dyn Error>>;

    /// 获取先修判定的最低及格等级
    ///
    /// # 返回
    /// - GradeLetter: 低于该等级的成绩视为未通过
    ///
    /// # 默认值
    /// - C
    async fn get_min_passing_grade(&self) -> Result<GradeLetter, Box<dyn Error>>;

    /// 获取选课截止日期
    ///
    /// # 参数
    /// - term: 学期, 存在学期级覆写 (term.enrollment_deadline.{学期编码}) 时优先生效
    ///
    /// # 默认值
    /// - 9999-12-31 (未配置时不限制)
    async fn get_enrollment_deadline(&self, term: &AcademicTerm) -> Result<NaiveDate, Box<dyn Error>>;

    /// 获取提交遇并发冲突时的内部重试次数
    ///
    /// # 默认值
    /// - 3
    async fn get_submit_retry_attempts(&self) -> Result<u32, Box<dyn Error>>;

    /// 组装学期规则快照
    ///
    /// # 参数
    /// - term: 学期
    /// - program_code: 学生所属专业代码
    async fn get_term_rules(
        &self,
        term: &AcademicTerm,
        program_code: Option<&str>,
    ) -> Result<TermRules, Box<dyn Error>>;
}

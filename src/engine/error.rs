// ==========================================
// 校园教务选课系统 - 引擎层错误类型
// ==========================================
// 约定: 校验驳回 (SubmitOutcome::Rejected) 不是错误;
//       这里只表达无法继续提交流程的异常情况
// ==========================================

use crate::repository::error::RepositoryError;
use chrono::NaiveDate;
use thiserror::Error;

/// 选课引擎错误类型
#[derive(Error, Debug)]
pub enum EnrollmentError {
    /// 引用了不存在的实体 (学生/课程/时段/选课记录), 不可重试
    #[error("无效引用: {entity} with id={id}")]
    InvalidReference { entity: String, id: String },

    /// 并发冲突且内部重试耗尽, 调用方应提示"稍后重试"
    #[error("并发冲突, 已重试{attempts}次仍失败, 请稍后重试")]
    ConcurrentModification { attempts: u32 },

    /// 超过选课截止日期
    #[error("已超过选课截止日期: {deadline}")]
    DeadlinePassed { deadline: NaiveDate },

    /// 学生学籍状态不允许选课
    #[error("学籍状态不允许选课: student_id={student_id}, status={status}")]
    StudentNotEligible { student_id: String, status: String },

    /// 配置读取失败
    #[error("配置读取失败: {0}")]
    Config(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result 类型别名
pub type EnrollmentResult<T> = Result<T, EnrollmentError>;

impl EnrollmentError {
    /// 判断该错误是否值得整体重试 (重新校验后再提交)
    ///
    /// 约束: 只有乐观锁冲突和数据库 busy 属于瞬时冲突;
    /// 无效引用/截止日期等重试也不会变好
    pub fn is_retryable(&self) -> bool {
        match self {
            EnrollmentError::Repository(RepositoryError::OptimisticLockFailure { .. }) => true,
            EnrollmentError::Repository(RepositoryError::DatabaseQueryError(msg)) => {
                msg.contains("locked") || msg.contains("busy")
            }
            _ => false,
        }
    }
}

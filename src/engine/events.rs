// ==========================================
// 校园教务选课系统 - 引擎层事件发布
// ==========================================
// 职责: 定义选课事件发布 trait, 实现依赖倒置
// 说明: Engine 层定义 trait, 外层 (通知/消息) 实现适配器;
//       引擎不关心事件被谁消费
// ==========================================

use crate::domain::types::KrsState;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 选课事件类型
// ==========================================

/// 选课事件触发类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnrollmentEventType {
    /// 提交进入校验
    SubmissionStarted,
    /// 提交生效, 名额已占用
    KrsCommitted,
    /// 提交被驳回
    KrsRejected,
}

impl EnrollmentEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentEventType::SubmissionStarted => "SubmissionStarted",
            EnrollmentEventType::KrsCommitted => "KrsCommitted",
            EnrollmentEventType::KrsRejected => "KrsRejected",
        }
    }
}

/// 选课事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentEvent {
    pub krs_id: String,
    pub student_id: String,
    pub term_code: String,
    pub event_type: EnrollmentEventType,
    /// 事件发生后的记录状态
    pub state: KrsState,
    /// 驳回原因数量 (非驳回事件为 0)
    pub rejection_count: usize,
}

impl EnrollmentEvent {
    pub fn new(
        krs_id: &str,
        student_id: &str,
        term_code: &str,
        event_type: EnrollmentEventType,
        state: KrsState,
    ) -> Self {
        Self {
            krs_id: krs_id.to_string(),
            student_id: student_id.to_string(),
            term_code: term_code.to_string(),
            event_type,
            state,
            rejection_count: 0,
        }
    }

    pub fn with_rejection_count(mut self, count: usize) -> Self {
        self.rejection_count = count;
        self
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 选课事件发布者 Trait
///
/// Engine 层定义, 外层实现; 发布失败不影响提交结果本身
pub trait EnrollmentEventPublisher: Send + Sync {
    fn publish(&self, event: EnrollmentEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
///
/// 用于不需要事件通知的场景 (如单元测试)
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl EnrollmentEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: EnrollmentEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            krs_id = %event.krs_id,
            event_type = event.event_type.as_str(),
            "NoOpEventPublisher: 跳过事件发布"
        );
        Ok(())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn EnrollmentEventPublisher>> 的使用
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn EnrollmentEventPublisher>>,
}

impl OptionalEventPublisher {
    pub fn with_publisher(publisher: Arc<dyn EnrollmentEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件 (未配置发布者时静默跳过)
    pub fn publish(&self, event: EnrollmentEvent) {
        if let Some(publisher) = &self.inner {
            if let Err(e) = publisher.publish(event) {
                // 事件通知尽力而为, 失败只告警不中断提交
                tracing::warn!("选课事件发布失败: {}", e);
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}

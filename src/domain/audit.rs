// ==========================================
// 校园教务选课系统 - 选课审计日志实体
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// 选课审计条目 (Audit Entry)
///
/// 记录选课流程中的关键操作, 用于事后追溯
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub audit_id: String,              // 审计ID
    pub krs_id: Option<String>,        // 关联的选课记录ID (全局操作为 None)
    pub operation: String,             // 操作类型
    pub actor: String,                 // 操作人 (学号或管理员账号)
    pub payload_json: Option<JsonValue>, // 操作载荷
    pub detail: Option<String>,        // 补充说明
    pub created_at: NaiveDateTime,
}

/// 审计操作类型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOperation {
    CreateDraft, // 创建草稿
    AddItem,     // 加选
    RemoveItem,  // 退选
    SubmitKrs,   // 提交
    CommitKrs,   // 生效
    RejectKrs,   // 驳回
    GrantWaiver, // 授予先修豁免
}

impl AuditOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOperation::CreateDraft => "CREATE_DRAFT",
            AuditOperation::AddItem => "ADD_ITEM",
            AuditOperation::RemoveItem => "REMOVE_ITEM",
            AuditOperation::SubmitKrs => "SUBMIT_KRS",
            AuditOperation::CommitKrs => "COMMIT_KRS",
            AuditOperation::RejectKrs => "REJECT_KRS",
            AuditOperation::GrantWaiver => "GRANT_WAIVER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CREATE_DRAFT" => Some(AuditOperation::CreateDraft),
            "ADD_ITEM" => Some(AuditOperation::AddItem),
            "REMOVE_ITEM" => Some(AuditOperation::RemoveItem),
            "SUBMIT_KRS" => Some(AuditOperation::SubmitKrs),
            "COMMIT_KRS" => Some(AuditOperation::CommitKrs),
            "REJECT_KRS" => Some(AuditOperation::RejectKrs),
            "GRANT_WAIVER" => Some(AuditOperation::GrantWaiver),
            _ => None,
        }
    }
}

impl AuditEntry {
    /// 创建审计条目
    pub fn new(operation: AuditOperation, actor: &str, krs_id: Option<&str>) -> Self {
        Self {
            audit_id: uuid::Uuid::new_v4().to_string(),
            krs_id: krs_id.map(|s| s.to_string()),
            operation: operation.as_str().to_string(),
            actor: actor.to_string(),
            payload_json: None,
            detail: None,
            created_at: chrono::Local::now().naive_local(),
        }
    }

    /// 附加操作载荷
    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload_json = Some(payload);
        self
    }

    /// 附加补充说明
    pub fn with_detail(mut self, detail: &str) -> Self {
        self.detail = Some(detail.to_string());
        self
    }
}

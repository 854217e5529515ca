// ==========================================
// 校园教务选课系统 - 选课记录实体 (KRS)
// ==========================================

use crate::domain::types::{AcademicTerm, GradeLetter, KrsState, RejectionKind};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 选课记录 (KRS)
///
/// 一个学生在一个学期内唯一的选课单, 携带条目列表与驳回原因
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Krs {
    pub krs_id: String,                        // 选课记录ID
    pub student_id: String,                    // 学号
    pub term: AcademicTerm,                    // 所属学期
    pub state: KrsState,                       // 当前状态
    pub items: Vec<KrsItem>,                   // 选课条目
    pub rejection_reasons: Vec<RejectionReason>, // 最近一次驳回的原因 (非 REJECTED 时为空)
    pub revision: i32,                         // 乐观锁：修订号
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Krs {
    /// 判断是否处于草稿态
    pub fn is_draft(&self) -> bool {
        self.state == KrsState::Draft
    }

    /// 判断是否已生效
    pub fn is_committed(&self) -> bool {
        self.state == KrsState::Committed
    }

    /// 有效条目 (排除待退选条目)
    pub fn active_items(&self) -> impl Iterator<Item = &KrsItem> {
        self.items.iter().filter(|item| !item.pending_drop)
    }

    /// 本次提交需要新占名额的时段 (未生效且非待退选)
    pub fn slots_to_reserve(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .items
            .iter()
            .filter(|item| !item.pending_drop && !item.is_committed())
            .map(|item| item.slot_id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// 本次提交需要释放名额的时段 (已生效且标记退选)
    pub fn slots_to_release(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .items
            .iter()
            .filter(|item| item.pending_drop && item.is_committed())
            .map(|item| item.slot_id.clone())
            .collect();
        ids.sort();
        ids
    }
}

/// 选课条目 (KRS Item)
///
/// committed_at 记录名额实际占用的时刻;
/// pending_drop 标记修订周期中待退选的已生效条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KrsItem {
    pub krs_id: String,                     // 所属选课记录ID
    pub slot_id: String,                    // 开课时段ID
    pub added_at: NaiveDateTime,            // 加入草稿的时刻
    pub committed_at: Option<NaiveDateTime>, // 名额占用时刻 (未生效为 None)
    pub pending_drop: bool,                 // 待退选标记
}

impl KrsItem {
    /// 判断条目名额是否已占用
    pub fn is_committed(&self) -> bool {
        self.committed_at.is_some()
    }
}

/// 修读完成记录 (Completion Record)
///
/// grade 为 None 表示课程仍在修读中 (in-progress), 不满足先修要求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub student_id: String,         // 学号
    pub course_id: String,          // 课程ID
    pub grade: Option<GradeLetter>, // 成绩等级 (修读中为 None)
    pub term_code: String,          // 修读学期编码
}

impl CompletionRecord {
    /// 判断该记录是否以合格成绩完成
    pub fn is_passed(&self, min_passing: GradeLetter) -> bool {
        match self.grade {
            Some(grade) => grade.satisfies(min_passing),
            None => false,
        }
    }
}

/// 驳回原因 (Rejection Reason)
///
/// 结构化三元组: 原因类型 + 受影响对象 + 人话描述,
/// details 携带机器可读的补充信息 (如冲突窗口)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectionReason {
    pub reason_kind: RejectionKind,           // 原因类型
    pub affected_item: String,                // 受影响的对象ID (时段/课程/选课记录)
    pub detail: String,                       // 描述
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,   // 结构化补充信息
}

impl RejectionReason {
    pub fn new(reason_kind: RejectionKind, affected_item: &str, detail: &str) -> Self {
        Self {
            reason_kind,
            affected_item: affected_item.to_string(),
            detail: detail.to_string(),
            details: None,
        }
    }

    /// 附加结构化补充信息
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// 提交成功摘要 (Commit Summary)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KrsCommitSummary {
    pub krs_id: String,             // 选课记录ID
    pub committed_slots: Vec<String>, // 新占名额的时段
    pub released_slots: Vec<String>,  // 释放名额的时段
    pub total_sks: i32,             // 生效后的总学分
    pub revision: i32,              // 生效后的修订号
}

/// 提交结果 (Submit Outcome)
///
/// 校验驳回是业务结果而非错误, 和基础设施错误分开表达
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmitOutcome {
    Committed(KrsCommitSummary),
    Rejected { reasons: Vec<RejectionReason> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Semester;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 8, 10)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn item(slot_id: &str, committed: bool, pending_drop: bool) -> KrsItem {
        KrsItem {
            krs_id: "KRS-1".to_string(),
            slot_id: slot_id.to_string(),
            added_at: ts(),
            committed_at: if committed { Some(ts()) } else { None },
            pending_drop,
        }
    }

    #[test]
    fn test_reserve_and_release_split() {
        let krs = Krs {
            krs_id: "KRS-1".to_string(),
            student_id: "2023010001".to_string(),
            term: AcademicTerm::new(2025, Semester::Odd),
            state: KrsState::Draft,
            items: vec![
                item("SLOT-B", false, false), // 新增, 待占名额
                item("SLOT-A", false, false), // 新增, 待占名额
                item("SLOT-C", true, false),  // 已生效保留, 不重复占
                item("SLOT-D", true, true),   // 已生效退选, 待释放
            ],
            rejection_reasons: vec![],
            revision: 3,
            created_at: ts(),
            updated_at: ts(),
        };

        // 占用列表按ID升序 (锁顺序确定性)
        assert_eq!(krs.slots_to_reserve(), vec!["SLOT-A", "SLOT-B"]);
        assert_eq!(krs.slots_to_release(), vec!["SLOT-D"]);
        assert_eq!(krs.active_items().count(), 3);
    }

    #[test]
    fn test_completion_in_progress_not_passed() {
        let record = CompletionRecord {
            student_id: "2023010001".to_string(),
            course_id: "C-1".to_string(),
            grade: None,
            term_code: "2025-ODD".to_string(),
        };
        // 修读中不算通过
        assert!(!record.is_passed(GradeLetter::C));
    }

    #[test]
    fn test_completion_failing_grade_not_passed() {
        let record = CompletionRecord {
            student_id: "2023010001".to_string(),
            course_id: "C-1".to_string(),
            grade: Some(GradeLetter::E),
            term_code: "2024-EVEN".to_string(),
        };
        assert!(!record.is_passed(GradeLetter::C));
    }
}

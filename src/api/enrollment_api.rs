// ==========================================
// 校园教务选课系统 - 选课 API
// ==========================================
// 职责: 草稿维护 + 提交入口 + 审计记录
// 红线: API 层只做输入校验与编排, 校验规则在 Engine,
//       数据访问在 Repository
// 红线: 同一课程在一份草稿中最多一个时段 (在引擎之前拦截)
// ==========================================

use std::sync::Arc;

use chrono::Local;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::ConfigManager;
use crate::domain::audit::{AuditEntry, AuditOperation};
use crate::domain::course::PrerequisiteWaiver;
use crate::domain::krs::{Krs, KrsCommitSummary, SubmitOutcome};
use crate::domain::types::{AcademicTerm, KrsState};
use crate::engine::catalog::CatalogReader;
use crate::engine::enrollment::EnrollmentEngine;
use crate::repository::{AuditRepository, CourseRepository, KrsRepository};

// ==========================================
// EnrollmentApi - 选课 API
// ==========================================

/// 选课API
///
/// 职责:
/// 1. 选课草稿的创建与条目增删
/// 2. 提交入口 (委托 EnrollmentEngine)
/// 3. 先修豁免授予
/// 4. 审计轨迹记录与查询
pub struct EnrollmentApi {
    krs_repo: Arc<KrsRepository>,
    course_repo: Arc<CourseRepository>,
    audit_repo: Arc<AuditRepository>,
    catalog: Arc<dyn CatalogReader>,
    engine: Arc<EnrollmentEngine<ConfigManager>>,
}

impl EnrollmentApi {
    /// 创建新的EnrollmentApi实例
    pub fn new(
        krs_repo: Arc<KrsRepository>,
        course_repo: Arc<CourseRepository>,
        audit_repo: Arc<AuditRepository>,
        catalog: Arc<dyn CatalogReader>,
        engine: Arc<EnrollmentEngine<ConfigManager>>,
    ) -> Self {
        Self {
            krs_repo,
            course_repo,
            audit_repo,
            catalog,
            engine,
        }
    }

    // ==========================================
    // 草稿维护
    // ==========================================

    /// 创建选课草稿
    ///
    /// # 参数
    /// - student_id: 学号
    /// - term: 学期
    /// - actor: 操作人
    ///
    /// # 返回
    /// - Ok(krs_id): 新建草稿的ID
    #[instrument(skip(self), fields(student_id = %student_id, term = %term))]
    pub async fn create_draft(
        &self,
        student_id: &str,
        term: AcademicTerm,
        actor: &str,
    ) -> ApiResult<String> {
        if student_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("学号不能为空".to_string()));
        }

        let student = self
            .catalog
            .load_student(student_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Student(id={})不存在", student_id)))?;

        if !student.can_enroll() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "学籍状态不允许选课: student_id={}, status={}",
                student.student_id, student.status
            )));
        }

        if self
            .krs_repo
            .find_by_student_term(student_id, &term)?
            .is_some()
        {
            return Err(ApiError::BusinessRuleViolation(format!(
                "该学生在学期{}已有选课记录",
                term.code()
            )));
        }

        let now = Local::now().naive_local();
        let krs = Krs {
            krs_id: Uuid::new_v4().to_string(),
            student_id: student_id.to_string(),
            term,
            state: KrsState::Draft,
            items: Vec::new(),
            rejection_reasons: Vec::new(),
            revision: 0,
            created_at: now,
            updated_at: now,
        };

        let krs_id = self.krs_repo.create_draft(&krs)?;
        self.record_audit(
            AuditEntry::new(AuditOperation::CreateDraft, actor, Some(&krs_id))
                .with_payload(serde_json::json!({
                    "student_id": student_id,
                    "term": term.code(),
                })),
        );

        Ok(krs_id)
    }

    /// 向草稿添加选课条目
    ///
    /// # 约束
    /// - 时段必须属于该选课记录的学期
    /// - 同一课程在一份草稿中最多一个时段
    #[instrument(skip(self), fields(krs_id = %krs_id, slot_id = %slot_id))]
    pub async fn add_item(&self, krs_id: &str, slot_id: &str, actor: &str) -> ApiResult<()> {
        if krs_id.trim().is_empty() || slot_id.trim().is_empty() {
            return Err(ApiError::InvalidInput(
                "选课记录ID与时段ID不能为空".to_string(),
            ));
        }

        let krs = self
            .krs_repo
            .find_by_id(krs_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Krs(id={})不存在", krs_id)))?;

        let slot = self
            .catalog
            .load_schedule_slot(slot_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("ScheduleSlot(id={})不存在", slot_id)))?;

        if slot.term_code != krs.term.code() {
            return Err(ApiError::InvalidInput(format!(
                "时段{}不在学期{}内开课",
                slot_id,
                krs.term.code()
            )));
        }

        // 同一课程多时段在这里拦截, 不进引擎
        for item in krs.active_items() {
            if item.slot_id == slot.slot_id {
                continue; // 重复条目交由仓储的唯一约束处理
            }
            let existing = self
                .catalog
                .load_schedule_slot(&item.slot_id)
                .await?
                .ok_or_else(|| {
                    ApiError::NotFound(format!("ScheduleSlot(id={})不存在", item.slot_id))
                })?;
            if existing.course_id == slot.course_id {
                return Err(ApiError::InvalidInput(format!(
                    "课程{}已在草稿中选择了时段{}, 同一课程只能选择一个时段",
                    slot.course_id, existing.slot_id
                )));
            }
        }

        self.krs_repo.add_item(krs_id, slot_id)?;
        self.record_audit(
            AuditEntry::new(AuditOperation::AddItem, actor, Some(krs_id))
                .with_payload(serde_json::json!({
                    "slot_id": slot_id,
                    "course_id": slot.course_id,
                })),
        );

        Ok(())
    }

    /// 从草稿移除选课条目 (已生效条目标记退选, 下次提交时释放名额)
    #[instrument(skip(self), fields(krs_id = %krs_id, slot_id = %slot_id))]
    pub fn remove_item(&self, krs_id: &str, slot_id: &str, actor: &str) -> ApiResult<()> {
        if krs_id.trim().is_empty() || slot_id.trim().is_empty() {
            return Err(ApiError::InvalidInput(
                "选课记录ID与时段ID不能为空".to_string(),
            ));
        }

        self.krs_repo.remove_item(krs_id, slot_id)?;
        self.record_audit(
            AuditEntry::new(AuditOperation::RemoveItem, actor, Some(krs_id))
                .with_payload(serde_json::json!({ "slot_id": slot_id })),
        );

        Ok(())
    }

    /// 查询选课记录 (含条目与最近驳回原因)
    pub fn get_krs(&self, krs_id: &str) -> ApiResult<Krs> {
        self.krs_repo
            .find_by_id(krs_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Krs(id={})不存在", krs_id)))
    }

    /// 按 (学生, 学期) 查询选课记录
    pub fn get_krs_by_student_term(
        &self,
        student_id: &str,
        term: &AcademicTerm,
    ) -> ApiResult<Option<Krs>> {
        Ok(self.krs_repo.find_by_student_term(student_id, term)?)
    }

    // ==========================================
    // 提交
    // ==========================================

    /// 提交选课记录
    ///
    /// # 返回
    /// - Ok(KrsCommitSummary): 整单生效
    /// - Err(RejectedSubmission): 校验驳回, reasons 携带逐项原因 (HTTP 422)
    /// - Err(TryAgain): 并发冲突重试耗尽 (HTTP 409)
    #[instrument(skip(self), fields(krs_id = %krs_id))]
    pub async fn submit(&self, krs_id: &str, actor: &str) -> ApiResult<KrsCommitSummary> {
        self.submit_at(krs_id, actor, Local::now().date_naive()).await
    }

    /// 提交选课记录 (指定当前日期, 测试与补录场景用)
    pub async fn submit_at(
        &self,
        krs_id: &str,
        actor: &str,
        today: chrono::NaiveDate,
    ) -> ApiResult<KrsCommitSummary> {
        // 提交动作本身入审计, 结果 (COMMIT/REJECT) 另记一条
        self.record_audit(AuditEntry::new(AuditOperation::SubmitKrs, actor, Some(krs_id)));

        let outcome = self.engine.submit_at(krs_id, today).await?;
        self.finish_submit(krs_id, actor, outcome)
    }

    fn finish_submit(
        &self,
        krs_id: &str,
        actor: &str,
        outcome: SubmitOutcome,
    ) -> ApiResult<KrsCommitSummary> {
        match outcome {
            SubmitOutcome::Committed(summary) => {
                self.record_audit(
                    AuditEntry::new(AuditOperation::CommitKrs, actor, Some(krs_id))
                        .with_payload(serde_json::json!({
                            "committed_slots": summary.committed_slots,
                            "released_slots": summary.released_slots,
                            "total_sks": summary.total_sks,
                            "revision": summary.revision,
                        })),
                );
                Ok(summary)
            }
            SubmitOutcome::Rejected { reasons } => {
                self.record_audit(
                    AuditEntry::new(AuditOperation::RejectKrs, actor, Some(krs_id))
                        .with_payload(serde_json::json!({ "reasons": reasons }))
                        .with_detail(&format!("{}项驳回原因", reasons.len())),
                );
                Err(ApiError::RejectedSubmission { reasons })
            }
        }
    }

    // ==========================================
    // 先修豁免
    // ==========================================

    /// 授予先修豁免 (教务管理操作)
    #[instrument(skip(self, waiver), fields(student_id = %waiver.student_id, course_id = %waiver.course_id))]
    pub fn grant_waiver(&self, waiver: &PrerequisiteWaiver) -> ApiResult<()> {
        if waiver.student_id.trim().is_empty()
            || waiver.course_id.trim().is_empty()
            || waiver.prereq_course_id.trim().is_empty()
        {
            return Err(ApiError::InvalidInput(
                "豁免三元组 (学生, 课程, 先修课程) 不能为空".to_string(),
            ));
        }

        self.course_repo.grant_waiver(waiver)?;
        self.record_audit(
            AuditEntry::new(AuditOperation::GrantWaiver, &waiver.granted_by, None)
                .with_payload(serde_json::json!({
                    "student_id": waiver.student_id,
                    "course_id": waiver.course_id,
                    "prereq_course_id": waiver.prereq_course_id,
                })),
        );

        Ok(())
    }

    // ==========================================
    // 审计查询
    // ==========================================

    /// 查询选课记录的审计轨迹
    pub fn audit_trail(&self, krs_id: &str) -> ApiResult<Vec<AuditEntry>> {
        Ok(self.audit_repo.find_by_krs(krs_id)?)
    }

    /// 审计写入 (尽力而为, 失败只告警不中断业务操作)
    fn record_audit(&self, entry: AuditEntry) {
        if let Err(e) = self.audit_repo.insert(&entry) {
            warn!(operation = %entry.operation, "审计写入失败: {}", e);
        }
    }
}

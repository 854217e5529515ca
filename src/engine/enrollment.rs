// ==========================================
// 校园教务选课系统 - 选课提交引擎
// ==========================================
// 职责: 编排冲突检测/先修校验/容量守卫, 产出整单通过或
//       整单驳回的提交结果 (不存在"选上一半"的中间态)
// 红线: 校验阶段 (步骤1-3) 全部只读; 名额变更只发生在
//       KrsRepository.commit_krs 的提交事务内
// 红线: 所有驳回必须携带结构化原因, 一次提交报告全部问题
// ==========================================

use crate::config::term_config::{TermConfigReader, TermRules};
use crate::domain::course::Course;
use crate::domain::krs::{Krs, KrsCommitSummary, RejectionReason, SubmitOutcome};
use crate::domain::schedule::ScheduleSlot;
use crate::domain::student::Student;
use crate::domain::types::{KrsState, RejectionKind};
use crate::engine::capacity::CapacityGuard;
use crate::engine::catalog::CatalogReader;
use crate::engine::conflict::ConflictDetector;
use crate::engine::error::{EnrollmentError, EnrollmentResult};
use crate::engine::events::{EnrollmentEvent, EnrollmentEventType, OptionalEventPublisher};
use crate::engine::prerequisite::PrerequisiteValidator;
use crate::repository::{KrsCommitOutcome, KrsRepository};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

// ==========================================
// EnrollmentEngine - 选课提交引擎
// ==========================================
pub struct EnrollmentEngine<C>
where
    C: TermConfigReader,
{
    config: Arc<C>,
    catalog: Arc<dyn CatalogReader>,
    krs_repo: Arc<KrsRepository>,
    detector: ConflictDetector,
    prereq_validator: PrerequisiteValidator,
    capacity_guard: CapacityGuard,
    events: OptionalEventPublisher,
}

impl<C> EnrollmentEngine<C>
where
    C: TermConfigReader,
{
    /// 创建新的 EnrollmentEngine 实例
    ///
    /// # 参数
    /// - config: 学期规则读取器
    /// - catalog: 目录只读视图
    /// - krs_repo: 选课记录仓储 (唯一的名额写入口)
    /// - events: 事件发布器 (可为空)
    pub fn new(
        config: Arc<C>,
        catalog: Arc<dyn CatalogReader>,
        krs_repo: Arc<KrsRepository>,
        events: OptionalEventPublisher,
    ) -> Self {
        Self {
            config,
            catalog,
            krs_repo,
            detector: ConflictDetector::new(),
            prereq_validator: PrerequisiteValidator::new(),
            capacity_guard: CapacityGuard::new(),
            events,
        }
    }

    /// 提交选课记录 (以当前日期做截止检查)
    pub async fn submit(&self, krs_id: &str) -> EnrollmentResult<SubmitOutcome> {
        self.submit_at(krs_id, chrono::Local::now().date_naive()).await
    }

    /// 提交选课记录
    ///
    /// # 流程
    /// 1. 加载记录/学生, 检查学籍与截止日期
    /// 2. 迁移到 SUBMITTED (乐观锁)
    /// 3. 校验: 冲突检测 -> 先修校验 -> 学分上限 + 名额预检 (全部只读)
    /// 4. 任一原因 -> 整单 REJECTED, 名额零变更
    /// 5. 全部通过 -> 提交事务内原子占用/释放名额, 落 COMMITTED
    ///
    /// # 并发控制
    /// 乐观锁冲突或数据库 busy 时整体重试 (重新校验),
    /// 次数由 term.submit_retry_attempts 控制; 耗尽后返回
    /// ConcurrentModification, 不与 SeatUnavailable 混淆
    #[instrument(skip(self), fields(krs_id = %krs_id))]
    pub async fn submit_at(&self, krs_id: &str, today: NaiveDate) -> EnrollmentResult<SubmitOutcome> {
        let max_attempts = self
            .config
            .get_submit_retry_attempts()
            .await
            .map_err(|e| EnrollmentError::Config(e.to_string()))?;

        for attempt in 1..=max_attempts {
            match self.submit_once(krs_id, today).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_retryable() => {
                    if attempt < max_attempts {
                        warn!(
                            attempt,
                            max_attempts,
                            error = %e,
                            "提交遇并发冲突, 重新校验后重试"
                        );
                        continue;
                    }
                    warn!(max_attempts, "提交重试耗尽");
                    return Err(EnrollmentError::ConcurrentModification {
                        attempts: max_attempts,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        // max_attempts 由配置保证至少为 1, 循环必有返回
        Err(EnrollmentError::ConcurrentModification {
            attempts: max_attempts,
        })
    }

    /// 单次提交尝试 (重试循环的循环体)
    async fn submit_once(&self, krs_id: &str, today: NaiveDate) -> EnrollmentResult<SubmitOutcome> {
        // === 步骤 1: 加载与前置检查 ===
        let krs = self
            .krs_repo
            .find_by_id(krs_id)?
            .ok_or_else(|| EnrollmentError::InvalidReference {
                entity: "Krs".to_string(),
                id: krs_id.to_string(),
            })?;

        let student = self.load_student(&krs).await?;
        let rules = self.load_rules(&krs, &student).await?;

        if today > rules.enrollment_deadline {
            return Err(EnrollmentError::DeadlinePassed {
                deadline: rules.enrollment_deadline,
            });
        }

        // === 步骤 2: 迁移到 SUBMITTED (乐观锁入口) ===
        let revision = self.krs_repo.mark_submitted(krs_id, krs.revision)?;

        self.events.publish(EnrollmentEvent::new(
            krs_id,
            &krs.student_id,
            &krs.term.code(),
            EnrollmentEventType::SubmissionStarted,
            KrsState::Submitted,
        ));

        // === 步骤 3-5: 任何中途失败都退回 DRAFT ===
        // 红线: SUBMITTED 只是提交过程的瞬时状态, 未落定为
        //       COMMITTED/REJECTED 的记录不许滞留在 SUBMITTED,
        //       否则重试与后续编辑都会被状态机拒绝
        match self.validate_and_commit(&krs, revision, &rules).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if let Err(revert_err) = self.krs_repo.revert_to_draft(krs_id, revision) {
                    warn!(
                        krs_id,
                        error = %revert_err,
                        "提交失败后退回草稿未成功"
                    );
                }
                Err(e)
            }
        }
    }

    /// 步骤 3-5: 校验快照装载、规则校验与提交事务
    ///
    /// # 约束
    /// 进入时记录已处于 SUBMITTED; 返回 Err 时状态未落定,
    /// 由调用方负责退回 DRAFT
    async fn validate_and_commit(
        &self,
        krs: &Krs,
        revision: i32,
        rules: &TermRules,
    ) -> EnrollmentResult<SubmitOutcome> {
        let krs_id = krs.krs_id.as_str();

        // === 步骤 3: 装载校验所需快照 ===
        let (slots, courses) = self.load_validation_snapshot(krs).await?;
        let completions = self.catalog.load_completion_records(&krs.student_id).await?;
        let waivers = self.catalog.load_waivers(&krs.student_id).await?;

        // === 步骤 4: 三类规则校验, 收集全部原因 ===
        let reasons = self.validate(krs, &slots, &courses, &completions, &waivers, rules);

        if !reasons.is_empty() {
            info!(
                krs_id,
                reason_count = reasons.len(),
                "校验未通过, 整单驳回"
            );
            self.krs_repo.mark_rejected(krs_id, revision, &reasons)?;
            self.events.publish(
                EnrollmentEvent::new(
                    krs_id,
                    &krs.student_id,
                    &krs.term.code(),
                    EnrollmentEventType::KrsRejected,
                    KrsState::Rejected,
                )
                .with_rejection_count(reasons.len()),
            );
            return Ok(SubmitOutcome::Rejected { reasons });
        }

        // === 步骤 5: 提交事务 (名额原子占用/释放) ===
        let reserve = krs.slots_to_reserve();
        let release = krs.slots_to_release();
        let total_sks = self.capacity_guard.total_sks(&slots, &courses);

        match self
            .krs_repo
            .commit_krs(krs_id, revision, &reserve, &release)?
        {
            KrsCommitOutcome::Committed { revision } => {
                info!(
                    krs_id,
                    reserved = reserve.len(),
                    released = release.len(),
                    total_sks,
                    "选课提交生效"
                );
                self.events.publish(EnrollmentEvent::new(
                    krs_id,
                    &krs.student_id,
                    &krs.term.code(),
                    EnrollmentEventType::KrsCommitted,
                    KrsState::Committed,
                ));
                Ok(SubmitOutcome::Committed(KrsCommitSummary {
                    krs_id: krs_id.to_string(),
                    committed_slots: reserve,
                    released_slots: release,
                    total_sks,
                    revision,
                }))
            }
            KrsCommitOutcome::SeatUnavailable { slot_id } => {
                // 预检通过但提交时名额被抢, 按驳回处理 (事务已整体回滚)
                let reasons = vec![RejectionReason::new(
                    RejectionKind::SeatUnavailable,
                    &slot_id,
                    &format!("时段名额已满: {}", slot_id),
                )];
                warn!(krs_id, slot_id = %slot_id, "提交时名额已被占完, 整单驳回");
                self.krs_repo.mark_rejected(krs_id, revision, &reasons)?;
                self.events.publish(
                    EnrollmentEvent::new(
                        krs_id,
                        &krs.student_id,
                        &krs.term.code(),
                        EnrollmentEventType::KrsRejected,
                        KrsState::Rejected,
                    )
                    .with_rejection_count(reasons.len()),
                );
                Ok(SubmitOutcome::Rejected { reasons })
            }
        }
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    async fn load_student(&self, krs: &Krs) -> EnrollmentResult<Student> {
        let student = self
            .catalog
            .load_student(&krs.student_id)
            .await?
            .ok_or_else(|| EnrollmentError::InvalidReference {
                entity: "Student".to_string(),
                id: krs.student_id.clone(),
            })?;

        if !student.can_enroll() {
            return Err(EnrollmentError::StudentNotEligible {
                student_id: student.student_id.clone(),
                status: student.status.to_db_str().to_string(),
            });
        }

        Ok(student)
    }

    async fn load_rules(&self, krs: &Krs, student: &Student) -> EnrollmentResult<TermRules> {
        self.config
            .get_term_rules(&krs.term, Some(&student.program_code))
            .await
            .map_err(|e| EnrollmentError::Config(e.to_string()))
    }

    /// 装载有效条目的时段与课程快照
    async fn load_validation_snapshot(
        &self,
        krs: &Krs,
    ) -> EnrollmentResult<(Vec<ScheduleSlot>, HashMap<String, Course>)> {
        let mut slots = Vec::new();
        for item in krs.active_items() {
            let slot = self
                .catalog
                .load_schedule_slot(&item.slot_id)
                .await?
                .ok_or_else(|| EnrollmentError::InvalidReference {
                    entity: "ScheduleSlot".to_string(),
                    id: item.slot_id.clone(),
                })?;
            slots.push(slot);
        }

        let mut courses = HashMap::new();
        for slot in &slots {
            if courses.contains_key(&slot.course_id) {
                continue;
            }
            let course = self
                .catalog
                .load_course(&slot.course_id)
                .await?
                .ok_or_else(|| EnrollmentError::InvalidReference {
                    entity: "Course".to_string(),
                    id: slot.course_id.clone(),
                })?;
            courses.insert(slot.course_id.clone(), course);
        }

        Ok((slots, courses))
    }

    /// 三类规则校验 (纯读), 返回全部驳回原因
    fn validate(
        &self,
        krs: &Krs,
        slots: &[ScheduleSlot],
        courses: &HashMap<String, Course>,
        completions: &[crate::domain::krs::CompletionRecord],
        waivers: &[crate::domain::course::PrerequisiteWaiver],
        rules: &TermRules,
    ) -> Vec<RejectionReason> {
        let mut reasons = Vec::new();

        // --- 规则 1: 时段冲突 ---
        for conflict in self.detector.detect(slots) {
            debug!(
                first = %conflict.first_slot_id,
                second = %conflict.second_slot_id,
                "检测到时段冲突"
            );
            reasons.push(
                RejectionReason::new(
                    RejectionKind::ConflictDetected,
                    &conflict.first_slot_id,
                    &format!(
                        "时段时间冲突: {} 与 {} 在{}重叠 {}-{}",
                        conflict.first_slot_id,
                        conflict.second_slot_id,
                        conflict.day_of_week,
                        conflict.overlap_start.format("%H:%M"),
                        conflict.overlap_end.format("%H:%M"),
                    ),
                )
                .with_details(serde_json::json!({
                    "first_slot_id": conflict.first_slot_id,
                    "second_slot_id": conflict.second_slot_id,
                    "day_of_week": conflict.day_of_week.to_db_str(),
                    "overlap_start": conflict.overlap_start.format("%H:%M").to_string(),
                    "overlap_end": conflict.overlap_end.format("%H:%M").to_string(),
                })),
            );
        }

        // --- 规则 2: 先修要求 (按课程ID升序报告) ---
        let mut course_ids: Vec<&String> = courses.keys().collect();
        course_ids.sort();
        for course_id in course_ids {
            let course = &courses[course_id];
            let check =
                self.prereq_validator
                    .check(course, completions, waivers, rules.min_passing_grade);
            if !check.passed() {
                debug!(course_id = %course.course_id, missing = ?check.missing, "先修不满足");
                reasons.push(
                    RejectionReason::new(
                        RejectionKind::PrerequisiteMissing,
                        &course.course_id,
                        &format!(
                            "缺少先修课程: {} 需要 {}",
                            course.course_code,
                            check.missing.join(", ")
                        ),
                    )
                    .with_details(serde_json::json!({ "missing": check.missing })),
                );
            }
        }

        // --- 规则 3a: 学分上限 ---
        let total_sks = self.capacity_guard.total_sks(slots, courses);
        if let Some(overflow) = self.capacity_guard.check_credit_ceiling(total_sks, rules.max_sks) {
            reasons.push(
                RejectionReason::new(
                    RejectionKind::CreditExceeded,
                    &krs.krs_id,
                    &format!(
                        "超出学分上限: 共{}学分, 上限{}学分, 超出{}学分",
                        overflow.total_sks, overflow.max_sks, overflow.overflow
                    ),
                )
                .with_details(serde_json::json!({
                    "total_sks": overflow.total_sks,
                    "max_sks": overflow.max_sks,
                    "overflow": overflow.overflow,
                })),
            );
        }

        // --- 规则 3b: 名额预检 (权威判定仍在提交事务内) ---
        let reserve = krs.slots_to_reserve();
        for slot_id in self.capacity_guard.advisory_seat_check(slots, &reserve) {
            reasons.push(RejectionReason::new(
                RejectionKind::SeatUnavailable,
                &slot_id,
                &format!("时段名额已满: {}", slot_id),
            ));
        }

        reasons
    }
}

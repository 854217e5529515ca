// ==========================================
// 仓储层集成测试
// ==========================================
// 职责: 验证数据映射、约束与乐观锁语义
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod repository_integration_test {
    use campus_krs_engine::domain::audit::{AuditEntry, AuditOperation};
    use campus_krs_engine::domain::krs::Krs;
    use campus_krs_engine::domain::types::{
        DayOfWeek, GradeLetter, KrsState, StudentStatus,
    };
    use campus_krs_engine::domain::PrerequisiteWaiver;
    use campus_krs_engine::repository::RepositoryError;

    use crate::test_helpers::{
        make_completion, make_course, make_slot, make_student, setup_test_env, test_term,
        test_ts, TestEnv,
    };

    fn draft(krs_id: &str, student_id: &str) -> Krs {
        Krs {
            krs_id: krs_id.to_string(),
            student_id: student_id.to_string(),
            term: test_term(),
            state: KrsState::Draft,
            items: Vec::new(),
            rejection_reasons: Vec::new(),
            revision: 0,
            created_at: test_ts(),
            updated_at: test_ts(),
        }
    }

    fn seed_student(env: &TestEnv, student_id: &str) {
        env.student_repo.upsert(&make_student(student_id)).unwrap();
    }

    // ==========================================
    // 主数据仓储
    // ==========================================

    #[test]
    fn test_student_round_trip_and_status_update() {
        let env = setup_test_env();
        seed_student(&env, "2023010001");

        let loaded = env.student_repo.find_by_id("2023010001").unwrap().unwrap();
        assert_eq!(loaded.program_code, "IF");
        assert_eq!(loaded.status, StudentStatus::Active);

        env.student_repo
            .update_status("2023010001", StudentStatus::Graduated)
            .unwrap();
        let loaded = env.student_repo.find_by_id("2023010001").unwrap().unwrap();
        assert_eq!(loaded.status, StudentStatus::Graduated);

        assert!(env.student_repo.find_by_id("nope").unwrap().is_none());
    }

    #[test]
    fn test_course_prerequisites_loaded_with_course() {
        let env = setup_test_env();
        env.course_repo.upsert(&make_course("C-1", "IF1101", 3)).unwrap();
        env.course_repo.upsert(&make_course("C-2", "IF1102", 3)).unwrap();
        env.course_repo.upsert(&make_course("C-3", "IF2110", 4)).unwrap();

        env.course_repo.add_prerequisite("C-3", "C-1").unwrap();
        env.course_repo.add_prerequisite("C-3", "C-2").unwrap();

        let course = env.course_repo.find_by_id("C-3").unwrap().unwrap();
        assert_eq!(course.prerequisite_ids, vec!["C-1", "C-2"]);
        assert!(course.has_prerequisites());
    }

    #[test]
    fn test_prerequisite_cycle_refused() {
        let env = setup_test_env();
        env.course_repo.upsert(&make_course("C-1", "IF1101", 3)).unwrap();
        env.course_repo.upsert(&make_course("C-2", "IF1102", 3)).unwrap();
        env.course_repo.upsert(&make_course("C-3", "IF2110", 4)).unwrap();

        // C-3 -> C-2 -> C-1, 再加 C-1 -> C-3 成环
        env.course_repo.add_prerequisite("C-2", "C-1").unwrap();
        env.course_repo.add_prerequisite("C-3", "C-2").unwrap();

        let err = env.course_repo.add_prerequisite("C-1", "C-3").unwrap_err();
        assert!(matches!(err, RepositoryError::BusinessRuleViolation(_)));

        // 自环同样拒绝
        let err = env.course_repo.add_prerequisite("C-1", "C-1").unwrap_err();
        assert!(matches!(err, RepositoryError::BusinessRuleViolation(_)));
    }

    #[test]
    fn test_waiver_round_trip() {
        let env = setup_test_env();
        seed_student(&env, "2023010001");
        env.course_repo.upsert(&make_course("C-1", "IF1101", 3)).unwrap();
        env.course_repo.upsert(&make_course("C-2", "IF2110", 4)).unwrap();

        env.course_repo
            .grant_waiver(&PrerequisiteWaiver {
                student_id: "2023010001".to_string(),
                course_id: "C-2".to_string(),
                prereq_course_id: "C-1".to_string(),
                granted_by: "admin".to_string(),
                granted_at: test_ts(),
                note: Some("转学分".to_string()),
            })
            .unwrap();

        let waivers = env
            .course_repo
            .find_waivers_by_student("2023010001")
            .unwrap();
        assert_eq!(waivers.len(), 1);
        assert!(waivers[0].covers("C-2", "C-1"));
        assert!(!waivers[0].covers("C-2", "C-9"));
    }

    #[test]
    fn test_completion_upsert_overwrites_grade() {
        let env = setup_test_env();
        seed_student(&env, "2023010001");
        env.course_repo.upsert(&make_course("C-1", "IF1101", 3)).unwrap();

        // 修读中 -> 出分
        env.completion_repo
            .upsert(&make_completion("2023010001", "C-1", None))
            .unwrap();
        env.completion_repo
            .upsert(&make_completion("2023010001", "C-1", Some(GradeLetter::B)))
            .unwrap();

        let records = env.completion_repo.find_by_student("2023010001").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].grade, Some(GradeLetter::B));
    }

    #[test]
    fn test_schedule_queries() {
        let env = setup_test_env();
        env.course_repo.upsert(&make_course("C-1", "IF1101", 3)).unwrap();
        env.schedule_repo
            .upsert(&make_slot("S-1", "C-1", DayOfWeek::Monday, "07:00", "09:00", 40))
            .unwrap();
        env.schedule_repo
            .upsert(&make_slot("S-2", "C-1", DayOfWeek::Wednesday, "07:00", "09:00", 40))
            .unwrap();

        let by_course = env
            .schedule_repo
            .find_by_course("C-1", &test_term().code())
            .unwrap();
        assert_eq!(by_course.len(), 2);

        let by_term = env.schedule_repo.find_by_term(&test_term().code()).unwrap();
        assert_eq!(by_term.len(), 2);

        assert_eq!(env.schedule_repo.read_seats_taken("S-1").unwrap(), 0);
        assert!(matches!(
            env.schedule_repo.read_seats_taken("S-404").unwrap_err(),
            RepositoryError::NotFound { .. }
        ));
    }

    // ==========================================
    // 选课记录仓储: 约束
    // ==========================================

    #[test]
    fn test_create_draft_requires_existing_student() {
        let env = setup_test_env();
        let err = env.krs_repo.create_draft(&draft("KRS-1", "ghost")).unwrap_err();
        assert!(matches!(err, RepositoryError::ForeignKeyViolation(_)));
    }

    #[test]
    fn test_create_draft_unique_per_student_term() {
        let env = setup_test_env();
        seed_student(&env, "2023010001");

        env.krs_repo.create_draft(&draft("KRS-1", "2023010001")).unwrap();
        let err = env
            .krs_repo
            .create_draft(&draft("KRS-2", "2023010001"))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
    }

    // ==========================================
    // 选课记录仓储: 乐观锁
    // ==========================================

    #[test]
    fn test_mark_submitted_optimistic_lock() {
        let env = setup_test_env();
        seed_student(&env, "2023010001");
        env.krs_repo.create_draft(&draft("KRS-1", "2023010001")).unwrap();

        // 修订号不匹配
        let err = env.krs_repo.mark_submitted("KRS-1", 7).unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::OptimisticLockFailure {
                expected: 7,
                actual: 0,
                ..
            }
        ));

        let revision = env.krs_repo.mark_submitted("KRS-1", 0).unwrap();
        assert_eq!(revision, 1);

        // SUBMITTED 不允许再次提交, 错误要报出具体的目标状态
        let err = env.krs_repo.mark_submitted("KRS-1", 1).unwrap_err();
        match err {
            RepositoryError::InvalidStateTransition { from, to } => {
                assert_eq!(from, "SUBMITTED");
                assert_eq!(to, "SUBMITTED");
            }
            other => panic!("意外错误: {:?}", other),
        }

        // 不存在的记录
        let err = env.krs_repo.mark_submitted("KRS-404", 0).unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[test]
    fn test_mark_rejected_persists_reasons() {
        use campus_krs_engine::domain::types::RejectionKind;
        use campus_krs_engine::domain::RejectionReason;

        let env = setup_test_env();
        seed_student(&env, "2023010001");
        env.krs_repo.create_draft(&draft("KRS-1", "2023010001")).unwrap();
        let revision = env.krs_repo.mark_submitted("KRS-1", 0).unwrap();

        let reasons = vec![RejectionReason::new(
            RejectionKind::CreditExceeded,
            "KRS-1",
            "超出学分上限",
        )];
        env.krs_repo.mark_rejected("KRS-1", revision, &reasons).unwrap();

        let krs = env.krs_repo.find_by_id("KRS-1").unwrap().unwrap();
        assert_eq!(krs.state, KrsState::Rejected);
        assert_eq!(krs.rejection_reasons.len(), 1);
        assert_eq!(
            krs.rejection_reasons[0].reason_kind,
            RejectionKind::CreditExceeded
        );
    }

    #[test]
    fn test_revert_to_draft_from_submitted() {
        let env = setup_test_env();
        seed_student(&env, "2023010001");
        env.krs_repo.create_draft(&draft("KRS-1", "2023010001")).unwrap();
        let revision = env.krs_repo.mark_submitted("KRS-1", 0).unwrap();

        env.krs_repo.revert_to_draft("KRS-1", revision).unwrap();
        let krs = env.krs_repo.find_by_id("KRS-1").unwrap().unwrap();
        assert_eq!(krs.state, KrsState::Draft);
        assert_eq!(krs.revision, 2);
    }

    #[test]
    fn test_commit_krs_requires_submitted_state() {
        let env = setup_test_env();
        seed_student(&env, "2023010001");
        env.krs_repo.create_draft(&draft("KRS-1", "2023010001")).unwrap();

        // DRAFT 状态直接提交事务被拒
        let err = env.krs_repo.commit_krs("KRS-1", 0, &[], &[]).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidStateTransition { .. }));

        let revision = env.krs_repo.mark_submitted("KRS-1", 0).unwrap();

        // 修订号不匹配
        let err = env
            .krs_repo
            .commit_krs("KRS-1", revision + 5, &[], &[])
            .unwrap_err();
        assert!(matches!(err, RepositoryError::OptimisticLockFailure { .. }));
    }

    // ==========================================
    // 审计仓储
    // ==========================================

    #[test]
    fn test_audit_round_trip() {
        let env = setup_test_env();
        seed_student(&env, "2023010001");
        env.krs_repo.create_draft(&draft("KRS-1", "2023010001")).unwrap();

        env.audit_repo
            .insert(
                &AuditEntry::new(AuditOperation::CreateDraft, "test", Some("KRS-1"))
                    .with_payload(serde_json::json!({"term": "2025-ODD"})),
            )
            .unwrap();
        env.audit_repo
            .insert(
                &AuditEntry::new(AuditOperation::SubmitKrs, "test", Some("KRS-1"))
                    .with_detail("提交选课"),
            )
            .unwrap();

        let trail = env.audit_repo.find_by_krs("KRS-1").unwrap();
        assert_eq!(trail.len(), 2);

        let created = trail
            .iter()
            .find(|e| e.operation == "CREATE_DRAFT")
            .unwrap();
        assert_eq!(created.payload_json.as_ref().unwrap()["term"], "2025-ODD");

        let submitted = trail.iter().find(|e| e.operation == "SUBMIT_KRS").unwrap();
        assert_eq!(submitted.detail.as_deref(), Some("提交选课"));

        let recent = env.audit_repo.find_recent(1).unwrap();
        assert_eq!(recent.len(), 1);
    }
}

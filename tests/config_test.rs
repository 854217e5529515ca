// ==========================================
// 配置管理测试
// ==========================================
// 职责: 验证学期规则的默认值、覆写与容错回退
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod config_test {
    use campus_krs_engine::config::config_manager::config_keys;
    use campus_krs_engine::config::term_config::TermConfigReader;
    use campus_krs_engine::domain::types::GradeLetter;
    use chrono::NaiveDate;

    use crate::test_helpers::{setup_test_env, test_term};

    // ==========================================
    // 默认值
    // ==========================================

    #[tokio::test]
    async fn test_defaults_when_nothing_configured() {
        let env = setup_test_env();

        assert_eq!(env.config.get_max_sks(None).await.unwrap(), 24);
        assert_eq!(
            env.config.get_min_passing_grade().await.unwrap(),
            GradeLetter::C
        );
        assert_eq!(env.config.get_submit_retry_attempts().await.unwrap(), 3);

        // 未配置截止日期视为不限制
        let deadline = env
            .config
            .get_enrollment_deadline(&test_term())
            .await
            .unwrap();
        assert_eq!(deadline, NaiveDate::from_ymd_opt(9999, 12, 31).unwrap());
    }

    // ==========================================
    // 覆写优先级
    // ==========================================

    #[tokio::test]
    async fn test_program_override_beats_global_max_sks() {
        let env = setup_test_env();
        env.config
            .set_global_config_value(config_keys::TERM_MAX_SKS, "20")
            .unwrap();
        env.config
            .set_global_config_value(&config_keys::max_sks_key_for_program("IF"), "18")
            .unwrap();

        assert_eq!(env.config.get_max_sks(None).await.unwrap(), 20);
        assert_eq!(env.config.get_max_sks(Some("IF")).await.unwrap(), 18);
        // 未覆写的专业回退全局值
        assert_eq!(env.config.get_max_sks(Some("TI")).await.unwrap(), 20);
    }

    #[tokio::test]
    async fn test_term_override_beats_global_deadline() {
        let env = setup_test_env();
        env.config
            .set_global_config_value(config_keys::TERM_ENROLLMENT_DEADLINE, "2025-09-01")
            .unwrap();
        env.config
            .set_global_config_value(
                &config_keys::deadline_key_for_term(&test_term().code()),
                "2025-08-20",
            )
            .unwrap();

        let deadline = env
            .config
            .get_enrollment_deadline(&test_term())
            .await
            .unwrap();
        assert_eq!(deadline, NaiveDate::from_ymd_opt(2025, 8, 20).unwrap());
    }

    // ==========================================
    // 容错回退
    // ==========================================

    #[tokio::test]
    async fn test_malformed_program_override_falls_back_to_global() {
        let env = setup_test_env();
        env.config
            .set_global_config_value(config_keys::TERM_MAX_SKS, "22")
            .unwrap();
        env.config
            .set_global_config_value(&config_keys::max_sks_key_for_program("IF"), "abc")
            .unwrap();

        assert_eq!(env.config.get_max_sks(Some("IF")).await.unwrap(), 22);
    }

    #[tokio::test]
    async fn test_malformed_deadline_treated_as_unlimited() {
        let env = setup_test_env();
        env.config
            .set_global_config_value(
                &config_keys::deadline_key_for_term(&test_term().code()),
                "not-a-date",
            )
            .unwrap();

        let deadline = env
            .config
            .get_enrollment_deadline(&test_term())
            .await
            .unwrap();
        assert_eq!(deadline, NaiveDate::from_ymd_opt(9999, 12, 31).unwrap());
    }

    #[tokio::test]
    async fn test_retry_attempts_clamped_to_at_least_one() {
        let env = setup_test_env();
        env.config
            .set_global_config_value(config_keys::TERM_SUBMIT_RETRY_ATTEMPTS, "0")
            .unwrap();

        assert_eq!(env.config.get_submit_retry_attempts().await.unwrap(), 1);
    }

    // ==========================================
    // 读写往返
    // ==========================================

    #[tokio::test]
    async fn test_set_overwrites_existing_value() {
        let env = setup_test_env();
        env.config
            .set_global_config_value(config_keys::TERM_MIN_PASSING_GRADE, "B")
            .unwrap();
        env.config
            .set_global_config_value(config_keys::TERM_MIN_PASSING_GRADE, "D")
            .unwrap();

        assert_eq!(
            env.config.get_min_passing_grade().await.unwrap(),
            GradeLetter::D
        );
        assert_eq!(
            env.config
                .get_global_config_value(config_keys::TERM_MIN_PASSING_GRADE)
                .unwrap()
                .as_deref(),
            Some("D")
        );
    }

    #[tokio::test]
    async fn test_term_rules_bundle() {
        let env = setup_test_env();
        env.config
            .set_global_config_value(config_keys::TERM_MAX_SKS, "21")
            .unwrap();
        env.config
            .set_global_config_value(config_keys::TERM_MIN_PASSING_GRADE, "B")
            .unwrap();

        let rules = env
            .config
            .get_term_rules(&test_term(), Some("IF"))
            .await
            .unwrap();
        assert_eq!(rules.max_sks, 21);
        assert_eq!(rules.min_passing_grade, GradeLetter::B);
        assert_eq!(rules.submit_retry_attempts, 3);
    }

    #[tokio::test]
    async fn test_term_rules_load_runs_on_spawned_task() {
        let env = setup_test_env();
        env.config
            .set_global_config_value(config_keys::TERM_MAX_SKS, "19")
            .unwrap();

        // 约束: 规则读取的 future 必须可跨工作线程调度
        let config = env.config.clone();
        let term = test_term();
        let rules = tokio::spawn(async move {
            config
                .get_term_rules(&term, Some("IF"))
                .await
                .map_err(|e| e.to_string())
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(rules.max_sks, 19);
    }
}

// ==========================================
// 校园教务选课系统 - 先修校验器
// ==========================================
// 职责: 依据修读记录与豁免判定课程的先修要求是否满足
// 红线: 只检查直接先修 (一层), 不做传递闭包展开
// 红线: 纯计算, 不读库不写库
// ==========================================

use crate::domain::course::{Course, PrerequisiteWaiver};
use crate::domain::krs::CompletionRecord;
use crate::domain::types::GradeLetter;
use std::collections::HashSet;

/// 单门课程的先修检查结果
#[derive(Debug, Clone)]
pub struct PrerequisiteCheck {
    pub course_id: String,
    pub missing: Vec<String>, // 未满足的先修课程ID (升序)
}

impl PrerequisiteCheck {
    pub fn passed(&self) -> bool {
        self.missing.is_empty()
    }
}

// ==========================================
// PrerequisiteValidator - 先修校验器
// ==========================================
pub struct PrerequisiteValidator;

impl PrerequisiteValidator {
    pub fn new() -> Self {
        Self
    }

    /// 检查单门课程的先修要求
    ///
    /// # 判定口径
    /// - 仅检查 course.prerequisite_ids 中的直接先修
    /// - 修读记录需达到 min_passing 及以上; 修读中 (无成绩) 不算通过
    /// - 同一课程多次修读时按最好成绩判定 (重修提升成绩)
    /// - 持有 (课程, 先修课程) 豁免时该先修视为满足
    ///
    /// # 返回
    /// - PrerequisiteCheck: missing 为空即通过
    pub fn check(
        &self,
        course: &Course,
        completions: &[CompletionRecord],
        waivers: &[PrerequisiteWaiver],
        min_passing: GradeLetter,
    ) -> PrerequisiteCheck {
        if !course.has_prerequisites() {
            return PrerequisiteCheck {
                course_id: course.course_id.clone(),
                missing: Vec::new(),
            };
        }

        let passed_courses: HashSet<&str> = completions
            .iter()
            .filter(|record| record.is_passed(min_passing))
            .map(|record| record.course_id.as_str())
            .collect();

        let mut missing: Vec<String> = course
            .prerequisite_ids
            .iter()
            .filter(|prereq_id| {
                !passed_courses.contains(prereq_id.as_str())
                    && !waivers
                        .iter()
                        .any(|waiver| waiver.covers(&course.course_id, prereq_id))
            })
            .cloned()
            .collect();
        missing.sort();

        PrerequisiteCheck {
            course_id: course.course_id.clone(),
            missing,
        }
    }
}

impl Default for PrerequisiteValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 8, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn course(id: &str, prereqs: &[&str]) -> Course {
        Course {
            course_id: id.to_string(),
            course_code: format!("CODE-{}", id),
            course_name: format!("课程 {}", id),
            sks: 3,
            semester_level: 3,
            prerequisite_ids: prereqs.iter().map(|s| s.to_string()).collect(),
            created_at: ts(),
            updated_at: ts(),
        }
    }

    fn completion(course_id: &str, grade: Option<GradeLetter>) -> CompletionRecord {
        CompletionRecord {
            student_id: "2023010001".to_string(),
            course_id: course_id.to_string(),
            grade,
            term_code: "2024-EVEN".to_string(),
        }
    }

    fn waiver(course_id: &str, prereq_id: &str) -> PrerequisiteWaiver {
        PrerequisiteWaiver {
            student_id: "2023010001".to_string(),
            course_id: course_id.to_string(),
            prereq_course_id: prereq_id.to_string(),
            granted_by: "admin".to_string(),
            granted_at: ts(),
            note: None,
        }
    }

    #[test]
    fn test_no_prerequisites_always_passes() {
        let validator = PrerequisiteValidator::new();
        let check = validator.check(&course("C-1", &[]), &[], &[], GradeLetter::C);
        assert!(check.passed());
    }

    #[test]
    fn test_missing_prerequisite_reported() {
        let validator = PrerequisiteValidator::new();
        let check = validator.check(&course("C-2", &["C-1"]), &[], &[], GradeLetter::C);
        assert!(!check.passed());
        assert_eq!(check.missing, vec!["C-1"]);
    }

    #[test]
    fn test_passing_grade_satisfies() {
        let validator = PrerequisiteValidator::new();
        let check = validator.check(
            &course("C-2", &["C-1"]),
            &[completion("C-1", Some(GradeLetter::B))],
            &[],
            GradeLetter::C,
        );
        assert!(check.passed());
    }

    #[test]
    fn test_failing_or_in_progress_does_not_satisfy() {
        let validator = PrerequisiteValidator::new();
        // 不及格
        let check = validator.check(
            &course("C-2", &["C-1"]),
            &[completion("C-1", Some(GradeLetter::D))],
            &[],
            GradeLetter::C,
        );
        assert_eq!(check.missing, vec!["C-1"]);

        // 修读中
        let check = validator.check(
            &course("C-2", &["C-1"]),
            &[completion("C-1", None)],
            &[],
            GradeLetter::C,
        );
        assert_eq!(check.missing, vec!["C-1"]);
    }

    #[test]
    fn test_retake_best_grade_wins() {
        let validator = PrerequisiteValidator::new();
        // 首修 E, 重修 B
        let check = validator.check(
            &course("C-2", &["C-1"]),
            &[
                completion("C-1", Some(GradeLetter::E)),
                completion("C-1", Some(GradeLetter::B)),
            ],
            &[],
            GradeLetter::C,
        );
        assert!(check.passed());
    }

    #[test]
    fn test_waiver_covers_missing_prerequisite() {
        let validator = PrerequisiteValidator::new();
        let check = validator.check(
            &course("C-2", &["C-1"]),
            &[],
            &[waiver("C-2", "C-1")],
            GradeLetter::C,
        );
        assert!(check.passed());

        // 豁免只对声明的 (课程, 先修) 组合生效
        let check = validator.check(
            &course("C-3", &["C-1"]),
            &[],
            &[waiver("C-2", "C-1")],
            GradeLetter::C,
        );
        assert_eq!(check.missing, vec!["C-1"]);
    }

    #[test]
    fn test_only_direct_prerequisites_checked() {
        let validator = PrerequisiteValidator::new();
        // C-3 直接先修 C-2; C-2 先修 C-1。学生通过了 C-2 但从未修过 C-1。
        // 一层检查: 只看 C-2, 不追链到 C-1。
        let check = validator.check(
            &course("C-3", &["C-2"]),
            &[completion("C-2", Some(GradeLetter::A))],
            &[],
            GradeLetter::C,
        );
        assert!(check.passed());
    }

    #[test]
    fn test_multiple_missing_sorted() {
        let validator = PrerequisiteValidator::new();
        let check = validator.check(
            &course("C-9", &["C-3", "C-1", "C-2"]),
            &[completion("C-2", Some(GradeLetter::A))],
            &[],
            GradeLetter::C,
        );
        assert_eq!(check.missing, vec!["C-1", "C-3"]);
    }
}

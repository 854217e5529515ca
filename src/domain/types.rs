// ==========================================
// 校园教务选课系统 - 领域类型定义
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 星期 (Day of Week)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayOfWeek {
    Monday,    // 周一
    Tuesday,   // 周二
    Wednesday, // 周三
    Thursday,  // 周四
    Friday,    // 周五
    Saturday,  // 周六
    Sunday,    // 周日
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl DayOfWeek {
    /// 从字符串解析星期
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "MONDAY" => Some(DayOfWeek::Monday),
            "TUESDAY" => Some(DayOfWeek::Tuesday),
            "WEDNESDAY" => Some(DayOfWeek::Wednesday),
            "THURSDAY" => Some(DayOfWeek::Thursday),
            "FRIDAY" => Some(DayOfWeek::Friday),
            "SATURDAY" => Some(DayOfWeek::Saturday),
            "SUNDAY" => Some(DayOfWeek::Sunday),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "MONDAY",
            DayOfWeek::Tuesday => "TUESDAY",
            DayOfWeek::Wednesday => "WEDNESDAY",
            DayOfWeek::Thursday => "THURSDAY",
            DayOfWeek::Friday => "FRIDAY",
            DayOfWeek::Saturday => "SATURDAY",
            DayOfWeek::Sunday => "SUNDAY",
        }
    }
}

// ==========================================
// 学期类型 (Semester)
// ==========================================
// 单学期(Ganjil) / 双学期(Genap) / 短学期(Pendek)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Semester {
    Odd,   // 单学期
    Even,  // 双学期
    Short, // 短学期
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl Semester {
    /// 从字符串解析学期类型
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ODD" => Some(Semester::Odd),
            "EVEN" => Some(Semester::Even),
            "SHORT" => Some(Semester::Short),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Semester::Odd => "ODD",
            Semester::Even => "EVEN",
            Semester::Short => "SHORT",
        }
    }
}

// ==========================================
// 学年学期 (Academic Term)
// ==========================================
// 选课记录、开课时段、配置覆写都以学期为边界
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AcademicTerm {
    pub academic_year: i32, // 学年 (如 2025 表示 2025/2026 学年)
    pub semester: Semester, // 学期类型
}

impl AcademicTerm {
    pub fn new(academic_year: i32, semester: Semester) -> Self {
        Self {
            academic_year,
            semester,
        }
    }

    /// 学期编码 (如 "2025-ODD")，用于配置键与时段归属
    pub fn code(&self) -> String {
        format!("{}-{}", self.academic_year, self.semester.to_db_str())
    }

    /// 从学期编码解析
    pub fn parse(code: &str) -> Option<Self> {
        let (year_part, sem_part) = code.split_once('-')?;
        let academic_year = year_part.parse::<i32>().ok()?;
        let semester = Semester::from_str(sem_part)?;
        Some(Self {
            academic_year,
            semester,
        })
    }
}

impl fmt::Display for AcademicTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ==========================================
// 学生状态 (Student Status)
// ==========================================
// 状态变更仅由教务管理操作触发
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StudentStatus {
    Active,    // 在读
    Inactive,  // 休学/停学
    Graduated, // 已毕业
}

impl fmt::Display for StudentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl StudentStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "ACTIVE" => StudentStatus::Active,
            "INACTIVE" => StudentStatus::Inactive,
            "GRADUATED" => StudentStatus::Graduated,
            _ => StudentStatus::Inactive, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            StudentStatus::Active => "ACTIVE",
            StudentStatus::Inactive => "INACTIVE",
            StudentStatus::Graduated => "GRADUATED",
        }
    }
}

// ==========================================
// 选课记录状态 (KRS State)
// ==========================================
// 生命周期: DRAFT -> SUBMITTED -> {COMMITTED | REJECTED}
// REJECTED/COMMITTED 的编辑会回到 DRAFT (修订周期)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KrsState {
    Draft,     // 草稿 (可自由增删)
    Submitted, // 已提交 (校验进行中)
    Committed, // 已生效 (名额已预占)
    Rejected,  // 已驳回 (附带逐项原因)
}

impl fmt::Display for KrsState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl KrsState {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "DRAFT" => KrsState::Draft,
            "SUBMITTED" => KrsState::Submitted,
            "COMMITTED" => KrsState::Committed,
            "REJECTED" => KrsState::Rejected,
            _ => KrsState::Draft, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            KrsState::Draft => "DRAFT",
            KrsState::Submitted => "SUBMITTED",
            KrsState::Committed => "COMMITTED",
            KrsState::Rejected => "REJECTED",
        }
    }

    /// 判断状态转换是否合法
    ///
    /// 约束:
    /// - 提交入口: DRAFT/COMMITTED/REJECTED 均可进入 SUBMITTED
    ///   (COMMITTED 重复提交用于幂等重交, REJECTED 直接重交视为未修改重试)
    /// - SUBMITTED 只能落到 COMMITTED/REJECTED, 或校验中止时退回 DRAFT
    /// - COMMITTED/REJECTED 的条目编辑将状态拉回 DRAFT
    pub fn can_transition_to(&self, next: KrsState) -> bool {
        matches!(
            (self, next),
            (KrsState::Draft, KrsState::Submitted)
                | (KrsState::Committed, KrsState::Submitted)
                | (KrsState::Rejected, KrsState::Submitted)
                | (KrsState::Submitted, KrsState::Committed)
                | (KrsState::Submitted, KrsState::Rejected)
                | (KrsState::Submitted, KrsState::Draft)
                | (KrsState::Committed, KrsState::Draft)
                | (KrsState::Rejected, KrsState::Draft)
        )
    }

    /// 判断当前状态下条目是否可编辑
    pub fn is_editable(&self) -> bool {
        !matches!(self, KrsState::Submitted)
    }
}

// ==========================================
// 成绩等级 (Grade Letter)
// ==========================================
// A 最高, E 最低; 无成绩记录表示课程仍在修读中
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GradeLetter {
    A,
    B,
    C,
    D,
    E,
}

impl fmt::Display for GradeLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl GradeLetter {
    /// 从字符串解析成绩等级
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "A" => Some(GradeLetter::A),
            "B" => Some(GradeLetter::B),
            "C" => Some(GradeLetter::C),
            "D" => Some(GradeLetter::D),
            "E" => Some(GradeLetter::E),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            GradeLetter::A => "A",
            GradeLetter::B => "B",
            GradeLetter::C => "C",
            GradeLetter::D => "D",
            GradeLetter::E => "E",
        }
    }

    /// 绩点数值 (A=4.0 ... E=0.0)
    pub fn points(&self) -> f64 {
        match self {
            GradeLetter::A => 4.0,
            GradeLetter::B => 3.0,
            GradeLetter::C => 2.0,
            GradeLetter::D => 1.0,
            GradeLetter::E => 0.0,
        }
    }

    /// 判断成绩是否达到及格线 (min_passing 为配置的最低及格等级)
    pub fn satisfies(&self, min_passing: GradeLetter) -> bool {
        self.points() >= min_passing.points()
    }
}

// ==========================================
// 驳回原因类型 (Rejection Kind)
// ==========================================
// 校验规则失败的结构化分类, 一次提交可携带多类原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionKind {
    ConflictDetected,    // 时段时间冲突
    PrerequisiteMissing, // 缺少先修课程
    SeatUnavailable,     // 名额已满
    CreditExceeded,      // 超出学分上限
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl RejectionKind {
    /// 从字符串解析驳回原因类型
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "CONFLICT_DETECTED" => Some(RejectionKind::ConflictDetected),
            "PREREQUISITE_MISSING" => Some(RejectionKind::PrerequisiteMissing),
            "SEAT_UNAVAILABLE" => Some(RejectionKind::SeatUnavailable),
            "CREDIT_EXCEEDED" => Some(RejectionKind::CreditExceeded),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            RejectionKind::ConflictDetected => "CONFLICT_DETECTED",
            RejectionKind::PrerequisiteMissing => "PREREQUISITE_MISSING",
            RejectionKind::SeatUnavailable => "SEAT_UNAVAILABLE",
            RejectionKind::CreditExceeded => "CREDIT_EXCEEDED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_code_roundtrip() {
        let term = AcademicTerm::new(2025, Semester::Odd);
        assert_eq!(term.code(), "2025-ODD");
        assert_eq!(AcademicTerm::parse("2025-ODD"), Some(term));
        assert_eq!(AcademicTerm::parse("2025"), None);
        assert_eq!(AcademicTerm::parse("2025-SPRING"), None);
    }

    #[test]
    fn test_krs_state_transitions() {
        // 合法转换
        assert!(KrsState::Draft.can_transition_to(KrsState::Submitted));
        assert!(KrsState::Submitted.can_transition_to(KrsState::Committed));
        assert!(KrsState::Submitted.can_transition_to(KrsState::Rejected));
        assert!(KrsState::Rejected.can_transition_to(KrsState::Draft));
        assert!(KrsState::Committed.can_transition_to(KrsState::Draft));
        assert!(KrsState::Committed.can_transition_to(KrsState::Submitted));

        // 非法转换
        assert!(!KrsState::Draft.can_transition_to(KrsState::Committed));
        assert!(!KrsState::Draft.can_transition_to(KrsState::Rejected));
        assert!(!KrsState::Rejected.can_transition_to(KrsState::Committed));
        assert!(!KrsState::Submitted.can_transition_to(KrsState::Submitted));
    }

    #[test]
    fn test_grade_satisfies_floor() {
        assert!(GradeLetter::A.satisfies(GradeLetter::C));
        assert!(GradeLetter::C.satisfies(GradeLetter::C));
        assert!(!GradeLetter::D.satisfies(GradeLetter::C));
        assert!(!GradeLetter::E.satisfies(GradeLetter::C));
        // 及格线下调到 D 时, D 也算通过
        assert!(GradeLetter::D.satisfies(GradeLetter::D));
    }

    #[test]
    fn test_day_of_week_parse() {
        assert_eq!(DayOfWeek::from_str("monday"), Some(DayOfWeek::Monday));
        assert_eq!(DayOfWeek::from_str("MONDAY"), Some(DayOfWeek::Monday));
        assert_eq!(DayOfWeek::from_str("funday"), None);
        assert_eq!(DayOfWeek::Monday.to_db_str(), "MONDAY");
    }
}

// ==========================================
// 校园教务选课系统 - 课程与先修实体
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 课程 (Course)
///
/// prerequisite_ids 只记录直接先修课程, 不含传递闭包
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub course_id: String,            // 课程ID
    pub course_code: String,          // 课程代码 (如 "IF2110")
    pub course_name: String,          // 课程名称
    pub sks: i32,                     // 学分数 (SKS)
    pub semester_level: i32,          // 建议修读学期 (1-8)
    pub prerequisite_ids: Vec<String>, // 直接先修课程ID列表
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Course {
    /// 判断课程是否声明了先修要求
    pub fn has_prerequisites(&self) -> bool {
        !self.prerequisite_ids.is_empty()
    }
}

/// 先修豁免 (Prerequisite Waiver)
///
/// 教务管理员针对 (学生, 课程, 先修课程) 三元组授予的豁免,
/// 持有豁免时该先修课程视为已满足
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrerequisiteWaiver {
    pub student_id: String,       // 学号
    pub course_id: String,        // 目标课程ID
    pub prereq_course_id: String, // 被豁免的先修课程ID
    pub granted_by: String,       // 授予人
    pub granted_at: NaiveDateTime,
    pub note: Option<String>,     // 备注
}

impl PrerequisiteWaiver {
    /// 判断该豁免是否覆盖指定的 (课程, 先修课程) 组合
    pub fn covers(&self, course_id: &str, prereq_course_id: &str) -> bool {
        self.course_id == course_id && self.prereq_course_id == prereq_course_id
    }
}

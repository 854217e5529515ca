// ==========================================
// 校园教务选课系统 - 学生实体
// ==========================================

use crate::domain::types::StudentStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 学生 (Student)
///
/// student_id 即学号 (NIM), 全局唯一
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub student_id: String,       // 学号
    pub full_name: String,        // 姓名
    pub program_code: String,     // 专业代码 (学分上限可按专业覆写)
    pub enrollment_year: i32,     // 入学年份
    pub status: StudentStatus,    // 学籍状态
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Student {
    /// 判断学生当前是否可以提交选课
    pub fn can_enroll(&self) -> bool {
        self.status == StudentStatus::Active
    }
}

// ==========================================
// 校园教务选课系统 - 开课时段实体
// ==========================================

use crate::domain::types::DayOfWeek;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// 开课时段 (Schedule Slot)
///
/// 时间区间为半开区间 [start_time, end_time),
/// 结束时刻与另一时段的开始时刻相同不构成冲突
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub slot_id: String,              // 时段ID
    pub course_id: String,            // 所属课程ID
    pub instructor_id: Option<String>, // 授课教师ID
    pub day_of_week: DayOfWeek,       // 星期
    pub start_time: NaiveTime,        // 开始时刻 (含)
    pub end_time: NaiveTime,          // 结束时刻 (不含)
    pub room: Option<String>,         // 教室
    pub capacity: i32,                // 名额上限
    pub seats_taken: i32,             // 已占名额
    pub term_code: String,            // 所属学期编码 (如 "2025-ODD")
}

impl ScheduleSlot {
    /// 判断时段当前是否仍有空余名额 (仅为预检参考, 权威判定在提交事务内)
    pub fn has_free_seat(&self) -> bool {
        self.seats_taken < self.capacity
    }

    /// 剩余名额数
    pub fn free_seats(&self) -> i32 {
        (self.capacity - self.seats_taken).max(0)
    }

    /// 判断两个时段是否时间重叠
    ///
    /// 约束: 区间为半开区间, A.end == B.start 不算重叠
    pub fn overlaps(&self, other: &ScheduleSlot) -> bool {
        self.day_of_week == other.day_of_week
            && self.start_time < other.end_time
            && other.start_time < self.end_time
    }

    /// 计算两个时段的重叠窗口, 无重叠返回 None
    pub fn overlap_window(&self, other: &ScheduleSlot) -> Option<(NaiveTime, NaiveTime)> {
        if !self.overlaps(other) {
            return None;
        }
        let start = self.start_time.max(other.start_time);
        let end = self.end_time.min(other.end_time);
        Some((start, end))
    }
}

/// 时段冲突 (Schedule Conflict)
///
/// 记录一对互相冲突的时段及其重叠窗口, 时段ID按字典序排列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConflict {
    pub first_slot_id: String,   // 较小ID的时段
    pub second_slot_id: String,  // 较大ID的时段
    pub day_of_week: DayOfWeek,  // 冲突发生的星期
    pub overlap_start: NaiveTime, // 重叠窗口开始
    pub overlap_end: NaiveTime,   // 重叠窗口结束
}

impl ScheduleConflict {
    /// 判断冲突是否涉及指定时段
    pub fn involves(&self, slot_id: &str) -> bool {
        self.first_slot_id == slot_id || self.second_slot_id == slot_id
    }
}

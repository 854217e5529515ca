// ==========================================
// 校园教务选课系统 - 容量守卫
// ==========================================
// 职责: 学分上限校验 + 名额预检
// 红线: 纯计算, 不读库不写库
// 红线: 名额预检只是提前拦截, 权威判定在提交事务内的
//       条件更新 (seats_taken < capacity) 完成
// ==========================================

use crate::domain::course::Course;
use crate::domain::schedule::ScheduleSlot;
use std::collections::HashMap;

/// 学分超限详情
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditOverflow {
    pub total_sks: i32,
    pub max_sks: i32,
    pub overflow: i32,
}

// ==========================================
// CapacityGuard - 容量守卫
// ==========================================
pub struct CapacityGuard;

impl CapacityGuard {
    pub fn new() -> Self {
        Self
    }

    /// 计算一组时段对应课程的总学分
    ///
    /// 约束: 同一课程多个时段只计一次学分 (API 层已拒绝这种草稿,
    /// 这里仍按课程去重, 保证口径稳定)
    pub fn total_sks(&self, slots: &[ScheduleSlot], courses: &HashMap<String, Course>) -> i32 {
        let mut counted: HashMap<&str, i32> = HashMap::new();
        for slot in slots {
            if let Some(course) = courses.get(&slot.course_id) {
                counted.entry(course.course_id.as_str()).or_insert(course.sks);
            }
        }
        counted.values().sum()
    }

    /// 学分上限检查
    ///
    /// # 返回
    /// - None: 未超限
    /// - Some(CreditOverflow): 超限, 携带超出量
    pub fn check_credit_ceiling(&self, total_sks: i32, max_sks: i32) -> Option<CreditOverflow> {
        if total_sks > max_sks {
            Some(CreditOverflow {
                total_sks,
                max_sks,
                overflow: total_sks - max_sks,
            })
        } else {
            None
        }
    }

    /// 名额预检: 返回已无空余名额的待占时段ID (升序)
    ///
    /// 说明: 读取的是校验时刻的快照, 并发下可能过期;
    /// 预检失败直接驳回可以省掉一次注定失败的提交事务
    pub fn advisory_seat_check(
        &self,
        slots: &[ScheduleSlot],
        reserve_slot_ids: &[String],
    ) -> Vec<String> {
        let mut full: Vec<String> = slots
            .iter()
            .filter(|slot| reserve_slot_ids.contains(&slot.slot_id) && !slot.has_free_seat())
            .map(|slot| slot.slot_id.clone())
            .collect();
        full.sort();
        full
    }
}

impl Default for CapacityGuard {
    fn default() -> Self {
        Self::new()
    }
}

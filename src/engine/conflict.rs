// ==========================================
// 校园教务选课系统 - 时段冲突检测器
// ==========================================
// 职责: 对一组开课时段做两两时间冲突检测
// 红线: 纯计算, 不读库不写库
// 算法: 按 (星期, 开始时刻) 排序后扫描线, O(n log n + k)
// ==========================================

use crate::domain::schedule::{ScheduleConflict, ScheduleSlot};

// ==========================================
// ConflictDetector - 冲突检测器
// ==========================================
pub struct ConflictDetector;

impl ConflictDetector {
    pub fn new() -> Self {
        Self
    }

    /// 检测一组时段内的全部两两冲突
    ///
    /// # 约束
    /// - 区间为半开区间 [start, end), 首尾相接不算冲突
    /// - 每对无序冲突只报告一次, 时段ID按字典序排列
    /// - 候选集规模通常只有十几条, 但同样用于整学期
    ///   时段目录的冲突巡检, 因此保持排序扫描而非两两比较
    ///
    /// # 返回
    /// - Vec<ScheduleConflict>: 冲突列表 (无冲突时为空)
    pub fn detect(&self, slots: &[ScheduleSlot]) -> Vec<ScheduleConflict> {
        let mut conflicts = Vec::new();
        if slots.len() < 2 {
            return conflicts;
        }

        // 按 (星期, 开始时刻, 时段ID) 排序, 同一天的时段天然相邻
        let mut sorted: Vec<&ScheduleSlot> = slots.iter().collect();
        sorted.sort_by(|a, b| {
            (a.day_of_week, a.start_time, &a.slot_id).cmp(&(b.day_of_week, b.start_time, &b.slot_id))
        });

        // 扫描线: active 中保留"尚未结束"的时段
        let mut active: Vec<&ScheduleSlot> = Vec::new();
        for current in sorted {
            active.retain(|open| {
                open.day_of_week == current.day_of_week && open.end_time > current.start_time
            });

            for open in &active {
                if let Some((overlap_start, overlap_end)) = open.overlap_window(current) {
                    let (first, second) = if open.slot_id <= current.slot_id {
                        (open.slot_id.clone(), current.slot_id.clone())
                    } else {
                        (current.slot_id.clone(), open.slot_id.clone())
                    };
                    conflicts.push(ScheduleConflict {
                        first_slot_id: first,
                        second_slot_id: second,
                        day_of_week: current.day_of_week,
                        overlap_start,
                        overlap_end,
                    });
                }
            }

            active.push(current);
        }

        conflicts
    }
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new()
    }
}

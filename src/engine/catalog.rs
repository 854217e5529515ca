// ==========================================
// 校园教务选课系统 - 目录读取接口
// ==========================================
// 职责: 为选课引擎提供课程/时段/修读记录的只读视图
// 说明: Engine 层定义 trait, Repository 层提供实现 (依赖倒置),
//       引擎永远不直接持有数据库连接
// ==========================================

use crate::domain::course::{Course, PrerequisiteWaiver};
use crate::domain::krs::CompletionRecord;
use crate::domain::schedule::ScheduleSlot;
use crate::domain::student::Student;
use crate::repository::error::RepositoryResult;
use crate::repository::{
    CompletionRepository, CourseRepository, ScheduleRepository, StudentRepository,
};
use async_trait::async_trait;
use std::sync::Arc;

// ==========================================
// CatalogReader Trait
// ==========================================
// 用途: 选课引擎校验阶段所需的全部只读查询
// 红线: 只读; 名额更改只发生在 KrsRepository.commit_krs 内
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// 按学号加载学生
    async fn load_student(&self, student_id: &str) -> RepositoryResult<Option<Student>>;

    /// 按ID加载课程 (含直接先修课程ID列表)
    async fn load_course(&self, course_id: &str) -> RepositoryResult<Option<Course>>;

    /// 按ID加载开课时段 (含当前 seats_taken 快照)
    async fn load_schedule_slot(&self, slot_id: &str) -> RepositoryResult<Option<ScheduleSlot>>;

    /// 加载课程在指定学期的全部开课时段
    async fn load_schedule(
        &self,
        course_id: &str,
        term_code: &str,
    ) -> RepositoryResult<Vec<ScheduleSlot>>;

    /// 加载学生的全部修读记录
    async fn load_completion_records(
        &self,
        student_id: &str,
    ) -> RepositoryResult<Vec<CompletionRecord>>;

    /// 加载学生持有的全部先修豁免
    async fn load_waivers(&self, student_id: &str) -> RepositoryResult<Vec<PrerequisiteWaiver>>;
}

// ==========================================
// SqliteCatalogReader - 仓储聚合实现
// ==========================================

/// 基于 SQLite 仓储的目录读取器
///
/// 聚合四个只读仓储, 简化引擎的依赖注入
pub struct SqliteCatalogReader {
    student_repo: Arc<StudentRepository>,
    course_repo: Arc<CourseRepository>,
    schedule_repo: Arc<ScheduleRepository>,
    completion_repo: Arc<CompletionRepository>,
}

impl SqliteCatalogReader {
    pub fn new(
        student_repo: Arc<StudentRepository>,
        course_repo: Arc<CourseRepository>,
        schedule_repo: Arc<ScheduleRepository>,
        completion_repo: Arc<CompletionRepository>,
    ) -> Self {
        Self {
            student_repo,
            course_repo,
            schedule_repo,
            completion_repo,
        }
    }
}

#[async_trait]
impl CatalogReader for SqliteCatalogReader {
    async fn load_student(&self, student_id: &str) -> RepositoryResult<Option<Student>> {
        self.student_repo.find_by_id(student_id)
    }

    async fn load_course(&self, course_id: &str) -> RepositoryResult<Option<Course>> {
        self.course_repo.find_by_id(course_id)
    }

    async fn load_schedule_slot(&self, slot_id: &str) -> RepositoryResult<Option<ScheduleSlot>> {
        self.schedule_repo.find_by_id(slot_id)
    }

    async fn load_schedule(
        &self,
        course_id: &str,
        term_code: &str,
    ) -> RepositoryResult<Vec<ScheduleSlot>> {
        self.schedule_repo.find_by_course(course_id, term_code)
    }

    async fn load_completion_records(
        &self,
        student_id: &str,
    ) -> RepositoryResult<Vec<CompletionRecord>> {
        self.completion_repo.find_by_student(student_id)
    }

    async fn load_waivers(&self, student_id: &str) -> RepositoryResult<Vec<PrerequisiteWaiver>> {
        self.course_repo.find_waivers_by_student(student_id)
    }
}

//! 自动评分结果实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "grading_results")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub submission_id: i64,
    pub attempt: i32,
    pub grade: f64,
    // 各项指标，JSON 对象文本
    #[sea_orm(column_type = "Text")]
    pub metrics: String,
    #[sea_orm(column_type = "Text")]
    pub comments: String,
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::submissions::Entity",
        from = "Column::SubmissionId",
        to = "super::submissions::Column::Id"
    )]
    Submission,
}

impl Related<super::submissions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Submission.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// 从数据库模型转换为业务模型
impl Model {
    pub fn into_grading_result(
        self,
    ) -> crate::errors::Result<crate::models::grading::entities::GradingResult> {
        use crate::models::grading::entities::GradingResult;
        use chrono::{DateTime, Utc};

        Ok(GradingResult {
            id: self.id,
            submission_id: self.submission_id,
            attempt: self.attempt,
            grade: self.grade,
            metrics: serde_json::from_str(&self.metrics)?,
            comments: self.comments,
            created_at: DateTime::<Utc>::from_timestamp(self.created_at, 0).unwrap_or_default(),
        })
    }
}

//! 提交实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "submissions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub homework_id: i64,
    pub creator_id: i64,
    pub kind: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub code_content: Option<String>,
    pub file_path: Option<String>,
    pub status: String,
    pub automated_grade: Option<f64>,
    pub human_grade: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub feedback: Option<String>,
    pub final_grade: Option<f64>,
    pub grading_attempt: i32,
    pub submitted_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::homeworks::Entity",
        from = "Column::HomeworkId",
        to = "super::homeworks::Column::Id"
    )]
    Homework,
    #[sea_orm(has_many = "super::grading_results::Entity")]
    GradingResults,
}

impl Related<super::homeworks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Homework.def()
    }
}

impl Related<super::grading_results::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GradingResults.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// 从数据库模型转换为业务模型
impl Model {
    pub fn into_submission(self) -> crate::models::submissions::entities::Submission {
        use crate::models::submissions::entities::{Submission, SubmissionKind, SubmissionStatus};
        use chrono::{DateTime, Utc};

        Submission {
            id: self.id,
            homework_id: self.homework_id,
            creator_id: self.creator_id,
            kind: self.kind.parse().unwrap_or(SubmissionKind::Editor),
            code_content: self.code_content,
            file_path: self.file_path,
            status: self.status.parse().unwrap_or(SubmissionStatus::Pending),
            automated_grade: self.automated_grade,
            human_grade: self.human_grade,
            feedback: self.feedback,
            final_grade: self.final_grade,
            grading_attempt: self.grading_attempt,
            submitted_at: DateTime::<Utc>::from_timestamp(self.submitted_at, 0)
                .unwrap_or_default(),
            updated_at: DateTime::<Utc>::from_timestamp(self.updated_at, 0).unwrap_or_default(),
        }
    }
}

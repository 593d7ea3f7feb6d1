//! 自动评分结果存储操作

use super::SeaOrmStorage;
use crate::entity::grading_results::{ActiveModel, Column, Entity as GradingResults};
use crate::entity::submissions::{Column as SubmissionColumn, Entity as Submissions};
use crate::errors::{HWSystemError, Result};
use crate::grading::policy::blend;
use crate::models::{
    grading::entities::{GradingResult, NewGradingResult},
    submissions::entities::SubmissionStatus,
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    SqlErr, TransactionTrait,
};

impl SeaOrmStorage {
    /// 在同一事务中写入评分结果并同步提交的自动评分字段
    ///
    /// 1. 仅当提交仍处于该评分批次时更新 automated_grade
    /// 2. 插入评分结果（同一批次唯一）
    /// 3. 状态仅从 pending 推进到 reviewed
    /// 4. 已有教师评分时写入最终成绩
    ///
    /// 批次已被新的评分请求取代，或该批次已有结果时返回 `StaleAttempt`，事务回滚。
    pub async fn record_grading_result_impl(&self, new: NewGradingResult) -> Result<GradingResult> {
        let now = chrono::Utc::now().timestamp();
        let metrics = serde_json::to_string(&new.evaluation.metrics)?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| HWSystemError::database_operation(format!("开启事务失败: {e}")))?;

        let updated = Submissions::update_many()
            .col_expr(
                SubmissionColumn::AutomatedGrade,
                Expr::value(new.evaluation.grade),
            )
            .col_expr(SubmissionColumn::UpdatedAt, Expr::value(now))
            .filter(SubmissionColumn::Id.eq(new.submission_id))
            .filter(SubmissionColumn::GradingAttempt.eq(new.attempt))
            .exec(&txn)
            .await
            .map_err(|e| HWSystemError::database_operation(format!("更新自动评分失败: {e}")))?;

        if updated.rows_affected == 0 {
            txn.rollback().await.ok();
            return Err(HWSystemError::stale_attempt(format!(
                "submission {} is missing or attempt {} was superseded",
                new.submission_id, new.attempt
            )));
        }

        let model = ActiveModel {
            submission_id: Set(new.submission_id),
            attempt: Set(new.attempt),
            grade: Set(new.evaluation.grade),
            metrics: Set(metrics),
            comments: Set(new.evaluation.comments),
            created_at: Set(now),
            ..Default::default()
        };

        let inserted = match model.insert(&txn).await {
            Ok(m) => m,
            Err(e) => {
                txn.rollback().await.ok();
                return Err(map_insert_error(e, new.submission_id, new.attempt));
            }
        };

        Submissions::update_many()
            .col_expr(
                SubmissionColumn::Status,
                Expr::value(SubmissionStatus::REVIEWED.to_string()),
            )
            .filter(SubmissionColumn::Id.eq(new.submission_id))
            .filter(SubmissionColumn::Status.eq(SubmissionStatus::PENDING))
            .exec(&txn)
            .await
            .map_err(|e| HWSystemError::database_operation(format!("更新提交状态失败: {e}")))?;

        let human_grade = Submissions::find_by_id(new.submission_id)
            .select_only()
            .column(SubmissionColumn::HumanGrade)
            .into_tuple::<Option<f64>>()
            .one(&txn)
            .await
            .map_err(|e| HWSystemError::database_operation(format!("查询教师评分失败: {e}")))?
            .flatten();

        if let Some(human) = human_grade {
            Submissions::update_many()
                .col_expr(
                    SubmissionColumn::FinalGrade,
                    Expr::value(blend(human, new.evaluation.grade)),
                )
                .filter(SubmissionColumn::Id.eq(new.submission_id))
                .exec(&txn)
                .await
                .map_err(|e| {
                    HWSystemError::database_operation(format!("更新最终成绩失败: {e}"))
                })?;
        }

        txn.commit()
            .await
            .map_err(|e| HWSystemError::database_operation(format!("提交事务失败: {e}")))?;

        inserted.into_grading_result()
    }

    /// 获取某一批次的评分结果
    pub async fn get_grading_result_by_attempt_impl(
        &self,
        submission_id: i64,
        attempt: i32,
    ) -> Result<Option<GradingResult>> {
        let result = GradingResults::find()
            .filter(Column::SubmissionId.eq(submission_id))
            .filter(Column::Attempt.eq(attempt))
            .one(&self.db)
            .await
            .map_err(|e| HWSystemError::database_operation(format!("查询评分结果失败: {e}")))?;

        result.map(|m| m.into_grading_result()).transpose()
    }

    /// 列出提交最近的评分结果（新的在前）
    pub async fn list_grading_results_impl(
        &self,
        submission_id: i64,
        limit: u64,
    ) -> Result<Vec<GradingResult>> {
        let results = GradingResults::find()
            .filter(Column::SubmissionId.eq(submission_id))
            .order_by_desc(Column::Attempt)
            .order_by_desc(Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(|e| HWSystemError::database_operation(format!("查询评分结果失败: {e}")))?;

        results
            .into_iter()
            .map(|m| m.into_grading_result())
            .collect()
    }
}

fn map_insert_error(err: DbErr, submission_id: i64, attempt: i32) -> HWSystemError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => HWSystemError::stale_attempt(format!(
            "submission {submission_id} already has a result for attempt {attempt}"
        )),
        _ => HWSystemError::database_operation(format!("写入评分结果失败: {err}")),
    }
}

//! 提交存储操作
//!
//! 提交记录的字段按归属分开更新：自动评分字段只由评分流程写入，
//! 教师评分字段只由教师评分写入，均使用按列更新而非整行覆盖。
//! 最终成绩在写入任一评分的同一事务中重新计算：先更新本方字段锁定行，
//! 再读取另一方字段，保证写入的最终成绩与提交时的两项评分一致。

use super::SeaOrmStorage;
use crate::entity::submissions::{ActiveModel, Column, Entity as Submissions};
use crate::errors::{HWSystemError, Result};
use crate::grading::policy::blend;
use crate::models::submissions::{
    entities::{Submission, SubmissionStatus},
    requests::CreateSubmissionRequest,
};
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};

impl SeaOrmStorage {
    /// 创建提交
    pub async fn create_submission_impl(&self, req: CreateSubmissionRequest) -> Result<Submission> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            homework_id: Set(req.homework_id),
            creator_id: Set(req.creator_id),
            kind: Set(req.kind.to_string()),
            code_content: Set(req.code_content),
            file_path: Set(req.file_path),
            status: Set(SubmissionStatus::PENDING.to_string()),
            grading_attempt: Set(0),
            submitted_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| HWSystemError::database_operation(format!("创建提交失败: {e}")))?;

        Ok(result.into_submission())
    }

    /// 通过 ID 获取提交
    pub async fn get_submission_by_id_impl(
        &self,
        submission_id: i64,
    ) -> Result<Option<Submission>> {
        let result = Submissions::find_by_id(submission_id)
            .one(&self.db)
            .await
            .map_err(|e| HWSystemError::database_operation(format!("查询提交失败: {e}")))?;

        Ok(result.map(|m| m.into_submission()))
    }

    /// 开启新的评分批次，返回新的批次号
    ///
    /// 提交不存在时返回 `None`。
    pub async fn next_grading_attempt_impl(&self, submission_id: i64) -> Result<Option<i32>> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| HWSystemError::database_operation(format!("开启事务失败: {e}")))?;

        let updated = Submissions::update_many()
            .col_expr(
                Column::GradingAttempt,
                Expr::col(Column::GradingAttempt).add(1),
            )
            .filter(Column::Id.eq(submission_id))
            .exec(&txn)
            .await
            .map_err(|e| HWSystemError::database_operation(format!("更新评分批次失败: {e}")))?;

        if updated.rows_affected == 0 {
            txn.rollback().await.ok();
            return Ok(None);
        }

        let attempt = Submissions::find_by_id(submission_id)
            .select_only()
            .column(Column::GradingAttempt)
            .into_tuple::<i32>()
            .one(&txn)
            .await
            .map_err(|e| HWSystemError::database_operation(format!("查询评分批次失败: {e}")))?;

        txn.commit()
            .await
            .map_err(|e| HWSystemError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(attempt)
    }

    /// 撤销一次未能入队的评分批次
    ///
    /// 仅当批次号仍为 `attempt` 时回退，之后又开启的批次不受影响。
    pub async fn revert_grading_attempt_impl(
        &self,
        submission_id: i64,
        attempt: i32,
    ) -> Result<bool> {
        let result = Submissions::update_many()
            .col_expr(Column::GradingAttempt, Expr::value(attempt - 1))
            .filter(Column::Id.eq(submission_id))
            .filter(Column::GradingAttempt.eq(attempt))
            .exec(&self.db)
            .await
            .map_err(|e| HWSystemError::database_operation(format!("回退评分批次失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }

    /// 写入教师评分，状态推进为 graded
    ///
    /// 已有自动评分时在同一事务中写入最终成绩。
    pub async fn apply_human_grade_impl(
        &self,
        submission_id: i64,
        human_grade: f64,
        feedback: Option<String>,
    ) -> Result<Option<Submission>> {
        let now = chrono::Utc::now().timestamp();

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| HWSystemError::database_operation(format!("开启事务失败: {e}")))?;

        let result = Submissions::update_many()
            .col_expr(Column::HumanGrade, Expr::value(human_grade))
            .col_expr(Column::Feedback, Expr::value(feedback))
            .col_expr(
                Column::Status,
                Expr::value(SubmissionStatus::GRADED.to_string()),
            )
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(submission_id))
            .exec(&txn)
            .await
            .map_err(|e| HWSystemError::database_operation(format!("写入教师评分失败: {e}")))?;

        if result.rows_affected == 0 {
            txn.rollback().await.ok();
            return Ok(None);
        }

        let automated_grade = Submissions::find_by_id(submission_id)
            .select_only()
            .column(Column::AutomatedGrade)
            .into_tuple::<Option<f64>>()
            .one(&txn)
            .await
            .map_err(|e| HWSystemError::database_operation(format!("查询自动评分失败: {e}")))?
            .flatten();

        if let Some(automated) = automated_grade {
            Submissions::update_many()
                .col_expr(
                    Column::FinalGrade,
                    Expr::value(blend(human_grade, automated)),
                )
                .filter(Column::Id.eq(submission_id))
                .exec(&txn)
                .await
                .map_err(|e| {
                    HWSystemError::database_operation(format!("更新最终成绩失败: {e}"))
                })?;
        }

        let updated = Submissions::find_by_id(submission_id)
            .one(&txn)
            .await
            .map_err(|e| HWSystemError::database_operation(format!("查询提交失败: {e}")))?;

        txn.commit()
            .await
            .map_err(|e| HWSystemError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(updated.map(|m| m.into_submission()))
    }
}

use sea_orm_migration::prelude::*;

use crate::m20250123_000001_create_tables::Submissions;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建自动评分结果表
        manager
            .create_table(
                Table::create()
                    .table(GradingResults::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GradingResults::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GradingResults::SubmissionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GradingResults::Attempt)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GradingResults::Grade).double().not_null())
                    .col(ColumnDef::new(GradingResults::Metrics).text().not_null())
                    .col(ColumnDef::new(GradingResults::Comments).text().not_null())
                    .col(
                        ColumnDef::new(GradingResults::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(GradingResults::Table, GradingResults::SubmissionId)
                            .to(Submissions::Table, Submissions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 同一提交的同一评分批次只允许一条结果
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_grading_results_submission_attempt")
                    .table(GradingResults::Table)
                    .col(GradingResults::SubmissionId)
                    .col(GradingResults::Attempt)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GradingResults::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum GradingResults {
    #[sea_orm(iden = "grading_results")]
    Table,
    Id,
    SubmissionId,
    Attempt,
    Grade,
    Metrics,
    Comments,
    CreatedAt,
}

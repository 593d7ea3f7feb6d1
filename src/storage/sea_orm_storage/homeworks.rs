//! 作业存储操作

use super::SeaOrmStorage;
use crate::entity::homeworks::{ActiveModel, Entity as Homeworks};
use crate::errors::{HWSystemError, Result};
use crate::models::homeworks::entities::{CreateHomeworkRequest, Homework};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

impl SeaOrmStorage {
    /// 创建作业
    pub async fn create_homework_impl(&self, req: CreateHomeworkRequest) -> Result<Homework> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            title: Set(req.title),
            statement: Set(req.statement),
            input_spec: Set(req.input_spec),
            output_spec: Set(req.output_spec),
            language: Set(req.language),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| HWSystemError::database_operation(format!("创建作业失败: {e}")))?;

        Ok(result.into_homework())
    }

    /// 通过 ID 获取作业
    pub async fn get_homework_by_id_impl(&self, homework_id: i64) -> Result<Option<Homework>> {
        let result = Homeworks::find_by_id(homework_id)
            .one(&self.db)
            .await
            .map_err(|e| HWSystemError::database_operation(format!("查询作业失败: {e}")))?;

        Ok(result.map(|m| m.into_homework()))
    }
}

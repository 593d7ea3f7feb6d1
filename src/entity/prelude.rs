//! 预导入模块，方便使用

pub use super::grading_results::{
    ActiveModel as GradingResultActiveModel, Entity as GradingResults,
    Model as GradingResultModel,
};
pub use super::homeworks::{
    ActiveModel as HomeworkActiveModel, Entity as Homeworks, Model as HomeworkModel,
};
pub use super::submissions::{
    ActiveModel as SubmissionActiveModel, Entity as Submissions, Model as SubmissionModel,
};

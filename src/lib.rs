//! HWSystem Grader - 作业系统自动评分服务
//!
//! 学生提交代码后，评分任务进入队列，由后台 worker 调用外部评分服务，
//! 保存结构化评分结果，并与教师评分按权重合成最终成绩。
//!
//! # 架构
//! - `config`: 配置管理
//! - `entity`: SeaORM 数据库实体
//! - `errors`: 统一错误处理
//! - `grading`: 评分服务客户端、评分流程、成绩加权
//! - `models`: 数据模型定义
//! - `queue`: 评分任务队列与 worker 池
//! - `routes`: API 路由层
//! - `runtime`: 运行时生命周期管理
//! - `services`: 业务逻辑层
//! - `storage`: 数据存储层（SeaORM）与代码文件存储
//! - `utils`: 工具函数

pub mod config;
pub mod entity;
pub mod errors;
pub mod grading;
pub mod models;
pub mod queue;
pub mod routes;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod utils;

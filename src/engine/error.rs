// ==========================================
// 工厂设备维护管理 - 引擎层错误类型
// ==========================================
// 职责: 维护核心的错误分类（校验/重复/库存/未找到/数据缺失）
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("校验失败: {0}")]
    Validation(String),

    #[error("重复记录: {0}")]
    DuplicateKey(String),

    #[error("库存不足: part_id={part_id}, 可用={available}, 需求={requested}")]
    InsufficientStock {
        part_id: String,
        available: i64,
        requested: i64,
    },

    #[error("记录未找到: {entity} id={id}")]
    NotFound { entity: String, id: String },

    #[error("数据不可用: {0}")]
    DataUnavailable(String),

    #[error("状态已被其他会话修改: {0}")]
    Conflict(String),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for EngineError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            RepositoryError::InsufficientStock {
                part_id,
                available,
                requested,
            } => EngineError::InsufficientStock {
                part_id,
                available,
                requested,
            },
            RepositoryError::UniqueConstraintViolation(msg) => EngineError::DuplicateKey(msg),
            RepositoryError::StaleState { entity, id, expected } => EngineError::Conflict(format!(
                "{} id={} 期望状态={}",
                entity, id, expected
            )),
            other => EngineError::Repository(other),
        }
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;

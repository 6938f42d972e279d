//! Profile 操作错误

use crate::data::DataError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    /// Profile 名称校验失败（未配置通知器时才会返回）
    #[error("无效的 Profile 名称: {0}")]
    InvalidProfileName(String),

    /// 持久化失败
    #[error(transparent)]
    Storage(#[from] DataError),
}

pub type Result<T> = std::result::Result<T, ProfileError>;

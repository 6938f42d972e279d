//! Profile 数据管理模块
//!
//! 设计原则：显式上下文代替全局单例
//! - `ProfileData`: 五个类型化存储 + Profile 列表 + 当前 Profile + 生命周期事件
//! - 每个 Profile 在键值存储中占用五个加密 blob（`<name>_IntData` 等）
//! - Profile 列表以逗号连接保存在 `profiles` 键下

mod error;
mod manager;
mod types;

pub use error::{ProfileError, Result};
pub use manager::ProfileData;
pub use types::{
    blob_key, validate_profile_name, Notifier, BLOB_SUFFIXES, INVALID_NAME_NOTICE_SECS,
    PROFILE_LIST_KEY,
};

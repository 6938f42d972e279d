//! 统一数据持久化模块
//!
//! 提供 Profile 数据落盘所需的同步键值存储。
//!
//! # 模块组织
//!
//! - `error`: 统一错误类型定义
//! - `managers`: 键值存储实现（内存 / 文件）

pub mod error;
pub mod managers;

pub use error::{DataError, Result};
pub use managers::{FilePrefsStore, KeyValueStore, MemoryStore};

//! 键值存储实现
//!
//! - `prefs`: 偏好设置存储（内存实现与 `key=value` 文件实现）

pub mod prefs;

pub use prefs::{FilePrefsStore, KeyValueStore, MemoryStore};

// lib.rs - 暴露 Profile 数据层给 CLI 和嵌入方使用

pub mod core; // 日志基础设施
pub mod data; // 键值存储
pub mod models;
pub mod services;
pub mod utils;

pub use models::*;

pub use data::{DataError, FilePrefsStore, KeyValueStore, MemoryStore};
pub use services::cipher::{BlobCipher, CipherError};
pub use services::codec::{CodecError, StoredValue};
pub use services::events::{EventHub, SubscriptionId};
pub use services::profile_data::{
    blob_key, validate_profile_name, Notifier, ProfileData, ProfileError, BLOB_SUFFIXES,
    PROFILE_LIST_KEY,
};
pub use services::template::{format_int, TokenSource};
pub use services::typed_store::{Listener, TypedStore};
pub use utils::config::{load_app_config, open_profile_data, ConfigError};

pub use self::core::{init_logger, update_log_level};

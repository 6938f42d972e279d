// 服务层模块
//
// 目录结构：
// - codec: 单行 `key:value` 编解码
// - cipher: 存档 blob 的 AES 加解密
// - typed_store: 带按键监听的类型化存储
// - events: 保存 / 载入 / 清空事件
// - template: `[key]` 模板插值
// - profile_data: Profile 管理上下文

pub mod cipher;
pub mod codec;
pub mod events;
pub mod profile_data;
pub mod template;
pub mod typed_store;

pub use cipher::{BlobCipher, CipherError};
pub use codec::{CodecError, StoredValue};
pub use events::{EventHub, SubscriptionId};
pub use profile_data::{Notifier, ProfileData, ProfileError};
pub use template::{format_int, parse_template, TokenSource};
pub use typed_store::{Listener, TypedStore};

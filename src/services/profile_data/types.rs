//! Profile 相关常量、通知器接口与名称校验

use crate::models::{Color, Vector3};
use crate::services::codec::StoredValue;

/// Profile 列表在键值存储中的键
pub const PROFILE_LIST_KEY: &str = "profiles";

/// 无效名称提示的展示时长（秒）
pub const INVALID_NAME_NOTICE_SECS: f32 = 3.0;

/// 五种类型 blob 的键后缀（保存 / 删除顺序）
pub const BLOB_SUFFIXES: [&str; 5] = [
    <i32 as StoredValue>::BLOB_SUFFIX,
    <f32 as StoredValue>::BLOB_SUFFIX,
    <String as StoredValue>::BLOB_SUFFIX,
    <Vector3 as StoredValue>::BLOB_SUFFIX,
    <Color as StoredValue>::BLOB_SUFFIX,
];

/// 面向用户的提示通道（例如界面上的浮动提示）
pub trait Notifier {
    fn show(&self, message: &str, duration_secs: f32);
}

/// 组合某个 Profile 某种类型的存储键
pub fn blob_key(profile: &str, suffix: &str) -> String {
    format!("{}{}", profile, suffix)
}

/// 校验 Profile 名称：非空且只包含字母和数字
pub fn validate_profile_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("Profile 名称不能为空");
    }
    if !name.chars().all(char::is_alphanumeric) {
        return Err("Profile 名称只能包含字母和数字");
    }
    Ok(())
}

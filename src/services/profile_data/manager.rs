//! ProfileData 核心实现

use super::error::{ProfileError, Result};
use super::types::*;
use crate::data::KeyValueStore;
use crate::models::{Color, Vector3};
use crate::services::cipher::BlobCipher;
use crate::services::codec::{deserialize_blob, serialize_entries, StoredValue};
use crate::services::events::EventHub;
use crate::services::template::{parse_template, TokenSource};
use crate::services::typed_store::{Listener, TypedStore};
use std::cell::RefCell;

/// 为每种值类型生成便捷读写 / 监听方法
macro_rules! typed_accessors {
    (
        $store:ident: $ty:ty, $arg:ty, default = $default:expr, sentinel = $sentinel:expr,
        $get:ident, $get_or:ident, $set:ident, $has:ident, $add:ident, $remove:ident
    ) => {
        pub fn $get(&self, key: &str) -> $ty {
            self.$store.get(key, $default)
        }

        pub fn $get_or(&self, key: &str, default: $ty) -> $ty {
            self.$store.get(key, default)
        }

        pub fn $set(&self, key: &str, value: $arg) {
            self.$store.set(key, value.into())
        }

        /// 值不等于哨兵零值时视为已设置（显式写入的零值同样读作未设置）
        pub fn $has(&self, key: &str) -> bool {
            self.$store.get(key, $sentinel).is_present()
        }

        pub fn $add(&self, key: &str, callback: Listener<$ty>) {
            self.$store.add_change_listener(key, callback)
        }

        pub fn $remove(&self, key: &str, callback: &Listener<$ty>) {
            self.$store.remove_change_listener(key, callback)
        }
    };
}

/// Profile 化的类型数据上下文
///
/// 单线程使用；所有操作同步完成。监听器与事件回调可以重入本对象。
pub struct ProfileData {
    storage: RefCell<Box<dyn KeyValueStore>>,
    cipher: BlobCipher,
    notifier: Option<Box<dyn Notifier>>,
    /// 懒加载的 Profile 列表（None 表示尚未从存储读取）
    profile_list: RefCell<Option<Vec<String>>>,
    current_profile: RefCell<Option<String>>,
    ints: TypedStore<i32>,
    floats: TypedStore<f32>,
    strings: TypedStore<String>,
    vector3s: TypedStore<Vector3>,
    colors: TypedStore<Color>,
    on_save: EventHub,
    on_load: EventHub,
    on_clear: EventHub,
}

impl ProfileData {
    pub fn new(storage: Box<dyn KeyValueStore>, cipher: BlobCipher) -> Self {
        Self {
            storage: RefCell::new(storage),
            cipher,
            notifier: None,
            profile_list: RefCell::new(None),
            current_profile: RefCell::new(None),
            ints: TypedStore::new(),
            floats: TypedStore::new(),
            strings: TypedStore::new(),
            vector3s: TypedStore::new(),
            colors: TypedStore::new(),
            on_save: EventHub::new("save"),
            on_load: EventHub::new("load"),
            on_clear: EventHub::new("clear"),
        }
    }

    /// 配置用户提示通道；配置后无效名称通过提示反馈而不是返回错误
    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// 释放上下文并取回底层存储
    pub fn into_storage(self) -> Box<dyn KeyValueStore> {
        self.storage.into_inner()
    }

    /// 只读访问底层存储
    pub fn with_storage<R>(&self, f: impl FnOnce(&dyn KeyValueStore) -> R) -> R {
        let storage = self.storage.borrow();
        f(&**storage)
    }

    // ==================== Profile 列表 ====================

    fn with_profile_list<R>(&self, f: impl FnOnce(&mut Vec<String>) -> R) -> R {
        let mut cached = self.profile_list.borrow_mut();
        let list = cached.get_or_insert_with(|| self.read_profile_list());
        f(list)
    }

    /// 从存储读取列表并剔除损坏条目
    fn read_profile_list(&self) -> Vec<String> {
        let raw = self.storage.borrow().get_string(PROFILE_LIST_KEY, "");
        raw.split(',')
            .filter(|name| match validate_profile_name(name) {
                Ok(()) => true,
                Err(reason) => {
                    if !name.is_empty() {
                        tracing::warn!(name = %name, reason, "Profile 列表中存在无效条目，已剔除");
                    }
                    false
                }
            })
            .map(String::from)
            .collect()
    }

    /// 写回列表并刷盘；列表为空时删除键
    fn persist_profile_list(&self) -> Result<()> {
        let joined = self.with_profile_list(|list| list.join(","));
        let mut storage = self.storage.borrow_mut();
        if joined.is_empty() {
            storage.delete_key(PROFILE_LIST_KEY);
        } else {
            storage.set_string(PROFILE_LIST_KEY, &joined);
        }
        storage.save()?;
        Ok(())
    }

    pub fn get_profile_list(&self) -> Vec<String> {
        self.with_profile_list(|list| list.clone())
    }

    pub fn profile_count(&self) -> usize {
        self.with_profile_list(|list| list.len())
    }

    pub fn profile_exists(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        self.with_profile_list(|list| list.iter().any(|n| n == name))
    }

    /// 注册新 Profile
    ///
    /// # 返回
    ///
    /// - `Ok(true)`: 已添加并写回列表
    /// - `Ok(false)`: 名称已存在，或名称无效且已通过通知器提示
    /// - `Err(InvalidProfileName)`: 名称无效且未配置通知器
    pub fn add_profile(&self, name: &str) -> Result<bool> {
        if let Err(reason) = validate_profile_name(name) {
            let message = format!("无效的 Profile 名称: {}", reason);
            return match &self.notifier {
                Some(notifier) => {
                    notifier.show(&message, INVALID_NAME_NOTICE_SECS);
                    Ok(false)
                }
                None => Err(ProfileError::InvalidProfileName(reason.to_string())),
            };
        }

        let added = self.with_profile_list(|list| {
            if list.iter().any(|n| n == name) {
                false
            } else {
                list.push(name.to_string());
                true
            }
        });
        if !added {
            return Ok(false);
        }

        self.persist_profile_list()?;
        tracing::info!(profile = %name, "已添加 Profile");
        Ok(true)
    }

    /// 删除 Profile 的五个 blob 并从列表移除；未注册时无操作
    ///
    /// 不影响内存中的数据和当前 Profile。
    pub fn delete_profile(&self, name: &str) -> Result<()> {
        if !self.profile_exists(name) {
            return Ok(());
        }

        {
            let mut storage = self.storage.borrow_mut();
            for suffix in BLOB_SUFFIXES {
                storage.delete_key(&blob_key(name, suffix));
            }
        }
        self.with_profile_list(|list| {
            if let Some(pos) = list.iter().position(|n| n == name) {
                list.remove(pos);
            }
        });
        self.persist_profile_list()?;

        tracing::info!(profile = %name, "已删除 Profile");
        Ok(())
    }

    // ==================== 保存 / 载入 / 清空 ====================

    pub fn current_profile(&self) -> Option<String> {
        self.current_profile.borrow().clone()
    }

    /// 保存到当前 Profile；没有当前 Profile 时记录警告并返回 `Ok(false)`
    pub fn save(&self) -> Result<bool> {
        match self.current_profile() {
            Some(name) if !name.is_empty() => self.save_as(&name),
            _ => {
                tracing::warn!("当前 Profile 为空，无法保存");
                Ok(false)
            }
        }
    }

    /// 保存到指定 Profile（未注册时自动注册）
    ///
    /// 五种类型各自序列化、加密后写入独立的键，随后写回列表、刷盘并触发保存事件。
    pub fn save_as(&self, name: &str) -> Result<bool> {
        let registered = if self.profile_exists(name) {
            true
        } else {
            match self.add_profile(name) {
                Ok(added) => added,
                Err(ProfileError::InvalidProfileName(reason)) => {
                    tracing::error!(profile = %name, reason = %reason, "Profile 名称无效，取消保存");
                    return Err(ProfileError::InvalidProfileName(reason));
                }
                Err(e) => return Err(e),
            }
        };
        if !registered {
            return Ok(false);
        }

        {
            let mut storage = self.storage.borrow_mut();
            let storage = &mut **storage;
            self.write_blob(storage, name, &self.ints);
            self.write_blob(storage, name, &self.floats);
            self.write_blob(storage, name, &self.strings);
            self.write_blob(storage, name, &self.vector3s);
            self.write_blob(storage, name, &self.colors);
        }
        self.persist_profile_list()?;

        tracing::info!(
            profile = %name,
            ints = self.ints.len(),
            floats = self.floats.len(),
            strings = self.strings.len(),
            vector3s = self.vector3s.len(),
            colors = self.colors.len(),
            "Profile 已保存"
        );
        self.on_save.emit();
        Ok(true)
    }

    fn write_blob<T: StoredValue>(
        &self,
        storage: &mut dyn KeyValueStore,
        name: &str,
        store: &TypedStore<T>,
    ) {
        let text = serialize_entries(&store.entries());
        storage.set_string(&blob_key(name, T::BLOB_SUFFIX), &self.cipher.encrypt(&text));
    }

    /// 载入指定 Profile
    ///
    /// 先静默清空内存值（保留监听器、不触发清空事件），再逐条 `set` 恢复的数据，
    /// 因此已注册的监听器会收到载入的值。从未保存过的 Profile 得到空数据。
    pub fn load(&self, name: &str) -> Result<()> {
        self.clear_values_silently();

        self.read_blob(name, &self.ints);
        self.read_blob(name, &self.floats);
        self.read_blob(name, &self.strings);
        self.read_blob(name, &self.vector3s);
        self.read_blob(name, &self.colors);

        *self.current_profile.borrow_mut() = Some(name.to_string());

        tracing::info!(
            profile = %name,
            ints = self.ints.len(),
            floats = self.floats.len(),
            strings = self.strings.len(),
            vector3s = self.vector3s.len(),
            colors = self.colors.len(),
            "Profile 已载入"
        );
        self.on_load.emit();
        Ok(())
    }

    fn read_blob<T: StoredValue>(&self, name: &str, store: &TypedStore<T>) {
        let encrypted = self
            .storage
            .borrow()
            .get_string(&blob_key(name, T::BLOB_SUFFIX), "");
        let text = self.cipher.decrypt(&encrypted);
        for (key, value) in deserialize_blob::<T>(&text) {
            store.set(&key, value);
        }
    }

    /// 清空全部内存数据与监听器，重置当前 Profile 并触发清空事件
    pub fn clear(&self) {
        self.ints.clear();
        self.floats.clear();
        self.strings.clear();
        self.vector3s.clear();
        self.colors.clear();

        *self.current_profile.borrow_mut() = None;

        tracing::debug!("Profile 数据已清空");
        self.on_clear.emit();
    }

    fn clear_values_silently(&self) {
        self.ints.clear_values();
        self.floats.clear_values();
        self.strings.clear_values();
        self.vector3s.clear_values();
        self.colors.clear_values();
    }

    // ==================== 事件 ====================

    pub fn on_save(&self) -> &EventHub {
        &self.on_save
    }

    pub fn on_load(&self) -> &EventHub {
        &self.on_load
    }

    pub fn on_clear(&self) -> &EventHub {
        &self.on_clear
    }

    // ==================== 类型化访问 ====================

    pub fn ints(&self) -> &TypedStore<i32> {
        &self.ints
    }

    pub fn floats(&self) -> &TypedStore<f32> {
        &self.floats
    }

    pub fn strings(&self) -> &TypedStore<String> {
        &self.strings
    }

    pub fn vector3s(&self) -> &TypedStore<Vector3> {
        &self.vector3s
    }

    pub fn colors(&self) -> &TypedStore<Color> {
        &self.colors
    }

    typed_accessors!(ints: i32, i32, default = 0, sentinel = 0,
        get_int, get_int_or, set_int, has_int, add_int_change_listener, remove_int_change_listener);
    typed_accessors!(floats: f32, f32, default = 0.0, sentinel = 0.0,
        get_float, get_float_or, set_float, has_float, add_float_change_listener, remove_float_change_listener);
    typed_accessors!(strings: String, &str, default = String::new(), sentinel = String::new(),
        get_string, get_string_or, set_string, has_string, add_string_change_listener, remove_string_change_listener);
    typed_accessors!(vector3s: Vector3, Vector3, default = Vector3::ZERO, sentinel = Vector3::ZERO,
        get_vector3, get_vector3_or, set_vector3, has_vector3, add_vector3_change_listener, remove_vector3_change_listener);
    typed_accessors!(colors: Color, Color, default = Color::WHITE, sentinel = Color::BLACK,
        get_color, get_color_or, set_color, has_color, add_color_change_listener, remove_color_change_listener);

    /// 整数增量写入（溢出回绕）
    pub fn add_int(&self, key: &str, amount: i32) {
        self.ints.set(key, self.get_int(key).wrapping_add(amount));
    }

    // ==================== 模板 / 调试 ====================

    /// 展开 `[key]` / `[key(format)]` 模板
    pub fn parse_string(&self, template: &str) -> String {
        parse_template(template, self)
    }

    /// 以调试日志输出全部数据
    pub fn print_all(&self) {
        self.ints.dump();
        self.floats.dump();
        self.strings.dump();
        self.vector3s.dump();
        self.colors.dump();
    }
}

impl TokenSource for ProfileData {
    fn int_value(&self, key: &str) -> Option<i32> {
        self.has_int(key).then(|| self.get_int(key))
    }

    fn string_value(&self, key: &str) -> Option<String> {
        self.has_string(key).then(|| self.get_string(key))
    }
}

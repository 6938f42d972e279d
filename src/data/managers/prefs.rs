//! 偏好设置键值存储
//!
//! 提供 Profile 数据落盘所需的同步字符串键值存储，支持：
//! - 内存实现（测试、嵌入场景）
//! - 文件实现：`key=value` 行格式、键排序、保留注释行语义
//! - 自动创建父目录
//! - Unix 权限设置（0o600）
//! - 刷盘时获取排他文件锁
//!
//! # 使用示例
//!
//! ```rust
//! use std::path::Path;
//! use crate::data::managers::{FilePrefsStore, KeyValueStore};
//!
//! let mut store = FilePrefsStore::open(Path::new("prefs.env"))?;
//! store.set_string("profiles", "alice,bob");
//! store.save()?;
//! ```

use crate::data::{DataError, Result};
use fs2::FileExt;
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// 同步字符串键值存储
///
/// 读写都在内存中完成，只有 [`KeyValueStore::save`] 会触及持久化介质。
pub trait KeyValueStore {
    /// 读取键值，不存在时返回 `default`
    fn get_string(&self, key: &str, default: &str) -> String;

    /// 写入键值（覆盖已有值）
    fn set_string(&mut self, key: &str, value: &str);

    /// 删除键，不存在时无操作
    fn delete_key(&mut self, key: &str);

    /// 检查键是否存在
    fn has_key(&self, key: &str) -> bool;

    /// 刷盘
    fn save(&mut self) -> Result<()>;
}

/// 内存键值存储
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    save_count: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `save` 被调用的次数
    pub fn save_count(&self) -> usize {
        self.save_count
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_string(&self, key: &str, default: &str) -> String {
        self.values
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    fn set_string(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    fn delete_key(&mut self, key: &str) {
        self.values.remove(key);
    }

    fn has_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn save(&mut self) -> Result<()> {
        self.save_count += 1;
        Ok(())
    }
}

/// 文件键值存储
///
/// 打开时整体读入内存，`save` 时按键排序整体写回。
pub struct FilePrefsStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
    dirty: bool,
}

impl FilePrefsStore {
    /// 打开存储文件，文件不存在时视为空存储
    ///
    /// # 返回
    ///
    /// - `Ok(FilePrefsStore)`: 已载入的存储
    /// - `Err(DataError)`: 读取失败或存在无法解析的行
    pub fn open(path: &Path) -> Result<Self> {
        let mut values = BTreeMap::new();

        if path.exists() {
            let content =
                fs::read_to_string(path).map_err(|e| DataError::io(path.to_path_buf(), e))?;
            for (index, line) in content.lines().enumerate() {
                match parse_prefs_line(line) {
                    PrefsLine::Pair(key, value) => {
                        values.insert(key, value);
                    }
                    PrefsLine::Skip => {}
                    PrefsLine::Invalid => {
                        return Err(DataError::Malformed {
                            path: path.to_path_buf(),
                            line: index + 1,
                        })
                    }
                }
            }
        }

        tracing::debug!(path = ?path, keys = values.len(), "偏好存储已载入");

        Ok(Self {
            path: path.to_path_buf(),
            values,
            dirty: false,
        })
    }

    /// 存储文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 是否存在尚未刷盘的修改
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// 当前所有键（已排序）
    pub fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

impl KeyValueStore for FilePrefsStore {
    fn get_string(&self, key: &str, default: &str) -> String {
        self.values
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    fn set_string(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
        self.dirty = true;
    }

    fn delete_key(&mut self, key: &str) {
        if self.values.remove(key).is_some() {
            self.dirty = true;
        }
    }

    fn has_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn save(&mut self) -> Result<()> {
        // 创建父目录
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| DataError::io(parent.to_path_buf(), e))?;
            }
        }

        // 创建锁文件（与存储文件同目录）
        let lock_path = self.path.with_extension("lock");
        let lock_file =
            File::create(&lock_path).map_err(|e| DataError::io(lock_path.clone(), e))?;

        // 获取排他锁（阻塞等待其他写操作完成）
        lock_file
            .lock_exclusive()
            .map_err(|e| DataError::lock(lock_path.clone(), e))?;

        let mut content = self
            .values
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("\n");
        if !content.is_empty() {
            content.push('\n');
        }

        fs::write(&self.path, content).map_err(|e| DataError::io(self.path.clone(), e))?;
        set_permissions(&self.path)?;

        // 锁在 lock_file drop 时自动释放
        self.dirty = false;
        tracing::debug!(path = ?self.path, keys = self.values.len(), "偏好存储已刷盘");
        Ok(())
    }
}

enum PrefsLine {
    Pair(String, String),
    Skip,
    Invalid,
}

/// 解析存储文件的一行
///
/// 注释（`#` 开头）与空行被跳过；缺少 `=` 或键为空视为损坏。
fn parse_prefs_line(line: &str) -> PrefsLine {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return PrefsLine::Skip;
    }

    match trimmed.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            PrefsLine::Pair(key.trim().to_string(), value.trim().to_string())
        }
        _ => PrefsLine::Invalid,
    }
}

/// 设置文件权限（Unix 平台 0o600）
#[cfg(unix)]
fn set_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let metadata = fs::metadata(path).map_err(|e| DataError::io(path.to_path_buf(), e))?;
    let mut perms = metadata.permissions();
    perms.set_mode(0o600);
    fs::set_permissions(path, perms).map_err(|e| DataError::io(path.to_path_buf(), e))
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

use crate::data::{DataError, FilePrefsStore};
use crate::models::AppConfig;
use crate::services::cipher::{BlobCipher, CipherError};
use crate::services::profile_data::ProfileData;
use std::env;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// 覆盖配置目录
pub const CONFIG_DIR_ENV: &str = "PROFILEDATA_CONFIG_DIR";
/// 覆盖 `AppConfig::secret`
pub const SECRET_ENV: &str = "PROFILEDATA_SECRET";
/// 覆盖 `AppConfig::prefs_path`
pub const PREFS_PATH_ENV: &str = "PROFILEDATA_PREFS_PATH";

const CONFIG_FILE_NAME: &str = "config.json";
const PREFS_FILE_NAME: &str = "prefs.env";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("无法获取用户主目录")]
    NoHomeDir,

    #[error("创建配置目录失败: {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("读取配置失败: {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("解析配置失败: {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("未配置存档密钥（config.json 的 secret 或环境变量 PROFILEDATA_SECRET）")]
    MissingSecret,

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Data(#[from] DataError),
}

/// 配置目录（`$PROFILEDATA_CONFIG_DIR` 或 `~/.profiledata`），若不存在则创建
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    let dir = match env_override(CONFIG_DIR_ENV) {
        Some(custom) => PathBuf::from(custom),
        None => dirs::home_dir()
            .ok_or(ConfigError::NoHomeDir)?
            .join(".profiledata"),
    };
    if !dir.exists() {
        fs::create_dir_all(&dir).map_err(|source| ConfigError::CreateDir {
            path: dir.clone(),
            source,
        })?;
    }
    Ok(dir)
}

/// 应用配置文件路径
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// 默认偏好存储文件路径
pub fn default_prefs_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join(PREFS_FILE_NAME))
}

/// 读取应用配置并应用环境变量覆盖
///
/// 配置文件不存在时使用默认配置。
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    let path = config_path()?;
    let mut config = if path.exists() {
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?
    } else {
        AppConfig::default()
    };

    if let Some(secret) = env_override(SECRET_ENV) {
        config.secret = Some(secret);
    }
    if let Some(prefs_path) = env_override(PREFS_PATH_ENV) {
        config.prefs_path = Some(PathBuf::from(prefs_path));
    }

    Ok(config)
}

/// 偏好存储文件路径（未配置时使用默认路径）
pub fn resolve_prefs_path(config: &AppConfig) -> Result<PathBuf, ConfigError> {
    match &config.prefs_path {
        Some(path) => Ok(path.clone()),
        None => default_prefs_path(),
    }
}

/// 按配置打开文件存储与加密器，构建 `ProfileData`
pub fn open_profile_data(config: &AppConfig) -> Result<ProfileData, ConfigError> {
    let secret = config.secret.as_deref().ok_or(ConfigError::MissingSecret)?;
    let cipher = BlobCipher::new(secret)?;
    let path = resolve_prefs_path(config)?;
    let storage = FilePrefsStore::open(&path)?;

    tracing::debug!(path = ?storage.path(), key_bits = cipher.key_bits(), "已打开偏好存储");
    Ok(ProfileData::new(Box::new(storage), cipher))
}

/// 读取非空环境变量
fn env_override(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// profiledata - 偏好存储中 Profile 存档的运维工具

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use profiledata::services::codec::deserialize_line;
use profiledata::{
    blob_key, init_logger, load_app_config, open_profile_data, BlobCipher, Color, KeyValueStore,
    LogLevel, ProfileData, StoredValue, TypedStore, Vector3,
};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Parser)]
#[command(name = "profiledata")]
#[command(about = "查看与维护加密的 Profile 存档", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 输出调试日志（等同于 --log-level debug）
    #[arg(short, long, global = true)]
    verbose: bool,

    /// 日志级别（error/warn/info/debug/trace），覆盖配置文件
    #[arg(long, global = true, value_parser = LogLevel::parse)]
    log_level: Option<LogLevel>,
}

#[derive(Subcommand)]
enum Commands {
    /// 列出已注册的 Profile
    List,

    /// 载入 Profile 并以 JSON 输出全部数据
    Show {
        /// Profile 名称
        profile: String,
    },

    /// 删除 Profile 的存档并取消注册
    Delete {
        /// Profile 名称
        profile: String,
    },

    /// 载入 Profile 并展开 `[key]` / `[key(format)]` 模板
    Render {
        /// Profile 名称
        profile: String,

        /// 模板文本
        template: String,
    },

    /// 逐个解密并解码 Profile 的 blob，报告损坏情况
    Verify {
        /// Profile 名称
        profile: String,
    },
}

#[derive(Serialize)]
struct ProfileSnapshot {
    profile: String,
    ints: BTreeMap<String, i32>,
    floats: BTreeMap<String, f32>,
    strings: BTreeMap<String, String>,
    vector3s: BTreeMap<String, Vector3>,
    colors: BTreeMap<String, Color>,
}

#[derive(Serialize)]
struct BlobReport {
    key: String,
    status: &'static str,
    entries: usize,
    bad_lines: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_app_config().context("读取应用配置失败")?;
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }
    if cli.verbose {
        config.log.level = LogLevel::Debug;
    }
    init_logger(&config.log)?;

    let data = open_profile_data(&config).context("打开 Profile 存储失败")?;

    match cli.command {
        Commands::List => {
            for name in data.get_profile_list() {
                println!("{}", name);
            }
        }
        Commands::Show { profile } => {
            ensure_registered(&data, &profile)?;
            data.load(&profile)?;
            data.print_all();
            let snapshot = ProfileSnapshot {
                profile,
                ints: collect(data.ints()),
                floats: collect(data.floats()),
                strings: collect(data.strings()),
                vector3s: collect(data.vector3s()),
                colors: collect(data.colors()),
            };
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::Delete { profile } => {
            ensure_registered(&data, &profile)?;
            data.delete_profile(&profile)?;
            println!("已删除 Profile: {}", profile);
        }
        Commands::Render { profile, template } => {
            ensure_registered(&data, &profile)?;
            data.load(&profile)?;
            println!("{}", data.parse_string(&template));
        }
        Commands::Verify { profile } => {
            ensure_registered(&data, &profile)?;
            let secret = config.secret.as_deref().unwrap_or_default();
            let cipher = BlobCipher::new(secret)?;
            let reports = data.with_storage(|storage| {
                vec![
                    verify_blob::<i32>(storage, &cipher, &profile),
                    verify_blob::<f32>(storage, &cipher, &profile),
                    verify_blob::<String>(storage, &cipher, &profile),
                    verify_blob::<Vector3>(storage, &cipher, &profile),
                    verify_blob::<Color>(storage, &cipher, &profile),
                ]
            });
            let healthy = reports
                .iter()
                .all(|r| matches!(r.status, "ok" | "missing"));
            println!("{}", serde_json::to_string_pretty(&reports)?);
            if !healthy {
                anyhow::bail!("Profile {} 存在损坏的数据", profile);
            }
        }
    }

    Ok(())
}

fn ensure_registered(data: &ProfileData, profile: &str) -> Result<()> {
    if !data.profile_exists(profile) {
        anyhow::bail!("Profile 不存在: {}", profile);
    }
    Ok(())
}

fn collect<T: StoredValue>(store: &TypedStore<T>) -> BTreeMap<String, T> {
    store.entries().into_iter().collect()
}

fn verify_blob<T: StoredValue>(
    storage: &dyn KeyValueStore,
    cipher: &BlobCipher,
    profile: &str,
) -> BlobReport {
    let key = blob_key(profile, T::BLOB_SUFFIX);
    let raw = storage.get_string(&key, "");
    if raw.is_empty() {
        return BlobReport {
            key: key.clone(),
            status: if storage.has_key(&key) { "ok" } else { "missing" },
            entries: 0,
            bad_lines: 0,
            error: None,
        };
    }

    match cipher.try_decrypt(&raw) {
        Ok(text) => {
            let (good, bad): (Vec<_>, Vec<_>) = text
                .split('\n')
                .filter(|line| !line.is_empty())
                .map(deserialize_line::<T>)
                .partition(|r| r.is_ok());
            BlobReport {
                key,
                status: if bad.is_empty() { "ok" } else { "bad_lines" },
                entries: good.len(),
                bad_lines: bad.len(),
                error: bad.into_iter().find_map(|r| r.err()).map(|e| e.to_string()),
            }
        }
        Err(e) => BlobReport {
            key,
            status: "undecryptable",
            entries: 0,
            bad_lines: 0,
            error: Some(e.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_flag() {
        let cli = Cli::try_parse_from(["profiledata", "list", "--log-level", "TRACE"]).unwrap();
        assert_eq!(cli.log_level, Some(LogLevel::Trace));
        assert!(matches!(cli.command, Commands::List));

        assert!(Cli::try_parse_from(["profiledata", "--log-level", "loud", "list"]).is_err());
    }

    #[test]
    fn test_render_arguments() {
        let cli =
            Cli::try_parse_from(["profiledata", "-v", "render", "alice", "Score: [score(D3)]"])
                .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Render { profile, template } => {
                assert_eq!(profile, "alice");
                assert_eq!(template, "Score: [score(D3)]");
            }
            _ => panic!("应解析为 render 子命令"),
        }
    }
}

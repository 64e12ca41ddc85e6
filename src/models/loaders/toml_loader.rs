use crate::models::DocumentCheck;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 检查列表文件的顶层结构
#[derive(Debug, Deserialize)]
struct ChecksFile {
    #[serde(default)]
    checks: Vec<DocumentCheck>,
}

/// 从 TOML 文本解析文档检查列表
pub fn parse_checks(content: &str) -> Result<Vec<DocumentCheck>> {
    let file: ChecksFile = toml::from_str(content).context("无法解析检查列表")?;
    Ok(file.checks)
}

/// 从单个 TOML 文件加载文档检查
pub async fn load_checks_file(toml_file_path: &Path) -> Result<Vec<DocumentCheck>> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", toml_file_path.display()))?;

    parse_checks(&content).with_context(|| format!("无法解析TOML文件: {}", toml_file_path.display()))
}

/// 加载检查列表
///
/// `path` 是文件时直接加载；是目录时加载其中所有 `.toml` 文件（按文件名排序）
pub async fn load_checks(path: &str) -> Result<Vec<DocumentCheck>> {
    let path = PathBuf::from(path);

    if !path.exists() {
        anyhow::bail!("检查列表不存在: {}", path.display());
    }

    if path.is_file() {
        return load_checks_file(&path).await;
    }

    let mut toml_files = Vec::new();
    let mut entries = fs::read_dir(&path)
        .await
        .with_context(|| format!("无法读取文件夹: {}", path.display()))?;

    while let Some(entry) = entries.next_entry().await? {
        let file = entry.path();
        if file.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml_files.push(file);
        }
    }
    toml_files.sort();

    if toml_files.is_empty() {
        tracing::warn!("在文件夹 {} 中没有找到 TOML 文件", path.display());
    }

    let mut checks = Vec::new();
    for file in toml_files {
        tracing::info!(
            "正在加载: {}",
            file.file_name().unwrap_or_default().to_string_lossy()
        );
        let loaded = load_checks_file(&file).await?;
        tracing::info!("成功加载 {} 个文档检查", loaded.len());
        checks.extend(loaded);
    }

    Ok(checks)
}

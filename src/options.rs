//! # 覆写选项
//!
//! 覆写脚本里原本由模板层注入的值（端口、DoH 地址）以及主代理名称，
//! 统一放在 [`OverrideOptions`] 里，显式传给每一个阶段。
//!
//! 查找顺序：`--options` 参数 → `~/.config/clash-override/options.toml` → 内置默认值。

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// 规则目标中的保留名，不能作为主代理名称
const RESERVED_TARGETS: &[&str] = &["DIRECT", "REJECT", "REJECT-DROP"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideOptions {
    /// 主代理组名称（顶层 select 组，也是默认走代理的规则目标）
    #[serde(default = "default_proxy_name")]
    pub proxy_name: String,

    #[serde(default = "default_mixed_port")]
    pub mixed_port: u16,

    /// nameserver / proxy-server-nameserver 的第一个 DoH 服务器
    #[serde(default = "default_doh_endpoint")]
    pub doh_endpoint: String,

    /// url-test / load-balance 组和代理集合健康检查使用的地址
    #[serde(default = "default_health_check_url")]
    pub health_check_url: String,

    /// rule-provider 更新间隔（秒）
    #[serde(default = "default_rule_interval")]
    pub rule_interval: u64,

    /// GitHub 加速前缀，拼在 geox-url 前面
    #[serde(default)]
    pub github_prefix: String,

    #[serde(default = "default_route_exclude_address")]
    pub route_exclude_address: Vec<String>,

    /// 参与 sniffer / fake-ip-filter 联动的规则集名称
    #[serde(default = "default_bypass_rule_sets")]
    pub bypass_rule_sets: Vec<String>,

    #[serde(default)]
    pub logging: LoggingOptions,
}

impl Default for OverrideOptions {
    fn default() -> Self {
        Self {
            proxy_name: default_proxy_name(),
            mixed_port: default_mixed_port(),
            doh_endpoint: default_doh_endpoint(),
            health_check_url: default_health_check_url(),
            rule_interval: default_rule_interval(),
            github_prefix: String::new(),
            route_exclude_address: default_route_exclude_address(),
            bypass_rule_sets: default_bypass_rule_sets(),
            logging: LoggingOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingOptions {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_proxy_name() -> String {
    "PROXY".to_string()
}

fn default_mixed_port() -> u16 {
    7897
}

fn default_doh_endpoint() -> String {
    "https://dns.alidns.com/dns-query".to_string()
}

fn default_health_check_url() -> String {
    "https://cp.cloudflare.com".to_string()
}

fn default_rule_interval() -> u64 {
    43200
}

fn default_route_exclude_address() -> Vec<String> {
    vec!["192.168.194.0/24".to_string()]
}

fn default_bypass_rule_sets() -> Vec<String> {
    [
        "domestic_non_ip",
        "direct_non_ip",
        "direct_yyds",
        "lan_non_ip",
        "private_domain",
        "private_yyds",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl OverrideOptions {
    /// 语义校验
    pub fn validate(&self) -> Result<()> {
        let name = self.proxy_name.as_str();
        if name.trim().is_empty() {
            bail!("proxy_name must not be empty");
        }
        if name != name.trim() {
            bail!("proxy_name must not have leading or trailing whitespace: {name:?}");
        }
        if RESERVED_TARGETS.contains(&name) {
            bail!("proxy_name must not be a built-in target: {name}");
        }
        if crate::proxy::is_reserved_group_name(name) {
            bail!("proxy_name collides with a generated proxy group: {name}");
        }
        if self.mixed_port == 0 {
            bail!("mixed_port must be > 0");
        }
        if !self.doh_endpoint.starts_with("https://") {
            bail!("doh_endpoint must use HTTPS: {}", self.doh_endpoint);
        }
        if self.rule_interval == 0 {
            bail!("rule_interval must be > 0");
        }
        Ok(())
    }
}

/// 默认选项文件路径: ~/.config/clash-override/options.toml
pub fn default_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(format!("{}/.config/clash-override/options.toml", home))
}

/// 解析 TOML 文本，缺失的字段使用默认值
pub fn parse(raw: &str) -> Result<OverrideOptions> {
    let opts: OverrideOptions = toml::from_str(raw).context("invalid options file")?;
    Ok(opts)
}

/// 加载选项
///
/// 显式给出的路径必须存在；否则尝试默认路径，再退回内置默认值。
pub fn load(explicit: Option<&Path>) -> Result<OverrideOptions> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let p = default_path();
            if !p.exists() {
                return Ok(OverrideOptions::default());
            }
            p
        }
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read options: {}", path.display()))?;
    parse(&raw).with_context(|| format!("in {}", path.display()))
}

/// 把默认选项写到 `path`
pub fn write_default(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(&OverrideOptions::default())?;
    fs::write(path, content)
        .with_context(|| format!("failed to write options: {}", path.display()))?;
    Ok(())
}

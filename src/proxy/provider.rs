//! # 代理集合 (proxy-provider)
//!
//! 统一覆写订阅集合的更新间隔、下载代理、请求头和健康检查，
//! 保留原有的 `url`、`path`、`override` 以及其他键。

use anyhow::Result;
use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::options::OverrideOptions;
use crate::profile::Profile;

const UPDATE_INTERVAL: u32 = 3600;
const USER_AGENT: &str = "mihomo/1.18.3";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
struct HealthCheck {
    enable: bool,
    lazy: bool,
    url: String,
    interval: u32,
    /// 毫秒
    timeout: u32,
    expected_status: u16,
}

#[derive(Debug, Clone, Serialize)]
struct Header {
    #[serde(rename = "User-Agent")]
    user_agent: Vec<&'static str>,
}

/// 每个代理集合都会被覆盖的字段
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
struct ProviderDefaults {
    interval: u32,
    proxy: String,
    size_limit: u64,
    header: Header,
    health_check: HealthCheck,
}

impl ProviderDefaults {
    fn new(opts: &OverrideOptions) -> Self {
        Self {
            interval: UPDATE_INTERVAL,
            proxy: opts.proxy_name.clone(),
            size_limit: 0,
            header: Header {
                user_agent: vec![USER_AGENT],
            },
            health_check: HealthCheck {
                enable: true,
                lazy: true,
                url: opts.health_check_url.clone(),
                interval: 300,
                timeout: 5000,
                expected_status: 204,
            },
        }
    }
}

/// 覆写 `proxy-providers`；不存在或不是映射时什么都不做
///
/// 返回处理过的集合数量。
pub fn normalize(profile: &mut Profile, opts: &OverrideOptions) -> Result<usize> {
    let Some(Value::Mapping(providers)) = profile.get_mut("proxy-providers") else {
        return Ok(0);
    };

    let Value::Mapping(defaults) = serde_yaml::to_value(ProviderDefaults::new(opts))? else {
        anyhow::bail!("provider defaults must serialize to a mapping");
    };

    let mut count = 0;
    for (name, provider) in providers.iter_mut() {
        if !provider.is_mapping() {
            tracing::warn!(provider = ?name, "proxy-provider is not a mapping, replaced");
            *provider = Value::Mapping(Mapping::new());
        }
        let Value::Mapping(entry) = provider else {
            continue;
        };

        for (k, v) in &defaults {
            entry.insert(k.clone(), v.clone());
        }
        let has_override = entry.get("override").map(Value::is_mapping).unwrap_or(false);
        if !has_override {
            entry.insert(Value::from("override"), Value::Mapping(Mapping::new()));
        }
        count += 1;
    }

    tracing::info!(providers = count, "proxy-providers normalized");
    Ok(count)
}

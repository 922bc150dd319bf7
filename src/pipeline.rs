//! # 覆写流水线
//!
//! 固定顺序的四个阶段：基础选项 → DNS → 规则 → 策略组。
//! 每个阶段的输出是下一阶段的输入。

use anyhow::{Context, Result};
use serde_yaml::Value;

use crate::options::OverrideOptions;
use crate::profile::Profile;
use crate::{basic, dns, proxy, rule};

/// 值是否算作 "有"：null、false、0、NaN 和空字符串都不算
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// 对一份配置执行完整覆写
///
/// `proxies` 缺失或为假值（null、false、0、空字符串）的配置原样返回。
pub fn apply(mut profile: Profile, opts: &OverrideOptions) -> Result<Profile> {
    if !profile.get("proxies").map(is_truthy).unwrap_or(false) {
        tracing::warn!("profile has no `proxies`, left unchanged");
        return Ok(profile);
    }

    basic::overwrite(&mut profile, opts).context("basic options")?;
    dns::overwrite(&mut profile, opts).context("dns options")?;
    rule::overwrite(&mut profile, opts).context("rules")?;
    proxy::overwrite(&mut profile, opts).context("proxy groups")?;

    Ok(profile)
}

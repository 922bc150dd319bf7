//! # 规则生成模块
//!
//! 此模块负责：
//! 1. 生成 rule-providers 表（远程规则集描述）
//! 2. 按固定优先级生成 rules 列表
//! 3. 把直连类规则集联动到 sniffer 跳过列表和 fake-ip 过滤列表

pub mod formatter;
pub mod provider;

use anyhow::Result;
use serde_yaml::Value;

use crate::options::OverrideOptions;
use crate::profile::Profile;

use formatter::build_rules;
use provider::RuleProviderTable;

/// 覆写 rule-providers 与 rules，并完成联动
pub fn overwrite(profile: &mut Profile, opts: &OverrideOptions) -> Result<()> {
    let mut providers = RuleProviderTable::standard();
    providers.normalize(&opts.proxy_name, opts.rule_interval);

    let rules = build_rules(&opts.proxy_name);

    profile.set("rule-providers", Value::Mapping(providers.to_mapping()?));
    profile.set(
        "rules",
        Value::Sequence(rules.iter().map(|r| Value::from(r.to_string())).collect()),
    );

    tracing::info!(
        providers = providers.len(),
        rules = rules.len(),
        "rules overwritten"
    );

    link_bypass_rule_sets(profile, &opts.bypass_rule_sets);
    Ok(())
}

/// 构造 `rule-set:<a>,<b>` 引用；只保留配置中实际存在的规则集
///
/// 一个都不存在时返回 None。
pub fn bypass_reference(profile: &Profile, names: &[String]) -> Option<String> {
    let providers = profile.get("rule-providers").and_then(Value::as_mapping)?;
    let available: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|name| providers.contains_key(*name))
        .collect();

    if available.is_empty() {
        return None;
    }
    Some(format!("rule-set:{}", available.join(",")))
}

/// 把直连类规则集引用放到 `sniffer.skip-domain` 和 `dns.fake-ip-filter` 的最前面
///
/// 重复执行不会产生重复引用。
pub fn link_bypass_rule_sets(profile: &mut Profile, names: &[String]) {
    let Some(reference) = bypass_reference(profile, names) else {
        tracing::debug!("no bypass rule-set present, skip linking");
        return;
    };

    for (section, key) in [("sniffer", "skip-domain"), ("dns", "fake-ip-filter")] {
        let list = profile.list_mut(section, key);
        list.retain(|v| v.as_str() != Some(reference.as_str()));
        list.insert(0, Value::from(reference.as_str()));
    }

    tracing::info!(reference = %reference, "bypass rule-sets linked");
}

#[cfg(test)]
mod tests {
    use super::*;
    use formatter::referenced_rule_sets;

    fn bypass() -> Vec<String> {
        OverrideOptions::default().bypass_rule_sets
    }

    fn first(profile: &Profile, section: &str, key: &str) -> Option<String> {
        profile
            .get(section)
            .and_then(|s| s.get(key))
            .and_then(Value::as_sequence)
            .and_then(|seq| seq.first())
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    fn count(profile: &Profile, section: &str, key: &str, needle: &str) -> usize {
        profile
            .get(section)
            .and_then(|s| s.get(key))
            .and_then(Value::as_sequence)
            .map(|seq| seq.iter().filter(|v| v.as_str() == Some(needle)).count())
            .unwrap_or(0)
    }

    #[test]
    fn every_referenced_rule_set_is_defined() {
        let table = RuleProviderTable::standard();
        for name in referenced_rule_sets(&build_rules("PROXY")) {
            assert!(table.contains(name), "undefined rule-set {name}");
        }
    }

    #[test]
    fn providers_are_normalized_in_profile() {
        let opts = OverrideOptions {
            proxy_name: "Main".to_string(),
            rule_interval: 600,
            ..OverrideOptions::default()
        };
        let mut profile = Profile::default();
        overwrite(&mut profile, &opts).unwrap();

        let providers = profile
            .get("rule-providers")
            .and_then(Value::as_mapping)
            .unwrap();
        assert!(!providers.is_empty());
        for (_, provider) in providers {
            assert_eq!(provider.get("proxy"), Some(&Value::from("Main")));
            assert_eq!(provider.get("interval"), Some(&Value::from(600)));
        }
    }

    #[test]
    fn reference_is_first_in_both_lists() {
        let mut profile = Profile::default();
        profile.list_mut("sniffer", "skip-domain").push(Value::from("+.qq.com"));
        overwrite(&mut profile, &OverrideOptions::default()).unwrap();

        let expected = "rule-set:direct_yyds,private_yyds".to_string();
        assert_eq!(first(&profile, "sniffer", "skip-domain"), Some(expected.clone()));
        assert_eq!(first(&profile, "dns", "fake-ip-filter"), Some(expected));
        assert_eq!(count(&profile, "sniffer", "skip-domain", "+.qq.com"), 1);
    }

    #[test]
    fn linking_twice_does_not_duplicate() {
        let mut profile = Profile::default();
        overwrite(&mut profile, &OverrideOptions::default()).unwrap();
        link_bypass_rule_sets(&mut profile, &bypass());

        let reference = "rule-set:direct_yyds,private_yyds";
        assert_eq!(count(&profile, "sniffer", "skip-domain", reference), 1);
        assert_eq!(count(&profile, "dns", "fake-ip-filter", reference), 1);
    }

    #[test]
    fn nothing_is_linked_without_matching_providers() {
        let mut profile = Profile::default();
        overwrite(&mut profile, &OverrideOptions::default()).unwrap();
        profile.set("sniffer", Value::Null);
        profile.set("dns", Value::Null);

        link_bypass_rule_sets(&mut profile, &["domestic_non_ip".to_string()]);
        assert!(!profile.has("sniffer"));
        assert!(!profile.has("dns"));
    }

    #[test]
    fn reference_keeps_configured_order() {
        let mut profile = Profile::default();
        overwrite(&mut profile, &OverrideOptions::default()).unwrap();
        let names = vec!["private_yyds".to_string(), "direct_yyds".to_string()];
        assert_eq!(
            bypass_reference(&profile, &names).as_deref(),
            Some("rule-set:private_yyds,direct_yyds")
        );
    }
}

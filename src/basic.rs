//! # 基础选项覆写
//!
//! 端口、模式、sniffer、hosts、GEO 数据源与 tun 设置。
//! 全部是固定值，按顶层键逐个覆盖到配置上。

use anyhow::Result;
use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::options::OverrideOptions;
use crate::profile::Profile;

// ========================================
// 固定表
// ========================================

const SNIFFER_SKIP_DOMAIN: &[&str] = &[
    "Mijia Cloud",
    "+.push.apple.com",
    "+.wechat.com",
    "+.qpic.cn",
    "+.qq.com",
    "+.wechatapp.com",
    "+.vivox.com",
    "*.nju.edu.cn",
    "+.oray.com",
    "+.sunlogin.net",
];

/// 国内 DNS 服务器地址，不做嗅探
const SNIFFER_SKIP_DST_ADDRESS: &[&str] = &[
    "223.5.5.5/32",
    "223.6.6.6/32",
    "1.12.12.12/32",
    "120.53.53.53/32",
];

const HOSTS: &[(&str, &[&str])] = &[
    (
        "dns.alidns.com",
        &["223.5.5.5", "223.6.6.6", "2400:3200:baba::1", "2400:3200::1"],
    ),
    ("doh.pub", &["120.53.53.53", "1.12.12.12"]),
    ("cdn.jsdelivr.net", &["cdn.jsdelivr.net.cdn.cloudflare.net"]),
];

const GEOX_BASE: &str = "https://cdn.jsdelivr.net/gh/MetaCubeX/meta-rules-dat@release";

// ========================================
// 结构定义
// ========================================

/// sniff 端口：单个端口或 "8080-8880" 形式的范围
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum PortSpec {
    Single(u16),
    Range(&'static str),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
struct SniffProtocol {
    ports: Vec<PortSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    override_destination: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
struct Sniff {
    #[serde(rename = "HTTP")]
    http: SniffProtocol,
    #[serde(rename = "TLS")]
    tls: SniffProtocol,
    #[serde(rename = "QUIC")]
    quic: SniffProtocol,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
struct Sniffer {
    enable: bool,
    sniff: Sniff,
    skip_domain: Vec<&'static str>,
    skip_dst_address: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
struct ProfileStore {
    store_selected: bool,
    store_fake_ip: bool,
}

/// 顶层标量字段
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
struct BasicOptions {
    mixed_port: u16,
    allow_lan: bool,
    mode: &'static str,
    log_level: &'static str,
    ipv6: bool,
    find_process_mode: &'static str,
    profile: ProfileStore,
    unified_delay: bool,
    tcp_concurrent: bool,
    global_client_fingerprint: &'static str,
    sniffer: Sniffer,
}

#[derive(Debug, Clone, Serialize)]
struct GeoxUrl {
    geoip: String,
    geosite: String,
    asn: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
struct GeodataOptions {
    geodata_mode: bool,
    geo_auto_update: bool,
    geo_update_interval: u32,
    geox_url: GeoxUrl,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
struct Tun {
    enable: bool,
    stack: &'static str,
    device: &'static str,
    dns_hijack: Vec<&'static str>,
    auto_route: bool,
    auto_detect_interface: bool,
    strict_route: bool,
    route_exclude_address: Vec<String>,
}

// ========================================
// 构建
// ========================================

fn basic_options(opts: &OverrideOptions) -> BasicOptions {
    let web_ports = || vec![PortSpec::Single(443), PortSpec::Single(8443)];

    BasicOptions {
        mixed_port: opts.mixed_port,
        allow_lan: true,
        mode: "rule",
        log_level: "warning",
        ipv6: false,
        find_process_mode: "strict",
        profile: ProfileStore {
            store_selected: true,
            store_fake_ip: true,
        },
        unified_delay: true,
        tcp_concurrent: true,
        global_client_fingerprint: "chrome",
        sniffer: Sniffer {
            enable: true,
            sniff: Sniff {
                http: SniffProtocol {
                    ports: vec![PortSpec::Single(80), PortSpec::Range("8080-8880")],
                    override_destination: Some(true),
                },
                tls: SniffProtocol {
                    ports: web_ports(),
                    override_destination: None,
                },
                quic: SniffProtocol {
                    ports: web_ports(),
                    override_destination: None,
                },
            },
            skip_domain: SNIFFER_SKIP_DOMAIN.to_vec(),
            skip_dst_address: SNIFFER_SKIP_DST_ADDRESS.to_vec(),
        },
    }
}

fn hosts() -> Mapping {
    HOSTS
        .iter()
        .map(|(host, addrs)| (Value::from(*host), Value::from(addrs.to_vec())))
        .collect()
}

fn geodata_options(opts: &OverrideOptions) -> GeodataOptions {
    let url = |file: &str| format!("{}{}/{}", opts.github_prefix, GEOX_BASE, file);
    GeodataOptions {
        geodata_mode: true,
        geo_auto_update: true,
        geo_update_interval: 24,
        geox_url: GeoxUrl {
            geoip: url("geoip.dat"),
            geosite: url("geosite.dat"),
            asn: url("GeoLite2-ASN.mmdb"),
        },
    }
}

fn tun(opts: &OverrideOptions) -> Tun {
    Tun {
        enable: true,
        stack: "system",
        device: "Mihomo",
        dns_hijack: vec!["any:53", "tcp://any:53"],
        auto_route: true,
        auto_detect_interface: true,
        strict_route: true,
        route_exclude_address: opts.route_exclude_address.clone(),
    }
}

/// 覆写基础选项
pub fn overwrite(profile: &mut Profile, opts: &OverrideOptions) -> Result<()> {
    profile.overlay(&basic_options(opts))?;
    profile.set("hosts", Value::Mapping(hosts()));
    profile.overlay(&geodata_options(opts))?;
    profile.set_serialized("tun", &tun(opts))?;

    tracing::debug!(mixed_port = opts.mixed_port, "basic options applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(opts: &OverrideOptions) -> Profile {
        let mut profile = Profile::default();
        overwrite(&mut profile, opts).unwrap();
        profile
    }

    #[test]
    fn scalars_and_sections_are_written() {
        let profile = run(&OverrideOptions::default());
        assert_eq!(profile.get("mixed-port"), Some(&Value::from(7897)));
        assert_eq!(profile.get("mode"), Some(&Value::from("rule")));
        assert_eq!(
            profile.get("profile").and_then(|p| p.get("store-fake-ip")),
            Some(&Value::from(true))
        );
        for key in ["sniffer", "hosts", "geox-url", "tun"] {
            assert!(profile.has(key), "missing {key}");
        }
    }

    #[test]
    fn sniffer_ports_mix_numbers_and_ranges() {
        let profile = run(&OverrideOptions::default());
        let http = profile
            .get("sniffer")
            .and_then(|s| s.get("sniff"))
            .and_then(|s| s.get("HTTP"))
            .unwrap();
        assert_eq!(
            http.get("ports"),
            Some(&Value::from(vec![Value::from(80), Value::from("8080-8880")]))
        );
        assert_eq!(http.get("override-destination"), Some(&Value::from(true)));

        let tls = profile
            .get("sniffer")
            .and_then(|s| s.get("sniff"))
            .and_then(|s| s.get("TLS"))
            .unwrap();
        assert!(tls.get("override-destination").is_none());
    }

    #[test]
    fn geox_urls_use_prefix() {
        let opts = OverrideOptions {
            github_prefix: "https://mirror.example/".to_string(),
            ..OverrideOptions::default()
        };
        let profile = run(&opts);
        let geoip = profile
            .get("geox-url")
            .and_then(|g| g.get("geoip"))
            .and_then(Value::as_str)
            .unwrap();
        assert_eq!(
            geoip,
            "https://mirror.example/https://cdn.jsdelivr.net/gh/MetaCubeX/meta-rules-dat@release/geoip.dat"
        );
    }

    #[test]
    fn tun_takes_route_exclusions_from_options() {
        let opts = OverrideOptions {
            route_exclude_address: vec!["10.0.0.0/8".to_string()],
            ..OverrideOptions::default()
        };
        let profile = run(&opts);
        let excluded = profile
            .get("tun")
            .and_then(|t| t.get("route-exclude-address"))
            .unwrap();
        assert_eq!(excluded, &Value::from(vec!["10.0.0.0/8"]));
    }
}

//! # 规则集 (rule-provider)
//!
//! 远程规则集描述表。按类别维护若干子表，合并成一个按名称唯一的表，
//! 再统一覆写 `proxy` 与 `interval`。

use serde::Serialize;
use serde_yaml::{Mapping, Value};

// ========================================
// 描述结构
// ========================================

/// 规则集匹配行为
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Behavior {
    Domain,
    Ipcidr,
    Classical,
}

/// 规则集文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleFormat {
    Mrs,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Http,
}

/// 规则集描述符
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleProvider {
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    pub behavior: Behavior,
    pub url: String,
    pub format: RuleFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub proxy: String,
    pub interval: u64,
}

/// 规则集来源
#[derive(Debug, Clone, Copy)]
pub enum Source {
    /// 666OS/rules 的 mihomo 二进制规则集: `mihomo/<domain|ip>/<file>.mrs`
    Yyds(&'static str),
    /// ruleset.skk.moe 的文本规则集: `Clash/<set>.txt`
    Sukka(&'static str),
}

const YYDS_BASE: &str = "https://github.com/666OS/rules/raw/refs/heads/release/mihomo";
const SUKKA_BASE: &str = "https://ruleset.skk.moe/Clash";

impl Source {
    fn url(self) -> String {
        match self {
            Source::Yyds(file) => format!("{}/{}.mrs", YYDS_BASE, file),
            Source::Sukka(set) => format!("{}/{}.txt", SUKKA_BASE, set),
        }
    }

    fn format(self) -> RuleFormat {
        match self {
            Source::Yyds(_) => RuleFormat::Mrs,
            Source::Sukka(_) => RuleFormat::Text,
        }
    }
}

/// 静态表中的一项
#[derive(Debug, Clone, Copy)]
pub struct ProviderSpec {
    pub name: &'static str,
    pub behavior: Behavior,
    pub source: Source,
    pub path: Option<&'static str>,
}

impl ProviderSpec {
    /// 生成描述符；proxy/interval 留空，由 [`RuleProviderTable::normalize`] 统一填写
    fn build(&self) -> RuleProvider {
        RuleProvider {
            kind: ProviderKind::Http,
            behavior: self.behavior,
            url: self.source.url(),
            format: self.source.format(),
            path: self.path.map(str::to_string),
            proxy: String::new(),
            interval: 0,
        }
    }
}

const fn yyds(
    name: &'static str,
    behavior: Behavior,
    file: &'static str,
    path: &'static str,
) -> ProviderSpec {
    ProviderSpec {
        name,
        behavior,
        source: Source::Yyds(file),
        path: Some(path),
    }
}

const fn sukka(
    name: &'static str,
    behavior: Behavior,
    set: &'static str,
    path: Option<&'static str>,
) -> ProviderSpec {
    ProviderSpec {
        name,
        behavior,
        source: Source::Sukka(set),
        path,
    }
}

use Behavior::{Classical, Domain, Ipcidr};

// ========================================
// 分类子表
// ========================================

const REJECT: &[ProviderSpec] = &[
    yyds("tracking_yyds", Domain, "domain/Tracking", "./yyds/tracking.mrs"),
    yyds("advertising_yyds", Domain, "domain/Advertising", "./yyds/advertising.mrs"),
    yyds("advertising_yyds_ip", Ipcidr, "ip/Advertising", "./yyds/advertising_ip.mrs"),
];

const SPEEDTEST: &[ProviderSpec] = &[yyds(
    "speedtest_yyds",
    Domain,
    "domain/Speedtest",
    "./yyds/speedtest.txt",
)];

const CDN: &[ProviderSpec] = &[
    sukka("cdn_domainset", Domain, "domainset/cdn", None),
    sukka("cdn_non_ip", Domain, "non_ip/cdn", None),
];

const STREAMING: &[ProviderSpec] = &[
    yyds("youtube_yyds", Domain, "domain/YouTube", "./yyds/youtube.mrs"),
    yyds("spotify_yyds", Domain, "domain/Spotify", "./yyds/spotify.mrs"),
    yyds("netflix_yyds", Domain, "domain/Netflix", "./yyds/netflix.mrs"),
    yyds("netflix_yyds_ip", Ipcidr, "ip/Netflix", "./yyds/netflix_ip.mrs"),
    yyds("disney_yyds", Domain, "domain/Disney", "./yyds/disney.mrs"),
    yyds("streaming_yyds", Domain, "domain/Streaming", "./yyds/streaming.mrs"),
    yyds("streaming_yyds_ip", Ipcidr, "ip/Streaming", "./yyds/streaming_ip.mrs"),
];

const AI: &[ProviderSpec] = &[
    yyds("ai_yyds", Domain, "domain/AI", "./yyds/ai.mrs"),
    yyds("ai_ip_yyds", Ipcidr, "ip/AI", "./yyds/ai_ip.mrs"),
];

const TELEGRAM: &[ProviderSpec] = &[
    yyds("telegram_yyds", Domain, "domain/Telegram", "./yyds/telegram.mrs"),
    yyds("telegram_yyds_ip", Ipcidr, "ip/Telegram", "./yyds/telegram_ip.mrs"),
];

const APPLE: &[ProviderSpec] = &[
    yyds("apple_cn_yyds", Domain, "domain/AppleCN", "./yyds/apple_cn.mrs"),
    yyds("apple_yyds", Domain, "domain/Apple", "./yyds/apple.mrs"),
    sukka(
        "apple_cdn",
        Domain,
        "domainset/apple_cdn",
        Some("./sukkaw_ruleset/apple_cdn.txt"),
    ),
];

const MICROSOFT: &[ProviderSpec] = &[
    sukka(
        "microsoft_cdn_non_ip",
        Classical,
        "non_ip/microsoft_cdn",
        Some("./sukkaw_ruleset/microsoft_cdn_non_ip.txt"),
    ),
    yyds("onedrive_yyds", Domain, "domain/OneDrive", "./yyds/onedrive.mrs"),
    yyds("microsoft_yyds", Domain, "domain/Microsoft", "./yyds/microsoft.mrs"),
];

const DOWNLOAD: &[ProviderSpec] = &[yyds(
    "download_yyds",
    Domain,
    "domain/Download",
    "./yyds/download_domainset.mrs",
)];

const PRIVATE: &[ProviderSpec] = &[
    yyds("private_yyds", Domain, "domain/Private", "./yyds/private.mrs"),
    sukka("lan_ip", Classical, "ip/lan", Some("./sukkaw_ruleset/lan_ip.txt")),
    yyds("private_yyds_ip", Ipcidr, "ip/Private", "./yyds/private_ip.mrs"),
];

const CHINA: &[ProviderSpec] = &[
    yyds("china_yyds", Domain, "domain/China", "./yyds/china.mrs"),
    yyds("china_yyds_ip", Ipcidr, "ip/China", "./yyds/china_ip.mrs"),
];

const SOCIAL: &[ProviderSpec] = &[
    yyds("twitter_yyds", Domain, "domain/Twitter", "./yyds/twitter.mrs"),
    yyds("instagram_yyds", Domain, "domain/Instagram", "./yyds/instagram.mrs"),
    yyds("tiktok_yyds", Domain, "domain/TikTok", "./yyds/tiktok.mrs"),
    yyds("github_yyds", Domain, "domain/GitHub", "./yyds/github.mrs"),
    yyds("facebook_yyds", Domain, "domain/Facebook", "./yyds/facebook.mrs"),
    yyds("google_yyds", Domain, "domain/Google", "./yyds/google.mrs"),
    yyds("paypal_yyds", Domain, "domain/PayPal", "./yyds/paypal.mrs"),
    yyds("cloudflare_yyds", Domain, "domain/Cloudflare", "./yyds/cloudflare.mrs"),
    yyds("facebook_yyds_ip", Ipcidr, "ip/Facebook", "./yyds/facebook_ip.mrs"),
    yyds("google_yyds_ip", Ipcidr, "ip/Google", "./yyds/google_ip.mrs"),
    yyds("socialmedia_yyds_ip", Ipcidr, "ip/SocialMedia", "./yyds/socialmedia_ip.mrs"),
];

const DIRECT: &[ProviderSpec] = &[yyds("direct_yyds", Domain, "domain/Direct", "./yyds/Direct.mrs")];

const PROXY: &[ProviderSpec] = &[
    yyds("proxy_yyds", Domain, "domain/Proxy", "./yyds/proxy.mrs"),
    yyds("proxy_yyds_ip", Ipcidr, "ip/Proxy", "./yyds/proxy_ip.mrs"),
];

/// 子表的合并顺序
pub const PROVIDER_TABLES: &[&[ProviderSpec]] = &[
    REJECT, SPEEDTEST, CDN, STREAMING, AI, TELEGRAM, APPLE, MICROSOFT, DOWNLOAD, PRIVATE, CHINA,
    SOCIAL, DIRECT, PROXY,
];

// ========================================
// 规则集表
// ========================================

/// 按名称唯一的规则集表，保持插入顺序
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleProviderTable {
    entries: Vec<(String, RuleProvider)>,
}

impl RuleProviderTable {
    /// 合并若干子表；同名条目以后出现的为准
    pub fn from_tables(tables: &[&[ProviderSpec]]) -> Self {
        let mut table = Self::default();
        for entry in tables.iter().flat_map(|t| t.iter()) {
            table.insert(entry.name, entry.build());
        }
        table
    }

    /// 内置的全部规则集
    pub fn standard() -> Self {
        Self::from_tables(PROVIDER_TABLES)
    }

    pub fn insert(&mut self, name: &str, provider: RuleProvider) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = provider,
            None => self.entries.push((name.to_string(), provider)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 统一覆写所有条目的 proxy 与 interval
    pub fn normalize(&mut self, proxy: &str, interval: u64) {
        for (_, provider) in &mut self.entries {
            provider.proxy = proxy.to_string();
            provider.interval = interval;
        }
    }

    pub fn to_mapping(&self) -> anyhow::Result<Mapping> {
        let mut map = Mapping::new();
        for (name, provider) in &self.entries {
            map.insert(Value::from(name.as_str()), serde_yaml::to_value(provider)?);
        }
        Ok(map)
    }
}

#[cfg(test)]
impl RuleProviderTable {
    pub fn get(&self, name: &str) -> Option<&RuleProvider> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RuleProvider)> {
        self.entries.iter().map(|(n, p)| (n.as_str(), p))
    }
}

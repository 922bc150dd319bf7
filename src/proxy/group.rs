//! # 策略组结构
//!
//! `proxy-groups` 中的单个条目。字段按 mihomo 的 kebab-case 键序列化，
//! 未设置的可选字段不输出。

use serde::Serialize;

use super::region::RegionMatcher;

/// 测速 / 负载均衡组的检查间隔（秒）
pub const CHECK_INTERVAL: u32 = 300;
const TOLERANCE: u32 = 50;
const MAX_FAILED_TIMES: u32 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupKind {
    #[default]
    Select,
    UrlTest,
    LoadBalance,
}

/// 负载均衡策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    ConsistentHashing,
    RoundRobin,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProxyGroup {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: GroupKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_failed_times: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lazy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_udp: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_all: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub proxies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

impl ProxyGroup {
    pub fn select(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: GroupKind::Select,
            ..Self::default()
        }
    }

    pub fn url_test(name: impl Into<String>, url: &str) -> Self {
        Self {
            name: name.into(),
            kind: GroupKind::UrlTest,
            url: Some(url.to_string()),
            interval: Some(CHECK_INTERVAL),
            tolerance: Some(TOLERANCE),
            ..Self::default()
        }
    }

    pub fn load_balance(name: impl Into<String>, url: &str, strategy: Strategy) -> Self {
        Self {
            name: name.into(),
            kind: GroupKind::LoadBalance,
            url: Some(url.to_string()),
            interval: Some(CHECK_INTERVAL),
            max_failed_times: Some(MAX_FAILED_TIMES),
            strategy: Some(strategy),
            lazy: Some(true),
            ..Self::default()
        }
    }

    pub fn url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn proxies<I, S>(mut self, proxies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.proxies = proxies.into_iter().map(Into::into).collect();
        self
    }

    pub fn include_all(mut self) -> Self {
        self.include_all = Some(true);
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = Some(hidden);
        self
    }
}

// ========================================
// 地区派生组
// ========================================

/// 每个地区匹配器派生出的四类组
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedKind {
    Auto,
    Select,
    LbHash,
    LbPolling,
}

/// Select 组在界面上的地区顺序，其余三类沿用分类器顺序
const SELECT_ORDER: [&str; 12] = [
    "HK", "JP", "KR", "SG", "US", "UK", "FR", "DE", "TW", "MQ", "ProxyChain", "Others",
];

impl DerivedKind {
    /// 输出顺序
    pub const ALL: [DerivedKind; 4] = [
        DerivedKind::Auto,
        DerivedKind::Select,
        DerivedKind::LbHash,
        DerivedKind::LbPolling,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            DerivedKind::Auto => "Auto",
            DerivedKind::Select => "Select",
            DerivedKind::LbHash => "LB Hash",
            DerivedKind::LbPolling => "LB Polling",
        }
    }

    pub fn group_name(self, region: &str) -> String {
        format!("{} - {}", region, self.suffix())
    }

    /// 按本类别的排列顺序给出匹配器
    pub fn arrange<'a>(self, matchers: &'a [RegionMatcher]) -> Vec<&'a RegionMatcher> {
        match self {
            DerivedKind::Select => SELECT_ORDER
                .iter()
                .filter_map(|name| matchers.iter().find(|m| m.name() == *name))
                .collect(),
            _ => matchers.iter().collect(),
        }
    }

    /// 构造派生组
    ///
    /// 成员由客户端按 `filter` 从全部节点和代理集合中挑选；
    /// 没有匹配节点时客户端会回退到 COMPATIBLE，配置仍可加载。
    pub fn build(self, matcher: &RegionMatcher, url: &str) -> ProxyGroup {
        let name = self.group_name(matcher.name());
        let group = match self {
            DerivedKind::Auto => {
                let mut g = ProxyGroup::url_test(name, url).hidden(true);
                g.disable_udp = Some(false);
                g
            }
            DerivedKind::Select => {
                let mut g = ProxyGroup::select(name)
                    .url(url)
                    .icon(matcher.icon())
                    .hidden(false);
                g.disable_udp = Some(false);
                g
            }
            DerivedKind::LbHash => {
                ProxyGroup::load_balance(name, url, Strategy::ConsistentHashing).hidden(true)
            }
            DerivedKind::LbPolling => {
                ProxyGroup::load_balance(name, url, Strategy::RoundRobin).hidden(true)
            }
        };

        ProxyGroup {
            filter: Some(matcher.filter().to_string()),
            ..group.include_all()
        }
    }
}

//! # 地区分类
//!
//! 按节点名称中的关键词把节点划分到地区。每个地区匹配器同时产出两样东西：
//!
//! - 交给客户端的 `filter` 正则（带 look-ahead，由 mihomo 解释）
//! - 本地求值用的 include / exclude 两个正则（regex crate 不支持 look-around，
//!   所以 "包含任一别名且不含排除词" 拆成两次匹配）
//!
//! 匹配区分大小写。

use anyhow::{Context, Result};
use regex::Regex;

pub const ICON_BASE: &str =
    "https://fastly.jsdelivr.net/gh/clash-verge-rev/clash-verge-rev.github.io@main/docs/assets/icons";

/// 名称中出现这些词的条目一般是订阅信息而不是节点
pub const EXCLUDE_TERMS: &[&str] = &[
    "剩余", "到期", "主页", "官网", "游戏", "关注", "网站", "地址", "有效", "网址", "禁止", "邮箱",
    "发布", "客服", "订阅", "节点", "问题", "联系",
];

/// 兜底分类名
pub const OTHERS: &str = "Others";

/// 地区定义
#[derive(Debug, Clone, Copy)]
pub struct Region {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    /// Select 组图标，相对 [`ICON_BASE`]
    pub icon: &'static str,
}

pub const REGIONS: &[Region] = &[
    Region {
        name: "HK",
        aliases: &["香港", "HK", "Hong", "🇭🇰"],
        icon: "flags/hk.svg",
    },
    Region {
        name: "TW",
        aliases: &["台湾", "TW", "Taiwan", "Wan", "🇹🇼", "🇨🇳"],
        icon: "flags/tw.svg",
    },
    Region {
        name: "SG",
        aliases: &["新加坡", "狮城", "SG", "Singapore", "🇸🇬"],
        icon: "flags/sg.svg",
    },
    Region {
        name: "JP",
        aliases: &["日本", "JP", "Japan", "🇯🇵"],
        icon: "flags/jp.svg",
    },
    Region {
        name: "KR",
        aliases: &["韩国", "韓", "KR", "Korea", "🇰🇷"],
        icon: "flags/kr.svg",
    },
    Region {
        name: "US",
        aliases: &["美国", "US", "United States", "America", "🇺🇸"],
        icon: "flags/us.svg",
    },
    Region {
        name: "UK",
        aliases: &["英国", "UK", "United Kingdom", "🇬🇧"],
        icon: "flags/gb.svg",
    },
    Region {
        name: "FR",
        aliases: &["法国", "FR", "France", "🇫🇷"],
        icon: "flags/fr.svg",
    },
    Region {
        name: "DE",
        aliases: &["德国", "DE", "Germany", "🇩🇪"],
        icon: "flags/de.svg",
    },
    Region {
        name: "MQ",
        aliases: &["mq"],
        icon: "speed.svg",
    },
    Region {
        name: "ProxyChain",
        aliases: &["ProxyChain"],
        icon: "guard.svg",
    },
];

const OTHERS_ICON: &str = "ambulance.svg";

/// `(a|b|c)`，供客户端 filter 使用
fn alias_group(aliases: &[&str]) -> String {
    format!("({})", aliases.join("|"))
}

/// 转义后的 `a|b|c`，供本地 regex 使用
fn escaped_alternation<'a>(terms: impl IntoIterator<Item = &'a str>) -> String {
    terms
        .into_iter()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|")
}

// ========================================
// 匹配器
// ========================================

/// 单个地区（或兜底分类）的匹配器
#[derive(Debug, Clone)]
pub struct RegionMatcher {
    name: String,
    icon: String,
    filter: String,
    include: Option<Regex>,
    exclude: Regex,
}

impl RegionMatcher {
    /// 包含任一别名，且不含任何排除词
    pub fn region(region: &Region) -> Result<Self> {
        let exclusions = EXCLUDE_TERMS.join("|");
        let filter = format!(
            "^(?=.*{})(?!.*(?:{})).*$",
            alias_group(region.aliases),
            exclusions
        );

        let include = Regex::new(&escaped_alternation(region.aliases.iter().copied()))
            .with_context(|| format!("invalid aliases for region {}", region.name))?;
        let exclude = Regex::new(&escaped_alternation(EXCLUDE_TERMS.iter().copied()))
            .context("invalid exclusion terms")?;

        Ok(Self {
            name: region.name.to_string(),
            icon: format!("{}/{}", ICON_BASE, region.icon),
            filter,
            include: Some(include),
            exclude,
        })
    }

    /// 不含任何地区别名，也不含排除词
    pub fn others(regions: &[Region]) -> Result<Self> {
        let all_aliases = regions
            .iter()
            .map(|r| alias_group(r.aliases))
            .collect::<Vec<_>>()
            .join("|");
        let filter = format!(
            "^(?!.*(?:{}|{})).*$",
            all_aliases,
            EXCLUDE_TERMS.join("|")
        );

        let terms = regions
            .iter()
            .flat_map(|r| r.aliases.iter().copied())
            .chain(EXCLUDE_TERMS.iter().copied());
        let exclude =
            Regex::new(&escaped_alternation(terms)).context("invalid catch-all pattern")?;

        Ok(Self {
            name: OTHERS.to_string(),
            icon: format!("{}/{}", ICON_BASE, OTHERS_ICON),
            filter,
            include: None,
            exclude,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn icon(&self) -> &str {
        &self.icon
    }

    /// 客户端使用的 filter 正则
    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn matches(&self, proxy: &str) -> bool {
        let included = self
            .include
            .as_ref()
            .map(|re| re.is_match(proxy))
            .unwrap_or(true);
        included && !self.exclude.is_match(proxy)
    }

    /// 从节点列表中挑出匹配的节点，保持原顺序
    pub fn select(&self, proxies: &[String]) -> Vec<String> {
        proxies
            .iter()
            .filter(|p| self.matches(p))
            .cloned()
            .collect()
    }
}

// ========================================
// 分类器
// ========================================

/// 全部地区匹配器，最后一个是兜底分类
#[derive(Debug, Clone)]
pub struct RegionClassifier {
    matchers: Vec<RegionMatcher>,
}

impl RegionClassifier {
    pub fn new(regions: &[Region]) -> Result<Self> {
        let mut matchers = regions
            .iter()
            .map(RegionMatcher::region)
            .collect::<Result<Vec<_>>>()?;
        matchers.push(RegionMatcher::others(regions)?);
        Ok(Self { matchers })
    }

    /// 内置的 11 个地区加兜底分类
    pub fn standard() -> Result<Self> {
        Self::new(REGIONS)
    }

    pub fn matchers(&self) -> &[RegionMatcher] {
        &self.matchers
    }

    /// 节点所属的全部分类名称；可能为空（名称含排除词时）
    pub fn classify(&self, proxy: &str) -> Vec<&str> {
        self.matchers
            .iter()
            .filter(|m| m.matches(proxy))
            .map(RegionMatcher::name)
            .collect()
    }
}

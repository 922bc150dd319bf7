//! # 规则行
//!
//! 定义规则行的数据结构，以及按固定优先级拼接出完整规则列表。

use std::fmt;

// ========================================
// 规则结构
// ========================================

/// 规则目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// 直连
    Direct,
    /// 主代理组（名称由选项决定）
    Primary,
    /// 具名策略组
    Group(&'static str),
}

impl Target {
    pub fn resolve(self, primary: &str) -> String {
        match self {
            Target::Direct => "DIRECT".to_string(),
            Target::Primary => primary.to_string(),
            Target::Group(name) => name.to_string(),
        }
    }
}

/// 规则匹配部分
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// 原样输出的规则体，如 `DOMAIN-SUFFIX,edu.cn`
    Literal(String),
    /// `RULE-SET,<provider>`
    RuleSet(String),
    /// 兜底 `MATCH`
    Match,
}

/// 单条规则
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub matcher: Matcher,
    pub target: String,
}

#[cfg(test)]
impl Rule {
    pub fn is_catch_all(&self) -> bool {
        self.matcher == Matcher::Match
    }

    /// 目标为广告拦截组或内置拒绝策略
    pub fn is_reject(&self) -> bool {
        matches!(
            self.target.as_str(),
            "Advertising" | "REJECT" | "REJECT-DROP"
        )
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.matcher {
            Matcher::Literal(body) => write!(f, "{},{}", body, self.target),
            Matcher::RuleSet(provider) => write!(f, "RULE-SET,{},{}", provider, self.target),
            Matcher::Match => write!(f, "MATCH,{}", self.target),
        }
    }
}

// ========================================
// 自定义规则
// ========================================

/// 一组共享同一目标的自定义规则
#[derive(Debug, Clone, Copy)]
pub struct CustomRules {
    pub target: Target,
    pub lines: &'static [&'static str],
}

pub const CUSTOM_RULES: &[CustomRules] = &[
    // Reject
    CustomRules {
        target: Target::Group("Advertising"),
        lines: &["AND,((PROCESS-NAME,rustdesk),(DST-PORT,21114))"],
    },
    // School
    CustomRules {
        target: Target::Direct,
        lines: &["DOMAIN-SUFFIX,*.edu.cn"],
    },
    // Direct
    CustomRules {
        target: Target::Direct,
        lines: &[
            "IP-CIDR,23.106.156.223/8",
            "DOMAIN-KEYWORD,natpierce",
            "DOMAIN-KEYWORD,kaspersky",
            "DOMAIN-KEYWORD,hf-mirror",
            "DOMAIN,public.boxcloud.com",
            "DOMAIN-SUFFIX,aowu.tv",
            "DOMAIN,anime.girigirilove.com",
        ],
    },
    // Safe
    CustomRules {
        target: Target::Group("SafeProxy"),
        lines: &[
            "DOMAIN,imap-mail.outlook.com",
            "DOMAIN-KEYWORD,wandb",
            "DOMAIN,hostloc.com",
            "DOMAIN,challenges.cloudflare.com",
        ],
    },
    // AIGC
    CustomRules {
        target: Target::Group("AIGC"),
        lines: &[],
    },
    // Proxy
    CustomRules {
        target: Target::Primary,
        lines: &[
            "DOMAIN,app.follow.is",
            "DOMAIN,openpanel.follow.is",
            "DOMAIN-KEYWORD,potpieai",
        ],
    },
    // ProxyDownload
    CustomRules {
        target: Target::Group("ProxyDownload"),
        lines: &[
            "DOMAIN,ghcr.io",
            "DOMAIN,pkg-containers.githubusercontent.com",
            "DOMAIN,cas-bridge-direct.xethub.hf.co",
            "DOMAIN,cas-bridge.xethub.hf.co",
            "DOMAIN,transfer.xethub.hf.co",
            "DOMAIN,cdn-lfs.hf.co",
            "DOMAIN,cn.archive.ubuntu.com",
        ],
    },
    // Scholar
    CustomRules {
        target: Target::Direct,
        lines: &[
            "DOMAIN-SUFFIX,tuchong.com",
            "DOMAIN-SUFFIX,taylorandfrancis.com",
            "DOMAIN-SUFFIX,dl.acm.org",
            "DOMAIN-SUFFIX,acm-prod.disqus.com",
            "DOMAIN-SUFFIX,sciencedirectassets.com",
            "DOMAIN-SUFFIX,readspeaker.com",
            "DOMAIN-SUFFIX,webofknowledge.com",
            "DOMAIN-KEYWORD,pubmed",
            "DOMAIN-KEYWORD,springer",
            "DOMAIN-KEYWORD,ieee",
            "DOMAIN-KEYWORD,elsevier",
            "DOMAIN-KEYWORD,clarivate",
            "DOMAIN-KEYWORD,sciencedirect",
            "DOMAIN-KEYWORD,nature",
            "DOMAIN-KEYWORD,tandfonline",
            "DOMAIN-SUFFIX,elsevier.com",
            "DOMAIN-SUFFIX,edu.cn",
            "DOMAIN-SUFFIX,webofscience.com",
            "DOMAIN-SUFFIX,tandfonline.com",
            "DOMAIN-SUFFIX,link.springer.com",
            "DOMAIN-SUFFIX,onlinelibrary.wiley.com",
            "DOMAIN-SUFFIX,sciencedirect.com",
            "DOMAIN-SUFFIX,taylorfrancis.com",
        ],
    },
];

// ========================================
// 规则集规则
// ========================================

/// 规则集到目标的映射
type RuleSetRules = &'static [(&'static str, Target)];

use Target::{Direct, Group, Primary};

const AD_RULES: RuleSetRules = &[
    ("tracking_yyds", Group("Advertising")),
    ("advertising_yyds", Group("Advertising")),
];

const NON_IP_RULES: &[RuleSetRules] = &[
    // cdn
    &[
        ("cdn_domainset", Group("CDN")),
        ("cdn_non_ip", Group("CDN")),
    ],
    // speedtest
    &[("speedtest_yyds", Primary)],
    // download
    &[("download_yyds", Group("ProxyDownload"))],
    // ai
    &[("ai_yyds", Group("AIGC"))],
    // streaming
    &[
        ("youtube_yyds", Group("Youtube")),
        ("spotify_yyds", Group("Spotify")),
        ("netflix_yyds", Group("Netflix")),
        ("disney_yyds", Group("Disney")),
        ("streaming_yyds", Group("Stream")),
    ],
    // apple
    &[
        ("apple_cdn", Group("CDN")),
        ("apple_yyds", Group("Apple")),
        ("apple_cn_yyds", Direct),
    ],
    // microsoft
    &[
        ("onedrive_yyds", Group("OneDrive")),
        ("microsoft_yyds", Group("Microsoft")),
        ("microsoft_cdn_non_ip", Group("CDN")),
    ],
    // telegram
    &[("telegram_yyds", Group("Telegram"))],
    // social
    &[
        ("twitter_yyds", Group("Twitter")),
        ("instagram_yyds", Group("Instagram")),
        ("tiktok_yyds", Group("Tiktok")),
        ("github_yyds", Group("Microsoft")),
        ("facebook_yyds", Group("Meta")),
        ("google_yyds", Group("Google")),
        ("paypal_yyds", Primary),
        ("cloudflare_yyds", Group("SafeProxy")),
    ],
    // private
    &[("private_yyds", Direct)],
    // china
    &[("china_yyds", Direct)],
    // direct
    &[("direct_yyds", Direct)],
    // proxy
    &[("proxy_yyds", Primary)],
];

const IP_RULES: &[RuleSetRules] = &[
    // ad
    &[("advertising_yyds_ip", Group("Advertising"))],
    // streaming
    &[
        ("netflix_yyds_ip", Group("Netflix")),
        ("streaming_yyds_ip", Group("Stream")),
    ],
    // ai
    &[("ai_ip_yyds", Group("AIGC"))],
    // telegram
    &[("telegram_yyds_ip", Group("Telegram"))],
    // social
    &[
        ("facebook_yyds_ip", Group("Meta")),
        ("google_yyds_ip", Group("Google")),
        ("socialmedia_yyds_ip", Group("Twitter")),
    ],
    // china
    &[("china_yyds_ip", Direct)],
    // private
    &[("lan_ip", Direct), ("private_yyds_ip", Direct)],
    // proxy
    &[("proxy_yyds_ip", Primary)],
];

/// 兜底规则的目标组
pub const CATCH_ALL_TARGET: &str = "Others";

// ========================================
// 规则列表
// ========================================

fn rule_sets(table: RuleSetRules, primary: &str) -> impl Iterator<Item = Rule> + '_ {
    table.iter().map(move |(provider, target)| Rule {
        matcher: Matcher::RuleSet(provider.to_string()),
        target: target.resolve(primary),
    })
}

fn custom_rules(primary: &str) -> impl Iterator<Item = Rule> + '_ {
    CUSTOM_RULES.iter().flat_map(move |group| {
        group.lines.iter().map(move |line| Rule {
            matcher: Matcher::Literal(line.to_string()),
            target: group.target.resolve(primary),
        })
    })
}

/// 按固定优先级生成完整规则列表
///
/// 自定义规则 → 广告规则集 → 非 IP 类规则集 → IP 类规则集 → `MATCH,Others`
pub fn build_rules(primary: &str) -> Vec<Rule> {
    let mut rules: Vec<Rule> = custom_rules(primary).collect();
    rules.extend(rule_sets(AD_RULES, primary));
    for table in NON_IP_RULES {
        rules.extend(rule_sets(*table, primary));
    }
    for table in IP_RULES {
        rules.extend(rule_sets(*table, primary));
    }
    rules.push(Rule {
        matcher: Matcher::Match,
        target: CATCH_ALL_TARGET.to_string(),
    });
    rules
}

/// 规则列表中引用到的全部规则集名称
#[cfg(test)]
pub fn referenced_rule_sets(rules: &[Rule]) -> impl Iterator<Item = &str> {
    rules.iter().filter_map(|r| match &r.matcher {
        Matcher::RuleSet(name) => Some(name.as_str()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ends_with_single_catch_all() {
        let rules = build_rules("PROXY");
        assert_eq!(rules.iter().filter(|r| r.is_catch_all()).count(), 1);
        assert_eq!(rules.last().unwrap().to_string(), "MATCH,Others");
    }

    #[test]
    fn ad_rule_sets_come_before_categories() {
        let rules = build_rules("PROXY");
        let first_category = rules
            .iter()
            .position(|r| matches!(r.matcher, Matcher::RuleSet(_)) && !r.is_reject())
            .unwrap();
        let last_ad_non_ip = rules
            .iter()
            .rposition(|r| {
                matches!(&r.matcher, Matcher::RuleSet(n) if n == "advertising_yyds")
            })
            .unwrap();
        assert!(last_ad_non_ip < first_category);

        let custom_end = rules
            .iter()
            .position(|r| matches!(r.matcher, Matcher::RuleSet(_)))
            .unwrap();
        assert_eq!(custom_end, CUSTOM_RULES.iter().map(|g| g.lines.len()).sum::<usize>());
    }

    #[test]
    fn ip_rules_follow_non_ip_rules() {
        let rules = build_rules("PROXY");
        let lines: Vec<String> = rules.iter().map(Rule::to_string).collect();
        let proxy_domain = lines
            .iter()
            .position(|l| l == "RULE-SET,proxy_yyds,PROXY")
            .unwrap();
        let ad_ip = lines
            .iter()
            .position(|l| l == "RULE-SET,advertising_yyds_ip,Advertising")
            .unwrap();
        assert!(proxy_domain < ad_ip);
    }

    #[test]
    fn primary_alias_is_substituted() {
        let lines: Vec<String> = build_rules("Main").iter().map(Rule::to_string).collect();
        assert!(lines.contains(&"DOMAIN-KEYWORD,potpieai,Main".to_string()));
        assert!(lines.contains(&"RULE-SET,speedtest_yyds,Main".to_string()));
        assert!(lines.contains(&"RULE-SET,proxy_yyds_ip,Main".to_string()));
        assert!(!lines.iter().any(|l| l.ends_with(",PROXY")));
    }

    #[test]
    fn literal_rules_render_with_target() {
        let lines: Vec<String> = build_rules("PROXY").iter().map(Rule::to_string).collect();
        assert_eq!(
            lines[0],
            "AND,((PROCESS-NAME,rustdesk),(DST-PORT,21114)),Advertising"
        );
        assert!(lines.contains(&"DOMAIN-SUFFIX,edu.cn,DIRECT".to_string()));
    }

    #[test]
    fn rule_sets_follow_custom_block_in_exact_order() {
        let custom: usize = CUSTOM_RULES.iter().map(|g| g.lines.len()).sum();
        let lines: Vec<String> = build_rules("PROXY")
            .iter()
            .skip(custom)
            .map(Rule::to_string)
            .collect();
        let expected = [
            "RULE-SET,tracking_yyds,Advertising",
            "RULE-SET,advertising_yyds,Advertising",
            "RULE-SET,cdn_domainset,CDN",
            "RULE-SET,cdn_non_ip,CDN",
            "RULE-SET,speedtest_yyds,PROXY",
            "RULE-SET,download_yyds,ProxyDownload",
            "RULE-SET,ai_yyds,AIGC",
            "RULE-SET,youtube_yyds,Youtube",
            "RULE-SET,spotify_yyds,Spotify",
            "RULE-SET,netflix_yyds,Netflix",
            "RULE-SET,disney_yyds,Disney",
            "RULE-SET,streaming_yyds,Stream",
            "RULE-SET,apple_cdn,CDN",
            "RULE-SET,apple_yyds,Apple",
            "RULE-SET,apple_cn_yyds,DIRECT",
            "RULE-SET,onedrive_yyds,OneDrive",
            "RULE-SET,microsoft_yyds,Microsoft",
            "RULE-SET,microsoft_cdn_non_ip,CDN",
            "RULE-SET,telegram_yyds,Telegram",
            "RULE-SET,twitter_yyds,Twitter",
            "RULE-SET,instagram_yyds,Instagram",
            "RULE-SET,tiktok_yyds,Tiktok",
            "RULE-SET,github_yyds,Microsoft",
            "RULE-SET,facebook_yyds,Meta",
            "RULE-SET,google_yyds,Google",
            "RULE-SET,paypal_yyds,PROXY",
            "RULE-SET,cloudflare_yyds,SafeProxy",
            "RULE-SET,private_yyds,DIRECT",
            "RULE-SET,china_yyds,DIRECT",
            "RULE-SET,direct_yyds,DIRECT",
            "RULE-SET,proxy_yyds,PROXY",
            "RULE-SET,advertising_yyds_ip,Advertising",
            "RULE-SET,netflix_yyds_ip,Netflix",
            "RULE-SET,streaming_yyds_ip,Stream",
            "RULE-SET,ai_ip_yyds,AIGC",
            "RULE-SET,telegram_yyds_ip,Telegram",
            "RULE-SET,facebook_yyds_ip,Meta",
            "RULE-SET,google_yyds_ip,Google",
            "RULE-SET,socialmedia_yyds_ip,Twitter",
            "RULE-SET,china_yyds_ip,DIRECT",
            "RULE-SET,lan_ip,DIRECT",
            "RULE-SET,private_yyds_ip,DIRECT",
            "RULE-SET,proxy_yyds_ip,PROXY",
            "MATCH,Others",
        ];
        assert_eq!(lines, expected);
    }
}

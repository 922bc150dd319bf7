//! # 策略组模块
//!
//! 这个模块负责：
//! 1. 规范化 proxy-providers
//! 2. 按地区为节点分类，生成每个地区的 Auto / Select / LB Hash / LB Polling 组
//! 3. 组装固定的顶层策略组和分类服务组

pub mod group;
pub mod provider;
pub mod region;

use anyhow::Result;

use crate::options::OverrideOptions;
use crate::profile::Profile;

pub use region::RegionClassifier;

use group::{DerivedKind, ProxyGroup, Strategy};
use region::ICON_BASE;

const DOWNLOAD_SVG: &str = r##"<svg t="1735825580241" class="icon" viewBox="0 0 1024 1024" version="1.1" xmlns="http://www.w3.org/2000/svg" p-id="1521" width="200" height="200"><path d="M537 137c165.23 0 302.183 121.067 326.991 279.332C922.626 464.753 960 538.012 960 620c0 145.803-118.197 264-264 264H348c-156.942-0.542-284-127.933-284-285 0-115.73 68.98-215.348 168.067-259.984C282.35 220.296 399.947 137 537 137z m-25 255c-17.673 0-32 14.327-32 32v175.758l-45.373-45.383-0.377-0.372c-12.524-12.127-32.506-12.003-44.877 0.372-12.497 12.5-12.497 32.765 0 45.265l84.52 84.54 0.635 0.624c21.06 20.395 54.635 20.27 75.543-0.434l85.444-84.618 0.373-0.375c12.186-12.467 12.162-32.453-0.148-44.89-12.435-12.561-32.696-12.662-45.255-0.225L544 600.296V424c0-17.673-14.327-32-32-32z" fill="#6495ED" p-id="1522"></path></svg>"##;

const SAFETY_SVG: &str = r##"<svg t="1735825766633" class="icon" viewBox="0 0 1024 1024" version="1.1" xmlns="http://www.w3.org/2000/svg" p-id="3573" width="200" height="200"><path d="M512 1024c-158.72 0-460.8-230.4-460.8-445.44V148.48h46.08s102.4 0 209.92-40.96C414.72 66.56 486.4 20.48 486.4 20.48s20.48-20.48 25.6-20.48c10.24 0 25.6 20.48 25.6 20.48s71.68 46.08 179.2 87.04c107.52 40.96 209.92 40.96 209.92 40.96h46.08v430.08c0 215.04-302.08 445.44-460.8 445.44z m-25.6-281.6l296.96-317.44-71.68-56.32-235.52 256-122.88-97.28-61.44 66.56 194.56 148.48z" fill="#1296db" p-id="3574"></path></svg>"##;

fn svg_data_uri(svg: &str) -> String {
    format!("data:image/svg+xml,{}", urlencoding::encode(svg))
}

fn icon(file: &str) -> String {
    format!("{}/{}", ICON_BASE, file)
}

// ========================================
// 分类服务组
// ========================================

#[derive(Debug, Clone, Copy)]
enum Icon {
    /// 相对 [`ICON_BASE`] 的文件名
    Builtin(&'static str),
    Url(&'static str),
    Svg(&'static str),
}

impl Icon {
    fn render(self) -> String {
        match self {
            Icon::Builtin(file) => icon(file),
            Icon::Url(url) => url.to_string(),
            Icon::Svg(svg) => svg_data_uri(svg),
        }
    }
}

/// 服务分类组：select 类型，候选为主代理、DIRECT 以及全部自动/地区组
#[derive(Debug, Clone, Copy)]
struct CategoryGroup {
    name: &'static str,
    icon: Icon,
    include_all: bool,
}

const fn category(name: &'static str, icon: Icon, include_all: bool) -> CategoryGroup {
    CategoryGroup {
        name,
        icon,
        include_all,
    }
}

const CATEGORY_GROUPS: &[CategoryGroup] = &[
    category("ProxyDownload", Icon::Svg(DOWNLOAD_SVG), true),
    category("SafeProxy", Icon::Svg(SAFETY_SVG), true),
    category(
        "CDN",
        Icon::Url("https://raw.githubusercontent.com/Orz-3/mini/master/Color/Skicat.png"),
        false,
    ),
    category(
        "Stream",
        Icon::Url("https://raw.githubusercontent.com/Koolson/Qure/master/IconSet/Color/LineTV.png"),
        false,
    ),
    category("AIGC", Icon::Builtin("chatgpt.svg"), true),
    category("Apple", Icon::Builtin("apple.svg"), true),
    category("Google", Icon::Builtin("google.svg"), true),
    category("Microsoft", Icon::Builtin("microsoft.svg"), true),
    category("OneDrive", Icon::Builtin("onedrive.svg"), true),
    category("Youtube", Icon::Builtin("youtube.svg"), true),
    category("Telegram", Icon::Builtin("telegram.svg"), true),
    category(
        "Spotify",
        Icon::Url("https://storage.googleapis.com/spotifynewsroom-jp.appspot.com/1/2020/12/Spotify_Icon_CMYK_Green.png"),
        true,
    ),
    category("Netflix", Icon::Builtin("netflix.svg"), true),
    category("Disney", Icon::Builtin("disney_plus.svg"), true),
    category("Meta", Icon::Builtin("facebook.svg"), true),
    category("Twitter", Icon::Builtin("twitter.svg"), true),
    category("Instagram", Icon::Builtin("instagram.svg"), true),
    category("Tiktok", Icon::Builtin("tiktok.svg"), true),
];

// ========================================
// 组装
// ========================================

/// 派生组，按类别优先排列：全部 Auto，然后全部 Select，依此类推
///
/// 组成员交给客户端按 filter 挑选；本地分类结果只用于调试日志。
fn derived_groups(
    classifier: &RegionClassifier,
    proxies: &[String],
    url: &str,
) -> Vec<ProxyGroup> {
    for matcher in classifier.matchers() {
        let members = matcher.select(proxies);
        if members.is_empty() {
            tracing::debug!(region = matcher.name(), "no literal proxy matches region");
        } else {
            tracing::debug!(region = matcher.name(), members = ?members, "region classified");
        }
    }

    DerivedKind::ALL
        .into_iter()
        .flat_map(|kind| {
            kind.arrange(classifier.matchers())
                .into_iter()
                .map(move |matcher| kind.build(matcher, url))
        })
        .collect()
}

fn names_of(groups: &[ProxyGroup], kind: DerivedKind) -> Vec<String> {
    let suffix = format!(" - {}", kind.suffix());
    groups
        .iter()
        .map(|g| g.name.clone())
        .filter(|n| n.ends_with(&suffix))
        .collect()
}

fn with_head(head: &str, rest: &[String]) -> Vec<String> {
    std::iter::once(head.to_string())
        .chain(rest.iter().cloned())
        .collect()
}

/// 固定顶层组 + 分类服务组
fn fixed_groups(
    primary: &str,
    proxies: &[String],
    derived: &[ProxyGroup],
    url: &str,
) -> Vec<ProxyGroup> {
    let auto = names_of(derived, DerivedKind::Auto);
    let select = names_of(derived, DerivedKind::Select);
    let hash = names_of(derived, DerivedKind::LbHash);
    let polling = names_of(derived, DerivedKind::LbPolling);

    let mut roster: Vec<String> = [primary, "DIRECT", "Auto", "Select", "LB Hash", "LB Polling"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    for names in [&auto, &select, &hash, &polling] {
        roster.extend(names.iter().cloned());
    }

    let mut groups = vec![
        ProxyGroup::select(primary)
            .url(url)
            .icon(icon("adjust.svg"))
            .proxies(["Auto", "Select", "LB Hash", "LB Polling", "DIRECT"]),
        ProxyGroup::select("Select")
            .url(url)
            .icon(icon("link.svg"))
            .include_all(),
        ProxyGroup::select("Auto")
            .url(url)
            .icon(icon("speed.svg"))
            .proxies(with_head("ALL - Auto", &auto)),
        ProxyGroup::select("LB Hash")
            .url(url)
            .icon(icon("balance.svg"))
            .proxies(with_head("ALL - LB Hash", &hash)),
        ProxyGroup::select("LB Polling")
            .url(url)
            .icon(icon("merry_go.svg"))
            .proxies(with_head("ALL - LB Polling", &polling)),
        ProxyGroup::load_balance("ALL - LB Hash", url, Strategy::ConsistentHashing)
            .icon(icon("balance.svg"))
            .include_all()
            .proxies(proxies.iter().cloned())
            .hidden(true),
        ProxyGroup::load_balance("ALL - LB Polling", url, Strategy::RoundRobin)
            .icon(icon("merry_go.svg"))
            .include_all()
            .proxies(proxies.iter().cloned())
            .hidden(true),
        ProxyGroup::url_test("ALL - Auto", url)
            .include_all()
            .hidden(true),
    ];

    for category in CATEGORY_GROUPS {
        let mut group = ProxyGroup::select(category.name)
            .proxies(roster.iter().cloned())
            .icon(category.icon.render());
        if category.include_all {
            group = group.include_all();
        }
        groups.push(group);
    }

    groups.push(
        ProxyGroup::select("Others")
            .proxies(["DIRECT", primary])
            .icon(icon("fish.svg")),
    );
    groups.push(
        ProxyGroup::select("Advertising")
            .proxies(["DIRECT", "REJECT", "REJECT-DROP", primary])
            .icon(icon("block.svg")),
    );

    groups
}

/// 固定的顶层组名，不含主代理组
const FIXED_GROUP_NAMES: &[&str] = &[
    "Select",
    "Auto",
    "LB Hash",
    "LB Polling",
    "ALL - LB Hash",
    "ALL - LB Polling",
    "ALL - Auto",
    "Others",
    "Advertising",
];

/// 名称是否与本工具生成的某个策略组重名
pub fn is_reserved_group_name(name: &str) -> bool {
    if FIXED_GROUP_NAMES.contains(&name) || CATEGORY_GROUPS.iter().any(|c| c.name == name) {
        return true;
    }
    region::REGIONS
        .iter()
        .map(|r| r.name)
        .chain(std::iter::once(region::OTHERS))
        .any(|region| {
            DerivedKind::ALL
                .iter()
                .any(|kind| kind.group_name(region) == name)
        })
}

/// 生成完整的 proxy-groups 列表
pub fn build_groups(proxies: &[String], opts: &OverrideOptions) -> Result<Vec<ProxyGroup>> {
    let classifier = RegionClassifier::standard()?;
    let url = opts.health_check_url.as_str();

    let derived = derived_groups(&classifier, proxies, url);
    let mut groups = fixed_groups(&opts.proxy_name, proxies, &derived, url);
    groups.extend(derived);
    Ok(groups)
}

/// 覆写 proxy-providers 与 proxy-groups
pub fn overwrite(profile: &mut Profile, opts: &OverrideOptions) -> Result<()> {
    provider::normalize(profile, opts)?;

    let proxies = profile.proxy_names();
    let groups = build_groups(&proxies, opts)?;
    profile.set_serialized("proxy-groups", &groups)?;

    tracing::info!(
        proxies = proxies.len(),
        groups = groups.len(),
        "proxy-groups overwritten"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proxies(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn build(names: &[&str]) -> Vec<ProxyGroup> {
        build_groups(&proxies(names), &OverrideOptions::default()).unwrap()
    }

    fn find<'a>(groups: &'a [ProxyGroup], name: &str) -> &'a ProxyGroup {
        groups
            .iter()
            .find(|g| g.name == name)
            .unwrap_or_else(|| panic!("missing group {name}"))
    }

    const REGIONS: [&str; 12] = [
        "HK", "TW", "SG", "JP", "KR", "US", "UK", "FR", "DE", "MQ", "ProxyChain", "Others",
    ];

    const SELECT_REGIONS: [&str; 12] = [
        "HK", "JP", "KR", "SG", "US", "UK", "FR", "DE", "TW", "MQ", "ProxyChain", "Others",
    ];

    fn regions_for(kind: &str) -> [&'static str; 12] {
        if kind == "Select" {
            SELECT_REGIONS
        } else {
            REGIONS
        }
    }

    #[test]
    fn exact_group_names_in_order() {
        let groups = build(&["HK-01"]);
        assert_eq!(groups.len(), 76);

        let mut expected: Vec<String> = proxies(&[
            "PROXY",
            "Select",
            "Auto",
            "LB Hash",
            "LB Polling",
            "ALL - LB Hash",
            "ALL - LB Polling",
            "ALL - Auto",
            "ProxyDownload",
            "SafeProxy",
            "CDN",
            "Stream",
            "AIGC",
            "Apple",
            "Google",
            "Microsoft",
            "OneDrive",
            "Youtube",
            "Telegram",
            "Spotify",
            "Netflix",
            "Disney",
            "Meta",
            "Twitter",
            "Instagram",
            "Tiktok",
            "Others",
            "Advertising",
        ]);
        for kind in ["Auto", "Select", "LB Hash", "LB Polling"] {
            for region in regions_for(kind) {
                expected.push(format!("{region} - {kind}"));
            }
        }

        let names: Vec<String> = groups.iter().map(|g| g.name.clone()).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn derived_groups_defer_membership_to_filter() {
        let classifier = RegionClassifier::standard().unwrap();
        let groups = build(&["HK-01", "US-Relay", "Generic-Node", "HK-01 剩余流量"]);

        for (name, region) in [("HK - Auto", 0), ("US - Select", 5), ("Others - LB Polling", 11)] {
            let group = find(&groups, name);
            assert!(group.proxies.is_empty(), "{name} carries literal proxies");
            assert_eq!(group.include_all, Some(true));
            assert_eq!(group.filter.as_deref(), Some(classifier.matchers()[region].filter()));
        }
    }

    #[test]
    fn empty_region_stays_loadable() {
        // 只有香港节点时，JP 各组仍然 include-all，由客户端回退到 COMPATIBLE
        let groups = build(&["HK-01"]);
        for kind in ["Auto", "Select", "LB Hash", "LB Polling"] {
            let group = find(&groups, &format!("JP - {kind}"));
            assert_eq!(group.include_all, Some(true));
            assert!(group.filter.is_some());
            assert!(group.proxies.is_empty());
        }

        let value = serde_yaml::to_value(find(&groups, "JP - Auto")).unwrap();
        assert_eq!(value.get("include-all"), Some(&serde_yaml::Value::from(true)));
        assert!(value.get("include-all-providers").is_none());
        assert!(value.get("proxies").is_none());
    }

    #[test]
    fn select_groups_follow_their_own_region_order() {
        let classifier = RegionClassifier::standard().unwrap();
        let derived = derived_groups(&classifier, &[], "https://x");
        let select = names_of(&derived, DerivedKind::Select);
        let expected: Vec<String> = SELECT_REGIONS
            .iter()
            .map(|r| format!("{r} - Select"))
            .collect();
        assert_eq!(select, expected);
        assert_eq!(names_of(&derived, DerivedKind::Auto)[1], "TW - Auto");
    }

    #[test]
    fn all_balancers_list_every_proxy() {
        let names = ["HK-01", "US-Relay", "HK-01 剩余流量"];
        let groups = build(&names);
        for name in ["ALL - LB Hash", "ALL - LB Polling"] {
            let group = find(&groups, name);
            assert_eq!(group.proxies, proxies(&names));
            assert_eq!(group.include_all, Some(true));
        }
    }

    #[test]
    fn category_roster() {
        let groups = build(&[]);
        let roster = &find(&groups, "Netflix").proxies;
        assert_eq!(roster.len(), 6 + 48);
        assert_eq!(&roster[..6], &proxies(&["PROXY", "DIRECT", "Auto", "Select", "LB Hash", "LB Polling"])[..]);
        assert_eq!(roster[6], "HK - Auto");
        assert_eq!(roster[18], "HK - Select");
        assert_eq!(roster[19], "JP - Select");
        assert_eq!(roster[26], "TW - Select");
        assert_eq!(roster[53], "Others - LB Polling");

        assert_eq!(find(&groups, "CDN").include_all, None);
        assert_eq!(find(&groups, "Stream").include_all, None);
        assert_eq!(find(&groups, "AIGC").include_all, Some(true));
    }

    #[test]
    fn selector_groups_point_at_derived_groups() {
        let groups = build(&[]);
        let auto = &find(&groups, "Auto").proxies;
        assert_eq!(auto[0], "ALL - Auto");
        assert_eq!(auto.len(), 13);
        assert_eq!(find(&groups, "LB Hash").proxies[1], "HK - LB Hash");
        assert_eq!(
            find(&groups, "Advertising").proxies,
            proxies(&["DIRECT", "REJECT", "REJECT-DROP", "PROXY"])
        );
        assert_eq!(find(&groups, "Others").proxies, proxies(&["DIRECT", "PROXY"]));
    }

    #[test]
    fn primary_name_follows_options() {
        let opts = OverrideOptions {
            proxy_name: "Main".to_string(),
            ..OverrideOptions::default()
        };
        let groups = build_groups(&[], &opts).unwrap();
        assert_eq!(groups[0].name, "Main");
        assert_eq!(find(&groups, "Others").proxies, proxies(&["DIRECT", "Main"]));
    }

    #[test]
    fn every_generated_name_except_primary_is_reserved() {
        let groups = build(&[]);
        for group in &groups[1..] {
            assert!(is_reserved_group_name(&group.name), "{} not reserved", group.name);
        }
        assert!(!is_reserved_group_name("PROXY"));
        assert!(!is_reserved_group_name("DIRECT"));
    }

    #[test]
    fn svg_icons_are_data_uris() {
        let groups = build(&[]);
        let icon = find(&groups, "SafeProxy").icon.clone().unwrap();
        assert!(icon.starts_with("data:image/svg+xml,%3Csvg%20"));
        assert!(!icon.contains('<'));
    }

    #[test]
    fn output_is_deterministic() {
        let names = ["JP-1", "SG-2", "🇺🇸 LA"];
        assert_eq!(build(&names), build(&names));
    }
}

//! # DNS 覆写
//!
//! fake-ip 模式的 DNS 设置、fake-ip 过滤列表，以及按域名分流的 nameserver-policy。
//!
//! nameserver-policy 以 "解析器 → 域名模式列表" 的分组形式维护，
//! 展开为 "域名模式 → 解析器" 映射时保持表内顺序。

use anyhow::Result;
use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::options::OverrideOptions;
use crate::profile::Profile;

// ========================================
// nameserver
// ========================================

const NAMESERVERS: &[&str] = &["https://223.5.5.5/dns-query", "https://doh.pub/dns-query"];

/// 仅用于解析代理节点域名
const PROXY_NAMESERVERS: &[&str] = &[
    "https://223.5.5.5/dns-query",
    "https://doh.pub/dns-query",
    "https://1.0.0.1/dns-query",
    "https://1.1.1.1/dns-query",
];

// ========================================
// fake-ip-filter
// ========================================

const FAKE_IP_FILTER: &[&str] = &[
    "+.+m2m",
    "+.$injections.adguard.org",
    "+.$local.adguard.org",
    "+.+bogon",
    "+.+lan",
    "*.local",
    "+.+localdomain",
    "+.home.arpa",
    "+.gitv.tv",
    "+.docker.io",
    "+.miwifi.com",
    "+.safebrowsing.apple",
    "Mijia Cloud",
    "time.*.com",
    "time.*.gov",
    "time.*.edu.cn",
    "time.*.apple.com",
    "time-ios.apple.com",
    "time1.*.com",
    "time2.*.com",
    "time3.*.com",
    "time4.*.com",
    "time5.*.com",
    "time6.*.com",
    "time7.*.com",
    "ntp.*.com",
    "ntp1.*.com",
    "ntp2.*.com",
    "ntp3.*.com",
    "ntp4.*.com",
    "ntp5.*.com",
    "ntp6.*.com",
    "ntp7.*.com",
    "*.time.edu.cn",
    "*.ntp.org.cn",
    "+.pool.ntp.org",
    "*.nju.edu.cn",
    "time1.cloud.tencent.com",
    "+.10.in-addr.arpa",
    "+.16.172.in-addr.arpa",
    "+.17.172.in-addr.arpa",
    "+.18.172.in-addr.arpa",
    "+.19.172.in-addr.arpa",
    "+.20.172.in-addr.arpa",
    "+.21.172.in-addr.arpa",
    "+.22.172.in-addr.arpa",
    "+.23.172.in-addr.arpa",
    "+.24.172.in-addr.arpa",
    "+.25.172.in-addr.arpa",
    "+.26.172.in-addr.arpa",
    "+.27.172.in-addr.arpa",
    "+.28.172.in-addr.arpa",
    "+.29.172.in-addr.arpa",
    "+.30.172.in-addr.arpa",
    "+.31.172.in-addr.arpa",
    "+.168.192.in-addr.arpa",
    "+.254.169.in-addr.arpa",
    "dns.msftncsi.com",
    "*.srv.nintendo.net",
    "*.stun.playstation.net",
    "xbox.*.microsoft.com",
    "*.xboxlive.com",
    "*.turn.twilio.com",
    "*.stun.twilio.com",
    "stun.syncthing.net",
    "stun.*",
];

// ========================================
// nameserver-policy
// ========================================

/// 一组共用同一解析器的域名模式
struct PolicyGroup {
    resolver: Resolver,
    domains: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
enum Resolver {
    One(&'static str),
    Many(&'static [&'static str]),
}

const ALIDNS_QUIC: Resolver = Resolver::One("quic://dns.alidns.com:853");
const DOH_PUB: Resolver = Resolver::One("https://doh.pub/dns-query");
const BYTEDANCE: Resolver = Resolver::One("180.184.2.2");
const BAIDU: Resolver = Resolver::One("180.76.76.76");
const DOH_360: Resolver = Resolver::One("https://doh.360.cn/dns-query");
const SYSTEM: Resolver = Resolver::Many(&["system://", "system", "dhcp://system"]);

const NAMESERVER_POLICY: &[PolicyGroup] = &[
    PolicyGroup {
        resolver: Resolver::One("quic://223.5.5.5:853"),
        domains: &["dns.alidns.com"],
    },
    PolicyGroup {
        resolver: Resolver::One("https://1.12.12.12/dns-query"),
        domains: &["doh.pub"],
    },
    PolicyGroup {
        resolver: Resolver::One("101.198.198.198"),
        domains: &["doh.360.cn"],
    },
    PolicyGroup {
        resolver: Resolver::One("10.60.1.2"),
        domains: &["+.nju.edu.cn"],
    },
    // 阿里系
    PolicyGroup {
        resolver: ALIDNS_QUIC,
        domains: &[
            "+.uc.cn", "+.alibaba.com", "*.alicdn.com", "*.ialicdn.com", "*.myalicdn.com",
            "*.alidns.com", "*.aliimg.com", "+.aliyun.com", "*.aliyuncs.com", "*.alikunlun.com",
            "*.alikunlun.net", "*.cdngslb.com", "+.alipay.com", "+.alipay.cn", "+.alipay.com.cn",
            "*.alipayobjects.com", "+.alibaba-inc.com", "*.alibabausercontent.com",
            "*.alibabadns.com", "+.alibabachengdun.com", "+.alicloudccp.com", "+.alipan.com",
            "+.aliyundrive.com", "+.aliyundrive.net", "+.cainiao.com", "+.cainiao.com.cn",
            "+.cainiaoyizhan.com", "+.guoguo-app.com", "+.etao.com", "+.yitao.com", "+.1688.com",
            "+.amap.com", "+.gaode.com", "+.autonavi.com", "+.dingtalk.com", "+.mxhichina.com",
            "+.soku.com", "+.tb.cn", "+.taobao.com", "*.taobaocdn.com", "*.tbcache.com",
            "+.tmall.com", "+.goofish.com", "+.xiami.com", "+.xiami.net", "*.ykimg.com",
            "+.youku.com", "+.tudou.com", "*.cibntv.net", "+.ele.me", "*.elemecdn.com",
            "+.feizhu.com", "+.taopiaopiao.com", "+.fliggy.com", "+.koubei.com", "+.mybank.cn",
            "+.mmstat.com", "+.uczzd.cn", "+.iconfont.cn", "+.freshhema.com", "+.hemamax.com",
            "+.hemaos.com", "+.hemashare.cn", "+.shyhhema.com", "+.sm.cn", "+.npmmirror.com",
            "+.alios.cn", "+.wandoujia.com", "+.aligames.com", "+.25pp.com", "*.aliapp.org",
            "+.tanx.com", "+.hellobike.com", "*.hichina.com", "*.yunos.com", "*.nlark.com",
            "*.yuque.com", "upos-sz-mirrorali.bilivideo.com", "upos-sz-estgoss.bilivideo.com",
            "ali-safety-video.acfun.cn",
        ],
    },
    // 腾讯系、B 站、小米
    PolicyGroup {
        resolver: DOH_PUB,
        domains: &[
            "+.grok.com", "+.linux.do", "download.pytorch.org", "*.qcloud.com", "*.gtimg.cn",
            "*.gtimg.com", "*.gtimg.com.cn", "*.gdtimg.com", "*.idqqimg.com", "*.udqqimg.com",
            "*.igamecj.com", "+.myapp.com", "*.myqcloud.com", "+.dnspod.com", "*.qpic.cn",
            "*.qlogo.cn", "+.qq.com", "+.qq.com.cn", "*.qqmail.com", "+.qzone.com",
            "*.tencent-cloud.net", "*.tencent-cloud.com", "+.tencent.com", "+.tencent.com.cn",
            "+.tencentmusic.com", "+.weixinbridge.com", "+.weixin.com", "+.weiyun.com",
            "+.soso.com", "+.sogo.com", "+.sogou.com", "*.sogoucdn.com", "*.roblox.cn",
            "+.robloxdev.cn", "+.wegame.com", "+.wegame.com.cn", "+.wegameplus.com",
            "+.cdn-go.cn", "*.tencentcs.cn", "*.qcloudimg.com", "+.dnspod.cn",
            "+.anticheatexpert.com", "url.cn", "*.qlivecdn.com", "*.tcdnlive.com", "*.dnsv1.com",
            "*.smtcdns.net", "+.coding.net", "*.codehub.cn", "tx-safety-video.acfun.cn",
            "acg.tv", "b23.tv", "+.bilibili.cn", "+.bilibili.com", "*.acgvideo.com",
            "*.bilivideo.com", "*.bilivideo.cn", "*.bilivideo.net", "*.hdslb.com",
            "*.biliimg.com", "*.biliapi.com", "*.biliapi.net", "+.biligame.com",
            "*.biligame.net", "+.bilicomic.com", "+.bilicomics.com", "*.bilicdn1.com",
            "+.mi.com", "+.duokan.com", "*.mi-img.com", "*.mi-idc.com", "*.xiaoaisound.com",
            "*.xiaomixiaoai.com", "*.mi-fds.com", "*.mifile.cn", "*.mijia.tech", "+.miui.com",
            "+.xiaomi.com", "+.xiaomi.cn", "+.xiaomi.net", "+.xiaomiev.com",
            "+.xiaomiyoupin.com",
        ],
    },
    // 字节系
    PolicyGroup {
        resolver: BYTEDANCE,
        domains: &[
            "+.bytedance.com", "*.bytecdn.cn", "*.volccdn.com", "*.toutiaoimg.com",
            "*.toutiaoimg.cn", "*.toutiaostatic.com", "*.toutiaovod.com", "*.toutiaocloud.com",
            "+.toutiaopage.com", "+.feiliao.com", "+.iesdouyin.com", "*.pstatp.com",
            "+.snssdk.com", "*.bytegoofy.com", "+.toutiao.com", "+.feishu.cn", "+.feishu.net",
            "*.feishucdn.com", "*.feishupkg.com", "+.douyin.com", "*.douyinpic.com",
            "*.douyinstatic.com", "*.douyincdn.com", "*.douyinliving.com", "*.douyinvod.com",
            "+.huoshan.com", "*.huoshanstatic.com", "+.huoshanzhibo.com", "+.ixigua.com",
            "*.ixiguavideo.com", "*.ixgvideo.com", "*.byted-static.com", "+.volces.com",
            "+.baike.com", "*.zjcdn.com", "*.zijieapi.com", "+.feelgood.cn", "*.bytetcc.com",
            "*.bytednsdoc.com", "*.byteimg.com", "*.byteacctimg.com", "*.ibytedapm.com",
            "+.oceanengine.com", "*.edge-byted.com", "*.volcvideo.com",
        ],
    },
    // 百度系
    PolicyGroup {
        resolver: BAIDU,
        domains: &[
            "+.91.com", "+.hao123.com", "+.baidu.cn", "+.baidu.com", "+.iqiyi.com",
            "*.iqiyipic.com", "*.baidubce.com", "*.bcelive.com", "*.baiducontent.com",
            "*.baidustatic.com", "*.bdstatic.com", "*.bdimg.com", "*.bcebos.com",
            "*.baidupcs.com", "*.baidubcr.com", "*.yunjiasu-cdn.net", "+.tieba.com",
            "+.xiaodutv.com", "*.shifen.com", "*.jomodns.com", "*.bdydns.com", "*.jomoxc.com",
            "*.duapp.com", "*.antpcdn.com", "upos-sz-mirrorbd.bilivideo.com",
            "upos-sz-mirrorbos.bilivideo.com",
        ],
    },
    // 360
    PolicyGroup {
        resolver: DOH_360,
        domains: &[
            "*.qhimg.com", "*.qhimgs.com", "*.qhimgs?.com", "*.qhres.com", "*.qhres2.com",
            "*.qhmsg.com", "*.qhstatic.com", "*.qhupdate.com", "*.qihucdn.com", "+.360.com",
            "+.360.cn", "+.360.net", "+.360safe.com", "*.360tpcdn.com", "+.360os.com",
            "*.360webcache.com", "+.360kuai.com", "+.so.com", "+.haosou.com", "+.yunpan.cn",
            "+.yunpan.com", "+.yunpan.com.cn", "*.qh-cdn.com", "+.baomitu.com", "+.qiku.com",
        ],
    },
    // 认证门户、路由器管理页、局域网反查
    PolicyGroup {
        resolver: SYSTEM,
        domains: &[
            "+.securelogin.com.cn", "captive.apple.com", "hotspot.cslwifi.com", "*.m2m",
            "injections.adguard.org", "local.adguard.org", "*.bogon", "*.home",
            "instant.arubanetworks.com", "setmeup.arubanetworks.com", "router.asus.com",
            "repeater.asus.com", "+.asusrouter.com", "+.routerlogin.net", "+.routerlogin.com",
            "+.tplinkwifi.net", "+.tplogin.cn", "+.tplinkap.net", "+.tplinkmodem.net",
            "+.tplinkplclogin.net", "+.tplinkrepeater.net", "*.ui.direct", "unifi",
            "*.huaweimobilewifi.com", "*.router", "aterm.me", "console.gl-inet.com",
            "homerouter.cpe", "mobile.hotspot", "ntt.setup", "pi.hole", "*.plex.direct",
            "*.lan", "*.localdomain", "+.home.arpa", "+.10.in-addr.arpa",
            "+.16.172.in-addr.arpa", "+.17.172.in-addr.arpa", "+.18.172.in-addr.arpa",
            "+.19.172.in-addr.arpa", "+.20.172.in-addr.arpa", "+.21.172.in-addr.arpa",
            "+.22.172.in-addr.arpa", "+.23.172.in-addr.arpa", "+.24.172.in-addr.arpa",
            "+.25.172.in-addr.arpa", "+.26.172.in-addr.arpa", "+.27.172.in-addr.arpa",
            "+.28.172.in-addr.arpa", "+.29.172.in-addr.arpa", "+.30.172.in-addr.arpa",
            "+.31.172.in-addr.arpa", "+.168.192.in-addr.arpa", "+.254.169.in-addr.arpa",
        ],
    },
];

// ========================================
// 结构定义
// ========================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
struct DnsOptions {
    enable: bool,
    prefer_h3: bool,
    ipv6: bool,
    respect_rules: bool,
    enhanced_mode: &'static str,
    fake_ip_range: &'static str,
    proxy_server_nameserver: Vec<String>,
    nameserver: Vec<String>,
    fake_ip_filter: Vec<&'static str>,
    nameserver_policy: Mapping,
}

/// 展开 nameserver-policy；同一模式出现多次时后者覆盖前者
fn nameserver_policy() -> Result<Mapping> {
    let mut policy = Mapping::new();
    for group in NAMESERVER_POLICY {
        let resolver = serde_yaml::to_value(group.resolver)?;
        for domain in group.domains {
            policy.insert(Value::from(*domain), resolver.clone());
        }
    }
    Ok(policy)
}

fn with_primary(primary: &str, rest: &[&str]) -> Vec<String> {
    std::iter::once(primary)
        .chain(rest.iter().copied())
        .map(str::to_string)
        .collect()
}

/// 覆写 DNS 选项（整个 `dns` 段被替换）
pub fn overwrite(profile: &mut Profile, opts: &OverrideOptions) -> Result<()> {
    let dns = DnsOptions {
        enable: true,
        prefer_h3: false,
        ipv6: false,
        respect_rules: true,
        enhanced_mode: "fake-ip",
        fake_ip_range: "198.18.0.1/16",
        proxy_server_nameserver: with_primary(&opts.doh_endpoint, PROXY_NAMESERVERS),
        nameserver: with_primary(&opts.doh_endpoint, NAMESERVERS),
        fake_ip_filter: FAKE_IP_FILTER.to_vec(),
        nameserver_policy: nameserver_policy()?,
    };

    tracing::debug!(
        policies = dns.nameserver_policy.len(),
        fake_ip_filter = dns.fake_ip_filter.len(),
        "dns options applied"
    );
    profile.set_serialized("dns", &dns)
}

//! # clash-override
//!
//! Clash / mihomo 配置覆写工具。
//!
//! ## 功能
//! - 覆写基础选项: 端口、sniffer、hosts、GEO 数据源、tun
//! - 覆写 DNS: nameserver、fake-ip 过滤、按域名分流的 nameserver-policy
//! - 生成 rule-providers 与 rules，并联动直连规则集
//! - 按地区为节点分类，生成 proxy-groups
//!
//! ## 使用
//! ```bash
//! # 覆写配置并输出到 stdout
//! clash-override apply config.yaml
//!
//! # 从 stdin 读取，写到文件，使用自定义主代理组名
//! cat config.yaml | clash-override apply -o out.yaml --proxy-name Main
//!
//! # 查看每个节点被分到哪个地区
//! clash-override classify config.yaml
//!
//! # 生成默认选项文件 ~/.config/clash-override/options.toml
//! clash-override init
//! ```

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

mod basic;
mod dns;
mod logging;
mod options;
mod pipeline;
mod profile;
mod proxy;
mod rule;

use options::OverrideOptions;
use profile::ProfileFormat;
use proxy::RegionClassifier;

// ========================================
// CLI 参数定义
// ========================================

/// Clash / mihomo 配置覆写工具
#[derive(Parser)]
#[command(name = "clash-override")]
#[command(version)]
#[command(about = "Overwrite a Clash/mihomo profile with a fixed DNS, rule and proxy-group policy")]
struct Cli {
    /// 子命令
    #[command(subcommand)]
    command: Commands,
}

/// 支持的子命令
#[derive(Subcommand)]
enum Commands {
    /// 覆写配置
    Apply {
        /// 输入配置文件 (省略或 "-" 时读取 stdin)
        input: Option<PathBuf>,

        /// 输出文件 (默认 stdout)
        #[arg(long, short = 'o', value_name = "PATH")]
        output: Option<PathBuf>,

        /// 配置格式 (默认按扩展名推断，否则 YAML)
        #[arg(long, value_enum)]
        format: Option<ProfileFormat>,

        /// 选项文件路径
        #[arg(long, value_name = "PATH")]
        options: Option<PathBuf>,

        /// 主代理组名称
        #[arg(long, value_name = "NAME")]
        proxy_name: Option<String>,

        /// mixed-port
        #[arg(long, value_name = "PORT")]
        mixed_port: Option<u16>,

        /// 首选 DoH 服务器
        #[arg(long, value_name = "URL")]
        doh: Option<String>,

        /// 显示调试信息
        #[arg(long)]
        debug: bool,
    },
    /// 显示节点的地区分类
    Classify {
        /// 输入配置文件 (省略或 "-" 时读取 stdin)
        input: Option<PathBuf>,

        /// JSON 格式输出
        #[arg(long)]
        json: bool,
    },
    /// 生成默认选项文件
    Init {
        /// 覆盖已存在的文件
        #[arg(long)]
        force: bool,
    },
}

// ========================================
// 主函数
// ========================================

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Apply {
            input,
            output,
            format,
            options,
            proxy_name,
            mixed_port,
            doh,
            debug,
        } => load_options(options.as_deref(), proxy_name, mixed_port, doh).and_then(|opts| {
            logging::init(&opts.logging.level, debug)?;
            run_apply(input.as_deref(), output.as_deref(), format, &opts)
        }),
        Commands::Classify { input, json } => run_classify(input.as_deref(), json),
        Commands::Init { force } => run_init(&options::default_path(), force),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// 选项优先级: 命令行参数 > 选项文件 > 内置默认值
fn load_options(
    path: Option<&Path>,
    proxy_name: Option<String>,
    mixed_port: Option<u16>,
    doh: Option<String>,
) -> Result<OverrideOptions> {
    let mut opts = options::load(path)?;
    if let Some(name) = proxy_name {
        opts.proxy_name = name;
    }
    if let Some(port) = mixed_port {
        opts.mixed_port = port;
    }
    if let Some(url) = doh {
        opts.doh_endpoint = url;
    }
    opts.validate().context("invalid options")?;
    Ok(opts)
}

// ========================================
// 子命令实现
// ========================================

fn run_apply(
    input: Option<&Path>,
    output: Option<&Path>,
    format: Option<ProfileFormat>,
    opts: &OverrideOptions,
) -> Result<()> {
    let source = profile::read(input, format)?;

    // 输出格式: --format > 输出文件扩展名 > 输入文件扩展名 > YAML
    let out_format = format
        .or_else(|| output.and_then(ProfileFormat::from_path))
        .or_else(|| input.and_then(ProfileFormat::from_path))
        .unwrap_or(ProfileFormat::Yaml);

    let result = pipeline::apply(source, opts)?;
    profile::write(&result, output, out_format)?;

    if let Some(path) = output {
        tracing::info!(path = %path.display(), format = %out_format, "profile written");
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ClassifiedProxy {
    name: String,
    regions: Vec<String>,
}

fn run_classify(input: Option<&Path>, json_output: bool) -> Result<()> {
    let source = profile::read(input, None)?;
    let classifier = RegionClassifier::standard()?;

    let results: Vec<ClassifiedProxy> = source
        .proxy_names()
        .into_iter()
        .map(|name| {
            let regions = classifier
                .classify(&name)
                .into_iter()
                .map(str::to_string)
                .collect();
            ClassifiedProxy { name, regions }
        })
        .collect();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    println!("{:<40}\t{}", "NAME", "REGIONS");
    for res in &results {
        let regions = if res.regions.is_empty() {
            "(excluded)".to_string()
        } else {
            res.regions.join(", ")
        };
        println!("{:<40}\t{}", res.name, regions);
    }
    println!("\nTotal: {} proxies", results.len());
    Ok(())
}

fn run_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "options file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    options::write_default(path)?;
    println!("Options written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_file_options() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.toml");
        std::fs::write(&path, "proxy_name = \"FromFile\"\nmixed_port = 1080\n").unwrap();

        let opts = load_options(Some(&path), Some("FromCli".to_string()), None, None).unwrap();
        assert_eq!(opts.proxy_name, "FromCli");
        assert_eq!(opts.mixed_port, 1080);
    }

    #[test]
    fn invalid_cli_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.toml");
        std::fs::write(&path, "").unwrap();

        assert!(load_options(Some(&path), Some("REJECT".to_string()), None, None).is_err());
        assert!(load_options(Some(&path), None, None, Some("tls://1.1.1.1".to_string())).is_err());
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clash-override").join("options.toml");
        run_init(&path, false).unwrap();
        assert!(run_init(&path, false).is_err());
        run_init(&path, true).unwrap();
    }

    #[test]
    fn apply_converts_between_formats() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("base.yaml");
        let output = dir.path().join("out.json");
        std::fs::write(&input, "proxies:\n  - name: JP-01\n    type: ss\n").unwrap();

        run_apply(Some(&input), Some(&output), None, &OverrideOptions::default()).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["proxy-groups"].as_array().unwrap().len(), 76);
        assert_eq!(written["proxies"][0]["name"], "JP-01");
    }
}

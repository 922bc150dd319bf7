//! # 配置档案 (Profile)
//!
//! 代理客户端的配置记录：字符串键到任意 YAML 值的有序映射。
//!
//! - 覆写时已有的键保持原位置，新键追加到末尾
//! - 输入可以是 YAML 或 JSON，输出同样支持两种格式

use std::fmt;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_yaml::{Mapping, Value};

// ========================================
// 配置档案
// ========================================

/// 一份 Clash / mihomo 配置
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    root: Mapping,
}

impl Profile {
    /// 从任意 YAML 值构造，根节点必须是映射（null 视为空配置）
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Mapping(root) => Ok(Self { root }),
            Value::Null => Ok(Self::default()),
            other => bail!(
                "profile root must be a mapping, found {}",
                value_kind(&other)
            ),
        }
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.root
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.root.get_mut(key)
    }

    /// 写入单个键（覆盖旧值）
    pub fn set(&mut self, key: &str, value: Value) {
        self.root.insert(Value::from(key), value);
    }

    /// 序列化后写入单个键
    pub fn set_serialized<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let value =
            serde_yaml::to_value(value).with_context(|| format!("failed to serialize `{key}`"))?;
        self.set(key, value);
        Ok(())
    }

    /// 把一个结构体的每个顶层字段逐一覆盖到配置上
    pub fn overlay<T: Serialize>(&mut self, fields: &T) -> Result<()> {
        let value = serde_yaml::to_value(fields).context("failed to serialize overlay")?;
        let Value::Mapping(map) = value else {
            bail!("overlay must serialize to a mapping");
        };
        for (k, v) in map {
            self.root.insert(k, v);
        }
        Ok(())
    }

    /// 取出（必要时创建）`section` 下的字符串列表 `key`
    ///
    /// 已有值不是映射/列表时会被替换为空容器。
    pub fn list_mut(&mut self, section: &str, key: &str) -> &mut Vec<Value> {
        let section_value = self
            .root
            .entry(Value::from(section))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        if !section_value.is_mapping() {
            *section_value = Value::Mapping(Mapping::new());
        }
        let Value::Mapping(section_map) = section_value else {
            unreachable!("section was just normalized to a mapping");
        };

        let list = section_map
            .entry(Value::from(key))
            .or_insert_with(|| Value::Sequence(Vec::new()));
        if !list.is_sequence() {
            *list = Value::Sequence(Vec::new());
        }
        match list {
            Value::Sequence(seq) => seq,
            _ => unreachable!("list was just normalized to a sequence"),
        }
    }

    /// `proxies` 中所有带字符串 `name` 的节点名，保持原顺序
    pub fn proxy_names(&self) -> Vec<String> {
        self.get("proxies")
            .and_then(Value::as_sequence)
            .map(|seq| {
                seq.iter()
                    .filter_map(|p| p.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

// ========================================
// 文件格式
// ========================================

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProfileFormat {
    /// YAML (Clash 默认)
    Yaml,
    /// JSON
    Json,
}

impl ProfileFormat {
    /// 根据扩展名推断格式，无法识别时返回 None
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(ProfileFormat::Yaml),
            "json" => Some(ProfileFormat::Json),
            _ => None,
        }
    }
}

impl fmt::Display for ProfileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileFormat::Yaml => write!(f, "yaml"),
            ProfileFormat::Json => write!(f, "json"),
        }
    }
}

// ========================================
// 读写
// ========================================

/// 解析配置文本
pub fn parse(content: &str, format: ProfileFormat) -> Result<Profile> {
    let value: Value = match format {
        ProfileFormat::Yaml => serde_yaml::from_str(content).context("invalid YAML profile")?,
        ProfileFormat::Json => serde_json::from_str(content).context("invalid JSON profile")?,
    };
    Profile::from_value(value)
}

/// 渲染配置文本
pub fn render(profile: &Profile, format: ProfileFormat) -> Result<String> {
    match format {
        ProfileFormat::Yaml => {
            serde_yaml::to_string(profile.as_mapping()).context("failed to render YAML profile")
        }
        ProfileFormat::Json => {
            let mut out = serde_json::to_string_pretty(profile.as_mapping())
                .context("failed to render JSON profile")?;
            out.push('\n');
            Ok(out)
        }
    }
}

/// 从文件读取配置；`path` 为 None 或 "-" 时读取 stdin
pub fn read(path: Option<&Path>, format: Option<ProfileFormat>) -> Result<Profile> {
    match path.filter(|p| p.as_os_str() != "-") {
        Some(p) => {
            let content = std::fs::read_to_string(p)
                .with_context(|| format!("failed to read profile: {}", p.display()))?;
            let format = format
                .or_else(|| ProfileFormat::from_path(p))
                .unwrap_or(ProfileFormat::Yaml);
            parse(&content, format).with_context(|| format!("in {}", p.display()))
        }
        None => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("failed to read profile from stdin")?;
            parse(&content, format.unwrap_or(ProfileFormat::Yaml))
        }
    }
}

/// 写出配置；`path` 为 None 时写到 stdout
pub fn write(profile: &Profile, path: Option<&Path>, format: ProfileFormat) -> Result<()> {
    let content = render(profile, format)?;
    match path {
        Some(p) => std::fs::write(p, content)
            .with_context(|| format!("failed to write profile: {}", p.display())),
        None => {
            print!("{}", content);
            Ok(())
        }
    }
}

#[cfg(test)]
impl Profile {
    /// 键存在且不为 null
    pub fn has(&self, key: &str) -> bool {
        self.get(key).map(|v| !v.is_null()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_and_json_parse_to_the_same_profile() {
        let yaml = parse("proxies:\n  - name: HK-01\n    type: ss\n", ProfileFormat::Yaml).unwrap();
        let json = parse(
            r#"{"proxies": [{"name": "HK-01", "type": "ss"}]}"#,
            ProfileFormat::Json,
        )
        .unwrap();
        assert_eq!(yaml, json);
        assert_eq!(yaml.proxy_names(), vec!["HK-01".to_string()]);
    }

    #[test]
    fn non_mapping_root_is_rejected() {
        let err = parse("- a\n- b\n", ProfileFormat::Yaml).unwrap_err();
        assert!(format!("{err:#}").contains("must be a mapping"));
    }

    #[test]
    fn empty_document_is_an_empty_profile() {
        let profile = parse("", ProfileFormat::Yaml).unwrap();
        assert!(profile.as_mapping().is_empty());
    }

    #[test]
    fn set_keeps_existing_key_position() {
        let mut profile = parse("a: 1\nb: 2\n", ProfileFormat::Yaml).unwrap();
        profile.set("a", Value::from(10));
        profile.set("c", Value::from(3));
        let keys: Vec<&str> = profile
            .as_mapping()
            .keys()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(profile.get("a"), Some(&Value::from(10)));
    }

    #[test]
    fn list_mut_creates_missing_sections() {
        let mut profile = Profile::default();
        profile.list_mut("dns", "fake-ip-filter").push(Value::from("x"));
        let filter = profile
            .get("dns")
            .and_then(|d| d.get("fake-ip-filter"))
            .and_then(Value::as_sequence)
            .unwrap();
        assert_eq!(filter, &vec![Value::from("x")]);
    }

    #[test]
    fn proxy_names_skip_entries_without_name() {
        let profile = parse(
            "proxies:\n  - name: A\n  - type: ss\n  - name: B\n",
            ProfileFormat::Yaml,
        )
        .unwrap();
        assert_eq!(profile.proxy_names(), vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn read_and_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("profile.json");
        std::fs::write(&input, r#"{"proxies": [{"name": "JP-1"}]}"#).unwrap();

        let profile = read(Some(&input), None).unwrap();
        assert_eq!(profile.proxy_names(), vec!["JP-1".to_string()]);

        let output = dir.path().join("out.yaml");
        write(&profile, Some(&output), ProfileFormat::Yaml).unwrap();
        let reread = read(Some(&output), None).unwrap();
        assert_eq!(reread, profile);
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(
            ProfileFormat::from_path(Path::new("a/config.YML")),
            Some(ProfileFormat::Yaml)
        );
        assert_eq!(
            ProfileFormat::from_path(Path::new("config.json")),
            Some(ProfileFormat::Json)
        );
        assert_eq!(ProfileFormat::from_path(Path::new("config")), None);
    }
}

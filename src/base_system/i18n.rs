//! 界面文本翻译表。
//!
//! 内置 `zh_cn` / `en_us` 两套文本；数据目录下的 `locales/<lang>.json` 可以覆盖内置文本。

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

pub const DEFAULT_LANGUAGE: &str = "zh_cn";
pub const LANGUAGES: [(&str, &str); 2] = [("zh_cn", "简体中文"), ("en_us", "English")];

const BUILTIN_ZH_CN: &str = include_str!("../../locales/zh_cn.json");
const BUILTIN_EN_US: &str = include_str!("../../locales/en_us.json");

#[derive(Debug, Clone)]
pub struct Translator {
    language: String,
    table: HashMap<String, String>,
}

impl Translator {
    /// 加载内置翻译表；未知语言回落到 `zh_cn`。
    pub fn new(language: &str) -> Self {
        let (language, raw) = match language {
            "en_us" => ("en_us", BUILTIN_EN_US),
            "zh_cn" => ("zh_cn", BUILTIN_ZH_CN),
            other => {
                warn!("未知语言 '{}'，使用默认语言 {}", other, DEFAULT_LANGUAGE);
                (DEFAULT_LANGUAGE, BUILTIN_ZH_CN)
            }
        };
        let table = serde_json::from_str(raw).unwrap_or_else(|err| {
            warn!("内置语言表解析失败: {err}");
            HashMap::new()
        });
        Self {
            language: language.to_string(),
            table,
        }
    }

    /// 加载内置表后，再用 `base_dir/locales/<lang>.json` 覆盖（存在时）。
    pub fn load(language: &str, base_dir: Option<&Path>) -> Self {
        let mut translator = Self::new(language);
        let locale_file = base_dir
            .map(|d| d.join("locales"))
            .unwrap_or_else(|| Path::new("locales").to_path_buf())
            .join(format!("{}.json", translator.language));

        if !locale_file.exists() {
            debug!("未找到语言覆盖文件: {}", locale_file.display());
            return translator;
        }

        match fs::read_to_string(&locale_file)
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                serde_json::from_str::<HashMap<String, String>>(&raw).map_err(|e| e.to_string())
            }) {
            Ok(overrides) => {
                info!("加载语言文件: {}", locale_file.display());
                translator.table.extend(overrides);
            }
            Err(err) => warn!("加载语言文件失败 {}: {}", locale_file.display(), err),
        }
        translator
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// 取文本；缺失的 key 原样返回。
    pub fn tr(&self, key: &str) -> String {
        self.table
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// 取文本并替换 `{name}` 占位符。
    pub fn tr_args(&self, key: &str, args: &[(&str, &str)]) -> String {
        let mut text = self.tr(key);
        for (name, value) in args {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        text
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_share_keys() {
        let zh: HashMap<String, String> = serde_json::from_str(BUILTIN_ZH_CN).unwrap();
        let en: HashMap<String, String> = serde_json::from_str(BUILTIN_EN_US).unwrap();
        let mut zh_keys: Vec<_> = zh.keys().collect();
        let mut en_keys: Vec<_> = en.keys().collect();
        zh_keys.sort();
        en_keys.sort();
        assert_eq!(zh_keys, en_keys);
    }

    #[test]
    fn substitutes_placeholders() {
        let t = Translator::new("en_us");
        assert_eq!(
            t.tr_args("batch_success", &[("success", "2"), ("total", "3")]),
            "Batch finished! Succeeded: 2/3"
        );
    }

    #[test]
    fn unknown_language_falls_back() {
        let t = Translator::new("xx_yy");
        assert_eq!(t.language(), "zh_cn");
        assert_eq!(t.tr("bye"), "已退出。");
    }

    #[test]
    fn missing_key_returns_key() {
        assert_eq!(Translator::default().tr("no_such_key"), "no_such_key");
    }

    #[test]
    fn locale_file_overrides_builtin() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("locales")).unwrap();
        fs::write(
            dir.path().join("locales").join("en_us.json"),
            r#"{"bye": "See you."}"#,
        )
        .unwrap();

        let t = Translator::load("en_us", Some(dir.path()));
        assert_eq!(t.tr("bye"), "See you.");
        assert_eq!(t.tr("yes"), "yes");
    }
}

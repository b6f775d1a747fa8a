//! 设置菜单。
//!
//! 每次修改立即写回 `config.yml`；切换语言后返回 [`CliExit::Restart`]。

use std::io::{BufRead, Write};

use anyhow::Result;
use tracing::info;

use super::{CliExit, Session, read_line};
use crate::base_system::context::{Config, OutputFormat};
use crate::base_system::i18n::LANGUAGES;

#[derive(Debug, Clone, Copy)]
enum ConfigValueType {
    Bool,
    String,
    Selection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigField {
    SavePath,
    FileFormat,
    OpenAfterDownload,
    Language,
    PaginateSeriesContent,
}

#[derive(Debug, Clone, Copy)]
struct ConfigOption {
    /// 翻译键
    name: &'static str,
    field: ConfigField,
    ty: ConfigValueType,
}

const OPTS: &[ConfigOption] = &[
    ConfigOption {
        name: "settings_save_path",
        field: ConfigField::SavePath,
        ty: ConfigValueType::String,
    },
    ConfigOption {
        name: "settings_format",
        field: ConfigField::FileFormat,
        ty: ConfigValueType::Selection,
    },
    ConfigOption {
        name: "settings_open_folder",
        field: ConfigField::OpenAfterDownload,
        ty: ConfigValueType::Bool,
    },
    ConfigOption {
        name: "settings_language",
        field: ConfigField::Language,
        ty: ConfigValueType::Selection,
    },
    ConfigOption {
        name: "settings_paginate",
        field: ConfigField::PaginateSeriesContent,
        ty: ConfigValueType::Bool,
    },
];

pub(super) fn show_settings_menu<R: BufRead, W: Write>(
    session: &mut Session<'_>,
    input: &mut R,
    out: &mut W,
) -> Result<CliExit> {
    loop {
        writeln!(out, "\n{}", session.t("settings_title"))?;
        for (idx, opt) in OPTS.iter().enumerate() {
            writeln!(
                out,
                "{}. {}: {}",
                idx + 1,
                session.t(opt.name),
                value_display(session, opt.field)
            )?;
        }
        writeln!(out, "0. {}", session.t("settings_back"))?;

        let Some(choice) = read_line(input, out, &session.t("settings_choose"))? else {
            return Ok(CliExit::Quit);
        };
        let choice = choice.trim();
        if choice == "0" || choice.is_empty() {
            writeln!(out)?;
            return Ok(CliExit::Quit);
        }
        let Some(opt) = choice
            .parse::<usize>()
            .ok()
            .filter(|idx| (1..=OPTS.len()).contains(idx))
            .map(|idx| OPTS[idx - 1])
        else {
            writeln!(out, "{}", session.t("invalid_choice"))?;
            continue;
        };

        let changed = match opt.ty {
            ConfigValueType::Bool => {
                toggle(session.config, opt.field);
                true
            }
            ConfigValueType::String => {
                let Some(text) = read_line(input, out, &session.t("settings_new_value"))? else {
                    continue;
                };
                let text = text.trim();
                if text.is_empty() {
                    false
                } else {
                    session.config.save_path = text.to_string();
                    true
                }
            }
            ConfigValueType::Selection => {
                let choices = selection_choices(opt.field);
                for (idx, (_, label)) in choices.iter().enumerate() {
                    writeln!(out, "  {}. {}", idx + 1, label)?;
                }
                let Some(text) = read_line(input, out, &session.t("settings_choose"))? else {
                    continue;
                };
                match text
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|idx| idx.checked_sub(1))
                    .and_then(|idx| choices.get(idx))
                {
                    Some((value, _)) => apply_selection(session.config, opt.field, value),
                    None => {
                        writeln!(out, "{}", session.t("invalid_choice"))?;
                        false
                    }
                }
            }
        };
        if !changed {
            continue;
        }

        session.persist();
        info!(
            "设置已更新: {:?} = {}",
            opt.field,
            value_display(session, opt.field)
        );
        if opt.field == ConfigField::Language {
            writeln!(out, "{}", session.t("restart_required"))?;
            return Ok(CliExit::Restart);
        }
        writeln!(out, "{}", session.t("settings_saved"))?;
    }
}

fn value_display(session: &Session<'_>, field: ConfigField) -> String {
    let config = &*session.config;
    let flag = |v: bool| session.t(if v { "yes" } else { "no" });
    match field {
        ConfigField::SavePath => config.default_save_dir().display().to_string(),
        ConfigField::FileFormat => config.file_format.label().to_string(),
        ConfigField::OpenAfterDownload => flag(config.open_after_download),
        ConfigField::Language => LANGUAGES
            .iter()
            .find(|(code, _)| *code == config.language)
            .map(|(_, label)| label.to_string())
            .unwrap_or_else(|| config.language.clone()),
        ConfigField::PaginateSeriesContent => flag(config.paginate_series_content),
    }
}

fn toggle(config: &mut Config, field: ConfigField) {
    match field {
        ConfigField::OpenAfterDownload => config.open_after_download = !config.open_after_download,
        ConfigField::PaginateSeriesContent => {
            config.paginate_series_content = !config.paginate_series_content
        }
        _ => {}
    }
}

/// (取值, 显示名)
fn selection_choices(field: ConfigField) -> Vec<(String, String)> {
    match field {
        ConfigField::FileFormat => OutputFormat::ALL
            .iter()
            .map(|f| (f.to_string(), f.label().to_string()))
            .collect(),
        ConfigField::Language => LANGUAGES
            .iter()
            .map(|(code, label)| (code.to_string(), label.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

/// 返回值是否真的发生了变化。
fn apply_selection(config: &mut Config, field: ConfigField, value: &str) -> bool {
    match field {
        ConfigField::FileFormat => match value.parse::<OutputFormat>() {
            Ok(format) if format != config.file_format => {
                config.file_format = format;
                true
            }
            _ => false,
        },
        ConfigField::Language if value != config.language => {
            config.language = value.to_string();
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base_system::config::load_from_path;
    use crate::base_system::i18n::Translator;
    use std::io::Cursor;

    fn run(config: &mut Config, dir: &std::path::Path, script: &str) -> (CliExit, String) {
        let mut session = Session::new(config, dir.join("config.yml"), Translator::new("en_us"));
        let mut out = Vec::new();
        let exit = show_settings_menu(&mut session, &mut Cursor::new(script), &mut out).unwrap();
        (exit, String::from_utf8(out).unwrap())
    }

    #[test]
    fn toggles_and_format_are_saved() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        // 3: 打开目录开关；2 → 3: 格式选 Markdown；0: 返回
        let (exit, text) = run(&mut config, dir.path(), "3\n2\n3\n0\n");
        assert_eq!(exit, CliExit::Quit);
        assert!(text.contains("Settings saved"));
        assert!(!config.open_after_download);
        assert_eq!(config.file_format, OutputFormat::Markdown);

        let on_disk: Config = load_from_path(&dir.path().join("config.yml")).unwrap();
        assert!(!on_disk.open_after_download);
        assert_eq!(on_disk.file_format, OutputFormat::Markdown);
    }

    #[test]
    fn save_path_blank_keeps_current() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        run(&mut config, dir.path(), "1\n\n0\n");
        assert_eq!(config.save_path, "downloads");
        run(&mut config, dir.path(), "1\n/tmp/novels\n0\n");
        assert_eq!(config.save_path, "/tmp/novels");
    }

    #[test]
    fn language_change_requests_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        let (exit, text) = run(&mut config, dir.path(), "4\n2\n");
        assert_eq!(exit, CliExit::Restart);
        assert!(text.contains("restarting"));
        assert_eq!(config.language, "en_us");

        let on_disk: Config = load_from_path(&dir.path().join("config.yml")).unwrap();
        assert_eq!(on_disk.language, "en_us");
    }

    #[test]
    fn same_language_is_not_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        let (exit, _) = run(&mut config, dir.path(), "4\n1\n0\n");
        assert_eq!(exit, CliExit::Quit);
    }

    #[test]
    fn out_of_range_choice_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        let (_, text) = run(&mut config, dir.path(), "9\nx\n0\n");
        assert_eq!(text.matches("Invalid choice").count(), 2);
    }
}

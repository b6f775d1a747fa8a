//! 命令行交互入口。
//!
//! 主页输入 ID/链接直接下载；`b` 批量、`h` 下载记录、`c` 清空记录、`s` 设置、`q` 退出。

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use tracing::{error, info};

use crate::base_system::config::{load_from_path, save_config};
use crate::base_system::context::Config;
use crate::base_system::i18n::Translator;

mod config;
mod download;
mod history;

/// 交互结束的原因；`Restart` 交由 main 重新加载配置后再进入。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliExit {
    Quit,
    Restart,
}

pub struct Session<'a> {
    pub(crate) config: &'a mut Config,
    config_path: PathBuf,
    pub(crate) translator: Translator,
    /// 命令行覆盖了部分设置时，保存只回写下载记录。
    transient_overrides: bool,
}

impl<'a> Session<'a> {
    pub fn new(config: &'a mut Config, config_path: PathBuf, translator: Translator) -> Self {
        Self {
            config,
            config_path,
            translator,
            transient_overrides: false,
        }
    }

    pub fn with_transient_overrides(mut self, transient: bool) -> Self {
        self.transient_overrides = transient;
        self
    }

    pub(crate) fn t(&self, key: &str) -> String {
        self.translator.tr(key)
    }

    /// 把偏好设置写回磁盘；失败只记录日志。
    pub(crate) fn persist(&self) {
        let result = if self.transient_overrides {
            load_from_path::<Config>(&self.config_path).and_then(|mut on_disk| {
                on_disk.download_history = self.config.download_history.clone();
                save_config(&on_disk, &self.config_path)
            })
        } else {
            save_config(&*self.config, &self.config_path)
        };
        if let Err(err) = result {
            error!("保存设置失败 {}: {}", self.config_path.display(), err);
        }
    }
}

pub fn run(session: &mut Session<'_>) -> Result<CliExit> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();
    run_with(session, &mut input, &mut out)
}

pub(crate) fn run_with<R: BufRead, W: Write>(
    session: &mut Session<'_>,
    input: &mut R,
    out: &mut W,
) -> Result<CliExit> {
    writeln!(
        out,
        "{}\n",
        session
            .translator
            .tr_args("welcome", &[("version", env!("CARGO_PKG_VERSION"))])
    )?;

    loop {
        let dir = session.config.default_save_dir();
        let prompt = session
            .translator
            .tr_args("home_prompt", &[("dir", dir.display().to_string().as_str())]);
        let Some(line) = read_line(input, out, &prompt)? else {
            writeln!(out)?;
            return Ok(CliExit::Quit);
        };
        let text = line.trim();

        match text {
            "" => writeln!(out, "{}", session.t("input_empty"))?,
            "q" | "Q" => {
                writeln!(out, "{}", session.t("bye"))?;
                return Ok(CliExit::Quit);
            }
            "b" | "B" => {
                writeln!(out, "{}", session.t("batch_prompt"))?;
                let block = read_block(input)?;
                download::run_batch(session, &block, out)?;
            }
            "h" | "H" => history::show(session, out)?,
            "c" | "C" => history::clear(session, input, out)?,
            "s" | "S" => {
                if config::show_settings_menu(session, input, out)? == CliExit::Restart {
                    info!("语言已切换为 {}，请求重启", session.config.language);
                    return Ok(CliExit::Restart);
                }
            }
            _ => {
                download::run_single(session, text, out)?;
            }
        }
    }
}

/// 非交互模式：单行走单本/系列下载，多行走批量。返回是否全部成功。
pub fn run_once(session: &mut Session<'_>, text: &str) -> Result<bool> {
    let mut out = io::stdout();
    let lines = text.lines().filter(|l| !l.trim().is_empty()).count();
    if lines == 1 {
        download::run_single(session, text.trim(), &mut out)
    } else {
        download::run_batch(session, text, &mut out)
    }
}

/// 读取一行；EOF 时返回 `None`。
pub(crate) fn read_line<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    prompt: &str,
) -> Result<Option<String>> {
    write!(out, "{}", prompt)?;
    out.flush().ok();
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

/// 连续读取多行，遇到空行或 EOF 结束。
fn read_block<R: BufRead>(input: &mut R) -> Result<String> {
    let mut block = String::new();
    loop {
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 || line.trim().is_empty() {
            break;
        }
        block.push_str(&line);
    }
    Ok(block)
}

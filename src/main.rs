//! Pixiv Novel Downloader（Pixiv 小说下载器）。
//!
//! 代码结构（读代码入口）：
//! - `base_system`：配置/日志/多语言/下载记录/ID 解析等基础设施
//! - `network_parser`：Pixiv Ajax 接口访问与响应解析
//! - `download`：单本/系列/批量下载编排与文件导出
//! - `ui`：命令行交互

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::info;

mod base_system;
mod download;
mod network_parser;
mod ui;

use base_system::config::{config_path, load_or_create_with_base};
use base_system::context::{Config, OutputFormat};
use base_system::i18n::Translator;
use base_system::logging::{LogOptions, LogSystem};
use ui::noui::{CliExit, Session};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "pixiv-novel-downloader")]
#[command(about = "Pixiv Novel Downloader (CLI)")]
struct Cli {
    /// 启用调试日志输出
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// 显示版本信息后退出
    #[arg(long, default_value_t = false)]
    version: bool,

    /// 数据目录路径（存放 config.yml、logs 和 locales 覆盖文件）
    #[arg(long)]
    data_dir: Option<String>,

    /// 本次运行的保存目录（不写回配置）
    #[arg(long)]
    save_dir: Option<String>,

    /// 本次运行的文件格式：txt / html / markdown（不写回配置）
    #[arg(long)]
    format: Option<OutputFormat>,

    /// 从文件读取批量下载列表（每行一个 ID/链接）
    #[arg(long)]
    batch_file: Option<PathBuf>,

    /// 小说/系列 ID 或链接；给出时直接下载后退出
    inputs: Vec<String>,
}

impl Cli {
    fn has_overrides(&self) -> bool {
        self.save_dir.is_some() || self.format.is_some()
    }

    /// 非交互模式下要处理的全部输入行。
    fn batch_text(&self) -> Result<Option<String>> {
        let mut lines = self.inputs.clone();
        if let Some(path) = &self.batch_file {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("读取批量文件失败: {}", path.display()))?;
            lines.extend(raw.lines().map(str::to_string));
        }
        if lines.is_empty() {
            return Ok(None);
        }
        Ok(Some(lines.join("\n")))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("Pixiv Novel Downloader v{}", VERSION);
        return Ok(());
    }

    let data_dir = cli.data_dir.as_deref().map(Path::new);
    let _log = init_logging(cli.debug, data_dir)?;

    let cfg_path = config_path::<Config>(data_dir);

    if let Some(text) = cli.batch_text()? {
        let mut config = load_config(data_dir)?;
        if let Some(dir) = &cli.save_dir {
            config.save_path = dir.clone();
        }
        if let Some(format) = cli.format {
            config.file_format = format;
        }
        let translator = Translator::load(&config.language, data_dir);
        let mut session = Session::new(&mut config, cfg_path.clone(), translator)
            .with_transient_overrides(cli.has_overrides());
        if ui::noui::run_once(&mut session, &text)? {
            return Ok(());
        }
        return Err(anyhow!("部分内容下载失败，详见日志"));
    }

    supervise(|| {
        // 每次进入都从磁盘重新加载，语言等设置随之生效
        let mut config = load_config(data_dir)?;
        let translator = Translator::load(&config.language, data_dir);
        info!("界面语言: {}", translator.language());
        let mut session = Session::new(&mut config, cfg_path.clone(), translator);
        ui::noui::run(&mut session)
    })?;
    Ok(())
}

/// 反复进入交互界面直到用户退出；返回重启次数。
fn supervise(mut enter: impl FnMut() -> Result<CliExit>) -> Result<usize> {
    let mut restarts = 0;
    loop {
        match enter()? {
            CliExit::Quit => return Ok(restarts),
            CliExit::Restart => {
                restarts += 1;
                info!("重新加载配置并重启界面 (第 {} 次)", restarts);
            }
        }
    }
}

fn load_config(data_dir: Option<&Path>) -> Result<Config> {
    load_or_create_with_base::<Config>(data_dir).map_err(|e| anyhow!(e.to_string()))
}

fn init_logging(debug: bool, base_dir: Option<&Path>) -> Result<LogSystem> {
    let opts = LogOptions {
        debug,
        use_color: true,
        archive_on_exit: true,
        console: true,
    };
    LogSystem::init_with_base(opts, base_dir).map_err(|e| anyhow!(e))
}

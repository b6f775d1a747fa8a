use std::io::Write;

use anyhow::Result;
use tracing::{error, info, warn};

use super::Session;
use crate::base_system::content_id::ResolveError;
use crate::base_system::i18n::Translator;
use crate::download::models::{ItemFailure, ResolveFailure};
use crate::download::{
    BatchReport, DownloadError, DownloadEvent, Downloader, ItemOutcome, ProgressReporter,
};
use crate::network_parser::FetchError;

/// 下载单个 ID/链接；返回是否成功（系列需全部成员成功）。
pub(super) fn run_single<W: Write>(
    session: &mut Session<'_>,
    input: &str,
    out: &mut W,
) -> Result<bool> {
    let translator = session.translator.clone();
    let result = Downloader::from_config(&mut *session.config).and_then(|downloader| {
        let mut downloader = downloader
            .with_translator(translator.clone())
            .with_progress(ProgressReporter::with_cli_bar());
        downloader.on_event(print_events(&translator));
        downloader.download_input(input)
    });
    session.persist();
    report_single(&translator, &result, out)
}

/// 批量下载；返回是否全部成功。
pub(super) fn run_batch<W: Write>(
    session: &mut Session<'_>,
    text: &str,
    out: &mut W,
) -> Result<bool> {
    let translator = session.translator.clone();
    let result = Downloader::from_config(&mut *session.config).and_then(|downloader| {
        let mut downloader = downloader
            .with_translator(translator.clone())
            .with_progress(ProgressReporter::with_cli_bar());
        downloader.on_event(print_events(&translator));
        downloader.download_batch(text)
    });
    session.persist();
    report_batch(&translator, &result, out)
}

/// 下载过程中逐条打印进度事件。
fn print_events(translator: &Translator) -> impl FnMut(&DownloadEvent) + Send + 'static {
    let t = translator.clone();
    move |event| {
        println!("{}", event_line(&t, event));
    }
}

/// 把一个进度事件翻译成一行输出。
fn event_line(t: &Translator, event: &DownloadEvent) -> String {
    match event {
        DownloadEvent::NovelStarted { id } => t.tr_args("getting_info", &[("id", id.as_str())]),
        DownloadEvent::SeriesStarted { id } => t.tr_args("series_info", &[("id", id.as_str())]),
        DownloadEvent::SeriesResolved {
            id,
            title,
            total,
            source,
        } => {
            let (total, source) = (total.to_string(), source.to_string());
            t.tr_args(
                "series_progress",
                &[
                    ("id", id.as_str()),
                    ("title", title.as_str()),
                    ("total", total.as_str()),
                    ("source", source.as_str()),
                ],
            )
        }
        DownloadEvent::NovelSaved { id, title, path } => {
            let path = path.display().to_string();
            t.tr_args(
                "saved_item",
                &[
                    ("id", id.as_str()),
                    ("title", title.as_str()),
                    ("path", path.as_str()),
                ],
            )
        }
        DownloadEvent::InputRejected(failure) => format!("  {}", rejected_line(t, failure)),
        DownloadEvent::ItemStarted { current, total, id } => {
            let (current, total) = (current.to_string(), total.to_string());
            t.tr_args(
                "batch_progress",
                &[
                    ("current", current.as_str()),
                    ("total", total.as_str()),
                    ("id", id.as_str()),
                ],
            )
        }
        DownloadEvent::ItemFailed { current, total, id } => {
            let (current, total) = (current.to_string(), total.to_string());
            t.tr_args(
                "item_failed",
                &[
                    ("current", current.as_str()),
                    ("total", total.as_str()),
                    ("id", id.as_str()),
                ],
            )
        }
        DownloadEvent::Finished { success, total } => {
            let (success, total) = (success.to_string(), total.to_string());
            t.tr_args(
                "batch_success",
                &[("success", success.as_str()), ("total", total.as_str())],
            )
        }
    }
}

fn report_single<W: Write>(
    t: &Translator,
    result: &Result<ItemOutcome, DownloadError>,
    out: &mut W,
) -> Result<bool> {
    match result {
        Ok(outcome) => {
            log_outcome(outcome);
            match outcome {
                ItemOutcome::Novel(report) => {
                    let path = report.path.display().to_string();
                    writeln!(
                        out,
                        "{}\n",
                        t.tr_args(
                            "download_success",
                            &[("title", report.title.as_str()), ("path", path.as_str())]
                        )
                    )?;
                    Ok(true)
                }
                ItemOutcome::Series(report) => {
                    let (success, total) = (report.success.to_string(), report.total.to_string());
                    writeln!(
                        out,
                        "{}",
                        t.tr_args(
                            "series_completed",
                            &[
                                ("title", report.title.as_str()),
                                ("success", success.as_str()),
                                ("total", total.as_str())
                            ]
                        )
                    )?;
                    write_failures(t, &report.failures, out)?;
                    writeln!(out)?;
                    Ok(report.failures.is_empty())
                }
            }
        }
        Err(err) => {
            error!("下载失败: {}", err);
            writeln!(
                out,
                "{}: {}\n",
                t.tr("download_failed"),
                describe_error(t, err)
            )?;
            Ok(false)
        }
    }
}

/// 批量的成功数和被拒的行已随事件打印，这里只汇总失败原因。
fn report_batch<W: Write>(
    t: &Translator,
    result: &Result<BatchReport, DownloadError>,
    out: &mut W,
) -> Result<bool> {
    let report = match result {
        Ok(report) => report,
        Err(DownloadError::NoValidIds { failures }) => {
            warn!("批量输入的 {} 行均无法解析", failures.len());
            writeln!(out, "{}\n", t.tr("no_valid_ids"))?;
            return Ok(false);
        }
        Err(DownloadError::EmptyInput) => {
            writeln!(out, "{}\n", t.tr("batch_input_empty"))?;
            return Ok(false);
        }
        Err(err) => {
            error!("批量下载失败: {}", err);
            writeln!(
                out,
                "{}: {}\n",
                t.tr("download_failed"),
                describe_error(t, err)
            )?;
            return Ok(false);
        }
    };

    report.outcomes.iter().for_each(log_outcome);
    if !report.resolve_errors.is_empty() {
        let count = report.resolve_errors.len().to_string();
        writeln!(out, "{}", t.tr_args("invalid_input", &[("count", count.as_str())]))?;
    }
    write_failures(t, &report.failures, out)?;
    writeln!(out)?;
    Ok(report.failures.is_empty() && report.resolve_errors.is_empty())
}

fn log_outcome(outcome: &ItemOutcome) {
    match outcome {
        ItemOutcome::Novel(report) => {
            info!("小说 {} 已保存: {}", report.id, report.path.display());
        }
        ItemOutcome::Series(report) => info!(
            "系列 {} 已保存到 {}（来源: {}）",
            report.id,
            report.dir.display(),
            report.source
        ),
    }
}

fn write_failures<W: Write>(t: &Translator, failures: &[ItemFailure], out: &mut W) -> Result<()> {
    for failure in failures {
        writeln!(
            out,
            "{}",
            t.tr_args(
                "failed_item",
                &[("id", failure.id.as_str()), ("message", failure.message.as_str())]
            )
        )?;
    }
    Ok(())
}

fn rejected_line(t: &Translator, failure: &ResolveFailure) -> String {
    let line = failure.line.to_string();
    let message = describe_resolve(t, &failure.error);
    t.tr_args(
        "line_error",
        &[("line", line.as_str()), ("message", message.as_str())],
    )
}

fn describe_resolve(t: &Translator, err: &ResolveError) -> String {
    match err {
        ResolveError::UnrecognizedInput { input } => {
            t.tr_args("extract_error", &[("input", input.as_str())])
        }
        ResolveError::InvalidId { id } => t.tr_args("invalid_id", &[("id", id.as_str())]),
    }
}

/// 把下载错误翻译成面向用户的一句话。
pub(super) fn describe_error(t: &Translator, err: &DownloadError) -> String {
    match err {
        DownloadError::Resolve(inner) => describe_resolve(t, inner),
        DownloadError::Fetch(FetchError::NotFound { id }) => {
            t.tr_args("novel_not_found", &[("id", id.as_str())])
        }
        DownloadError::Fetch(FetchError::SeriesNotFound { id }) => {
            t.tr_args("series_not_found", &[("id", id.as_str())])
        }
        DownloadError::Fetch(FetchError::MalformedResponse { .. }) => t.tr("invalid_response"),
        DownloadError::Fetch(FetchError::ApiError { message }) if message.is_empty() => {
            t.tr("api_error")
        }
        DownloadError::Fetch(FetchError::ApiError { message }) => {
            format!("{}: {}", t.tr("api_error"), message)
        }
        DownloadError::Fetch(FetchError::Status { status, .. }) => {
            t.tr_args("http_status", &[("status", status.to_string().as_str())])
        }
        DownloadError::Fetch(FetchError::Transport(inner)) => {
            t.tr_args("network_error", &[("detail", inner.to_string().as_str())])
        }
        DownloadError::EmptySeries { title, .. } => {
            t.tr_args("empty_series", &[("title", title.as_str())])
        }
        DownloadError::EmptyInput => t.tr("input_empty"),
        DownloadError::NoValidIds { .. } => t.tr("no_valid_ids"),
        DownloadError::Io { path, .. } => {
            t.tr_args("io_error", &[("path", path.display().to_string().as_str())])
        }
    }
}

//! 下载主流程：单本、系列、批量。
//!
//! 全部请求按顺序同步执行；系列与批量中的单项失败只记录，不中断后续条目。

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use super::format::{file_stem, output_path, render, write_file};
use super::models::{
    BatchReport, DownloadError, DownloadEvent, ItemFailure, ItemOutcome, NovelReport,
    ResolveFailure, SeriesReport,
};
use super::progress::ProgressReporter;
use super::reveal::reveal;
use super::series::resolve_members;
use crate::base_system::content_id::{
    ContentKind, ContentReference, resolve_content_id, validate_id,
};
use crate::base_system::context::Config;
use crate::base_system::i18n::Translator;
use crate::network_parser::{AjaxClient, ReqwestTransport, Transport};

pub struct Downloader<'a, T: Transport = ReqwestTransport> {
    client: AjaxClient<T>,
    config: &'a mut Config,
    translator: Translator,
    progress: ProgressReporter,
}

impl<'a> Downloader<'a, ReqwestTransport> {
    pub fn from_config(config: &'a mut Config) -> Result<Self, DownloadError> {
        let client = AjaxClient::from_config(config)?;
        Ok(Self::new(client, config))
    }
}

impl<'a, T: Transport> Downloader<'a, T> {
    pub fn new(client: AjaxClient<T>, config: &'a mut Config) -> Self {
        let translator = Translator::new(&config.language);
        Self {
            client,
            config,
            translator,
            progress: ProgressReporter::silent(),
        }
    }

    pub fn with_translator(mut self, translator: Translator) -> Self {
        self.translator = translator;
        self
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// 注册事件回调（界面据此刷新进度）。
    pub fn on_event(&mut self, cb: impl FnMut(&DownloadEvent) + Send + 'static) {
        self.progress.set_callback(cb);
    }

    #[cfg(test)]
    pub fn client(&self) -> &AjaxClient<T> {
        &self.client
    }

    /// 解析一行输入并下载。
    pub fn download_input(&mut self, input: &str) -> Result<ItemOutcome, DownloadError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(DownloadError::EmptyInput);
        }
        let reference = resolve_content_id(trimmed).inspect_err(|err| warn!("{}", err))?;
        info!("开始下载: 类型 '{}', ID '{}'", reference.kind(), reference.id());
        self.download(&reference)
    }

    pub fn download(&mut self, reference: &ContentReference) -> Result<ItemOutcome, DownloadError> {
        match reference.kind() {
            ContentKind::Novel => self.download_novel(reference.id()).map(ItemOutcome::Novel),
            ContentKind::Series => self.download_series(reference.id()).map(ItemOutcome::Series),
        }
    }

    /// 下载单本小说到保存目录。
    pub fn download_novel(&mut self, novel_id: &str) -> Result<NovelReport, DownloadError> {
        let save_dir = self.config.default_save_dir();
        let report = self.save_novel(novel_id, &save_dir)?;
        self.reveal_if_enabled(&report.path);
        Ok(report)
    }

    /// 下载整个系列到 `<保存目录>/<系列名>/`。
    pub fn download_series(&mut self, series_id: &str) -> Result<SeriesReport, DownloadError> {
        let report = self.save_series(series_id)?;
        self.reveal_if_enabled(&report.dir);
        Ok(report)
    }

    /// 批量下载：每个非空行一个条目。无法解析的行单独报告，不计入总数。
    pub fn download_batch(&mut self, text: &str) -> Result<BatchReport, DownloadError> {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        if lines.is_empty() {
            warn!("批量下载输入为空");
            return Err(DownloadError::EmptyInput);
        }
        info!("解析到 {} 个输入项", lines.len());

        let mut report = BatchReport::default();
        let mut references = Vec::new();
        for (idx, line) in lines.iter().enumerate() {
            match resolve_content_id(line) {
                Ok(r) => references.push(r),
                Err(error) => {
                    let failure = ResolveFailure {
                        line: idx + 1,
                        input: line.to_string(),
                        error,
                    };
                    warn!("无法解析 '{}' ({})", failure.input, failure);
                    self.progress
                        .emit(DownloadEvent::InputRejected(failure.clone()));
                    report.resolve_errors.push(failure);
                }
            }
        }

        if references.is_empty() {
            warn!("批量下载中没有找到有效的内容ID");
            return Err(DownloadError::NoValidIds {
                failures: report.resolve_errors,
            });
        }

        let total = references.len();
        report.attempted = total;
        info!("开始批量下载 {} 个项目", total);

        self.progress.begin_loop(total);
        for (idx, reference) in references.iter().enumerate() {
            let current = idx + 1;
            self.progress.emit(DownloadEvent::ItemStarted {
                current,
                total,
                id: reference.id().to_string(),
            });
            info!(
                "下载项目 {}/{}: 类型 '{}', ID '{}'",
                current,
                total,
                reference.kind(),
                reference.id()
            );

            let outcome = match reference.kind() {
                ContentKind::Novel => {
                    let save_dir = self.config.default_save_dir();
                    self.save_novel(reference.id(), &save_dir)
                        .map(ItemOutcome::Novel)
                }
                ContentKind::Series => self.save_series(reference.id()).map(ItemOutcome::Series),
            };

            match outcome {
                Ok(outcome) => {
                    report.success += 1;
                    report.outcomes.push(outcome);
                    info!("项目 {}/{} 下载成功", current, total);
                }
                Err(err) => {
                    error!("内容 {} 下载失败: {}", reference, err);
                    self.progress.emit(DownloadEvent::ItemFailed {
                        current,
                        total,
                        id: reference.id().to_string(),
                    });
                    report.failures.push(ItemFailure {
                        id: reference.id().to_string(),
                        message: err.to_string(),
                    });
                }
            }
            self.progress.step_done();
        }
        self.progress.end_loop();

        self.progress.emit(DownloadEvent::Finished {
            success: report.success,
            total,
        });
        info!("批量下载完成! 成功: {}", report.tally());

        if report.success > 0 {
            let save_dir = self.config.default_save_dir();
            self.reveal_if_enabled(&save_dir);
        }
        Ok(report)
    }

    fn save_novel(&mut self, novel_id: &str, dir: &Path) -> Result<NovelReport, DownloadError> {
        validate_id(novel_id).inspect_err(|err| error!("{}", err))?;
        info!("开始下载单本小说: ID {}", novel_id);
        self.progress.emit(DownloadEvent::NovelStarted {
            id: novel_id.to_string(),
        });

        let novel = self.client.fetch_novel(novel_id)?;

        let format = self.config.file_format;
        let content = render(&novel, format);
        let path = output_path(dir, &novel.title, &novel.id, format);
        write_file(&path, &content).map_err(|source| {
            error!("写入文件失败 {}: {}", path.display(), source);
            DownloadError::Io {
                path: path.clone(),
                source,
            }
        })?;
        info!("小说保存成功: {}", path.display());

        self.record_history(&novel.title);
        self.progress.emit(DownloadEvent::NovelSaved {
            id: novel.id.clone(),
            title: novel.title.clone(),
            path: path.clone(),
        });

        Ok(NovelReport {
            id: novel.id,
            title: novel.title,
            path,
        })
    }

    fn save_series(&mut self, series_id: &str) -> Result<SeriesReport, DownloadError> {
        validate_id(series_id).inspect_err(|err| error!("{}", err))?;
        info!("开始下载系列: ID {}", series_id);
        self.progress.emit(DownloadEvent::SeriesStarted {
            id: series_id.to_string(),
        });

        let detail = self.client.fetch_series(series_id)?;
        let Some((members, source)) =
            resolve_members(&self.client, &detail, self.config.paginate_series_content)
        else {
            warn!("系列《{}》中没有找到有效的小说ID", detail.title);
            return Err(DownloadError::EmptySeries {
                id: detail.id,
                title: detail.title,
            });
        };
        let total = members.len();
        info!(
            "系列《{}》包含 {} 个小说ID（来源: {}）",
            detail.title, total, source
        );
        self.progress.emit(DownloadEvent::SeriesResolved {
            id: detail.id.clone(),
            title: detail.title.clone(),
            total,
            source,
        });

        let series_dir = self.series_dir(&detail.title, &detail.id);
        fs::create_dir_all(&series_dir).map_err(|source| {
            error!("创建系列目录失败 {}: {}", series_dir.display(), source);
            DownloadError::Io {
                path: series_dir.clone(),
                source,
            }
        })?;

        let mut success = 0usize;
        let mut failures = Vec::new();
        self.progress.begin_loop(total);
        for (idx, novel_id) in members.as_slice().iter().enumerate() {
            let current = idx + 1;
            self.progress.emit(DownloadEvent::ItemStarted {
                current,
                total,
                id: novel_id.clone(),
            });
            info!("下载系列中的小说 {}/{}: ID {}", current, total, novel_id);

            match self.save_novel(novel_id, &series_dir) {
                Ok(_) => success += 1,
                Err(err) => {
                    error!("小说 {} 下载失败: {}", novel_id, err);
                    self.progress.emit(DownloadEvent::ItemFailed {
                        current,
                        total,
                        id: novel_id.clone(),
                    });
                    failures.push(ItemFailure {
                        id: novel_id.clone(),
                        message: err.to_string(),
                    });
                }
            }
            self.progress.step_done();
        }
        self.progress.end_loop();

        info!(
            "系列《{}》下载完成: 成功 {}/{}",
            detail.title, success, total
        );
        let label = self
            .translator
            .tr_args("series_history_label", &[("title", detail.title.as_str())]);
        self.record_history(&label);

        Ok(SeriesReport {
            id: detail.id,
            title: detail.title,
            dir: series_dir,
            source,
            success,
            total,
            failures,
        })
    }

    fn series_dir(&self, title: &str, series_id: &str) -> PathBuf {
        self.config
            .default_save_dir()
            .join(file_stem(title, series_id))
    }

    fn record_history(&mut self, label: &str) {
        let entry = self.config.download_history.record(label);
        info!("保存下载历史记录: {}", entry);
    }

    fn reveal_if_enabled(&self, target: &Path) {
        if self.config.open_after_download {
            reveal(target);
        } else {
            info!("未开启下载后打开文件夹");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base_system::context::OutputFormat;
    use crate::download::models::SeriesMemberSource;
    use crate::network_parser::testing::ScriptedTransport;
    use crate::network_parser::{FetchError, HttpReply};
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    const BASE: &str = "https://pixiv.test";

    fn test_config(dir: &Path) -> Config {
        Config {
            save_path: dir.to_string_lossy().to_string(),
            open_after_download: false,
            ..Config::default()
        }
    }

    fn novel_body(title: &str, content: &str) -> Value {
        json!({"error": false, "message": "", "body": {"title": title, "content": content}})
    }

    fn downloader<'a>(
        t: ScriptedTransport,
        config: &'a mut Config,
    ) -> Downloader<'a, ScriptedTransport> {
        Downloader::new(AjaxClient::with_transport(t, BASE), config)
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .map(|rd| {
                rd.flatten()
                    .map(|e| e.file_name().to_string_lossy().to_string())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    #[test]
    fn single_novel_is_written_and_recorded() {
        let tmp = tempfile::tempdir().unwrap();
        let save = tmp.path().join("downloads");
        let mut config = test_config(&save);
        config.file_format = OutputFormat::Markdown;

        let t = ScriptedTransport::new().on_json("/ajax/novel/101", novel_body("夜:明け?", "本文"));
        let report = downloader(t, &mut config).download_novel("101").unwrap();

        assert_eq!(report.path, save.join("夜明け.md"));
        assert_eq!(fs::read_to_string(&report.path).unwrap(), "# 夜:明け?\n\n本文");
        assert_eq!(config.download_history.len(), 1);
        assert!(config.download_history.entries()[0].ends_with(" - 夜:明け?"));
    }

    #[test]
    fn invalid_id_is_rejected_before_any_request() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = test_config(tmp.path());
        let mut d = downloader(ScriptedTransport::new(), &mut config);
        assert!(matches!(
            d.download_novel("12a"),
            Err(DownloadError::Resolve(_))
        ));
        assert!(d.client().transport().requests().is_empty());
    }

    #[test]
    fn malformed_novel_leaves_no_file() {
        let tmp = tempfile::tempdir().unwrap();
        let save = tmp.path().join("out");
        let mut config = test_config(&save);
        let t = ScriptedTransport::new()
            .on("/ajax/novel/5", [HttpReply::ok("{\"error\":false,\"body\":")]);

        let err = downloader(t, &mut config).download_novel("5").unwrap_err();
        assert!(matches!(
            err,
            DownloadError::Fetch(FetchError::MalformedResponse { .. })
        ));
        assert!(files_in(&save).is_empty());
        assert!(config.download_history.is_empty());
    }

    #[test]
    fn malformed_series_leaves_no_file() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = test_config(tmp.path());
        let t = ScriptedTransport::new().on("/ajax/novel/series/6", [HttpReply::ok("oops")]);

        let err = downloader(t, &mut config).download_series("6").unwrap_err();
        assert!(matches!(
            err,
            DownloadError::Fetch(FetchError::MalformedResponse { .. })
        ));
        assert!(files_in(tmp.path()).is_empty());
    }

    #[test]
    fn not_found_novel() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = test_config(tmp.path());
        let err = downloader(ScriptedTransport::new(), &mut config)
            .download_novel("404")
            .unwrap_err();
        assert!(matches!(
            err,
            DownloadError::Fetch(FetchError::NotFound { .. })
        ));
    }

    #[test]
    fn series_downloads_members_and_tolerates_failures() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = test_config(tmp.path());
        let t = ScriptedTransport::new()
            .on_json(
                "/ajax/novel/series/900",
                json!({"error": false, "body": {
                    "title": "連作/短編",
                    "seriesContents": {"contents": [{"id": "1"}, {"id": "2"}, {"id": "3"}]}
                }}),
            )
            .on_json("/ajax/novel/1", novel_body("一", "a"))
            .on("/ajax/novel/2", [HttpReply::status(500)])
            .on_json("/ajax/novel/3", novel_body("三", "c"));

        let mut d = downloader(t, &mut config);
        let report = d.download_series("900").unwrap();
        let requests = d.client().transport().requests();
        drop(d);

        assert_eq!(report.title, "連作/短編");
        assert_eq!(report.dir, tmp.path().join("連作短編"));
        assert_eq!(report.source, SeriesMemberSource::Inline);
        assert_eq!((report.success, report.total), (2, 3));
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].id, "2");
        assert_eq!(files_in(&report.dir), ["一.txt", "三.txt"]);
        assert_eq!(requests.len(), 4);

        // 两本小说 + 系列本身
        assert_eq!(config.download_history.len(), 3);
        assert!(config.download_history.entries()[0].ends_with("系列: 連作/短編"));
    }

    #[test]
    fn series_dir_exists_even_when_every_member_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = test_config(tmp.path());
        let t = ScriptedTransport::new()
            .on_json(
                "/ajax/novel/series/901",
                json!({"error": false, "body": {
                    "title": "S",
                    "seriesContents": {"contents": [{"id": "4"}]}
                }}),
            )
            .on("/ajax/novel/4", [HttpReply::status(500)]);

        let report = downloader(t, &mut config).download_series("901").unwrap();
        assert_eq!((report.success, report.total), (0, 1));
        assert_eq!(report.dir, tmp.path().join("S"));
        assert!(report.dir.is_dir());
        assert!(files_in(&report.dir).is_empty());
    }

    #[test]
    fn dot_series_title_stays_inside_save_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let save = tmp.path().join("downloads");
        let mut config = test_config(&save);
        let t = ScriptedTransport::new()
            .on_json(
                "/ajax/novel/series/902",
                json!({"error": false, "body": {
                    "title": "..",
                    "seriesContents": {"contents": [{"id": "8"}]}
                }}),
            )
            .on_json("/ajax/novel/8", novel_body("八", "x"));

        let report = downloader(t, &mut config).download_series("902").unwrap();
        assert_eq!(report.dir, save.join("902"));
        assert_eq!(files_in(&report.dir), ["八.txt"]);
        assert_eq!(files_in(tmp.path()), ["downloads"]);
    }

    #[test]
    fn empty_series_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = test_config(tmp.path());
        let t = ScriptedTransport::new()
            .on_json(
                "/ajax/novel/series/31",
                json!({"error": false, "body": {"title": "空", "caption": "none"}}),
            )
            .on_json(
                "/ajax/novel/series_content/31",
                json!({"error": false, "body": {"page": {"seriesContents": []}}}),
            );
        let err = downloader(t, &mut config).download_series("31").unwrap_err();
        match err {
            DownloadError::EmptySeries { id, title } => {
                assert_eq!(id, "31");
                assert_eq!(title, "空");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(files_in(tmp.path()).is_empty());
    }

    #[test]
    fn batch_skips_unresolvable_line() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = test_config(tmp.path());
        let t = ScriptedTransport::new()
            .on_json("/ajax/novel/11", novel_body("A", "a"))
            .on_json("/ajax/novel/12", novel_body("B", "b"));

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let mut d = downloader(t, &mut config);
        d.on_event(move |e| sink.lock().unwrap().push(e.clone()));

        let report = d
            .download_batch("https://www.pixiv.net/novel/show.php?id=11\nnot a link\n\n12\n")
            .unwrap();

        assert_eq!(report.success, 2);
        assert_eq!(report.attempted, 2);
        assert_eq!(report.tally(), "2/2");
        assert_eq!(report.resolve_errors.len(), 1);
        assert_eq!(report.resolve_errors[0].line, 2);
        assert_eq!(report.resolve_errors[0].input, "not a link");
        assert_eq!(files_in(tmp.path()), ["A.txt", "B.txt"]);

        let events = events.lock().unwrap();
        assert!(matches!(events[0], DownloadEvent::InputRejected(_)));
        assert!(matches!(
            events.last(),
            Some(DownloadEvent::Finished { success: 2, total: 2 })
        ));
    }

    #[test]
    fn batch_continues_after_failed_item() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = test_config(tmp.path());
        let t = ScriptedTransport::new()
            .on_json("/ajax/novel/21", novel_body("X", "x"))
            .on_json(
                "/ajax/novel/series/22",
                json!({"error": true, "message": "gone"}),
            )
            .on_json("/ajax/novel/23", novel_body("Z", "z"));

        let report = downloader(t, &mut config)
            .download_batch("21\nseries/22\nnovel/23")
            .unwrap();
        assert_eq!(report.tally(), "2/3");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].id, "22");
    }

    #[test]
    fn batch_with_nothing_valid() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = test_config(tmp.path());
        let mut d = downloader(ScriptedTransport::new(), &mut config);

        assert!(matches!(
            d.download_batch(" \n\n"),
            Err(DownloadError::EmptyInput)
        ));
        match d.download_batch("foo\nbar") {
            Err(DownloadError::NoValidIds { failures }) => assert_eq!(failures.len(), 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn download_input_dispatches_by_kind() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = test_config(tmp.path());
        config.file_format = OutputFormat::Html;
        let t = ScriptedTransport::new()
            .on_json("/ajax/novel/77", novel_body("H", "l1\nl2"));

        let outcome = downloader(t, &mut config)
            .download_input("  https://www.pixiv.net/novel/77 ")
            .unwrap();
        let ItemOutcome::Novel(report) = outcome else {
            panic!("expected novel");
        };
        let html = fs::read_to_string(&report.path).unwrap();
        assert!(report.path.ends_with("H.html"));
        assert!(html.contains("<div>l1<br>l2</div>"));
    }

    #[test]
    fn blank_title_falls_back_to_id() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = test_config(tmp.path());
        let t = ScriptedTransport::new().on_json("/ajax/novel/88", novel_body("???", "x"));
        let report = downloader(t, &mut config).download_novel("88").unwrap();
        assert_eq!(report.path, tmp.path().join("88.txt"));
    }
}

//! 进度上报：界面回调 + CLI 进度条。

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::models::DownloadEvent;

type EventCallback = Box<dyn FnMut(&DownloadEvent) + Send>;

/// 只有最外层循环（批量或单独的系列）驱动进度条，嵌套的系列只发事件。
pub struct ProgressReporter {
    cb: Option<EventCallback>,
    bar: Option<ProgressBar>,
    use_bar: bool,
    depth: usize,
}

impl ProgressReporter {
    /// 不画进度条、不回调。
    pub fn silent() -> Self {
        Self {
            cb: None,
            bar: None,
            use_bar: false,
            depth: 0,
        }
    }

    /// 在 stderr 上绘制进度条。
    pub fn with_cli_bar() -> Self {
        Self {
            use_bar: true,
            ..Self::silent()
        }
    }

    pub fn set_callback(&mut self, cb: impl FnMut(&DownloadEvent) + Send + 'static) {
        self.cb = Some(Box::new(cb));
    }

    pub(crate) fn emit(&mut self, event: DownloadEvent) {
        if let Some(bar) = self.bar.as_ref() {
            match &event {
                DownloadEvent::ItemStarted { id, .. } | DownloadEvent::NovelStarted { id } => {
                    bar.set_message(id.clone())
                }
                DownloadEvent::SeriesResolved { title, .. } => bar.set_prefix(title.clone()),
                _ => {}
            }
        }
        let Some(cb) = self.cb.as_mut() else {
            return;
        };
        // 回调里的输出需先收起进度条，否则会被重绘覆盖
        match self.bar.as_ref() {
            Some(bar) => bar.suspend(|| cb(&event)),
            None => cb(&event),
        }
    }

    pub(crate) fn begin_loop(&mut self, total: usize) {
        self.depth += 1;
        if self.depth != 1 || !self.use_bar {
            return;
        }
        let bar = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr());
        let template = "{prefix} [{elapsed_precise}] {wide_bar} {pos}/{len} {msg}";
        if let Ok(style) = ProgressStyle::with_template(template) {
            bar.set_style(style.progress_chars("##-"));
        }
        self.bar = Some(bar);
    }

    pub(crate) fn step_done(&mut self) {
        if self.depth == 1
            && let Some(bar) = self.bar.as_ref()
        {
            bar.inc(1);
        }
    }

    pub(crate) fn end_loop(&mut self) {
        if self.depth == 1
            && let Some(bar) = self.bar.take()
        {
            bar.finish_and_clear();
        }
        self.depth = self.depth.saturating_sub(1);
    }
}

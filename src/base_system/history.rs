//! 下载记录：带时间戳的标签列表，最新的在最前，最多保留 20 条。

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::macros::format_description;

pub const MAX_HISTORY: usize = 20;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DownloadHistory {
    entries: Vec<String>,
}

impl DownloadHistory {
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 以当前本地时间记录一条标签，返回写入的完整条目。
    pub fn record(&mut self, label: &str) -> String {
        let entry = format!("{} - {}", now_stamp(), label);
        self.push_entry(entry.clone());
        entry
    }

    pub fn push_entry(&mut self, entry: String) {
        self.entries.insert(0, entry);
        self.enforce_cap();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn enforce_cap(&mut self) {
        self.entries.truncate(MAX_HISTORY);
    }
}

fn now_stamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_first_and_capped() {
        let mut history = DownloadHistory::default();
        for i in 0..45 {
            history.push_entry(format!("item {i}"));
            assert!(history.len() <= MAX_HISTORY);
            assert_eq!(history.entries()[0], format!("item {i}"));
        }
        assert_eq!(history.len(), MAX_HISTORY);
        assert_eq!(history.entries()[MAX_HISTORY - 1], "item 25");
    }

    #[test]
    fn record_prefixes_timestamp() {
        let mut history = DownloadHistory::default();
        let entry = history.record("某小说");
        assert!(entry.ends_with(" - 某小说"));
        // "YYYY-MM-DD HH:MM"
        let stamp = entry.trim_end_matches(" - 某小说");
        assert_eq!(stamp.len(), 16);
        assert_eq!(&stamp[4..5], "-");
        assert_eq!(&stamp[13..14], ":");
        assert_eq!(history.entries(), [entry.clone()]);
    }

    #[test]
    fn clear_empties() {
        let mut history = DownloadHistory::default();
        history.record("a");
        history.clear();
        assert!(history.is_empty());
    }

    #[test]
    fn serializes_as_plain_list() {
        let mut history = DownloadHistory::default();
        history.push_entry("one".to_string());
        let yaml = serde_yaml::to_string(&history).unwrap();
        assert_eq!(yaml.trim(), "- one");
    }
}

//! 输出格式渲染、文件名清理与落盘。

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::base_system::context::OutputFormat;
use crate::network_parser::NovelRecord;

const FORBIDDEN: [char; 9] = ['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

pub fn render(novel: &NovelRecord, format: OutputFormat) -> String {
    match format {
        OutputFormat::Txt => novel.content.clone(),
        OutputFormat::Html => {
            let title = escape_html(&novel.title);
            let body = novel.content.replace('\n', "<br>");
            format!(
                "<html><head><meta charset=\"utf-8\"><title>{title}</title></head><body><h1>{title}</h1><div>{body}</div></body></html>"
            )
        }
        OutputFormat::Markdown => format!("# {}\n\n{}", novel.title, novel.content),
    }
}

/// 删除 `\ / * ? : " < > |`，其余字符原样保留。
pub fn sanitize_title(title: &str) -> String {
    title.chars().filter(|c| !FORBIDDEN.contains(c)).collect()
}

/// 清理后的标题作为文件名主体；清理后为空白或为 `.`/`..` 时使用 `fallback`（通常为 ID）。
pub fn file_stem(title: &str, fallback: &str) -> String {
    let cleaned = sanitize_title(title);
    if matches!(cleaned.trim(), "" | "." | "..") {
        fallback.to_string()
    } else {
        cleaned
    }
}

pub fn output_path(dir: &Path, title: &str, fallback: &str, format: OutputFormat) -> PathBuf {
    dir.join(format!("{}.{}", file_stem(title, fallback), format.extension()))
}

/// 先写入同目录的临时文件，全部写完后再改名为目标文件；失败时不留下残缺文件。
pub fn write_file(path: &Path, content: &str) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

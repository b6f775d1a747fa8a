use std::io::{BufRead, Write};

use anyhow::Result;
use tracing::info;

use super::{Session, read_line};

pub(super) fn show<W: Write>(session: &Session<'_>, out: &mut W) -> Result<()> {
    writeln!(out, "\n{}", session.t("history_title"))?;
    let history = &session.config.download_history;
    if history.is_empty() {
        writeln!(out, "{}", session.t("history_empty"))?;
    } else {
        for (idx, entry) in history.entries().iter().enumerate() {
            writeln!(out, "{}. {}", idx + 1, entry)?;
        }
    }
    writeln!(out)?;
    Ok(())
}

pub(super) fn clear<R: BufRead, W: Write>(
    session: &mut Session<'_>,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    let answer = read_line(input, out, &session.t("confirm_clear"))?.unwrap_or_default();
    if !matches!(answer.trim(), "y" | "Y" | "yes" | "YES") {
        writeln!(out)?;
        return Ok(());
    }
    session.config.download_history.clear();
    session.persist();
    info!("下载记录已清空");
    writeln!(out, "{}\n", session.t("history_cleared"))?;
    Ok(())
}

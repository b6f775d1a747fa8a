//! 下载完成后在系统文件管理器中打开所在目录。

use std::path::Path;
use std::process::Command;

use tracing::{error, info};

fn open_in_file_manager(dir: &Path) -> std::io::Result<()> {
    if cfg!(target_os = "windows") {
        Command::new("explorer").arg(dir).spawn()?;
        return Ok(());
    }
    if cfg!(target_os = "macos") {
        Command::new("open").arg(dir).spawn()?;
        return Ok(());
    }
    Command::new("xdg-open").arg(dir).spawn()?;
    Ok(())
}

/// 打开 `target` 所在目录（`target` 本身是目录时直接打开）。失败只记录日志。
pub fn reveal(target: &Path) {
    let dir = if target.is_dir() {
        target
    } else {
        target.parent().unwrap_or(target)
    };
    match open_in_file_manager(dir) {
        Ok(()) => info!("已打开文件夹: {}", dir.display()),
        Err(err) => error!("打开文件夹失败 {}: {}", dir.display(), err),
    }
}

use std::path::{Path, PathBuf};

/// 数据库相关路径常量
pub const DB_DATA_DIR: &str = "data";
pub const DB_PROCESSED_SUBDIR: &str = "processed";
pub const DB_FILE_NAME: &str = "bgg.db";
pub const APP_DIR_NAME: &str = "boardgame-scout";

/// 判断是否处于工作目录模式
///
/// 检测逻辑：检查给定目录下是否存在 data/processed/bgg.db
pub fn is_workdir_mode(dir: &Path) -> bool {
    workdir_db_path(dir).is_file()
}

/// 工作目录模式下的数据库路径
pub fn workdir_db_path(dir: &Path) -> PathBuf {
    dir.join(DB_DATA_DIR)
        .join(DB_PROCESSED_SUBDIR)
        .join(DB_FILE_NAME)
}

/// 获取系统数据目录（跨平台）
fn get_system_data_dir() -> Result<PathBuf, String> {
    use directories::BaseDirs;

    let base_dirs = BaseDirs::new().ok_or_else(|| "无法获取系统目录信息".to_string())?;
    Ok(base_dirs.data_dir().join(APP_DIR_NAME))
}

/// 获取数据库文件路径
///
/// 工作目录模式沿用 data/processed/bgg.db，否则落在系统数据目录的 data/bgg.db
pub fn get_db_path() -> Result<PathBuf, String> {
    let cwd = std::env::current_dir().map_err(|e| format!("无法获取当前工作目录: {}", e))?;
    if is_workdir_mode(&cwd) {
        return Ok(workdir_db_path(&cwd));
    }
    Ok(get_system_data_dir()?.join(DB_DATA_DIR).join(DB_FILE_NAME))
}

/// 解析数据库路径：显式指定优先
pub fn resolve_db_path(explicit: Option<&Path>) -> Result<PathBuf, String> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => get_db_path(),
    }
}

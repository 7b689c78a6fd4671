//! 命令行入口

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::database::repository::settings_repository::SettingsRepository;
use crate::database::store::Database;
use crate::error::AppError;
use crate::pipeline;
use crate::scrape::ScrapeClient;
use crate::utils::logs::{init_logging, set_log_level};
use crate::utils::report::{LogReporter, Reporter};

#[derive(Debug, Parser)]
#[command(name = "boardgame-scout", version, about)]
pub struct Cli {
    /// 数据库文件路径，默认按工作目录模式或系统数据目录决定
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// 日志级别（error/warn/info/debug/trace/off），覆盖已保存的设置
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// 完整流程（默认）
    Run,
    /// 抓取所有出版商的目录
    Discover,
    /// 补全过期记录
    Update,
    /// 重新计算派生特征并写回
    Features,
    /// 打印候选报告
    Report,
    /// 查看或修改设置
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    List,
    Set { key: String, value: String },
}

pub async fn execute(cli: Cli) -> Result<(), AppError> {
    init_logging(cli.log_level.as_deref().unwrap_or("info")).map_err(AppError::Config)?;

    let path = bgg_path::resolve_db_path(cli.db.as_deref()).map_err(AppError::Path)?;
    let reporter: Arc<dyn Reporter> = Arc::new(LogReporter);
    let mut db = Database::open(&path, Arc::clone(&reporter)).await?;

    let settings = SettingsRepository::load(db.connection()).await?;
    if cli.log_level.is_none() {
        if let Err(e) = set_log_level(&settings.log_level) {
            log::warn!("{}", e);
        }
    }

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let scraper = ScrapeClient::from_settings(&settings, Arc::clone(&reporter))?;
            let text = pipeline::run(&mut db, &scraper, &settings, reporter.as_ref()).await?;
            print!("{}", text);
        }
        Command::Discover => {
            let scraper = ScrapeClient::from_settings(&settings, Arc::clone(&reporter))?;
            let stats = scraper.discover_all(&mut db, &settings.publishers).await?;
            log::info!(
                "目录抓取完成: {} 页，新增 {} 条，已存在 {} 条",
                stats.pages,
                stats.inserted,
                stats.known
            );
        }
        Command::Update => {
            let scraper = ScrapeClient::from_settings(&settings, Arc::clone(&reporter))?;
            scraper.update_all(&mut db).await?;
        }
        Command::Features => {
            pipeline::derive_features(&mut db, &settings, reporter.as_ref());
            db.flush().await?;
        }
        Command::Report => print!("{}", pipeline::report(&db)),
        Command::Settings { action } => match action {
            SettingsAction::List => {
                for (key, value) in settings.entries() {
                    println!("{} = {}", key, value);
                }
            }
            SettingsAction::Set { key, value } => {
                SettingsRepository::set(db.connection(), &key, &value).await?;
                log::info!("设置项 {} 已更新", key);
            }
        },
    }

    db.close().await?;
    Ok(())
}

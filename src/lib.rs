pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod scrape;
pub mod utils;
pub mod viewer;

mod cli;

use clap::Parser;

pub use cli::Cli;
use error::AppError;

/// 解析命令行并在单线程 tokio 运行时中执行
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(cli::execute(cli))
}

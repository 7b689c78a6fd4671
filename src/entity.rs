//! 数据实体模块
//!
//! games 表的列随数据源增长，用 `GameRecord` 手工映射；
//! settings 表结构固定，使用 SeaORM 实体。

pub mod prelude;

// === 动态列记录 ===
pub mod game_record;

// === SeaORM 实体（对应数据库表）===
pub mod settings;

//! 预导入模块
//!
//! 提供常用类型的快捷导入。

// === SeaORM 实体 ===
pub use super::settings::Entity as Settings;

// === 动态列记录（games 表）===
pub use super::game_record::{GameRecord, ListingEntry, Updated};

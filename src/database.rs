pub mod db;
pub mod frame;
pub mod repository;
pub mod store;

pub use store::{Database, Put};

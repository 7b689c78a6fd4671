//! 游戏记录仓库
//!
//! 全部记录常驻内存，按 gameid 索引并保持插入顺序。
//! 持久化方式是整表替换：`flush` 删除并重建 games 表后写入全部行。

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::Rng;
use sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseConnection, QueryResult, Statement,
    TransactionTrait, Value,
};

use super::db::{close_connection, establish_connection, quote_ident, table_exists};
use super::frame::{Cell, Frame, SqlType};
use crate::entity::game_record::GameRecord;
use crate::error::StoreError;
use crate::utils::report::{Event, Reporter};

pub const GAMES_TABLE: &str = "games";

/// SQLite 单条语句的绑定参数上限
const MAX_BIND_PARAMS: usize = 999;

/// `put` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Put {
    Inserted,
    Replaced,
    Skipped,
}

pub struct Database {
    path: PathBuf,
    conn: DatabaseConnection,
    records: Vec<GameRecord>,
    index: HashMap<i64, usize>,
    reporter: Arc<dyn Reporter>,
}

impl Database {
    /// 打开（必要时创建）数据库文件并加载全部记录
    pub async fn open(path: impl AsRef<Path>, reporter: Arc<dyn Reporter>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let conn = establish_connection(&path)
            .await
            .map_err(|e| StoreError::Open {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let mut db = Self {
            path,
            conn,
            records: Vec::new(),
            index: HashMap::new(),
            reporter,
        };
        db.load().await?;
        Ok(db)
    }

    /// 从 games 表重新加载全部记录，表不存在时得到空仓库
    pub async fn load(&mut self) -> Result<(), StoreError> {
        self.records.clear();
        self.index.clear();

        if !table_exists(&self.conn, GAMES_TABLE).await? {
            self.reporter.report(&Event::StoreInitialized {
                path: self.path.clone(),
            });
            return Ok(());
        }

        let schema = self.table_columns().await?;
        let rows = self
            .conn
            .query_all(Statement::from_string(
                DatabaseBackend::Sqlite,
                format!("SELECT * FROM {} ORDER BY rowid", quote_ident(GAMES_TABLE)),
            ))
            .await?;

        for row in rows {
            let cells: BTreeMap<String, Cell> = schema
                .iter()
                .map(|(name, declared)| (name.clone(), read_cell(&row, name, *declared)))
                .collect();
            match GameRecord::from_row(cells) {
                Some(record) => {
                    self.insert_new(record);
                }
                None => self.reporter.report(&Event::RowWithoutId),
            }
        }

        self.reporter.report(&Event::StoreLoaded {
            path: self.path.clone(),
            rows: self.records.len(),
        });
        Ok(())
    }

    /// games 表的列名与声明类型
    async fn table_columns(&self) -> Result<Vec<(String, SqlType)>, StoreError> {
        let rows = self
            .conn
            .query_all(Statement::from_sql_and_values(
                DatabaseBackend::Sqlite,
                "SELECT name, type FROM pragma_table_info(?) ORDER BY cid",
                vec![GAMES_TABLE.into()],
            ))
            .await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get("", "name")?;
            let declared: Option<String> = row.try_get("", "type")?;
            columns.push((name, declared_type(declared.as_deref().unwrap_or(""))));
        }
        Ok(columns)
    }

    pub fn get(&self, gameid: i64) -> Result<&GameRecord, StoreError> {
        self.index
            .get(&gameid)
            .map(|&idx| &self.records[idx])
            .ok_or(StoreError::RecordNotFound { gameid })
    }

    /// 写入一条记录；已存在且不允许覆盖时跳过
    pub fn put(&mut self, record: GameRecord, overwrite: bool) -> Put {
        match self.index.get(&record.gameid) {
            Some(&idx) if overwrite => {
                self.records[idx] = record;
                Put::Replaced
            }
            Some(_) => {
                self.reporter.report(&Event::InsertSkipped {
                    gameid: record.gameid,
                });
                Put::Skipped
            }
            None => {
                self.insert_new(record);
                Put::Inserted
            }
        }
    }

    fn insert_new(&mut self, record: GameRecord) {
        match self.index.get(&record.gameid) {
            // 表里出现重复 gameid 时后一行覆盖前一行
            Some(&idx) => self.records[idx] = record,
            None => {
                self.index.insert(record.gameid, self.records.len());
                self.records.push(record);
            }
        }
    }

    /// 按某列排序的全部 gameid
    ///
    /// 稳定排序，值相同的保持插入顺序；缺失值无论升降序都排在最后。
    pub fn ids_sorted_by(&self, column: &str, descending: bool) -> Vec<i64> {
        let mut keyed: Vec<(i64, Cell)> = self
            .records
            .iter()
            .map(|r| (r.gameid, r.get(column)))
            .collect();

        keyed.sort_by(|(_, a), (_, b)| match (a.is_null(), b.is_null()) {
            (true, true) => std::cmp::Ordering::Equal,
            (true, false) => std::cmp::Ordering::Greater,
            (false, true) => std::cmp::Ordering::Less,
            (false, false) if descending => b.sort_cmp(a),
            (false, false) => a.sort_cmp(b),
        });
        keyed.into_iter().map(|(id, _)| id).collect()
    }

    /// 生成表格快照，同时给每条记录重新分配 [-0.5, 0.5) 的随机值
    pub fn materialize(&mut self) -> Frame {
        let mut rng = rand::rng();
        for record in &mut self.records {
            record.random = Some(rng.random_range(-0.5..0.5));
        }
        Frame::from_records(&self.records)
    }

    /// 已持久化的行数，表不存在时为 0
    pub async fn persisted_rows(&self) -> Result<u64, StoreError> {
        if !table_exists(&self.conn, GAMES_TABLE).await? {
            return Ok(0);
        }
        let row = self
            .conn
            .query_one(Statement::from_string(
                DatabaseBackend::Sqlite,
                format!("SELECT COUNT(*) AS cnt FROM {}", quote_ident(GAMES_TABLE)),
            ))
            .await?;
        let count: i64 = match row {
            Some(row) => row.try_get("", "cnt")?,
            None => 0,
        };
        Ok(count.max(0) as u64)
    }

    /// 整表写回
    ///
    /// 内存记录少于已持久化行数时拒绝写入，表保持原样。
    pub async fn flush(&mut self) -> Result<usize, StoreError> {
        let persisted = self.persisted_rows().await?;
        let current = self.records.len() as u64;
        if current < persisted {
            return Err(StoreError::RecordsDisappeared { persisted, current });
        }
        let frame = self.materialize();

        let table = quote_ident(GAMES_TABLE);
        let types = frame.column_types();
        let column_defs: Vec<String> = frame
            .columns
            .iter()
            .zip(&types)
            .map(|(name, ty)| format!("{} {}", quote_ident(name), ty.as_sql()))
            .collect();
        let column_list: Vec<String> = frame.columns.iter().map(|c| quote_ident(c)).collect();

        let txn = self.conn.begin().await?;
        txn.execute_unprepared(&format!("DROP TABLE IF EXISTS {}", table))
            .await?;
        txn.execute_unprepared(&format!("CREATE TABLE {} ({})", table, column_defs.join(", ")))
            .await?;

        let width = frame.columns.len();
        let rows_per_statement = (MAX_BIND_PARAMS / width).max(1);
        let row_placeholder = format!("({})", vec!["?"; width].join(", "));
        let rows = frame.rows.len();

        let mut pending = frame.rows.into_iter().peekable();
        while pending.peek().is_some() {
            let chunk: Vec<Vec<Cell>> = pending.by_ref().take(rows_per_statement).collect();
            let sql = format!(
                "INSERT INTO {} ({}) VALUES {}",
                table,
                column_list.join(", "),
                vec![row_placeholder.as_str(); chunk.len()].join(", ")
            );
            let values: Vec<Value> = chunk
                .into_iter()
                .flat_map(|row| row.into_iter().map(Cell::into_value))
                .collect();
            txn.execute(Statement::from_sql_and_values(DatabaseBackend::Sqlite, sql, values))
                .await?;
        }
        txn.commit().await?;

        self.reporter.report(&Event::StoreFlushed {
            path: self.path.clone(),
            rows,
        });
        Ok(rows)
    }

    /// 按插入顺序遍历
    pub fn records(&self) -> impl Iterator<Item = &GameRecord> {
        self.records.iter()
    }

    /// 可变访问全部记录；调用方不得修改 gameid
    pub fn records_mut(&mut self) -> &mut [GameRecord] {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    pub async fn close(self) -> Result<(), StoreError> {
        close_connection(self.conn).await?;
        Ok(())
    }
}

/// 按 SQLite 的类型亲和规则粗略归类声明类型
fn declared_type(declared: &str) -> SqlType {
    let upper = declared.to_ascii_uppercase();
    if upper.contains("INT") {
        SqlType::Integer
    } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
        SqlType::Real
    } else {
        SqlType::Text
    }
}

/// 读取一个单元格：先按声明类型取值，失败再依次尝试其他类型
fn read_cell(row: &QueryResult, column: &str, declared: SqlType) -> Cell {
    let order = match declared {
        SqlType::Integer => [SqlType::Integer, SqlType::Real, SqlType::Text],
        SqlType::Real => [SqlType::Real, SqlType::Integer, SqlType::Text],
        SqlType::Text => [SqlType::Text, SqlType::Real, SqlType::Integer],
    };
    for ty in order {
        let cell = match ty {
            SqlType::Integer => row
                .try_get::<Option<i64>>("", column)
                .map(|v| v.map_or(Cell::Null, Cell::Int)),
            SqlType::Real => row
                .try_get::<Option<f64>>("", column)
                .map(|v| v.map_or(Cell::Null, Cell::real)),
            SqlType::Text => row
                .try_get::<Option<String>>("", column)
                .map(|v| v.map_or(Cell::Null, Cell::Text)),
        };
        if let Ok(cell) = cell {
            return cell;
        }
    }
    Cell::Null
}

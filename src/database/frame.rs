//! 表格形式的记录视图
//!
//! `Frame` 是记录集合的列式快照，用于整表写入和批量分析。
//! 缺失值统一为 `Cell::Null`。

use std::cmp::Ordering;
use std::collections::HashMap;

use sea_orm::Value;
use serde_json::Value as JsonValue;

use crate::entity::game_record::GameRecord;

/// 单元格值
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
}

impl Cell {
    /// 非有限浮点数一律视为缺失
    pub fn real(value: f64) -> Self {
        if value.is_finite() {
            Cell::Real(value)
        } else {
            Cell::Null
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(v) => Some(*v),
            Cell::Real(v) if v.fract() == 0.0 => Some(*v as i64),
            Cell::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::Real(v) => Some(*v),
            Cell::Text(s) => s.trim().parse().ok(),
            Cell::Null => None,
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Int(v) => Some(v.to_string()),
            Cell::Real(v) => Some(v.to_string()),
            Cell::Text(s) => Some(s.clone()),
        }
    }

    /// 从扩展字段的 JSON 值转换；嵌套结构序列化为 JSON 文本
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Cell::Null,
            JsonValue::Bool(b) => Cell::Int(i64::from(*b)),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Cell::Int(i),
                None => n.as_f64().map_or(Cell::Null, Cell::real),
            },
            JsonValue::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Cell::Null => JsonValue::Null,
            Cell::Int(v) => JsonValue::from(*v),
            Cell::Real(v) => serde_json::Number::from_f64(*v).map_or(JsonValue::Null, JsonValue::Number),
            Cell::Text(s) => JsonValue::String(s.clone()),
        }
    }

    /// 排序比较：数值之间按大小，文本之间按字典序，数值排在文本之前。
    /// 调用方负责把 `Null` 放到最后。
    pub fn sort_cmp(&self, other: &Cell) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => match (self, other) {
                (Cell::Text(a), Cell::Text(b)) => a.cmp(b),
                _ => Ordering::Equal,
            },
        }
    }

    fn numeric(&self) -> Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::Real(v) => Some(*v),
            _ => None,
        }
    }

    pub(crate) fn into_value(self) -> Value {
        match self {
            Cell::Null => Value::String(None),
            Cell::Int(v) => Value::BigInt(Some(v)),
            Cell::Real(v) => Value::Double(Some(v)),
            Cell::Text(s) => Value::String(Some(Box::new(s))),
        }
    }
}

/// SQLite 列类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    Real,
    Text,
}

impl SqlType {
    pub fn as_sql(self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Text => "TEXT",
        }
    }
}

/// 记录集合的列式快照
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Frame {
    /// 列为所有记录字段的并集，按首次出现的顺序排列
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a GameRecord>) -> Self {
        let mut columns: Vec<String> = GameRecord::REQUIRED_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .collect();
        let mut positions: HashMap<String, usize> = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();

        let mut sparse_rows = Vec::new();
        for record in records {
            let mut row = Vec::new();
            for (column, cell) in record.to_row() {
                let idx = match positions.get(&column) {
                    Some(idx) => *idx,
                    None => {
                        columns.push(column.clone());
                        positions.insert(column, columns.len() - 1);
                        columns.len() - 1
                    }
                };
                row.push((idx, cell));
            }
            sparse_rows.push(row);
        }

        let width = columns.len();
        let rows = sparse_rows
            .into_iter()
            .map(|sparse| {
                let mut row = vec![Cell::Null; width];
                for (idx, cell) in sparse {
                    row[idx] = cell;
                }
                row
            })
            .collect();

        Frame { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// 取某一列的全部单元格，列不存在时返回 `None`
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// 推断每列的存储类型：有文本即 TEXT，否则有浮点即 REAL，否则 INTEGER；全空列为 TEXT
    pub fn column_types(&self) -> Vec<SqlType> {
        (0..self.columns.len())
            .map(|idx| {
                let mut seen_int = false;
                let mut seen_real = false;
                for row in &self.rows {
                    match &row[idx] {
                        Cell::Text(_) => return SqlType::Text,
                        Cell::Real(_) => seen_real = true,
                        Cell::Int(_) => seen_int = true,
                        Cell::Null => {}
                    }
                }
                if seen_real {
                    SqlType::Real
                } else if seen_int {
                    SqlType::Integer
                } else {
                    SqlType::Text
                }
            })
            .collect()
    }
}

//! Feature table assembly.
//!
//! Rows are kept in arrival order, which is also label order. The column
//! layout is fixed by the depth N:
//!
//! | column | count |
//! |--------|-------|
//! | `time` | 1 |
//! | `ask_price_i`, `ask_volume_i`, `bid_price_i`, `bid_volume_i` | 4 per level, interleaved by level |
//! | `mid_price` | 1 |
//! | `volume_bar_label` | 1 |

use std::fmt;

use crate::error::{FeatureError, Result};
use crate::types::{FeatureRow, Side};

/// Name of the timestamp column.
pub const TIME_COLUMN: &str = "time";

/// Name of the mid-price column.
pub const MID_PRICE_COLUMN: &str = "mid_price";

/// Name of the bar label column.
pub const LABEL_COLUMN: &str = "volume_bar_label";

/// What a level column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelField {
    /// Price of the level
    Price,
    /// Volume of the level
    Volume,
}

impl LevelField {
    fn name(self) -> &'static str {
        match self {
            LevelField::Price => "price",
            LevelField::Volume => "volume",
        }
    }
}

/// One column of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// Snapshot timestamp
    Time,
    /// A per-level column
    Level {
        side: Side,
        field: LevelField,
        index: usize,
    },
    /// Mid-price
    MidPrice,
    /// Bar label
    Label,
}

impl Column {
    /// All columns for depth `depth`, in file order.
    pub fn layout(depth: usize) -> Vec<Column> {
        let mut columns = Vec::with_capacity(depth * 4 + 3);
        columns.push(Column::Time);
        for index in 0..depth {
            for (side, field) in [
                (Side::Ask, LevelField::Price),
                (Side::Ask, LevelField::Volume),
                (Side::Bid, LevelField::Price),
                (Side::Bid, LevelField::Volume),
            ] {
                columns.push(Column::Level { side, field, index });
            }
        }
        columns.push(Column::MidPrice);
        columns.push(Column::Label);
        columns
    }

    /// Parse a column header.
    pub fn parse(name: &str) -> Option<Column> {
        match name {
            TIME_COLUMN => return Some(Column::Time),
            MID_PRICE_COLUMN => return Some(Column::MidPrice),
            LABEL_COLUMN => return Some(Column::Label),
            _ => {}
        }

        let mut parts = name.splitn(3, '_');
        let side = match parts.next()? {
            "ask" => Side::Ask,
            "bid" => Side::Bid,
            _ => return None,
        };
        let field = match parts.next()? {
            "price" => LevelField::Price,
            "volume" => LevelField::Volume,
            _ => return None,
        };
        let index = parts.next()?.parse().ok()?;
        Some(Column::Level { side, field, index })
    }

    /// Value of this column in `row`, as `f64`.
    ///
    /// Returns `None` for a level index beyond the row's depth.
    pub fn value(&self, row: &FeatureRow) -> Option<f64> {
        match *self {
            Column::Time => Some(row.timestamp() as f64),
            Column::MidPrice => Some(row.mid_price()),
            Column::Label => Some(row.label() as f64),
            Column::Level { side, field, index } => {
                let levels = match side {
                    Side::Ask => row.asks(),
                    Side::Bid => row.bids(),
                };
                let level = levels.get(index)?;
                Some(match field {
                    LevelField::Price => level.price,
                    LevelField::Volume => level.volume,
                })
            }
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Column::Time => f.write_str(TIME_COLUMN),
            Column::MidPrice => f.write_str(MID_PRICE_COLUMN),
            Column::Label => f.write_str(LABEL_COLUMN),
            Column::Level { side, field, index } => {
                write!(f, "{}_{}_{}", side.name(), field.name(), index)
            }
        }
    }
}

/// Ordered collection of feature rows with a fixed depth.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    depth: usize,
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    /// Create an empty table for `depth` levels per side.
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            rows: Vec::new(),
        }
    }

    /// Levels per side.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in label order.
    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    /// Consume the table, returning its rows.
    pub fn into_rows(self) -> Vec<FeatureRow> {
        self.rows
    }

    /// Append a row.
    ///
    /// # Errors
    /// `FeatureError::Structural` if either side's depth differs from the
    /// table depth, or the label is not the next in sequence. Neither can
    /// happen for rows produced by [`crate::FeaturePipeline`].
    pub fn push(&mut self, row: FeatureRow) -> Result<()> {
        if row.asks().len() != self.depth || row.bids().len() != self.depth {
            return Err(FeatureError::structural(format!(
                "row {} has {} ask / {} bid levels, table depth is {}",
                row.label(),
                row.asks().len(),
                row.bids().len(),
                self.depth
            )));
        }

        let expected = self.rows.len() as u64;
        if row.label() != expected {
            return Err(FeatureError::structural(format!(
                "label {} out of sequence, expected {expected}",
                row.label()
            )));
        }

        self.rows.push(row);
        Ok(())
    }

    /// Exact row timestamps, in nanoseconds since epoch.
    pub fn timestamps(&self) -> Vec<i64> {
        self.rows.iter().map(|row| row.timestamp()).collect()
    }

    /// Column layout of this table.
    pub fn columns(&self) -> Vec<Column> {
        Column::layout(self.depth)
    }

    /// Column headers, in file order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.to_string()).collect()
    }

    /// All values of the named column, or `None` if no such column exists.
    ///
    /// Values are `f64`, so nanosecond timestamps near the present lose
    /// their low bits here. Use [`FeatureTable::timestamps`] for exact times.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let column = Column::parse(name)?;
        if let Column::Level { index, .. } = column {
            if index >= self.depth {
                return None;
            }
        }
        self.rows.iter().map(|row| column.value(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Level, LevelSet};

    fn row(label: u64, depth: usize) -> FeatureRow {
        let asks: Vec<Level> = (0..depth)
            .map(|i| Level::new(101.0 + i as f64, 1.0 + i as f64))
            .collect();
        let bids: Vec<Level> = (0..depth)
            .map(|i| Level::new(100.0 - i as f64, 2.0 + i as f64))
            .collect();
        FeatureRow::new(
            1_000 + label as i64,
            LevelSet::from(asks),
            LevelSet::from(bids),
            100.5,
            label,
        )
    }

    #[test]
    fn test_column_names() {
        let table = FeatureTable::new(2);
        assert_eq!(
            table.column_names(),
            vec![
                "time",
                "ask_price_0",
                "ask_volume_0",
                "bid_price_0",
                "bid_volume_0",
                "ask_price_1",
                "ask_volume_1",
                "bid_price_1",
                "bid_volume_1",
                "mid_price",
                "volume_bar_label",
            ]
        );
    }

    #[test]
    fn test_column_parse_round_trips_layout() {
        for column in Column::layout(3) {
            assert_eq!(Column::parse(&column.to_string()), Some(column));
        }
        assert_eq!(Column::parse("ask_size_0"), None);
        assert_eq!(Column::parse("bid_price_x"), None);
        assert_eq!(Column::parse("spread"), None);
    }

    #[test]
    fn test_push_and_columns() {
        let mut table = FeatureTable::new(2);
        table.push(row(0, 2)).unwrap();
        table.push(row(1, 2)).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.column("volume_bar_label"), Some(vec![0.0, 1.0]));
        assert_eq!(table.column("ask_price_1"), Some(vec![102.0, 102.0]));
        assert_eq!(table.column("bid_volume_0"), Some(vec![2.0, 2.0]));
        assert_eq!(table.column("time"), Some(vec![1000.0, 1001.0]));
        assert_eq!(table.column("ask_price_2"), None);
        assert_eq!(table.column("nope"), None);
    }

    #[test]
    fn test_timestamps_are_exact() {
        let mut table = FeatureTable::new(1);
        let template = row(0, 1);
        let ts = 1_700_000_000_000_000_001;
        table
            .push(FeatureRow::new(
                ts,
                template.asks().clone(),
                template.bids().clone(),
                1.0,
                0,
            ))
            .unwrap();

        assert_eq!(table.timestamps(), vec![ts]);
        // The f64 view cannot hold the last nanosecond
        assert_ne!(table.column("time").unwrap()[0] as i64, ts);
    }

    #[test]
    fn test_push_rejects_ragged_row() {
        let mut table = FeatureTable::new(2);
        let err = table.push(row(0, 1)).unwrap_err();
        assert!(matches!(err, FeatureError::Structural(_)));
        assert!(table.is_empty());
    }

    #[test]
    fn test_push_rejects_label_gap() {
        let mut table = FeatureTable::new(1);
        table.push(row(0, 1)).unwrap();
        let err = table.push(row(2, 1)).unwrap_err();
        assert!(matches!(err, FeatureError::Structural(_)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_empty_table_columns() {
        let table = FeatureTable::new(3);
        assert_eq!(table.column("mid_price"), Some(vec![]));
        assert_eq!(table.column_names().len(), 3 * 4 + 3);
    }
}

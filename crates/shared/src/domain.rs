use serde::{Deserialize, Serialize};

pub const DISTRICT_COLUMN: &str = "District";
pub const NAME_COLUMN: &str = "Name";
pub const GENDER_COLUMN: &str = "Gender";

/// Column order used when a named table's rows are mapped positionally.
pub const REFERENCE_COLUMNS: [&str; 3] = [DISTRICT_COLUMN, NAME_COLUMN, GENDER_COLUMN];

/// One cell of a fetched sheet. `None` is an empty cell.
pub type Cell = Option<String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRow {
    pub district: Cell,
    pub name: Cell,
    pub gender: Cell,
}

impl ReferenceRow {
    pub fn new(district: &str, name: &str, gender: &str) -> Self {
        Self {
            district: Some(district.to_string()),
            name: Some(name.to_string()),
            gender: Some(gender.to_string()),
        }
    }
}

/// Reference data as fetched, with columns in sheet order.
///
/// Rows are padded to the column count on construction so every cell lookup
/// by column index is in bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl ReferenceTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_reference_rows(rows: impl IntoIterator<Item = ReferenceRow>) -> Self {
        Self::new(
            REFERENCE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows.into_iter()
                .map(|row| vec![row.district, row.name, row.gender])
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// All values of one column, in row order. Empty when the column is absent.
    pub fn column(&self, column: &str) -> Vec<Option<&str>> {
        let Some(index) = self.column_index(column) else {
            return Vec::new();
        };
        self.rows.iter().map(|row| row[index].as_deref()).collect()
    }

    pub fn reference_rows(&self) -> Vec<ReferenceRow> {
        let district = self.column_index(DISTRICT_COLUMN);
        let name = self.column_index(NAME_COLUMN);
        let gender = self.column_index(GENDER_COLUMN);
        let pick = |row: &Vec<Cell>, index: Option<usize>| index.and_then(|i| row[i].clone());

        self.rows
            .iter()
            .map(|row| ReferenceRow {
                district: pick(row, district),
                name: pick(row, name),
                gender: pick(row, gender),
            })
            .collect()
    }
}

/// One submission bound for the log table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub district: String,
    pub name: String,
    pub literacy_status: String,
}

impl LogEntry {
    pub fn new(
        district: impl Into<String>,
        name: impl Into<String>,
        literacy_status: impl Into<String>,
    ) -> Self {
        Self {
            district: district.into(),
            name: name.into(),
            literacy_status: literacy_status.into(),
        }
    }

    /// The row exactly as written to the log table.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.district.clone(),
            self.name.clone(),
            self.literacy_status.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_rows_are_padded_to_column_count() {
        let table = ReferenceTable::new(
            vec!["District".into(), "Name".into(), "Gender".into()],
            vec![vec![Some("A".into())]],
        );
        let rows = table.reference_rows();
        assert_eq!(rows[0].district.as_deref(), Some("A"));
        assert_eq!(rows[0].name, None);
        assert_eq!(rows[0].gender, None);
    }

    #[test]
    fn reference_rows_follow_header_names_not_positions() {
        let table = ReferenceTable::new(
            vec!["Gender".into(), "Name".into(), "District".into()],
            vec![vec![Some("F".into()), Some("Y".into()), Some("B".into())]],
        );
        assert_eq!(table.reference_rows(), vec![ReferenceRow::new("B", "Y", "F")]);
    }

    #[test]
    fn missing_column_yields_no_values() {
        let table = ReferenceTable::new(vec!["Other".into()], vec![vec![Some("x".into())]]);
        assert!(table.column(DISTRICT_COLUMN).is_empty());
    }

    #[test]
    fn log_entry_row_keeps_field_order() {
        let entry = LogEntry::new("A", "X", "literate");
        assert_eq!(entry.to_row(), vec!["A", "X", "literate"]);
    }
}

//! Dropdown contents derived from the reference table.

use std::collections::BTreeSet;

use shared::domain::{ReferenceTable, DISTRICT_COLUMN, NAME_COLUMN};

/// Distinct non-empty districts, ascending.
pub fn districts(table: &ReferenceTable) -> Vec<String> {
    distinct(table.column(DISTRICT_COLUMN))
}

/// Distinct non-empty names of rows whose district equals `district` exactly,
/// ascending. Unknown districts give an empty list.
pub fn names(table: &ReferenceTable, district: &str) -> Vec<String> {
    let districts = table.column(DISTRICT_COLUMN);
    let names = table.column(NAME_COLUMN);
    distinct(
        districts
            .into_iter()
            .zip(names)
            .filter(|(d, _)| *d == Some(district))
            .map(|(_, name)| name),
    )
}

fn distinct<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> Vec<String> {
    values
        .into_iter()
        .flatten()
        .filter(|value| !value.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::ReferenceRow;

    fn table(rows: &[(Option<&str>, Option<&str>)]) -> ReferenceTable {
        ReferenceTable::from_reference_rows(rows.iter().map(|(d, n)| ReferenceRow {
            district: d.map(str::to_string),
            name: n.map(str::to_string),
            gender: None,
        }))
    }

    #[test]
    fn two_district_scenario() {
        let table = ReferenceTable::from_reference_rows([
            ReferenceRow::new("A", "X", "M"),
            ReferenceRow::new("B", "Y", "F"),
        ]);
        assert_eq!(districts(&table), vec!["A", "B"]);
        assert_eq!(names(&table, "A"), vec!["X"]);
    }

    #[test]
    fn districts_are_distinct_sorted_and_skip_blanks() {
        let table = table(&[
            (Some("b"), Some("1")),
            (Some("B"), Some("2")),
            (None, Some("3")),
            (Some(""), Some("4")),
            (Some("B"), Some("5")),
            (Some("a"), Some("6")),
        ]);
        assert_eq!(districts(&table), vec!["B", "a", "b"]);
    }

    #[test]
    fn names_match_district_exactly() {
        let table = table(&[
            (Some("North"), Some("Zed")),
            (Some("North"), Some("Amy")),
            (Some("North"), Some("Amy")),
            (Some("north"), Some("Bob")),
            (Some("North "), Some("Cat")),
            (Some("North"), None),
            (Some("North"), Some("")),
        ]);
        assert_eq!(names(&table, "North"), vec!["Amy", "Zed"]);
        assert_eq!(names(&table, "north"), vec!["Bob"]);
    }

    #[test]
    fn unknown_district_has_no_names() {
        let table = table(&[(Some("A"), Some("X"))]);
        assert!(names(&table, "Z").is_empty());
    }

    #[test]
    fn empty_table_has_no_districts() {
        assert!(districts(&ReferenceTable::empty()).is_empty());
    }

    #[test]
    fn names_are_subset_of_rows_for_each_district() {
        let table = table(&[
            (Some("A"), Some("X")),
            (Some("B"), Some("Y")),
            (Some("A"), Some("W")),
            (Some("C"), None),
        ]);
        let rows = table.reference_rows();
        for district in districts(&table) {
            let candidates = names(&table, &district);
            let mut sorted = candidates.clone();
            sorted.sort();
            sorted.dedup();
            assert_eq!(candidates, sorted);
            for name in &candidates {
                assert!(rows.iter().any(|row| {
                    row.district.as_deref() == Some(district.as_str())
                        && row.name.as_deref() == Some(name.as_str())
                }));
            }
        }
    }
}

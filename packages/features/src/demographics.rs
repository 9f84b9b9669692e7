//! Demographic join by locality key.

use std::collections::BTreeMap;

use scout_features_models::DemographicRecord;
use scout_grid_models::Cell;

use crate::Aggregator;

/// Left-joins demographic rows onto cells by postal code.
///
/// Cells without a locality key, or whose key has no row, keep every
/// demographic attribute as null rather than being dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemographicAggregator;

impl Aggregator for DemographicAggregator {
    type Dataset = [DemographicRecord];

    fn name(&self) -> &'static str {
        "demographics"
    }

    fn populate(&self, mut cells: Vec<Cell>, dataset: &[DemographicRecord]) -> Vec<Cell> {
        let mut by_key: BTreeMap<&str, &DemographicRecord> = BTreeMap::new();
        let mut duplicates = 0usize;
        for record in dataset {
            if by_key.contains_key(record.locality_key.as_str()) {
                duplicates += 1;
            } else {
                by_key.insert(&record.locality_key, record);
            }
        }
        if duplicates > 0 {
            log::warn!("Ignoring {duplicates} demographic rows with a repeated locality key");
        }

        let columns = attribute_names(dataset);

        let mut matched = 0usize;
        for cell in &mut cells {
            let record = cell
                .locality_key
                .as_deref()
                .and_then(|key| by_key.get(key).copied());

            if record.is_some() {
                matched += 1;
            }

            for column in &columns {
                let value = record.and_then(|r| {
                    r.attributes
                        .iter()
                        .find(|(name, _)| name == column)
                        .and_then(|(_, v)| *v)
                });
                cell.features.insert(column.clone(), value);
            }
        }

        log::info!(
            "Joined demographics onto {matched} of {} cells ({} attributes)",
            cells.len(),
            columns.len()
        );

        cells
    }
}

/// Union of attribute names across all rows, in first-seen order.
fn attribute_names(dataset: &[DemographicRecord]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for record in dataset {
        for (name, _) in &record.attributes {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use scout_grid_models::Coordinate;

    fn cell(id: u32, key: Option<&str>) -> Cell {
        let area = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)];
        let mut cell = Cell::new(id, Coordinate::new(0.5, 0.5), area);
        cell.locality_key = key.map(str::to_string);
        cell
    }

    fn record(key: &str, population: Option<f64>) -> DemographicRecord {
        DemographicRecord {
            locality_key: key.to_string(),
            attributes: vec![
                ("population".to_string(), population),
                ("employee".to_string(), Some(10.0)),
            ],
        }
    }

    #[test]
    fn joins_matching_rows() {
        let cells = vec![cell(0, Some("8004")), cell(1, Some("8001"))];
        let dataset = vec![record("8001", Some(1200.0)), record("8004", Some(900.0))];

        let cells = DemographicAggregator.populate(cells, &dataset);

        assert_eq!(cells[0].features.value("population"), Some(900.0));
        assert_eq!(cells[1].features.value("population"), Some(1200.0));
        assert_eq!(cells[1].features.value("employee"), Some(10.0));
    }

    #[test]
    fn keeps_unmatched_cells_with_nulls() {
        let cells = vec![cell(0, Some("9999")), cell(1, None)];
        let dataset = vec![record("8001", Some(1200.0))];

        let cells = DemographicAggregator.populate(cells, &dataset);

        assert_eq!(cells.len(), 2);
        for cell in &cells {
            assert!(cell.features.contains("population"));
            assert_eq!(cell.features.value("population"), None);
        }
    }

    #[test]
    fn first_row_wins_for_repeated_keys() {
        let cells = vec![cell(0, Some("8001"))];
        let dataset = vec![record("8001", Some(1.0)), record("8001", Some(2.0))];

        let cells = DemographicAggregator.populate(cells, &dataset);

        assert_eq!(cells[0].features.value("population"), Some(1.0));
        assert_eq!(cells[0].features.len(), 2);
    }
}

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::models::{AnomalySummary, Transaction};

/// Aggregates over the rows currently shown in the table.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PageSummary {
    /// Category totals in the order each category first appears.
    pub categories: Vec<(String, f64)>,
    pub anomalies: AnomalySummary,
    /// Monthly totals keyed by `YYYY-MM`, ascending.
    pub monthly: BTreeMap<String, f64>,
}

impl PageSummary {
    pub fn from_rows(rows: &[Transaction]) -> Self {
        let mut categories: Vec<(String, f64)> = Vec::new();
        let mut category_index: HashMap<&str, usize> = HashMap::new();
        let mut anomalies = AnomalySummary::default();
        let mut monthly: BTreeMap<String, f64> = BTreeMap::new();

        for row in rows {
            match category_index.get(row.predicted_category.as_str()) {
                Some(&idx) => categories[idx].1 += row.amount,
                None => {
                    category_index.insert(&row.predicted_category, categories.len());
                    categories.push((row.predicted_category.clone(), row.amount));
                }
            }

            if row.is_anomaly {
                anomalies.anomaly += 1;
            } else {
                anomalies.normal += 1;
            }

            *monthly.entry(row.month().to_string()).or_insert(0.0) += row.amount;
        }

        Self {
            categories,
            anomalies,
            monthly,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

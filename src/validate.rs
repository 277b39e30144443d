//! Read-only cross-table reference scan.
//!
//! Reports, for a given identifier, every configured table still
//! referencing it. Run before an account deletion to show an operator the
//! blast radius, and after a sweep to confirm zero residual references.
//! Never mutates.

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::constants::VALIDATOR_SAMPLE_LIMIT;
use crate::store::tables::ProbeTable;
use crate::store::{Filter, RowStore, Value};

/// Rows still referencing the identifier in one table
#[derive(Debug, Serialize)]
pub struct TableReferences {
    pub table: String,
    pub count: u64,
    /// Bounded sample of the matching rows
    pub sample: Vec<JsonValue>,
}

/// A table that could not be queried; the scan continues past it
#[derive(Debug, Serialize)]
pub struct TableScanError {
    pub table: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct ReferenceScan {
    pub target_id: String,
    pub tables: Vec<TableReferences>,
    pub errors: Vec<TableScanError>,
}

impl ReferenceScan {
    /// True when every probed table reported zero references
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.tables.iter().all(|t| t.count == 0)
    }

    pub fn total_references(&self) -> u64 {
        self.tables.iter().map(|t| t.count).sum()
    }
}

/// Probe each table with an OR filter across its configured columns and
/// collect a count plus a bounded sample per table.
pub async fn scan_references(
    store: &dyn RowStore,
    target_id: &str,
    probes: &[ProbeTable],
) -> ReferenceScan {
    let mut scan = ReferenceScan {
        target_id: target_id.to_string(),
        tables: Vec::new(),
        errors: Vec::new(),
    };

    for probe in probes {
        let filter = Filter::AnyEq(
            probe
                .columns
                .iter()
                .map(|column| (column.to_string(), Value::text(target_id)))
                .collect(),
        );

        match store.select(probe.table, &[filter], None, None).await {
            Ok(rows) => {
                let count = rows.len() as u64;
                let mut sample = rows;
                sample.truncate(VALIDATOR_SAMPLE_LIMIT);
                scan.tables.push(TableReferences {
                    table: probe.table.to_string(),
                    count,
                    sample,
                });
            }
            Err(e) => {
                tracing::warn!(table = probe.table, error = %e, "validator probe failed");
                scan.errors.push(TableScanError {
                    table: probe.table.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    scan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tables::USER_REFERENCE_PROBES_V1;
    use crate::store::MemStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_scan_counts_references_per_table() {
        let store = MemStore::new();
        store.seed("user_profiles", json!({"id": "u1", "email": "a@b.c"}));
        store.seed("sales", json!({"id": "s1", "created_by": "u1"}));
        store.seed("sales", json!({"id": "s2", "user_id": "u1"}));
        store.seed("sales", json!({"id": "s3", "created_by": "someone-else"}));

        let scan = scan_references(&store, "u1", USER_REFERENCE_PROBES_V1).await;
        assert!(scan.errors.is_empty());
        assert!(!scan.is_clean());
        assert_eq!(scan.total_references(), 3);

        let sales = scan.tables.iter().find(|t| t.table == "sales").unwrap();
        assert_eq!(sales.count, 2);
    }

    #[tokio::test]
    async fn test_unreachable_table_reported_without_aborting() {
        let store = MemStore::new();
        store.seed("sales", json!({"id": "s1", "created_by": "u1"}));
        store.fail_table("expenses");

        let scan = scan_references(&store, "u1", USER_REFERENCE_PROBES_V1).await;
        assert_eq!(scan.errors.len(), 1);
        assert_eq!(scan.errors[0].table, "expenses");
        // Remaining tables were still scanned
        assert!(scan.tables.iter().any(|t| t.table == "sales" && t.count == 1));
    }

    #[tokio::test]
    async fn test_clean_scan() {
        let store = MemStore::new();
        let scan = scan_references(&store, "u1", USER_REFERENCE_PROBES_V1).await;
        assert!(scan.is_clean());
        assert_eq!(scan.total_references(), 0);
    }
}

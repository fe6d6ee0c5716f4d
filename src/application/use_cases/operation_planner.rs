// ============================================================
// OPERATION PLANNER
// ============================================================
// Turns sanitized field records into ordered import operations

use crate::domain::batch::{ImportOperation, ImportRoutine};
use crate::domain::csv::{FieldRecord, Projection};
use crate::domain::error::Result;

pub struct OperationPlanner {
    projection: Projection,
}

impl OperationPlanner {
    /// Fails when the projection reads a field outside `recognized_fields`
    pub fn new(projection: Projection, recognized_fields: &[String]) -> Result<Self> {
        projection.validate(recognized_fields)?;
        Ok(Self { projection })
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// One `InsertRow` operation per record, in input order
    pub fn plan(&self, records: Vec<FieldRecord>) -> Vec<ImportOperation> {
        records
            .iter()
            .enumerate()
            .map(|(sequence, record)| ImportOperation {
                sequence,
                line: record.line,
                routine: ImportRoutine::InsertRow,
                record: self.projection.apply(record),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::csv::{CsvField, DerivationRule};
    use std::collections::BTreeMap;

    fn recognized() -> Vec<String> {
        vec!["first_name".to_string(), "last_name".to_string()]
    }

    fn record(line: u64, first: &str, last: &str) -> FieldRecord {
        let mut record = FieldRecord::new(line);
        if !first.is_empty() {
            record.insert(CsvField::new("first_name", first));
        }
        if !last.is_empty() {
            record.insert(CsvField::new("last_name", last));
        }
        record
    }

    #[test]
    fn test_plan_preserves_order_and_lines() {
        let planner = OperationPlanner::new(Projection::full_name(), &recognized()).unwrap();
        let ops = planner.plan(vec![record(2, "Ann", "Lee"), record(4, "Bo", "Shah")]);

        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].sequence, 0);
        assert_eq!(ops[0].line, 2);
        assert_eq!(ops[0].routine, ImportRoutine::InsertRow);
        assert_eq!(ops[0].record.get("full_name"), Some("Ann Lee"));
        assert_eq!(ops[1].sequence, 1);
        assert_eq!(ops[1].line, 4);
        assert_eq!(ops[1].record.get("full_name"), Some("Bo Shah"));
    }

    #[test]
    fn test_plan_empty_input() {
        let planner = OperationPlanner::new(Projection::full_name(), &recognized()).unwrap();
        assert!(planner.plan(Vec::new()).is_empty());
    }

    #[test]
    fn test_single_name_part() {
        let planner = OperationPlanner::new(Projection::full_name(), &recognized()).unwrap();
        let ops = planner.plan(vec![record(2, "Ann", "")]);
        assert_eq!(ops[0].record.get("full_name"), Some("Ann"));
    }

    #[test]
    fn test_rejects_projection_over_unknown_field() {
        let mut rules = BTreeMap::new();
        rules.insert(
            "contact".to_string(),
            DerivationRule::Field {
                source: "email".to_string(),
            },
        );
        assert!(OperationPlanner::new(Projection::new(rules), &recognized()).is_err());
    }
}

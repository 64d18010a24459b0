//! Input value checks run before aggregation
//!
//! Magnitudes beyond `MAX_QUARTERLY_MAGNITUDE` reject the snapshot; negative
//! goals or budgets are kept but reported (V001) against the record's bucket.

use budgetplan_core::{ClassifiedRecord, Diagnostic, DiagnosticCode, Metric, RecordError};
use rust_decimal::Decimal;
use tracing::warn;

/// Check every classified record, in snapshot order
pub fn check_values(records: &[ClassifiedRecord]) -> Result<Vec<Diagnostic>, RecordError> {
    let mut diagnostics = Vec::new();
    for (position, classified) in records.iter().enumerate() {
        let record = &classified.record;
        record.check_magnitude(position)?;

        for metric in Metric::ALL {
            for (q, value) in record.quarterly(metric).iter().enumerate() {
                if *value < Decimal::ZERO {
                    let message = format!(
                        "record {} ('{}' in '{}'): {} for quarter {} is negative ({})",
                        position + 1,
                        record.activity_name.trim(),
                        record.family_name.trim(),
                        metric.label(),
                        q + 1,
                        value
                    );
                    warn!(code = DiagnosticCode::NegativeValue.as_str(), "{message}");
                    diagnostics.push(
                        Diagnostic::new(DiagnosticCode::NegativeValue, message)
                            .in_bucket(classified.classification),
                    );
                }
            }
        }
    }
    Ok(diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify_record;
    use budgetplan_core::{AttentionLevel, RawActivityRecord};
    use rust_decimal_macros::dec;

    #[test]
    fn negative_values_are_reported_per_quarter() {
        let records = vec![
            classify_record(
                RawActivityRecord::new("Emergencia", "Triaje")
                    .level_text("Nivel II")
                    .goals([dec!(1), dec!(-2), dec!(0), dec!(0)])
                    .budgets([dec!(0), dec!(0), dec!(0), dec!(-0.50)]),
            ),
            classify_record(RawActivityRecord::new("Emergencia", "Camas").level_text("Nivel II")),
        ];
        let diagnostics = check_values(&records).unwrap();

        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics
            .iter()
            .all(|d| d.code == DiagnosticCode::NegativeValue));
        assert_eq!(diagnostics[0].bucket, Some(AttentionLevel::II.into()));
        assert_eq!(
            diagnostics[0].message,
            "record 1 ('Triaje' in 'Emergencia'): Meta for quarter 2 is negative (-2)"
        );
        assert!(diagnostics[1].message.contains("Presupuesto for quarter 4"));
    }

    #[test]
    fn oversized_values_reject_the_snapshot() {
        let records = vec![
            classify_record(RawActivityRecord::new("F", "A").level_text("Nivel I")),
            classify_record(
                RawActivityRecord::new("F", "B")
                    .level_text("Nivel I")
                    .budgets([Decimal::MAX, dec!(0), dec!(0), dec!(0)]),
            ),
        ];
        let err = check_values(&records).unwrap_err();
        assert!(matches!(
            err,
            RecordError::ValueOutOfRange {
                record: 2,
                quarter: 1,
                metric: Metric::Budget,
                ..
            }
        ));
    }

    #[test]
    fn clean_records_pass_silently() {
        let records = vec![classify_record(
            RawActivityRecord::new("F", "A").goals([dec!(3); 4]),
        )];
        assert_eq!(check_values(&records).unwrap(), Vec::new());
    }
}

//! Attention level classification
//!
//! Level text arrives as free text ("NIVEL III - Hospitales", "ii", "Nivel I").
//! Tokens are tested longest first: "nivel iii" contains "nivel i" as a prefix, so
//! testing the short token first would file every level III record under level I.

use budgetplan_core::{
    AttentionLevel, Classification, ClassifiedRecord, Diagnostic, DiagnosticCode,
    RawActivityRecord,
};
use tracing::warn;

/// (substring token, exact token, level), most specific first
const LEVEL_TOKENS: [(&str, &str, AttentionLevel); 3] = [
    ("nivel iii", "iii", AttentionLevel::III),
    ("nivel ii", "ii", AttentionLevel::II),
    ("nivel i", "i", AttentionLevel::I),
];

/// Lower-case, trim and collapse whitespace runs
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Classify a level text
pub fn classify(text: &str) -> Classification {
    let text = normalize(text);
    LEVEL_TOKENS
        .iter()
        .find(|(phrase, exact, _)| text.contains(phrase) || text == *exact)
        .map_or(Classification::Unclassified, |(_, _, level)| {
            Classification::Level(*level)
        })
}

/// Classify one record, taking ownership of it
pub fn classify_record(record: RawActivityRecord) -> ClassifiedRecord {
    let classification = classify(&record.attention_level_text);
    ClassifiedRecord {
        record,
        classification,
    }
}

/// Classify a snapshot. Unclassified records are kept and reported, never dropped.
pub fn classify_all(records: &[RawActivityRecord]) -> (Vec<ClassifiedRecord>, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let classified = records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let classified = classify_record(record.clone());
            if classified.classification == Classification::Unclassified {
                let message = format!(
                    "record {} ('{}' in '{}'): level text '{}' matches no attention level",
                    index + 1,
                    record.activity_name.trim(),
                    record.family_name.trim(),
                    record.attention_level_text
                );
                warn!(code = DiagnosticCode::UnclassifiedLevel.as_str(), "{message}");
                diagnostics.push(
                    Diagnostic::new(DiagnosticCode::UnclassifiedLevel, message)
                        .in_bucket(Classification::Unclassified),
                );
            }
            classified
        })
        .collect();
    (classified, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(l: AttentionLevel) -> Classification {
        Classification::Level(l)
    }

    #[test]
    fn level_three_is_not_mistaken_for_level_one() {
        assert_eq!(classify("NIVEL III - Hospitales"), level(AttentionLevel::III));
    }

    #[test]
    fn level_two_is_not_mistaken_for_level_one() {
        assert_eq!(classify("Nivel II"), level(AttentionLevel::II));
        assert_eq!(classify("establecimiento de nivel ii-2"), level(AttentionLevel::II));
    }

    #[test]
    fn level_one_phrase() {
        assert_eq!(classify("NIVEL I"), level(AttentionLevel::I));
        assert_eq!(classify("Puestos de salud - nivel i"), level(AttentionLevel::I));
    }

    #[test]
    fn exact_roman_numerals() {
        assert_eq!(classify("iii"), level(AttentionLevel::III));
        assert_eq!(classify(" II "), level(AttentionLevel::II));
        assert_eq!(classify("I"), level(AttentionLevel::I));
    }

    #[test]
    fn extra_whitespace_is_collapsed() {
        assert_eq!(classify("  NIVEL   III  "), level(AttentionLevel::III));
    }

    #[test]
    fn unknown_text_is_unclassified() {
        assert_eq!(classify(""), Classification::Unclassified);
        assert_eq!(classify("   "), Classification::Unclassified);
        assert_eq!(classify("hospital"), Classification::Unclassified);
        // a bare numeral inside other text is not a level
        assert_eq!(classify("sala ii"), Classification::Unclassified);
    }

    #[test]
    fn classify_all_reports_unclassified() {
        let records = vec![
            RawActivityRecord::new("F", "A").level_text("Nivel I"),
            RawActivityRecord::new("F", "B").level_text("otro"),
        ];
        let (classified, diagnostics) = classify_all(&records);

        assert_eq!(classified.len(), 2);
        assert_eq!(classified[1].classification, Classification::Unclassified);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::UnclassifiedLevel);
        assert!(diagnostics[0].message.contains("record 2"));
    }
}

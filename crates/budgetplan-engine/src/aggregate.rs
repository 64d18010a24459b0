//! Hierarchical aggregation: level → family → merged activity
//!
//! Records of one level are grouped by family, and inside a family records that
//! name the same activity are merged by summing their quarterly vectors. Names are
//! compared trimmed and case-insensitively; the first record seen supplies every
//! descriptive field of the merged row. Records without an activity name are
//! never merged with each other.

use budgetplan_core::{
    add_quarterly, Classification, ClassifiedRecord, Diagnostic, DiagnosticCode, Metric,
    NamedRef, Quarterly, RawActivityRecord,
};
use rayon::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Comparison key for family and activity names
pub fn identity_key(name: &str) -> String {
    name.trim().to_lowercase()
}

// ============================================================================
// Rows
// ============================================================================

/// Identity of a merged row within its family
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RowIdentity {
    /// Normalized activity name
    Named(String),
    /// Record without a name; carries the record's position in the input snapshot
    Unnamed(usize),
}

/// All records of one family that share an activity name
#[derive(Clone, Debug, PartialEq)]
pub struct MergedDetailRow {
    pub identity: RowIdentity,
    pub family_name: String,
    /// First-seen trimmed display name
    pub activity_name: String,
    pub measurement_unit: String,
    pub center_code: String,
    pub center_name: String,
    pub strategic_objective: NamedRef,
    pub strategic_action: NamedRef,
    pub goal_by_quarter: Quarterly,
    pub budget_by_quarter: Quarterly,
    /// Number of raw records folded into this row
    pub merged_count: usize,
}

impl MergedDetailRow {
    fn seed(identity: RowIdentity, family_name: &str, record: &RawActivityRecord) -> Self {
        Self {
            identity,
            family_name: family_name.to_string(),
            activity_name: record.activity_name.trim().to_string(),
            measurement_unit: record.measurement_unit.trim().to_string(),
            center_code: record.center_code.clone(),
            center_name: record.center_name.clone(),
            strategic_objective: record.strategic_objective.clone(),
            strategic_action: record.strategic_action.clone(),
            goal_by_quarter: record.goal_by_quarter,
            budget_by_quarter: record.budget_by_quarter,
            merged_count: 1,
        }
    }

    /// Add a record's vectors; descriptive fields stay as first seen
    fn absorb(&mut self, record: &RawActivityRecord) {
        self.goal_by_quarter = add_quarterly(&self.goal_by_quarter, &record.goal_by_quarter);
        self.budget_by_quarter =
            add_quarterly(&self.budget_by_quarter, &record.budget_by_quarter);
        self.merged_count += 1;
    }

    /// Describe how `record` disagrees with this row, if it does
    fn conflict_with(&self, record: &RawActivityRecord) -> Option<String> {
        let mut fields = Vec::new();
        if identity_key(&record.measurement_unit) != identity_key(&self.measurement_unit) {
            fields.push(format!(
                "measurement unit '{}' vs '{}'",
                self.measurement_unit,
                record.measurement_unit.trim()
            ));
        }
        if record.center_code != self.center_code {
            fields.push(format!(
                "center '{}' vs '{}'",
                self.center_code, record.center_code
            ));
        }
        (!fields.is_empty()).then(|| fields.join(", "))
    }

    pub fn quarterly(&self, metric: Metric) -> &Quarterly {
        match metric {
            Metric::Goal => &self.goal_by_quarter,
            Metric::Budget => &self.budget_by_quarter,
        }
    }

    pub fn total(&self, metric: Metric) -> Decimal {
        self.quarterly(metric).iter().sum()
    }

    pub fn goal_total(&self) -> Decimal {
        self.total(Metric::Goal)
    }

    pub fn budget_total(&self) -> Decimal {
        self.total(Metric::Budget)
    }
}

/// One family of a level with its merged rows and their sums
#[derive(Clone, Debug, PartialEq)]
pub struct ConsolidatedFamilyRow {
    pub family_name: String,
    pub rows: Vec<MergedDetailRow>,
    pub goal_by_quarter: Quarterly,
    pub budget_by_quarter: Quarterly,
}

impl ConsolidatedFamilyRow {
    /// Build a family from its rows; totals are the element-wise sum of the rows
    pub fn from_rows(family_name: impl Into<String>, rows: Vec<MergedDetailRow>) -> Self {
        let zero = [Decimal::ZERO; 4];
        let goal_by_quarter = rows
            .iter()
            .fold(zero, |acc, r| add_quarterly(&acc, &r.goal_by_quarter));
        let budget_by_quarter = rows
            .iter()
            .fold(zero, |acc, r| add_quarterly(&acc, &r.budget_by_quarter));
        Self {
            family_name: family_name.into(),
            rows,
            goal_by_quarter,
            budget_by_quarter,
        }
    }

    pub fn quarterly(&self, metric: Metric) -> &Quarterly {
        match metric {
            Metric::Goal => &self.goal_by_quarter,
            Metric::Budget => &self.budget_by_quarter,
        }
    }

    pub fn total(&self, metric: Metric) -> Decimal {
        self.quarterly(metric).iter().sum()
    }

    pub fn goal_total(&self) -> Decimal {
        self.total(Metric::Goal)
    }

    pub fn budget_total(&self) -> Decimal {
        self.total(Metric::Budget)
    }
}

/// Families of one classification bucket
#[derive(Clone, Debug, PartialEq)]
pub struct LevelConsolidation {
    pub classification: Classification,
    pub families: Vec<ConsolidatedFamilyRow>,
}

impl LevelConsolidation {
    pub fn empty(classification: Classification) -> Self {
        Self {
            classification,
            families: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Number of merged detail rows across all families
    pub fn row_count(&self) -> usize {
        self.families.iter().map(|f| f.rows.len()).sum()
    }

    pub fn total(&self, metric: Metric) -> Decimal {
        self.families.iter().map(|f| f.total(metric)).sum()
    }

    /// Detail rows in family order
    pub fn detail_rows(&self) -> impl Iterator<Item = &MergedDetailRow> {
        self.families.iter().flat_map(|f| f.rows.iter())
    }
}

/// Result of aggregating one snapshot: one bucket per classification
#[derive(Clone, Debug, PartialEq)]
pub struct Consolidation {
    buckets: [LevelConsolidation; 4],
    pub diagnostics: Vec<Diagnostic>,
}

impl Consolidation {
    pub fn bucket(&self, classification: Classification) -> &LevelConsolidation {
        &self.buckets[classification.index()]
    }

    /// Buckets in report order (I, II, III, unclassified)
    pub fn buckets(&self) -> impl Iterator<Item = &LevelConsolidation> {
        self.buckets.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(LevelConsolidation::is_empty)
    }
}

// ============================================================================
// Aggregation
// ============================================================================

/// Family accumulator preserving first-seen order
struct FamilyBucket {
    display_name: String,
    rows: Vec<MergedDetailRow>,
    index: HashMap<RowIdentity, usize>,
}

/// Group one bucket's records into families of merged rows.
///
/// `records` carry their position in the input snapshot, used to give nameless
/// records a unique identity.
pub fn group_families(
    records: &[(usize, &RawActivityRecord)],
) -> (Vec<ConsolidatedFamilyRow>, Vec<Diagnostic>) {
    let mut families: Vec<FamilyBucket> = Vec::new();
    let mut family_index: HashMap<String, usize> = HashMap::new();
    let mut diagnostics = Vec::new();

    for &(position, record) in records {
        let family_slot = *family_index
            .entry(identity_key(&record.family_name))
            .or_insert_with(|| {
                families.push(FamilyBucket {
                    display_name: record.family_name.trim().to_string(),
                    rows: Vec::new(),
                    index: HashMap::new(),
                });
                families.len() - 1
            });
        let family = &mut families[family_slot];

        let identity = if record.activity_name.trim().is_empty() {
            RowIdentity::Unnamed(position)
        } else {
            RowIdentity::Named(identity_key(&record.activity_name))
        };

        match family.index.get(&identity) {
            Some(&row_slot) => {
                let row = &mut family.rows[row_slot];
                if let Some(conflict) = row.conflict_with(record) {
                    let message = format!(
                        "'{}' in family '{}' merged despite differing {}; keeping first-seen values",
                        row.activity_name, family.display_name, conflict
                    );
                    warn!(code = DiagnosticCode::MergeIdentityCollision.as_str(), "{message}");
                    diagnostics.push(Diagnostic::new(
                        DiagnosticCode::MergeIdentityCollision,
                        message,
                    ));
                }
                row.absorb(record);
            }
            None => {
                let row = MergedDetailRow::seed(identity.clone(), &family.display_name, record);
                family.index.insert(identity, family.rows.len());
                family.rows.push(row);
            }
        }
    }

    let families = families
        .into_iter()
        .map(|f| ConsolidatedFamilyRow::from_rows(f.display_name, f.rows))
        .collect();
    (families, diagnostics)
}

/// Aggregate classified records into per-level family trees.
///
/// With `parallel` set, the four buckets are folded on the rayon pool; results are
/// collected in bucket order either way.
pub fn aggregate(records: &[ClassifiedRecord], parallel: bool) -> Consolidation {
    let mut partitions: [Vec<(usize, &RawActivityRecord)>; 4] = Default::default();
    for (position, classified) in records.iter().enumerate() {
        partitions[classified.classification.index()].push((position, &classified.record));
    }

    let fold = |(slot, partition): (usize, &Vec<(usize, &RawActivityRecord)>)| {
        let classification = Classification::ALL[slot];
        let (families, diagnostics) = group_families(partition);
        debug!(
            bucket = %classification,
            records = partition.len(),
            families = families.len(),
            "aggregated bucket"
        );
        let diagnostics: Vec<Diagnostic> = diagnostics
            .into_iter()
            .map(|d| d.in_bucket(classification))
            .collect();
        (
            LevelConsolidation {
                classification,
                families,
            },
            diagnostics,
        )
    };

    let folded: Vec<(LevelConsolidation, Vec<Diagnostic>)> = if parallel {
        partitions.par_iter().enumerate().map(fold).collect()
    } else {
        partitions.iter().enumerate().map(fold).collect()
    };

    let mut diagnostics = Vec::new();
    let mut buckets = Classification::ALL.map(LevelConsolidation::empty);
    for (level, diags) in folded {
        let slot = level.classification.index();
        buckets[slot] = level;
        diagnostics.extend(diags);
    }

    Consolidation {
        buckets,
        diagnostics,
    }
}

//! # budgetplan-core
//!
//! Core domain model and traits for the budgetplan consolidation engine.
//!
//! This crate provides:
//! - Domain types: `RawActivityRecord`, `AttentionLevel`, `FiscalContext`, `ReportRequest`
//! - The declarative workbook description handed to renderers (`workbook`)
//! - Core traits: `Renderer`
//! - Diagnostics, error types and result aliases
//!
//! ## Example
//!
//! ```rust
//! use budgetplan_core::{FiscalContext, RawActivityRecord};
//! use rust_decimal::Decimal;
//!
//! let record = RawActivityRecord::new("Emergencia", "Triaje")
//!     .level_text("NIVEL III - Hospitales")
//!     .goals([Decimal::from(5); 4]);
//! assert_eq!(record.goal_total(), Decimal::from(20));
//!
//! let ctx = FiscalContext::new(2025, "Hospital Regional")
//!     .modification(2)
//!     .current_quarter(3);
//! assert!(ctx.validate().is_ok());
//! ```

pub mod workbook;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::workbook::Workbook;

// ============================================================================
// Calendar constants and type aliases
// ============================================================================

/// Number of quarters in a fiscal year
pub const QUARTERS: usize = 4;

/// Number of months in a fiscal year
pub const MONTHS: usize = 12;

/// Number of months in one quarter
pub const MONTHS_PER_QUARTER: usize = 3;

/// One value per quarter, Q1 first
pub type Quarterly = [Decimal; QUARTERS];

/// One value per month, January first
pub type Monthly = [Decimal; MONTHS];

/// Element-wise sum of two quarterly vectors
pub fn add_quarterly(lhs: &Quarterly, rhs: &Quarterly) -> Quarterly {
    let mut out = *lhs;
    for (acc, value) in out.iter_mut().zip(rhs) {
        *acc += *value;
    }
    out
}

/// Quarter (1-based) that contains the given month (1-based)
pub fn quarter_of_month(month: usize) -> usize {
    (month - 1) / MONTHS_PER_QUARTER + 1
}

/// First month (1-based) of the given quarter (1-based)
pub fn first_month_of_quarter(quarter: usize) -> usize {
    (quarter - 1) * MONTHS_PER_QUARTER + 1
}

// ============================================================================
// Raw records
// ============================================================================

/// Identifier/name pair used for strategic objectives and actions
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: String,
    pub name: String,
}

impl NamedRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// One operational activity of one dependency, as delivered by the data-access layer.
///
/// Totals are never stored; `goal_total` and `budget_total` always recompute them
/// from the quarterly vectors.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawActivityRecord {
    /// Free-text attention level ("NIVEL II", "iii", ...)
    pub attention_level_text: String,
    pub strategic_objective: NamedRef,
    pub strategic_action: NamedRef,
    /// Display name of the operational activity
    pub activity_name: String,
    /// Operating unit the activity belongs to
    pub family_name: String,
    pub measurement_unit: String,
    pub center_code: String,
    pub center_name: String,
    pub dependency_id: String,
    pub goal_by_quarter: Quarterly,
    pub budget_by_quarter: Quarterly,
}

impl RawActivityRecord {
    /// Create a record for an activity inside a family
    pub fn new(family: impl Into<String>, activity: impl Into<String>) -> Self {
        Self {
            family_name: family.into(),
            activity_name: activity.into(),
            ..Default::default()
        }
    }

    /// Set the attention level text
    pub fn level_text(mut self, text: impl Into<String>) -> Self {
        self.attention_level_text = text.into();
        self
    }

    /// Set the quarterly goals
    pub fn goals(mut self, goals: Quarterly) -> Self {
        self.goal_by_quarter = goals;
        self
    }

    /// Set the quarterly budget
    pub fn budgets(mut self, budgets: Quarterly) -> Self {
        self.budget_by_quarter = budgets;
        self
    }

    /// Set the measurement unit
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.measurement_unit = unit.into();
        self
    }

    /// Set the cost center
    pub fn center(mut self, code: impl Into<String>, name: impl Into<String>) -> Self {
        self.center_code = code.into();
        self.center_name = name.into();
        self
    }

    /// Set the owning dependency
    pub fn dependency(mut self, id: impl Into<String>) -> Self {
        self.dependency_id = id.into();
        self
    }

    pub fn goal_total(&self) -> Decimal {
        self.goal_by_quarter.iter().sum()
    }

    pub fn budget_total(&self) -> Decimal {
        self.budget_by_quarter.iter().sum()
    }

    pub fn quarterly(&self, metric: Metric) -> &Quarterly {
        match metric {
            Metric::Goal => &self.goal_by_quarter,
            Metric::Budget => &self.budget_by_quarter,
        }
    }

    /// Reject values too large to aggregate and write exactly.
    ///
    /// `position` is the record's 0-based index in its snapshot.
    pub fn check_magnitude(&self, position: usize) -> Result<(), RecordError> {
        let limit = Decimal::from(MAX_QUARTERLY_MAGNITUDE);
        for metric in Metric::ALL {
            for (q, value) in self.quarterly(metric).iter().enumerate() {
                if value.abs() > limit {
                    return Err(RecordError::ValueOutOfRange {
                        record: position + 1,
                        activity: self.activity_name.trim().to_string(),
                        metric,
                        quarter: q + 1,
                        value: *value,
                    });
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Attention levels
// ============================================================================

/// Facility complexity tier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttentionLevel {
    I,
    II,
    III,
}

impl AttentionLevel {
    pub const ALL: [AttentionLevel; 3] = [AttentionLevel::I, AttentionLevel::II, AttentionLevel::III];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttentionLevel::I => "I",
            AttentionLevel::II => "II",
            AttentionLevel::III => "III",
        }
    }
}

impl std::fmt::Display for AttentionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of classifying a record's attention level text
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Classification {
    Level(AttentionLevel),
    /// The text matched none of the known level tokens
    Unclassified,
}

impl Classification {
    /// Every bucket in report order: I, II, III, then unclassified
    pub const ALL: [Classification; 4] = [
        Classification::Level(AttentionLevel::I),
        Classification::Level(AttentionLevel::II),
        Classification::Level(AttentionLevel::III),
        Classification::Unclassified,
    ];

    pub fn level(&self) -> Option<AttentionLevel> {
        match self {
            Classification::Level(level) => Some(*level),
            Classification::Unclassified => None,
        }
    }

    /// Position in `Classification::ALL`
    pub fn index(&self) -> usize {
        match self {
            Classification::Level(AttentionLevel::I) => 0,
            Classification::Level(AttentionLevel::II) => 1,
            Classification::Level(AttentionLevel::III) => 2,
            Classification::Unclassified => 3,
        }
    }

    /// Label used in sheet names and titles
    pub fn label(&self) -> String {
        match self {
            Classification::Level(level) => format!("Nivel {level}"),
            Classification::Unclassified => "Sin Nivel".to_string(),
        }
    }
}

impl From<AttentionLevel> for Classification {
    fn from(level: AttentionLevel) -> Self {
        Classification::Level(level)
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A raw record paired with its classification
#[derive(Clone, Debug, PartialEq)]
pub struct ClassifiedRecord {
    pub record: RawActivityRecord,
    pub classification: Classification,
}

// ============================================================================
// Metrics
// ============================================================================

/// The two figures every activity carries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Metric {
    Goal,
    Budget,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Goal, Metric::Budget];

    pub fn axis(&self) -> Axis {
        match self {
            Metric::Goal => Axis::Count,
            Metric::Budget => Axis::Currency,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Goal => "Meta",
            Metric::Budget => "Presupuesto",
        }
    }
}

/// Kind of quantity carried by a series; fixes its smallest indivisible unit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Whole units (patients, sessions, reports)
    Count,
    /// Money, split down to the cent
    Currency,
}

impl Axis {
    /// Smallest amount the distributor will hand to a single month
    pub fn unit(&self) -> Decimal {
        match self {
            Axis::Count => Decimal::ONE,
            Axis::Currency => Decimal::new(1, 2),
        }
    }
}

// ============================================================================
// Fiscal context
// ============================================================================

/// Earliest fiscal year accepted by `FiscalContext::validate`
pub const MIN_FISCAL_YEAR: i32 = 1900;

/// Latest fiscal year accepted by `FiscalContext::validate`
pub const MAX_FISCAL_YEAR: i32 = 9999;

/// Per-export fiscal parameters supplied by the caller
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalContext {
    /// Fiscal year; 0 means the caller did not provide one
    pub year: i32,
    /// Display name of the dependency the report belongs to
    pub dependency_name: String,
    /// 1 = initial formulation, N >= 2 = amendment N
    pub modification: u32,
    /// Quarter in progress, 1..=4
    pub current_quarter: u8,
}

impl FiscalContext {
    /// Initial formulation in the first quarter
    pub fn new(year: i32, dependency_name: impl Into<String>) -> Self {
        Self {
            year,
            dependency_name: dependency_name.into(),
            modification: 1,
            current_quarter: 1,
        }
    }

    pub fn modification(mut self, modification: u32) -> Self {
        self.modification = modification;
        self
    }

    pub fn current_quarter(mut self, quarter: u8) -> Self {
        self.current_quarter = quarter;
        self
    }

    /// Reject contexts that cannot drive an export
    pub fn validate(&self) -> Result<(), ContextError> {
        if self.year == 0 {
            return Err(ContextError::MissingYear);
        }
        if !(MIN_FISCAL_YEAR..=MAX_FISCAL_YEAR).contains(&self.year) {
            return Err(ContextError::YearOutOfRange(self.year));
        }
        if !(1..=QUARTERS as u8).contains(&self.current_quarter) {
            return Err(ContextError::QuarterOutOfRange(self.current_quarter));
        }
        if self.modification == 0 {
            return Err(ContextError::ModificationOutOfRange(self.modification));
        }
        Ok(())
    }

    /// True once the formulation has been amended at least once
    pub fn is_amendment(&self) -> bool {
        self.modification > 1
    }

    /// Human label for the revision ("Formulación inicial", "Modificación 3")
    pub fn amendment_label(&self) -> String {
        if self.is_amendment() {
            format!("Modificación {}", self.modification)
        } else {
            "Formulación inicial".to_string()
        }
    }
}

// ============================================================================
// Report request
// ============================================================================

/// Which attention levels a report covers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelScope {
    I,
    II,
    III,
    /// Every level plus the unclassified bucket
    #[default]
    All,
}

impl LevelScope {
    /// Buckets covered by this scope, in report order
    pub fn buckets(&self) -> Vec<Classification> {
        match self {
            LevelScope::I => vec![AttentionLevel::I.into()],
            LevelScope::II => vec![AttentionLevel::II.into()],
            LevelScope::III => vec![AttentionLevel::III.into()],
            LevelScope::All => Classification::ALL.to_vec(),
        }
    }
}

impl FromStr for LevelScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "i" | "1" => Ok(LevelScope::I),
            "ii" | "2" => Ok(LevelScope::II),
            "iii" | "3" => Ok(LevelScope::III),
            "all" => Ok(LevelScope::All),
            other => Err(format!("unknown level scope '{other}' (expected i, ii, iii or all)")),
        }
    }
}

/// Period columns of a report
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Quarterly,
    Monthly,
}

impl Granularity {
    pub fn periods(&self) -> usize {
        match self {
            Granularity::Quarterly => QUARTERS,
            Granularity::Monthly => MONTHS,
        }
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "quarterly" | "q" => Ok(Granularity::Quarterly),
            "monthly" | "m" => Ok(Granularity::Monthly),
            other => Err(format!("unknown granularity '{other}' (expected quarterly or monthly)")),
        }
    }
}

/// Detail-only workbook, or detail plus formula-linked consolidation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportView {
    #[default]
    Consolidated,
    Detailed,
}

impl FromStr for ReportView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "consolidated" => Ok(ReportView::Consolidated),
            "detailed" | "detail" => Ok(ReportView::Detailed),
            other => Err(format!("unknown view '{other}' (expected consolidated or detailed)")),
        }
    }
}

/// Row key of a consolidated sheet
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsolidateBy {
    /// One row per family
    #[default]
    Family,
    /// One row per unique activity name across families
    Activity,
}

impl FromStr for ConsolidateBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "family" => Ok(ConsolidateBy::Family),
            "activity" => Ok(ConsolidateBy::Activity),
            other => Err(format!("unknown grouping '{other}' (expected family or activity)")),
        }
    }
}

/// Scope selector for one export call
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportRequest {
    pub scope: LevelScope,
    pub granularity: Granularity,
    pub view: ReportView,
    pub consolidate_by: ConsolidateBy,
}

impl ReportRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope(mut self, scope: LevelScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn view(mut self, view: ReportView) -> Self {
        self.view = view;
        self
    }

    pub fn consolidate_by(mut self, by: ConsolidateBy) -> Self {
        self.consolidate_by = by;
        self
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Severity of a diagnostic
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// Stable identifiers for recoverable conditions raised during an export
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    /// L001: level text matched none of the known tokens
    UnclassifiedLevel,
    /// M001: merged records disagree on descriptive fields
    MergeIdentityCollision,
    /// D001: a quarterly value is not a whole number of axis units
    DistributionRoundingLoss,
    /// E001: nothing to report for the requested scope
    EmptyInputSet,
    /// V001: a quarterly goal or budget is below zero
    NegativeValue,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::UnclassifiedLevel => "L001",
            DiagnosticCode::MergeIdentityCollision => "M001",
            DiagnosticCode::DistributionRoundingLoss => "D001",
            DiagnosticCode::EmptyInputSet => "E001",
            DiagnosticCode::NegativeValue => "V001",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticCode::EmptyInputSet => Severity::Info,
            _ => Severity::Warning,
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recoverable condition found while building a report
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub message: String,
    /// Classification bucket the condition was found in, if any
    pub bucket: Option<Classification>,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: code.severity(),
            message: message.into(),
            bucket: None,
        }
    }

    pub fn in_bucket(mut self, bucket: Classification) -> Self {
        self.bucket = Some(bucket);
        self
    }

    /// Untagged diagnostics concern every report
    pub fn concerns(&self, buckets: &[Classification]) -> bool {
        match self.bucket {
            Some(bucket) => buckets.contains(&bucket),
            None => true,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]: {}", self.severity.as_str(), self.code, self.message)
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Output rendering of a finished workbook description
pub trait Renderer {
    type Output;

    /// Serialize the workbook to the target format
    fn render(&self, workbook: &Workbook) -> Result<Self::Output, RenderError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Fiscal context rejected before any aggregation runs
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("Fiscal year is missing")]
    MissingYear,

    #[error("Fiscal year {0} is out of range (1900..=9999)")]
    YearOutOfRange(i32),

    #[error("Current quarter {0} is out of range (1..=4)")]
    QuarterOutOfRange(u8),

    #[error("Modification number {0} is out of range (must be >= 1)")]
    ModificationOutOfRange(u32),
}

/// Rendering error
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Largest quarterly magnitude accepted on input (15 significant digits)
pub const MAX_QUARTERLY_MAGNITUDE: i64 = 999_999_999_999_999;

/// Record rejected before aggregation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error(
        "record {record} ('{activity}'): {} for quarter {quarter} is {value}, beyond the supported magnitude of {}",
        .metric.label(),
        MAX_QUARTERLY_MAGNITUDE
    )]
    ValueOutOfRange {
        /// 1-based position in the snapshot
        record: usize,
        activity: String,
        metric: Metric,
        /// 1-based quarter
        quarter: usize,
        value: Decimal,
    },
}

/// Any failure of a full export call
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Invalid fiscal context: {0}")]
    Context(#[from] ContextError),

    #[error("Invalid records: {0}")]
    Record(#[from] RecordError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn record_totals_are_recomputed() {
        let record = RawActivityRecord::new("Emergencia", "Triaje")
            .goals([dec!(1), dec!(2), dec!(3), dec!(4)])
            .budgets([dec!(100.50), dec!(0), dec!(0), dec!(0.25)]);

        assert_eq!(record.goal_total(), dec!(10));
        assert_eq!(record.budget_total(), dec!(100.75));
    }

    #[test]
    fn record_deserializes_from_camel_case() {
        let json = r#"{
            "attentionLevelText": "NIVEL II",
            "activityName": "Consulta externa",
            "familyName": "Medicina",
            "measurementUnit": "Atención",
            "goalByQuarter": [10, 20, 30, 40],
            "budgetByQuarter": ["1500.00", "0", "0", "250.5"],
            "goalTotal": 999
        }"#;
        let record: RawActivityRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.family_name, "Medicina");
        assert_eq!(record.center_name, "");
        assert_eq!(record.goal_total(), dec!(100));
        assert_eq!(record.budget_total(), dec!(1750.5));
    }

    #[test]
    fn add_quarterly_is_elementwise() {
        let a = [dec!(1), dec!(2), dec!(3), dec!(4)];
        let b = [dec!(10), dec!(20), dec!(30), dec!(40)];
        assert_eq!(add_quarterly(&a, &b), [dec!(11), dec!(22), dec!(33), dec!(44)]);
    }

    #[test]
    fn month_quarter_mapping() {
        assert_eq!(quarter_of_month(1), 1);
        assert_eq!(quarter_of_month(3), 1);
        assert_eq!(quarter_of_month(4), 2);
        assert_eq!(quarter_of_month(12), 4);
        assert_eq!(first_month_of_quarter(1), 1);
        assert_eq!(first_month_of_quarter(3), 7);
        assert_eq!(first_month_of_quarter(4), 10);
    }

    #[test]
    fn context_validation() {
        assert!(FiscalContext::new(2025, "Sede").validate().is_ok());
        assert_eq!(
            FiscalContext::new(0, "Sede").validate(),
            Err(ContextError::MissingYear)
        );
        assert_eq!(
            FiscalContext::new(20250, "Sede").validate(),
            Err(ContextError::YearOutOfRange(20250))
        );
        assert_eq!(
            FiscalContext::new(2025, "Sede").current_quarter(5).validate(),
            Err(ContextError::QuarterOutOfRange(5))
        );
        assert_eq!(
            FiscalContext::new(2025, "Sede").current_quarter(0).validate(),
            Err(ContextError::QuarterOutOfRange(0))
        );
        assert_eq!(
            FiscalContext::new(2025, "Sede").modification(0).validate(),
            Err(ContextError::ModificationOutOfRange(0))
        );
    }

    #[test]
    fn amendment_label() {
        let ctx = FiscalContext::new(2025, "Sede");
        assert_eq!(ctx.amendment_label(), "Formulación inicial");
        assert!(!ctx.is_amendment());

        let ctx = ctx.modification(3);
        assert_eq!(ctx.amendment_label(), "Modificación 3");
        assert!(ctx.is_amendment());
    }

    #[test]
    fn scope_buckets() {
        assert_eq!(
            LevelScope::II.buckets(),
            vec![Classification::Level(AttentionLevel::II)]
        );
        let all = LevelScope::All.buckets();
        assert_eq!(all.len(), 4);
        assert_eq!(all[3], Classification::Unclassified);
    }

    #[test]
    fn selectors_parse_from_str() {
        assert_eq!("III".parse::<LevelScope>(), Ok(LevelScope::III));
        assert_eq!("all".parse::<LevelScope>(), Ok(LevelScope::All));
        assert!("iv".parse::<LevelScope>().is_err());
        assert_eq!("Monthly".parse::<Granularity>(), Ok(Granularity::Monthly));
        assert_eq!("detail".parse::<ReportView>(), Ok(ReportView::Detailed));
        assert_eq!("activity".parse::<ConsolidateBy>(), Ok(ConsolidateBy::Activity));
    }

    #[test]
    fn classification_labels_and_order() {
        assert_eq!(Classification::from(AttentionLevel::III).label(), "Nivel III");
        assert_eq!(Classification::Unclassified.label(), "Sin Nivel");
        for (i, bucket) in Classification::ALL.iter().enumerate() {
            assert_eq!(bucket.index(), i);
        }
    }

    #[test]
    fn axis_units() {
        assert_eq!(Metric::Goal.axis().unit(), dec!(1));
        assert_eq!(Metric::Budget.axis().unit(), dec!(0.01));
    }

    #[test]
    fn diagnostic_display() {
        let diag = Diagnostic::new(DiagnosticCode::UnclassifiedLevel, "record 3: 'nivel x'");
        assert_eq!(diag.severity, Severity::Warning);
        assert_eq!(diag.to_string(), "warning[L001]: record 3: 'nivel x'");
        assert_eq!(DiagnosticCode::EmptyInputSet.severity(), Severity::Info);
        assert_eq!(DiagnosticCode::NegativeValue.as_str(), "V001");
    }

    #[test]
    fn diagnostic_bucket_scoping() {
        let level_one: Classification = AttentionLevel::I.into();
        let level_two: Classification = AttentionLevel::II.into();
        let merge = Diagnostic::new(DiagnosticCode::MergeIdentityCollision, "'A' in 'F'")
            .in_bucket(level_one);
        let empty = Diagnostic::new(DiagnosticCode::EmptyInputSet, "nothing");

        assert!(merge.concerns(&[level_one]));
        assert!(!merge.concerns(&[level_two]));
        assert!(empty.concerns(&[level_two]));
        assert!(merge.concerns(&Classification::ALL));
    }

    #[test]
    fn magnitude_check() {
        let fine = RawActivityRecord::new("F", "A")
            .budgets([Decimal::from(MAX_QUARTERLY_MAGNITUDE), dec!(-5), dec!(0), dec!(0)]);
        assert_eq!(fine.check_magnitude(0), Ok(()));

        let huge = RawActivityRecord::new("F", " Triaje ")
            .budgets([dec!(0), dec!(0), Decimal::MAX, dec!(0)]);
        let err = huge.check_magnitude(4).unwrap_err();
        assert_eq!(
            err,
            RecordError::ValueOutOfRange {
                record: 5,
                activity: "Triaje".into(),
                metric: Metric::Budget,
                quarter: 3,
                value: Decimal::MAX,
            }
        );
        assert!(err.to_string().starts_with("record 5 ('Triaje'): Presupuesto for quarter 3"));
    }
}

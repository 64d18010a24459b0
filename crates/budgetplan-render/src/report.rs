//! Report layout
//!
//! Turns a consolidation into a [`Workbook`] description. For every emitted level
//! the builder writes:
//!
//! - **Detail sheet**: one row per merged activity, families as contiguous row
//!   blocks framed by a thick border. Period cells hold values and are unlocked
//!   only inside the editability window; row totals are `SUM` formulas.
//! - **Consolidated sheet** (consolidated view only): one row per family, or per
//!   activity name across families. Every period cell is a formula over the
//!   detail sheet, so an edit there flows into the consolidation on recalculation.
//!
//! ```text
//! Detalle Nivel III
//! | Familia    | Actividad | Unidad | Centro | Meta T1 | ... | Meta Total    | Presupuesto T1 | ...
//! | Emergencia | Triaje    | Pac.   | HR     | 6       | ... | =SUM(E5:H5)   | 1500.50        | ...
//!
//! Consolidado Nivel III
//! | Familia    | Meta T1                          | ... | Meta Total  | ...
//! | Emergencia | =SUM('Detalle Nivel III'!E5:E6)  | ... | =SUM(B5:E5) | ...
//! | TOTAL      | =SUM(B5:B6)                      | ... |             |
//! ```

use budgetplan_core::workbook::{
    cell_ref, column_letter, range_ref, sheet_prefix, BorderBlock, Cell, ColNum, MergedRange,
    RowNum, StyleHint, Workbook, Worksheet,
};
use budgetplan_core::{
    Classification, ConsolidateBy, Diagnostic, DiagnosticCode, FiscalContext, Granularity,
    Metric, RawActivityRecord, RenderError, ReportError, ReportRequest, ReportView,
    MONTHS, QUARTERS,
};
use budgetplan_engine::{
    Consolidation, Consolidator, EditabilityWindow, LevelConsolidation, MergedDetailRow,
    MonthlyRow, RowIdentity,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, info};

const TITLE_ROW: RowNum = 0;
const SUBTITLE_ROW: RowNum = 1;
const SCOPE_ROW: RowNum = 2;
const HEADER_ROW: RowNum = 3;

/// Excel caps SUM at 255 arguments
const MAX_SUM_ARGS: usize = 255;

const MONTH_CAPTIONS: [&str; MONTHS] = [
    "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic",
];

const DETAIL_LABELS: [&str; 4] = ["Familia", "Actividad operativa", "Unidad de medida", "Centro de costo"];
const DETAIL_WIDTHS: [f64; 4] = [28.0, 40.0, 18.0, 28.0];
const PERIOD_WIDTH: f64 = 12.0;

// ============================================================================
// Metadata and output
// ============================================================================

/// Presentation metadata printed in sheet titles
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportMeta {
    pub year: i32,
    pub dependency_name: String,
    pub amendment_label: String,
}

impl ReportMeta {
    pub fn from_context(ctx: &FiscalContext) -> Self {
        Self {
            year: ctx.year,
            dependency_name: ctx.dependency_name.clone(),
            amendment_label: ctx.amendment_label(),
        }
    }
}

/// A finished report: the workbook description and everything noticed on the way
#[derive(Clone, Debug)]
pub struct Report {
    pub workbook: Workbook,
    pub diagnostics: Vec<Diagnostic>,
}

// ============================================================================
// Column layout
// ============================================================================

/// Column positions shared by detail and consolidated sheets:
/// labels, goal periods, goal total, budget periods, budget total
#[derive(Clone, Copy, Debug)]
struct Columns {
    labels: ColNum,
    periods: usize,
}

impl Columns {
    fn new(labels: usize, granularity: Granularity) -> Self {
        Self {
            labels: labels as ColNum,
            periods: granularity.periods(),
        }
    }

    fn metric_start(&self, metric: Metric) -> ColNum {
        match metric {
            Metric::Goal => self.labels,
            Metric::Budget => self.labels + self.periods as ColNum + 1,
        }
    }

    /// Column of a 0-based period
    fn period(&self, metric: Metric, period: usize) -> ColNum {
        self.metric_start(metric) + period as ColNum
    }

    fn total(&self, metric: Metric) -> ColNum {
        self.metric_start(metric) + self.periods as ColNum
    }

    fn last(&self) -> ColNum {
        self.total(Metric::Budget)
    }

    /// Every numeric column (periods and totals), left to right
    fn numeric(&self) -> impl Iterator<Item = ColNum> {
        self.labels..=self.last()
    }
}

fn period_caption(granularity: Granularity, period: usize) -> String {
    match granularity {
        Granularity::Quarterly => format!("T{}", period + 1),
        Granularity::Monthly => MONTH_CAPTIONS[period].to_string(),
    }
}

fn period_style(metric: Metric) -> StyleHint {
    match metric {
        Metric::Goal => StyleHint::Count,
        Metric::Budget => StyleHint::Currency,
    }
}

fn total_style(metric: Metric) -> StyleHint {
    match metric {
        Metric::Goal => StyleHint::CountTotal,
        Metric::Budget => StyleHint::CurrencyTotal,
    }
}

/// `=SUM(a,b,...)`, split into `SUM(...)+SUM(...)` past Excel's argument limit
fn sum_of_refs(refs: &[String]) -> String {
    let parts: Vec<String> = refs
        .chunks(MAX_SUM_ARGS)
        .map(|chunk| format!("SUM({})", chunk.join(",")))
        .collect();
    format!("={}", parts.join("+"))
}

fn granularity_label(granularity: Granularity) -> &'static str {
    match granularity {
        Granularity::Quarterly => "Trimestral",
        Granularity::Monthly => "Mensual",
    }
}

pub fn detail_sheet_name(classification: Classification) -> String {
    format!("Detalle {}", classification.label())
}

pub fn consolidated_sheet_name(classification: Classification) -> String {
    format!("Consolidado {}", classification.label())
}

// ============================================================================
// Builder
// ============================================================================

/// Position of each detail row on the detail sheet, per family
struct DetailIndex {
    sheet_name: String,
    /// Sheet rows of each family's detail rows, in family order
    family_rows: Vec<Vec<RowNum>>,
}

/// Lays out workbooks for one report request
#[derive(Clone, Debug)]
pub struct ReportBuilder {
    pub request: ReportRequest,
    /// Fold level buckets on the rayon pool during consolidation
    pub parallel: bool,
}

impl ReportBuilder {
    pub fn new(request: ReportRequest) -> Self {
        Self {
            request,
            parallel: true,
        }
    }

    /// Run consolidation on the calling thread
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Full export: validate the context, consolidate, compute the window, lay out.
    ///
    /// A malformed context is rejected before any record is looked at.
    pub fn build(
        &self,
        records: &[RawActivityRecord],
        ctx: &FiscalContext,
    ) -> Result<Report, ReportError> {
        ctx.validate()?;

        let consolidator = Consolidator {
            parallel: self.parallel,
        };
        let consolidation = consolidator.consolidate(records)?;
        let window = EditabilityWindow::for_context(ctx);
        let report = self.layout(&consolidation, &window, &ReportMeta::from_context(ctx))?;

        info!(
            records = records.len(),
            sheets = report.workbook.sheets().len(),
            diagnostics = report.diagnostics.len(),
            "report built"
        );
        Ok(report)
    }

    /// Lay out an already consolidated snapshot
    pub fn layout(
        &self,
        consolidation: &Consolidation,
        window: &EditabilityWindow,
        meta: &ReportMeta,
    ) -> Result<Report, RenderError> {
        let scope = self.request.scope.buckets();
        let mut diagnostics: Vec<Diagnostic> = consolidation
            .diagnostics
            .iter()
            .filter(|d| d.concerns(&scope))
            .cloned()
            .collect();

        let requested: Vec<&LevelConsolidation> =
            scope.iter().map(|&c| consolidation.bucket(c)).collect();

        let mut emitted: Vec<&LevelConsolidation> =
            requested.iter().copied().filter(|l| !l.is_empty()).collect();
        if emitted.is_empty() {
            diagnostics.push(Diagnostic::new(
                DiagnosticCode::EmptyInputSet,
                format!(
                    "no records for scope {:?}; writing header-only sheets",
                    self.request.scope
                ),
            ));
            emitted = requested
                .into_iter()
                .filter(|l| l.classification != Classification::Unclassified)
                .collect();
        }

        let mut workbook = Workbook::new();
        for level in emitted {
            let (detail, index) = self.detail_sheet(level, window, meta, &mut diagnostics);
            let consolidated = match self.request.view {
                ReportView::Consolidated => Some(self.consolidated_sheet(level, &detail, &index, meta)),
                ReportView::Detailed => None,
            };
            debug!(
                level = %level.classification,
                rows = detail.data_rows,
                "laid out level"
            );
            workbook.push(detail)?;
            if let Some(sheet) = consolidated {
                workbook.push(sheet)?;
            }
        }

        Ok(Report {
            workbook,
            diagnostics,
        })
    }

    fn write_titles(&self, sheet: &mut Worksheet, meta: &ReportMeta, scope_line: String, last_col: ColNum) {
        let lines = [
            (TITLE_ROW, format!("PLAN OPERATIVO ANUAL {}", meta.year), StyleHint::Title),
            (
                SUBTITLE_ROW,
                format!("{} - {}", meta.dependency_name, meta.amendment_label),
                StyleHint::Subtitle,
            ),
            (SCOPE_ROW, scope_line, StyleHint::Subtitle),
        ];
        for (row, text, style) in lines {
            sheet.merge(MergedRange {
                first_row: row,
                first_col: 0,
                last_row: row,
                last_col,
                text,
                style,
            });
        }
    }

    fn write_header(&self, sheet: &mut Worksheet, labels: &[&str], cols: Columns) {
        sheet.header_row = HEADER_ROW;
        for (col, label) in labels.iter().enumerate() {
            sheet.set(HEADER_ROW, col as ColNum, Cell::text(*label, StyleHint::Header));
        }
        let granularity = if cols.periods == QUARTERS {
            Granularity::Quarterly
        } else {
            Granularity::Monthly
        };
        for metric in Metric::ALL {
            for p in 0..cols.periods {
                let caption = format!("{} {}", metric.label(), period_caption(granularity, p));
                sheet.set(HEADER_ROW, cols.period(metric, p), Cell::text(caption, StyleHint::Header));
            }
            sheet.set(
                HEADER_ROW,
                cols.total(metric),
                Cell::text(format!("{} Total", metric.label()), StyleHint::Header),
            );
        }
        for col in cols.numeric() {
            sheet.set_column_width(col, PERIOD_WIDTH);
        }
        sheet.freeze = Some((HEADER_ROW + 1, cols.labels));
    }

    /// Period values of a detail row for the requested granularity
    fn period_values(
        &self,
        row: &MergedDetailRow,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> HashMap<Metric, Vec<Decimal>> {
        match self.request.granularity {
            Granularity::Quarterly => Metric::ALL
                .iter()
                .map(|&m| (m, row.quarterly(m).to_vec()))
                .collect(),
            Granularity::Monthly => {
                let monthly = MonthlyRow::from_detail(row);
                diagnostics.extend(monthly.diagnostics());
                Metric::ALL
                    .iter()
                    .map(|&m| (m, monthly.months(m).to_vec()))
                    .collect()
            }
        }
    }

    /// Write one data row's period cells and total formulas
    fn write_numeric_row(
        &self,
        sheet: &mut Worksheet,
        row: RowNum,
        cols: Columns,
        values: &HashMap<Metric, Vec<Decimal>>,
        window: &EditabilityWindow,
    ) {
        for metric in Metric::ALL {
            let series = &values[&metric];
            for (p, value) in series.iter().enumerate() {
                let editable = window.period_editable(metric, cols.periods, p + 1);
                sheet.set(
                    row,
                    cols.period(metric, p),
                    Cell::number(*value, period_style(metric)).locked(!editable),
                );
            }
            let expr = format!(
                "=SUM({})",
                range_ref(row, cols.period(metric, 0), row, cols.period(metric, cols.periods - 1))
            );
            let total: Decimal = series.iter().sum();
            sheet.set(
                row,
                cols.total(metric),
                Cell::formula(expr, Some(total), total_style(metric)),
            );
        }
    }

    fn detail_sheet(
        &self,
        level: &LevelConsolidation,
        window: &EditabilityWindow,
        meta: &ReportMeta,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> (Worksheet, DetailIndex) {
        let cols = Columns::new(DETAIL_LABELS.len(), self.request.granularity);
        let name = detail_sheet_name(level.classification);
        let mut sheet = Worksheet::new(name.clone());

        self.write_titles(
            &mut sheet,
            meta,
            format!(
                "Detalle {} ({})",
                level.classification.label(),
                granularity_label(self.request.granularity)
            ),
            cols.last(),
        );
        self.write_header(&mut sheet, &DETAIL_LABELS, cols);
        for (col, width) in DETAIL_WIDTHS.iter().enumerate() {
            sheet.set_column_width(col as ColNum, *width);
        }

        let mut row = sheet.first_data_row();
        let mut family_rows = Vec::with_capacity(level.families.len());
        for family in &level.families {
            let first = row;
            let mut rows = Vec::with_capacity(family.rows.len());
            for detail in &family.rows {
                let labels = [
                    family.family_name.as_str(),
                    detail.activity_name.as_str(),
                    detail.measurement_unit.as_str(),
                    detail.center_name.as_str(),
                ];
                for (col, text) in labels.iter().enumerate() {
                    sheet.set(row, col as ColNum, Cell::text(*text, StyleHint::Text));
                }
                let values = self.period_values(detail, diagnostics);
                self.write_numeric_row(&mut sheet, row, cols, &values, window);
                rows.push(row);
                row += 1;
            }
            if !rows.is_empty() {
                sheet.add_block(BorderBlock {
                    first_row: first,
                    last_row: row - 1,
                    first_col: 0,
                    last_col: cols.last(),
                });
            }
            family_rows.push(rows);
        }
        sheet.data_rows = row - sheet.first_data_row();

        (
            sheet,
            DetailIndex {
                sheet_name: name,
                family_rows,
            },
        )
    }

    fn consolidated_sheet(
        &self,
        level: &LevelConsolidation,
        detail: &Worksheet,
        index: &DetailIndex,
        meta: &ReportMeta,
    ) -> Worksheet {
        let (labels, groups): (Vec<&str>, Vec<ConsolidatedGroup>) = match self.request.consolidate_by {
            ConsolidateBy::Family => (vec!["Familia"], family_groups(level, index)),
            ConsolidateBy::Activity => (
                vec!["Actividad operativa", "Unidad de medida"],
                activity_groups(level, index),
            ),
        };
        let cols = Columns::new(labels.len(), self.request.granularity);
        let detail_cols = Columns::new(DETAIL_LABELS.len(), self.request.granularity);

        let mut sheet = Worksheet::new(consolidated_sheet_name(level.classification));
        let grouping = match self.request.consolidate_by {
            ConsolidateBy::Family => "por familia",
            ConsolidateBy::Activity => "por actividad",
        };
        self.write_titles(
            &mut sheet,
            meta,
            format!(
                "Consolidado {} {} ({})",
                level.classification.label(),
                grouping,
                granularity_label(self.request.granularity)
            ),
            cols.last(),
        );
        self.write_header(&mut sheet, &labels, cols);
        sheet.set_column_width(0, 40.0);
        if labels.len() > 1 {
            sheet.set_column_width(1, 18.0);
        }

        let prefix = sheet_prefix(&index.sheet_name);
        let mut row = sheet.first_data_row();
        for group in &groups {
            for (col, text) in group.labels.iter().enumerate() {
                sheet.set(row, col as ColNum, Cell::text(text.clone(), StyleHint::Text));
            }
            for metric in Metric::ALL {
                let mut row_total = Decimal::ZERO;
                for p in 0..cols.periods {
                    let detail_col = detail_cols.period(metric, p);
                    let cached: Decimal = group
                        .rows
                        .iter()
                        .filter_map(|&r| detail.cell(r, detail_col).and_then(Cell::numeric_value))
                        .sum();
                    row_total += cached;
                    let expr = cross_sheet_sum(&prefix, &group.rows, detail_col);
                    sheet.set(
                        row,
                        cols.period(metric, p),
                        Cell::formula(expr, Some(cached), period_style(metric)),
                    );
                }
                let expr = format!(
                    "=SUM({})",
                    range_ref(row, cols.period(metric, 0), row, cols.period(metric, cols.periods - 1))
                );
                sheet.set(
                    row,
                    cols.total(metric),
                    Cell::formula(expr, Some(row_total), total_style(metric)),
                );
            }
            row += 1;
        }
        sheet.data_rows = row - sheet.first_data_row();

        if let Some((first, last)) = sheet.data_row_range() {
            self.write_grand_total(&mut sheet, first, last, cols);
            sheet.add_block(BorderBlock {
                first_row: last + 1,
                last_row: last + 1,
                first_col: 0,
                last_col: cols.last(),
            });
        }
        sheet
    }

    /// Column sums below the data rows
    fn write_grand_total(&self, sheet: &mut Worksheet, first: RowNum, last: RowNum, cols: Columns) {
        let row = last + 1;
        sheet.set(row, 0, Cell::text("TOTAL", StyleHint::TotalLabel));
        for col in 1..cols.labels {
            sheet.set(row, col, Cell::blank(StyleHint::TotalLabel));
        }
        for metric in Metric::ALL {
            let numeric = (0..cols.periods)
                .map(|p| cols.period(metric, p))
                .chain(std::iter::once(cols.total(metric)));
            for col in numeric {
                let cached: Decimal = (first..=last)
                    .filter_map(|r| sheet.cell(r, col).and_then(Cell::numeric_value))
                    .sum();
                let letter = column_letter(col);
                let expr = format!("=SUM({letter}{}:{letter}{})", first + 1, last + 1);
                sheet.set(row, col, Cell::formula(expr, Some(cached), total_style(metric)));
            }
        }
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new(ReportRequest::default())
    }
}

/// Formula summing one detail column over the given rows.
/// Contiguous rows collapse into a single range reference.
fn cross_sheet_sum(prefix: &str, rows: &[RowNum], col: ColNum) -> String {
    let contiguous = rows.windows(2).all(|w| w[1] == w[0] + 1);
    match (rows.first(), rows.last()) {
        (Some(&first), Some(&last)) if contiguous => {
            format!("=SUM({prefix}{})", range_ref(first, col, last, col))
        }
        (Some(_), Some(_)) => {
            let refs: Vec<String> = rows
                .iter()
                .map(|&r| format!("{prefix}{}", cell_ref(r, col)))
                .collect();
            sum_of_refs(&refs)
        }
        _ => "=0".to_string(),
    }
}

/// One consolidated row: its label cells and the detail rows it sums
struct ConsolidatedGroup {
    labels: Vec<String>,
    rows: Vec<RowNum>,
}

fn family_groups(level: &LevelConsolidation, index: &DetailIndex) -> Vec<ConsolidatedGroup> {
    level
        .families
        .iter()
        .zip(&index.family_rows)
        .map(|(family, rows)| ConsolidatedGroup {
            labels: vec![family.family_name.clone()],
            rows: rows.clone(),
        })
        .collect()
}

/// Rows grouped by activity identity across families, first-seen order
fn activity_groups(level: &LevelConsolidation, index: &DetailIndex) -> Vec<ConsolidatedGroup> {
    let mut groups: Vec<ConsolidatedGroup> = Vec::new();
    let mut slots: HashMap<&RowIdentity, usize> = HashMap::new();

    for (family, rows) in level.families.iter().zip(&index.family_rows) {
        for (detail, &sheet_row) in family.rows.iter().zip(rows) {
            let slot = *slots.entry(&detail.identity).or_insert_with(|| {
                groups.push(ConsolidatedGroup {
                    labels: vec![
                        detail.activity_name.clone(),
                        detail.measurement_unit.clone(),
                    ],
                    rows: Vec::new(),
                });
                groups.len() - 1
            });
            groups[slot].rows.push(sheet_row);
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use budgetplan_core::AttentionLevel;
    use pretty_assertions::assert_eq;

    #[test]
    fn quarterly_columns() {
        let cols = Columns::new(4, Granularity::Quarterly);
        assert_eq!(cols.period(Metric::Goal, 0), 4);
        assert_eq!(cols.total(Metric::Goal), 8);
        assert_eq!(cols.period(Metric::Budget, 0), 9);
        assert_eq!(cols.total(Metric::Budget), 13);
        assert_eq!(cols.last(), 13);
        assert_eq!(cols.numeric().count(), 10);
    }

    #[test]
    fn monthly_columns() {
        let cols = Columns::new(1, Granularity::Monthly);
        assert_eq!(cols.period(Metric::Goal, 11), 12);
        assert_eq!(cols.total(Metric::Goal), 13);
        assert_eq!(cols.period(Metric::Budget, 0), 14);
        assert_eq!(cols.last(), 26);
    }

    #[test]
    fn cross_sheet_sum_uses_range_for_contiguous_rows() {
        let prefix = sheet_prefix("Detalle Nivel I");
        assert_eq!(
            cross_sheet_sum(&prefix, &[4, 5, 6], 4),
            "=SUM('Detalle Nivel I'!E5:E7)"
        );
        assert_eq!(
            cross_sheet_sum(&prefix, &[4, 9], 4),
            "=SUM('Detalle Nivel I'!E5,'Detalle Nivel I'!E10)"
        );
        assert_eq!(cross_sheet_sum(&prefix, &[], 4), "=0");
    }

    #[test]
    fn sum_of_refs_splits_long_argument_lists() {
        let refs: Vec<String> = (1..=300).map(|i| format!("A{i}")).collect();
        let expr = sum_of_refs(&refs);
        assert!(expr.starts_with("=SUM(A1,"));
        assert_eq!(expr.matches("SUM(").count(), 2);
        assert!(expr.contains("A255)+SUM(A256,"));
    }

    #[test]
    fn sheet_names_fit_excel_limits() {
        for c in Classification::ALL {
            assert!(detail_sheet_name(c).len() <= 31);
            assert!(consolidated_sheet_name(c).len() <= 31);
        }
        assert_eq!(
            detail_sheet_name(AttentionLevel::III.into()),
            "Detalle Nivel III"
        );
    }

    #[test]
    fn meta_from_context() {
        let ctx = FiscalContext::new(2026, "Red de Salud Norte").modification(2);
        let meta = ReportMeta::from_context(&ctx);
        assert_eq!(meta.year, 2026);
        assert_eq!(meta.amendment_label, "Modificación 2");
    }
}

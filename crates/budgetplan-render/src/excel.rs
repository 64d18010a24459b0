//! Excel report renderer
//!
//! Serializes a [`Workbook`] description into XLSX bytes with rust_xlsxwriter:
//! - Cell formats are derived from the style hint of each cell
//! - Unlocked cells get an unlocked format; sheets flagged `protected` are protected,
//!   so only the editability window accepts input
//! - Family blocks are outlined with thick borders on top of the thin cell grid
//! - Formulas are written with their cached result
//!
//! The renderer owns no layout logic. Everything about what goes where lives in
//! the report builder; this module only decides how it looks.

use budgetplan_core::workbook::{BlockEdges, Cell, CellValue, StyleHint, Workbook, Worksheet};
use budgetplan_core::{RenderError, Renderer};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Formula};
use tracing::debug;

/// Excel report renderer
#[derive(Clone, Debug)]
pub struct ExcelRenderer {
    /// Currency label appended to money cells
    pub currency: String,
    /// Whether to keep header rows and label columns visible while scrolling
    pub freeze_panes: bool,
    /// Whether to apply sheet protection (locks only take effect when enabled)
    pub protect_sheets: bool,
}

impl Default for ExcelRenderer {
    fn default() -> Self {
        Self {
            currency: "S/".into(),
            freeze_panes: true,
            protect_sheets: true,
        }
    }
}

/// Base format per style hint, before lock and border adjustments
struct ExcelFormats {
    title: Format,
    subtitle: Format,
    header: Format,
    text: Format,
    count: Format,
    currency: Format,
    total_label: Format,
    count_total: Format,
    currency_total: Format,
}

impl ExcelFormats {
    fn base(&self, style: StyleHint) -> &Format {
        match style {
            StyleHint::Title => &self.title,
            StyleHint::Subtitle => &self.subtitle,
            StyleHint::Header => &self.header,
            StyleHint::Text => &self.text,
            StyleHint::Count => &self.count,
            StyleHint::Currency => &self.currency,
            StyleHint::TotalLabel => &self.total_label,
            StyleHint::CountTotal => &self.count_total,
            StyleHint::CurrencyTotal => &self.currency_total,
        }
    }
}

impl ExcelRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set currency label
    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Do not freeze header rows
    pub fn no_freeze(mut self) -> Self {
        self.freeze_panes = false;
        self
    }

    /// Leave sheets unprotected (lock flags are still written)
    pub fn unprotected(mut self) -> Self {
        self.protect_sheets = false;
        self
    }

    /// Generate Excel workbook bytes
    pub fn render_to_bytes(&self, workbook: &Workbook) -> Result<Vec<u8>, RenderError> {
        let mut xlsx = rust_xlsxwriter::Workbook::new();
        let formats = self.create_formats();

        for sheet in workbook.sheets() {
            self.add_sheet(&mut xlsx, sheet, &formats)?;
        }

        let buffer = xlsx
            .save_to_buffer()
            .map_err(|e| RenderError::Format(format!("Failed to create Excel: {e}")))?;

        debug!(sheets = workbook.sheets().len(), bytes = buffer.len(), "xlsx written");
        Ok(buffer)
    }

    /// Create reusable formats
    fn create_formats(&self) -> ExcelFormats {
        let currency_format = format!("#,##0.00 \"{}\"", self.currency);

        let title = Format::new()
            .set_bold()
            .set_font_size(14)
            .set_align(FormatAlign::Center);

        let subtitle = Format::new().set_italic().set_align(FormatAlign::Center);

        let header = Format::new()
            .set_bold()
            .set_align(FormatAlign::Center)
            .set_text_wrap()
            .set_background_color(0x4472C4)
            .set_font_color(0xFFFFFF)
            .set_border(FormatBorder::Thin);

        let text = Format::new().set_border(FormatBorder::Thin);

        let count = Format::new()
            .set_num_format("#,##0")
            .set_border(FormatBorder::Thin);

        let currency = Format::new()
            .set_num_format(&currency_format)
            .set_border(FormatBorder::Thin);

        let total_label = Format::new()
            .set_bold()
            .set_background_color(0xE2EFDA)
            .set_border(FormatBorder::Thin);

        let count_total = Format::new()
            .set_bold()
            .set_num_format("#,##0")
            .set_background_color(0xE2EFDA)
            .set_border(FormatBorder::Thin);

        let currency_total = Format::new()
            .set_bold()
            .set_num_format(&currency_format)
            .set_background_color(0xE2EFDA)
            .set_border(FormatBorder::Thin);

        ExcelFormats {
            title,
            subtitle,
            header,
            text,
            count,
            currency,
            total_label,
            count_total,
            currency_total,
        }
    }

    /// Final format of one cell: base style, lock flag and block outline
    fn cell_format(
        &self,
        formats: &ExcelFormats,
        style: StyleHint,
        locked: bool,
        edges: BlockEdges,
    ) -> Format {
        let mut format = formats.base(style).clone();
        if !locked {
            // Light yellow marks input cells
            format = format.set_unlocked().set_background_color(0xFFF2CC);
        }
        if edges.top {
            format = format.set_border_top(FormatBorder::Thick);
        }
        if edges.bottom {
            format = format.set_border_bottom(FormatBorder::Thick);
        }
        if edges.left {
            format = format.set_border_left(FormatBorder::Thick);
        }
        if edges.right {
            format = format.set_border_right(FormatBorder::Thick);
        }
        format
    }

    fn add_sheet(
        &self,
        xlsx: &mut rust_xlsxwriter::Workbook,
        sheet: &Worksheet,
        formats: &ExcelFormats,
    ) -> Result<(), RenderError> {
        let worksheet = xlsx.add_worksheet();
        worksheet
            .set_name(&sheet.name)
            .map_err(|e| RenderError::Format(e.to_string()))?;

        for (&col, &width) in &sheet.column_widths {
            worksheet
                .set_column_width(col, width)
                .map_err(|e| RenderError::Format(e.to_string()))?;
        }

        for merge in &sheet.merges {
            let format = formats.base(merge.style);
            if merge.first_row == merge.last_row && merge.first_col == merge.last_col {
                // Single-cell ranges cannot be merged
                worksheet
                    .write_string_with_format(merge.first_row, merge.first_col, &merge.text, format)
                    .map_err(|e| RenderError::Format(e.to_string()))?;
            } else {
                worksheet
                    .merge_range(
                        merge.first_row,
                        merge.first_col,
                        merge.last_row,
                        merge.last_col,
                        &merge.text,
                        format,
                    )
                    .map_err(|e| RenderError::Format(e.to_string()))?;
            }
        }

        for (row, col, cell) in sheet.cells() {
            let format = self.cell_format(formats, cell.style, cell.locked, sheet.edges_at(row, col));
            self.write_cell(worksheet, row, col, cell, &format)?;
        }

        if self.freeze_panes {
            if let Some((row, col)) = sheet.freeze {
                worksheet
                    .set_freeze_panes(row, col)
                    .map_err(|e| RenderError::Format(e.to_string()))?;
            }
        }

        if self.protect_sheets && sheet.protected {
            worksheet.protect();
        }
        Ok(())
    }

    fn write_cell(
        &self,
        worksheet: &mut rust_xlsxwriter::Worksheet,
        row: u32,
        col: u16,
        cell: &Cell,
        format: &Format,
    ) -> Result<(), RenderError> {
        let written = match &cell.value {
            CellValue::Text(text) => worksheet.write_string_with_format(row, col, text, format),
            CellValue::Number(value) => {
                worksheet.write_number_with_format(row, col, to_f64(*value)?, format)
            }
            CellValue::Formula { expr, cached } => {
                let mut formula = Formula::new(expr);
                if let Some(value) = cached {
                    formula = formula.set_result(value.normalize().to_string());
                }
                worksheet.write_formula_with_format(row, col, formula, format)
            }
            CellValue::Blank => worksheet.write_blank(row, col, format),
        };
        written
            .map(|_| ())
            .map_err(|e| RenderError::Format(format!("cell ({row}, {col}): {e}")))
    }
}

fn to_f64(value: Decimal) -> Result<f64, RenderError> {
    value
        .to_f64()
        .ok_or_else(|| RenderError::InvalidData(format!("value {value} does not fit a spreadsheet number")))
}

impl Renderer for ExcelRenderer {
    type Output = Vec<u8>;

    fn render(&self, workbook: &Workbook) -> Result<Vec<u8>, RenderError> {
        if workbook.is_empty() {
            return Err(RenderError::InvalidData("No worksheets to render".into()));
        }
        self.render_to_bytes(workbook)
    }
}

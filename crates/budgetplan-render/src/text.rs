//! Plain text renderer for console output
//!
//! Prints each worksheet as an aligned table. Formulas show their cached value;
//! cells open for editing carry a trailing `*`.

use budgetplan_core::workbook::{ColNum, RowNum, Workbook, Worksheet};
use budgetplan_core::{RenderError, Renderer};
use std::fmt::Write;

/// Plain text renderer for console output
#[derive(Clone, Debug)]
pub struct TextRenderer {
    /// Widest a column may grow before its text is truncated
    pub max_column_width: usize,
    /// Mark unlocked cells with `*`
    pub mark_editable: bool,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self {
            max_column_width: 24,
            mark_editable: true,
        }
    }
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the column width cap
    pub fn max_column_width(mut self, width: usize) -> Self {
        self.max_column_width = width.max(4);
        self
    }

    /// Do not mark editable cells
    pub fn plain(mut self) -> Self {
        self.mark_editable = false;
        self
    }

    fn render_sheet(&self, out: &mut String, sheet: &Worksheet) -> Result<(), RenderError> {
        let fmt_err = |e: std::fmt::Error| RenderError::Format(e.to_string());

        writeln!(out, "== {} ==", sheet.name).map_err(fmt_err)?;
        let mut merges: Vec<_> = sheet.merges.iter().collect();
        merges.sort_by_key(|m| (m.first_row, m.first_col));
        for merge in merges {
            writeln!(out, "{}", merge.text).map_err(fmt_err)?;
        }

        let Some(last_col) = sheet.last_col() else {
            return Ok(());
        };
        let last_row = sheet.last_row().unwrap_or(sheet.header_row);

        let rows: Vec<Vec<String>> = (sheet.header_row..=last_row)
            .map(|row| {
                (0..=last_col)
                    .map(|col| self.cell_text(sheet, row, col))
                    .collect()
            })
            .collect();

        let mut widths = vec![0usize; usize::from(last_col) + 1];
        for row in &rows {
            for (i, text) in row.iter().enumerate() {
                widths[i] = widths[i].max(text.chars().count());
            }
        }

        for (i, row) in rows.iter().enumerate() {
            let line: Vec<String> = row
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(col, (text, &width))| {
                    let numeric = sheet
                        .cell(sheet.header_row + i as RowNum, col as ColNum)
                        .is_some_and(|c| c.style.is_numeric());
                    if numeric {
                        format!("{text:>width$}")
                    } else {
                        format!("{text:<width$}")
                    }
                })
                .collect();
            writeln!(out, "| {} |", line.join(" | ")).map_err(fmt_err)?;
            if i == 0 {
                let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
                writeln!(out, "|-{}-|", rule.join("-|-")).map_err(fmt_err)?;
            }
        }
        writeln!(out, "({} data rows)", sheet.data_rows).map_err(fmt_err)?;
        Ok(())
    }

    fn cell_text(&self, sheet: &Worksheet, row: RowNum, col: ColNum) -> String {
        let Some(cell) = sheet.cell(row, col) else {
            return String::new();
        };
        let mut text = truncate(&cell.display(), self.max_column_width);
        if self.mark_editable && !cell.locked {
            text.push('*');
        }
        text
    }
}

/// Truncate to `max` characters with an ellipsis
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

impl Renderer for TextRenderer {
    type Output = String;

    fn render(&self, workbook: &Workbook) -> Result<String, RenderError> {
        let mut out = String::new();
        for (i, sheet) in workbook.sheets().iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            self.render_sheet(&mut out, sheet)?;
        }
        Ok(out)
    }
}

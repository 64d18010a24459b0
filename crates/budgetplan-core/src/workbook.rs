//! Declarative workbook description
//!
//! The report builder never talks to a spreadsheet library directly. It fills a
//! [`Workbook`] with [`Worksheet`]s whose cells are plain descriptors
//! (`value | formula`, `locked`, style hint). Renderers serialize the description:
//! the XLSX backend maps it onto real cell formats and sheet protection, the text
//! backend prints it.
//!
//! ```text
//! Worksheet "Detalle Nivel I"
//!   (0,0) merged title                      locked
//!   (2,*) header row                        locked, StyleHint::Header
//!   (3,4) Number(10)                        unlocked  <- editable period
//!   (3,8) Formula("=SUM(E4:H4)", 40)        locked    <- row total
//! ```

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::RenderError;

/// Zero-based row index
pub type RowNum = u32;

/// Zero-based column index
pub type ColNum = u16;

/// Longest sheet name Excel accepts
pub const MAX_SHEET_NAME_LEN: usize = 31;

const FORBIDDEN_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

// ============================================================================
// Cells
// ============================================================================

/// Presentation role of a cell. Only a hint: renderers pick the actual look.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StyleHint {
    Title,
    Subtitle,
    Header,
    Text,
    Count,
    Currency,
    TotalLabel,
    CountTotal,
    CurrencyTotal,
}

impl StyleHint {
    /// Whether the hint describes a numeric cell
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            StyleHint::Count | StyleHint::Currency | StyleHint::CountTotal | StyleHint::CurrencyTotal
        )
    }
}

/// Content of a cell
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(Decimal),
    /// Formula in A1 notation with a leading `=`. `cached` is the value the engine
    /// computed, stored so readers that do not recalculate still show a number.
    Formula {
        expr: String,
        cached: Option<Decimal>,
    },
    Blank,
}

/// One cell descriptor
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    /// Locked cells reject edits once the sheet is protected
    pub locked: bool,
    pub style: StyleHint,
}

impl Cell {
    pub fn text(text: impl Into<String>, style: StyleHint) -> Self {
        Self {
            value: CellValue::Text(text.into()),
            locked: true,
            style,
        }
    }

    pub fn number(value: Decimal, style: StyleHint) -> Self {
        Self {
            value: CellValue::Number(value),
            locked: true,
            style,
        }
    }

    pub fn formula(expr: impl Into<String>, cached: Option<Decimal>, style: StyleHint) -> Self {
        Self {
            value: CellValue::Formula {
                expr: expr.into(),
                cached,
            },
            locked: true,
            style,
        }
    }

    pub fn blank(style: StyleHint) -> Self {
        Self {
            value: CellValue::Blank,
            locked: true,
            style,
        }
    }

    /// Set the lock flag
    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    pub fn is_formula(&self) -> bool {
        matches!(self.value, CellValue::Formula { .. })
    }

    /// Formula text, if any
    pub fn formula_expr(&self) -> Option<&str> {
        match &self.value {
            CellValue::Formula { expr, .. } => Some(expr),
            _ => None,
        }
    }

    /// Literal number or cached formula result
    pub fn numeric_value(&self) -> Option<Decimal> {
        match &self.value {
            CellValue::Number(value) => Some(*value),
            CellValue::Formula { cached, .. } => *cached,
            _ => None,
        }
    }

    /// Text shown for the cell when formulas are not evaluated
    pub fn display(&self) -> String {
        match &self.value {
            CellValue::Text(text) => text.clone(),
            CellValue::Number(value) => value.normalize().to_string(),
            CellValue::Formula { cached: Some(value), .. } => value.normalize().to_string(),
            CellValue::Formula { expr, cached: None } => expr.clone(),
            CellValue::Blank => String::new(),
        }
    }
}

// ============================================================================
// Ranges
// ============================================================================

/// Text spanning several cells (titles)
#[derive(Clone, Debug, PartialEq)]
pub struct MergedRange {
    pub first_row: RowNum,
    pub first_col: ColNum,
    pub last_row: RowNum,
    pub last_col: ColNum,
    pub text: String,
    pub style: StyleHint,
}

/// Rectangle framed by a thick outline
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BorderBlock {
    pub first_row: RowNum,
    pub last_row: RowNum,
    pub first_col: ColNum,
    pub last_col: ColNum,
}

/// Which outline edges of a block touch a cell
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockEdges {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
}

impl BlockEdges {
    pub fn any(&self) -> bool {
        self.top || self.bottom || self.left || self.right
    }
}

impl BorderBlock {
    pub fn contains(&self, row: RowNum, col: ColNum) -> bool {
        (self.first_row..=self.last_row).contains(&row)
            && (self.first_col..=self.last_col).contains(&col)
    }

    /// Outline edges drawn on the given cell; all false outside the block
    pub fn edges(&self, row: RowNum, col: ColNum) -> BlockEdges {
        if !self.contains(row, col) {
            return BlockEdges::default();
        }
        BlockEdges {
            top: row == self.first_row,
            bottom: row == self.last_row,
            left: col == self.first_col,
            right: col == self.last_col,
        }
    }
}

// ============================================================================
// Worksheet
// ============================================================================

/// One sheet of the report
#[derive(Clone, Debug, PartialEq)]
pub struct Worksheet {
    pub name: String,
    cells: BTreeMap<(RowNum, ColNum), Cell>,
    pub merges: Vec<MergedRange>,
    pub blocks: Vec<BorderBlock>,
    pub column_widths: BTreeMap<ColNum, f64>,
    /// Row holding the column headers
    pub header_row: RowNum,
    /// Number of data rows directly below the header
    pub data_rows: u32,
    /// Protection switch; locks only take effect when set
    pub protected: bool,
    /// Rows/columns kept visible while scrolling
    pub freeze: Option<(RowNum, ColNum)>,
}

impl Worksheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
            merges: Vec::new(),
            blocks: Vec::new(),
            column_widths: BTreeMap::new(),
            header_row: 0,
            data_rows: 0,
            protected: true,
            freeze: None,
        }
    }

    /// Place a cell, replacing whatever was there
    pub fn set(&mut self, row: RowNum, col: ColNum, cell: Cell) {
        self.cells.insert((row, col), cell);
    }

    pub fn cell(&self, row: RowNum, col: ColNum) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// Cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (RowNum, ColNum, &Cell)> {
        self.cells.iter().map(|(&(row, col), cell)| (row, col, cell))
    }

    /// Spreadsheet default: cells without a descriptor are locked
    pub fn is_locked(&self, row: RowNum, col: ColNum) -> bool {
        self.cell(row, col).map_or(true, |c| c.locked)
    }

    pub fn merge(&mut self, range: MergedRange) {
        self.merges.push(range);
    }

    pub fn add_block(&mut self, block: BorderBlock) {
        self.blocks.push(block);
    }

    /// Combined outline edges of every block covering the cell
    pub fn edges_at(&self, row: RowNum, col: ColNum) -> BlockEdges {
        self.blocks.iter().fold(BlockEdges::default(), |acc, block| {
            let e = block.edges(row, col);
            BlockEdges {
                top: acc.top || e.top,
                bottom: acc.bottom || e.bottom,
                left: acc.left || e.left,
                right: acc.right || e.right,
            }
        })
    }

    pub fn set_column_width(&mut self, col: ColNum, width: f64) {
        self.column_widths.insert(col, width);
    }

    pub fn first_data_row(&self) -> RowNum {
        self.header_row + 1
    }

    /// Data rows as an inclusive range, `None` for a header-only sheet
    pub fn data_row_range(&self) -> Option<(RowNum, RowNum)> {
        (self.data_rows > 0).then(|| {
            let first = self.first_data_row();
            (first, first + self.data_rows - 1)
        })
    }

    /// Header captions in column order
    pub fn header(&self) -> Vec<String> {
        self.cells
            .range((self.header_row, 0)..=(self.header_row, ColNum::MAX))
            .map(|(_, cell)| cell.display())
            .collect()
    }

    pub fn last_row(&self) -> Option<RowNum> {
        let cell_max = self.cells.keys().map(|&(row, _)| row).max();
        let merge_max = self.merges.iter().map(|m| m.last_row).max();
        cell_max.max(merge_max)
    }

    pub fn last_col(&self) -> Option<ColNum> {
        let cell_max = self.cells.keys().map(|&(_, col)| col).max();
        let merge_max = self.merges.iter().map(|m| m.last_col).max();
        cell_max.max(merge_max)
    }
}

// ============================================================================
// Workbook
// ============================================================================

/// Ordered collection of worksheets
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Worksheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sheet, enforcing Excel's naming rules
    pub fn push(&mut self, sheet: Worksheet) -> Result<(), RenderError> {
        validate_sheet_name(&sheet.name)?;
        if self.sheet(&sheet.name).is_some() {
            return Err(RenderError::InvalidData(format!(
                "duplicate worksheet name '{}'",
                sheet.name
            )));
        }
        self.sheets.push(sheet);
        Ok(())
    }

    pub fn sheets(&self) -> &[Worksheet] {
        &self.sheets
    }

    /// Case-insensitive lookup, matching spreadsheet semantics
    pub fn sheet(&self, name: &str) -> Option<&Worksheet> {
        self.sheets
            .iter()
            .find(|s| s.name.to_lowercase() == name.to_lowercase())
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

/// Check a name against Excel's worksheet naming rules
pub fn validate_sheet_name(name: &str) -> Result<(), RenderError> {
    if name.trim().is_empty() {
        return Err(RenderError::InvalidData("worksheet name is empty".into()));
    }
    if name.chars().count() > MAX_SHEET_NAME_LEN {
        return Err(RenderError::InvalidData(format!(
            "worksheet name '{name}' exceeds {MAX_SHEET_NAME_LEN} characters"
        )));
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_SHEET_CHARS.contains(c)) {
        return Err(RenderError::InvalidData(format!(
            "worksheet name '{name}' contains forbidden character '{c}'"
        )));
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return Err(RenderError::InvalidData(format!(
            "worksheet name '{name}' cannot start or end with an apostrophe"
        )));
    }
    Ok(())
}

// ============================================================================
// A1 references
// ============================================================================

/// Convert column number to Excel letter (0 -> A, 25 -> Z, 26 -> AA)
pub fn column_letter(col: ColNum) -> String {
    let mut result = String::new();
    let mut n = col as u32;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// Relative A1 reference of a zero-based cell (0,0 -> A1)
pub fn cell_ref(row: RowNum, col: ColNum) -> String {
    format!("{}{}", column_letter(col), row + 1)
}

/// A1 range between two cells
pub fn range_ref(first_row: RowNum, first_col: ColNum, last_row: RowNum, last_col: ColNum) -> String {
    format!("{}:{}", cell_ref(first_row, first_col), cell_ref(last_row, last_col))
}

/// Sheet prefix for cross-sheet references ('Detalle Nivel I'!)
pub fn sheet_prefix(name: &str) -> String {
    format!("'{}'!", name.replace('\'', "''"))
}

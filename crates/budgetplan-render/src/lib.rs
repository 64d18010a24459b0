//! # budgetplan-render
//!
//! Report layout and rendering backends for budgetplan.
//!
//! This crate provides:
//! - Workbook layout: detail and consolidated sheets per attention level (`report`)
//! - Excel output with cross-sheet formulas and cell protection (`excel`)
//! - Text-based preview (`text`)
//!
//! ## Example
//!
//! ```rust
//! use budgetplan_core::{FiscalContext, RawActivityRecord, Renderer, ReportRequest};
//! use budgetplan_render::{ExcelRenderer, ReportBuilder, TextRenderer};
//! use rust_decimal::Decimal;
//!
//! let records = vec![RawActivityRecord::new("Emergencia", "Triaje")
//!     .level_text("NIVEL III - Hospitales")
//!     .goals([Decimal::from(6); 4])];
//! let ctx = FiscalContext::new(2025, "Hospital Regional");
//!
//! let report = ReportBuilder::new(ReportRequest::default())
//!     .build(&records, &ctx)
//!     .unwrap();
//! assert_eq!(
//!     report.workbook.sheet_names(),
//!     vec!["Detalle Nivel III", "Consolidado Nivel III"]
//! );
//!
//! let preview = TextRenderer::new().render(&report.workbook).unwrap();
//! assert!(preview.contains("Triaje"));
//!
//! let xlsx_bytes = ExcelRenderer::new().render(&report.workbook).unwrap();
//! assert_eq!(&xlsx_bytes[0..2], b"PK");
//! ```

pub mod excel;
pub mod report;
pub mod text;

pub use excel::ExcelRenderer;
pub use report::{consolidated_sheet_name, detail_sheet_name, Report, ReportBuilder, ReportMeta};
pub use text::TextRenderer;

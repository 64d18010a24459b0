//! Layered export configuration
//!
//! An optional TOML file supplies defaults; command-line flags (or their
//! `BUDGETPLAN_*` environment variables) override them field by field.
//!
//! ```toml
//! [context]
//! year = 2026
//! dependency = "Red de Salud Norte"
//! modification = 2
//! quarter = 3
//!
//! [report]
//! level = "all"
//! granularity = "monthly"
//! view = "consolidated"
//! by = "family"
//!
//! [excel]
//! currency = "S/"
//! freeze_panes = true
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use budgetplan_core::{
    ConsolidateBy, FiscalContext, Granularity, LevelScope, ReportRequest, ReportView,
};
use budgetplan_render::ExcelRenderer;
use clap::Args;
use serde::Deserialize;

/// Flags shared by `export` and `preview`
#[derive(Args, Debug, Clone, Default)]
pub struct ReportArgs {
    /// Fiscal year
    #[arg(long, env = "BUDGETPLAN_YEAR")]
    pub year: Option<i32>,

    /// Dependency name printed in sheet titles
    #[arg(long, env = "BUDGETPLAN_DEPENDENCY")]
    pub dependency: Option<String>,

    /// Modification number (1 = initial formulation)
    #[arg(long, env = "BUDGETPLAN_MODIFICATION")]
    pub modification: Option<u32>,

    /// Current quarter (1-4); gates editability of amendments
    #[arg(long, env = "BUDGETPLAN_QUARTER")]
    pub quarter: Option<u8>,

    /// Attention level to report (i, ii, iii, all)
    #[arg(long, value_name = "LEVEL")]
    pub level: Option<LevelScope>,

    /// Period columns (quarterly, monthly)
    #[arg(long)]
    pub granularity: Option<Granularity>,

    /// Sheet set (consolidated, detailed)
    #[arg(long)]
    pub view: Option<ReportView>,

    /// Consolidated row grouping (family, activity)
    #[arg(long = "by", value_name = "GROUPING")]
    pub consolidate_by: Option<ConsolidateBy>,

    /// TOML file with defaults for any of the options above
    #[arg(long, env = "BUDGETPLAN_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContextSection {
    pub year: Option<i32>,
    pub dependency: Option<String>,
    pub modification: Option<u32>,
    pub quarter: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportSection {
    pub level: Option<LevelScope>,
    pub granularity: Option<Granularity>,
    pub view: Option<ReportView>,
    pub by: Option<ConsolidateBy>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExcelSection {
    pub currency: Option<String>,
    pub freeze_panes: Option<bool>,
}

/// Contents of a `--config` file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub context: ContextSection,
    pub report: ReportSection,
    pub excel: ExcelSection,
}

impl ExportConfig {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid configuration file")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("In {}", path.display()))
    }

    /// Load the file named by `--config`, or an empty config
    pub fn from_args(args: &ReportArgs) -> Result<Self> {
        match &args.config {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Fiscal context after flag overrides. A missing year stays 0 and is
    /// rejected by validation.
    pub fn fiscal_context(&self, args: &ReportArgs) -> FiscalContext {
        let ctx = &self.context;
        let year = args.year.or(ctx.year).unwrap_or(0);
        let dependency = args
            .dependency
            .clone()
            .or_else(|| ctx.dependency.clone())
            .unwrap_or_default();

        let mut fiscal = FiscalContext::new(year, dependency);
        if let Some(modification) = args.modification.or(ctx.modification) {
            fiscal = fiscal.modification(modification);
        }
        if let Some(quarter) = args.quarter.or(ctx.quarter) {
            fiscal = fiscal.current_quarter(quarter);
        }
        fiscal
    }

    pub fn report_request(&self, args: &ReportArgs) -> ReportRequest {
        let report = &self.report;
        ReportRequest::default()
            .scope(args.level.or(report.level).unwrap_or_default())
            .granularity(args.granularity.or(report.granularity).unwrap_or_default())
            .view(args.view.or(report.view).unwrap_or_default())
            .consolidate_by(args.consolidate_by.or(report.by).unwrap_or_default())
    }

    /// Excel options; `currency` from the command line wins over the file
    pub fn excel_renderer(&self, currency: Option<&str>) -> ExcelRenderer {
        let mut renderer = ExcelRenderer::new();
        if let Some(currency) = currency.or(self.excel.currency.as_deref()) {
            renderer = renderer.currency(currency);
        }
        if self.excel.freeze_panes == Some(false) {
            renderer = renderer.no_freeze();
        }
        renderer
    }
}

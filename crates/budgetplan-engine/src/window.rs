//! Editability window
//!
//! Decides which period cells a reviewer may still change in an exported file.
//! The initial formulation is fully editable. An amendment may only revise the
//! rest of the fiscal year: months before the current quarter are locked, from
//! its first month through December stay open. Both metrics share the rule.

use budgetplan_core::{
    first_month_of_quarter, FiscalContext, Metric, MONTHS, MONTHS_PER_QUARTER, QUARTERS,
};

/// Per-month, per-metric edit permissions (12 goal + 12 budget flags)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EditabilityWindow {
    goal: [bool; MONTHS],
    budget: [bool; MONTHS],
}

impl EditabilityWindow {
    /// Everything editable
    pub fn all_editable() -> Self {
        Self {
            goal: [true; MONTHS],
            budget: [true; MONTHS],
        }
    }

    /// Months `from_month..=12` editable for both metrics
    fn from_month(from_month: usize) -> Self {
        let mut months = [false; MONTHS];
        for (i, flag) in months.iter_mut().enumerate() {
            *flag = i + 1 >= from_month;
        }
        Self {
            goal: months,
            budget: months,
        }
    }

    /// Window for a fiscal context. The context is expected to be validated.
    pub fn for_context(ctx: &FiscalContext) -> Self {
        if ctx.modification <= 1 {
            return Self::all_editable();
        }
        let quarter = usize::from(ctx.current_quarter).clamp(1, QUARTERS);
        Self::from_month(first_month_of_quarter(quarter))
    }

    fn flags(&self, metric: Metric) -> &[bool; MONTHS] {
        match metric {
            Metric::Goal => &self.goal,
            Metric::Budget => &self.budget,
        }
    }

    /// Whether a month (1-based) is editable; out-of-range months never are
    pub fn month_editable(&self, metric: Metric, month: usize) -> bool {
        (1..=MONTHS).contains(&month) && self.flags(metric)[month - 1]
    }

    /// A quarter (1-based) is editable only when all three of its months are
    pub fn quarter_editable(&self, metric: Metric, quarter: usize) -> bool {
        if !(1..=QUARTERS).contains(&quarter) {
            return false;
        }
        let first = first_month_of_quarter(quarter);
        (first..first + MONTHS_PER_QUARTER).all(|m| self.month_editable(metric, m))
    }

    /// Editability of the n-th (1-based) period of a series with `periods` columns
    pub fn period_editable(&self, metric: Metric, periods: usize, period: usize) -> bool {
        if periods == QUARTERS {
            self.quarter_editable(metric, period)
        } else {
            self.month_editable(metric, period)
        }
    }

    /// First editable month (1-based), if any
    pub fn first_editable_month(&self, metric: Metric) -> Option<usize> {
        self.flags(metric).iter().position(|&f| f).map(|i| i + 1)
    }

    /// All 24 flags, goals first
    pub fn to_flags(&self) -> [bool; 2 * MONTHS] {
        let mut out = [false; 2 * MONTHS];
        out[..MONTHS].copy_from_slice(&self.goal);
        out[MONTHS..].copy_from_slice(&self.budget);
        out
    }
}

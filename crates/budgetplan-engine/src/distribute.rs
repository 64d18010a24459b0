//! Quarter → month distribution
//!
//! Each quarterly value is converted to a whole number of axis units (1 for
//! counts, 0.01 for currency), split evenly over its three months, and the
//! remainder handed out one unit at a time starting with the first month:
//!
//! ```text
//! 10 units  -> base 3, remainder 1 -> [4, 3, 3]
//! 11 units  -> base 3, remainder 2 -> [4, 4, 3]
//! 100.00    -> 10000 cents -> [33.34, 33.33, 33.33]
//! ```
//!
//! The three months always add back to the quarter when the value is a whole
//! number of units. Values finer than the unit are rounded half away from zero
//! first, and the difference is reported as a rounding loss.

use budgetplan_core::{
    Axis, Diagnostic, DiagnosticCode, Metric, Monthly, Quarterly, MONTHS, MONTHS_PER_QUARTER,
};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::warn;

use crate::aggregate::{ConsolidatedFamilyRow, MergedDetailRow};

/// A value that could not be split without rounding
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundingLoss {
    /// 1-based quarter
    pub quarter: usize,
    pub axis: Axis,
    pub original: Decimal,
    pub distributed: Decimal,
}

impl RoundingLoss {
    /// original − distributed; at most half a unit in magnitude
    pub fn amount(&self) -> Decimal {
        self.original - self.distributed
    }
}

/// Split one quarterly value into its three months
pub fn split_quarter(value: Decimal, axis: Axis) -> [Decimal; MONTHS_PER_QUARTER] {
    let unit = axis.unit();
    let units = (value / unit).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let three = Decimal::from(MONTHS_PER_QUARTER as u64);
    let base = (units / three).floor();
    let remainder = units - base * three;

    let mut months = [base * unit; MONTHS_PER_QUARTER];
    for (i, month) in months.iter_mut().enumerate() {
        if Decimal::from(i as u64) < remainder {
            *month += unit;
        }
    }
    months
}

/// Monthly series for one quarterly vector, plus any rounding it needed
#[derive(Clone, Debug, PartialEq)]
pub struct Distribution {
    pub months: Monthly,
    pub losses: Vec<RoundingLoss>,
}

/// Expand a quarterly vector into twelve months
pub fn distribute(quarterly: &Quarterly, axis: Axis) -> Distribution {
    let mut months = [Decimal::ZERO; MONTHS];
    let mut losses = Vec::new();

    for (q, value) in quarterly.iter().enumerate() {
        let split = split_quarter(*value, axis);
        let distributed: Decimal = split.iter().sum();
        if distributed != *value {
            losses.push(RoundingLoss {
                quarter: q + 1,
                axis,
                original: *value,
                distributed,
            });
        }
        months[q * MONTHS_PER_QUARTER..(q + 1) * MONTHS_PER_QUARTER].copy_from_slice(&split);
    }

    Distribution { months, losses }
}

/// Monthly projection of a detail row or family
#[derive(Clone, Debug, PartialEq)]
pub struct MonthlyRow {
    pub label: String,
    pub goal: Monthly,
    pub budget: Monthly,
    pub losses: Vec<(Metric, RoundingLoss)>,
}

impl MonthlyRow {
    /// Distribute goals and budgets independently
    pub fn project(label: impl Into<String>, goal: &Quarterly, budget: &Quarterly) -> Self {
        let goal = distribute(goal, Metric::Goal.axis());
        let budget = distribute(budget, Metric::Budget.axis());
        let losses = goal
            .losses
            .into_iter()
            .map(|l| (Metric::Goal, l))
            .chain(budget.losses.into_iter().map(|l| (Metric::Budget, l)))
            .collect();
        Self {
            label: label.into(),
            goal: goal.months,
            budget: budget.months,
            losses,
        }
    }

    pub fn from_detail(row: &MergedDetailRow) -> Self {
        Self::project(&row.activity_name, &row.goal_by_quarter, &row.budget_by_quarter)
    }

    pub fn from_family(family: &ConsolidatedFamilyRow) -> Self {
        Self::project(
            &family.family_name,
            &family.goal_by_quarter,
            &family.budget_by_quarter,
        )
    }

    pub fn months(&self, metric: Metric) -> &Monthly {
        match metric {
            Metric::Goal => &self.goal,
            Metric::Budget => &self.budget,
        }
    }

    pub fn total(&self, metric: Metric) -> Decimal {
        self.months(metric).iter().sum()
    }

    /// One warning per rounded quarter value
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.losses
            .iter()
            .map(|(metric, loss)| {
                let message = format!(
                    "{} of '{}' in Q{}: {} split as {} (difference {})",
                    metric.label(),
                    self.label,
                    loss.quarter,
                    loss.original,
                    loss.distributed,
                    loss.amount()
                );
                warn!(code = DiagnosticCode::DistributionRoundingLoss.as_str(), "{message}");
                Diagnostic::new(DiagnosticCode::DistributionRoundingLoss, message)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn remainder_goes_to_leading_months() {
        assert_eq!(split_quarter(dec!(10), Axis::Count), [dec!(4), dec!(3), dec!(3)]);
        assert_eq!(split_quarter(dec!(11), Axis::Count), [dec!(4), dec!(4), dec!(3)]);
        assert_eq!(split_quarter(dec!(12), Axis::Count), [dec!(4), dec!(4), dec!(4)]);
        assert_eq!(split_quarter(dec!(1), Axis::Count), [dec!(1), dec!(0), dec!(0)]);
        assert_eq!(split_quarter(dec!(0), Axis::Count), [dec!(0), dec!(0), dec!(0)]);
    }

    #[test]
    fn currency_splits_to_the_cent() {
        assert_eq!(
            split_quarter(dec!(100), Axis::Currency),
            [dec!(33.34), dec!(33.33), dec!(33.33)]
        );
        assert_eq!(
            split_quarter(dec!(0.05), Axis::Currency),
            [dec!(0.02), dec!(0.02), dec!(0.01)]
        );
    }

    #[test]
    fn distribute_round_trips_whole_units() {
        let quarterly = [dec!(10), dec!(7), dec!(0), dec!(2)];
        let dist = distribute(&quarterly, Axis::Count);

        assert!(dist.losses.is_empty());
        assert_eq!(
            dist.months,
            [
                dec!(4), dec!(3), dec!(3),
                dec!(3), dec!(2), dec!(2),
                dec!(0), dec!(0), dec!(0),
                dec!(1), dec!(1), dec!(0),
            ]
        );
        for q in 0..4 {
            let sum: Decimal = dist.months[q * 3..q * 3 + 3].iter().sum();
            assert_eq!(sum, quarterly[q]);
        }
    }

    #[test]
    fn fractional_count_is_reported() {
        let dist = distribute(&[dec!(2.5), dec!(3), dec!(0), dec!(0)], Axis::Count);

        assert_eq!(&dist.months[0..3], &[dec!(1), dec!(1), dec!(1)]);
        assert_eq!(dist.losses.len(), 1);
        assert_eq!(dist.losses[0].quarter, 1);
        assert_eq!(dist.losses[0].amount(), dec!(-0.5));
    }

    #[test]
    fn sub_cent_budget_is_reported() {
        let dist = distribute(&[dec!(10.004), dec!(0), dec!(0), dec!(0)], Axis::Currency);

        assert_eq!(dist.losses.len(), 1);
        assert_eq!(dist.losses[0].distributed, dec!(10.00));
        assert!(dist.losses[0].amount().abs() <= dec!(0.005));
    }

    #[test]
    fn monthly_row_distributes_axes_independently() {
        let row = MonthlyRow::project(
            "Triaje",
            &[dec!(10), dec!(10), dec!(10), dec!(10)],
            &[dec!(1000), dec!(0), dec!(0), dec!(0.10)],
        );

        assert_eq!(&row.goal[0..3], &[dec!(4), dec!(3), dec!(3)]);
        assert_eq!(&row.budget[0..3], &[dec!(333.34), dec!(333.33), dec!(333.33)]);
        assert_eq!(&row.budget[9..12], &[dec!(0.04), dec!(0.03), dec!(0.03)]);
        assert_eq!(row.total(Metric::Goal), dec!(40));
        assert_eq!(row.total(Metric::Budget), dec!(1000.10));
        assert!(row.diagnostics().is_empty());
    }

    #[test]
    fn monthly_row_diagnostics_name_the_row() {
        let row = MonthlyRow::project(
            "Consulta",
            &[dec!(1.5), dec!(0), dec!(0), dec!(0)],
            &[dec!(0); 4],
        );
        let diagnostics = row.diagnostics();

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::DistributionRoundingLoss);
        assert!(diagnostics[0].message.contains("'Consulta' in Q1"));
    }
}

//! # budgetplan-engine
//!
//! Consolidation engine turning raw activity records into report-ready trees.
//!
//! This crate provides:
//! - Attention level classification (`classify`)
//! - Level → family → activity aggregation with duplicate merging (`aggregate`)
//! - Exact quarter → month distribution (`distribute`)
//! - Amendment-aware editability windows (`window`)
//! - Input value checks (`validate`)
//!
//! ## Example
//!
//! ```rust
//! use budgetplan_core::{AttentionLevel, RawActivityRecord};
//! use budgetplan_engine::Consolidator;
//! use rust_decimal::Decimal;
//!
//! let records = vec![
//!     RawActivityRecord::new("Emergencia", "Triaje")
//!         .level_text("NIVEL III")
//!         .goals([Decimal::from(5); 4]),
//!     RawActivityRecord::new("Emergencia", "triaje ")
//!         .level_text("nivel iii")
//!         .goals([Decimal::ONE; 4]),
//! ];
//!
//! let consolidation = Consolidator::new().consolidate(&records).unwrap();
//! let level = consolidation.bucket(AttentionLevel::III.into());
//! assert_eq!(level.families[0].rows.len(), 1);
//! assert_eq!(level.families[0].goal_total(), Decimal::from(24));
//! ```

pub mod aggregate;
pub mod classify;
pub mod distribute;
pub mod validate;
pub mod window;

pub use aggregate::{
    ConsolidatedFamilyRow, Consolidation, LevelConsolidation, MergedDetailRow, RowIdentity,
};
pub use classify::classify;
pub use distribute::{distribute, split_quarter, Distribution, MonthlyRow, RoundingLoss};
pub use window::EditabilityWindow;

use budgetplan_core::{RawActivityRecord, RecordError};
use tracing::debug;

/// Classification + aggregation pipeline over one record snapshot
#[derive(Clone, Debug)]
pub struct Consolidator {
    /// Fold the level buckets on the rayon pool
    pub parallel: bool,
}

impl Consolidator {
    pub fn new() -> Self {
        Self { parallel: true }
    }

    /// Fold buckets on the calling thread
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Classify, check and aggregate a snapshot into a fresh tree.
    ///
    /// Classification diagnostics come first, then value diagnostics, then merge
    /// diagnostics in bucket order. Out-of-range values reject the snapshot.
    pub fn consolidate(&self, records: &[RawActivityRecord]) -> Result<Consolidation, RecordError> {
        let (classified, mut diagnostics) = classify::classify_all(records);
        diagnostics.extend(validate::check_values(&classified)?);
        let mut consolidation = aggregate::aggregate(&classified, self.parallel);
        diagnostics.append(&mut consolidation.diagnostics);
        consolidation.diagnostics = diagnostics;

        debug!(
            records = records.len(),
            diagnostics = consolidation.diagnostics.len(),
            "consolidated snapshot"
        );
        Ok(consolidation)
    }
}

impl Default for Consolidator {
    fn default() -> Self {
        Self::new()
    }
}

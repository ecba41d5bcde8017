//! Report workbook: column model, formulas, row model and the two engines
//! that produce a workbook from scratch or merge into an existing one in
//! place.

pub mod edit;
pub mod formulas;
pub mod layout;
pub mod merge;
pub mod rows;
pub mod sheet;
pub mod synthesis;

use crate::error::ReportError;

/// Largest percentage accepted for the percentage column.
pub const MAX_PERCENTAGE: f64 = 0.99;

fn check_percentage(percentage: f64) -> crate::Result<()> {
    if !(0.0..=MAX_PERCENTAGE).contains(&percentage) {
        return Err(ReportError::Config(format!(
            "percentage must be between 0 and {}, got {}",
            MAX_PERCENTAGE, percentage
        )));
    }
    Ok(())
}

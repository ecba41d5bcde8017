//! Formula text for data and subtotal rows.
//!
//! Formulas are kept without the leading `=`.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use rust_decimal::Decimal;

use super::layout::Column;
use crate::models::config::{StatisticBasis, WorkbookConfig};
use crate::models::record::LineItemRecord;

lazy_static! {
    // A reference may not follow a name character
    static ref CELL_REF: Regex = Regex::new(r"(^|[^A-Za-z0-9_.$])(\$?)([A-Z]{1,3})(\$?)(\d+)").unwrap();
}

/// Computed cells of one data row. `None` leaves the cell as a plain value
/// (for the value columns) or blank (for transport and statistic).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFormulas {
    pub invoice_value_eur: Option<String>,
    pub value_ron: Option<String>,
    pub transport: Option<String>,
    pub statistic: Option<String>,
}

/// Formulas for the data row of `record` placed on `row` (1-based).
///
/// The branch structure is kept exactly as the report has always had it:
/// RON is derived from EUR whenever RON is zero or both values are set, and
/// EUR is derived from RON only when EUR is zero and RON is not.
pub fn row_formulas(record: &LineItemRecord, row: u32, config: &WorkbookConfig) -> RowFormulas {
    let eur = record.invoice_value_eur;
    let ron = record.value_ron;
    let rate = Column::ExchangeRate.cell(row);

    let mut formulas = RowFormulas::default();

    if (eur.is_zero() && ron.is_zero())
        || (!eur.is_zero() && !ron.is_zero())
        || (!eur.is_zero() && ron.is_zero())
    {
        formulas.value_ron = Some(format!("{}*{}", Column::InvoiceValueEur.cell(row), rate));
    } else if eur.is_zero() && !ron.is_zero() {
        formulas.invoice_value_eur = Some(format!("{}/{}", Column::ValueRon.cell(row), rate));
    }

    if record.exchange_rate.is_some() {
        formulas.transport = Some(format!(
            "{}*{}/{}*{}",
            config.transport_numerator,
            rate,
            config.transport_denominator,
            Column::NetWeight.cell(row)
        ));
    }

    if ron_available(record) {
        let basis = match config.statistic_basis {
            StatisticBasis::Transport => Column::Transport,
            StatisticBasis::ExchangeRate => Column::ExchangeRate,
        };
        formulas.statistic = Some(format!(
            "ROUND({}+{}*{}, 0)",
            Column::ValueRon.cell(row),
            Column::Percentage.cell(row),
            basis.cell(row)
        ));
    }

    formulas
}

/// RON is unavailable only when it was not printed and cannot be derived.
fn ron_available(record: &LineItemRecord) -> bool {
    record.value_ron != Decimal::ZERO || record.exchange_rate.is_some()
}

/// `SUM` over one column of a group, rows `start..=end`.
pub fn subtotal_formula(column: Column, start: u32, end: u32) -> String {
    format!("SUM({}:{})", column.cell(start), column.cell(end))
}

/// Move every relative row reference of a formula written for `old_row` so
/// that it points the same distance away from `new_row`. Absolute rows
/// (`$5`) and function names that look like references (`LOG10`) are left
/// alone.
pub fn retarget_formula(formula: &str, old_row: u32, new_row: u32) -> String {
    if old_row == new_row {
        return formula.to_string();
    }
    let delta = i64::from(new_row) - i64::from(old_row);

    CELL_REF
        .replace_all(formula, |caps: &Captures| {
            let row: i64 = caps[5].parse().unwrap_or(0);
            // Followed by a parenthesis it is a function name, e.g. LOG10(
            let is_function = caps
                .get(0)
                .is_some_and(|m| formula[m.end()..].starts_with('('));
            if &caps[4] == "$" || is_function || row == 0 {
                return caps[0].to_string();
            }
            let moved = (row + delta).max(1);
            format!("{}{}{}{}{}", &caps[1], &caps[2], &caps[3], &caps[4], moved)
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::fixtures::record;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn config() -> WorkbookConfig {
        WorkbookConfig::default()
    }

    #[test]
    fn test_eur_document_derives_ron() {
        let formulas = row_formulas(&record("DE1", 1, 3, "87082990"), 5, &config());
        assert_eq!(
            formulas,
            RowFormulas {
                invoice_value_eur: None,
                value_ron: Some("G5*J5".into()),
                transport: Some("28000*J5/147000*H5".into()),
                statistic: Some("ROUND(K5+O5*P5, 0)".into()),
            }
        );
    }

    #[test]
    fn test_ron_document_derives_eur() {
        let mut rec = record("DE1", 1, 3, "87082990");
        rec.invoice_value_eur = Decimal::ZERO;
        rec.value_ron = Decimal::from_str("4977.10").unwrap();

        let formulas = row_formulas(&rec, 2, &config());
        assert_eq!(formulas.invoice_value_eur.as_deref(), Some("K2/J2"));
        assert_eq!(formulas.value_ron, None);
    }

    // Both values set is not supposed to happen, but the RON cell is still
    // overwritten by the EUR-derived formula.
    #[test]
    fn test_both_values_set_keeps_literal_branch() {
        let mut rec = record("DE1", 1, 3, "87082990");
        rec.value_ron = Decimal::from_str("10").unwrap();

        let formulas = row_formulas(&rec, 7, &config());
        assert_eq!(formulas.value_ron.as_deref(), Some("G7*J7"));
        assert_eq!(formulas.invoice_value_eur, None);
    }

    #[test]
    fn test_both_values_zero_derives_ron() {
        let mut rec = record("DE1", 1, 3, "87082990");
        rec.invoice_value_eur = Decimal::ZERO;

        let formulas = row_formulas(&rec, 3, &config());
        assert_eq!(formulas.value_ron.as_deref(), Some("G3*J3"));
    }

    #[test]
    fn test_missing_rate_blanks_dependent_cells() {
        let mut rec = record("DE1", 1, 3, "87082990");
        rec.exchange_rate = None;

        let formulas = row_formulas(&rec, 4, &config());
        assert_eq!(formulas.transport, None);
        assert_eq!(formulas.statistic, None);

        rec.invoice_value_eur = Decimal::ZERO;
        rec.value_ron = Decimal::from_str("100").unwrap();
        let formulas = row_formulas(&rec, 4, &config());
        assert_eq!(formulas.transport, None);
        assert_eq!(formulas.statistic.as_deref(), Some("ROUND(K4+O4*P4, 0)"));
    }

    #[test]
    fn test_exchange_rate_statistic_basis() {
        let mut config = config();
        config.statistic_basis = StatisticBasis::ExchangeRate;

        let formulas = row_formulas(&record("DE1", 1, 3, "87082990"), 9, &config);
        assert_eq!(formulas.statistic.as_deref(), Some("ROUND(K9+O9*J9, 0)"));
    }

    #[test]
    fn test_subtotal_formula() {
        assert_eq!(subtotal_formula(Column::NetWeight, 2, 5), "SUM(H2:H5)");
        assert_eq!(subtotal_formula(Column::Statistic, 10, 10), "SUM(Q10:Q10)");
    }

    #[test]
    fn test_retarget_formula() {
        assert_eq!(retarget_formula("G4*J4", 4, 5), "G5*J5");
        assert_eq!(retarget_formula("ROUND(K4+O4*P4, 0)", 4, 2), "ROUND(K2+O2*P2, 0)");
        assert_eq!(retarget_formula("28000*J4/147000*H4", 4, 6), "28000*J6/147000*H6");
        assert_eq!(retarget_formula("G4*$J$1", 4, 6), "G6*$J$1");
        assert_eq!(retarget_formula("$G4*J$4", 4, 6), "$G6*J$4");
        assert_eq!(retarget_formula("G4*J4", 4, 4), "G4*J4");
        assert_eq!(retarget_formula("SUM(H4:H9)", 4, 5), "SUM(H5:H10)");
    }

    #[test]
    fn test_retarget_leaves_function_names() {
        assert_eq!(retarget_formula("LOG10(G4)*ATAN2(H4, 1)", 4, 6), "LOG10(G6)*ATAN2(H6, 1)");
        assert_eq!(retarget_formula("DAYS360(I4,I5)", 4, 5), "DAYS360(I5,I6)");
    }
}

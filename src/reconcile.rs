use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::price::is_valid_price;

/// Delivery above this share of the base price is treated as a false positive
const MAX_DELIVERY_SHARE: f64 = 0.5;
/// Convenience fees above this share of the base price are treated as false positives
const MAX_CONVENIENCE_SHARE: f64 = 0.2;
/// Percentages above this mean the measurement failed
const MAX_HIDDEN_PERCENTAGE: u32 = 100;
/// Smallest gap between total and known charges worth attributing
const MIN_OTHER_FEES: f64 = 1.0;
/// Gaps must stay below max(this, 10% of base)
const OTHER_FEES_FLOOR_CAP: f64 = 100.0;
const OTHER_FEES_BASE_SHARE: f64 = 0.1;

/// Field values going into reconciliation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fees {
    pub base_price: f64,
    pub delivery_fee: f64,
    pub convenience_fee: f64,
    pub taxes: f64,
    pub other_fees: f64,
    pub total: f64,
}

/// Reconciled figures
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciled {
    #[serde(flatten)]
    pub fees: Fees,
    pub hidden_charges: f64,
    pub hidden_percentage: u32,
}

impl Reconciled {
    /// The reconciled fields, ready to be fed back in
    pub fn as_input(&self) -> Fees {
        self.fees
    }
}

fn clamp(value: f64) -> f64 {
    if is_valid_price(value) {
        value
    } else {
        0.0
    }
}

fn percentage_of(hidden: f64, base: f64) -> u32 {
    (100.0 * hidden / base).round().max(0.0) as u32
}

/// Reconcile raw field values into final figures.
///
/// A back-filled base price (total minus known fees) is kept even when it
/// comes out negative; such a result simply carries no percentage.
pub fn reconcile(input: Fees) -> Reconciled {
    let mut fees = Fees {
        base_price: clamp(input.base_price),
        delivery_fee: clamp(input.delivery_fee),
        convenience_fee: clamp(input.convenience_fee),
        taxes: clamp(input.taxes),
        other_fees: clamp(input.other_fees),
        total: clamp(input.total),
    };

    if fees.base_price > 0.0 {
        if fees.delivery_fee > fees.base_price * MAX_DELIVERY_SHARE {
            warn!(
                delivery_fee = fees.delivery_fee,
                base_price = fees.base_price,
                "delivery fee implausibly high, resetting to 0"
            );
            fees.delivery_fee = 0.0;
        }
        if fees.convenience_fee > fees.base_price * MAX_CONVENIENCE_SHARE {
            warn!(
                convenience_fee = fees.convenience_fee,
                base_price = fees.base_price,
                "convenience fee implausibly high, resetting to 0"
            );
            fees.convenience_fee = 0.0;
        }
    }

    if fees.base_price == 0.0 && fees.total > 0.0 {
        fees.base_price = fees.total - fees.delivery_fee - fees.convenience_fee - fees.taxes;
        debug!(base_price = fees.base_price, "base price back-filled from total");
    }

    let mut hidden_charges =
        fees.delivery_fee + fees.convenience_fee + fees.taxes + fees.other_fees;
    let mut hidden_percentage = 0;

    if fees.base_price > 0.0 {
        hidden_percentage = percentage_of(hidden_charges, fees.base_price);
        if hidden_percentage > MAX_HIDDEN_PERCENTAGE {
            warn!(hidden_percentage, "hidden percentage implausible, discarding hidden charges");
            hidden_percentage = 0;
            hidden_charges = 0.0;
        }
    }

    if fees.total > 0.0 && fees.base_price > 0.0 {
        let difference = fees.total - (fees.base_price + hidden_charges);
        let max_other = OTHER_FEES_FLOOR_CAP.max(fees.base_price * OTHER_FEES_BASE_SHARE);
        if difference > MIN_OTHER_FEES && difference < max_other && is_valid_price(difference) {
            debug!(difference, "unexplained difference attributed to other fees");
            fees.other_fees = difference;
            hidden_charges += difference;
            hidden_percentage = percentage_of(hidden_charges, fees.base_price);
        }
    }

    Reconciled {
        fees,
        hidden_charges,
        hidden_percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fees(base: f64, delivery: f64, convenience: f64, taxes: f64, total: f64) -> Fees {
        Fees {
            base_price: base,
            delivery_fee: delivery,
            convenience_fee: convenience,
            taxes,
            other_fees: 0.0,
            total,
        }
    }

    fn assert_invariant(r: &Reconciled) {
        let sum = r.fees.delivery_fee + r.fees.convenience_fee + r.fees.taxes + r.fees.other_fees;
        // The >100% reset is the one path that deliberately zeroes hidden charges
        if r.hidden_charges != 0.0 {
            assert!((r.hidden_charges - sum).abs() < 1e-9, "{:?}", r);
        }
        if r.fees.base_price > 0.0 && r.hidden_charges != 0.0 {
            let expected = (100.0 * r.hidden_charges / r.fees.base_price).round() as u32;
            assert_eq!(r.hidden_percentage, expected);
        }
    }

    #[test]
    fn test_simple_breakdown() {
        let r = reconcile(fees(499.0, 40.0, 0.0, 0.0, 539.0));
        assert_eq!(r.hidden_charges, 40.0);
        assert_eq!(r.hidden_percentage, 8);
        assert_eq!(r.fees.other_fees, 0.0);
        assert_invariant(&r);
    }

    #[test]
    fn test_delivery_outlier_suppressed() {
        let r = reconcile(fees(1000.0, 600.0, 0.0, 0.0, 0.0));
        assert_eq!(r.fees.delivery_fee, 0.0);
        assert_eq!(r.hidden_charges, 0.0);
    }

    #[test]
    fn test_convenience_outlier_suppressed() {
        let r = reconcile(fees(100.0, 10.0, 25.0, 0.0, 0.0));
        assert_eq!(r.fees.convenience_fee, 0.0);
        assert_eq!(r.hidden_charges, 10.0);
        assert_eq!(r.hidden_percentage, 10);
    }

    #[test]
    fn test_other_fees_imputed_from_total() {
        let r = reconcile(fees(900.0, 50.0, 0.0, 0.0, 960.0));
        assert_eq!(r.fees.other_fees, 10.0);
        assert_eq!(r.hidden_charges, 60.0);
        assert_eq!(r.hidden_percentage, 7);
        assert_invariant(&r);
    }

    #[test]
    fn test_large_gap_not_attributed() {
        // 900 + 50 + 200 gap: above max(100, 90)
        let r = reconcile(fees(900.0, 50.0, 0.0, 0.0, 1150.0));
        assert_eq!(r.fees.other_fees, 0.0);
        assert_eq!(r.hidden_charges, 50.0);
    }

    #[test]
    fn test_gap_of_one_not_attributed() {
        let r = reconcile(fees(100.0, 0.0, 0.0, 0.0, 101.0));
        assert_eq!(r.fees.other_fees, 0.0);
    }

    #[test]
    fn test_base_back_filled_from_total() {
        let r = reconcile(fees(0.0, 40.0, 10.0, 0.0, 550.0));
        assert_eq!(r.fees.base_price, 500.0);
        assert_eq!(r.hidden_charges, 50.0);
        assert_eq!(r.hidden_percentage, 10);
    }

    #[test]
    fn test_back_filled_base_can_go_negative() {
        // Known fees exceed the total: the back-fill is not re-clamped
        let r = reconcile(fees(0.0, 300.0, 150.0, 200.0, 400.0));
        assert_eq!(r.fees.base_price, -250.0);
        assert_eq!(r.hidden_charges, 650.0);
        assert_eq!(r.hidden_percentage, 0);
    }

    #[test]
    fn test_percentage_over_100_discards_hidden() {
        let r = reconcile(fees(100.0, 50.0, 20.0, 60.0, 0.0));
        assert_eq!(r.hidden_percentage, 0);
        assert_eq!(r.hidden_charges, 0.0);
    }

    #[test]
    fn test_invalid_inputs_clamped() {
        let r = reconcile(fees(f64::NAN, -5.0, f64::INFINITY, 200_000.0, 0.0));
        assert_eq!(r, Reconciled::default());
    }

    #[test]
    fn test_idempotent_on_own_output() {
        let inputs = [
            fees(499.0, 40.0, 0.0, 0.0, 539.0),
            fees(900.0, 50.0, 0.0, 0.0, 960.0),
            fees(1000.0, 600.0, 300.0, 18.0, 1100.0),
            fees(0.0, 40.0, 10.0, 0.0, 550.0),
            fees(0.0, 300.0, 150.0, 200.0, 400.0),
            fees(100.0, 50.0, 20.0, 60.0, 150.0),
            fees(0.0, 0.0, 0.0, 0.0, 0.0),
        ];
        for input in inputs {
            let once = reconcile(input);
            let twice = reconcile(once.as_input());
            assert_eq!(once, twice, "input {:?}", input);
        }
    }

    #[test]
    fn test_serializes_flat_camel_case() {
        let r = reconcile(fees(499.0, 40.0, 0.0, 0.0, 539.0));
        let json = serde_json::to_value(r).unwrap();
        assert_eq!(json["basePrice"], 499.0);
        assert_eq!(json["hiddenPercentage"], 8);
    }
}

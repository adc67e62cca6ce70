//! Money helpers
//!
//! Amounts are carried as `f64` in the station currency (VND by default)
//! and rounded half away from zero to two decimals wherever a bill is fixed.

/// Round an amount to two decimal places.
pub fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Energy × unit price, rounded to two decimals.
pub fn energy_cost(price_per_kwh: f64, energy_kwh: f64) -> f64 {
    round_money(price_per_kwh * energy_kwh)
}

/// Apply the minimum charge: anything below `base_fee` is billed as `base_fee`.
pub fn apply_base_fee(cost: f64, base_fee: f64) -> f64 {
    if cost < base_fee {
        base_fee
    } else {
        cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(round_money(10.005_1), 10.01);
        assert_eq!(round_money(3.333_333), 3.33);
    }

    #[test]
    fn energy_cost_uses_price_times_energy() {
        assert_eq!(energy_cost(3500.0, 10.0), 35_000.0);
        assert_eq!(energy_cost(3456.78, 1.5), 5185.17);
    }

    #[test]
    fn base_fee_floors_small_bills() {
        assert_eq!(apply_base_fee(350.0, 10_000.0), 10_000.0);
        assert_eq!(apply_base_fee(35_000.0, 10_000.0), 35_000.0);
    }
}

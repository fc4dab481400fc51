// Battery energy accumulation from instantaneous PTO power
//
// Summed belt speed is taken as proportional to instantaneous power (kW).
// Energy only flows in: there is no discharge path, only an explicit reset.

use serde::{Deserialize, Serialize};

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Coarse charge level for display colouring
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChargeBand {
    Low,
    Medium,
    High,
}

/// Battery charge and its fixed capacity, both in kWh
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BatteryState {
    pub charge: f64,
    pub capacity: f64,
}

impl BatteryState {
    pub fn empty(capacity: f64) -> Self {
        Self {
            charge: 0.0,
            capacity,
        }
    }

    /// Charge as a percentage of capacity, clamped to [0, 100]
    pub fn percent(&self) -> f64 {
        if self.capacity <= 0.0 {
            return 0.0;
        }
        (self.charge / self.capacity * 100.0).clamp(0.0, 100.0)
    }

    pub fn band(&self) -> ChargeBand {
        let level = self.percent();
        if level < 30.0 {
            ChargeBand::Low
        } else if level < 70.0 {
            ChargeBand::Medium
        } else {
            ChargeBand::High
        }
    }
}

/// Fold one sample's rates into the battery state.
///
/// `kw_per_rate` scales summed belt speed to kW. Excess energy beyond
/// capacity is discarded.
pub fn integrate(
    rates: &[f64],
    elapsed_seconds: f64,
    state: BatteryState,
    kw_per_rate: f64,
) -> BatteryState {
    let total_rate: f64 = rates.iter().sum();
    let increment = total_rate * kw_per_rate * elapsed_seconds / SECONDS_PER_HOUR;
    // NaN or negative capacity holds nothing
    let ceiling = state.capacity.max(0.0);
    BatteryState {
        charge: (state.charge + increment).clamp(0.0, ceiling),
        capacity: state.capacity,
    }
}

/// Sole owner of the session's battery state
#[derive(Debug, Clone)]
pub struct EnergyIntegrator {
    state: BatteryState,
    kw_per_rate: f64,
}

impl EnergyIntegrator {
    pub fn new(capacity: f64, kw_per_rate: f64) -> Self {
        Self {
            state: BatteryState::empty(capacity),
            kw_per_rate,
        }
    }

    pub fn state(&self) -> BatteryState {
        self.state
    }

    pub fn apply(&mut self, rates: &[f64], elapsed_seconds: f64) -> BatteryState {
        self.state = integrate(rates, elapsed_seconds, self.state, self.kw_per_rate);
        self.state
    }

    pub fn reset(&mut self) {
        self.state.charge = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_channels_half_speed() {
        let state = integrate(&[0.5, 0.5, 0.5], 0.05, BatteryState::empty(15.0), 1.0);
        let expected = 1.5 * 0.05 / 3600.0;
        assert!((state.charge - expected).abs() < 1e-15);
        assert!((state.charge - 0.0000208).abs() < 1e-7);
        assert_eq!(state.capacity, 15.0);
    }

    #[test]
    fn test_clamps_exactly_to_capacity() {
        let start = BatteryState {
            charge: 15.0 - 0.00001,
            capacity: 15.0,
        };
        // 10 kW for 1 s = 0.00278 kWh, far more than the headroom
        let state = integrate(&[10.0], 1.0, start, 1.0);
        assert_eq!(state.charge, 15.0);
    }

    #[test]
    fn test_monotonic_non_decreasing() {
        let mut integrator = EnergyIntegrator::new(0.15, 1.0);
        let mut last = integrator.state().charge;
        for i in 0..500 {
            let r = (i % 7) as f64 * 0.9;
            let state = integrator.apply(&[r, 0.0, r * 2.0], 0.05 + (i % 3) as f64 * 0.01);
            assert!(state.charge >= last);
            assert!(state.charge <= state.capacity);
            last = state.charge;
        }
    }

    #[test]
    fn test_zero_rates_no_change() {
        let mut integrator = EnergyIntegrator::new(15.0, 1.0);
        integrator.apply(&[0.0, 0.0, 0.0], 0.05);
        assert_eq!(integrator.state().charge, 0.0);
    }

    #[test]
    fn test_scaling_factor() {
        let a = integrate(&[1.0], 3600.0, BatteryState::empty(100.0), 1.0);
        let b = integrate(&[1.0], 3600.0, BatteryState::empty(100.0), 2.5);
        assert!((a.charge - 1.0).abs() < 1e-12);
        assert!((b.charge - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_reset_zeroes_charge_keeps_capacity() {
        let mut integrator = EnergyIntegrator::new(15.0, 1.0);
        integrator.apply(&[100.0], 60.0);
        assert!(integrator.state().charge > 0.0);
        integrator.reset();
        assert_eq!(integrator.state(), BatteryState::empty(15.0));
    }

    #[test]
    fn test_percent_and_band() {
        let mut state = BatteryState::empty(0.15);
        assert_eq!(state.percent(), 0.0);
        assert_eq!(state.band(), ChargeBand::Low);

        state.charge = 0.075;
        assert!((state.percent() - 50.0).abs() < 1e-9);
        assert_eq!(state.band(), ChargeBand::Medium);

        state.charge = 0.15;
        assert_eq!(state.percent(), 100.0);
        assert_eq!(state.band(), ChargeBand::High);
    }

    #[test]
    fn test_invalid_capacity_does_not_panic() {
        let state = integrate(&[3.0, 3.0, 3.0], 0.05, BatteryState::empty(-1.0), 1.0);
        assert_eq!(state.charge, 0.0);
        let state = integrate(&[3.0], 0.05, BatteryState::empty(f64::NAN), 1.0);
        assert_eq!(state.charge, 0.0);
    }

    #[test]
    fn test_percent_zero_capacity() {
        assert_eq!(BatteryState::empty(0.0).percent(), 0.0);
    }
}

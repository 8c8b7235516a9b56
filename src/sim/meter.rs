use super::time::SimTime;

/// A household electric meter that aggregates appliance power into net load.
///
/// Net load convention:
/// - Positive values import from the grid (consumption)
/// - Negative values export to the grid (production)
#[derive(Debug, Clone)]
pub struct ElectricMeter {
    name: String,
    net_watts: f64,
    max_import_kw: f64,
    max_export_kw: f64,
}

/// Household net power from `at` until the next reading.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterReading {
    pub at: SimTime,
    /// Net power in watts (positive = import).
    pub net_watts: f64,
    /// Number of appliances drawing or producing power.
    pub active_appliances: usize,
    pub within_limits: bool,
}

impl ElectricMeter {
    /// Creates a meter with no power limits.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            net_watts: 0.0,
            max_import_kw: f64::INFINITY,
            max_export_kw: f64::INFINITY,
        }
    }

    /// Creates a meter with import and export power limits.
    ///
    /// # Panics
    ///
    /// Panics if `max_import_kw` or `max_export_kw` is negative.
    pub fn with_limits(name: impl Into<String>, max_import_kw: f64, max_export_kw: f64) -> Self {
        assert!(max_import_kw >= 0.0);
        assert!(max_export_kw >= 0.0);

        Self {
            name: name.into(),
            net_watts: 0.0,
            max_import_kw,
            max_export_kw,
        }
    }

    /// Resets accumulated net power to zero.
    pub fn reset(&mut self) {
        self.net_watts = 0.0;
    }

    /// Adds a signed appliance contribution in watts.
    pub fn add_watts(&mut self, watts: f64) {
        self.net_watts += watts;
    }

    /// Returns the current net power in watts.
    pub fn net_watts(&self) -> f64 {
        self.net_watts
    }

    /// Returns the current net power in kW.
    pub fn net_kw(&self) -> f64 {
        self.net_watts / 1000.0
    }

    pub fn max_import_kw(&self) -> f64 {
        self.max_import_kw
    }

    pub fn max_export_kw(&self) -> f64 {
        self.max_export_kw
    }

    /// Returns `true` when net power is within import/export limits.
    pub fn within_limits(&self) -> bool {
        let kw = self.net_kw();
        kw >= -self.max_export_kw && kw <= self.max_import_kw
    }

    /// Snapshots the current net power as a reading at `at`.
    pub fn read(&self, at: SimTime, active_appliances: usize) -> MeterReading {
        MeterReading {
            at,
            net_watts: self.net_watts,
            active_appliances,
            within_limits: self.within_limits(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Charge state reported by the BMS alongside the current reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatteryStatus {
    Idle,
    Charging,
    Discharging,
    /// The BMS has tripped a protection (over/under voltage, temperature, ...)
    Protect,
}

impl BatteryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatteryStatus::Idle => "Idle",
            BatteryStatus::Charging => "Charging",
            BatteryStatus::Discharging => "Discharging",
            BatteryStatus::Protect => "Protect",
        }
    }
}

impl std::fmt::Display for BatteryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded data response from the battery
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryFrame {
    /// The voltage of each cell in V, in physical cell order
    pub cell_voltages: Vec<f64>,
    /// Sensor temperatures in °C (0.1° resolution), in the order transmitted
    pub temperatures: Vec<f64>,
    /// Current in A. Only negative while discharging.
    pub current: f64,
    pub status: BatteryStatus,
    /// The battery voltage in V
    pub total_voltage: f64,
    /// Residual capacity in Ah
    pub remaining_capacity: f64,
    /// Capacity when fully charged, in Ah
    pub full_capacity: f64,
    /// Nameplate capacity in Ah
    pub design_capacity: f64,
    /// Lifetime number of battery cycles (count)
    pub cycle_count: u16,
    /// State of charge in %, exactly as reported
    pub state_of_charge: u16,
}

impl TelemetryFrame {
    pub fn cell_count(&self) -> usize {
        self.cell_voltages.len()
    }

    pub fn min_cell_voltage(&self) -> Option<f64> {
        self.cell_voltages.iter().copied().reduce(f64::min)
    }

    pub fn max_cell_voltage(&self) -> Option<f64> {
        self.cell_voltages.iter().copied().reduce(f64::max)
    }

    /// Difference between the highest and lowest cell in V
    pub fn cell_voltage_spread(&self) -> Option<f64> {
        Some(self.max_cell_voltage()? - self.min_cell_voltage()?)
    }

    /// Instantaneous power in W, signed like [`TelemetryFrame::current`]
    pub fn power(&self) -> f64 {
        self.total_voltage * self.current
    }
}

//! Text rendering of a [`TelemetryFrame`] for a terminal.

use std::fmt::Write;

use crate::telemetry_frame::TelemetryFrame;

/// Moves the cursor home and clears the screen
pub const CLEAR_SCREEN: &str = "\x1b[H\x1b[J";

const WIDTH: usize = 42;

/// Render the boxed status view
pub fn render_frame(frame: &TelemetryFrame) -> String {
    let mut out = String::new();
    let rule = "─".repeat(WIDTH);

    let _ = writeln!(out, "┌{rule}┐");
    row(&mut out, format!("BATTERY STATUS             SOC: {:>3}%", frame.state_of_charge));
    let _ = writeln!(out, "├{rule}┤");
    row(&mut out, format!("Voltage:  {:>6.2} V", frame.total_voltage));
    row(&mut out, format!("Current:  {:>6.1} A   ({:<11})", frame.current, frame.status.as_str()));
    row(&mut out, format!("Power:    {:>6.1} W", frame.power()));
    row(
        &mut out,
        format!("Capacity: {:>6.1} / {:>5.1} Ah", frame.remaining_capacity, frame.full_capacity),
    );
    row(
        &mut out,
        format!("Design:   {:>6.1} Ah   Cycles: {}", frame.design_capacity, frame.cycle_count),
    );
    let _ = writeln!(out, "├{rule}┤");
    row(&mut out, format!("CELL VOLTAGES ({})", frame.cell_count()));

    for (i, pair) in frame.cell_voltages.chunks(2).enumerate() {
        let first = format!("#{}: {:.3}V", i * 2 + 1, pair[0]);
        let second = pair
            .get(1)
            .map(|v| format!("#{}: {:.3}V", i * 2 + 2, v))
            .unwrap_or_default();
        row(&mut out, format!("{first:<18} {second:<18}"));
    }

    if let (Some(min), Some(max), Some(spread)) =
        (frame.min_cell_voltage(), frame.max_cell_voltage(), frame.cell_voltage_spread())
    {
        row(&mut out, format!("Min {min:.3}V  Max {max:.3}V  Δ {:.0}mV", spread * 1000.0));
    }

    let _ = writeln!(out, "├{rule}┤");
    let temps = frame
        .temperatures
        .iter()
        .map(|t| format!("{t:.1}"))
        .collect::<Vec<_>>()
        .join(", ");
    row(&mut out, format!("Temps: [{temps}] °C"));
    let _ = writeln!(out, "└{rule}┘");

    out
}

/// Write one padded line inside the box
fn row(out: &mut String, content: String) {
    let padding = (WIDTH - 2).saturating_sub(content.chars().count());
    let _ = writeln!(out, "│  {content}{} │", " ".repeat(padding.saturating_sub(1)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry_frame::BatteryStatus;

    fn frame() -> TelemetryFrame {
        TelemetryFrame {
            cell_voltages: vec![3.3, 3.31, 3.305],
            temperatures: vec![4.8, -1.5],
            current: -5.0,
            status: BatteryStatus::Discharging,
            total_voltage: 13.21,
            remaining_capacity: 80.5,
            full_capacity: 100.0,
            design_capacity: 105.0,
            cycle_count: 12,
            state_of_charge: 87,
        }
    }

    #[test]
    fn test_render_contains_readings() {
        let text = render_frame(&frame());
        assert!(text.contains("SOC:  87%"));
        assert!(text.contains(" 13.21 V"));
        assert!(text.contains("  -5.0 A   (Discharging)"));
        assert!(text.contains("Power:     -66."));
        assert!(text.contains("80.5 / 100.0 Ah"));
        assert!(text.contains("Cycles: 12"));
        assert!(text.contains("Temps: [4.8, -1.5] °C"));
    }

    #[test]
    fn test_render_cells_two_per_row() {
        let text = render_frame(&frame());
        let cell_rows: Vec<&str> = text.lines().filter(|l| l.contains("#")).collect();
        assert_eq!(cell_rows.len(), 2);
        assert!(cell_rows[0].contains("#1: 3.300V"));
        assert!(cell_rows[0].contains("#2: 3.310V"));
        assert!(cell_rows[1].contains("#3: 3.305V"));
        assert!(text.contains("CELL VOLTAGES (3)"));
        assert!(text.contains("Δ 10mV"));
    }

    #[test]
    fn test_render_rows_are_aligned() {
        let text = render_frame(&frame());
        let widths: Vec<usize> = text.lines().map(|l| l.chars().count()).collect();
        assert!(widths.iter().all(|w| *w == widths[0]), "{widths:?}");
    }

    #[test]
    fn test_render_without_cells() {
        let mut f = frame();
        f.cell_voltages.clear();
        f.temperatures.clear();
        let text = render_frame(&f);
        assert!(!text.contains("Min"));
        assert!(text.contains("CELL VOLTAGES (0)"));
        assert!(text.contains("Temps: [] °C"));
    }
}

//! `invisia status`: one refresh, then print the snapshot.

use owo_colors::OwoColorize;

use invisia_core::{Coordinator, Snapshot};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::{self, or_dash, quantity};

pub async fn handle(coordinator: &Coordinator, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = coordinator.refresh().await?;
    let color = output::should_color(&global.color);

    let out = output::render_single(&global.output, snapshot.as_ref(), |s| {
        detail(coordinator, s, color)
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Multi-line detail view of a snapshot.
pub fn detail(coordinator: &Coordinator, s: &Snapshot, color: bool) -> String {
    let r = &s.resolved;
    let ids = coordinator.ids();

    let rfid = match s.rfid.as_ref().and_then(|rfid| rfid.name()) {
        Some(name) => format!("{} ({name})", ids.rfid_id),
        None => ids.rfid_id.clone(),
    };

    let plugged = match r.car_plugged_in {
        Some(true) if color => "yes".green().to_string(),
        Some(true) => "yes".into(),
        Some(false) => "no".into(),
        None => "-".into(),
    };

    let mut lines = vec![
        row("RFID", rfid),
        row("Device", coordinator.unique_id()),
        row(
            "Profile",
            or_dash(s.rfid.as_ref().and_then(|rfid| rfid.profile())),
        ),
        row("Status", or_dash(r.charging_status.as_deref())),
        row("Mode", or_dash(r.charging_mode)),
        row("Plugged in", plugged),
        row("Power", quantity(r.current_power_kw, "kW")),
        row("Charged", quantity(r.energy_charged_kwh, "kWh")),
        row("Sourced today", quantity(r.energy_sourced_today_kwh, "kWh")),
    ];
    if let Some(cs) = ids.charging_station_id.as_deref() {
        lines.push(row("Station", cs));
        lines.push(row("Max current", quantity(r.a_max, "A")));
        lines.push(row("Station IP", or_dash(r.ip_address.as_deref())));
        lines.push(row("Lock", or_dash(r.lock.as_ref())));
    }
    lines.push(row("Timers", s.timers.len()));
    lines.push(row("Journal", format!("{} entries", s.journal.len())));

    let updated = s.captured_at.format("%Y-%m-%d %H:%M:%S UTC").to_string();
    lines.push(row(
        "Updated",
        if color { updated.dimmed().to_string() } else { updated },
    ));
    lines.join("\n")
}

fn row(label: &str, value: impl std::fmt::Display) -> String {
    format!("{:<15}{value}", format!("{label}:"))
}

//! `invisia watch`: start the coordinator and print every published
//! snapshot until Ctrl-C.

use std::sync::Arc;

use invisia_core::{Coordinator, Snapshot};
use tracing::info;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output::{self, or_dash, quantity};

pub async fn handle(coordinator: &Coordinator, global: &GlobalOpts) -> Result<(), CliError> {
    let mut rx = coordinator.subscribe();
    let first = coordinator.start().await?;
    rx.mark_unchanged();
    print(&first, global)?;

    info!(
        interval_secs = coordinator.config().poll_interval.as_secs(),
        "watching, press Ctrl-C to stop"
    );

    let result = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),
            changed = rx.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let latest = rx.borrow_and_update().clone();
                if let Some(snapshot) = latest {
                    if let Err(e) = print(&snapshot, global) {
                        break Err(e);
                    }
                }
            }
        }
    };

    coordinator.shutdown().await;
    result
}

fn print(snapshot: &Arc<Snapshot>, global: &GlobalOpts) -> Result<(), CliError> {
    let out = match global.output {
        // One line per update keeps a scrolling log readable.
        OutputFormat::Table => summary(snapshot),
        // Streaming consumers want one document per line.
        OutputFormat::Json => {
            output::render_single(&OutputFormat::JsonCompact, snapshot.as_ref(), |_| {
                String::new()
            })?
        }
        _ => output::render_single(&global.output, snapshot.as_ref(), |_| String::new())?,
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

fn summary(s: &Snapshot) -> String {
    let r = &s.resolved;
    format!(
        "{}  status={}  mode={}  plugged={}  power={}  charged={}",
        s.captured_at.format("%H:%M:%S"),
        or_dash(r.charging_status.as_deref()),
        or_dash(r.charging_mode),
        or_dash(r.car_plugged_in),
        quantity(r.current_power_kw, "kW"),
        quantity(r.energy_charged_kwh, "kWh"),
    )
}

//! `invisia stats`: ad-hoc statistics and station timeseries queries.

use chrono::{TimeDelta, Utc};
use invisia_api::RawResponse;
use invisia_core::Coordinator;
use invisia_core::assemble::timestamp;

use crate::cli::{GlobalOpts, OutputFormat, StatsArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    coordinator: &Coordinator,
    args: StatsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let now = Utc::now();
    let start = timestamp(now - TimeDelta::hours(i64::from(args.hours)));
    let end = timestamp(now);
    let granularity = args.granularity.as_str();

    let client = coordinator.client();
    let rfid_id = &coordinator.ids().rfid_id;

    let response = match (args.stations, args.zev) {
        (false, false) => client.get_rfid_stats(rfid_id, &start, &end, granularity).await,
        (false, true) => {
            client
                .get_rfid_stats_zev(rfid_id, &start, &end, granularity)
                .await
        }
        (true, false) => {
            client
                .get_charging_station_timeseries(&start, &end, granularity)
                .await
        }
        (true, true) => {
            client
                .get_charging_station_timeseries_zev(&start, &end, granularity)
                .await
        }
    }
    .map_err(invisia_core::CoreError::from)?;

    let value = match response {
        RawResponse::Json(value) => value,
        RawResponse::NonJson { status, text } => {
            return Err(CliError::Protocol {
                message: format!("HTTP {status}: {text}"),
            });
        }
        RawResponse::HttpError { status, body } => {
            return Err(CliError::ApiError {
                code: format!("HTTP {status}"),
                message: body.to_string(),
            });
        }
    };

    // Statistics are free-form; the table view is pretty JSON.
    let format = match global.output {
        OutputFormat::Table => OutputFormat::Json,
        ref other => other.clone(),
    };
    let out = output::render_single(&format, &value, |_| String::new())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

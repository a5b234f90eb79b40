//! `invisia set-profile`: relay a charging profile change.

use invisia_core::Coordinator;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn handle(
    coordinator: &Coordinator,
    profile: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    coordinator.set_profile(profile).await?;

    let profile = profile.to_lowercase();
    let Some(snapshot) = coordinator.snapshot() else {
        if !global.quiet {
            eprintln!("✓ Profile set to '{profile}' (state not refreshed)");
        }
        return Ok(());
    };

    if !global.quiet {
        eprintln!("✓ Profile set to '{profile}'");
    }
    let color = output::should_color(&global.color);
    let out = output::render_single(&global.output, &snapshot.resolved, |_| {
        super::status::detail(coordinator, &snapshot, color)
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

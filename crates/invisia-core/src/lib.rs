//! Polling and command layer between `invisia-api` and presentation consumers.
//!
//! - **[`Coordinator`]**: One instance per configured installation + RFID
//!   pairing. [`refresh()`](Coordinator::refresh) runs one poll cycle and
//!   publishes the resulting [`Snapshot`]; [`start()`](Coordinator::start)
//!   performs the first refresh and spawns the fixed-interval poll task;
//!   [`shutdown()`](Coordinator::shutdown) cancels and joins it.
//!
//! - **Command relay**: [`Coordinator::set_profile`] forwards a charging
//!   profile change to the backend and forces an out-of-cycle refresh.
//!
//! - **Domain model** ([`model`]): The normalised [`Snapshot`] with typed
//!   sections and a [`ResolvedState`] computed once by the field precedence
//!   rules, plus [`DeviceInfo`] grouping metadata.

pub mod assemble;
pub mod config;
pub mod convert;
pub mod coordinator;
pub mod error;
pub mod model;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{CoordinatorConfig, Ids};
pub use coordinator::Coordinator;
pub use error::CoreError;
pub use invisia_api::Credentials;

pub use model::{
    ChargingProfile, ChargingStationDetail, DeviceInfo, ResolvedState, RfidInfo, RfidRecord,
    Snapshot, StatsBlock, StatusBlock,
};

// ── Domain model ──
//
// Typed, serialisable views of what one poll cycle produced.

mod de;
pub mod device;
pub mod profile;
pub mod resolved;
pub mod snapshot;

pub use de::number;
pub use device::DeviceInfo;
pub use profile::ChargingProfile;
pub use resolved::ResolvedState;
pub use snapshot::{
    ChargingStationDetail, RfidInfo, RfidRecord, Snapshot, StatsBlock, StatusBlock,
};

use serde::Serialize;

const MANUFACTURER: &str = "Invisia";

/// Grouping metadata a host uses to cluster the entities of one physical
/// (or logical) device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Stable identifier, unique across installations.
    pub identifier: String,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
}

impl DeviceInfo {
    /// The logical device representing an RFID tag.
    pub fn rfid(installation_id: &str, rfid_id: &str) -> Self {
        Self {
            identifier: format!("{installation_id}_{rfid_id}"),
            name: format!("Invisia RFID {rfid_id}"),
            manufacturer: MANUFACTURER.into(),
            model: "RFID".into(),
        }
    }

    /// The physical charging station an RFID is paired with.
    pub fn charging_station(installation_id: &str, charging_station_id: &str) -> Self {
        Self {
            identifier: format!("{installation_id}_cs_{charging_station_id}"),
            name: format!("Invisia Charging Station {charging_station_id}"),
            manufacturer: MANUFACTURER.into(),
            model: "Charging Station".into(),
        }
    }
}

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::UnknownResource;

/// A single list entry as returned by the backend. Opaque apart from its identity field.
pub type Record = Value;

/// Filter parameter bag forwarded verbatim to the fetch operation.
pub type Filters = Map<String, Value>;

pub const DEFAULT_ID_KEY: &str = "id";

/// Returns the identity of `record` under `id_key`, if the record is an object carrying one.
pub fn record_id<'a>(record: &'a Record, id_key: &str) -> Option<&'a Value> {
    record.as_object().and_then(|fields| fields.get(id_key))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resource {
    Devices,
    Fields,
    CollectionSessions,
    RawData,
}

impl Resource {
    pub const ALL: [Resource; 4] = [
        Resource::Devices,
        Resource::Fields,
        Resource::CollectionSessions,
        Resource::RawData,
    ];

    pub fn list_path(self) -> &'static str {
        match self {
            Resource::Devices => "/api/devices/",
            Resource::Fields => "/api/fields/",
            Resource::CollectionSessions => "/api/collection-sessions",
            Resource::RawData => "/api/raw-data/list",
        }
    }

    pub fn known_filters(self) -> &'static [&'static str] {
        match self {
            Resource::Devices => &[
                "owner_id",
                "device_type",
                "platform_level",
                "active_only",
                "keyword",
                "has_sensor",
                "has_actuator",
            ],
            Resource::Fields => &[
                "owner_id",
                "organization_id",
                "active_only",
                "keyword",
                "crop_type",
                "soil_type",
                "irrigation_type",
            ],
            Resource::CollectionSessions => &[
                "field_id",
                "start_date",
                "end_date",
                "mission_types",
                "status",
            ],
            Resource::RawData => &["user_id", "data_type", "device_id", "field_id", "session_id"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Devices => "devices",
            Resource::Fields => "fields",
            Resource::CollectionSessions => "collection-sessions",
            Resource::RawData => "raw-data",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = UnknownResource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Resource::ALL
            .into_iter()
            .find(|resource| resource.as_str() == wanted)
            .ok_or_else(|| UnknownResource(s.to_string()))
    }
}

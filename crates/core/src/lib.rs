use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

pub mod config;
pub mod error;

pub use error::{DiscoveryStage, InventoryError, Result};

pub const INVENTORY_SCHEMA_VERSION: &str = "1.0.0";
pub const DEFAULT_MAX_ENTRIES: usize = 255;

/// One block-class device exactly as the host reported it.
///
/// Every attribute except the short name may be missing on a given device;
/// missing values stay `None` (or empty for the hierarchical paths) and are
/// resolved to defaults further down the pipeline.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct RawDeviceRecord {
    pub model: Option<String>,
    pub device_path: String,
    pub system_path: String,
    pub device_node: Option<String>,
    pub short_name: String,
    pub device_type: Option<String>,
    pub raw_size_sectors: Option<u64>,
    pub logical_block_size_bytes: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    pub index: usize,
    pub model: Option<String>,
    pub device_node: String,
    pub short_name: String,
    /// `None` when capacity is not meaningful (optical media).
    pub size_gigabytes: Option<u64>,
    pub device_path: String,
    pub system_path: String,
    pub device_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Inventory {
    pub entries: Vec<InventoryEntry>,
    pub max_entries: usize,
    /// Selectable devices dropped because the inventory was already full.
    pub overflow: usize,
}

impl Inventory {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_truncated(&self) -> bool {
        self.overflow > 0
    }

    pub fn get(&self, index: usize) -> Option<&InventoryEntry> {
        self.entries.get(index)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub os: String,
    pub os_version: String,
    pub machine: String,
}

impl HostInfo {
    pub fn unknown() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            os_version: "unknown".to_string(),
            machine: "unknown".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ScanReport {
    pub scan_id: Uuid,
    pub schema_version: String,
    pub host: HostInfo,
    pub attempts: u32,
    pub inventory: Inventory,
    pub generated_at_utc: String,
}

impl ScanReport {
    pub fn new(host: HostInfo, attempts: u32, inventory: Inventory) -> Self {
        Self {
            scan_id: Uuid::new_v4(),
            schema_version: INVENTORY_SCHEMA_VERSION.to_string(),
            host,
            attempts,
            inventory,
            generated_at_utc: now_utc_rfc3339(),
        }
    }
}

/// Read-only access to the host's block devices.
///
/// Implementations must enumerate the block class only, yield records in the
/// host's enumeration order, and release every host handle before returning.
/// Each call owns its own enumeration context.
pub trait DeviceSource: Send + Sync {
    fn list_raw_devices(&self) -> Result<Vec<RawDeviceRecord>>;

    fn host(&self) -> HostInfo {
        HostInfo::unknown()
    }
}

pub fn now_utc_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(index: usize) -> InventoryEntry {
        InventoryEntry {
            index,
            model: Some("Acme".to_string()),
            device_node: format!("/dev/sd{}", (b'a' + index as u8) as char),
            short_name: format!("sd{}", (b'a' + index as u8) as char),
            size_gigabytes: Some(512),
            device_path: String::new(),
            system_path: String::new(),
            device_type: Some("disk".to_string()),
        }
    }

    #[test]
    fn inventory_lookup_by_index() {
        let inventory = Inventory {
            entries: vec![entry(0), entry(1)],
            max_entries: DEFAULT_MAX_ENTRIES,
            overflow: 0,
        };
        assert_eq!(inventory.len(), 2);
        assert_eq!(inventory.get(1).map(|e| e.device_node.as_str()), Some("/dev/sdb"));
        assert!(inventory.get(2).is_none());
        assert!(!inventory.is_truncated());
    }

    #[test]
    fn report_carries_fresh_identity() {
        let inventory = Inventory {
            entries: vec![entry(0)],
            max_entries: 1,
            overflow: 3,
        };
        let first = ScanReport::new(HostInfo::unknown(), 1, inventory.clone());
        let second = ScanReport::new(HostInfo::unknown(), 1, inventory);
        assert_ne!(first.scan_id, second.scan_id);
        assert_eq!(first.schema_version, INVENTORY_SCHEMA_VERSION);
        assert!(first.inventory.is_truncated());
        assert_eq!(first.inventory, second.inventory);
    }

    #[test]
    fn optical_size_serializes_as_null() {
        let mut optical = entry(0);
        optical.size_gigabytes = None;
        let value = serde_json::to_value(&optical).unwrap();
        assert!(value["size_gigabytes"].is_null());
    }
}

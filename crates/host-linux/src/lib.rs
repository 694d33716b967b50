use clonenux_core::config::DiscoveryConfig;
use clonenux_core::{DeviceSource, DiscoveryStage, HostInfo, InventoryError, RawDeviceRecord, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Block devices read from sysfs (`<sys_root>/class/block`).
#[derive(Debug, Clone)]
pub struct SysfsDeviceSource {
    sys_root: PathBuf,
    dev_root: PathBuf,
}

impl Default for SysfsDeviceSource {
    fn default() -> Self {
        Self::with_roots("/sys", "/dev")
    }
}

impl SysfsDeviceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roots(sys_root: impl Into<PathBuf>, dev_root: impl Into<PathBuf>) -> Self {
        Self {
            sys_root: sys_root.into(),
            dev_root: dev_root.into(),
        }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::with_roots(&config.sys_root, &config.dev_root)
    }

    fn enumerate_block_class(&self) -> Result<Vec<BlockEntry>> {
        let sys_root = fs::canonicalize(&self.sys_root).map_err(|err| {
            InventoryError::discovery(
                DiscoveryStage::Subsystem,
                format!("{}: {err}", self.sys_root.display()),
            )
        })?;
        let class_dir = sys_root.join("class").join("block");
        let entries = fs::read_dir(&class_dir).map_err(|err| {
            InventoryError::discovery(
                DiscoveryStage::Enumerate,
                format!("{}: {err}", class_dir.display()),
            )
        })?;

        let mut blocks = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| {
                InventoryError::discovery(
                    DiscoveryStage::DeviceList,
                    format!("{}: {err}", class_dir.display()),
                )
            })?;
            let link = entry.path();
            let system_path = fs::canonicalize(&link).unwrap_or(link);
            blocks.push(BlockEntry {
                short_name: entry.file_name().to_string_lossy().to_string(),
                device_path: device_path(&sys_root, &system_path),
                system_path,
            });
        }
        // Same order udev's enumerator reports: by system path.
        blocks.sort_by(|a, b| a.system_path.cmp(&b.system_path));
        Ok(blocks)
    }

    fn read_record(&self, block: &BlockEntry) -> RawDeviceRecord {
        let path = &block.system_path;
        let uevent = read_uevent(path.join("uevent"));

        let device_node = uevent
            .get("DEVNAME")
            .filter(|name| !name.is_empty())
            .map(|name| self.dev_root.join(name).to_string_lossy().to_string());

        RawDeviceRecord {
            model: field(&block.short_name, "device/model", read_string(path.join("device/model")))
                .filter(|model| !model.is_empty()),
            device_path: block.device_path.clone(),
            system_path: path.to_string_lossy().to_string(),
            device_node,
            short_name: block.short_name.clone(),
            device_type: uevent.get("DEVTYPE").cloned(),
            raw_size_sectors: field(&block.short_name, "size", read_parsed(path.join("size"))),
            logical_block_size_bytes: field(
                &block.short_name,
                "queue/logical_block_size",
                read_parsed(path.join("queue/logical_block_size")),
            ),
        }
    }
}

impl DeviceSource for SysfsDeviceSource {
    fn list_raw_devices(&self) -> Result<Vec<RawDeviceRecord>> {
        let blocks = self.enumerate_block_class()?;
        let records: Vec<RawDeviceRecord> =
            blocks.iter().map(|block| self.read_record(block)).collect();
        info!(
            sys_root = %self.sys_root.display(),
            devices = records.len(),
            "enumerated block devices"
        );
        Ok(records)
    }

    fn host(&self) -> HostInfo {
        HostInfo {
            os: "linux".to_string(),
            os_version: read_os_release(),
            machine: read_machine(&self.sys_root),
        }
    }
}

#[derive(Debug, Clone)]
struct BlockEntry {
    short_name: String,
    device_path: String,
    system_path: PathBuf,
}

/// A single attribute that could not be read for an otherwise valid device.
#[derive(Debug, Error)]
enum FieldUnavailable {
    #[error("missing: {0}")]
    Missing(std::io::Error),
    #[error("unparseable value {0:?}")]
    Unparseable(String),
}

fn field<T>(device: &str, attribute: &str, value: std::result::Result<T, FieldUnavailable>) -> Option<T> {
    match value {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(device, attribute, %err, "field unavailable, using default");
            None
        }
    }
}

fn device_path(sys_root: &Path, system_path: &Path) -> String {
    system_path
        .strip_prefix(sys_root)
        .map(|rel| format!("/{}", rel.display()))
        .unwrap_or_default()
}

fn read_uevent(path: impl AsRef<Path>) -> HashMap<String, String> {
    key_values(&fs::read_to_string(path).unwrap_or_default())
}

/// `KEY=value` lines as found in `uevent` and `os-release`. Surrounding double
/// quotes on a value are dropped.
fn key_values(data: &str) -> HashMap<String, String> {
    data.lines()
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().trim_matches('"').to_string()))
        .collect()
}

fn read_os_release() -> String {
    os_version(&key_values(&fs::read_to_string("/etc/os-release").unwrap_or_default()))
}

fn os_version(release: &HashMap<String, String>) -> String {
    match (release.get("NAME"), release.get("VERSION")) {
        (Some(name), Some(version)) => format!("{name} {version}"),
        (Some(name), None) => name.clone(),
        (None, _) => "unknown".to_string(),
    }
}

fn read_machine(sys_root: &Path) -> String {
    let dmi = sys_root.join("devices/virtual/dmi/id");
    let vendor = read_string(dmi.join("sys_vendor")).ok();
    let product = read_string(dmi.join("product_name")).ok();
    match (vendor, product) {
        (Some(vendor), Some(product)) => format!("{} {}", vendor, product),
        (Some(vendor), None) => vendor,
        (None, Some(product)) => product,
        _ => read_string("/proc/sys/kernel/hostname").unwrap_or_else(|_| "unknown".to_string()),
    }
}

fn read_string(path: impl AsRef<Path>) -> std::result::Result<String, FieldUnavailable> {
    fs::read_to_string(path)
        .map(|value| value.trim().to_string())
        .map_err(FieldUnavailable::Missing)
}

fn read_parsed<T: std::str::FromStr>(path: impl AsRef<Path>) -> std::result::Result<T, FieldUnavailable> {
    let raw = read_string(path)?;
    raw.parse::<T>().map_err(|_| FieldUnavailable::Unparseable(raw))
}

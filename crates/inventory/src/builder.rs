use clonenux_core::config::InventoryConfig;
use clonenux_core::{Inventory, InventoryEntry, RawDeviceRecord, DEFAULT_MAX_ENTRIES};
use tracing::{debug, warn};

use crate::filter::is_selectable_within;
use crate::size::compute_display_size;

/// Upper bounds, in bytes, for text copied out of host-reported attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLimits {
    pub model: usize,
    pub path: usize,
    pub name: usize,
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self::from(&InventoryConfig::default())
    }
}

impl From<&InventoryConfig> for FieldLimits {
    fn from(config: &InventoryConfig) -> Self {
        Self {
            model: config.model_max_len,
            path: config.path_max_len,
            name: config.name_max_len,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InventoryBuilder {
    max_entries: usize,
    limits: FieldLimits,
}

impl Default for InventoryBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl InventoryBuilder {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            limits: FieldLimits::default(),
        }
    }

    pub fn from_config(config: &InventoryConfig) -> Self {
        Self::new(config.max_entries).with_limits(FieldLimits::from(config))
    }

    pub fn with_limits(mut self, limits: FieldLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Filter, size and index `records` in the order given.
    ///
    /// Once `max_entries` entries are held, further selectable records are
    /// only counted in [`Inventory::overflow`].
    pub fn build(&self, records: &[RawDeviceRecord]) -> Inventory {
        let mut entries: Vec<InventoryEntry> = Vec::with_capacity(records.len().min(self.max_entries));
        let mut overflow = 0;

        for record in records {
            if !is_selectable_within(record, &self.limits) {
                debug!(device = %record.short_name, "skipping unselectable device");
                continue;
            }
            if entries.len() >= self.max_entries {
                overflow += 1;
                continue;
            }

            entries.push(InventoryEntry {
                index: entries.len(),
                model: record
                    .model
                    .as_deref()
                    .map(|model| bounded(model, self.limits.model)),
                device_node: record.device_node.clone().unwrap_or_default(),
                short_name: bounded(&record.short_name, self.limits.name),
                size_gigabytes: compute_display_size(record),
                device_path: bounded(&record.device_path, self.limits.path),
                system_path: bounded(&record.system_path, self.limits.path),
                device_type: record
                    .device_type
                    .as_deref()
                    .map(|kind| bounded(kind, self.limits.name)),
            });
        }

        if overflow > 0 {
            warn!(
                max_entries = self.max_entries,
                dropped = overflow,
                "inventory capacity reached, later devices were not listed"
            );
        }

        Inventory {
            entries,
            max_entries: self.max_entries,
            overflow,
        }
    }
}

/// Copy of `value` cut to at most `max` bytes on a char boundary.
fn bounded(value: &str, max: usize) -> String {
    if value.len() <= max {
        return value.to_string();
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{disk, partition};

    fn nodes(inventory: &Inventory) -> Vec<&str> {
        inventory
            .entries
            .iter()
            .map(|entry| entry.device_node.as_str())
            .collect()
    }

    #[test]
    fn backup_menu_scenario() {
        let records = vec![
            RawDeviceRecord {
                model: Some("Acme".to_string()),
                ..disk("sda", 1_000_000_000)
            },
            partition("sda1"),
            RawDeviceRecord {
                model: Some("DVD-RW".to_string()),
                logical_block_size_bytes: Some(2048),
                ..disk("sr0", 0)
            },
        ];
        let inventory = InventoryBuilder::default().build(&records);

        assert_eq!(inventory.len(), 2);
        let sda = &inventory.entries[0];
        assert_eq!(sda.index, 0);
        assert_eq!(sda.model.as_deref(), Some("Acme"));
        assert_eq!(sda.size_gigabytes, Some(512));
        assert_eq!(sda.device_node, "/dev/sda");
        let sr0 = &inventory.entries[1];
        assert_eq!(sr0.index, 1);
        assert_eq!(sr0.model.as_deref(), Some("DVD-RW"));
        assert_eq!(sr0.size_gigabytes, None);
        assert_eq!(sr0.device_node, "/dev/sr0");
        assert!(!inventory.is_truncated());
    }

    #[test]
    fn indices_are_dense_in_discovery_order() {
        let records = vec![
            disk("sdc", 1),
            disk("loop0", 1),
            disk("sda", 1),
            partition("sda1"),
            disk("nvme0n1", 1),
        ];
        let inventory = InventoryBuilder::default().build(&records);
        assert_eq!(nodes(&inventory), ["/dev/sdc", "/dev/sda", "/dev/nvme0n1"]);
        let indices: Vec<usize> = inventory.entries.iter().map(|e| e.index).collect();
        assert_eq!(indices, [0, 1, 2]);
    }

    #[test]
    fn caps_at_max_entries() {
        let records: Vec<RawDeviceRecord> =
            (0..10).map(|n| disk(&format!("sd{n}"), 1)).collect();
        let inventory = InventoryBuilder::new(4).build(&records);
        assert_eq!(inventory.len(), 4);
        assert_eq!(nodes(&inventory), ["/dev/sd0", "/dev/sd1", "/dev/sd2", "/dev/sd3"]);
        assert_eq!(inventory.overflow, 6);
        assert!(inventory.is_truncated());
    }

    #[test]
    fn unselectable_records_do_not_count_against_capacity() {
        let records = vec![
            partition("sda1"),
            disk("loop0", 1),
            disk("sda", 1),
            partition("sda2"),
            disk("sdb", 1),
        ];
        let inventory = InventoryBuilder::new(2).build(&records);
        assert_eq!(nodes(&inventory), ["/dev/sda", "/dev/sdb"]);
        assert_eq!(inventory.overflow, 0);
    }

    #[test]
    fn default_cap_is_255() {
        let records: Vec<RawDeviceRecord> =
            (0..300).map(|n| disk(&format!("vd{n}"), 1)).collect();
        let inventory = InventoryBuilder::default().build(&records);
        assert_eq!(inventory.len(), 255);
        assert_eq!(inventory.max_entries, 255);
        assert_eq!(inventory.entries[254].index, 254);
        assert_eq!(inventory.entries[254].short_name, "vd254");
        assert_eq!(inventory.overflow, 45);
    }

    #[test]
    fn build_is_deterministic() {
        let records = vec![disk("sda", 7_814_037_168), partition("sda1"), disk("sr0", 0)];
        let builder = InventoryBuilder::default();
        assert_eq!(builder.build(&records), builder.build(&records));
    }

    #[test]
    fn empty_input_builds_empty_inventory() {
        let inventory = InventoryBuilder::default().build(&[]);
        assert!(inventory.is_empty());
        assert_eq!(inventory.overflow, 0);
    }

    #[test]
    fn long_fields_are_truncated_without_touching_neighbours() {
        let limits = FieldLimits {
            model: 8,
            path: 64,
            name: 4,
        };
        let records = vec![
            RawDeviceRecord {
                model: Some("Extremely Long Model Name".to_string()),
                device_path: "/devices/".repeat(20),
                ..disk("sda", 1)
            },
            disk("sdb", 1),
        ];
        let inventory = InventoryBuilder::default().with_limits(limits).build(&records);
        let first = &inventory.entries[0];
        assert_eq!(first.model.as_deref(), Some("Extremel"));
        assert_eq!(first.device_path.len(), 64);
        let second = &inventory.entries[1];
        assert_eq!(second.model.as_deref(), Some("Model sd"));
        assert_eq!(second.short_name, "sdb");
        assert_eq!(second.device_node, "/dev/sdb");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(bounded("Ünïcode", 2), "Ü");
        assert_eq!(bounded("Ünïcode", 1), "");
        assert_eq!(bounded("abc", 10), "abc");
    }

    #[test]
    fn every_selectable_record_is_listed_or_counted() {
        let limits = FieldLimits {
            path: 8,
            ..FieldLimits::default()
        };
        let records = vec![disk("nvme0n1", 1), disk("sda", 1), disk("sdb", 1)];
        let builder = InventoryBuilder::new(1).with_limits(limits);
        let selectable = records
            .iter()
            .filter(|record| is_selectable_within(record, &limits))
            .count();
        let inventory = builder.build(&records);
        assert_eq!(selectable, 2);
        assert_eq!(inventory.len() + inventory.overflow, selectable);
        assert_eq!(nodes(&inventory), ["/dev/sda"]);
    }

    #[test]
    fn oversized_device_node_is_skipped() {
        let limits = FieldLimits {
            model: 256,
            path: 12,
            name: 255,
        };
        let records = vec![
            RawDeviceRecord {
                device_node: Some("/dev/disk/by-id/very-long-identifier".to_string()),
                ..disk("sda", 1)
            },
            disk("sdb", 1),
        ];
        let inventory = InventoryBuilder::default().with_limits(limits).build(&records);
        assert_eq!(nodes(&inventory), ["/dev/sdb"]);
        assert_eq!(inventory.entries[0].index, 0);
    }

    #[test]
    fn from_config_applies_cap_and_limits() {
        let config = InventoryConfig {
            max_entries: 1,
            model_max_len: 3,
            ..InventoryConfig::default()
        };
        let inventory = InventoryBuilder::from_config(&config).build(&[disk("sda", 1), disk("sdb", 1)]);
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory.entries[0].model.as_deref(), Some("Mod"));
    }
}

use clonenux_core::RawDeviceRecord;

use crate::builder::FieldLimits;

pub const PARTITION_DEVICE_TYPE: &str = "partition";
pub const LOOP_PREFIX: &str = "loop";

/// Whether the record is a whole-disk target a user could pick, under the
/// default [`FieldLimits`].
pub fn is_selectable(record: &RawDeviceRecord) -> bool {
    is_selectable_within(record, &FieldLimits::default())
}

/// Whether the record is a whole-disk target a user could pick.
///
/// Partitions and loop devices are rejected, as is anything without a device
/// node to address it by, including a node longer than `limits.path`. Optical
/// drives and records with no reported device type pass.
pub fn is_selectable_within(record: &RawDeviceRecord, limits: &FieldLimits) -> bool {
    if record.device_type.as_deref() == Some(PARTITION_DEVICE_TYPE) {
        return false;
    }
    if record.short_name.starts_with(LOOP_PREFIX) {
        return false;
    }
    record
        .device_node
        .as_deref()
        .is_some_and(|node| !node.is_empty() && node.len() <= limits.path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{disk, partition};

    #[test]
    fn whole_disks_are_selectable() {
        assert!(is_selectable(&disk("sda", 1)));
        assert!(is_selectable(&disk("nvme0n1", 1)));
    }

    #[test]
    fn partitions_are_excluded() {
        assert!(!is_selectable(&partition("sda1")));
        assert!(!is_selectable(&partition("nvme0n1p2")));
    }

    #[test]
    fn partition_match_is_exact() {
        let mut record = disk("md0", 1);
        record.device_type = Some("partitions".to_string());
        assert!(is_selectable(&record));
    }

    #[test]
    fn loop_devices_are_excluded() {
        assert!(!is_selectable(&disk("loop0", 1)));
        assert!(!is_selectable(&disk("loop12", 1)));
    }

    #[test]
    fn absent_device_type_is_selectable() {
        let mut record = disk("sdb", 1);
        record.device_type = None;
        assert!(is_selectable(&record));
    }

    #[test]
    fn optical_drives_are_selectable() {
        assert!(is_selectable(&disk("sr0", 0)));
    }

    #[test]
    fn records_without_a_node_are_excluded() {
        let mut record = disk("sdc", 1);
        record.device_node = None;
        assert!(!is_selectable(&record));
        record.device_node = Some(String::new());
        assert!(!is_selectable(&record));
    }

    #[test]
    fn device_node_longer_than_path_limit_is_excluded() {
        let limits = FieldLimits {
            path: 8,
            ..FieldLimits::default()
        };
        let record = disk("nvme0n1", 1);
        assert!(is_selectable(&record));
        assert!(!is_selectable_within(&record, &limits));
        assert!(is_selectable_within(&disk("sda", 1), &limits));
    }
}

use clonenux_core::InventoryEntry;
use std::fmt;

pub const MODEL_PLACEHOLDER: &str = "Unknown";
pub const NOT_APPLICABLE: &str = "N/A";

/// One menu line per entry, e.g. `[0] Acme (512GB) /dev/sda`.
pub fn render(entries: &[InventoryEntry]) -> Vec<String> {
    entries.iter().map(|entry| DisplayLine(entry).to_string()).collect()
}

/// Formats an entry the way the selection menu shows it.
pub struct DisplayLine<'a>(pub &'a InventoryEntry);

impl fmt::Display for DisplayLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entry = self.0;
        let model = entry
            .model
            .as_deref()
            .map(str::trim)
            .filter(|model| !model.is_empty())
            .unwrap_or(MODEL_PLACEHOLDER);
        match entry.size_gigabytes {
            Some(gigabytes) => write!(
                f,
                "[{}] {} ({}GB) {}",
                entry.index, model, gigabytes, entry.device_node
            ),
            None => write!(
                f,
                "[{}] {} ({}) {}",
                entry.index, model, NOT_APPLICABLE, entry.device_node
            ),
        }
    }
}

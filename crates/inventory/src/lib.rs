//! Turns raw block-device records into a bounded, indexed inventory.

pub mod builder;
pub mod filter;
pub mod presenter;
pub mod scan;
pub mod size;

pub use builder::{FieldLimits, InventoryBuilder};
pub use filter::{is_selectable, is_selectable_within};
pub use presenter::render;
pub use scan::Scanner;
pub use size::compute_display_size;

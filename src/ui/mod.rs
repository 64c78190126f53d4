pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{header, info, section, state_label, success, warn};
pub use table::{entries_table, stats_table, EntryRow};
pub use theme::{theme, Theme};

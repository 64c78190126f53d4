use crate::journal::{JournalStats, MirrorEntry};
use crate::ui::Icons;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct EntryRow {
    #[tabled(rename = "ID")]
    pub id: i64,
    #[tabled(rename = "")]
    pub kind: &'static str,
    #[tabled(rename = "Path")]
    pub path: String,
    #[tabled(rename = "Size")]
    pub size: i64,
    #[tabled(rename = "Modified")]
    pub modified: String,
    #[tabled(rename = "State")]
    pub state: String,
    #[tabled(rename = "Note")]
    pub note: String,
}

impl From<&MirrorEntry> for EntryRow {
    fn from(entry: &MirrorEntry) -> Self {
        Self {
            id: entry.id,
            kind: if entry.is_folder { Icons::FOLDER } else { Icons::FILE },
            path: entry.path.clone(),
            size: entry.size,
            modified: entry.modified.format("%Y-%m-%d %H:%M:%S").to_string(),
            state: entry.state.to_string(),
            note: entry.note.clone().unwrap_or_default(),
        }
    }
}

pub fn entries_table(entries: &[MirrorEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }
    let rows: Vec<EntryRow> = entries.iter().map(EntryRow::from).collect();
    Table::new(&rows).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct StatRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

pub fn stats_table(stats: &JournalStats) -> String {
    let rows = vec![
        StatRow { metric: "Entries", value: stats.entries.to_string() },
        StatRow { metric: "Pending", value: stats.pending.to_string() },
        StatRow { metric: "Mirrored", value: stats.mirrored.to_string() },
        StatRow { metric: "Deleted", value: stats.deleted.to_string() },
        StatRow { metric: "Failed", value: stats.failed.to_string() },
        StatRow { metric: "Bytes", value: stats.bytes.to_string() },
    ];
    Table::new(&rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_entries_table_renders_rows() {
        let entry = MirrorEntry::new("docs/a.txt", 42, Utc.timestamp_opt(86_400, 0).unwrap());
        let table = entries_table(&[entry]);
        assert!(table.contains("docs/a.txt"));
        assert!(table.contains("1970-01-02 00:00:00"));
        assert!(table.contains("Pending"));
        assert!(entries_table(&[]).is_empty());
    }

    #[test]
    fn test_stats_table() {
        let stats = JournalStats { entries: 3, bytes: 10, ..JournalStats::default() };
        let table = stats_table(&stats);
        assert!(table.contains("Entries"));
        assert!(table.contains("10"));
    }
}

use crate::model::{CellKey, Interval, ScheduleEntry};
use tracing::debug;

/// A days × intervals display surface that cells can be written to and read from.
///
/// Implementations own a fixed set of cells; writing to a key that has no cell
/// is a miss, not an error.
pub trait GridView {
    /// Sets the text of the cell at `key`. Returns `false` when no such cell exists.
    fn set_cell(&mut self, key: &CellKey, content: &str) -> bool;

    fn cell(&self, key: &CellKey) -> Option<&str>;

    /// Empties every cell.
    fn clear(&mut self);

    /// Every cell key, row by row, each row in day order.
    fn keys(&self) -> Vec<CellKey>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridLayout {
    pub days: Vec<String>,
    pub intervals: Vec<Interval>,
}

impl GridLayout {
    pub fn new(days: Vec<String>, intervals: Vec<Interval>) -> Self {
        GridLayout { days, intervals }
    }

    pub fn find_day(&self, day: &str) -> Option<usize> {
        self.days.iter().position(|d| d == day)
    }

    /// Row whose identifier is exactly `interval`'s key.
    pub fn find_interval(&self, interval: &Interval) -> Option<usize> {
        self.intervals.iter().position(|i| i == interval)
    }

    pub fn key_at(&self, row: usize, col: usize) -> Option<CellKey> {
        let interval = self.intervals.get(row)?;
        let day = self.days.get(col)?;
        Some(CellKey::new(day.clone(), interval.clone()))
    }

    pub fn position_of(&self, key: &CellKey) -> Option<(usize, usize)> {
        let row = self.find_interval(&key.interval)?;
        let col = self.find_day(&key.day)?;
        Some((row, col))
    }
}

/// In-memory grid with one text cell per (interval, day) of its layout.
#[derive(Debug, Clone)]
pub struct ScheduleGrid {
    layout: GridLayout,
    cells: Vec<Vec<String>>,
}

impl ScheduleGrid {
    pub fn new(layout: GridLayout) -> Self {
        let cells = vec![vec![String::new(); layout.days.len()]; layout.intervals.len()];
        ScheduleGrid { layout, cells }
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn cell_at(&self, row: usize, col: usize) -> &str {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn filled_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|c| !c.trim().is_empty())
            .count()
    }
}

impl GridView for ScheduleGrid {
    fn set_cell(&mut self, key: &CellKey, content: &str) -> bool {
        match self.layout.position_of(key) {
            Some((row, col)) => {
                self.cells[row][col] = content.to_string();
                true
            }
            None => false,
        }
    }

    fn cell(&self, key: &CellKey) -> Option<&str> {
        let (row, col) = self.layout.position_of(key)?;
        Some(self.cells[row][col].as_str())
    }

    fn clear(&mut self) {
        for row in &mut self.cells {
            for cell in row.iter_mut() {
                cell.clear();
            }
        }
    }

    fn keys(&self) -> Vec<CellKey> {
        self.layout
            .intervals
            .iter()
            .flat_map(|interval| {
                self.layout
                    .days
                    .iter()
                    .map(move |day| CellKey::new(day.clone(), interval.clone()))
            })
            .collect()
    }
}

/// Clears the grid and writes each entry into its (day, interval) cell.
/// Entries without a matching cell are dropped. Returns how many were placed.
pub fn render<G: GridView + ?Sized>(grid: &mut G, entries: &[ScheduleEntry]) -> usize {
    grid.clear();
    let mut placed = 0;
    for entry in entries {
        let key = entry.cell_key();
        if grid.set_cell(&key, &entry.cell_text()) {
            placed += 1;
        } else {
            debug!(cell = %key, "no grid cell for entry, dropped");
        }
    }
    debug!(placed, total = entries.len(), "rendered schedule");
    placed
}

/// Rebuilds the entry list from the grid's current text. Empty cells yield nothing.
pub fn read_state<G: GridView + ?Sized>(grid: &G) -> Vec<ScheduleEntry> {
    grid.keys()
        .into_iter()
        .filter_map(|key| {
            let text = grid.cell(&key)?.trim();
            if text.is_empty() {
                return None;
            }
            let (subject, group) = split_cell_text(text);
            let (start, end) = key.interval.bounds();
            Some(ScheduleEntry {
                day: key.day,
                group,
                subject,
                start,
                end,
            })
        })
        .collect()
}

/// First non-empty line is the subject; every following line is folded into the group.
pub fn split_cell_text(text: &str) -> (String, String) {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let subject = lines.next().unwrap_or_default().to_string();
    let group = lines.collect::<Vec<_>>().join(" | ");
    (subject, group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::parse_delimited_text;

    fn layout() -> GridLayout {
        GridLayout::new(
            vec!["Mon".into(), "Tue".into()],
            vec![
                Interval::new("08:00", "09:00"),
                Interval::new("09:00", "10:00"),
            ],
        )
    }

    fn key(day: &str, start: &str, end: &str) -> CellKey {
        CellKey::new(day, Interval::new(start, end))
    }

    #[test]
    fn renders_and_reads_example_entry() {
        let mut grid = ScheduleGrid::new(layout());
        let entries = parse_delimited_text("Mon;9A;Math;08:00;09:00");
        assert_eq!(render(&mut grid, &entries), 1);
        assert_eq!(grid.cell(&key("Mon", "08:00", "09:00")), Some("Math\n9A"));
        assert_eq!(grid.cell_at(0, 0), "Math\n9A");
        assert_eq!(
            read_state(&grid),
            vec![ScheduleEntry::new("Mon", "9A", "Math", "08:00", "09:00")]
        );
    }

    #[test]
    fn render_is_idempotent() {
        let entries = parse_delimited_text(
            "Mon;9A;Math;08:00;09:00\nTue;7B;Art;09:00;10:00\nMon;9B;Bio;09:00;10:00",
        );
        let mut once = ScheduleGrid::new(layout());
        render(&mut once, &entries);
        let mut twice = ScheduleGrid::new(layout());
        render(&mut twice, &entries);
        render(&mut twice, &entries);
        assert_eq!(read_state(&once), read_state(&twice));
        for k in once.keys() {
            assert_eq!(once.cell(&k), twice.cell(&k));
        }
    }

    #[test]
    fn render_clears_previous_contents() {
        let mut grid = ScheduleGrid::new(layout());
        render(&mut grid, &parse_delimited_text("Tue;7B;Art;09:00;10:00"));
        render(&mut grid, &parse_delimited_text("Mon;9A;Math;08:00;09:00"));
        assert_eq!(grid.cell(&key("Tue", "09:00", "10:00")), Some(""));
        assert_eq!(grid.filled_count(), 1);
    }

    #[test]
    fn unknown_interval_or_day_is_dropped() {
        let mut grid = ScheduleGrid::new(layout());
        let entries = parse_delimited_text(
            "Mon;9A;Math;07:00;08:00\nSat;9A;Math;08:00;09:00\nTue;7B;Art;09:00;10:00",
        );
        assert_eq!(render(&mut grid, &entries), 1);
        assert_eq!(
            read_state(&grid),
            vec![ScheduleEntry::new("Tue", "7B", "Art", "09:00", "10:00")]
        );
    }

    #[test]
    fn duplicate_cell_last_write_wins() {
        let mut grid = ScheduleGrid::new(layout());
        let entries =
            parse_delimited_text("Mon;9A;Math;08:00;09:00\nMon;9B;Chem;08:00;09:00");
        assert_eq!(render(&mut grid, &entries), 2);
        assert_eq!(
            read_state(&grid),
            vec![ScheduleEntry::new("Mon", "9B", "Chem", "08:00", "09:00")]
        );
    }

    #[test]
    fn clearing_cell_removes_entry() {
        let mut grid = ScheduleGrid::new(layout());
        render(
            &mut grid,
            &parse_delimited_text("Mon;9A;Math;08:00;09:00\nTue;7B;Art;09:00;10:00"),
        );
        assert!(grid.set_cell(&key("Mon", "08:00", "09:00"), "  \n "));
        let state = read_state(&grid);
        assert_eq!(state.len(), 1);
        assert!(state.iter().all(|e| !(e.day == "Mon" && e.start == "08:00")));
    }

    #[test]
    fn reader_folds_extra_lines_into_group() {
        let mut grid = ScheduleGrid::new(layout());
        let k = key("Tue", "08:00", "09:00");
        grid.set_cell(&k, " Physics \n\n 8A \n 8B\n");
        assert_eq!(
            read_state(&grid),
            vec![ScheduleEntry::new("Tue", "8A | 8B", "Physics", "08:00", "09:00")]
        );
        grid.set_cell(&k, "Lunch");
        assert_eq!(
            read_state(&grid),
            vec![ScheduleEntry::new("Tue", "", "Lunch", "08:00", "09:00")]
        );
    }

    #[test]
    fn reader_walks_rows_then_days() {
        let mut grid = ScheduleGrid::new(layout());
        grid.set_cell(&key("Tue", "09:00", "10:00"), "D");
        grid.set_cell(&key("Mon", "09:00", "10:00"), "C");
        grid.set_cell(&key("Tue", "08:00", "09:00"), "B");
        grid.set_cell(&key("Mon", "08:00", "09:00"), "A");
        let subjects: Vec<String> = read_state(&grid).into_iter().map(|e| e.subject).collect();
        assert_eq!(subjects, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn set_cell_misses_outside_layout() {
        let mut grid = ScheduleGrid::new(layout());
        assert!(!grid.set_cell(&key("Sun", "08:00", "09:00"), "x"));
        assert_eq!(grid.cell(&key("Sun", "08:00", "09:00")), None);
        assert_eq!(grid.filled_count(), 0);
    }

    #[test]
    fn rows_match_only_on_exact_key() {
        let layout = GridLayout::new(
            vec!["Mon".into()],
            vec![
                Interval::from_key("08:00 - 09:00-extra"),
                Interval::from_key(" 09:00-10:00"),
            ],
        );
        let mut grid = ScheduleGrid::new(layout);
        let entries =
            parse_delimited_text("Mon;9A;Math;08:00;09:00
Mon;7B;Art;09:00;10:00");
        assert_eq!(render(&mut grid, &entries), 0);
        assert_eq!(grid.filled_count(), 0);

        let row = grid.layout().key_at(0, 0).unwrap();
        assert!(grid.set_cell(&row, "Math\n9A"));
        assert_eq!(
            read_state(&grid),
            vec![ScheduleEntry::new("Mon", "9A", "Math", "08:00", "09:00")]
        );
    }
}

use chrono::NaiveTime;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::usage::{CleanUsageRecord, Grid, SheetRow};

static CLOCK_TIME_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}:\d{2}$").unwrap());

const TIMESTAMP_HEADER: &str = "Marca temporal";
const LIBRARY_HEADER: &str = "Biblioteca";
const USER_ID_HEADER: &str = "Matrícula de cuenta del usuario";
const USER_TYPE_HEADER: &str = "Tipo de usuario";
const START_TIME_HEADER: &str = "Hora de inicio";
const END_TIME_HEADER: &str = "Hora de fin";
const PURPOSE_HEADER: &str = "Propósito de uso";
const STATION_HEADER: &str = "Número de equipo";

/// Turn a cell grid into header-keyed rows.
/// Short rows are padded with `None`, cells past the header are dropped.
pub fn rows_from_grid(grid: &Grid) -> Vec<SheetRow> {
    if grid.len() < 2 {
        return Vec::new();
    }

    let headers: Vec<String> = grid[0]
        .iter()
        .map(|cell| clean_header(cell.as_deref().unwrap_or_default()))
        .collect();

    grid[1..]
        .iter()
        .map(|cells| {
            headers
                .iter()
                .enumerate()
                .map(|(idx, header)| (header.clone(), cells.get(idx).cloned().flatten()))
                .collect()
        })
        .collect()
}

fn clean_header(header: &str) -> String {
    header.trim().replace('\n', " ")
}

/// Map form rows onto usage records and derive each session's duration
pub fn map_usage_rows(rows: &[SheetRow]) -> Vec<CleanUsageRecord> {
    rows.iter().map(map_usage_row).collect()
}

/// Convenience for `rows_from_grid` followed by `map_usage_rows`
pub fn map_grid(grid: &Grid) -> Vec<CleanUsageRecord> {
    map_usage_rows(&rows_from_grid(grid))
}

fn map_usage_row(row: &SheetRow) -> CleanUsageRecord {
    let field = |header: &str| row.get(header).cloned().flatten();

    let start_time = field(START_TIME_HEADER);
    let end_time = field(END_TIME_HEADER);
    let duration_minutes = session_duration(start_time.as_deref(), end_time.as_deref());

    CleanUsageRecord {
        timestamp: field(TIMESTAMP_HEADER),
        library: field(LIBRARY_HEADER),
        user_id: field(USER_ID_HEADER),
        user_type: field(USER_TYPE_HEADER),
        start_time,
        end_time,
        purpose: field(PURPOSE_HEADER),
        station_id: field(STATION_HEADER),
        duration_minutes,
    }
}

/// Whole minutes between two same-day "HH:MM" times.
/// Sessions that appear to end before they start yield `None`.
pub fn session_duration(start: Option<&str>, end: Option<&str>) -> Option<i64> {
    let start = parse_clock_time(start?)?;
    let end = parse_clock_time(end?)?;

    let minutes = (end - start).num_minutes();
    (minutes >= 0).then_some(minutes)
}

fn parse_clock_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    if !CLOCK_TIME_PATTERN.is_match(value) {
        return None;
    }
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    fn form_header() -> Vec<Option<String>> {
        [
            "Marca temporal",
            " Biblioteca ",
            "Matrícula de cuenta\ndel usuario",
            "Tipo de usuario",
            "Hora de inicio",
            "Hora de fin",
            "Propósito de uso",
            "Número de equipo",
        ]
        .into_iter()
        .map(cell)
        .collect()
    }

    #[test]
    fn test_duration() {
        assert_eq!(session_duration(Some("14:00"), Some("14:45")), Some(45));
        assert_eq!(session_duration(Some("08:05"), Some("10:00")), Some(115));
        assert_eq!(session_duration(Some("09:00"), Some("09:00")), Some(0));
    }

    #[test]
    fn test_duration_does_not_wrap_midnight() {
        assert_eq!(session_duration(Some("23:50"), Some("00:10")), None);
    }

    #[test]
    fn test_duration_requires_both_valid_times() {
        assert_eq!(session_duration(None, Some("10:00")), None);
        assert_eq!(session_duration(Some("10:00"), Some("")), None);
        assert_eq!(session_duration(Some("9:00"), Some("10:00")), None);
        assert_eq!(session_duration(Some("25:00"), Some("26:00")), None);
        assert_eq!(session_duration(Some("10:00:00"), Some("11:00")), None);
        assert_eq!(session_duration(Some(" 10:00 "), Some("10:30")), Some(30));
    }

    #[test]
    fn test_header_only_grid_is_empty() {
        let grid: Grid = vec![vec![cell("Biblioteca"), cell("Hora de inicio")]];
        assert!(map_grid(&grid).is_empty());
        assert!(map_grid(&Vec::new()).is_empty());
    }

    #[test]
    fn test_rows_are_padded_and_truncated() {
        let grid: Grid = vec![
            vec![cell("A"), cell("B")],
            vec![cell("1")],
            vec![cell("1"), cell("2"), cell("3")],
        ];
        let rows = rows_from_grid(&grid);

        assert_eq!(rows[0].get("B"), Some(&None));
        assert_eq!(rows[1].len(), 2);
        assert_eq!(rows[1].get("B"), Some(&cell("2")));
    }

    #[test]
    fn test_maps_known_headers() {
        let grid: Grid = vec![
            form_header(),
            vec![
                cell("2024-05-02 10:11:00"),
                cell("CEN"),
                cell("A0123"),
                cell("Alumno"),
                cell("14:00"),
                cell("14:45"),
                cell("Tarea"),
                cell("PC-07"),
            ],
        ];

        let records = map_grid(&grid);
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.library.as_deref(), Some("CEN"));
        assert_eq!(record.user_id.as_deref(), Some("A0123"));
        assert_eq!(record.station_id.as_deref(), Some("PC-07"));
        assert_eq!(record.duration_minutes, Some(45));
    }

    #[test]
    fn test_missing_headers_map_to_none() {
        let grid: Grid = vec![
            vec![cell("Biblioteca"), cell("Otra columna")],
            vec![cell("ICB"), cell("x")],
        ];

        let records = map_grid(&grid);
        assert_eq!(records[0].library.as_deref(), Some("ICB"));
        assert_eq!(records[0].purpose, None);
        assert_eq!(records[0].duration_minutes, None);
    }
}

//! Semantic role of a single schedule-table cell.
//!
//! Rules are tried in a fixed order and the first match wins. Text rules come
//! first; the position context (column hint, row start, the previous cell)
//! only settles cells that no text rule claims.

use std::sync::LazyLock;

use regex::Regex;

use super::cell::Column;
use crate::error::{Result, ScheduleError};
use crate::models::{View, Weekday};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellRole {
    DayMarker(Weekday),
    TimeMarker(u8),
    /// Subject with its bracketed type tag already prepended.
    LessonText(String),
    /// Teachers, ", "-joined.
    TeacherList(String),
    /// Groups, ", "-joined. Only produced for the teacher view.
    GroupList(String),
    RoomMarker(String),
    Empty,
}

/// Where a cell sits relative to its neighbours.
#[derive(Debug, Clone, Copy)]
pub struct CellContext<'a> {
    pub previous: Option<&'a str>,
    pub next: Option<&'a str>,
    pub column: Option<Column>,
    /// First cell of its `<tr>`.
    pub row_start: bool,
    pub view: View,
}

impl<'a> CellContext<'a> {
    #[cfg(test)]
    pub fn new(view: View) -> Self {
        Self {
            previous: None,
            next: None,
            column: None,
            row_start: false,
            view,
        }
    }

    /// A lesson name is expected here: subject column, start of a row, or right after the time.
    pub fn expects_subject(&self) -> bool {
        match self.column {
            Some(column) => column == Column::Subject,
            None => self.row_start || self.previous.is_some_and(is_time_text),
        }
    }

    /// The next cell of the row lists teachers, so this one names the lesson.
    pub fn precedes_people(&self) -> bool {
        self.next.is_some_and(|next| PEOPLE.is_match(next.trim()))
    }
}

/// (range, slot). Two ranges for slots 4 and 7 appear on the site.
const LESSON_TIMES: [(&str, u8); 10] = [
    ("08:00 - 09:35", 1),
    ("09:45 - 11:20", 2),
    ("11:30 - 13:05", 3),
    ("13:20 - 14:55", 4),
    ("13:20 - 16:40", 4),
    ("15:05 - 16:40", 5),
    ("16:50 - 18:25", 6),
    ("18:40 - 20:15", 7),
    ("18:40 - 20:25", 7),
    ("20:25 - 22:00", 8),
];

static TIME_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2})\s*[-–]\s*(\d{1,2}):(\d{2})$")
        .expect("invalid regex: time range")
});

const PERSON: &str =
    r"[А-ЯЁA-Z][а-яёa-z]+(?:-[А-ЯЁA-Z][а-яёa-z]+)?\s+[А-ЯЁA-Z]\.\s*(?:[А-ЯЁA-Z]\.)?";

static PEOPLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(?:{PERSON})(?:\n(?:{PERSON}))*$")).expect("invalid regex: people")
});

static GROUPS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\w+-\d{2}(?:-\w+)+\.?\s*)+$").expect("invalid regex: groups")
});

static ROOM_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^ауд\.?\s*(.+)$").expect("invalid regex: room prefix"));

static SPECIAL_VENUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:спортзал|спортивный зал|с/з|бассейн)$").expect("invalid regex: venue")
});

static BUILDING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[А-ЯЁA-Z]$").expect("invalid regex: building"));

static BUILDING_ROOM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[А-ЯЁA-Z]\d?[-\s]?\d{3}[а-яa-z]?$").expect("invalid regex: building room")
});

static BARE_ROOM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2,3}$").expect("invalid regex: bare room"));

static DUAL_ROOM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{3},\s*\d{3}$").expect("invalid regex: dual room"));

static CODE_ROOM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[а-яёa-z]{2}$").expect("invalid regex: code room"));

static WING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:корп\.|корпус|крыло)").expect("invalid regex: wing"));

/// Classify one cell.
///
/// Fails with `UnknownTimeRange` for a time cell whose slot cannot be resolved,
/// and with `SourceFormatChanged` for a day or time cell the page layout does
/// not explain.
pub fn classify(text: &str, context: &CellContext) -> Result<CellRole> {
    let text = text.trim();

    if let Some(day) = Weekday::from_russian(text) {
        return Ok(CellRole::DayMarker(day));
    }
    if context.column == Some(Column::Day) && !text.is_empty() {
        return Err(ScheduleError::SourceFormatChanged(format!(
            "unknown day heading '{}'",
            text
        )));
    }

    if is_time_text(text) {
        return lesson_number(text).map(CellRole::TimeMarker);
    }
    if context.column == Some(Column::Time) && !text.is_empty() {
        return Err(ScheduleError::SourceFormatChanged(format!(
            "unreadable lesson time '{}'",
            text
        )));
    }

    if text.is_empty() {
        return Ok(CellRole::Empty);
    }

    match context.column {
        Some(Column::Subject) => Ok(lesson_text(text)),
        Some(Column::Counterpart) => Ok(counterpart(text, context.view)),
        Some(Column::Room) => Ok(CellRole::RoomMarker(
            room(text).unwrap_or_else(|| join_lines(text)),
        )),
        _ => Ok(by_text(text, context)),
    }
}

/// Rules for cells that carry no column class.
fn by_text(text: &str, context: &CellContext) -> CellRole {
    if PEOPLE.is_match(text) {
        return CellRole::TeacherList(join_lines(text));
    }
    if text.contains('\n') {
        return lesson_text(text);
    }
    if context.view == View::Teacher && GROUPS.is_match(text) {
        return CellRole::GroupList(join_groups(text));
    }
    if context.expects_subject() {
        return lesson_text(text);
    }
    if let Some(room) = room(text) {
        return CellRole::RoomMarker(room);
    }
    if context.precedes_people() {
        return lesson_text(text);
    }
    CellRole::Empty
}

fn lesson_text(text: &str) -> CellRole {
    let (name, kind) = text.split_once('\n').unwrap_or((text, ""));
    CellRole::LessonText(subject(name, kind))
}

fn counterpart(text: &str, view: View) -> CellRole {
    match view {
        View::Group => CellRole::TeacherList(join_lines(text)),
        View::Teacher => CellRole::GroupList(join_groups(text)),
    }
}

pub fn is_time_text(text: &str) -> bool {
    TIME_RANGE.is_match(text.trim())
}

pub fn is_day_text(text: &str) -> bool {
    Weekday::from_russian(text).is_some()
}

/// Slot number of a lesson from its "HH:MM - HH:MM" range.
///
/// Exact range first, then the start time, then the start hour alone.
pub fn lesson_number(range: &str) -> Result<u8> {
    let unknown = || ScheduleError::UnknownTimeRange(range.trim().to_string());
    let caps = TIME_RANGE.captures(range.trim()).ok_or_else(unknown)?;

    let start_hour: u32 = caps[1].parse().map_err(|_| unknown())?;
    let start = format!("{:02}:{}", start_hour, &caps[2]);
    let end = format!("{:02}:{}", caps[3].parse::<u32>().map_err(|_| unknown())?, &caps[4]);
    let normalized = format!("{} - {}", start, end);

    if let Some(&(_, slot)) = LESSON_TIMES.iter().find(|(r, _)| *r == normalized) {
        return Ok(slot);
    }
    if let Some(&(_, slot)) = LESSON_TIMES.iter().find(|(r, _)| r.starts_with(&start)) {
        return Ok(slot);
    }
    LESSON_TIMES
        .iter()
        .find(|(r, _)| r[..2].parse::<u32>().ok() == Some(start_hour))
        .map(|&(_, slot)| slot)
        .ok_or_else(unknown)
}

/// "[Л] Математика" from the name line and the lesson type line.
pub fn subject(name: &str, kind: &str) -> String {
    let strip = |s: &str| {
        s.trim_matches(|c: char| c == '/' || c == '\\' || c.is_whitespace())
            .to_string()
    };
    let name = strip(name);
    let kind = strip(kind);

    match type_tag(&kind) {
        Some(tag) => format!("[{}] {}", tag, name),
        None => name,
    }
}

fn type_tag(kind: &str) -> Option<String> {
    let lower = kind.to_lowercase();
    if lower.is_empty() {
        None
    } else if lower.contains("практическ") {
        Some("ПЗ".to_string())
    } else if lower.contains("лекц") {
        Some("Л".to_string())
    } else if lower.contains("лаборатор") {
        Some("ЛАБ".to_string())
    } else {
        Some(kind.chars().take(5).collect::<String>().to_uppercase())
    }
}

fn room(text: &str) -> Option<String> {
    if let Some(caps) = ROOM_PREFIX.captures(text) {
        return Some(caps[1].trim().to_string());
    }
    let plain = [
        &*SPECIAL_VENUE,
        &*BUILDING,
        &*BUILDING_ROOM,
        &*BARE_ROOM,
        &*DUAL_ROOM,
        &*CODE_ROOM,
        &*WING,
    ];
    plain
        .iter()
        .any(|re| re.is_match(text))
        .then(|| text.to_string())
}

fn join_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// "О-20-ИВТ-1-по-Б. О-20-ИВТ-2-по-Б." -> "О-20-ИВТ-1-по-Б, О-20-ИВТ-2-по-Б"
///
/// Groups are split on periods and on line breaks.
pub fn join_groups(text: &str) -> String {
    text.split(['.', '\n'])
        .map(str::trim)
        .filter(|group| !group.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_ctx() -> CellContext<'static> {
        CellContext::new(View::Group)
    }

    #[test]
    fn test_lesson_number_exact_ranges() {
        let expected = [
            ("08:00 - 09:35", 1),
            ("09:45 - 11:20", 2),
            ("11:30 - 13:05", 3),
            ("13:20 - 14:55", 4),
            ("15:05 - 16:40", 5),
            ("16:50 - 18:25", 6),
            ("18:40 - 20:15", 7),
            ("18:40 - 20:25", 7),
            ("20:25 - 22:00", 8),
        ];
        for (range, slot) in expected {
            assert_eq!(lesson_number(range).unwrap(), slot, "{}", range);
        }
    }

    #[test]
    fn test_lesson_number_fallbacks() {
        // start time known, end time odd
        assert_eq!(lesson_number("09:45 - 11:30").unwrap(), 2);
        // only the hour matches
        assert_eq!(lesson_number("15:00 - 16:35").unwrap(), 5);
        assert_eq!(lesson_number("8:10 - 9:45").unwrap(), 1);
    }

    #[test]
    fn test_lesson_number_unknown() {
        let err = lesson_number("07:00 - 07:45").unwrap_err();
        assert!(matches!(err, ScheduleError::UnknownTimeRange(r) if r == "07:00 - 07:45"));
        assert!(classify("23:00 - 23:45", &group_ctx()).is_err());
    }

    #[test]
    fn test_day_marker() {
        assert_eq!(
            classify("Понедельник", &group_ctx()).unwrap(),
            CellRole::DayMarker(Weekday::Monday)
        );
        assert_eq!(
            classify("  Пятница ", &group_ctx()).unwrap(),
            CellRole::DayMarker(Weekday::Friday)
        );
    }

    #[test]
    fn test_unknown_day_heading_is_format_change() {
        let ctx = CellContext {
            column: Some(Column::Day),
            ..group_ctx()
        };
        let err = classify("Воскресенье", &ctx).unwrap_err();
        assert!(matches!(err, ScheduleError::SourceFormatChanged(_)));
    }

    #[test]
    fn test_time_marker() {
        assert_eq!(
            classify("11:30 - 13:05", &group_ctx()).unwrap(),
            CellRole::TimeMarker(3)
        );
    }

    #[test]
    fn test_lesson_text_type_tags() {
        let cases = [
            ("Математика\nлекция", "[Л] Математика"),
            ("Физика /\nпрактическое занятие", "[ПЗ] Физика"),
            ("Химия\nЛабораторное занятие", "[ЛАБ] Химия"),
            ("Экономика\nконсультация", "[КОНСУ] Экономика"),
        ];
        for (text, subject) in cases {
            assert_eq!(
                classify(text, &group_ctx()).unwrap(),
                CellRole::LessonText(subject.to_string())
            );
        }
    }

    #[test]
    fn test_teacher_list() {
        assert_eq!(
            classify("Иванов И.И.\nПетров-Водкин П. П.", &group_ctx()).unwrap(),
            CellRole::TeacherList("Иванов И.И., Петров-Водкин П. П.".to_string())
        );
        assert_eq!(
            classify("Трубаков Е.О.", &group_ctx()).unwrap(),
            CellRole::TeacherList("Трубаков Е.О.".to_string())
        );
    }

    #[test]
    fn test_room_rules() {
        let rooms = [
            ("ауд. 401", "401"),
            ("Спортзал", "Спортзал"),
            ("Б", "Б"),
            ("Б401", "Б401"),
            ("А1-207", "А1-207"),
            ("12", "12"),
            ("305", "305"),
            ("401, 403", "401, 403"),
            ("тк", "тк"),
            ("корп. 3 кафедра", "корп. 3 кафедра"),
        ];
        for (text, room) in rooms {
            assert_eq!(
                classify(text, &group_ctx()).unwrap(),
                CellRole::RoomMarker(room.to_string()),
                "{}",
                text
            );
        }
    }

    #[test]
    fn test_unclaimed_text_is_empty() {
        assert_eq!(classify("", &group_ctx()).unwrap(), CellRole::Empty);
        assert_eq!(classify("   ", &group_ctx()).unwrap(), CellRole::Empty);
        assert_eq!(classify("что-то", &group_ctx()).unwrap(), CellRole::Empty);
        assert_eq!(classify("1234", &group_ctx()).unwrap(), CellRole::Empty);
    }

    #[test]
    fn test_position_makes_single_line_subject() {
        let ctx = CellContext {
            previous: Some("08:00 - 09:35"),
            ..group_ctx()
        };
        assert_eq!(
            classify("Военная подготовка", &ctx).unwrap(),
            CellRole::LessonText("Военная подготовка".to_string())
        );

        let ctx = CellContext {
            row_start: true,
            ..group_ctx()
        };
        assert_eq!(
            classify("Физкультура", &ctx).unwrap(),
            CellRole::LessonText("Физкультура".to_string())
        );
    }

    #[test]
    fn test_column_hints() {
        let ctx = CellContext {
            column: Some(Column::Counterpart),
            ..group_ctx()
        };
        assert_eq!(
            classify("Вакансия", &ctx).unwrap(),
            CellRole::TeacherList("Вакансия".to_string())
        );

        let ctx = CellContext {
            column: Some(Column::Room),
            ..group_ctx()
        };
        assert_eq!(
            classify("Дистанционно", &ctx).unwrap(),
            CellRole::RoomMarker("Дистанционно".to_string())
        );
    }

    #[test]
    fn test_group_list_in_teacher_view() {
        let ctx = CellContext::new(View::Teacher);
        assert_eq!(
            classify("О-20-ИВТ-1-по-Б. О-20-ИВТ-2-по-Б.", &ctx).unwrap(),
            CellRole::GroupList("О-20-ИВТ-1-по-Б, О-20-ИВТ-2-по-Б".to_string())
        );
        // group view never reports groups
        assert_eq!(
            classify("О-20-ИВТ-1-по-Б.", &group_ctx()).unwrap(),
            CellRole::Empty
        );
    }

    #[test]
    fn test_join_groups() {
        assert_eq!(join_groups("О-20-ИВТ-1-по-Б."), "О-20-ИВТ-1-по-Б");
        assert_eq!(join_groups("А-21-ПИ-1. А-21-ПИ-2"), "А-21-ПИ-1, А-21-ПИ-2");
        assert_eq!(join_groups("А-21-ПИ-1.\nА-21-ПИ-2."), "А-21-ПИ-1, А-21-ПИ-2");
    }

    #[test]
    fn test_classify_is_deterministic() {
        let ctx = group_ctx();
        for text in ["Б401", "Иванов И.И.", "Математика\nлекция", "", "Вторник"] {
            assert_eq!(classify(text, &ctx).unwrap(), classify(text, &ctx).unwrap());
        }
    }

    #[test]
    fn test_long_afternoon_range_is_slot_four() {
        assert_eq!(lesson_number("13:20 - 16:40").unwrap(), 4);
        assert_eq!(
            classify("13:20 - 16:40", &group_ctx()).unwrap(),
            CellRole::TimeMarker(4)
        );
    }

    #[test]
    fn test_unreadable_time_column_is_format_change() {
        let ctx = CellContext {
            column: Some(Column::Time),
            ..group_ctx()
        };
        let err = classify("08.00 - 09.35", &ctx).unwrap_err();
        assert!(matches!(err, ScheduleError::SourceFormatChanged(t) if t.contains("08.00")));
        assert_eq!(classify("", &ctx).unwrap(), CellRole::Empty);
    }

    #[test]
    fn test_multi_line_counterpart_cells_follow_column() {
        let ctx = CellContext {
            column: Some(Column::Counterpart),
            ..group_ctx()
        };
        assert_eq!(
            classify("Иванов И.И.\nВакансия", &ctx).unwrap(),
            CellRole::TeacherList("Иванов И.И., Вакансия".to_string())
        );
        // two-letter surname is not a room code here
        assert_eq!(
            classify("Ли", &ctx).unwrap(),
            CellRole::TeacherList("Ли".to_string())
        );

        let ctx = CellContext {
            column: Some(Column::Counterpart),
            ..CellContext::new(View::Teacher)
        };
        assert_eq!(
            classify("О-20-ИВТ-1-по-Б.\nО-20-ИВТ-2-по-Б.", &ctx).unwrap(),
            CellRole::GroupList("О-20-ИВТ-1-по-Б, О-20-ИВТ-2-по-Б".to_string())
        );
    }

    #[test]
    fn test_multi_line_room_cell() {
        let ctx = CellContext {
            column: Some(Column::Room),
            ..group_ctx()
        };
        assert_eq!(
            classify("Б401\nБ403", &ctx).unwrap(),
            CellRole::RoomMarker("Б401, Б403".to_string())
        );
        assert_eq!(
            classify("ауд. 214", &ctx).unwrap(),
            CellRole::RoomMarker("214".to_string())
        );
    }

    #[test]
    fn test_subject_column_single_line() {
        let ctx = CellContext {
            column: Some(Column::Subject),
            ..group_ctx()
        };
        assert_eq!(
            classify("Физкультура", &ctx).unwrap(),
            CellRole::LessonText("Физкультура".to_string())
        );
    }

    #[test]
    fn test_cell_before_teachers_names_lesson() {
        let ctx = CellContext {
            next: Some("Иванов И.И."),
            ..group_ctx()
        };
        assert_eq!(
            classify("Иностранный язык", &ctx).unwrap(),
            CellRole::LessonText("Иностранный язык".to_string())
        );
        assert_eq!(classify("Иностранный язык", &group_ctx()).unwrap(), CellRole::Empty);
    }
}

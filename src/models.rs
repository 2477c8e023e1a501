use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::error::{Result, ScheduleError};

/// Lessons per day and parity; slot numbers run 1..=SLOT_COUNT.
pub const SLOT_COUNT: u8 = 8;

/// Placeholder used for every field of an empty slot.
pub const NONE_MARK: &str = "-";

pub const NO_PHOTO_URL: &str = "https://www.tu-bryansk.ru/local/templates/bstu/img/nophoto.svg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    pub const ALL: [Weekday; 6] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    /// Map a day heading as printed on the schedule page.
    pub fn from_russian(name: &str) -> Option<Self> {
        match name.trim() {
            "Понедельник" => Some(Weekday::Monday),
            "Вторник" => Some(Weekday::Tuesday),
            "Среда" => Some(Weekday::Wednesday),
            "Четверг" => Some(Weekday::Thursday),
            "Пятница" => Some(Weekday::Friday),
            "Суббота" => Some(Weekday::Saturday),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    Odd,
    Even,
}

/// Which side of the timetable is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Group,
    Teacher,
}

impl View {
    pub fn counterpart(self, text: String) -> Counterpart {
        match self {
            View::Group => Counterpart::Teacher(text),
            View::Teacher => Counterpart::Group(text),
        }
    }

    pub fn owner(self, name: String) -> Owner {
        match self {
            View::Group => Owner::Group(name),
            View::Teacher => Owner::Teacher(name),
        }
    }
}

/// The free-text field next to the room: teachers for a group, groups for a teacher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Counterpart {
    Teacher(String),
    Group(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Owner {
    Group(String),
    Teacher(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lesson {
    pub number: u8,
    pub subject: String,
    pub room: String,
    #[serde(flatten)]
    pub counterpart: Counterpart,
}

impl Lesson {
    pub fn none(number: u8, view: View) -> Self {
        Self {
            number,
            subject: NONE_MARK.to_string(),
            room: NONE_MARK.to_string(),
            counterpart: view.counterpart(NONE_MARK.to_string()),
        }
    }

    pub fn is_none(&self) -> bool {
        self.subject == NONE_MARK
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayTimetable {
    pub even: Vec<Lesson>,
    pub odd: Vec<Lesson>,
}

impl DayTimetable {
    pub fn empty(view: View) -> Self {
        let slots: Vec<Lesson> = (1..=SLOT_COUNT).map(|n| Lesson::none(n, view)).collect();
        Self {
            even: slots.clone(),
            odd: slots,
        }
    }

    #[cfg(test)]
    pub fn parity(&self, parity: Parity) -> &[Lesson] {
        match parity {
            Parity::Odd => &self.odd,
            Parity::Even => &self.even,
        }
    }

    pub(crate) fn set(&mut self, parity: Parity, lesson: Lesson) {
        let index = usize::from(lesson.number - 1);
        let slots = match parity {
            Parity::Odd => &mut self.odd,
            Parity::Even => &mut self.even,
        };
        slots[index] = lesson;
    }

    pub fn lesson_count(&self) -> usize {
        self.odd
            .iter()
            .chain(self.even.iter())
            .filter(|l| !l.is_none())
            .count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyTimetable {
    #[serde(flatten)]
    pub owner: Owner,
    pub last_updated: DateTime<Local>,
    #[serde(flatten)]
    pub days: BTreeMap<Weekday, DayTimetable>,
}

impl WeeklyTimetable {
    pub fn empty(owner: String, view: View) -> Self {
        Self {
            owner: view.owner(owner),
            last_updated: Local::now(),
            days: Weekday::ALL
                .iter()
                .map(|&day| (day, DayTimetable::empty(view)))
                .collect(),
        }
    }

    #[cfg(test)]
    pub fn day(&self, day: Weekday) -> &DayTimetable {
        // every weekday is inserted by `empty`
        &self.days[&day]
    }

    pub fn lesson_count(&self) -> usize {
        self.days.values().map(DayTimetable::lesson_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lesson_count() == 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TeacherProfile {
    pub name: String,
    pub initials: String,
    pub faculty: Option<String>,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub img_src: String,
    pub schedule: Option<WeeklyTimetable>,
}

impl TeacherProfile {
    /// A profile with nothing but the name; fails unless the name has exactly three parts.
    pub fn new(name: &str) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            initials: initials(name)?,
            faculty: None,
            department: None,
            phone: None,
            email: None,
            img_src: NO_PHOTO_URL.to_string(),
            schedule: None,
        })
    }
}

/// "Трубаков Евгений Олегович" -> "Трубаков Е. О."
pub fn initials(name: &str) -> Result<String> {
    let parts: Vec<&str> = name.split(' ').collect();
    let [last, first, patronymic] = parts[..] else {
        return Err(ScheduleError::InvalidName(name.to_string()));
    };

    let first_letter = |part: &str| part.chars().next();
    match (first_letter(first), first_letter(patronymic)) {
        (Some(f), Some(p)) if !last.is_empty() => Ok(format!("{} {}. {}.", last, f, p)),
        _ => Err(ScheduleError::InvalidName(name.to_string())),
    }
}

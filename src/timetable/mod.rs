mod builder;
mod cell;
mod classify;

pub use cell::cell_text;

use builder::Builder;
use cell::cells_from_html;
use tracing::instrument;

use crate::error::Result;
use crate::models::{View, WeeklyTimetable};

/// Student-group timetable: teachers sit next to the room.
#[instrument(skip(html), fields(bytes = html.len()))]
pub fn group_timetable(html: &str, group: &str) -> Result<WeeklyTimetable> {
    Builder::new(group, View::Group).build(&cells_from_html(html))
}

/// Teacher timetable: groups sit next to the room.
#[instrument(skip(html), fields(bytes = html.len()))]
pub fn teacher_timetable(html: &str, teacher: &str) -> Result<WeeklyTimetable> {
    Builder::new(teacher, View::Teacher).build(&cells_from_html(html))
}

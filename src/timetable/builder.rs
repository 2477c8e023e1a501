//! Single pass over the cell sequence of a schedule page.
//!
//! State is the current day, the current slot and the week mode of the row
//! being read, plus the lesson fields collected so far for that row.

use tracing::{debug, trace};

use super::cell::{Cell, Column};
use super::classify::{classify, is_day_text, is_time_text, CellContext, CellRole};
use crate::error::{Result, ScheduleError};
use crate::models::{Lesson, Parity, View, WeeklyTimetable, Weekday, NONE_MARK, SLOT_COUNT};

/// Which parity arrays a committed lesson goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekMode {
    /// Time cell without rowspan: the lesson runs every week.
    Both,
    /// Time cell with rowspan: first of the two stacked rows.
    Odd,
    /// Row without a time cell: second of the two stacked rows.
    Even,
}

#[derive(Debug, Default)]
struct Pending {
    subject: Option<String>,
    room: Option<String>,
    counterpart: Option<String>,
    /// Cells read since the subject without closing the row.
    spread: usize,
}

impl Pending {
    fn clear(&mut self) {
        *self = Pending::default();
    }
}

pub struct Builder {
    view: View,
    timetable: WeeklyTimetable,
    day: Option<Weekday>,
    slot: Option<u8>,
    mode: WeekMode,
    pending: Pending,
    row: Option<usize>,
    /// The row was a window or has already been committed.
    row_done: bool,
    /// An odd half was written and still waits for its even half.
    open_pair: Option<(Weekday, u8)>,
}

impl Builder {
    pub fn new(owner: &str, view: View) -> Self {
        Self {
            view,
            timetable: WeeklyTimetable::empty(owner.to_string(), view),
            day: None,
            slot: None,
            mode: WeekMode::Both,
            pending: Pending::default(),
            row: None,
            row_done: false,
            open_pair: None,
        }
    }

    /// Run the whole cell sequence. Any error aborts the build.
    pub fn build(mut self, cells: &[Cell]) -> Result<WeeklyTimetable> {
        for (i, cell) in cells.iter().enumerate() {
            let previous = i.checked_sub(1).map(|p| &cells[p]);
            let next = cells.get(i + 1);
            self.step(cell, previous, next)?;
        }
        self.finish_row()?;
        self.close_pair();

        debug!(
            view = ?self.view,
            cells = cells.len(),
            lessons = self.timetable.lesson_count(),
            "Timetable built"
        );
        Ok(self.timetable)
    }

    fn step(&mut self, cell: &Cell, previous: Option<&Cell>, next: Option<&Cell>) -> Result<()> {
        let row_start = self.row != Some(cell.row);
        let context = CellContext {
            previous: previous
                .filter(|p| p.row == cell.row)
                .map(|p| p.text.as_str()),
            next: next.filter(|n| n.row == cell.row).map(|n| n.text.as_str()),
            column: cell.column,
            row_start,
            view: self.view,
        };
        let role = classify(&cell.text, &context)?;

        if row_start {
            self.finish_row()?;
            self.row = Some(cell.row);
            self.row_done = false;
            if !matches!(role, CellRole::DayMarker(_) | CellRole::TimeMarker(_)) {
                self.mode = WeekMode::Even;
            }
        }

        trace!(row = cell.row, role = ?role, mode = ?self.mode, "Cell classified");

        match role {
            CellRole::DayMarker(day) => {
                self.close_pair();
                self.day = Some(day);
                self.slot = None;
                self.mode = WeekMode::Both;
                self.pending.clear();
                self.row_done = true;
            }
            CellRole::TimeMarker(slot) => {
                self.close_pair();
                self.slot = Some(slot);
                self.mode = if cell.rowspan {
                    WeekMode::Odd
                } else {
                    WeekMode::Both
                };
                self.pending.clear();
            }
            _ if self.row_done => {}
            CellRole::LessonText(subject) => {
                self.pending.subject = Some(subject);
                self.pending.spread = 0;
            }
            CellRole::TeacherList(names) | CellRole::GroupList(names) => {
                self.pending.counterpart = Some(names);
                self.advance(cell, next)?;
            }
            CellRole::RoomMarker(room) => {
                self.pending.room = Some(room);
                self.advance(cell, next)?;
            }
            CellRole::Empty => {
                if self.pending.subject.is_none() && context.expects_subject() {
                    // a window: nothing scheduled in this row
                    self.commit_none()?;
                } else if self.pending.subject.is_some() {
                    self.advance(cell, next)?;
                }
            }
        }
        Ok(())
    }

    /// Commit when this cell closes its row, otherwise keep collecting.
    fn advance(&mut self, cell: &Cell, next: Option<&Cell>) -> Result<()> {
        if self.pending.subject.is_some() && closes_row(cell, next) {
            self.commit()
        } else {
            self.pending.spread += 1;
            Ok(())
        }
    }

    fn finish_row(&mut self) -> Result<()> {
        if !self.row_done && self.pending.subject.is_some() {
            self.commit()?;
        }
        Ok(())
    }

    fn position(&self) -> Option<(Weekday, u8)> {
        Some((self.day?, self.slot?))
    }

    fn commit(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        self.row_done = true;

        let Some((day, slot)) = self.position() else {
            debug!("Ignoring lesson outside the day/time grid");
            return Ok(());
        };
        let Some(subject) = pending.subject else {
            return Ok(());
        };

        let lesson = Lesson {
            number: slot,
            subject,
            room: pending.room.unwrap_or_else(|| NONE_MARK.to_string()),
            counterpart: self
                .view
                .counterpart(pending.counterpart.unwrap_or_else(|| NONE_MARK.to_string())),
        };
        trace!(day = ?day, slot, spread = pending.spread, mode = ?self.mode, "Lesson committed");
        self.write(day, lesson)
    }

    fn commit_none(&mut self) -> Result<()> {
        self.pending.clear();
        self.row_done = true;
        match self.position() {
            Some((day, slot)) => self.write(day, Lesson::none(slot, self.view)),
            None => Ok(()),
        }
    }

    fn write(&mut self, day: Weekday, lesson: Lesson) -> Result<()> {
        if !(1..=SLOT_COUNT).contains(&lesson.number) {
            return Err(ScheduleError::SourceFormatChanged(format!(
                "lesson slot {} out of range",
                lesson.number
            )));
        }
        let slot = lesson.number;
        let target = self
            .timetable
            .days
            .get_mut(&day)
            .ok_or_else(|| ScheduleError::SourceFormatChanged(format!("no entry for {:?}", day)))?;

        match self.mode {
            WeekMode::Both => {
                target.set(Parity::Even, lesson.clone());
                target.set(Parity::Odd, lesson);
            }
            WeekMode::Odd => {
                target.set(Parity::Odd, lesson);
                self.open_pair = Some((day, slot));
            }
            WeekMode::Even => {
                target.set(Parity::Even, lesson);
                if self.open_pair == Some((day, slot)) {
                    self.open_pair = None;
                }
            }
        }
        Ok(())
    }

    /// An odd half never got its even row: the even week has no lesson there.
    fn close_pair(&mut self) {
        if let Some((day, slot)) = self.open_pair.take() {
            if let Some(target) = self.timetable.days.get_mut(&day) {
                target.set(Parity::Even, Lesson::none(slot, self.view));
            }
        }
    }
}

/// Row ends after this cell: table end, next row, a day/time marker, or an empty neighbour.
fn closes_row(cell: &Cell, next: Option<&Cell>) -> bool {
    match next {
        None => true,
        Some(n) => {
            n.row != cell.row
                || n.is_blank()
                || n.column == Some(Column::Time)
                || n.column == Some(Column::Day)
                || is_day_text(&n.text)
                || is_time_text(&n.text)
        }
    }
}

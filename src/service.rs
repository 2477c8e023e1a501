use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument};

use crate::directory::{parse_groups, parse_teacher_list, parse_teacher_profile};
use crate::error::{Result, ScheduleError};
use crate::fetch::PageFetcher;
use crate::models::{TeacherProfile, WeeklyTimetable};
use crate::period::{PeriodResolver, LANDING_PATH};
use crate::timetable::{group_timetable, teacher_timetable};

pub const SCHEDULE_PATH: &str = "/education/schedule/schedule.ajax.php";
pub const STAFF_PATH: &str = "/sveden/employees/";

const FULL_TIME_FORM: &str = "очная";
const TEACHER_FORM: &str = "teacher";

pub const NO_TEACHER_SCHEDULE: &str = "У преподавателя нет расписания";
pub const NO_GROUP_SCHEDULE: &str = "У группы нет расписания";

/// Every operation fetches fresh pages; only the period is remembered.
pub struct ScheduleService {
    fetcher: Arc<dyn PageFetcher>,
    period: PeriodResolver,
    base_url: String,
}

impl ScheduleService {
    pub fn new(fetcher: Arc<dyn PageFetcher>, base_url: &str, period_ttl: Duration) -> Self {
        Self {
            fetcher,
            period: PeriodResolver::new(period_ttl),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn period(&self) -> Result<String> {
        self.period.resolve(self.fetcher.as_ref()).await
    }

    /// Timetable of a student group; `NotFound` when it has no lessons.
    #[instrument(skip(self))]
    pub async fn schedule(&self, group: &str) -> Result<WeeklyTimetable> {
        if group.trim().is_empty() {
            return Err(ScheduleError::NotFound(NO_GROUP_SCHEDULE.to_string()));
        }
        let start = Instant::now();
        let period = self.period().await?;
        let html = self
            .fetcher
            .fetch(
                SCHEDULE_PATH,
                &[
                    ("namedata", "schedule"),
                    ("group", group),
                    ("period", period.as_str()),
                    ("form", FULL_TIME_FORM),
                ],
            )
            .await?;

        let timetable = group_timetable(&html, group)?;
        if timetable.is_empty() {
            debug!(group = %group, "Group has no lessons");
            return Err(ScheduleError::NotFound(NO_GROUP_SCHEDULE.to_string()));
        }

        info!(
            group = %group,
            lessons = timetable.lesson_count(),
            duration_ms = start.elapsed().as_millis(),
            "Group schedule built"
        );
        Ok(timetable)
    }

    #[instrument(skip(self))]
    pub async fn groups(&self, faculty: &str, year: &str) -> Result<Vec<String>> {
        // reject bad input before touching the network
        crate::directory::year_token(year)?;

        let period = self.period().await?;
        let html = self
            .fetcher
            .fetch(
                SCHEDULE_PATH,
                &[
                    ("namedata", "group"),
                    ("period", period.as_str()),
                    ("form", FULL_TIME_FORM),
                    ("faculty", faculty),
                ],
            )
            .await?;

        let groups = parse_groups(&html, year)?;
        info!(faculty = %faculty, year = %year, count = groups.len(), "Group list built");
        Ok(groups)
    }

    #[instrument(skip(self))]
    pub async fn teacher_list(&self) -> Result<Vec<String>> {
        let html = self
            .fetcher
            .fetch(LANDING_PATH, &[("form", TEACHER_FORM)])
            .await?;
        let teachers = parse_teacher_list(&html)?;
        info!(count = teachers.len(), "Teacher list built");
        Ok(teachers)
    }

    /// Staff-directory profile without a timetable.
    #[instrument(skip(self))]
    pub async fn teacher_info(&self, name: &str) -> Result<TeacherProfile> {
        // fails early on names that do not split into three parts
        TeacherProfile::new(name)?;

        let html = self.fetcher.fetch(STAFF_PATH, &[]).await?;
        parse_teacher_profile(&html, name, &self.base_url)
    }

    /// Teacher-view timetable; an empty timetable is a valid result here.
    #[instrument(skip(self))]
    pub async fn teacher_schedule(&self, teacher: &str) -> Result<WeeklyTimetable> {
        if teacher.trim().is_empty() {
            return Err(ScheduleError::NotFound(NO_TEACHER_SCHEDULE.to_string()));
        }
        let start = Instant::now();
        let period = self.period().await?;
        let site_name = teacher.replace(' ', "_");
        let html = self
            .fetcher
            .fetch(
                SCHEDULE_PATH,
                &[
                    ("namedata", "schedule"),
                    ("teacher", site_name.as_str()),
                    ("period", period.as_str()),
                    ("form", TEACHER_FORM),
                ],
            )
            .await?;

        let timetable = teacher_timetable(&html, teacher)?;
        info!(
            teacher = %teacher,
            lessons = timetable.lesson_count(),
            duration_ms = start.elapsed().as_millis(),
            "Teacher schedule built"
        );
        Ok(timetable)
    }

    /// Profile with the embedded timetable; `NotFound` when the teacher has no lessons.
    #[instrument(skip(self))]
    pub async fn teacher(&self, name: &str) -> Result<TeacherProfile> {
        TeacherProfile::new(name)?;

        let schedule = self.teacher_schedule(name).await?;
        if schedule.is_empty() {
            return Err(ScheduleError::NotFound(NO_TEACHER_SCHEDULE.to_string()));
        }

        let mut profile = self.teacher_info(name).await?;
        profile.schedule = Some(schedule);
        Ok(profile)
    }
}

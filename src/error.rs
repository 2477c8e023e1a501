use thiserror::Error;

/// Everything that can go wrong between fetching a page and returning a timetable.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The source site could not be reached or answered with an error status.
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// The page was fetched but its structure is not what the parser expects.
    #[error("Source format changed: {0}")]
    SourceFormatChanged(String),

    #[error("Unknown lesson time range: '{0}'")]
    UnknownTimeRange(String),

    #[error("Incorrect year string: '{0}'")]
    InvalidYear(String),

    /// The name does not split into surname, first name and patronymic.
    #[error("Cannot derive initials from '{0}'")]
    InvalidName(String),

    #[error("{0}")]
    NotFound(String),
}

impl ScheduleError {
    /// True for errors that mean the parser no longer understands the site.
    pub fn is_format_change(&self) -> bool {
        matches!(
            self,
            ScheduleError::SourceFormatChanged(_) | ScheduleError::UnknownTimeRange(_)
        )
    }
}

impl From<reqwest::Error> for ScheduleError {
    fn from(e: reqwest::Error) -> Self {
        ScheduleError::SourceUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScheduleError>;

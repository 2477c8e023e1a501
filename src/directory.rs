//! Group and teacher listings, and staff-directory profiles.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::{Result, ScheduleError};
use crate::models::TeacherProfile;
use crate::timetable::cell_text;

pub const DEFAULT_FACULTY: &str = "Факультет информационных технологий";

static OPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("option").expect("Invalid option selector"));
static TEACHER_OPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("select#teacher option").expect("Invalid teacher selector"));
static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("Invalid a selector"));
static FACULTY_FIELD: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.department-parent.field .val").expect("Invalid faculty selector")
});
static DEPARTMENT_FIELD: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.department.field .val").expect("Invalid department selector")
});
static PHONE_FIELD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.phone.field .val").expect("Invalid phone selector"));
static EMAIL_FIELD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.email.field .val").expect("Invalid email selector"));

/// Levels between the name link and its employee card.
const CARD_DEPTH: usize = 4;

/// Two-digit year token: "2020" -> "20". Non-digit input is rejected.
pub fn year_token(year: &str) -> Result<String> {
    let year = year.trim();
    if year.is_empty() || !year.chars().all(|c| c.is_ascii_digit()) {
        return Err(ScheduleError::InvalidYear(year.to_string()));
    }
    // ascii digits only, byte slicing is safe
    Ok(year[year.len().saturating_sub(2)..].to_string())
}

/// Group names of one matriculation year from a group listing page.
///
/// A group is kept when one of its '-'-separated parts is the year token and
/// it is a bachelor group (trailing "Б").
pub fn parse_groups(html: &str, year: &str) -> Result<Vec<String>> {
    let token = year_token(year)?;
    let document = Html::parse_document(html);

    let groups: Vec<String> = document
        .select(&OPTION)
        .filter(|option| {
            let value = option.value().attr("value").unwrap_or("");
            value.split('-').any(|part| part == token) && value.ends_with('Б')
        })
        .map(|option| option.text().collect::<String>().trim().to_string())
        .collect();

    debug!(year = %token, groups = groups.len(), "Parsed group listing");
    Ok(groups)
}

/// Teacher names from the teacher form of the landing page, placeholder option dropped.
pub fn parse_teacher_list(html: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let mut options = document.select(&TEACHER_OPTION);

    if options.next().is_none() {
        return Err(ScheduleError::SourceFormatChanged(
            "teacher selector is missing".to_string(),
        ));
    }

    Ok(options
        .map(|option| option.text().collect::<String>().trim().replace('_', " "))
        .collect())
}

/// Fill a profile from the staff directory; a missing name is not an error.
pub fn parse_teacher_profile(html: &str, name: &str, base_url: &str) -> Result<TeacherProfile> {
    let mut profile = TeacherProfile::new(name)?;
    let document = Html::parse_document(html);

    let Some(link) = document
        .select(&ANCHOR)
        .find(|a| a.text().collect::<String>().trim() == name)
    else {
        debug!(name = %name, "Teacher not found in staff directory");
        return Ok(profile);
    };

    let Some(card) = enclosing_card(link) else {
        debug!(name = %name, "Teacher link has no employee card around it");
        return Ok(profile);
    };

    let faculty = field(card, &FACULTY_FIELD);
    let department = field(card, &DEPARTMENT_FIELD);

    // cards with only one of the two carry no usable data
    if let (Some(faculty), Some(department)) = (faculty, department) {
        profile.faculty = Some(faculty);
        profile.department = Some(department);
        profile.phone = field(card, &PHONE_FIELD);
        profile.email = field(card, &EMAIL_FIELD);
        if let Some(photo) = card.value().attr("data-photo").filter(|p| !p.is_empty()) {
            profile.img_src = format!("{}{}", base_url.trim_end_matches('/'), photo);
        }
    }

    Ok(profile)
}

/// The nearest ancestor carrying a photo, else the one `CARD_DEPTH` levels up.
fn enclosing_card(link: ElementRef) -> Option<ElementRef> {
    let ancestors: Vec<ElementRef> = link
        .ancestors()
        .filter_map(ElementRef::wrap)
        .take(CARD_DEPTH)
        .collect();

    ancestors
        .iter()
        .find(|el| el.value().attr("data-photo").is_some())
        .or_else(|| ancestors.get(CARD_DEPTH - 1))
        .copied()
}

fn field(card: ElementRef, selector: &Selector) -> Option<String> {
    card.select(selector)
        .next()
        .map(|val| cell_text(val).trim().to_string())
        .filter(|text| !text.is_empty())
}

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::directory::DEFAULT_FACULTY;
use crate::error::ScheduleError;
use crate::models::{TeacherProfile, WeeklyTimetable};
use crate::service::ScheduleService;

/// Application state shared between handlers
pub struct AppState {
    pub service: ScheduleService,
}

/// Create the Axum router with all routes
pub fn create_router(service: ScheduleService) -> Router {
    let state = Arc::new(AppState { service });

    Router::new()
        .route("/api/v2/schedule", get(schedule))
        .route("/api/v2/groups", get(groups))
        .route("/api/v2/teacher_list", get(teacher_list))
        .route("/api/v2/teacher_info", get(teacher_info))
        .route("/api/v2/teacher", get(teacher))
        .route("/api/v2/teacher_schedule", get(teacher_schedule))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the web server on the given port
pub async fn start_server(router: Router, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        port = port,
        addr = %addr,
        "Web server started"
    );

    axum::serve(listener, router).await?;
    Ok(())
}

/// JSON error body in the `{"detail": ...}` form clients already expect.
#[derive(Debug)]
pub struct ApiError(ScheduleError);

impl From<ScheduleError> for ApiError {
    fn from(e: ScheduleError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ScheduleError::NotFound(_) => StatusCode::NOT_FOUND,
            ScheduleError::InvalidYear(_) | ScheduleError::InvalidName(_) => {
                StatusCode::BAD_REQUEST
            }
            ScheduleError::SourceUnavailable(_) => StatusCode::BAD_GATEWAY,
            ScheduleError::SourceFormatChanged(_) | ScheduleError::UnknownTimeRange(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if self.0.is_format_change() {
            error!(error = %self.0, "Source page no longer matches the parser - needs attention");
        } else if status.is_server_error() {
            error!(error = %self.0, status = %status, "Request failed");
        } else {
            debug!(error = %self.0, status = %status, "Request rejected");
        }

        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct GroupQuery {
    pub group: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GroupsQuery {
    pub faculty: Option<String>,
    pub year: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TeacherQuery {
    pub teacher: Option<String>,
}

/// Timetable of one group
async fn schedule(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GroupQuery>,
) -> ApiResult<WeeklyTimetable> {
    let group = query.group.unwrap_or_default();
    Ok(Json(state.service.schedule(&group).await?))
}

/// Groups of a faculty and matriculation year
async fn groups(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GroupsQuery>,
) -> ApiResult<Vec<String>> {
    let faculty = query.faculty.unwrap_or_else(|| DEFAULT_FACULTY.to_string());
    let year = query.year.unwrap_or_default();
    Ok(Json(state.service.groups(&faculty, &year).await?))
}

/// Names of all teachers
async fn teacher_list(State(state): State<Arc<AppState>>) -> ApiResult<Vec<String>> {
    Ok(Json(state.service.teacher_list().await?))
}

/// Staff-directory profile of a teacher
async fn teacher_info(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NameQuery>,
) -> ApiResult<TeacherProfile> {
    let name = query.name.unwrap_or_default();
    Ok(Json(state.service.teacher_info(&name).await?))
}

/// Profile and timetable of a teacher
async fn teacher(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NameQuery>,
) -> ApiResult<TeacherProfile> {
    let name = query.name.unwrap_or_default();
    Ok(Json(state.service.teacher(&name).await?))
}

/// Teacher-view timetable
async fn teacher_schedule(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TeacherQuery>,
) -> ApiResult<WeeklyTimetable> {
    let teacher = query.teacher.unwrap_or_default();
    Ok(Json(state.service.teacher_schedule(&teacher).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StaticPages;
    use crate::period::LANDING_PATH;
    use crate::service::tests::{service, LANDING, SCHEDULE};
    use crate::service::{NO_TEACHER_SCHEDULE, SCHEDULE_PATH, STAFF_PATH};

    fn state(pages: StaticPages) -> State<Arc<AppState>> {
        let (_, service) = service(pages);
        State(Arc::new(AppState { service }))
    }

    #[test]
    fn test_error_status_codes() {
        let cases = [
            (ScheduleError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ScheduleError::InvalidYear("x".into()), StatusCode::BAD_REQUEST),
            (ScheduleError::InvalidName("x".into()), StatusCode::BAD_REQUEST),
            (ScheduleError::SourceUnavailable("x".into()), StatusCode::BAD_GATEWAY),
            (
                ScheduleError::SourceFormatChanged("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ScheduleError::UnknownTimeRange("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn test_teacher_without_schedule_is_404() {
        let state = state(
            StaticPages::new()
                .with_page(LANDING_PATH, LANDING)
                .with_page(SCHEDULE_PATH, "<table></table>"),
        );
        let query = Query(NameQuery {
            name: Some("Трубаков Евгений Олегович".into()),
        });

        let err = teacher(state, query).await.unwrap_err();
        assert!(matches!(&err.0, ScheduleError::NotFound(m) if m == NO_TEACHER_SCHEDULE));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_schedule_handler_returns_timetable() {
        let state = state(
            StaticPages::new()
                .with_page(LANDING_PATH, LANDING)
                .with_page(SCHEDULE_PATH, SCHEDULE),
        );
        let query = Query(GroupQuery {
            group: Some("О-20-ИВТ-1-по-Б".into()),
        });

        let Json(tt) = schedule(state, query).await.unwrap();
        let json = serde_json::to_value(&tt).unwrap();
        assert_eq!(json["group"], "О-20-ИВТ-1-по-Б");
        assert_eq!(json["monday"]["odd"][0]["subject"], "[Л] Программирование");
    }

    #[tokio::test]
    async fn test_groups_handler_rejects_bad_year() {
        let state = state(StaticPages::new().with_page(LANDING_PATH, LANDING));
        let query = Query(GroupsQuery {
            faculty: None,
            year: Some("twenty".into()),
        });
        let err = groups(state, query).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_teacher_info_not_in_directory() {
        let state = state(StaticPages::new().with_page(STAFF_PATH, "<div></div>"));
        let query = Query(NameQuery {
            name: Some("Трубаков Евгений Олегович".into()),
        });
        let Json(profile) = teacher_info(state, query).await.unwrap();
        assert!(profile.faculty.is_none());
        assert!(profile.schedule.is_none());
    }

    #[test]
    fn test_router_builds() {
        let (_, service) = service(StaticPages::new());
        let _router = create_router(service);
    }
}

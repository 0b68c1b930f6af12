use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use actix_files::Files;
use actix_session::{storage::CookieSessionStore, Session, SessionMiddleware};
use actix_web::{
    cookie::Key, http::StatusCode, middleware, web, App, HttpResponse, HttpServer, ResponseError,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::backend::{Backend, HttpBackend};
use crate::config::Config;
use crate::eligibility::{self, FailurePolicy};
use crate::error::AppError;
use crate::form::RegistrationRequest;
use crate::notify::Notification;
use crate::roster::{reconcile, roster_csv, ApplicantId, Desk, EventId, Status, ViewQuery};
use crate::session::{self, Role, UserSession};

type DeskKey = (String, EventId);

struct DeskSlot {
    user_id: u64,
    touched: Instant,
    desk: Desk,
}

type DeskTable = HashMap<DeskKey, DeskSlot>;

pub struct AppState {
    pub backend: Arc<dyn Backend>,
    pub gate_failure: FailurePolicy,
    desk_idle: Duration,
    desks: Mutex<DeskTable>,
}

impl AppState {
    pub fn new(backend: Arc<dyn Backend>, gate_failure: FailurePolicy, desk_idle: Duration) -> Self {
        Self {
            backend,
            gate_failure,
            desk_idle,
            desks: Mutex::new(HashMap::new()),
        }
    }

    fn desks(&self) -> Result<MutexGuard<'_, DeskTable>, AppError> {
        self.desks
            .lock()
            .map_err(|_| AppError::Internal("desk table poisoned".to_string()))
    }

    /// Drops desks nobody touched within the idle window.
    fn evict_idle(&self, desks: &mut DeskTable, now: Instant) -> usize {
        let before = desks.len();
        desks.retain(|_, slot| now.saturating_duration_since(slot.touched) <= self.desk_idle);
        let evicted = before - desks.len();
        if evicted > 0 {
            info!(evicted, "idle roster desks evicted");
        }
        evicted
    }

    fn access<T>(
        &self,
        user: &UserSession,
        event_id: EventId,
        create: bool,
        f: impl FnOnce(&mut Desk) -> T,
    ) -> Result<T, AppError> {
        let now = Instant::now();
        let mut desks = self.desks()?;
        self.evict_idle(&mut desks, now);

        let key = (user.desk_id.clone(), event_id);
        let slot = if create {
            desks.entry(key).or_insert_with(|| DeskSlot {
                user_id: user.user_id,
                touched: now,
                desk: Desk::new(),
            })
        } else {
            desks.get_mut(&key).ok_or_else(|| {
                AppError::NotFound(format!("Load the roster for event {event_id} first"))
            })?
        };
        slot.touched = now;
        Ok(f(&mut slot.desk))
    }

    /// Runs `f` on the user's desk for `event_id`, which must have been loaded.
    fn with_desk<T>(
        &self,
        user: &UserSession,
        event_id: EventId,
        f: impl FnOnce(&mut Desk) -> T,
    ) -> Result<T, AppError> {
        self.access(user, event_id, false, f)
    }

    fn with_desk_or_default<T>(
        &self,
        user: &UserSession,
        event_id: EventId,
        f: impl FnOnce(&mut Desk) -> T,
    ) -> Result<T, AppError> {
        self.access(user, event_id, true, f)
    }

    fn drop_desks(&self, desk_id: &str) -> Result<usize, AppError> {
        let mut desks = self.desks()?;
        let before = desks.len();
        desks.retain(|(owner, _), _| owner != desk_id);
        Ok(before - desks.len())
    }

    /// A fresh sign-in replaces the user's earlier sessions and their desks.
    fn retire_earlier_sessions(&self, user: &UserSession) -> Result<usize, AppError> {
        let mut desks = self.desks()?;
        let before = desks.len();
        desks.retain(|(owner, _), slot| slot.user_id != user.user_id || *owner == user.desk_id);
        Ok(before - desks.len())
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Deserialize)]
pub struct StatusChange {
    status: Status,
}

#[derive(Deserialize, Default)]
pub struct SaveRequest {
    #[serde(default)]
    force: bool,
}

fn respond(note: Notification, on_error: StatusCode) -> HttpResponse {
    let body = serde_json::json!({"success": !note.is_error(), "notification": note});
    if note.is_error() {
        HttpResponse::build(on_error).json(body)
    } else {
        HttpResponse::Ok().json(body)
    }
}

fn student(session: &Session) -> Result<UserSession, AppError> {
    let user = session::current(session)?;
    user.require_role(|r| r == Role::Student)?;
    Ok(user)
}

fn reviewer(session: &Session) -> Result<UserSession, AppError> {
    let user = session::current(session)?;
    user.require_role(|r| r.reviews_applicants())?;
    Ok(user)
}

// Sign-in: the backend authenticates, the session cookie carries the result
async fn login(
    req: web::Json<LoginRequest>,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let resp = state.backend.login(&req.username, &req.password).await?;
    let role: Role = resp.role.parse().map_err(AppError::Decode)?;
    let user = UserSession::new(resp.userid, resp.name, resp.username, role, resp.jwt);

    session::sign_in(&session, &user)?;
    let retired = state.retire_earlier_sessions(&user)?;
    info!(user_id = user.user_id, %role, retired, "signed in");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "user": {"user_id": user.user_id, "name": user.name, "username": user.username, "role": user.role},
    })))
}

async fn logout(session: Session, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    if let Some(user) = session::sign_out(&session) {
        let dropped = state.drop_desks(&user.desk_id)?;
        info!(user_id = user.user_id, dropped, "signed out");
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
}

async fn session_info(session: Session) -> Result<HttpResponse, AppError> {
    let user = session::current(&session)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "user_id": user.user_id,
        "name": user.name,
        "username": user.username,
        "role": user.role,
    })))
}

async fn eligibility_gate(
    event_id: web::Path<EventId>,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = student(&session)?;
    let gate = eligibility::check_eligibility(
        state.backend.as_ref(),
        &user,
        event_id.into_inner(),
        state.gate_failure,
    )
    .await;
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true, "gate": gate})))
}

async fn register(
    event_id: web::Path<EventId>,
    form: web::Json<RegistrationRequest>,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = student(&session)?;
    let note = eligibility::register(
        state.backend.as_ref(),
        &user,
        event_id.into_inner(),
        &form,
        state.gate_failure,
    )
    .await?;
    Ok(respond(note, StatusCode::BAD_REQUEST))
}

async fn managed_events(
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = reviewer(&session)?;
    let events = state.backend.managed_events(&user).await?;
    Ok(HttpResponse::Ok().json(events))
}

async fn load_roster(
    event_id: web::Path<EventId>,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = reviewer(&session)?;
    let event_id = event_id.into_inner();

    // the desk exists from the first attempt on, empty if that attempt fails
    state.with_desk_or_default(&user, event_id, |_| ())?;

    let (note, on_error) = match state.backend.event_roster(&user, event_id).await {
        Ok(snapshot) => (
            state.with_desk_or_default(&user, event_id, |desk| desk.load(snapshot))?,
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
        Err(e) => {
            warn!(event_id, error = %e, "roster load failed, keeping current roster");
            (
                Notification::error(format!("Failed to load the roster: {e}")),
                e.status_code(),
            )
        }
    };
    Ok(respond(note, on_error))
}

async fn roster_view(
    event_id: web::Path<EventId>,
    query: web::Query<ViewQuery>,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = reviewer(&session)?;
    state.with_desk(&user, event_id.into_inner(), |desk| {
        HttpResponse::Ok().json(desk.view(query.view, &query.search))
    })
}

async fn set_status(
    path: web::Path<(EventId, u64)>,
    change: web::Json<StatusChange>,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = reviewer(&session)?;
    let (event_id, applicant_id) = path.into_inner();
    let note = state.with_desk(&user, event_id, |desk| {
        desk.set_status(ApplicantId(applicant_id), change.status)
    })?;
    Ok(respond(note, StatusCode::NOT_FOUND))
}

async fn toggle_selection(
    path: web::Path<(EventId, u64)>,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = reviewer(&session)?;
    let (event_id, applicant_id) = path.into_inner();
    let selected = state.with_desk(&user, event_id, |desk| desk.toggle(ApplicantId(applicant_id)))??;
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true, "selected": selected})))
}

async fn select_all(
    event_id: web::Path<EventId>,
    query: web::Query<ViewQuery>,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = reviewer(&session)?;
    let count = state.with_desk(&user, event_id.into_inner(), |desk| {
        desk.select_all(query.view, &query.search)
    })?;
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true, "selected": count})))
}

async fn clear_selection(
    event_id: web::Path<EventId>,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = reviewer(&session)?;
    state.with_desk(&user, event_id.into_inner(), |desk| desk.clear_selection())?;
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
}

async fn bulk_status(
    event_id: web::Path<EventId>,
    change: web::Json<StatusChange>,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = reviewer(&session)?;
    let note = state.with_desk(&user, event_id.into_inner(), |desk| {
        desk.set_status_bulk(change.status)
    })?;
    Ok(respond(note, StatusCode::BAD_REQUEST))
}

// The desk lock is released while the backend is called
async fn save_all(
    event_id: web::Path<EventId>,
    body: Option<web::Json<SaveRequest>>,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = reviewer(&session)?;
    let event_id = event_id.into_inner();
    let force = body.map(|b| b.force).unwrap_or(false);

    let pending = state.with_desk(&user, event_id, |desk| desk.prepare_save())?;
    let outcome = reconcile::push(state.backend.as_ref(), &user, event_id, &pending, force).await;
    let note = state.with_desk(&user, event_id, |desk| desk.finish_save(&pending, &outcome))?;

    match outcome {
        Ok(()) => Ok(respond(note, StatusCode::OK)),
        Err(e) => {
            warn!(event_id, error = %e, "roster save failed, local statuses kept");
            let mut body = serde_json::json!({"success": false, "notification": note});
            if let AppError::Conflict { ids } = &e {
                body["conflicts"] = serde_json::json!(ids);
            }
            Ok(HttpResponse::build(e.status_code()).json(body))
        }
    }
}

async fn export_csv(
    event_id: web::Path<EventId>,
    session: Session,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = reviewer(&session)?;
    let event_id = event_id.into_inner();
    let csv = state.with_desk(&user, event_id, |desk| roster_csv(&desk.roster))??;

    Ok(HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"event-{event_id}-roster.csv\""),
        ))
        .body(csv))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/login", web::post().to(login))
        .route("/api/logout", web::post().to(logout))
        .route("/api/session", web::get().to(session_info))
        .route("/api/events/{event_id}/eligibility", web::get().to(eligibility_gate))
        .route("/api/events/{event_id}/register", web::post().to(register))
        .route("/api/manager/events", web::get().to(managed_events))
        .service(
            web::scope("/api/manager/events/{event_id}")
                .route("/roster/load", web::post().to(load_roster))
                .route("/roster", web::get().to(roster_view))
                .route("/applicants/{applicant_id}/status", web::post().to(set_status))
                .route("/selection/toggle/{applicant_id}", web::post().to(toggle_selection))
                .route("/selection/select-all", web::post().to(select_all))
                .route("/selection", web::delete().to(clear_selection))
                .route("/bulk", web::post().to(bulk_status))
                .route("/save", web::post().to(save_all))
                .route("/export.csv", web::get().to(export_csv)),
        );
}

pub async fn start_server(config: Config) -> anyhow::Result<()> {
    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(&config)?);
    let app_state = web::Data::new(AppState::new(
        backend,
        config.gate_failure,
        config.desk_idle,
    ));

    let key = match &config.session_key {
        Some(bytes) => Key::from(bytes.as_slice()),
        None => Key::generate(),
    };
    let static_dir = config.static_dir.clone();
    let cookie_secure = config.cookie_secure;

    info!(port = config.port, backend = %config.backend_url, "starting event desk");

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), key.clone())
                    .cookie_secure(cookie_secure)
                    .build(),
            )
            .wrap(middleware::Logger::default())
            .service(Files::new("/static", static_dir.clone()))
            .configure(routes)
    })
    .bind(("0.0.0.0", config.port))?
    .run()
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeBackend;
    use crate::roster::desk::tests::event;
    use crate::roster::list::tests::applicant;
    use crate::roster::{ManagedEvent, RosterSnapshot};
    use actix_web::test;
    use serde_json::{json, Value};

    fn snapshot(statuses: &[(u64, Status)]) -> RosterSnapshot {
        RosterSnapshot {
            event: event(7, "Spring Fair"),
            applicants: statuses
                .iter()
                .map(|(id, status)| applicant(*id, &format!("Student {id}"), *status))
                .collect(),
        }
    }

    fn backend() -> FakeBackend {
        FakeBackend::new()
            .with_user("alice", "pw", 11, "STUDENT")
            .with_user("morgan", "pw", 21, "MANAGER")
    }

    fn state(backend: &Arc<FakeBackend>, policy: FailurePolicy) -> web::Data<AppState> {
        let shared: Arc<dyn Backend> = backend.clone();
        web::Data::new(AppState::new(shared, policy, Duration::from_secs(3600)))
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data($state.clone())
                    .wrap(
                        SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
                            .cookie_secure(false)
                            .build(),
                    )
                    .configure(routes),
            )
            .await
        };
    }

    macro_rules! sign_in {
        ($app:expr, $user:expr) => {{
            let req = test::TestRequest::post()
                .uri("/api/login")
                .set_json(json!({"username": $user, "password": "pw"}))
                .to_request();
            let resp = test::call_service(&$app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
            resp.response()
                .cookies()
                .next()
                .expect("session cookie")
                .into_owned()
        }};
    }

    #[actix_web::test]
    async fn eligibility_needs_a_session() {
        let backend = Arc::new(backend().with_facts(100, false));
        let app = app!(state(&backend, FailurePolicy::Closed));

        let req = test::TestRequest::get()
            .uri("/api/events/7/eligibility")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn eligibility_reports_the_gate_view() {
        let backend = Arc::new(backend().with_facts(80, false));
        let app = app!(state(&backend, FailurePolicy::Closed));
        let cookie = sign_in!(app, "alice");

        let req = test::TestRequest::get()
            .uri("/api/events/7/eligibility")
            .cookie(cookie)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["gate"], json!({"view": "complete_profile", "percent": 80}));
    }

    #[actix_web::test]
    async fn student_registers_once_the_gate_is_open() {
        let backend = Arc::new(backend().with_facts(100, false));
        let app = app!(state(&backend, FailurePolicy::Closed));
        let cookie = sign_in!(app, "alice");

        let req = test::TestRequest::post()
            .uri("/api/events/7/register")
            .cookie(cookie)
            .set_json(json!({
                "motivation": "Happy to help",
                "availability": ["Saturday"],
                "has_bike": true,
                "transport_medium": "Bike",
                "accepts_terms": true,
                "accepts_code_of_conduct": true
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let sent = backend.registrations();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].userid, "11");
        assert_eq!(sent[0].have_bike, "Yes");
    }

    #[actix_web::test]
    async fn students_cannot_reach_the_approval_desk() {
        let backend = Arc::new(backend().with_roster(snapshot(&[(1, Status::Pending)])));
        let app = app!(state(&backend, FailurePolicy::Closed));
        let cookie = sign_in!(app, "alice");

        let req = test::TestRequest::post()
            .uri("/api/manager/events/7/roster/load")
            .cookie(cookie)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn manager_bulk_approves_and_saves() {
        let backend = Arc::new(
            backend().with_roster(snapshot(&[(1, Status::Pending), (2, Status::Pending)])),
        );
        let app = app!(state(&backend, FailurePolicy::Closed));
        let cookie = sign_in!(app, "morgan");

        let req = test::TestRequest::post()
            .uri("/api/manager/events/7/roster/load")
            .cookie(cookie.clone())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/api/manager/events/7/selection/toggle/1")
            .cookie(cookie.clone())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/api/manager/events/7/bulk")
            .cookie(cookie.clone())
            .set_json(json!({"status": "approved"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        // selection was cleared, so a second bulk action has nothing to act on
        let req = test::TestRequest::post()
            .uri("/api/manager/events/7/bulk")
            .cookie(cookie.clone())
            .set_json(json!({"status": "rejected"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["notification"]["level"], "error");

        let req = test::TestRequest::get()
            .uri("/api/manager/events/7/roster?view=approved")
            .cookie(cookie.clone())
            .to_request();
        let view: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(view["applicants"].as_array().unwrap().len(), 1);
        assert_eq!(view["applicants"][0]["id"], 1);
        assert_eq!(view["counts"]["approved"], 1);
        assert_eq!(view["dirty"], json!([1]));
        assert_eq!(view["selection"], json!([]));

        let req = test::TestRequest::post()
            .uri("/api/manager/events/7/save")
            .cookie(cookie.clone())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let saved = backend.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(
            serde_json::to_value(&saved[0].1).unwrap(),
            json!([{"id": 1, "status": "APPROVED"}, {"id": 2, "status": "PENDING"}])
        );

        let req = test::TestRequest::get()
            .uri("/api/manager/events/7/roster")
            .cookie(cookie)
            .to_request();
        let view: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(view["dirty"], json!([]));
    }

    #[actix_web::test]
    async fn concurrent_edit_blocks_save_until_forced() {
        let backend = Arc::new(backend().with_roster(snapshot(&[(1, Status::Pending)])));
        let app = app!(state(&backend, FailurePolicy::Closed));
        let cookie = sign_in!(app, "morgan");

        let req = test::TestRequest::post()
            .uri("/api/manager/events/7/roster/load")
            .cookie(cookie.clone())
            .to_request();
        test::call_service(&app, req).await;

        backend.set_roster(snapshot(&[(1, Status::Rejected)]));

        let req = test::TestRequest::post()
            .uri("/api/manager/events/7/applicants/1/status")
            .cookie(cookie.clone())
            .set_json(json!({"status": "APPROVED"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/api/manager/events/7/save")
            .cookie(cookie.clone())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["conflicts"], json!([1]));
        assert!(backend.saved().is_empty());

        let req = test::TestRequest::post()
            .uri("/api/manager/events/7/save")
            .cookie(cookie)
            .set_json(json!({"force": true}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        assert_eq!(backend.saved().len(), 1);
    }

    #[actix_web::test]
    async fn desk_ops_need_a_loaded_roster() {
        let backend = Arc::new(backend());
        let app = app!(state(&backend, FailurePolicy::Closed));
        let cookie = sign_in!(app, "morgan");

        let req = test::TestRequest::get()
            .uri("/api/manager/events/7/roster")
            .cookie(cookie)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn failed_load_notifies_and_leaves_an_empty_roster() {
        let backend = Arc::new(backend());
        let app = app!(state(&backend, FailurePolicy::Closed));
        let cookie = sign_in!(app, "morgan");

        let req = test::TestRequest::post()
            .uri("/api/manager/events/7/roster/load")
            .cookie(cookie.clone())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["notification"]["level"], "error");

        let req = test::TestRequest::get()
            .uri("/api/manager/events/7/roster")
            .cookie(cookie)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let view: Value = test::read_body_json(resp).await;
        assert_eq!(view["applicants"], json!([]));
        assert_eq!(view["counts"]["total"], 0);
    }

    #[actix_web::test]
    async fn signing_in_again_replaces_the_earlier_desk() {
        let backend = Arc::new(backend().with_roster(snapshot(&[(1, Status::Pending)])));
        let app_state = state(&backend, FailurePolicy::Closed);
        let app = app!(app_state);

        for _ in 0..5 {
            let cookie = sign_in!(app, "morgan");
            let req = test::TestRequest::post()
                .uri("/api/manager/events/7/roster/load")
                .cookie(cookie)
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        }
        assert_eq!(app_state.desks().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn idle_desks_are_evicted() {
        let backend = Arc::new(backend().with_roster(snapshot(&[(1, Status::Pending)])));
        let app_state = state(&backend, FailurePolicy::Closed);
        let app = app!(app_state);
        let cookie = sign_in!(app, "morgan");

        let req = test::TestRequest::post()
            .uri("/api/manager/events/7/roster/load")
            .cookie(cookie)
            .to_request();
        test::call_service(&app, req).await;

        let mut desks = app_state.desks().unwrap();
        assert_eq!(app_state.evict_idle(&mut desks, Instant::now()), 0);
        let later = Instant::now() + Duration::from_secs(3601);
        assert_eq!(app_state.evict_idle(&mut desks, later), 1);
        assert!(desks.is_empty());
    }

    #[actix_web::test]
    async fn manager_lists_their_events() {
        let backend = Arc::new(backend().with_managed(vec![ManagedEvent {
            event_id: 7,
            title: "Spring Fair".to_string(),
            location: "Main Hall".to_string(),
            start_at: None,
            required_volunteer: "10".to_string(),
            total_students: 3,
            pending_count: 1,
            approved_count: 2,
            rejected_count: 0,
        }]));
        let app = app!(state(&backend, FailurePolicy::Closed));

        let student = sign_in!(app, "alice");
        let req = test::TestRequest::get()
            .uri("/api/manager/events")
            .cookie(student)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let cookie = sign_in!(app, "morgan");
        let req = test::TestRequest::get()
            .uri("/api/manager/events")
            .cookie(cookie)
            .to_request();
        let events: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(events[0]["event_id"], 7);
        assert_eq!(events[0]["approved_count"], 2);
    }

    #[actix_web::test]
    async fn logout_destroys_the_desks() {
        let backend = Arc::new(backend().with_roster(snapshot(&[(1, Status::Pending)])));
        let app_state = state(&backend, FailurePolicy::Closed);
        let app = app!(app_state);
        let cookie = sign_in!(app, "morgan");

        let req = test::TestRequest::post()
            .uri("/api/manager/events/7/roster/load")
            .cookie(cookie.clone())
            .to_request();
        test::call_service(&app, req).await;
        assert_eq!(app_state.desks().unwrap().len(), 1);

        let req = test::TestRequest::post()
            .uri("/api/logout")
            .cookie(cookie)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        assert!(app_state.desks().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn export_serves_csv() {
        let backend = Arc::new(backend().with_roster(snapshot(&[(1, Status::Pending)])));
        let app = app!(state(&backend, FailurePolicy::Closed));
        let cookie = sign_in!(app, "morgan");

        let req = test::TestRequest::post()
            .uri("/api/manager/events/7/roster/load")
            .cookie(cookie.clone())
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::get()
            .uri("/api/manager/events/7/export.csv")
            .cookie(cookie)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("content-type").unwrap(), "text/csv");
        let body = test::read_body(resp).await;
        assert!(body.starts_with(b"id,name,email"));
    }
}

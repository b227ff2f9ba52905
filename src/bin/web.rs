//! Single binary web server: JSON API over the bracket engine.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default.
//! Override with env: HOST, PORT. Set DATABASE_PATH to keep tournaments in a SQLite file;
//! without it they live in memory only.

use actix_web::{
    delete,
    error::{InternalError, JsonPayloadError, PathError},
    get, post, put,
    web::{self, Data, Json, Path},
    App, HttpRequest, HttpResponse, HttpServer, Responder,
};
use bracket_tournament_web::config::{ServerConfig, StorageConfig};
use bracket_tournament_web::{
    add_team, advance_round, build_bracket, create_tournament, delete_tournament, import_teams,
    list_tournaments, pending_matches, record_result, tournament_overview, with_unit_of_work,
    EntityStore, ErrorKind, MemoryStore, SqliteStore, TournamentError, TournamentId, UnitOfWork,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared store; every request runs in its own unit of work.
type AppState = Data<dyn EntityStore>;

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    message: &'static str,
    service: &'static str,
}

#[derive(Deserialize)]
struct CreateTournamentBody {
    name: String,
    team_count: u32,
}

#[derive(Deserialize)]
struct AddTeamBody {
    name: String,
}

#[derive(Deserialize)]
struct RecordResultBody {
    score_a: i64,
    score_b: i64,
}

/// Path segment: tournament id (e.g. /api/tournaments/{id})
#[derive(Deserialize)]
struct TournamentPath {
    id: TournamentId,
}

/// Path segments: tournament id and match key (e.g. /api/tournaments/{id}/matches/R1_P2/result)
#[derive(Deserialize)]
struct TournamentMatchPath {
    id: TournamentId,
    match_id: String,
}

/// Run `f` in one unit of work on the blocking pool. Errors come back as ready-made responses.
async fn in_unit_of_work<T, F>(state: &AppState, f: F) -> Result<T, HttpResponse>
where
    T: Send + 'static,
    F: FnOnce(&mut dyn UnitOfWork) -> Result<T, TournamentError> + Send + 'static,
{
    let store = state.clone().into_inner();
    let outcome = tokio::task::spawn_blocking(move || with_unit_of_work(&*store, f)).await;
    match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            match e.kind() {
                ErrorKind::Integrity | ErrorKind::Store => log::error!("Request failed: {}", e),
                _ => log::warn!("Request rejected: {}", e),
            }
            Err(error_response(&e))
        }
        Err(join) => {
            log::error!("Unit of work panicked: {}", join);
            Err(HttpResponse::InternalServerError()
                .json(serde_json::json!({ "ok": false, "message": "internal error" })))
        }
    }
}

fn error_response(e: &TournamentError) -> HttpResponse {
    kind_response(e.kind(), e.to_string())
}

fn kind_response(kind: ErrorKind, message: String) -> HttpResponse {
    let mut builder = match kind {
        ErrorKind::Validation => HttpResponse::BadRequest(),
        ErrorKind::NotFound => HttpResponse::NotFound(),
        ErrorKind::Precondition => HttpResponse::Conflict(),
        ErrorKind::Integrity | ErrorKind::Store => HttpResponse::InternalServerError(),
    };
    builder.json(serde_json::json!({
        "ok": false,
        "kind": kind,
        "message": message,
    }))
}

/// Unparsable or incomplete JSON bodies get the same envelope as engine validation errors.
fn json_error(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    log::warn!("Rejected body for {}: {}", req.path(), err);
    let message = format!("Invalid request body: {}", err);
    InternalError::from_response(err, kind_response(ErrorKind::Validation, message)).into()
}

/// The only typed path segment is the tournament id; a malformed one names no tournament.
fn path_error(err: PathError, req: &HttpRequest) -> actix_web::Error {
    log::warn!("Rejected path {}: {}", req.path(), err);
    let message = format!("Tournament not found: {}", err);
    InternalError::from_response(err, kind_response(ErrorKind::NotFound, message)).into()
}

fn ok_response(message: impl Into<String>, data: impl Serialize) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "ok": true,
        "message": message.into(),
        "data": data,
    }))
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        message: "healthy",
        service: "bracket-tournament-web",
    })
}

/// List all tournaments, oldest first.
#[get("/api/tournaments")]
async fn api_list_tournaments(state: AppState) -> HttpResponse {
    match in_unit_of_work(&state, |uow| list_tournaments(uow)).await {
        Ok(tournaments) => ok_response(format!("{} tournament(s)", tournaments.len()), tournaments),
        Err(resp) => resp,
    }
}

/// Create a tournament (team count must be a power of two).
#[post("/api/tournaments")]
async fn api_create_tournament(state: AppState, body: Json<CreateTournamentBody>) -> HttpResponse {
    let CreateTournamentBody { name, team_count } = body.into_inner();
    match in_unit_of_work(&state, move |uow| create_tournament(uow, &name, team_count)).await {
        Ok(t) => ok_response(format!("Tournament '{}' created.", t.name), t),
        Err(resp) => resp,
    }
}

/// Tournament with teams, matches, pending matches and derived state.
#[get("/api/tournaments/{id}")]
async fn api_get_tournament(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let id = path.id;
    match in_unit_of_work(&state, move |uow| tournament_overview(uow, id)).await {
        Ok(overview) => ok_response(overview.tournament.name.clone(), overview),
        Err(resp) => resp,
    }
}

/// Delete a tournament and everything in it.
#[delete("/api/tournaments/{id}")]
async fn api_delete_tournament(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let id = path.id;
    match in_unit_of_work(&state, move |uow| delete_tournament(uow, id)).await {
        Ok(t) => ok_response(format!("Tournament '{}' deleted.", t.name), t),
        Err(resp) => resp,
    }
}

/// Register one team.
#[post("/api/tournaments/{id}/teams")]
async fn api_add_team(state: AppState, path: Path<TournamentPath>, body: Json<AddTeamBody>) -> HttpResponse {
    let id = path.id;
    let name = body.into_inner().name;
    match in_unit_of_work(&state, move |uow| add_team(uow, id, &name)).await {
        Ok(team) => ok_response(format!("Team '{}' added successfully.", team.name), team),
        Err(resp) => resp,
    }
}

/// Register teams from a CSV body with a `name` column. All or nothing.
#[post("/api/tournaments/{id}/teams/import")]
async fn api_import_teams(state: AppState, path: Path<TournamentPath>, body: String) -> HttpResponse {
    let id = path.id;
    match in_unit_of_work(&state, move |uow| import_teams(uow, id, body.as_bytes())).await {
        Ok(teams) => ok_response(format!("{} team(s) imported.", teams.len()), teams),
        Err(resp) => resp,
    }
}

/// Generate round 1 (roster must be full).
#[post("/api/tournaments/{id}/bracket")]
async fn api_build_bracket(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let id = path.id;
    match in_unit_of_work(&state, move |uow| build_bracket(uow, id)).await {
        Ok(built) => ok_response(built.to_string(), built),
        Err(resp) => resp,
    }
}

/// Matches without a result.
#[get("/api/tournaments/{id}/matches/pending")]
async fn api_pending_matches(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let id = path.id;
    match in_unit_of_work(&state, move |uow| pending_matches(uow, id)).await {
        Ok(pending) => ok_response(format!("{} pending match(es)", pending.len()), pending),
        Err(resp) => resp,
    }
}

/// Record the score of one match.
#[put("/api/tournaments/{id}/matches/{match_id}/result")]
async fn api_record_result(
    state: AppState,
    path: Path<TournamentMatchPath>,
    body: Json<RecordResultBody>,
) -> HttpResponse {
    let TournamentMatchPath { id, match_id } = path.into_inner();
    let RecordResultBody { score_a, score_b } = body.into_inner();
    match in_unit_of_work(&state, move |uow| {
        record_result(uow, id, &match_id, score_a, score_b)
    })
    .await
    {
        Ok(recorded) => ok_response(recorded.to_string(), recorded),
        Err(resp) => resp,
    }
}

/// Close the current round: next round or champion. 409 while the round is incomplete.
#[post("/api/tournaments/{id}/advance")]
async fn api_advance_round(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let id = path.id;
    match in_unit_of_work(&state, move |uow| advance_round(uow, id)).await {
        Ok(advance) => ok_response(advance.to_string(), advance),
        Err(resp) => resp,
    }
}

/// Avoid 404 in browser tab: favicon not required for app logic.
#[get("/favicon.ico")]
async fn favicon() -> HttpResponse {
    HttpResponse::NoContent().finish()
}

fn open_store(storage: &StorageConfig) -> std::io::Result<Arc<dyn EntityStore>> {
    match storage {
        StorageConfig::Memory => {
            log::warn!("DATABASE_PATH not set; tournaments are kept in memory only");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageConfig::Sqlite(path) => {
            let store = SqliteStore::open(path).map_err(std::io::Error::other)?;
            log::info!("Using SQLite database at {}", path.display());
            Ok(Arc::new(store))
        }
    }
}

/// Extractor configuration and every route of the API.
fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::PathConfig::default().error_handler(path_error))
        .service(api_health)
        .service(favicon)
        .service(api_list_tournaments)
        .service(api_create_tournament)
        .service(api_get_tournament)
        .service(api_delete_tournament)
        .service(api_add_team)
        .service(api_import_teams)
        .service(api_build_bracket)
        .service(api_pending_matches)
        .service(api_record_result)
        .service(api_advance_round);
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = ServerConfig::from_env();
    let state: AppState = Data::from(open_store(&config.storage)?);

    let bind = (config.host.as_str(), config.port);
    log::info!("Starting server at http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind(bind)?
        .run()
        .await
}

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use tracing::{debug, info, warn};

use clubcourt_core::protocol::{
    AcceptRequest, AdminRequest, ConfirmRequest, CreateMatchRequest, EventRequest, FinishRequest,
    FinishResponse, MatchView, ProposalRequest, ScoreSubmission, SessionView, StartSessionRequest,
};
use clubcourt_core::session::generate_session_code;
use clubcourt_core::{Error as CoreError, Match, Scorekeeper, ScoringSession, SessionStore, Side};

use crate::db;
use crate::error::ApiError;
use crate::state::AppState;

type ApiResult<T> = Result<Json<T>, ApiError>;

// ── Health ──────────────────────────────────────────────────────────────

pub async fn health() -> &'static str {
    "ok"
}

// ── Matches ─────────────────────────────────────────────────────────────

pub async fn create_match(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMatchRequest>,
) -> Result<(StatusCode, Json<MatchView>), ApiError> {
    if req.player_a == req.player_b {
        return Err(ApiError::SelfPairing);
    }
    let m = db::create_match(&state.db, req.player_a, req.player_b).await?;
    info!(match_id = m.id, player_a = m.player_a, player_b = m.player_b, "match created");
    Ok((StatusCode::CREATED, Json(MatchView::from(&m))))
}

pub async fn get_match(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<MatchView> {
    let m = load_match(&state, id).await?;
    Ok(Json(MatchView::from(&m)))
}

pub async fn propose(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<ProposalRequest>,
) -> ApiResult<MatchView> {
    transition(&state, id, req.expected_revision, |m| {
        let side = m.side_of(req.player_id)?;
        m.propose(side, req.offer(), Utc::now()).map(|_| ())
    })
    .await
}

pub async fn accept(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<AcceptRequest>,
) -> ApiResult<MatchView> {
    transition(&state, id, req.expected_revision, |m| {
        let side = m.side_of(req.player_id)?;
        m.accept(side, req.chosen_time, req.logistics)
    })
    .await
}

pub async fn submit_score(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<ScoreSubmission>,
) -> ApiResult<MatchView> {
    transition(&state, id, req.expected_revision, |m| {
        let side = m.side_of(req.player_id)?;
        m.submit_score(side, req.score)
    })
    .await
}

pub async fn confirm(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<ConfirmRequest>,
) -> ApiResult<MatchView> {
    transition(&state, id, req.expected_revision, |m| {
        let side = m.side_of(req.player_id)?;
        m.confirm(side)
    })
    .await
}

pub async fn dispute(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<AdminRequest>,
) -> ApiResult<MatchView> {
    transition(&state, id, req.expected_revision, |m| m.dispute()).await
}

pub async fn walkover(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<AdminRequest>,
) -> ApiResult<MatchView> {
    transition(&state, id, req.expected_revision, |m| m.walkover()).await
}

async fn load_match(state: &AppState, id: i64) -> Result<Match, ApiError> {
    db::get_match(&state.db, id).await?.ok_or(ApiError::NotFound)
}

/// Load, transition and compare-and-swap a match. A write that lands
/// after someone else's fails with `StaleRevision` instead of overwriting.
async fn transition<F>(
    state: &AppState,
    id: i64,
    expected_revision: Option<u64>,
    apply: F,
) -> ApiResult<MatchView>
where
    F: FnOnce(&mut Match) -> clubcourt_core::Result<()>,
{
    let mut m = load_match(state, id).await?;
    if let Some(expected) = expected_revision {
        m.check_revision(expected)?;
    }

    let prior_revision = m.revision;
    let proposals_before = m.negotiation.proposals().len();
    if let Err(err) = apply(&mut m) {
        warn!(match_id = id, status = %m.status, error = %err, "rejected match action");
        return Err(err.into());
    }

    let new_proposal = m.negotiation.proposals().get(proposals_before);
    if !db::save_match(&state.db, &m, prior_revision, new_proposal).await? {
        let actual = db::get_revision(&state.db, id)
            .await?
            .ok_or(ApiError::NotFound)?;
        warn!(match_id = id, expected = prior_revision, actual, "lost revision race");
        return Err(CoreError::StaleRevision {
            expected: prior_revision,
            actual,
        }
        .into());
    }

    Ok(Json(MatchView::from(&m)))
}

// ── Live scoring sessions ───────────────────────────────────────────────

pub async fn start_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StartSessionRequest>,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    let initial = req.initial_state()?;
    if let Some(match_id) = req.match_id {
        load_match(&state, match_id).await?;
    }
    if state.sessions.len() >= state.max_sessions {
        return Err(ApiError::SessionsFull);
    }

    let mut code = generate_session_code();
    while state.sessions.contains(&code) {
        code = generate_session_code();
    }

    let keeper = Scorekeeper::start(
        &state.sessions,
        ScoringSession::new(code, req.match_id, initial),
    );
    info!(code = %keeper.session().code, match_id = ?req.match_id, "scoring session started");
    Ok((StatusCode::CREATED, Json(SessionView::from(keeper.session()))))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> ApiResult<SessionView> {
    let session = state.sessions.get(&code)?.ok_or(ApiError::NotFound)?;
    Ok(Json(SessionView::from(&session)))
}

pub async fn record_event(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(req): Json<EventRequest>,
) -> ApiResult<SessionView> {
    let event = req.to_event()?;
    let view = state
        .sessions
        .update(&code, |session| {
            let update = session.record(event);
            debug!(code = %session.code, ?event, match_completed = update.match_completed, "recorded");
            SessionView::from(&*session)
        })
        .ok_or(ApiError::NotFound)?;
    Ok(Json(view))
}

pub async fn undo(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> ApiResult<SessionView> {
    let view = state
        .sessions
        .update(&code, |session| {
            session.undo();
            SessionView::from(&*session)
        })
        .ok_or(ApiError::NotFound)?;
    Ok(Json(view))
}

/// Finalize a session. A session bound to a match reports the result on
/// behalf of `player_id`. The session is taken out of play first, so no
/// event lands after the result is computed; if finalizing or the report
/// is refused it is put back.
pub async fn finish_session(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(req): Json<FinishRequest>,
) -> ApiResult<FinishResponse> {
    let winner_override = req.winner_override()?;
    let session = state.sessions.take(&code).ok_or(ApiError::NotFound)?;

    match report_result(&state, &session, winner_override, req.player_id).await {
        Ok(response) => {
            info!(code = %code, winner = %response.result.winner, "scoring session finished");
            Ok(Json(response))
        }
        Err(err) => {
            state.sessions.restore(session);
            Err(err)
        }
    }
}

async fn report_result(
    state: &AppState,
    session: &ScoringSession,
    winner_override: Option<Side>,
    player_id: Option<i64>,
) -> Result<FinishResponse, ApiError> {
    let result = session.finish(winner_override)?;

    let reported = match session.match_id {
        Some(match_id) => {
            let player_id = player_id.ok_or(ApiError::MissingPlayer)?;
            let Json(view) = transition(state, match_id, None, |m| {
                let side = m.side_of(player_id)?;
                let report = m.report_from(&result);
                m.submit_score(side, report)
            })
            .await?;
            Some(view)
        }
        None => None,
    };

    Ok(FinishResponse { result, reported })
}

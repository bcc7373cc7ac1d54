use super::error::fail;
use super::handlers;
use super::session;
use super::types::{ApiRequest, AppState};

pub fn handle_request(state: &mut AppState, req: ApiRequest) -> serde_json::Value {
    // Core routes (health, workspace, session issue, backup) sit outside /api
    // and carry no session.
    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return resp;
    }

    let Some(conn) = state.db.as_ref() else {
        return fail(&req.id, 503, "open a workspace first");
    };

    // Everything under /api requires an authenticated session; resolve it once
    // and hand the context to the handler explicitly.
    let ctx = match session::resolve(conn, req.token.as_deref()) {
        Ok(c) => c,
        Err(e) => return e.response(&req.id),
    };

    if let Some(resp) = handlers::students::try_handle(conn, &ctx, &req) {
        return resp;
    }
    if let Some(resp) = handlers::staff::try_handle(conn, &ctx, &req) {
        return resp;
    }
    if let Some(resp) = handlers::academics::try_handle(conn, &ctx, &req) {
        return resp;
    }
    if let Some(resp) = handlers::attendance::try_handle(conn, &ctx, &req) {
        return resp;
    }
    if let Some(resp) = handlers::fees::try_handle(conn, &ctx, &req) {
        return resp;
    }
    if let Some(resp) = handlers::library::try_handle(conn, &ctx, &req) {
        return resp;
    }
    if let Some(resp) = handlers::transport::try_handle(conn, &ctx, &req) {
        return resp;
    }
    if let Some(resp) = handlers::inventory::try_handle(conn, &ctx, &req) {
        return resp;
    }
    if let Some(resp) = handlers::front_office::try_handle(conn, &ctx, &req) {
        return resp;
    }
    if let Some(resp) = handlers::events::try_handle(conn, &ctx, &req) {
        return resp;
    }
    if let Some(resp) = handlers::reports::try_handle(conn, &ctx, &req) {
        return resp;
    }
    if let Some(resp) = handlers::settings::try_handle(conn, &ctx, &req) {
        return resp;
    }

    fail(
        &req.id,
        404,
        format!("unknown route: {} {}", req.method, req.path),
    )
}

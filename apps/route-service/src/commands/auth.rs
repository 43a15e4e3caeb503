//! # Auth Commands

use reparto_core::Agent;
use reparto_db::with_retry;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub name: String,
    pub password: String,
}

/// The agent and the zones they may work.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub agent: Agent,
    pub zones: Vec<i64>,
}

/// Verifies an agent's credentials.
///
/// Wrong name and wrong password produce the same `UNAUTHORIZED` error.
pub async fn login(state: &AppState, req: LoginRequest) -> Result<LoginResponse, ApiError> {
    debug!(name = %req.name, "login called");

    if req.name.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::validation("name and password are required"));
    }

    let db = state.db();
    let req = &req;
    let agent = with_retry(state.retry(), "authenticate", || async move {
        db.agents().authenticate(&req.name, &req.password).await
    })
    .await?;

    let agent_code = agent.agent_code;
    let zones = with_retry(state.retry(), "zones_for_agent", || async move {
        db.agents().zones_for_agent(agent_code).await
    })
    .await?;

    info!(agent_code, zones = zones.len(), "Agent logged in");
    Ok(LoginResponse { agent, zones })
}

//! # Agent Repository
//!
//! Delivery agents, their credentials and the zones they serve.
//!
//! ## Login Flow
//! ```text
//! name + password
//!      │
//!      ▼
//! SELECT password_hash WHERE name = ?
//!      │
//!      ├── no row ─────────────┐
//!      ▼                       ▼
//! argon2 verify ── mismatch ─► CoreError::InvalidCredentials
//!      │                       (same error either way: no user enumeration)
//!      ▼
//! Agent { agent_code, name }
//! ```

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use reparto_core::validation::{validate_code, validate_name};
use reparto_core::{Agent, CoreError};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};

#[derive(Debug, FromRow)]
struct AgentCredentials {
    agent_code: i64,
    name: String,
    password_hash: String,
}

/// Repository for agents and zone assignments.
#[derive(Debug, Clone)]
pub struct AgentRepository {
    pool: SqlitePool,
}

impl AgentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AgentRepository { pool }
    }

    /// Verifies a name/password pair and returns the agent.
    pub async fn authenticate(&self, name: &str, password: &str) -> DbResult<Agent> {
        let name = name.trim();
        debug!(name = %name, "Authenticating agent");

        let row = sqlx::query_as::<_, AgentCredentials>(
            "SELECT agent_code, name, password_hash FROM agents WHERE name = ?1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            warn!(name = %name, "Login for unknown agent");
            return Err(CoreError::InvalidCredentials.into());
        };

        if !verify_password(password, &row.password_hash) {
            warn!(agent_code = row.agent_code, "Login with wrong password");
            return Err(CoreError::InvalidCredentials.into());
        }

        info!(agent_code = row.agent_code, "Agent authenticated");
        Ok(Agent {
            agent_code: row.agent_code,
            name: row.name,
        })
    }

    /// Creates an agent with a freshly hashed password.
    pub async fn create(&self, agent_code: i64, name: &str, password: &str) -> DbResult<Agent> {
        validate_code(agent_code, "agent_code")?;
        let name = validate_name(name, "name")?;
        if password.is_empty() {
            return Err(reparto_core::ValidationError::required("password").into());
        }

        let hash = hash_password(password)?;

        sqlx::query("INSERT INTO agents (agent_code, name, password_hash) VALUES (?1, ?2, ?3)")
            .bind(agent_code)
            .bind(&name)
            .bind(&hash)
            .execute(&self.pool)
            .await?;

        info!(agent_code, name = %name, "Agent created");
        Ok(Agent { agent_code, name })
    }

    pub async fn get(&self, agent_code: i64) -> DbResult<Option<Agent>> {
        let agent = sqlx::query_as::<_, Agent>(
            "SELECT agent_code, name FROM agents WHERE agent_code = ?1",
        )
        .bind(agent_code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(agent)
    }

    /// Zones the agent serves, ascending.
    pub async fn zones_for_agent(&self, agent_code: i64) -> DbResult<Vec<i64>> {
        debug!(agent_code, "Listing zones");

        let zones = sqlx::query_scalar::<_, i64>(
            "SELECT zone_code FROM agent_zones WHERE agent_code = ?1 ORDER BY zone_code",
        )
        .bind(agent_code)
        .fetch_all(&self.pool)
        .await?;

        Ok(zones)
    }

    /// Assigns a zone to an agent. Assigning twice is a no-op.
    pub async fn assign_zone(&self, agent_code: i64, zone_code: i64) -> DbResult<()> {
        validate_code(zone_code, "zone_code")?;

        sqlx::query(
            "INSERT INTO agent_zones (agent_code, zone_code) VALUES (?1, ?2)
             ON CONFLICT(agent_code, zone_code) DO NOTHING",
        )
        .bind(agent_code)
        .bind(zone_code)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Password Hashing
// =============================================================================

/// Hashes a password into an argon2 PHC string.
pub fn hash_password(password: &str) -> DbResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DbError::Internal(format!("Failed to hash password: {}", e)))
}

/// Checks a password against a stored PHC string. Malformed hashes never match.
fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_authenticate() {
        let db = db().await;
        db.agents().create(2, "marcos", "s3cret").await.unwrap();

        let agent = db.agents().authenticate("marcos", "s3cret").await.unwrap();
        assert_eq!(agent.agent_code, 2);

        let err = db.agents().authenticate("marcos", "wrong").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidCredentials)));

        let err = db.agents().authenticate("nobody", "s3cret").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let db = db().await;
        db.agents().create(1, "ana", "x").await.unwrap();
        let err = db.agents().create(2, "ana", "y").await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_zones_for_agent() {
        let db = db().await;
        db.agents().create(1, "ana", "x").await.unwrap();
        db.agents().assign_zone(1, 12).await.unwrap();
        db.agents().assign_zone(1, 3).await.unwrap();
        db.agents().assign_zone(1, 3).await.unwrap();

        assert_eq!(db.agents().zones_for_agent(1).await.unwrap(), vec![3, 12]);
        assert!(db.agents().zones_for_agent(99).await.unwrap().is_empty());
    }

    #[test]
    fn test_malformed_hash_never_matches() {
        assert!(!verify_password("x", "not-a-phc-string"));
        let hash = hash_password("x").unwrap();
        assert!(verify_password("x", &hash));
    }
}

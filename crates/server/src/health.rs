use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use xsell_db::DbPool;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Readiness {
    Ready,
    Degraded,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ComponentHealth {
    pub name: &'static str,
    pub status: Readiness,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: Readiness,
    pub components: Vec<ComponentHealth>,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(db_pool)
}

/// 200 while the database answers, 503 otherwise.
pub async fn health(State(db_pool): State<DbPool>) -> (StatusCode, Json<HealthReport>) {
    let database = match xsell_db::ping(&db_pool).await {
        Ok(()) => ComponentHealth {
            name: "database",
            status: Readiness::Ready,
            detail: "ping succeeded".to_string(),
        },
        Err(error) => ComponentHealth {
            name: "database",
            status: Readiness::Degraded,
            detail: format!("ping failed: {error}"),
        },
    };

    let status = database.status;
    let report = HealthReport {
        status,
        components: vec![database],
        checked_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    };
    let code = match status {
        Readiness::Ready => StatusCode::OK,
        Readiness::Degraded => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(report))
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};
    use xsell_db::connect_with_settings;

    use crate::health::{health, Readiness};

    #[tokio::test]
    async fn reachable_database_reports_ready() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");

        let (status, Json(report)) = health(State(pool.clone())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(report.status, Readiness::Ready);
        assert_eq!(report.components[0].name, "database");

        pool.close().await;
    }

    #[tokio::test]
    async fn closed_pool_reports_degraded() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");
        pool.close().await;

        let (status, Json(report)) = health(State(pool)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(report.status, Readiness::Degraded);
        assert!(report.components[0].detail.starts_with("ping failed"));
    }
}

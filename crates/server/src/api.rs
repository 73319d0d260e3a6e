//! JSON API for managing cross-selling rules and triggering bulk execution.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use xsell_core::cross_sell::ports::{CustomFieldSource, RuleRepository};
use xsell_core::domain::rule::{CrossSellingRule, RuleCondition, RuleId, RuleTargetCriteria};
use xsell_core::errors::{ApplicationError, DomainError, InterfaceError, InterfaceErrorKind};
use xsell_core::{BulkExecutionResult, BulkExecutor, FieldCatalog, FieldListing};

#[derive(Clone)]
pub struct ApiState {
    pub rules: Arc<dyn RuleRepository>,
    pub custom_fields: Arc<dyn CustomFieldSource>,
    pub executor: Arc<BulkExecutor>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/cross-selling/fields", get(list_fields))
        .route("/api/cross-selling/rules", get(list_rules).post(create_rule))
        .route("/api/cross-selling/execute-bulk", post(execute_bulk))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteBulkRequest {
    pub rule_id: Option<String>,
}

/// Rule payload accepted by `POST /rules`. A missing id is generated.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRuleRequest {
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub source_conditions: Vec<RuleCondition>,
    #[serde(default)]
    pub target_criteria: Vec<RuleTargetCriteria>,
}

fn default_active() -> bool {
    true
}

impl From<CreateRuleRequest> for CrossSellingRule {
    fn from(request: CreateRuleRequest) -> Self {
        let id = request.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut rule = CrossSellingRule::new(id.trim(), request.name.trim());
        rule.description = request.description;
        rule.active = request.active;
        rule.source_conditions = request.source_conditions;
        rule.target_criteria = request.target_criteria;
        rule
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    pub error: &'static str,
    pub detail: String,
    pub correlation_id: String,
}

/// Interface error rendered with its status code and a JSON body.
#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl ApiError {
    fn from_application(error: ApplicationError) -> Self {
        let correlation_id = Uuid::new_v4().to_string();
        warn!(
            event_name = "api.request_failed",
            correlation_id = %correlation_id,
            error = %error,
            "cross-selling API request failed"
        );
        Self(error.into_interface(correlation_id))
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::from_application(DomainError::InvariantViolation(message.into()).into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let InterfaceError { kind, message, correlation_id } = self.0;
        let status = match kind {
            InterfaceErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            InterfaceErrorKind::NotFound => StatusCode::NOT_FOUND,
            InterfaceErrorKind::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ApiErrorBody { error: kind.user_message(), detail: message, correlation_id };
        (status, Json(body)).into_response()
    }
}

async fn list_fields(State(state): State<ApiState>) -> Result<Json<FieldListing>, ApiError> {
    let custom_fields =
        state.custom_fields.list_custom_fields().await.map_err(ApiError::from_application)?;
    Ok(Json(FieldCatalog::resolve(custom_fields).list_fields()))
}

async fn list_rules(State(state): State<ApiState>) -> Result<Json<Vec<CrossSellingRule>>, ApiError> {
    let rules = state.rules.list_rules().await.map_err(ApiError::from_application)?;
    Ok(Json(rules))
}

async fn create_rule(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<(StatusCode, Json<CrossSellingRule>), ApiError> {
    let request: CreateRuleRequest = serde_json::from_slice(&body)
        .map_err(|error| ApiError::bad_request(format!("invalid rule payload: {error}")))?;
    let rule = CrossSellingRule::from(request);
    rule.validate().map_err(|error| ApiError::from_application(error.into()))?;

    state.rules.save_rule(rule.clone()).await.map_err(ApiError::from_application)?;
    info!(event_name = "api.rule_saved", rule_id = %rule.id, "cross-selling rule saved");

    Ok((StatusCode::CREATED, Json(rule)))
}

/// An empty body runs every active rule.
async fn execute_bulk(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<Json<BulkExecutionResult>, ApiError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        ExecuteBulkRequest::default()
    } else {
        serde_json::from_slice::<ExecuteBulkRequest>(&body)
            .map_err(|error| ApiError::bad_request(format!("invalid request body: {error}")))?
    };

    let rule_id = request.rule_id.map(RuleId);
    let result = state
        .executor
        .execute_bulk(rule_id.as_ref())
        .await
        .map_err(|error| ApiError::from_application(error.into()))?;

    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use xsell_core::{
        BulkExecutor, ConditionOperator, CrossSellingRule, CustomFieldDefinition, EngineOptions,
        FieldType, MatchType, Product, RuleCondition, RuleTargetCriteria,
    };
    use xsell_db::repositories::{
        InMemoryAssociationStore, InMemoryCustomFieldRepository, InMemoryProductRepository,
        InMemoryRuleRepository,
    };

    use super::{router, ApiState};

    fn app() -> Router {
        let rules = Arc::new(InMemoryRuleRepository::with_rules([CrossSellingRule::new(
            "lamps-need-bulbs",
            "Lamps need bulbs",
        )
        .with_condition(RuleCondition::new("category", ConditionOperator::Equals, json!("Lamps")))
        .with_criteria(RuleTargetCriteria::literal("category", MatchType::Exact, "LightBulbs"))]));
        let products = Arc::new(InMemoryProductRepository::with_products([
            Product::new("lamp-1", "Desk Lamp").with_attribute("category", "Lamps"),
            Product::new("lamp-2", "Floor Lamp").with_attribute("category", "Lamps"),
            Product::new("bulb-1", "LED Bulb").with_attribute("category", "LightBulbs"),
        ]));
        let custom_fields = Arc::new(InMemoryCustomFieldRepository::with_fields([
            CustomFieldDefinition::new("socket", "Socket", FieldType::Enum),
        ]));
        let executor = BulkExecutor::new(
            rules.clone(),
            products,
            custom_fields.clone(),
            Arc::new(InMemoryAssociationStore::default()),
            EngineOptions::default(),
        );

        router(ApiState { rules, custom_fields, executor: Arc::new(executor) })
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map(|value| Body::from(value.to_string())).unwrap_or_else(Body::empty))
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let payload = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, payload)
    }

    #[tokio::test]
    async fn execute_bulk_without_body_runs_active_rules() {
        let app = app();

        let (status, first) = send(app.clone(), "POST", "/api/cross-selling/execute-bulk", None).await;
        let (_, second) =
            send(app, "POST", "/api/cross-selling/execute-bulk", Some(json!({}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["totalProducts"], 2);
        assert_eq!(first["crossSellingsCreated"], 2);
        assert_eq!(second["crossSellingsCreated"], 0);
        assert_eq!(second["productsSkipped"], 2);
    }

    #[tokio::test]
    async fn run_level_failures_map_to_status_codes_with_correlation_ids() {
        let (not_found, body) = send(
            app(),
            "POST",
            "/api/cross-selling/execute-bulk",
            Some(json!({ "ruleId": "missing" })),
        )
        .await;
        let (blank, _) = send(
            app(),
            "POST",
            "/api/cross-selling/execute-bulk",
            Some(json!({ "ruleId": "  " })),
        )
        .await;

        assert_eq!(not_found, StatusCode::NOT_FOUND);
        assert!(body["detail"].as_str().unwrap_or_default().contains("missing"));
        assert!(!body["correlationId"].as_str().unwrap_or_default().is_empty());
        assert_eq!(blank, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn fields_listing_includes_custom_fields() {
        let (status, body) = send(app(), "GET", "/api/cross-selling/fields", None).await;

        assert_eq!(status, StatusCode::OK);
        let custom = body["customFields"].as_array().expect("custom fields");
        assert_eq!(custom.len(), 1);
        assert_eq!(custom[0]["field"], "socket");
        assert!(!body["standardFields"].as_array().expect("standard fields").is_empty());
    }

    #[tokio::test]
    async fn created_rules_are_listed_and_blank_names_rejected() {
        let app = app();

        let (created, rule) = send(
            app.clone(),
            "POST",
            "/api/cross-selling/rules",
            Some(json!({
                "name": "Shades for lamps",
                "sourceConditions": [{ "field": "category", "operator": "equals", "value": "Lamps" }],
                "targetCriteria": [{ "field": "category", "matchType": "exact", "value": "Shades" }]
            })),
        )
        .await;
        let (rejected, _) = send(
            app.clone(),
            "POST",
            "/api/cross-selling/rules",
            Some(json!({ "id": "blank", "name": "   " })),
        )
        .await;
        let (_, listed) = send(app, "GET", "/api/cross-selling/rules", None).await;

        assert_eq!(created, StatusCode::CREATED);
        assert!(!rule["id"].as_str().unwrap_or_default().is_empty());
        assert_eq!(rejected, StatusCode::BAD_REQUEST);
        assert_eq!(listed.as_array().expect("rules").len(), 2);
    }
}

use axum::{
    Router,
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    CompoundFrequency, GoalSolveConfig, GrowthInput, MAX_PROJECTION_YEARS, ProjectionError,
    ProjectionResult, RetirementAssumptions, RetirementInput, RetirementResult, project_growth,
    project_retirement_with, solve_monthly_contribution,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct ApiState {
    pub assumptions: RetirementAssumptions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct GrowthPayload {
    principal: Option<f64>,
    monthly_contribution: Option<f64>,
    annual_rate_percent: Option<f64>,
    years: Option<u32>,
    compound_frequency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RetirementPayload {
    current_age: Option<u32>,
    retirement_age: Option<u32>,
    current_savings: Option<f64>,
    monthly_contribution: Option<f64>,
    expected_return_percent: Option<f64>,
    inflation_rate_percent: Option<f64>,
    retirement_goal: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SolvePayload {
    principal: Option<f64>,
    annual_rate_percent: Option<f64>,
    years: Option<u32>,
    compound_frequency: Option<String>,
    target_amount: Option<f64>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RetirementResponse {
    #[serde(flatten)]
    result: RetirementResult,
    inflation_applied: bool,
    assumptions: RetirementAssumptions,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

impl IntoResponse for ProjectionError {
    fn into_response(self) -> Response {
        warn!(field = self.field(), error = %self, "rejected request");
        error_response(StatusCode::BAD_REQUEST, &self.to_string())
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/healthz", get(health_handler))
        .route(
            "/api/growth",
            get(growth_get_handler).post(growth_post_handler),
        )
        .route(
            "/api/retirement",
            get(retirement_get_handler).post(retirement_post_handler),
        )
        .route("/api/solve", get(solve_get_handler).post(solve_post_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(port: u16, state: ApiState) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(
        %addr,
        life_expectancy = state.assumptions.life_expectancy,
        withdrawal_rate = state.assumptions.withdrawal_rate,
        "projection HTTP API listening"
    );
    info!("Local access: http://127.0.0.1:{port}/api/growth");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn growth_get_handler(Query(payload): Query<GrowthPayload>) -> ProjectionResult<Response> {
    growth_handler_impl(payload)
}

async fn growth_post_handler(Json(payload): Json<GrowthPayload>) -> ProjectionResult<Response> {
    growth_handler_impl(payload)
}

fn growth_handler_impl(payload: GrowthPayload) -> ProjectionResult<Response> {
    let input = growth_input_from_payload(payload)?;
    let result = project_growth(&input)?;
    Ok(json_response(StatusCode::OK, result))
}

async fn retirement_get_handler(
    State(state): State<ApiState>,
    Query(payload): Query<RetirementPayload>,
) -> ProjectionResult<Response> {
    retirement_handler_impl(&state, payload)
}

async fn retirement_post_handler(
    State(state): State<ApiState>,
    Json(payload): Json<RetirementPayload>,
) -> ProjectionResult<Response> {
    retirement_handler_impl(&state, payload)
}

fn retirement_handler_impl(
    state: &ApiState,
    payload: RetirementPayload,
) -> ProjectionResult<Response> {
    let input = retirement_input_from_payload(payload);
    let result = project_retirement_with(&input, &state.assumptions)?;
    Ok(json_response(
        StatusCode::OK,
        build_retirement_response(result, state.assumptions),
    ))
}

async fn solve_get_handler(Query(payload): Query<SolvePayload>) -> ProjectionResult<Response> {
    solve_handler_impl(payload)
}

async fn solve_post_handler(Json(payload): Json<SolvePayload>) -> ProjectionResult<Response> {
    solve_handler_impl(payload)
}

fn solve_handler_impl(payload: SolvePayload) -> ProjectionResult<Response> {
    let (input, config) = solve_request_from_payload(payload)?;
    let result = solve_monthly_contribution(&input, config)?;
    Ok(json_response(StatusCode::OK, result))
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn default_growth_input() -> GrowthInput {
    GrowthInput {
        principal: 10_000.0,
        monthly_contribution: 500.0,
        annual_rate_percent: 7.0,
        years: 10,
        compound_frequency: CompoundFrequency::Monthly,
    }
}

fn default_retirement_input() -> RetirementInput {
    RetirementInput {
        current_age: 30,
        retirement_age: 65,
        current_savings: 50_000.0,
        monthly_contribution: 1_000.0,
        expected_return_percent: 7.0,
        inflation_rate_percent: 3.0,
        retirement_goal: 1_000_000.0,
    }
}

fn check_years(years: u32) -> ProjectionResult<()> {
    if years > MAX_PROJECTION_YEARS {
        return Err(ProjectionError::invalid(
            "years",
            format!("must be <= {MAX_PROJECTION_YEARS}"),
        ));
    }
    Ok(())
}

fn growth_input_from_payload(payload: GrowthPayload) -> ProjectionResult<GrowthInput> {
    let mut input = default_growth_input();

    if let Some(v) = payload.principal {
        input.principal = v;
    }
    if let Some(v) = payload.monthly_contribution {
        input.monthly_contribution = v;
    }
    if let Some(v) = payload.annual_rate_percent {
        input.annual_rate_percent = v;
    }
    if let Some(v) = payload.years {
        input.years = v;
    }
    if let Some(v) = payload.compound_frequency {
        input.compound_frequency = v.parse()?;
    }

    check_years(input.years)?;
    Ok(input)
}

fn retirement_input_from_payload(payload: RetirementPayload) -> RetirementInput {
    let mut input = default_retirement_input();

    if let Some(v) = payload.current_age {
        input.current_age = v;
    }
    if let Some(v) = payload.retirement_age {
        input.retirement_age = v;
    }
    if let Some(v) = payload.current_savings {
        input.current_savings = v;
    }
    if let Some(v) = payload.monthly_contribution {
        input.monthly_contribution = v;
    }
    if let Some(v) = payload.expected_return_percent {
        input.expected_return_percent = v;
    }
    if let Some(v) = payload.inflation_rate_percent {
        input.inflation_rate_percent = v;
    }
    if let Some(v) = payload.retirement_goal {
        input.retirement_goal = v;
    }

    input
}

fn solve_request_from_payload(
    payload: SolvePayload,
) -> ProjectionResult<(GrowthInput, GoalSolveConfig)> {
    let growth = GrowthPayload {
        principal: payload.principal,
        monthly_contribution: Some(0.0),
        annual_rate_percent: payload.annual_rate_percent,
        years: payload.years,
        compound_frequency: payload.compound_frequency,
    };
    let input = growth_input_from_payload(growth)?;

    let Some(target_amount) = payload.target_amount else {
        return Err(ProjectionError::invalid("targetAmount", "is required"));
    };
    let mut config = GoalSolveConfig::for_target(target_amount);
    if let Some(v) = payload.search_max {
        config.search_max = v;
    }
    if let Some(v) = payload.tolerance {
        config.tolerance = v;
    }
    if let Some(v) = payload.max_iterations {
        config.max_iterations = v;
    }

    Ok((input, config))
}

fn build_retirement_response(
    result: RetirementResult,
    assumptions: RetirementAssumptions,
) -> RetirementResponse {
    RetirementResponse {
        result,
        inflation_applied: false,
        assumptions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::Uri;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn growth_input_from_json(json: &str) -> ProjectionResult<GrowthInput> {
        let payload = serde_json::from_str::<GrowthPayload>(json).expect("payload should parse");
        growth_input_from_payload(payload)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        serde_json::from_slice(&bytes).expect("body should be JSON")
    }

    #[test]
    fn empty_growth_payload_uses_form_defaults() {
        let input = growth_input_from_json("{}").expect("defaults are valid");
        assert_eq!(input, default_growth_input());
    }

    #[test]
    fn growth_payload_parses_web_keys() {
        let json = r#"{
          "principal": 2500,
          "monthlyContribution": 150.5,
          "annualRatePercent": 4.25,
          "years": 15,
          "compoundFrequency": "quarterly"
        }"#;
        let input = growth_input_from_json(json).expect("json should parse");

        assert_approx(input.principal, 2_500.0);
        assert_approx(input.monthly_contribution, 150.5);
        assert_approx(input.annual_rate_percent, 4.25);
        assert_eq!(input.years, 15);
        assert_eq!(input.compound_frequency, CompoundFrequency::Quarterly);
    }

    #[test]
    fn growth_payload_rejects_unknown_frequency() {
        let err = growth_input_from_json(r#"{"compoundFrequency": "weekly"}"#)
            .expect_err("must reject weekly");
        assert_eq!(err.field(), "compoundFrequency");
    }

    #[test]
    fn growth_payload_caps_years() {
        let err =
            growth_input_from_json(r#"{"years": 101}"#).expect_err("must reject long horizon");
        assert_eq!(err.field(), "years");
        assert!(growth_input_from_json(r#"{"years": 100}"#).is_ok());
    }

    #[test]
    fn growth_query_string_parses() {
        let uri: Uri = "http://localhost/api/growth?principal=2000&years=5&compoundFrequency=annually"
            .parse()
            .expect("valid uri");
        let Query(payload) = Query::<GrowthPayload>::try_from_uri(&uri).expect("query should parse");
        let input = growth_input_from_payload(payload).expect("valid input");

        assert_approx(input.principal, 2_000.0);
        assert_eq!(input.years, 5);
        assert_eq!(input.compound_frequency, CompoundFrequency::Annually);
        assert_approx(input.monthly_contribution, 500.0);
    }

    #[test]
    fn retirement_payload_overrides_defaults() {
        let json = r#"{
          "currentAge": 40,
          "retirementAge": 60,
          "currentSavings": 120000,
          "retirementGoal": 750000
        }"#;
        let payload = serde_json::from_str::<RetirementPayload>(json).expect("json should parse");
        let input = retirement_input_from_payload(payload);

        assert_eq!(input.current_age, 40);
        assert_eq!(input.retirement_age, 60);
        assert_approx(input.current_savings, 120_000.0);
        assert_approx(input.retirement_goal, 750_000.0);
        assert_approx(input.monthly_contribution, 1_000.0);
        assert_approx(input.inflation_rate_percent, 3.0);
    }

    #[test]
    fn solve_payload_requires_target() {
        let payload = serde_json::from_str::<SolvePayload>("{}").expect("json should parse");
        let err = solve_request_from_payload(payload).expect_err("target is required");
        assert_eq!(err.field(), "targetAmount");
    }

    #[test]
    fn solve_payload_builds_config() {
        let json = r#"{"targetAmount": 250000, "tolerance": 0.5, "maxIterations": 20}"#;
        let payload = serde_json::from_str::<SolvePayload>(json).expect("json should parse");
        let (input, config) = solve_request_from_payload(payload).expect("valid request");

        assert_approx(input.monthly_contribution, 0.0);
        assert_approx(config.target_amount, 250_000.0);
        assert_approx(config.tolerance, 0.5);
        assert_eq!(config.max_iterations, 20);
    }

    #[test]
    fn growth_result_serialization_uses_camel_case() {
        let result = project_growth(&default_growth_input()).expect("valid input");
        let json = serde_json::to_string(&result).expect("result should serialize");

        for key in [
            "\"totalAmount\"",
            "\"totalContributions\"",
            "\"totalInterest\"",
            "\"yearlyBreakdown\"",
            "\"startingAmount\"",
            "\"endingAmount\"",
        ] {
            assert!(json.contains(key), "missing {key} in {json}");
        }
    }

    #[test]
    fn retirement_response_flattens_result_and_echoes_assumptions() {
        let assumptions = RetirementAssumptions::default();
        let result =
            project_retirement_with(&default_retirement_input(), &assumptions).expect("valid");
        let response = build_retirement_response(result, assumptions);
        let value = serde_json::to_value(&response).expect("response should serialize");

        assert!(value.get("totalSavings").is_some());
        assert!(value.get("recommendedMonthlyContribution").is_some());
        assert_eq!(value["yearsOfRetirement"], 20);
        assert_eq!(value["inflationApplied"], false);
        assert_eq!(value["assumptions"]["lifeExpectancy"], 85);
        assert_eq!(value["assumptions"]["withdrawalRate"], 0.04);
    }

    #[tokio::test]
    async fn growth_handler_returns_ok_with_no_store() {
        let response = growth_post_handler(Json(GrowthPayload::default()))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL),
            Some(&header::HeaderValue::from_static("no-store"))
        );
        let body = body_json(response).await;
        assert_eq!(body["totalContributions"], 70_000.0);
    }

    #[tokio::test]
    async fn growth_handler_maps_invalid_input_to_bad_request() {
        let payload = GrowthPayload {
            years: Some(0),
            ..GrowthPayload::default()
        };
        let response = growth_post_handler(Json(payload)).await.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        let message = body["error"].as_str().expect("error message");
        assert!(message.contains("years"));
    }

    #[tokio::test]
    async fn retirement_handler_uses_state_assumptions() {
        let state = ApiState {
            assumptions: RetirementAssumptions {
                life_expectancy: 90,
                withdrawal_rate: 0.035,
            },
        };
        let response = retirement_post_handler(State(state), Json(RetirementPayload::default()))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["yearsOfRetirement"], 25);
        assert_eq!(body["assumptions"]["withdrawalRate"], 0.035);
    }

    #[tokio::test]
    async fn retirement_handler_rejects_inverted_ages() {
        let payload = RetirementPayload {
            current_age: Some(70),
            retirement_age: Some(65),
            ..RetirementPayload::default()
        };
        let response = retirement_post_handler(State(ApiState::default()), Json(payload))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn solve_handler_rejects_oversized_iteration_budget() {
        let payload: SolvePayload =
            serde_json::from_str(r#"{"targetAmount": 1.0, "maxIterations": 4294967295}"#)
                .expect("payload should parse");
        let response = solve_post_handler(Json(payload)).await.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        let message = body["error"].as_str().expect("error message");
        assert!(message.contains("maxIterations"));
    }

    #[tokio::test]
    async fn retirement_handler_reports_negative_span_past_life_expectancy() {
        let payload = RetirementPayload {
            current_age: Some(30),
            retirement_age: Some(90),
            ..RetirementPayload::default()
        };
        let response = retirement_post_handler(State(ApiState::default()), Json(payload))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["yearsOfRetirement"], -5);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = not_found_handler().await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Not found");
    }
}

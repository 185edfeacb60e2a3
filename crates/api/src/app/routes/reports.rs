use std::sync::Arc;

use axum::{Json, Router, extract::Extension, http::StatusCode, response::IntoResponse, routing::post};

use stockbook_infra::stock_report;

use crate::app::dto;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/stock", post(build_stock_report))
}

/// Status and valuation for the supplied catalog items.
pub async fn build_stock_report(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::StockReportRequest>,
) -> axum::response::Response {
    let report = stock_report(services.ledger(), body.items, body.status).await;
    (StatusCode::OK, Json(report)).into_response()
}

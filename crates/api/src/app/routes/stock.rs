use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use stockbook_core::ProductId;
use stockbook_infra::HistoryPage;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

/// Largest history page a client may request.
const MAX_HISTORY_LIMIT: usize = 1000;

pub fn router() -> Router {
    Router::new()
        .route("/:product_id", get(get_stock).delete(remove_stock))
        .route("/:product_id/initialize", post(initialize_stock))
        .route("/:product_id/adjust", post(adjust_stock))
        .route("/:product_id/history", get(get_history))
}

pub async fn initialize_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::InitializeStockRequest>,
) -> axum::response::Response {
    let product: ProductId = match errors::parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .ledger()
        .initialize(product, body.quantity, ctx.actor())
        .await
    {
        Ok(record) => (
            StatusCode::CREATED,
            Json(dto::stock_to_json(product, Some(&record))),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::AdjustStockRequest>,
) -> axum::response::Response {
    let product: ProductId = match errors::parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .ledger()
        .adjust(product, body.new_quantity, ctx.actor(), body.notes)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(dto::outcome_to_json(&outcome))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn get_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product: ProductId = match errors::parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().stock(product).await {
        Ok(record) => (
            StatusCode::OK,
            Json(dto::stock_to_json(product, record.as_ref())),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn get_history(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Query(query): Query<dto::HistoryQuery>,
) -> axum::response::Response {
    let product: ProductId = match errors::parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let limit = query
        .limit
        .unwrap_or(services.ledger().page_size())
        .clamp(1, MAX_HISTORY_LIMIT);
    let page = HistoryPage {
        before: query.before,
        limit,
    };

    let entries = match services.ledger().history_page(product, page).await {
        Ok(entries) => entries,
        Err(e) => return errors::ledger_error_to_response(e),
    };

    let next_before = entries
        .last()
        .filter(|oldest| entries.len() == limit && oldest.sequence > 1)
        .map(|oldest| oldest.sequence);

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "product_id": product.to_string(),
            "entries": entries.iter().map(dto::entry_to_json).collect::<Vec<_>>(),
            "next_before": next_before,
        })),
    )
        .into_response()
}

pub async fn remove_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product: ProductId = match errors::parse_id(&id, "product") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger().remove_product(product).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "no stock record"),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use stockbook_core::{DomainError, PurchaseId};
use stockbook_purchasing::Purchase;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_purchase))
        .route("/:id", get(get_purchase))
        .route("/:id/receive", post(receive_purchase))
        .route("/:id/cancel", post(cancel_purchase))
}

fn build_purchase(body: dto::CreatePurchaseRequest) -> Result<Purchase, DomainError> {
    let mut purchase = Purchase::new(
        PurchaseId::new(),
        body.invoice_number,
        body.supplier_id,
        body.purchase_date.unwrap_or_else(dto::today),
        Utc::now(),
    )?;
    if let Some(method) = body.payment_method {
        purchase.set_payment_method(method);
    }
    purchase.set_notes(body.notes);
    for line in body.lines {
        purchase.add_line(line.product_id, line.quantity, line.unit_amount)?;
    }
    Ok(purchase)
}

/// Record a pending purchase; stock is untouched until it is received.
pub async fn create_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(_ctx): Extension<ActorContext>,
    Json(body): Json<dto::CreatePurchaseRequest>,
) -> axum::response::Response {
    let purchase = match build_purchase(body) {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let body = dto::purchase_to_json(&purchase);
    services.documents().insert_purchase(purchase).await;

    (StatusCode::CREATED, Json(body)).into_response()
}

pub async fn receive_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: PurchaseId = match errors::parse_id(&id, "purchase") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let Some(purchase) = services.documents().purchase(id).await else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "purchase not found");
    };
    let mut purchase = purchase.lock().await;

    match services
        .procurement()
        .receive_purchase(&mut purchase, ctx.actor())
        .await
    {
        Ok(outcomes) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "purchase": dto::purchase_to_json(&purchase),
                "stock": outcomes.iter().map(dto::outcome_to_json).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

/// Cancel a pending purchase. Nothing was received, so no stock moves.
pub async fn cancel_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: PurchaseId = match errors::parse_id(&id, "purchase") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let Some(purchase) = services.documents().purchase(id).await else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "purchase not found");
    };
    let mut purchase = purchase.lock().await;

    match purchase.cancel() {
        Ok(()) => (StatusCode::OK, Json(dto::purchase_to_json(&purchase))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: PurchaseId = match errors::parse_id(&id, "purchase") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.documents().purchase(id).await {
        Some(purchase) => {
            let purchase = purchase.lock().await;
            (StatusCode::OK, Json(dto::purchase_to_json(&purchase))).into_response()
        }
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "purchase not found"),
    }
}

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use stockbook_core::{DomainError, SaleId};
use stockbook_sales::Sale;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_sale))
        .route("/:id", get(get_sale))
        .route("/:id/cancel", post(cancel_sale))
}

fn build_sale(body: dto::CreateSaleRequest) -> Result<Sale, DomainError> {
    let mut sale = Sale::new(
        SaleId::new(),
        body.invoice_number,
        body.customer_id,
        body.sale_date.unwrap_or_else(dto::today),
        Utc::now(),
    )?;
    if let Some(method) = body.payment_method {
        sale.set_payment_method(method);
    }
    sale.set_notes(body.notes);
    for line in body.lines {
        sale.add_line(line.product_id, line.quantity, line.unit_amount)?;
    }
    Ok(sale)
}

/// Create and complete a sale in one step.
///
/// All-or-nothing: a short line rejects the whole sale and nothing is kept.
pub async fn create_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Json(body): Json<dto::CreateSaleRequest>,
) -> axum::response::Response {
    let mut sale = match build_sale(body) {
        Ok(s) => s,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let outcomes = match services
        .fulfillment()
        .complete_sale(&mut sale, ctx.actor())
        .await
    {
        Ok(outcomes) => outcomes,
        Err(e) => return errors::ledger_error_to_response(e),
    };

    let body = serde_json::json!({
        "sale": dto::sale_to_json(&sale),
        "stock": outcomes.iter().map(dto::outcome_to_json).collect::<Vec<_>>(),
    });
    services.documents().insert_sale(sale).await;

    (StatusCode::CREATED, Json(body)).into_response()
}

pub async fn cancel_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: SaleId = match errors::parse_id(&id, "sale") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let Some(sale) = services.documents().sale(id).await else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "sale not found");
    };
    let mut sale = sale.lock().await;

    match services.fulfillment().cancel_sale(&mut sale, ctx.actor()).await {
        Ok(outcomes) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "sale": dto::sale_to_json(&sale),
                "stock": outcomes.iter().map(dto::outcome_to_json).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn get_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: SaleId = match errors::parse_id(&id, "sale") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.documents().sale(id).await {
        Some(sale) => {
            let sale = sale.lock().await;
            (StatusCode::OK, Json(dto::sale_to_json(&sale))).into_response()
        }
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "sale not found"),
    }
}

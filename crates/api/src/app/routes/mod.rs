use axum::Router;

pub mod purchases;
pub mod reports;
pub mod sales;
pub mod stock;
pub mod system;

/// Router for all actor-scoped endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/stock", stock::router())
        .nest("/purchases", purchases::router())
        .nest("/sales", sales::router())
        .nest("/reports", reports::router())
}

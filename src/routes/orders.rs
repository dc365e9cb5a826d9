use axum::{
    Extension,
    extract::State,
    response::IntoResponse,
};
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware,
    models::OrderEntity,
    service::orders::OrderView,
};

/// Defines all order routes with OpenAPI specs (checkout + history).
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(checkout))
            .routes(utoipa_axum::routes!(get_my_orders))
            .route_layer(axum::middleware::from_fn(middleware::users_authorization)),
    )
}

/// Convert the authenticated user's cart into a new order.
#[utoipa::path(
    post,
    path = "/checkout",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Checked out successfully", body = StdResponse<OrderEntity, String>)
    )
)]
async fn checkout(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders.checkout(user_id).await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Checked out successfully"),
    })
}

/// Fetch all orders belonging to the authenticated user.
#[utoipa::path(
    get,
    path = "/my-orders",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List my orders", body = StdResponse<Vec<OrderView>, String>)
    )
)]
async fn get_my_orders(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let orders = state.orders.my_orders(user_id).await?;

    Ok(StdResponse {
        data: Some(orders),
        message: Some("Get my orders successfully"),
    })
}

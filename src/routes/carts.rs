use axum::{
    Extension, Json,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware,
    service::cart::CartView,
};

/// Defines all cart routes with OpenAPI specs (mutations + authorization).
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/carts",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(add_item))
            .routes(utoipa_axum::routes!(remove_item))
            .routes(utoipa_axum::routes!(get_my_cart))
            .routes(utoipa_axum::routes!(get_item_count))
            .route_layer(axum::middleware::from_fn(middleware::users_authorization)),
    )
}

#[derive(Deserialize, ToSchema)]
struct AddItemReq {
    book_id: i32,
    /// Units to add, defaults to 1.
    qty: Option<i32>,
    /// When set, respond with a redirect to the cart page instead of the
    /// updated count.
    redirect: Option<bool>,
}

#[derive(Serialize, ToSchema)]
struct AddItemRes {
    cart_item_count: i64,
}

/// Add a book to the authenticated user's cart.
#[utoipa::path(
    post,
    path = "/items",
    tags = ["Carts"],
    security(("bearerAuth" = [])),
    request_body = AddItemReq,
    responses(
        (status = 200, description = "Added item to cart", body = StdResponse<AddItemRes, String>)
    )
)]
async fn add_item(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
    Json(body): Json<AddItemReq>,
) -> Result<Response, AppError> {
    let count = state
        .carts
        .add_item(user_id, body.book_id, body.qty.unwrap_or(1))
        .await?;

    if body.redirect.unwrap_or(false) {
        return Ok(Redirect::to("/carts/my-cart").into_response());
    }

    Ok(StdResponse {
        data: Some(AddItemRes {
            cart_item_count: count,
        }),
        message: Some("Added item to cart successfully"),
    }
    .into_response())
}

/// Remove one unit of a book from the authenticated user's cart.
#[utoipa::path(
    delete,
    path = "/items/{book_id}",
    tags = ["Carts"],
    security(("bearerAuth" = [])),
    params(
        ("book_id" = i32, Path, description = "Book ID to remove")
    ),
    responses(
        (status = 303, description = "Item removed, redirect to the cart page")
    )
)]
async fn remove_item(
    Path(book_id): Path<i32>,
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Redirect, AppError> {
    state.carts.remove_item(user_id, book_id).await?;
    Ok(Redirect::to("/carts/my-cart"))
}

/// Fetch the authenticated user's cart with book details.
#[utoipa::path(
    get,
    path = "/my-cart",
    tags = ["Carts"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Get cart successfully", body = StdResponse<CartView, String>)
    )
)]
async fn get_my_cart(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let cart = state.carts.get_cart(user_id).await?;

    Ok(StdResponse {
        data: Some(cart),
        message: Some("Get cart successfully"),
    })
}

#[derive(Serialize, ToSchema)]
struct ItemCountRes {
    cart_item_count: i64,
}

/// Distinct-line count of the authenticated user's cart, for the badge.
#[utoipa::path(
    get,
    path = "/item-count",
    tags = ["Carts"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Get item count successfully", body = StdResponse<ItemCountRes, String>)
    )
)]
async fn get_item_count(
    State(state): State<AppState>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let count = state.carts.item_count(user_id).await?;

    Ok(StdResponse {
        data: Some(ItemCountRes {
            cart_item_count: count,
        }),
        message: Some("Get item count successfully"),
    })
}

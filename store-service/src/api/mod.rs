pub mod admin;
pub mod catalog;
pub mod orders;

use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use uuid::Uuid;

use shared::Notice;

use crate::models::{Category, Product, Tag};
use crate::store::{OrderLine, OrderSummary, Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub upload_dir: PathBuf,
}

pub fn create_router(state: AppState) -> Router {
    let order_routes = Router::new()
        .route("/", get(orders::order_display))
        .route("/validate/:order_id", post(orders::validate_order))
        .route("/delete/:order_id", post(orders::delete_order))
        .route(
            "/reservation/delete/:reservation_id",
            post(orders::delete_reservation),
        );

    let admin_routes = Router::new()
        .route("/", get(admin::backoffice))
        .route("/pictures", get(admin::picture_backoffice))
        .route("/order-display", get(admin::order_display))
        .route("/validate/:order_id", post(admin::validate_order))
        .route("/delete/:order_id", post(admin::delete_order))
        .route(
            "/reservation/delete/:reservation_id",
            post(admin::delete_reservation),
        )
        .route("/product/create", post(admin::create_product))
        .route("/product/update/:product_id", post(admin::update_product))
        .route("/product/delete/:product_id", post(admin::delete_product))
        .route("/tag/create", post(admin::create_tags))
        .route("/tag/delete/:tag_id", post(admin::delete_tag))
        .route("/category/create", post(admin::create_category))
        .route("/category/delete/:category_id", post(admin::delete_category))
        .route("/categories/generate", post(admin::generate_categories));

    Router::new()
        .route("/", get(catalog::index))
        .route("/category/:category_name", get(catalog::index_category))
        .route("/tag/display/:tag_name", get(catalog::index_tag))
        .route("/product/display/:product_id", get(catalog::display_product))
        .route("/product/buy/:product_id", post(catalog::buy_product))
        .nest("/order", order_routes)
        .nest("/admin", admin_routes)
        .route("/health", get(health_check))
        .nest_service("/upload", ServeDir::new(&state.upload_dir))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

pub async fn health_check() -> &'static str {
    "OK"
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Infrastructure failures become an opaque 500; everything the user
/// can act on is reported through an [`ActionOutcome`] instead.
pub struct ApiError(anyhow::Error);

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!("request failed: {:#}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "internal server error".to_string(),
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Answer of every mutating endpoint: the notice to flash and the
/// route the client should land on next.
#[derive(Debug, Serialize)]
pub struct ActionOutcome {
    pub notice: Notice,
    pub next: String,
}

impl ActionOutcome {
    pub fn new(notice: Notice, next: impl Into<String>) -> Self {
        Self {
            notice,
            next: next.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

impl From<Category> for CategoryView {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TagView {
    pub id: Uuid,
    pub name: String,
}

impl From<Tag> for TagView {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductCard {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub stock: i32,
    pub category: String,
    pub thumbnail: String,
}

impl ProductCard {
    pub fn new(product: Product, category_name: Option<String>) -> Self {
        let thumbnail =
            shared::thumbnail_for(product.pic_address.as_deref(), category_name.as_deref());
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price,
            stock: product.stock,
            category: category_name.unwrap_or_else(|| "None".to_string()),
            thumbnail,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReservationLineView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
    pub line_total: BigDecimal,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<OrderLine> for ReservationLineView {
    fn from(line: OrderLine) -> Self {
        let line_total = shared::line_total(line.reservation.quantity, &line.product.price);
        Self {
            id: line.reservation.id,
            product_id: line.product.id,
            product_name: line.product.name,
            unit_price: line.product.price,
            quantity: line.reservation.quantity,
            line_total,
            created_at: line.reservation.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    pub lines: Vec<ReservationLineView>,
    pub total: BigDecimal,
}

impl From<OrderSummary> for OrderView {
    fn from(summary: OrderSummary) -> Self {
        Self {
            id: summary.order.id,
            user_id: summary.order.user_id,
            status: summary.order.status,
            created_at: summary.order.created_at,
            lines: summary
                .lines
                .into_iter()
                .map(ReservationLineView::from)
                .collect(),
            total: summary.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_outcome_serializes_notice_and_redirect_target() {
        let outcome = ActionOutcome::new(
            Notice::success("Order", "Your order has been validated."),
            "/order/",
        );
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["next"], "/order/");
        assert_eq!(value["notice"]["title"], "Order");
        assert_eq!(value["notice"]["tone"], "green");
    }

    #[test]
    fn product_card_falls_back_to_the_category_placeholder() {
        let product = Product {
            id: Uuid::new_v4(),
            name: "Chaise HAWAI anthracite".to_string(),
            description: "Pieds en métal".to_string(),
            price: BigDecimal::from(79),
            stock: 3,
            pic_address: None,
            category_id: None,
            created_at: None,
        };
        let card = ProductCard::new(product, Some("Chaise".to_string()));
        assert_eq!(card.thumbnail, "placeholder_chaise.jpg");
        assert_eq!(card.category, "Chaise");
    }

    #[test]
    fn product_card_without_category_reads_none() {
        let product = Product {
            id: Uuid::new_v4(),
            name: "Table Maecenas".to_string(),
            description: "Ceci est une Table".to_string(),
            price: BigDecimal::from(150),
            stock: 12,
            pic_address: Some("table-1.jpg".to_string()),
            category_id: None,
            created_at: None,
        };
        let card = ProductCard::new(product, None);
        assert_eq!(card.category, "None");
        assert_eq!(card.thumbnail, "upload/table-1.jpg");
    }
}

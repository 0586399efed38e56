use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::Notice;

use super::{
    ActionOutcome, ApiResult, AppState, CategoryView, ProductCard, TagView,
};
use crate::auth::CurrentUser;
use crate::store::ReserveOutcome;

/// Title block of a catalog page; real categories and the synthetic
/// index/tag headers both render through it.
#[derive(Debug, Serialize)]
pub struct PageHeading {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct CatalogPage {
    pub time: DateTime<Utc>,
    pub category: PageHeading,
    pub categories: Vec<CategoryView>,
    pub products: Vec<ProductCard>,
}

#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub time: DateTime<Utc>,
    pub categories: Vec<CategoryView>,
    pub product: ProductDetailView,
}

#[derive(Debug, Serialize)]
pub struct ProductDetailView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: bigdecimal::BigDecimal,
    pub stock: i32,
    pub category: String,
    pub thumbnail: String,
    pub pic_address: Option<String>,
    pub tags: Vec<TagView>,
}

#[derive(Debug, Deserialize)]
pub struct BuyForm {
    pub quantity: i32,
}

fn back_to_index() -> Json<ActionOutcome> {
    Json(ActionOutcome::new(
        Notice::refused("Catalog", "This page does not exist."),
        "/",
    ))
}

pub async fn index(State(state): State<AppState>) -> ApiResult<Json<CatalogPage>> {
    let categories = state.store.categories().await?;
    let products = state.store.catalog().await?;
    Ok(Json(CatalogPage {
        time: shared::tell_time(),
        category: PageHeading {
            name: "Storefront".to_string(),
            description: "Welcome to the shop front page!".to_string(),
        },
        categories: categories.into_iter().map(CategoryView::from).collect(),
        products: products
            .into_iter()
            .map(|(product, category)| {
                let name = category.map(|c| c.name);
                ProductCard::new(product, name)
            })
            .collect(),
    }))
}

pub async fn index_category(
    State(state): State<AppState>,
    Path(category_name): Path<String>,
) -> ApiResult<Response> {
    let Some((category, products)) = state.store.category_with_products(&category_name).await?
    else {
        return Ok(back_to_index().into_response());
    };
    let categories = state.store.categories().await?;
    let heading = PageHeading {
        name: category.name.clone(),
        description: category.description.clone(),
    };
    let page = CatalogPage {
        time: shared::tell_time(),
        category: heading,
        categories: categories.into_iter().map(CategoryView::from).collect(),
        products: products
            .into_iter()
            .map(|product| ProductCard::new(product, Some(category.name.clone())))
            .collect(),
    };
    Ok(Json(page).into_response())
}

pub async fn index_tag(
    State(state): State<AppState>,
    Path(tag_name): Path<String>,
) -> ApiResult<Response> {
    let Some((tag, products)) = state.store.tag_with_products(&tag_name).await? else {
        return Ok(back_to_index().into_response());
    };
    let categories = state.store.categories().await?;
    let page = CatalogPage {
        time: shared::tell_time(),
        category: PageHeading {
            name: tag.name.clone(),
            description: format!("Every product tagged {}.", tag.name),
        },
        categories: categories.into_iter().map(CategoryView::from).collect(),
        products: products
            .into_iter()
            .map(|product| ProductCard::new(product, None))
            .collect(),
    };
    Ok(Json(page).into_response())
}

pub async fn display_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> ApiResult<Response> {
    let Some((product, category, tags)) = state.store.product_detail(product_id).await? else {
        return Ok(back_to_index().into_response());
    };
    let categories = state.store.categories().await?;
    let category_name = category.map(|c| c.name);
    let thumbnail =
        shared::thumbnail_for(product.pic_address.as_deref(), category_name.as_deref());
    let page = ProductPage {
        time: shared::tell_time(),
        categories: categories.into_iter().map(CategoryView::from).collect(),
        product: ProductDetailView {
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price,
            stock: product.stock,
            category: category_name.unwrap_or_else(|| "None".to_string()),
            thumbnail,
            pic_address: product.pic_address,
            tags: tags.into_iter().map(TagView::from).collect(),
        },
    };
    Ok(Json(page).into_response())
}

/// The buy form of the product page: reserves the requested quantity
/// for the customer's cart, capped at the available stock.
pub async fn buy_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(form): Json<BuyForm>,
) -> ApiResult<Json<ActionOutcome>> {
    let back_to_product = format!("/product/display/{product_id}");
    let outcome = state
        .store
        .reserve_product(product_id, user.id, form.quantity)
        .await?;

    let outcome = match outcome {
        ReserveOutcome::Granted {
            grant, requested, ..
        } => {
            let notice = if grant.is_partial(requested) {
                Notice::warning(
                    "Purchase",
                    format!(
                        "Insufficient stock, the remaining {} item(s) were attributed to your order.",
                        grant.granted
                    ),
                )
            } else {
                Notice::success(
                    "Purchase",
                    format!(
                        "Your order has been placed. You reserved {} item(s).",
                        grant.granted
                    ),
                )
            };
            ActionOutcome::new(notice, back_to_product)
        }
        ReserveOutcome::OutOfStock => ActionOutcome::new(
            Notice::refused("Purchase", "This product is out of stock."),
            back_to_product,
        ),
        ReserveOutcome::InvalidQuantity => ActionOutcome::new(
            Notice::refused("Purchase", "Quantity must be at least 1."),
            back_to_product,
        ),
        ReserveOutcome::ProductNotFound => ActionOutcome::new(
            Notice::refused("Purchase", "This product does not exist."),
            "/",
        ),
    };
    Ok(Json(outcome))
}

use std::path::Path as FilePath;

use axum::{
    extract::{Path, State},
    Json,
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use shared::Notice;

use super::{ActionOutcome, ApiResult, AppState, CategoryView, OrderView, ProductCard, TagView};
use crate::auth::AdminUser;
use crate::fixtures::CATEGORY_DESCRIPTION;
use crate::store::{
    OrderActionOutcome, ProductDeleteOutcome, ProductDraft, ProductSaveOutcome,
    ReservationCancelOutcome,
};

const BACKOFFICE: &str = "/admin/";
const PICTURE_BACKOFFICE: &str = "/admin/pictures";
const ORDER_DASHBOARD: &str = "/admin/order-display";

#[derive(Debug, Serialize)]
pub struct BackofficePage {
    pub time: DateTime<Utc>,
    pub categories: Vec<CategoryView>,
    pub products: Vec<ProductCard>,
}

#[derive(Debug, Serialize)]
pub struct PictureBackofficePage {
    pub time: DateTime<Utc>,
    pub categories: Vec<CategoryView>,
    pub products: Vec<ProductCard>,
    pub tags: Vec<TagView>,
}

#[derive(Debug, Serialize)]
pub struct AdminOrderDashboard {
    pub time: DateTime<Utc>,
    pub categories: Vec<CategoryView>,
    pub active_orders: Vec<OrderView>,
    pub archived_orders: Vec<OrderView>,
}

#[derive(Debug, Deserialize)]
pub struct ProductForm {
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub stock: i32,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<Uuid>,
    pub pic_address: Option<String>,
    #[serde(default)]
    pub delete_image: bool,
}

impl ProductForm {
    fn into_draft(self) -> ProductDraft {
        ProductDraft {
            name: self.name,
            description: self.description,
            price: self.price,
            stock: self.stock,
            category_id: self.category_id,
            tag_ids: self.tags,
            pic_address: self.pic_address.as_deref().and_then(sanitize_pic),
        }
    }
}

/// Image references are stored as bare file names; anything carrying a
/// path component is reduced to its final segment.
fn sanitize_pic(name: &str) -> Option<String> {
    FilePath::new(name)
        .file_name()
        .and_then(|segment| segment.to_str())
        .map(|segment| segment.to_string())
}

/// Up to five tag names created in one submission.
#[derive(Debug, Deserialize)]
pub struct TagsForm {
    pub tag1: Option<String>,
    pub tag2: Option<String>,
    pub tag3: Option<String>,
    pub tag4: Option<String>,
    pub tag5: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    pub name: String,
    pub description: String,
}

async fn product_cards(state: &AppState) -> ApiResult<Vec<ProductCard>> {
    let products = state.store.catalog().await?;
    Ok(products
        .into_iter()
        .map(|(product, category)| {
            let name = category.map(|c| c.name);
            ProductCard::new(product, name)
        })
        .collect())
}

pub async fn backoffice(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<Json<BackofficePage>> {
    let categories = state.store.categories().await?;
    let products = product_cards(&state).await?;
    Ok(Json(BackofficePage {
        time: shared::tell_time(),
        categories: categories.into_iter().map(CategoryView::from).collect(),
        products,
    }))
}

pub async fn picture_backoffice(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<Json<PictureBackofficePage>> {
    let categories = state.store.categories().await?;
    let products = product_cards(&state).await?;
    let tags = state.store.tags().await?;
    Ok(Json(PictureBackofficePage {
        time: shared::tell_time(),
        categories: categories.into_iter().map(CategoryView::from).collect(),
        products,
        tags: tags.into_iter().map(TagView::from).collect(),
    }))
}

pub async fn order_display(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<Json<AdminOrderDashboard>> {
    let categories = state.store.categories().await?;
    let (active, archived) = state.store.all_orders().await?;
    Ok(Json(AdminOrderDashboard {
        time: shared::tell_time(),
        categories: categories.into_iter().map(CategoryView::from).collect(),
        active_orders: active.into_iter().map(OrderView::from).collect(),
        archived_orders: archived.into_iter().map(OrderView::from).collect(),
    }))
}

pub async fn validate_order(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<ActionOutcome>> {
    let notice = match state.store.validate_order(order_id, None).await? {
        OrderActionOutcome::Done => Notice::success("Order", "The order has been validated."),
        OrderActionOutcome::Refused => Notice::refused("Order", "This order cannot be validated."),
    };
    Ok(Json(ActionOutcome::new(notice, ORDER_DASHBOARD)))
}

pub async fn delete_order(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<ActionOutcome>> {
    let notice = match state.store.cancel_order(order_id, None).await? {
        OrderActionOutcome::Done => {
            Notice::success("Order", "The order has been cancelled and its stock returned.")
        }
        OrderActionOutcome::Refused => Notice::refused("Order", "This order cannot be cancelled."),
    };
    Ok(Json(ActionOutcome::new(notice, ORDER_DASHBOARD)))
}

pub async fn delete_reservation(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(reservation_id): Path<Uuid>,
) -> ApiResult<Json<ActionOutcome>> {
    let notice = match state.store.cancel_reservation(reservation_id, None).await? {
        ReservationCancelOutcome::Cancelled { order_deleted: true } => Notice::success(
            "Reservation",
            "This reservation has been removed; the emptied order was removed as well.",
        ),
        ReservationCancelOutcome::Cancelled {
            order_deleted: false,
        } => Notice::success("Reservation", "This reservation has been removed."),
        ReservationCancelOutcome::Refused => {
            Notice::refused("Reservation", "This reservation cannot be removed.")
        }
    };
    Ok(Json(ActionOutcome::new(notice, ORDER_DASHBOARD)))
}

pub async fn create_product(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(form): Json<ProductForm>,
) -> ApiResult<Json<ActionOutcome>> {
    let has_image = form.pic_address.is_some();
    let outcome = state.store.create_product(form.into_draft()).await?;
    let notice = match outcome {
        ProductSaveOutcome::Saved(product) => {
            let message = if has_image {
                format!("Product {} has been created with its image file.", product.name)
            } else {
                format!("Product {} has been created.", product.name)
            };
            Notice::success("Product", message)
        }
        ProductSaveOutcome::PriceTooLow => {
            Notice::refused("Product", "A product must cost at least 1 to be persisted.")
        }
        ProductSaveOutcome::NotFound => Notice::refused("Product", "This product does not exist."),
    };
    Ok(Json(ActionOutcome::new(notice, BACKOFFICE)))
}

pub async fn update_product(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(product_id): Path<Uuid>,
    Json(form): Json<ProductForm>,
) -> ApiResult<Json<ActionOutcome>> {
    // The delete-image checkbox short-circuits the rest of the form.
    if form.delete_image {
        let Some(product) = state.store.product_by_id(product_id).await? else {
            return Ok(Json(ActionOutcome::new(
                Notice::refused("Product", "This product does not exist."),
                BACKOFFICE,
            )));
        };
        let notice = match product.pic_address {
            Some(pic) => match tokio::fs::remove_file(state.upload_dir.join(&pic)).await {
                Ok(()) => {
                    state.store.set_product_image(product_id, None).await?;
                    Notice::success("Image", "The image file has been removed.")
                }
                Err(err) => {
                    warn!(product_id = %product_id, pic = %pic, "image removal failed: {err}");
                    Notice::refused("Image", "The image file could not be removed.")
                }
            },
            None => Notice::warning("Image", "This product has no image to remove."),
        };
        return Ok(Json(ActionOutcome::new(notice, PICTURE_BACKOFFICE)));
    }

    let outcome = state
        .store
        .update_product(product_id, form.into_draft())
        .await?;
    let notice = match outcome {
        ProductSaveOutcome::Saved(product) => {
            Notice::success("Product", format!("Product {} has been updated.", product.name))
        }
        ProductSaveOutcome::PriceTooLow => {
            Notice::refused("Product", "A product must cost at least 1 to be persisted.")
        }
        ProductSaveOutcome::NotFound => Notice::refused("Product", "This product does not exist."),
    };
    Ok(Json(ActionOutcome::new(notice, BACKOFFICE)))
}

pub async fn delete_product(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(product_id): Path<Uuid>,
) -> ApiResult<Json<ActionOutcome>> {
    let notice = match state.store.delete_product(product_id).await? {
        ProductDeleteOutcome::Deleted => Notice::success("Product", "The product has been deleted."),
        ProductDeleteOutcome::HasReservations => Notice::refused(
            "Product",
            "This product still has reservations and cannot be deleted.",
        ),
        ProductDeleteOutcome::NotFound => {
            Notice::refused("Product", "This product does not exist.")
        }
    };
    Ok(Json(ActionOutcome::new(notice, BACKOFFICE)))
}

pub async fn create_tags(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(form): Json<TagsForm>,
) -> ApiResult<Json<ActionOutcome>> {
    let entries = [form.tag1, form.tag2, form.tag3, form.tag4, form.tag5];
    let names = shared::dedupe_tag_names(&entries);
    let created = state.store.create_tags(&names).await?;
    let notice = Notice::success("Tags", format!("{created} tag(s) created."));
    Ok(Json(ActionOutcome::new(notice, BACKOFFICE)))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(tag_id): Path<Uuid>,
) -> ApiResult<Json<ActionOutcome>> {
    let notice = if state.store.delete_tag(tag_id).await? {
        Notice::success("Tags", "The tag has been deleted.")
    } else {
        Notice::refused("Tags", "This tag does not exist.")
    };
    Ok(Json(ActionOutcome::new(notice, BACKOFFICE)))
}

pub async fn create_category(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(form): Json<CategoryForm>,
) -> ApiResult<Json<ActionOutcome>> {
    let category = state
        .store
        .create_category(&form.name, &form.description)
        .await?;
    let notice = Notice::success(
        "Categories",
        format!("Category {} has been created.", category.name),
    );
    Ok(Json(ActionOutcome::new(notice, BACKOFFICE)))
}

pub async fn delete_category(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(category_id): Path<Uuid>,
) -> ApiResult<Json<ActionOutcome>> {
    let notice = if state.store.delete_category(category_id).await? {
        Notice::success("Categories", "The category has been deleted.")
    } else {
        Notice::refused("Categories", "This category does not exist.")
    };
    Ok(Json(ActionOutcome::new(notice, BACKOFFICE)))
}

pub async fn generate_categories(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<Json<ActionOutcome>> {
    let reclassified = state
        .store
        .regenerate_categories(CATEGORY_DESCRIPTION)
        .await?;
    let notice = Notice::success(
        "Categories",
        format!("The categories have been regenerated; {reclassified} product(s) reattached."),
    );
    Ok(Json(ActionOutcome::new(notice, BACKOFFICE)))
}

#[cfg(test)]
mod tests {
    use super::sanitize_pic;

    #[test]
    fn pic_references_are_reduced_to_bare_file_names() {
        assert_eq!(sanitize_pic("sofa-1.jpg").as_deref(), Some("sofa-1.jpg"));
        assert_eq!(sanitize_pic("a/b/sofa-1.jpg").as_deref(), Some("sofa-1.jpg"));
        assert_eq!(sanitize_pic("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_pic(".."), None);
    }
}

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use shared::Notice;

use super::{ActionOutcome, ApiResult, AppState, CategoryView, OrderView};
use crate::auth::CurrentUser;
use crate::store::{OrderActionOutcome, ReservationCancelOutcome};

const DASHBOARD: &str = "/order/";

#[derive(Debug, Serialize)]
pub struct OrderDashboard {
    pub time: DateTime<Utc>,
    pub categories: Vec<CategoryView>,
    pub active_order: Option<OrderView>,
    pub archived_orders: Vec<OrderView>,
}

/// The customer dashboard: the open cart plus the validated history.
pub async fn order_display(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<OrderDashboard>> {
    let categories = state.store.categories().await?;
    let (active, archived) = state.store.user_orders(user.id).await?;
    Ok(Json(OrderDashboard {
        time: shared::tell_time(),
        categories: categories.into_iter().map(CategoryView::from).collect(),
        active_order: active.map(OrderView::from),
        archived_orders: archived.into_iter().map(OrderView::from).collect(),
    }))
}

pub async fn validate_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<ActionOutcome>> {
    let notice = match state.store.validate_order(order_id, Some(user.id)).await? {
        OrderActionOutcome::Done => Notice::success("Order", "Your order has been validated."),
        OrderActionOutcome::Refused => {
            Notice::refused("Order", "This order cannot be validated.")
        }
    };
    Ok(Json(ActionOutcome::new(notice, DASHBOARD)))
}

pub async fn delete_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<ActionOutcome>> {
    let notice = match state.store.cancel_order(order_id, Some(user.id)).await? {
        OrderActionOutcome::Done => {
            Notice::success("Order", "Your order has been cancelled and its stock returned.")
        }
        OrderActionOutcome::Refused => {
            Notice::refused("Order", "This order cannot be cancelled.")
        }
    };
    Ok(Json(ActionOutcome::new(notice, DASHBOARD)))
}

pub async fn delete_reservation(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(reservation_id): Path<Uuid>,
) -> ApiResult<Json<ActionOutcome>> {
    let notice = match state
        .store
        .cancel_reservation(reservation_id, Some(user.id))
        .await?
    {
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
    Ok(Json(ActionOutcome::new(notice, DASHBOARD)))
}

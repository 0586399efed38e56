use std::collections::HashMap;

use anyhow::Result;
use bigdecimal::BigDecimal;
use diesel::prelude::*;
use diesel_async::{pooled_connection::bb8::Pool, AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::info;
use uuid::Uuid;

use shared::{grant_stock, order_total, OrderStatus, Role, StockGrant};

use crate::models::*;
use crate::schema::*;

pub type DbPool = Pool<AsyncPgConnection>;

/// All persistence operations of the storefront, one method per
/// user-visible action.
#[derive(Clone)]
pub struct Store {
    pool: DbPool,
}

#[derive(Debug)]
pub enum ReserveOutcome {
    Granted {
        grant: StockGrant,
        requested: i32,
        order_id: Uuid,
    },
    OutOfStock,
    InvalidQuantity,
    ProductNotFound,
}

#[derive(Debug, PartialEq, Eq)]
pub enum OrderActionOutcome {
    Done,
    Refused,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ReservationCancelOutcome {
    Cancelled { order_deleted: bool },
    Refused,
}

#[derive(Debug)]
pub enum ProductSaveOutcome {
    Saved(Product),
    PriceTooLow,
    NotFound,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ProductDeleteOutcome {
    Deleted,
    HasReservations,
    NotFound,
}

/// Form contents for a product create/update.
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub stock: i32,
    pub category_id: Option<Uuid>,
    pub tag_ids: Vec<Uuid>,
    pub pic_address: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OrderLine {
    pub reservation: Reservation,
    pub product: Product,
}

#[derive(Debug, Clone)]
pub struct OrderSummary {
    pub order: Order,
    pub lines: Vec<OrderLine>,
    pub total: BigDecimal,
}

fn order_is_actionable(order: &Order, acting_user: Option<Uuid>) -> bool {
    let open = order
        .status
        .parse::<OrderStatus>()
        .map(|status| status.is_open())
        .unwrap_or(false);
    open && acting_user.map_or(true, |user_id| user_id == order.user_id)
}

impl Store {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    // ---- principals -------------------------------------------------

    pub async fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let mut conn = self.pool.get().await?;
        let user = users::table
            .filter(users::id.eq(id))
            .first::<User>(&mut conn)
            .await
            .optional()?;
        Ok(user)
    }

    pub async fn create_user(&self, email: &str, display_name: &str, role: Role) -> Result<User> {
        let mut conn = self.pool.get().await?;
        let new_user = NewUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
            display_name: display_name.to_string(),
            role: role.as_str().to_string(),
        };
        let user = diesel::insert_into(users::table)
            .values(&new_user)
            .get_result::<User>(&mut conn)
            .await?;
        Ok(user)
    }

    // ---- catalog ----------------------------------------------------

    pub async fn categories(&self) -> Result<Vec<Category>> {
        let mut conn = self.pool.get().await?;
        let list = categories::table
            .order(categories::name.asc())
            .load::<Category>(&mut conn)
            .await?;
        Ok(list)
    }

    pub async fn catalog(&self) -> Result<Vec<(Product, Option<Category>)>> {
        let mut conn = self.pool.get().await?;
        let list = products::table
            .left_join(categories::table)
            .order((products::created_at.desc(), products::name.asc()))
            .load::<(Product, Option<Category>)>(&mut conn)
            .await?;
        Ok(list)
    }

    pub async fn category_with_products(&self, name: &str) -> Result<Option<(Category, Vec<Product>)>> {
        let mut conn = self.pool.get().await?;
        let category = categories::table
            .filter(categories::name.eq(name))
            .first::<Category>(&mut conn)
            .await
            .optional()?;
        let Some(category) = category else {
            return Ok(None);
        };
        let list = products::table
            .filter(products::category_id.eq(category.id))
            .order(products::name.asc())
            .load::<Product>(&mut conn)
            .await?;
        Ok(Some((category, list)))
    }

    pub async fn tag_with_products(&self, name: &str) -> Result<Option<(Tag, Vec<Product>)>> {
        let mut conn = self.pool.get().await?;
        let tag = tags::table
            .filter(tags::name.eq(name))
            .first::<Tag>(&mut conn)
            .await
            .optional()?;
        let Some(tag) = tag else {
            return Ok(None);
        };
        let list = product_tags::table
            .inner_join(products::table)
            .filter(product_tags::tag_id.eq(tag.id))
            .select(products::all_columns)
            .order(products::name.asc())
            .load::<Product>(&mut conn)
            .await?;
        Ok(Some((tag, list)))
    }

    pub async fn product_by_id(&self, id: Uuid) -> Result<Option<Product>> {
        let mut conn = self.pool.get().await?;
        let product = products::table
            .filter(products::id.eq(id))
            .first::<Product>(&mut conn)
            .await
            .optional()?;
        Ok(product)
    }

    pub async fn product_detail(
        &self,
        id: Uuid,
    ) -> Result<Option<(Product, Option<Category>, Vec<Tag>)>> {
        let mut conn = self.pool.get().await?;
        let row = products::table
            .left_join(categories::table)
            .filter(products::id.eq(id))
            .first::<(Product, Option<Category>)>(&mut conn)
            .await
            .optional()?;
        let Some((product, category)) = row else {
            return Ok(None);
        };
        let product_tag_list = product_tags::table
            .inner_join(tags::table)
            .filter(product_tags::product_id.eq(product.id))
            .select(tags::all_columns)
            .order(tags::name.asc())
            .load::<Tag>(&mut conn)
            .await?;
        Ok(Some((product, category, product_tag_list)))
    }

    pub async fn tags(&self) -> Result<Vec<Tag>> {
        let mut conn = self.pool.get().await?;
        let list = tags::table
            .order(tags::name.asc())
            .load::<Tag>(&mut conn)
            .await?;
        Ok(list)
    }

    pub async fn count_products(&self) -> Result<i64> {
        let mut conn = self.pool.get().await?;
        let count = products::table
            .count()
            .get_result::<i64>(&mut conn)
            .await?;
        Ok(count)
    }

    // ---- reservations and orders ------------------------------------

    /// Applies a purchase request: caps the grant at the available
    /// stock, decrements it and attaches the reservation to the
    /// customer's open cart, creating the cart when there is none.
    ///
    /// The read-modify-write runs in one transaction with a row lock on
    /// the product, so two purchases of the last unit cannot both win.
    pub async fn reserve_product(
        &self,
        product_id: Uuid,
        user_id: Uuid,
        requested: i32,
    ) -> Result<ReserveOutcome> {
        if requested < 1 {
            return Ok(ReserveOutcome::InvalidQuantity);
        }
        let mut conn = self.pool.get().await?;
        let outcome = conn
            .transaction::<_, anyhow::Error, _>(|conn| {
                Box::pin(async move {
                    let product = products::table
                        .filter(products::id.eq(product_id))
                        .for_update()
                        .first::<Product>(conn)
                        .await
                        .optional()?;
                    let Some(product) = product else {
                        return Ok(ReserveOutcome::ProductNotFound);
                    };
                    if product.stock <= 0 {
                        return Ok(ReserveOutcome::OutOfStock);
                    }

                    let grant = grant_stock(product.stock, requested);
                    diesel::update(products::table.filter(products::id.eq(product_id)))
                        .set(products::stock.eq(products::stock - grant.granted))
                        .execute(conn)
                        .await?;

                    let open_order = orders::table
                        .filter(orders::user_id.eq(user_id))
                        .filter(orders::status.eq(OrderStatus::Panier.as_str()))
                        .order(orders::created_at.desc())
                        .first::<Order>(conn)
                        .await
                        .optional()?;
                    let order_id = match open_order {
                        Some(order) => order.id,
                        None => {
                            let new_order = NewOrder {
                                id: Uuid::new_v4(),
                                user_id,
                                status: OrderStatus::Panier.as_str().to_string(),
                            };
                            diesel::insert_into(orders::table)
                                .values(&new_order)
                                .execute(conn)
                                .await?;
                            new_order.id
                        }
                    };

                    let reservation = NewReservation {
                        id: Uuid::new_v4(),
                        order_id,
                        product_id,
                        quantity: grant.granted,
                    };
                    diesel::insert_into(reservations::table)
                        .values(&reservation)
                        .execute(conn)
                        .await?;

                    Ok(ReserveOutcome::Granted {
                        grant,
                        requested,
                        order_id,
                    })
                })
            })
            .await?;

        if let ReserveOutcome::Granted { grant, order_id, .. } = &outcome {
            info!(
                product_id = %product_id,
                order_id = %order_id,
                granted = grant.granted,
                remaining = grant.remaining,
                "reserved stock"
            );
        }
        Ok(outcome)
    }

    async fn summarize_orders(
        conn: &mut AsyncPgConnection,
        orders_list: Vec<Order>,
    ) -> Result<Vec<OrderSummary>> {
        let order_ids: Vec<Uuid> = orders_list.iter().map(|order| order.id).collect();
        let rows = reservations::table
            .inner_join(products::table)
            .filter(reservations::order_id.eq_any(order_ids))
            .order(reservations::created_at.asc())
            .load::<(Reservation, Product)>(conn)
            .await?;

        let mut lines_by_order: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
        for (reservation, product) in rows {
            lines_by_order
                .entry(reservation.order_id)
                .or_default()
                .push(OrderLine {
                    reservation,
                    product,
                });
        }

        Ok(orders_list
            .into_iter()
            .map(|order| {
                let lines = lines_by_order.remove(&order.id).unwrap_or_default();
                let total = order_total(
                    lines
                        .iter()
                        .map(|line| (line.reservation.quantity, &line.product.price)),
                );
                OrderSummary {
                    order,
                    lines,
                    total,
                }
            })
            .collect())
    }

    /// The customer dashboard: the newest open cart plus the validated
    /// order history, newest first.
    pub async fn user_orders(
        &self,
        user_id: Uuid,
    ) -> Result<(Option<OrderSummary>, Vec<OrderSummary>)> {
        let mut conn = self.pool.get().await?;
        let active = orders::table
            .filter(orders::user_id.eq(user_id))
            .filter(orders::status.eq(OrderStatus::Panier.as_str()))
            .order(orders::created_at.desc())
            .first::<Order>(&mut conn)
            .await
            .optional()?;
        let archived = orders::table
            .filter(orders::user_id.eq(user_id))
            .filter(orders::status.eq(OrderStatus::Validee.as_str()))
            .order(orders::created_at.desc())
            .load::<Order>(&mut conn)
            .await?;

        let mut active_summary = Self::summarize_orders(&mut conn, active.into_iter().collect()).await?;
        let archived_summaries = Self::summarize_orders(&mut conn, archived).await?;
        Ok((active_summary.pop(), archived_summaries))
    }

    /// The admin view of every order, open carts and validated orders.
    pub async fn all_orders(&self) -> Result<(Vec<OrderSummary>, Vec<OrderSummary>)> {
        let mut conn = self.pool.get().await?;
        let active = orders::table
            .filter(orders::status.eq(OrderStatus::Panier.as_str()))
            .order(orders::created_at.desc())
            .load::<Order>(&mut conn)
            .await?;
        let archived = orders::table
            .filter(orders::status.eq(OrderStatus::Validee.as_str()))
            .order(orders::created_at.desc())
            .load::<Order>(&mut conn)
            .await?;

        let active_summaries = Self::summarize_orders(&mut conn, active).await?;
        let archived_summaries = Self::summarize_orders(&mut conn, archived).await?;
        Ok((active_summaries, archived_summaries))
    }

    /// Finalizes a cart. `acting_user` scopes the action to the order's
    /// owner; admins pass `None`. A missing, already validated or
    /// foreign order refuses the transition.
    pub async fn validate_order(
        &self,
        order_id: Uuid,
        acting_user: Option<Uuid>,
    ) -> Result<OrderActionOutcome> {
        let mut conn = self.pool.get().await?;
        let order = orders::table
            .filter(orders::id.eq(order_id))
            .first::<Order>(&mut conn)
            .await
            .optional()?;
        let Some(order) = order else {
            return Ok(OrderActionOutcome::Refused);
        };
        if !order_is_actionable(&order, acting_user) {
            return Ok(OrderActionOutcome::Refused);
        }

        let updated = diesel::update(
            orders::table
                .filter(orders::id.eq(order_id))
                .filter(orders::status.eq(OrderStatus::Panier.as_str())),
        )
        .set(orders::status.eq(OrderStatus::Validee.as_str()))
        .execute(&mut conn)
        .await?;

        if updated == 1 {
            info!(order_id = %order_id, "order validated");
            Ok(OrderActionOutcome::Done)
        } else {
            Ok(OrderActionOutcome::Refused)
        }
    }

    /// Cancels a whole cart: every reservation returns its quantity to
    /// its product before the order and its lines are deleted.
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        acting_user: Option<Uuid>,
    ) -> Result<OrderActionOutcome> {
        let mut conn = self.pool.get().await?;
        let outcome = conn
            .transaction::<_, anyhow::Error, _>(|conn| {
                Box::pin(async move {
                    let order = orders::table
                        .filter(orders::id.eq(order_id))
                        .for_update()
                        .first::<Order>(conn)
                        .await
                        .optional()?;
                    let Some(order) = order else {
                        return Ok(OrderActionOutcome::Refused);
                    };
                    if !order_is_actionable(&order, acting_user) {
                        return Ok(OrderActionOutcome::Refused);
                    }

                    let lines = reservations::table
                        .filter(reservations::order_id.eq(order_id))
                        .load::<Reservation>(conn)
                        .await?;
                    for line in &lines {
                        diesel::update(products::table.filter(products::id.eq(line.product_id)))
                            .set(products::stock.eq(products::stock + line.quantity))
                            .execute(conn)
                            .await?;
                    }
                    diesel::delete(reservations::table.filter(reservations::order_id.eq(order_id)))
                        .execute(conn)
                        .await?;
                    diesel::delete(orders::table.filter(orders::id.eq(order_id)))
                        .execute(conn)
                        .await?;

                    info!(order_id = %order_id, lines = lines.len(), "order cancelled");
                    Ok(OrderActionOutcome::Done)
                })
            })
            .await?;
        Ok(outcome)
    }

    /// Cancels a single order line: the quantity returns to the
    /// product's stock, and a cart left empty is deleted with it.
    pub async fn cancel_reservation(
        &self,
        reservation_id: Uuid,
        acting_user: Option<Uuid>,
    ) -> Result<ReservationCancelOutcome> {
        let mut conn = self.pool.get().await?;
        let outcome = conn
            .transaction::<_, anyhow::Error, _>(|conn| {
                Box::pin(async move {
                    let reservation = reservations::table
                        .filter(reservations::id.eq(reservation_id))
                        .first::<Reservation>(conn)
                        .await
                        .optional()?;
                    let Some(reservation) = reservation else {
                        return Ok(ReservationCancelOutcome::Refused);
                    };
                    let order = orders::table
                        .filter(orders::id.eq(reservation.order_id))
                        .for_update()
                        .first::<Order>(conn)
                        .await
                        .optional()?;
                    let Some(order) = order else {
                        return Ok(ReservationCancelOutcome::Refused);
                    };
                    if !order_is_actionable(&order, acting_user) {
                        return Ok(ReservationCancelOutcome::Refused);
                    }

                    diesel::update(
                        products::table.filter(products::id.eq(reservation.product_id)),
                    )
                    .set(products::stock.eq(products::stock + reservation.quantity))
                    .execute(conn)
                    .await?;
                    diesel::delete(reservations::table.filter(reservations::id.eq(reservation_id)))
                        .execute(conn)
                        .await?;

                    let remaining = reservations::table
                        .filter(reservations::order_id.eq(order.id))
                        .count()
                        .get_result::<i64>(conn)
                        .await?;
                    let order_deleted = remaining == 0;
                    if order_deleted {
                        diesel::delete(orders::table.filter(orders::id.eq(order.id)))
                            .execute(conn)
                            .await?;
                    }

                    info!(
                        reservation_id = %reservation_id,
                        order_id = %order.id,
                        order_deleted,
                        "reservation cancelled"
                    );
                    Ok(ReservationCancelOutcome::Cancelled { order_deleted })
                })
            })
            .await?;
        Ok(outcome)
    }

    // ---- backoffice: products ---------------------------------------

    pub async fn create_product(&self, draft: ProductDraft) -> Result<ProductSaveOutcome> {
        if !shared::price_is_sellable(&draft.price) {
            return Ok(ProductSaveOutcome::PriceTooLow);
        }
        let mut conn = self.pool.get().await?;
        let product = conn
            .transaction::<_, anyhow::Error, _>(|conn| {
                Box::pin(async move {
                    let new_product = NewProduct {
                        id: Uuid::new_v4(),
                        name: draft.name,
                        description: draft.description,
                        price: draft.price,
                        stock: draft.stock.max(0),
                        pic_address: draft.pic_address,
                        category_id: draft.category_id,
                    };
                    let product = diesel::insert_into(products::table)
                        .values(&new_product)
                        .get_result::<Product>(conn)
                        .await?;

                    let links: Vec<ProductTag> = draft
                        .tag_ids
                        .iter()
                        .map(|tag_id| ProductTag {
                            product_id: product.id,
                            tag_id: *tag_id,
                        })
                        .collect();
                    if !links.is_empty() {
                        diesel::insert_into(product_tags::table)
                            .values(&links)
                            .execute(conn)
                            .await?;
                    }
                    Ok(product)
                })
            })
            .await?;
        info!(product_id = %product.id, "product created");
        Ok(ProductSaveOutcome::Saved(product))
    }

    pub async fn update_product(&self, id: Uuid, draft: ProductDraft) -> Result<ProductSaveOutcome> {
        if !shared::price_is_sellable(&draft.price) {
            return Ok(ProductSaveOutcome::PriceTooLow);
        }
        let mut conn = self.pool.get().await?;
        let outcome = conn
            .transaction::<_, anyhow::Error, _>(|conn| {
                Box::pin(async move {
                    let existing = products::table
                        .filter(products::id.eq(id))
                        .first::<Product>(conn)
                        .await
                        .optional()?;
                    if existing.is_none() {
                        return Ok(ProductSaveOutcome::NotFound);
                    }

                    let base_update = diesel::update(products::table.filter(products::id.eq(id)));
                    let product = match draft.pic_address {
                        Some(pic) => {
                            base_update
                                .set((
                                    products::name.eq(draft.name),
                                    products::description.eq(draft.description),
                                    products::price.eq(draft.price),
                                    products::stock.eq(draft.stock.max(0)),
                                    products::category_id.eq(draft.category_id),
                                    products::pic_address.eq(Some(pic)),
                                ))
                                .get_result::<Product>(conn)
                                .await?
                        }
                        None => {
                            base_update
                                .set((
                                    products::name.eq(draft.name),
                                    products::description.eq(draft.description),
                                    products::price.eq(draft.price),
                                    products::stock.eq(draft.stock.max(0)),
                                    products::category_id.eq(draft.category_id),
                                ))
                                .get_result::<Product>(conn)
                                .await?
                        }
                    };

                    diesel::delete(product_tags::table.filter(product_tags::product_id.eq(id)))
                        .execute(conn)
                        .await?;
                    let links: Vec<ProductTag> = draft
                        .tag_ids
                        .iter()
                        .map(|tag_id| ProductTag {
                            product_id: id,
                            tag_id: *tag_id,
                        })
                        .collect();
                    if !links.is_empty() {
                        diesel::insert_into(product_tags::table)
                            .values(&links)
                            .execute(conn)
                            .await?;
                    }
                    Ok(ProductSaveOutcome::Saved(product))
                })
            })
            .await?;
        Ok(outcome)
    }

    pub async fn set_product_image(&self, id: Uuid, pic_address: Option<String>) -> Result<bool> {
        let mut conn = self.pool.get().await?;
        let updated = diesel::update(products::table.filter(products::id.eq(id)))
            .set(products::pic_address.eq(pic_address))
            .execute(&mut conn)
            .await?;
        Ok(updated == 1)
    }

    /// Tags are detached first; a product that still carries
    /// reservations stays, so no order line ever loses its product.
    pub async fn delete_product(&self, id: Uuid) -> Result<ProductDeleteOutcome> {
        let mut conn = self.pool.get().await?;
        let outcome = conn
            .transaction::<_, anyhow::Error, _>(|conn| {
                Box::pin(async move {
                    let existing = products::table
                        .filter(products::id.eq(id))
                        .first::<Product>(conn)
                        .await
                        .optional()?;
                    if existing.is_none() {
                        return Ok(ProductDeleteOutcome::NotFound);
                    }
                    let reserved = reservations::table
                        .filter(reservations::product_id.eq(id))
                        .count()
                        .get_result::<i64>(conn)
                        .await?;
                    if reserved > 0 {
                        return Ok(ProductDeleteOutcome::HasReservations);
                    }
                    diesel::delete(product_tags::table.filter(product_tags::product_id.eq(id)))
                        .execute(conn)
                        .await?;
                    diesel::delete(products::table.filter(products::id.eq(id)))
                        .execute(conn)
                        .await?;
                    info!(product_id = %id, "product deleted");
                    Ok(ProductDeleteOutcome::Deleted)
                })
            })
            .await?;
        Ok(outcome)
    }

    // ---- backoffice: tags and categories ----------------------------

    /// Inserts the given tag names, skipping the ones already present.
    /// Returns how many were actually created.
    pub async fn create_tags(&self, names: &[String]) -> Result<usize> {
        let mut conn = self.pool.get().await?;
        let mut created = 0;
        for name in names {
            let duplicate = tags::table
                .filter(tags::name.eq(name))
                .first::<Tag>(&mut conn)
                .await
                .optional()?;
            if duplicate.is_some() {
                continue;
            }
            let tag = Tag {
                id: Uuid::new_v4(),
                name: name.clone(),
            };
            diesel::insert_into(tags::table)
                .values(&tag)
                .execute(&mut conn)
                .await?;
            created += 1;
        }
        Ok(created)
    }

    pub async fn delete_tag(&self, id: Uuid) -> Result<bool> {
        let mut conn = self.pool.get().await?;
        let deleted = conn
            .transaction::<_, anyhow::Error, _>(|conn| {
                Box::pin(async move {
                    diesel::delete(product_tags::table.filter(product_tags::tag_id.eq(id)))
                        .execute(conn)
                        .await?;
                    let deleted = diesel::delete(tags::table.filter(tags::id.eq(id)))
                        .execute(conn)
                        .await?;
                    Ok(deleted == 1)
                })
            })
            .await?;
        Ok(deleted)
    }

    pub async fn create_category(&self, name: &str, description: &str) -> Result<Category> {
        let mut conn = self.pool.get().await?;
        let category = Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
        };
        let category = diesel::insert_into(categories::table)
            .values(&category)
            .get_result::<Category>(&mut conn)
            .await?;
        Ok(category)
    }

    /// Products are detached before the category row goes away; there
    /// is no cascading delete.
    pub async fn delete_category(&self, id: Uuid) -> Result<bool> {
        let mut conn = self.pool.get().await?;
        let deleted = conn
            .transaction::<_, anyhow::Error, _>(|conn| {
                Box::pin(async move {
                    diesel::update(products::table.filter(products::category_id.eq(id)))
                        .set(products::category_id.eq(None::<Uuid>))
                        .execute(conn)
                        .await?;
                    let deleted = diesel::delete(categories::table.filter(categories::id.eq(id)))
                        .execute(conn)
                        .await?;
                    Ok(deleted == 1)
                })
            })
            .await?;
        Ok(deleted)
    }

    /// Resets the demo taxonomy: detaches every product, replaces all
    /// categories with the standard six and re-attaches each product by
    /// the keyword in its name. Returns how many products were
    /// reclassified.
    pub async fn regenerate_categories(&self, description: &str) -> Result<usize> {
        let mut conn = self.pool.get().await?;
        let description = description.to_string();
        let reclassified = conn
            .transaction::<_, anyhow::Error, _>(|conn| {
                Box::pin(async move {
                    diesel::update(products::table)
                        .set(products::category_id.eq(None::<Uuid>))
                        .execute(conn)
                        .await?;
                    diesel::delete(categories::table).execute(conn).await?;

                    let mut ids_by_name: HashMap<&str, Uuid> = HashMap::new();
                    for name in shared::GENERATED_CATEGORIES {
                        let category = Category {
                            id: Uuid::new_v4(),
                            name: name.to_string(),
                            description: description.clone(),
                        };
                        diesel::insert_into(categories::table)
                            .values(&category)
                            .execute(conn)
                            .await?;
                        ids_by_name.insert(name, category.id);
                    }

                    let all_products = products::table.load::<Product>(conn).await?;
                    let mut reclassified = 0;
                    for product in all_products {
                        let target = shared::classify_product_name(&product.name);
                        if let Some(category_id) = ids_by_name.get(target).copied() {
                            diesel::update(products::table.filter(products::id.eq(product.id)))
                                .set(products::category_id.eq(Some(category_id)))
                                .execute(conn)
                                .await?;
                            reclassified += 1;
                        }
                    }
                    Ok(reclassified)
                })
            })
            .await?;
        info!(reclassified, "categories regenerated");
        Ok(reclassified)
    }
}

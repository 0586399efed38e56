use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of an order: it starts as a cart and is finalized exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Panier,
    Validee,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Panier => "panier",
            OrderStatus::Validee => "validee",
        }
    }

    /// Only a cart can be validated, and only a cart can be deleted.
    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::Panier)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "panier" => Ok(OrderStatus::Panier),
            "validee" => Ok(OrderStatus::Validee),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Role::Client),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Result of applying a purchase request to a product's stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockGrant {
    /// Quantity actually reserved.
    pub granted: i32,
    /// Stock left on the product after the grant.
    pub remaining: i32,
}

impl StockGrant {
    /// Partial fulfillment: the request exceeded the available stock.
    pub fn is_partial(&self, requested: i32) -> bool {
        self.granted < requested
    }
}

/// Caps a purchase request at the available stock. Stock never goes
/// negative; a request larger than the stock drains it to zero.
pub fn grant_stock(stock: i32, requested: i32) -> StockGrant {
    let granted = requested.min(stock).max(0);
    StockGrant {
        granted,
        remaining: stock - granted,
    }
}

/// Returns a cancelled reservation's quantity to the product's stock.
pub fn return_stock(stock: i32, reserved: i32) -> i32 {
    stock + reserved
}

/// Price of one order line at the product's current price.
pub fn line_total(quantity: i32, unit_price: &BigDecimal) -> BigDecimal {
    BigDecimal::from(quantity) * unit_price
}

/// Derived order total: the sum of its line totals, never stored.
pub fn order_total<'a, I>(lines: I) -> BigDecimal
where
    I: IntoIterator<Item = (i32, &'a BigDecimal)>,
{
    lines
        .into_iter()
        .fold(BigDecimal::from(0), |acc, (quantity, price)| {
            acc + line_total(quantity, price)
        })
}

/// Products below this price are not persisted by the backoffice forms.
pub fn price_is_sellable(price: &BigDecimal) -> bool {
    *price >= BigDecimal::from(1)
}

/// One-shot user-facing message attached to a response, shown once on
/// the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub message: String,
    pub tone: Tone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Green,
    Yellow,
    Red,
}

impl Notice {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            tone: Tone::Green,
        }
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            tone: Tone::Yellow,
        }
    }

    pub fn refused(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            tone: Tone::Red,
        }
    }
}

/// Timestamp stamped on every rendered page header.
pub fn tell_time() -> DateTime<Utc> {
    Utc::now()
}

/// The demo taxonomy regenerated by the backoffice.
pub const GENERATED_CATEGORIES: [&str; 6] =
    ["Chaise", "Bureau", "Lit", "Canape", "Armoire", "Autre"];

/// Picks the category a product belongs to from a keyword in its name,
/// falling back to the catch-all. "canapé" is matched with and without
/// its accent.
pub fn classify_product_name(name: &str) -> &'static str {
    let name = name.to_lowercase();
    if name.contains("chaise") {
        "Chaise"
    } else if name.contains("bureau") {
        "Bureau"
    } else if name.contains("lit") {
        "Lit"
    } else if name.contains("canape") || name.contains("canapé") {
        "Canape"
    } else if name.contains("armoire") {
        "Armoire"
    } else {
        "Autre"
    }
}

/// Image shown for a product: its uploaded picture when it has one,
/// otherwise the placeholder of its category.
pub fn thumbnail_for(pic_address: Option<&str>, category_name: Option<&str>) -> String {
    match pic_address {
        Some(pic) => format!("upload/{pic}"),
        None => match category_name {
            Some("Canape") => "placeholder_canape.jpg".to_string(),
            Some("Armoire") => "placeholder_armoire.jpg".to_string(),
            Some("Lit") => "placeholder_lit.jpg".to_string(),
            Some("Bureau") => "placeholder_bureau.jpg".to_string(),
            Some("Chaise") => "placeholder_chaise.jpg".to_string(),
            _ => "placeholder_none.jpg".to_string(),
        },
    }
}

/// Collapses the five-slot tag form into the list of names to persist:
/// blanks are skipped and duplicates within the form are dropped while
/// keeping first-seen order.
pub fn dedupe_tag_names(entries: &[Option<String>]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for entry in entries {
        let Some(name) = entry.as_deref().map(str::trim) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        if names.iter().any(|seen| seen == name) {
            continue;
        }
        names.push(name.to_string());
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_is_capped_at_available_stock() {
        // stock 5, request 3 -> stock 2, reserved 3
        let first = grant_stock(5, 3);
        assert_eq!(first.granted, 3);
        assert_eq!(first.remaining, 2);
        assert!(!first.is_partial(3));

        // second request of 4 on the same product -> stock 0, reserved 2
        let second = grant_stock(first.remaining, 4);
        assert_eq!(second.granted, 2);
        assert_eq!(second.remaining, 0);
        assert!(second.is_partial(4));
    }

    #[test]
    fn stock_after_grant_is_max_of_zero_and_difference() {
        for stock in 0..20 {
            for requested in 0..20 {
                let grant = grant_stock(stock, requested);
                assert_eq!(grant.remaining, (stock - requested).max(0));
                assert_eq!(grant.granted, requested.min(stock));
                assert!(grant.remaining >= 0);
            }
        }
    }

    #[test]
    fn negative_requests_grant_nothing() {
        let grant = grant_stock(10, -3);
        assert_eq!(grant.granted, 0);
        assert_eq!(grant.remaining, 10);
    }

    #[test]
    fn cancelling_returns_exactly_the_reserved_quantity() {
        let grant = grant_stock(5, 3);
        assert_eq!(return_stock(grant.remaining, grant.granted), 5);
    }

    #[test]
    fn order_status_round_trips_through_storage_strings() {
        assert_eq!("panier".parse::<OrderStatus>(), Ok(OrderStatus::Panier));
        assert_eq!("validee".parse::<OrderStatus>(), Ok(OrderStatus::Validee));
        assert_eq!(OrderStatus::Panier.as_str(), "panier");
        assert!("cancelled".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn only_a_cart_is_open_for_validation_or_deletion() {
        assert!(OrderStatus::Panier.is_open());
        assert!(!OrderStatus::Validee.is_open());
    }

    #[test]
    fn order_total_sums_line_totals_at_current_prices() {
        let chair: BigDecimal = "20".parse().unwrap();
        let bed: BigDecimal = "119.99".parse().unwrap();
        let total = order_total([(2, &chair), (1, &bed)]);
        assert_eq!(total, "159.99".parse::<BigDecimal>().unwrap());
    }

    #[test]
    fn empty_order_total_is_zero() {
        assert_eq!(order_total([]), BigDecimal::from(0));
    }

    #[test]
    fn price_floor_for_persistence_is_one() {
        assert!(price_is_sellable(&"1".parse().unwrap()));
        assert!(price_is_sellable(&"499.55".parse().unwrap()));
        assert!(!price_is_sellable(&"0.99".parse().unwrap()));
    }

    #[test]
    fn products_are_classified_by_name_keyword() {
        assert_eq!(classify_product_name("Chaise Mauris"), "Chaise");
        assert_eq!(classify_product_name("Bureau 4 tiroirs"), "Bureau");
        assert_eq!(classify_product_name("Lit adulte 140x190"), "Lit");
        assert_eq!(classify_product_name("Canapé d'angle tolbiac"), "Canape");
        assert_eq!(classify_product_name("canape convertible"), "Canape");
        assert_eq!(classify_product_name("Armoire Etiam"), "Armoire");
        assert_eq!(classify_product_name("Table Maecenas"), "Autre");
    }

    #[test]
    fn thumbnail_prefers_the_uploaded_picture() {
        assert_eq!(
            thumbnail_for(Some("sofa-1.jpg"), Some("Canape")),
            "upload/sofa-1.jpg"
        );
        assert_eq!(
            thumbnail_for(None, Some("Canape")),
            "placeholder_canape.jpg"
        );
        assert_eq!(thumbnail_for(None, None), "placeholder_none.jpg");
    }

    #[test]
    fn tag_form_entries_are_trimmed_and_deduplicated() {
        let entries = vec![
            Some("Neuf".to_string()),
            None,
            Some("  Promotion ".to_string()),
            Some("Neuf".to_string()),
            Some("".to_string()),
        ];
        assert_eq!(dedupe_tag_names(&entries), vec!["Neuf", "Promotion"]);
    }
}

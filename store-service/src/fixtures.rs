use std::collections::HashMap;

use anyhow::{bail, Result};
use bigdecimal::BigDecimal;
use num_traits::FromPrimitive;
use tracing::info;
use uuid::Uuid;

use shared::{classify_product_name, Role, GENERATED_CATEGORIES};

use crate::models::Tag;
use crate::store::{ProductDraft, ProductSaveOutcome, Store};

pub const CATEGORY_DESCRIPTION: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing \
elit. Aliquam fringilla semper ligula vestibulum mattis. Ut in aliquam sapien, in fermentum \
turpis. Morbi vel mollis est. Nulla nec consequat nisi.";

const PRODUCT_DESCRIPTION: &str = "Pellentesque lobortis sodales nisl a ultricies. Praesent \
viverra ultricies dolor. Sed iaculis urna erat. Cras lectus eros, ornare sit amet euismod et, \
tincidunt quis risus. Sed ut sollicitudin risus.";

const TAG_NAMES: [&str; 9] = [
    "Neuf",
    "Pas cher",
    "Occasion",
    "Promotion",
    "Bois",
    "Limité",
    "Nouveau",
    "Deluxe",
    "Made in France",
];

const NAMED_PRODUCTS: &[(&str, &str)] = &[
    ("Table Maecenas", "150"),
    ("Chaise Mauris", "20"),
    ("Armoire Etiam", "500"),
    ("Bureau Vestibulum", "200"),
    ("Lit Nulla", "400"),
    ("Table Craseget", "150"),
    ("Chaise Suspendisse", "20"),
    ("Armoire Pellentesque", "500"),
    ("Bureau Donec", "200"),
    ("Lit adulte 140x190 cm", "119.99"),
    ("Bureau 4 tiroirs", "99.99"),
    ("Bureau 1 tiroir", "39.99"),
    ("Chaise HAWAI anthracite", "79.48"),
    ("Table 180cm allonge", "499.55"),
    ("Canapé d'angle réversible", "479.00"),
    ("Canapé d'angle droit", "987.40"),
    ("Canapé d'angle convertible", "529.38"),
    ("Canapé d'angle tolbiac", "599.00"),
];

const GENERATED_PRODUCTS: usize = 48;

/// Loads the demo catalog: the standard taxonomy, a set of named
/// furniture products, a generated batch of keyword-named products and
/// one demo user per role. A non-empty catalog is left untouched.
pub async fn seed(store: &Store) -> Result<()> {
    if store.count_products().await? > 0 {
        info!("fixtures skipped: products already present");
        return Ok(());
    }

    let client = store
        .create_user("client@storefront.test", "Demo Client", Role::Client)
        .await?;
    let admin = store
        .create_user("admin@storefront.test", "Demo Admin", Role::Admin)
        .await?;
    info!(client_id = %client.id, admin_id = %admin.id, "demo users created");

    let mut category_ids: HashMap<&str, Uuid> = HashMap::new();
    for name in GENERATED_CATEGORIES {
        let category = store.create_category(name, CATEGORY_DESCRIPTION).await?;
        category_ids.insert(name, category.id);
    }

    let tag_names: Vec<String> = TAG_NAMES.iter().map(|name| name.to_string()).collect();
    store.create_tags(&tag_names).await?;
    let tags = store.tags().await?;

    for (index, (name, price)) in NAMED_PRODUCTS.iter().enumerate() {
        let draft = ProductDraft {
            name: name.to_string(),
            description: PRODUCT_DESCRIPTION.to_string(),
            price: price.parse()?,
            stock: ((index * 53) % 300 + 1) as i32,
            category_id: category_ids.get(classify_product_name(name)).copied(),
            tag_ids: pick_tags(&tags, index),
            pic_address: None,
        };
        insert_product(store, draft).await?;
    }

    for index in 0..GENERATED_PRODUCTS {
        let category_name = GENERATED_CATEGORIES[index % GENERATED_CATEGORIES.len()];
        let price = BigDecimal::from_f64(5.99 + (index * 7 % 200) as f64)
            .unwrap_or_else(|| BigDecimal::from(10))
            .with_scale(2);
        let draft = ProductDraft {
            name: format!("{category_name} #{}", 1000 + (index * 137) % 9000),
            description: PRODUCT_DESCRIPTION.to_string(),
            price,
            stock: ((index * 37) % 300 + 1) as i32,
            category_id: category_ids.get(category_name).copied(),
            tag_ids: pick_tags(&tags, index),
            pic_address: None,
        };
        insert_product(store, draft).await?;
    }

    info!(
        named = NAMED_PRODUCTS.len(),
        generated = GENERATED_PRODUCTS,
        "fixtures loaded"
    );
    Ok(())
}

/// Rotates roughly a quarter of the tag set onto each product by
/// index, so seeding stays deterministic across runs.
fn pick_tags(tags: &[Tag], index: usize) -> Vec<Uuid> {
    tags.iter()
        .enumerate()
        .filter(|(tag_index, _)| (index + tag_index) % 4 == 0)
        .map(|(_, tag)| tag.id)
        .collect()
}

async fn insert_product(store: &Store, draft: ProductDraft) -> Result<()> {
    let name = draft.name.clone();
    match store.create_product(draft).await? {
        ProductSaveOutcome::Saved(_) => Ok(()),
        _ => bail!("fixture product {name} was rejected"),
    }
}

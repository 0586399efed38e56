diesel::table! {
    users (id) {
        id -> Uuid,
        email -> Varchar,
        display_name -> Varchar,
        role -> Varchar,
        created_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    categories (id) {
        id -> Uuid,
        name -> Varchar,
        description -> Text,
    }
}

diesel::table! {
    tags (id) {
        id -> Uuid,
        name -> Varchar,
    }
}

diesel::table! {
    products (id) {
        id -> Uuid,
        name -> Varchar,
        description -> Text,
        price -> Numeric,
        stock -> Int4,
        pic_address -> Nullable<Varchar>,
        category_id -> Nullable<Uuid>,
        created_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    product_tags (product_id, tag_id) {
        product_id -> Uuid,
        tag_id -> Uuid,
    }
}

diesel::table! {
    orders (id) {
        id -> Uuid,
        user_id -> Uuid,
        status -> Varchar,
        created_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    reservations (id) {
        id -> Uuid,
        order_id -> Uuid,
        product_id -> Uuid,
        quantity -> Int4,
        created_at -> Nullable<Timestamptz>,
    }
}

diesel::joinable!(products -> categories (category_id));
diesel::joinable!(product_tags -> products (product_id));
diesel::joinable!(product_tags -> tags (tag_id));
diesel::joinable!(orders -> users (user_id));
diesel::joinable!(reservations -> orders (order_id));
diesel::joinable!(reservations -> products (product_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    categories,
    tags,
    products,
    product_tags,
    orders,
    reservations,
);

diesel::table! {
    beer_categories (id) {
        id -> Integer,
        name -> Text,
        parent_id -> Nullable<Integer>,
        description -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    beer_locations (id) {
        id -> Integer,
        beer_id -> Integer,
        brewery_id -> Integer,
        is_available -> Bool,
        last_updated -> Timestamp,
    }
}

diesel::table! {
    beers (id) {
        id -> Integer,
        name -> Text,
        brewery_id -> Integer,
        #[sql_name = "type"]
        beer_type -> Nullable<Text>,
        abv -> Nullable<Double>,
        ibu -> Nullable<Integer>,
        description -> Nullable<Text>,
        category_id -> Nullable<Integer>,
        image_url -> Nullable<Text>,
        rating -> Nullable<Double>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    breweries (id) {
        id -> Integer,
        name -> Text,
        address -> Nullable<Text>,
        city -> Nullable<Text>,
        state -> Nullable<Text>,
        website -> Nullable<Text>,
        phone -> Nullable<Text>,
        description -> Nullable<Text>,
        latitude -> Nullable<Double>,
        longitude -> Nullable<Double>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::joinable!(beer_locations -> beers (beer_id));
diesel::joinable!(beer_locations -> breweries (brewery_id));
diesel::joinable!(beers -> beer_categories (category_id));
diesel::joinable!(beers -> breweries (brewery_id));

diesel::allow_tables_to_appear_in_same_query!(
    beer_categories,
    beer_locations,
    beers,
    breweries,
);

use super::schema::*;
use chrono::NaiveDateTime;
use diesel::prelude::*;

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = breweries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Brewery {
    pub id: i32,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = breweries)]
pub struct NewBrewery<'a> {
    pub name: &'a str,
    pub address: Option<&'a str>,
    pub city: Option<&'a str>,
    pub state: Option<&'a str>,
    pub website: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub description: Option<&'a str>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Columns to fill on an existing brewery. `None` leaves the column alone.
#[derive(Debug, Default, PartialEq, AsChangeset)]
#[diesel(table_name = breweries)]
pub struct BreweryChanges {
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = beers)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Beer {
    pub id: i32,
    pub name: String,
    pub brewery_id: i32,
    pub beer_type: Option<String>,
    pub abv: Option<f64>,
    pub ibu: Option<i32>,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    pub image_url: Option<String>,
    pub rating: Option<f64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = beers)]
pub struct NewBeer<'a> {
    pub name: &'a str,
    pub brewery_id: i32,
    pub beer_type: Option<&'a str>,
    pub abv: Option<f64>,
    pub ibu: Option<i32>,
    pub description: Option<&'a str>,
    pub category_id: Option<i32>,
    pub image_url: Option<&'a str>,
    pub rating: Option<f64>,
}

/// Columns to fill on an existing beer. `None` leaves the column alone.
#[derive(Debug, Default, PartialEq, AsChangeset)]
#[diesel(table_name = beers)]
pub struct BeerChanges {
    pub beer_type: Option<String>,
    pub abv: Option<f64>,
    pub ibu: Option<i32>,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    pub image_url: Option<String>,
    pub rating: Option<f64>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = beer_categories)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub parent_id: Option<i32>,
    pub description: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = beer_categories)]
pub struct NewCategory<'a> {
    pub name: &'a str,
    pub parent_id: Option<i32>,
    pub description: Option<&'a str>,
}

#[derive(Insertable)]
#[diesel(table_name = beer_locations)]
pub struct NewBeerLocation {
    pub beer_id: i32,
    pub brewery_id: i32,
    pub is_available: bool,
}

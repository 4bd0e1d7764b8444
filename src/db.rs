use actix_web::web;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2;
use diesel::sql_query;
use diesel::sql_types::{Double, Integer, Nullable, Text};
use diesel::sqlite::{Sqlite, SqliteConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::models::Brewery;
use crate::schema::{beer_categories, beer_locations, beers, breweries};
use crate::catalog::{load_taxonomy, seed_taxonomy};
use crate::taxonomy::{CategoryId, Taxonomy};

pub type Pool = r2d2::Pool<r2d2::ConnectionManager<SqliteConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Used for breweries that have not been geocoded yet.
pub const DEFAULT_LATITUDE: f64 = 41.8781;
pub const DEFAULT_LONGITUDE: f64 = -87.6298;

// SQLite's `lower` only folds ASCII, so compare lower() against lower().
diesel::define_sql_function!(fn lower(x: Text) -> Text);

fn configure(conn: &mut SqliteConnection) -> QueryResult<()> {
    conn.batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
}

/// Applies the per-connection pragmas to every pooled connection.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionOptions;

impl r2d2::CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> ::std::result::Result<(), r2d2::Error> {
        configure(conn).map_err(r2d2::Error::QueryError)
    }
}

pub fn build_pool(database_url: &str, max_size: u32) -> Result<Pool> {
    let manager = r2d2::ConnectionManager::<SqliteConnection>::new(database_url);

    Ok(Pool::builder()
        .max_size(max_size)
        .connection_customizer(Box::new(ConnectionOptions))
        .build(manager)?)
}

pub fn run_migrations(conn: &mut SqliteConnection) -> Result<()> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| Error::MigrationError(e.to_string()))?;

    for migration in applied {
        info!("Applied migration {}", migration);
    }

    Ok(())
}

/// Opens a single connection with the schema brought up to date.
pub fn open(database_url: &str) -> Result<SqliteConnection> {
    let mut conn = SqliteConnection::establish(database_url)?;
    configure(&mut conn)?;
    run_migrations(&mut conn)?;
    Ok(conn)
}

/// Brings the schema up to date and makes sure the default taxonomy exists.
pub fn prepare_catalog(conn: &mut SqliteConnection) -> Result<Taxonomy> {
    run_migrations(conn)?;
    seed_taxonomy(conn)
}

#[cfg(test)]
pub fn test_connection() -> SqliteConnection {
    open(":memory:").expect("in-memory catalog")
}

pub trait Query {
    type Item: Send;

    fn execute(&self, conn: &mut SqliteConnection) -> Result<Self::Item>;
}

/// Runs `query` on a pooled connection without blocking the server's workers.
pub async fn execute<T>(pool: &Pool, query: T) -> Result<T::Item>
where
    T: Query + Send + 'static,
    T::Item: 'static,
{
    let pool = pool.clone();

    web::block(move || {
        let mut conn = pool.get()?;
        query.execute(&mut conn)
    })
    .await?
}

/*************************************/
/** Beer search                     **/
/*************************************/

const BEER_RESULT_SELECT: &str = "
    SELECT
        b.id AS beer_id,
        b.name AS beer,
        b.type AS beer_type,
        b.abv AS abv,
        b.description AS description,
        br.name AS brewery,
        br.address AS address,
        COALESCE(NULLIF(br.state, ''), 'IL') AS state,
        COALESCE(NULLIF(br.city, ''), 'Chicago') AS city,
        br.website AS website,
        c.name AS category,
        pc.name AS parent_category
    FROM beers b
    JOIN breweries br ON b.brewery_id = br.id
    LEFT JOIN beer_categories c ON b.category_id = c.id
    LEFT JOIN beer_categories pc ON c.parent_id = pc.id";

#[derive(Debug, Serialize, QueryableByName)]
pub struct BeerResult {
    #[diesel(sql_type = Integer)]
    pub beer_id: i32,
    #[diesel(sql_type = Text)]
    pub beer: String,
    #[diesel(sql_type = Nullable<Text>)]
    #[serde(rename = "type")]
    pub beer_type: Option<String>,
    #[diesel(sql_type = Nullable<Double>)]
    pub abv: Option<f64>,
    #[diesel(sql_type = Nullable<Text>)]
    pub description: Option<String>,
    #[diesel(sql_type = Text)]
    pub brewery: String,
    #[diesel(sql_type = Nullable<Text>)]
    pub address: Option<String>,
    #[diesel(sql_type = Text)]
    pub state: String,
    #[diesel(sql_type = Text)]
    pub city: String,
    #[diesel(sql_type = Nullable<Text>)]
    pub website: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub category: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub parent_category: Option<String>,
}

/// Wraps `text` for a substring `LIKE ? ESCAPE '\'` match, escaping the
/// wildcard characters it contains.
fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Filters for `/api/search`. Every filter is optional; text filters are
/// substring matches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchBeers {
    pub text: Option<String>,
    pub beer_type: Option<String>,
    pub min_abv: Option<f64>,
    pub max_abv: Option<f64>,
    pub brewery: Option<String>,
    pub category_id: Option<CategoryId>,
}

impl Query for SearchBeers {
    type Item = Vec<BeerResult>;

    fn execute(&self, conn: &mut SqliteConnection) -> Result<Self::Item> {
        let mut query = sql_query(BEER_RESULT_SELECT)
            .into_boxed::<Sqlite>()
            .sql(" WHERE 1=1");

        if let Some(text) = &self.text {
            let pattern = like_pattern(text);
            query = query
                .sql(
                    " AND (b.name LIKE ? ESCAPE '\\' OR b.description LIKE ? ESCAPE '\\' \
                     OR b.type LIKE ? ESCAPE '\\')",
                )
                .bind::<Text, _>(pattern.clone())
                .bind::<Text, _>(pattern.clone())
                .bind::<Text, _>(pattern);
        }

        if let Some(beer_type) = &self.beer_type {
            query = query
                .sql(" AND b.type LIKE ? ESCAPE '\\'")
                .bind::<Text, _>(like_pattern(beer_type));
        }

        if let Some(min_abv) = self.min_abv {
            query = query.sql(" AND b.abv >= ?").bind::<Double, _>(min_abv);
        }

        if let Some(max_abv) = self.max_abv {
            query = query.sql(" AND b.abv <= ?").bind::<Double, _>(max_abv);
        }

        if let Some(brewery) = &self.brewery {
            query = query
                .sql(" AND br.name LIKE ? ESCAPE '\\'")
                .bind::<Text, _>(like_pattern(brewery));
        }

        if let Some(category_id) = self.category_id {
            let ids = load_taxonomy(conn)?.subtree(category_id);
            if ids.is_empty() {
                return Ok(Vec::new());
            }

            let placeholders = vec!["?"; ids.len()].join(", ");
            query = query.sql(format!(" AND b.category_id IN ({})", placeholders));
            for id in ids {
                query = query.bind::<Integer, _>(id);
            }
        }

        Ok(query
            .sql(" ORDER BY b.name, br.name")
            .load::<BeerResult>(conn)?)
    }
}

#[derive(Clone, Copy)]
pub struct GetBeer(pub i32);

impl Query for GetBeer {
    type Item = Option<BeerResult>;

    fn execute(&self, conn: &mut SqliteConnection) -> Result<Self::Item> {
        Ok(sql_query(format!("{} WHERE b.id = ?", BEER_RESULT_SELECT))
            .bind::<Integer, _>(self.0)
            .get_result::<BeerResult>(conn)
            .optional()?)
    }
}

/*************************************/
/** Filter options                  **/
/*************************************/

#[derive(Debug, Serialize, PartialEq)]
pub struct AbvRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Serialize)]
pub struct SubcategoryOption {
    pub id: CategoryId,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CategoryOption {
    pub id: CategoryId,
    pub name: String,
    pub subcategories: Vec<SubcategoryOption>,
}

#[derive(Debug, Serialize)]
pub struct FilterOptions {
    pub types: Vec<String>,
    pub abv_range: AbvRange,
    pub breweries: Vec<String>,
    pub categories: Vec<CategoryOption>,
}

/// Range reported when the catalog has no ABV data at all.
const DEFAULT_ABV_RANGE: (f64, f64) = (0.0, 15.0);

#[derive(Clone, Copy)]
pub struct GetFilterOptions;

impl Query for GetFilterOptions {
    type Item = FilterOptions;

    fn execute(&self, conn: &mut SqliteConnection) -> Result<Self::Item> {
        use diesel::dsl::{max, min};

        let types = beers::table
            .select(beers::beer_type.assume_not_null())
            .filter(beers::beer_type.is_not_null())
            .filter(beers::beer_type.ne(""))
            .distinct()
            .order(beers::beer_type.asc())
            .load::<String>(conn)?;

        let (lowest, highest) = beers::table
            .select((min(beers::abv), max(beers::abv)))
            .first::<(Option<f64>, Option<f64>)>(conn)?;

        let breweries = breweries::table
            .select(breweries::name)
            .order(breweries::name.asc())
            .load::<String>(conn)?;

        let taxonomy = load_taxonomy(conn)?;
        let mut categories: Vec<CategoryOption> = taxonomy
            .roots()
            .map(|root| {
                let mut subcategories: Vec<SubcategoryOption> = taxonomy
                    .children(root.id)
                    .map(|child| SubcategoryOption {
                        id: child.id,
                        name: child.name.clone(),
                    })
                    .collect();
                subcategories.sort_by(|a, b| a.name.cmp(&b.name));

                CategoryOption {
                    id: root.id,
                    name: root.name.clone(),
                    subcategories,
                }
            })
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(FilterOptions {
            types,
            abv_range: AbvRange {
                min: lowest.unwrap_or(DEFAULT_ABV_RANGE.0),
                max: highest.unwrap_or(DEFAULT_ABV_RANGE.1),
            },
            breweries,
            categories,
        })
    }
}

/*************************************/
/** Breweries with their beers      **/
/*************************************/

#[derive(Debug, Serialize)]
pub struct BreweryBeer {
    pub name: String,
    #[serde(rename = "type")]
    pub beer_type: Option<String>,
    pub abv: Option<f64>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub available: bool,
}

#[derive(Debug, Serialize)]
pub struct BreweryListing {
    pub id: i32,
    pub name: String,
    pub address: Option<String>,
    pub city: String,
    pub state: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub beer_count: usize,
    pub beers: Vec<BreweryBeer>,
}

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_owned())
}

impl BreweryListing {
    fn new(brewery: Brewery, beers: Vec<BreweryBeer>) -> BreweryListing {
        BreweryListing {
            id: brewery.id,
            name: brewery.name,
            address: brewery.address,
            city: or_default(brewery.city, "Chicago"),
            state: or_default(brewery.state, "IL"),
            website: brewery.website,
            phone: brewery.phone,
            description: brewery.description,
            lat: brewery.latitude.unwrap_or(DEFAULT_LATITUDE),
            lng: brewery.longitude.unwrap_or(DEFAULT_LONGITUDE),
            beer_count: beers.len(),
            beers,
        }
    }
}

type BreweryBeerRow = (
    i32,
    String,
    Option<String>,
    Option<f64>,
    Option<String>,
    Option<String>,
    bool,
);

#[derive(Clone, Copy)]
pub struct GetBreweries;

impl Query for GetBreweries {
    type Item = Vec<BreweryListing>;

    fn execute(&self, conn: &mut SqliteConnection) -> Result<Self::Item> {
        let all_breweries = breweries::table
            .select(Brewery::as_select())
            .order(breweries::name.asc())
            .load::<Brewery>(conn)?;

        let rows = beer_locations::table
            .inner_join(beers::table)
            .left_join(
                beer_categories::table.on(beers::category_id.eq(beer_categories::id.nullable())),
            )
            .select((
                beer_locations::brewery_id,
                beers::name,
                beers::beer_type,
                beers::abv,
                beers::description,
                beer_categories::name.nullable(),
                beer_locations::is_available,
            ))
            .order(beers::name.asc())
            .load::<BreweryBeerRow>(conn)?;

        let mut by_brewery: BTreeMap<i32, Vec<BreweryBeer>> = BTreeMap::new();
        for (brewery_id, name, beer_type, abv, description, category, available) in rows {
            by_brewery.entry(brewery_id).or_default().push(BreweryBeer {
                name,
                beer_type,
                abv,
                description,
                category,
                available,
            });
        }

        Ok(all_breweries
            .into_iter()
            .map(|brewery| {
                let beers = by_brewery.remove(&brewery.id).unwrap_or_default();
                BreweryListing::new(brewery, beers)
            })
            .collect())
    }
}

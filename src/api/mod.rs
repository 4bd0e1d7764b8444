use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use derive_more::Display;

use crate::db::{self, BeerResult, BreweryListing, GetBeer, GetBreweries, GetFilterOptions, Pool, SearchBeers};
use crate::error::Error;

mod util;

#[derive(Serialize)]
pub struct SearchResults {
    results: Vec<BeerResult>,
}

#[derive(Serialize)]
pub struct BreweryList {
    breweries: Vec<BreweryListing>,
}

#[derive(Debug, Display)]
pub enum ApiErrorKind {
    #[display(fmt = "Invalid value for {}: '{}'", _0, _1)]
    BadParameter(&'static str, String),

    #[display(fmt = "Invalid query string: {}", _0)]
    BadQuery(String),

    #[display(fmt = "Beer not found")]
    BeerNotFound,

    #[display(fmt = "Internal server error")]
    Internal(Error),
}

/// An error rendered as JSON. List endpoints also carry an empty list under
/// their usual key so clients can render the empty state.
#[derive(Debug, Display)]
#[display(fmt = "{}", kind)]
pub struct ApiError {
    kind: ApiErrorKind,
    list: Option<&'static str>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind) -> ApiError {
        ApiError { kind, list: None }
    }

    pub fn listing(mut self, list: &'static str) -> ApiError {
        self.list = Some(list);
        self
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> ApiError {
        ApiError::new(ApiErrorKind::Internal(e))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self.kind {
            ApiErrorKind::BadParameter(..) | ApiErrorKind::BadQuery(_) => StatusCode::BAD_REQUEST,
            ApiErrorKind::BeerNotFound => StatusCode::NOT_FOUND,
            ApiErrorKind::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiErrorKind::Internal(e) = &self.kind {
            error!("{}", e);
        }

        let mut body = serde_json::Map::new();
        body.insert("error".to_owned(), self.to_string().into());
        if let Some(list) = self.list {
            body.insert(list.to_owned(), serde_json::Value::Array(Vec::new()));
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}

#[derive(Serialize)]
struct ServiceStatus {
    message: &'static str,
    status: &'static str,
}

async fn index() -> HttpResponse {
    HttpResponse::Ok().json(ServiceStatus {
        message: "Chicago Beer Finder API",
        status: "running",
    })
}

/// Raw `/api/search` parameters. Everything arrives as text so a bad number
/// can be reported instead of failing extraction.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
    #[serde(rename = "type")]
    beer_type: Option<String>,
    min_abv: Option<String>,
    max_abv: Option<String>,
    brewery: Option<String>,
    category_id: Option<String>,
}

fn parse_abv_param(name: &'static str, value: Option<String>) -> Result<Option<f64>, ApiError> {
    match util::parse_param::<f64>(value) {
        Ok(Some(abv)) if !abv.is_finite() => Err(ApiError::new(ApiErrorKind::BadParameter(name, abv.to_string()))),
        Ok(abv) => Ok(abv),
        Err(text) => Err(ApiError::new(ApiErrorKind::BadParameter(name, text))),
    }
}

impl SearchParams {
    fn into_query(self) -> Result<SearchBeers, ApiError> {
        let min_abv = parse_abv_param("min_abv", self.min_abv)?;
        let max_abv = parse_abv_param("max_abv", self.max_abv)?;
        let category_id = util::parse_param::<i32>(self.category_id)
            .map_err(|text| ApiError::new(ApiErrorKind::BadParameter("category_id", text)))?;

        Ok(SearchBeers {
            text: util::non_empty(self.q),
            beer_type: util::non_empty(self.beer_type),
            min_abv,
            max_abv,
            brewery: util::non_empty(self.brewery),
            category_id,
        })
    }
}

/// Route handler for beer search
///
/// Accepts the following query parameters, all optional:
///
/// - `q`: Text found in the beer's name, type or description
/// - `type`: Text found in the beer's type
/// - `min_abv`, `max_abv`: ABV bounds, inclusive
/// - `brewery`: Text found in the brewery's name
/// - `category_id`: A category; beers in any of its sub-categories match too
async fn search(pool: web::Data<Pool>, params: web::Query<SearchParams>) -> Result<HttpResponse, ApiError> {
    let query = params.into_inner().into_query().map_err(|e| e.listing("results"))?;
    let results = db::execute(&pool, query)
        .await
        .map_err(|e| ApiError::from(e).listing("results"))?;

    Ok(HttpResponse::Ok().json(SearchResults { results }))
}

async fn filters(pool: web::Data<Pool>) -> Result<HttpResponse, ApiError> {
    let options = db::execute(&pool, GetFilterOptions).await?;
    Ok(HttpResponse::Ok().json(options))
}

async fn breweries(pool: web::Data<Pool>) -> Result<HttpResponse, ApiError> {
    let listings = db::execute(&pool, GetBreweries)
        .await
        .map_err(|e| ApiError::from(e).listing("breweries"))?;

    Ok(HttpResponse::Ok().json(BreweryList { breweries: listings }))
}

/// Returns the beer as a one-element array, which is what the frontend
/// expects.
async fn beer(pool: web::Data<Pool>, id: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let id = id
        .parse::<i32>()
        .map_err(|_| ApiError::new(ApiErrorKind::BeerNotFound))?;

    match db::execute(&pool, GetBeer(id)).await? {
        Some(beer) => Ok(HttpResponse::Ok().json(vec![beer])),
        None => Err(ApiError::new(ApiErrorKind::BeerNotFound)),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(|err, _req| {
        ApiError::new(ApiErrorKind::BadQuery(err.to_string()))
            .listing("results")
            .into()
    }))
    .route("/", web::get().to(index))
    .service(
        web::scope("/api")
            .route("/search", web::get().to(search))
            .route("/filters", web::get().to(filters))
            .route("/breweries", web::get().to(breweries))
            .route("/beer/{id}", web::get().to(beer)),
    );
}

//! Cleanup of raw scraped records into the shape the catalog stores.
//!
//! Scrapers and JSON dumps disagree on almost everything: ABV shows up as
//! `6.7`, `"6.7"`, `"6.7%"` or `"ABV: 6.7%"`, the style lives under `type` or
//! `style`, and descriptions carry whatever line breaks the site had. Nothing
//! in here touches the database.

use regex::Regex;

use crate::error::NormalizationError;

/// ABV values above this are not percentages and are discarded.
pub const MAX_ABV: f64 = 100.0;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref PERCENT_TOKEN: Regex = Regex::new(r"(\d+(?:\.\d+)?|\.\d+)\s*%").unwrap();
    static ref INTEGER_TOKEN: Regex = Regex::new(r"\d+").unwrap();
}

/// A JSON value that sources emit either as a number or as text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(f64),
    Text(String),
}

impl From<f64> for NumberOrText {
    fn from(v: f64) -> Self {
        NumberOrText::Number(v)
    }
}

impl From<&str> for NumberOrText {
    fn from(v: &str) -> Self {
        NumberOrText::Text(v.to_owned())
    }
}

/// A beer record as it arrives from a scraper or JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBeer {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub beer_type: Option<String>,
    pub style: Option<String>,
    pub abv: Option<NumberOrText>,
    pub ibu: Option<NumberOrText>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub rating: Option<NumberOrText>,

    /// Brewery fields carried inline by flat record lists.
    #[serde(alias = "brewery_name")]
    pub brewery: Option<String>,
    #[serde(alias = "location")]
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub website: Option<String>,
}

impl RawBeer {
    pub fn named(name: &str) -> RawBeer {
        RawBeer {
            name: Some(name.to_owned()),
            ..RawBeer::default()
        }
    }

    /// The inline brewery fields of a flat record, if it names a brewery.
    pub fn inline_brewery(&self) -> Option<RawBrewery> {
        self.brewery.as_ref().map(|name| RawBrewery {
            name: Some(name.clone()),
            address: self.address.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            website: self.website.clone(),
            ..RawBrewery::default()
        })
    }
}

/// A brewery record as it arrives from a scraper or JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBrewery {
    pub name: Option<String>,
    #[serde(alias = "location")]
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
    pub latitude: Option<NumberOrText>,
    pub longitude: Option<NumberOrText>,
}

impl RawBrewery {
    pub fn named(name: &str) -> RawBrewery {
        RawBrewery {
            name: Some(name.to_owned()),
            ..RawBrewery::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBeer {
    pub name: String,
    /// Empty when the source gave neither a type nor a style.
    pub beer_type: String,
    pub abv: Option<f64>,
    pub ibu: Option<i32>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BreweryInfo {
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Collapses whitespace and maps blank text to `None`.
pub fn clean_text(text: Option<&str>) -> Option<String> {
    text.map(collapse_whitespace).filter(|t| !t.is_empty())
}

/// Parses an ABV in any of the formats sources use into a bare percentage.
///
/// Returns `None` when no number can be found, which is distinct from a
/// parsed `0.0` for non-alcoholic beers.
pub fn parse_abv(value: &NumberOrText) -> Option<f64> {
    match value {
        NumberOrText::Number(n) => valid_abv(*n),
        NumberOrText::Text(text) => parse_abv_text(text),
    }
}

pub fn parse_abv_text(text: &str) -> Option<f64> {
    let bare = text.trim().trim_end_matches('%').trim();
    if let Ok(n) = bare.parse::<f64>() {
        return valid_abv(n);
    }

    // Compound strings such as "ABV: 6.7%" or "6.7% ABV"; the first
    // percentage wins.
    PERCENT_TOKEN
        .captures(text)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .and_then(valid_abv)
}

/// Formats an ABV the way most sources print it; `parse_abv` reads it back
/// unchanged.
pub fn format_abv(abv: f64) -> String {
    format!("{}%", abv)
}

fn valid_abv(n: f64) -> Option<f64> {
    if n.is_finite() && (0.0..=MAX_ABV).contains(&n) {
        Some(n)
    } else {
        None
    }
}

pub fn parse_ibu(value: &NumberOrText) -> Option<i32> {
    match value {
        NumberOrText::Number(n) if n.is_finite() && *n >= 0.0 => Some(n.round() as i32),
        NumberOrText::Number(_) => None,
        NumberOrText::Text(text) => INTEGER_TOKEN
            .find(text)
            .and_then(|m| m.as_str().parse::<i32>().ok()),
    }
}

fn parse_decimal(value: &NumberOrText) -> Option<f64> {
    let n = match value {
        NumberOrText::Number(n) => *n,
        NumberOrText::Text(text) => text.trim().parse::<f64>().ok()?,
    };
    Some(n).filter(|n| n.is_finite())
}

/// Normalizes one raw beer record.
///
/// Fails only when the record has no usable name; callers skip such records
/// and carry on with the batch.
pub fn normalize(raw: &RawBeer) -> Result<NormalizedBeer, NormalizationError> {
    let name = clean_text(raw.name.as_deref()).ok_or(NormalizationError::MissingName)?;

    let beer_type = clean_text(raw.beer_type.as_deref())
        .or_else(|| clean_text(raw.style.as_deref()))
        .unwrap_or_default();

    Ok(NormalizedBeer {
        name,
        beer_type,
        abv: raw.abv.as_ref().and_then(parse_abv),
        ibu: raw.ibu.as_ref().and_then(parse_ibu),
        description: clean_text(raw.description.as_deref()),
        image_url: clean_text(raw.image_url.as_deref()),
        rating: raw.rating.as_ref().and_then(parse_decimal),
    })
}

pub fn normalize_brewery(raw: &RawBrewery) -> Result<BreweryInfo, NormalizationError> {
    let name = clean_text(raw.name.as_deref()).ok_or(NormalizationError::MissingBrewery)?;

    Ok(BreweryInfo {
        name,
        address: clean_text(raw.address.as_deref()),
        city: clean_text(raw.city.as_deref()),
        state: clean_text(raw.state.as_deref()),
        website: clean_text(raw.website.as_deref()),
        phone: clean_text(raw.phone.as_deref()),
        description: clean_text(raw.description.as_deref()),
        latitude: raw.latitude.as_ref().and_then(parse_decimal),
        longitude: raw.longitude.as_ref().and_then(parse_decimal),
    })
}

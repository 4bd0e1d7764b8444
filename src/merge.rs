//! Fill-missing-only merging of an incoming record into a stored one.
//!
//! A stored value is only ever replaced when it is missing (null, blank, or
//! the literal "unknown" for a beer type) and the incoming value is present.
//! Hand-corrected data therefore survives noisy scraper re-runs. The
//! functions here decide per field; the catalog applies the decisions.

use chrono::NaiveDateTime;

use crate::models::{Beer, BeerChanges, Brewery, BreweryChanges};
use crate::normalize::{BreweryInfo, NormalizedBeer};
use crate::taxonomy::CategoryId;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldDecision<T> {
    KeepExisting,
    TakeIncoming(T),
}

impl<T> FieldDecision<T> {
    pub fn into_update(self) -> Option<T> {
        match self {
            FieldDecision::KeepExisting => None,
            FieldDecision::TakeIncoming(v) => Some(v),
        }
    }
}

/// Values that count as "not there" when stored.
pub trait Missing {
    fn is_missing(&self) -> bool;
}

impl Missing for String {
    fn is_missing(&self) -> bool {
        self.trim().is_empty()
    }
}

impl Missing for f64 {
    fn is_missing(&self) -> bool {
        !self.is_finite()
    }
}

impl Missing for i32 {
    fn is_missing(&self) -> bool {
        false
    }
}

pub fn decide<T: Missing + Clone>(existing: Option<&T>, incoming: Option<&T>) -> FieldDecision<T> {
    let existing_missing = existing.map_or(true, Missing::is_missing);
    match incoming {
        Some(value) if existing_missing && !value.is_missing() => {
            FieldDecision::TakeIncoming(value.clone())
        }
        _ => FieldDecision::KeepExisting,
    }
}

/// Beer types sometimes get stored as a placeholder instead of null.
fn is_unknown_type(existing: Option<&String>) -> bool {
    existing.map_or(true, |t| {
        let t = t.trim();
        t.is_empty() || t.eq_ignore_ascii_case("unknown")
    })
}

fn decide_type(existing: Option<&String>, incoming: &str) -> FieldDecision<String> {
    if is_unknown_type(existing) && !incoming.trim().is_empty() {
        FieldDecision::TakeIncoming(incoming.to_owned())
    } else {
        FieldDecision::KeepExisting
    }
}

pub fn merge_beer(
    existing: &Beer,
    incoming: &NormalizedBeer,
    category_id: CategoryId,
    now: NaiveDateTime,
) -> Option<BeerChanges> {
    let mut changes = BeerChanges {
        beer_type: decide_type(existing.beer_type.as_ref(), &incoming.beer_type).into_update(),
        abv: decide(existing.abv.as_ref(), incoming.abv.as_ref()).into_update(),
        ibu: decide(existing.ibu.as_ref(), incoming.ibu.as_ref()).into_update(),
        description: decide(existing.description.as_ref(), incoming.description.as_ref())
            .into_update(),
        category_id: decide(existing.category_id.as_ref(), Some(&category_id)).into_update(),
        image_url: decide(existing.image_url.as_ref(), incoming.image_url.as_ref()).into_update(),
        rating: decide(existing.rating.as_ref(), incoming.rating.as_ref()).into_update(),
        updated_at: None,
    };

    if changes == BeerChanges::default() {
        None
    } else {
        changes.updated_at = Some(now);
        Some(changes)
    }
}

pub fn merge_brewery(
    existing: &Brewery,
    incoming: &BreweryInfo,
    now: NaiveDateTime,
) -> Option<BreweryChanges> {
    let mut changes = BreweryChanges {
        address: decide(existing.address.as_ref(), incoming.address.as_ref()).into_update(),
        city: decide(existing.city.as_ref(), incoming.city.as_ref()).into_update(),
        state: decide(existing.state.as_ref(), incoming.state.as_ref()).into_update(),
        website: decide(existing.website.as_ref(), incoming.website.as_ref()).into_update(),
        phone: decide(existing.phone.as_ref(), incoming.phone.as_ref()).into_update(),
        description: decide(existing.description.as_ref(), incoming.description.as_ref())
            .into_update(),
        latitude: decide(existing.latitude.as_ref(), incoming.latitude.as_ref()).into_update(),
        longitude: decide(existing.longitude.as_ref(), incoming.longitude.as_ref()).into_update(),
        updated_at: None,
    };

    if changes == BreweryChanges::default() {
        None
    } else {
        changes.updated_at = Some(now);
        Some(changes)
    }
}

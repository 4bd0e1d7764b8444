//! Idempotent writes into the catalog.
//!
//! Breweries are matched by name and beers by `(name, brewery)`, both
//! case-insensitively after whitespace cleanup. Existing rows only ever have
//! their missing fields filled (see [`crate::merge`]). Association rows are
//! unique per `(beer, brewery)`; touching one refreshes it in place.

use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::Integer;
use diesel::sqlite::{Sqlite, SqliteConnection};

use crate::classify::Classifier;
use crate::db::lower;
use crate::error::{Error, Result};
use crate::merge::{merge_beer, merge_brewery};
use crate::models::{
    Beer, Brewery, Category, NewBeer, NewBeerLocation, NewBrewery, NewCategory,
};
use crate::normalize::{collapse_whitespace, BreweryInfo, NormalizedBeer};
use crate::schema::{beer_categories, beer_locations, beers, breweries};
use crate::taxonomy::{self, CategoryId, CategoryNode, CategoryStore, Taxonomy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upserted {
    pub id: i32,
    pub outcome: UpsertOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationOutcome {
    Created,
    Touched,
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub fn find_brewery(conn: &mut SqliteConnection, name: &str) -> Result<Option<Brewery>> {
    let name = collapse_whitespace(name);

    Ok(breweries::table
        .filter(lower(breweries::name).eq(lower(name)))
        .select(Brewery::as_select())
        .order(breweries::id.asc())
        .first(conn)
        .optional()?)
}

pub fn find_beer(
    conn: &mut SqliteConnection,
    name: &str,
    brewery_id: i32,
) -> Result<Option<Beer>> {
    let name = collapse_whitespace(name);

    Ok(beers::table
        .filter(beers::brewery_id.eq(brewery_id))
        .filter(lower(beers::name).eq(lower(name)))
        .select(Beer::as_select())
        .order(beers::id.asc())
        .first(conn)
        .optional()?)
}

pub fn upsert_brewery(conn: &mut SqliteConnection, info: &BreweryInfo) -> Result<Upserted> {
    if let Some(existing) = find_brewery(conn, &info.name)? {
        let outcome = match merge_brewery(&existing, info, now()) {
            Some(changes) => {
                diesel::update(&existing).set(&changes).execute(conn)?;
                UpsertOutcome::Updated
            }
            None => UpsertOutcome::Unchanged,
        };

        return Ok(Upserted {
            id: existing.id,
            outcome,
        });
    }

    let new_brewery = NewBrewery {
        name: &info.name,
        address: info.address.as_deref(),
        city: info.city.as_deref(),
        state: info.state.as_deref(),
        website: info.website.as_deref(),
        phone: info.phone.as_deref(),
        description: info.description.as_deref(),
        latitude: info.latitude,
        longitude: info.longitude,
    };

    diesel::insert_into(breweries::table)
        .values(&new_brewery)
        .execute(conn)?;

    let id = breweries::table
        .filter(breweries::name.eq(info.name.as_str()))
        .select(breweries::id)
        .first(conn)?;

    Ok(Upserted {
        id,
        outcome: UpsertOutcome::Created,
    })
}

/// Inserts or fills in a beer of `brewery_id`. `category_id` is used for new
/// rows and for existing rows that are still uncategorized.
pub fn upsert_beer(
    conn: &mut SqliteConnection,
    beer: &NormalizedBeer,
    category_id: CategoryId,
    brewery_id: i32,
) -> Result<Upserted> {
    if let Some(existing) = find_beer(conn, &beer.name, brewery_id)? {
        let outcome = match merge_beer(&existing, beer, category_id, now()) {
            Some(changes) => {
                diesel::update(&existing).set(&changes).execute(conn)?;
                UpsertOutcome::Updated
            }
            None => UpsertOutcome::Unchanged,
        };

        return Ok(Upserted {
            id: existing.id,
            outcome,
        });
    }

    let beer_type = Some(beer.beer_type.as_str()).filter(|t| !t.is_empty());
    let new_beer = NewBeer {
        name: &beer.name,
        brewery_id,
        beer_type,
        abv: beer.abv,
        ibu: beer.ibu,
        description: beer.description.as_deref(),
        category_id: Some(category_id),
        image_url: beer.image_url.as_deref(),
        rating: beer.rating,
    };

    diesel::insert_into(beers::table)
        .values(&new_beer)
        .execute(conn)?;

    let id = beers::table
        .filter(beers::brewery_id.eq(brewery_id))
        .filter(beers::name.eq(beer.name.as_str()))
        .select(beers::id)
        .first(conn)?;

    Ok(Upserted {
        id,
        outcome: UpsertOutcome::Created,
    })
}

/// Records that `beer_id` is available at `brewery_id`.
pub fn ensure_association(
    conn: &mut SqliteConnection,
    beer_id: i32,
    brewery_id: i32,
) -> Result<AssociationOutcome> {
    let touched = diesel::update(
        beer_locations::table
            .filter(beer_locations::beer_id.eq(beer_id))
            .filter(beer_locations::brewery_id.eq(brewery_id)),
    )
    .set((
        beer_locations::is_available.eq(true),
        beer_locations::last_updated.eq(now()),
    ))
    .execute(conn)?;

    if touched > 0 {
        return Ok(AssociationOutcome::Touched);
    }

    diesel::insert_into(beer_locations::table)
        .values(&NewBeerLocation {
            beer_id,
            brewery_id,
            is_available: true,
        })
        .execute(conn)?;

    Ok(AssociationOutcome::Created)
}

/// The catalog's `beer_categories` table seen as a [`CategoryStore`].
pub struct SqliteCategories<'a>(pub &'a mut SqliteConnection);

fn child_category<'a>(
    name: &'a str,
    parent: Option<CategoryId>,
) -> beer_categories::BoxedQuery<'a, Sqlite, Integer> {
    let query = beer_categories::table
        .filter(beer_categories::name.eq(name))
        .select(beer_categories::id)
        .order(beer_categories::id.asc())
        .into_boxed();

    match parent {
        Some(parent_id) => query.filter(beer_categories::parent_id.eq(parent_id)),
        None => query.filter(beer_categories::parent_id.is_null()),
    }
}

impl<'a> CategoryStore for SqliteCategories<'a> {
    fn find_or_create(
        &mut self,
        name: &str,
        parent: Option<CategoryId>,
        description: Option<&str>,
    ) -> Result<CategoryId> {
        let conn = &mut *self.0;

        if let Some(id) = child_category(name, parent).first::<i32>(conn).optional()? {
            return Ok(id);
        }

        load_taxonomy(conn)?.check_parent(name, parent)?;

        diesel::insert_into(beer_categories::table)
            .values(&NewCategory {
                name,
                parent_id: parent,
                description,
            })
            .execute(conn)?;

        Ok(child_category(name, parent).first::<i32>(conn)?)
    }
}

pub fn load_taxonomy(conn: &mut SqliteConnection) -> Result<Taxonomy> {
    let categories = beer_categories::table
        .select(Category::as_select())
        .order(beer_categories::id.asc())
        .load::<Category>(conn)?;

    Ok(Taxonomy::from_nodes(
        categories
            .into_iter()
            .map(|c| CategoryNode {
                id: c.id,
                name: c.name,
                parent_id: c.parent_id,
                description: c.description,
            })
            .collect(),
    ))
}

/// Seeds the default taxonomy into the catalog (a no-op when it is already
/// there) and returns the resulting tree.
pub fn seed_taxonomy(conn: &mut SqliteConnection) -> Result<Taxonomy> {
    conn.transaction::<_, Error, _>(|conn| taxonomy::seed(&mut SqliteCategories(conn)))?;

    let taxonomy = load_taxonomy(conn)?;
    debug!(
        "Taxonomy v{} ready with {} categories",
        taxonomy::TAXONOMY_VERSION,
        taxonomy.len()
    );
    Ok(taxonomy)
}

/// Runs the classifier over stored beers. Only uncategorized beers are
/// touched unless `reclassify_all` is set. Returns the number of rows whose
/// category changed.
pub fn assign_categories(
    conn: &mut SqliteConnection,
    classifier: &Classifier,
    reclassify_all: bool,
) -> Result<usize> {
    let mut query = beers::table.select(Beer::as_select()).into_boxed();
    if !reclassify_all {
        query = query.filter(beers::category_id.is_null());
    }
    let candidates = query.order(beers::id.asc()).load::<Beer>(conn)?;

    let mut changed = 0;
    let mut fell_through = 0;
    for beer in candidates {
        let category_id = classifier.classify_text(
            &beer.name,
            beer.beer_type.as_deref().unwrap_or(""),
            beer.description.as_deref().unwrap_or(""),
        );

        if category_id == classifier.catch_all() {
            fell_through += 1;
        }
        if beer.category_id == Some(category_id) {
            continue;
        }

        diesel::update(&beer)
            .set(beers::category_id.eq(category_id))
            .execute(conn)?;
        debug!("Assigned category {} to '{}'", category_id, beer.name);
        changed += 1;
    }

    if fell_through > 0 {
        debug!("{} beers matched no style rule", fell_through);
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;
    use crate::normalize::{normalize, RawBeer};

    fn revolution() -> BreweryInfo {
        BreweryInfo {
            name: "Revolution Brewing".into(),
            ..BreweryInfo::default()
        }
    }

    fn anti_hero() -> NormalizedBeer {
        normalize(&RawBeer {
            name: Some("Anti-Hero IPA".into()),
            beer_type: Some("IPA".into()),
            abv: Some("6.7%".into()),
            ..RawBeer::default()
        })
        .unwrap()
    }

    fn count_beers(conn: &mut SqliteConnection) -> i64 {
        beers::table.count().get_result(conn).unwrap()
    }

    fn count_locations(conn: &mut SqliteConnection) -> i64 {
        beer_locations::table.count().get_result(conn).unwrap()
    }

    #[test]
    fn brewery_lookup_ignores_case_and_spacing() {
        let mut conn = test_connection();
        let first = upsert_brewery(&mut conn, &revolution()).unwrap();
        assert_eq!(first.outcome, UpsertOutcome::Created);

        let drifted = BreweryInfo {
            name: "revolution  brewing".into(),
            ..BreweryInfo::default()
        };
        let second = upsert_brewery(&mut conn, &drifted).unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.outcome, UpsertOutcome::Unchanged);
        let stored = find_brewery(&mut conn, "Revolution Brewing").unwrap().unwrap();
        assert_eq!(stored.name, "Revolution Brewing");
    }

    #[test]
    fn brewery_fields_are_filled_not_overwritten() {
        let mut conn = test_connection();
        let info = BreweryInfo {
            website: Some("https://revbrew.com".into()),
            ..revolution()
        };
        let id = upsert_brewery(&mut conn, &info).unwrap().id;

        let update = BreweryInfo {
            website: Some("https://example.com".into()),
            phone: Some("773-227-2739".into()),
            ..revolution()
        };
        let result = upsert_brewery(&mut conn, &update).unwrap();
        assert_eq!(result.outcome, UpsertOutcome::Updated);

        let stored = find_brewery(&mut conn, "Revolution Brewing").unwrap().unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.website.as_deref(), Some("https://revbrew.com"));
        assert_eq!(stored.phone.as_deref(), Some("773-227-2739"));
    }

    #[test]
    fn beer_upsert_is_idempotent() {
        let mut conn = test_connection();
        let taxonomy = seed_taxonomy(&mut conn).unwrap();
        let ipa = taxonomy.resolve("IPA").unwrap();
        let brewery_id = upsert_brewery(&mut conn, &revolution()).unwrap().id;

        let first = upsert_beer(&mut conn, &anti_hero(), ipa, brewery_id).unwrap();
        let second = upsert_beer(&mut conn, &anti_hero(), ipa, brewery_id).unwrap();

        assert_eq!(first.outcome, UpsertOutcome::Created);
        assert_eq!(second.outcome, UpsertOutcome::Unchanged);
        assert_eq!(first.id, second.id);
        assert_eq!(count_beers(&mut conn), 1);

        let stored = find_beer(&mut conn, "Anti-Hero IPA", brewery_id).unwrap().unwrap();
        assert_eq!(stored.abv, Some(6.7));
        assert_eq!(stored.beer_type.as_deref(), Some("IPA"));
        assert_eq!(stored.category_id, Some(ipa));
        assert_eq!(stored.description, None);
    }

    #[test]
    fn same_name_at_two_breweries_is_two_beers() {
        let mut conn = test_connection();
        let taxonomy = seed_taxonomy(&mut conn).unwrap();
        let other = taxonomy.catch_all().unwrap();
        let a = upsert_brewery(&mut conn, &revolution()).unwrap().id;
        let b = upsert_brewery(
            &mut conn,
            &BreweryInfo {
                name: "Half Acre".into(),
                ..BreweryInfo::default()
            },
        )
        .unwrap()
        .id;

        let beer = anti_hero();
        let x = upsert_beer(&mut conn, &beer, other, a).unwrap();
        let y = upsert_beer(&mut conn, &beer, other, b).unwrap();
        assert_ne!(x.id, y.id);
        assert_eq!(count_beers(&mut conn), 2);
    }

    #[test]
    fn description_fill_keeps_abv_and_type() {
        let mut conn = test_connection();
        let taxonomy = seed_taxonomy(&mut conn).unwrap();
        let ipa = taxonomy.resolve("IPA").unwrap();
        let brewery_id = upsert_brewery(&mut conn, &revolution()).unwrap().id;
        upsert_beer(&mut conn, &anti_hero(), ipa, brewery_id).unwrap();

        let with_description = NormalizedBeer {
            description: Some("new description".into()),
            abv: Some(7.0),
            beer_type: "Hazy IPA".into(),
            ..anti_hero()
        };
        let result = upsert_beer(&mut conn, &with_description, ipa, brewery_id).unwrap();
        assert_eq!(result.outcome, UpsertOutcome::Updated);

        let stored = find_beer(&mut conn, "Anti-Hero IPA", brewery_id).unwrap().unwrap();
        assert_eq!(stored.description.as_deref(), Some("new description"));
        assert_eq!(stored.abv, Some(6.7));
        assert_eq!(stored.beer_type.as_deref(), Some("IPA"));

        let other_description = NormalizedBeer {
            description: Some("Y".into()),
            ..anti_hero()
        };
        upsert_beer(&mut conn, &other_description, ipa, brewery_id).unwrap();
        let stored = find_beer(&mut conn, "Anti-Hero IPA", brewery_id).unwrap().unwrap();
        assert_eq!(stored.description.as_deref(), Some("new description"));
    }

    #[test]
    fn association_is_unique() {
        let mut conn = test_connection();
        let taxonomy = seed_taxonomy(&mut conn).unwrap();
        let brewery_id = upsert_brewery(&mut conn, &revolution()).unwrap().id;
        let beer_id = upsert_beer(&mut conn, &anti_hero(), taxonomy.catch_all().unwrap(), brewery_id)
            .unwrap()
            .id;

        assert_eq!(
            ensure_association(&mut conn, beer_id, brewery_id).unwrap(),
            AssociationOutcome::Created
        );

        diesel::update(beer_locations::table)
            .set(beer_locations::is_available.eq(false))
            .execute(&mut conn)
            .unwrap();

        assert_eq!(
            ensure_association(&mut conn, beer_id, brewery_id).unwrap(),
            AssociationOutcome::Touched
        );
        assert_eq!(count_locations(&mut conn), 1);

        let available: bool = beer_locations::table
            .select(beer_locations::is_available)
            .first(&mut conn)
            .unwrap();
        assert!(available);
    }

    #[test]
    fn seeding_the_catalog_twice_adds_nothing() {
        let mut conn = test_connection();
        let first = seed_taxonomy(&mut conn).unwrap();
        let second = seed_taxonomy(&mut conn).unwrap();

        assert_eq!(first.len(), Taxonomy::build_default().len());
        assert_eq!(first.nodes(), second.nodes());
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let mut conn = test_connection();
        let mut store = SqliteCategories(&mut conn);
        assert!(matches!(
            store.find_or_create("Orphan", Some(999), None),
            Err(Error::UnknownParent(999))
        ));
    }

    #[test]
    fn fourth_level_is_rejected() {
        let mut conn = test_connection();
        let taxonomy = seed_taxonomy(&mut conn).unwrap();
        let neipa = taxonomy.resolve("New England IPA").unwrap();

        match SqliteCategories(&mut conn).find_or_create("Milkshake IPA", Some(neipa), None) {
            Err(Error::TaxonomyTooDeep(name)) => assert_eq!(name, "Milkshake IPA"),
            other => panic!("expected depth error, got {:?}", other),
        }

        let stored = beer_categories::table
            .filter(beer_categories::name.eq("Milkshake IPA"))
            .count()
            .get_result::<i64>(&mut conn)
            .unwrap();
        assert_eq!(stored, 0);
        assert_eq!(load_taxonomy(&mut conn).unwrap().len(), taxonomy.len());
    }

    #[test]
    fn assigns_missing_categories() {
        let mut conn = test_connection();
        let taxonomy = seed_taxonomy(&mut conn).unwrap();
        let classifier = Classifier::new(&taxonomy).unwrap();
        let brewery_id = upsert_brewery(&mut conn, &revolution()).unwrap().id;

        diesel::insert_into(beers::table)
            .values(&NewBeer {
                name: "Deth's Tar",
                brewery_id,
                beer_type: Some("Imperial Stout"),
                abv: Some(13.0),
                ibu: None,
                description: None,
                category_id: None,
                image_url: None,
                rating: None,
            })
            .execute(&mut conn)
            .unwrap();

        assert_eq!(assign_categories(&mut conn, &classifier, false).unwrap(), 1);
        assert_eq!(assign_categories(&mut conn, &classifier, false).unwrap(), 0);
        assert_eq!(assign_categories(&mut conn, &classifier, true).unwrap(), 0);

        let stored = find_beer(&mut conn, "deth's tar", brewery_id).unwrap().unwrap();
        assert_eq!(stored.category_id, Some(taxonomy.resolve("Imperial Stout").unwrap()));
    }
}

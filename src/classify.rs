//! Assigns every beer to exactly one node of the style taxonomy.
//!
//! Classification walks an ordered list of `(pattern, category)` rules over
//! `name + type + description` and stops at the first match. Patterns overlap,
//! so the order of [`DEFAULT_RULES`] decides outcomes: variants come before
//! their style ("Imperial Stout" before "Stout", "Session IPA" before IPA and
//! before "Session"), and narrow styles before broad ones ("Light Lager"
//! before "Lager", "Barleywine" before anything that mentions wine). Lager
//! styles come before the colour words "amber" and "brown".

use regex::Regex;

use crate::error::Result;
use crate::normalize::NormalizedBeer;
use crate::taxonomy::{CategoryId, Taxonomy};

/// The decision list, highest priority first. Patterns are matched against
/// lower-cased text.
pub static DEFAULT_RULES: &[(&str, &str)] = &[
    // IPA variants, then IPA itself.
    (r"session\s+ipa", "Session IPA"),
    (r"new england|\bneipa\b|\bhazy\b|\bjuicy ipa\b", "New England IPA"),
    (r"triple\s+ipa|\btipa\b", "Triple IPA"),
    (r"double\s+ipa|imperial\s+ipa|\bdipa\b|\biipa\b", "Double/Imperial IPA"),
    (r"english\s+ipa", "English IPA"),
    (r"american\s+ipa|west coast ipa", "American IPA"),
    (r"\bipa\b|india pale ale", "IPA"),
    // Stout variants, then stout and porter.
    (r"imperial\s+stout|russian imperial", "Imperial Stout"),
    (r"milk\s+stout|sweet\s+stout|cream\s+stout", "Milk Stout"),
    (r"oatmeal\s+stout|oat\s+stout", "Oatmeal Stout"),
    (r"coffee\s+stout|espresso\s+stout", "Coffee Stout"),
    (r"dry\s+stout|irish\s+stout", "Dry Stout"),
    (r"stout", "Stout"),
    (r"porter", "Porter"),
    // Strong ales before the pale/amber/brown catch phrases.
    (r"barley\s*wine", "Barleywine"),
    (r"scotch ale|scottish|wee heavy", "Scotch/Scottish Ale"),
    (r"strong ale|old ale", "Strong Ale"),
    (r"pale ale|blonde? ale|golden ale|\bapa\b", "Pale Ale"),
    // Lagers, narrow styles first. They sit above the colour words so an
    // "amber lager" or a bock described as "deep amber" stays a lager.
    (r"pilsner|pilsener|\bpils\b", "Pilsner"),
    (r"light lager|american light|\blite\b", "Light Lager"),
    (r"k(o|ö|oe)lsch", "Kölsch"),
    (r"bock", "Bock"),
    (r"hybrid|california common|steam beer|cream ale|altbier", "Hybrid"),
    (r"lager|helles|m[aä]rzen|oktoberfest|vienna|dortmunder|\bdunkel\b", "Lager"),
    (r"amber|red ale|irish red", "Amber/Red Ale"),
    (r"brown ale|nut brown|\bbrown\b", "Brown Ale"),
    (r"wheat|hefeweizen|weizen|witbier|\bwit\b|white ale|weisse?\b", "Wheat Beer"),
    // Mixed fermentation.
    (r"\bsours?\b|\bgose\b|berliner|lambic|gueuze|geuze|flanders|wild ale", "Sour"),
    (r"\bwild\b|\bbrett|brettanomyces|spontaneous", "Wild/Spontaneous"),
    (r"farmhouse|saison|bi[eè]re de garde", "Farmhouse"),
    (r"belgian|abbey|trappist|dubbel|tripel|quadrupel|\bquad\b", "Belgian"),
    // Adjunct and process driven styles.
    (r"smoked|rauch|smoke", "Smoked Beer"),
    (r"fruit|berry|cherry|apricot|peach|mango|pumpkin|watermelon|passion\s?fruit|guava", "Fruit/Vegetable Beer"),
    (r"spice|herb|chai|ginger|pepper|chocolate|coffee|vanilla", "Spice/Herb/Specialty"),
    (r"session", "Session"),
];

lazy_static! {
    static ref COMPILED_DEFAULT_RULES: Vec<(Regex, &'static str)> = DEFAULT_RULES
        .iter()
        .map(|(pattern, category)| (Regex::new(pattern).unwrap(), *category))
        .collect();
}

/// The rule table bound to the ids of one concrete taxonomy.
pub struct Classifier {
    rules: Vec<(Regex, CategoryId)>,
    catch_all: CategoryId,
}

impl Classifier {
    /// Binds `DEFAULT_RULES` to `taxonomy`. Rules naming a category the
    /// taxonomy does not have are dropped with a warning.
    pub fn new(taxonomy: &Taxonomy) -> Result<Classifier> {
        Classifier::from_compiled(taxonomy, COMPILED_DEFAULT_RULES.iter().cloned())
    }

    fn from_compiled<'a, I>(taxonomy: &Taxonomy, rules: I) -> Result<Classifier>
    where
        I: IntoIterator<Item = (Regex, &'a str)>,
    {
        let catch_all = taxonomy.catch_all()?;

        let rules = rules
            .into_iter()
            .filter_map(|(regex, category)| match taxonomy.resolve(category) {
                Ok(id) => Some((regex, id)),
                Err(_) => {
                    warn!("Dropping classification rule for unknown category '{}'", category);
                    None
                }
            })
            .collect();

        Ok(Classifier { rules, catch_all })
    }

    pub fn catch_all(&self) -> CategoryId {
        self.catch_all
    }

    pub fn classify(&self, beer: &NormalizedBeer) -> CategoryId {
        self.classify_text(
            &beer.name,
            &beer.beer_type,
            beer.description.as_deref().unwrap_or(""),
        )
    }

    pub fn classify_text(&self, name: &str, beer_type: &str, description: &str) -> CategoryId {
        let text = format!("{} {} {}", name, beer_type, description).to_lowercase();

        self.rules
            .iter()
            .find(|(regex, _)| regex.is_match(&text))
            .map_or(self.catch_all, |(_, id)| *id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn beer(name: &str, beer_type: &str, description: Option<&str>) -> NormalizedBeer {
        NormalizedBeer {
            name: name.to_owned(),
            beer_type: beer_type.to_owned(),
            abv: None,
            ibu: None,
            description: description.map(str::to_owned),
            image_url: None,
            rating: None,
        }
    }

    fn classify_as(taxonomy: &Taxonomy, name: &str, beer_type: &str) -> String {
        let classifier = Classifier::new(taxonomy).unwrap();
        let id = classifier.classify(&beer(name, beer_type, None));
        taxonomy.get(id).unwrap().name.clone()
    }

    #[test]
    fn every_default_rule_resolves() {
        let taxonomy = Taxonomy::build_default();
        for (_, category) in DEFAULT_RULES {
            assert!(taxonomy.resolve(category).is_ok(), "{}", category);
        }
        let classifier = Classifier::new(&taxonomy).unwrap();
        assert_eq!(classifier.rules.len(), DEFAULT_RULES.len());
    }

    #[test]
    fn double_ipa_stays_in_ipa_family() {
        let taxonomy = Taxonomy::build_default();
        let classifier = Classifier::new(&taxonomy).unwrap();
        let id = classifier.classify(&beer("Galaxy Dream", "Double IPA", None));

        assert_eq!(taxonomy.get(id).unwrap().name, "Double/Imperial IPA");
        assert!(taxonomy.is_within(id, taxonomy.resolve("IPA").unwrap()));
        assert!(taxonomy.is_within(id, taxonomy.resolve("Ales").unwrap()));
    }

    #[test]
    fn imperial_stout_is_a_stout() {
        let taxonomy = Taxonomy::build_default();
        let classifier = Classifier::new(&taxonomy).unwrap();
        let id = classifier.classify(&beer("Deth's Tar", "Imperial Stout", None));

        assert_eq!(taxonomy.get(id).unwrap().name, "Imperial Stout");
        assert!(taxonomy.is_within(id, taxonomy.resolve("Stout").unwrap()));
    }

    #[test]
    fn plain_ipa() {
        let taxonomy = Taxonomy::build_default();
        assert_eq!(classify_as(&taxonomy, "Anti-Hero IPA", "IPA"), "IPA");
        assert_eq!(classify_as(&taxonomy, "Daisy Cutter", "India Pale Ale"), "IPA");
    }

    #[test]
    fn specific_patterns_win_over_general() {
        let taxonomy = Taxonomy::build_default();
        assert_eq!(classify_as(&taxonomy, "Easy Rider", "Session IPA"), "Session IPA");
        assert_eq!(classify_as(&taxonomy, "Porch Pounder", "Session Ale"), "Session");
        assert_eq!(classify_as(&taxonomy, "Hazy Wonder", "IPA"), "New England IPA");
        assert_eq!(classify_as(&taxonomy, "Old Reliable", "Barleywine"), "Barleywine");
        assert_eq!(classify_as(&taxonomy, "Rosé Barrel Saison", "Wine Barrel Saison"), "Farmhouse");
        assert_eq!(classify_as(&taxonomy, "Fun Time", "Light Lager"), "Light Lager");
        assert_eq!(classify_as(&taxonomy, "Rev Lager", "Lager"), "Lager");
        assert_eq!(classify_as(&taxonomy, "Tart Cherry Gose", ""), "Sour");
    }

    #[test]
    fn koelsch_with_and_without_diacritic() {
        let taxonomy = Taxonomy::build_default();
        assert_eq!(classify_as(&taxonomy, "Summer", "Kölsch"), "Kölsch");
        assert_eq!(classify_as(&taxonomy, "Summer", "Kolsch"), "Kölsch");
        assert_eq!(classify_as(&taxonomy, "Summer", "KOELSCH"), "Kölsch");
    }

    #[test]
    fn description_is_searched() {
        let taxonomy = Taxonomy::build_default();
        let classifier = Classifier::new(&taxonomy).unwrap();
        let id = classifier.classify(&beer(
            "Mystery Box",
            "",
            Some("A roasty porter aged on vanilla beans."),
        ));
        assert_eq!(taxonomy.get(id).unwrap().name, "Porter");
    }

    #[test]
    fn unmatched_falls_back_to_catch_all() {
        let taxonomy = Taxonomy::build_default();
        let classifier = Classifier::new(&taxonomy).unwrap();
        let id = classifier.classify(&beer("Mystery Box", "", None));
        assert_eq!(id, taxonomy.catch_all().unwrap());
        assert_eq!(classifier.classify(&beer("", "", None)), classifier.catch_all());
    }

    #[test]
    fn classification_is_deterministic() {
        let taxonomy = Taxonomy::build_default();
        let classifier = Classifier::new(&taxonomy).unwrap();
        let subject = beer("Half Acre Pony", "Pilsner", Some("German hops"));

        let first = classifier.classify(&subject);
        classifier.classify(&beer("Something else", "Stout", None));
        assert_eq!(classifier.classify(&subject), first);
        assert_eq!(Classifier::new(&taxonomy).unwrap().classify(&subject), first);
    }

    #[test]
    fn missing_categories_drop_their_rules() {
        let mut taxonomy = Taxonomy::default();
        use crate::taxonomy::CategoryStore;
        let specialty = taxonomy.find_or_create("Specialty", None, None).unwrap();
        let other = taxonomy.find_or_create("Other", Some(specialty), None).unwrap();
        let stout = taxonomy.find_or_create("Stout", None, None).unwrap();

        let classifier = Classifier::new(&taxonomy).unwrap();
        assert_eq!(classifier.classify(&beer("X", "Imperial Stout", None)), stout);
        assert_eq!(classifier.classify(&beer("X", "IPA", None)), other);
    }

    #[test]
    fn requires_catch_all() {
        let taxonomy = Taxonomy::default();
        assert!(matches!(
            Classifier::new(&taxonomy),
            Err(Error::MissingCatchAll(_))
        ));
    }

    #[test]
    fn custom_rule_order_changes_outcome() {
        let taxonomy = Taxonomy::build_default();
        let rules = vec![
            (Regex::new("stout").unwrap(), "Stout"),
            (Regex::new("imperial").unwrap(), "Imperial Stout"),
        ];
        let stout_first = Classifier::from_compiled(&taxonomy, rules).unwrap();
        let subject = beer("Big Bad", "Imperial Stout", None);
        assert_eq!(stout_first.classify(&subject), taxonomy.resolve("Stout").unwrap());
    }

    #[test]
    fn sourced_is_not_sour() {
        let taxonomy = Taxonomy::build_default();
        let classifier = Classifier::new(&taxonomy).unwrap();
        let pony = classifier.classify_text("Pony", "Pilsner", "Brewed with locally sourced malt.");
        assert_eq!(taxonomy.get(pony).unwrap().name, "Pilsner");
        let orchard = classifier.classify_text("Orchard Run", "Fruit Beer", "Made with locally sourced cherries.");
        assert_eq!(taxonomy.get(orchard).unwrap().name, "Fruit/Vegetable Beer");

        let sour = classifier.classify_text("Puckered", "American Sour", "");
        assert_eq!(taxonomy.get(sour).unwrap().name, "Sour");
        let sours = classifier.classify_text("Fruit Cup", "", "One of our kettle sours.");
        assert_eq!(taxonomy.get(sours).unwrap().name, "Sour");
    }

    #[test]
    fn colour_words_do_not_pull_lagers_into_ales() {
        let taxonomy = Taxonomy::build_default();
        let classifier = Classifier::new(&taxonomy).unwrap();
        let name_of = |name: &str, beer_type: &str, description: &str| {
            let id = classifier.classify_text(name, beer_type, description);
            taxonomy.get(id).unwrap().name.clone()
        };

        assert_eq!(name_of("Vienna Calling", "Amber Lager", ""), "Lager");
        assert_eq!(name_of("Munich Dunkel", "", "A smooth brown lager."), "Lager");
        assert_eq!(name_of("Goat Rodeo", "Bock", "Deep amber color."), "Bock");
        assert_eq!(name_of("Fistmas", "Amber Ale", ""), "Amber/Red Ale");
        assert_eq!(name_of("Nutty", "Brown Ale", ""), "Brown Ale");
        assert_eq!(name_of("Dark Days", "Dunkelweizen", ""), "Wheat Beer");

        let lagers = taxonomy.resolve("Lagers").unwrap();
        let bock = classifier.classify_text("Goat Rodeo", "Bock", "Deep amber color.");
        assert!(taxonomy.is_within(bock, lagers));
    }
}

//! The beer style hierarchy.
//!
//! Families sit at the top (Ales, Lagers, Mixed Fermentation & Specialty),
//! styles below them and, for a few styles, variants below that. The tree
//! never grows deeper than [`MAX_DEPTH`] and always contains the catch-all
//! [`CATCH_ALL`] leaf so that every beer has somewhere to go.

use crate::error::{Error, Result};

pub type CategoryId = i32;

/// Name of the leaf that unmatched beers fall back to.
pub const CATCH_ALL: &str = "Other";

pub const MAX_DEPTH: usize = 3;

/// Bump when `DEFAULT_TAXONOMY` changes.
pub const TAXONOMY_VERSION: u32 = 1;

pub struct VariantDef {
    pub name: &'static str,
    pub description: &'static str,
}

pub struct StyleDef {
    pub name: &'static str,
    pub description: &'static str,
    pub variants: &'static [VariantDef],
}

pub struct FamilyDef {
    pub name: &'static str,
    pub description: &'static str,
    pub styles: &'static [StyleDef],
}

const fn style(name: &'static str, description: &'static str) -> StyleDef {
    StyleDef {
        name,
        description,
        variants: &[],
    }
}

const fn variant(name: &'static str, description: &'static str) -> VariantDef {
    VariantDef { name, description }
}

pub static DEFAULT_TAXONOMY: &[FamilyDef] = &[
    FamilyDef {
        name: "Ales",
        description: "Beers fermented with top-fermenting yeast at warmer temperatures.",
        styles: &[
            StyleDef {
                name: "IPA",
                description: "India Pale Ales, characterized by hoppy flavor and aroma.",
                variants: &[
                    variant("American IPA", "Bold hop flavors with citrus and pine notes."),
                    variant("English IPA", "More balanced, with earthy hop character."),
                    variant("Double/Imperial IPA", "Stronger, more intense IPAs."),
                    variant("Triple IPA", "Very high alcohol and hop intensity."),
                    variant("Session IPA", "Lower alcohol IPAs with hop character."),
                    variant("New England IPA", "Hazy, juicy IPAs with low bitterness."),
                ],
            },
            style("Pale Ale", "Light to amber colored ales with balanced hop and malt."),
            style("Amber/Red Ale", "Amber to red colored ales with caramel flavors."),
            style("Brown Ale", "Brown colored ales with nutty, toffee flavors."),
            style("Porter", "Dark ale with roasted malt flavors."),
            StyleDef {
                name: "Stout",
                description: "Very dark ales with roasted barley flavors.",
                variants: &[
                    variant("Dry Stout", "Dry, roasted stouts like Guinness."),
                    variant("Imperial Stout", "Strong, intense stouts."),
                    variant("Milk Stout", "Sweet stouts brewed with lactose."),
                    variant("Oatmeal Stout", "Smooth stouts brewed with oats."),
                    variant("Coffee Stout", "Stouts with coffee flavor."),
                ],
            },
            style("Wheat Beer", "Ales brewed with significant proportion of wheat."),
            style("Belgian", "Belgian-style ales with fruity, spicy characteristics."),
            style("Barleywine", "Strong ales with intense malt flavors."),
            style("Scotch/Scottish Ale", "Malty, caramel-forward ales from Scotland."),
            style("Strong Ale", "Higher alcohol ales with rich flavors."),
            style("Session", "Low alcohol ales built for drinkability."),
        ],
    },
    FamilyDef {
        name: "Lagers",
        description: "Beers fermented with bottom-fermenting yeast at cooler temperatures.",
        styles: &[
            style("Pilsner", "Pale lagers with crisp hop bitterness."),
            style("Lager", "Clean, crisp beers with subtle flavors."),
            style("Light Lager", "Very pale, light-bodied lagers."),
            style("Bock", "Strong lagers with rich malt flavors."),
            style("Kölsch", "Hybrid ale/lager style, light and crisp."),
            style("Hybrid", "Cream ales, altbiers and California commons."),
        ],
    },
    FamilyDef {
        name: "Mixed Fermentation & Specialty",
        description: "Wild and mixed-culture beers, and beers defined by an adjunct or process.",
        styles: &[
            style("Sour", "Tart, acidic beers."),
            style("Wild/Spontaneous", "Beers fermented with wild yeasts like Brettanomyces."),
            style("Farmhouse", "Rustic styles including Saison and Biere de Garde."),
            style("Fruit/Vegetable Beer", "Beers brewed with fruit or vegetables."),
            style("Spice/Herb/Specialty", "Beers brewed with spices, herbs or other adjuncts."),
            style("Smoked Beer", "Beers brewed with smoked malt."),
            style(CATCH_ALL, "Beers that don't fit into standard categories."),
        ],
    },
];

/// Anything that can hold category nodes: the in-memory [`Taxonomy`] or the
/// catalog database.
pub trait CategoryStore {
    /// Returns the id of the child of `parent` called `name`, creating it if
    /// it does not exist yet.
    fn find_or_create(
        &mut self,
        name: &str,
        parent: Option<CategoryId>,
        description: Option<&str>,
    ) -> Result<CategoryId>;
}

/// Writes `DEFAULT_TAXONOMY` into `store`. Seeding an already seeded store
/// creates nothing.
pub fn seed<S: CategoryStore + ?Sized>(store: &mut S) -> Result<()> {
    for family in DEFAULT_TAXONOMY {
        let family_id = store.find_or_create(family.name, None, Some(family.description))?;

        for style in family.styles {
            let style_id =
                store.find_or_create(style.name, Some(family_id), Some(style.description))?;

            for variant in style.variants {
                store.find_or_create(variant.name, Some(style_id), Some(variant.description))?;
            }
        }
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryNode {
    pub id: CategoryId,
    pub name: String,
    pub parent_id: Option<CategoryId>,
    pub description: Option<String>,
}

/// An in-memory copy of the category tree, ordered by id.
///
/// Built once per process (from the defaults or from the catalog) and passed
/// to whatever needs to look categories up.
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    nodes: Vec<CategoryNode>,
}

impl Taxonomy {
    /// The default tree, with ids assigned from 1 in seeding order.
    #[cfg(test)]
    pub fn build_default() -> Taxonomy {
        let mut taxonomy = Taxonomy::default();
        // Every parent id handed out by `seed` was just created and no
        // definition is deeper than MAX_DEPTH.
        seed(&mut taxonomy).expect("default taxonomy is well formed");
        taxonomy
    }

    pub fn from_nodes(mut nodes: Vec<CategoryNode>) -> Taxonomy {
        nodes.sort_by_key(|n| n.id);
        Taxonomy { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[cfg(test)]
    pub fn nodes(&self) -> &[CategoryNode] {
        &self.nodes
    }

    pub fn get(&self, id: CategoryId) -> Option<&CategoryNode> {
        self.nodes
            .binary_search_by_key(&id, |n| n.id)
            .ok()
            .map(|idx| &self.nodes[idx])
    }

    /// Looks a category up by name. When several nodes share a name the one
    /// with the lowest id wins.
    pub fn resolve(&self, name: &str) -> Result<CategoryId> {
        self.nodes
            .iter()
            .find(|n| n.name == name)
            .map(|n| n.id)
            .ok_or_else(|| Error::CategoryNotFound(name.to_owned()))
    }

    pub fn resolve_child(&self, name: &str, parent: Option<CategoryId>) -> Option<CategoryId> {
        self.nodes
            .iter()
            .find(|n| n.name == name && n.parent_id == parent)
            .map(|n| n.id)
    }

    pub fn catch_all(&self) -> Result<CategoryId> {
        self.resolve(CATCH_ALL)
            .map_err(|_| Error::MissingCatchAll(CATCH_ALL))
    }

    pub fn roots(&self) -> impl Iterator<Item = &CategoryNode> {
        self.nodes.iter().filter(|n| n.parent_id.is_none())
    }

    pub fn children(&self, id: CategoryId) -> impl Iterator<Item = &CategoryNode> {
        self.nodes.iter().filter(move |n| n.parent_id == Some(id))
    }

    /// `id` followed by its parent, grandparent, and so on up to the root.
    pub fn ancestors(&self, id: CategoryId) -> Vec<CategoryId> {
        let mut chain = Vec::new();
        let mut current = self.get(id);

        while let Some(node) = current {
            // A corrupted table could contain a parent cycle.
            if chain.contains(&node.id) {
                break;
            }
            chain.push(node.id);
            current = node.parent_id.and_then(|p| self.get(p));
        }

        chain
    }

    pub fn depth(&self, id: CategoryId) -> usize {
        self.ancestors(id).len()
    }

    #[cfg(test)]
    pub fn is_within(&self, id: CategoryId, ancestor: CategoryId) -> bool {
        self.ancestors(id).contains(&ancestor)
    }

    /// `id` and every category below it.
    pub fn subtree(&self, id: CategoryId) -> Vec<CategoryId> {
        if self.get(id).is_none() {
            return Vec::new();
        }

        let mut found = vec![id];
        let mut idx = 0;
        while idx < found.len() {
            let parent = found[idx];
            for child in self.children(parent) {
                if !found.contains(&child.id) {
                    found.push(child.id);
                }
            }
            idx += 1;
        }

        found
    }
}

impl Taxonomy {
    /// Checks that a new child `name` may be attached under `parent`.
    pub fn check_parent(&self, name: &str, parent: Option<CategoryId>) -> Result<()> {
        let parent_id = match parent {
            Some(parent_id) => parent_id,
            None => return Ok(()),
        };

        if self.get(parent_id).is_none() {
            return Err(Error::UnknownParent(parent_id));
        }
        if self.depth(parent_id) >= MAX_DEPTH {
            return Err(Error::TaxonomyTooDeep(name.to_owned()));
        }

        Ok(())
    }
}

impl CategoryStore for Taxonomy {
    fn find_or_create(
        &mut self,
        name: &str,
        parent: Option<CategoryId>,
        description: Option<&str>,
    ) -> Result<CategoryId> {
        if let Some(id) = self.resolve_child(name, parent) {
            return Ok(id);
        }

        self.check_parent(name, parent)?;

        let id = self.nodes.last().map_or(1, |n| n.id + 1);
        self.nodes.push(CategoryNode {
            id,
            name: name.to_owned(),
            parent_id: parent,
            description: description.map(str::to_owned),
        });

        Ok(id)
    }
}

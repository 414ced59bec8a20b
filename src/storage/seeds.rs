//! Default reference data, per display language.
//!
//! Seeded rows use fixed ids so that a language change can rewrite their
//! names in place without disturbing food item references.

use crate::models::{Language, ReferenceKind, ReferenceRecord};

/// Icons of the default categories, by id (1-based).
const CATEGORY_ICONS: [&str; 8] = [
    "cheese",
    "food-steak",
    "carrot",
    "food-apple",
    "cup",
    "cookie",
    "snowflake",
    "dots-horizontal",
];

/// Icons of the default locations, by id (1-based).
const LOCATION_ICONS: [&str; 4] = ["fridge", "fridge-industrial", "cupboard", "countertop"];

const fn category_names(language: Language) -> [&'static str; 8] {
    match language {
        Language::En => [
            "Dairy",
            "Meat",
            "Vegetables",
            "Fruits",
            "Beverages",
            "Snacks",
            "Frozen",
            "Other",
        ],
        Language::Es => [
            "Lácteos",
            "Carne",
            "Verduras",
            "Frutas",
            "Bebidas",
            "Aperitivos",
            "Congelados",
            "Otros",
        ],
        Language::Fr => [
            "Produits laitiers",
            "Viande",
            "Légumes",
            "Fruits",
            "Boissons",
            "Snacks",
            "Surgelés",
            "Autres",
        ],
        Language::De => [
            "Milchprodukte",
            "Fleisch",
            "Gemüse",
            "Obst",
            "Getränke",
            "Snacks",
            "Tiefkühlkost",
            "Sonstiges",
        ],
    }
}

const fn location_names(language: Language) -> [&'static str; 4] {
    match language {
        Language::En => ["Fridge", "Freezer", "Pantry", "Counter"],
        Language::Es => ["Nevera", "Congelador", "Despensa", "Encimera"],
        Language::Fr => ["Réfrigérateur", "Congélateur", "Garde-manger", "Plan de travail"],
        Language::De => ["Kühlschrank", "Gefrierschrank", "Speisekammer", "Arbeitsplatte"],
    }
}

/// Default categories and locations for one language, keyed by fixed id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedSet {
    /// Language the names are in.
    pub language: Language,
    /// Default categories, ids 1..=8.
    pub categories: Vec<ReferenceRecord>,
    /// Default locations, ids 1..=4.
    pub locations: Vec<ReferenceRecord>,
}

impl SeedSet {
    /// Builds the seed set for `language`.
    #[must_use]
    pub fn for_language(language: Language) -> Self {
        Self {
            language,
            categories: build(&category_names(language), &CATEGORY_ICONS),
            locations: build(&location_names(language), &LOCATION_ICONS),
        }
    }

    /// Returns the seeded rows of one kind.
    #[must_use]
    pub fn records(&self, kind: ReferenceKind) -> &[ReferenceRecord] {
        match kind {
            ReferenceKind::Category => &self.categories,
            ReferenceKind::Location => &self.locations,
        }
    }
}

fn build(names: &[&str], icons: &[&str]) -> Vec<ReferenceRecord> {
    names
        .iter()
        .zip(icons)
        .zip(1_i64..)
        .map(|((name, icon), id)| ReferenceRecord::new(id, *name, *icon))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_language_has_the_same_ids_and_icons() {
        let english = SeedSet::for_language(Language::En);
        for language in Language::all() {
            let seeds = SeedSet::for_language(*language);
            for kind in ReferenceKind::all() {
                let ids: Vec<_> = seeds.records(*kind).iter().map(|r| (r.id, &r.icon)).collect();
                let expected: Vec<_> = english
                    .records(*kind)
                    .iter()
                    .map(|r| (r.id, &r.icon))
                    .collect();
                assert_eq!(ids, expected, "{language} {kind}");
            }
        }
    }

    #[test]
    fn test_ids_start_at_one() {
        let seeds = SeedSet::for_language(Language::Es);
        assert_eq!(seeds.categories[0], ReferenceRecord::new(1, "Lácteos", "cheese"));
        assert_eq!(seeds.locations[3].id, 4);
        assert_eq!(seeds.records(ReferenceKind::Category).len(), 8);
    }

    #[test]
    fn test_no_seed_is_a_placeholder() {
        for language in Language::all() {
            let seeds = SeedSet::for_language(*language);
            assert!(seeds.categories.iter().all(|r| !r.is_placeholder()));
            assert!(seeds.locations.iter().all(|r| !r.is_placeholder()));
        }
    }
}

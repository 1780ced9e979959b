//! Read-only recipe catalog

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::intent::RecipeKey;
use crate::{Error, Result};

/// Nutrition facts per serving
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nutrition {
    pub calories: u32,
    pub protein: u32,
    pub carbs: u32,
    pub fat: u32,
}

/// A catalog recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub cuisine: String,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
    /// Preparation time in minutes
    pub prep_time: u32,
    /// Cooking time in minutes
    pub cook_time: u32,
    pub servings: u32,
    #[serde(default)]
    pub nutrition: Nutrition,
}

impl Recipe {
    /// Total time in minutes
    #[must_use]
    pub const fn total_time(&self) -> u32 {
        self.prep_time.saturating_add(self.cook_time)
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(rename = "recipe")]
    recipes: Vec<Recipe>,
}

/// Fixed set of recipes, shared cheaply between owners
#[derive(Debug, Clone)]
pub struct RecipeCatalog {
    recipes: Arc<[Recipe]>,
}

impl Default for RecipeCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RecipeCatalog {
    /// Create a catalog from a list of recipes
    #[must_use]
    pub fn new(recipes: Vec<Recipe>) -> Self {
        Self {
            recipes: recipes.into(),
        }
    }

    /// Parse a catalog from TOML (`[[recipe]]` tables)
    ///
    /// # Errors
    ///
    /// Returns error if the TOML is malformed or contains no recipes
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)?;
        if file.recipes.is_empty() {
            return Err(Error::Config("recipe catalog is empty".to_string()));
        }
        Ok(Self::new(file.recipes))
    }

    /// Load a catalog from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), recipes = catalog.len(), "loaded recipe catalog");
        Ok(catalog)
    }

    /// All recipes in catalog order
    #[must_use]
    pub fn all(&self) -> &[Recipe] {
        &self.recipes
    }

    /// Number of recipes
    #[must_use]
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// Whether the catalog has no recipes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Look up a recipe by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.id == id)
    }

    /// First recipe whose name contains `fragment`, ignoring case
    #[must_use]
    pub fn find_by_name(&self, fragment: &str) -> Option<&Recipe> {
        let fragment = fragment.to_lowercase();
        self.recipes
            .iter()
            .find(|r| r.name.to_lowercase().contains(&fragment))
    }

    /// Resolve a voice lookup key
    ///
    /// # Errors
    ///
    /// Returns error if no recipe name matches the key
    pub fn resolve(&self, key: RecipeKey) -> Result<&Recipe> {
        self.find_by_name(key.name_fragment())
            .ok_or_else(|| Error::RecipeNotFound(key.name_fragment().to_string()))
    }

    /// Recipes whose name or cuisine contains `query`, ignoring case
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&Recipe> {
        let query = query.trim().to_lowercase();
        self.recipes
            .iter()
            .filter(|r| {
                r.name.to_lowercase().contains(&query) || r.cuisine.to_lowercase().contains(&query)
            })
            .collect()
    }

    /// The built-in catalog
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(vec![
            recipe(
                "1",
                "Butter Chicken",
                &[
                    "500g chicken thighs, cut into pieces",
                    "2 tbsp butter",
                    "1 large onion, finely chopped",
                    "4 cloves garlic, minced",
                    "1 tbsp fresh ginger paste",
                    "2 tbsp tomato paste",
                    "1 cup heavy cream",
                    "1 tbsp garam masala",
                    "1 tsp turmeric powder",
                    "1 tsp cumin powder",
                    "1 tsp red chili powder",
                    "Salt to taste",
                    "Fresh cilantro for garnish",
                ],
                &[
                    "Marinate chicken with yogurt, garam masala, turmeric, and salt for 30 minutes",
                    "Heat butter in a large pan over medium heat",
                    "Add chopped onions and sauté until golden brown",
                    "Add garlic and ginger paste, cook for 1 minute",
                    "Add tomato paste and spices, cook for 2 minutes",
                    "Add chicken and cook until browned on all sides",
                    "Pour in cream and simmer for 15 minutes",
                    "Garnish with cilantro and serve hot",
                ],
                (15, 30, 4),
                Nutrition {
                    calories: 450,
                    protein: 35,
                    carbs: 10,
                    fat: 30,
                },
            ),
            recipe(
                "2",
                "Palak Paneer",
                &[
                    "250g paneer, cubed",
                    "500g fresh spinach",
                    "1 large onion",
                    "4 cloves garlic",
                    "1 inch ginger",
                    "2 green chilies",
                    "1 tsp cumin seeds",
                    "1 tsp garam masala",
                    "1/2 cup cream",
                    "Salt to taste",
                ],
                &[
                    "Blanch spinach and blend to puree",
                    "Fry paneer cubes until golden",
                    "Sauté onions, garlic, and ginger",
                    "Add spices and spinach puree",
                    "Add paneer and cream",
                    "Simmer for 5 minutes",
                    "Serve with rice or naan",
                ],
                (20, 25, 4),
                Nutrition {
                    calories: 350,
                    protein: 20,
                    carbs: 15,
                    fat: 25,
                },
            ),
            recipe(
                "3",
                "Masala Dosa",
                &[
                    "2 cups rice",
                    "1 cup urad dal",
                    "Potato filling",
                    "Spices",
                    "Oil for cooking",
                ],
                &[
                    "Soak rice and dal for 6 hours",
                    "Grind to smooth batter",
                    "Ferment overnight",
                    "Prepare spiced potato filling",
                    "Make thin crepes on griddle",
                    "Add filling and fold",
                    "Serve with chutney",
                ],
                (480, 20, 6),
                Nutrition {
                    calories: 250,
                    protein: 8,
                    carbs: 45,
                    fat: 5,
                },
            ),
            recipe(
                "4",
                "Chicken Biryani",
                &[
                    "500g chicken",
                    "2 cups basmati rice",
                    "2 onions",
                    "Biryani spices",
                    "Yogurt",
                    "Ghee",
                    "Fresh herbs",
                ],
                &[
                    "Marinate chicken with yogurt and spices",
                    "Parboil rice with whole spices",
                    "Layer chicken and rice",
                    "Seal and cook on low heat",
                    "Rest for 10 minutes",
                    "Serve with raita",
                ],
                (60, 45, 6),
                Nutrition {
                    calories: 420,
                    protein: 28,
                    carbs: 40,
                    fat: 18,
                },
            ),
            recipe(
                "5",
                "Chole Bhature",
                &[
                    "2 cups chickpeas",
                    "2 onions",
                    "Spices",
                    "2 cups flour",
                    "Yogurt",
                    "Oil for frying",
                ],
                &[
                    "Soak chickpeas overnight",
                    "Pressure cook until soft",
                    "Make spicy gravy",
                    "Prepare bhature dough",
                    "Roll and deep fry",
                    "Serve hot together",
                ],
                (120, 60, 4),
                Nutrition {
                    calories: 480,
                    protein: 15,
                    carbs: 65,
                    fat: 20,
                },
            ),
        ])
    }
}

fn recipe(
    id: &str,
    name: &str,
    ingredients: &[&str],
    steps: &[&str],
    (prep_time, cook_time, servings): (u32, u32, u32),
    nutrition: Nutrition,
) -> Recipe {
    Recipe {
        id: id.to_string(),
        name: name.to_string(),
        cuisine: "Indian".to_string(),
        ingredients: ingredients.iter().map(ToString::to_string).collect(),
        steps: steps.iter().map(ToString::to_string).collect(),
        prep_time,
        cook_time,
        servings,
        nutrition,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_resolves_every_key() {
        let catalog = RecipeCatalog::builtin();
        let keys = [
            (RecipeKey::ButterChicken, "Butter Chicken"),
            (RecipeKey::PalakPaneer, "Palak Paneer"),
            (RecipeKey::MasalaDosa, "Masala Dosa"),
            (RecipeKey::Biryani, "Chicken Biryani"),
            (RecipeKey::Chole, "Chole Bhature"),
        ];

        for (key, name) in keys {
            assert_eq!(catalog.resolve(key).unwrap().name, name);
        }
    }

    #[test]
    fn test_search_by_name_and_cuisine() {
        let catalog = RecipeCatalog::builtin();
        assert_eq!(catalog.search("indian").len(), 5);
        assert_eq!(catalog.search("PANEER").len(), 1);
        assert!(catalog.search("sushi").is_empty());
    }

    #[test]
    fn test_total_time() {
        let catalog = RecipeCatalog::builtin();
        assert_eq!(catalog.get("1").unwrap().total_time(), 45);

        let mut huge = catalog.get("1").unwrap().clone();
        huge.prep_time = u32::MAX;
        assert_eq!(huge.total_time(), u32::MAX);
    }

    #[test]
    fn test_toml_catalog() {
        let catalog = RecipeCatalog::from_toml_str(
            r#"
            [[recipe]]
            id = "t1"
            name = "Tomato Soup"
            cuisine = "Italian"
            ingredients = ["tomatoes", "basil"]
            steps = ["Simmer", "Blend"]
            prep_time = 5
            cook_time = 20
            servings = 2
            "#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.all()[0].nutrition, Nutrition::default());
        assert!(matches!(
            catalog.resolve(RecipeKey::Biryani),
            Err(Error::RecipeNotFound(_))
        ));
    }

    #[test]
    fn test_empty_toml_catalog_rejected() {
        assert!(RecipeCatalog::from_toml_str("recipe = []").is_err());
    }
}

//! Rule-based intent classification
//!
//! Utterances are matched against an ordered table of [`Rule`]s. Each rule
//! has a trigger predicate and an extractor. A rule whose trigger matches
//! but whose extractor finds nothing does not end classification: the
//! utterance falls through to the next rule. The first extractor that
//! produces an intent wins, so the order of [`RULES`] is the tie-break
//! policy for ambiguous utterances.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Application section a navigation command can open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Pantry,
    Recipes,
    Music,
    Shopping,
    Nutrition,
    Map,
}

impl Section {
    /// Stable lowercase identifier
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pantry => "pantry",
            Self::Recipes => "recipes",
            Self::Music => "music",
            Self::Shopping => "shopping",
            Self::Nutrition => "nutrition",
            Self::Map => "map",
        }
    }

    /// Spoken confirmation when this section is opened by voice
    #[must_use]
    pub const fn confirmation(self) -> &'static str {
        match self {
            Self::Pantry => "Opening pantry manager",
            Self::Recipes => "Opening recipe explorer",
            Self::Music => "Opening music player",
            Self::Shopping => "Opening shopping list",
            Self::Nutrition => "Opening nutrition tracker",
            Self::Map => "Opening recipe map",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recipe a lookup command refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeKey {
    ButterChicken,
    PalakPaneer,
    MasalaDosa,
    Biryani,
    Chole,
}

impl RecipeKey {
    /// Lowercase fragment of the catalog name this key selects
    #[must_use]
    pub const fn name_fragment(self) -> &'static str {
        match self {
            Self::ButterChicken => "butter chicken",
            Self::PalakPaneer => "palak paneer",
            Self::MasalaDosa => "masala dosa",
            Self::Biryani => "biryani",
            Self::Chole => "chole",
        }
    }
}

/// What part of the current recipe to read aloud
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadMode {
    #[default]
    Steps,
    Ingredients,
}

/// Classified meaning of an utterance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    Navigate { section: Section },
    FindRecipe { recipe: RecipeKey },
    ReadRecipe { mode: ReadMode },
    ShoppingAdd { item: String },
    ShoppingRemove { item: String },
    SetTimer { minutes: u32 },
    Help,
    Greeting,
    Stop,
    Unrecognized,
}

impl Intent {
    /// Short label for logs and status displays
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Navigate { .. } => "navigate",
            Self::FindRecipe { .. } => "find_recipe",
            Self::ReadRecipe { .. } => "read_recipe",
            Self::ShoppingAdd { .. } => "shopping_add",
            Self::ShoppingRemove { .. } => "shopping_remove",
            Self::SetTimer { .. } => "set_timer",
            Self::Help => "help",
            Self::Greeting => "greeting",
            Self::Stop => "stop",
            Self::Unrecognized => "unrecognized",
        }
    }
}

/// One classification category: trigger predicate plus parameter extractor
pub struct Rule {
    /// Category name
    pub name: &'static str,
    /// Whether the utterance contains this category's trigger words
    pub triggers: fn(&str) -> bool,
    /// Extract the intent; `None` falls through to the next rule
    pub extract: fn(&str) -> Option<Intent>,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

/// Classification rules in precedence order
pub const RULES: &[Rule] = &[
    Rule {
        name: "navigation",
        triggers: |t| contains_any(t, NAV_TRIGGERS),
        extract: |t| first_match(t, NAV_DESTINATIONS).map(|section| Intent::Navigate { section }),
    },
    Rule {
        name: "recipe_lookup",
        triggers: |t| contains_any(t, RECIPE_TRIGGERS),
        extract: |t| first_match(t, RECIPE_NAMES).map(|recipe| Intent::FindRecipe { recipe }),
    },
    Rule {
        name: "read_recipe",
        triggers: |t| t.contains("read") && contains_any(t, &["recipe", "steps", "ingredients"]),
        extract: |t| {
            let mode = if t.contains("ingredients") {
                ReadMode::Ingredients
            } else {
                ReadMode::Steps
            };
            Some(Intent::ReadRecipe { mode })
        },
    },
    Rule {
        name: "shopping_add",
        triggers: |t| t.contains("add") && t.contains("shopping"),
        extract: |t| {
            first_match(t, SHOPPING_ADD_ITEMS).map(|item| Intent::ShoppingAdd {
                item: item.to_string(),
            })
        },
    },
    Rule {
        name: "shopping_remove",
        triggers: |t| t.contains("remove") && t.contains("shopping"),
        extract: |t| {
            first_match(t, SHOPPING_REMOVE_ITEMS).map(|item| Intent::ShoppingRemove {
                item: item.to_string(),
            })
        },
    },
    Rule {
        name: "timer",
        triggers: |t| t.contains("timer"),
        extract: |t| first_match(t, TIMER_DURATIONS).map(|minutes| Intent::SetTimer { minutes }),
    },
    Rule {
        name: "help",
        triggers: |t| contains_any(t, &["help", "what can you do"]),
        extract: |_| Some(Intent::Help),
    },
    Rule {
        name: "greeting",
        triggers: |t| contains_any(t, &["hello", "hi"]),
        extract: |_| Some(Intent::Greeting),
    },
    Rule {
        name: "stop",
        triggers: |t| contains_any(t, &["stop", "quiet", "silence"]),
        extract: |_| Some(Intent::Stop),
    },
];

const NAV_TRIGGERS: &[&str] = &["go to", "open", "show", "navigate"];

const NAV_DESTINATIONS: &[(&str, Section)] = &[
    ("pantry", Section::Pantry),
    ("recipe", Section::Recipes),
    ("music", Section::Music),
    ("shopping", Section::Shopping),
    ("nutrition", Section::Nutrition),
    ("map", Section::Map),
];

const RECIPE_TRIGGERS: &[&str] = &["recipe", "cook", "make"];

const RECIPE_NAMES: &[(&str, RecipeKey)] = &[
    ("butter chicken", RecipeKey::ButterChicken),
    ("palak paneer", RecipeKey::PalakPaneer),
    ("masala dosa", RecipeKey::MasalaDosa),
    ("dosa", RecipeKey::MasalaDosa),
    ("biryani", RecipeKey::Biryani),
    ("chole", RecipeKey::Chole),
];

const SHOPPING_ADD_ITEMS: &[(&str, &str)] = &[
    ("milk", "Milk"),
    ("eggs", "Eggs"),
    ("bread", "Bread"),
    ("rice", "Rice"),
    ("chicken", "Chicken"),
    ("tomatoes", "Tomatoes"),
    ("onions", "Onions"),
    ("garlic", "Garlic"),
];

const SHOPPING_REMOVE_ITEMS: &[(&str, &str)] = &[
    ("milk", "milk"),
    ("eggs", "eggs"),
    ("bread", "bread"),
    ("rice", "rice"),
];

// "15 minutes" contains "5 minutes"; table order decides
const TIMER_DURATIONS: &[(&str, u32)] = &[
    ("5 minutes", 5),
    ("five minutes", 5),
    ("10 minutes", 10),
    ("ten minutes", 10),
    ("15 minutes", 15),
    ("fifteen minutes", 15),
    ("20 minutes", 20),
    ("twenty minutes", 20),
    ("30 minutes", 30),
    ("thirty minutes", 30),
];

/// Classify a raw utterance
///
/// Case-insensitive and deterministic. Returns [`Intent::Unrecognized`]
/// when no rule produces an intent.
#[must_use]
pub fn classify(utterance: &str) -> Intent {
    classify_with_rule(utterance).map_or(Intent::Unrecognized, |(_, intent)| intent)
}

/// Classify and report which rule produced the intent
#[must_use]
pub fn classify_with_rule(utterance: &str) -> Option<(&'static str, Intent)> {
    let text = normalize(utterance);

    let matched = RULES
        .iter()
        .filter(|rule| (rule.triggers)(&text))
        .find_map(|rule| (rule.extract)(&text).map(|intent| (rule.name, intent)));

    match &matched {
        Some((rule, intent)) => {
            tracing::debug!(utterance = %text, rule, intent = intent.kind(), "classified");
        }
        None => tracing::debug!(utterance = %text, "no rule matched"),
    }

    matched
}

/// Lowercase and trim an utterance
#[must_use]
pub fn normalize(utterance: &str) -> String {
    utterance.trim().to_lowercase()
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| text.contains(needle))
}

fn first_match<T: Copy>(text: &str, table: &[(&str, T)]) -> Option<T> {
    table
        .iter()
        .find(|(keyword, _)| text.contains(keyword))
        .map(|&(_, value)| value)
}

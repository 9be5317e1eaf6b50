//! Pipeline-level venue categories.

use std::convert::Infallible;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A business category the scout can search for.
///
/// The three well-known categories map to native taxonomies in every source
/// adapter. Any other value is carried verbatim and each adapter decides how
/// to pass it through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Gallery,
    Cafe,
    Coworking,
    Other(String),
}

impl Category {
    /// Categories searched when the caller does not name any.
    #[must_use]
    pub fn defaults() -> Vec<Category> {
        vec![Category::Gallery, Category::Cafe, Category::Coworking]
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Category::Gallery => "gallery",
            Category::Cafe => "cafe",
            Category::Coworking => "coworking",
            Category::Other(raw) => raw,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Ok(match normalized.as_str() {
            "gallery" => Category::Gallery,
            "cafe" => Category::Cafe,
            "coworking" => Category::Coworking,
            _ => Category::Other(normalized),
        })
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(category) => category,
            Err(never) => match never {},
        }
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.as_str().to_string()
    }
}

//! # Regulatory Vocabulary
//!
//! The reference datasets the engine screens against, the product categories
//! an upstream classifier assigns, and the nutrition panel formats a label
//! can carry. Each enum is the single definition used across the workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A regulatory reference dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatasetKind {
    /// FDA "Generally Recognized As Safe" food substances.
    Gras,
    /// New Dietary Ingredients with an FDA notification on file.
    Ndi,
    /// Old Dietary Ingredients marketed before 15 October 1994.
    Odi,
    /// Ingredients derived from a major food allergen (e.g. whey → milk).
    AllergenDerivative,
}

impl DatasetKind {
    /// Every dataset, in a stable order.
    pub fn all() -> &'static [DatasetKind] {
        &[
            Self::Gras,
            Self::Ndi,
            Self::Odi,
            Self::AllergenDerivative,
        ]
    }

    /// The wire/configuration name (`"GRAS"`, `"NDI"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gras => "GRAS",
            Self::Ndi => "NDI",
            Self::Odi => "ODI",
            Self::AllergenDerivative => "ALLERGEN_DERIVATIVE",
        }
    }

    /// Human-readable list name used in rationales.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Gras => "FDA GRAS list",
            Self::Ndi => "FDA NDI notification list",
            Self::Odi => "pre-DSHEA (old dietary ingredient) list",
            Self::AllergenDerivative => "allergen derivative list",
        }
    }

    /// Whether absence from this dataset is inconclusive.
    ///
    /// GRAS, NDI and ODI are not exhaustive: self-affirmed GRAS
    /// determinations and unlisted grandfathered ingredients exist but are
    /// not publicly enumerable. The allergen list is a detection list, so a
    /// miss there simply means no allergen was detected.
    pub fn absence_is_inconclusive(self) -> bool {
        match self {
            Self::Gras | Self::Ndi | Self::Odi => true,
            Self::AllergenDerivative => false,
        }
    }

    /// Stem used for reference data file names (`gras.yaml`, `ndi.json`, ...).
    pub fn file_stem(self) -> &'static str {
        match self {
            Self::Gras => "gras",
            Self::Ndi => "ndi",
            Self::Odi => "odi",
            Self::AllergenDerivative => "allergens",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold_key(s).as_str() {
            "gras" => Ok(Self::Gras),
            "ndi" => Ok(Self::Ndi),
            "odi" => Ok(Self::Odi),
            "allergen_derivative" | "allergen" | "allergens" => Ok(Self::AllergenDerivative),
            _ => Err(ValidationError::UnknownDataset(s.to_string())),
        }
    }
}

/// Product category as assigned by the upstream label classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductCategory {
    /// Conventional food regulated under 21 CFR 101.
    ConventionalFood,
    /// Non-alcoholic beverage.
    NonAlcoholicBeverage,
    /// Alcoholic beverage (TTB labeling; ingredients still GRAS-screened).
    AlcoholicBeverage,
    /// Dietary supplement regulated under DSHEA.
    DietarySupplement,
}

impl ProductCategory {
    /// Every category, in a stable order.
    pub fn all() -> &'static [ProductCategory] {
        &[
            Self::ConventionalFood,
            Self::NonAlcoholicBeverage,
            Self::AlcoholicBeverage,
            Self::DietarySupplement,
        ]
    }

    /// The wire/configuration name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConventionalFood => "CONVENTIONAL_FOOD",
            Self::NonAlcoholicBeverage => "NON_ALCOHOLIC_BEVERAGE",
            Self::AlcoholicBeverage => "ALCOHOLIC_BEVERAGE",
            Self::DietarySupplement => "DIETARY_SUPPLEMENT",
        }
    }

    /// Lower-case phrase used in rationales ("dietary supplement").
    pub fn display_name(self) -> &'static str {
        match self {
            Self::ConventionalFood => "conventional food",
            Self::NonAlcoholicBeverage => "non-alcoholic beverage",
            Self::AlcoholicBeverage => "alcoholic beverage",
            Self::DietarySupplement => "dietary supplement",
        }
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold_key(s).as_str() {
            "conventional_food" | "food" => Ok(Self::ConventionalFood),
            "non_alcoholic_beverage" | "beverage" => Ok(Self::NonAlcoholicBeverage),
            "alcoholic_beverage" => Ok(Self::AlcoholicBeverage),
            "dietary_supplement" | "supplement" => Ok(Self::DietarySupplement),
            _ => Err(ValidationError::UnknownCategory(s.to_string())),
        }
    }
}

/// Nutrition panel format detected on a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PanelType {
    /// "Nutrition Facts" (21 CFR 101.9).
    NutritionFacts,
    /// "Supplement Facts" (21 CFR 101.36).
    SupplementFacts,
}

impl PanelType {
    /// Title printed on the panel.
    pub fn title(self) -> &'static str {
        match self {
            Self::NutritionFacts => "Nutrition Facts",
            Self::SupplementFacts => "Supplement Facts",
        }
    }

    /// Regulation governing this panel format.
    pub fn regulation(self) -> &'static str {
        match self {
            Self::NutritionFacts => "21 CFR 101.9",
            Self::SupplementFacts => "21 CFR 101.36",
        }
    }
}

impl fmt::Display for PanelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for PanelType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold_key(s).as_str() {
            "nutrition_facts" | "nutrition" => Ok(Self::NutritionFacts),
            "supplement_facts" | "supplement" => Ok(Self::SupplementFacts),
            _ => Err(ValidationError::UnknownPanel(s.to_string())),
        }
    }
}

/// Fold `"Dietary-Supplement"`, `"dietary supplement"` and
/// `"DIETARY_SUPPLEMENT"` to one key.
fn fold_key(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

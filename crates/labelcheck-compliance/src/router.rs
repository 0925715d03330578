//! # Category Router
//!
//! Decides which reference datasets apply to a product category, in which
//! report section each is screened, and which nutrition panel the label is
//! expected to carry.
//!
//! | category | datasets | panel |
//! |---|---|---|
//! | conventional food | GRAS, allergen | Nutrition Facts |
//! | non-alcoholic beverage | GRAS, allergen | Nutrition Facts |
//! | alcoholic beverage | GRAS, allergen | none required |
//! | dietary supplement | NDI, ODI, allergen | Supplement Facts |

use labelcheck_core::{DatasetKind, PanelType, ProductCategory};

use crate::report::ReportSection;

/// Datasets screened for `category`, in screening order.
pub fn applicable_datasets(category: ProductCategory) -> Vec<DatasetKind> {
    plan(category)
        .iter()
        .flat_map(|section| section.datasets().iter().copied())
        .collect()
}

/// Report sections produced for `category`, in report order.
///
/// Every category ends with [`ReportSection::Labeling`], which carries the
/// panel check and upstream label issues and screens no dataset.
pub fn plan(category: ProductCategory) -> &'static [ReportSection] {
    match category {
        ProductCategory::ConventionalFood
        | ProductCategory::NonAlcoholicBeverage
        | ProductCategory::AlcoholicBeverage => &[
            ReportSection::Gras,
            ReportSection::Allergens,
            ReportSection::Labeling,
        ],
        ProductCategory::DietarySupplement => &[
            ReportSection::DietaryIngredients,
            ReportSection::Allergens,
            ReportSection::Labeling,
        ],
    }
}

/// Panel format a label in `category` must carry, if one is required.
pub fn expected_panel(category: ProductCategory) -> Option<PanelType> {
    match category {
        ProductCategory::ConventionalFood | ProductCategory::NonAlcoholicBeverage => {
            Some(PanelType::NutritionFacts)
        }
        ProductCategory::DietarySupplement => Some(PanelType::SupplementFacts),
        ProductCategory::AlcoholicBeverage => None,
    }
}

//! AdventureWorks warehouse tables and their rules

use super::{SchemaRules, TransformRule};
use crate::table::ScalarKind;

pub const PRODUCT_TABLE: &str = "DimProduct";
pub const SUBCATEGORY_TABLE: &str = "DimProductSubcategory";
pub const CATEGORY_TABLE: &str = "DimProductCategory";

/// Joins product to subcategory
pub const SUBCATEGORY_KEY: &str = "ProductSubcategoryKey";
/// Joins subcategory to category
pub const CATEGORY_KEY: &str = "ProductCategoryKey";

/// Denormalized product hierarchy table
pub const MERGED_TABLE: &str = "prd_DimProductCategory";

/// Default extraction allow-list
pub const CANDIDATE_TABLES: [&str; 5] = [
    PRODUCT_TABLE,
    SUBCATEGORY_TABLE,
    CATEGORY_TABLE,
    "DimSalesTerritory",
    "FactInternetSales",
];

const MONEY: ScalarKind = ScalarKind::FixedPoint { scale: 2 };

pub(super) fn adventure_works() -> SchemaRules {
    let mut rules = SchemaRules::new();
    rules.insert(PRODUCT_TABLE, product());
    rules.insert(SUBCATEGORY_TABLE, subcategory());
    rules.insert(CATEGORY_TABLE, category());
    rules
}

fn product() -> TransformRule {
    TransformRule::builder()
        .retain([
            "ProductKey",
            "ProductAlternateKey",
            SUBCATEGORY_KEY,
            "WeightUnitMeasureCode",
            "SizeUnitMeasureCode",
            "EnglishProductName",
            "StandardCost",
            "FinishedGoodsFlag",
            "Color",
            "SafetyStockLevel",
            "ReorderPoint",
            "ListPrice",
            "Size",
            "SizeRange",
            "Weight",
            "DaysToManufacture",
            "ProductLine",
            "DealerPrice",
            "Class",
            "Style",
            "ModelName",
            "EnglishDescription",
            "StartDate",
            "EndDate",
            "Status",
        ])
        .fill_all(
            [
                "WeightUnitMeasureCode",
                "SizeUnitMeasureCode",
                "ProductLine",
                "Class",
                "Style",
                "Size",
                "ModelName",
                "EnglishDescription",
                "EndDate",
                "Status",
            ],
            "NA",
        )
        .fill_all(
            [SUBCATEGORY_KEY, "StandardCost", "ListPrice", "DealerPrice", "Weight"],
            "0",
        )
        .rename("EnglishDescription", "Description")
        .rename("EnglishProductName", "ProductName")
        .coerce(SUBCATEGORY_KEY, ScalarKind::Integer)
        .coerce("StandardCost", MONEY)
        .coerce("ListPrice", MONEY)
        .build()
        .expect("Built-in DimProduct rule must be valid")
}

fn subcategory() -> TransformRule {
    TransformRule::builder()
        .retain([
            SUBCATEGORY_KEY,
            "EnglishProductSubcategoryName",
            "ProductSubcategoryAlternateKey",
            CATEGORY_KEY,
        ])
        .rename("EnglishProductSubcategoryName", "ProductSubcategoryName")
        .build()
        .expect("Built-in DimProductSubcategory rule must be valid")
}

fn category() -> TransformRule {
    TransformRule::builder()
        .retain([
            CATEGORY_KEY,
            "ProductCategoryAlternateKey",
            "EnglishProductCategoryName",
        ])
        .rename("EnglishProductCategoryName", "ProductCategoryName")
        .build()
        .expect("Built-in DimProductCategory rule must be valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_rules_are_valid() {
        let rules = adventure_works();
        assert_eq!(rules.len(), 3);
        for table in [PRODUCT_TABLE, SUBCATEGORY_TABLE, CATEGORY_TABLE] {
            let rule = rules.get(table).unwrap();
            assert!(!rule.retain().is_empty());
            rule.validate(table).unwrap();
        }
    }

    #[test]
    fn test_product_rule_shape() {
        let rules = adventure_works();
        let rule = rules.get(PRODUCT_TABLE).unwrap();

        assert_eq!(rule.retain().len(), 25);
        assert_eq!(rule.fill_map().get(SUBCATEGORY_KEY).map(String::as_str), Some("0"));
        assert_eq!(rule.fill_map().get("Color"), None);
        assert_eq!(rule.coerce_map().get("ListPrice"), Some(&MONEY));
        assert!(rule.output_columns().contains(&"ProductName".to_string()));
        assert!(rule.output_columns().contains(&"Description".to_string()));
    }

    #[test]
    fn test_join_keys_survive_rules() {
        let rules = adventure_works();
        let sub = rules.get(SUBCATEGORY_TABLE).unwrap().output_columns();
        assert!(sub.contains(&SUBCATEGORY_KEY.to_string()));
        assert!(sub.contains(&CATEGORY_KEY.to_string()));
        let cat = rules.get(CATEGORY_TABLE).unwrap().output_columns();
        assert!(cat.contains(&CATEGORY_KEY.to_string()));
    }
}

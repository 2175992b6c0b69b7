//! Product document, write payloads and list filters.
//!
//! Write payloads are parsed from raw JSON rather than through `serde` derives so that every
//! problem in a body is reported at once with a field-specific message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

pub const NAME_MAX_CHARS: usize = 100;

/// A stored product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub category: String,
    pub in_stock: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Build a new product from validated input
    pub fn create(input: ProductInput) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            price: input.price,
            category: input.category,
            in_stock: input.in_stock,
            created_at: now,
            updated_at: now,
        }
    }

    /// Price rendered as `$12.50`
    pub fn formatted_price(&self) -> String {
        format!("${:.2}", self.price)
    }

    /// Current fields as an input, for re-validation after a patch
    pub fn to_input(&self) -> ProductInput {
        ProductInput {
            name: self.name.clone(),
            price: self.price,
            category: self.category.clone(),
            in_stock: self.in_stock,
        }
    }

    /// Overwrite fields from validated input and bump `updated_at`
    pub fn apply(&mut self, input: ProductInput) {
        self.name = input.name;
        self.price = input.price;
        self.category = input.category;
        self.in_stock = input.in_stock;
        self.updated_at = Utc::now();
    }

    /// API representation, including derived fields
    pub fn document(&self) -> ProductDocument<'_> {
        ProductDocument {
            product: self,
            formatted_price: self.formatted_price(),
        }
    }
}

/// Serialized form of a product as returned by the API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDocument<'a> {
    #[serde(flatten)]
    pub product: &'a Product,
    pub formatted_price: String,
}

/// Validated fields of a product
#[derive(Debug, Clone, PartialEq)]
pub struct ProductInput {
    pub name: String,
    pub price: f64,
    pub category: String,
    pub in_stock: bool,
}

impl ProductInput {
    /// Parse and validate a create body. `inStock` defaults to `true`.
    pub fn from_json(body: &Value) -> Result<Self, Vec<String>> {
        let fields = as_object(body)?;
        let mut errors = Vec::new();

        let name = required_string(fields, "name", "Product name", &mut errors);
        let price = required_number(fields, "price", "Product price", &mut errors);
        let category = required_string(fields, "category", "Product category", &mut errors);
        let in_stock = optional_bool(fields, "inStock", &mut errors);

        if !errors.is_empty() {
            return Err(errors);
        }

        match (name, price, category) {
            (Some(name), Some(price), Some(category)) => Self {
                name,
                price,
                category,
                in_stock: in_stock.unwrap_or(true),
            }
            .validate(),
            _ => Err(errors),
        }
    }

    /// Normalize (trim) and check constraints
    pub fn validate(self) -> Result<Self, Vec<String>> {
        let name = self.name.trim().to_string();
        let category = self.category.trim().to_string();
        let mut errors = Vec::new();

        if name.is_empty() {
            errors.push("Product name is required".to_string());
        } else if name.chars().count() > NAME_MAX_CHARS {
            errors.push("Product name cannot exceed 100 characters".to_string());
        }

        if !self.price.is_finite() {
            errors.push("Product price must be a number".to_string());
        } else if self.price < 0.0 {
            errors.push("Price cannot be negative".to_string());
        }

        if category.is_empty() {
            errors.push("Product category is required".to_string());
        }

        if errors.is_empty() {
            Ok(Self {
                name,
                category,
                ..self
            })
        } else {
            Err(errors)
        }
    }
}

/// Partial update; absent fields keep their current value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub in_stock: Option<bool>,
}

impl ProductPatch {
    /// Parse an update body. Explicit `null` on a required field is an error.
    pub fn from_json(body: &Value) -> Result<Self, Vec<String>> {
        let fields = as_object(body)?;
        let mut errors = Vec::new();

        let name = fields
            .contains_key("name")
            .then(|| required_string(fields, "name", "Product name", &mut errors))
            .flatten();
        let price = fields
            .contains_key("price")
            .then(|| required_number(fields, "price", "Product price", &mut errors))
            .flatten();
        let category = fields
            .contains_key("category")
            .then(|| required_string(fields, "category", "Product category", &mut errors))
            .flatten();
        let in_stock = optional_bool(fields, "inStock", &mut errors);

        if errors.is_empty() {
            Ok(Self {
                name,
                price,
                category,
                in_stock,
            })
        } else {
            Err(errors)
        }
    }

    /// Merge onto the current fields and re-validate the result
    pub fn apply_to(self, current: &Product) -> Result<ProductInput, Vec<String>> {
        let base = current.to_input();
        ProductInput {
            name: self.name.unwrap_or(base.name),
            price: self.price.unwrap_or(base.price),
            category: self.category.unwrap_or(base.category),
            in_stock: self.in_stock.unwrap_or(base.in_stock),
        }
        .validate()
    }
}

/// List filter built from the query string
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub in_stock: Option<bool>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl ProductFilter {
    /// Only products in `category`
    pub fn by_category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::default()
        }
    }

    /// Build from `category`, `inStock`, `minPrice` and `maxPrice` query parameters.
    ///
    /// `inStock` is true only for the literal `true`. Non-numeric price bounds are rejected.
    pub fn from_query(params: &HashMap<String, String>) -> Result<Self, Vec<String>> {
        let mut errors = Vec::new();

        let category = params.get("category").filter(|c| !c.is_empty()).cloned();
        let in_stock = params.get("inStock").map(|v| v == "true");
        let min_price = parse_bound(params, "minPrice", &mut errors);
        let max_price = parse_bound(params, "maxPrice", &mut errors);

        if errors.is_empty() {
            Ok(Self {
                category,
                in_stock,
                min_price,
                max_price,
            })
        } else {
            Err(errors)
        }
    }

    pub fn matches(&self, product: &Product) -> bool {
        self.category
            .as_deref()
            .map_or(true, |category| product.category == category)
            && self.in_stock.map_or(true, |in_stock| product.in_stock == in_stock)
            && self.min_price.map_or(true, |min| product.price >= min)
            && self.max_price.map_or(true, |max| product.price <= max)
    }
}

fn parse_bound(params: &HashMap<String, String>, name: &str, errors: &mut Vec<String>) -> Option<f64> {
    let raw = params.get(name)?;
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            errors.push(format!("{} must be a number", name));
            None
        }
    }
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, Vec<String>> {
    body.as_object()
        .ok_or_else(|| vec!["Request body must be a JSON object".to_string()])
}

fn required_string(
    fields: &Map<String, Value>,
    key: &str,
    label: &str,
    errors: &mut Vec<String>,
) -> Option<String> {
    match fields.get(key) {
        None | Some(Value::Null) => {
            errors.push(format!("{} is required", label));
            None
        }
        Some(Value::String(value)) => Some(value.clone()),
        Some(_) => {
            errors.push(format!("{} must be a string", label));
            None
        }
    }
}

fn required_number(
    fields: &Map<String, Value>,
    key: &str,
    label: &str,
    errors: &mut Vec<String>,
) -> Option<f64> {
    match fields.get(key) {
        None | Some(Value::Null) => {
            errors.push(format!("{} is required", label));
            None
        }
        Some(Value::Number(value)) => value.as_f64(),
        Some(_) => {
            errors.push(format!("{} must be a number", label));
            None
        }
    }
}

fn optional_bool(fields: &Map<String, Value>, key: &str, errors: &mut Vec<String>) -> Option<bool> {
    match fields.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Bool(value)) => Some(*value),
        Some(_) => {
            errors.push(format!("{} must be a boolean", key));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product(category: &str, price: f64, in_stock: bool) -> Product {
        Product::create(ProductInput {
            name: "Widget".to_string(),
            price,
            category: category.to_string(),
            in_stock,
        })
    }

    #[test]
    fn test_create_input_defaults_and_trims() {
        let input = ProductInput::from_json(&json!({
            "name": "  Hammer ",
            "price": 12.5,
            "category": " tools "
        }))
        .unwrap();

        assert_eq!(input.name, "Hammer");
        assert_eq!(input.category, "tools");
        assert!(input.in_stock);
    }

    #[test]
    fn test_create_input_reports_every_missing_field() {
        let errors = ProductInput::from_json(&json!({})).unwrap_err();
        assert_eq!(
            errors,
            vec![
                "Product name is required",
                "Product price is required",
                "Product category is required",
            ]
        );
    }

    #[test]
    fn test_create_input_type_errors() {
        let errors = ProductInput::from_json(&json!({
            "name": 5,
            "price": "cheap",
            "category": "tools",
            "inStock": "yes"
        }))
        .unwrap_err();

        assert!(errors.contains(&"Product name must be a string".to_string()));
        assert!(errors.contains(&"Product price must be a number".to_string()));
        assert!(errors.contains(&"inStock must be a boolean".to_string()));
    }

    #[test]
    fn test_constraints() {
        let errors = ProductInput::from_json(&json!({
            "name": "x".repeat(101),
            "price": -1,
            "category": "   "
        }))
        .unwrap_err();

        assert_eq!(
            errors,
            vec![
                "Product name cannot exceed 100 characters",
                "Price cannot be negative",
                "Product category is required",
            ]
        );

        assert!(ProductInput::from_json(&json!({
            "name": "x".repeat(100),
            "price": 0,
            "category": "c"
        }))
        .is_ok());
    }

    #[test]
    fn test_non_object_body_rejected() {
        assert_eq!(
            ProductInput::from_json(&json!([1, 2])).unwrap_err(),
            vec!["Request body must be a JSON object"]
        );
    }

    #[test]
    fn test_patch_applies_and_revalidates() {
        let current = product("tools", 10.0, true);

        let patch = ProductPatch::from_json(&json!({ "price": 15, "inStock": false })).unwrap();
        let updated = patch.apply_to(&current).unwrap();
        assert_eq!(updated.price, 15.0);
        assert!(!updated.in_stock);
        assert_eq!(updated.category, "tools");

        let patch = ProductPatch::from_json(&json!({ "price": -3 })).unwrap();
        assert_eq!(
            patch.apply_to(&current).unwrap_err(),
            vec!["Price cannot be negative"]
        );

        assert_eq!(
            ProductPatch::from_json(&json!({ "name": null })).unwrap_err(),
            vec!["Product name is required"]
        );
    }

    #[test]
    fn test_document_serialization() {
        let item = product("tools", 12.5, true);
        let value = serde_json::to_value(item.document()).unwrap();

        assert_eq!(value["formattedPrice"], "$12.50");
        assert_eq!(value["inStock"], true);
        assert_eq!(value["category"], "tools");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("id").is_some());
    }

    #[test]
    fn test_filter_from_query() {
        let params: HashMap<String, String> = [
            ("category", "tools"),
            ("inStock", "yes"),
            ("minPrice", "5"),
            ("maxPrice", "20.5"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let filter = ProductFilter::from_query(&params).unwrap();
        assert_eq!(filter.category.as_deref(), Some("tools"));
        assert_eq!(filter.in_stock, Some(false));
        assert_eq!(filter.min_price, Some(5.0));
        assert_eq!(filter.max_price, Some(20.5));

        let bad: HashMap<String, String> =
            [("minPrice".to_string(), "abc".to_string())].into_iter().collect();
        assert_eq!(
            ProductFilter::from_query(&bad).unwrap_err(),
            vec!["minPrice must be a number"]
        );
    }

    #[test]
    fn test_filter_matches() {
        let filter = ProductFilter {
            category: Some("tools".to_string()),
            in_stock: Some(true),
            min_price: Some(5.0),
            max_price: Some(10.0),
        };

        assert!(filter.matches(&product("tools", 5.0, true)));
        assert!(filter.matches(&product("tools", 10.0, true)));
        assert!(!filter.matches(&product("tools", 10.01, true)));
        assert!(!filter.matches(&product("garden", 7.0, true)));
        assert!(!filter.matches(&product("tools", 7.0, false)));
        assert!(ProductFilter::default().matches(&product("any", 0.0, false)));
    }
}

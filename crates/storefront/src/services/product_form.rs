//! Admin product form parsing.
//!
//! The admin UI submits products as multipart forms: scalar fields as plain
//! text, list and map fields (`features`, `colors`, `tags`, `specs`,
//! `existingImages`) as JSON-encoded strings, plus any number of image files.
//! The route collects the text fields and stores the files; this module turns
//! the text fields into a [`ProductInput`] or a map of field errors.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use rust_decimal::Decimal;

use pawfect_core::CategoryId;

use crate::db::products::ProductInput;

/// Field name to error message, in field order.
pub type FieldErrors = BTreeMap<String, String>;

/// Turn a product name into a URL slug: `Smart Feeder 2.0` → `smart-feeder-2-0`.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

struct Fields<'a> {
    raw: &'a HashMap<String, String>,
    errors: FieldErrors,
}

impl<'a> Fields<'a> {
    fn text(&self, name: &str) -> Option<&'a str> {
        self.raw
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn fail(&mut self, name: &str, message: impl Into<String>) {
        self.errors.entry(name.to_owned()).or_insert_with(|| message.into());
    }

    fn required(&mut self, name: &str) -> String {
        self.text(name).map_or_else(
            || {
                self.fail(name, "is required");
                String::new()
            },
            str::to_owned,
        )
    }

    fn money(&mut self, name: &str) -> Option<Decimal> {
        let value = self.text(name)?;
        match Decimal::from_str(value) {
            Ok(amount) if amount.is_sign_negative() => {
                self.fail(name, "must not be negative");
                None
            }
            Ok(amount) => Some(amount),
            Err(_) => {
                self.fail(name, "must be a number");
                None
            }
        }
    }

    fn flag(&self, name: &str) -> Option<bool> {
        self.text(name)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "on" | "1" | "yes"))
    }

    fn json<T: serde::de::DeserializeOwned + Default>(&mut self, name: &str, shape: &str) -> T {
        let Some(value) = self.text(name) else {
            return T::default();
        };
        serde_json::from_str(value).unwrap_or_else(|_| {
            self.fail(name, format!("must be a JSON {shape}"));
            T::default()
        })
    }
}

/// Parse the text fields of an admin product form.
///
/// `uploaded` are the public URLs of image files stored for this request;
/// they follow any `existingImages` the form chose to keep.
///
/// # Errors
///
/// Returns every invalid field with its message.
pub fn parse_product_form(
    raw: &HashMap<String, String>,
    uploaded: Vec<String>,
) -> Result<ProductInput, FieldErrors> {
    let mut fields = Fields {
        raw,
        errors: FieldErrors::new(),
    };

    let name = fields.required("name");
    let slug = fields
        .text("slug")
        .map_or_else(|| slugify(&name), slugify);
    if slug.is_empty() && !name.is_empty() {
        fields.fail("slug", "must contain letters or digits");
    }
    let description = fields.text("description").unwrap_or_default().to_owned();

    let price = fields.money("price");
    if price.is_none() {
        fields.fail("price", "is required");
    }
    let original_price = fields.money("originalPrice");

    let category_id = match fields.text("categoryId") {
        Some(raw_id) => match raw_id.parse::<i64>() {
            Ok(id) => Some(CategoryId::new(id)),
            Err(_) => {
                fields.fail("categoryId", "must be a category id");
                None
            }
        },
        None => None,
    };

    let stock = match fields.text("stock") {
        Some(raw_stock) => match raw_stock.parse::<i32>() {
            Ok(n) if n >= 0 => n,
            _ => {
                fields.fail("stock", "must be a whole number, 0 or more");
                0
            }
        },
        None => 0,
    };

    let features: Vec<String> = fields.json("features", "array of strings");
    let colors: Vec<String> = fields.json("colors", "array of strings");
    let tags: Vec<String> = fields.json("tags", "array of strings");
    let specs: serde_json::Map<String, serde_json::Value> = fields.json("specs", "object");
    let mut images: Vec<String> = fields.json("existingImages", "array of strings");
    images.extend(uploaded);

    let in_stock = fields.flag("inStock").unwrap_or(stock > 0);
    let on_sale = fields.flag("onSale").unwrap_or(false);
    let free_shipping = fields.flag("freeShipping").unwrap_or(false);
    let is_bestseller = fields.flag("isBestseller").unwrap_or(false);
    let featured = fields.flag("featured").unwrap_or(false);

    if !fields.errors.is_empty() {
        return Err(fields.errors);
    }

    Ok(ProductInput {
        slug,
        name,
        description,
        images,
        price: price.unwrap_or_default(),
        original_price,
        category_id,
        in_stock,
        on_sale,
        free_shipping,
        is_bestseller,
        featured,
        features,
        colors,
        tags,
        specs,
        stock,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Smart Feeder 2.0"), "smart-feeder-2-0");
        assert_eq!(slugify("  GPS  Collar!! "), "gps-collar");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn test_parses_full_form() {
        let raw = form(&[
            ("name", "Smart Feeder"),
            ("description", "Feeds on schedule"),
            ("price", "89.99"),
            ("originalPrice", "119.99"),
            ("categoryId", "3"),
            ("stock", "12"),
            ("onSale", "true"),
            ("featured", "on"),
            ("features", r#"["Wi-Fi","Portion control"]"#),
            ("colors", r#"["white"]"#),
            ("tags", r#"["feeder","smart"]"#),
            ("specs", r#"{"capacity":"4L"}"#),
            ("existingImages", r#"["/uploads/a.png"]"#),
        ]);

        let input = parse_product_form(&raw, vec!["/uploads/b.png".into()]).unwrap();

        assert_eq!(input.slug, "smart-feeder");
        assert_eq!(input.price, Decimal::from_str("89.99").unwrap());
        assert_eq!(input.original_price, Some(Decimal::from_str("119.99").unwrap()));
        assert_eq!(input.category_id, Some(CategoryId::new(3)));
        assert!(input.in_stock);
        assert!(input.on_sale);
        assert!(input.featured);
        assert!(!input.free_shipping);
        assert_eq!(input.features, vec!["Wi-Fi", "Portion control"]);
        assert_eq!(input.specs["capacity"], "4L");
        assert_eq!(input.images, vec!["/uploads/a.png", "/uploads/b.png"]);
    }

    #[test]
    fn test_reports_every_bad_field() {
        let raw = form(&[
            ("price", "cheap"),
            ("stock", "-4"),
            ("tags", "feeder,smart"),
            ("specs", "[1,2]"),
        ]);

        let errors = parse_product_form(&raw, Vec::new()).unwrap_err();

        assert_eq!(errors["name"], "is required");
        assert_eq!(errors["price"], "must be a number");
        assert!(errors.contains_key("stock"));
        assert_eq!(errors["tags"], "must be a JSON array of strings");
        assert_eq!(errors["specs"], "must be a JSON object");
    }

    #[test]
    fn test_defaults() {
        let raw = form(&[("name", "Chew Toy"), ("price", "5")]);
        let input = parse_product_form(&raw, Vec::new()).unwrap();

        assert_eq!(input.stock, 0);
        assert!(!input.in_stock);
        assert!(input.tags.is_empty());
        assert!(input.specs.is_empty());
        assert_eq!(input.original_price, None);
    }
}

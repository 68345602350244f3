//! Shipping and billing addresses.
//!
//! Addresses are stored in `JSONB` columns. Older rows (and some clients) hold
//! a JSON-encoded *string* instead of an object, so every read goes through
//! [`AddressPayload`] and comes out as one typed [`Address`].

use serde::{Deserialize, Deserializer, Serialize};

/// Errors that can occur when normalizing an address payload.
#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    /// The payload was a string that did not contain a JSON address object.
    #[error("address string is not valid JSON: {0}")]
    MalformedString(#[source] serde_json::Error),
    /// The payload did not have the shape of an address.
    #[error("address has an unexpected shape: {0}")]
    UnexpectedShape(#[source] serde_json::Error),
    /// A required field is blank.
    #[error("address field `{0}` is required")]
    MissingField(&'static str),
}

/// A postal address.
///
/// Field aliases accept the names used by the checkout form (`address`,
/// `zipCode`) alongside the canonical ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(alias = "name")]
    pub full_name: String,
    #[serde(alias = "address", alias = "street")]
    pub line1: String,
    #[serde(default, alias = "apartment")]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default, alias = "province")]
    pub state: String,
    #[serde(alias = "zipCode", alias = "zip")]
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Address {
    /// Normalize a raw JSON value (object or JSON-encoded string).
    ///
    /// # Errors
    ///
    /// Returns an [`AddressError`] if the value cannot be read as an address
    /// or a required field is blank.
    pub fn from_json(value: serde_json::Value) -> Result<Self, AddressError> {
        let address = match value {
            serde_json::Value::String(encoded) => {
                serde_json::from_str::<Self>(&encoded).map_err(AddressError::MalformedString)?
            }
            other => serde_json::from_value::<Self>(other).map_err(AddressError::UnexpectedShape)?,
        };
        address.validate()?;
        Ok(address)
    }

    /// Check that required fields are present.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::MissingField` naming the first blank field.
    pub fn validate(&self) -> Result<(), AddressError> {
        let required = [
            ("fullName", &self.full_name),
            ("line1", &self.line1),
            ("city", &self.city),
            ("postalCode", &self.postal_code),
            ("country", &self.country),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(AddressError::MissingField(name));
            }
        }
        Ok(())
    }

    /// One-line rendering, e.g. for order confirmation emails.
    #[must_use]
    pub fn single_line(&self) -> String {
        let mut parts = vec![self.line1.as_str()];
        if let Some(line2) = self.line2.as_deref().filter(|l| !l.is_empty()) {
            parts.push(line2);
        }
        parts.push(&self.city);
        if !self.state.is_empty() {
            parts.push(&self.state);
        }
        parts.push(&self.postal_code);
        parts.push(&self.country);
        parts.join(", ")
    }
}

/// The two wire shapes an address arrives in.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AddressPayload {
    Structured(Address),
    Encoded(String),
}

impl TryFrom<AddressPayload> for Address {
    type Error = AddressError;

    fn try_from(payload: AddressPayload) -> Result<Self, Self::Error> {
        match payload {
            AddressPayload::Structured(address) => {
                address.validate()?;
                Ok(address)
            }
            AddressPayload::Encoded(encoded) => {
                Self::from_json(serde_json::Value::String(encoded))
            }
        }
    }
}

/// `deserialize_with` helper for request bodies that carry an address.
///
/// # Errors
///
/// Fails deserialization if the payload cannot be normalized.
pub fn deserialize_address<'de, D>(deserializer: D) -> Result<Address, D::Error>
where
    D: Deserializer<'de>,
{
    let payload = AddressPayload::deserialize(deserializer)?;
    Address::try_from(payload).map_err(serde::de::Error::custom)
}

/// `deserialize_with` helper for optional addresses.
///
/// # Errors
///
/// Fails deserialization if a present payload cannot be normalized.
pub fn deserialize_optional_address<'de, D>(deserializer: D) -> Result<Option<Address>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<AddressPayload>::deserialize(deserializer)?
        .map(Address::try_from)
        .transpose()
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample() -> serde_json::Value {
        json!({
            "fullName": "Sam Rivera",
            "address": "12 Bark Lane",
            "city": "Portland",
            "state": "OR",
            "zipCode": "97201",
            "country": "US"
        })
    }

    #[test]
    fn test_object_and_string_normalize_to_same_address() {
        let from_object = Address::from_json(sample()).unwrap();
        let encoded = serde_json::Value::String(sample().to_string());
        let from_string = Address::from_json(encoded).unwrap();

        assert_eq!(from_object, from_string);
        assert_eq!(from_object.line1, "12 Bark Lane");
        assert_eq!(from_object.postal_code, "97201");
    }

    #[test]
    fn test_payload_deserializes_either_shape() {
        #[derive(Deserialize)]
        struct Body {
            #[serde(deserialize_with = "deserialize_address")]
            shipping: Address,
        }

        let object: Body = serde_json::from_value(json!({ "shipping": sample() })).unwrap();
        let string: Body =
            serde_json::from_value(json!({ "shipping": sample().to_string() })).unwrap();
        assert_eq!(object.shipping, string.shipping);
    }

    #[test]
    fn test_malformed_string_is_rejected() {
        let err = Address::from_json(json!("{not json")).unwrap_err();
        assert!(matches!(err, AddressError::MalformedString(_)));
    }

    #[test]
    fn test_blank_required_field_is_rejected() {
        let mut value = sample();
        value["city"] = json!("  ");
        let err = Address::from_json(value).unwrap_err();
        assert!(matches!(err, AddressError::MissingField("city")));
    }

    #[test]
    fn test_single_line() {
        let address = Address::from_json(sample()).unwrap();
        assert_eq!(
            address.single_line(),
            "12 Bark Lane, Portland, OR, 97201, US"
        );
    }
}

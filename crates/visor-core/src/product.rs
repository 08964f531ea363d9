//! Product information extracted and translated from a packaging photo.
//!
//! The remote service describes a product as one flat JSON object: a fixed
//! `ingredients` array, a fixed `image` reference, and an open set of
//! service-defined string fields (brand, net content, usage instructions,
//! ...). The open part is kept as an explicit *ordered* string-to-string
//! mapping rather than a dynamic record, so serialization and diffing stay
//! well-defined.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The open field set produced by extraction and translation.
///
/// `ingredients` is ordered and may contain duplicates; `extra` preserves the
/// order in which the service emitted its keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFields {
    /// Ingredient names in label order.
    pub ingredients: Vec<String>,
    /// Service-defined fields, in document order.
    pub extra: Vec<(String, String)>,
}

impl ProductFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up an extra field by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.extra
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Sets an extra field, replacing an existing entry in place so the
    /// field order is stable under repeated edits.
    pub fn set_extra(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.extra.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.extra.push((key, value));
        }
    }

    /// Removes an extra field and returns its value.
    pub fn take_extra(&mut self, key: &str) -> Option<String> {
        let idx = self.extra.iter().position(|(k, _)| k == key)?;
        Some(self.extra.remove(idx).1)
    }

    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty() && self.extra.is_empty()
    }

    /// Merges another field set into this one. Ingredients are appended only
    /// if this set has none; extras are inserted per-key.
    pub fn merge(&mut self, other: ProductFields) {
        if self.ingredients.is_empty() {
            self.ingredients = other.ingredients;
        }
        for (key, value) in other.extra {
            self.set_extra(key, value);
        }
    }
}

impl Serialize for ProductFields {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(1 + self.extra.len()))?;
        map.serialize_entry("ingredients", &self.ingredients)?;
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct FieldsVisitor;

impl<'de> Visitor<'de> for FieldsVisitor {
    type Value = ProductFields;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a product field object")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut fields = ProductFields::new();
        while let Some(key) = access.next_key::<String>()? {
            if key == "ingredients" {
                fields.ingredients = access.next_value()?;
                continue;
            }
            // Non-string scalars and nested values are stringified; the
            // service is free to invent keys but the client stores strings.
            match access.next_value::<serde_json::Value>()? {
                serde_json::Value::Null => {}
                serde_json::Value::String(s) => {
                    if !s.is_empty() {
                        fields.extra.push((key, s));
                    }
                }
                other => fields.extra.push((key, other.to_string())),
            }
        }
        Ok(fields)
    }
}

impl<'de> Deserialize<'de> for ProductFields {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(FieldsVisitor)
    }
}

/// Structured product information: the field set plus the image it came from.
///
/// Mutable while the user reviews it; once a session has been created from
/// it, later edits are not re-synced to the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductInfo {
    pub fields: ProductFields,
    /// Opaque reference to the source image: a local path before the image
    /// is published, a durable URI afterwards.
    pub image: String,
}

impl ProductInfo {
    pub fn new(fields: ProductFields, image: impl Into<String>) -> Self {
        Self {
            fields,
            image: image.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.image.is_empty()
    }
}

impl Serialize for ProductInfo {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(2 + self.fields.extra.len()))?;
        map.serialize_entry("ingredients", &self.fields.ingredients)?;
        map.serialize_entry("image", &self.image)?;
        for (key, value) in &self.fields.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ProductInfo {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut fields = ProductFields::deserialize(deserializer)?;
        let image = fields.take_extra("image").unwrap_or_default();
        Ok(Self { fields, image })
    }
}

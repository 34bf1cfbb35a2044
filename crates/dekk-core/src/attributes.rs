//! Canonical tire attributes extracted from supplier records.

use serde::{Deserialize, Serialize};

/// Attribute keys, in the order the catalog displays them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeKey {
    Width,
    Height,
    RimSize,
    TireSubtype,
    Pattern,
    Finish,
    Brand,
    StudStatus,
    HasStuds,
    TireType,
    LoadIndex,
    SpeedRating,
    Subtype,
}

impl AttributeKey {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AttributeKey::Width => "width",
            AttributeKey::Height => "height",
            AttributeKey::RimSize => "rimSize",
            AttributeKey::TireSubtype => "tireSubtype",
            AttributeKey::Pattern => "pattern",
            AttributeKey::Finish => "finish",
            AttributeKey::Brand => "brand",
            AttributeKey::StudStatus => "studStatus",
            AttributeKey::HasStuds => "hasStuds",
            AttributeKey::TireType => "tireType",
            AttributeKey::LoadIndex => "loadIndex",
            AttributeKey::SpeedRating => "speedRating",
            AttributeKey::Subtype => "subtype",
        }
    }

    /// Customer-facing label used in generated descriptions.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            AttributeKey::Width => "Breidd",
            AttributeKey::Height => "Prófíll",
            AttributeKey::RimSize => "Felgustærð",
            AttributeKey::TireSubtype => "Flokkur",
            AttributeKey::Pattern => "Munstur",
            AttributeKey::Finish => "Letur",
            AttributeKey::Brand => "Framleiðandi",
            AttributeKey::StudStatus => "Negling",
            AttributeKey::HasStuds => "Naglar",
            AttributeKey::TireType => "Tegund",
            AttributeKey::LoadIndex => "Burðarþol",
            AttributeKey::SpeedRating => "Hraðaflokkur",
            AttributeKey::Subtype => "Gerð",
        }
    }

    pub const ALL: [AttributeKey; 13] = [
        AttributeKey::Width,
        AttributeKey::Height,
        AttributeKey::RimSize,
        AttributeKey::TireSubtype,
        AttributeKey::Pattern,
        AttributeKey::Finish,
        AttributeKey::Brand,
        AttributeKey::StudStatus,
        AttributeKey::HasStuds,
        AttributeKey::TireType,
        AttributeKey::LoadIndex,
        AttributeKey::SpeedRating,
        AttributeKey::Subtype,
    ];
}

impl std::str::FromStr for AttributeKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AttributeKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown attribute key '{s}'"))
    }
}

/// A single attribute with one or more values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: AttributeKey,
    pub values: Vec<String>,
    /// Shown on the product page.
    pub visible: bool,
    /// Each value becomes a separately priced child variant.
    pub variation: bool,
}

/// Ordered attribute collection. Insertion order is preserved so catalog
/// writes and generated descriptions stay stable between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeSet {
    attributes: Vec<Attribute>,
}

impl AttributeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a visible, non-variation value under `key`.
    ///
    /// Blank values are ignored and duplicate values are collapsed, so callers
    /// can pass unparsed supplier fields straight through.
    pub fn insert(&mut self, key: AttributeKey, value: impl Into<String>) {
        let value = value.into();
        let value = value.trim();
        if value.is_empty() {
            return;
        }

        if let Some(existing) = self.attributes.iter_mut().find(|a| a.key == key) {
            if !existing.values.iter().any(|v| v == value) {
                existing.values.push(value.to_string());
            }
            return;
        }

        self.attributes.push(Attribute {
            key,
            values: vec![value.to_string()],
            visible: true,
            variation: false,
        });
    }

    /// Adds (or replaces) a variation attribute; every value becomes a variant.
    pub fn insert_variation(&mut self, key: AttributeKey, values: &[&str]) {
        let values: Vec<String> = values
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        if values.is_empty() {
            return;
        }

        let attribute = Attribute {
            key,
            values,
            visible: true,
            variation: true,
        };
        match self.attributes.iter_mut().find(|a| a.key == key) {
            Some(existing) => *existing = attribute,
            None => self.attributes.push(attribute),
        }
    }

    #[must_use]
    pub fn get(&self, key: AttributeKey) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.key == key)
    }

    /// Returns the first value stored under `key`.
    #[must_use]
    pub fn first(&self, key: AttributeKey) -> Option<&str> {
        self.get(key)
            .and_then(|a| a.values.first())
            .map(String::as_str)
    }

    #[must_use]
    pub fn values(&self, key: AttributeKey) -> &[String] {
        self.get(key).map_or(&[], |a| a.values.as_slice())
    }

    #[must_use]
    pub fn contains(&self, key: AttributeKey) -> bool {
        self.get(key).is_some()
    }

    /// The attribute that drives child variants, if any.
    #[must_use]
    pub fn variation(&self) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.variation)
    }

    #[must_use]
    pub fn is_variable(&self) -> bool {
        self.variation().is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pantry inventory models.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AppError, Result};

/// Ownership boundary within which item names are de-duplicated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InventoryScope {
    /// The signed-in user's own pantry (owner implied by the session)
    Personal,
    /// A shared family pantry
    Family(String),
}

impl InventoryScope {
    pub fn family_id(&self) -> Option<&str> {
        match self {
            InventoryScope::Personal => None,
            InventoryScope::Family(id) => Some(id),
        }
    }

    /// Whether `item` lives in this scope.
    pub fn contains(&self, item: &InventoryItem) -> bool {
        item.family_id.as_deref() == self.family_id()
    }
}

/// Persisted inventory item as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Server-assigned id; numeric ids are kept in their decimal form
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Expiry date (YYYY-MM-DD)
    #[serde(default)]
    pub expires_at: Option<NaiveDate>,
    /// Owner, for personal items
    #[serde(default)]
    pub user_id: Option<String>,
    /// Family, for shared items
    #[serde(default)]
    pub family_id: Option<String>,
}

impl InventoryItem {
    /// De-duplication key of this item's name.
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(serde_json::Number),
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match WireId::deserialize(deserializer)? {
        WireId::Text(id) => id,
        WireId::Number(id) => id.to_string(),
    })
}

/// Trim and case-fold an item name into its merge key.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// User-entered item, before it is matched against the pantry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemInput {
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub category: Option<String>,
    pub expires_at: Option<NaiveDate>,
}

impl ItemInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_quantity(mut self, quantity: f64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_expires_at(mut self, date: NaiveDate) -> Self {
        self.expires_at = Some(date);
        self
    }

    /// Parse a quantity typed into a text field. Blank means unspecified.
    pub fn parse_quantity(raw: &str) -> Result<Option<f64>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        let value: f64 = raw
            .parse()
            .map_err(|_| AppError::Validation(format!("quantity is not a number: {:?}", raw)))?;
        validate_quantity(value)?;
        Ok(Some(value))
    }

    /// Check name and quantity preconditions.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("name must not be empty".to_string()));
        }
        if let Some(quantity) = self.quantity {
            validate_quantity(quantity)?;
        }
        Ok(())
    }
}

fn validate_quantity(value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(AppError::Validation(format!(
            "quantity must be a finite number, got {}",
            value
        )));
    }
    if value < 0.0 {
        return Err(AppError::Validation(format!(
            "quantity must not be negative, got {}",
            value
        )));
    }
    Ok(())
}

/// Create request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewItem {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_id: Option<String>,
}

/// Update request body. Omitted fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<NaiveDate>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Category-driven default expiry dates.

use chrono::{Days, NaiveDate};
use std::collections::HashMap;

/// Shelf life in days per category (lowercase).
const DEFAULT_SHELF_LIFE: &[(&str, u64)] = &[
    ("meat", 3),
    ("seafood", 2),
    ("fish", 2),
    ("bakery", 5),
    ("bread", 5),
    ("produce", 7),
    ("fruit", 7),
    ("vegetables", 7),
    ("dairy", 10),
    ("eggs", 21),
    ("condiments", 90),
    ("frozen", 90),
    ("beverages", 180),
    ("snacks", 120),
    ("pantry", 365),
    ("canned", 365),
    ("grains", 365),
    ("spices", 730),
];

/// Maps an item category to a default expiry offset.
#[derive(Debug, Clone)]
pub struct ExpiryPolicy {
    shelf_life_days: HashMap<String, u64>,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            shelf_life_days: DEFAULT_SHELF_LIFE
                .iter()
                .map(|(category, days)| (category.to_string(), *days))
                .collect(),
        }
    }
}

impl ExpiryPolicy {
    /// Policy with no categories; add them with [`with_category`](Self::with_category).
    pub fn empty() -> Self {
        Self {
            shelf_life_days: HashMap::new(),
        }
    }

    pub fn with_category(mut self, category: &str, days: u64) -> Self {
        self.shelf_life_days
            .insert(category.trim().to_lowercase(), days);
        self
    }

    pub fn shelf_life_days(&self, category: &str) -> Option<u64> {
        self.shelf_life_days
            .get(&category.trim().to_lowercase())
            .copied()
    }

    /// `today` plus the category's shelf life; `None` for unknown categories.
    pub fn default_expiry(&self, category: &str, today: NaiveDate) -> Option<NaiveDate> {
        let days = self.shelf_life_days(category)?;
        today.checked_add_days(Days::new(days))
    }
}

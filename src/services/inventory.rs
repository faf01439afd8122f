// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pantry inventory service.
//!
//! Handles the upsert-by-name workflow:
//! 1. Validate the user's input
//! 2. Match the normalized name against the caller's snapshot, within scope
//! 3. Merge into the matching item (PATCH) or create a new one (POST)
//! 4. Return the snapshot with that single write applied
//!
//! No locking is done here. Two upserts for the same name issued without
//! awaiting the first will both see "no match" and both create; callers
//! serialize upserts per scope, and `upsert_all` does so structurally.

use chrono::{NaiveDate, Utc};

use crate::error::{AppError, Result};
use crate::models::{
    normalize_name, InventoryItem, InventoryScope, ItemInput, ItemPatch, NewItem,
};
use crate::services::{ApiClient, ExpiryPolicy};

/// What an upsert will send to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertPlan {
    /// Update the snapshot entry at `index`
    Merge {
        index: usize,
        item_id: String,
        patch: ItemPatch,
    },
    /// No entry in scope has this name
    Create(NewItem),
}

/// Result of a single upsert.
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    /// The item as persisted by the backend
    pub item: InventoryItem,
    /// True if an existing item was updated
    pub merged: bool,
    /// The input snapshot with this write applied
    pub snapshot: Vec<InventoryItem>,
}

/// Result of a sequential batch of upserts.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub items: Vec<InventoryItem>,
    pub merged: usize,
    pub created: usize,
    pub snapshot: Vec<InventoryItem>,
}

pub struct InventoryService {
    api: ApiClient,
    expiry_policy: Option<ExpiryPolicy>,
}

impl InventoryService {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            expiry_policy: None,
        }
    }

    /// Fill in a category-based expiry when creating items that have none.
    pub fn with_expiry_policy(mut self, policy: ExpiryPolicy) -> Self {
        self.expiry_policy = Some(policy);
        self
    }

    /// Fetch the current items in `scope`.
    pub async fn load_snapshot(&self, scope: &InventoryScope) -> Result<Vec<InventoryItem>> {
        let items = self.api.list_items(scope).await.map_err(AppError::Upstream)?;
        tracing::debug!(count = items.len(), family_id = ?scope.family_id(), "Loaded pantry snapshot");
        Ok(items)
    }

    /// Ensure exactly one item named `input.name` exists in `scope`.
    ///
    /// On failure `snapshot` is untouched, so a retry starts from the same state.
    pub async fn upsert_by_name(
        &self,
        input: ItemInput,
        snapshot: &[InventoryItem],
        scope: &InventoryScope,
    ) -> Result<UpsertOutcome> {
        let today = Utc::now().date_naive();
        let plan = plan_upsert(&input, snapshot, scope, self.expiry_policy.as_ref(), today)?;

        match plan {
            UpsertPlan::Merge {
                index,
                item_id,
                patch,
            } => {
                let item = self
                    .api
                    .update_item(&item_id, &patch)
                    .await
                    .map_err(AppError::Upstream)?;
                tracing::info!(item_id = %item.id, merged = true, "Pantry item merged");

                let mut updated = snapshot.to_vec();
                updated[index] = item.clone();
                Ok(UpsertOutcome {
                    item,
                    merged: true,
                    snapshot: updated,
                })
            }
            UpsertPlan::Create(new_item) => {
                let item = self
                    .api
                    .create_item(&new_item)
                    .await
                    .map_err(AppError::Upstream)?;
                tracing::info!(item_id = %item.id, merged = false, "Pantry item created");

                let mut updated = snapshot.to_vec();
                updated.push(item.clone());
                Ok(UpsertOutcome {
                    item,
                    merged: false,
                    snapshot: updated,
                })
            }
        }
    }

    /// Upsert each input in order, feeding each result snapshot into the next.
    ///
    /// Stops at the first failure; writes before it have already been applied.
    pub async fn upsert_all(
        &self,
        inputs: Vec<ItemInput>,
        snapshot: &[InventoryItem],
        scope: &InventoryScope,
    ) -> Result<BatchOutcome> {
        let mut batch = BatchOutcome {
            snapshot: snapshot.to_vec(),
            ..BatchOutcome::default()
        };

        for input in inputs {
            let outcome = self.upsert_by_name(input, &batch.snapshot, scope).await?;
            if outcome.merged {
                batch.merged += 1;
            } else {
                batch.created += 1;
            }
            batch.items.push(outcome.item);
            batch.snapshot = outcome.snapshot;
        }

        Ok(batch)
    }

    /// Delete an item and return `snapshot` without it.
    pub async fn delete_item(
        &self,
        item_id: &str,
        snapshot: &[InventoryItem],
    ) -> Result<Vec<InventoryItem>> {
        self.api
            .delete_item(item_id)
            .await
            .map_err(AppError::Upstream)?;
        tracing::info!(item_id, "Pantry item deleted");

        Ok(snapshot
            .iter()
            .filter(|item| item.id != item_id)
            .cloned()
            .collect())
    }
}

/// Decide between merge and create without touching the network.
pub fn plan_upsert(
    input: &ItemInput,
    snapshot: &[InventoryItem],
    scope: &InventoryScope,
    expiry_policy: Option<&ExpiryPolicy>,
    today: NaiveDate,
) -> Result<UpsertPlan> {
    input.validate()?;

    let key = normalize_name(&input.name);
    let mut matches = snapshot
        .iter()
        .enumerate()
        .filter(|(_, item)| scope.contains(item) && item.normalized_name() == key);

    let Some((index, existing)) = matches.next() else {
        let expires_at = input.expires_at.or_else(|| {
            let policy = expiry_policy?;
            policy.default_expiry(input.category.as_deref()?, today)
        });
        return Ok(UpsertPlan::Create(NewItem {
            name: input.name.trim().to_string(),
            quantity: input.quantity,
            unit: input.unit.clone(),
            category: input.category.clone(),
            expires_at,
            family_id: scope.family_id().map(str::to_string),
        }));
    };

    let duplicates = matches.count();
    if duplicates > 0 {
        tracing::warn!(
            name = %key,
            duplicates,
            item_id = %existing.id,
            "Multiple pantry items share a normalized name, merging into the first"
        );
    }

    let quantity = input
        .quantity
        .map(|added| existing.quantity.unwrap_or(0.0) + added);
    if quantity.is_some_and(|total| !total.is_finite()) {
        return Err(AppError::Validation(format!(
            "merged quantity for {:?} is out of range",
            input.name.trim()
        )));
    }

    let patch = ItemPatch {
        quantity,
        unit: input.unit.clone(),
        category: input.category.clone(),
        expires_at: input.expires_at,
    };

    Ok(UpsertPlan::Merge {
        index,
        item_id: existing.id.clone(),
        patch,
    })
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the client.

pub mod item;
pub mod session;

pub use item::{normalize_name, InventoryItem, InventoryScope, ItemInput, ItemPatch, NewItem};
pub use session::{
    AccountUser, AuthTokens, IdentityAssertion, PasswordCredentials, Provider, Session,
};

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - backend calls and client-side workflows.

pub mod api;
pub mod expiry;
pub mod identity;
pub mod inventory;
pub mod session;
pub mod throttle;

pub use api::ApiClient;
pub use expiry::ExpiryPolicy;
pub use identity::{BootstrapPath, IdentityService, Registration};
pub use inventory::{plan_upsert, BatchOutcome, InventoryService, UpsertOutcome, UpsertPlan};
pub use session::{SessionEnd, SessionManager};
pub use throttle::{AttemptThrottle, ThrottlePolicy, ThrottleRegistry};

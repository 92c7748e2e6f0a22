// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The host's live request dispatcher, as seen by the runtime.

use std::sync::Arc;

use crate::error::WardenError;
use crate::traits::controller::RouteHandler;
use crate::types::RouteKey;

/// Mutable routing table of the running host.
///
/// Implementations must reject a key that overlaps an existing one
/// (see [`RouteKey::overlaps`]) with [`WardenError::RouteConflict`].
pub trait RouteDispatcher: Send + Sync {
    fn register(&self, key: RouteKey, handler: Arc<dyn RouteHandler>) -> Result<(), WardenError>;

    /// Remove a mapping. Returns `false` when it was not registered.
    fn unregister(&self, key: &RouteKey) -> bool;

    fn contains(&self, key: &RouteKey) -> bool;

    /// Number of live mappings.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

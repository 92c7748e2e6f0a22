// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Panic containment around calls into plugin code.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use warden_core::WardenError;

/// Human-readable text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        return (*msg).to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}

/// Run a plugin hook, turning a panic into a [`WardenError::Lifecycle`].
pub fn guard<T>(
    plugin_id: &str,
    phase: &str,
    f: impl FnOnce() -> Result<T, WardenError>,
) -> Result<T, WardenError> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(WardenError::lifecycle(
            plugin_id,
            phase,
            format!("panicked: {}", panic_message(payload.as_ref())),
        )),
    }
}

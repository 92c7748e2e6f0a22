// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP host for the Warden plugin runtime.
//!
//! [`LiveRouter`] is the dispatcher plugin endpoints are registered with;
//! [`build_app`] wires it behind the admin API and the health check.

pub mod auth;
pub mod handlers;
pub mod router;
pub mod server;

pub use auth::AuthConfig;
pub use router::LiveRouter;
pub use server::{GatewayState, ServerConfig, build_app, start_server};

// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A ledger plugin compiled as its own shared library.

use std::sync::{Arc, Mutex};

use warden_core::{
    Controller, ControllerRoutes, ControllerSpec, Plugin, PluginContext, PluginRequest,
    PluginResponse, RouteContributor, WardenError,
};

#[derive(Default)]
struct LedgerPlugin {
    currency: Arc<Mutex<String>>,
}

impl Plugin for LedgerPlugin {
    fn initialize(&self, context: Arc<PluginContext>) -> Result<(), WardenError> {
        let currency = context.config_str("currency").unwrap_or("EUR").to_string();
        *self.currency.lock().unwrap_or_else(|e| e.into_inner()) = currency;
        Ok(())
    }

    fn as_route_contributor(&self) -> Option<&dyn RouteContributor> {
        Some(self)
    }
}

impl RouteContributor for LedgerPlugin {
    fn controllers(&self) -> Vec<ControllerSpec> {
        let currency = self.currency.clone();
        vec![ControllerSpec::new("EntryController", move |context| {
            Ok(Box::new(EntryController {
                owner: context.plugin_id().to_string(),
                currency: currency.clone(),
            }) as Box<dyn Controller>)
        })]
    }
}

struct EntryController {
    owner: String,
    currency: Arc<Mutex<String>>,
}

impl Controller for EntryController {
    fn routes(&self) -> ControllerRoutes {
        let owner = self.owner.clone();
        let currency = self.currency.clone();
        ControllerRoutes::new()
            .base("/entries")
            .get("show", "/{id}", move |request: PluginRequest| {
                let currency = currency.lock().unwrap_or_else(|e| e.into_inner()).clone();
                let entry = request.param("id").unwrap_or_default();
                PluginResponse::text(200, format!("{owner}:{entry}:{currency}"))
            })
    }
}

warden_core::export_plugins! {
    "ledger.LedgerPlugin" => LedgerPlugin::default(),
}

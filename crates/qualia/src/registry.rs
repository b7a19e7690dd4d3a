// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use crate::resource::{ProcedureKind, ResourceDescriptor};
use once_cell::sync::Lazy;
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("resource {0} declares no attributes")]
    EmptyAttrs(&'static str),
    #[error("procedure {procedure} derived by both {first} and {second}")]
    Ambiguous {
        procedure: String,
        first: &'static str,
        second: &'static str,
    },
    #[error("no admin resource declared")]
    MissingAdmin,
}

/// The resource table plus a reverse catalogue mapping every derived
/// procedure name back to its resource and operation. Building the
/// registry validates the catalogue; an ambiguous or empty declaration
/// is a boot failure, not a latent runtime one.
pub struct Registry {
    resources: Vec<ResourceDescriptor>,
    catalog: HashMap<String, (usize, ProcedureKind)>,
    admin: usize,
}

static REGISTRY: Lazy<Registry> =
    Lazy::new(|| Registry::standard().expect("resource catalogue is unambiguous"));

/// The process-wide registry. First use validates the standard table.
pub fn registry() -> &'static Registry {
    &REGISTRY
}

impl Registry {
    /// The survey's resource table. The admin resource is catalogued
    /// for permission lookups but never routed.
    pub fn standard() -> Result<Self, CatalogError> {
        Self::with_resources(vec![
            ResourceDescriptor::new("mood", &["name"]),
            ResourceDescriptor::new("color", &["name", "hue", "saturation", "brightness"])
                .related(),
            ResourceDescriptor::new("shape", &["name", "sides"]).related(),
            ResourceDescriptor::new("scent", &["name", "family"]).related(),
            ResourceDescriptor::new("taste", &["type"]).related(),
            ResourceDescriptor::new("media_genre", &["name"])
                .alias("mediagenre")
                .related(),
            ResourceDescriptor::new("music_genre", &["name"])
                .alias("musicgenre")
                .related(),
            ResourceDescriptor::new("admin", &["id", "permissions"]).internal(),
        ])
    }

    pub fn with_resources(resources: Vec<ResourceDescriptor>) -> Result<Self, CatalogError> {
        let mut catalog: HashMap<String, (usize, ProcedureKind)> = HashMap::new();
        for (index, resource) in resources.iter().enumerate() {
            if resource.attrs().is_empty() {
                return Err(CatalogError::EmptyAttrs(resource.name()));
            }
            for (procedure, kind) in resource.procedures() {
                if let Some((existing, _)) = catalog.get(&procedure) {
                    return Err(CatalogError::Ambiguous {
                        procedure,
                        first: resources[*existing].name(),
                        second: resource.name(),
                    });
                }
                catalog.insert(procedure, (index, kind));
            }
        }
        let admin = resources
            .iter()
            .position(|resource| resource.name() == "admin")
            .ok_or(CatalogError::MissingAdmin)?;
        Ok(Self {
            resources,
            catalog,
            admin,
        })
    }

    pub fn resources(&self) -> &[ResourceDescriptor] {
        &self.resources
    }

    pub fn admin(&self) -> &ResourceDescriptor {
        &self.resources[self.admin]
    }

    pub fn lookup(&self, procedure: &str) -> Option<(&ResourceDescriptor, ProcedureKind)> {
        self.catalog
            .get(procedure)
            .map(|(index, kind)| (&self.resources[*index], *kind))
    }
}

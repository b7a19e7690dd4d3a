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

use serde::Deserialize;
use std::env;
use std::fs;
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default)]
    pub database: DatabaseConfig,
}

fn default_listen() -> String {
    "127.0.0.1:5000".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Mysql,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: Backend,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Mysql,
            host: "127.0.0.1".to_string(),
            port: 3306,
            user: String::new(),
            password: String::new(),
            database: String::new(),
        }
    }
}

impl AppConfig {
    /// Loads `config.toml` (path overridable via `QUALIA_CONFIG`), then
    /// applies `QUALIA_*` environment overrides. A missing file falls
    /// back to the in-memory backend so mock mode needs no config at
    /// all; a malformed file is still a hard error.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("QUALIA_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = match fs::read_to_string(&path) {
            Ok(raw) => toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                warn!(%path, "config file not found, using the in-memory backend");
                Self {
                    listen: default_listen(),
                    database: DatabaseConfig {
                        backend: Backend::Memory,
                        ..DatabaseConfig::default()
                    },
                }
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(listen) = env::var("QUALIA_LISTEN") {
            self.listen = listen;
        }
        if let Ok(backend) = env::var("QUALIA_DB_BACKEND") {
            match backend.as_str() {
                "memory" => self.database.backend = Backend::Memory,
                "mysql" => self.database.backend = Backend::Mysql,
                other => warn!(backend = other, "unknown QUALIA_DB_BACKEND ignored"),
            }
        }
        if let Ok(host) = env::var("QUALIA_DB_HOST") {
            self.database.host = host;
        }
        if let Ok(port) = env::var("QUALIA_DB_PORT") {
            match port.parse() {
                Ok(parsed) => self.database.port = parsed,
                Err(_) => warn!(%port, "invalid QUALIA_DB_PORT ignored"),
            }
        }
        if let Ok(user) = env::var("QUALIA_DB_USER") {
            self.database.user = user;
        }
        if let Ok(password) = env::var("QUALIA_DB_PASS") {
            self.database.password = password;
        }
        if let Ok(database) = env::var("QUALIA_DB_NAME") {
            self.database.database = database;
        }
    }
}

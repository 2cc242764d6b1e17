//! Declarative route manifests.
//!
//! A manifest is a YAML document listing routes and (nested) groups in
//! registration order. It is fed through the same [`RouteTableBuilder`] as
//! code-registered routes, so group prefixes, middleware order, flag
//! inheritance and first-match precedence are identical.
//!
//! ```yaml
//! routes:
//!   - { method: GET, path: /, handler: HomeController@index }
//!   - group:
//!       prefix: /admin
//!       admin: true
//!       routes:
//!         - method: [GET, POST]
//!           path: /users
//!           handler: AdminController@users
//!           middleware: [RateLimit]
//! ```

use std::path::Path;

use http::Method;
use serde::Deserialize;
use tracing::info;

use crate::error::ConfigError;
use crate::router::{GroupOptions, RouteTable, RouteTableBuilder};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    #[serde(default)]
    routes: Vec<Entry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Entry {
    Group { group: GroupDef },
    Route(RouteDef),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct GroupDef {
    #[serde(default)]
    prefix: String,
    #[serde(default)]
    middleware: Vec<String>,
    #[serde(default)]
    auth: bool,
    #[serde(default)]
    admin: bool,
    #[serde(default)]
    routes: Vec<Entry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RouteDef {
    method: OneOrMany,
    path: String,
    handler: String,
    #[serde(default)]
    middleware: Vec<String>,
    #[serde(default)]
    auth: bool,
    #[serde(default)]
    admin: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn methods(&self) -> Result<Vec<Method>, ConfigError> {
        let names: &[String] = match self {
            OneOrMany::One(m) => std::slice::from_ref(m),
            OneOrMany::Many(ms) => ms,
        };
        names
            .iter()
            .map(|m| {
                m.to_ascii_uppercase()
                    .parse::<Method>()
                    .map_err(|_| ConfigError::UnsupportedMethod(m.clone()))
            })
            .collect()
    }
}

fn register(builder: &mut RouteTableBuilder, entries: &[Entry]) -> Result<(), ConfigError> {
    for entry in entries {
        match entry {
            Entry::Group { group } => {
                let options = GroupOptions {
                    prefix: group.prefix.clone(),
                    middleware: group.middleware.clone(),
                    auth: group.auth,
                    admin: group.admin,
                };
                builder.group(options, |b| register(b, &group.routes))?;
            }
            Entry::Route(def) => {
                let methods = def.method.methods()?;
                let handle =
                    builder.add(&def.path, &def.handler, &methods, def.auth, def.admin)?;
                def.middleware
                    .iter()
                    .fold(handle, |handle, id| handle.middleware(id));
            }
        }
    }
    Ok(())
}

/// Build a route table from manifest YAML.
///
/// # Errors
///
/// [`ConfigError::Manifest`] for YAML that does not describe a manifest, or
/// any registration error for the routes it declares.
pub fn from_str(raw: &str) -> Result<RouteTable, ConfigError> {
    let manifest: Manifest =
        serde_yaml::from_str(raw).map_err(|e| ConfigError::Manifest(e.to_string()))?;
    let mut builder = RouteTable::builder();
    register(&mut builder, &manifest.routes)?;
    builder.build()
}

/// Read and build the manifest at `path`.
///
/// # Errors
///
/// [`ConfigError::Manifest`] when the file cannot be read, plus everything
/// [`from_str`] reports.
pub fn load_manifest(path: &Path) -> Result<RouteTable, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Manifest(format!("{}: {e}", path.display())))?;
    let table = from_str(&raw)?;
    info!(
        path = %path.display(),
        routes_count = table.len(),
        "Route manifest loaded"
    );
    Ok(table)
}

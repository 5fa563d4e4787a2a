// Script table
//
// Built from Debugger.scriptParsed while a session runs: maps protocol script ids to
// logical source urls, and logical source keys to the exact url breakpoints must use.

use crate::error::{HarnessError, HarnessResult};
use crate::inspector::Inspector;
use cdp_client::commands::notifications;
use cdp_client::ScriptParsed;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Script ids synthesized by the .NET debugger proxy start with this
pub const SYNTHETIC_PREFIX: &str = "dotnet://";

#[derive(Debug, Default)]
struct Tables {
    id_to_url: HashMap<String, String>,
    file_to_url: HashMap<String, String>,
}

/// Shared, incrementally populated script lookup for one session
#[derive(Debug, Clone, Default)]
pub struct ScriptTable {
    tables: Arc<Mutex<Tables>>,
}

impl ScriptTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table kept up to date by a standing `Debugger.scriptParsed` handler
    pub fn subscribe(inspector: &Inspector) -> Self {
        let table = Self::new();
        let handle = table.clone();
        inspector.on(notifications::SCRIPT_PARSED, move |notification| {
            let script: ScriptParsed = serde_json::from_value(notification.params.clone())
                .map_err(|e| HarnessError::malformed("Debugger.scriptParsed", e))?;
            handle.record(&script)
        });
        table
    }

    /// Index one parsed script
    pub fn record(&self, script: &ScriptParsed) -> HarnessResult<()> {
        if script.script_id.starts_with(SYNTHETIC_PREFIX) {
            let dot_net_url = script.dot_net_url.as_deref().ok_or_else(|| {
                HarnessError::malformed(
                    "Debugger.scriptParsed",
                    format!("script {} has no dotNetUrl", script.script_id),
                )
            })?;
            let logical = logical_url(dot_net_url)?;
            debug!("Script {} -> {} ({})", script.script_id, logical, script.url);

            let mut tables = self.tables.lock();
            tables
                .id_to_url
                .insert(script.script_id.clone(), logical.clone());
            tables.file_to_url.insert(logical, script.url.clone());
        } else if !script.url.is_empty() {
            match Url::parse(&script.url) {
                Ok(parsed) => {
                    self.tables
                        .lock()
                        .file_to_url
                        .insert(parsed.path().to_string(), script.url.clone());
                }
                Err(e) => warn!("Ignoring script {} with unparsable url {}: {}", script.script_id, script.url, e),
            }
        }
        Ok(())
    }

    /// Logical source url of a script id
    pub fn url_for_script(&self, script_id: &str) -> Option<String> {
        self.tables.lock().id_to_url.get(script_id).cloned()
    }

    /// Exact url to use in protocol requests for a logical source key
    pub fn url_for_file(&self, key: &str) -> Option<String> {
        self.tables.lock().file_to_url.get(key).cloned()
    }

    /// Whether a script with this logical url has been announced
    pub fn contains_source(&self, logical_url: &str) -> bool {
        self.tables
            .lock()
            .id_to_url
            .values()
            .any(|url| url == logical_url)
    }

    /// Every announced logical url, sorted
    pub fn sources(&self) -> Vec<String> {
        let mut sources: Vec<String> = self.tables.lock().id_to_url.values().cloned().collect();
        sources.sort();
        sources.dedup();
        sources
    }

    pub fn len(&self) -> usize {
        self.tables.lock().id_to_url.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `dotnet://asm.dll/a/b/c/file.cs` -> `dotnet://asm.dll/file.cs`
///
/// Keeps the first three `/`-separated segments and the last one.
pub fn logical_url(dot_net_url: &str) -> HarnessResult<String> {
    let segments: Vec<&str> = dot_net_url.split('/').collect();
    if segments.len() < 4 {
        return Err(HarnessError::malformed(
            "dotNetUrl",
            format!("{:?} has fewer than four segments", dot_net_url),
        ));
    }
    Ok(format!(
        "{}/{}/{}/{}",
        segments[0],
        segments[1],
        segments[2],
        segments[segments.len() - 1]
    ))
}

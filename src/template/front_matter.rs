//! YAML front matter extraction

use super::{Metadata, TemplateConfig};
use gray_matter::Matter;
use gray_matter::engine::YAML;
use serde_json::Value;
use tracing::warn;

/// Front matter keys holding template configuration, in precedence order
const CONFIG_KEYS: [&str; 2] = ["$config", "config"];

/// A template source split into attributes and body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    /// Attributes other than the configuration block
    pub attributes: Metadata,
    /// Configuration block from `$config` (or `config` when `$config` is absent)
    pub config: TemplateConfig,
    /// Source with the front matter removed
    pub body: String,
}

/// Split `raw` into front matter and body
///
/// Sources without front matter yield empty attributes and the whole source
/// as body. A configuration block that does not match the expected shape is
/// ignored with a warning.
#[must_use]
pub fn parse(raw: &str) -> FrontMatter {
    let matter = Matter::<YAML>::new();
    let parsed = matter.parse(raw);

    let mut attributes = match parsed.data.map(Into::<Value>::into) {
        Some(Value::Object(map)) => map,
        Some(Value::Null) | None => Metadata::new(),
        Some(other) => {
            warn!("ignoring front matter that is not a mapping: {other}");
            Metadata::new()
        }
    };

    let config = CONFIG_KEYS
        .iter()
        .find_map(|key| attributes.remove(*key))
        .map(|value| {
            serde_json::from_value::<TemplateConfig>(value).unwrap_or_else(|e| {
                warn!("ignoring invalid front matter config: {e}");
                TemplateConfig::default()
            })
        })
        .unwrap_or_default();

    FrontMatter {
        attributes,
        config,
        body: parsed.content,
    }
}

/// Body of `raw` with any front matter removed
#[must_use]
pub fn strip(raw: &str) -> String {
    Matter::<YAML>::new().parse(raw).content
}

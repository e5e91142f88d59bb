use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Command-line arguments for mustr
#[derive(Parser, Debug, Clone)]
#[command(name = "mustr")]
#[command(about = "Render Mustache-style templates into your project, with rollback and injection")]
#[command(long_about = None)]
#[command(version)]
pub struct Args {
    /// Options file path
    #[arg(
        long,
        value_name = "PATH",
        default_value = "./mustr.yaml",
        env = "MUSTR_CONFIG",
        global = true
    )]
    pub config: String,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Write the options file and seed the config directory
    Init {
        /// Overwrite an existing setup
        #[arg(short, long)]
        force: bool,
    },

    /// Render a template or component
    Generate {
        /// Template or component name
        template: String,

        /// Output name or path relative to the output directory
        output: Option<String>,

        /// Overwrite existing files, backing them up first
        #[arg(short, long)]
        force: bool,

        /// Metadata in KEY=VALUE format (can be specified multiple times)
        /// Multiple values with the same key create an array
        #[arg(long = "meta", value_name = "KEY=VALUE")]
        meta: Vec<String>,

        /// Metadata as JSON in KEY=JSON format (can be specified multiple times)
        #[arg(long = "meta-json", value_name = "KEY=JSON")]
        meta_json: Vec<String>,
    },

    /// Undo a render by rollback id, listing index, or template name
    Rollback {
        /// Rollback id, 1-based index from `show rollbacks`, or template name;
        /// defaults to the most recent rollback
        target: Option<String>,

        /// Output used when rolling back by template name
        output: Option<String>,
    },

    /// Manage the rollback ledger
    Rollbacks {
        #[command(subcommand)]
        action: RollbacksAction,
    },

    /// List registered templates, components, or rollbacks
    Show {
        #[arg(value_enum)]
        target: ShowTarget,
    },
}

/// Ledger maintenance actions
#[derive(Subcommand, Debug, Clone)]
pub enum RollbacksAction {
    /// Remove rollbacks by id, count of oldest entries, or date
    Remove {
        /// Rollback id, number of oldest rollbacks, or a date (YYYY-MM-DD or RFC 3339)
        selector: String,
    },

    /// Reconcile the ledger with the backups on disk
    Reindex {
        /// Keep orphaned backups and entries
        #[arg(long)]
        no_prune: bool,
    },
}

/// What `show` lists
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowTarget {
    Rollbacks,
    Templates,
    Components,
}

/// Parse metadata arguments from CLI into a map
/// Handles both --meta and --meta-json flags
/// Multiple values with the same key create an array
///
/// # Errors
///
/// Returns an error if an argument is not KEY=VALUE or the JSON is invalid
pub fn parse_metadata_args(
    meta_args: &[String],
    meta_json_args: &[String],
) -> anyhow::Result<Map<String, Value>> {
    let mut result: BTreeMap<String, Vec<Value>> = BTreeMap::new();

    for arg in meta_args {
        let (key, value) = parse_key_value(arg)?;
        result.entry(key).or_default().push(Value::String(value));
    }

    for arg in meta_json_args {
        let (key, json_str) = parse_key_value(arg)?;
        let value: Value = serde_json::from_str(&json_str).map_err(|e| {
            anyhow::anyhow!("Invalid JSON in --meta-json for key '{key}': {e}\nValue: {json_str}")
        })?;
        result.entry(key).or_default().push(value);
    }

    Ok(result
        .into_iter()
        .map(|(key, mut values)| {
            let value = if values.len() == 1 {
                values.remove(0)
            } else {
                Value::Array(values)
            };
            (key, value)
        })
        .collect())
}

/// Parse KEY=VALUE string
fn parse_key_value(arg: &str) -> anyhow::Result<(String, String)> {
    arg.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .ok_or_else(|| anyhow::anyhow!("Invalid metadata format '{arg}'. Expected KEY=VALUE"))
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "This is a test module")]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_metadata() {
        let meta = vec!["name=test".to_owned(), "port=8080".to_owned()];
        let result = parse_metadata_args(&meta, &[]).unwrap();

        assert_eq!(result.get("name"), Some(&Value::String("test".to_owned())));
        assert_eq!(result.get("port"), Some(&Value::String("8080".to_owned())));
    }

    #[test]
    fn test_parse_array_metadata() {
        let meta = vec![
            "items=a".to_owned(),
            "items=b".to_owned(),
            "items=c".to_owned(),
        ];
        let result = parse_metadata_args(&meta, &[]).unwrap();

        assert_eq!(result.get("items"), Some(&serde_json::json!(["a", "b", "c"])));
    }

    #[test]
    fn test_parse_json_metadata() {
        let json = vec![r#"people=[{"name":"Alice"},{"name":"Bob"}]"#.to_owned()];
        let result = parse_metadata_args(&["title=x=y".to_owned()], &json).unwrap();

        assert_eq!(result.get("title"), Some(&Value::String("x=y".to_owned())));
        assert_eq!(
            result.get("people"),
            Some(&serde_json::json!([{"name":"Alice"},{"name":"Bob"}]))
        );
    }

    #[test]
    fn test_invalid_metadata_format() {
        let result = parse_metadata_args(&["invalid".to_owned()], &[]);
        assert!(result.unwrap_err().to_string().contains("Expected KEY=VALUE"));
    }

    #[test]
    fn test_invalid_json() {
        let result = parse_metadata_args(&[], &[r"config={invalid json}".to_owned()]);
        assert!(result.unwrap_err().to_string().contains("Invalid JSON"));
    }

    #[test]
    fn test_generate_args() {
        let args = Args::try_parse_from([
            "mustr", "generate", "db", "models/user", "-f", "--meta", "author=Ann",
        ])
        .unwrap();

        match args.command {
            Command::Generate {
                template,
                output,
                force,
                meta,
                ..
            } => {
                assert_eq!(template, "db");
                assert_eq!(output.as_deref(), Some("models/user"));
                assert!(force);
                assert_eq!(meta, vec!["author=Ann".to_owned()]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}

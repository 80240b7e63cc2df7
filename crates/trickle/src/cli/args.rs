use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

/// Ask a streaming query service and watch the answer being typed out.
#[derive(Parser)]
#[command(version, about, long_about = None, author)]
pub struct Cli {
    /// Query endpoint (overrides the config file and TRICKLE_ENDPOINT)
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Base delay between typed characters, in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Session id sent with every request (defaults to a fresh UUID)
    #[arg(long, global = true)]
    pub session: Option<String>,

    /// Path to the config file (TOML format)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Extra request body field (repeatable). Values that parse as JSON are sent as JSON.
    #[arg(long = "field", global = true, value_name = "KEY=VALUE", value_parser = FieldArg::parse)]
    pub fields: Vec<FieldArg>,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Send one query and type out the answer
    Ask {
        /// The question; multiple words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Read queries line by line; a new line cancels the answer in progress
    Chat,
    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// A `key=value` pair merged into the request body.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldArg {
    pub key: String,
    pub value: Value,
}

impl FieldArg {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let (key, value) = raw
            .split_once('=')
            .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("missing key in '{raw}'"));
        }
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        Ok(Self {
            key: key.to_string(),
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("user_id=demo", "user_id", json!("demo"))]
    #[case("limit=5", "limit", json!(5))]
    #[case("debug=true", "debug", json!(true))]
    #[case("tags=[\"a\",\"b\"]", "tags", json!(["a", "b"]))]
    #[case("token=a=b", "token", json!("a=b"))]
    #[case("empty=", "empty", json!(""))]
    fn test_field_parsing(#[case] raw: &str, #[case] key: &str, #[case] value: Value) {
        let field = FieldArg::parse(raw).unwrap();
        assert_eq!(field.key, key);
        assert_eq!(field.value, value);
    }

    #[rstest]
    #[case("novalue")]
    #[case("=value")]
    fn test_invalid_fields(#[case] raw: &str) {
        assert!(FieldArg::parse(raw).is_err());
    }

    #[test]
    fn test_ask_joins_words() {
        let cli = Cli::try_parse_from(["trickle", "ask", "what", "is", "rust?"]).unwrap();
        match cli.command {
            Commands::Ask { query } => assert_eq!(query.join(" "), "what is rust?"),
            _ => unreachable!("parsed as ask"),
        }
    }

    #[test]
    fn test_ask_requires_query() {
        assert!(Cli::try_parse_from(["trickle", "ask"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["trickle", "chat", "--session", "abc", "--field", "x=1"]).unwrap();
        assert_eq!(cli.session.as_deref(), Some("abc"));
        assert_eq!(cli.fields.len(), 1);
        assert!(matches!(cli.command, Commands::Chat));
    }
}

use serde_json::{json, Map, Value};

use crate::cli::OutputFormat;

impl OutputFormat {
    /// `✓ message` in text mode, `{success, message, ..data}` in JSON mode
    pub fn success(&self, message: &str, data: Option<Value>) -> anyhow::Result<()> {
        match self {
            OutputFormat::Json => {
                let mut body = Map::new();
                body.insert("success".to_string(), Value::Bool(true));
                body.insert("message".to_string(), Value::String(message.to_string()));
                if let Some(Value::Object(extra)) = data {
                    body.extend(extra);
                }
                println!("{}", serde_json::to_string_pretty(&Value::Object(body))?);
            }
            OutputFormat::Text => println!("✓ {}", message),
        }
        Ok(())
    }

    pub fn error(&self, message: &str) -> anyhow::Result<()> {
        match self {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&json!({ "success": false, "error": message }))?);
            }
            OutputFormat::Text => eprintln!("Error: {}", message),
        }
        Ok(())
    }

    /// Nothing to list: `{<name>: []}` or a one-line note
    pub fn empty(&self, collection: &str, message: &str) -> anyhow::Result<()> {
        match self {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&json!({ collection: [] }))?),
            OutputFormat::Text => println!("{}", message),
        }
        Ok(())
    }
}

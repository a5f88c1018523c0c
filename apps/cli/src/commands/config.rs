use anyhow::anyhow;

use crate::cli::{Cli, ConfigCmd};
use crate::config::{CliConfig, config_path};

pub fn run(cli: &Cli, mut config: CliConfig, cmd: &ConfigCmd) -> anyhow::Result<()> {
    let path = config_path().ok_or_else(|| anyhow!("cannot locate the config directory"))?;
    match cmd {
        ConfigCmd::Show => {
            let mut shown = config.clone();
            shown.api_key = shown.api_key.as_deref().map(mask_key);
            println!("# {}", path.display());
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }
        ConfigCmd::Save {
            device_id,
            concurrency,
        } => {
            if let Some(endpoint) = &cli.endpoint {
                config.endpoint = Some(endpoint.clone());
            }
            if let Some(key) = &cli.api_key {
                config.api_key = Some(key.clone());
            }
            if let Some(device_id) = device_id {
                config.device_id = Some(device_id.clone());
            }
            if let Some(concurrency) = concurrency {
                config.concurrency = Some((*concurrency).max(1));
            }
            config.save_to(&path)?;
            println!("Configuration saved to {}.", path.display());
        }
    }
    Ok(())
}

/// Keeps the last four characters.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "****".into();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_masked() {
        assert_eq!(mask_key("abcdefgh1234"), "****1234");
        assert_eq!(mask_key("abc"), "****");
    }
}

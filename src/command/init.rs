use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::error::{fail, Attempt};

pub fn init_command(path: &Path) -> Attempt {
    if path.exists() {
        return fail("a config file already exists in this location");
    }

    let starter = serde_json::json!({
        "retry": {
            "max_attempts": 3,
            "backoff_seconds": [5, 15, 45]
        },
        "targets": [
            {
                "name": "example",
                "path": "working-copies/example",
                "kind": "git",
                "url": "ssh://git@example.com/example.git",
                "branch": "main"
            }
        ]
    });

    let rendered = serde_json::to_string_pretty(&starter).context("could not render config")?;
    fs::write(path, rendered + "\n")
        .with_context(|| format!("could not write {}", path.display()))?;
    eprintln!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn starter_config_loads_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tether.json");
        init_command(&path).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.targets.len(), 1);
        assert_eq!(config.targets[0].name, "example");
    }

    #[test]
    fn refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tether.json");
        fs::write(&path, "{}").unwrap();
        assert!(init_command(&path).is_err());
    }
}

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use jsonc_to_json::jsonc_to_json;
use serde::{de::DeserializeOwned, Serialize};

use super::{Error, Result};

pub trait Config: Serialize + DeserializeOwned + Default {
    const NAME: &'static str;
    const NOTE: &'static str = "";

    fn path() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| Error::config(Self::NAME, "no config directory on this platform"))?;
        Ok(dir
            .join(env!("CARGO_PKG_NAME"))
            .join(format!("{}.jsonc", Self::NAME)))
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        let body = serde_json::to_string_pretty(self).map_err(|e| Error::config(path, e))?;
        let ser = if Self::NOTE.is_empty() {
            body
        } else {
            format!(
                "{}\n\n{body}",
                Self::NOTE
                    .lines()
                    .map(|line| format!("// {line}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            )
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::config(path, e))?;
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| Error::config(path, e))?;

        file.write_all(ser.as_bytes())
            .map_err(|e| Error::config(path, e))
    }

    fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    /// Reads `path`, writing defaults if it is missing. An unparsable file is
    /// moved aside as `<NAME>-<unix secs>` and replaced with defaults.
    fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| Error::config(path, e))?;
            let json = jsonc_to_json(&content);
            match serde_json::from_str(&json) {
                Ok(val) => return Ok(val),
                Err(e) => {
                    let secs = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .map(|d| d.as_secs())
                        .unwrap_or_default();
                    let aside = path.with_file_name(format!("{}-{secs}", Self::NAME));
                    tracing::warn!(
                        path = %path.display(),
                        aside = %aside.display(),
                        error = %e,
                        "config unreadable, replacing with defaults"
                    );
                    fs::rename(path, &aside).map_err(|e| Error::config(path, e))?;
                }
            }
        }

        let out = Self::default();
        out.save_to(path)?;
        Ok(out)
    }

    fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }
}

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Every variable has a default; startup fails only on values that do not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Root of the `source/` and `pdf/` directories.
    pub storage_root: PathBuf,
    pub latex: LatexConfig,
    /// Pre-built CV published on an empty store at startup.
    pub static_cv_pdf: Option<PathBuf>,
    /// Allowed CORS origin. Permissive when unset.
    pub frontend_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LatexConfig {
    pub program: String,
    pub extra_args: Vec<String>,
    pub passes: u32,
    pub timeout: Duration,
}

impl Default for LatexConfig {
    fn default() -> Self {
        Self {
            program: "pdflatex".to_string(),
            extra_args: Vec::new(),
            passes: 2,
            timeout: Duration::from_secs(60),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let passes: u32 = parse_or("LATEX_PASSES", optional_env("LATEX_PASSES"), 2)?;
        if passes == 0 {
            bail!("LATEX_PASSES must be at least 1");
        }

        Ok(Config {
            port: parse_or("PORT", optional_env("PORT"), 8080)?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            storage_root: optional_env("CV_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./storage/cv")),
            latex: LatexConfig {
                program: optional_env("LATEX_BIN").unwrap_or_else(|| "pdflatex".to_string()),
                extra_args: optional_env("LATEX_EXTRA_ARGS")
                    .map(|raw| split_args(&raw))
                    .unwrap_or_default(),
                passes,
                timeout: Duration::from_secs(parse_or(
                    "LATEX_TIMEOUT_SECS",
                    optional_env("LATEX_TIMEOUT_SECS"),
                    60,
                )?),
            },
            static_cv_pdf: optional_env("CV_STATIC_PDF").map(PathBuf::from),
            frontend_url: optional_env("FRONTEND_URL"),
        })
    }
}

/// Reads a variable, treating empty values as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has invalid value '{value}'")),
        None => Ok(default),
    }
}

fn split_args(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_uses_default_when_unset() {
        let port: u16 = parse_or("PORT", None, 8080).unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn test_parse_or_reads_value() {
        let secs: u64 = parse_or("LATEX_TIMEOUT_SECS", Some(" 15 ".to_string()), 60).unwrap();
        assert_eq!(secs, 15);
    }

    #[test]
    fn test_parse_or_rejects_garbage() {
        let err = parse_or::<u16>("PORT", Some("eighty".to_string()), 8080).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_split_args() {
        assert_eq!(
            split_args("  -halt-on-error   -file-line-error "),
            vec!["-halt-on-error", "-file-line-error"]
        );
        assert!(split_args("   ").is_empty());
    }
}

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub metadata_table: String,
    pub detail_table: String,
    /// Always present in Lambda mode.
    pub region: Option<String>,
    pub local: bool,
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Flashcard CSV ingestion pipeline")]
pub struct Args {
    /// Serve the local HTTP stand-in instead of the Lambda runtime
    #[arg(long)]
    pub local: bool,

    /// Certificate metadata table (overrides METADATA_TABLE_NAME)
    #[arg(long)]
    pub metadata_table: Option<String>,

    /// Section detail table (overrides DETAIL_TABLE_NAME)
    #[arg(long)]
    pub detail_table: Option<String>,

    /// AWS region (overrides AWS_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Host to bind to in local mode (overrides FLASHCARDS_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to in local mode (overrides FLASHCARDS_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where uploaded objects are stored (overrides FLASHCARDS_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// SQLite database URL (overrides FLASHCARDS_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::resolve(Args::parse(), |name| env::var(name))
    }

    fn resolve<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let var = |name: &str| -> Result<Option<String>> {
            match lookup(name) {
                Ok(value) if value.trim().is_empty() => Ok(None),
                Ok(value) => Ok(Some(value)),
                Err(env::VarError::NotPresent) => Ok(None),
                Err(err) => Err(err).with_context(|| format!("reading {name}")),
            }
        };

        let metadata_table = match args.metadata_table {
            Some(name) => name,
            None => var("METADATA_TABLE_NAME")?.context("METADATA_TABLE_NAME is not set")?,
        };
        let detail_table = match args.detail_table {
            Some(name) => name,
            None => var("DETAIL_TABLE_NAME")?.context("DETAIL_TABLE_NAME is not set")?,
        };

        let region = match args.region {
            Some(region) => Some(region),
            None => var("AWS_REGION")?,
        };
        if !args.local && region.is_none() {
            bail!("AWS_REGION is not set");
        }

        // --- Local-mode settings, env fallback ---
        let port = match (args.port, var("FLASHCARDS_PORT")?) {
            (Some(port), _) => port,
            (None, Some(value)) => value
                .parse::<u16>()
                .with_context(|| format!("parsing FLASHCARDS_PORT value `{}`", value))?,
            (None, None) => 3000,
        };
        let host = match args.host {
            Some(host) => host,
            None => var("FLASHCARDS_HOST")?.unwrap_or_else(|| "0.0.0.0".into()),
        };
        let storage_dir = match args.storage_dir {
            Some(dir) => dir,
            None => var("FLASHCARDS_STORAGE_DIR")?.unwrap_or_else(|| "./data/objects".into()),
        };
        let database_url = match args.database_url {
            Some(url) => url,
            None => var("FLASHCARDS_DATABASE_URL")?
                .unwrap_or_else(|| "sqlite://./data/meta/flashcards.db".into()),
        };

        // SQLite table names end up inside statements.
        if args.local {
            ensure_identifier("metadata table", &metadata_table)?;
            ensure_identifier("detail table", &detail_table)?;
        }

        Ok(Self {
            metadata_table,
            detail_table,
            region,
            local: args.local,
            host,
            port,
            storage_dir,
            database_url,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn ensure_identifier(what: &str, name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if !valid {
        bail!("{what} name `{name}` must contain only letters, digits, `_` and `-`");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(argv: &[&str], vars: &[(&str, &str)]) -> Result<AppConfig> {
        let args = Args::try_parse_from(std::iter::once("flashcard-ingest").chain(argv.iter().copied()))
            .unwrap();
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::resolve(args, |name| {
            vars.get(name).cloned().ok_or(env::VarError::NotPresent)
        })
    }

    const TABLES: [(&str, &str); 2] = [
        ("METADATA_TABLE_NAME", "certificates"),
        ("DETAIL_TABLE_NAME", "sections"),
    ];

    #[test]
    fn lambda_mode_reads_tables_and_region() {
        let mut vars = TABLES.to_vec();
        vars.push(("AWS_REGION", "eu-west-1"));
        let cfg = resolve(&[], &vars).unwrap();
        assert!(!cfg.local);
        assert_eq!(cfg.metadata_table, "certificates");
        assert_eq!(cfg.detail_table, "sections");
        assert_eq!(cfg.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn lambda_mode_requires_region() {
        let err = resolve(&[], &TABLES).unwrap_err();
        assert!(err.to_string().contains("AWS_REGION"));
    }

    #[test]
    fn missing_table_names_fail() {
        let err = resolve(&["--local"], &[("DETAIL_TABLE_NAME", "sections")]).unwrap_err();
        assert!(err.to_string().contains("METADATA_TABLE_NAME"));

        let err = resolve(&["--local"], &[("METADATA_TABLE_NAME", "certificates")]).unwrap_err();
        assert!(err.to_string().contains("DETAIL_TABLE_NAME"));
    }

    #[test]
    fn local_mode_defaults() {
        let cfg = resolve(&["--local"], &TABLES).unwrap();
        assert!(cfg.local);
        assert_eq!(cfg.region, None);
        assert_eq!(cfg.addr(), "0.0.0.0:3000");
        assert_eq!(cfg.storage_dir, "./data/objects");
        assert_eq!(cfg.database_url, "sqlite://./data/meta/flashcards.db");
    }

    #[test]
    fn flags_override_environment() {
        let mut vars = TABLES.to_vec();
        vars.push(("FLASHCARDS_PORT", "8080"));
        vars.push(("FLASHCARDS_HOST", "127.0.0.1"));
        let cfg = resolve(
            &["--local", "--port", "9000", "--metadata-table", "certs_v2"],
            &vars,
        )
        .unwrap();
        assert_eq!(cfg.addr(), "127.0.0.1:9000");
        assert_eq!(cfg.metadata_table, "certs_v2");
    }

    #[test]
    fn bad_port_names_variable() {
        let mut vars = TABLES.to_vec();
        vars.push(("FLASHCARDS_PORT", "eighty"));
        let err = resolve(&["--local"], &vars).unwrap_err();
        assert!(err.to_string().contains("FLASHCARDS_PORT"));
    }

    #[test]
    fn local_mode_rejects_unsafe_table_names() {
        let vars = [
            ("METADATA_TABLE_NAME", "certs\"; DROP TABLE x"),
            ("DETAIL_TABLE_NAME", "sections"),
        ];
        assert!(resolve(&["--local"], &vars).is_err());
    }
}

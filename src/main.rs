use anyhow::Context;
use clap::Parser;
use content_query_rust::config::AppConfig;
use content_query_rust::{seed, QueryParams, QueryPlanner, SchemaRegistry};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "content-query", version, about = "Resolve query parameters into a query plan")]
struct Cli {
    /// Schema the query targets, e.g. api::article.article
    #[arg(value_name = "SCHEMA_ID")]
    schema_id: String,

    /// JSON file holding the query parameters; `-` reads stdin
    #[arg(value_name = "PARAMS")]
    params: Option<PathBuf>,
}

impl Cli {
    fn read_params(&self) -> anyhow::Result<QueryParams> {
        let raw = match &self.params {
            None => return Ok(QueryParams::default()),
            Some(path) if path.as_os_str() == "-" => {
                let mut buffer = String::new();
                std::io::stdin().read_to_string(&mut buffer)?;
                buffer
            }
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read query parameters from {}", path.display()))?,
        };
        serde_json::from_str(&raw).context("Query parameters must be a JSON object")
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = AppConfig::load()?;

    let registry = match &config.registry.path {
        Some(path) => SchemaRegistry::load_from_path(path)
            .with_context(|| format!("Failed to load schema registry from {}", path))?,
        None => {
            log::info!("No registry path configured, using the demo schemas");
            seed::demo_registry().context("Demo schemas failed validation")?
        }
    };

    let params = cli.read_params()?;
    let planner = QueryPlanner::new(&registry, config.limits);
    match planner.plan(&cli.schema_id, &params) {
        Ok(plan) => {
            println!("{}", serde_json::to_string_pretty(&plan)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", serde_json::to_string_pretty(&e)?);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_arguments() {
        let cli = Cli::try_parse_from(["content-query", "api::article.article"]).unwrap();
        assert_eq!(cli.schema_id, "api::article.article");
        assert_eq!(cli.read_params().unwrap(), QueryParams::default());

        let cli = Cli::try_parse_from(["content-query", "api::article.article", "-"]).unwrap();
        assert_eq!(cli.params, Some(PathBuf::from("-")));

        assert!(Cli::try_parse_from(["content-query"]).is_err());
    }
}

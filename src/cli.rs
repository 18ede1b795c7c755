//! Command-line interface definitions.
//!
//! One invocation is one pipeline run. Flags override values from the
//! optional YAML config file; most can also come from the environment.

use crate::config::PipelineConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// How headlines are acquired from the target page.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyKind {
    /// Plain HTTP GET and HTML parse
    Static,
    /// Headless Chromium, for script-populated pages
    Rendered,
}

/// Scrape the latest headlines and rank the people, places, and things they mention.
///
/// # Examples
///
/// ```sh
/// # Static scrape of the default page
/// headline_entities
///
/// # Rendered scrape with a JSON report
/// headline_entities --strategy rendered -j ./reports
///
/// # Custom config and gazetteer
/// headline_entities -c ./config.yaml -g ./gazetteer.yaml -n 20
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Acquisition strategy
    #[arg(short, long, value_enum, env = "HEADLINE_STRATEGY", default_value_t = StrategyKind::Static)]
    pub strategy: StrategyKind,

    /// Page to scrape (overrides config)
    #[arg(short = 'u', long)]
    pub target_url: Option<String>,

    /// Optional path to config.yaml file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Directory to write the JSON report into
    #[arg(short, long)]
    pub json_output_dir: Option<String>,

    /// Gazetteer YAML for the default tagger (overrides config)
    #[arg(short, long)]
    pub gazetteer: Option<PathBuf>,

    /// Entries shown per entity bucket (overrides config)
    #[arg(short = 'n', long)]
    pub top_n: Option<usize>,

    /// Chromium binary for the rendered strategy (overrides config)
    #[arg(long, env = "CHROME_EXECUTABLE")]
    pub chrome_executable: Option<PathBuf>,

    /// awful_aj config.yaml; switches tagging to the LLM tagger
    #[cfg(feature = "llm")]
    #[arg(long, env = "LLM_CONFIG")]
    pub llm_config: Option<String>,

    /// awful_aj template used by the LLM tagger
    #[cfg(feature = "llm")]
    #[arg(long, default_value = "entity_tagger")]
    pub llm_template: String,
}

impl Cli {
    /// Overwrite `config` with every flag that was given.
    pub fn apply_to(&self, config: &mut PipelineConfig) {
        if let Some(url) = &self.target_url {
            config.target_url = url.clone();
        }
        if let Some(path) = &self.gazetteer {
            config.gazetteer_path = Some(path.clone());
        }
        if let Some(n) = self.top_n {
            config.top_n = n;
        }
        if let Some(path) = &self.chrome_executable {
            config.rendered.chrome_executable = Some(path.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["headline_entities"]);

        assert_eq!(cli.strategy, StrategyKind::Static);
        assert!(cli.target_url.is_none());
        assert!(cli.json_output_dir.is_none());
        assert!(cli.top_n.is_none());
    }

    #[test]
    fn test_cli_long_flags() {
        let cli = Cli::parse_from([
            "headline_entities",
            "--strategy",
            "rendered",
            "--target-url",
            "https://example.com/news",
            "--json-output-dir",
            "./json",
            "--top-n",
            "5",
        ]);

        assert_eq!(cli.strategy, StrategyKind::Rendered);
        assert_eq!(cli.target_url.as_deref(), Some("https://example.com/news"));
        assert_eq!(cli.json_output_dir.as_deref(), Some("./json"));
        assert_eq!(cli.top_n, Some(5));
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "headline_entities",
            "-s",
            "static",
            "-c",
            "/etc/headlines.yaml",
            "-g",
            "/tmp/gazetteer.yaml",
            "-n",
            "3",
        ]);

        assert_eq!(cli.config.as_deref(), Some("/etc/headlines.yaml"));
        assert_eq!(cli.gazetteer, Some(PathBuf::from("/tmp/gazetteer.yaml")));
        assert_eq!(cli.top_n, Some(3));
    }

    #[test]
    fn test_apply_to_overrides_only_given_flags() {
        let cli = Cli::parse_from([
            "headline_entities",
            "-u",
            "https://example.com/news",
            "-n",
            "4",
        ]);
        let mut config = PipelineConfig::default();
        config.rendered.settle_secs = 9;
        cli.apply_to(&mut config);

        assert_eq!(config.target_url, "https://example.com/news");
        assert_eq!(config.top_n, 4);
        assert_eq!(config.rendered.settle_secs, 9);
        assert!(config.gazetteer_path.is_none());
    }

    #[test]
    fn test_cli_rejects_unknown_strategy() {
        assert!(Cli::try_parse_from(["headline_entities", "--strategy", "crawl"]).is_err());
    }
}

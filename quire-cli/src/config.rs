use anyhow::Result;
use clap::ArgMatches;
use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete configuration that merges CLI args, env vars, config files, and defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct QuireConfig {
    /// Where things live and how the dev server runs
    #[serde(default)]
    pub project: ProjectConfig,
    /// Site and build settings (from quire-core)
    #[serde(flatten)]
    pub core: quire_core::Config,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Directory holding one directory per site
    pub content: String,
    /// Site to build, named after its domain
    pub site: String,
    /// Output directory for generated site
    pub output: String,
    /// Theme directory
    pub theme: String,
    /// Configuration file path
    pub config: String,
    /// Host for dev server
    pub host: String,
    /// Port for dev server
    pub port: u16,
    /// Open browser automatically
    pub open: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            content: "./content".to_string(),
            site: String::new(),
            output: "./public".to_string(),
            theme: "./theme".to_string(),
            config: quire_core::config::CONFIG_FILE.to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            open: false,
        }
    }
}

impl QuireConfig {
    /// Load configuration with cascading precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables (QUIRE_*)
    /// 3. Configuration file
    /// 4. Defaults (lowest priority)
    pub fn load(args: &ArgMatches) -> Result<Self> {
        let config_file = string_arg(args, "config")
            .unwrap_or_else(|| quire_core::config::CONFIG_FILE.to_string());

        let mut builder = ConfigBuilder::builder();

        // 1. Start with defaults
        let defaults = Self::default();
        builder = builder.add_source(ConfigBuilder::try_from(&defaults)?);

        // 2. Add configuration file if it exists
        if Path::new(&config_file).is_file() {
            builder = builder.add_source(File::from(Path::new(&config_file)));
        }

        // 3. Add environment variables with QUIRE_ prefix
        builder = builder.add_source(
            Environment::with_prefix("QUIRE")
                .prefix_separator("_")
                .separator("__") // Use double underscore for nested keys
                .try_parsing(true),
        );

        // 4. Override with CLI arguments (highest priority)
        builder = builder.set_override("project.config", config_file.clone())?;
        for (arg, key) in [
            ("content", "project.content"),
            ("site", "project.site"),
            ("output", "project.output"),
            ("theme", "project.theme"),
            ("host", "project.host"),
            ("url-format", "build.url_format"),
            ("engine", "build.engine"),
        ] {
            if let Some(value) = string_arg(args, arg) {
                builder = builder.set_override(key, value)?;
            }
        }
        if let Some(port) = args.try_get_one::<u16>("port").ok().flatten() {
            builder = builder.set_override("project.port", i64::from(*port))?;
        }
        for (flag, key) in [
            ("open", "project.open"),
            ("minify", "build.minify"),
            ("prettify", "build.prettify"),
            ("relative-links", "build.relative_links"),
        ] {
            if flag_set(args, flag) {
                builder = builder.set_override(key, true)?;
            }
        }

        let config = builder.build()?;
        let quire_config: QuireConfig = config.try_deserialize()?;

        Ok(quire_config)
    }

    pub fn project(&self) -> &ProjectConfig {
        &self.project
    }

    /// Everything quire-core needs for one build run.
    pub fn build_options(&self) -> Result<quire_core::BuildOptions> {
        let project = &self.project;
        if project.site.trim().is_empty() {
            anyhow::bail!(
                "No site given. Pass --site <DOMAIN>, set QUIRE_PROJECT__SITE, or add `site` under [project] in {}",
                project.config
            );
        }

        Ok(quire_core::BuildOptions::new(&project.content, &project.site)
            .theme_dir(&project.theme)
            .output_dir(&project.output)
            .config(self.core.clone()))
    }

    /// Paths whose changes should trigger a rebuild.
    pub fn watched_paths(&self) -> Vec<PathBuf> {
        let project = &self.project;
        vec![
            PathBuf::from(&project.content).join(&project.site),
            PathBuf::from(&project.theme),
            PathBuf::from(&project.config),
        ]
    }
}

/// Arguments not defined for the running subcommand read as absent.
fn string_arg(args: &ArgMatches, name: &str) -> Option<String> {
    args.try_get_one::<String>(name).ok().flatten().cloned()
}

fn flag_set(args: &ArgMatches, name: &str) -> bool {
    args.try_get_one::<bool>(name)
        .ok()
        .flatten()
        .copied()
        .unwrap_or(false)
}

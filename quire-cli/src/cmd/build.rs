use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use quire_core::build_site;

use crate::config::QuireConfig;

pub fn add_build_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("content")
                .long("content")
                .value_name("DIR")
                .help("Directory holding one directory of exported content per site"),
        )
        .arg(
            Arg::new("site")
                .short('s')
                .long("site")
                .value_name("DOMAIN")
                .help("Site to build, named after its domain"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Output directory for generated site"),
        )
        .arg(
            Arg::new("theme")
                .short('t')
                .long("theme")
                .value_name("DIR")
                .help("Theme directory"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file [default: ./quire.toml]"),
        )
        .arg(
            Arg::new("url-format")
                .long("url-format")
                .value_name("FORMAT")
                .value_parser(["date", "slug"])
                .help("Addressing for posts"),
        )
        .arg(
            Arg::new("engine")
                .long("engine")
                .value_name("ENGINE")
                .value_parser(["tera", "minijinja"])
                .help("Template engine used for the theme"),
        )
        .arg(
            Arg::new("minify")
                .long("minify")
                .help("Minify HTML, CSS and JS output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("prettify")
                .long("prettify")
                .help("Tidy HTML output (ignored when minifying)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("relative-links")
                .long("relative-links")
                .help("Rewrite links to the site's own domain as root-relative")
                .action(ArgAction::SetTrue),
        )
}

pub fn make_subcommand() -> Command {
    add_build_args(Command::new("build")).about("Build the static site from exported content")
}

pub fn execute(args: &ArgMatches) -> Result<()> {
    // Load cascading configuration
    let config = QuireConfig::load(args)?;
    let options = config.build_options()?;

    let summary = build_site(&options)?;

    log::info!(
        "Site built in {} ({} documents, {} skipped)",
        options.output_dir.display(),
        summary.written,
        summary.skipped
    );

    Ok(())
}

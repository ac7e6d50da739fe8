// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;

use anyhow::{Context, Result};
use catalog_app::{CellFormat, ProductQuery, ProductsController, ProductsService};
use catalog_tui::StatusNotifier;
use config::Config;
use std::env;
use std::path::PathBuf;
use tracing::info;

const DEMO_SEED: u64 = 42;
const DEMO_PRODUCTS: usize = 57;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `catalog-admin --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;
    let include_deleted = options.include_deleted || config.include_deleted();
    let log_path = config.log_path()?;

    if options.demo {
        let catalog = catalog_testkit::demo_catalog(DEMO_SEED, DEMO_PRODUCTS);
        if options.check_only {
            return Ok(());
        }
        logging::init(&log_path, config.log_level())?;
        info!(products = DEMO_PRODUCTS, "starting with in-memory demo catalog");
        return launch(catalog, &config, include_deleted);
    }

    let client = catalog_api::Client::new(&config.api_base_url(), config.api_timeout()?)
        .with_context(|| {
            format!(
                "invalid [api] config in {}; fix base_url/timeout values",
                options.config_path.display()
            )
        })?;
    if options.check_only {
        let query = ProductQuery {
            include_deleted,
            page: 1,
            page_size: config.page_size(),
        };
        client
            .fetch_products(&query)
            .context("fetch first product page")?;
        return Ok(());
    }

    logging::init(&log_path, config.log_level())?;
    info!(base_url = client.base_url(), "starting catalog admin");
    launch(client, &config, include_deleted)
}

fn launch<S: ProductsService>(service: S, config: &Config, include_deleted: bool) -> Result<()> {
    let mut controller = ProductsController::new(
        service,
        StatusNotifier::new(),
        include_deleted,
        config.page_size(),
    );
    let format = CellFormat {
        currency_symbol: config.currency_symbol().to_owned(),
    };
    catalog_tui::run_app(&mut controller, format)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    include_deleted: bool,
    demo: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example: false,
        include_deleted: false,
        demo: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--include-deleted" => {
                options.include_deleted = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("catalog-admin");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --include-deleted        Start with trashed products shown");
    println!("  --demo                   Launch against an in-memory demo catalog");
    println!("  --check                  Validate config and fetch the first page, then exit");
    println!("  --help                   Show this help");
}

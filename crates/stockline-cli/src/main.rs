// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use config::{Backend, Config};
use runtime::{HttpRuntime, Navigator, StoreRuntime};
use std::env;
use std::path::PathBuf;
use stockline_app::{OpportunityId, TableController};
use stockline_client::Client;
use stockline_db::Store;
use tracing::{info, warn};

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
            "load config {}; run `stockline --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let db_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        config.db_path()?
    };
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    let log_path = logging::init_tracing(&config)?;
    let backend = if options.demo {
        Backend::Sqlite
    } else {
        config.backend()
    };
    info!(
        config = %options.config_path.display(),
        log = %log_path.display(),
        ?backend,
        "starting stockline"
    );

    let profile = options
        .profile
        .as_deref()
        .or_else(|| config.session_profile());
    let requested_opportunity = options
        .opportunity
        .as_deref()
        .or_else(|| config.session_opportunity())
        .map(OpportunityId::new);
    let navigator = Navigator::from_config(&config);

    match backend {
        Backend::Sqlite => {
            let store = Store::open(&db_path).with_context(|| {
                format!(
                    "open database {} -- if this path is wrong, set [storage].db_path or STOCKLINE_DB_PATH",
                    db_path.display()
                )
            })?;
            store.bootstrap()?;
            let seeded = if options.demo {
                Some(store.seed_demo_data()?)
            } else {
                None
            };

            if let Some(profile) = profile {
                store.set_session_profile(profile)?;
            }

            let opportunity_id = match requested_opportunity.or(seeded) {
                Some(id) => id,
                None => only_opportunity(&store)?,
            };
            if store.get_opportunity(&opportunity_id)?.is_none() {
                bail!(
                    "opportunity {opportunity_id} not found in {}; pass --opportunity with an existing id",
                    db_path.display()
                );
            }
            if options.check_only {
                return Ok(());
            }

            let mut controller = TableController::new(opportunity_id, config.labels().clone());
            let mut runtime = StoreRuntime::new(&store, navigator);
            stockline_tui::run_app(&mut controller, &mut runtime)
        }
        Backend::Http => {
            let client = Client::new(config.service_base_url(), config.service_timeout()?)
                .with_context(|| {
                    format!(
                        "invalid [service] config in {}; fix base_url/timeout values",
                        options.config_path.display()
                    )
                })?;
            if profile.is_some() {
                warn!("ignoring profile selection; the http service decides the caller");
            }
            let opportunity_id = requested_opportunity.ok_or_else(|| {
                anyhow!(
                    "no opportunity selected; pass --opportunity <id> or set [session].opportunity"
                )
            })?;
            if opportunity_id.is_blank() {
                bail!("opportunity id must not be blank");
            }
            if options.check_only {
                return Ok(());
            }

            let mut controller = TableController::new(opportunity_id, config.labels().clone());
            let mut runtime = HttpRuntime::new(client, navigator);
            stockline_tui::run_app(&mut controller, &mut runtime)
        }
    }
}

fn only_opportunity(store: &Store) -> Result<OpportunityId> {
    let opportunities = store.list_opportunities()?;
    match opportunities.as_slice() {
        [only] => Ok(only.id.clone()),
        [] => bail!(
            "database has no opportunities; run `stockline --demo` to try the table with sample data"
        ),
        many => {
            let ids = many
                .iter()
                .map(|opportunity| format!("{} ({})", opportunity.id, opportunity.name))
                .collect::<Vec<_>>()
                .join(", ");
            bail!("several opportunities found; pass --opportunity with one of: {ids}")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    opportunity: Option<String>,
    profile: Option<String>,
    print_config_path: bool,
    print_db_path: bool,
    demo: bool,
    print_example: bool,
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
        opportunity: None,
        profile: None,
        print_config_path: false,
        print_db_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--opportunity" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--opportunity requires a record id"))?;
                options.opportunity = Some(value.as_ref().trim().to_owned());
            }
            "--profile" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--profile requires a profile name"))?;
                options.profile = Some(value.as_ref().to_owned());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_db_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
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
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("stockline");
    println!("  --config <path>          Use a specific config path");
    println!("  --opportunity <id>       Show the line items of this opportunity");
    println!("  --profile <name>         Act as this profile (sqlite backend)");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Launch with seeded demo data (in-memory)");
    println!("  --check                  Validate config + backend + opportunity, then exit");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, only_opportunity, parse_cli_args};
    use anyhow::Result;
    use std::path::PathBuf;
    use stockline_db::{NewOpportunity, Store};

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/stockline-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                opportunity: None,
                profile: None,
                print_config_path: false,
                print_db_path: false,
                demo: false,
                print_example: false,
                check_only: false,
                show_help: false,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_override() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_reads_opportunity_and_profile() -> Result<()> {
        let options = parse_cli_args(
            vec!["--opportunity", " 006000000000000001 ", "--profile", "Commercial"],
            default_options_path(),
        )?;
        assert_eq!(options.opportunity.as_deref(), Some("006000000000000001"));
        assert_eq!(options.profile.as_deref(), Some("Commercial"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_values() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));

        let error = parse_cli_args(vec!["--opportunity"], default_options_path())
            .expect_err("missing opportunity value should fail");
        assert!(error.to_string().contains("--opportunity requires a record id"));

        let error = parse_cli_args(vec!["--profile"], default_options_path())
            .expect_err("missing profile value should fail");
        assert!(error.to_string().contains("--profile requires a profile name"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_print_and_check_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-config-path", "--print-example-config", "--check"],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(!options.print_db_path);
        assert!(!options.demo);
        assert!(options.print_example);
        assert!(options.check_only);
        assert!(!options.show_help);
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_demo_and_db_path_print_flags() -> Result<()> {
        let options = parse_cli_args(vec!["--demo", "--print-path"], default_options_path())?;
        assert!(!options.print_config_path);
        assert!(options.print_db_path);
        assert!(options.demo);
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_help_flag_for_long_and_short_variants() -> Result<()> {
        let long = parse_cli_args(vec!["--help"], default_options_path())?;
        assert!(long.show_help);

        let short = parse_cli_args(vec!["-h"], default_options_path())?;
        assert!(short.show_help);
        Ok(())
    }

    #[test]
    fn only_opportunity_requires_exactly_one() -> Result<()> {
        let store = Store::open_memory()?;
        store.bootstrap()?;

        let error = only_opportunity(&store).expect_err("empty database should fail");
        assert!(error.to_string().contains("--demo"));

        let first = store.create_opportunity(&NewOpportunity {
            name: "Warehouse refit".to_owned(),
            account_name: "Northwind".to_owned(),
        })?;
        assert_eq!(only_opportunity(&store)?, first);

        store.create_opportunity(&NewOpportunity {
            name: "Spring promo".to_owned(),
            account_name: "Contoso".to_owned(),
        })?;
        let error = only_opportunity(&store).expect_err("two opportunities should fail");
        let message = error.to_string();
        assert!(message.contains("--opportunity"));
        assert!(message.contains("Warehouse refit"));
        Ok(())
    }
}

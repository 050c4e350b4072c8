use std::sync::Arc;

use clap::Parser;
use blackbox::api::ConfigApi;
use blackbox::archive::Archive;
use blackbox::cli::{Cli, Command};
use blackbox::config::{self, Config};
use blackbox::ledger::SqliteLedger;
use blackbox::report;
use blackbox::scan::Scanner;
use blackbox::{logging, scheduler, Result};

fn open_ledger(config: &Config) -> Result<Arc<SqliteLedger>> {
    Ok(Arc::new(SqliteLedger::open(&config.database, config.pool_size)?))
}

fn open_api(config: &Config) -> Result<ConfigApi> {
    let ledger = open_ledger(config)?;
    Ok(ConfigApi::new(ledger, Archive::new(&config.archive_dir)))
}

fn run_daemon(config: &Config, interval: Option<&str>) -> Result<()> {
    let mut config = config.clone();
    if let Some(value) = interval {
        config.interval = config::parse_duration("interval", value)?;
        config.validate()?;
    }
    let config = &config;
    let every = config.interval;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| blackbox::Error::Task(format!("failed to start runtime: {e}")))?;

    runtime.block_on(async {
        let database = config.database.clone();
        let pool_size = config.pool_size;
        let ledger = scheduler::wait_for_store(
            || SqliteLedger::open(&database, pool_size),
            config.startup_attempts,
            config.startup_delay,
        )
        .await?;

        let scanner = Arc::new(Scanner::new(config, Arc::new(ledger)));
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        };

        scheduler::run(scanner, every, shutdown).await
    })
}

fn execute(cli: Cli, config: &Config) -> Result<()> {
    // before any ledger is opened, so bad input never touches the store
    cli.command.check_ids()?;

    match cli.command {
        Command::Run(args) => run_daemon(config, args.interval.as_deref()),
        Command::Scan(args) => {
            let scanner = Scanner::new(config, open_ledger(config)?);
            let result = scanner.run_cycle()?;
            report::print_cycle(&result, args.json, config.verbose);
            Ok(())
        }
        Command::Devices(args) => {
            let api = open_api(config)?;
            match args.id {
                Some(id) => {
                    let device = api.device(&id)?;
                    if args.json {
                        println!("{}", report::json::render(&device));
                    } else {
                        print!("{}", report::table::devices(std::slice::from_ref(&device)));
                    }
                }
                None => {
                    let devices = api.list_devices()?;
                    if args.json {
                        println!("{}", report::json::render(&devices));
                    } else {
                        print!("{}", report::table::devices(&devices));
                    }
                }
            }
            Ok(())
        }
        Command::Versions(args) => {
            let api = open_api(config)?;
            let versions = match args.device {
                Some(device) => api.device_versions(&device)?,
                None => api.list_versions()?,
            };
            if args.json {
                println!("{}", report::json::render(&versions));
            } else {
                print!("{}", report::table::versions(&versions));
            }
            Ok(())
        }
        Command::Show(args) => {
            let content = open_api(config)?.version_content(&args.id)?;
            print!("{content}");
            Ok(())
        }
        Command::Diff(args) => {
            let result = open_api(config)?.version_diff(&args.from, &args.to)?;
            if args.json {
                println!("{}", report::json::render(&result));
            } else {
                print!("{}", report::table::diff(&result));
            }
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).and_then(|mut config| {
        config.apply_args(&cli.paths, cli.verbose);
        config.validate()?;
        Ok(config)
    });

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    };

    logging::init(config.verbose);

    if let Err(e) = execute(cli, &config) {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

mod cli;
mod output;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use log::{debug, info, LevelFilter};

use appshelf::app::{AppOrigin, ApplicationRecord};
use appshelf::catalog::{CatalogCache, CatalogConfig};
use appshelf::error::CatalogError;
use appshelf::icon::ThemeIconMaterializer;
use appshelf::query::{self, FilterSpec, SortSpec};
use appshelf::service::InstalledApps;
use appshelf::source::desktop::DesktopSource;
use appshelf::state::{settled, QueryResult};

use cli::{Cli, Command};
use output::{Formatter, OutputFormat};

fn print_stats(
    records: &[ApplicationRecord],
    format: OutputFormat,
    w: &mut dyn std::io::Write,
) -> Result<()> {
    let mut counts: HashMap<AppOrigin, usize> = HashMap::new();
    for record in records {
        *counts.entry(record.origin()).or_insert(0) += 1;
    }

    if format == OutputFormat::Json {
        let stats_obj: HashMap<String, usize> = [AppOrigin::User, AppOrigin::System]
            .iter()
            .map(|o| (o.to_string(), *counts.get(o).unwrap_or(&0)))
            .collect();
        let json = serde_json::to_string_pretty(&stats_obj)?;
        writeln!(w, "{}", json)?;
    } else {
        let user = counts.get(&AppOrigin::User).copied().unwrap_or(0);
        let system = counts.get(&AppOrigin::System).copied().unwrap_or(0);
        writeln!(
            w,
            "Stats: {} user, {} system, total {}",
            user,
            system,
            user + system
        )?;
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .init();
}

fn build_cache(cli: &Cli) -> Arc<CatalogCache> {
    let source = DesktopSource::from_overrides(cli.user_dirs.clone(), cli.system_dirs.clone());
    debug!("desktop entry dirs: {:?}", source.dirs());

    let icons = if cli.icon_dirs.is_empty() {
        ThemeIconMaterializer::from_env()
    } else {
        ThemeIconMaterializer::new(cli.icon_dirs.clone())
    };

    let config = CatalogConfig {
        icon_size_px: cli.icon_size,
        self_package: cli.exclude.clone(),
    };
    Arc::new(CatalogCache::new(Arc::new(source), Arc::new(icons), config))
}

async fn list(
    service: &InstalledApps,
    filter: FilterSpec,
    sort: SortSpec,
) -> Result<Vec<ApplicationRecord>> {
    let mut rx = service.subscribe();
    service.set_query(filter, sort);
    match settled(&mut rx).await {
        Some(QueryResult::Success(records)) => Ok(records),
        Some(QueryResult::Error(message)) => bail!(message),
        Some(QueryResult::Loading) | None => bail!("query ended before producing a result"),
    }
}

async fn watch(
    service: &InstalledApps,
    formatter: &Formatter,
    filter: FilterSpec,
    sort: SortSpec,
    interval: u64,
    cycles: Option<u64>,
) -> Result<()> {
    let mut rx = service.subscribe();
    let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));
    // The first tick is immediate; the initial listing comes from set_query.
    ticker.tick().await;
    service.set_query(filter, sort);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut printed = 0u64;
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = rx.borrow_and_update().clone();
                match state {
                    Some(QueryResult::Success(records)) => {
                        formatter.format_list(&records, &mut std::io::stdout())?;
                    }
                    Some(QueryResult::Error(message)) => eprintln!("appshelf: {}", message),
                    Some(QueryResult::Loading) | None => continue,
                }
                printed += 1;
                if cycles.is_some_and(|n| printed >= n) {
                    break;
                }
            }
            _ = ticker.tick() => {
                info!("refreshing catalog");
                service.refresh();
            }
            _ = &mut ctrl_c => break,
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let formatter = Formatter::new(cli.format, cli.no_color);

    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "appshelf", &mut std::io::stdout());
        return Ok(());
    }

    let cache = build_cache(&cli);
    let service = InstalledApps::new(Arc::clone(&cache));

    match cli.command {
        Command::List { query } => {
            let records = match list(&service, query.filter.into(), query.sort.into()).await {
                Ok(records) => records,
                Err(e) => {
                    eprintln!("appshelf: {}", e);
                    std::process::exit(1);
                }
            };
            formatter.format_list(&records, &mut std::io::stdout())?;
            if cli.stats {
                print_stats(&records, cli.format, &mut std::io::stderr())?;
            }
        }
        Command::Info { package_id } => {
            let mut rx = service.subscribe_details();
            service.show_details(&package_id);
            match settled(&mut rx).await {
                Some(QueryResult::Success(record)) => {
                    formatter.format_info(&record, &mut std::io::stdout())?;
                }
                Some(QueryResult::Error(message)) => {
                    eprintln!("{}", message);
                    std::process::exit(1);
                }
                Some(QueryResult::Loading) | None => {
                    bail!("lookup of '{}' ended before producing a result", package_id)
                }
            }
        }
        Command::Search { query: text } => {
            let catalog = cache.get_all(false).await?;
            let records = query::apply(&catalog, FilterSpec::All, SortSpec::NameAsc);
            let results = query::search(&text, &records);
            formatter.format_list(&results, &mut std::io::stdout())?;
            if cli.stats {
                print_stats(&results, cli.format, &mut std::io::stderr())?;
            }
        }
        Command::Has { package_id } => match cache.get_one(&package_id).await {
            Ok(record) => {
                formatter.format_has(&record, &mut std::io::stdout())?;
            }
            Err(CatalogError::NotFound(_)) => {
                formatter.format_has_not_found(&package_id, &mut std::io::stdout())?;
                std::process::exit(1);
            }
            Err(e) => {
                eprintln!("appshelf: {}", e);
                std::process::exit(1);
            }
        },
        Command::Watch {
            query,
            interval,
            cycles,
        } => {
            watch(
                &service,
                &formatter,
                query.filter.into(),
                query.sort.into(),
                interval,
                cycles,
            )
            .await?;
        }
        Command::Completions { .. } => unreachable!("handled before the catalog is built"),
    }

    Ok(())
}

use clap::Parser;
use std::process::ExitCode;

use procure_sync::cli::{Cli, Commands, ConfigAction};
use procure_sync::commands::{
    ListOptions, ShowOptions, cmd_config_paths, cmd_config_show, cmd_list, cmd_show,
};
use procure_sync::config::Config;
use procure_sync::{Result, logging};

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Config {
        action: ConfigAction::Paths,
    } = &cli.command
    {
        return cmd_config_paths();
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    tracing::debug!("{config:?}");

    match cli.command {
        Commands::List {
            collection,
            filters,
            multi,
            sort,
            sort_cycle,
            tab,
            tab_flags,
            year,
            page_size,
            pages,
            remember,
            json,
        } => {
            cmd_list(
                &config,
                ListOptions {
                    collection,
                    filters,
                    multi,
                    sort_clicks: sort,
                    sort_cycle,
                    tab,
                    tab_flags,
                    year,
                    page_size,
                    pages,
                    remember,
                    json,
                },
            )
            .await
        }

        Commands::Show {
            collection,
            id,
            related,
            referenced,
            chained,
            json,
        } => {
            cmd_show(
                &config,
                ShowOptions {
                    collection,
                    id,
                    related,
                    referenced: referenced
                        .into_iter()
                        .map(|r| (r.name, r.collection, r.field))
                        .collect(),
                    chained: chained
                        .into_iter()
                        .map(|c| (c.name, c.after, c.collection, c.id_field))
                        .collect(),
                    json,
                },
            )
            .await
        }

        Commands::Config { action } => match action {
            ConfigAction::Show { json } => cmd_config_show(&config, json),
            ConfigAction::Paths => cmd_config_paths(),
        },
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_with(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

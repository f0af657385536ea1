mod ai_client;
mod cli;
mod config;
mod crypto;
mod errors;
mod gui;
mod online_commands;
mod report;
mod review_commands;
mod runner;
mod source_scan;
mod svn_commands;
mod svn_parse;
mod types;

use clap::Parser;
use tracing::info;

use crate::cli::{Cli, Commands};
use crate::errors::{AppError, SvnError};
use crate::online_commands::OnlineOptions;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(run_app());

    if let Err(e) = result {
        tracing::error!("Application failed: {}", e);
        let exit_code = match e {
            AppError::Svn(SvnError::CommandFailed { status_code, .. }) => {
                status_code.unwrap_or(128)
            }
            _ => 1,
        };
        std::process::exit(exit_code);
    }
}

async fn run_app() -> Result<(), AppError> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            // 无子命令时启动本地 Web 界面
            info!("No subcommand given, starting the GUI");
            gui::start(&cli.config).await
        }
        Some(Commands::Review {
            dir,
            files,
            interactive,
        }) => review_commands::handle_review(&cli.config, &dir, files.as_deref(), interactive).await,
        Some(Commands::Online {
            url,
            username,
            password,
            path,
            keyword,
            author,
            save,
        }) => {
            online_commands::handle_online(
                &cli.config,
                OnlineOptions {
                    url,
                    username,
                    password,
                    path,
                    keyword,
                    author,
                    save,
                },
            )
            .await
        }
        Some(Commands::Encrypt { api_key }) => {
            let ciphertext = crypto::encrypt_api_key(&api_key)?;
            println!("Encrypted API key (paste into ai.api_key):");
            println!("{}", ciphertext);
            Ok(())
        }
    }
}

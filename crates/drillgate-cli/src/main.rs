//! Drillgate CLI: the `drillgate` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    support::init_tracing();

    match cli.command {
        Commands::Validate {
            root,
            config,
            baseline,
            manifest_dir,
            review_snapshot,
            json,
        } => commands::validate::run(commands::validate::Args {
            root,
            config,
            baseline,
            manifest_dir,
            review_snapshot,
            json,
        }),

        Commands::Analytics { entry, json } => commands::analytics::run(entry, json),

        Commands::Promote {
            manifest_dir,
            workspace,
            content_root,
            config,
            json,
        } => commands::promote::run(commands::promote::Args {
            manifest_dir,
            workspace,
            content_root,
            config,
            json,
        }),

        Commands::Rollback {
            manifest_dir,
            workspace,
            to,
            json,
        } => commands::rollback::run(manifest_dir, workspace, to, json),

        Commands::ManifestShow {
            manifest_dir,
            workspace,
            json,
        } => commands::manifest_show::run(manifest_dir, workspace, json),
    }
}

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::archive::{self, ArchiveOptions};
use crate::commands::carrier::{self, CarrierAction, CarrierOptions};
use crate::commands::info::{self, InfoOptions};
use crate::commands::list::{self, ListOptions, ListSort};
use crate::commands::settings::{self, SettingsAction, SettingsOptions};
use crate::commands::status::{self, StatusOptions};
use crate::commands::unarchive::{self, UnarchiveOptions};
use crate::commands::undo::{self, UndoOptions};
use crate::commands::{CommandReport, ConflictPolicy, PromptOptions};

#[derive(Debug, Parser)]
#[command(name = "varc")]
#[command(version, about = "Archive and unarchive notes, folders and attachments in a markdown vault")]
#[command(propagate_version = true)]
struct Cli {
    /// Vault directory (defaults to VARC_VAULT, then the current directory)
    #[arg(long, global = true)]
    vault: Option<PathBuf>,

    /// Print the command report as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct PromptArgs {
    /// What to do when the destination is already taken
    #[arg(long, value_enum, default_value_t = ConflictPolicy::Ask)]
    on_conflict: ConflictPolicy,

    /// Recreate a missing original folder without asking
    #[arg(long)]
    create_missing: bool,

    /// Skip confirmation prompts
    #[arg(short = 'y', long)]
    yes: bool,
}

impl From<&PromptArgs> for PromptOptions {
    fn from(args: &PromptArgs) -> Self {
        Self {
            on_conflict: args.on_conflict,
            create_missing: args.create_missing,
            assume_yes: args.yes,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Move notes, folders or files into the archive folder
    Archive {
        #[arg(required = true)]
        paths: Vec<String>,
        #[command(flatten)]
        prompt: PromptArgs,
    },
    /// Move archived items back to where they came from
    Unarchive {
        #[arg(required = true)]
        paths: Vec<String>,
        #[command(flatten)]
        prompt: PromptArgs,
    },
    /// Reverse the most recent archive or unarchive while its window is open
    Undo,
    /// List archived items
    List {
        /// Fuzzy filter on the archived path
        #[arg(long)]
        filter: Option<String>,
        #[arg(long, value_enum, default_value_t = ListSort::Archived)]
        sort: ListSort,
    },
    /// Show whether a path is archived and where it came from
    Info { path: String },
    /// Inspect or rename index and sidecar files
    Carrier {
        #[command(subcommand)]
        action: CarrierCommand,
    },
    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
    /// Paths, lock and pending undo
    Status,
}

#[derive(Debug, Subcommand)]
enum CarrierCommand {
    /// List every index and sidecar file in the archive
    List,
    /// Report what a rename to NAME would collide with
    Check { name: String },
    /// Rename every carrier to NAME and save it as the new carrier name
    Rename { name: String },
}

#[derive(Debug, Subcommand)]
enum SettingsCommand {
    Show,
    Set { key: String, value: String },
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    println!("{}: {}", report.command, if report.ok { "ok" } else { "failed" });
    for detail in &report.details {
        println!("  {detail}");
    }
    for issue in &report.issues {
        println!("  ! {issue}");
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let vault = cli.vault.clone();

    let report = match &cli.command {
        Command::Archive { paths, prompt } => archive::run(&ArchiveOptions {
            vault,
            paths: paths.clone(),
            prompt: prompt.into(),
        })?,
        Command::Unarchive { paths, prompt } => unarchive::run(&UnarchiveOptions {
            vault,
            paths: paths.clone(),
            prompt: prompt.into(),
        })?,
        Command::Undo => undo::run(&UndoOptions { vault })?,
        Command::List { filter, sort } => list::run(&ListOptions {
            vault,
            filter: filter.clone(),
            sort: *sort,
        })?,
        Command::Info { path } => info::run(&InfoOptions {
            vault,
            path: path.clone(),
        })?,
        Command::Carrier { action } => {
            let action = match action {
                CarrierCommand::List => CarrierAction::List,
                CarrierCommand::Check { name } => CarrierAction::Check { name: name.clone() },
                CarrierCommand::Rename { name } => CarrierAction::Rename { name: name.clone() },
            };
            carrier::run(&CarrierOptions { vault, action })?
        }
        Command::Settings { action } => {
            let action = match action {
                SettingsCommand::Show => SettingsAction::Show,
                SettingsCommand::Set { key, value } => SettingsAction::Set {
                    key: key.clone(),
                    value: value.clone(),
                },
            };
            settings::run(&SettingsOptions { vault, action })?
        }
        Command::Status => status::run(&StatusOptions { vault })?,
    };

    print_report(&report, cli.json)?;
    if !report.ok {
        std::process::exit(1);
    }
    Ok(())
}

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "drillgate",
    about = "Drillgate: content integrity and deterministic analytics gate for learning catalogs",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate every workspace under a content root
    Validate {
        /// Content root holding one directory per workspace
        root: String,

        /// Gate configuration (TOML)
        #[arg(long)]
        config: Option<String>,

        /// Published content root to check schema stability against
        #[arg(long)]
        baseline: Option<String>,

        /// Manifest store; each workspace's active content root becomes its baseline
        #[arg(long)]
        manifest_dir: Option<String>,

        /// Review snapshot JSON with approved/pending entry ids
        #[arg(long)]
        review_snapshot: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Recompute analytics for a single entry document
    Analytics {
        /// Path to the entry JSON (pack, drill, exam, or track)
        entry: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate one workspace and make it active if the gate passes
    Promote {
        /// Manifest store directory
        #[arg(long)]
        manifest_dir: String,

        /// Workspace to promote
        #[arg(long)]
        workspace: String,

        /// Candidate content root
        #[arg(long)]
        content_root: String,

        /// Gate configuration (TOML)
        #[arg(long)]
        config: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Restore an archived manifest as the active one
    Rollback {
        /// Manifest store directory
        #[arg(long)]
        manifest_dir: String,

        /// Workspace to roll back
        #[arg(long)]
        workspace: String,

        /// Content version to restore (defaults to the previous one)
        #[arg(long)]
        to: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the active manifest and archive for a workspace
    ManifestShow {
        /// Manifest store directory
        #[arg(long)]
        manifest_dir: String,

        /// Workspace to inspect
        #[arg(long)]
        workspace: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

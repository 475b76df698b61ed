use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Save generations from the site and reconcile them with a local archive.
#[derive(Parser, Debug)]
#[command(name = "gensave", version)]
pub struct Cli {
    /// Index file path or http(s) URL (overrides GENSAVE_INDEX)
    #[arg(long, global = true)]
    pub index: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download the media and sidecar for one generation page
    Grab {
        /// Generation page URL
        url: String,

        /// Read the rendered page from a saved HTML file instead of fetching it
        #[arg(long)]
        html: Option<PathBuf>,

        /// Download even if the id is already archived
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// List index entries that are not archived yet
    Missing {
        /// Print records as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Walk the missing set, optionally downloading each entry in turn
    Harvest {
        /// Download every missing generation sequentially
        #[arg(long, default_value_t = false)]
        download: bool,
    },
    /// Inspect or change the archive folder
    Folder {
        #[command(subcommand)]
        action: FolderAction,
    },
    /// Serve the gallery API over the index and archive
    Serve {
        /// Listen address (overrides GENSAVE_API_ADDR)
        #[arg(long)]
        addr: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum FolderAction {
    /// Show the stored folder and whether it is still accessible
    Show,
    /// Grant and store a folder
    Set { path: PathBuf },
    /// Type a folder path interactively
    Pick,
    /// Forget the stored folder
    Clear,
    /// Change the preferred folder hint
    Prefer { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_grab_with_global_index() {
        let cli = Cli::try_parse_from([
            "gensave",
            "grab",
            "https://site.com/g/gen_a1",
            "--force",
            "--index",
            "index.json",
        ])
        .unwrap();
        assert_eq!(cli.index.as_deref(), Some("index.json"));
        assert!(matches!(cli.command, Command::Grab { force: true, .. }));
    }

    #[test]
    fn parses_folder_subcommands() {
        let cli = Cli::try_parse_from(["gensave", "folder", "set", "/tmp/archive"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Folder {
                action: FolderAction::Set { .. }
            }
        ));
    }
}

use clap::{Parser, Subcommand};
use kcriff::RiffConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Service endpoint used when no native binding is found
    #[arg(long, global = true)]
    pub endpoint: Option<String>,
    /// Native binding to try before the default locations
    #[arg(long, global = true)]
    pub library: Option<PathBuf>,
    /// Give up on a download after this many seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// List the models the backend knows about
    List {
        /// Only recommended models
        #[arg(long, conflicts_with = "downloaded")]
        recommended: bool,
        /// Only models already on disk
        #[arg(long)]
        downloaded: bool,
    },
    /// Download one model
    Download { name: String },
    /// Download several models at once (the recommended set when none are named)
    DownloadAll { names: Vec<String> },
    /// Remove a downloaded model
    Remove { name: String },
    /// Check for a KC-Riff update
    Updates {
        /// Install the update if one is available
        #[arg(long)]
        apply: bool,
    },
    /// Check that the backend is healthy
    Health,
}

impl Cli {
    /// Command-line flags win over the config file and environment.
    pub fn apply_to(&self, config: &mut RiffConfig) {
        if let Some(endpoint) = &self.endpoint {
            config.transport.endpoint = endpoint.clone();
        }
        if let Some(library) = &self.library {
            config.transport.library_paths.insert(0, library.clone());
        }
        if let Some(timeout) = self.timeout {
            config.downloads.timeout_secs = timeout;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "riffctl",
            "download",
            "mistral-7b",
            "--endpoint",
            "http://10.0.0.5:5000",
            "--timeout",
            "60",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Commands::Download {
                name: "mistral-7b".into()
            }
        );

        let mut config = RiffConfig::default();
        cli.apply_to(&mut config);
        assert_eq!(config.transport.endpoint, "http://10.0.0.5:5000");
        assert_eq!(config.downloads.timeout_secs, 60);
    }

    #[test]
    fn download_all_accepts_no_names() {
        let cli = Cli::try_parse_from(["riffctl", "download-all"]).unwrap();
        assert_eq!(cli.command, Commands::DownloadAll { names: vec![] });

        let cli = Cli::try_parse_from(["riffctl", "download-all", "a", "b"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::DownloadAll {
                names: vec!["a".into(), "b".into()]
            }
        );
    }

    #[test]
    fn list_filters_are_exclusive() {
        assert!(Cli::try_parse_from(["riffctl", "list", "--recommended", "--downloaded"]).is_err());
    }

    #[test]
    fn library_goes_first() {
        let cli =
            Cli::try_parse_from(["riffctl", "--library", "/opt/libkcriff.so", "health"]).unwrap();
        let mut config = RiffConfig::default();
        config.transport.library_paths.push("/usr/lib/other.so".into());
        cli.apply_to(&mut config);
        assert_eq!(
            config.transport.library_paths[0],
            PathBuf::from("/opt/libkcriff.so")
        );
    }
}

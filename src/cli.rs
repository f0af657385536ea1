use clap::{Parser, Subcommand};

/// AI-assisted code review for Subversion working copies and repositories.
#[derive(Parser, Debug)]
#[command(name = "svnie", version, about = "AI-assisted SVN code review", long_about = None)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, global = true, default_value = "config.yaml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Review uncommitted changes in a local working copy
    Review {
        /// Working copy directory
        #[arg(short = 'd', long = "dir", default_value = ".")]
        dir: String,

        /// Only review these files (comma separated paths)
        #[arg(short = 'f', long = "files")]
        files: Option<String>,

        /// Pick the files to review interactively
        #[arg(short = 'i', long = "interactive")]
        interactive: bool,
    },

    /// Review a committed revision in a remote repository
    Online {
        /// Repository URL (falls back to the config's online.url)
        #[arg(long)]
        url: Option<String>,

        /// Repository username
        #[arg(long)]
        username: Option<String>,

        /// Repository password
        #[arg(long)]
        password: Option<String>,

        /// Path inside the repository to search the log of
        #[arg(short = 'p', long = "path", default_value = "")]
        path: String,

        /// Keyword to filter log messages and authors by
        #[arg(short = 'k', long = "keyword", default_value = "")]
        keyword: String,

        /// Author to search the log for
        #[arg(short = 'a', long = "author", default_value = "")]
        author: String,

        /// Save the URL and credentials back into the config file
        #[arg(long)]
        save: bool,
    },

    /// Encrypt an API key for storing in the config file
    Encrypt {
        /// The plaintext API key
        api_key: String,
    },
}

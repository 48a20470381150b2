use std::path::PathBuf;

use clap::Parser;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_SHA"),
    ", ",
    env!("BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "radio-remote", version = VERSION)]
pub struct Args {
    /// Station list, one `name=url` or bare `url` per line
    #[arg(long)]
    pub stations: PathBuf,

    /// Optional list used for presses the sender flags as long (`long <button>`)
    #[arg(long)]
    pub long_stations: Option<PathBuf>,

    /// Tool overrides (`audioplayer=...`); defaults to config.txt next to the station list
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print status changes as JSON lines instead of plain text
    #[arg(long)]
    pub json_status: bool,

    /// Log at debug level unless RUST_LOG is set
    #[arg(long, short)]
    pub verbose: bool,
}

impl Args {
    /// Explicit `--config`, or `config.txt` beside the station list.
    pub fn config_path(&self) -> PathBuf {
        match &self.config {
            Some(path) => path.clone(),
            None => self
                .stations
                .parent()
                .map(|dir| dir.join("config.txt"))
                .unwrap_or_else(|| PathBuf::from("config.txt")),
        }
    }
}

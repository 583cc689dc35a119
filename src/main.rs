use std::path::{Path, PathBuf};

use apicache::config::Config;
use apicache::riot::{self, MatchDetail, Summoner};
use apicache::{AnyStore, DataStore, Key, Record, RecordType};
use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::{eyre::eyre, Result};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "apicache")]
#[command(about = "Inspect and seed the API object cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/apicache/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Show record counts and completeness per type
  Status,
  /// Store records from a JSON array file
  Import {
    kind: Kind,
    file: PathBuf,
    /// Mark the type complete after importing
    #[arg(long)]
    complete: bool,
  },
  /// Print stored records as JSON (null when absent)
  Get {
    kind: Kind,
    #[arg(required = true)]
    keys: Vec<String>,
  },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kind {
  Summoner,
  Match,
}

fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _guard = apicache::logging::init(&config.log)?;

  let mut store = AnyStore::from_config(&config.store, riot::schema()?)?;
  info!(backend = ?store.backend(), command = ?args.command, "starting");

  match args.command {
    Command::Status => {
      status::<Summoner>(&store)?;
      status::<MatchDetail>(&store)?;
    }
    Command::Import {
      kind,
      file,
      complete,
    } => {
      let added = match kind {
        Kind::Summoner => import::<Summoner>(&mut store, &file, complete)?,
        Kind::Match => import::<MatchDetail>(&mut store, &file, complete)?,
      };
      println!("{} new records", added);
    }
    Command::Get { kind, keys } => match kind {
      Kind::Summoner => print_records::<Summoner>(&store, &keys)?,
      Kind::Match => print_records::<MatchDetail>(&store, &keys)?,
    },
  }

  store.close()?;
  Ok(())
}

fn status<T: Record>(store: &impl DataStore) -> Result<()> {
  let complete = store.has_all::<T>()?;
  let count = store.iterate::<T>()?.count();
  println!("{:<20} records={:<8} complete={}", T::type_name(), count, complete);
  Ok(())
}

/// Returns how many records were not already stored.
fn import<T: Record>(store: &mut impl DataStore, file: &Path, complete: bool) -> Result<usize> {
  let contents = std::fs::read_to_string(file)
    .map_err(|e| eyre!("Failed to read {}: {}", file.display(), e))?;
  let records: Vec<T> = serde_json::from_str(&contents)
    .map_err(|e| eyre!("Failed to parse {}: {}", file.display(), e))?;

  let before = store.iterate::<T>()?.count();
  let keys = records.iter().map(Record::cache_key).collect();
  let complete_sets = if complete {
    vec![RecordType::of::<T>()]
  } else {
    Vec::new()
  };
  store.store_many(records, keys, &complete_sets)?;
  let added = store.iterate::<T>()?.count().saturating_sub(before);

  info!(type_name = T::type_name(), file = %file.display(), added, "imported");
  Ok(added)
}

fn print_records<T: Record>(store: &impl DataStore, keys: &[String]) -> Result<()> {
  let keys: Vec<Key> = keys
    .iter()
    .map(|k| k.parse().unwrap_or_else(|never| match never {}))
    .collect();
  for record in store.get_many::<T>(keys, T::key_field())? {
    println!("{}", serde_json::to_string_pretty(&record)?);
  }
  Ok(())
}

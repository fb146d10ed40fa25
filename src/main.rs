//! Purpose: `opencloud` CLI entry point for one-off datastore and messaging calls.
//! Role: Binary crate root; parses args, runs one command, emits JSON on stdout.
//! Invariants: Results are one JSON value per line on stdout.
//! Invariants: Errors are emitted as JSON on stderr; exit code from `api::to_exit_code`.
//! Invariants: Diagnostics go through `tracing` to stderr, filtered by `RUST_LOG`.
use clap::{Parser, Subcommand, ValueEnum};
use opencloud::api::{
    ApiResult, ClientConfig, DataStore, Error, ErrorKind, Outcome, PageCursor, SortOrder,
    Universe, to_exit_code,
};
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "opencloud",
    version,
    about = "Datastore and messaging calls against a universe",
    arg_required_else_help = true
)]
struct Cli {
    #[arg(long, env = "OPENCLOUD_API_KEY", hide_env_values = true, help = "API key")]
    api_key: String,
    #[arg(long, env = "OPENCLOUD_UNIVERSE_ID", help = "Universe id")]
    universe: u64,
    #[arg(long, env = "OPENCLOUD_BASE_URL", help = "Override the API base url")]
    base_url: Option<String>,
    #[arg(long, help = "Bypass the entry cache")]
    no_cache: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read one datastore entry.
    Get {
        #[command(flatten)]
        store: StoreArgs,
        key: String,
    },
    /// Write one datastore entry; VALUE is JSON.
    Set {
        #[command(flatten)]
        store: StoreArgs,
        key: String,
        value: String,
    },
    /// Add AMOUNT to a numeric datastore entry.
    Increment {
        #[command(flatten)]
        store: StoreArgs,
        key: String,
        #[arg(allow_negative_numbers = true)]
        amount: f64,
    },
    /// Delete one datastore entry.
    Remove {
        #[command(flatten)]
        store: StoreArgs,
        key: String,
    },
    /// List datastores, one page per line.
    ListStores {
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long, help = "Stop after this many pages")]
        pages: Option<usize>,
    },
    /// List ordered datastore entries, one page per line.
    ListOrdered {
        #[command(flatten)]
        store: StoreArgs,
        #[arg(long, value_enum, default_value = "desc")]
        order: Order,
        #[arg(long, default_value_t = 100)]
        limit: u32,
        #[arg(long)]
        filter: Option<String>,
        #[arg(long, help = "Stop after this many pages")]
        pages: Option<usize>,
    },
    /// Publish MESSAGE to TOPIC.
    Publish { topic: String, message: String },
}

#[derive(clap::Args, Debug)]
struct StoreArgs {
    #[arg(long, help = "Datastore name")]
    store: String,
    #[arg(long, default_value = "global")]
    scope: String,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Order {
    Desc,
    Asc,
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(()) => 0,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> ApiResult<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => {
            let _ = err.print();
            return Ok(());
        }
        Err(err) => {
            return Err(Error::new(ErrorKind::Validation)
                .with_message(err.kind().to_string())
                .with_source(err));
        }
    };

    let mut config = ClientConfig::new(cli.universe, cli.api_key).with_cache(!cli.no_cache);
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url)?;
    }
    let universe = Universe::from_config(config);

    match cli.command {
        Command::Get { store, key } => {
            let outcome = open_store(&universe, &store).get(&key)?;
            emit(&outcome_json(&outcome));
        }
        Command::Set { store, key, value } => {
            let value: Value = serde_json::from_str(&value).map_err(|err| {
                Error::new(ErrorKind::Validation)
                    .with_message("VALUE must be valid JSON")
                    .with_source(err)
            })?;
            let outcome = open_store(&universe, &store).set(&key, &value, None)?;
            emit(&outcome_json(&outcome));
        }
        Command::Increment { store, key, amount } => {
            let outcome = open_store(&universe, &store).increment(&key, amount)?;
            emit(&outcome_json(&outcome));
        }
        Command::Remove { store, key } => {
            let outcome = open_store(&universe, &store).remove(&key)?;
            emit(&outcome_json(&outcome));
        }
        Command::ListStores {
            prefix,
            limit,
            pages,
        } => {
            let cursor = universe.list_data_stores(prefix.as_deref(), limit)?;
            emit_pages(cursor, pages)?;
        }
        Command::ListOrdered {
            store,
            order,
            limit,
            filter,
            pages,
        } => {
            let order = match order {
                Order::Desc => SortOrder::Desc,
                Order::Asc => SortOrder::Asc,
            };
            let cursor = universe
                .ordered_data_store(store.store)
                .with_scope(store.scope)
                .list(order, limit, filter.as_deref())?;
            emit_pages(cursor, pages)?;
        }
        Command::Publish { topic, message } => {
            let outcome = universe.messaging().publish(&topic, &message)?;
            emit(&outcome_json(&outcome));
        }
    }
    Ok(())
}

fn open_store<'u>(universe: &'u Universe, args: &StoreArgs) -> DataStore<'u> {
    universe
        .data_store(args.store.clone())
        .with_scope(args.scope.clone())
}

fn emit_pages(mut cursor: PageCursor, max_pages: Option<usize>) -> ApiResult<()> {
    let mut emitted = 0;
    while max_pages.is_none_or(|max| emitted < max) {
        let Some(page) = cursor.next_page()? else {
            break;
        };
        emit(&Value::Array(page));
        emitted += 1;
    }
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn outcome_json(outcome: &Outcome) -> Value {
    match outcome {
        Outcome::Success(result) => json!({
            "success": true,
            "data": result.data,
            "fromCache": result.from_cache,
        }),
        Outcome::Indeterminate { status } => json!({
            "success": true,
            "error": Value::Null,
            "status": status,
        }),
    }
}

fn emit(value: &Value) {
    println!("{value}");
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(err.kind().as_str()));
    inner.insert(
        "message".to_string(),
        json!(err.message().unwrap_or_default()),
    );
    if let Some(status) = err.status() {
        inner.insert("status".to_string(), json!(status));
    }
    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn emit_error(err: &Error) {
    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"UnknownHttpError\",\"message\":\"json encode failed\"}}"
            .to_string()
    });
    eprintln!("{json}");
}

#[cfg(test)]
mod tests {
    use super::{Cli, error_json, outcome_json};
    use clap::CommandFactory;
    use opencloud::api::{Error, ErrorKind, NormalizedResult, Outcome};
    use serde_json::json;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn indeterminate_outcome_keeps_degenerate_shape() {
        let value = outcome_json(&Outcome::Indeterminate { status: 204 });
        assert_eq!(value, json!({"success": true, "error": null, "status": 204}));

        let value = outcome_json(&Outcome::Success(NormalizedResult {
            data: json!(42),
            from_cache: true,
        }));
        assert_eq!(value, json!({"success": true, "data": 42, "fromCache": true}));
    }

    #[test]
    fn error_json_carries_kind_and_status() {
        let err = Error::new(ErrorKind::RateLimit)
            .with_message("too many requests")
            .with_status(429);
        let expected = json!({
            "error": {"kind": "RateLimitError", "message": "too many requests", "status": 429}
        });
        assert_eq!(error_json(&err), expected);
    }
}

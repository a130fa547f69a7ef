//! # pgpanel CLI
//!
//! Command-line front end for the pgPanel backend.
//!
//! ## Usage
//!
//! ```bash
//! pgpanel login --username admin
//! pgpanel tables
//! pgpanel columns users
//! pgpanel rows users --sort=-created_at --limit 20 --text bob
//! pgpanel update users --pk id=5 --set email=bob@example.com
//! pgpanel delete memberships --pk user_id=3,group_id=8 --pk user_id=4,group_id=8
//! pgpanel sql "SELECT count(*) FROM users"
//! pgpanel sql                      # interactive console
//! pgpanel backup export-db --out dump.sql
//! ```
//!
//! Settings come from `pgpanel.toml` / `pgpanel.local.toml` / `PGPANEL_*`
//! (see `config`); `--url` overrides the server URL.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, warn};

use pgpanel::client::{ExportDatabaseOptions, UpdateRelatedRowsActions};
use pgpanel::config::ViewConfig;
use pgpanel::form::{build_form, InputValue};
use pgpanel::logging::init_tracing;
use pgpanel::pkeys::PrimaryKeyMap;
use pgpanel::row_query::{join_list, split_list};
use pgpanel::{
    resolve_input_type, CellValue, Config, PanelClient, PgTable, RelationsConfig, Row, RowQuery,
    TableSettings, TokenStore,
};

#[derive(Parser)]
#[command(name = "pgpanel")]
#[command(about = "Command-line client for the pgPanel PostgreSQL admin backend", long_about = None)]
struct Cli {
    /// Config file (default: pgpanel.toml + pgpanel.local.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overrides `server.url`
    #[arg(long, global = true, env = "PGPANEL_URL")]
    url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and store the admin token.
    Login {
        #[arg(long, short)]
        username: String,
        #[arg(long, short, env = "PGPANEL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored token.
    Logout,
    /// List tables with their primary keys.
    Tables {
        /// Ask the backend to re-read the schema first.
        #[arg(long)]
        reload: bool,
    },
    /// Show each column of a table with the input used to edit it.
    Columns { table: String },
    /// Fetch a page of rows.
    Rows(RowsArgs),
    /// Insert one row.
    Insert {
        table: String,
        /// `column=value`, repeatable
        #[arg(long = "set", value_name = "COL=VAL", required = true)]
        set: Vec<String>,
    },
    /// Update the rows matching a key or filter.
    Update {
        table: String,
        #[command(flatten)]
        target: TargetArgs,
        #[arg(long = "set", value_name = "COL=VAL", required = true)]
        set: Vec<String>,
    },
    /// Delete the rows matching a key or filter.
    Delete {
        table: String,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Show the rows linked to one row through a join table, optionally
    /// linking or unlinking some first.
    Relations {
        /// Main table
        table: String,
        /// Primary key value of the main-table row
        row_id: String,
        /// Related table
        #[arg(long)]
        relation: String,
        /// Join table; without it the relation is taken from the table settings
        #[arg(long)]
        join_table: Option<String>,
        /// Mirror links in both directions (with --join-table)
        #[arg(long, requires = "join_table")]
        bidirectional: bool,
        /// Related id to link, repeatable
        #[arg(long = "add", value_name = "ID")]
        add: Vec<String>,
        /// Related id to unlink, repeatable
        #[arg(long = "remove", value_name = "ID")]
        remove: Vec<String>,
    },
    /// Run a SQL statement, or open a console when none is given.
    Sql { query: Option<String> },
    /// Manage uploaded files.
    Files {
        #[command(subcommand)]
        command: FilesCommand,
    },
    /// Database and storage backups.
    Backup {
        #[command(subcommand)]
        command: BackupCommand,
    },
}

#[derive(Args)]
struct RowsArgs {
    table: String,
    /// Raw query string, e.g. `offset=20&sort=-id`; other flags override it.
    #[arg(long)]
    query: Option<String>,
    #[arg(long)]
    offset: Option<u64>,
    #[arg(long)]
    limit: Option<u64>,
    /// `|`-separated columns, `-` prefix for descending
    #[arg(long, allow_hyphen_values = true)]
    sort: Option<String>,
    /// SQL `WHERE` expression
    #[arg(long)]
    filter: Option<String>,
    /// `|`-separated positional arguments for `--filter`
    #[arg(long)]
    args: Option<String>,
    /// Free-text search
    #[arg(long)]
    text: Option<String>,
    /// `|`-separated columns for `--text`
    #[arg(long)]
    cols: Option<String>,
    /// `|`-separated columns to fetch
    #[arg(long)]
    select: Option<String>,
    /// Print rows as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct TargetArgs {
    /// Primary key values `col=val[,col=val]`, repeatable for several rows
    #[arg(long = "pk", value_name = "COL=VAL,...")]
    pk: Vec<String>,
    /// Raw filter expression
    #[arg(long)]
    filter: Option<String>,
}

#[derive(Subcommand)]
enum FilesCommand {
    List {
        #[arg(long)]
        dir: Option<String>,
        #[arg(long)]
        filter: Option<String>,
    },
    Upload { path: PathBuf },
    Delete { name: String },
}

#[derive(Subcommand)]
enum BackupCommand {
    ExportDb {
        #[arg(long, default_value = "pgpanel_dump.sql")]
        out: PathBuf,
        /// Only dump these tables
        #[arg(long = "table")]
        tables: Vec<String>,
        #[arg(long)]
        data_only: bool,
        #[arg(long)]
        clean: bool,
    },
    ImportDb { path: PathBuf },
    ExportStorage {
        #[arg(long, default_value = "pgpanel_storage.zip")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_from(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(url) = cli.url {
        config.server.url = url;
    }
    init_tracing(&config.logging).context("Failed to initialize logging")?;
    debug!(url = %config.server.url, "using panel backend");

    let mut client = PanelClient::from_config(&config.server)?
        .with_token_store(TokenStore::new(&config.auth.token_file))?;

    match cli.command {
        Command::Login { username, password } => {
            client.login(&username, &password).await?;
            println!("Logged in as {username}");
        }
        Command::Logout => {
            client.logout()?;
            println!("Token removed");
        }
        Command::Tables { reload } => {
            let tables = client.tables(reload).await?;
            for table in tables.values() {
                println!(
                    "{:<32} {:>3} columns  pk: {}",
                    table.name,
                    table.columns.len(),
                    table.primary_key_names().join(", ")
                );
            }
        }
        Command::Columns { table } => {
            let table = fetch_table(&client, &table).await?;
            let settings = fetch_settings(&client, &table.name).await;
            for column in &table.columns {
                let lookup = resolve_input_type(column, settings.overrides());
                println!(
                    "{:<24} {:<28} {}{}{}",
                    column.name,
                    column.reg_type,
                    lookup.kind,
                    if lookup.is_array { "[]" } else { "" },
                    if column.is_primary_key { "  (pk)" } else { "" },
                );
            }
        }
        Command::Rows(args) => {
            let table = fetch_table(&client, &args.table).await?;
            let settings = fetch_settings(&client, &table.name).await;
            let query = settings.apply_view_defaults(&rows_query(&args, &config.view));
            let rows = client.rows(&table.name, &query).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print_rows(&rows);
            }
            eprintln!(
                "{} rows (offset {}, limit {}); next page: ?{}",
                rows.len(),
                query.offset,
                query.limit,
                query.next_page().to_search_params()
            );
        }
        Command::Insert { table, set } => {
            let table = fetch_table(&client, &table).await?;
            let settings = fetch_settings(&client, &table.name).await;
            let row = encode_assignments(&table, &settings, &set)?;
            let inserted = client.insert_row(&table.name, &row).await?;
            println!("{}", serde_json::to_string_pretty(&inserted)?);
        }
        Command::Update { table, target, set } => {
            let table = fetch_table(&client, &table).await?;
            let settings = fetch_settings(&client, &table.name).await;
            let row = encode_assignments(&table, &settings, &set)?;
            let filters = target_filter(&target)?;
            let updated = client.update_rows(&table.name, &filters, &row).await?;
            println!("{} rows updated", updated.len());
        }
        Command::Delete { table, target } => {
            let deleted = if target.pk.is_empty() {
                let filters = target_filter(&target)?;
                client.delete_rows(&table, &filters).await?
            } else {
                let pkeys = parse_pk_groups(&target.pk)?;
                client.delete_rows_by_pkeys(&table, &pkeys).await?
            };
            println!("{} rows deleted", deleted.len());
        }
        Command::Relations {
            table,
            row_id,
            relation,
            join_table,
            bidirectional,
            add,
            remove,
        } => {
            let conf = match join_table {
                Some(join_table) => RelationsConfig {
                    main_table: table,
                    relation_table: relation,
                    join_table,
                    bidirectional,
                },
                None => fetch_settings(&client, &table)
                    .await
                    .relations
                    .into_iter()
                    .find(|r| r.relation_table == relation)
                    .ok_or_else(|| {
                        anyhow!("No relation from '{table}' to '{relation}' in table settings; pass --join-table")
                    })?,
            };
            let row_id = parse_id(&row_id);

            let actions = UpdateRelatedRowsActions {
                add_ids: add.iter().map(|id| parse_id(id)).collect(),
                delete_ids: remove.iter().map(|id| parse_id(id)).collect(),
            };
            if !actions.is_empty() {
                client.update_related_rows(&conf, &row_id, &actions).await?;
                println!(
                    "{} linked, {} unlinked",
                    actions.add_ids.len(),
                    actions.delete_ids.len()
                );
            }

            let query = RowQuery {
                limit: config.view.page_size(),
                ..RowQuery::default()
            };
            let rows = client.related_rows(&conf, &row_id, &query).await?;
            print_rows(&rows);
        }
        Command::Sql { query: Some(query) } => {
            run_sql(&client, &query).await?;
        }
        Command::Sql { query: None } => {
            run_sql_console(&client).await?;
        }
        Command::Files { command } => run_files(&client, command).await?,
        Command::Backup { command } => run_backup(&client, command).await?,
    }

    Ok(())
}

async fn fetch_table(client: &PanelClient, name: &str) -> Result<PgTable> {
    let mut tables = client.tables(false).await?;
    tables
        .remove(name)
        .ok_or_else(|| anyhow!("Table '{name}' not found"))
}

/// Settings are optional; a backend without them behaves as if none were set.
async fn fetch_settings(client: &PanelClient, table: &str) -> TableSettings {
    match client.table_settings(table).await {
        Ok(settings) => settings,
        Err(e) => {
            warn!(table, error = %e, "table settings unavailable");
            TableSettings::default()
        }
    }
}

/// Row query from `--query` plus the individual flags, with the page size
/// defaulted and clamped by `[view]` in both cases.
fn rows_query(args: &RowsArgs, view: &ViewConfig) -> RowQuery {
    let mut query = match &args.query {
        Some(raw) => RowQuery::from_query_str_with_limit(raw, view.page_size()),
        None => RowQuery {
            limit: view.page_size(),
            ..RowQuery::default()
        },
    };

    if let Some(limit) = args.limit {
        query.limit = limit;
    }
    query.limit = view.clamp_limit(query.limit);
    if let Some(sort) = &args.sort {
        query.sort = split_list(sort);
    }
    if let Some(text) = &args.text {
        query = query.with_search(text, false);
    }
    if let Some(filter) = &args.filter {
        query = query.with_search(filter, true);
        query.filters_args = args.args.as_deref().and_then(split_list);
    }
    // After the search flags, which restart from the first page
    if let Some(offset) = args.offset {
        query.offset = offset;
    }
    if let Some(cols) = &args.cols {
        query.text_filters_cols = split_list(cols);
    }
    if let Some(select) = &args.select {
        query.select_cols = split_list(select);
    }
    query
}

/// Encode `col=value` assignments through the column's form field
fn encode_assignments(table: &PgTable, settings: &TableSettings, assignments: &[String]) -> Result<Row> {
    let fields = build_form(table, None, settings.overrides());
    let mut row = Row::new();

    for assignment in assignments {
        let (column, raw) = split_pair(assignment)?;
        let field = fields
            .iter()
            .find(|f| f.name == column)
            .ok_or_else(|| anyhow!("Unknown or hidden column '{column}' in table '{}'", table.name))?;
        row.insert(column.to_string(), field.encode(&InputValue::Single(raw.to_string())));
    }
    Ok(row)
}

fn target_filter(target: &TargetArgs) -> Result<String> {
    if let Some(filter) = &target.filter {
        return Ok(filter.clone());
    }
    let pkeys = parse_pk_groups(&target.pk)?;
    Ok(pgpanel::multi_rows_filter_expr(&pkeys))
}

/// `--pk a=1,b=2 --pk a=3,b=4` into one key map per row
fn parse_pk_groups(groups: &[String]) -> Result<Vec<PrimaryKeyMap>> {
    groups
        .iter()
        .map(|group| {
            group
                .split(',')
                .map(|pair| split_pair(pair).map(|(k, v)| (k.to_string(), v.to_string())))
                .collect::<Result<PrimaryKeyMap>>()
        })
        .collect()
}

/// Row id as typed on the command line: numbers stay numbers, anything else is text
fn parse_id(raw: &str) -> CellValue {
    serde_json::from_str::<serde_json::Value>(raw)
        .ok()
        .filter(serde_json::Value::is_number)
        .map_or_else(|| CellValue::from(raw), CellValue::from)
}

fn split_pair(pair: &str) -> Result<(&str, &str)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => bail!("Expected COL=VAL, got '{pair}'"),
    }
}

fn print_rows(rows: &[Row]) {
    let Some(first) = rows.first() else {
        println!("(no rows)");
        return;
    };
    let columns: Vec<&str> = first.keys().map(String::as_str).collect();
    println!("{}", join_list(&columns));
    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|c| row.get(*c).map_or_else(|| CellValue::Null.to_string(), single_line))
            .collect();
        println!("{}", join_list(&cells));
    }
}

fn single_line(value: &CellValue) -> String {
    match value {
        CellValue::Object(_) | CellValue::Array(_) => value.to_json().to_string(),
        other => other.to_string(),
    }
}

async fn run_sql(client: &PanelClient, query: &str) -> Result<()> {
    let response = client.execute_sql(query, None).await?;
    if response.columns.is_empty() {
        println!("{} rows affected", response.rows_affected);
    } else {
        print_rows(&response.rows);
    }
    Ok(())
}

async fn run_sql_console(client: &PanelClient) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    println!("pgpanel SQL console. End statements with ';'. Ctrl-D to exit.");

    let mut buffer = String::new();
    loop {
        let prompt = if buffer.is_empty() { "sql> " } else { "...> " };
        match editor.readline(prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if buffer.is_empty() && (line == "\\q" || line == "exit") {
                    break;
                }
                if !buffer.is_empty() {
                    buffer.push('\n');
                }
                buffer.push_str(line);
                if !line.ends_with(';') {
                    continue;
                }

                let statement = std::mem::take(&mut buffer);
                let _ = editor.add_history_entry(statement.as_str());
                if let Err(e) = run_sql(client, &statement).await {
                    println!("Error: {e}");
                }
            }
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

async fn run_files(client: &PanelClient, command: FilesCommand) -> Result<()> {
    match command {
        FilesCommand::List { dir, filter } => {
            for file in client.files(dir.as_deref(), filter.as_deref()).await? {
                let modified = file
                    .modified_at()
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                let kind = if file.is_dir { "dir" } else if file.is_image { "image" } else { "file" };
                println!("{modified:<17} {kind:<5} {}", file.name);
            }
        }
        FilesCommand::Upload { path } => {
            let info = client.upload_file(&path).await?;
            println!("Uploaded {} -> {}", info.name, info.public_url.unwrap_or(info.internal_url));
        }
        FilesCommand::Delete { name } => {
            client.delete_file(&name).await?;
            println!("Deleted {name}");
        }
    }
    Ok(())
}

async fn run_backup(client: &PanelClient, command: BackupCommand) -> Result<()> {
    match command {
        BackupCommand::ExportDb {
            out,
            tables,
            data_only,
            clean,
        } => {
            let selected = if tables.is_empty() {
                Vec::new()
            } else {
                let mut all = client.tables(false).await?;
                tables
                    .iter()
                    .map(|name| all.remove(name).ok_or_else(|| anyhow!("Table '{name}' not found")))
                    .collect::<Result<Vec<_>>>()?
            };
            let options = ExportDatabaseOptions {
                tables: selected,
                data_only,
                clean,
            };
            let dump = client.export_database(&options).await?;
            write_output(&out, &dump)?;
        }
        BackupCommand::ImportDb { path } => {
            client.import_database(&path).await?;
            println!("Imported {}", path.display());
        }
        BackupCommand::ExportStorage { out } => {
            let archive = client.export_storage().await?;
            write_output(&out, &archive)?;
        }
    }
    Ok(())
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows_args(argv: &[&str]) -> RowsArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Command::Rows(args) => args,
            _ => panic!("expected rows command"),
        }
    }

    fn view(default_limit: u64, max_limit: u64) -> ViewConfig {
        ViewConfig {
            default_limit,
            max_limit,
        }
    }

    #[test]
    fn test_rows_query_uses_view_default_limit() {
        let args = rows_args(&["pgpanel", "rows", "users"]);
        assert_eq!(rows_query(&args, &view(20, 100)).limit, 20);

        let args = rows_args(&["pgpanel", "rows", "users", "--query", "sort=-id"]);
        let query = rows_query(&args, &view(20, 100));
        assert_eq!(query.limit, 20);
        assert_eq!(query.sort, Some(vec!["-id".into()]));
    }

    #[test]
    fn test_rows_query_clamps_limit_from_query_and_flag() {
        let args = rows_args(&["pgpanel", "rows", "users", "--query", "limit=9999&offset=10"]);
        let query = rows_query(&args, &view(20, 100));
        assert_eq!(query.limit, 100);
        assert_eq!(query.offset, 10);

        let args = rows_args(&["pgpanel", "rows", "users", "--limit", "9999"]);
        assert_eq!(rows_query(&args, &view(20, 100)).limit, 100);

        let args = rows_args(&["pgpanel", "rows", "users", "--query", "limit=30", "--limit", "40"]);
        assert_eq!(rows_query(&args, &view(20, 100)).limit, 40);
    }

    #[test]
    fn test_rows_query_offset_survives_search() {
        let args = rows_args(&["pgpanel", "rows", "users", "--offset", "20", "--text", "bob"]);
        let query = rows_query(&args, &view(20, 100));
        assert_eq!(query.offset, 20);
        assert_eq!(query.text_filters.as_deref(), Some("bob"));
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42"), CellValue::from(42_i64));
        assert_eq!(parse_id("a1b2"), CellValue::from("a1b2"));
        assert_eq!(parse_id("true"), CellValue::from("true"));
    }

    #[test]
    fn test_bidirectional_requires_join_table() {
        let argv = ["pgpanel", "relations", "users", "3", "--relation", "groups", "--bidirectional"];
        assert!(Cli::try_parse_from(argv).is_err());
    }
}

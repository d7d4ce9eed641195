//! catalog-migrate CLI - database catalog introspection and ORM migration generation.

mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use catalog_migrate::config::{write_init, DEFAULT_CONFIG_PATH};
use catalog_migrate::report::{run_dir_name, DATABASE_INFO_FILE};
use catalog_migrate::{
    connector_for, env_lookup, Clock, Config, ConnectionConfig, ConnectionSettings, Connector,
    DataExtractor, DatabaseInfo, GeneratedFile, GeneratorImpl, GeneratorOptions,
    IntrospectionMetadata, IntrospectionService, MigrateError, TableRequest,
};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn, Level};

/// Models directory used by `export` when `--output` is not given.
const DEFAULT_EXPORT_DIR: &str = "exports/generated-models";

#[derive(Parser)]
#[command(name = "catalog-migrate")]
#[command(about = "Introspect a database catalog and generate ORM models and migrations")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file [default: catalog-migrate.yaml if present]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Named connection from the `connections` section of the config file
    #[arg(long, global = true)]
    conn: Option<String>,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info", global = true)]
    verbosity: String,

    /// Log format: text or json
    #[arg(long, default_value = "text", global = true)]
    log_format: String,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Connection fields that override the config file and environment.
#[derive(Args)]
struct ConnectionArgs {
    /// Database type: mssql, postgres, mysql
    #[arg(short = 't', long = "type", global = true)]
    db_type: Option<String>,

    /// Database host
    #[arg(short = 'H', long, global = true)]
    host: Option<String>,

    /// Database port
    #[arg(short = 'P', long, global = true)]
    port: Option<u16>,

    /// Database user
    #[arg(short, long, alias = "username", global = true)]
    user: Option<String>,

    /// Database password
    #[arg(short, long, global = true)]
    password: Option<String>,

    /// Database name
    #[arg(short, long, global = true)]
    database: Option<String>,

    /// Require TLS for the connection
    #[arg(long, global = true)]
    ssl: bool,
}

impl ConnectionArgs {
    fn into_overrides(self) -> ConnectionConfig {
        ConnectionConfig {
            r#type: self.db_type,
            host: self.host,
            port: self.port,
            user: self.user,
            password: self.password,
            database: self.database,
            ssl: self.ssl.then_some(true),
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Output path for configuration file [default: catalog-migrate.yaml]
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Test the database connection and print the server version
    Connect,

    /// Introspect the catalog and save schema.json and metadata.json
    Introspect,

    /// Generate model files for a target ORM
    Export {
        /// Target ORM: sequelize, typeorm, prisma, mongoose
        #[arg(long)]
        target: String,

        /// Output directory [default: exports/generated-models]
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate ordered migration files for a target ORM
    Migrations {
        /// Target ORM: sequelize, typeorm
        #[arg(long)]
        target: String,

        /// Output directory [default: migrations.output_dir from config]
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also generate seed migrations for the selected tables
        #[arg(long, conflicts_with = "only_data")]
        data: bool,

        /// Generate only seed migrations for the selected tables
        #[arg(long)]
        only_data: bool,

        /// Comma separated list of tables to export data from
        #[arg(long, value_delimiter = ',')]
        tables: Vec<String>,

        /// Seed explicit identity values and resynchronize the generator afterward
        #[arg(long)]
        disable_identity: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    // Handle init command separately (doesn't need existing config)
    if let Commands::Init { output, force } = &cli.command {
        let path = output
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        write_init(&path, *force)?;
        println!("Created configuration file {}", path.display());
        return Ok(());
    }

    dotenvy::dotenv().ok();
    setup_logging(&cli.verbosity, &cli.log_format);

    let config = Config::load_or_default(cli.config.as_deref())?;
    if let Some(path) = &cli.config {
        info!("Loaded configuration from {:?}", path);
    }

    // Validate generator options before touching the network
    let plan = CommandPlan::prepare(&cli.command, &config)?;

    let settings = config.resolve_connection(
        cli.conn.as_deref(),
        cli.connection.into_overrides(),
        env_lookup,
    )?;
    info!("Connecting to {}...", settings.kind);

    let mut conn = connector_for(&settings)?;
    let result = match conn.connect().await {
        Ok(()) => plan.execute(conn.as_ref(), &settings, &config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = conn.disconnect().await {
        warn!("Error closing connection: {}", e);
    }
    result
}

/// A connected command with its arguments checked.
enum CommandPlan {
    Connect,
    Introspect,
    Export {
        target: String,
        output: Option<PathBuf>,
    },
    Migrations {
        target: String,
        output: Option<PathBuf>,
        schema: bool,
        requests: Vec<TableRequest>,
    },
}

impl CommandPlan {
    fn prepare(command: &Commands, config: &Config) -> Result<Self, MigrateError> {
        Ok(match command {
            Commands::Init { .. } => unreachable!(), // Handled in run()
            Commands::Connect => CommandPlan::Connect,
            Commands::Introspect => CommandPlan::Introspect,
            Commands::Export { target, output } => {
                GeneratorImpl::from_target(target, GeneratorOptions::default())?;
                CommandPlan::Export {
                    target: target.clone(),
                    output: output.clone(),
                }
            }
            Commands::Migrations {
                target,
                output,
                data,
                only_data,
                tables,
                disable_identity,
            } => {
                let generator = GeneratorImpl::from_target(target, GeneratorOptions::default())?;
                if !generator.supports_migrations() {
                    return Err(MigrateError::UnsupportedCapability {
                        target: generator.name().to_string(),
                        capability: "migrations".to_string(),
                    });
                }

                let requests = if *data || *only_data {
                    let requests = data_requests(config, tables, *disable_identity);
                    if requests.is_empty() {
                        return Err(MigrateError::Config(
                            "You must specify at least one table via --tables (or data.tables in the config file) when using --data or --only-data".into(),
                        ));
                    }
                    requests
                } else {
                    Vec::new()
                };

                CommandPlan::Migrations {
                    target: target.clone(),
                    output: output.clone(),
                    schema: !*only_data,
                    requests,
                }
            }
        })
    }

    async fn execute(
        self,
        conn: &dyn Connector,
        settings: &ConnectionSettings,
        config: &Config,
    ) -> Result<(), MigrateError> {
        match self {
            CommandPlan::Connect => {
                let version = conn.version().await?;
                println!("Connected to {} successfully", settings.kind);
                println!("  Server: {}", version.lines().next().unwrap_or_default());
            }

            CommandPlan::Introspect => {
                let schema = IntrospectionService::new(conn).introspect().await?;
                let now = Utc::now();

                let run_dir =
                    PathBuf::from(config.introspection_output_dir(env_lookup)).join(run_dir_name(now));
                let metadata = IntrospectionMetadata::new(settings, &schema, now);
                output::write_files(
                    &run_dir,
                    &[
                        GeneratedFile::new("schema.json", serde_json::to_string_pretty(&schema)?),
                        GeneratedFile::new("metadata.json", metadata.to_json()?),
                    ],
                )?;

                println!("Introspected {} tables", schema.tables.len());
                println!("  Saved to: {}", run_dir.display());
            }

            CommandPlan::Export { target, output } => {
                let schema = IntrospectionService::new(conn).introspect().await?;
                let generator = GeneratorImpl::from_target(&target, options(settings))?;
                info!("Generating models for {}...", generator.name());

                let files = generator.generate(&schema)?;
                let out_dir = output
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_DIR))
                    .join(generator.name());
                output::write_files(&out_dir, &files)?;

                println!("Generated {} files in {}", files.len(), out_dir.display());
            }

            CommandPlan::Migrations {
                target,
                output,
                schema: with_schema,
                requests,
            } => {
                let schema = IntrospectionService::new(conn).introspect().await?;
                let generator = GeneratorImpl::from_target(&target, options(settings))?;

                let data = if requests.is_empty() {
                    Vec::new()
                } else {
                    let names: Vec<&str> = requests.iter().map(|r| r.name.as_str()).collect();
                    info!("Extracting data from tables: {}", names.join(", "));
                    DataExtractor::new(conn).extract(&schema, &requests).await?
                };

                let files = if with_schema {
                    info!("Generating migrations for {}...", generator.name());
                    let data = (!requests.is_empty()).then_some(data.as_slice());
                    generator.generate_migrations(&schema, data)?
                } else {
                    info!("Generating data migrations for {}...", generator.name());
                    generator.generate_data_migrations(&data)?
                };

                let info = DatabaseInfo::collect(conn, Utc::now()).await?;

                let out_dir = migrations_dir(output, config).join(generator.name());
                output::clean_dir(&out_dir)?;
                output::write_files(&out_dir, &files)?;
                output::write_files(
                    &out_dir,
                    &[GeneratedFile::new(DATABASE_INFO_FILE, info.to_json()?)],
                )?;

                let kind = if with_schema { "migration" } else { "seed" };
                println!(
                    "Generated {} {} files in {}",
                    files.len(),
                    kind,
                    out_dir.display()
                );
            }
        }
        Ok(())
    }
}

fn options(settings: &ConnectionSettings) -> GeneratorOptions {
    GeneratorOptions {
        clock: Clock::System,
        source: Some(settings.kind),
    }
}

/// Table requests for `--tables`, or every configured `data.tables` entry.
fn data_requests(config: &Config, tables: &[String], disable_identity: bool) -> Vec<TableRequest> {
    let names: Vec<String> = tables
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    let mut requests = config.table_requests(&names);
    if disable_identity {
        for request in &mut requests {
            request.disable_identity = true;
        }
    }
    requests
}

fn migrations_dir(output: Option<PathBuf>, config: &Config) -> PathBuf {
    output.unwrap_or_else(|| PathBuf::from(config.migrations_output_dir(env_lookup)))
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
data:
  tables:
    - name: users
      filter: "active = 1"
    - name: orders
"#;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_data_requests_from_flag_and_config() {
        let config = Config::from_yaml(CONFIG).unwrap();

        let requests = data_requests(&config, &["Users".into(), " ".into()], false);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].filter.as_deref(), Some("active = 1"));

        let requests = data_requests(&config, &[], true);
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.disable_identity));
    }

    #[test]
    fn test_migrations_plan_rejects_models_only_target() {
        let cli = Cli::parse_from(["catalog-migrate", "migrations", "--target", "prisma"]);
        let err = CommandPlan::prepare(&cli.command, &Config::default()).err().unwrap();
        assert!(matches!(err, MigrateError::UnsupportedCapability { .. }));
    }

    #[test]
    fn test_migrations_plan_requires_tables_for_data() {
        let cli = Cli::parse_from(["catalog-migrate", "migrations", "--target", "sequelize", "--data"]);
        let err = CommandPlan::prepare(&cli.command, &Config::default()).err().unwrap();
        assert!(matches!(err, MigrateError::Config(_)));
    }

    #[test]
    fn test_connection_flags_become_overrides() {
        let cli = Cli::parse_from([
            "catalog-migrate",
            "connect",
            "-t",
            "mysql",
            "-P",
            "3307",
            "--ssl",
        ]);
        let overrides = cli.connection.into_overrides();
        assert_eq!(overrides.r#type.as_deref(), Some("mysql"));
        assert_eq!(overrides.port, Some(3307));
        assert_eq!(overrides.ssl, Some(true));
        assert_eq!(overrides.host, None);
    }
}

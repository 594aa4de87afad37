use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use serde::de::DeserializeOwned;

use akamai_tf_core::provider::{DataSource, Identified, ResourceHandler};
use akamai_tf_core::{Diagnostics, OperationContext, Severity};
use akamai_tf_edgegrid::{EdgeGridClient, ProviderConfig};
use akamai_tf_provider_domainownership::DomainOwnershipProvider;
use akamai_tf_provider_domainownership::data_source::SearchDomainsQuery;
use akamai_tf_provider_domainownership::import_id::parse_import_id;
use akamai_tf_provider_property::PropertyProvider;
use akamai_tf_provider_property::hostnames::HostnamesDiffQuery;
use akamai_tf_provider_property::models::Network;
use akamai_tf_provider_property::property_activation::PropertyActivationQuery;
use akamai_tf_provider_property::rules::PropertyRulesQuery;
use akamai_tf_provider_property::rule_trees_json_equivalent;

#[derive(Parser)]
#[command(name = "akamai-tf")]
#[command(about = "Apply Akamai property and domain ownership resources", long_about = None)]
struct Cli {
    /// Provider settings file (JSON)
    #[arg(long, global = true)]
    provider_config: Option<PathBuf>,

    /// Path of the .edgerc file
    #[arg(long, global = true)]
    edgerc: Option<PathBuf>,

    /// Section of the .edgerc file
    #[arg(long, global = true)]
    section: Option<String>,

    #[arg(long, global = true)]
    account_switch_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Property activations
    Property {
        #[command(subcommand)]
        command: PropertyCommands,
    },
    /// Include activations
    Include {
        #[command(subcommand)]
        command: ActivationCommands,
    },
    /// Hostnames of a property version
    Hostnames {
        #[command(subcommand)]
        command: HostnamesCommands,
    },
    /// Rule tree comparison
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// Domains submitted for ownership validation
    Domains {
        #[command(subcommand)]
        command: DomainsCommands,
    },
    /// Ownership validation of submitted domains
    Validation {
        #[command(subcommand)]
        command: ValidationCommands,
    },
}

#[derive(Args)]
struct ApplyArgs {
    /// Desired configuration (JSON)
    config: PathBuf,

    /// State file; created on first apply
    #[arg(long)]
    state: PathBuf,
}

#[derive(Args)]
struct StateArgs {
    /// State file written by apply
    #[arg(long)]
    state: PathBuf,
}

#[derive(Subcommand)]
enum ActivationCommands {
    /// Create or update to match the configuration
    Activate(ApplyArgs),
    /// Undo what the state file records
    Deactivate(StateArgs),
}

#[derive(Subcommand)]
enum PropertyCommands {
    Activate(ApplyArgs),
    Deactivate(StateArgs),
    /// Show the version active on a network
    Status {
        #[arg(long)]
        property: String,

        #[arg(long, default_value = "STAGING")]
        network: Network,

        #[arg(long)]
        contract: Option<String>,

        #[arg(long)]
        group: Option<String>,
    },
}

#[derive(Subcommand)]
enum HostnamesCommands {
    /// Replace the hostnames of a property version
    Apply(ApplyArgs),
    /// List staging and production hostnames side by side
    Diff {
        #[arg(long)]
        property: String,

        #[arg(long)]
        contract: Option<String>,

        #[arg(long)]
        group: Option<String>,
    },
}

#[derive(Subcommand)]
enum RulesCommands {
    /// Check whether two rule trees are equivalent
    Compare {
        /// Rule tree to compare (JSON)
        new: PathBuf,

        /// Local rule tree to compare against
        #[arg(long, conflicts_with = "property")]
        old: Option<PathBuf>,

        /// Compare against a property version on the server instead
        #[arg(long, requires = "version")]
        property: Option<String>,

        #[arg(long)]
        version: Option<u32>,

        #[arg(long)]
        contract: Option<String>,

        #[arg(long)]
        group: Option<String>,
    },
}

#[derive(Subcommand)]
enum ValidationCommands {
    /// Validate the configured domains and wait until they are validated
    Apply(ApplyArgs),
    /// Invalidate the domains in the state file
    Destroy(StateArgs),
}

#[derive(Subcommand)]
enum DomainsCommands {
    /// Show what apply would change
    Plan(ApplyArgs),
    Apply(ApplyArgs),
    /// Invalidate and remove every domain in the state file
    Destroy(StateArgs),
    /// Adopt domains that already exist, e.g. "example.com:HOST,www.example.com"
    Import {
        id: String,

        #[arg(long)]
        state: PathBuf,
    },
    /// Look up domains by name, optionally as name:SCOPE
    Search {
        #[arg(required = true)]
        domains: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Property { command } => {
            let property = PropertyProvider::from_client(client(&cli)?);
            match command {
                PropertyCommands::Activate(args) => {
                    run_apply(&property.property_activation(), args).await
                }
                PropertyCommands::Deactivate(args) => {
                    run_destroy(&property.property_activation(), &args.state).await
                }
                PropertyCommands::Status {
                    property: property_id,
                    network,
                    contract,
                    group,
                } => {
                    let query = PropertyActivationQuery {
                        property_id: property_id.clone(),
                        contract_id: contract.clone(),
                        group_id: group.clone(),
                        network: *network,
                    };
                    run_data_source(&property.activation_data_source(), &query).await
                }
            }
        }
        Commands::Include { command } => {
            let property = PropertyProvider::from_client(client(&cli)?);
            let handler = property.include_activation();
            match command {
                ActivationCommands::Activate(args) => run_apply(&handler, args).await,
                ActivationCommands::Deactivate(args) => run_destroy(&handler, &args.state).await,
            }
        }
        Commands::Hostnames { command } => {
            let property = PropertyProvider::from_client(client(&cli)?);
            match command {
                HostnamesCommands::Apply(args) => run_apply(&property.hostnames(), args).await,
                HostnamesCommands::Diff {
                    property: property_id,
                    contract,
                    group,
                } => {
                    let query = HostnamesDiffQuery {
                        property_id: property_id.clone(),
                        contract_id: contract.clone(),
                        group_id: group.clone(),
                    };
                    run_data_source(&property.hostnames_diff(), &query).await
                }
            }
        }
        Commands::Rules { command } => run_rules(&cli, command).await,
        Commands::Domains { command } => {
            let provider = DomainOwnershipProvider::from_client(client(&cli)?);
            let handler = provider.domains();
            match command {
                DomainsCommands::Plan(args) => run_plan(&handler, args).await,
                DomainsCommands::Apply(args) => run_apply(&handler, args).await,
                DomainsCommands::Destroy(args) => run_destroy(&handler, &args.state).await,
                DomainsCommands::Import { id, state } => run_import(&handler, id, state).await,
                DomainsCommands::Search { domains } => {
                    let query = SearchDomainsQuery {
                        domains: parse_import_id(&domains.join(","))?,
                    };
                    run_data_source(&provider.search(), &query).await
                }
            }
        }
        Commands::Validation { command } => {
            let provider = DomainOwnershipProvider::from_client(client(&cli)?);
            let handler = provider.validation();
            match command {
                ValidationCommands::Apply(args) => run_apply(&handler, args).await,
                ValidationCommands::Destroy(args) => run_destroy(&handler, &args.state).await,
            }
        }
    }
}

/// Provider settings from the optional file, overridden by flags
fn provider_config(cli: &Cli) -> Result<ProviderConfig> {
    let mut config: ProviderConfig = match &cli.provider_config {
        Some(path) => read_json(path)?,
        None => ProviderConfig::default(),
    };
    if cli.edgerc.is_some() {
        config.edgerc = cli.edgerc.clone();
    }
    if cli.section.is_some() {
        config.config_section = cli.section.clone();
    }
    if cli.account_switch_key.is_some() {
        config.account_switch_key = cli.account_switch_key.clone();
    }
    Ok(config)
}

fn client(cli: &Cli) -> Result<EdgeGridClient> {
    let config = provider_config(cli)?;
    config
        .client()
        .with_context(|| format!("Failed to load credentials from section '{}'", config.section()))
}

/// Context canceled by Ctrl-C
fn operation_context() -> OperationContext {
    let (ctx, handle) = OperationContext::cancellable();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Interrupted, canceling...".yellow());
            handle.cancel();
        }
    });
    ctx
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn read_state<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    read_json(path).map(Some)
}

fn write_state<T: Serialize>(path: &Path, state: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(state)?;
    fs::write(path, content + "\n").with_context(|| format!("Failed to write {}", path.display()))
}

fn print_diagnostics(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics.iter() {
        let label = match diagnostic.severity {
            Severity::Warning => "Warning:".yellow().bold(),
            Severity::Error => "Error:".red().bold(),
        };
        println!("{} {}", label, diagnostic.summary);
        if let Some(detail) = &diagnostic.detail {
            println!("  {}", detail);
        }
    }
}

/// Refresh the saved state; `None` when the resource is gone server-side
async fn refresh<H: ResourceHandler>(
    handler: &H,
    ctx: &OperationContext,
    prior: Option<H::State>,
) -> Result<Option<H::State>> {
    let Some(prior) = prior else {
        return Ok(None);
    };
    let refreshed = handler.read(ctx, &prior).await?;
    if refreshed.is_none() {
        log::warn!(
            "{} {} no longer exists and will be created",
            handler.type_name(),
            prior.id()
        );
    }
    Ok(refreshed)
}

async fn run_plan<H>(handler: &H, args: &ApplyArgs) -> Result<()>
where
    H: ResourceHandler,
    H::Config: DeserializeOwned,
    H::State: DeserializeOwned,
{
    let config: H::Config = read_json(&args.config)?;
    let ctx = operation_context();
    let prior = refresh(handler, &ctx, read_state(&args.state)?).await?;

    let diagnostics = handler.plan(&ctx, prior.as_ref(), &config).await?;
    println!("{}", "Execution Plan:".cyan().bold());
    println!();
    match &prior {
        Some(state) => println!(
            "  {} {} {}",
            "~".yellow().bold(),
            handler.type_name().cyan().bold(),
            state.id()
        ),
        None => println!(
            "  {} {}",
            "+".green().bold(),
            handler.type_name().cyan().bold()
        ),
    }
    println!();
    print_diagnostics(&diagnostics);
    Ok(())
}

async fn run_apply<H>(handler: &H, args: &ApplyArgs) -> Result<()>
where
    H: ResourceHandler,
    H::Config: DeserializeOwned,
    H::State: Serialize + DeserializeOwned,
{
    let config: H::Config = read_json(&args.config)?;
    let ctx = operation_context();
    let prior = refresh(handler, &ctx, read_state(&args.state)?).await?;

    let planned = handler.plan(&ctx, prior.as_ref(), &config).await?;
    print_diagnostics(&planned);

    println!("{}", "Applying changes...".cyan().bold());
    let applied = match &prior {
        Some(prior) => handler.update(&ctx, prior, &config).await,
        None => handler.create(&ctx, &config).await,
    };
    let applied = match applied {
        Ok(applied) => applied,
        Err(e) => {
            println!("  {} {} - {}", "✗".red(), handler.type_name(), e);
            return Err(e.into());
        }
    };
    if applied.diagnostics != planned {
        print_diagnostics(&applied.diagnostics);
    }
    write_state(&args.state, &applied.state)?;
    println!(
        "  {} {} {}",
        "✓".green(),
        handler.type_name(),
        applied.state.id()
    );
    Ok(())
}

async fn run_destroy<H>(handler: &H, state_path: &Path) -> Result<()>
where
    H: ResourceHandler,
    H::State: DeserializeOwned,
{
    let Some(state) = read_state::<H::State>(state_path)? else {
        println!("{}", "No resources to destroy.".green());
        return Ok(());
    };
    let ctx = operation_context();

    println!("{}", "Destroying resources...".red().bold());
    let diagnostics = handler.delete(&ctx, &state).await?;
    print_diagnostics(&diagnostics);
    fs::remove_file(state_path)
        .with_context(|| format!("Failed to remove {}", state_path.display()))?;
    println!("  {} {} {}", "✓".green(), handler.type_name(), state.id());
    Ok(())
}

async fn run_import<H>(handler: &H, id: &str, state_path: &Path) -> Result<()>
where
    H: ResourceHandler,
    H::State: Serialize,
{
    if state_path.exists() {
        bail!(
            "{} already exists; refusing to overwrite it",
            state_path.display()
        );
    }
    let state = handler.import(&operation_context(), id).await?;
    write_state(state_path, &state)?;
    println!(
        "  {} imported {} {}",
        "✓".green(),
        handler.type_name(),
        state.id()
    );
    Ok(())
}

async fn run_data_source<D>(source: &D, query: &D::Query) -> Result<()>
where
    D: DataSource,
    D::Output: Serialize,
{
    let output = source.read(&operation_context(), query).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run_rules(cli: &Cli, command: &RulesCommands) -> Result<()> {
    let RulesCommands::Compare {
        new,
        old,
        property,
        version,
        contract,
        group,
    } = command;
    let new_json = fs::read_to_string(new)
        .with_context(|| format!("Failed to read {}", new.display()))?;

    let old_json = match (old, property, version) {
        (Some(path), _, _) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, Some(property_id), Some(version)) => {
            let provider = PropertyProvider::from_client(client(cli)?);
            let query = PropertyRulesQuery {
                property_id: property_id.clone(),
                contract_id: contract.clone(),
                group_id: group.clone(),
                version: *version,
            };
            let tree = provider.rules().read(&operation_context(), &query).await?;
            serde_json::to_string(&tree)?
        }
        _ => bail!("either --old or --property with --version is required"),
    };

    if rule_trees_json_equivalent(&old_json, &new_json) {
        println!("{}", "Rule trees are equivalent.".green());
    } else {
        println!("{}", "Rule trees differ.".yellow().bold());
    }
    Ok(())
}

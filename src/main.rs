use std::sync::Arc;
use talon::cli::{Cli, Commands, ToolsAction};
use talon::config::Config;
use talon::entity::RawInput;
use talon::error::{Result, TalonError};
use talon::events::TracingSink;
use talon::runtime::{CancelToken, ContainerRuntime, DockerRuntime};
use talon::tool::{LaunchOptions, Maigret, SecretStore, Shodan, Subfinder, ToolAdapter};
use talon::transform::{
    run_transform, DomainSubdomains, IpToAsn, ScanContext, TransformRegistry, UsernameProfiles,
};

fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse_args();
    let config = load_config(cli.config.clone())?;

    match cli.command {
        Commands::Tools { action } => cmd_tools(&config, action)?,
        Commands::Schema { transform, output } => cmd_schema(&config, &transform, output)?,
        Commands::Run {
            transform,
            target,
            sketch,
            scan,
            timeout,
        } => cmd_run(&config, &transform, target, sketch, scan, timeout)?,
    }

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("talon=info"));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn load_config(config_path: Option<std::path::PathBuf>) -> Result<Config> {
    let path = config_path.unwrap_or_else(Config::default_path);

    if !path.exists() {
        tracing::warn!("Config file not found at {:?}, using defaults", path);
        return Ok(Config::default());
    }

    Config::load(&path)
}

fn build_runtime(config: &Config) -> Arc<dyn ContainerRuntime> {
    Arc::new(DockerRuntime::new(
        config.runtime.engine.clone(),
        config.pull_timeout(),
    ))
}

fn build_adapters(
    runtime: &Arc<dyn ContainerRuntime>,
    secrets: &SecretStore,
) -> Vec<Arc<dyn ToolAdapter>> {
    vec![
        Arc::new(Subfinder::new(Arc::clone(runtime))),
        Arc::new(Maigret::new(Arc::clone(runtime))),
        Arc::new(Shodan::new(Arc::clone(runtime), secrets.clone())),
    ]
}

fn build_registry(
    runtime: &Arc<dyn ContainerRuntime>,
    secrets: &SecretStore,
) -> TransformRegistry {
    let mut registry = TransformRegistry::new();
    registry.register(Arc::new(DomainSubdomains::new(Arc::new(Subfinder::new(
        Arc::clone(runtime),
    )))));
    registry.register(Arc::new(UsernameProfiles::new(Arc::new(Maigret::new(
        Arc::clone(runtime),
    )))));
    registry.register(Arc::new(IpToAsn::new(Arc::new(Shodan::new(
        Arc::clone(runtime),
        secrets.clone(),
    )))));
    registry
}

fn find_adapter(
    adapters: &[Arc<dyn ToolAdapter>],
    name: &str,
) -> Result<Arc<dyn ToolAdapter>> {
    adapters
        .iter()
        .find(|a| a.name() == name)
        .cloned()
        .ok_or_else(|| TalonError::InvalidArgument(format!("unknown tool '{name}'")))
}

fn cmd_tools(config: &Config, action: ToolsAction) -> Result<()> {
    let runtime = build_runtime(config);
    let adapters = build_adapters(&runtime, &config.secret_store());

    match action {
        ToolsAction::List => {
            println!("{:<12} {:<16} {:<10} DESCRIPTION", "NAME", "CATEGORY", "INSTALLED");
            for adapter in &adapters {
                println!(
                    "{:<12} {:<16} {:<10} {}",
                    adapter.name(),
                    adapter.category().as_str(),
                    if adapter.is_installed() { "yes" } else { "no" },
                    adapter.description()
                );
            }
        }
        ToolsAction::Install { name } => {
            let adapter = find_adapter(&adapters, &name)?;
            adapter.install()?;
            println!("✓ {} installed ({})", adapter.name(), adapter.image());
        }
        ToolsAction::Version { name } => {
            let adapter = find_adapter(&adapters, &name)?;
            println!("{} {}", adapter.name(), adapter.version()?);
        }
    }

    Ok(())
}

fn cmd_schema(config: &Config, transform_name: &str, output: bool) -> Result<()> {
    let runtime = build_runtime(config);
    let registry = build_registry(&runtime, &config.secret_store());

    let transform = registry.get(transform_name).ok_or_else(|| {
        TalonError::InvalidArgument(format!(
            "unknown transform '{}' (available: {:?})",
            transform_name,
            registry.names()
        ))
    })?;

    let schema = if output {
        transform.output_schema()
    } else {
        transform.input_schema()
    };

    let json = serde_json::to_string_pretty(&schema).map_err(|e| TalonError::Json {
        source: e,
        context: "Failed to serialize schema".to_string(),
    })?;
    println!("{json}");

    Ok(())
}

fn cmd_run(
    config: &Config,
    transform_name: &str,
    targets: Vec<String>,
    sketch: String,
    scan: Option<String>,
    timeout: Option<u64>,
) -> Result<()> {
    let runtime = build_runtime(config);
    let registry = build_registry(&runtime, &config.secret_store());

    let transform = registry.get(transform_name).ok_or_else(|| {
        TalonError::InvalidArgument(format!(
            "unknown transform '{}' (available: {:?})",
            transform_name,
            registry.names()
        ))
    })?;

    let ctx = ScanContext {
        sketch_id: sketch,
        scan_id: scan.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
    };
    let raw: Vec<RawInput> = targets.into_iter().map(RawInput::from).collect();
    let opts = LaunchOptions {
        timeout: timeout
            .map(std::time::Duration::from_secs)
            .unwrap_or_else(|| config.launch_timeout()),
        cancel: CancelToken::new(),
    };

    let workers = config.executor.workers;
    let sink = Arc::new(TracingSink);

    let rt = tokio::runtime::Runtime::new().map_err(|e| TalonError::Io {
        source: e,
        context: "Failed to create tokio runtime".to_string(),
    })?;
    let outcome = rt.block_on(run_transform(transform, ctx, raw, sink, workers, opts))?;

    println!(
        "✓ {} produced {} entities ({} filtered)",
        transform_name,
        outcome.entities.len(),
        outcome.filtered
    );
    for entity in &outcome.entities {
        let json = serde_json::to_string(entity).map_err(|e| TalonError::Json {
            source: e,
            context: "Failed to serialize entity".to_string(),
        })?;
        println!("{json}");
    }

    Ok(())
}

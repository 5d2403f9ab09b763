mod cli;
mod repl;
mod setup;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use spark_client::{ChatSession, Credentials, Endpoint, SessionConfig, WsTransport};
use spark_common::SparkError;
use spark_config::schema::SparkConfig;
use spark_config::{toml_loader, validation};
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

/// Turn `--log-level` or the configured level into a filter directive.
/// A bare level applies to the spark crates only.
fn log_directive(arg: Option<&str>, config: &SparkConfig) -> String {
    match arg {
        Some(d) if d.contains('=') || d.contains(',') => d.to_string(),
        Some(level) => format!("spark={level}"),
        None => format!("spark={}", config.logging.level.as_directive()),
    }
}

/// `--log-level` wins over `RUST_LOG`, which wins over the config file.
fn init_logging(arg: Option<&str>, config: &SparkConfig) {
    let directive = log_directive(arg, config);
    let filter = match arg {
        Some(_) => EnvFilter::new(&directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directive)),
    };
    // Replies stream to stdout; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

/// Map the file configuration onto a session configuration.
fn session_config(config: &SparkConfig) -> SessionConfig {
    let model = &config.model;
    let mut endpoint = Endpoint::for_version(model.version);
    if let Some(domain) = &model.domain {
        endpoint.domain = domain.clone();
    }
    if let Some(url) = &model.url {
        endpoint.url = url.clone();
    }

    let creds = &config.credentials;
    let session = &config.session;
    let mut out = SessionConfig::new(
        Credentials::new(&creds.app_id, &creds.api_key, &creds.api_secret),
        endpoint,
    )
    .with_temperature(model.temperature)
    .with_max_tokens(model.max_tokens)
    .with_top_k(model.top_k)
    .with_history_budget(session.history_budget)
    .with_reconnect_on_complete(session.reconnect_on_complete)
    .with_response_timeout(Duration::from_secs(session.response_timeout_secs));

    if let Some(prompt) = &session.system_prompt {
        out = out.with_system_prompt(prompt.clone());
    }
    if let Some(path) = session.transcript_path() {
        out = out.with_persist_history(path);
    }
    out
}

fn build_session(config: &SparkConfig) -> Result<ChatSession, SparkError> {
    let transport = WsTransport::new()
        .with_connect_timeout(Duration::from_secs(config.session.connect_timeout_secs));
    ChatSession::new(session_config(config), Arc::new(transport))
        .map_err(|e| SparkError::Chat(e.to_string()))
}

/// Run interactive setup and persist the answers.
fn run_setup(config: &mut SparkConfig, path: &Path) -> Result<(), SparkError> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout();
    setup::run(config, &mut input, &mut output)?;
    spark_config::save_config_to_path(config, path)?;
    tracing::info!("Config saved to {}", path.display());
    Ok(())
}

async fn run(args: cli::Args, mut config: SparkConfig, path: &Path) -> Result<(), SparkError> {
    if args.setup || !config.credentials.is_complete() {
        run_setup(&mut config, path)?;
    }
    if let Some(version) = args.model {
        config.model.version = version;
    }
    validation::validate(&config)?;

    let mut session = build_session(&config)?;
    tracing::info!(
        model = %config.model.version,
        chat_id = %session.chat_id(),
        "Session ready"
    );

    let input = BufReader::new(tokio::io::stdin());
    let mut output = std::io::stdout();
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };
    repl::run(
        &mut session,
        input,
        &mut output,
        &config.session.exit_keyword,
        shutdown,
    )
    .await
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    // Config is loaded before logging so its level can apply; load errors
    // are reported on stderr directly.
    let path = match toml_loader::config_path(args.config.as_deref()) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("spark: {e}");
            return ExitCode::FAILURE;
        }
    };
    let config = match toml_loader::load_or_create(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("spark: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(args.log_level.as_deref(), &config);
    tracing::info!("spark v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Using config {}", path.display());

    match run(args, config, &path).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("spark: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spark_common::ModelVersion;

    fn complete_config() -> SparkConfig {
        let mut config = SparkConfig::default();
        config.credentials.app_id = "app".into();
        config.credentials.api_key = "key".into();
        config.credentials.api_secret = "secret".into();
        config
    }

    #[test]
    fn log_directive_precedence() {
        let mut config = SparkConfig::default();
        assert_eq!(log_directive(None, &config), "spark=info");
        config.logging.level = spark_config::schema::LogLevel::Debug;
        assert_eq!(log_directive(None, &config), "spark=debug");
        assert_eq!(log_directive(Some("trace"), &config), "spark=trace");
        assert_eq!(
            log_directive(Some("spark_client=trace"), &config),
            "spark_client=trace"
        );
    }

    #[test]
    fn session_config_follows_file_config() {
        let mut config = complete_config();
        config.model.version = ModelVersion::V1_5;
        config.model.top_k = 2;
        config.session.reconnect_on_complete = false;
        config.session.system_prompt = Some("be brief".into());

        let session = session_config(&config);
        assert_eq!(session.endpoint, Endpoint::for_version(ModelVersion::V1_5));
        assert_eq!(session.top_k, 2);
        assert!(!session.reconnect_on_complete);
        assert_eq!(session.system_prompt.as_deref(), Some("be brief"));
        assert!(session.persist_history.is_none());
        assert_eq!(session.credentials.app_id, "app");
    }

    #[test]
    fn endpoint_overrides_apply() {
        let mut config = complete_config();
        config.model.domain = Some("custom".into());
        config.model.url = Some("ws://127.0.0.1:9000/chat".into());

        let session = session_config(&config);
        assert_eq!(session.endpoint.domain, "custom");
        assert_eq!(session.endpoint.url, "ws://127.0.0.1:9000/chat");
    }

    #[test]
    fn transcript_enabled_by_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = complete_config();
        config.session.persist_history = true;
        config.session.history_file = Some(dir.path().join("history.txt"));

        let session = session_config(&config);
        assert_eq!(session.persist_history, Some(dir.path().join("history.txt")));
    }

    #[test]
    fn build_session_rejects_bad_endpoint() {
        let mut config = complete_config();
        config.model.url = Some("https://not-a-websocket".into());
        assert!(matches!(build_session(&config), Err(SparkError::Chat(_))));
    }
}

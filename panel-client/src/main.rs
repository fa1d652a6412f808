//! llm-panel - command-line control panel for a remote inference server.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use panel_client::control::{START_SUCCESS_MESSAGE, STOP_SUCCESS_MESSAGE};
use panel_client::{Config, ControlApi, ControlPanel, HttpGateway, Theme, TokioScheduler, View};
use panel_common::{AllowlistField, ServerConfig, ServerStatus, SystemStats, PREDEFINED_CATALOG};

/// Control a remote llama.cpp server through its control backend.
#[derive(Parser)]
#[command(name = "llm-panel", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Follow server status and utilization until interrupted.
    Watch {
        /// Also tail the server log.
        #[arg(long)]
        logs: bool,
    },

    /// Start the inference server.
    Start(StartArgs),

    /// Stop the inference server.
    Stop,

    /// List installed models and the predefined catalog.
    Models,

    /// Have the backend download a model.
    Download(DownloadArgs),

    /// Show or change the IP allowlists.
    Allowlist {
        #[command(subcommand)]
        action: AllowlistAction,
    },
}

/// Overrides for the `[server]` section of the configuration.
#[derive(Args)]
struct StartArgs {
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    /// GPU layers to offload.
    #[arg(long)]
    ngl: Option<i32>,
    #[arg(long)]
    template: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    custom_params: Option<String>,
}

impl StartArgs {
    fn apply(self, mut server: ServerConfig) -> ServerConfig {
        if let Some(model) = self.model {
            server.model = model;
        }
        if let Some(host) = self.host {
            server.host = host;
        }
        if let Some(port) = self.port {
            server.port = port;
        }
        if let Some(ngl) = self.ngl {
            server.ngl = ngl;
        }
        if let Some(template) = self.template {
            server.template = template;
        }
        if let Some(custom_params) = self.custom_params {
            server.custom_params = custom_params;
        }
        server
    }
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct DownloadArgs {
    /// Name of a predefined catalog entry (see `models`).
    #[arg(long)]
    catalog: Option<String>,
    /// Arbitrary model URL.
    #[arg(long)]
    url: Option<String>,
}

#[derive(Subcommand)]
enum AllowlistAction {
    /// Print the current allowlists.
    Show,
    /// Replace one or both allowlists.
    Set {
        #[arg(long)]
        control_panel: Option<String>,
        #[arg(long)]
        llm_server: Option<String>,
    },
}

/// Output decoration picked by the configured theme.
struct Style {
    theme: Theme,
}

impl Style {
    fn heading(&self, text: &str) -> String {
        match self.theme {
            Theme::Cyberpunk => format!("//// {} ////", text.to_uppercase()),
            Theme::Corporate => format!("{}:", text),
        }
    }

    fn status(&self, status: ServerStatus) -> String {
        match self.theme {
            Theme::Cyberpunk => format!(">> server {}", status.to_string().to_uppercase()),
            Theme::Corporate => format!("Server status: {}", status),
        }
    }

    fn stats(&self, stats: &SystemStats) -> String {
        match self.theme {
            Theme::Cyberpunk => format!(
                ">> cpu {:5.1}% | ram {:5.1}% | gpu {:5.1}%",
                stats.cpu, stats.ram, stats.gpu
            ),
            Theme::Corporate => format!(
                "CPU {:.1}%, RAM {:.1}%, GPU {:.1}%",
                stats.cpu, stats.ram, stats.gpu
            ),
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load(cli.config.as_deref()).map_err(|e| {
        format!(
            "Failed to load configuration: {}. \
             Pass --config or set PANEL__BACKEND__BASE_URL.",
            e
        )
    })?;
    tracing::debug!("Using control backend at {}", config.backend.base_url);

    let api: Arc<dyn ControlApi> = Arc::new(HttpGateway::with_timeout(
        &config.backend.base_url,
        config.http.timeout(),
    )?);
    let panel = ControlPanel::new(api, Arc::new(TokioScheduler), &config.polling);
    let style = Style {
        theme: config.ui.theme,
    };

    let ok = match cli.command {
        Command::Watch { logs } => watch(&panel, &style, logs).await?,
        Command::Start(args) => start(&panel, args.apply(config.server.clone())).await,
        Command::Stop => stop(&panel).await,
        Command::Models => models(&panel, &style).await,
        Command::Download(args) => download(&panel, args).await,
        Command::Allowlist { action } => allowlist(&panel, &style, action).await,
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn watch(panel: &ControlPanel, style: &Style, logs: bool) -> Result<bool, Box<dyn std::error::Error>> {
    let mut status = panel.subscribe_status();
    let mut stats = panel.stats_poller().subscribe();
    let mut log_buffer = panel.log_tailer().subscribe();

    panel.mount();
    if logs {
        panel.set_view(View::Logs);
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result?;
                break;
            }
            Ok(()) = status.changed() => {
                println!("{}", style.status(*status.borrow_and_update()));
            }
            Ok(()) = stats.changed() => {
                println!("{}", style.stats(&stats.borrow_and_update()));
            }
            Ok(()) = log_buffer.changed(), if logs => {
                println!("{}", style.heading("logs"));
                println!("{}", log_buffer.borrow_and_update().display());
            }
        }
    }

    panel.unmount();
    Ok(true)
}

/// Mount the pollers and wait until the server state is known.
async fn observe(panel: &ControlPanel) {
    panel.mount();
    let status = panel.first_status().await;
    tracing::debug!("Observed server status: {}", status);
    panel.lifecycle().reconcile();
}

async fn start(panel: &ControlPanel, server: ServerConfig) -> bool {
    observe(panel).await;
    report_command(panel, panel.lifecycle().start(&server).await, START_SUCCESS_MESSAGE)
}

async fn stop(panel: &ControlPanel) -> bool {
    observe(panel).await;
    report_command(panel, panel.lifecycle().stop().await, STOP_SUCCESS_MESSAGE)
}

fn report_command(panel: &ControlPanel, result: panel_client::Result<()>, success: &str) -> bool {
    match result {
        Ok(()) => {
            println!("{}", success);
            true
        }
        Err(e) => {
            // Command failures carry the operator message in the lifecycle state.
            let state = panel.lifecycle().state();
            match state.error_message() {
                Some(message) => eprintln!("{}", message),
                None => eprintln!("{}", e),
            }
            false
        }
    }
}

async fn models(panel: &ControlPanel, style: &Style) -> bool {
    panel.catalog().resolve().await;

    println!("{}", style.heading("installed models"));
    let installed = panel.catalog().models();
    if installed.is_empty() {
        println!("  (none reported)");
    }
    for model in installed {
        println!("  {}", model);
    }

    for group in PREDEFINED_CATALOG {
        println!("{}", style.heading(group.label));
        for entry in group.entries {
            println!("  {:<30} {}", entry.name, entry.filename);
        }
    }
    true
}

async fn download(panel: &ControlPanel, args: DownloadArgs) -> bool {
    let controller = panel.download();
    if let Some(name) = args.catalog {
        if let Err(e) = controller.select(&name) {
            eprintln!("{}", e);
            return false;
        }
    } else if let Some(url) = args.url {
        controller.set_url(url);
    }

    match controller.download().await {
        Ok(message) => {
            println!("{}", message);
            true
        }
        Err(e) => {
            eprintln!("Failed to download model: {}", e);
            false
        }
    }
}

async fn allowlist(panel: &ControlPanel, style: &Style, action: AllowlistAction) -> bool {
    let manager = panel.allowlist();
    let current = match manager.load().await {
        Ok(current) => current,
        Err(e) => {
            eprintln!("Failed to fetch allowlist: {}", e);
            return false;
        }
    };

    match action {
        AllowlistAction::Show => {
            println!("{}", style.heading("allowlists"));
            for field in AllowlistField::ALL {
                println!("  {:<14} {}", field.to_string(), current.get(field));
            }
            true
        }
        AllowlistAction::Set {
            control_panel,
            llm_server,
        } => {
            if let Some(value) = control_panel {
                manager.propose(AllowlistField::ControlPanel, value);
            }
            if let Some(value) = llm_server {
                manager.propose(AllowlistField::LlmServer, value);
            }

            match manager.submit().await {
                Ok(update) => {
                    println!("{}", update.message());
                    true
                }
                Err(e) => {
                    eprintln!("{}", e);
                    false
                }
            }
        }
    }
}

use clap::Parser;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use user_import::config::AppConfig;
use user_import::logging::init_tracing;
use user_import::startup::build_app;

#[derive(Parser, Debug)]
#[command(name = "user-import")]
#[command(about = "Reconciles batches of external user records with the user directory")]
struct Args {
    /// Configuration file path (default: config.yaml)
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Port to listen on (overrides config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to (overrides config file)
    #[arg(long)]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let (mut app_config, using_defaults) =
        if args.config == "config.yaml" && !std::path::Path::new("config.yaml").exists() {
            (AppConfig::default_config(), true)
        } else {
            let config = AppConfig::load_from_file(&args.config)
                .map_err(|e| format!("Failed to load configuration: {}", e))?;
            (config, false)
        };

    if let Some(port) = args.port {
        app_config.server.port = port;
    }
    if let Some(host) = args.host {
        app_config.server.host = host;
    }

    init_tracing(&app_config.logging.level);

    if using_defaults {
        println!("⚠️  No config.yaml found, using default configuration:");
        println!("   - In-memory SQLite directory (empty reference data)");
        println!("   - Default source type: {}", app_config.import.default_source_type);
        println!("   - Sequential record processing\n");
    } else {
        println!("🔧 Configuration loaded:");
        println!("   Server: {}:{}", app_config.server.host, app_config.server.port);
        if let Some(db_config) = &app_config.backend.database {
            println!("   Backend: database/{} ({})", db_config.db_type, db_config.url);
        }
        println!(
            "   Import: source type '{}', max concurrency {}",
            app_config.import.default_source_type, app_config.import.max_concurrency
        );
    }

    let app = build_app(&app_config).await?;

    let host: std::net::IpAddr = app_config.server.host.parse().unwrap_or_else(|_| {
        eprintln!("Invalid host address: {}, using 127.0.0.1", app_config.server.host);
        [127, 0, 0, 1].into()
    });
    let addr = SocketAddr::from((host, app_config.server.port));
    info!(%addr, "User import service listening");
    println!("🚀 User import service listening on {}", addr);
    println!("   📥 Import: POST http://{}/user-import", addr);
    println!("   ❤️  Health: GET http://{}/health", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

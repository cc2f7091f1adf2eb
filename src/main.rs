use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use communifridge::cli::{self, RoleKind};
use communifridge::config::Config;
use communifridge::{build_app, db};

#[derive(Parser)]
#[command(name = "communifridge")]
#[command(about = "Community fridge donations and reservations service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,

    /// Register a person with a role and print their access code
    CreatePerson {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long, value_enum, default_value = "user")]
        role: RoleKind,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Cli::parse();
    let config = Config::from_env()?;
    let pool = db::init_pool(&config).await?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let app = build_app(pool, &config).await?;
            let listener = TcpListener::bind(config.bind_addr).await?;

            tracing::info!("listening on {}", config.bind_addr);
            axum::serve(listener, app).await?;
        }
        Command::CreatePerson { name, email, role } => {
            let created = cli::create_person(&pool, &name, &email, role).await?;
            println!("Created {}:", role);
            println!("  Person ID: {}", created.person.id);
            println!("  {} ID: {}", role, created.role_id);
            println!("  Name: {}", created.person.name);
            println!("  Access Code: {}", created.person.access_code);
        }
    }

    Ok(())
}

use assistant_widget::settings::{resolve_effective_settings, EffectiveSettings, WidgetSettings};
use assistant_widget::storage::SqliteKeyValueStore;
use assistant_widget::{AssistantReply, ChatSession, HttpChatTransport};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "assistant_widget")]
#[command(about = "Chat with a remote shopping assistant", long_about = None)]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct Overrides {
    /// Assistant endpoint messages are posted to
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[arg(long, global = true)]
    title: Option<String>,
    #[arg(long, global = true)]
    primary_color: Option<String>,
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    /// sqlite url for identifier storage
    #[arg(long, global = true)]
    database_url: Option<String>,
}

impl From<Overrides> for WidgetSettings {
    fn from(o: Overrides) -> Self {
        Self {
            api_url: o.api_url,
            title: o.title,
            primary_color: o.primary_color,
            timeout_secs: o.timeout_secs,
            database_url: o.database_url,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Send one message and print the reply
    Send { message: String },
    /// Print prior turns of the current chat
    History,
    /// Forget the current chat; the session id is kept
    Reset,
    /// Print stored identifiers
    Ids,
    /// Print the effective widget configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let settings = resolve_effective_settings(
        &WidgetSettings::defaults(),
        &WidgetSettings::from_env()?,
        &cli.overrides.into(),
    )?;

    if let Commands::Config = cli.command {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    let session = open_session(&settings).await?;
    session.init().await?;

    match cli.command {
        Commands::Send { message } => {
            let reply = session.send(&message).await?;
            print_reply(&settings, &reply);
        }
        Commands::History => {
            let Ok(history) = session.load_history().await;
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
        Commands::Reset => {
            session.reset().await?;
            println!("chat reset");
        }
        Commands::Ids => {
            println!("{}", serde_json::to_string_pretty(&session.identities().await?)?);
        }
        Commands::Config => {}
    }
    Ok(())
}

async fn open_session(
    settings: &EffectiveSettings,
) -> anyhow::Result<ChatSession<SqliteKeyValueStore, HttpChatTransport>> {
    let store = SqliteKeyValueStore::initialize(settings.database_url.clone()).await?;
    let transport = HttpChatTransport::new(settings.timeout())?;
    Ok(ChatSession::new(store, transport, settings.api_url.clone()))
}

fn print_reply(settings: &EffectiveSettings, reply: &AssistantReply) {
    println!("{}: {}", settings.title, reply.message);
    for p in &reply.products {
        let brand = p.brand.as_deref().map(|b| format!(" ({})", b)).unwrap_or_default();
        println!("  - [{}] {}{} ${:.2}", p.id, p.name, brand, p.price);
        if let Some(url) = &p.url {
            println!("    {}", url);
        }
    }
}

use poise::serenity_prelude::{self as serenity};
use rejoin_warden::{BOT_NAME, Config, Data, Error, commands, handlers, health, logging};
use serenity::GatewayIntents;
use tracing::{error, info};

/// Main function to run the bot
async fn async_main() -> Result<(), Error> {
    // .env may carry RUST_LOG, so load it before the subscriber
    dotenvy::dotenv().ok();
    logging::init()?;

    let config = Config::from_env()?;
    info!("Starting {BOT_NAME} with {config:?}");

    let token = config.token.clone();
    let prefix = config.command_prefix.clone();
    let port = config.port;

    // Load stored rejoin counts before connecting so no event sees an empty store
    let data = Data::load(config).await?;

    health::spawn(port);

    let framework_data = data.clone();
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(prefix),
                mention_as_prefix: false,
                case_insensitive_commands: true,
                ..Default::default()
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    logging::log_command_start(ctx);
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    logging::log_command_end(ctx);
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    logging::log_command_error(&error);
                })
            },
            ..Default::default()
        })
        .setup(move |_ctx, _ready, _framework| {
            Box::pin(async move {
                logging::log_console("Framework ready, prefix commands registered");
                Ok(framework_data)
            })
        })
        .build();

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;
    let mut client = serenity::ClientBuilder::new(token, intents)
        .event_handler(handlers::Handler::new(data))
        .framework(framework)
        .await?;

    info!("Connecting to Discord...");
    if let Err(err) = client.start().await {
        error!("Failed to login: {err}");
    }

    Ok(())
}

fn main() {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Failed to start the async runtime: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(async_main()) {
        error!("Startup failed: {err}");
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

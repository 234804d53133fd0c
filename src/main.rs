use tracing::{error, info, Level};

use webpush_dispatch::{
    configuration::{
        get_configuration, set_configuration, AppState, Config, State,
    },
    error::Error,
    handler::retention,
    provider::DatabasePool,
    server,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = match init() {
        Ok(config) => config,
        Err(err) => {
            set_subscriber(Level::INFO)?;
            error!("{}", err);
            return Err(err);
        },
    };

    set_subscriber(config.log_level)?;

    let result = app_main(config).await;

    if let Err(err) = &result {
        error!("{}", err);
    }

    result
}

fn set_subscriber(level: Level) -> Result<(), Error> {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_level(true)
        .with_max_level(level)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

async fn app_main(config: Config) -> Result<(), Error> {
    let database = DatabasePool::new(&config).await?;
    database.init_migrations().await?;

    let state = State::new(config, database.subscription.clone())?;
    let app_state = AppState::new(state);

    info!(
        "Push service listening on {}:{}",
        app_state.config.server_host, app_state.config.port
    );

    let (_, _) = tokio::try_join!(
        server::server_task(&app_state),
        retention::retention_task(app_state.clone()),
    )?;

    Ok(())
}

fn init() -> Result<Config, Error> {
    set_configuration()?;
    let config = get_configuration()?;
    Ok(config)
}


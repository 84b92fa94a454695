//! Connection setup for MongoDB
//!
//! Turns a [`ConnectionConfig`] into a ready [`MongoStore`]. The driver
//! pools connections itself, so a store is cheap to clone and share.

use mongodb::Client;
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::error::Result;
use crate::store::MongoStore;

/// Connect to the server described by `config`
///
/// # Arguments
/// * `config` - Connection configuration (URI, database, timeout)
///
/// # Returns
/// * `Result<MongoStore>` - Store bound to `config.database`
pub async fn connect(config: &ConnectionConfig) -> Result<MongoStore> {
    config.validate_uri()?;

    let options = client_options(config).await?;
    let client = Client::with_options(options)?;
    info!("Connected client for database '{}'", config.database);

    Ok(MongoStore::new(client, &config.database))
}

/// Connect and verify the server answers a ping
pub async fn connect_checked(config: &ConnectionConfig) -> Result<MongoStore> {
    let store = connect(config).await?;
    ping(&store).await?;
    Ok(store)
}

/// Send a ping command to the store's database
pub async fn ping(store: &MongoStore) -> Result<()> {
    store.database().run_command(doc! { "ping": 1 }).await?;
    debug!("Ping to '{}' succeeded", store.database().name());
    Ok(())
}

/// Parse the URI and apply timeouts and app name
async fn client_options(config: &ConnectionConfig) -> Result<ClientOptions> {
    let mut options = ClientOptions::parse(&config.uri).await?;
    options.connect_timeout = Some(config.timeout());
    options.server_selection_timeout = Some(config.timeout());
    if let Some(app_name) = &config.app_name {
        options.app_name = Some(app_name.clone());
    }
    Ok(options)
}

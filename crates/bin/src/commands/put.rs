//! Put command - stores a single value.

use keeper::{ConfigurationClient, KeeperClient, kv::path};

use crate::cli::PutArgs;

/// Run the put command
pub async fn run(client: &KeeperClient, args: &PutArgs) -> Result<(), Box<dyn std::error::Error>> {
    client
        .put_configuration_value(&args.path, args.value.as_bytes())
        .await?;
    println!("stored {}", path::join(client.base_path(), &args.path));
    Ok(())
}

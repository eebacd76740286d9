//! Keys command - lists keys below a path.

use keeper::{ConfigurationClient, KeeperClient};

use crate::cli::KeysArgs;

/// Run the keys command
pub async fn run(client: &KeeperClient, args: &KeysArgs) -> Result<(), Box<dyn std::error::Error>> {
    let keys = match client.get_configuration_keys(&args.path).await {
        Ok(keys) => keys,
        Err(e) if e.is_not_found() => {
            eprintln!("no keys found");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    for key in keys {
        println!("{key}");
    }
    Ok(())
}

//! Ping command - checks that the keeper answers.

use keeper::{KeeperClient, transport::KeeperTransport};

/// Run the ping command
pub async fn run(client: &KeeperClient) -> Result<(), Box<dyn std::error::Error>> {
    match client.transport().ping().await {
        Ok(()) => {
            println!("alive");
            Ok(())
        }
        Err(e) => {
            eprintln!("unreachable: {e}");
            std::process::exit(1);
        }
    }
}

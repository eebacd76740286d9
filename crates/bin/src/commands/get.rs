//! Get command - shows stored values below a path.

use keeper::{KeeperClient, codec, kv::path, transport::KeeperTransport};

use crate::cli::GetArgs;
use crate::output::{OutputFormat, print_table};

/// Run the get command
pub async fn run(client: &KeeperClient, args: &GetArgs) -> Result<(), Box<dyn std::error::Error>> {
    let full_path = path::join(client.base_path(), &args.path);
    let pairs = match client.transport().get(&full_path).await {
        Ok(pairs) => pairs,
        Err(e) if e.is_not_found() => {
            eprintln!("nothing stored under '{full_path}'");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    match OutputFormat::from_json_flag(args.json) {
        OutputFormat::Human => {
            let rows: Vec<Vec<String>> = pairs
                .iter()
                .map(|pair| vec![pair.key.clone(), pair.rendered()])
                .collect();
            print_table(&["KEY", "VALUE"], &rows);
        }
        OutputFormat::Json => {
            let value = codec::decode_value(&full_path, &pairs)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }

    Ok(())
}

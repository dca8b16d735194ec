use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use shared::domain::ItemDraft;
use storage::Storage;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite://./data/dashboard.db"
    )]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Appends COUNT sample items.
    Seed {
        #[arg(default_value_t = 5)]
        count: u32,
    },
    List,
    /// Renumbers sort_order to 0..n-1 keeping the current order.
    Compact,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url)
        .await
        .with_context(|| format!("failed to open {}", cli.database_url))?;

    match cli.command {
        Command::Seed { count } => {
            let now = Utc::now();
            for n in 1..=count {
                let draft = ItemDraft {
                    name: format!("Sample item {n}"),
                    quantity: i64::from(n) * 3,
                    price: f64::from(n) * 2.5,
                    date: now - Duration::days(i64::from(n)),
                };
                draft.validate()?;
                let item = storage.create_item(&draft).await?;
                println!("created item_id={} sort_order={}", item.id, item.sort_order);
            }
        }
        Command::List => {
            for item in storage.list_items().await? {
                println!(
                    "{:>4} {:>4}  {} (qty {}, {:.2})",
                    item.sort_order, item.id.0, item.name, item.quantity, item.price
                );
            }
        }
        Command::Compact => {
            let updated = storage.compact_sort_order().await?;
            println!("renumbered {updated} items");
        }
    }

    Ok(())
}

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use client_core::{
    CollectionEvent, DashboardClient, DragKey, ItemForm, KeyboardSensor, MoveRequest, MoveSensor,
    ReorderOutcome, SensorInput,
};
use shared::domain::{Item, ItemId, VideoId};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Inventory dashboard client")]
struct Cli {
    #[arg(long, env = "DASHBOARD_SERVER_URL", default_value = "http://127.0.0.1:8000")]
    server_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prints items in display order.
    List,
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        quantity: String,
        #[arg(long)]
        price: String,
        /// RFC 3339 timestamp; defaults to now.
        #[arg(long)]
        date: Option<String>,
    },
    /// Changes the given fields and keeps the rest.
    Edit {
        item_id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        quantity: Option<String>,
        #[arg(long)]
        price: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    Delete {
        item_id: i64,
    },
    /// Moves SOURCE into the slot currently held by TARGET.
    Move {
        source_id: i64,
        target_id: i64,
    },
    /// Moves an item by OFFSET slots, as if dragged with the keyboard.
    Nudge {
        item_id: i64,
        #[arg(allow_negative_numbers = true)]
        offset: i64,
    },
    #[command(subcommand)]
    Videos(VideoCommand),
}

#[derive(Subcommand, Debug)]
enum VideoCommand {
    List,
    Upload { path: PathBuf },
    Delete { video_id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let client = DashboardClient::new(&cli.server_url)?;

    match cli.command {
        Command::List => {
            client.items.refresh().await?;
            print_items(&client.items.displayed().await);
        }
        Command::Add {
            name,
            quantity,
            price,
            date,
        } => {
            let form = ItemForm {
                name,
                quantity,
                price,
                date: Some(parse_date(date.as_deref())?),
            };
            client.items.create_item(form.parse()?).await?;
            print_items(&client.items.displayed().await);
        }
        Command::Edit {
            item_id,
            name,
            quantity,
            price,
            date,
        } => {
            let item_id = ItemId(item_id);
            client.items.refresh().await?;
            let displayed = client.items.displayed().await;
            let Some(current) = displayed.iter().find(|item| item.id == item_id) else {
                bail!("item {item_id} not found");
            };

            let mut form = ItemForm::from_item(current);
            if let Some(name) = name {
                form.name = name;
            }
            if let Some(quantity) = quantity {
                form.quantity = quantity;
            }
            if let Some(price) = price {
                form.price = price;
            }
            if date.is_some() {
                form.date = Some(parse_date(date.as_deref())?);
            }
            client.items.update_item(item_id, form.parse()?).await?;
            print_items(&client.items.displayed().await);
        }
        Command::Delete { item_id } => {
            client.items.delete_item(ItemId(item_id)).await?;
            print_items(&client.items.displayed().await);
        }
        Command::Move {
            source_id,
            target_id,
        } => {
            client.items.refresh().await?;
            let request = MoveRequest::new(ItemId(source_id), ItemId(target_id));
            run_move(&client, request).await?;
        }
        Command::Nudge { item_id, offset } => {
            client.items.refresh().await?;
            let order = client.items.displayed_ids().await;
            let Some(request) = keyboard_drag(&order, ItemId(item_id), offset) else {
                println!("nothing to move");
                return Ok(());
            };
            run_move(&client, request).await?;
        }
        Command::Videos(VideoCommand::List) => {
            for video in client.videos.list_videos().await? {
                println!(
                    "{:>4}  {}  {}",
                    video.id.0,
                    video.uploaded_at.format("%Y-%m-%d %H:%M"),
                    video.filename
                );
            }
        }
        Command::Videos(VideoCommand::Upload { path }) => {
            let filename = path
                .file_name()
                .and_then(|name| name.to_str())
                .context("upload path has no file name")?
                .to_string();
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;

            let label = filename.clone();
            let mut last = None;
            let uploaded = client
                .videos
                .upload_video(&filename, bytes, move |pct| {
                    if last != Some(pct) {
                        last = Some(pct);
                        eprint!("\ruploading {label}: {pct:>3}%");
                    }
                })
                .await?;
            eprintln!();
            println!("uploaded video_id={} filename={}", uploaded.id, uploaded.filename);
        }
        Command::Videos(VideoCommand::Delete { video_id }) => {
            client.videos.delete_video(VideoId(video_id)).await?;
            println!("deleted video_id={video_id}");
        }
    }

    Ok(())
}

async fn run_move(client: &DashboardClient, request: MoveRequest) -> Result<()> {
    let mut events = client.items.subscribe();
    let outcome = client.items.move_item(request).await;

    while let Ok(event) = events.try_recv() {
        match event {
            CollectionEvent::OrderChanged { ids, origin } => debug!(?origin, ?ids, "order changed"),
            CollectionEvent::PhaseChanged(phase) => debug!(?phase, "phase changed"),
            CollectionEvent::ReorderFailed { seq, error } => warn!(seq, %error, "reorder failed"),
        }
    }

    match outcome? {
        ReorderOutcome::Unchanged => println!("order unchanged"),
        ReorderOutcome::Committed { .. } | ReorderOutcome::Superseded { .. } => {}
    }
    print_items(&client.items.displayed().await);
    Ok(())
}

/// Replays a keyboard drag: pick up, step `offset` times, drop.
fn keyboard_drag(order: &[ItemId], item_id: ItemId, offset: i64) -> Option<MoveRequest> {
    let mut sensor = KeyboardSensor::new();
    let key = |pressed: DragKey| SensorInput::Key {
        focused: Some(item_id),
        key: pressed,
    };

    sensor.handle(&key(DragKey::Space), order);
    if !sensor.is_dragging() {
        return None;
    }
    let step = if offset < 0 { DragKey::Up } else { DragKey::Down };
    // The sensor saturates at either end, so more steps than items change nothing.
    let steps = offset.unsigned_abs().min(order.len() as u64);
    for _ in 0..steps {
        sensor.handle(&key(step), order);
    }
    sensor.handle(&key(DragKey::Space), order)
}

fn parse_date(raw: Option<&str>) -> Result<DateTime<Utc>> {
    match raw {
        None => Ok(Utc::now()),
        Some(raw) => Ok(DateTime::parse_from_rfc3339(raw.trim())
            .with_context(|| format!("invalid date {raw:?}, expected RFC 3339"))?
            .with_timezone(&Utc)),
    }
}

fn print_items(items: &[Item]) {
    if items.is_empty() {
        println!("no items");
        return;
    }
    println!("{:>4}  {:<24} {:>8} {:>10}  {}", "id", "name", "qty", "price", "date");
    for item in items {
        println!(
            "{:>4}  {:<24} {:>8} {:>10.2}  {}",
            item.id.0,
            item.name,
            item.quantity,
            item.price,
            item.date.format("%Y-%m-%d")
        );
    }
}

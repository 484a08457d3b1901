use std::io::IsTerminal;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();

    tracing_subscriber::fmt()
        .compact()
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let stream = TcpStream::connect(&args.control_addr)
        .await
        .with_context(|| format!("connecting to {}", args.control_addr))?;
    let (read_half, mut write_half) = stream.into_split();

    let join = serde_json::json!({"type": "join", "user": args.name, "room": args.room});
    write_half.write_all(join.to_string().as_bytes()).await?;

    tokio::spawn(async move {
        let mut read_half = read_half;
        let mut buf = [0u8; 4096];
        loop {
            let n = match read_half.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            print_server_message(&buf[..n]);
        }
        println!("(connection closed)");
    });

    println!("joined '{}' as {}. Type a message and press enter.", args.room, args.name);
    println!("commands: /users  /rooms  /ping  /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let outbound = match line.as_str() {
            "/users" => serde_json::json!({"type": "list_users"}),
            "/rooms" => serde_json::json!({"type": "list_rooms"}),
            "/ping" => serde_json::json!({"type": "ping"}),
            "/quit" => {
                write_half
                    .write_all(serde_json::json!({"type": "leave"}).to_string().as_bytes())
                    .await?;
                break;
            }
            payload => serde_json::json!({"type": "text", "payload": payload}),
        };
        write_half.write_all(outbound.to_string().as_bytes()).await?;
    }

    Ok(())
}

fn print_server_message(bytes: &[u8]) {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(bytes) else {
        tracing::debug!("received non-JSON control message, ignoring");
        return;
    };
    match value.get("type").and_then(|t| t.as_str()) {
        Some("text") => println!("{}", value["payload"].as_str().unwrap_or_default()),
        Some("user_list") => println!("users: {}", value["users"]),
        Some("room_list") => println!("rooms: {}", value["rooms"]),
        Some("pong") => println!("(pong)"),
        _ if value.get("status").is_some() => println!("joined room {}", value["room"]),
        _ if value.get("error").is_some() => println!("error: {}", value["error"]),
        _ => println!("{value}"),
    }
}

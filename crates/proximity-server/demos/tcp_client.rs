//! Interactive text-protocol client.
//!
//! `cargo run -p proximity-server --example tcp_client`

use std::env;
use std::io::{self, Write};
use std::time::Duration;

use anyhow::Result;
use proximity_protocol::text_codec::parse_input_line;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

#[tokio::main]
async fn main() -> Result<()> {
    // Where to connect: env override or default.
    let addr = env::var("PROX_CLIENT_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    println!("Connecting to {}...", addr);
    let stream = TcpStream::connect(&addr).await?;
    let (read_half, mut write_half) = stream.into_split();
    let mut replies = BufReader::new(read_half).lines();
    println!("Connected.");
    println!("Type commands like:");
    println!("  A, my-token            (authenticate first)");
    println!("  L, 37.7749, -122.4194  (report location)");
    println!("  N                      (who is nearby?)");
    println!("  M, hello there         (message everyone nearby)");
    println!("  U                      (profile changed)");
    println!("  P                      (ping)");
    println!("Type 'quit' or 'exit' to leave.\n");

    let stdin = io::stdin();

    loop {
        print!(">> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            println!("\nEOF on stdin, exiting client.");
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
            println!("Exiting client.");
            break;
        }

        if let Err(e) = parse_input_line(trimmed) {
            eprintln!("Not a valid command: {}", e);
            continue;
        }

        write_half.write_all(trimmed.as_bytes()).await?;
        write_half.write_all(b"\n").await?;

        // Print everything that arrives shortly after, including relayed
        // messages from nearby users.
        loop {
            match timeout(Duration::from_millis(150), replies.next_line()).await {
                Ok(Ok(Some(reply))) => println!("<< {}", reply),
                Ok(Ok(None)) => {
                    println!("Server closed the connection.");
                    return Ok(());
                }
                Ok(Err(e)) => {
                    eprintln!("Read error: {:?}", e);
                    return Ok(());
                }
                // Timed out waiting for the next line → done for this command.
                Err(_) => break,
            }
        }
    }

    Ok(())
}

//! RelayKV CLI Client
//!
//! Reads `put`, `get` and `delete` commands from stdin and prints replies.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use crossbeam::channel::{self, RecvTimeoutError};
use relaykv::network::{parse_command_line, Client};
use relaykv::protocol::Command;
use relaykv::transport::Context;
use relaykv::Config;
use tracing_subscriber::{fmt, EnvFilter};

/// RelayKV CLI
#[derive(Parser, Debug)]
#[command(name = "relaykv-cli")]
#[command(about = "Interactive client for the RelayKV server")]
#[command(version)]
struct Args {
    /// Server IP address
    ip: String,

    /// Server port
    port: u16,

    /// Client identity (random when omitted)
    #[arg(short, long)]
    identity: Option<String>,

    /// Sleep between empty polls, in milliseconds
    #[arg(short, long, default_value = "33")]
    poll_interval_ms: u64,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    let mut builder = Config::builder()
        .server_addr(format!("{}:{}", args.ip, args.port))
        .poll_interval_ms(args.poll_interval_ms);
    if let Some(identity) = args.identity {
        builder = builder.identity(identity);
    }
    let config = builder.build();

    let ctx = Context::with_config(&config);
    let mut client = match Client::connect(&ctx, &config, |reply| println!("{}", reply.response)) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to connect: {}", e);
            std::process::exit(1);
        }
    };
    println!("{} started ...", String::from_utf8_lossy(client.identity()));

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    if let Err(e) = ctrlc::set_handler(move || handler_stop.store(true, Ordering::Release)) {
        tracing::warn!("Cannot install Ctrl+C handler: {}", e);
    }

    // stdin blocks, so it is read on its own thread
    let (lines_tx, lines) = channel::unbounded();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if lines_tx.send(line).is_err() {
                break;
            }
        }
    });

    while !stop.load(Ordering::Acquire) {
        let line = match lines.recv_timeout(Duration::from_millis(100)) {
            Ok(line) => line,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let Some(command) = parse_command_line(&line) else {
            if !line.trim().is_empty() {
                eprintln!("usage: put <key> <value> | get <key> | delete <key>");
            }
            continue;
        };

        match client.send(&command) {
            Ok(_) => println!("{}", describe(&command)),
            Err(e) => eprintln!("Cannot send command: {}", e),
        }
    }

    // Give replies to the last commands a moment to arrive
    thread::sleep(config.poll_interval() * 3);
    client.stop();
    drop(client);
    ctx.terminate();
}

fn describe(command: &Command) -> String {
    let key = String::from_utf8_lossy(command.key());
    match command {
        Command::Put { value, .. } => {
            format!("sending put command: {}: {}", key, String::from_utf8_lossy(value))
        }
        Command::Get { .. } => format!("sending get command: {}", key),
        Command::Delete { .. } => format!("sending delete command: {}", key),
    }
}

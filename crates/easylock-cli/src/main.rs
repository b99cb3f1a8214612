//! easylock command-line client.
//!
//! Provides the `easylock` binary, which sends one lock request to a running
//! easylock server and prints the server's reply as JSON. Every command
//! identifies its owner by `--app` and `--thread`; an unlock must repeat the
//! pair used to take the lock.

mod client;

use std::process;

use clap::{Args, Parser, Subcommand};

use easylock_core::{LockDuration, LockKind, Owner, Request, Response, TimeUnit};

use client::{ClientError, LockClient};

/// Distributed lock service client.
#[derive(Parser)]
#[command(name = "easylock", about = "Distributed lock service client")]
struct Cli {
    /// Base URL of the easylock server.
    #[arg(
        short,
        long,
        global = true,
        env = "EASYLOCK_SERVER",
        default_value = "http://127.0.0.1:3000"
    )]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Take a lock if it is free, without waiting.
    TryLock(LockArgs),

    /// Wait until the lock is granted. Ctrl-C leaves the queue.
    Lock(LockArgs),

    /// Release a held lock.
    Unlock(LockArgs),

    /// Show every held lock.
    Status,
}

#[derive(Args, Debug)]
struct LockArgs {
    /// Lock key.
    key: String,

    /// Lock kind: simple, reentrant or timeout.
    #[arg(short, long, default_value = "simple")]
    kind: LockKind,

    /// Application part of the owner identity.
    #[arg(short, long, default_value = "easylock-cli")]
    app: String,

    /// Thread part of the owner identity.
    #[arg(short, long, default_value = "main")]
    thread: String,

    /// Numeric requester id echoed back in the reply.
    #[arg(short, long, default_value_t = 0)]
    identity: i32,

    /// Hold time for timeout locks.
    #[arg(short, long)]
    duration: Option<i64>,

    /// Unit of --duration: ns, us, ms, s, m, h or d.
    #[arg(short, long, default_value = "s")]
    unit: TimeUnit,
}

impl LockArgs {
    fn to_request(&self) -> Request {
        let request = Request::new(
            self.key.clone(),
            self.identity,
            Owner::new(self.app.clone(), self.thread.clone()),
            self.kind,
        );
        match self.duration {
            Some(magnitude) => request.with_duration(LockDuration::new(magnitude, self.unit)),
            None => request,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let client = LockClient::new(&cli.server);

    let exit_code = match cli.command {
        Commands::TryLock(args) => report(client.try_lock(&args.to_request()).await),
        Commands::Lock(args) => {
            let request = args.to_request();
            tokio::select! {
                result = client.lock(&request) => report(result),
                _ = tokio::signal::ctrl_c() => {
                    eprintln!("Interrupted while waiting for '{}'", request.key);
                    1
                }
            }
        }
        Commands::Unlock(args) => report(client.unlock(&args.to_request()).await),
        Commands::Status => match client.status().await {
            Ok(body) => {
                print_json(&body);
                0
            }
            Err(e) => fail(e),
        },
    };

    process::exit(exit_code);
}

/// Prints a lock reply and maps it to an exit code.
///
/// 0 = success, 1 = the server refused the operation (busy, expired or not
/// held), 2 = invalid request, 3 = transport error.
fn report(result: Result<Response, ClientError>) -> i32 {
    match result {
        Ok(response) => {
            print_json(&response);
            if response.success {
                0
            } else {
                1
            }
        }
        Err(e) => fail(e),
    }
}

fn fail(err: ClientError) -> i32 {
    eprintln!("Error: {}", err);
    err.exit_code()
}

fn print_json<T: serde::Serialize>(value: &T) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize reply: {}\"}}", e));
    println!("{}", json);
}

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "gmail-relay")]
#[command(about = "Relays Gmail push notifications into message subjects and bodies", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the webhook server (default)
    Serve {
        /// Port to listen on, overrides PORT from the environment
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Resolve a single Pub/Sub payload in the foreground and print the emails
    Replay {
        /// The base64url `message.data` value of a Gmail push notification
        #[arg(short, long)]
        data: String,
    },
}

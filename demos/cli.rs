use clap::{Parser, Subcommand};
use email_verifier_rs::{
    logging, random_login_data, random_mailbox_local, Error, InboxProvider, LinkExtractor,
    MailSlurpClient, Message, APP_BASE_URL,
};
use regex::Regex;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "email-verifier",
    about = "Exercise disposable inboxes and confirmation-link extraction",
    arg_required_else_help = true
)]
struct Cli {
    #[arg(long, help = "Inbox provider API key (defaults to EMAIL_API_KEY)")]
    api_key: Option<String>,

    #[arg(long, help = "Enable debug logging")]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Allocate a disposable inbox
    Create,
    /// Wait for the next message in an inbox and show any confirmation link
    Wait {
        #[arg(long)]
        inbox_id: String,
        #[arg(long, default_value_t = 80)]
        timeout_secs: u64,
    },
    /// Extract a confirmation link from pasted bodies
    Extract {
        #[arg(long, default_value = "")]
        text: String,
        #[arg(long, default_value = "")]
        html: String,
        #[arg(long, help = "Custom link pattern overriding the default chain")]
        pattern: Option<String>,
        #[arg(long, default_value = APP_BASE_URL)]
        app_url: String,
    },
    /// Delete a disposable inbox
    Delete {
        #[arg(long)]
        inbox_id: String,
    },
    /// Print a random signup identity
    Identity,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    logging::init(cli.debug);

    match cli.command {
        Commands::Create => {
            let client = build_client(cli.api_key)?;
            let mailbox = client.create_inbox().await?;
            println!("Inbox ID: {}", mailbox.id);
            println!("Address:  {}", mailbox.address);
        }
        Commands::Wait {
            inbox_id,
            timeout_secs,
        } => {
            let client = build_client(cli.api_key)?;
            let summary = client
                .wait_for_next_message(&inbox_id, Duration::from_secs(timeout_secs), true)
                .await?;
            let message = client.fetch_message(&summary.id).await?;
            println!("Subject: {}", message.subject);
            match LinkExtractor::new(APP_BASE_URL).extract(&message, None) {
                Some(link) => println!("Link:    {link}"),
                None => println!("No confirmation link found."),
            }
        }
        Commands::Extract {
            text,
            html,
            pattern,
            app_url,
        } => {
            let custom = match pattern {
                Some(p) => Some(Regex::new(&p).map_err(|e| Error::Config(e.to_string()))?),
                None => None,
            };
            let message = Message {
                text_body: text,
                html_body: html,
                ..Message::default()
            };
            match LinkExtractor::new(&app_url).extract(&message, custom.as_ref()) {
                Some(link) => println!("{link}"),
                None => println!("No confirmation link found."),
            }
        }
        Commands::Delete { inbox_id } => {
            let client = build_client(cli.api_key)?;
            client.delete_inbox(&inbox_id).await?;
            println!("Inbox {inbox_id} deleted.");
        }
        Commands::Identity => {
            let identity = random_login_data();
            println!("First name: {}", identity.first_name);
            println!("Last name:  {}", identity.last_name);
            println!("Password:   {}", identity.password);
            println!("Mailbox:    {}", random_mailbox_local(12));
        }
    }

    Ok(())
}

fn build_client(api_key: Option<String>) -> Result<MailSlurpClient, Error> {
    match api_key {
        Some(key) => MailSlurpClient::new(key, None),
        None => MailSlurpClient::from_env(),
    }
}

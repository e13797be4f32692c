//! Print the password reset link waiting in a mailbox, or clear out old reset mails.
//!
//! Credentials come from the environment (or a `.env` file next to where this is run):
//!
//! ```text
//! IMAP_HOST=imap.example.com
//! IMAP_USER=qa@example.com
//! IMAP_PASSWORD=hunter2
//! ```
//!
//! ```text
//! cargo run --example reset_link -- link --site https://app.example.com
//! cargo run --example reset_link -- purge
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use mailtoken::{Account, BodyPolicy, MailboxEngine, SelectionOrder, TlsConnector};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Subject the reset mail is sent with
    #[arg(short, long, env = "RESET_SUBJECT", default_value = "Reset your password")]
    subject: String,

    /// Accept self-signed certificates
    #[arg(long)]
    insecure: bool,

    /// Trace the IMAP conversation (set RUST_LOG=trace to see it)
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the reset link and delete the mail it came from
    Link {
        /// Base URL of the site the link points to
        #[arg(long, env = "RESET_SITE")]
        site: String,

        /// Which matching mail to look at first
        #[arg(long, value_enum, default_value_t = Order::FirstThenNewest)]
        order: Order,

        /// Keep looking past empty or unrecognised MIME parts
        #[arg(long)]
        lenient: bool,
    },
    /// Delete every mail with the subject
    Purge,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Order {
    FirstThenNewest,
    OldestFirst,
    NewestFirst,
}

impl From<Order> for SelectionOrder {
    fn from(order: Order) -> Self {
        match order {
            Order::FirstThenNewest => SelectionOrder::FirstThenNewest,
            Order::OldestFirst => SelectionOrder::OldestFirst,
            Order::NewestFirst => SelectionOrder::NewestFirst,
        }
    }
}

fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let account = match Account::from_env() {
        Ok(account) => account.accept_invalid_certs(cli.insecure),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };
    let engine =
        MailboxEngine::with_connector(account, TlsConnector::new().debug(cli.debug));

    match cli.command {
        Command::Link {
            site,
            order,
            lenient,
        } => {
            let policy = if lenient {
                BodyPolicy::FirstNonEmpty
            } else {
                BodyPolicy::FirstPartOnly
            };
            let engine = engine.selection_order(order.into()).body_policy(policy);
            match engine.retrieve_reset_link(&cli.subject, &site) {
                Ok(Some(link)) => println!("{}", link),
                Ok(None) => {
                    eprintln!("no mail with subject {:?} carries a reset token", cli.subject);
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(1);
                }
            }
        }
        Command::Purge => match engine.purge_matching(&cli.subject) {
            Ok(count) => println!("deleted {} mail(s)", count),
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        },
    }
}

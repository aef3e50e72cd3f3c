//! Foodcoop CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! foodcoop-cli migrate
//!
//! # Create an ordergroup
//! foodcoop-cli ordergroup create -n "Lovelace household"
//!
//! # Create a member
//! foodcoop-cli user create -e ada@example.org -f Ada -l Lovelace -p 'secret pass' -o 1
//!
//! # Book on an ordergroup account
//! foodcoop-cli transaction add -o 1 -u 1 -a 50.00 -n "Bank transfer"
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use foodcoop_core::GroupKind;

mod commands;

#[derive(Parser)]
#[command(name = "foodcoop-cli")]
#[command(author, version, about = "Foodcoop dashboard CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage members
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage ordergroups
    Ordergroup {
        #[command(subcommand)]
        action: GroupAction,
    },
    /// Manage workgroups
    Workgroup {
        #[command(subcommand)]
        action: GroupAction,
    },
    /// Book on ordergroup accounts
    Transaction {
        #[command(subcommand)]
        action: TransactionAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new member
    Create {
        /// Email address used to log in
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        first_name: String,

        #[arg(short, long, default_value = "")]
        last_name: String,

        /// Initial password (at least 8 characters)
        #[arg(short, long)]
        password: String,

        /// ID of the ordergroup to join
        #[arg(short, long)]
        ordergroup: Option<i32>,
    },
}

#[derive(Subcommand)]
enum GroupAction {
    /// Create a new group
    Create {
        /// Unique group name
        #[arg(short, long)]
        name: String,

        /// Postal contact address
        #[arg(short = 'a', long)]
        contact_address: Option<String>,
    },
}

#[derive(Subcommand)]
enum TransactionAction {
    /// Book an amount; negative amounts are charges
    Add {
        #[arg(short, long)]
        ordergroup: i32,

        /// ID of the member booking it
        #[arg(short, long)]
        user: i32,

        #[arg(short, long, allow_hyphen_values = true)]
        amount: String,

        #[arg(short, long)]
        note: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User {
            action:
                UserAction::Create {
                    email,
                    first_name,
                    last_name,
                    password,
                    ordergroup,
                },
        } => {
            commands::users::create_user(&email, &first_name, &last_name, &password, ordergroup)
                .await?;
        }
        Commands::Ordergroup {
            action: GroupAction::Create {
                name,
                contact_address,
            },
        } => {
            commands::users::create_group(&name, GroupKind::Ordergroup, contact_address.as_deref())
                .await?;
        }
        Commands::Workgroup {
            action: GroupAction::Create {
                name,
                contact_address,
            },
        } => {
            commands::users::create_group(&name, GroupKind::Workgroup, contact_address.as_deref())
                .await?;
        }
        Commands::Transaction {
            action:
                TransactionAction::Add {
                    ordergroup,
                    user,
                    amount,
                    note,
                },
        } => {
            commands::ledger::add_transaction(ordergroup, user, &amount, &note).await?;
        }
    }
    Ok(())
}

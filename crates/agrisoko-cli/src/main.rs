//! AgriSoko CLI
//!
//! Drives the AgriSoko client against the local collaborator emulator, one
//! screen action per invocation. The session is cached in the data
//! directory, so consecutive commands behave like one app run.
//!
//! ## Usage
//!
//! ```bash
//! # Cold start: splash, then go wherever the cached session belongs
//! agrisoko launch
//!
//! # Create an account and pick a role
//! agrisoko register --name "Amina Njeri" --phone 0712345678 \
//!     --email amina@agri.co.ke --password secret1 --role farmer
//!
//! # Sign in / out
//! agrisoko login --email amina@agri.co.ke --password secret1
//! agrisoko google --token <id-token>
//! agrisoko logout
//!
//! # Accounts without a role
//! agrisoko select-role customer
//!
//! # Farmer dashboard
//! agrisoko farmer seed
//! agrisoko farmer dashboard
//! agrisoko farmer deliver <order_id>
//! agrisoko farmer delete-product <product_id>
//! agrisoko farmer upload-picture ./me.png
//!
//! # Customer home
//! agrisoko customer home
//!
//! # Read back this instance's JSONL log
//! agrisoko --log-dir ./logs logs --tail 20
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use tracing::info;

use agrisoko_core::logging::{read_entries, LoggingBuilder};
use agrisoko_core::screens::{
    CustomerHome, FarmerDashboard, Loaded, LoginScreen, RegisterScreen, RoleSelectionScreen,
};
use agrisoko_core::{
    AgriClient, ClientConfig, Collaborators, Destination, LocalBackend, Order, Product,
    Registration, Role,
};

/// Database file inside the data directory
const DB_FILE: &str = "agrisoko.redb";

/// AgriSoko - farmer/customer marketplace client
#[derive(Parser)]
#[command(name = "agrisoko")]
#[command(version = "0.1.0")]
#[command(about = "AgriSoko - farmer/customer marketplace client")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Data directory (default: ~/.agrisoko/data)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Also write JSONL logs under this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Instance name used for the JSONL log file
    #[arg(long, global = true, default_value = "agrisoko")]
    instance: String,

    /// Skip the splash delay
    #[arg(long, global = true)]
    no_splash: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cold start: splash, then resolve the cached session
    Launch,

    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Create an account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// farmer or customer
        #[arg(long)]
        role: Option<Role>,
    },

    /// Sign in with a Google identity token
    Google {
        #[arg(long)]
        token: Option<String>,
    },

    /// Choose a role for the signed-in account
    SelectRole {
        /// farmer or customer
        role: Role,
    },

    /// Sign out
    Logout,

    /// Show the cached session and where it resolves to
    Whoami,

    /// Farmer dashboard
    Farmer {
        #[command(subcommand)]
        command: FarmerCommands,
    },

    /// Customer home
    Customer {
        #[command(subcommand)]
        command: CustomerCommands,
    },

    /// Print JSONL log entries written under --log-dir
    Logs {
        /// Include every instance, not just --instance
        #[arg(long)]
        all: bool,

        /// Only the last N entries
        #[arg(long)]
        tail: Option<usize>,
    },
}

#[derive(Subcommand)]
enum FarmerCommands {
    /// Show profile, stats, products and orders
    Dashboard,

    /// Delete a product listing
    DeleteProduct { product_id: String },

    /// Mark a pending order as delivered
    Deliver { order_id: String },

    /// Upload a profile picture
    UploadPicture { path: PathBuf },

    /// Add sample products and orders to the signed-in farmer
    Seed,
}

#[derive(Subcommand)]
enum CustomerCommands {
    /// Show the welcome screen
    Home,
}

/// Get the default data directory (~/.agrisoko/data)
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".agrisoko")
        .join("data")
}

fn open_client(data_dir: &Path, no_splash: bool) -> Result<(AgriClient, Arc<LocalBackend>)> {
    let mut config = ClientConfig::load_or_default(data_dir)
        .with_context(|| format!("reading config in {}", data_dir.display()))?;
    if no_splash {
        config.splash_delay_ms = 0;
    }

    let backend = Arc::new(
        LocalBackend::open(data_dir.join(DB_FILE))
            .with_context(|| format!("opening {}", data_dir.display()))?,
    );
    let client = AgriClient::new(Collaborators::from_backend(backend.clone()), config);
    Ok((client, backend))
}

fn print_destination(client: &AgriClient, destination: Destination) {
    println!("→ {}", destination);
    if let Some(banner) = client.banner() {
        println!("! {}", banner);
    }
}

/// Print the failure and exit non-zero.
fn fail(message: &str) -> Result<()> {
    bail!("{}", message)
}

async fn load_dashboard(client: &AgriClient) -> Result<FarmerDashboard> {
    match FarmerDashboard::load(client).await {
        Loaded::Ready(dashboard) => Ok(dashboard),
        Loaded::Redirected(to) => {
            print_destination(client, to);
            bail!("not a farmer account")
        }
        Loaded::Discarded => bail!("dashboard load was cancelled"),
    }
}

fn show_dashboard(dashboard: &FarmerDashboard, backend: &LocalBackend) -> Result<()> {
    let profile = &dashboard.profile;
    println!("{} <{}>", profile.name, profile.email);
    if let Some(url) = &profile.profile_picture {
        match backend.load_blob(url)? {
            Some(bytes) => println!("  picture: {} ({} bytes)", url, bytes.len()),
            None => println!("  picture: {} (missing)", url),
        }
    }

    let stats = dashboard.stats();
    println!();
    println!("Total sales:     {}", stats.total_sales);
    println!("Pending orders:  {}", stats.pending_orders);
    println!("Total earnings:  {:.2}", stats.total_earnings);
    println!("Active listings: {}", stats.active_listings);

    println!();
    println!("Products:");
    if dashboard.products.is_empty() {
        println!("  (none)");
    }
    for product in &dashboard.products {
        println!(
            "  [{}] {} - {:.2} x {}",
            product.id, product.name, product.price, product.quantity
        );
    }

    println!();
    println!("Orders:");
    if dashboard.orders.is_empty() {
        println!("  (none)");
    }
    for order in &dashboard.orders {
        println!("  [{}] {} - {}", order.id, order.customer_name, order.status);
    }
    Ok(())
}

fn print_logs(log_dir: &Path, instance: Option<&str>, tail: Option<usize>) -> Result<()> {
    let entries = read_entries(log_dir, instance)
        .with_context(|| format!("reading logs in {}", log_dir.display()))?;
    let skip = tail.map_or(0, |n| entries.len().saturating_sub(n));
    for entry in &entries[skip..] {
        println!(
            "{} {:>5} [{}] {}: {}",
            entry.ts, entry.level, entry.instance, entry.target, entry.msg
        );
    }
    Ok(())
}

async fn run_farmer(
    client: &AgriClient,
    backend: &LocalBackend,
    command: FarmerCommands,
) -> Result<()> {
    match command {
        FarmerCommands::Dashboard => {
            let dashboard = load_dashboard(client).await?;
            show_dashboard(&dashboard, backend)?;
        }

        FarmerCommands::DeleteProduct { product_id } => {
            let mut dashboard = load_dashboard(client).await?;
            if !dashboard.products.iter().any(|p| p.id == product_id) {
                bail!("no product {}", product_id);
            }
            if !dashboard.delete_product(client, &product_id).await {
                return fail(dashboard.error().unwrap_or("Failed to delete product."));
            }
            println!("Deleted product {}", product_id);
        }

        FarmerCommands::Deliver { order_id } => {
            let mut dashboard = load_dashboard(client).await?;
            if dashboard.mark_order_delivered(client, &order_id).await {
                println!("Order {} delivered", order_id);
            } else if let Some(error) = dashboard.error() {
                return fail(error);
            } else {
                bail!("no pending order {}", order_id);
            }
        }

        FarmerCommands::UploadPicture { path } => {
            let data = std::fs::read(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let mut dashboard = load_dashboard(client).await?;
            if !dashboard
                .upload_profile_picture(client, Bytes::from(data))
                .await
            {
                return fail(dashboard.error().unwrap_or("Upload failed."));
            }
            if let Some(url) = &dashboard.profile.profile_picture {
                println!("Profile picture: {}", url);
            }
        }

        FarmerCommands::Seed => {
            let dashboard = load_dashboard(client).await?;
            let store = &client.collaborators().store;
            let user_id = &dashboard.user_id;

            for product in [
                Product::new("Maize", 45.0, 100),
                Product::new("Beans", 120.0, 40),
                Product::new("Sukuma Wiki", 20.0, 250),
            ] {
                let id = store
                    .add_document(&user_id.products_collection(), product.to_document()?)
                    .await?;
                println!("Product {} ({})", id, product.name);
            }
            for customer in ["Baraka", "Wanjiru"] {
                let id = store
                    .add_document(&user_id.orders_collection(), Order::new(customer).to_document())
                    .await?;
                println!("Order {} ({})", id, customer);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logging = LoggingBuilder::new(cli.verbose);
    if let Some(log_dir) = &cli.log_dir {
        logging = logging.with_jsonl(log_dir, cli.instance.as_str());
    }
    if let Some(path) = logging.init().context("setting up logging")? {
        info!(?path, "Writing JSONL log");
    }

    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    let (client, backend) = open_client(&data_dir, cli.no_splash)?;

    match cli.command {
        Commands::Launch => {
            let destination = client.launch().await;
            print_destination(&client, destination);
        }

        Commands::Login { email, password } => {
            let mut screen = LoginScreen::new();
            screen.email = email;
            screen.password = password;
            match screen.submit(&client).await {
                Some(Destination::Login) => {
                    print_destination(&client, Destination::Login);
                    return fail(screen.error().unwrap_or("Authentication failed."));
                }
                Some(destination) => print_destination(&client, destination),
                None => return fail(screen.error().unwrap_or("Authentication failed.")),
            }
        }

        Commands::Register {
            name,
            phone,
            email,
            password,
            role,
        } => {
            let mut screen = RegisterScreen::new();
            screen.form = Registration {
                name,
                phone_number: phone,
                email,
                password,
                role,
            };
            match screen.submit(&client).await {
                Some(destination) => print_destination(&client, destination),
                None => {
                    let errors = screen.field_errors();
                    for message in [errors.name, errors.phone_number, errors.email, errors.password]
                        .into_iter()
                        .flatten()
                    {
                        eprintln!("{}", message);
                    }
                    return fail(screen.error().unwrap_or("Registration failed."));
                }
            }
        }

        Commands::Google { token } => {
            let mut screen = LoginScreen::new();
            match screen.sign_in_with_google(&client, token.as_deref()).await {
                Some(destination) => print_destination(&client, destination),
                None => return fail(screen.error().unwrap_or("Google Sign-In Failed")),
            }
        }

        Commands::SelectRole { role } => {
            let mut screen = RoleSelectionScreen::new();
            screen.select(role);
            match screen.confirm(&client).await {
                Some(destination) => print_destination(&client, destination),
                None => return fail(screen.error().unwrap_or("Failed to save role.")),
            }
        }

        Commands::Logout => {
            let destination = client.logout().await?;
            print_destination(&client, destination);
        }

        Commands::Whoami => match client.current_session() {
            None => println!("Not signed in"),
            Some(session) => {
                println!("User:  {}", session.user_id);
                if let Some(email) = &session.email {
                    println!("Email: {}", email);
                }
                let destination = client.refresh().await;
                print_destination(&client, destination);
            }
        },

        Commands::Farmer { command } => run_farmer(&client, &backend, command).await?,

        Commands::Customer {
            command: CustomerCommands::Home,
        } => match CustomerHome::load(&client).await {
            Loaded::Ready(home) => println!("{}", home.greeting()),
            Loaded::Redirected(to) => {
                print_destination(&client, to);
                bail!("not a customer account");
            }
            Loaded::Discarded => bail!("customer home load was cancelled"),
        },

        Commands::Logs { all, tail } => {
            let Some(log_dir) = &cli.log_dir else {
                bail!("logs needs --log-dir");
            };
            let instance = (!all).then_some(cli.instance.as_str());
            print_logs(log_dir, instance, tail)?;
        }
    }

    Ok(())
}

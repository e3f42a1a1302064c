use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use ridequest::application::controller::{BookingController, BookingServices};
use ridequest::config::Config;
use ridequest::domain::booking::PaymentReturn;
use ridequest::domain::identity::Identity;
use ridequest::domain::ports::GeocoderBox;
use ridequest::domain::route::RouteRequest;
use ridequest::infrastructure::geocoding::{GoogleGeocoder, PlaceholderGeocoder};
use ridequest::infrastructure::http::ApiClient;
use ridequest::infrastructure::in_memory::StaticIdentity;
use ridequest::infrastructure::socketio::SocketIoStatusChannel;
use ridequest::interfaces::console::{
    ConsoleNavigator, ConsoleNotifier, render_estimate, render_status,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Quote a ride and optionally continue to payment.
    Book(BookArgs),
    /// Check that the ride API is reachable.
    Health,
}

#[derive(clap::Args)]
struct BookArgs {
    /// Pickup location
    #[arg(long)]
    origin: String,

    /// Dropoff location
    #[arg(long)]
    dest: String,

    /// Signed-in user's email. Without it the booking is refused.
    #[arg(long, env = "RIDEQUEST_EMAIL")]
    email: Option<String>,

    /// Signed-in user's display name.
    #[arg(long, env = "RIDEQUEST_NAME")]
    name: Option<String>,

    /// Confirm the quote and request a checkout page. Otherwise the quote is cancelled.
    #[arg(long)]
    confirm: bool,

    /// Keep printing ride-status updates until interrupted.
    #[arg(long)]
    watch: bool,

    /// Only receive status updates for this ride.
    #[arg(long)]
    ride_id: Option<String>,

    /// How the payment page sent the user back (`success` or `cancel`). Requires `--confirm`.
    #[arg(long, requires = "confirm")]
    payment_return: Option<PaymentReturn>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "ridequest=info".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Health => health(&cli.config).await,
        Command::Book(args) => book(&cli.config, args).await,
    }
}

async fn health(config: &Config) -> Result<()> {
    let api = ApiClient::new(config).into_diagnostic()?;
    let report = api.health().await.into_diagnostic()?;
    println!(
        "{}: {} (db: {})",
        api.api_url(),
        report.status,
        report.db.as_deref().unwrap_or("unknown")
    );
    Ok(())
}

async fn book(config: &Config, args: BookArgs) -> Result<()> {
    let api = ApiClient::new(config).into_diagnostic()?;
    let geocoder: GeocoderBox = match config.maps_key() {
        Some(key) => Box::new(GoogleGeocoder::new(config, key).into_diagnostic()?),
        None => Box::new(PlaceholderGeocoder),
    };
    let identity = match args.email {
        Some(email) => {
            let name = args.name.unwrap_or_else(|| email.clone());
            Identity::signed_in(name, email)
        }
        None => Identity::anonymous(),
    };
    let channel = SocketIoStatusChannel::new(&config.api_url, args.ride_id)
        .into_diagnostic()?
        .with_handshake_timeout(config.request_timeout());

    let services = BookingServices {
        estimates: Box::new(api.clone()),
        checkout: Box::new(api),
        geocoder,
        identity: Box::new(StaticIdentity::new(identity)),
        notifier: Box::new(ConsoleNotifier),
        navigator: Box::new(ConsoleNavigator),
    };
    let controller =
        BookingController::new(services, Box::new(channel), config.reconnect_policy());

    let outcome = run_flow(
        &controller,
        RouteRequest::new(args.origin, args.dest),
        args.confirm,
        args.payment_return,
    )
    .await;
    if outcome.is_ok() && args.watch {
        watch_status(&controller).await;
    }
    controller.shutdown().await;
    outcome
}

async fn run_flow(
    controller: &BookingController,
    route: RouteRequest,
    confirm: bool,
    payment_return: Option<PaymentReturn>,
) -> Result<()> {
    controller.set_route(route).into_diagnostic()?;
    let estimate = controller.request_estimate().await.into_diagnostic()?;
    println!("{}", render_estimate(&estimate));

    if confirm {
        controller.confirm().await.into_diagnostic()?;
        if let Some(outcome) = payment_return {
            controller.payment_returned(outcome).into_diagnostic()?;
        }
    } else {
        controller.cancel().into_diagnostic()?;
    }
    Ok(())
}

async fn watch_status(controller: &BookingController) {
    let mut updates = controller.status_updates();
    println!("{}", render_status(&updates.borrow_and_update()));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("{}", render_status(&updates.borrow_and_update()));
            }
        }
    }
}

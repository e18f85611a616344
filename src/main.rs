use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use car_rental_client::{
    api::DriverAssignment,
    booking::{BookingWizard, LocationHint, LocationPlan},
    entities::booking::PaymentMethod,
    payment::{Checkout, CheckoutOutcome, Confirmation, PollPolicy},
    routes::{pages, Guard},
    session::AdminLoginStep,
    utils::geo::LatLng,
    AppError, AppResult, AppState, Config,
};

const DEFAULT_STORE: &str = ".car-rental/session.json";

#[derive(Parser, Debug)]
#[command(author, version, about = "Car rental client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in as a customer
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session
    Logout {
        #[arg(long)]
        admin: bool,
    },
    /// List the fleet
    Cars {
        #[arg(long)]
        available: bool,
    },
    /// Book a car
    Book {
        #[arg(long)]
        car: String,
        /// YYYY-MM-DD
        #[arg(long)]
        start: NaiveDate,
        /// YYYY-MM-DD
        #[arg(long)]
        end: NaiveDate,
        #[arg(long, default_value = "10:00")]
        pickup_time: String,
        #[arg(long, default_value = "10:00")]
        dropoff_time: String,
        #[arg(long)]
        driver: bool,
        /// Landmark to hand the car over at, e.g. "Thamel"
        #[arg(long, conflicts_with_all = ["lat", "lng"])]
        landmark: Option<String>,
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,
        /// Return the car somewhere else (landmark name)
        #[arg(long)]
        dropoff: Option<String>,
    },
    /// Show my bookings, newest first
    Bookings,
    /// Cancel one of my bookings
    Cancel { booking_id: String },
    /// Pay for a booking
    Pay {
        booking_id: String,
        #[arg(long, value_enum, default_value_t = Method::Cod)]
        method: Method,
    },
    /// Check a payment from the gateway's return URL
    Confirm {
        return_url: String,
        /// Keep asking while the gateway reports pending
        #[arg(long)]
        poll: bool,
    },
    /// Sign in to the back office
    AdminLogin {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        otp: Option<String>,
    },
    /// Re-check the stored admin session with the server
    AdminCheck,
    /// Assign a driver to a booking waiting for one
    AssignDriver {
        #[arg(long)]
        driver: String,
        #[arg(long)]
        booking: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Method {
    Cod,
    Khalti,
}

impl From<Method> for PaymentMethod {
    fn from(method: Method) -> Self {
        match method {
            Method::Cod => PaymentMethod::Cod,
            Method::Khalti => PaymentMethod::Khalti,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "car_rental_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "Command failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> AppResult<()> {
    let mut config = Config::from_env()?;
    config
        .token_store_path
        .get_or_insert_with(|| PathBuf::from(DEFAULT_STORE));
    let state = AppState::new(config)?;
    let navigator = state.client.navigator();

    match command {
        Command::Login { email, password } => {
            navigator.navigate(pages::SIGN_IN);
            let user = state.user.login(&email, &password).await?;
            println!("Signed in as {} <{}>", user.name, user.email);
        }
        Command::Logout { admin } => {
            if admin {
                state.admin.logout().await?;
            } else {
                state.user.logout()?;
            }
            println!("Signed out");
        }
        Command::Cars { available } => {
            navigator.navigate(pages::CARS);
            let customer = state.client.customer();
            let cars = if available {
                customer.available_cars().await?
            } else {
                customer.list_cars().await?
            };
            for car in cars {
                println!(
                    "{}  {:<24} Rs. {:>8.0}/day  {}",
                    car.id,
                    car.name,
                    car.price,
                    car.status.as_str()
                );
            }
        }
        Command::Book {
            car,
            start,
            end,
            pickup_time,
            dropoff_time,
            driver,
            landmark,
            lat,
            lng,
            dropoff,
        } => {
            require_user(&state, &pages::book_car(&car))?;
            let user = state.user.current_user()?;
            let car = state.client.customer().get_car(&car).await?;

            let hint = match landmark.as_deref() {
                Some(name) => Some(
                    LocationHint::landmark(name)
                        .ok_or_else(|| AppError::validation(format!("Unknown landmark: {}", name)))?,
                ),
                None => None,
            };
            let mut wizard = user
                .as_ref()
                .map(BookingWizard::for_user)
                .unwrap_or_default()
                .with_hint(hint);

            wizard.select_car(car);
            wizard.set_dates(start_of(start), start_of(end))?;
            wizard.set_times(&pickup_time, &dropoff_time)?;
            wizard.set_needs_driver(driver);
            wizard.next()?;

            if let (Some(lat), Some(lng)) = (lat, lng) {
                wizard.set_location(LatLng::new(lat, lng), None);
            }
            if let Some(name) = dropoff.as_deref() {
                let to = LocationHint::landmark(name)
                    .ok_or_else(|| AppError::validation(format!("Unknown landmark: {}", name)))?;
                let from = match wizard.draft().location.clone() {
                    LocationPlan::Same { location: Some(loc) } => loc,
                    _ => return Err(AppError::validation("Please select a location")),
                };
                let from_name = wizard.draft().address.clone();
                wizard.set_pickup(from, Some(&from_name));
                wizard.set_dropoff(to.location, to.label.as_deref());
            }
            wizard.next()?;

            if let Some(quote) = wizard.quote() {
                println!(
                    "{} day(s) x Rs. {:.0} + driver Rs. {:.0} = Rs. {:.0}",
                    quote.days, quote.car_daily, quote.driver_total, quote.total
                );
            }
            let outcome = wizard.submit(&state.client).await?;
            println!("Booking {} created. Continue at {}", outcome.booking_id, outcome.payment_route);
        }
        Command::Bookings => {
            require_user(&state, pages::MY_BOOKINGS)?;
            for booking in state.client.customer().my_bookings().await? {
                println!(
                    "{}  {:<20} {} -> {}  {:<10} Rs. {:.0}",
                    booking.id,
                    booking.car_name().unwrap_or("-"),
                    booking.start_date.format("%Y-%m-%d"),
                    booking.end_date.format("%Y-%m-%d"),
                    booking.status.as_str(),
                    booking.total_amount
                );
            }
        }
        Command::Cancel { booking_id } => {
            require_user(&state, pages::MY_BOOKINGS)?;
            state.client.customer().cancel_booking(&booking_id).await?;
            println!("Booking {} cancelled", booking_id);
        }
        Command::Pay { booking_id, method } => {
            require_user(&state, &pages::payment(&booking_id))?;
            let mut checkout = Checkout::load(&state.client, &booking_id).await?;
            checkout.select(method.into())?;
            match checkout.pay(&state.client).await? {
                CheckoutOutcome::Completed => println!("Cash on delivery recorded for {}", booking_id),
                CheckoutOutcome::Redirect(url) => println!("Complete the payment at {}", url),
            }
        }
        Command::Confirm { return_url, poll } => {
            navigator.navigate(pages::PAYMENT_CONFIRMATION);
            let confirmation = Confirmation::from_return_url(&return_url)?;
            let result = if poll {
                confirmation
                    .poll_until_settled(&state.client, PollPolicy::default())
                    .await
            } else {
                confirmation.lookup(&state.client).await
            };
            println!("Payment {:?}", result.status);
            if let Some(message) = result.message {
                println!("{}", message);
            }
        }
        Command::AdminLogin {
            username,
            password,
            otp,
        } => {
            navigator.navigate(pages::ADMIN_LOGIN);
            match otp {
                Some(otp) => state.admin.login_with_otp(&username, &password, &otp).await?,
                None => {
                    if let AdminLoginStep::OtpRequired { message } = state.admin.login(&username, &password).await? {
                        println!("{}", message.as_deref().unwrap_or("OTP sent to your email"));
                        println!("Run again with --otp <code>");
                        return Ok(());
                    }
                }
            }
            state.admin.unmount();
            println!("Signed in to the back office");
        }
        Command::AdminCheck => {
            navigator.navigate(pages::ADMIN_DASHBOARD);
            let session_state = state.admin.mount().await?;
            state.admin.unmount();
            println!("Admin session: {:?}", session_state);
        }
        Command::AssignDriver { driver, booking } => {
            navigator.navigate(pages::MANAGE_DRIVERS);
            state.admin.mount().await?;
            if let Guard::Redirect(to) = state.admin.guard().await {
                state.admin.unmount();
                return Err(AppError::Unauthorized(format!("Admin sign-in required ({})", to)));
            }

            let drivers = state.client.drivers();
            let candidates = drivers.bookings_awaiting_driver().await?;
            let mut assignment = DriverAssignment::new(driver, candidates);
            if let Some(booking_id) = booking.as_deref() {
                assignment.select(booking_id)?;
            }
            let result = assignment.submit(&drivers).await;
            state.admin.unmount();
            result?;
            println!("Driver assigned");
        }
    }
    Ok(())
}

fn require_user(state: &AppState, page: &str) -> AppResult<()> {
    match state.user.guard(page)? {
        Guard::Allow => Ok(()),
        Guard::Redirect(to) => Err(AppError::Unauthorized(format!(
            "Please sign in first (run `car-rental login`), then open {} ({})",
            page, to
        ))),
    }
}

fn start_of(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

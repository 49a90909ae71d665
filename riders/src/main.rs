//! Offline desk staff console.
//!
//! Line-oriented front end over [`RiderResolutionFlow`], talking to the
//! back office configured through `OFFLINE_DESK_*` environment variables.
//!
//! ```text
//! > search 9876543210
//! > create <name> <male|female|other> [email] [referral]
//! > send-otp
//! > otp 1234
//! > verify 123456
//! > book
//! ```

use anyhow::Context;
use offline_desk_core::environment::SystemClock;
use offline_desk_riders::{
    BackOfficeClient, ConsoleBookingHandoff, DeskConfig, FlowError, ResolutionState,
    RiderDeskEnvironment, RiderProfileDraft, RiderResolutionFlow, SessionContext,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

type ConsoleFlow =
    RiderResolutionFlow<BackOfficeClient, BackOfficeClient, ConsoleBookingHandoff, SessionContext>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,offline_desk_riders=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = DeskConfig::from_env().context("Failed to load configuration")?;
    let session = SessionContext::anonymous();
    let client = BackOfficeClient::new(
        config.api_url()?,
        config.http_timeout,
        config.session_cookie.as_deref(),
    )
    .context("Failed to build back office client")?
    .with_session(session.clone());

    info!(api_url = client.base_url(), "Connecting to back office");

    match client.fetch_current_staff().await {
        Ok(Some(staff)) => {
            info!(staff_id = %staff.id, "Signed in as {}", staff.display_name());
            session.set_staff(Some(staff));
        },
        Ok(None) => warn!("No staff session; bookings will carry no staff id"),
        Err(e) => warn!(error = %e, "Could not resolve current staff"),
    }

    let environment = RiderDeskEnvironment::new(
        client.clone(),
        client,
        ConsoleBookingHandoff::new(),
        session,
        Arc::new(SystemClock),
    )
    .with_config(config.flow);
    let flow = RiderResolutionFlow::new(environment);

    println!("Offline desk ready. Type `help` for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("> ");
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "quit" | "exit") {
            break;
        }

        match run_command(&flow, line).await {
            Ok(Some(snapshot)) => print_snapshot(&snapshot),
            Ok(None) => {},
            Err(e) => println!("! {e}"),
        }
    }

    flow.shutdown(Duration::from_secs(5)).await?;
    info!("Console stopped");
    Ok(())
}

async fn run_command(flow: &ConsoleFlow, line: &str) -> Result<Option<ResolutionState>, FlowError> {
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    let snapshot = match command {
        "search" => flow.search_rider(rest).await?,
        "create" => {
            let current = flow.snapshot().await;
            flow.create_rider(draft_from(current.create_form, rest)).await?
        },
        "send-otp" => flow.send_otp().await?,
        "otp" => flow.enter_otp(rest).await?,
        "verify" => flow.verify_otp(rest).await?,
        "book" => flow.authorize_booking().await?,
        "dismiss" => flow.dismiss_notice().await?,
        "status" => flow.snapshot().await,
        "help" => {
            print_help();
            return Ok(None);
        },
        other => {
            println!("Unknown command `{other}`. Type `help` for commands.");
            return Ok(None);
        },
    };

    Ok(Some(snapshot))
}

/// Fill the pre-filled create form from `<name> <gender> [email] [referral]`.
fn draft_from(form: Option<RiderProfileDraft>, args: &str) -> RiderProfileDraft {
    let mut draft = form.unwrap_or_default();
    let mut parts = args.split_whitespace();
    if let Some(name) = parts.next() {
        draft.name = name.replace('_', " ");
    }
    if let Some(gender) = parts.next() {
        draft.gender = gender.to_string();
    }
    if let Some(email) = parts.next() {
        draft.email = email.to_string();
    }
    if let Some(referral) = parts.next() {
        draft.referral_code = referral.to_string();
    }
    draft
}

fn print_snapshot(state: &ResolutionState) {
    println!("  phase: {:?}", state.phase());
    if let Some(rider) = &state.resolved_rider {
        println!("  rider: {} ({}, {})", rider.name, rider.id, rider.mobile.masked());
    }
    if let Some(form) = &state.create_form {
        println!("  create form: mobile {}", form.mobile);
    }
    if !state.pending_otp_input.is_empty() {
        println!("  otp input: {}", "*".repeat(state.pending_otp_input.chars().count()));
    }
    if let Some(error) = &state.field_error {
        println!("  field error: {error}");
    }
    if let Some(notice) = &state.notice {
        println!("  [{:?}] {}", notice.level, notice.message);
    }
}

fn print_help() {
    println!("  search <mobile>                                   look up a rider");
    println!("  create <name> <male|female|other> [email] [ref]   create the searched rider");
    println!("  send-otp                                          send an OTP to the rider");
    println!("  otp <digits>                                      record typed digits");
    println!("  verify <code>                                     verify the OTP");
    println!("  book                                              authorize the booking");
    println!("  dismiss | status | quit");
}

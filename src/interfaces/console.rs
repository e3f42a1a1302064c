//! Terminal surfaces for the booking flow.

use crate::domain::booking::RideStatus;
use crate::domain::estimate::Estimate;
use crate::domain::ports::{Navigator, Notifier};
use std::io::Write;

/// Prints notifications to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "! {message}");
    }
}

/// Prints the payment page the user should continue to.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn redirect(&self, target: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "Continue to payment: {target}");
    }
}

pub fn render_estimate(estimate: &Estimate) -> String {
    format!(
        "Standard  ${:.2}  {} min  {} km",
        estimate.price, estimate.duration_minutes, estimate.distance_km
    )
}

pub fn render_status(status: &RideStatus) -> String {
    let mut line = format!("Ride status: {}", status.status);
    if let Some(driver) = &status.driver {
        line.push_str(&format!(" ({driver})"));
    }
    if let Some(eta) = status.eta_mins {
        line.push_str(&format!(", {eta} min away"));
    }
    line
}

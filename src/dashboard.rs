//! Role dashboards
//!
//! Each dashboard is a pure summary over records the handler has just
//! fetched. Nothing here caches between requests.

use crate::models::{
    ActivityStatus, Booking, BookingStatus, InformationCenter, CenterStatus, Package, Payment,
    PaymentStatus, Profile, VolunteerActivity,
};
use crate::auth::Role;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

fn confirmed_revenue(payments: &[Payment]) -> f64 {
    round_cents(
        payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Confirmed)
            .map(|p| p.amount)
            .sum(),
    )
}

fn is_upcoming(booking: &Booking, today: NaiveDate) -> bool {
    booking.travel_date >= today
        && matches!(booking.status, BookingStatus::Pending | BookingStatus::Confirmed)
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub total_bookings: usize,
    pub bookings_by_status: BTreeMap<&'static str, usize>,
    pub confirmed_revenue: f64,
    pub pending_payments: usize,
    pub active_centers: usize,
    pub clients: usize,
    pub volunteer_activities: usize,
}

pub fn admin(
    bookings: &[Booking],
    payments: &[Payment],
    centers: &[InformationCenter],
    profiles: &[Profile],
    activities: &[VolunteerActivity],
) -> AdminDashboard {
    let mut bookings_by_status: BTreeMap<&'static str, usize> =
        BookingStatus::ALL.iter().map(|s| (s.as_str(), 0)).collect();
    for booking in bookings {
        *bookings_by_status.entry(booking.status.as_str()).or_default() += 1;
    }

    AdminDashboard {
        total_bookings: bookings.len(),
        bookings_by_status,
        confirmed_revenue: confirmed_revenue(payments),
        pending_payments: payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Pending)
            .count(),
        active_centers: centers
            .iter()
            .filter(|c| c.status == CenterStatus::Active)
            .count(),
        clients: profiles.iter().filter(|p| p.role == Role::Client).count(),
        volunteer_activities: activities.len(),
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PackageBookings {
    pub package_id: Uuid,
    pub title: String,
    pub bookings: usize,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TourManagerDashboard {
    pub upcoming_bookings: usize,
    pub bookings_per_package: Vec<PackageBookings>,
    pub active_centers: usize,
    pub upcoming_activities: usize,
}

pub fn tour_manager(
    bookings: &[Booking],
    packages: &[Package],
    centers: &[InformationCenter],
    activities: &[VolunteerActivity],
    today: NaiveDate,
) -> TourManagerDashboard {
    let mut per_package: HashMap<Uuid, usize> = HashMap::new();
    for booking in bookings {
        *per_package.entry(booking.package_id).or_default() += 1;
    }

    let mut bookings_per_package: Vec<PackageBookings> = packages
        .iter()
        .map(|p| PackageBookings {
            package_id: p.meta.id,
            title: p.title.clone(),
            bookings: per_package.get(&p.meta.id).copied().unwrap_or(0),
        })
        .collect();
    bookings_per_package.sort_by(|a, b| b.bookings.cmp(&a.bookings).then_with(|| a.title.cmp(&b.title)));

    TourManagerDashboard {
        upcoming_bookings: bookings.iter().filter(|b| is_upcoming(b, today)).count(),
        bookings_per_package,
        active_centers: centers
            .iter()
            .filter(|c| c.status == CenterStatus::Active)
            .count(),
        upcoming_activities: activities
            .iter()
            .filter(|a| a.status == ActivityStatus::Upcoming && a.activity_date >= today)
            .count(),
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRevenue {
    /// `YYYY-MM`
    pub month: String,
    pub amount: f64,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountantDashboard {
    pub confirmed_revenue: f64,
    pub pending_amount: f64,
    pub failed_payments: usize,
    pub revenue_by_method: BTreeMap<String, f64>,
    pub monthly_revenue: Vec<MonthlyRevenue>,
}

pub fn accountant(payments: &[Payment]) -> AccountantDashboard {
    let mut by_method: BTreeMap<String, f64> = BTreeMap::new();
    let mut by_month: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for payment in payments.iter().filter(|p| p.status == PaymentStatus::Confirmed) {
        *by_method.entry(payment.method.clone()).or_default() += payment.amount;
        let created = payment.meta.created_at;
        *by_month.entry((created.year(), created.month())).or_default() += payment.amount;
    }

    AccountantDashboard {
        confirmed_revenue: confirmed_revenue(payments),
        pending_amount: round_cents(
            payments
                .iter()
                .filter(|p| p.status == PaymentStatus::Pending)
                .map(|p| p.amount)
                .sum(),
        ),
        failed_payments: payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Failed)
            .count(),
        revenue_by_method: by_method
            .into_iter()
            .map(|(method, amount)| (method, round_cents(amount)))
            .collect(),
        monthly_revenue: by_month
            .into_iter()
            .map(|((year, month), amount)| MonthlyRevenue {
                month: format!("{:04}-{:02}", year, month),
                amount: round_cents(amount),
            })
            .collect(),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDashboard {
    pub bookings: usize,
    pub payments: usize,
    pub total_paid: f64,
    pub upcoming_trips: Vec<Booking>,
}

/// `bookings` and `payments` must already be the client's own
pub fn client(bookings: Vec<Booking>, payments: &[Payment], today: NaiveDate) -> ClientDashboard {
    let count = bookings.len();
    let mut upcoming_trips: Vec<Booking> = bookings
        .into_iter()
        .filter(|b| is_upcoming(b, today))
        .collect();
    upcoming_trips.sort_by_key(|b| b.travel_date);

    ClientDashboard {
        bookings: count,
        payments: payments.len(),
        total_paid: confirmed_revenue(payments),
        upcoming_trips,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordMeta;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn meta(month: u32) -> RecordMeta {
        let at = Utc.with_ymd_and_hms(2026, month, 10, 9, 0, 0).unwrap();
        RecordMeta {
            id: Uuid::new_v4(),
            version: 1,
            created_at: at,
            updated_at: at,
        }
    }

    fn payment(amount: f64, status: PaymentStatus, method: &str, month: u32) -> Payment {
        Payment {
            meta: meta(month),
            booking_id: Uuid::new_v4(),
            amount,
            status,
            method: method.to_string(),
            transaction_ref: None,
        }
    }

    fn booking(package_id: Uuid, status: BookingStatus, travel: NaiveDate) -> Booking {
        Booking {
            meta: meta(1),
            client_id: Uuid::new_v4(),
            package_id,
            status,
            num_travelers: 2,
            total_amount: 200.0,
            travel_date: travel,
            special_requests: None,
        }
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    #[test]
    fn test_accountant_totals() {
        let payments = vec![
            payment(100.0, PaymentStatus::Confirmed, "card", 1),
            payment(50.5, PaymentStatus::Confirmed, "cash", 1),
            payment(25.25, PaymentStatus::Confirmed, "card", 3),
            payment(80.0, PaymentStatus::Pending, "card", 3),
            payment(10.0, PaymentStatus::Failed, "card", 3),
        ];
        let stats = accountant(&payments);

        assert_eq!(stats.confirmed_revenue, 175.75);
        assert_eq!(stats.pending_amount, 80.0);
        assert_eq!(stats.failed_payments, 1);
        assert_eq!(stats.revenue_by_method["card"], 125.25);
        assert_eq!(
            stats.monthly_revenue,
            vec![
                MonthlyRevenue { month: "2026-01".into(), amount: 150.5 },
                MonthlyRevenue { month: "2026-03".into(), amount: 25.25 },
            ]
        );
    }

    #[test]
    fn test_admin_counts_every_status() {
        let package = Uuid::new_v4();
        let bookings = vec![
            booking(package, BookingStatus::Pending, date(5, 1)),
            booking(package, BookingStatus::Pending, date(5, 2)),
            booking(package, BookingStatus::Completed, date(1, 2)),
        ];
        let stats = admin(&bookings, &[], &[], &[], &[]);
        assert_eq!(stats.total_bookings, 3);
        assert_eq!(stats.bookings_by_status["pending"], 2);
        assert_eq!(stats.bookings_by_status["confirmed"], 0);
        assert_eq!(stats.bookings_by_status["completed"], 1);
    }

    #[test]
    fn test_client_upcoming_trips() {
        let package = Uuid::new_v4();
        let today = date(3, 1);
        let bookings = vec![
            booking(package, BookingStatus::Confirmed, date(6, 1)),
            booking(package, BookingStatus::Pending, date(4, 1)),
            booking(package, BookingStatus::Cancelled, date(5, 1)),
            booking(package, BookingStatus::Confirmed, date(2, 1)),
        ];
        let payments = vec![
            payment(200.0, PaymentStatus::Confirmed, "card", 1),
            payment(200.0, PaymentStatus::Pending, "card", 2),
        ];
        let stats = client(bookings, &payments, today);

        assert_eq!(stats.bookings, 4);
        assert_eq!(stats.payments, 2);
        assert_eq!(stats.total_paid, 200.0);
        let dates: Vec<NaiveDate> = stats.upcoming_trips.iter().map(|b| b.travel_date).collect();
        assert_eq!(dates, vec![date(4, 1), date(6, 1)]);
    }
}

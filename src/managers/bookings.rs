//! Bookings and the public checkout flow

use super::{Entity, Manager};
use crate::audit::AuditAction;
use crate::auth::Claims;
use crate::db::Filter;
use crate::error::{validation_error, AppError};
use crate::models::{
    Booking, BookingStatus, BookingUpdate, CheckoutRequest, NewBooking, NewPayment, Package,
    PackageStatus, Payment, PaymentStatus, Profile, RecordMeta,
};
use crate::settings::{keys, SettingsStore};
use crate::table::export::{csv_line, export_filename, CSV_CONTENT_TYPE};
use crate::table::{money, Column, ExportFile, Exporter, TableSpec};
use crate::values;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

impl Entity for Booking {
    type Create = NewBooking;
    type Update = BookingUpdate;

    const TABLE: &'static str = "bookings";
    const LABEL: &'static str = "Booking";

    const CREATED: AuditAction = AuditAction::BookingCreated;
    const UPDATED: AuditAction = AuditAction::BookingUpdated;
    const DELETED: AuditAction = AuditAction::BookingDeleted;

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn table_spec() -> TableSpec {
        TableSpec::new(vec![
            Column::new("created_at", "Booked"),
            Column::new("client_id", "Client"),
            Column::new("package_id", "Package"),
            Column::new("travel_date", "Travel date"),
            Column::new("num_travelers", "Travelers"),
            Column::new("total_amount", "Total").render(money("total_amount")),
            Column::new("status", "Status"),
        ])
        .search_keys(["status", "client_id", "package_id", "special_requests"])
        .filter_keys(["status"])
    }

    fn exporter() -> Option<Box<dyn Exporter>> {
        Some(Box::new(BookingExporter))
    }
}

/// Booking report: fixed columns, requests included, named after bookings
pub struct BookingExporter;

const BOOKING_EXPORT_FIELDS: [(&str, &str); 8] = [
    ("id", "Booking ID"),
    ("created_at", "Booked at"),
    ("client_id", "Client ID"),
    ("package_id", "Package ID"),
    ("travel_date", "Travel date"),
    ("num_travelers", "Travelers"),
    ("status", "Status"),
    ("special_requests", "Special requests"),
];

impl Exporter for BookingExporter {
    fn export(&self, _columns: &[Column], rows: &[&Value]) -> ExportFile {
        let mut header: Vec<&str> = BOOKING_EXPORT_FIELDS.iter().map(|(_, h)| *h).collect();
        header.push("Total amount");

        let mut lines = vec![csv_line(header)];
        for row in rows {
            let mut cells: Vec<String> = BOOKING_EXPORT_FIELDS
                .iter()
                .map(|(key, _)| values::display(values::lookup(row, key)))
                .collect();
            cells.push(money("total_amount")(row));
            lines.push(csv_line(cells));
        }

        ExportFile {
            filename: export_filename("bookings", Utc::now().date_naive()),
            content_type: CSV_CONTENT_TYPE,
            body: lines.join("\n"),
        }
    }
}

/// `price × travelers + fee`, rounded to cents
pub fn booking_total(price: f64, travelers: u32, fee: f64) -> f64 {
    ((price * f64::from(travelers) + fee) * 100.0).round() / 100.0
}

impl Manager<Booking> {
    pub async fn for_client(&self, client_id: Uuid) -> Result<Vec<Booking>, AppError> {
        self.list(vec![Filter::eq("client_id", client_id.to_string())]).await
    }
}

/// Everything the checkout created. The profile stays server-side.
#[derive(Debug, Serialize)]
pub struct CheckoutOutcome {
    #[serde(skip_serializing)]
    pub profile: Profile,
    pub booking: Booking,
    pub payment: Payment,
}

/// Collaborators of the checkout flow
pub struct Checkout<'a> {
    pub profiles: &'a Manager<Profile>,
    pub packages: &'a Manager<Package>,
    pub bookings: &'a Manager<Booking>,
    pub payments: &'a Manager<Payment>,
    pub settings: &'a SettingsStore,
}

impl Checkout<'_> {
    /// Profile, then a pending booking, then a pending payment.
    ///
    /// Steps are not compensated: if the booking or payment insert fails the
    /// profile (and booking) already written stay in place.
    pub async fn run(&self, req: CheckoutRequest, claims: Option<&Claims>) -> Result<CheckoutOutcome, AppError> {
        req.validate().map_err(|e| validation_error(e.to_string()))?;

        let package = self.packages.get(req.package_id).await?;
        if package.status != PackageStatus::Active {
            return Err(validation_error(format!("Package '{}' is not bookable", package.title)));
        }

        let fee = self.settings.get(keys::BOOKING_FEE, "0").await;
        let fee = fee.trim().parse::<f64>().unwrap_or_else(|_| {
            warn!("Ignoring non-numeric booking fee '{}'", fee);
            0.0
        });

        let profile = match claims {
            Some(claims) => self.profiles.get(claims.sub).await?,
            None => {
                self.profiles
                    .find_or_create_client(&req.full_name, &req.email, req.phone.clone())
                    .await?
            }
        };

        let total_amount = booking_total(package.price, req.num_travelers, fee);
        let booking = self
            .bookings
            .create(
                NewBooking {
                    client_id: profile.meta.id,
                    package_id: package.meta.id,
                    status: BookingStatus::Pending,
                    num_travelers: req.num_travelers,
                    total_amount,
                    travel_date: req.travel_date,
                    special_requests: req.special_requests.clone(),
                },
                claims,
            )
            .await
            .inspect_err(|e| warn!("Checkout left profile {} without a booking: {}", profile.meta.id, e))?;

        let payment = self
            .payments
            .create(
                NewPayment {
                    booking_id: booking.meta.id,
                    amount: total_amount,
                    status: PaymentStatus::Pending,
                    method: req.payment_method.clone(),
                    transaction_ref: None,
                },
                claims,
            )
            .await
            .inspect_err(|e| warn!("Checkout left booking {} without a payment: {}", booking.meta.id, e))?;

        info!(
            "Checkout: {} booked '{}' for {} ({:.2})",
            profile.email, package.title, req.num_travelers, total_amount
        );
        Ok(CheckoutOutcome {
            profile,
            booking,
            payment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLog;
    use crate::db::SharedGateway;
    use crate::managers::testing::gateway;
    use crate::models::NewPackage;
    use crate::settings::WriteSetting;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct Fixture {
        profiles: Manager<Profile>,
        packages: Manager<Package>,
        bookings: Manager<Booking>,
        payments: Manager<Payment>,
        settings: SettingsStore,
    }

    impl Fixture {
        fn new(gateway: SharedGateway, audit: AuditLog) -> Self {
            Self {
                profiles: Manager::new(gateway.clone(), audit.clone()),
                packages: Manager::new(gateway.clone(), audit.clone()),
                bookings: Manager::new(gateway.clone(), audit.clone()),
                payments: Manager::new(gateway.clone(), audit),
                settings: SettingsStore::new(gateway),
            }
        }

        fn checkout(&self) -> Checkout<'_> {
            Checkout {
                profiles: &self.profiles,
                packages: &self.packages,
                bookings: &self.bookings,
                payments: &self.payments,
                settings: &self.settings,
            }
        }
    }

    fn request(package_id: Uuid) -> CheckoutRequest {
        CheckoutRequest {
            package_id,
            full_name: "Lina Haddad".to_string(),
            email: "lina@example.com".to_string(),
            phone: Some("+212600000000".to_string()),
            num_travelers: 3,
            travel_date: NaiveDate::from_ymd_opt(2026, 12, 20).unwrap(),
            special_requests: Some("Vegetarian, please".to_string()),
            payment_method: "card".to_string(),
        }
    }

    async fn package(fixture: &Fixture, price: f64) -> Package {
        fixture
            .packages
            .create(
                NewPackage {
                    title: "Desert Nights".to_string(),
                    slug: "desert-nights".to_string(),
                    description: "Two nights under the stars".to_string(),
                    price,
                    duration_days: 2,
                    location: "Erg Chebbi".to_string(),
                    image_url: None,
                    status: PackageStatus::Active,
                },
                None,
            )
            .await
            .unwrap()
    }

    #[test]
    fn test_booking_total() {
        assert_eq!(booking_total(199.99, 3, 15.0), 614.97);
        assert_eq!(booking_total(100.0, 1, 0.0), 100.0);
    }

    #[tokio::test]
    async fn test_checkout_creates_pending_records() {
        let (gateway, audit) = gateway();
        let fixture = Fixture::new(gateway, audit);
        fixture
            .settings
            .write(WriteSetting {
                key: keys::BOOKING_FEE.to_string(),
                value: Some("25".to_string()),
                category: Some("payments".to_string()),
                data_type: None,
            })
            .await
            .unwrap();
        let package = package(&fixture, 100.0).await;

        let outcome = fixture.checkout().run(request(package.meta.id), None).await.unwrap();

        assert_eq!(outcome.booking.status, BookingStatus::Pending);
        assert_eq!(outcome.booking.total_amount, 325.0);
        assert_eq!(outcome.booking.client_id, outcome.profile.meta.id);
        assert_eq!(outcome.payment.status, PaymentStatus::Pending);
        assert_eq!(outcome.payment.amount, 325.0);
        assert_eq!(outcome.payment.booking_id, outcome.booking.meta.id);

        let again = fixture.checkout().run(request(package.meta.id), None).await.unwrap();
        assert_eq!(again.profile.meta.id, outcome.profile.meta.id);
        assert_eq!(fixture.bookings.for_client(outcome.profile.meta.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_checkout_writes_nothing() {
        let (gateway, audit) = gateway();
        let fixture = Fixture::new(gateway, audit);
        let package = package(&fixture, 50.0).await;

        let mut req = request(package.meta.id);
        req.num_travelers = 0;
        assert!(matches!(fixture.checkout().run(req, None).await, Err(AppError::Validation(_))));
        assert!(fixture.profiles.list(vec![]).await.unwrap().is_empty());

        let missing = fixture.checkout().run(request(Uuid::new_v4()), None).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
        assert!(fixture.bookings.list(vec![]).await.unwrap().is_empty());
    }

    #[test]
    fn test_booking_export() {
        let row = json!({
            "id": "b-1",
            "created_at": "2026-01-02T10:00:00Z",
            "client_id": "c-1",
            "package_id": "p-1",
            "travel_date": "2026-02-01",
            "num_travelers": 2,
            "status": "confirmed",
            "special_requests": "Late arrival, after 10pm",
            "total_amount": 240.5,
        });
        let file = BookingExporter.export(&[], &[&row]);
        assert!(file.filename.starts_with("bookings-"));
        let lines: Vec<&str> = file.body.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            "b-1,2026-01-02T10:00:00Z,c-1,p-1,2026-02-01,2,confirmed,Late arrival; after 10pm,240.50"
        );
    }
}

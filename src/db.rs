use std::io;

use anyhow::Context;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgExecutor, PgPool, Postgres, Row};
use thiserror::Error;
use tracing::info;

use crate::lifecycle::{self, ApplicationStatus, LifecycleError, PackageTier, StatusFilter, Transition};
use crate::models::{AmbassadorApplication, AmbassadorPanel, BillingInfo};

const APPLICATION_COLUMNS: &str = "id, first_name, last_name, email, phone, school, city, \
     district, region, experience, motivation, student_count, status, package_name, price, \
     billing_name, billing_address, billing_tax_office, billing_tax_number, notes, \
     submitted_at, reviewed_at, reviewed_by, payment_declared_at";

const INSERT_APPLICATION: &str = r#"
    INSERT INTO ambassador_applications
    (id, first_name, last_name, email, phone, school, city, district, region, experience,
     motivation, student_count, status, package_name, price, billing_name, billing_address,
     billing_tax_office, billing_tax_number, notes, submitted_at, reviewed_at, reviewed_by,
     payment_declared_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18,
            $19, $20, $21, $22, $23, $24)
"#;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("application not found")]
    NotFound,

    #[error("ambassador panel not found")]
    PanelNotFound,

    #[error("an application with this email already exists")]
    DuplicateEmail,

    #[error("application was changed by another request; reload and try again")]
    Conflict,

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("stored application is invalid: {0}")]
    InvalidRecord(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn bind_application<'q>(
    sql: &'q str,
    application: &'q AmbassadorApplication,
) -> Query<'q, Postgres, PgArguments> {
    let billing = application.billing_info.as_ref();
    sqlx::query(sql)
        .bind(&application.id)
        .bind(&application.first_name)
        .bind(&application.last_name)
        .bind(&application.email)
        .bind(&application.phone)
        .bind(&application.school)
        .bind(&application.city)
        .bind(&application.district)
        .bind(&application.region)
        .bind(&application.experience)
        .bind(&application.motivation)
        .bind(application.student_count)
        .bind(application.status.to_string())
        .bind(application.package_name.map(PackageTier::name))
        .bind(application.price)
        .bind(billing.map(|b| b.name.as_str()))
        .bind(billing.map(|b| b.address.as_str()))
        .bind(billing.map(|b| b.tax_office.as_str()))
        .bind(billing.map(|b| b.tax_number.as_str()))
        .bind(application.notes.as_deref())
        .bind(application.submitted_at)
        .bind(application.reviewed_at)
        .bind(application.reviewed_by.as_deref())
        .bind(application.payment_declared_at)
}

fn application_from_row(row: &PgRow) -> StoreResult<AmbassadorApplication> {
    let status: String = row.get("status");
    let status: ApplicationStatus = status
        .parse()
        .map_err(|err: lifecycle::UnknownStatus| StoreError::InvalidRecord(err.to_string()))?;

    let package_name = row
        .get::<Option<String>, _>("package_name")
        .map(|name| {
            PackageTier::parse(&name)
                .ok_or_else(|| StoreError::InvalidRecord(format!("unknown package `{name}`")))
        })
        .transpose()?;

    let billing_info = match (
        row.get::<Option<String>, _>("billing_name"),
        row.get::<Option<String>, _>("billing_address"),
        row.get::<Option<String>, _>("billing_tax_office"),
        row.get::<Option<String>, _>("billing_tax_number"),
    ) {
        (Some(name), Some(address), Some(tax_office), Some(tax_number)) => Some(BillingInfo {
            name,
            address,
            tax_office,
            tax_number,
        }),
        _ => None,
    };

    Ok(AmbassadorApplication {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        phone: row.get("phone"),
        school: row.get("school"),
        city: row.get("city"),
        district: row.get("district"),
        region: row.get("region"),
        experience: row.get("experience"),
        motivation: row.get("motivation"),
        student_count: row.get("student_count"),
        status,
        package_name,
        price: row.get("price"),
        billing_info,
        notes: row.get("notes"),
        submitted_at: row.get("submitted_at"),
        reviewed_at: row.get("reviewed_at"),
        reviewed_by: row.get("reviewed_by"),
        payment_declared_at: row.get("payment_declared_at"),
    })
}

pub async fn insert_application(pool: &PgPool, application: &AmbassadorApplication) -> StoreResult<()> {
    bind_application(INSERT_APPLICATION, application)
        .execute(pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateEmail,
            other => StoreError::Database(other),
        })?;

    info!(
        id = %application.id,
        email = %application.email,
        "ambassador application submitted"
    );
    Ok(())
}

async fn select_application<'e, E>(executor: E, id: &str) -> StoreResult<AmbassadorApplication>
where
    E: PgExecutor<'e>,
{
    let query = format!("SELECT {APPLICATION_COLUMNS} FROM ambassador_applications WHERE id = $1");
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or(StoreError::NotFound)?;
    application_from_row(&row)
}

pub async fn fetch_application(pool: &PgPool, id: &str) -> StoreResult<AmbassadorApplication> {
    select_application(pool, id).await
}

/// Newest first. `AnyPackagePending` matches every `<Package>-pending` status.
pub async fn list_applications(
    pool: &PgPool,
    filter: Option<StatusFilter>,
) -> StoreResult<Vec<AmbassadorApplication>> {
    let mut query = format!("SELECT {APPLICATION_COLUMNS} FROM ambassador_applications");

    match filter {
        Some(StatusFilter::Exact(_)) => query.push_str(" WHERE status = $1"),
        Some(StatusFilter::AnyPackagePending) => query.push_str(" WHERE status LIKE '%-pending'"),
        None => {}
    }
    query.push_str(" ORDER BY submitted_at DESC");

    let mut rows = sqlx::query(&query);
    if let Some(StatusFilter::Exact(status)) = filter {
        rows = rows.bind(status.to_string());
    }

    rows.fetch_all(pool)
        .await?
        .iter()
        .map(application_from_row)
        .collect()
}

/// Applies a lifecycle transition with a status-guarded update.
///
/// The update only matches while the row still holds the status the
/// transition was validated against, so of two racing requests exactly one
/// wins and the other gets `StoreError::Conflict`.
pub async fn apply_transition(
    pool: &PgPool,
    id: &str,
    transition: &Transition,
) -> StoreResult<AmbassadorApplication> {
    let mut tx = pool.begin().await?;

    let current = select_application(&mut *tx, id).await?;
    let next = lifecycle::apply(&current, transition, Utc::now())?;
    guarded_update(&mut *tx, current.status, &next).await?;

    if next.status == ApplicationStatus::Active {
        sqlx::query(
            r#"
            INSERT INTO ambassador_panels (application_id, package_name, activated_at, reviewed_by)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (application_id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(next.package_name.map(PackageTier::name).unwrap_or("N/A"))
        .bind(next.reviewed_at.unwrap_or_else(Utc::now))
        .bind(next.reviewed_by.as_deref().unwrap_or(lifecycle::DEFAULT_REVIEWER))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    info!(
        id,
        action = transition.action(),
        from = %current.status,
        to = %next.status,
        "application transitioned"
    );
    Ok(next)
}

/// Writes `next` only if the row still holds `expected`.
async fn guarded_update<'e, E>(
    executor: E,
    expected: ApplicationStatus,
    next: &AmbassadorApplication,
) -> StoreResult<()>
where
    E: PgExecutor<'e>,
{
    let billing = next.billing_info.as_ref();

    let result = sqlx::query(
        r#"
        UPDATE ambassador_applications
        SET status = $3,
            package_name = $4,
            price = $5,
            billing_name = $6,
            billing_address = $7,
            billing_tax_office = $8,
            billing_tax_number = $9,
            notes = $10,
            reviewed_at = $11,
            reviewed_by = $12,
            payment_declared_at = $13
        WHERE id = $1 AND status = $2
        "#,
    )
    .bind(&next.id)
    .bind(expected.to_string())
    .bind(next.status.to_string())
    .bind(next.package_name.map(PackageTier::name))
    .bind(next.price)
    .bind(billing.map(|b| b.name.as_str()))
    .bind(billing.map(|b| b.address.as_str()))
    .bind(billing.map(|b| b.tax_office.as_str()))
    .bind(billing.map(|b| b.tax_number.as_str()))
    .bind(next.notes.as_deref())
    .bind(next.reviewed_at)
    .bind(next.reviewed_by.as_deref())
    .bind(next.payment_declared_at)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::Conflict);
    }
    Ok(())
}

/// Removes an application together with its panel, if one was activated.
pub async fn delete_application(pool: &PgPool, id: &str) -> StoreResult<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM ambassador_panels WHERE application_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM ambassador_applications WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound);
    }

    tx.commit().await?;
    info!(id, "ambassador application deleted");
    Ok(())
}

pub async fn fetch_panel(pool: &PgPool, application_id: &str) -> StoreResult<AmbassadorPanel> {
    let row = sqlx::query(
        r#"
        SELECT application_id, package_name, activated_at, reviewed_by
        FROM ambassador_panels
        WHERE application_id = $1
        "#,
    )
    .bind(application_id)
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::PanelNotFound)?;

    Ok(AmbassadorPanel {
        application_id: row.get("application_id"),
        package_name: row.get("package_name"),
        activated_at: row.get("activated_at"),
        reviewed_by: row.get("reviewed_by"),
    })
}

fn seed_timestamp(year: i32, month: u32, day: u32, hour: u32) -> anyhow::Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .context("invalid seed timestamp")
}

fn seed_application(
    id: &str,
    (first_name, last_name): (&str, &str),
    email: &str,
    (school, city, district): (&str, &str, &str),
    submitted_at: DateTime<Utc>,
) -> AmbassadorApplication {
    AmbassadorApplication {
        id: id.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: email.to_string(),
        phone: "+90 532 000 00 00".to_string(),
        school: school.to_string(),
        city: city.to_string(),
        district: district.to_string(),
        region: String::new(),
        experience: String::new(),
        motivation: "Hareket temelli öğrenmeyi okulumuzda yaygınlaştırmak istiyorum.".to_string(),
        student_count: Some(120),
        status: ApplicationStatus::Pending,
        package_name: None,
        price: None,
        billing_info: None,
        notes: None,
        submitted_at,
        reviewed_at: None,
        reviewed_by: None,
        payment_declared_at: None,
    }
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let pending = seed_application(
        "ELCI-1767258000000-SEED00001",
        ("Elif", "Kaya"),
        "elif.kaya@kinekids.example",
        ("Moda İlkokulu", "İstanbul", "Kadıköy"),
        seed_timestamp(2026, 1, 1, 9)?,
    );

    let mut approved = seed_application(
        "ELCI-1767949200000-SEED00002",
        ("Mert", "Demir"),
        "mert.demir@kinekids.example",
        ("Bornova Koleji", "İzmir", "Bornova"),
        seed_timestamp(2026, 1, 9, 9)?,
    );
    approved.status = ApplicationStatus::Approved;
    approved.reviewed_at = Some(seed_timestamp(2026, 1, 10, 14)?);
    approved.reviewed_by = Some(lifecycle::DEFAULT_REVIEWER.to_string());

    let mut declared = seed_application(
        "ELCI-1768467600000-SEED00003",
        ("Zeynep", "Arslan"),
        "zeynep.arslan@kinekids.example",
        ("Çankaya Ortaokulu", "Ankara", "Çankaya"),
        seed_timestamp(2026, 1, 15, 9)?,
    );
    declared.status = ApplicationStatus::PackagePending(PackageTier::Gold);
    declared.package_name = Some(PackageTier::Gold);
    declared.price = Some(PackageTier::Gold.price());
    declared.billing_info = Some(BillingInfo {
        name: "Zeynep Arslan".to_string(),
        address: "Kızılay Mah. 3, Çankaya".to_string(),
        tax_office: "Çankaya".to_string(),
        tax_number: "10000000146".to_string(),
    });
    declared.reviewed_at = Some(seed_timestamp(2026, 1, 16, 10)?);
    declared.reviewed_by = Some(lifecycle::DEFAULT_REVIEWER.to_string());
    declared.payment_declared_at = Some(seed_timestamp(2026, 1, 18, 11)?);

    let applications = [pending, approved, declared];
    let sql = format!("{INSERT_APPLICATION} ON CONFLICT (email) DO NOTHING");
    for application in &applications {
        bind_application(&sql, application).execute(pool).await?;
    }

    Ok(())
}

#[derive(Serialize)]
struct ExportRow<'a> {
    id: &'a str,
    name: String,
    email: &'a str,
    phone: &'a str,
    school: &'a str,
    city: &'a str,
    district: &'a str,
    status: String,
    package: Option<&'static str>,
    price: Option<i32>,
    billing_name: Option<&'a str>,
    billing_address: Option<&'a str>,
    tax_office: Option<&'a str>,
    tax_number: Option<&'a str>,
    submitted_at: String,
    payment_declared_at: Option<String>,
    reviewed_at: Option<String>,
    reviewed_by: Option<&'a str>,
}

/// Writes applications as CSV for reconciling declared bank transfers.
pub fn export_csv<W: io::Write>(
    applications: &[AmbassadorApplication],
    writer: W,
) -> anyhow::Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    for application in applications {
        let billing = application.billing_info.as_ref();
        csv_writer.serialize(ExportRow {
            id: &application.id,
            name: application.full_name(),
            email: &application.email,
            phone: &application.phone,
            school: &application.school,
            city: &application.city,
            district: &application.district,
            status: application.status.to_string(),
            package: application.package_name.map(PackageTier::name),
            price: application.price,
            billing_name: billing.map(|b| b.name.as_str()),
            billing_address: billing.map(|b| b.address.as_str()),
            tax_office: billing.map(|b| b.tax_office.as_str()),
            tax_number: billing.map(|b| b.tax_number.as_str()),
            submitted_at: application.submitted_at.to_rfc3339(),
            payment_declared_at: application.payment_declared_at.map(|at| at.to_rfc3339()),
            reviewed_at: application.reviewed_at.map(|at| at.to_rfc3339()),
            reviewed_by: application.reviewed_by.as_deref(),
        })?;
    }

    csv_writer.flush()?;
    Ok(applications.len())
}

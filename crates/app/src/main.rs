use ledger::{Record, Summary};
use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "duitku={level},ledger={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.database).await?;
    let ledger = ledger::Ledger::builder()
        .database(db)
        .config(settings.ledger.reactor_config())
        .build();
    tracing::info!("ledger ready, waiting for changes");

    let mut records = ledger.reactor().records();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
            emission = records.changed() => match emission {
                Ok(list) => log_overview(&list),
                Err(err) => {
                    tracing::error!("records stream failed: {err}");
                    break;
                }
            }
        }
    }

    Ok(())
}

fn log_overview(records: &[Record]) {
    let summary = Summary::from_records(records);
    tracing::info!(
        records = records.len(),
        income = %summary.income,
        expense = %summary.expense,
        net = %summary.net_balance(),
        "ledger updated"
    );
    if let Some(breakdown) = summary.breakdown() {
        tracing::info!(
            "income {:.1}% / expense {:.1}%",
            breakdown.income.percent,
            breakdown.expense.percent
        );
    }
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

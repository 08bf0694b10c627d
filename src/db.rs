//! SQLite storage for fetched people.
//!
//! [`Database`] owns the pool for the whole run. It is opened once at startup
//! and must be closed only after every persistence task has finished.

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::debug;

use crate::error::Result;
use crate::model::Person;
use crate::model::PersonRow;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS swapi_people (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    birth_year TEXT NOT NULL,
    eye_color TEXT NOT NULL,
    gender TEXT NOT NULL,
    hair_color TEXT NOT NULL,
    height TEXT NOT NULL,
    homeworld TEXT NOT NULL,
    mass TEXT NOT NULL,
    skin_color TEXT NOT NULL,
    films TEXT NOT NULL,
    species TEXT NOT NULL,
    starships TEXT NOT NULL,
    vehicles TEXT NOT NULL
)";

const INSERT_PERSON: &str = "INSERT INTO swapi_people (
    id, name, birth_year, eye_color, gender, hair_color, height,
    homeworld, mass, skin_color, films, species, starships, vehicles
) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens a pool on `database_url`, creating the database file if missing.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Ok(Database { pool })
    }

    /// A private in-memory database. Limited to one long-lived connection,
    /// since every SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect("sqlite::memory:")
            .await?;

        Ok(Database { pool })
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    /// Writes one fetched window in a single transaction. `None` entries are
    /// people that were not found and are skipped. Returns the rows written.
    pub async fn insert_people(&self, people: &[Option<Person>]) -> Result<u64> {
        self.ensure_schema().await?;

        let rows: Vec<PersonRow> = people.iter().flatten().map(PersonRow::from).collect();

        let mut tx = self.pool.begin().await?;
        for row in &rows {
            sqlx::query(INSERT_PERSON)
                .bind(row.id)
                .bind(&row.name)
                .bind(&row.birth_year)
                .bind(&row.eye_color)
                .bind(&row.gender)
                .bind(&row.hair_color)
                .bind(&row.height)
                .bind(&row.homeworld)
                .bind(&row.mass)
                .bind(&row.skin_color)
                .bind(&row.films)
                .bind(&row.species)
                .bind(&row.starships)
                .bind(&row.vehicles)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        debug!(rows = rows.len(), "batch committed");
        Ok(rows.len() as u64)
    }

    pub async fn count_people(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM swapi_people")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn fetch_people(&self) -> Result<Vec<PersonRow>> {
        let rows = sqlx::query_as::<_, PersonRow>("SELECT * FROM swapi_people ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

//! PostgreSQL destination connector
//!
//! Every table replacement runs in its own transaction: drop, create and
//! insert commit together, so a failed write leaves the previous table intact.

use super::{ConnectionTarget, Connector, TableSink};
use crate::error::{EtlError, Result};
use crate::table::{Scalar, TableSnapshot};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};

/// PostgreSQL caps bind parameters per statement at 65535
const MAX_PARAMS: usize = 65_535;
const MAX_ROWS_PER_INSERT: usize = 1_000;

/// Opens [`PostgresSink`] handles
#[derive(Clone, Debug)]
pub struct PostgresConnector {
    target: ConnectionTarget,
}

impl PostgresConnector {
    pub fn new(target: ConnectionTarget) -> Self {
        Self { target }
    }
}

impl Connector for PostgresConnector {
    type Handle = PostgresSink;

    fn describe(&self) -> String {
        self.target.to_string()
    }

    async fn connect(&self) -> Result<PostgresSink> {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.target.host)
            .port(self.target.port)
            .user(&self.target.user)
            .password(&self.target.password)
            .dbname(&self.target.database);
        log::debug!("Connecting to {}", self.target);

        let (client, connection) = config
            .connect(NoTls)
            .await
            .map_err(|e| EtlError::connection(&self.target, e))?;

        let target = self.target.to_string();
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                log::warn!("Connection to {} closed with error: {}", target, e);
            }
        });

        Ok(PostgresSink {
            client: Mutex::new(client),
            driver,
            target: self.target.to_string(),
        })
    }
}

/// Live PostgreSQL connection
pub struct PostgresSink {
    client: Mutex<Client>,
    driver: JoinHandle<()>,
    target: String,
}

impl TableSink for PostgresSink {
    async fn replace_table(&self, table: &str, snapshot: &TableSnapshot) -> Result<usize> {
        let types = column_types(snapshot);
        let write_err = |e: tokio_postgres::Error| EtlError::write(table, e);

        let mut client = self.client.lock().await;
        let tx = client.transaction().await.map_err(write_err)?;

        tx.batch_execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))
            .await
            .map_err(write_err)?;
        let create = create_table_sql(table, snapshot.columns(), &types);
        log::debug!("{}", create);
        tx.batch_execute(&create).await.map_err(write_err)?;

        if snapshot.columns().is_empty() {
            let sql = format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table));
            for _ in snapshot.rows() {
                tx.execute(sql.as_str(), &[]).await.map_err(write_err)?;
            }
        } else {
            let batch = rows_per_insert(snapshot.columns().len());
            for chunk in snapshot.rows().chunks(batch) {
                let sql = insert_sql(table, snapshot.columns(), chunk.len());
                let values: Vec<Box<dyn ToSql + Sync + Send>> = chunk
                    .iter()
                    .flat_map(|row| row.iter().zip(&types).map(|(cell, ty)| ty.bind(cell)))
                    .collect();
                let params: Vec<&(dyn ToSql + Sync)> = values
                    .iter()
                    .map(|v| v.as_ref() as &(dyn ToSql + Sync))
                    .collect();
                tx.execute(sql.as_str(), &params).await.map_err(write_err)?;
            }
        }

        tx.commit().await.map_err(write_err)?;
        Ok(snapshot.len())
    }
}

impl Drop for PostgresSink {
    fn drop(&mut self) {
        log::debug!("Closing destination connection {}", self.target);
        self.driver.abort();
    }
}

/// Destination column type inferred from the cells of one column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    BigInt,
    Double,
    Boolean,
    Text,
}

impl ColumnType {
    fn sql(&self) -> &'static str {
        match self {
            Self::BigInt => "BIGINT",
            Self::Double => "DOUBLE PRECISION",
            Self::Boolean => "BOOLEAN",
            Self::Text => "TEXT",
        }
    }

    fn infer<'a>(cells: impl Iterator<Item = &'a Scalar>) -> Self {
        let mut inferred: Option<Self> = None;
        for cell in cells {
            let kind = match cell {
                Scalar::Null => continue,
                Scalar::Integer(_) => Self::BigInt,
                Scalar::Decimal(_) => Self::Double,
                Scalar::Boolean(_) => Self::Boolean,
                Scalar::Text(_) => return Self::Text,
            };
            inferred = Some(match (inferred, kind) {
                (None, k) => k,
                (Some(a), b) if a == b => a,
                (Some(Self::BigInt), Self::Double) | (Some(Self::Double), Self::BigInt) => {
                    Self::Double
                }
                _ => return Self::Text,
            });
        }
        inferred.unwrap_or(Self::Text)
    }

    fn bind(&self, cell: &Scalar) -> Box<dyn ToSql + Sync + Send> {
        match (self, cell) {
            (_, Scalar::Null) => match self {
                Self::BigInt => Box::new(None::<i64>),
                Self::Double => Box::new(None::<f64>),
                Self::Boolean => Box::new(None::<bool>),
                Self::Text => Box::new(None::<String>),
            },
            (Self::BigInt, Scalar::Integer(i)) => Box::new(Some(*i)),
            (Self::Double, Scalar::Integer(i)) => Box::new(Some(*i as f64)),
            (Self::Double, Scalar::Decimal(d)) => Box::new(Some(*d)),
            (Self::Boolean, Scalar::Boolean(b)) => Box::new(Some(*b)),
            (_, other) => Box::new(Some(other.to_string())),
        }
    }
}

fn column_types(snapshot: &TableSnapshot) -> Vec<ColumnType> {
    (0..snapshot.columns().len())
        .map(|idx| ColumnType::infer(snapshot.rows().iter().map(|r| &r[idx])))
        .collect()
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn create_table_sql(table: &str, columns: &[String], types: &[ColumnType]) -> String {
    let defs = columns
        .iter()
        .zip(types)
        .map(|(c, t)| format!("{} {}", quote_ident(c), t.sql()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({})", quote_ident(table), defs)
}

fn insert_sql(table: &str, columns: &[String], rows: usize) -> String {
    let names = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let width = columns.len();
    let tuples = (0..rows)
        .map(|r| {
            let slots = (1..=width)
                .map(|c| format!("${}", r * width + c))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({})", slots)
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {} ({}) VALUES {}", quote_ident(table), names, tuples)
}

fn rows_per_insert(columns: usize) -> usize {
    (MAX_PARAMS / columns.max(1)).clamp(1, MAX_ROWS_PER_INSERT)
}

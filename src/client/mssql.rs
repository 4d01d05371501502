//! SQL Server source connector
//!
//! Connects over TDS with SQL authentication. The server certificate is
//! trusted, matching how the warehouse container is provisioned.

use super::{ConnectionTarget, Connector, SourceCatalog};
use crate::error::{EtlError, Result};
use crate::table::{Scalar, TableSnapshot};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use tiberius::{AuthMethod, Client, ColumnData, Config, FromSql, ToSql};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

/// Opens [`MssqlSource`] handles
#[derive(Clone, Debug)]
pub struct MssqlConnector {
    target: ConnectionTarget,
}

impl MssqlConnector {
    pub fn new(target: ConnectionTarget) -> Self {
        Self { target }
    }

    fn config(&self) -> Config {
        let mut config = Config::new();
        config.host(&self.target.host);
        config.port(self.target.port);
        config.database(&self.target.database);
        config.authentication(AuthMethod::sql_server(
            &self.target.user,
            &self.target.password,
        ));
        config.trust_cert();
        config
    }
}

impl Connector for MssqlConnector {
    type Handle = MssqlSource;

    fn describe(&self) -> String {
        self.target.to_string()
    }

    async fn connect(&self) -> Result<MssqlSource> {
        let config = self.config();
        log::debug!("Connecting to {}", self.target);

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| EtlError::connection(&self.target, e))?;
        tcp.set_nodelay(true)
            .map_err(|e| EtlError::connection(&self.target, e))?;

        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| EtlError::connection(&self.target, e))?;

        Ok(MssqlSource {
            client: Mutex::new(client),
            target: self.target.to_string(),
        })
    }
}

/// Live SQL Server connection
pub struct MssqlSource {
    client: Mutex<Client<Compat<TcpStream>>>,
    target: String,
}

impl SourceCatalog for MssqlSource {
    async fn list_tables(&self, candidates: &[String]) -> Result<Vec<String>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let sql = catalog_query(candidates.len());
        let params: Vec<&dyn ToSql> = candidates.iter().map(|c| c as &dyn ToSql).collect();
        log::debug!("{}", sql);

        let mut client = self.client.lock().await;
        let rows = client
            .query(sql, &params)
            .await
            .map_err(EtlError::query)?
            .into_first_result()
            .await
            .map_err(EtlError::query)?;

        let mut names = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(name) = row.try_get::<&str, _>(0).map_err(EtlError::query)? {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    async fn fetch_table(&self, table: &str) -> Result<TableSnapshot> {
        let sql = format!("SELECT * FROM {}", quote_ident(table));
        log::debug!("{}", sql);

        let mut client = self.client.lock().await;
        let mut stream = client.simple_query(sql).await.map_err(EtlError::query)?;
        let columns: Vec<String> = stream
            .columns()
            .await
            .map_err(EtlError::query)?
            .map(|cols| cols.iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();
        let rows = stream.into_first_result().await.map_err(EtlError::query)?;

        let mut snapshot = TableSnapshot::new(table, columns);
        for row in rows {
            let cells = row
                .into_iter()
                .map(|data| to_scalar(&data))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| EtlError::query(format!("decoding {}: {}", table, e)))?;
            snapshot.push_row(cells)?;
        }

        Ok(snapshot)
    }
}

impl Drop for MssqlSource {
    fn drop(&mut self) {
        log::debug!("Closing source connection {}", self.target);
    }
}

fn catalog_query(candidates: usize) -> String {
    let placeholders = (1..=candidates)
        .map(|i| format!("@P{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT t.name AS table_name FROM sys.tables t WHERE t.name IN ({})",
        placeholders
    )
}

fn quote_ident(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

fn to_scalar(data: &ColumnData<'static>) -> tiberius::Result<Scalar> {
    let scalar: Scalar = match data {
        ColumnData::U8(v) => v.map(|v| v as i64).into(),
        ColumnData::I16(v) => v.map(|v| v as i64).into(),
        ColumnData::I32(v) => v.map(|v| v as i64).into(),
        ColumnData::I64(v) => (*v).into(),
        ColumnData::F32(v) => v.map(|v| v as f64).into(),
        ColumnData::F64(v) => (*v).into(),
        ColumnData::Bit(v) => (*v).into(),
        ColumnData::String(v) => v.as_ref().map(|s| s.to_string()).into(),
        ColumnData::Guid(v) => v.as_ref().map(|g| g.to_string()).into(),
        ColumnData::Numeric(v) => v
            .as_ref()
            .map(|n| n.value() as f64 / 10f64.powi(n.scale() as i32))
            .into(),
        ColumnData::Binary(v) => v.as_ref().map(|b| hex(b)).into(),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(data)?.map(|v| v.to_string()).into()
        }
        ColumnData::Date(_) => NaiveDate::from_sql(data)?.map(|v| v.to_string()).into(),
        ColumnData::Time(_) => NaiveTime::from_sql(data)?.map(|v| v.to_string()).into(),
        ColumnData::DateTimeOffset(_) => DateTime::<FixedOffset>::from_sql(data)?
            .map(|v| v.to_rfc3339())
            .into(),
        other => {
            log::warn!("Unsupported SQL Server value {:?}, storing NULL", other);
            Scalar::Null
        }
    };
    Ok(scalar)
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

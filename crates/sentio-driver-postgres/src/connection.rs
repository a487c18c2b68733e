//! PostgreSQL connection implementation

use async_trait::async_trait;
use sentio_core::{
    ColumnMeta, Connection, Endpoint, QueryResult, Result, Row, SentioError, SslMode,
    StatementResult, Value,
};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};

use crate::tls::build_tls_connector;
use crate::value::{bind_params, postgres_to_value};

fn format_postgres_error(error: &tokio_postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut message = db_error.message().to_string();

    if let Some(detail) = db_error.detail() {
        if !detail.trim().is_empty() {
            message.push_str(&format!(" (detail: {})", detail));
        }
    }

    if let Some(hint) = db_error.hint() {
        if !hint.trim().is_empty() {
            message.push_str(&format!(" (hint: {})", hint));
        }
    }

    format!("{} (code: {})", message, db_error.code().code())
}

/// Map a driver error onto the core taxonomy.
///
/// Errors reported by the server are query errors; anything without a
/// database error attached happened on the transport.
fn classify_error(context: &str, error: &tokio_postgres::Error) -> SentioError {
    let message = format_postgres_error(error);
    if error.as_db_error().is_some() && !error.is_closed() {
        SentioError::Query(format!("{}: {}", context, message))
    } else {
        SentioError::Connection(format!("{}: {}", context, message))
    }
}

/// SQLSTATE class 25: invalid transaction state, including a failed
/// transaction block (`25P02`) and one that is unexpectedly still open.
fn is_transaction_state_error(code: &SqlState) -> bool {
    code.code().starts_with("25")
}

/// Effect a statement has on the session's transaction block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransactionControl {
    Begin,
    End,
    Other,
}

fn transaction_control(sql: &str) -> TransactionControl {
    let mut words = sql
        .split(|c: char| c.is_whitespace() || c == ';')
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_uppercase);
    let first = words.next();
    let second = words.next();
    match (first.as_deref(), second.as_deref()) {
        (Some("BEGIN"), _) | (Some("START"), Some("TRANSACTION")) => TransactionControl::Begin,
        // ROLLBACK TO SAVEPOINT keeps the outer block open
        (Some("ROLLBACK"), Some("TO")) => TransactionControl::Other,
        (Some("COMMIT" | "END" | "ABORT" | "ROLLBACK"), _)
        | (Some("PREPARE"), Some("TRANSACTION")) => TransactionControl::End,
        _ => TransactionControl::Other,
    }
}

/// Lifecycle flags for one session
///
/// A session is only reusable when it is open, has not seen a transport or
/// transaction-state fault, and is not inside a transaction block.
#[derive(Debug, Default)]
struct SessionState {
    closed: AtomicBool,
    poisoned: AtomicBool,
    in_transaction: AtomicBool,
}

impl SessionState {
    fn poison(&self) {
        self.poisoned.store(true, Ordering::SeqCst);
    }

    /// Track transaction blocks opened and closed by successful statements.
    fn statement_succeeded(&self, sql: &str) {
        match transaction_control(sql) {
            TransactionControl::Begin => self.in_transaction.store(true, Ordering::SeqCst),
            TransactionControl::End => self.in_transaction.store(false, Ordering::SeqCst),
            TransactionControl::Other => {}
        }
    }

    /// Returns true when the failure poisons the session.
    fn statement_failed(&self, err: &SentioError, sqlstate: Option<&SqlState>) -> bool {
        let fatal = err.is_connection_fault() || sqlstate.is_some_and(is_transaction_state_error);
        if fatal {
            self.poison();
        }
        fatal
    }

    fn is_reusable(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
            && !self.poisoned.load(Ordering::SeqCst)
            && !self.in_transaction.load(Ordering::SeqCst)
    }
}

/// PostgreSQL connection wrapper
///
/// Owns the client half of a tokio-postgres connection; the socket half runs
/// on a spawned task that ends when the client is dropped or the server goes
/// away.
pub struct PostgresConnection {
    client: Client,
    driver: JoinHandle<()>,
    session: SessionState,
}

impl PostgresConnection {
    /// Connect to a PostgreSQL database
    #[tracing::instrument(skip(endpoint), fields(host = %endpoint.host, port = endpoint.port, database = %endpoint.database))]
    pub async fn connect(endpoint: &Endpoint) -> Result<Self> {
        tracing::debug!(ssl_mode = %endpoint.ssl_mode, "connecting to PostgreSQL database");

        let config = build_config(endpoint);

        let (client, driver) = match build_tls_connector(endpoint)? {
            Some(tls) => {
                let (client, connection) = config
                    .connect(tls)
                    .await
                    .map_err(|e| classify_error("Failed to connect to PostgreSQL", &e))?;
                (client, spawn_driver(connection))
            }
            None => {
                let (client, connection) = config
                    .connect(NoTls)
                    .await
                    .map_err(|e| classify_error("Failed to connect to PostgreSQL", &e))?;
                (client, spawn_driver(connection))
            }
        };

        tracing::debug!("PostgreSQL connection established");
        Ok(Self {
            client,
            driver,
            session: SessionState::default(),
        })
    }

    /// Map and record a driver failure.
    ///
    /// Transport faults and invalid-transaction-state errors poison the
    /// session for good.
    fn observe(&self, context: &str, error: &tokio_postgres::Error) -> SentioError {
        let err = classify_error(context, error);
        if self.session.statement_failed(&err, error.code()) {
            tracing::warn!(error = %err, "PostgreSQL connection poisoned");
        }
        err
    }

    async fn prepare_and_bind(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<(tokio_postgres::Statement, Vec<crate::value::PgValue>)> {
        let statement = self
            .client
            .prepare(sql)
            .await
            .map_err(|e| self.observe("Failed to prepare statement", &e))?;
        let bound = bind_params(params, statement.params());
        Ok((statement, bound))
    }
}

pub(crate) fn build_config(endpoint: &Endpoint) -> tokio_postgres::Config {
    let mut config = tokio_postgres::Config::new();
    config
        .host(&endpoint.host)
        .port(endpoint.port)
        .dbname(&endpoint.database)
        .user(&endpoint.user)
        .application_name("sentio");

    if let Some(password) = &endpoint.password {
        config.password(password);
    }

    config.ssl_mode(match endpoint.ssl_mode {
        SslMode::Disable => tokio_postgres::config::SslMode::Disable,
        SslMode::Prefer => tokio_postgres::config::SslMode::Prefer,
        SslMode::Require => tokio_postgres::config::SslMode::Require,
    });

    config
}

fn spawn_driver<S, T>(connection: tokio_postgres::Connection<S, T>) -> JoinHandle<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::warn!(error = %e, "PostgreSQL connection terminated");
        }
    })
}

#[async_trait]
impl Connection for PostgresConnection {
    fn driver_name(&self) -> &str {
        "postgresql"
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult> {
        let (statement, pg_params) = self.prepare_and_bind(sql, params).await?;
        let param_refs: Vec<&(dyn ToSql + Sync)> =
            pg_params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        let affected_rows = self
            .client
            .execute(&statement, &param_refs)
            .await
            .map_err(|e| self.observe("Failed to execute statement", &e))?;
        self.session.statement_succeeded(sql);

        tracing::debug!(affected_rows, "statement executed");
        Ok(StatementResult { affected_rows })
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        let start_time = std::time::Instant::now();

        let (statement, pg_params) = self.prepare_and_bind(sql, params).await?;
        let param_refs: Vec<&(dyn ToSql + Sync)> =
            pg_params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

        let pg_rows = self
            .client
            .query(&statement, &param_refs)
            .await
            .map_err(|e| self.observe("Failed to execute query", &e))?;
        self.session.statement_succeeded(sql);

        let columns: Vec<ColumnMeta> = statement
            .columns()
            .iter()
            .enumerate()
            .map(|(ordinal, col)| ColumnMeta {
                name: col.name().to_string(),
                data_type: col.type_().name().to_string(),
                ordinal,
            })
            .collect();
        let column_names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();

        let mut rows = Vec::with_capacity(pg_rows.len());
        for pg_row in &pg_rows {
            let values = (0..columns.len())
                .map(|idx| postgres_to_value(pg_row, idx))
                .collect::<Result<Vec<_>>>()?;
            rows.push(Row::new(column_names.clone(), values));
        }

        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        tracing::debug!(row_count = rows.len(), execution_time_ms, "query executed");

        Ok(QueryResult {
            id: uuid::Uuid::new_v4(),
            columns,
            rows,
            execution_time_ms,
        })
    }

    async fn close(&self) -> Result<()> {
        if !self.session.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!("closing PostgreSQL connection");
            self.driver.abort();
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.session.closed.load(Ordering::SeqCst) || self.client.is_closed()
    }

    fn is_usable(&self) -> bool {
        !self.client.is_closed() && self.session.is_reusable()
    }
}

impl Drop for PostgresConnection {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

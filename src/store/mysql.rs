// ABOUTME: MySQL record store backed by a single mysql_async connection
// ABOUTME: Reads with the text protocol so stored values come back verbatim

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Conn, Opts, OptsBuilder, Params};

use super::{Credential, RecordStore};
use crate::error::StoreError;
use crate::row::{Row, Value};
use crate::utils::{quote_mysql_ident, sanitize_url};

/// One MySQL connection held for the whole run.
pub struct MysqlStore {
    conn: Option<Conn>,
    label: String,
}

impl MysqlStore {
    /// Open a connection. Credential fields, when set, replace the URI's.
    pub async fn connect(uri: &str, credential: &Credential) -> Result<Self, StoreError> {
        let opts = Opts::from_url(uri)?;
        let mut builder = OptsBuilder::from_opts(opts);
        if let Some(user) = &credential.user {
            builder = builder.user(Some(user.clone()));
        }
        if let Some(password) = &credential.password {
            builder = builder.pass(Some(password.clone()));
        }

        let label = sanitize_url(uri);
        tracing::debug!("Connecting to {}", label);
        let conn = Conn::new(builder).await?;
        tracing::debug!("Connected to {}", label);

        Ok(Self {
            conn: Some(conn),
            label,
        })
    }

    /// Close the connection. Any table locks still held on it are released
    /// by the server at this point.
    pub async fn disconnect(mut self) -> Result<(), StoreError> {
        if let Some(conn) = self.conn.take() {
            conn.disconnect().await?;
            tracing::debug!("Disconnected from {}", self.label);
        }
        Ok(())
    }

    fn conn(&mut self) -> Result<&mut Conn, StoreError> {
        self.conn
            .as_mut()
            .ok_or_else(|| StoreError::Rejected(format!("connection to {} is closed", self.label)))
    }
}

#[async_trait]
impl RecordStore for MysqlStore {
    async fn execute(&mut self, statement: &str) -> Result<(), StoreError> {
        tracing::trace!("execute: {}", statement);
        self.conn()?.query_drop(statement).await?;
        Ok(())
    }

    async fn fetch_all(&mut self, query: &str) -> Result<Vec<Row>, StoreError> {
        tracing::trace!("fetch_all: {}", query);
        let rows: Vec<mysql_async::Row> = self.conn()?.query(query).await?;
        Ok(rows.into_iter().map(convert_row).collect())
    }

    async fn insert(&mut self, table: &str, row: &Row) -> Result<(), StoreError> {
        let (columns, values): (Vec<String>, Vec<mysql_async::Value>) = row
            .columns()
            .map(|(name, value)| (quote_mysql_ident(name), to_mysql_value(value)))
            .unzip();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let statement = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_mysql_ident(table),
            columns.join(", "),
            placeholders
        );
        tracing::trace!("insert: {}", statement);

        self.conn()?
            .exec_drop(statement.as_str(), Params::Positional(values))
            .await?;
        Ok(())
    }

    async fn update(
        &mut self,
        table: &str,
        row: &Row,
        key_column: &str,
        key: &Value,
    ) -> Result<(), StoreError> {
        let (assignments, mut values): (Vec<String>, Vec<mysql_async::Value>) = row
            .columns()
            .map(|(name, value)| {
                (
                    format!("{} = ?", quote_mysql_ident(name)),
                    to_mysql_value(value),
                )
            })
            .unzip();
        if assignments.is_empty() {
            return Err(StoreError::Rejected(format!(
                "nothing to update in {} for {}={}",
                table, key_column, key
            )));
        }
        values.push(to_mysql_value(key));

        let statement = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            quote_mysql_ident(table),
            assignments.join(", "),
            quote_mysql_ident(key_column)
        );
        tracing::trace!("update: {}", statement);

        self.conn()?
            .exec_drop(statement.as_str(), Params::Positional(values))
            .await?;
        Ok(())
    }

    async fn delete(
        &mut self,
        table: &str,
        key_column: &str,
        key: &Value,
    ) -> Result<(), StoreError> {
        let statement = format!(
            "DELETE FROM {} WHERE {} = ?",
            quote_mysql_ident(table),
            quote_mysql_ident(key_column)
        );
        tracing::trace!("delete: {}", statement);

        self.conn()?
            .exec_drop(statement.as_str(), Params::Positional(vec![to_mysql_value(key)]))
            .await?;
        Ok(())
    }

    async fn list_tables(&mut self) -> Result<Vec<String>, StoreError> {
        let listed: Vec<(String, String)> = self
            .conn()?
            .query("SHOW FULL TABLES WHERE Table_type = 'BASE TABLE'")
            .await?;
        let mut tables: Vec<String> = listed.into_iter().map(|(name, _kind)| name).collect();
        tables.sort();
        Ok(tables)
    }
}

fn convert_row(row: mysql_async::Row) -> Row {
    let names: Vec<String> = row
        .columns_ref()
        .iter()
        .map(|c| c.name_str().into_owned())
        .collect();
    let values = row.unwrap();
    names
        .into_iter()
        .zip(values.into_iter().map(from_mysql_value))
        .collect()
}

/// Text-protocol results arrive as bytes; binary-protocol ones may be typed.
fn from_mysql_value(value: mysql_async::Value) -> Value {
    use mysql_async::Value as My;
    match value {
        My::NULL => Value::Null,
        My::Bytes(bytes) => Value::Text(String::from_utf8_lossy(&bytes).into_owned()),
        My::Int(i) => Value::Int(i),
        My::UInt(u) => Value::UInt(u),
        My::Float(f) => Value::Float(f as f64),
        My::Double(d) => Value::Float(d),
        My::Date(y, mo, d, h, mi, s, us) => {
            let mut text = format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                y, mo, d, h, mi, s
            );
            if us > 0 {
                text.push_str(&format!(".{:06}", us));
            }
            Value::Text(text)
        }
        My::Time(neg, days, h, mi, s, us) => {
            let hours = days * 24 + h as u32;
            let mut text = format!(
                "{}{:02}:{:02}:{:02}",
                if neg { "-" } else { "" },
                hours,
                mi,
                s
            );
            if us > 0 {
                text.push_str(&format!(".{:06}", us));
            }
            Value::Text(text)
        }
    }
}

fn to_mysql_value(value: &Value) -> mysql_async::Value {
    use mysql_async::Value as My;
    match value {
        Value::Null => My::NULL,
        Value::Int(i) => My::Int(*i),
        Value::UInt(u) => My::UInt(*u),
        Value::Float(f) => My::Double(*f),
        Value::Text(s) => My::Bytes(s.clone().into_bytes()),
    }
}

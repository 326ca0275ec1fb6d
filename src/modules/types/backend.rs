//! Backend selector type definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported database backends
///
/// The selector decides which client protocol a wrapper speaks. The legacy
/// client-library names (`pyodbc`, `pymssql`, `pymysql`, `psycopg2`) are
/// accepted as aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Backend {
    /// SQL Server through an ODBC driver connection string
    Odbc,
    /// Named ODBC data source
    Dsn,
    /// SQL Server over native TDS
    NativeMssql,
    /// MySQL over the native protocol
    NativeMysql,
    /// PostgreSQL
    Postgres,
}

/// Quoting style for identifiers in `USE <db>` statements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierQuote {
    /// `[name]`, with `]` doubled
    Bracket,
    /// `` `name` ``, with `` ` `` doubled
    Backtick,
}

impl IdentifierQuote {
    /// Quote an identifier in this style
    pub fn quote(&self, identifier: &str) -> String {
        match self {
            IdentifierQuote::Bracket => format!("[{}]", identifier.replace(']', "]]")),
            IdentifierQuote::Backtick => format!("`{}`", identifier.replace('`', "``")),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Odbc => write!(f, "odbc"),
            Backend::Dsn => write!(f, "dsn"),
            Backend::NativeMssql => write!(f, "native-mssql"),
            Backend::NativeMysql => write!(f, "native-mysql"),
            Backend::Postgres => write!(f, "postgres"),
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "odbc" | "pyodbc" => Ok(Backend::Odbc),
            "dsn" => Ok(Backend::Dsn),
            "native-mssql" | "mssql" | "pymssql" => Ok(Backend::NativeMssql),
            "native-mysql" | "mysql" | "pymysql" => Ok(Backend::NativeMysql),
            "postgres" | "postgresql" | "psycopg2" => Ok(Backend::Postgres),
            _ => Err(format!("method \"{}\" is not supported", s)),
        }
    }
}

impl TryFrom<String> for Backend {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Backend> for String {
    fn from(backend: Backend) -> Self {
        backend.to_string()
    }
}

impl Backend {
    /// Returns all supported backends
    pub fn all() -> &'static [Backend] {
        &[
            Backend::Odbc,
            Backend::Dsn,
            Backend::NativeMssql,
            Backend::NativeMysql,
            Backend::Postgres,
        ]
    }

    /// Default TCP port of the server behind this backend
    pub fn default_port(&self) -> u16 {
        match self {
            Backend::Odbc | Backend::Dsn | Backend::NativeMssql => 1433,
            Backend::NativeMysql => 3306,
            Backend::Postgres => 5432,
        }
    }

    /// Returns true if the client returns dictionary rows without being asked
    pub fn native_records(&self) -> bool {
        matches!(self, Backend::NativeMssql | Backend::NativeMysql)
    }

    /// Returns true if dictionary rows can be produced at all
    pub fn supports_records(&self) -> bool {
        !matches!(self, Backend::Postgres)
    }

    /// Identifier quoting for `USE <db>`, or `None` if switching is unsupported
    pub fn use_quote(&self) -> Option<IdentifierQuote> {
        match self {
            Backend::Odbc | Backend::Dsn | Backend::NativeMssql => Some(IdentifierQuote::Bracket),
            Backend::NativeMysql => Some(IdentifierQuote::Backtick),
            Backend::Postgres => None,
        }
    }
}

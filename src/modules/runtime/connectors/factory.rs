//! Connector construction per backend

use sqlwrap_core::{ConnectionSettings, ConnectionTarget, WrapperError};
use sqlwrap_types::Backend;
use tracing::info;

use super::traits::Connector;

/// Cargo feature that compiles in the driver for `backend`
pub fn driver_feature(backend: Backend) -> &'static str {
    match backend {
        Backend::Odbc | Backend::Dsn => "odbc",
        Backend::NativeMssql => "mssql",
        Backend::NativeMysql => "mysql",
        Backend::Postgres => "postgres",
    }
}

/// Whether the driver for `backend` is compiled into this build
pub fn driver_available(backend: Backend) -> bool {
    match backend {
        Backend::Odbc | Backend::Dsn => cfg!(feature = "odbc"),
        Backend::NativeMssql => cfg!(feature = "mssql"),
        Backend::NativeMysql => cfg!(feature = "mysql"),
        Backend::Postgres => cfg!(feature = "postgres"),
    }
}

/// Connection strings to try for an ODBC or DSN target, in order
///
/// Plain ODBC targets fall back to the alternate driver when one is configured.
pub fn odbc_connection_strings(
    target: &ConnectionTarget,
    settings: &ConnectionSettings,
) -> Vec<String> {
    let mut drivers = vec![settings.odbc_driver()];
    if target.backend() == Backend::Odbc {
        if let Some(fallback) = settings.odbc_fallback_driver() {
            if fallback != settings.odbc_driver() {
                drivers.push(fallback);
            }
        }
    }

    drivers
        .into_iter()
        .filter_map(|driver| target.odbc_connection_string(driver))
        .collect()
}

/// Open a connector for `target`
///
/// Every driver failure is reported as [`WrapperError::Connection`].
pub async fn connect(
    target: &ConnectionTarget,
    settings: &ConnectionSettings,
) -> Result<Box<dyn Connector>, WrapperError> {
    let backend = target.backend();
    if !driver_available(backend) {
        return Err(WrapperError::connection(
            target.host(),
            target.user(),
            format!(
                "{} driver not compiled in (enable the `{}` feature)",
                backend,
                driver_feature(backend)
            ),
        ));
    }

    info!(backend = %backend, host = target.host(), "opening connection");

    match target {
        #[cfg(feature = "odbc")]
        ConnectionTarget::Odbc { .. } | ConnectionTarget::Dsn { .. } => {
            let attempts = odbc_connection_strings(target, settings);
            let connector = super::odbc::OdbcConnector::connect(target, &attempts)?;
            Ok(Box::new(connector))
        }
        #[cfg(feature = "mssql")]
        ConnectionTarget::NativeMssql { .. } => {
            let connector = super::mssql::MssqlConnector::connect(target, settings).await?;
            Ok(Box::new(connector))
        }
        #[cfg(feature = "mysql")]
        ConnectionTarget::NativeMysql { .. } => {
            let connector = super::mysql::MySqlConnector::connect(target).await?;
            Ok(Box::new(connector))
        }
        #[cfg(feature = "postgres")]
        ConnectionTarget::Postgres { .. } => {
            let connector = super::postgres::PostgresConnector::connect(target).await?;
            Ok(Box::new(connector))
        }
        #[allow(unreachable_patterns)]
        _ => {
            let _ = settings;
            Err(WrapperError::Internal(format!(
                "no connector for {} targets",
                backend
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlwrap_core::{Credentials, WrapperConfig};

    fn odbc_target(credentials: Option<Credentials>) -> ConnectionTarget {
        let mut config = WrapperConfig::new("prd", "apollo", Backend::Odbc).with_db("worldwide");
        config.credentials = credentials;
        ConnectionTarget::build(&config, "apollo", &ConnectionSettings::default()).unwrap()
    }

    #[test]
    fn test_odbc_fallback_strings() {
        let strings = odbc_connection_strings(&odbc_target(None), &ConnectionSettings::default());
        assert_eq!(
            strings,
            vec![
                "DRIVER={SQL Server};SERVER=apollo;PORT=1433;Trusted_Connection=yes;DATABASE=worldwide"
                    .to_string(),
                "DRIVER={FreeTDS};SERVER=apollo;PORT=1433;Trusted_Connection=yes;DATABASE=worldwide"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_odbc_fallback_disabled() {
        let settings = ConnectionSettings {
            odbc_fallback_driver: None,
            ..ConnectionSettings::default()
        };
        let strings = odbc_connection_strings(&odbc_target(None), &settings);
        assert_eq!(strings.len(), 1);
    }

    #[test]
    fn test_dsn_has_no_fallback() {
        let config = WrapperConfig::new("prd", "APOLLO_DSN", Backend::Dsn)
            .with_credentials(Credentials::new("svc_batch", "pw"));
        let target =
            ConnectionTarget::build(&config, "ignored-host", &ConnectionSettings::default())
                .unwrap();
        let strings = odbc_connection_strings(&target, &ConnectionSettings::default());
        assert_eq!(strings, vec!["DSN=APOLLO_DSN;UID=svc_batch;PWD=pw".to_string()]);
    }

    #[test]
    fn test_non_odbc_targets_have_no_strings() {
        let config = WrapperConfig::new("dev", "pgdev", Backend::Postgres).with_db("batch");
        let target =
            ConnectionTarget::build(&config, "pgdev", &ConnectionSettings::default()).unwrap();
        assert!(odbc_connection_strings(&target, &ConnectionSettings::default()).is_empty());
    }

    #[test]
    fn test_driver_features() {
        assert_eq!(driver_feature(Backend::Dsn), "odbc");
        assert_eq!(driver_feature(Backend::NativeMssql), "mssql");
        assert_eq!(driver_available(Backend::Postgres), cfg!(feature = "postgres"));
    }

    #[cfg(not(feature = "odbc"))]
    #[tokio::test]
    async fn test_missing_driver_is_connection_error() {
        let err = connect(&odbc_target(None), &ConnectionSettings::default())
            .await
            .err()
            .unwrap();
        match err {
            WrapperError::Connection { host, user, message } => {
                assert_eq!(host, "apollo");
                assert_eq!(user, sqlwrap_core::error::UNKNOWN_USER);
                assert!(message.contains("`odbc` feature"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(not(feature = "odbc"))]
    #[tokio::test]
    async fn test_connection_error_names_configured_user() {
        let target = odbc_target(Some(Credentials {
            user: Some("svc_batch".to_string()),
            password: None,
        }));
        match connect(&target, &ConnectionSettings::default()).await {
            Err(WrapperError::Connection { user, .. }) => assert_eq!(user, "svc_batch"),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("odbc is not compiled in"),
        }
    }
}

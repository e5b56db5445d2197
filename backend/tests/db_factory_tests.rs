//! Tests for db::factory module - repository creation and configuration.

mod support;

use std::io::Write;
use std::str::FromStr;

use tailtown::db::factory::{RepositoryBuilder, RepositoryFactory, RepositoryType};
use tailtown::db::repository::TenantRepository;

#[test]
fn test_repository_type_from_str() {
    for name in ["postgres", "POSTGRES", "pg"] {
        assert_eq!(RepositoryType::from_str(name).unwrap(), RepositoryType::Postgres);
    }
    for name in ["local", "LOCAL", "memory"] {
        assert_eq!(RepositoryType::from_str(name).unwrap(), RepositoryType::Local);
    }

    let result = RepositoryType::from_str("invalid");
    assert!(result.unwrap_err().contains("Unknown repository type"));
}

#[test]
fn test_repository_type_from_env_default() {
    support::with_scoped_env(
        &[
            ("REPOSITORY_TYPE", None),
            ("DATABASE_URL", None),
            ("PG_DATABASE_URL", None),
        ],
        || {
            assert_eq!(RepositoryType::from_env(), RepositoryType::Local);
        },
    );
}

#[test]
fn test_repository_type_from_env_with_database_url() {
    support::with_scoped_env(
        &[
            ("REPOSITORY_TYPE", None),
            ("DATABASE_URL", Some("postgres://localhost/tailtown")),
        ],
        || {
            assert_eq!(RepositoryType::from_env(), RepositoryType::Postgres);
        },
    );
    support::with_scoped_env(
        &[
            ("REPOSITORY_TYPE", None),
            ("DATABASE_URL", None),
            ("PG_DATABASE_URL", Some("postgres://localhost/tailtown")),
        ],
        || {
            assert_eq!(RepositoryType::from_env(), RepositoryType::Postgres);
        },
    );
}

#[test]
fn test_repository_type_from_env_explicit() {
    support::with_scoped_env(&[("REPOSITORY_TYPE", Some("local"))], || {
        assert_eq!(RepositoryType::from_env(), RepositoryType::Local);
    });
    support::with_scoped_env(&[("REPOSITORY_TYPE", Some("postgres"))], || {
        assert_eq!(RepositoryType::from_env(), RepositoryType::Postgres);
    });
}

#[test]
fn test_repository_type_from_env_invalid_defaults_to_local() {
    support::with_scoped_env(
        &[
            ("REPOSITORY_TYPE", Some("invalid")),
            ("DATABASE_URL", None),
            ("PG_DATABASE_URL", None),
        ],
        || {
            assert_eq!(RepositoryType::from_env(), RepositoryType::Local);
        },
    );
}

#[tokio::test]
async fn test_create_local_via_factory() {
    let repo = RepositoryFactory::create(RepositoryType::Local, None, None)
        .await
        .unwrap();
    assert!(repo.list_tenants().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_local_with_demo_tenant() {
    let repo = RepositoryFactory::create(RepositoryType::Local, None, Some("dev"))
        .await
        .unwrap();
    let tenant = repo.get_tenant_by_slug("dev").await.unwrap();
    assert!(tenant.is_active);
}

#[cfg(feature = "postgres-repo")]
#[tokio::test]
async fn test_create_postgres_without_config_fails() {
    let result = RepositoryFactory::create(RepositoryType::Postgres, None, None).await;
    let err = result.err().unwrap();
    assert!(err.to_string().contains("requires PostgresConfig"));
}

#[cfg(not(feature = "postgres-repo"))]
#[tokio::test]
async fn test_create_postgres_without_feature_fails() {
    let result = RepositoryFactory::create(RepositoryType::Postgres, None, None).await;
    let err = result.err().unwrap();
    assert!(err.to_string().contains("feature not enabled"));
}

#[tokio::test]
async fn test_builder_reads_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[repository]\ntype = \"local\"\n\n[local]\ndemo_tenant = \"seaside\"\n"
    )
    .unwrap();

    let builder = RepositoryBuilder::new().from_config_file(file.path()).unwrap();
    assert_eq!(builder.selected_type(), RepositoryType::Local);

    let repo = builder.build().await.unwrap();
    assert_eq!(repo.get_tenant_by_slug("seaside").await.unwrap().slug, "seaside");
}

#[test]
fn test_builder_rejects_unknown_type_in_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[repository]\ntype = \"mongo\"\n").unwrap();
    assert!(RepositoryBuilder::new().from_config_file(file.path()).is_err());
}

//! Catalog loading against a real PostgreSQL
//!
//! Run with `DATABASE_URL` set and `--ignored`.

use api::{
    models::CreateUserRequest,
    repositories::{BandRepository, CatalogRepository, UserRepository, band::NewBand},
    seed::{CATEGORIES_FILE, INSTRUMENTS_FILE, SeedError, SeedReport, load_catalog},
};
use sqlx::PgPool;
use std::path::{Path, PathBuf};

fn bundled_data() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data")
}

fn write_data(dir: &Path, categories: &str, instruments: &str) {
    std::fs::write(dir.join(CATEGORIES_FILE), categories).unwrap();
    std::fs::write(dir.join(INSTRUMENTS_FILE), instruments).unwrap();
}

#[sqlx::test]
#[ignore = "requires a running PostgreSQL reachable via DATABASE_URL"]
async fn test_loading_twice_adds_nothing_new(pool: PgPool) {
    let catalog = CatalogRepository::new(pool.clone());

    let first = load_catalog(&catalog, &bundled_data()).await.unwrap();
    assert!(first.categories > 0);
    assert!(first.instruments > 0);
    assert_eq!(catalog.list_instruments().await.unwrap().len(), first.instruments);

    let second = load_catalog(&catalog, &bundled_data()).await.unwrap();
    assert_eq!(second, SeedReport::default());
    assert_eq!(catalog.list_categories().await.unwrap().len(), first.categories);
}

#[sqlx::test]
#[ignore = "requires a running PostgreSQL reachable via DATABASE_URL"]
async fn test_seeded_catalog_lets_a_band_form(pool: PgPool) {
    let catalog = CatalogRepository::new(pool.clone());
    load_catalog(&catalog, &bundled_data()).await.unwrap();

    let guitar = catalog
        .list_instruments()
        .await
        .unwrap()
        .into_iter()
        .find(|i| i.title == "Guitar")
        .unwrap();
    assert_eq!(guitar.category, "Strings");

    let author = UserRepository::new(pool.clone())
        .create(&CreateUserRequest {
            email: "founder@band.org".to_string(),
            username: "founder".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password: "founder123".to_string(),
            instruments: vec!["Guitar".to_string()],
        })
        .await
        .unwrap();

    let band = BandRepository::new(pool)
        .create(
            author.id,
            &NewBand {
                title: "Fresh Install",
                description: "First band on a seeded catalog",
                quantity: 3,
                is_visible: true,
                poster: None,
                instrument: Some("Guitar"),
            },
        )
        .await
        .unwrap();
    assert_eq!(band.participants.len(), 1);
}

#[sqlx::test]
#[ignore = "requires a running PostgreSQL reachable via DATABASE_URL"]
async fn test_existing_rows_are_kept(pool: PgPool) {
    let catalog = CatalogRepository::new(pool);
    catalog.create_category("Strings", "strings").await.unwrap();
    catalog.create_instrument("Guitar", "strings").await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    write_data(
        dir.path(),
        "Strings,strings\nBrass,brass\n",
        "Guitar,Strings\nTrumpet,Brass\n",
    );

    let report = load_catalog(&catalog, dir.path()).await.unwrap();
    assert_eq!(
        report,
        SeedReport {
            categories: 1,
            instruments: 1
        }
    );
    assert_eq!(catalog.list_instruments().await.unwrap().len(), 2);
}

#[sqlx::test]
#[ignore = "requires a running PostgreSQL reachable via DATABASE_URL"]
async fn test_instrument_of_unknown_category_fails(pool: PgPool) {
    let catalog = CatalogRepository::new(pool);

    let dir = tempfile::tempdir().unwrap();
    write_data(dir.path(), "Strings,strings\n", "Theremin,Electronic\n");

    let result = load_catalog(&catalog, dir.path()).await;
    assert!(matches!(result, Err(SeedError::Store(_))));
}

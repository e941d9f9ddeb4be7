//! Integration tests for the repository layer
//!
//! All tests run against an in-memory SQLite database with the production
//! schema, exercising the invariants of the data model:
//! - derived totals recomputed from cassoni rows
//! - cascade delete of cassoni with their molitura
//! - client deletion blocked while moliture reference it
//! - full replace-on-edit of the cassoni set
//! - section restriction on every listing path

use chrono::Utc;
use frantoio_common::auth::Ruolo;
use frantoio_common::db::models::{CassoneInput, NuovoCliente, StatoMolitura};
use frantoio_common::db::moliture::{
    FiltroMoliture, ModificaMolitura, NuovaMolitura, RiferimentoCliente,
};
use frantoio_common::db::{self, clienti, moliture, sessions, users};
use frantoio_common::Error;
use sqlx::SqlitePool;

async fn setup_pool() -> SqlitePool {
    let pool = db::connect_memory().await.expect("in-memory pool");
    db::create_schema(&pool).await.expect("schema");
    db::init_default_settings(&pool).await.expect("settings");
    db::seed_default_users(&pool).await.expect("seed users");
    pool
}

fn nuovo_cliente(nome: &str, cognome: &str) -> NuovoCliente {
    NuovoCliente {
        nome: nome.to_string(),
        cognome: cognome.to_string(),
        telefono: None,
        indirizzo: None,
        email: None,
        note: None,
    }
}

fn cassoni_input(voci: &[(i64, i64)]) -> Vec<CassoneInput> {
    voci.iter()
        .map(|&(numero_cassone, quantita)| CassoneInput {
            numero_cassone,
            quantita,
        })
        .collect()
}

async fn crea_molitura(
    pool: &SqlitePool,
    cliente_id: &str,
    sezione: i64,
    voci: &[(i64, i64)],
) -> frantoio_common::db::models::Molitura {
    moliture::create(
        pool,
        NuovaMolitura {
            cliente: RiferimentoCliente::Esistente(cliente_id.to_string()),
            sezione,
            data_ora: Utc::now().naive_utc(),
            stato: StatoMolitura::Accettazione,
            note: None,
            cassoni: cassoni_input(voci),
        },
    )
    .await
    .expect("create molitura")
}

#[tokio::test]
async fn schema_creation_is_idempotent() {
    let pool = setup_pool().await;
    db::create_schema(&pool).await.expect("second run");
}

#[tokio::test]
async fn default_users_are_seeded_once() {
    let pool = setup_pool().await;

    let admin = users::find_active_by_username(&pool, "admin")
        .await
        .unwrap()
        .expect("admin seeded");
    assert_eq!(admin.ruolo, Ruolo::Completo);
    assert!(admin.ultimo_accesso.is_none());

    let operatore = users::find_active_by_username(&pool, "operatore")
        .await
        .unwrap()
        .expect("operatore seeded");
    assert_eq!(operatore.ruolo, Ruolo::Limitato);

    // Seeding again must not duplicate accounts
    db::seed_default_users(&pool).await.unwrap();
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(n, 2);
}

#[tokio::test]
async fn credentials_verify_against_seeded_hash() {
    let pool = setup_pool().await;

    let ok = users::verify_credentials(&pool, "admin", "admin123")
        .await
        .unwrap();
    assert!(ok.is_some());

    let wrong = users::verify_credentials(&pool, "admin", "wrong")
        .await
        .unwrap();
    assert!(wrong.is_none());

    let unknown = users::verify_credentials(&pool, "ghost", "admin123")
        .await
        .unwrap();
    assert!(unknown.is_none());
}

#[tokio::test]
async fn clienti_listed_by_surname_then_name() {
    let pool = setup_pool().await;

    clienti::insert(&pool, &nuovo_cliente("Mario", "Rossi")).await.unwrap();
    clienti::insert(&pool, &nuovo_cliente("Anna", "Bianchi")).await.unwrap();
    clienti::insert(&pool, &nuovo_cliente("Luca", "Bianchi")).await.unwrap();

    let elenco = clienti::list(&pool).await.unwrap();
    let nomi: Vec<String> = elenco.iter().map(|c| c.nome_completo()).collect();
    assert_eq!(nomi, vec!["Anna Bianchi", "Luca Bianchi", "Mario Rossi"]);
}

#[tokio::test]
async fn cliente_update_overwrites_all_fields() {
    let pool = setup_pool().await;

    let cliente = clienti::insert(
        &pool,
        &NuovoCliente {
            telefono: Some("055123".to_string()),
            ..nuovo_cliente("Mario", "Rossi")
        },
    )
    .await
    .unwrap();

    clienti::update(&pool, &cliente.id, &nuovo_cliente("Maria", "Rossini"))
        .await
        .unwrap();

    let aggiornato = clienti::get(&pool, &cliente.id).await.unwrap();
    assert_eq!(aggiornato.nome, "Maria");
    assert_eq!(aggiornato.cognome, "Rossini");
    // Full overwrite: unset optional fields are cleared
    assert_eq!(aggiornato.telefono, None);
}

#[tokio::test]
async fn cliente_with_moliture_cannot_be_deleted() {
    let pool = setup_pool().await;

    let cliente = clienti::insert(&pool, &nuovo_cliente("Mario", "Rossi")).await.unwrap();
    let molitura = crea_molitura(&pool, &cliente.id, 1, &[(1, 50)]).await;

    let esito = clienti::delete(&pool, &cliente.id).await;
    assert!(matches!(esito, Err(Error::Conflict(_))));

    // Both records are intact
    assert!(clienti::get(&pool, &cliente.id).await.is_ok());
    assert!(moliture::get(&pool, &molitura.id).await.is_ok());

    // After removing the molitura, deletion succeeds
    moliture::delete(&pool, &molitura.id).await.unwrap();
    clienti::delete(&pool, &cliente.id).await.unwrap();
    assert!(clienti::get(&pool, &cliente.id).await.is_err());
}

#[tokio::test]
async fn search_is_case_insensitive_and_capped() {
    let pool = setup_pool().await;

    clienti::insert(&pool, &nuovo_cliente("Mario", "Rossi")).await.unwrap();
    clienti::insert(&pool, &nuovo_cliente("Anna", "Marchetti")).await.unwrap();
    clienti::insert(&pool, &nuovo_cliente("Luca", "Verdi")).await.unwrap();

    let trovati = clienti::search(&pool, "MA").await.unwrap();
    assert_eq!(trovati.len(), 2);

    // Query shorter than 2 characters returns empty immediately
    let vuoto = clienti::search(&pool, "m").await.unwrap();
    assert!(vuoto.is_empty());

    // Cap at 10 results
    for i in 0..12 {
        clienti::insert(&pool, &nuovo_cliente(&format!("Massimo{}", i), "Neri"))
            .await
            .unwrap();
    }
    let limitati = clienti::search(&pool, "massimo").await.unwrap();
    assert_eq!(limitati.len(), 10);
}

#[tokio::test]
async fn molitura_total_is_sum_of_cassoni() {
    let pool = setup_pool().await;

    let cliente = clienti::insert(&pool, &nuovo_cliente("Mario", "Rossi")).await.unwrap();
    let molitura = crea_molitura(&pool, &cliente.id, 2, &[(1, 50), (2, 30), (3, 0)]).await;

    assert_eq!(moliture::quantita_totale(&pool, &molitura.id).await.unwrap(), 80);

    let riepilogo = moliture::get_riepilogo(&pool, &molitura.id).await.unwrap();
    assert_eq!(riepilogo.quantita_totale, 80);
    assert_eq!(riepilogo.numero_cassoni, 3);
    assert_eq!(riepilogo.cliente_nome, "Mario Rossi");
}

#[tokio::test]
async fn molitura_create_with_inline_client() {
    let pool = setup_pool().await;

    let molitura = moliture::create(
        &pool,
        NuovaMolitura {
            cliente: RiferimentoCliente::Nuovo(nuovo_cliente("Paola", "Gallo")),
            sezione: 1,
            data_ora: Utc::now().naive_utc(),
            stato: StatoMolitura::Accettazione,
            note: Some("prima consegna".to_string()),
            cassoni: cassoni_input(&[(1, 40)]),
        },
    )
    .await
    .unwrap();

    let cliente = clienti::get(&pool, &molitura.cliente_id).await.unwrap();
    assert_eq!(cliente.nome_completo(), "Paola Gallo");
}

#[tokio::test]
async fn molitura_create_rolls_back_on_unknown_client() {
    let pool = setup_pool().await;

    let esito = moliture::create(
        &pool,
        NuovaMolitura {
            cliente: RiferimentoCliente::Esistente("non-esiste".to_string()),
            sezione: 1,
            data_ora: Utc::now().naive_utc(),
            stato: StatoMolitura::Accettazione,
            note: None,
            cassoni: cassoni_input(&[(1, 40)]),
        },
    )
    .await;
    assert!(matches!(esito, Err(Error::NotFound(_))));

    // Nothing was persisted
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM moliture")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(n, 0);
    let k: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cassoni")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(k, 0);
}

#[tokio::test]
async fn sezione_out_of_range_is_rejected() {
    let pool = setup_pool().await;
    let cliente = clienti::insert(&pool, &nuovo_cliente("Mario", "Rossi")).await.unwrap();

    for sezione in [0, 5, -1] {
        let esito = moliture::create(
            &pool,
            NuovaMolitura {
                cliente: RiferimentoCliente::Esistente(cliente.id.clone()),
                sezione,
                data_ora: Utc::now().naive_utc(),
                stato: StatoMolitura::Accettazione,
                note: None,
                cassoni: Vec::new(),
            },
        )
        .await;
        assert!(matches!(esito, Err(Error::InvalidInput(_))));
    }
}

#[tokio::test]
async fn edit_fully_replaces_cassoni() {
    let pool = setup_pool().await;

    let cliente = clienti::insert(&pool, &nuovo_cliente("Mario", "Rossi")).await.unwrap();
    let molitura = crea_molitura(&pool, &cliente.id, 1, &[(1, 50), (2, 30)]).await;
    assert_eq!(moliture::quantita_totale(&pool, &molitura.id).await.unwrap(), 80);

    moliture::update(
        &pool,
        &molitura.id,
        ModificaMolitura {
            sezione: 1,
            data_ora: molitura.data_ora,
            stato: StatoMolitura::Completa,
            note: None,
            cassoni: cassoni_input(&[(1, 10)]),
        },
    )
    .await
    .unwrap();

    assert_eq!(moliture::quantita_totale(&pool, &molitura.id).await.unwrap(), 10);

    // The previously inserted rows for crate 2 no longer exist
    let rimasti = moliture::cassoni(&pool, &molitura.id).await.unwrap();
    assert_eq!(rimasti.len(), 1);
    assert_eq!(rimasti[0].numero_cassone, 1);
    assert_eq!(rimasti[0].quantita, 10);

    let aggiornata = moliture::get(&pool, &molitura.id).await.unwrap();
    assert_eq!(aggiornata.stato, StatoMolitura::Completa);
}

#[tokio::test]
async fn deleting_molitura_cascades_to_cassoni() {
    let pool = setup_pool().await;

    let cliente = clienti::insert(&pool, &nuovo_cliente("Mario", "Rossi")).await.unwrap();
    let molitura = crea_molitura(&pool, &cliente.id, 1, &[(1, 50), (2, 30)]).await;

    moliture::delete(&pool, &molitura.id).await.unwrap();

    let orfani: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cassoni WHERE molitura_id = ?")
        .bind(&molitura.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(orfani, 0);
}

#[tokio::test]
async fn list_is_restricted_to_accessible_sections() {
    let pool = setup_pool().await;

    let cliente = clienti::insert(&pool, &nuovo_cliente("Mario", "Rossi")).await.unwrap();
    for sezione in 1..=4 {
        crea_molitura(&pool, &cliente.id, sezione, &[(1, 10)]).await;
    }

    let tutte = moliture::list_filtered(
        &pool,
        &FiltroMoliture::default(),
        Ruolo::Completo.accessible_sections(),
    )
    .await
    .unwrap();
    assert_eq!(tutte.len(), 4);

    let limitate = moliture::list_filtered(
        &pool,
        &FiltroMoliture::default(),
        Ruolo::Limitato.accessible_sections(),
    )
    .await
    .unwrap();
    assert_eq!(limitate.len(), 2);
    assert!(limitate.iter().all(|m| m.sezione <= 2));

    // Filtering for an inaccessible section yields nothing, not an error
    let negata = moliture::list_filtered(
        &pool,
        &FiltroMoliture {
            sezione: Some(3),
            ..Default::default()
        },
        Ruolo::Limitato.accessible_sections(),
    )
    .await
    .unwrap();
    assert!(negata.is_empty());
}

#[tokio::test]
async fn filters_are_additive() {
    let pool = setup_pool().await;
    let cliente = clienti::insert(&pool, &nuovo_cliente("Mario", "Rossi")).await.unwrap();

    let crea = |giorno: &'static str, stato: StatoMolitura, sezione: i64| {
        let pool = pool.clone();
        let cliente_id = cliente.id.clone();
        let data_ora = frantoio_common::db::models::parse_data_ora(giorno, "10:00").unwrap();
        async move {
            moliture::create(
                &pool,
                NuovaMolitura {
                    cliente: RiferimentoCliente::Esistente(cliente_id),
                    sezione,
                    data_ora,
                    stato,
                    note: None,
                    cassoni: Vec::new(),
                },
            )
            .await
            .unwrap()
        }
    };

    crea("2024-11-01", StatoMolitura::Completa, 1).await;
    crea("2024-11-05", StatoMolitura::Accettazione, 1).await;
    crea("2024-11-05", StatoMolitura::Accettazione, 2).await;
    crea("2024-11-10", StatoMolitura::Archiviata, 3).await;

    let sezioni = Ruolo::Completo.accessible_sections();

    // Date range is inclusive of the end day
    let nel_periodo = moliture::list_filtered(
        &pool,
        &FiltroMoliture {
            data_da: Some(frantoio_common::db::models::parse_data_filtro("2024-11-05").unwrap()),
            data_a: Some(frantoio_common::db::models::parse_data_filtro_fine("2024-11-05").unwrap()),
            ..Default::default()
        },
        sezioni,
    )
    .await
    .unwrap();
    assert_eq!(nel_periodo.len(), 2);

    // Status and section combine with AND
    let filtrate = moliture::list_filtered(
        &pool,
        &FiltroMoliture {
            stato: Some(StatoMolitura::Accettazione),
            sezione: Some(2),
            ..Default::default()
        },
        sezioni,
    )
    .await
    .unwrap();
    assert_eq!(filtrate.len(), 1);
    assert_eq!(filtrate[0].sezione, 2);

    // Results ordered by data_ora descending
    let tutte = moliture::list_filtered(&pool, &FiltroMoliture::default(), sezioni)
        .await
        .unwrap();
    let date: Vec<_> = tutte.iter().map(|m| m.data_ora).collect();
    let mut ordinate = date.clone();
    ordinate.sort_by(|a, b| b.cmp(a));
    assert_eq!(date, ordinate);
}

#[tokio::test]
async fn report_selection_is_ordered_ascending() {
    let pool = setup_pool().await;
    let cliente = clienti::insert(&pool, &nuovo_cliente("Mario", "Rossi")).await.unwrap();

    let mut ids = Vec::new();
    for giorno in ["2024-11-10", "2024-11-01", "2024-11-05"] {
        let molitura = moliture::create(
            &pool,
            NuovaMolitura {
                cliente: RiferimentoCliente::Esistente(cliente.id.clone()),
                sezione: 1,
                data_ora: frantoio_common::db::models::parse_data_ora(giorno, "08:00").unwrap(),
                stato: StatoMolitura::Completa,
                note: None,
                cassoni: cassoni_input(&[(1, 20)]),
            },
        )
        .await
        .unwrap();
        ids.push(molitura.id);
    }

    let selezione = moliture::get_by_ids(&pool, &ids).await.unwrap();
    assert_eq!(selezione.len(), 3);
    assert!(selezione.windows(2).all(|w| w[0].data_ora <= w[1].data_ora));

    assert!(moliture::get_by_ids(&pool, &[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn session_open_updates_last_access_and_resolves() {
    let pool = setup_pool().await;

    let admin = users::find_active_by_username(&pool, "admin")
        .await
        .unwrap()
        .unwrap();
    assert!(admin.ultimo_accesso.is_none());

    let sessione = sessions::open(&pool, &admin).await.unwrap();

    let dopo = users::find_active_by_username(&pool, "admin")
        .await
        .unwrap()
        .unwrap();
    assert!(dopo.ultimo_accesso.is_some());

    let risolto = sessions::find_user(&pool, &sessione.token).await.unwrap();
    assert_eq!(risolto.map(|u| u.username), Some("admin".to_string()));

    // Unknown token resolves to nobody
    assert!(sessions::find_user(&pool, "token-falso").await.unwrap().is_none());
}

#[tokio::test]
async fn expired_session_does_not_resolve() {
    let pool = setup_pool().await;

    let admin = users::find_active_by_username(&pool, "admin")
        .await
        .unwrap()
        .unwrap();
    let sessione = sessions::open(&pool, &admin).await.unwrap();

    sqlx::query("UPDATE sessions SET expires_at = datetime('now', '-1 hour') WHERE token = ?")
        .bind(&sessione.token)
        .execute(&pool)
        .await
        .unwrap();

    assert!(sessions::find_user(&pool, &sessione.token).await.unwrap().is_none());
    assert_eq!(sessions::purge_expired(&pool).await.unwrap(), 1);
}

#[tokio::test]
async fn closed_session_does_not_resolve() {
    let pool = setup_pool().await;

    let admin = users::find_active_by_username(&pool, "admin")
        .await
        .unwrap()
        .unwrap();
    let sessione = sessions::open(&pool, &admin).await.unwrap();

    sessions::close(&pool, &sessione.token).await.unwrap();
    assert!(sessions::find_user(&pool, &sessione.token).await.unwrap().is_none());
}

#[tokio::test]
async fn init_database_creates_file_and_seeds() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("frantoio.db");

    let pool = db::init_database(&db_path).await.expect("init");
    assert!(db_path.exists());

    let admin = users::find_active_by_username(&pool, "admin")
        .await
        .unwrap();
    assert!(admin.is_some());
}

use practice_core::{
    EntityManager, EntityManagerFactory, PersistenceError, PersistenceUnit, SqliteEntityManager,
    SqliteEntityManagerFactory,
};
use tempfile::TempDir;

fn file_factory(dir: &TempDir) -> SqliteEntityManagerFactory {
    let unit = PersistenceUnit::new("practice", dir.path().join("practice.sqlite3"));
    SqliteEntityManagerFactory::create(unit).unwrap()
}

fn create_items_table(em: &SqliteEntityManager) {
    em.connection()
        .unwrap()
        .execute_batch("CREATE TABLE IF NOT EXISTS items (id INTEGER PRIMARY KEY, label TEXT NOT NULL);")
        .unwrap();
}

fn insert_item(em: &SqliteEntityManager, label: &str) {
    em.connection()
        .unwrap()
        .execute("INSERT INTO items (label) VALUES (?1);", [label])
        .unwrap();
}

fn count_items(em: &SqliteEntityManager) -> i64 {
    em.connection()
        .unwrap()
        .query_row("SELECT COUNT(*) FROM items;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn begin_commit_persists_and_toggles_activity() {
    let dir = tempfile::tempdir().unwrap();
    let factory = file_factory(&dir);
    let mut em = factory.create_entity_manager().unwrap();
    create_items_table(&em);

    assert!(!em.is_active());
    em.begin().unwrap();
    assert!(em.is_active());
    insert_item(&em, "first");
    em.commit().unwrap();
    assert!(!em.is_active());
    em.close().unwrap();

    let reader = factory.create_entity_manager().unwrap();
    assert_eq!(count_items(&reader), 1);
    reader.close().unwrap();
    factory.close().unwrap();
}

#[test]
fn rollback_discards_changes() {
    let dir = tempfile::tempdir().unwrap();
    let factory = file_factory(&dir);
    let mut em = factory.create_entity_manager().unwrap();
    create_items_table(&em);

    em.begin().unwrap();
    insert_item(&em, "discarded");
    em.rollback().unwrap();

    assert!(!em.is_active());
    assert_eq!(count_items(&em), 0);
    em.close().unwrap();
    factory.close().unwrap();
}

#[test]
fn begin_while_active_is_illegal() {
    let factory = SqliteEntityManagerFactory::create(PersistenceUnit::new("practice", ":memory:"))
        .unwrap();
    let mut em = factory.create_entity_manager().unwrap();

    em.begin().unwrap();
    let err = em.begin().unwrap_err();

    assert!(matches!(err, PersistenceError::IllegalState(_)));
    assert!(em.is_active());
}

#[test]
fn ending_or_marking_without_transaction_is_illegal() {
    let factory = SqliteEntityManagerFactory::create(PersistenceUnit::new("practice", ":memory:"))
        .unwrap();
    let mut em = factory.create_entity_manager().unwrap();

    assert!(matches!(
        em.commit().unwrap_err(),
        PersistenceError::IllegalState(_)
    ));
    assert!(matches!(
        em.rollback().unwrap_err(),
        PersistenceError::IllegalState(_)
    ));
    assert!(matches!(
        em.set_rollback_only().unwrap_err(),
        PersistenceError::IllegalState(_)
    ));
}

#[test]
fn commit_of_rollback_only_transaction_rolls_back() {
    let factory = SqliteEntityManagerFactory::create(PersistenceUnit::new("practice", ":memory:"))
        .unwrap();
    let mut em = factory.create_entity_manager().unwrap();
    create_items_table(&em);

    em.begin().unwrap();
    insert_item(&em, "doomed");
    em.set_rollback_only().unwrap();
    assert!(em.is_rollback_only());

    let err = em.commit().unwrap_err();

    assert!(matches!(err, PersistenceError::RolledBack));
    assert!(!em.is_active());
    assert!(!em.is_rollback_only());
    assert_eq!(count_items(&em), 0);
}

#[test]
fn failed_commit_leaves_transaction_active_for_rollback() {
    let factory = SqliteEntityManagerFactory::create(PersistenceUnit::new("practice", ":memory:"))
        .unwrap();
    let mut em = factory.create_entity_manager().unwrap();
    em.connection()
        .unwrap()
        .execute_batch(
            "CREATE TABLE parent (id INTEGER PRIMARY KEY);
             CREATE TABLE child (
                 id INTEGER PRIMARY KEY,
                 parent_id INTEGER NOT NULL
                     REFERENCES parent(id) DEFERRABLE INITIALLY DEFERRED
             );",
        )
        .unwrap();

    em.begin().unwrap();
    em.connection()
        .unwrap()
        .execute("INSERT INTO child (parent_id) VALUES (42);", [])
        .unwrap();

    let err = em.commit().unwrap_err();
    assert!(matches!(err, PersistenceError::Db(_)));
    assert!(em.is_active());

    em.rollback().unwrap();
    assert!(!em.is_active());
}

#[test]
fn closing_with_active_transaction_rolls_back() {
    let dir = tempfile::tempdir().unwrap();
    let factory = file_factory(&dir);
    let mut em = factory.create_entity_manager().unwrap();
    create_items_table(&em);

    em.begin().unwrap();
    insert_item(&em, "abandoned");
    em.close().unwrap();

    let reader = factory.create_entity_manager().unwrap();
    assert_eq!(count_items(&reader), 0);
}

#[test]
fn dropping_without_close_rolls_back() {
    let dir = tempfile::tempdir().unwrap();
    let factory = file_factory(&dir);
    {
        let mut em = factory.create_entity_manager().unwrap();
        create_items_table(&em);
        em.begin().unwrap();
        insert_item(&em, "dropped");
    }

    let reader = factory.create_entity_manager().unwrap();
    assert_eq!(count_items(&reader), 0);
}

#[test]
fn in_memory_factory_shares_data_between_its_managers_only() {
    let unit = PersistenceUnit::new("practice", ":memory:");
    let factory = SqliteEntityManagerFactory::create(unit.clone()).unwrap();

    let mut writer = factory.create_entity_manager().unwrap();
    create_items_table(&writer);
    writer.begin().unwrap();
    insert_item(&writer, "shared");
    writer.commit().unwrap();
    writer.close().unwrap();

    let reader = factory.create_entity_manager().unwrap();
    assert_eq!(count_items(&reader), 1);
    assert_eq!(reader.unit_name(), "practice");
    reader.close().unwrap();

    let other = SqliteEntityManagerFactory::create(unit).unwrap();
    let stranger = other.create_entity_manager().unwrap();
    assert!(stranger
        .connection()
        .unwrap()
        .query_row("SELECT COUNT(*) FROM items;", [], |row| row.get::<_, i64>(0))
        .is_err());
}

#[test]
fn factory_creation_fails_fast_for_unreachable_database() {
    let dir = tempfile::tempdir().unwrap();
    let unit = PersistenceUnit::new("practice", dir.path().join("no/such/dir/practice.sqlite3"));

    let err = SqliteEntityManagerFactory::create(unit).err().unwrap();

    assert!(matches!(err, PersistenceError::Db(_)));
}

use std::sync::Arc;

use ephendb::{
    Backend, Error, IdAllocator, MemoryBackend, ProvisionMode, Provisioner, SeedOutcome,
    StoreOptions,
};
use mongodb::bson::doc;

fn setup() -> (Arc<MemoryBackend>, IdAllocator, Provisioner) {
    let options = StoreOptions::default();
    let store = Arc::new(MemoryBackend::new(&options.counters));
    let alloc = IdAllocator::new(store.clone(), options.entity_kinds());
    let provisioner = Provisioner::from_options(alloc.clone(), &options);
    (store, alloc, provisioner)
}

#[tokio::test]
async fn fresh_store_gets_counters_and_indexes() {
    let (store, alloc, provisioner) = setup();

    let report = provisioner.run(ProvisionMode::NonDestructive).await.unwrap();

    assert!(report.dropped.is_empty());
    assert_eq!(
        report.counters,
        vec![
            ("avatarId".to_string(), SeedOutcome::Created),
            ("newsId".to_string(), SeedOutcome::Created),
        ]
    );
    assert_eq!(report.recorded, vec![1, 2, 3, 4, 5]);
    assert_eq!(store.indexes("avatars").len(), 5);
    assert_eq!(store.indexes("chunkdata").len(), 2);
    assert_eq!(alloc.peek("avatarId").await.unwrap(), 1);
    assert_eq!(alloc.peek("newsId").await.unwrap(), 0);
}

#[tokio::test]
async fn non_destructive_rerun_keeps_counters_and_data() {
    let (store, alloc, provisioner) = setup();
    provisioner.run(ProvisionMode::NonDestructive).await.unwrap();

    let id = alloc.allocate_id("avatarId").await.unwrap();
    store
        .insert("avatars", doc! {"_id": id, "name": "ann", "email": "ann@example.com"})
        .await
        .unwrap();

    let report = provisioner.run(ProvisionMode::NonDestructive).await.unwrap();

    assert!(report
        .counters
        .iter()
        .all(|(_, outcome)| *outcome == SeedOutcome::Kept));
    assert!(report.recorded.is_empty());
    assert_eq!(report.already_recorded, vec![1, 2, 3, 4, 5]);
    assert_eq!(alloc.peek("avatarId").await.unwrap(), 2);
    assert_eq!(store.count("avatars"), 1);
}

#[tokio::test]
async fn adopts_counters_seeded_from_the_mongo_shell() {
    let (store, alloc, provisioner) = setup();
    store
        .insert("counters", doc! {"_id": "avatarId", "c": 1.0})
        .await
        .unwrap();

    let report = provisioner.run(ProvisionMode::NonDestructive).await.unwrap();

    assert_eq!(
        report.counters[0],
        ("avatarId".to_string(), SeedOutcome::Kept)
    );
    assert_eq!(alloc.allocate_id("avatarId").await.unwrap(), 1);
    assert_eq!(alloc.allocate_id("avatarId").await.unwrap(), 2);
}

#[tokio::test]
async fn destructive_run_wipes_and_reseeds() {
    let (store, alloc, provisioner) = setup();
    provisioner.run(ProvisionMode::NonDestructive).await.unwrap();
    for _ in 0..3 {
        alloc.allocate_id("newsId").await.unwrap();
    }
    store.insert("news", doc! {"_id": 0_i64}).await.unwrap();

    let report = provisioner.run(ProvisionMode::Destructive).await.unwrap();

    assert!(report.dropped.contains(&"news".to_string()));
    assert!(report.dropped.contains(&"migrations".to_string()));
    assert_eq!(store.count("news"), 0);
    assert_eq!(alloc.peek("newsId").await.unwrap(), 0);
    assert_eq!(report.recorded, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn avatar_name_is_unique_but_level_is_not() {
    let (store, _, provisioner) = setup();
    provisioner.run(ProvisionMode::NonDestructive).await.unwrap();

    store
        .insert("avatars", doc! {"_id": 1_i64, "name": "ann", "email": "a@x", "level": 3})
        .await
        .unwrap();
    store
        .insert("avatars", doc! {"_id": 2_i64, "name": "bob", "email": "b@x", "level": 3})
        .await
        .unwrap();

    match store
        .insert("avatars", doc! {"_id": 3_i64, "name": "ann", "email": "c@x", "level": 7})
        .await
    {
        Err(Error::ConstraintViolation { collection, index }) => {
            assert_eq!(collection, "avatars");
            assert_eq!(index, "name_1");
        }
        other => panic!("expected constraint violation, got {other:?}"),
    }
}

#[tokio::test]
async fn one_avatar_per_email() {
    let (store, _, provisioner) = setup();
    provisioner.run(ProvisionMode::NonDestructive).await.unwrap();

    store
        .insert("avatars", doc! {"_id": 1_i64, "name": "ann", "email": "a@x"})
        .await
        .unwrap();
    let err = store
        .insert("avatars", doc! {"_id": 2_i64, "name": "bob", "email": "a@x"})
        .await
        .unwrap_err();
    assert!(err.is_constraint_violation());
}

#[tokio::test]
async fn chunk_coordinates_and_owner_are_unique() {
    let (store, _, provisioner) = setup();
    provisioner.run(ProvisionMode::NonDestructive).await.unwrap();

    store
        .insert("chunkdata", doc! {"x": 1, "y": 2, "z": 3, "avatarID": 10})
        .await
        .unwrap();

    let same_coords = store
        .insert("chunkdata", doc! {"x": 1, "y": 2, "z": 3, "avatarID": 11})
        .await
        .unwrap_err();
    assert!(same_coords.is_constraint_violation());

    let same_owner = store
        .insert("chunkdata", doc! {"x": 1, "y": 2, "z": 4, "avatarID": 10})
        .await
        .unwrap_err();
    assert!(same_owner.is_constraint_violation());

    store
        .insert("chunkdata", doc! {"x": 1, "y": 2, "z": 4, "avatarID": 11})
        .await
        .unwrap();
    assert_eq!(store.count("chunkdata"), 2);
}

#[tokio::test]
async fn failing_step_is_named() {
    let (store, _, provisioner) = setup();
    store.fail_next(1);

    let err = provisioner.run(ProvisionMode::NonDestructive).await.unwrap_err();
    match &err {
        Error::Provision { step, source } => {
            assert_eq!(step, "seed counter avatarId");
            assert!(source.is_retryable());
        }
        other => panic!("expected provision error, got {other:?}"),
    }

    // nothing was dropped, so a plain rerun finishes the job
    provisioner.run(ProvisionMode::NonDestructive).await.unwrap();
    assert_eq!(store.count("counters"), 2);
}

#[tokio::test]
async fn destructive_failure_names_the_drop() {
    let (store, _, provisioner) = setup();
    provisioner.run(ProvisionMode::NonDestructive).await.unwrap();
    store.fail_next(1);

    let err = provisioner.run(ProvisionMode::Destructive).await.unwrap_err();
    assert!(err.to_string().contains("drop collection counters"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_allocation_after_provisioning() {
    let (_, alloc, provisioner) = setup();
    provisioner.run(ProvisionMode::NonDestructive).await.unwrap();

    let handles = (0..64)
        .map(|_| {
            let alloc = alloc.clone();
            tokio::spawn(async move {
                let mut ids = Vec::new();
                for _ in 0..8 {
                    ids.push(alloc.allocate_id("newsId").await.unwrap());
                }
                ids
            })
        })
        .collect::<Vec<_>>();

    let mut ids = Vec::new();
    for handle in handles {
        ids.extend(handle.await.unwrap());
    }
    ids.sort_unstable();
    assert_eq!(ids, (0..512).collect::<Vec<i64>>());
}

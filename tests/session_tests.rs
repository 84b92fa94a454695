mod common;

use common::{Call, SpyStore};
use mog::cursor::IterState;
use mog::error::{IterError, MogError};
use mog::store::{BulkOp, UpdateOutcome};
use mog::{AggOptions, QueryShape, Session};
use mongodb::bson::{Document, doc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

const NO_SORT: &[&str] = &[];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Location {
    #[serde(rename = "_id")]
    id: String,
    location_name: String,
}

fn locations() -> Vec<Document> {
    vec![
        doc! { "_id": "7", "location_name": "Northwest" },
        doc! { "_id": "10", "location_name": "Southwest" },
    ]
}

fn find_call(call: Option<Call>) -> (Document, Option<Document>, Option<i64>, Option<Document>) {
    match call {
        Some(Call::Find {
            filter,
            projection,
            limit,
            sort,
            ..
        }) => (filter, projection, limit, sort),
        other => panic!("expected find, got {:?}", other),
    }
}

#[tokio::test]
async fn test_limit_applies_to_exactly_one_find() {
    let store = SpyStore::new()
        .with_stream(locations())
        .with_stream(locations());
    let mut session = Session::new(store, "location");

    session.set_limit(2);
    session.find(None, NO_SORT).await.unwrap();
    let (_, _, limit, _) = find_call(session.store().last_call());
    assert_eq!(limit, Some(2));

    session.find(None, NO_SORT).await.unwrap();
    let (_, _, limit, _) = find_call(session.store().last_call());
    assert_eq!(limit, None);
}

#[tokio::test]
async fn test_limit_consumed_by_count() {
    let mut session = Session::new(SpyStore::new().with_count(5), "property");

    session.set_limit(3);
    assert_eq!(session.count(Some(doc! { "st": "MT" })).await.unwrap(), 5);
    assert_eq!(
        session.store().last_call(),
        Some(Call::Count {
            collection: "property".to_string(),
            filter: doc! { "st": "MT" },
            limit: Some(3),
        })
    );
    assert!(session.pending_shape().is_empty());
}

#[tokio::test]
async fn test_keep_and_omit_projection() {
    let store = SpyStore::new()
        .with_stream(Vec::new())
        .with_stream(Vec::new())
        .with_stream(Vec::new());
    let mut session = Session::new(store, "property");

    session.keep(&["address", "city"]);
    session.find(None, NO_SORT).await.unwrap();
    let (_, projection, _, _) = find_call(session.store().last_call());
    assert_eq!(projection, Some(doc! { "address": 1, "city": 1 }));

    session.omit(&["notes"]);
    session.find(None, NO_SORT).await.unwrap();
    let (_, projection, _, _) = find_call(session.store().last_call());
    assert_eq!(projection, Some(doc! { "notes": 0 }));

    // empty list resets to all fields
    session.keep(&["address"]);
    session.keep(NO_SORT);
    session.find(None, NO_SORT).await.unwrap();
    let (_, projection, _, _) = find_call(session.store().last_call());
    assert_eq!(projection, None);
}

#[tokio::test]
async fn test_find_absent_filter_and_sort() {
    let mut session = Session::new(SpyStore::new().with_stream(locations()), "property");

    session.find(None, &["st", "-date_added"]).await.unwrap();
    let (filter, _, _, sort) = find_call(session.store().last_call());
    assert_eq!(filter, Document::new());
    assert_eq!(sort, Some(doc! { "st": 1, "date_added": -1 }));
}

#[tokio::test]
async fn test_next_walks_records_in_order() {
    let mut session = Session::new(SpyStore::new().with_stream(locations()), "location");
    session.find(None, NO_SORT).await.unwrap();

    let mut names = Vec::new();
    while let Some(loc) = session.next::<Location>().await.unwrap() {
        names.push(loc.location_name);
    }
    assert_eq!(names, ["Northwest", "Southwest"]);
    assert!(session.iter_err().is_none());
    assert_eq!(session.iterator().map(|it| it.state()), Some(IterState::Exhausted));
    assert!(session.next::<Location>().await.unwrap().is_none());
}

#[tokio::test]
async fn test_decode_failure_stops_iteration() {
    let docs = vec![
        doc! { "_id": "7", "location_name": "Northwest" },
        doc! { "_id": "10", "location_name": 42 },
        doc! { "_id": "11", "location_name": "Never reached" },
    ];
    let mut session = Session::new(SpyStore::new().with_stream(docs), "location");
    session.find(None, NO_SORT).await.unwrap();

    assert!(session.next::<Location>().await.unwrap().is_some());
    let err = session.next::<Location>().await.unwrap_err();
    assert!(matches!(err, MogError::Iteration(IterError::Decode(_))));
    assert!(matches!(session.iter_err(), Some(IterError::Decode(_))));

    // terminal: the remaining record is never yielded
    assert!(session.next::<Location>().await.unwrap().is_none());
    assert_eq!(session.iterator().map(|it| it.yielded()), Some(1));
}

#[tokio::test]
async fn test_stream_failure_kept_for_iter_err() {
    let store = SpyStore::new().with_broken_stream(vec![locations().remove(0)]);
    let mut session = Session::new(store, "location");
    session.find(None, NO_SORT).await.unwrap();

    let first = session.next::<Location>().await.unwrap().unwrap();
    assert_eq!(first.location_name, "Northwest");

    let err = session.next::<Location>().await.unwrap_err();
    assert!(matches!(err, MogError::Iteration(IterError::Cursor(_))));
    assert!(matches!(session.iter_err(), Some(IterError::Cursor(_))));
    assert_eq!(session.iterator().map(|it| it.state()), Some(IterState::Failed));
    assert!(session.next::<Location>().await.unwrap().is_none());
}

#[tokio::test]
async fn test_close_iterator_early() {
    let mut session = Session::new(SpyStore::new().with_stream(locations()), "location");
    session.find(None, NO_SORT).await.unwrap();
    session.next::<Location>().await.unwrap();

    session.close_iterator();
    assert!(session.next::<Location>().await.unwrap().is_none());
    assert_eq!(session.iterator().map(|it| it.state()), Some(IterState::Closed));
    assert!(session.iter_err().is_none());
}

#[tokio::test]
async fn test_find_all_consumes_staged_shape() {
    let mut session = Session::new(SpyStore::new().with_stream(locations()), "location");
    session.set_limit(1);
    session.keep(&["location_name"]);

    let all: Vec<Location> = session.find_all(None, &["-_id"]).await.unwrap();
    assert_eq!(all.len(), 2);

    let (_, projection, limit, sort) = find_call(session.store().last_call());
    assert_eq!(projection, Some(doc! { "location_name": 1 }));
    assert_eq!(limit, Some(1));
    assert_eq!(sort, Some(doc! { "_id": -1 }));
    assert!(session.pending_shape().is_empty());
}

#[tokio::test]
async fn test_find_with_leaves_staged_shape() {
    let mut session = Session::new(SpyStore::new().with_stream(Vec::new()), "location");
    session.set_limit(4);

    let shape = QueryShape::new().limit(9).omit(&["notes"]);
    session.find_with(None, shape).await.unwrap();

    let (_, projection, limit, _) = find_call(session.store().last_call());
    assert_eq!(limit, Some(9));
    assert_eq!(projection, Some(doc! { "notes": 0 }));
    assert_eq!(session.pending_shape().limit, Some(4));
}

#[tokio::test]
async fn test_find_one_and_by_id() {
    let store = SpyStore::new().with_found(doc! { "_id": "7", "location_name": "Northwest" });
    let mut session = Session::new(store, "location");

    let loc: Location = session.find_one(None, &["location_name"]).await.unwrap();
    assert_eq!(loc.id, "7");
    assert_eq!(
        session.store().last_call(),
        Some(Call::FindOne {
            collection: "location".to_string(),
            filter: Document::new(),
            projection: None,
            sort: Some(doc! { "location_name": 1 }),
        })
    );

    let loc: Location = session.find_by_id("7").await.unwrap();
    assert_eq!(loc.location_name, "Northwest");
    match session.store().last_call() {
        Some(Call::FindOne { filter, .. }) => assert_eq!(filter, doc! { "_id": "7" }),
        other => panic!("expected find_one, got {:?}", other),
    }
}

#[tokio::test]
async fn test_find_by_id_not_found() {
    let mut session = Session::new(SpyStore::new(), "location");

    let err = session.find_by_id::<Location>("missing").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_update_requires_filter() {
    let mut session = Session::new(SpyStore::new(), "property");
    session.upsert();

    let err = session
        .update(None, doc! { "$set": { "st": "NV" } })
        .await
        .unwrap_err();
    assert!(matches!(err, MogError::Validation(_)));
    assert!(session.store().calls().is_empty());
    assert!(!session.upsert_pending());
}

#[tokio::test]
async fn test_update_counts_modified_and_upserted() {
    let store = SpyStore::new().with_update(UpdateOutcome {
        matched: 0,
        modified: 0,
        upserted: 1,
    });
    let mut session = Session::new(store, "property");

    session.upsert();
    let n = session
        .update(Some(doc! { "city": "Reno" }), doc! { "$set": { "st": "NV" } })
        .await
        .unwrap();
    assert_eq!(n, 1);

    match session.store().last_call() {
        Some(Call::UpdateMany { upsert, .. }) => assert!(upsert),
        other => panic!("expected update_many, got {:?}", other),
    }

    // upsert is single-use
    session
        .update(Some(doc! {}), doc! { "$set": { "checked": true } })
        .await
        .unwrap();
    match session.store().last_call() {
        Some(Call::UpdateMany { upsert, .. }) => assert!(!upsert),
        other => panic!("expected update_many, got {:?}", other),
    }
}

#[tokio::test]
async fn test_update_by_id_and_replace() {
    let mut session = Session::new(SpyStore::new(), "location");

    let n = session
        .update_by_id("7", doc! { "$set": { "location_name": "North" } })
        .await
        .unwrap();
    assert_eq!(n, 1);
    match session.store().last_call() {
        Some(Call::UpdateOne { filter, .. }) => assert_eq!(filter, doc! { "_id": "7" }),
        other => panic!("expected update_one, got {:?}", other),
    }

    let loc = Location {
        id: "7".to_string(),
        location_name: "North".to_string(),
    };
    session.upsert();
    assert_ok!(session.replace(Some(doc! { "_id": "7" }), &loc).await);
    assert_eq!(
        session.store().last_call(),
        Some(Call::ReplaceOne {
            collection: "location".to_string(),
            filter: doc! { "_id": "7" },
            replacement: doc! { "_id": "7", "location_name": "North" },
            upsert: true,
        })
    );
}

#[tokio::test]
async fn test_insert_serializes_records() {
    let mut session = Session::new(SpyStore::new(), "location");
    let locs = vec![
        Location {
            id: "7".to_string(),
            location_name: "Northwest".to_string(),
        },
        Location {
            id: "10".to_string(),
            location_name: "Southwest".to_string(),
        },
    ];

    assert_eq!(session.insert(&locs).await.unwrap(), 2);
    assert_eq!(
        session.store().last_call(),
        Some(Call::InsertMany {
            collection: "location".to_string(),
            documents: locations(),
        })
    );

    assert_eq!(session.insert::<Location>(&[]).await.unwrap(), 0);
    assert_eq!(session.store().calls().len(), 1);
}

#[tokio::test]
async fn test_bulk_write_returns_count_and_clears() {
    let mut session = Session::new(SpyStore::new(), "property");

    session.bulk_start(3);
    session.bulk_add_insert(&doc! { "_id": "a" }).unwrap();
    session.bulk_add_insert(&doc! { "_id": "b" }).unwrap();
    session.bulk_add_update(doc! { "st": "MT" }, doc! { "$set": { "checked": true } });
    assert_eq!(session.bulk_len(), 3);

    assert_eq!(session.bulk_write().await.unwrap(), 3);
    assert_eq!(session.bulk_len(), 0);
    match session.store().last_call() {
        Some(Call::BulkWrite { ops, .. }) => {
            assert_eq!(ops.len(), 3);
            assert_eq!(ops[0], BulkOp::Insert(doc! { "_id": "a" }));
            assert!(matches!(ops[2], BulkOp::UpdateMany { .. }));
        }
        other => panic!("expected bulk_write, got {:?}", other),
    }

    // nothing queued: no request
    assert_eq!(session.bulk_write().await.unwrap(), 0);
    assert_eq!(session.store().calls().len(), 1);
}

#[tokio::test]
async fn test_bulk_cleared_after_failure() {
    let mut session = Session::new(SpyStore::new().failing_writes(), "property");

    session.bulk_add_insert(&doc! { "_id": "a" }).unwrap();
    assert_err!(session.bulk_write().await);
    assert_eq!(session.bulk_len(), 0);
}

#[tokio::test]
async fn test_pipeline_sent_in_order() {
    let rows = vec![doc! { "_id": "MT", "count": 2 }, doc! { "_id": "NV", "count": 1 }];
    let store = SpyStore::new().with_stream(rows.clone()).with_stream(rows);
    let mut session = Session::new(store, "property");

    session.agg_start();
    session.agg_stage("group", doc! { "_id": "$st", "count": { "$sum": 1 } });
    session.agg_sort(&["_id"]);

    let options = AggOptions::new().max_time(Duration::from_secs(2));
    session.agg_run(Some(options)).await.unwrap();
    assert_eq!(
        session.store().last_call(),
        Some(Call::Aggregate {
            collection: "property".to_string(),
            pipeline: vec![
                doc! { "$group": { "_id": "$st", "count": { "$sum": 1 } } },
                doc! { "$sort": { "_id": 1 } },
            ],
            max_time: Some(Duration::from_secs(2)),
        })
    );

    let first: Document = session.next().await.unwrap().unwrap();
    assert_eq!(first.get_str("_id").unwrap(), "MT");

    // running again reuses the same pipeline
    let all: Vec<Document> = session.agg_run_all(None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(session.pipeline().len(), 2);
}

#[tokio::test]
async fn test_lookup_and_totals_stages() {
    let mut session = Session::new(SpyStore::new(), "property");

    session.agg_start();
    session.agg_lookup_by_id("location", "location_id", None);
    session.agg_keep(&["address", "location"]);
    session.agg_run(None).await.unwrap();

    match session.store().last_call() {
        Some(Call::Aggregate { pipeline, .. }) => assert_eq!(
            pipeline,
            vec![
                doc! { "$lookup": {
                    "from": "location",
                    "localField": "location_id",
                    "foreignField": "_id",
                    "as": "location",
                } },
                doc! { "$unwind": "$location" },
                doc! { "$project": { "address": 1, "location": 1 } },
            ]
        ),
        other => panic!("expected aggregate, got {:?}", other),
    }

    session.agg_start();
    session.agg_lookup_by_id_keep_unmatched("location", "location_id", Some("loc"));
    session.agg_totals("city", &["sum_fld1", "sum_fld2"]);
    let stages = session.pipeline().stages();
    assert_eq!(
        stages[1],
        doc! { "$unwind": { "path": "$loc", "preserveNullAndEmptyArrays": true } }
    );
    assert_eq!(
        stages[2],
        doc! { "$group": {
            "_id": "$city",
            "count": { "$sum": 1 },
            "tot_sum_fld1": { "$sum": "$sum_fld1" },
            "tot_sum_fld2": { "$sum": "$sum_fld2" },
        } }
    );
    assert!(session.agg_show_pipeline().contains("\"$group\""));
}

#[tokio::test]
async fn test_cancelled_call_returns_and_session_survives() {
    let cancel = CancellationToken::new();
    let mut session = Session::with_cancel(SpyStore::new().stalled(), "property", cancel.clone());
    session.set_limit(3);

    cancel.cancel();
    let err = session.count(None).await.unwrap_err();
    assert!(matches!(err, MogError::Cancelled));

    // the limit was consumed even though the call never completed
    assert!(session.pending_shape().is_empty());
}

#[tokio::test]
async fn test_set_collection_targets_later_calls() {
    let mut session = Session::new(SpyStore::new().with_count(1), "location");
    session.set_collection("property");
    session.count(None).await.unwrap();

    match session.store().last_call() {
        Some(Call::Count { collection, .. }) => assert_eq!(collection, "property"),
        other => panic!("expected count, got {:?}", other),
    }
}

fn temp_csv(name: &str) -> String {
    std::env::temp_dir()
        .join(format!("mog_session_{}_{}", std::process::id(), name))
        .to_string_lossy()
        .into_owned()
}

#[tokio::test]
async fn test_csv_write_requires_start() {
    let mut session = Session::new(SpyStore::new(), "property");

    let err = session.csv_write(&["a", "b"]).await.unwrap_err();
    assert!(matches!(err, MogError::State(_)));
    assert!(matches!(session.csv_read().await, Err(MogError::State(_))));
    assert_eq!(session.csv_out_done().await.unwrap(), 0);
}

#[tokio::test]
async fn test_csv_export_and_import() {
    let path = temp_csv("props.csv");
    let mut session = Session::new(SpyStore::new(), "property");

    session.csv_out_start(&path).await.unwrap();
    session.csv_write(&["Location", "Address", "City"]).await.unwrap();
    session.csv_write(&["Northwest", "200 Willow Rd", "Wonder"]).await.unwrap();
    session.csv_write(&["Southwest", "1950 \"The\" Hangover", "Las Vegas, NV"]).await.unwrap();
    assert_eq!(session.csv_out_done().await.unwrap(), 3);

    session.csv_in_start(&path).await.unwrap();
    assert_ok!(session.csv_check_header(&["Location", "Address", "City"]).await);
    let first = session.csv_read().await.unwrap().unwrap();
    assert_eq!(first, ["Northwest", "200 Willow Rd", "Wonder"]);

    // read_all is independent of the open input
    let all = session.csv_read_all(&path).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[2], ["Southwest", "1950 \"The\" Hangover", "Las Vegas, NV"]);

    let second = session.csv_read().await.unwrap().unwrap();
    assert_eq!(second[0], "Southwest");
    assert!(session.csv_read().await.unwrap().is_none());
    session.csv_in_done();

    let _ = std::fs::remove_file(&path);
}

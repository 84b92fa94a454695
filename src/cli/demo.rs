//! Property/location walkthrough
//!
//! Seeds a `location` and a `property` collection, then exercises the
//! session facade end to end and prints what each step returns.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use mongodb::bson::{Document, doc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::pipeline::{AggOptions, total_of};
use crate::session::{Session, new_document_id};
use crate::store::MongoStore;

pub const LOCATIONS: &str = "location";
pub const PROPERTIES: &str = "property";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "_id")]
    pub id: String,
    pub location_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "_id")]
    pub id: String,
    pub location_id: String,
    pub address: String,
    pub city: String,
    pub st: String,
    /// yyyy-mm-dd
    pub date_added: String,
    #[serde(default)]
    pub notes: Vec<String>,
    pub sum_fld1: i32,
    pub sum_fld2: f64,
}

#[derive(Debug, Deserialize)]
struct StateCount {
    #[serde(rename = "_id")]
    state: String,
    count: i32,
}

#[derive(Debug, Deserialize)]
struct JoinedProperty {
    address: String,
    location: Location,
}

/// Seed locations.
pub fn sample_locations() -> Vec<Location> {
    vec![
        Location {
            id: "7".to_string(),
            location_name: "Northwest".to_string(),
        },
        Location {
            id: "10".to_string(),
            location_name: "Southwest".to_string(),
        },
    ]
}

/// Seed properties, each with a fresh id.
pub fn sample_properties() -> Vec<Property> {
    let prop = |address: &str, city: &str, st: &str, loc: &str, added: &str, f1: i32, f2: f64| {
        Property {
            id: new_document_id(),
            location_id: loc.to_string(),
            address: address.to_string(),
            city: city.to_string(),
            st: st.to_string(),
            date_added: added.to_string(),
            notes: Vec::new(),
            sum_fld1: f1,
            sum_fld2: f2,
        }
    };

    vec![
        prop("200 Willow Rd", "Wonder", "MT", "7", "2018-03-11", 7, 12.50),
        prop("321 Angel Way", "Wonder", "MT", "7", "2019-04-04", 10, 8.25),
        prop("1950 Hangover", "Las Vegas", "NV", "10", "2017-07-29", 13, 19.25),
    ]
}

/// Run every step of the walkthrough.
///
/// # Arguments
/// * `session` - Session on the demo database
/// * `csv_path` - Where the property export is written and read back
pub async fn run(session: &mut Session<MongoStore>, csv_path: &Path) -> Result<()> {
    reset(session.store()).await?;
    seed(session).await?;

    let locations = location_map(session).await?;
    query_steps(session).await?;
    aggregate_steps(session).await?;
    csv_steps(session, &locations, &csv_path.to_string_lossy()).await?;
    Ok(())
}

async fn reset(store: &MongoStore) -> Result<()> {
    for name in [PROPERTIES, LOCATIONS] {
        store.database().collection::<Document>(name).drop().await?;
    }
    Ok(())
}

async fn seed(session: &mut Session<MongoStore>) -> Result<()> {
    session.set_collection(LOCATIONS);
    let inserted = session.insert(&sample_locations()).await?;
    println!("inserted {inserted} locations");

    session.set_collection(PROPERTIES);
    let props = sample_properties();
    session.bulk_start(props.len());
    for prop in &props {
        session.bulk_add_insert(prop)?;
    }
    let written = session.bulk_write().await?;
    println!("bulk wrote {written} properties");
    Ok(())
}

async fn location_map(session: &mut Session<MongoStore>) -> Result<HashMap<String, Location>> {
    session.set_collection(LOCATIONS);
    session.find(None, &[] as &[&str]).await?;

    let mut locations = HashMap::new();
    while let Some(loc) = session.next::<Location>().await? {
        locations.insert(loc.id.clone(), loc);
    }
    Ok(locations)
}

async fn query_steps(session: &mut Session<MongoStore>) -> Result<()> {
    session.set_collection(PROPERTIES);

    let montana = session.count(Some(doc! { "st": "MT" })).await?;
    println!("--- count MT: {montana}");

    session.keep(&["address", "city"]);
    session.set_limit(2);
    let newest: Vec<Document> = session.find_all(None, &["-date_added"]).await?;
    println!("--- two newest");
    for doc in &newest {
        println!("{}", doc.get_str("address").unwrap_or_default());
    }

    let oldest: Property = session.find_one(None, &["date_added"]).await?;
    let noted = session
        .update_by_id(
            oldest.id.as_str(),
            doc! { "$push": { "notes": "oldest listing" } },
        )
        .await?;
    let reloaded: Property = session.find_by_id(oldest.id.as_str()).await?;
    println!("--- noted {noted}: {} {:?}", reloaded.address, reloaded.notes);

    match session.find_by_id::<Property>("no-such-id").await {
        Err(e) if e.is_not_found() => println!("--- missing id: not found"),
        other => {
            other?;
        }
    }
    Ok(())
}

async fn aggregate_steps(session: &mut Session<MongoStore>) -> Result<()> {
    session.set_collection(PROPERTIES);

    session.agg_start();
    session.agg_stage("group", doc! { "_id": "$st", "count": { "$sum": 1 } });
    session.agg_sort(&["_id"]);
    session.agg_show_pipeline();
    let options = AggOptions::new().max_time(Duration::from_secs(2));

    session.agg_run(Some(options.clone())).await?;
    println!("--- count by state");
    while let Some(row) = session.next::<StateCount>().await? {
        println!("{} {}", row.state, row.count);
    }

    let all: Vec<StateCount> = session.agg_run_all(Some(options)).await?;
    println!("--- count by state (all)");
    for row in &all {
        println!("{} {}", row.state, row.count);
    }

    session.agg_start();
    session.agg_lookup_by_id(LOCATIONS, "location_id", None);
    session.agg_keep(&["address", "location"]);
    session.agg_run(None).await?;
    println!("--- joined");
    while let Some(row) = session.next::<JoinedProperty>().await? {
        println!("{} {}", row.address, row.location.location_name);
    }
    if let Some(err) = session.iter_err() {
        return Err(err.clone().into());
    }

    session.agg_start();
    session.agg_totals("city", &["sum_fld1", "sum_fld2"]);
    session.agg_sort(&["_id"]);
    let groups: Vec<Document> = session.agg_run_all(None).await?;
    println!("--- totals by city");
    for group in &groups {
        println!(
            "{} {} {} {}",
            group.get_str("_id").unwrap_or_default(),
            group.get_i32("count").unwrap_or_default(),
            total_of(group, "sum_fld1").unwrap_or_default(),
            total_of(group, "sum_fld2").unwrap_or_default(),
        );
    }
    Ok(())
}

async fn csv_steps(
    session: &mut Session<MongoStore>,
    locations: &HashMap<String, Location>,
    path: &str,
) -> Result<()> {
    session.set_collection(PROPERTIES);
    session.csv_out_start(path).await?;
    session.csv_write(&["Location", "Address", "City"]).await?;

    session.find(None, &[] as &[&str]).await?;
    while let Some(prop) = session.next::<Property>().await? {
        let location = locations
            .get(&prop.location_id)
            .map_or("", |loc| loc.location_name.as_str());
        session
            .csv_write(&[location, prop.address.as_str(), prop.city.as_str()])
            .await?;
    }
    let written = session.csv_out_done().await?;
    info!("wrote {written} csv records to {path}");

    session.csv_in_start(path).await?;
    println!("--- csv read");
    while let Some(record) = session.csv_read().await? {
        println!("{}", record.join("|"));
    }
    session.csv_in_done();

    println!("--- csv read all");
    for record in session.csv_read_all(path).await? {
        println!("{}", record.join("|"));
    }
    Ok(())
}

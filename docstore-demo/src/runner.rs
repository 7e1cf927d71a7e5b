//! The demonstration sequence.
//!
//! Each example catches its own failure so the next one still runs; the
//! connection is always closed at the end, whatever happened before.

use docstore::{bson::doc, prelude::*};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<Identifier>,
    pub name: String,
    pub age: i32,
}

impl User {
    pub fn new(name: &str, age: i32) -> Self {
        Self { id: None, name: name.to_string(), age }
    }
}

/// What happened during a run, for callers that want more than the printed output.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Numbers of the examples that failed.
    pub failed: Vec<usize>,
    /// Identifier of the first user added by example 1, if it succeeded.
    pub first_id: Option<Identifier>,
}

/// Runs every example in order, then closes the connection.
///
/// # Errors
///
/// Only a failure to establish the initial connection escapes; the
/// connection teardown still runs first.
pub async fn run_all_examples<C: StoreConnector>(
    store: &DataStore<C>,
    lookup_id: Option<&str>,
) -> DataStoreResult<RunSummary> {
    println!("Starting all examples...");

    let result = run_examples(store, lookup_id).await;

    if let Err(e) = store.disconnect().await {
        eprintln!("Error closing connection: {e}");
    }
    println!("\nAll operations completed");

    result
}

async fn run_examples<C: StoreConnector>(
    store: &DataStore<C>,
    lookup_id: Option<&str>,
) -> DataStoreResult<RunSummary> {
    store.connect().await?;

    let mut summary = RunSummary::default();

    match add_individual_users(store).await {
        Ok(id) => summary.first_id = Some(id),
        Err(e) => report(&mut summary, 1, &e),
    }
    if let Err(e) = add_multiple_users(store).await {
        report(&mut summary, 2, &e);
    }
    if let Err(e) = find_users(store).await {
        report(&mut summary, 3, &e);
    }
    if let Err(e) = count_users(store).await {
        report(&mut summary, 4, &e);
    }

    let lookup = lookup_id
        .map(str::to_string)
        .or_else(|| summary.first_id.map(|id| id.to_string()));
    match lookup {
        Some(id) => {
            if let Err(e) = find_user_by_id(store, &id).await {
                report(&mut summary, 5, &e);
            }
        }
        None => {
            println!("\n======= Example 5: Find User by ID =======");
            println!("No identifier to look up");
        }
    }

    Ok(summary)
}

fn report(summary: &mut RunSummary, example: usize, error: &DataStoreError) {
    eprintln!("Example {example} failed: {error}");
    summary.failed.push(example);
}

async fn add_individual_users<C: StoreConnector>(store: &DataStore<C>) -> DataStoreResult<Identifier> {
    println!("\n======= Example 1: Adding Individual Users =======");

    let first = store.insert_one(User::new("Ahmed", 20).to_record()?).await?;
    println!("First ID: {first}");

    let second = store.insert_one(User::new("Mohammed", 21).to_record()?).await?;
    println!("Second ID: {second}");

    Ok(first)
}

async fn add_multiple_users<C: StoreConnector>(store: &DataStore<C>) -> DataStoreResult<()> {
    println!("\n======= Example 2: Adding Multiple Users =======");

    let users = [
        ("Fatima", 22),
        ("Ali", 23),
        ("Zainab", 24),
        ("Khalid", 25),
        ("Noor", 26),
        ("Sara", 27),
        ("Yousef", 27),
        ("Layla", 27),
        ("Omar", 27),
        ("Huda", 27),
    ]
    .into_iter()
    .map(|(name, age)| User::new(name, age).to_record())
    .collect::<DataStoreResult<Vec<_>>>()?;

    let result = store.insert_many(users).await?;
    println!("Added {} users successfully", result.inserted_count);

    Ok(())
}

async fn find_users<C: StoreConnector>(store: &DataStore<C>) -> DataStoreResult<()> {
    println!("\n======= Example 3: Finding Users =======");

    let users = store.find(doc! { "age": 27 }, 5).await?;

    println!("Users with age 27:");
    for record in users {
        let user = User::from_record(record)?;
        println!("- {} (Age: {})", user.name, user.age);
    }

    Ok(())
}

async fn count_users<C: StoreConnector>(store: &DataStore<C>) -> DataStoreResult<()> {
    println!("\n======= Example 4: Counting Users =======");

    let count = store.count(doc! { "age": 27 }).await?;
    println!("Number of users aged 27: {count}");

    Ok(())
}

async fn find_user_by_id<C: StoreConnector>(store: &DataStore<C>, id: &str) -> DataStoreResult<()> {
    println!("\n======= Example 5: Find User by ID =======");

    match store.find_by_id(id).await? {
        Some(record) => {
            let user = User::from_record(record)?;
            println!("User Details:");
            println!("Name: {}", user.name);
            println!("Age: {}", user.age);
            if let Some(id) = user.id {
                println!("ID: {id}");
            }
        }
        None => println!("User id:({id}) not found"),
    }

    Ok(())
}

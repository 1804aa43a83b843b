// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use dapp_persistence::RecordStore;

pub fn run(store: &RecordStore, activity_id: &str) -> anyhow::Result<Option<u64>> {
    let points = store.reward_points_for(activity_id)?;
    match points {
        Some(points) => println!("{activity_id}: {points} reward points"),
        None => println!("{activity_id}: no activity recorded"),
    }
    Ok(points)
}

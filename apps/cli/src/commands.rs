//! Command handlers. Each one runs a single `DataManager` operation and
//! prints what came back.

use futures_util::StreamExt;
use serde::Serialize;
use std::error::Error;

use crate::Command;
use ribot_core::validation::validate_beacon_uuid;
use ribot_core::{CheckIn, CheckInRequest, Encounter, Venue};
use ribot_sync::DataManager;

type CommandResult = Result<(), Box<dyn Error>>;

pub async fn run(manager: &DataManager, command: Command, json: bool) -> CommandResult {
    match command {
        Command::SetToken { token } => {
            manager.set_access_token(token).await?;
            println!("Access token saved");
        }
        Command::Venues => venues(manager, json).await?,
        Command::CheckIn { venue, label } => {
            let request = match (venue, label) {
                (Some(venue_id), _) => CheckInRequest::from_venue(venue_id)?,
                (None, Some(label)) => CheckInRequest::from_label(label)?,
                (None, None) => return Err("either --venue or --label is required".into()),
            };
            let check_in = manager.check_in(request).await?;
            emit(json, &check_in, describe_check_in)?;
        }
        Command::CheckOut { check_in_id } => {
            let check_in = manager.check_out(&check_in_id).await?;
            emit(json, &check_in, describe_check_in)?;
        }
        Command::Status => status(manager, json)?,
        Command::Watch => watch(manager, json).await?,
        Command::Encounter { beacon_id } => {
            let encounter = manager.perform_beacon_encounter(&beacon_id).await?;
            emit(json, &encounter, describe_encounter)?;
        }
        Command::Scan { uuid, major, minor } => {
            validate_beacon_uuid(&uuid)?;
            let encounter = manager
                .perform_beacon_encounter_for(&uuid, major, minor)
                .await?;
            emit(json, &encounter, describe_encounter)?;
        }
        Command::SyncBeacons => {
            let count = manager.sync_registered_beacons().await?;
            println!("{count} beacons registered");
        }
        Command::BeaconUuids => {
            let mut uuids = Box::pin(manager.find_registered_beacons_uuids());
            while let Some(uuid) = uuids.next().await {
                println!("{}", uuid?);
            }
        }
        Command::Ribots => {
            let ribots = manager.get_ribots().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&ribots)?);
            } else {
                for ribot in &ribots {
                    let location = ribot
                        .latest_check_in
                        .as_ref()
                        .filter(|c| c.is_today() && !c.checked_out)
                        .and_then(CheckIn::location_name)
                        .unwrap_or("-");
                    println!("{:<30} {}", ribot.profile.name.full_name(), location);
                }
            }
        }
        Command::SignOut => {
            manager.sign_out().await?;
            println!("Signed out, local data removed");
        }
    }

    Ok(())
}

async fn venues(manager: &DataManager, json: bool) -> CommandResult {
    let mut emissions = Box::pin(manager.get_venues());
    let mut index = 0;

    while let Some(venues) = emissions.next().await {
        let venues = venues?;
        let source = if index == 0 { "cached" } else { "fresh" };
        index += 1;

        if json {
            println!("{}", serde_json::to_string(&venues)?);
        } else {
            println!("{source} ({}):", venues.len());
            for venue in &venues {
                println!("  {}", describe_venue(venue));
            }
        }
    }

    Ok(())
}

fn status(manager: &DataManager, json: bool) -> CommandResult {
    let preferences = manager.preferences();

    match preferences.latest_check_in() {
        Some(check_in) => emit(json, &check_in, describe_check_in)?,
        None => println!("No check-in"),
    }
    match preferences.latest_encounter() {
        Some(encounter) => emit(json, &encounter, describe_encounter)?,
        None => println!("No encounter"),
    }

    Ok(())
}

async fn watch(manager: &DataManager, json: bool) -> CommandResult {
    let mut today = Box::pin(manager.today_latest_check_in());
    let mut events = manager.events();

    loop {
        tokio::select! {
            check_in = today.next() => match check_in {
                Some(check_in) => emit(json, &check_in, describe_check_in)?,
                None => break,
            },
            event = events.recv() => match event {
                Some(event) => println!("event: {event}"),
                None => break,
            },
        }
    }

    Ok(())
}

// =============================================================================
// Output
// =============================================================================

fn emit<T: Serialize>(json: bool, value: &T, describe: fn(&T) -> String) -> CommandResult {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", describe(value));
    }
    Ok(())
}

fn describe_venue(venue: &Venue) -> String {
    format!("{} {}", venue.id, venue.label)
}

fn describe_check_in(check_in: &CheckIn) -> String {
    format!(
        "{} at {} since {}{}",
        check_in.id,
        check_in.location_name().unwrap_or("?"),
        check_in.checked_in_date.format("%Y-%m-%d %H:%M"),
        if check_in.checked_out { " (checked out)" } else { "" }
    )
}

fn describe_encounter(encounter: &Encounter) -> String {
    let zone = encounter
        .beacon
        .zone
        .as_ref()
        .map(|z| z.label.as_str())
        .unwrap_or("no zone");
    format!(
        "{} with beacon {} ({zone}) for check-in {}",
        encounter.id,
        encounter.beacon.id,
        encounter.check_in_id()
    )
}

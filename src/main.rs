use std::{path::PathBuf, time::Instant};

use anyhow::{bail, Context};
use chrono::{Local, NaiveTime};
use clap::{Parser, Subcommand};
use tracing::{info, Level};

use crate::{
    config::Config,
    fare::FareService,
    message::{
        candidates_message, departures_message, fare_message, status_message,
        westjr_delay_message, westjr_lines_message,
    },
    odpt::{OdptClient, TransitSource},
    server::AppState,
    status::StatusReport,
    timetable::{departures, DepartureFilter, ServiceDay},
    westjr::{line_groups, WestJrClient},
};

mod config;
mod directory;
mod error;
mod fare;
mod message;
mod monitor;
mod notify;
mod odpt;
mod server;
mod status;
mod timetable;
mod westjr;

#[derive(Parser)]
struct Args {
    /// Path to the config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Cheapest fare between two stations
    Fare {
        from: String,
        to: String,
        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Stations matching a name
    Stations {
        query: String,
        /// Print the matches as a GeoJSON FeatureCollection
        #[arg(long)]
        geojson: bool,
    },
    /// Current operational status of every line
    Status,
    /// Upcoming departures from a station
    Timetable {
        station: String,
        /// Only trains on this railway id
        #[arg(long)]
        railway: Option<String>,
        /// Max departures to list
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Earliest departure time, HH:MM
        #[arg(long)]
        after: Option<NaiveTime>,
    },
    /// JR West lines, or the delayed trains on one line
    JrWest {
        /// Line key or name
        line: Option<String>,
    },
    /// Poll train information and notify delay channels
    Monitor,
    /// Send delay notifications for a guild to a webhook
    SetDelayChannel { guild: String, webhook: String },
    /// Serve the HTTP API
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let config_path = args.config.unwrap_or_else(Config::default_path);
    let config = Config::load(&config_path)?.with_env_overrides();

    match args.command {
        Command::Fare { from, to, json } => {
            let service = FareService::from_config(&config);
            let now = Instant::now();
            let response = service.find_fare(&from, &to)?;
            info!("Priced {from} -> {to} in {:?}", now.elapsed());

            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("{}", fare_message(&response));
            }
        }
        Command::Stations { query, geojson } => {
            let service = FareService::from_config(&config);
            let candidates = service.resolve(&query)?;
            if geojson {
                let directory = service.cache().directory()?;
                let collection = directory
                    .to_geojson(candidates.iter().map(|c| &c.station_id))
                    .context("Failed to serialize stations")?;
                println!("{collection}");
            } else {
                println!("{}", candidates_message(&query, &candidates));
            }
        }
        Command::Status => {
            let info = OdptClient::new(&config).fetch_train_information()?;
            println!("{}", status_message(&StatusReport::new(&info)));
        }
        Command::Timetable {
            station,
            railway,
            limit,
            after,
        } => {
            let client = OdptClient::new(&config);
            let directory = directory::StationDirectory::new(client.fetch_station_directory()?);
            let candidates = fare::resolve::resolve(&directory, &station);
            let Some(top) = candidates.first() else {
                println!("{}", candidates_message(&station, &candidates));
                return Ok(());
            };

            let ids = directory.ids_named(&top.name);
            let timetables = client.fetch_train_timetables(railway.as_deref())?;
            let filter = DepartureFilter {
                railway: railway.as_deref(),
                day: Some(ServiceDay::for_date(Local::now().date_naive())),
                after,
            };

            let mut found = departures(&timetables, &ids, filter);
            found.truncate(limit);
            println!("{}", departures_message(&directory, &top.name, &found));
        }
        Command::JrWest { line } => {
            let client = WestJrClient::new(&config);
            let lines = client.fetch_lines()?;

            match line {
                None => println!("{}", westjr_lines_message(&line_groups(&lines))),
                Some(wanted) => {
                    let Some(line) = lines.iter().find(|l| l.key == wanted || l.name == wanted)
                    else {
                        bail!("Unknown JR West line {wanted:?}");
                    };
                    let trains = client.fetch_delayed_trains(line)?;
                    println!("{}", westjr_delay_message(line, &trains));
                }
            }
        }
        Command::Monitor => {
            tokio::runtime::Runtime::new()
                .context("Failed to start runtime")?
                .block_on(monitor::run(&config))?;
        }
        Command::SetDelayChannel { guild, webhook } => {
            // Reload without env overrides so the token isn't written to disk.
            let mut stored = Config::load(&config_path)?;
            stored.set_delay_channel(&config_path, &guild, &webhook)?;
            println!("Delay notifications for {guild} now go to {webhook}");
        }
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.bind.clone());
            let state = AppState::new(&config);
            actix_web::rt::System::new()
                .block_on(server::run(state, &bind))
                .with_context(|| format!("Server on {bind} failed"))?;
        }
    }

    Ok(())
}

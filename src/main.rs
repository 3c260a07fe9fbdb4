use anyhow::Result;
use chrono::{DateTime, Local, Timelike};
use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;

use skycast_core::{AppError, Config, ConfigError};
use skycast_weather::{
    platform_source, Backdrop, Dashboard, KeyValueStore, Location, MemoryStore, PreferencesStore,
    SqliteStore, UnitSystem, WeatherSnapshot,
};

#[derive(Parser)]
#[command(name = "skycast", version, about = "Weather for your location or any city")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Current weather and forecast
    Now {
        /// Look up a city by name instead of the current location
        #[arg(long)]
        city: Option<String>,
    },
    /// Find cities by name
    Search {
        query: String,
        /// Show weather for the Nth result (1-based) and remember it
        #[arg(long)]
        select: Option<usize>,
    },
    /// Manage favorite cities
    Favorites {
        #[command(subcommand)]
        action: Option<FavoritesAction>,
    },
    /// Show or change the unit system
    Units { choice: Option<UnitChoice> },
    /// Re-read the device position and show its weather
    Locate,
}

#[derive(Subcommand)]
enum FavoritesAction {
    List,
    /// Add the best match for a city name
    Add { query: String },
    /// Remove a favorite by name
    Remove { name: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum UnitChoice {
    Metric,
    Imperial,
    Toggle,
}

#[tokio::main]
async fn main() -> Result<()> {
    skycast_core::init()?;
    let cli = Cli::parse();

    let config = Config::load_validated().inspect_err(|e| {
        if let Some(config_err) = e.downcast_ref::<ConfigError>() {
            eprintln!("{}", config_err.user_message());
        }
    })?;
    let dashboard = Dashboard::from_config(
        &config,
        open_preferences(&config),
        platform_source(&config.location),
    )
    .map_err(|e| anyhow::anyhow!(AppError::from(e).user_message()))?;

    match cli.command.unwrap_or(Command::Now { city: None }) {
        Command::Now { city: Some(name) } => show_city(&dashboard, &name).await,
        Command::Now { city: None } => {
            let location = dashboard.start().await;
            if let Some(error) = dashboard.resolver().error() {
                println!("Location unavailable ({error}), showing {}", location.label());
            }
            show_current(&dashboard);
        }
        Command::Search { query, select } => search(&dashboard, &query, select).await,
        Command::Favorites { action } => {
            favorites(&dashboard, action.unwrap_or(FavoritesAction::List)).await;
        }
        Command::Units { choice } => units(&dashboard, choice).await,
        Command::Locate => match dashboard.refresh_location().await {
            Ok(_) => show_current(&dashboard),
            Err(e) => eprintln!("{}", AppError::from(e).user_message()),
        },
    }

    Ok(())
}

/// SQLite preferences, or an in-memory store when the database can't be opened
fn open_preferences(config: &Config) -> PreferencesStore {
    let store: Arc<dyn KeyValueStore> = match SqliteStore::open(config.database_path()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!("Preferences will not persist: {}", e);
            Arc::new(MemoryStore::new())
        }
    };
    PreferencesStore::new(store)
}

async fn show_city(dashboard: &Dashboard, name: &str) {
    let units = dashboard.orchestrator().units();
    match dashboard.orchestrator().client().fetch_by_city_name(name, units).await {
        Ok(snapshot) => {
            let label = snapshot.place_name().unwrap_or(name).to_string();
            render(&label, &snapshot, units);
        }
        Err(e) => eprintln!("{}", AppError::from(e).user_message()),
    }
}

async fn search(dashboard: &Dashboard, query: &str, select: Option<usize>) {
    let cities = dashboard.orchestrator().client().search_cities(query).await;
    if cities.is_empty() {
        println!("No cities found for '{query}'");
        return;
    }

    let Some(index) = select else {
        for (i, city) in cities.iter().enumerate() {
            println!("{:>2}. {}", i + 1, describe(city));
        }
        return;
    };

    match index.checked_sub(1).and_then(|i| cities.get(i)) {
        Some(city) => {
            dashboard.select_city(city.clone()).await;
            show_current(dashboard);
        }
        None => eprintln!("No result number {index}; {} found", cities.len()),
    }
}

async fn favorites(dashboard: &Dashboard, action: FavoritesAction) {
    let prefs = dashboard.preferences();
    let list = match action {
        FavoritesAction::List => prefs.favorite_cities(),
        FavoritesAction::Add { query } => {
            let cities = dashboard.orchestrator().client().search_cities(&query).await;
            match cities.first() {
                Some(city) => prefs.save_favorite_city(city),
                None => {
                    println!("No cities found for '{query}'");
                    return;
                }
            }
        }
        FavoritesAction::Remove { name } => {
            let found = prefs.favorite_cities().into_iter().find(|city| {
                city.name
                    .as_deref()
                    .is_some_and(|n| n.eq_ignore_ascii_case(&name))
            });
            match found {
                Some(city) => prefs.remove_favorite_city(&city),
                None => {
                    println!("'{name}' is not a favorite");
                    return;
                }
            }
        }
    };

    if list.is_empty() {
        println!("No favorite cities");
    }
    for city in &list {
        println!("  {}", describe(city));
    }
}

async fn units(dashboard: &Dashboard, choice: Option<UnitChoice>) {
    let units = match choice {
        None => dashboard.preferences().preferred_units(),
        Some(UnitChoice::Toggle) => dashboard.toggle_units().await,
        Some(UnitChoice::Metric) => {
            dashboard.set_units(UnitSystem::Metric).await;
            UnitSystem::Metric
        }
        Some(UnitChoice::Imperial) => {
            dashboard.set_units(UnitSystem::Imperial).await;
            UnitSystem::Imperial
        }
    };
    println!(
        "Units: {units} ({}, {})",
        units.temperature_symbol(),
        units.wind_speed_unit()
    );
}

fn show_current(dashboard: &Dashboard) {
    let orchestrator = dashboard.orchestrator();
    if let Some(error) = orchestrator.error() {
        eprintln!("{error}");
    }

    let (Some(snapshot), Some(location)) = (orchestrator.snapshot(), orchestrator.location())
    else {
        return;
    };

    let label = location
        .name
        .clone()
        .or_else(|| snapshot.place_name().map(str::to_string))
        .unwrap_or_else(|| location.label());
    render(&label, &snapshot, orchestrator.units());
}

/// "Paris, FR (48.86, 2.35)"
fn describe(city: &Location) -> String {
    format!("{} ({:.2}, {:.2})", city.label(), city.lat, city.lon)
}

fn render(label: &str, snapshot: &WeatherSnapshot, units: UnitSystem) {
    let backdrop = Backdrop::select(snapshot.condition(), Local::now().hour());
    println!("{label}  [{}]", backdrop.name());

    if let Some(current) = snapshot.current_conditions() {
        println!(
            "  {}  {} (feels like {})",
            units.format_temperature(current.temp),
            current.condition().description(),
            units.format_temperature(current.feels_like)
        );
        println!(
            "  Humidity {}%  Wind {}  Pressure {:.0} hPa",
            current.humidity,
            units.format_wind_speed(current.wind_speed),
            current.pressure
        );
    }

    if !snapshot.hourly.is_empty() {
        println!("  Next hours:");
        for hour in snapshot.hourly.iter().take(6) {
            println!(
                "    {}  {}  {:.0}% rain",
                local_time(hour.dt, "%H:%M"),
                units.format_temperature(hour.temp),
                hour.pop * 100.0
            );
        }
    }

    if !snapshot.daily.is_empty() {
        println!("  Next days:");
        for day in &snapshot.daily {
            println!(
                "    {}  {} / {}  {}",
                local_time(day.dt, "%a %d"),
                units.format_temperature(day.temp.max),
                units.format_temperature(day.temp.min),
                day.condition().description()
            );
        }
    }
}

fn local_time(timestamp: i64, format: &str) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|t| t.with_timezone(&Local).format(format).to_string())
        .unwrap_or_default()
}

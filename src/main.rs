use std::error::Error;
use std::thread;
use std::time::Duration;

use chrono::Local;
use clap::Parser;

use fishcast_service::config::ServiceConfig;
use fishcast_service::dev_mode::FixtureWeather;
use fishcast_service::ingest::{Almanac, OpenMeteoClient, WeatherProvider};
use fishcast_service::logging::{self, DataSource};
use fishcast_service::pipeline::run_scoring_cycle;
use fishcast_service::poll::PollGate;
use fishcast_service::sensor::FishScoreSensor;
use fishcast_service::verify;

#[derive(Parser)]
#[command(name = "fishcast", version, about = "Seven-day fishing forecast scores", long_about = None)]
struct Cli {
    /// Configuration file (default: $FISHCAST_CONFIG or fishcast.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Run one scoring cycle now, print sensor states and exit
    #[arg(long)]
    once: bool,

    /// Check every location against the providers and exit
    #[arg(long)]
    verify: bool,

    /// Replay a saved Open-Meteo response instead of calling the API
    #[arg(long, value_name = "PATH")]
    fixture: Option<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = ServiceConfig::load_from_env(cli.config.as_deref())?;

    logging::init_logger(
        config.service.level(),
        config.service.log_file.as_deref(),
        !cli.once && !cli.verify,
    )?;

    let weather: Box<dyn WeatherProvider> = match &cli.fixture {
        Some(path) => {
            logging::info(DataSource::System, None, &format!("Replaying weather from {}", path));
            Box::new(FixtureWeather::from_file(path)?)
        }
        None => Box::new(OpenMeteoClient::new(config.service.http_timeout_seconds)?),
    };
    let almanac = Almanac::default();

    if cli.verify {
        let report = verify::run_verification(&config, weather.as_ref(), &almanac, Local::now().date_naive());
        verify::print_summary(&report);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let mut sensors = FishScoreSensor::from_config(&config);
    logging::info(
        DataSource::Config,
        None,
        &format!(
            "Loaded {} locations, {} sensors",
            config.locations.len(),
            sensors.len()
        ),
    );

    let mut gate = PollGate::new(config.service.poll_hours.iter().copied());
    gate.force_next();

    loop {
        let now = Local::now().naive_local();
        if gate.should_run_at(now) {
            run_scoring_cycle(&config, weather.as_ref(), &almanac, &mut sensors, now);

            if cli.once {
                for sensor in &sensors {
                    println!("{} = {:?}", sensor.unique_id(), sensor.state);
                    println!("{}", serde_json::to_string_pretty(&sensor.attributes())?);
                }
                return Ok(());
            }
        }
        thread::sleep(Duration::from_secs(config.service.tick_seconds));
    }
}

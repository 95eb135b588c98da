use std::path::Path;

use myplanner::config::Settings;
use myplanner::feedback::feedback_channel;
use myplanner::RestPlanner;

const STATE_FILE: &str = "myplanner_state.json";
const ENV_EMAIL: &str = "MYPLANNER_EMAIL";
const ENV_PASSWORD: &str = "MYPLANNER_PASSWORD";


#[tokio::main]
async fn main() {
    env_logger::init();

    let settings = Settings::from_env();
    let (sender, mut receiver) = feedback_channel();
    let mut planner = match RestPlanner::from_settings(&settings, Path::new(STATE_FILE)) {
        Ok(planner) => planner.with_feedback_channel(sender),
        Err(err) => {
            log::error!("Invalid settings: {}", err);
            return;
        },
    };

    if planner.resume_session() == false {
        let (email, password) = match (std::env::var(ENV_EMAIL), std::env::var(ENV_PASSWORD)) {
            (Ok(email), Ok(password)) => (email, password),
            _ => {
                eprintln!("Not logged in. Set {} and {} to log in.", ENV_EMAIL, ENV_PASSWORD);
                return;
            },
        };
        if let Err(err) = planner.login(&email, &password).await {
            log::error!("Unable to log in: {}", err);
            return;
        }
    }

    if let Err(err) = planner.refresh_all().await {
        log::error!("Unable to fetch the planner: {}", err);
        return;
    }

    let today = chrono::Local::now().date_naive();
    let grid = planner.month_grid();
    myplanner::utils::print_month_grid(&grid, today);
    println!();
    myplanner::utils::print_agenda(&grid);

    println!();
    println!("Waiting for reminders. Press Ctrl-C to quit.");
    loop {
        tokio::select! {
            feedback = receiver.recv() => match feedback {
                Some(feedback) => println!("\n{}\n", feedback),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    log::info!("Connected to the broker at exit: {}", planner.notifications().connection_status());
}

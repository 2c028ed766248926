//! HTTP routing configuration for the status endpoint.
//!
//! A single `GET /status` route renders a per-server JSON snapshot. Each
//! section degrades independently: an unreachable game API or an
//! unreadable stats file turns into an error string for that section
//! while the rest of the snapshot still renders.

use actix_web::{HttpResponse, web};
use serde_json::{Value, json};

use super::state::AppState;
use crate::config::ServerConfig;
use crate::config::relay::LEADERBOARD_SIZE;
use crate::tracker::epoch_now;

const API_DOWN: &str = "Error accessing API. Server may be down.";

/// Configure the application's HTTP routes.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/status").to(status));
}

async fn status(data: web::Data<AppState>) -> HttpResponse {
    let mut servers = Vec::new();
    for server in &data.config.servers {
        servers.push(json!({
            "name": server.name,
            "score": score_section(&data, server).await,
            "players": players_section(&data, server).await,
            "history": history_section(&data, server),
            "leaderboard": leaderboard_section(&data, server),
        }));
    }
    HttpResponse::Ok().json(Value::Array(servers))
}

async fn score_section(data: &AppState, server: &ServerConfig) -> Value {
    match data.api.get_control_game(server).await {
        Ok(game) => json!({
            "state": game.game_state.describe(),
            "timeLeft": game.time_left,
            "arthurian": game.arthurian_score,
            "tuathaDeDanann": game.tuatha_de_danann_score,
            "viking": game.viking_score,
        }),
        Err(_) => json!({ "error": API_DOWN }),
    }
}

async fn players_section(data: &AppState, server: &ServerConfig) -> Value {
    match data.api.get_players(server).await {
        Ok(counts) => json!({
            "total": counts.total(),
            "arthurians": counts.arthurians,
            "tuathaDeDanann": counts.tuatha_de_danann,
            "vikings": counts.vikings,
        }),
        Err(_) => json!({ "error": API_DOWN }),
    }
}

fn history_section(data: &AppState, server: &ServerConfig) -> Value {
    match data.store.load_game_stats(&server.name, epoch_now()) {
        Ok(stats) => json!({
            "firstRoundAt": stats.first_round_at,
            "roundsPlayed": stats.rounds_played,
            "lastStartTime": stats.last_start_time,
            "arthurianWins": stats.wins.arthurian,
            "tuathaDeDanannWins": stats.wins.tuatha_de_danann,
            "vikingWins": stats.wins.viking,
        }),
        Err(_) => json!({ "error": "Round statistics unavailable." }),
    }
}

fn leaderboard_section(data: &AppState, server: &ServerConfig) -> Value {
    match data.store.load_players(&server.name) {
        Ok(roster) => json!({
            "kills": roster.top_by_kills(LEADERBOARD_SIZE),
            "deaths": roster.top_by_deaths(LEADERBOARD_SIZE),
        }),
        Err(_) => json!({ "error": "Player statistics unavailable." }),
    }
}

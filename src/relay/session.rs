/// Per-server session actor.
///
/// One session owns everything about a single game server: the chat
/// connection, room join state, MOTD delivery, the round tracker and the
/// in-memory copy of the durable stats. All state is actor-local; the only
/// way in is a message.
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use actix::prelude::*;
use log::{debug, error, info, warn};
use rand::distr::{Alphanumeric, SampleString};
use uuid::Uuid;

use super::commands::{self, CommandContext, ReplyTarget};
use super::messages::{ApplyMotd, ApplyOptOut, RestartRequest, Stop, TransportEvent};
use super::supervisor::{RelayDeps, RelaySupervisor};
use crate::api::{ApiError, ControlGame, KillEvent};
use crate::chat::{ChatConnection, InboundEvent, OutboundFrame};
use crate::config::ServerConfig;
use crate::config::relay::{API_RETRIES, LIVENESS_CHECK_INTERVAL_SECS, MOTD_TICK_MS};
use crate::store::{Faction, GameStats, PlayerRoster};
use crate::tracker::epoch_now;
use crate::tracker::liveness::Liveness;
use crate::tracker::motd::MotdQueue;
use crate::tracker::rooms::RoomSet;
use crate::tracker::rounds::{RoundEvent, RoundTracker};

/// Result of one poll tick, carried back onto the actor context.
/// `kills` is `None` when the kill fetch itself failed; `fetched_at` is
/// the time the fetch was issued, which becomes the next `since`
/// watermark so kills landing during request latency are not skipped.
struct PollOutcome {
    control: Result<ControlGame, ApiError>,
    kills: Option<Vec<KillEvent>>,
    fetched_at: u64,
}

pub struct ServerSession {
    pub(crate) cfg: Arc<ServerConfig>,
    pub(crate) deps: Arc<RelayDeps>,
    pub(crate) supervisor: Addr<RelaySupervisor>,
    incarnation: Uuid,
    conn: Option<Box<dyn ChatConnection>>,
    liveness: Liveness,
    rooms: RoomSet,
    motd_queue: MotdQueue,
    pub(crate) motd: String,
    pub(crate) optout: HashSet<String>,
    round: RoundTracker,
    game_stats: GameStats,
    roster: PlayerRoster,
    timers: Vec<SpawnHandle>,
    /// The MOTD and poll timers are armed once, on the first Online event.
    ticking: bool,
    /// One poll outstanding at a time; a slow API skips ticks instead of
    /// stacking requests.
    poll_in_flight: bool,
    last_kill_fetch: u64,
    stopped: bool,
}

impl ServerSession {
    pub fn new(
        cfg: Arc<ServerConfig>,
        deps: Arc<RelayDeps>,
        supervisor: Addr<RelaySupervisor>,
        incarnation: Uuid,
    ) -> Self {
        let now = epoch_now();
        let thresholds = &cfg.thresholds;
        Self {
            liveness: Liveness::new(now, thresholds.stanza_timeout_secs),
            rooms: RoomSet::from_config(&cfg.rooms),
            motd_queue: MotdQueue::new(thresholds.motd_grace_secs, thresholds.motd_cooldown_secs),
            round: RoundTracker::new(cfg.round_duration_secs, thresholds.down_poll_budget),
            game_stats: GameStats::initial(now),
            roster: PlayerRoster::default(),
            motd: String::new(),
            optout: HashSet::new(),
            conn: None,
            timers: Vec::new(),
            ticking: false,
            poll_in_flight: false,
            last_kill_fetch: now,
            stopped: false,
            cfg,
            deps,
            supervisor,
            incarnation,
        }
    }

    fn load_state(&mut self) {
        let name = self.cfg.name.clone();
        let now = epoch_now();
        match self.deps.store.load_motd(&name) {
            Ok(motd) => self.motd = motd,
            Err(err) => {
                error!("[Session] {name}: cannot load MOTD: {err}");
                self.motd = crate::store::file::DEFAULT_MOTD.to_string();
            }
        }
        match self.deps.store.load_optout(&name) {
            Ok(optout) => self.optout = optout,
            Err(err) => error!("[Session] {name}: cannot load MOTD opt-out list: {err}"),
        }
        match self.deps.store.load_game_stats(&name, now) {
            Ok(stats) => self.game_stats = stats,
            Err(err) => error!("[Session] {name}: cannot load game stats: {err}"),
        }
        match self.deps.store.load_players(&name) {
            Ok(roster) => self.roster = roster,
            Err(err) => error!("[Session] {name}: cannot load player stats: {err}"),
        }
    }

    fn send_frame(&self, frame: OutboundFrame) {
        if let Some(conn) = &self.conn {
            if let Err(err) = conn.send(frame) {
                warn!("[Session] {}: send failed: {err}", self.cfg.name);
            }
        }
    }

    pub(crate) fn send_reply(&self, reply: &ReplyTarget, text: &str) {
        match reply {
            ReplyTarget::Room(room) => self.send_frame(OutboundFrame::RoomMessage {
                room: room.clone(),
                body: text.to_string(),
            }),
            ReplyTarget::Private(to) => self.send_frame(OutboundFrame::DirectMessage {
                to: to.clone(),
                body: text.to_string(),
            }),
        }
    }

    fn liveness_tick(&mut self) {
        if self.stopped {
            return;
        }
        let now = epoch_now();
        if self.liveness.is_stale(now) {
            warn!(
                "[Session] {}: no transport event for {}s, requesting restart",
                self.cfg.name,
                self.liveness.elapsed(now)
            );
            // Reset the clock so the request fires once, not every tick
            // while the supervisor tears us down.
            self.liveness.touch(now);
            self.supervisor.do_send(RestartRequest {
                name: self.cfg.name.clone(),
                incarnation: self.incarnation,
            });
        }
    }

    fn motd_tick(&mut self) {
        if self.stopped {
            return;
        }
        for user in self.motd_queue.tick(epoch_now()) {
            self.send_frame(OutboundFrame::DirectMessage {
                to: user.clone(),
                body: self.motd.clone(),
            });
            info!("[MOTD] sent to '{}' on {}", user, self.cfg.name);
        }
    }

    fn poll_tick(&mut self, ctx: &mut Context<Self>) {
        if self.stopped || self.poll_in_flight {
            return;
        }
        self.poll_in_flight = true;
        let api = self.deps.api.clone();
        let cfg = self.cfg.clone();
        let since = self.last_kill_fetch;
        let fut = async move {
            let mut attempts = 0;
            let control = loop {
                match api.get_control_game(&cfg).await {
                    Ok(control) => break Ok(control),
                    Err(err) if attempts < API_RETRIES => {
                        attempts += 1;
                        debug!("[Round] {}: poll retry {attempts}: {err}", cfg.name);
                    }
                    Err(err) => break Err(err),
                }
            };
            // The kill feed is best effort; one missed fetch is made up by
            // the next one because the watermark only advances on success.
            let fetched_at = epoch_now();
            let kills = if control.is_ok() {
                match api.get_kills(&cfg, since).await {
                    Ok(kills) => Some(kills),
                    Err(err) => {
                        debug!("[Round] {}: kill fetch failed: {err}", cfg.name);
                        None
                    }
                }
            } else {
                None
            };
            PollOutcome {
                control,
                kills,
                fetched_at,
            }
        };
        ctx.spawn(
            fut.into_actor(self)
                .map(|outcome, session, _| session.apply_poll(outcome)),
        );
    }

    fn apply_poll(&mut self, outcome: PollOutcome) {
        self.poll_in_flight = false;
        if self.stopped {
            return;
        }
        let now = epoch_now();
        match outcome.control {
            Err(err) => {
                warn!("[Round] {}: poll failed: {err}", self.cfg.name);
                if let Some(RoundEvent::Abandoned) = self.round.observe_down() {
                    warn!(
                        "[Round] {}: round ended during API outage, nobody credited",
                        self.cfg.name
                    );
                }
            }
            Ok(control) => {
                if let Some(kills) = &outcome.kills {
                    self.apply_kills(kills);
                    self.last_kill_fetch = outcome.fetched_at;
                }
                match self.round.observe(&control, now) {
                    Some(RoundEvent::Started {
                        round_number,
                        started_at,
                    }) => {
                        self.game_stats.last_start_time = started_at;
                        // Kills in this batch landed while the tracker
                        // still read "ended"; replay their participants
                        // into the round that just started.
                        if let Some(kills) = &outcome.kills {
                            self.note_participants(kills);
                        }
                        info!("[Round] {}: round {round_number} started", self.cfg.name);
                    }
                    Some(RoundEvent::Ended {
                        winners,
                        participants,
                    }) => self.credit_round(winners, participants),
                    Some(RoundEvent::Abandoned) | None => {}
                }
            }
        }
    }

    fn apply_kills(&mut self, kills: &[KillEvent]) {
        for kill in kills {
            if let Some(killer) = &kill.killer {
                self.roster.upsert(killer).kills += 1;
            }
            if let Some(victim) = &kill.victim {
                self.roster.upsert(victim).deaths += 1;
            }
        }
        self.note_participants(kills);
    }

    fn note_participants(&mut self, kills: &[KillEvent]) {
        for kill in kills {
            if let Some(killer) = &kill.killer {
                self.round.note_participant(&killer.name);
            }
            if let Some(victim) = &kill.victim {
                self.round.note_participant(&victim.name);
            }
        }
    }

    fn credit_round(&mut self, winners: Vec<Faction>, participants: Vec<String>) {
        for faction in &winners {
            self.game_stats.wins.add(*faction);
        }
        self.game_stats.rounds_played += 1;
        self.roster.credit_round(&participants);
        if let Err(err) =
            self.deps
                .store
                .save_round_stats(&self.cfg.name, &self.game_stats, &self.roster)
        {
            error!("[Round] {}: cannot persist round stats: {err}", self.cfg.name);
        }
        let names: Vec<&str> = winners.iter().map(|f| f.as_str()).collect();
        info!(
            "[Round] {}: round ended, win credited to {} ({} participants)",
            self.cfg.name,
            names.join(", "),
            participants.len()
        );
    }

    fn on_online(&mut self, ctx: &mut Context<Self>) {
        info!("[Session] {}: connected", self.cfg.name);
        self.send_frame(OutboundFrame::Presence {
            show: "chat".to_string(),
        });
        let joins: Vec<String> = self.rooms.iter().map(|r| r.name.clone()).collect();
        for room in joins {
            info!("[Session] {}: joining '{room}'", self.cfg.name);
            self.send_frame(OutboundFrame::JoinRoom {
                room,
                nickname: self.cfg.nickname.clone(),
            });
        }
        if !self.ticking {
            self.ticking = true;
            let motd = ctx.run_interval(Duration::from_millis(MOTD_TICK_MS), |session, _| {
                session.motd_tick()
            });
            let poll = ctx.run_interval(
                Duration::from_secs(self.cfg.thresholds.round_poll_interval_secs),
                |session, ctx| session.poll_tick(ctx),
            );
            self.timers.push(motd);
            self.timers.push(poll);
        }
    }

    fn on_presence(
        &mut self,
        now: u64,
        room: String,
        sender: String,
        role: Option<String>,
        roster_complete: bool,
    ) {
        let Some((joined, motd_enabled)) = self.rooms.get(&room).map(|r| (r.joined, r.motd_enabled))
        else {
            debug!(
                "[Session] {}: presence in unconfigured room '{room}' ignored",
                self.cfg.name
            );
            return;
        };
        // Visitors (role "none") get no MOTD, nor does anything that
        // arrives before the initial roster is complete.
        if joined
            && motd_enabled
            && role.as_deref() != Some("none")
            && !self.optout.contains(&sender)
            && self.motd_queue.note_join(&sender, now)
        {
            debug!(
                "[MOTD] queued '{sender}' from '{room}' on {}",
                self.cfg.name
            );
        }
        // Roster-complete is checked after the MOTD gate on purpose: the
        // signal arrives on the final replayed presence, and users already
        // in the room must not be greeted.
        if roster_complete && self.rooms.mark_joined(&room) {
            info!("[Session] {}: joined '{room}'", self.cfg.name);
        }
    }

    fn on_room_message(
        &mut self,
        ctx: &mut Context<Self>,
        room: String,
        sender: String,
        body: String,
        staff: bool,
    ) {
        if body.starts_with(commands::COMMAND_CHAR) {
            let is_admin = staff || self.deps.config.is_admin(&sender);
            commands::dispatch(
                self,
                ctx,
                CommandContext {
                    is_admin,
                    reply: ReplyTarget::Room(room),
                    sender,
                },
                &body,
            );
            return;
        }
        let Some((joined, monitored, logging)) = self
            .rooms
            .get(&room)
            .map(|r| (r.joined, r.monitored, r.logging_enabled))
        else {
            return;
        };
        if !joined {
            return;
        }
        if staff && monitored {
            let notice = format!("{sender}@{room}: {body}");
            self.deps.notifier.notify_all(&notice);
            info!(
                "[Chat] {}: staff message from '{sender}' in '{room}' relayed",
                self.cfg.name
            );
            if self.deps.config.is_test_message(&body) {
                self.deps.notifier.notify_min(&notice);
            }
        }
        if logging {
            if let Err(err) = self
                .deps
                .store
                .append_chat_log(&self.cfg.name, &room, &sender, &body)
            {
                error!("[Chat] {}: cannot append chat log: {err}", self.cfg.name);
            }
        }
    }

    fn on_direct_message(
        &mut self,
        ctx: &mut Context<Self>,
        from: String,
        body: String,
        staff: bool,
    ) {
        // The game server itself raises alarms through a "Warning"
        // connection resource.
        if from.ends_with("/Warning") {
            self.deps
                .notifier
                .notify_all(&format!("ADMIN NOTICE: {body}"));
            warn!("[Chat] {}: server warning relayed: {body}", self.cfg.name);
            return;
        }
        if body.starts_with(commands::COMMAND_CHAR) {
            let sender = from
                .split(['@', '/'])
                .next()
                .unwrap_or(from.as_str())
                .to_string();
            let is_admin = staff || self.deps.config.is_admin(&sender);
            commands::dispatch(
                self,
                ctx,
                CommandContext {
                    is_admin,
                    reply: ReplyTarget::Private(from),
                    sender,
                },
                &body,
            );
        }
    }

    fn stop_session(&mut self, ctx: &mut Context<Self>) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        for timer in self.timers.drain(..) {
            ctx.cancel_future(timer);
        }
        if let Some(mut conn) = self.conn.take() {
            conn.close();
        }
        self.motd_queue.clear();
        ctx.stop();
        info!("[Session] {}: stopped", self.cfg.name);
    }
}

impl Actor for ServerSession {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!("[Session] {}: starting", self.cfg.name);
        self.load_state();
        // The liveness monitor runs from the start, so a connection that
        // never comes up at all is also caught and restarted.
        let liveness = ctx.run_interval(Duration::from_secs(LIVENESS_CHECK_INTERVAL_SECS), |session, _| {
            session.liveness_tick()
        });
        self.timers.push(liveness);
        let suffix = Alphanumeric.sample_string(&mut rand::rng(), 8);
        let resource = format!("bot-{suffix}");
        match self
            .deps
            .transport
            .connect(&self.cfg, &resource, ctx.address().recipient())
        {
            Ok(conn) => self.conn = Some(conn),
            Err(err) => error!("[Session] {}: transport setup failed: {err}", self.cfg.name),
        }
    }
}

impl Handler<TransportEvent> for ServerSession {
    type Result = ();

    fn handle(&mut self, msg: TransportEvent, ctx: &mut Self::Context) -> Self::Result {
        if self.stopped {
            return;
        }
        let now = epoch_now();
        // Every inbound event, relevant or not, proves the link is alive.
        self.liveness.touch(now);
        match msg.0 {
            InboundEvent::Online => self.on_online(ctx),
            InboundEvent::Disconnect => {
                warn!("[Session] {}: disconnected", self.cfg.name);
                self.rooms.reset_joined();
            }
            InboundEvent::TransportError { detail } => {
                warn!("[Session] {}: transport error: {detail}", self.cfg.name);
            }
            InboundEvent::Presence {
                room,
                sender,
                role,
                roster_complete,
            } => self.on_presence(now, room, sender, role, roster_complete),
            InboundEvent::RoomMessage {
                room,
                sender,
                body,
                staff,
            } => self.on_room_message(ctx, room, sender, body, staff),
            InboundEvent::DirectMessage { from, body, staff } => {
                self.on_direct_message(ctx, from, body, staff)
            }
            InboundEvent::ErrorStanza { detail } => {
                warn!("[Session] {}: error stanza: {detail}", self.cfg.name);
            }
            InboundEvent::Other => {}
        }
    }
}

impl Handler<Stop> for ServerSession {
    type Result = ();

    fn handle(&mut self, _: Stop, ctx: &mut Self::Context) -> Self::Result {
        self.stop_session(ctx);
    }
}

impl Handler<ApplyMotd> for ServerSession {
    type Result = Result<String, String>;

    fn handle(&mut self, msg: ApplyMotd, _: &mut Self::Context) -> Self::Result {
        let text = format!("MOTD: {}", msg.text);
        match self.deps.store.save_motd(&self.cfg.name, &text) {
            Ok(()) => {
                self.motd = text;
                info!(
                    "[MOTD] {}: new MOTD set by '{}'",
                    self.cfg.name, msg.sender
                );
                Ok(format!("MOTD for {} set to: {}", self.cfg.name, msg.text))
            }
            Err(err) => {
                error!("[MOTD] {}: cannot write MOTD: {err}", self.cfg.name);
                Err("Unable to write MOTD file.".to_string())
            }
        }
    }
}

impl Handler<ApplyOptOut> for ServerSession {
    type Result = Result<String, String>;

    fn handle(&mut self, msg: ApplyOptOut, _: &mut Self::Context) -> Self::Result {
        let server = self.cfg.name.clone();
        if msg.opt_out {
            if !self.optout.insert(msg.user.clone()) {
                return Ok(format!(
                    "User '{}' already unsubscribed from {server} MOTD notices.",
                    msg.user
                ));
            }
            // Cancel an already-queued delivery too.
            self.motd_queue.remove(&msg.user);
            match self.deps.store.save_optout(&server, &self.optout) {
                Ok(()) => {
                    info!("[MOTD] {server}: '{}' opted out", msg.user);
                    Ok(format!(
                        "User '{}' unsubscribed from {server} MOTD notices.",
                        msg.user
                    ))
                }
                Err(err) => {
                    self.optout.remove(&msg.user);
                    error!("[MOTD] {server}: cannot write opt-out list: {err}");
                    Err("Unable to write MOTD opt-out list.".to_string())
                }
            }
        } else {
            if !self.optout.remove(&msg.user) {
                return Ok(format!(
                    "User '{}' already subscribed to {server} MOTD notices.",
                    msg.user
                ));
            }
            match self.deps.store.save_optout(&server, &self.optout) {
                Ok(()) => {
                    info!("[MOTD] {server}: '{}' opted back in", msg.user);
                    Ok(format!(
                        "User '{}' subscribed to {server} MOTD notices.",
                        msg.user
                    ))
                }
                Err(err) => {
                    self.optout.insert(msg.user.clone());
                    error!("[MOTD] {server}: cannot write opt-out list: {err}");
                    Err("Unable to write MOTD opt-out list.".to_string())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    use crate::api::{ApiFuture, GameApi, GamePhase, PlayerCounts, PlayerRef, ScheduledEvent};
    use crate::chat::{ChatTransport, TransportError};
    use crate::config::RelayConfig;
    use crate::notify::LogNotifier;
    use crate::store::{StatsStore, StoreError};

    #[derive(Default)]
    struct RecordingStore {
        round_writes: Mutex<Vec<(GameStats, PlayerRoster)>>,
    }

    impl StatsStore for RecordingStore {
        fn load_motd(&self, _: &str) -> Result<String, StoreError> {
            Ok("MOTD: welcome".to_string())
        }
        fn save_motd(&self, _: &str, _: &str) -> Result<(), StoreError> {
            Ok(())
        }
        fn load_optout(&self, _: &str) -> Result<HashSet<String>, StoreError> {
            Ok(HashSet::new())
        }
        fn save_optout(&self, _: &str, _: &HashSet<String>) -> Result<(), StoreError> {
            Ok(())
        }
        fn load_game_stats(&self, _: &str, now: u64) -> Result<GameStats, StoreError> {
            Ok(GameStats::initial(now))
        }
        fn load_players(&self, _: &str) -> Result<PlayerRoster, StoreError> {
            Ok(PlayerRoster::default())
        }
        fn save_round_stats(
            &self,
            _: &str,
            game: &GameStats,
            players: &PlayerRoster,
        ) -> Result<(), StoreError> {
            self.round_writes
                .lock()
                .unwrap()
                .push((game.clone(), players.clone()));
            Ok(())
        }
        fn append_chat_log(&self, _: &str, _: &str, _: &str, _: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    struct DownApi;

    impl GameApi for DownApi {
        fn get_players(&self, _: &ServerConfig) -> ApiFuture<PlayerCounts> {
            Box::pin(async { Err(ApiError::Status(503)) })
        }
        fn get_control_game(&self, _: &ServerConfig) -> ApiFuture<ControlGame> {
            Box::pin(async { Err(ApiError::Status(503)) })
        }
        fn get_kills(&self, _: &ServerConfig, _: u64) -> ApiFuture<Vec<KillEvent>> {
            Box::pin(async { Err(ApiError::Status(503)) })
        }
        fn get_events(&self, _: &ServerConfig) -> ApiFuture<Vec<ScheduledEvent>> {
            Box::pin(async { Err(ApiError::Status(503)) })
        }
    }

    struct RecordingConnection {
        frames: Arc<Mutex<Vec<OutboundFrame>>>,
    }

    impl ChatConnection for RecordingConnection {
        fn send(&self, frame: OutboundFrame) -> Result<(), TransportError> {
            self.frames.lock().unwrap().push(frame);
            Ok(())
        }
        fn close(&mut self) {}
    }

    struct NullTransport;

    impl ChatTransport for NullTransport {
        fn connect(
            &self,
            _: &ServerConfig,
            _: &str,
            _: actix::Recipient<TransportEvent>,
        ) -> Result<Box<dyn ChatConnection>, TransportError> {
            Ok(Box::new(RecordingConnection {
                frames: Arc::new(Mutex::new(Vec::new())),
            }))
        }
    }

    fn server_cfg() -> Arc<ServerConfig> {
        Arc::new(
            serde_json::from_str(
                r#"{
                    "name": "wyrmling",
                    "chat_addr": "chat.wyrmling.example:5222",
                    "api_base": "http://wyrmling.example:8000/api",
                    "username": "bot",
                    "password": "hunter2",
                    "nickname": "Herald",
                    "rooms": [{"name": "_global", "motd": true}]
                }"#,
            )
            .unwrap(),
        )
    }

    /// A session wired to recording stubs. The supervisor is real but has
    /// no servers configured, so it spawns nothing on its own.
    fn test_session(
        store: Arc<RecordingStore>,
        frames: Arc<Mutex<Vec<OutboundFrame>>>,
    ) -> ServerSession {
        let config: Arc<RelayConfig> = Arc::new(
            serde_json::from_str(r#"{"data_dir": "/tmp", "servers": []}"#).unwrap(),
        );
        let deps = Arc::new(RelayDeps {
            config,
            transport: Arc::new(NullTransport),
            api: Arc::new(DownApi),
            store,
            notifier: Arc::new(LogNotifier),
        });
        let supervisor = RelaySupervisor::new(deps.clone()).start();
        let mut session = ServerSession::new(server_cfg(), deps, supervisor, Uuid::new_v4());
        session.conn = Some(Box::new(RecordingConnection { frames }));
        session
    }

    fn poll(state: GamePhase, art: i64, tua: i64, vik: i64, time_left: u64) -> ControlGame {
        ControlGame {
            time_left,
            arthurian_score: art,
            tuatha_de_danann_score: tua,
            viking_score: vik,
            game_state: state,
        }
    }

    fn fighter(name: &str) -> PlayerRef {
        PlayerRef {
            name: name.to_string(),
            faction: None,
            race: None,
            archetype: None,
        }
    }

    /// Once a session is stopped, a timer or poll continuation that fires
    /// late must neither send an MOTD nor write statistics.
    #[actix_web::test]
    async fn stopped_session_drops_late_callbacks() {
        let store = Arc::new(RecordingStore::default());
        let frames = Arc::new(Mutex::new(Vec::new()));
        let mut session = test_session(store.clone(), frames.clone());

        // Prime a long-overdue MOTD delivery and an active round whose
        // next Waiting poll would be credited.
        session.motd_queue.note_join("arthas", 0);
        session.apply_poll(PollOutcome {
            control: Ok(poll(GamePhase::BasicActive, 0, 0, 0, 600)),
            kills: None,
            fetched_at: 0,
        });
        session.apply_poll(PollOutcome {
            control: Ok(poll(GamePhase::Waiting, 5, 0, 0, 0)),
            kills: None,
            fetched_at: 0,
        });
        // That first round end was credited normally.
        assert_eq!(store.round_writes.lock().unwrap().len(), 1);

        session.apply_poll(PollOutcome {
            control: Ok(poll(GamePhase::BasicActive, 0, 0, 0, 600)),
            kills: None,
            fetched_at: 0,
        });
        session.stopped = true;

        session.motd_tick();
        session.apply_poll(PollOutcome {
            control: Ok(poll(GamePhase::Waiting, 9, 0, 0, 0)),
            kills: None,
            fetched_at: 0,
        });

        assert!(frames.lock().unwrap().is_empty());
        assert_eq!(store.round_writes.lock().unwrap().len(), 1);
    }

    /// Kills fetched in the same poll that observes the round start still
    /// count toward the new round, and the kill watermark advances to the
    /// fetch time rather than the apply time.
    #[actix_web::test]
    async fn start_tick_kills_join_the_new_round() {
        let store = Arc::new(RecordingStore::default());
        let frames = Arc::new(Mutex::new(Vec::new()));
        let mut session = test_session(store.clone(), frames);

        session.apply_poll(PollOutcome {
            control: Ok(poll(GamePhase::Waiting, 0, 0, 0, 0)),
            kills: None,
            fetched_at: 0,
        });
        session.apply_poll(PollOutcome {
            control: Ok(poll(GamePhase::BasicActive, 0, 0, 0, 600)),
            kills: Some(vec![KillEvent {
                killer: Some(fighter("morrigan")),
                victim: Some(fighter("beowulf")),
            }]),
            fetched_at: 42,
        });
        assert_eq!(session.last_kill_fetch, 42);

        session.apply_poll(PollOutcome {
            control: Ok(poll(GamePhase::Waiting, 1, 0, 0, 0)),
            kills: Some(Vec::new()),
            fetched_at: 50,
        });

        let writes = store.round_writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        let (stats, roster) = &writes[0];
        assert_eq!(stats.rounds_played, 1);
        assert_eq!(roster.get("morrigan").unwrap().rounds_played, 1);
        // The opening-seconds victim is a participant too.
        let beowulf = roster.get("beowulf").unwrap();
        assert_eq!(beowulf.rounds_played, 1);
        assert_eq!(beowulf.deaths, 1);
    }
}

/// Chat command table and dispatch.
///
/// Commands are plain functions over the session actor. A command may name
/// another configured server as its first parameter; otherwise it targets
/// the server the session is attached to. Replies go back to wherever the
/// command came from: the room for group chat, a direct message otherwise.
use actix::prelude::*;
use log::info;

use super::messages::{SetMotd, SetMotdOptOut, StartSession, StopSession};
use super::session::ServerSession;

pub const COMMAND_CHAR: char = '!';

#[derive(Clone)]
pub enum ReplyTarget {
    Room(String),
    Private(String),
}

pub struct CommandContext {
    pub is_admin: bool,
    pub reply: ReplyTarget,
    pub sender: String,
}

type CommandHandler = fn(&mut ServerSession, &mut Context<ServerSession>, &CommandContext, &str);

struct ChatCommand {
    name: &'static str,
    handler: CommandHandler,
}

static COMMANDS: &[ChatCommand] = &[
    ChatCommand {
        name: "motd",
        handler: cmd_motd,
    },
    ChatCommand {
        name: "motdoff",
        handler: cmd_motdoff,
    },
    ChatCommand {
        name: "motdon",
        handler: cmd_motdon,
    },
    ChatCommand {
        name: "clienton",
        handler: cmd_clienton,
    },
    ChatCommand {
        name: "clientoff",
        handler: cmd_clientoff,
    },
    ChatCommand {
        name: "score",
        handler: cmd_score,
    },
    ChatCommand {
        name: "players",
        handler: cmd_players,
    },
    ChatCommand {
        name: "events",
        handler: cmd_events,
    },
];

/// Look up and run the command in `message`. Unknown commands are ignored
/// so ordinary chat starting with '!' never produces noise.
pub fn dispatch(
    session: &mut ServerSession,
    ctx: &mut Context<ServerSession>,
    cmd_ctx: CommandContext,
    message: &str,
) {
    let mut parts = message[1..].splitn(2, ' ');
    let word = parts.next().unwrap_or("").to_lowercase();
    let params = parts.next().unwrap_or("").trim();
    if let Some(command) = COMMANDS.iter().find(|c| c.name == word) {
        info!("[Command] '{}' ran !{word}", cmd_ctx.sender);
        (command.handler)(session, ctx, &cmd_ctx, params);
    }
}

/// If the first parameter names a configured server, target it and strip
/// it off; otherwise target the session's own server.
fn split_target<'a>(session: &ServerSession, params: &'a str) -> (String, &'a str) {
    if let Some(first) = params.split_whitespace().next() {
        if session.deps.config.server(first).is_some() {
            return (first.to_string(), params[first.len()..].trim_start());
        }
    }
    (session.cfg.name.clone(), params)
}

fn flatten(result: Result<Result<String, String>, MailboxError>) -> String {
    match result {
        Ok(Ok(text)) | Ok(Err(text)) => text,
        Err(err) => format!("Command failed: {err}"),
    }
}

/// `!motd [server]` shows a server's MOTD; `!motd [server] <text>` sets it
/// (admins only).
fn cmd_motd(
    session: &mut ServerSession,
    ctx: &mut Context<ServerSession>,
    cmd_ctx: &CommandContext,
    params: &str,
) {
    let (target, rest) = split_target(session, params);
    if !rest.is_empty() {
        if !cmd_ctx.is_admin {
            session.send_reply(&cmd_ctx.reply, "You do not have permission to set an MOTD.");
            return;
        }
        let fut = session.supervisor.send(SetMotd {
            server: target,
            sender: cmd_ctx.sender.clone(),
            text: rest.to_string(),
        });
        let reply = cmd_ctx.reply.clone();
        ctx.spawn(fut.into_actor(session).map(move |result, session, _| {
            session.send_reply(&reply, &flatten(result));
        }));
        return;
    }
    if target == session.cfg.name {
        session.send_reply(&cmd_ctx.reply, &session.motd);
    } else {
        match session.deps.store.load_motd(&target) {
            Ok(motd) => session.send_reply(&cmd_ctx.reply, &motd),
            Err(_) => session.send_reply(
                &cmd_ctx.reply,
                &format!("Unable to read the MOTD for {target}."),
            ),
        }
    }
}

fn cmd_motdoff(
    session: &mut ServerSession,
    ctx: &mut Context<ServerSession>,
    cmd_ctx: &CommandContext,
    params: &str,
) {
    set_motd_optout(session, ctx, cmd_ctx, params, true);
}

fn cmd_motdon(
    session: &mut ServerSession,
    ctx: &mut Context<ServerSession>,
    cmd_ctx: &CommandContext,
    params: &str,
) {
    set_motd_optout(session, ctx, cmd_ctx, params, false);
}

fn set_motd_optout(
    session: &mut ServerSession,
    ctx: &mut Context<ServerSession>,
    cmd_ctx: &CommandContext,
    params: &str,
    opt_out: bool,
) {
    let target = if params.is_empty() {
        session.cfg.name.clone()
    } else {
        let first = params.split_whitespace().next().unwrap_or(params);
        match session.deps.config.server(first) {
            Some(server) => server.name.clone(),
            None => {
                session.send_reply(&cmd_ctx.reply, &format!("No server exists named '{first}'."));
                return;
            }
        }
    };
    let fut = session.supervisor.send(SetMotdOptOut {
        server: target,
        user: cmd_ctx.sender.clone(),
        opt_out,
    });
    let reply = cmd_ctx.reply.clone();
    ctx.spawn(fut.into_actor(session).map(move |result, session, _| {
        session.send_reply(&reply, &flatten(result));
    }));
}

fn cmd_clienton(
    session: &mut ServerSession,
    ctx: &mut Context<ServerSession>,
    cmd_ctx: &CommandContext,
    params: &str,
) {
    if !cmd_ctx.is_admin {
        session.send_reply(
            &cmd_ctx.reply,
            "You do not have permission to start a client.",
        );
        return;
    }
    let (target, _) = split_target(session, params);
    let fut = session.supervisor.send(StartSession { name: target });
    let reply = cmd_ctx.reply.clone();
    ctx.spawn(fut.into_actor(session).map(move |result, session, _| {
        session.send_reply(&reply, &flatten(result));
    }));
}

fn cmd_clientoff(
    session: &mut ServerSession,
    ctx: &mut Context<ServerSession>,
    cmd_ctx: &CommandContext,
    params: &str,
) {
    if !cmd_ctx.is_admin {
        session.send_reply(
            &cmd_ctx.reply,
            "You do not have permission to stop a client.",
        );
        return;
    }
    let (target, _) = split_target(session, params);
    let fut = session.supervisor.send(StopSession { name: target });
    let reply = cmd_ctx.reply.clone();
    ctx.spawn(fut.into_actor(session).map(move |result, session, _| {
        session.send_reply(&reply, &flatten(result));
    }));
}

fn cmd_score(
    session: &mut ServerSession,
    ctx: &mut Context<ServerSession>,
    cmd_ctx: &CommandContext,
    params: &str,
) {
    let (target, _) = split_target(session, params);
    let Some(server) = session.deps.config.server(&target) else {
        return;
    };
    let name = server.name.clone();
    let fut = session.deps.api.get_control_game(server);
    let reply = cmd_ctx.reply.clone();
    ctx.spawn(fut.into_actor(session).map(move |result, session, _| {
        let text = match result {
            Ok(game) => format!(
                "{name}: {} - Time Remaining: {} min. {} sec. - Arthurian: {} TuathaDeDanann: {} Viking: {}",
                game.game_state.describe(),
                game.time_left / 60,
                game.time_left % 60,
                game.arthurian_score,
                game.tuatha_de_danann_score,
                game.viking_score,
            ),
            Err(_) => "Error accessing API. Server may be down.".to_string(),
        };
        session.send_reply(&reply, &text);
    }));
}

fn cmd_players(
    session: &mut ServerSession,
    ctx: &mut Context<ServerSession>,
    cmd_ctx: &CommandContext,
    params: &str,
) {
    let (target, _) = split_target(session, params);
    let Some(server) = session.deps.config.server(&target) else {
        return;
    };
    let name = server.name.clone();
    let fut = session.deps.api.get_players(server);
    let reply = cmd_ctx.reply.clone();
    ctx.spawn(fut.into_actor(session).map(move |result, session, _| {
        let text = match result {
            Ok(counts) => format!(
                "{name}: {} players online - Arthurians: {} TuathaDeDanann: {} Vikings: {}",
                counts.total(),
                counts.arthurians,
                counts.tuatha_de_danann,
                counts.vikings,
            ),
            Err(_) => "Error accessing API. Server may be down.".to_string(),
        };
        session.send_reply(&reply, &text);
    }));
}

fn cmd_events(
    session: &mut ServerSession,
    ctx: &mut Context<ServerSession>,
    cmd_ctx: &CommandContext,
    params: &str,
) {
    let (target, _) = split_target(session, params);
    let Some(server) = session.deps.config.server(&target) else {
        return;
    };
    let name = server.name.clone();
    let fut = session.deps.api.get_events(server);
    let reply = cmd_ctx.reply.clone();
    ctx.spawn(fut.into_actor(session).map(move |result, session, _| {
        let text = match result {
            Ok(events) if events.is_empty() => {
                format!("{name}: no scheduled events.")
            }
            Ok(events) => {
                let names: Vec<&str> = events.iter().map(|e| e.name.as_str()).collect();
                format!("{name}: scheduled events: {}", names.join(", "))
            }
            Err(_) => "Error accessing API. Server may be down.".to_string(),
        };
        session.send_reply(&reply, &text);
    }));
}

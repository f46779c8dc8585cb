//! Interactive play against a server session.

use std::io::{BufRead, Write};

use anyhow::Context;

use redbridge_core::actions::Action;
use redbridge_core::agent::AgentKind;
use redbridge_core::game::GameSnapshot;

use crate::client::ApiClient;

pub fn run(server: &str, agent_kind: AgentKind, wait_frames: Option<u32>) -> anyhow::Result<()> {
    let client = ApiClient::new(server);
    let created = client
        .create_session(agent_kind, wait_frames)
        .context("could not create a session; is the server running?")?;
    log::info!("created session {}", created.session_id);

    println!("Session {} ({})", created.session_id, created.meta.agent_kind);
    print_menu();

    let stdin = std::io::stdin();
    let mut input = String::new();
    loop {
        print!("action> ");
        std::io::stdout().flush()?;
        input.clear();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("q") {
            break;
        }
        if trimmed.eq_ignore_ascii_case("h") {
            print_menu();
            continue;
        }

        let action = match trimmed.parse::<usize>().ok().and_then(|i| Action::from_index(i).ok()) {
            Some(action) => action,
            None => {
                println!("invalid input {trimmed:?}; enter an action number, 'h', or 'q'");
                continue;
            }
        };

        match client.step(&created.session_id, &created.control_token, action) {
            Ok(outcome) => {
                println!("step {} \u{2022} {}", outcome.step, action.label());
                print_snapshot(&outcome.snapshot);
            }
            Err(e) => {
                println!("step failed: {e:#}");
                break;
            }
        }
    }

    println!("closing session {}", created.session_id);
    client.close(&created.session_id, &created.control_token)?;
    Ok(())
}

fn print_menu() {
    println!("--- Actions ---");
    for (i, action) in Action::ALL.iter().enumerate() {
        println!("{i}: {}", action.label());
    }
    println!("h: show this menu");
    println!("q: quit (closes the session)");
}

fn print_snapshot(snap: &GameSnapshot) {
    println!(
        "  map {} pos ({}, {})  ${}  badges {:08b}",
        snap.map_id, snap.x, snap.y, snap.money, snap.badges
    );
    if snap.party.is_empty() {
        println!("  party: empty");
    } else {
        let summary: Vec<String> = snap
            .party
            .iter()
            .map(|mon| {
                format!(
                    "{} L{} {}/{}hp",
                    if mon.nickname.is_empty() {
                        format!("#{}", mon.species_id)
                    } else {
                        mon.nickname.clone()
                    },
                    mon.level,
                    mon.current_hp,
                    mon.stats.max_hp
                )
            })
            .collect();
        println!("  party: {}", summary.join(", "));
    }
}

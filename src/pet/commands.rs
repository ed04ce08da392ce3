//! Text console: a tiny line parser and a handler that renders replies.
//!
//! Lines look like `<owner_id> <verb> [args]`, e.g. `42 adopt Rex`,
//! `42 freeze 3`, `42 gift 7 5`. The [ConsoleParser] only understands the
//! syntax; [handle] maps each [PetCommand] onto a [PetService] call and turns
//! the result (including errors) into a short reply.

use log::trace;

use crate::pet::economy::ClaimOutcome;
use crate::pet::errors::PetError;
use crate::pet::freeze::is_frozen;
use crate::pet::service::{LeaderboardEntry, PetService};
use crate::pet::types::{Action, OwnerId, PetRecord};

const DEFAULT_LEADERBOARD_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PetCommand {
    Help,
    Adopt(String),
    Status,
    Act(Action),
    Freeze(u32),
    Daily,
    Gift { to: OwnerId, amount: u64 },
    Rename(String),
    Balance,
    Leaderboard(usize),
    Weather,
    React(Action),
    Unknown(String),
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLine {
    pub owner_id: OwnerId,
    pub command: PetCommand,
}

pub struct ConsoleParser;

impl ConsoleParser {
    pub fn new() -> Self {
        Self
    }

    /// `None` for blank lines; otherwise the owner and the parsed command.
    pub fn parse(&self, raw: &str) -> Option<Result<ConsoleLine, String>> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let (owner, rest) = split_word(trimmed);
        let owner_id = match owner.parse::<OwnerId>() {
            Ok(id) => id,
            Err(_) => return Some(Err(format!("'{}' is not an owner id", owner))),
        };
        let command = self.parse_command(rest);
        trace!("parsed {:?} for owner {} from '{}'", command, owner_id, raw);
        Some(Ok(ConsoleLine { owner_id, command }))
    }

    pub fn parse_command(&self, body: &str) -> PetCommand {
        let (verb, args) = split_word(body.trim());
        let verb = verb.to_lowercase();
        match verb.as_str() {
            "" | "help" | "?" => PetCommand::Help,
            "adopt" => {
                if args.is_empty() {
                    PetCommand::Invalid("Usage: adopt <name>".into())
                } else {
                    PetCommand::Adopt(args.to_string())
                }
            }
            "status" | "pet" => PetCommand::Status,
            "freeze" => match args.parse::<u32>() {
                Ok(days) => PetCommand::Freeze(days),
                Err(_) => PetCommand::Invalid("Usage: freeze <days>".into()),
            },
            "daily" => PetCommand::Daily,
            "gift" | "give" => {
                let (to, amount) = split_word(args);
                match (to.parse::<OwnerId>(), amount.trim().parse::<u64>()) {
                    (Ok(to), Ok(amount)) => PetCommand::Gift { to, amount },
                    _ => PetCommand::Invalid("Usage: gift <owner_id> <amount>".into()),
                }
            }
            "rename" => {
                if args.is_empty() {
                    PetCommand::Invalid("Usage: rename <new name>".into())
                } else {
                    PetCommand::Rename(args.to_string())
                }
            }
            "balance" | "coins" => PetCommand::Balance,
            "leaderboard" | "top" => {
                if args.is_empty() {
                    PetCommand::Leaderboard(DEFAULT_LEADERBOARD_SIZE)
                } else {
                    match args.parse::<usize>() {
                        Ok(n) if n > 0 => PetCommand::Leaderboard(n),
                        _ => PetCommand::Invalid("Usage: leaderboard [count]".into()),
                    }
                }
            }
            "weather" => PetCommand::Weather,
            "react" => match Action::parse(args) {
                Some(action) => PetCommand::React(action),
                None => PetCommand::Invalid("Usage: react <🍗|🎾|💤|🗺️>".into()),
            },
            other => match Action::parse(other) {
                Some(action) => PetCommand::Act(action),
                None => PetCommand::Unknown(other.to_string()),
            },
        }
    }
}

impl Default for ConsoleParser {
    fn default() -> Self {
        Self::new()
    }
}

fn split_word(s: &str) -> (&str, &str) {
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim()),
        None => (s, ""),
    }
}

pub const HELP_TEXT: &str = "\
Commands (prefix each with your owner id):
  adopt <name>          adopt a new pet
  status                show your pet
  feed | play | rest    care for your pet
  adventure             go exploring (needs 20 energy)
  freeze <days>         pause your pet, 1 coin per day
  daily                 claim your daily coins
  gift <owner> <amt>    send coins to another pet
  rename <name>         give your pet a new name
  balance               show your coins
  leaderboard [n]       oldest pets
  weather               today's weather
  react <emoji>         quick action: 🍗 🎾 💤 🗺️";

pub fn render_status(pet: &PetRecord, service: &PetService) -> String {
    let now = service.now();
    let mut out = format!(
        "🐾 {} | age {} day(s) | mood {}\n{}\nCoins: {}",
        pet.name,
        pet.age_days(now),
        pet.mood(),
        pet.stats,
        pet.coins
    );
    if let Some(end) = pet.freeze_end.filter(|_| is_frozen(pet, now)) {
        out.push_str(&format!("\nFrozen until {}", end.format("%Y-%m-%d %H:%M UTC")));
    }
    out
}

pub fn render_leaderboard(entries: &[LeaderboardEntry]) -> String {
    if entries.is_empty() {
        return "No pets yet.".to_string();
    }
    entries
        .iter()
        .enumerate()
        .map(|(i, e)| {
            format!(
                "{}. {} (owner {}) - {} day(s)",
                i + 1,
                e.name,
                e.owner_id,
                e.age_days
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Reply text for a failed command.
pub fn render_error(err: &PetError) -> String {
    match err {
        PetError::NoPet(_) => "You don't have a pet. Use 'adopt <name>' to get one!".to_string(),
        PetError::AlreadyExists { name, .. } => format!("You already have a pet named {}!", name),
        PetError::InsufficientCoins { needed, available } => format!(
            "Not enough coins: you need {} but have {}.",
            needed, available
        ),
        PetError::InsufficientEnergy { needed, .. } => format!(
            "Your pet is too tired. It needs at least {} energy.",
            needed
        ),
        PetError::InvalidInput(msg) => msg.clone(),
        PetError::CoolingDown { remaining_secs } => {
            format!("Slow down! Try again in {}s.", remaining_secs)
        }
        PetError::PromptClosed => "That prompt has already closed.".to_string(),
        PetError::StoreUnavailable(_) | PetError::Internal(_) => {
            "Something went wrong saving your pet. Please try again.".to_string()
        }
    }
}

pub async fn handle(service: &PetService, owner_id: OwnerId, command: PetCommand) -> String {
    match execute(service, owner_id, command).await {
        Ok(reply) => reply,
        Err(e) => {
            if matches!(e, PetError::StoreUnavailable(_) | PetError::Internal(_)) {
                log::error!("command for owner {} failed: {}", owner_id, e);
            }
            render_error(&e)
        }
    }
}

async fn execute(
    service: &PetService,
    owner_id: OwnerId,
    command: PetCommand,
) -> Result<String, PetError> {
    Ok(match command {
        PetCommand::Help => HELP_TEXT.to_string(),
        PetCommand::Adopt(name) => {
            let pet = service.adopt(owner_id, &name).await?;
            format!("You adopted {}! 🐣\n{}", pet.name, render_status(&pet, service))
        }
        PetCommand::Status => render_status(&service.status(owner_id).await?, service),
        PetCommand::Act(action) => service.act(owner_id, action).await?.message(),
        PetCommand::React(action) => service.react(owner_id, action).await?.message(),
        PetCommand::Freeze(days) => {
            let pet = service.freeze(owner_id, days).await?;
            format!(
                "{} is frozen for {} day(s). Coins left: {}",
                pet.name, days, pet.coins
            )
        }
        PetCommand::Daily => {
            let outcome: ClaimOutcome = service.claim_daily(owner_id).await?;
            outcome.describe()
        }
        PetCommand::Gift { to, amount } => {
            let (left, _) = service.transfer_coins(owner_id, to, amount).await?;
            format!(
                "Sent {} coin(s) to owner {}. You have {} left.",
                amount, to, left
            )
        }
        PetCommand::Rename(name) => {
            let pet = service.rename(owner_id, &name).await?;
            format!("Your pet is now called {}.", pet.name)
        }
        PetCommand::Balance => format!("You have {} coin(s).", service.balance(owner_id).await?),
        PetCommand::Leaderboard(n) => render_leaderboard(&service.leaderboard(n).await?),
        PetCommand::Weather => {
            let w = service.weather();
            format!(
                "{}\n{}\nEffect: {}",
                w.condition.label(),
                w.condition.description(),
                w.condition.delta()
            )
        }
        PetCommand::Unknown(verb) => format!("Unknown command '{}'. Try 'help'.", verb),
        PetCommand::Invalid(msg) => msg,
    })
}

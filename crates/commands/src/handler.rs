//! Command dispatch and reply rendering.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use database::{birthday, deferred, reminder, time_preference};
use database::{DatabaseError, Database, NewReminder, QuotaPolicy, Reminder};
use scheduler::{Notifier, ReminderScheduler};
use timeparse::{parse_relative, parse_time_of_day, ParseError};

use crate::error::CommandError;
use crate::localtime::{format_delta, resolve_time_of_day};

const NO_TIME_REPLY: &str = "Not sure what time you meant that to be!";
const QUOTA_REPLY: &str = "Quota exceeded. You cannot set more!";
const TOO_SOON_REPLY: &str = "Uhm… that's pretty much right now. Try a longer delay!";

/// One command extracted from user input by the transport layer.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    /// Chat the command was sent in (and replies go to).
    pub chat_id: i64,
    /// User who sent the command.
    pub sender_id: i64,
    /// Command name, without any leading slash.
    pub command: String,
    /// Raw argument string, everything after the command name.
    pub args: String,
}

/// Dispatches commands against the store and the scheduler.
pub struct CommandHandler<N: Notifier> {
    db: Database,
    scheduler: Arc<ReminderScheduler<N>>,
    quota: QuotaPolicy,
}

impl<N: Notifier> CommandHandler<N> {
    /// Create a handler with the default quota.
    pub fn new(db: Database, scheduler: Arc<ReminderScheduler<N>>) -> Self {
        Self::with_quota(db, scheduler, QuotaPolicy::default())
    }

    /// Create a handler with a custom quota policy.
    pub fn with_quota(
        db: Database,
        scheduler: Arc<ReminderScheduler<N>>,
        quota: QuotaPolicy,
    ) -> Self {
        Self {
            db,
            scheduler,
            quota,
        }
    }

    /// Handle one command and produce the reply text.
    ///
    /// Anything the user can fix themselves comes back as reply text; an
    /// `Err` here means storage failed and the transport should send its
    /// generic failure message.
    pub async fn handle(&self, request: &CommandRequest) -> Result<String, CommandError> {
        debug!(
            chat_id = request.chat_id,
            sender_id = request.sender_id,
            command = %request.command,
            "handling command"
        );

        let args = request.args.trim();
        match request.command.to_ascii_lowercase().as_str() {
            "start" | "help" => Ok(self.help()),
            "remindin" => self.remind_in(request, args).await,
            "remindat" => self.remind_at(request, args).await,
            "status" => self.status(request).await,
            "list" => self.list(request).await,
            "delete" => self.delete(request, args).await,
            "clear" => self.clear(request, args).await,
            "later" => self.later(request, args).await,
            "confirm" => self.confirm(request, args).await,
            "tz" => self.timezone(request, args).await,
            "bday" => self.birthday(request, args).await,
            "stats" => self.stats().await,
            _ => Ok("I don't know that command. Send /help for what I can do.".to_string()),
        }
    }

    fn help(&self) -> String {
        format!(
            "Hi! I can remind you of things.\n\n\
             Set reminders with:\n\
             /remindat 17:05 optional text\n\
             /remindin 5m optional text\n\n\
             See them with /status or /list, drop one with /delete <n>, or\n\
             drop them all with /clear. /tz sets your UTC offset so times of\n\
             day mean *your* times of day, and /bday keeps track of\n\
             birthdays.\n\n\
             Everyone gets {} bytes per reminder and {} reminders at most. No more!",
            self.quota.max_text_bytes, self.quota.max_reminders
        )
    }

    async fn remind_in(&self, request: &CommandRequest, args: &str) -> Result<String, CommandError> {
        if args.is_empty() {
            return Ok("In when? Try something like `/remindin 5m do the laundry`.".to_string());
        }

        match parse_relative(args) {
            Err(_) => Ok(NO_TIME_REPLY.to_string()),
            Ok(m) => {
                let now = unix_now();
                let due = now + m.seconds as i64;
                self.create_reminder(request, now, due, args[m.end..].trim()).await
            }
        }
    }

    async fn remind_at(&self, request: &CommandRequest, args: &str) -> Result<String, CommandError> {
        if args.is_empty() {
            return Ok("At what time? Try something like `/remindat 17:05 stand up`.".to_string());
        }

        match parse_time_of_day(args) {
            Err(ParseError::OutOfBounds { .. }) => {
                Ok("Some of those values are out of bounds!".to_string())
            }
            Err(ParseError::NoMatch) => Ok(NO_TIME_REPLY.to_string()),
            Ok(m) => {
                let delta = time_preference::get(self.db.pool(), request.sender_id)
                    .await?
                    .map(|p| p.delta_seconds)
                    .unwrap_or(0);
                let now = unix_now();
                let due = resolve_time_of_day(m.seconds_of_day, now, delta);
                self.create_reminder(request, now, due, args[m.end..].trim()).await
            }
        }
    }

    /// Shared tail of every reminder-creating command.
    async fn create_reminder(
        &self,
        request: &CommandRequest,
        now: i64,
        due: i64,
        text: &str,
    ) -> Result<String, CommandError> {
        let new = NewReminder {
            chat_id: request.chat_id,
            creator_id: request.sender_id,
            due,
            text,
            reply_to: None,
            attachment_type: None,
            attachment_id: None,
        };

        match reminder::add(self.db.pool(), &self.quota, &new, now).await {
            Ok(id) => {
                let stored = Reminder {
                    id,
                    chat_id: request.chat_id,
                    due,
                    text: text.trim().to_string(),
                    reply_to: None,
                    creator_id: request.sender_id,
                    attachment_type: None,
                    attachment_id: None,
                };
                self.scheduler.schedule(&stored).await;
                info!(id, chat_id = request.chat_id, "reminder created");

                let diff = format_delta(due - now);
                Ok(if stored.text.is_empty() {
                    format!("I will remind you in {diff}!")
                } else {
                    format!("I will remind you \"{}\" in {diff}!", stored.text)
                })
            }
            Err(DatabaseError::QuotaExceeded) => Ok(QUOTA_REPLY.to_string()),
            Err(DatabaseError::TooSoon) => Ok(TOO_SOON_REPLY.to_string()),
            Err(e) => Err(e.into()),
        }
    }

    async fn status(&self, request: &CommandRequest) -> Result<String, CommandError> {
        let reminders =
            reminder::list(self.db.pool(), request.chat_id, request.sender_id).await?;
        let Some(next) = reminders.first() else {
            return Ok("You have no pending reminders. Hooray!".to_string());
        };

        let diff = format_delta(next.due - unix_now());
        let plural = if reminders.len() == 1 { "reminder" } else { "reminders" };
        let tail = if next.text.is_empty() {
            ".".to_string()
        } else {
            format!(":\n{}", next.text)
        };
        Ok(format!(
            "{} {plural}. Next one in {diff}{tail}",
            reminders.len()
        ))
    }

    async fn list(&self, request: &CommandRequest) -> Result<String, CommandError> {
        let reminders =
            reminder::list(self.db.pool(), request.chat_id, request.sender_id).await?;
        if reminders.is_empty() {
            return Ok("You have no pending reminders. Hooray!".to_string());
        }

        let now = unix_now();
        let mut reply = String::from("Your pending reminders:\n");
        for (position, r) in reminders.iter().enumerate() {
            let diff = format_delta(r.due - now);
            if r.text.is_empty() {
                reply.push_str(&format!("{}. in {diff}\n", position + 1));
            } else {
                reply.push_str(&format!("{}. in {diff} - {}\n", position + 1, r.text));
            }
        }
        reply.push_str("Use /delete <n> to drop one.");
        Ok(reply)
    }

    async fn delete(&self, request: &CommandRequest, args: &str) -> Result<String, CommandError> {
        let Some(position) = args.split_whitespace().next().and_then(|a| a.parse::<u32>().ok())
        else {
            return Ok("Which one? Give me its number from /list.".to_string());
        };
        if position == 0 {
            return Ok("Counting starts at 1 here!".to_string());
        }

        match reminder::remove_nth(
            self.db.pool(),
            request.chat_id,
            request.sender_id,
            position - 1,
        )
        .await
        {
            Ok(removed) => {
                self.scheduler.cancel(removed.id).await;
                Ok(if removed.text.is_empty() {
                    "Removed that reminder.".to_string()
                } else {
                    format!("Removed reminder \"{}\".", removed.text)
                })
            }
            Err(DatabaseError::NotFound { .. }) => {
                Ok("There is no reminder at that position.".to_string())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn clear(&self, request: &CommandRequest, args: &str) -> Result<String, CommandError> {
        let reminders =
            reminder::list(self.db.pool(), request.chat_id, request.sender_id).await?;
        if reminders.is_empty() {
            return Ok("You have no reminders to clear.".to_string());
        }

        let Some(token) = args.split_whitespace().next() else {
            return Ok(format!(
                "Are you sure you want to clear {} reminders? Send `/clear please` if you are totally sure!",
                reminders.len()
            ));
        };
        if !token.eq_ignore_ascii_case("please") {
            return Ok(format!("\"{token}\" is not what I asked you to send!"));
        }

        // Rows first, timers second: a timer that fires in between finds
        // its row already gone and stays silent.
        let removed =
            reminder::clear_all(self.db.pool(), request.chat_id, request.sender_id).await?;
        let cancelled = self
            .scheduler
            .cancel_for(request.chat_id, request.sender_id)
            .await;
        info!(
            chat_id = request.chat_id,
            removed, cancelled, "cleared reminders"
        );

        Ok("You are now free! No more reminders.".to_string())
    }

    async fn later(&self, request: &CommandRequest, args: &str) -> Result<String, CommandError> {
        if args.is_empty() {
            return Ok("Later when? Try `/later 20m`.".to_string());
        }

        match parse_relative(args) {
            Err(_) => Ok(NO_TIME_REPLY.to_string()),
            Ok(m) => {
                deferred::set(self.db.pool(), request.sender_id, m.seconds as i64).await?;
                Ok(format!(
                    "Okay, holding on to {}. Send `/confirm <text>` to set it.",
                    format_delta(m.seconds as i64)
                ))
            }
        }
    }

    async fn confirm(&self, request: &CommandRequest, args: &str) -> Result<String, CommandError> {
        match deferred::take(self.db.pool(), request.sender_id).await? {
            None => Ok("There is nothing pending to confirm!".to_string()),
            Some(delta) => {
                let now = unix_now();
                self.create_reminder(request, now, now + delta, args).await
            }
        }
    }

    async fn timezone(&self, request: &CommandRequest, args: &str) -> Result<String, CommandError> {
        let mut parts = args.split_whitespace();
        let Some(delta) = parts.next().and_then(parse_utc_offset) else {
            return Ok(
                "Tell me your UTC offset like `+2`, `-05:30`, or `+1:00 Europe/Madrid`."
                    .to_string(),
            );
        };
        let zone = parts.next();

        time_preference::upsert(self.db.pool(), request.sender_id, delta, zone).await?;
        Ok(format!(
            "Saved! Your times of day are now UTC{}.",
            format_utc_offset(delta)
        ))
    }

    async fn birthday(&self, request: &CommandRequest, args: &str) -> Result<String, CommandError> {
        let mut parts = args.split_whitespace();
        match parts.next().map(str::to_ascii_lowercase).as_deref() {
            Some("add") => {
                let date = parts.next().and_then(|m| m.parse::<i64>().ok()).zip(
                    parts.next().and_then(|d| d.parse::<i64>().ok()),
                );
                let Some((month, day)) = date.filter(|(m, d)| {
                    (1..=12).contains(m) && (1..=31).contains(d)
                }) else {
                    return Ok(
                        "That doesn't look like a date. Use `/bday add <month> <day> [name]`."
                            .to_string(),
                    );
                };

                let rest = parts.collect::<Vec<_>>().join(" ");
                let name = (!rest.is_empty()).then_some(rest.as_str());
                birthday::add(self.db.pool(), request.sender_id, month, day, None, name).await?;
                Ok(format!(
                    "Saved a birthday on day {day} of month {month}. I will give you a day of warning!"
                ))
            }
            Some("list") => {
                let birthdays = birthday::list(self.db.pool(), request.sender_id).await?;
                if birthdays.is_empty() {
                    return Ok("No birthdays saved. Add one with `/bday add <month> <day> [name]`.".to_string());
                }
                let mut reply = String::from("Saved birthdays:\n");
                for (position, b) in birthdays.iter().enumerate() {
                    reply.push_str(&format!(
                        "{}. {:02}-{:02} - {}\n",
                        position + 1,
                        b.month,
                        b.day,
                        b.person_name.as_deref().unwrap_or("(no name)")
                    ));
                }
                reply.push_str("Use /bday remove <n> to drop one.");
                Ok(reply)
            }
            Some("remove") => {
                let Some(position) =
                    parts.next().and_then(|a| a.parse::<u32>().ok()).filter(|p| *p > 0)
                else {
                    return Ok("Which one? Give me its number from /bday list.".to_string());
                };
                match birthday::remove_nth(self.db.pool(), request.sender_id, position - 1).await {
                    Ok(removed) => Ok(format!(
                        "Forgot the birthday on day {} of month {}.",
                        removed.day, removed.month
                    )),
                    Err(DatabaseError::NotFound { .. }) => {
                        Ok("There is no birthday at that position.".to_string())
                    }
                    Err(e) => Err(e.into()),
                }
            }
            _ => Ok("Use `/bday add <month> <day> [name]`, `/bday list`, or `/bday remove <n>`.".to_string()),
        }
    }

    async fn stats(&self) -> Result<String, CommandError> {
        let (people, reminders) = reminder::stats(self.db.pool()).await?;
        Ok(format!(
            "{people} people currently have {reminders} reminders set."
        ))
    }
}

/// `+2`, `-5`, `+02:30`, `5:45` → offset in seconds.
fn parse_utc_offset(input: &str) -> Option<i64> {
    let (sign, rest) = match input.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, input.strip_prefix('+').unwrap_or(input)),
    };

    let mut parts = rest.split(':');
    let hours: i64 = parts.next()?.parse().ok()?;
    let minutes: i64 = match parts.next() {
        Some(m) => m.parse().ok()?,
        None => 0,
    };
    if parts.next().is_some() || !(0..=14).contains(&hours) || !(0..=59).contains(&minutes) {
        return None;
    }

    Some(sign * (hours * 3_600 + minutes * 60))
}

fn format_utc_offset(delta_seconds: i64) -> String {
    let sign = if delta_seconds < 0 { '-' } else { '+' };
    let abs = delta_seconds.abs();
    format!("{sign}{}:{:02}", abs / 3_600, (abs % 3_600) / 60)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scheduler::{Delivery, NotifyError};

    struct NullNotifier;

    #[async_trait]
    impl Notifier for NullNotifier {
        async fn deliver(&self, _delivery: Delivery) -> Result<(), NotifyError> {
            Ok(())
        }
    }

    async fn test_handler() -> CommandHandler<NullNotifier> {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let scheduler = ReminderScheduler::new(db.clone(), Arc::new(NullNotifier));
        CommandHandler::new(db, scheduler)
    }

    fn request(command: &str, args: &str) -> CommandRequest {
        CommandRequest {
            chat_id: 100,
            sender_id: 7,
            command: command.to_string(),
            args: args.to_string(),
        }
    }

    #[tokio::test]
    async fn test_remindin_creates_and_lists() {
        let handler = test_handler().await;

        let reply = handler.handle(&request("remindin", "1h water the plants")).await.unwrap();
        assert!(reply.contains("water the plants"), "{reply}");
        assert!(reply.contains("1:00:00"), "{reply}");

        let reply = handler.handle(&request("status", "")).await.unwrap();
        assert!(reply.starts_with("1 reminder."), "{reply}");
        assert!(reply.contains("water the plants"), "{reply}");

        let reply = handler.handle(&request("list", "")).await.unwrap();
        assert!(reply.contains("1. in"), "{reply}");
        assert_eq!(handler.scheduler.armed().await, 1);
    }

    #[tokio::test]
    async fn test_remindin_parse_failures_are_replies() {
        let handler = test_handler().await;

        let reply = handler.handle(&request("remindin", "")).await.unwrap();
        assert!(reply.contains("In when?"), "{reply}");

        let reply = handler.handle(&request("remindin", "whenever")).await.unwrap();
        assert_eq!(reply, NO_TIME_REPLY);

        let reply = handler.handle(&request("status", "")).await.unwrap();
        assert!(reply.contains("no pending reminders"), "{reply}");
    }

    #[tokio::test]
    async fn test_remindat_out_of_bounds_reply() {
        let handler = test_handler().await;

        let reply = handler.handle(&request("remindat", "25:00 too late")).await.unwrap();
        assert!(reply.contains("out of bounds"), "{reply}");
    }

    #[tokio::test]
    async fn test_remindat_uses_stored_offset() {
        let handler = test_handler().await;

        let reply = handler.handle(&request("tz", "+0")).await.unwrap();
        assert!(reply.contains("+0:00"), "{reply}");

        // Ask for two hours from the current time of day so the resolved
        // instant is comfortably in the future whatever the wall clock says.
        let target = (unix_now() + 7_200).rem_euclid(86_400);
        let args = format!(
            "{}:{:02}:{:02} stretch",
            target / 3_600,
            (target % 3_600) / 60,
            target % 60
        );
        let reply = handler.handle(&request("remindat", &args)).await.unwrap();
        assert!(reply.starts_with("I will remind you"), "{reply}");
        assert!(reply.contains("stretch"), "{reply}");
    }

    #[tokio::test]
    async fn test_quota_reply_after_ten() {
        let handler = test_handler().await;

        for i in 0..10 {
            let reply = handler
                .handle(&request("remindin", &format!("{}m task {i}", i + 10)))
                .await
                .unwrap();
            assert!(reply.starts_with("I will remind you"), "{reply}");
        }

        let reply = handler.handle(&request("remindin", "2h one too many")).await.unwrap();
        assert_eq!(reply, QUOTA_REPLY);
    }

    #[tokio::test]
    async fn test_too_soon_reply() {
        let handler = test_handler().await;

        let reply = handler.handle(&request("remindin", "2s blink")).await.unwrap();
        assert_eq!(reply, TOO_SOON_REPLY);
    }

    #[tokio::test]
    async fn test_delete_by_position() {
        let handler = test_handler().await;

        handler.handle(&request("remindin", "1h first")).await.unwrap();
        handler.handle(&request("remindin", "2h second")).await.unwrap();

        let reply = handler.handle(&request("delete", "1")).await.unwrap();
        assert!(reply.contains("first"), "{reply}");
        assert_eq!(handler.scheduler.armed().await, 1);

        let reply = handler.handle(&request("delete", "5")).await.unwrap();
        assert!(reply.contains("no reminder at that position"), "{reply}");

        let reply = handler.handle(&request("delete", "nope")).await.unwrap();
        assert!(reply.contains("Which one?"), "{reply}");
    }

    #[tokio::test]
    async fn test_clear_requires_confirmation_token() {
        let handler = test_handler().await;

        let reply = handler.handle(&request("clear", "")).await.unwrap();
        assert!(reply.contains("no reminders to clear"), "{reply}");

        handler.handle(&request("remindin", "1h a")).await.unwrap();
        handler.handle(&request("remindin", "2h b")).await.unwrap();

        let reply = handler.handle(&request("clear", "")).await.unwrap();
        assert!(reply.contains("clear 2 reminders"), "{reply}");

        let reply = handler.handle(&request("clear", "pretty-please")).await.unwrap();
        assert!(reply.contains("not what I asked"), "{reply}");
        assert_eq!(handler.scheduler.armed().await, 2);

        let reply = handler.handle(&request("clear", "please")).await.unwrap();
        assert!(reply.contains("You are now free"), "{reply}");
        assert_eq!(handler.scheduler.armed().await, 0);

        let reply = handler.handle(&request("status", "")).await.unwrap();
        assert!(reply.contains("no pending reminders"), "{reply}");
    }

    #[tokio::test]
    async fn test_later_confirm_flow() {
        let handler = test_handler().await;

        let reply = handler.handle(&request("confirm", "too eager")).await.unwrap();
        assert!(reply.contains("nothing pending"), "{reply}");

        let reply = handler.handle(&request("later", "20m")).await.unwrap();
        assert!(reply.contains("0:20:00"), "{reply}");

        // A newer value overwrites the old one.
        handler.handle(&request("later", "1h")).await.unwrap();

        let reply = handler.handle(&request("confirm", "check the oven")).await.unwrap();
        assert!(reply.contains("check the oven"), "{reply}");
        assert!(reply.contains("1:00:00"), "{reply}");

        let reply = handler.handle(&request("confirm", "again?")).await.unwrap();
        assert!(reply.contains("nothing pending"), "{reply}");
    }

    #[tokio::test]
    async fn test_tz_parsing() {
        let handler = test_handler().await;

        let reply = handler.handle(&request("tz", "+2")).await.unwrap();
        assert!(reply.contains("UTC+2:00"), "{reply}");

        let reply = handler.handle(&request("tz", "-05:30 Asia/Colombo")).await.unwrap();
        assert!(reply.contains("UTC-5:30"), "{reply}");

        let reply = handler.handle(&request("tz", "eastern")).await.unwrap();
        assert!(reply.contains("UTC offset"), "{reply}");
    }

    #[tokio::test]
    async fn test_birthday_commands() {
        let handler = test_handler().await;

        let reply = handler.handle(&request("bday", "add 6 15 Maya")).await.unwrap();
        assert!(reply.contains("day 15 of month 6"), "{reply}");

        let reply = handler.handle(&request("bday", "add 13 5 Nobody")).await.unwrap();
        assert!(reply.contains("doesn't look like a date"), "{reply}");

        let reply = handler.handle(&request("bday", "list")).await.unwrap();
        assert!(reply.contains("06-15 - Maya"), "{reply}");

        let reply = handler.handle(&request("bday", "remove 1")).await.unwrap();
        assert!(reply.contains("day 15 of month 6"), "{reply}");

        let reply = handler.handle(&request("bday", "list")).await.unwrap();
        assert!(reply.contains("No birthdays saved"), "{reply}");
    }

    #[tokio::test]
    async fn test_stats_and_unknown() {
        let handler = test_handler().await;

        handler.handle(&request("remindin", "1h a")).await.unwrap();
        let reply = handler.handle(&request("stats", "")).await.unwrap();
        assert!(reply.contains("1 people currently have 1 reminders"), "{reply}");

        let reply = handler.handle(&request("frobnicate", "")).await.unwrap();
        assert!(reply.contains("/help"), "{reply}");
    }

    #[test]
    fn test_parse_utc_offset() {
        assert_eq!(parse_utc_offset("+2"), Some(7_200));
        assert_eq!(parse_utc_offset("2"), Some(7_200));
        assert_eq!(parse_utc_offset("-5"), Some(-18_000));
        assert_eq!(parse_utc_offset("+05:30"), Some(19_800));
        assert_eq!(parse_utc_offset("-0:45"), Some(-2_700));
        assert_eq!(parse_utc_offset("+15"), None);
        assert_eq!(parse_utc_offset("2:99"), None);
        assert_eq!(parse_utc_offset("1:2:3"), None);
        assert_eq!(parse_utc_offset("eastern"), None);
    }
}

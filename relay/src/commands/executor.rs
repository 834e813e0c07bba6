//! Executes parsed `shift` commands against the rule store, stats and platform.

use super::parse::{parse_indices, FilterAction, IndexSelection, ShiftCommand};
use super::render;
use crate::config::jitter;
use crate::cycle::would_create_cycle;
use crate::forward::{ForwardOutcome, ForwardingEngine, Hop};
use shift_core::{
    ChatId, OptionSet, Peer, RelayOption, Result, ShiftError, StatusMessage, TargetType,
    ValidationError,
};
use std::collections::HashMap;
use std::sync::Arc;
use storage::{Rule, RuleSlot};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

pub struct CommandExecutor {
    engine: Arc<ForwardingEngine>,
    // Serializes the check-then-write of rule creation.
    create_lock: Mutex<()>,
}

impl CommandExecutor {
    pub fn new(engine: Arc<ForwardingEngine>) -> Self {
        Self {
            engine,
            create_lock: Mutex::new(()),
        }
    }

    /// Runs `command` issued from `current_chat`; returns the reply text.
    #[instrument(skip(self))]
    pub async fn execute(&self, current_chat: ChatId, command: ShiftCommand) -> Result<String> {
        match command {
            ShiftCommand::Help => Ok(render::HELP_TEXT.to_string()),
            ShiftCommand::Set {
                source,
                target,
                options,
            } => self.set(current_chat, &source, &target, &options).await,
            ShiftCommand::Backup {
                source,
                target,
                options,
            } => self.backup(current_chat, &source, &target, &options).await,
            ShiftCommand::Delete { indices } => self.delete(&indices).await,
            ShiftCommand::List => self.list().await,
            ShiftCommand::Stats => self.stats().await,
            ShiftCommand::Pause { indices } => self.set_paused(&indices, true).await,
            ShiftCommand::Resume { indices } => self.set_paused(&indices, false).await,
            ShiftCommand::Filter {
                action,
                indices,
                keywords,
            } => self.filter(action, &indices, &keywords).await,
            ShiftCommand::FilterList { index } => self.filter_list(&index).await,
        }
    }

    async fn set(
        &self,
        current_chat: ChatId,
        source_ref: &str,
        target_ref: &str,
        option_tokens: &[String],
    ) -> Result<String> {
        let mut options = parse_options(option_tokens)?;
        let (source, target) = self
            .resolve_endpoints(current_chat, source_ref, target_ref)
            .await?;

        let _guard = self.create_lock.lock().await;
        self.ensure_no_cycle(source.id(), target.id()).await?;

        let silent_removed =
            target.target_type() == TargetType::User && options.remove(RelayOption::Silent);
        if silent_removed {
            warn!(target_id = target.id(), "silent dropped for user target");
        }

        let rule = Rule::new(source.id(), target.id(), target.target_type(), options);
        self.engine.rules().put(&rule).await?;
        info!(
            source_id = rule.source_id,
            target_id = rule.target_id,
            target_type = %rule.target_type,
            options = %rule.options,
            "Relay rule saved"
        );

        Ok(render::rule_saved(&source, &target, &rule.options, silent_removed))
    }

    async fn backup(
        &self,
        current_chat: ChatId,
        source_ref: &str,
        target_ref: &str,
        option_tokens: &[String],
    ) -> Result<String> {
        let options = parse_options(option_tokens)?;
        let (source, target) = self
            .resolve_endpoints(current_chat, source_ref, target_ref)
            .await?;
        self.ensure_no_cycle(source.id(), target.id()).await?;

        let platform = self.engine.platform();
        let history = platform.chat_history(source.id()).await?;

        let start = format!("🔄 Backup started...\n\n{}", render::endpoints(&source, &target));
        let status = match platform.send_message(current_chat, &start).await {
            Ok(message_id) => Some(StatusMessage {
                chat_id: current_chat,
                message_id,
            }),
            Err(e) => {
                debug!(error = %e, "Could not send backup status message");
                None
            }
        };

        let hop = Hop {
            target_id: target.id(),
            disable_notification: options.is_silent() && target.target_type() == TargetType::Chat,
            options,
        };
        let config = self.engine.config();
        let (mut forwarded, mut skipped, mut failed) = (0usize, 0usize, 0usize);

        info!(source_id = source.id(), target_id = target.id(), messages = history.len(), "Backup started");
        for message in &history {
            tokio::time::sleep(jitter(&config.backup_pacing)).await;
            let report = self.engine.relay(status, message, hop.clone(), true, 0).await;
            match report.first_outcome() {
                Some(ForwardOutcome::Forwarded) => forwarded += 1,
                Some(ForwardOutcome::Skipped(_)) => skipped += 1,
                Some(ForwardOutcome::Failed(_)) | None => failed += 1,
            }

            let processed = forwarded + skipped + failed;
            if config.progress_every > 0 && processed % config.progress_every == 0 {
                if let Some(status) = status {
                    let text = render::backup_progress(&source, &target, forwarded, skipped, failed);
                    if let Err(e) = platform.edit_message(status.chat_id, status.message_id, &text).await {
                        debug!(error = %e, "Could not update backup progress");
                    }
                }
            }
        }
        info!(
            source_id = source.id(),
            target_id = target.id(),
            forwarded = forwarded,
            skipped = skipped,
            failed = failed,
            "Backup finished"
        );

        Ok(render::backup_done(&source, &target, forwarded, skipped, failed))
    }

    async fn delete(&self, indices: &str) -> Result<String> {
        let (slots, selection) = self.select(indices).await?;
        let rules = self.engine.rules();
        let stats = self.engine.stats();

        let mut deleted = 0;
        for index in &selection.valid {
            let slot = &slots[*index];
            if rules.delete_key(&slot.key()).await? {
                deleted += 1;
            }
            if let Some(source_id) = slot.source_id() {
                let removed = stats.delete_for_source(source_id).await?;
                debug!(source_id = source_id, stats_removed = removed, "Rule stats removed");
            }
            info!(key = %slot.key(), "Relay rule deleted");
        }

        Ok(format!(
            "✅ Deleted {} relay rule(s).{}",
            deleted,
            render::invalid_indices_note(&selection.invalid)
        ))
    }

    async fn list(&self) -> Result<String> {
        let slots = self.engine.rules().list().await?;
        if slots.is_empty() {
            return Ok("📭 No relay rules configured".to_string());
        }

        let mut cache: HashMap<(i64, TargetType), Option<Peer>> = HashMap::new();
        let mut output = format!("📋 Relay rules ({})\n\n", slots.len());
        for (i, slot) in slots.iter().enumerate() {
            let index = i + 1;
            match slot {
                RuleSlot::Valid(rule) => {
                    let source = self.lookup(&mut cache, rule.source_id, TargetType::Chat).await;
                    let target = self.lookup(&mut cache, rule.target_id, rule.target_type).await;
                    let source_name = peer_name(source.as_ref(), rule.source_id);
                    let target_name = peer_name(target.as_ref(), rule.target_id);
                    output.push_str(&render::rule_entry(
                        index,
                        rule,
                        &source_name,
                        target.as_ref(),
                        &target_name,
                    ));
                }
                RuleSlot::Corrupt { key, .. } => output.push_str(&render::corrupt_entry(index, key)),
            }
            output.push('\n');
        }
        Ok(output.trim_end().to_string())
    }

    async fn stats(&self) -> Result<String> {
        let summary = self.engine.stats().summary().await?;
        if summary.is_empty() {
            return Ok("📊 No relay statistics yet".to_string());
        }

        let target_types: HashMap<ChatId, TargetType> = self
            .engine
            .rules()
            .rules()
            .await?
            .into_iter()
            .map(|rule| (rule.source_id, rule.target_type))
            .collect();

        let mut output = "📊 Relay statistics\n\n".to_string();
        for source in &summary {
            output.push_str(&render::stats_entry(
                source,
                target_types.get(&source.source_id).copied(),
            ));
            output.push('\n');
        }
        Ok(output.trim_end().to_string())
    }

    async fn set_paused(&self, indices: &str, paused: bool) -> Result<String> {
        let (slots, selection) = self.select(indices).await?;
        let rules = self.engine.rules();

        let mut changed = 0;
        for index in &selection.valid {
            let Some(rule) = slots[*index].rule() else {
                continue;
            };
            let mut rule = rule.clone();
            rule.paused = paused;
            rules.put(&rule).await?;
            changed += 1;
            info!(source_id = rule.source_id, paused = paused, "Relay rule updated");
        }

        let (emoji, verb) = if paused { ("⏸️", "Paused") } else { ("▶️", "Resumed") };
        Ok(format!(
            "{} {} {} relay rule(s).{}",
            emoji,
            verb,
            changed,
            render::invalid_indices_note(&selection.invalid)
        ))
    }

    async fn filter(&self, action: FilterAction, indices: &str, keywords: &[String]) -> Result<String> {
        let (slots, selection) = self.select(indices).await?;
        let rules = self.engine.rules();

        let mut updated = 0;
        for index in &selection.valid {
            let Some(rule) = slots[*index].rule() else {
                continue;
            };
            let mut rule = rule.clone();
            match action {
                FilterAction::Add => rule.add_filters(keywords),
                FilterAction::Del => rule.remove_filters(keywords),
            };
            rules.put(&rule).await?;
            updated += 1;
            debug!(source_id = rule.source_id, filters = ?rule.filters, "Rule filters updated");
        }

        let verb = match action {
            FilterAction::Add => "Added keywords to",
            FilterAction::Del => "Removed keywords from",
        };
        Ok(format!(
            "✅ {} {} rule(s).{}",
            verb,
            updated,
            render::invalid_indices_note(&selection.invalid)
        ))
    }

    async fn filter_list(&self, index: &str) -> Result<String> {
        let slots = self.engine.rules().list().await?;
        let selection = parse_indices(index, slots.len());
        let Some(&i) = selection.valid.first() else {
            return Err(ValidationError::NoValidIndex(index.to_string()).into());
        };

        match &slots[i] {
            RuleSlot::Corrupt { key, reason, .. } => Err(ShiftError::DataCorruption {
                key: key.clone(),
                reason: reason.clone(),
            }),
            RuleSlot::Valid(rule) if rule.filters.is_empty() => Ok(format!(
                "🔍 Rule {} ({}) has no filter keywords.",
                i + 1,
                rule.source_id
            )),
            RuleSlot::Valid(rule) => {
                let list = rule
                    .filters
                    .iter()
                    .map(|f| format!("- {}", f))
                    .collect::<Vec<_>>()
                    .join("\n");
                Ok(format!(
                    "🔍 Filter keywords of rule {} ({}):\n{}",
                    i + 1,
                    rule.source_id,
                    list
                ))
            }
        }
    }

    /// Current listing plus the indices of `input` resolved against it.
    async fn select(&self, input: &str) -> Result<(Vec<RuleSlot>, IndexSelection)> {
        let slots = self.engine.rules().list().await?;
        let selection = parse_indices(input, slots.len());
        if selection.valid.is_empty() {
            let shown = if selection.invalid.is_empty() {
                input.to_string()
            } else {
                selection.invalid_text()
            };
            return Err(ValidationError::NoValidIndex(shown).into());
        }
        Ok((slots, selection))
    }

    /// Resolves and validates both ends of a prospective rule.
    async fn resolve_endpoints(
        &self,
        current_chat: ChatId,
        source_ref: &str,
        target_ref: &str,
    ) -> Result<(Peer, Peer)> {
        let platform = self.engine.platform();
        let whitelist = &self.engine.config().whitelist;

        let source = platform
            .resolve_peer(source_ref, current_chat)
            .await
            .map_err(|e| ValidationError::InvalidSource {
                reference: source_ref.to_string(),
                reason: e.to_string(),
            })?;
        let invalid_source = |reason: &str| ValidationError::InvalidSource {
            reference: source_ref.to_string(),
            reason: reason.to_string(),
        };
        match &source {
            Peer::Chat(chat) if !chat.kind.can_be_source() => {
                return Err(invalid_source("only channels and groups can be sources").into())
            }
            Peer::Chat(chat) if chat.has_protected_content => {
                return Err(invalid_source("content protection is enabled").into())
            }
            Peer::Chat(_) => {}
            Peer::User(_) => {
                return Err(invalid_source("only channels and groups can be sources").into())
            }
        }
        if whitelist.contains(&source.id()) {
            return Err(ValidationError::Whitelisted(source.id()).into());
        }

        let target = platform
            .resolve_peer(target_ref, current_chat)
            .await
            .map_err(|e| ValidationError::InvalidTarget {
                reference: target_ref.to_string(),
                reason: e.to_string(),
            })?;
        if whitelist.contains(&target.id()) {
            return Err(ValidationError::Whitelisted(target.id()).into());
        }

        Ok((source, target))
    }

    async fn ensure_no_cycle(&self, source: ChatId, target: ChatId) -> Result<()> {
        let graph = self.engine.rules().graph().await?;
        let check = would_create_cycle(&graph, source, target, self.engine.config().max_cycle_hops);
        if check.is_cycle() {
            info!(source_id = source, target_id = target, cycle = %check, "Rule rejected, would create a loop");
            return Err(ValidationError::WouldCreateCycle(check.to_string()).into());
        }
        Ok(())
    }

    async fn lookup(
        &self,
        cache: &mut HashMap<(i64, TargetType), Option<Peer>>,
        id: i64,
        target_type: TargetType,
    ) -> Option<Peer> {
        if let Some(cached) = cache.get(&(id, target_type)) {
            return cached.clone();
        }
        let peer = match self.engine.platform().get_peer(id, target_type).await {
            Ok(peer) => Some(peer),
            Err(e) => {
                debug!(id = id, error = %e, "Peer lookup failed, showing raw id");
                None
            }
        };
        cache.insert((id, target_type), peer.clone());
        peer
    }
}

fn parse_options(tokens: &[String]) -> std::result::Result<OptionSet, ValidationError> {
    OptionSet::parse(tokens.iter().map(String::as_str)).map_err(|unknown| {
        ValidationError::UnknownOptions {
            unknown: unknown.join(", "),
            available: RelayOption::available(),
        }
    })
}

fn peer_name(peer: Option<&Peer>, id: i64) -> String {
    peer.map(Peer::short_name).unwrap_or_else(|| id.to_string())
}
